/// Configuration management for relaymend
///
/// Handles engine API access, chat-transport endpoint, and database
/// connection settings. Values come from environment variables; the binary
/// pre-loads a local .env before any of this runs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Remote workflow-engine API access
    pub engine: EngineConfig,
    /// Chat-transport delivery endpoint
    pub transport: TransportConfig,
    /// Durable storage for conversation/failure/log records
    pub database: DatabaseConfig,
}

/// Remote workflow-engine API configuration
///
/// The engine holds the workflow graph of record; all edits go through its
/// REST API (fetch, full-document update, activate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base API URL (e.g., "http://localhost:5678/api/v1")
    pub api_url: String,
    /// API key sent as the engine's key header on every request
    pub api_key: String,
    /// Workflow document to operate on
    pub workflow_id: String,
}

/// Chat-transport endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Full URL of the send-text endpoint
    pub url: String,
    /// API key for the transport's key header
    pub api_key: String,
    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

/// Database configuration for record persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string (e.g., "host=localhost user=bot dbname=chatbot")
    pub url: String,
}

impl Config {
    /// Load the full configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            engine: EngineConfig::from_env()?,
            transport: TransportConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
        })
    }
}

impl EngineConfig {
    /// Engine settings with ENV_VAR support; the API key and workflow id
    /// have no sane defaults and must be set.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_url: std::env::var("RELAYMEND_ENGINE_URL")
                .unwrap_or_else(|_| "http://localhost:5678/api/v1".to_string()),
            api_key: std::env::var("ENGINE_API_KEY")
                .context("ENGINE_API_KEY not set")?,
            workflow_id: std::env::var("RELAYMEND_WORKFLOW_ID")
                .context("RELAYMEND_WORKFLOW_ID not set")?,
        })
    }
}

impl TransportConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: std::env::var("RELAYMEND_TRANSPORT_URL")
                .unwrap_or_else(|_| "http://host.docker.internal:3000/api/sendText".to_string()),
            api_key: std::env::var("TRANSPORT_API_KEY")
                .context("TRANSPORT_API_KEY not set")?,
            timeout_ms: std::env::var("RELAYMEND_TRANSPORT_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .unwrap_or(10_000),
        })
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,
        })
    }
}
