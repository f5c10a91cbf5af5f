/// Upstream AI response extraction with fixed fallback
///
/// The AI stage sometimes answers with an empty body or an object missing
/// its text field entirely. The end user still gets a message either way:
/// extraction substitutes a fixed apology and flags the turn, and delivery
/// proceeds with that text unchanged.

use serde_json::Value;

/// Sent in place of the AI reply when extraction comes up empty
pub const FALLBACK_TEXT: &str = "I'm sorry, I'm experiencing a temporary issue processing \
your request. Please try again in a moment.";

/// Text to deliver plus whether the fallback had to stand in
///
/// `ai_failed` is informational only; it rides into the execution log and
/// never changes delivery behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedResponse {
    pub text: String,
    pub ai_failed: bool,
}

impl ExtractedResponse {
    /// Wrap text that did not come from the AI stage at all (operator
    /// resends, replays of stored responses).
    pub fn verbatim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ai_failed: false,
        }
    }
}

/// Pull the reply text out of the raw AI response object
///
/// Probes both field names the upstream emits; a field that is missing,
/// non-string, empty, or whitespace-only falls through to the next, and the
/// fixed apology covers the rest.
pub fn extract_response_text(raw: &Value) -> ExtractedResponse {
    let found = ["text", "response"].iter().find_map(|key| {
        raw.get(*key)
            .and_then(Value::as_str)
            .filter(|text| !text.trim().is_empty())
    });

    match found {
        Some(text) => ExtractedResponse {
            text: text.to_string(),
            ai_failed: false,
        },
        None => {
            tracing::warn!("⚠️ Empty AI response, substituting fallback text");
            ExtractedResponse {
                text: FALLBACK_TEXT.to_string(),
                ai_failed: true,
            }
        }
    }
}
