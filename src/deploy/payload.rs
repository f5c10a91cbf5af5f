/// Embedded script payloads for the remote sandbox
///
/// The engine's code nodes run these as JavaScript; this module only
/// renders them as strings. The retry payload is generated from the same
/// `RetryPolicy` and transport settings the native delivery unit runs with,
/// so the deployed graph and the local component can never drift apart on
/// schedule or endpoint.

use crate::config::TransportConfig;
use crate::delivery::extract::FALLBACK_TEXT;
use crate::delivery::RetryPolicy;

/// The retry-send node body: sequential attempts, backoff with floor reuse,
/// 4xx short-circuit, outcome fields for the routing node downstream.
pub fn send_with_retry(transport: &TransportConfig, policy: &RetryPolicy) -> String {
    let delays = policy
        .backoff_delays_ms
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    let floor = policy
        .backoff_delays_ms
        .last()
        .copied()
        .unwrap_or(RetryPolicy::FLOOR_DELAY_MS);

    format!(
        r#"// Send response with exponential backoff retry
const userContext = $node["Set_User_Context"].json;
const aiResponse = $node["Extract_AI_Response"].json;

const transportUrl = '{url}';
const transportApiKey = '{api_key}';
const payload = {{
  session: userContext.session || 'default',
  chatId: userContext.fromNumber,
  text: aiResponse.responseText
}};

const maxRetries = {max_retries};
const backoffDelays = [{delays}];
let lastError = null;
let retryCount = 0;
const helpers = this.helpers;

for (let attempt = 0; attempt <= maxRetries; attempt++) {{
  if (attempt > 0) {{
    await new Promise(r => setTimeout(r, backoffDelays[attempt - 1] || {floor}));
  }}
  try {{
    const response = await helpers.httpRequest({{
      method: 'POST',
      url: transportUrl,
      headers: {{
        'Content-Type': 'application/json',
        'X-Api-Key': transportApiKey
      }},
      body: payload,
      json: true,
      timeout: {timeout}
    }});

    // Success - httpRequest returns parsed JSON directly
    const transportMessageId = response.id || response.messageId || null;
    return [{{
      json: {{
        ...userContext,
        responseText: aiResponse.responseText,
        sent: true,
        retryCount: attempt,
        transportMessageId,
        errorReason: null
      }}
    }}];
  }} catch (error) {{
    lastError = error.message || String(error);
    retryCount = attempt + 1;
    // Don't retry 4xx client errors
    const statusCode = error.statusCode || error.httpCode || 0;
    if (statusCode >= 400 && statusCode < 500) {{
      break;
    }}
  }}
}}

// All retries exhausted
return [{{
  json: {{
    ...userContext,
    responseText: aiResponse.responseText,
    sent: false,
    retryCount,
    transportMessageId: null,
    errorReason: lastError
  }}
}}];"#,
        url = transport.url,
        api_key = transport.api_key,
        max_retries = policy.max_retries,
        delays = delays,
        floor = floor,
        timeout = transport.timeout_ms,
    )
}

/// The extraction node body: same two-field probe and fixed apology the
/// native `extract_response_text` implements.
pub fn extract_ai_response() -> String {
    format!(
        r#"// Extract AI response with error fallback
const items = $input.all();
const item = items[0];

let responseText = '';
let aiFailed = false;

try {{
  responseText = item.json.text || item.json.response || '';
  if (!responseText || responseText.trim() === '') {{
    throw new Error('Empty AI response');
  }}
}} catch (e) {{
  aiFailed = true;
  responseText = "{fallback}";
}}

const userContext = $node["Set_User_Context"].json;

return [{{
  json: {{
    responseText,
    aiFailed,
    session: userContext.session || 'default',
    chatId: userContext.fromNumber
  }}
}}];"#,
        fallback = FALLBACK_TEXT,
    )
}

/// Failure-branch shaping for the failed_messages insert
pub fn prepare_failed_message(policy: &RetryPolicy) -> String {
    format!(
        r#"// Prepare data for failed_messages table insert
const items = $input.all();
const item = items[0].json;

return [{{
  json: {{
    chat_id: item.fromNumber,
    user_id: item.userId || null,
    message_payload: JSON.stringify({{
      session: item.session,
      chatId: item.fromNumber,
      userMessage: item.messageBody
    }}),
    response_text: item.responseText,
    failure_reason: item.errorReason || 'Unknown error after retries',
    retry_count: item.retryCount || {max_retries},
    last_retry_at: new Date().toISOString()
  }}
}}];"#,
        max_retries = policy.max_retries,
    )
}

/// Failure-branch execution log entry
pub fn build_error_log(workflow_name: &str) -> String {
    format!(
        r#"// Build execution log entry for failed sends
const items = $input.all();
const userContext = $node["Set_User_Context"].json;
const sendResult = $node["Send_With_Retry"].json;
const faqData = $node["Merge_History_Context"].json;

for (const item of items) {{
  item.json = {{
    execution_id: $execution.id,
    workflow_name: '{workflow_name}',
    chat_id: userContext.fromNumber,
    user_id: userContext.userId || null,
    phone_number: userContext.fromNumber,
    status: 'failed_after_retries',
    execution_data: JSON.stringify({{
      isKnownUser: userContext.isKnownUser,
      userName: userContext.userName,
      userPreferredLanguage: userContext.userPreferredLanguage,
      faqLoaded: faqData.faqLoaded,
      historyCount: faqData.historyCount,
      retryCount: sendResult.retryCount,
      errorReason: sendResult.errorReason,
      executionTime: new Date().toISOString()
    }})
  }};
}}
return items;"#,
        workflow_name = workflow_name,
    )
}

/// Success-path execution log entry with retry metrics
pub fn build_execution_log(workflow_name: &str) -> String {
    format!(
        r#"// Build execution log object with retry info
const items = $input.all();
const userContext = $node["Set_User_Context"].json;
const faqData = $node["Merge_History_Context"].json;
const aiResponse = $node["Extract_AI_Response"].json;
const sendResult = $node["Send_With_Retry"].json;

for (const item of items) {{
  item.json = {{
    execution_id: $execution.id,
    workflow_name: '{workflow_name}',
    chat_id: userContext.fromNumber,
    user_id: userContext.userId || null,
    phone_number: userContext.fromNumber,
    status: 'success',
    execution_data: JSON.stringify({{
      isKnownUser: userContext.isKnownUser,
      userName: userContext.userName,
      userPreferredLanguage: userContext.userPreferredLanguage,
      faqLoaded: faqData.faqLoaded,
      historyCount: faqData.historyCount,
      messageLength: userContext.messageBody ? userContext.messageBody.length : 0,
      responseLength: aiResponse.responseText ? aiResponse.responseText.length : 0,
      aiFailed: aiResponse.aiFailed || false,
      retryCount: sendResult.retryCount || 0,
      transportMessageId: sendResult.transportMessageId || null,
      executionTime: new Date().toISOString()
    }})
  }};
}}
return items;"#,
        workflow_name = workflow_name,
    )
}

/// Conversation-row shaping with the delivery result's sent flag
pub fn prepare_store_data() -> String {
    r#"// Prepare data for DB_Store_Conversation
const items = $input.all();
const userContext = $node["Set_User_Context"].json;
const aiResponse = $node["Extract_AI_Response"].json;
const sendResult = $node["Send_With_Retry"].json;

for (const item of items) {
  item.json = {
    chat_id: userContext.fromNumber,
    user_id: userContext.userId || null,
    user_message: userContext.messageBody,
    bot_response: aiResponse.responseText,
    detected_language: 'en',
    faq_matched: true,
    sent: sendResult.sent || false
  };
}
return items;"#
        .to_string()
}

/// Diagnostic body reporting which HTTP helpers the remote sandbox exposes
///
/// Temporarily swapped into the send node when a rollout misbehaves; the
/// findings come back through the normal failure-branch errorReason field.
pub fn sandbox_probe() -> String {
    r#"// Diagnostic: report available HTTP methods in the sandbox
const available = [];

try {
  const helperKeys = Object.keys(this.helpers).sort();
  available.push('this.helpers keys: ' + helperKeys.join(','));
} catch (e) {
  available.push('this.helpers keys error: ' + e.message);
}

try {
  available.push('this.helpers.httpRequest: ' + typeof this.helpers.httpRequest);
} catch (e) {
  available.push('this.helpers.httpRequest error: ' + e.message);
}

try {
  available.push('this.helpers.request: ' + typeof this.helpers.request);
} catch (e) {
  available.push('this.helpers.request error: ' + e.message);
}

try {
  const http = require('http');
  available.push('require(http): ' + typeof http);
  available.push('http.request: ' + typeof http.request);
} catch (e) {
  available.push('require(http) error: ' + e.message);
}

const userContext = $node["Set_User_Context"].json;
const aiResponse = $node["Extract_AI_Response"].json;

return [{
  json: {
    ...userContext,
    responseText: aiResponse.responseText,
    sent: false,
    retryCount: 0,
    transportMessageId: null,
    errorReason: 'DIAG: ' + available.join(' | ')
  }
}];"#
        .to_string()
}
