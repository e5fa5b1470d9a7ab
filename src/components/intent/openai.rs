use super::tools::{system_instruction, to_openai_tools, tool_declarations};
use super::{Extraction, IntentExtractor, PromptContext};
use crate::components::assistant::RawOperation;
use crate::error::{intent_error, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info};

/// OpenAI-compatible Chat Completions endpoint with tool calling
pub struct OpenAiExtractor {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl OpenAiExtractor {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn request_body(&self, prompt: &str, context: &PromptContext) -> Value {
        json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_instruction(context)},
                {"role": "user", "content": prompt}
            ],
            "tools": to_openai_tools(&tool_declarations()),
        })
    }
}

#[async_trait]
impl IntentExtractor for OpenAiExtractor {
    async fn extract(&self, prompt: &str, context: &PromptContext) -> AppResult<Extraction> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, context))
            .send()
            .await
            .map_err(|e| intent_error(&format!("Chat completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            error!("Chat completion request failed: HTTP {} - {}", status, error_body);
            return Err(intent_error(&format!("Chat completion request failed: HTTP {}", status)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| intent_error(&format!("Failed to parse chat completion: {}", e)))?;

        info!("Received chat completion");
        extraction_from_message(&body["choices"][0]["message"])
    }
}

/// Parse tool calls (arguments arrive as a JSON string) or fall back to content
fn extraction_from_message(message: &Value) -> AppResult<Extraction> {
    if message.is_null() {
        return Err(intent_error("Chat completion has no choices"));
    }

    let mut operations = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let name = call["function"]["name"]
                .as_str()
                .ok_or_else(|| intent_error("Tool call without a function name"))?;
            let args_str = call["function"]["arguments"].as_str().unwrap_or("{}");
            let args: Value = serde_json::from_str(args_str)
                .map_err(|e| intent_error(&format!("Invalid tool call arguments for {}: {}", name, e)))?;
            operations.push(RawOperation::new(name, args));
        }
    }

    if !operations.is_empty() {
        debug!("Tool calls received: {:?}", operations);
        return Ok(Extraction::Operations(operations));
    }

    match message["content"].as_str().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(Extraction::Text(text.to_string())),
        _ => Ok(Extraction::Text(t!("empty_reply").to_string())),
    }
}
