use super::tools::{system_instruction, to_gemini_schema, tool_declarations};
use super::{Extraction, IntentExtractor, PromptContext};
use crate::components::assistant::RawOperation;
use crate::error::{intent_error, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info};

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

/// Google Gemini `generateContent` with function calling
pub struct GeminiExtractor {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiExtractor {
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn request_body(prompt: &str, context: &PromptContext) -> Value {
        let declarations: Vec<Value> = tool_declarations()
            .iter()
            .map(|declaration| {
                json!({
                    "name": declaration["name"],
                    "description": declaration["description"],
                    "parameters": to_gemini_schema(&declaration["parameters"]),
                })
            })
            .collect();

        json!({
            "systemInstruction": {"parts": [{"text": system_instruction(context)}]},
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "tools": [{"functionDeclarations": declarations}],
        })
    }
}

#[async_trait]
impl IntentExtractor for GeminiExtractor {
    async fn extract(&self, prompt: &str, context: &PromptContext) -> AppResult<Extraction> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(prompt, context))
            .send()
            .await
            .map_err(|e| intent_error(&format!("Gemini API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            error!("Gemini API request failed: HTTP {} - {}", status, error_body);
            return Err(intent_error(&format!("Gemini API request failed: HTTP {}", status)));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| intent_error(&format!("Failed to parse Gemini response: {}", e)))?;

        info!("Received response from Gemini");
        extraction_from_response(body)
    }
}

fn extraction_from_response(body: GenerateContentResponse) -> AppResult<Extraction> {
    let parts = body
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts)
        .ok_or_else(|| intent_error("Gemini response has no candidates"))?;

    let mut operations = Vec::new();
    let mut text = String::new();
    for part in parts {
        if let Some(call) = part.function_call {
            operations.push(RawOperation {
                name: call.name,
                args: call.args,
            });
        } else if let Some(t) = part.text {
            text.push_str(&t);
        }
    }

    if operations.is_empty() {
        debug!("No function calls, returning text response");
        let text = text.trim();
        if text.is_empty() {
            return Ok(Extraction::Text(t!("empty_reply").to_string()));
        }
        return Ok(Extraction::Text(text.to_string()));
    }

    debug!("Function calls received: {:?}", operations);
    Ok(Extraction::Operations(operations))
}
