//! Language-understanding providers that turn a prompt into operation requests.

mod gemini;
mod openai;
pub mod tools;

pub use gemini::GeminiExtractor;
pub use openai::OpenAiExtractor;

use crate::components::assistant::RawOperation;
use crate::config::{Config, IntentProvider};
use crate::error::AppResult;
use crate::utils::time::{local_clock, LocalClock};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::info;

/// Date and time facts the model needs to resolve words like "tomorrow"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptContext {
    pub clock: LocalClock,
}

impl PromptContext {
    pub fn new(now: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            clock: local_clock(now, timezone),
        }
    }
}

/// What the model made of a prompt
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// Conversational reply, no calendar action
    Text(String),
    /// Calendar operations in the order the model emitted them
    Operations(Vec<RawOperation>),
}

/// A language-understanding backend
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    async fn extract(&self, prompt: &str, context: &PromptContext) -> AppResult<Extraction>;
}

/// Build the extractor selected in the config
pub fn extractor_from_config(config: &Config) -> AppResult<Arc<dyn IntentExtractor>> {
    let extractor: Arc<dyn IntentExtractor> = match config.intent_provider {
        IntentProvider::Gemini => {
            info!("Using Gemini model: {}", config.gemini_model);
            Arc::new(GeminiExtractor::new(
                &config.gemini_base_url,
                &config.gemini_model,
                &config.gemini_api_key,
            ))
        }
        IntentProvider::OpenAi => {
            info!("Using OpenAI-compatible model: {}", config.openai_model);
            Arc::new(OpenAiExtractor::new(
                &config.openai_base_url,
                &config.openai_model,
                &config.openai_api_key,
            ))
        }
    };

    Ok(extractor)
}
