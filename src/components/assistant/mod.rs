//! Natural-language calendar command resolution and execution.
//!
//! A prompt flows through the configured [`IntentExtractor`], the resulting
//! operations are validated and run by the [`Dispatcher`], and the per-request
//! outcomes are shaped into a [`DispatchResponse`].

pub mod context;
pub mod dispatcher;
pub mod locator;
pub mod merge;
pub mod request;
pub mod result;

pub use context::DispatchContext;
pub use dispatcher::{DispatchSettings, Dispatcher};
pub use locator::{EventLocator, Resolution};
pub use merge::{check_boundaries, merge_for_update};
pub use request::{EventPatch, EventRef, LookupQuery, OperationKind, OperationRequest, RawOperation};
pub use result::{normalize, Candidate, DispatchResponse, OperationResult};

use crate::components::google_calendar::Credential;
use crate::components::intent::{Extraction, IntentExtractor, PromptContext};
use crate::error::{validation_error, AppResult};
use crate::utils::time::parse_timezone;
use chrono::Utc;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info};

/// Entry point used by the HTTP layer: prompt in, response envelope out
#[derive(Clone)]
pub struct Assistant {
    extractor: Arc<dyn IntentExtractor>,
    dispatcher: Dispatcher,
    default_timezone: Tz,
}

impl Assistant {
    pub fn new(extractor: Arc<dyn IntentExtractor>, dispatcher: Dispatcher, default_timezone: Tz) -> Self {
        Self {
            extractor,
            dispatcher,
            default_timezone,
        }
    }

    /// Interpret a prompt and carry out the calendar operations it asks for
    pub async fn handle_prompt(
        &self,
        prompt: &str,
        credential: Credential,
        timezone: Option<&str>,
    ) -> AppResult<DispatchResponse> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(validation_error("Prompt is required"));
        }

        let user_timezone = timezone
            .map(str::trim)
            .filter(|tz| !tz.is_empty())
            .map(parse_timezone)
            .transpose()?;
        let local = user_timezone.unwrap_or(self.default_timezone);
        info!("Handling prompt for timezone {}", local.name());

        let context = PromptContext::new(Utc::now(), local);
        match self.extractor.extract(prompt, &context).await? {
            Extraction::Text(message) => {
                debug!("No calendar operations requested");
                Ok(DispatchResponse::Single(OperationResult::text(message)))
            }
            Extraction::Operations(operations) => {
                debug!("Extracted operations: {:?}", operations);
                self.dispatcher
                    .dispatch(&operations, credential, user_timezone)
                    .await
            }
        }
    }
}
