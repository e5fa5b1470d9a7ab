use crate::components::google_calendar::CalendarEvent;
use serde::{Deserialize, Serialize};

/// Minimal view of a candidate event offered to the user for picking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub summary: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl From<&CalendarEvent> for Candidate {
    fn from(event: &CalendarEvent) -> Self {
        Self {
            id: event.id.clone(),
            summary: event.summary.clone(),
            start: event.start_label(),
            end: event.end_label(),
        }
    }
}

/// Outcome of one operation request, as returned to the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OperationResult {
    /// A created or updated event
    Event { event: CalendarEvent, message: String },
    /// Raw listing for display
    Events { events: Vec<CalendarEvent> },
    Success {
        message: String,
        #[serde(rename = "deletedEventId", default, skip_serializing_if = "Option::is_none")]
        deleted_event_id: Option<String>,
    },
    /// Plain message: conversational replies and soft failures such as "not found"
    Text { message: String },
    /// More than one event matched an update or delete
    Disambiguation { message: String, candidates: Vec<Candidate> },
    /// Matches of an explicit search
    SearchResults { message: String, candidates: Vec<Candidate> },
}

impl OperationResult {
    pub fn text(message: impl Into<String>) -> Self {
        OperationResult::Text {
            message: message.into(),
        }
    }
}

/// Response envelope: a bare result for single-operation batches, a list otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DispatchResponse {
    Single(OperationResult),
    Batch(Vec<OperationResult>),
}

impl DispatchResponse {
    /// Results in request order regardless of envelope shape
    pub fn into_results(self) -> Vec<OperationResult> {
        match self {
            DispatchResponse::Single(result) => vec![result],
            DispatchResponse::Batch(results) => results,
        }
    }
}

/// Shape per-request results into the caller-facing envelope.
///
/// A single result is unwrapped; anything else, including an empty batch, is
/// passed through in its original order.
pub fn normalize(mut results: Vec<OperationResult>) -> DispatchResponse {
    if results.len() == 1 {
        if let Some(result) = results.pop() {
            return DispatchResponse::Single(result);
        }
    }
    DispatchResponse::Batch(results)
}
