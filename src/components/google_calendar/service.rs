use super::models::CalendarEvent;
use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

/// OAuth access token of the user whose calendar is being operated on
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Parameters of an event listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub time_min: DateTime<Utc>,
    pub time_max: Option<DateTime<Utc>>,
    pub max_results: u32,
    /// Free-text search handled by the service itself
    pub query: Option<String>,
}

/// Remote calendar operations the assistant depends on
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// List single events ordered by start time
    async fn list(&self, credential: &Credential, query: ListQuery) -> AppResult<Vec<CalendarEvent>>;

    /// Fetch one event by id
    async fn get(&self, credential: &Credential, event_id: &str) -> AppResult<CalendarEvent>;

    /// Create an event
    async fn insert(&self, credential: &Credential, event: CalendarEvent) -> AppResult<CalendarEvent>;

    /// Replace an event with a full body
    async fn update(
        &self,
        credential: &Credential,
        event_id: &str,
        event: CalendarEvent,
    ) -> AppResult<CalendarEvent>;

    /// Delete an event
    async fn delete(&self, credential: &Credential, event_id: &str) -> AppResult<()>;
}
