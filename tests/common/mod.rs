#![allow(dead_code)]

use async_trait::async_trait;
use calendar_pilot::components::google_calendar::{
    CalendarEvent, CalendarService, Credential, EventDateTime, ListQuery,
};
use calendar_pilot::components::intent::{Extraction, IntentExtractor, PromptContext};
use calendar_pilot::error::{google_calendar_error, AppResult};
use std::sync::Mutex;
use std::time::Duration;

/// One call received by the mock calendar
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(ListQuery),
    Get(String),
    Insert(CalendarEvent),
    Update(String, CalendarEvent),
    Delete(String),
}

/// In-memory calendar that records every call it receives
#[derive(Default)]
pub struct MockCalendar {
    events: Vec<CalendarEvent>,
    fail_with: Option<String>,
    list_delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
    finished: Mutex<Vec<Call>>,
}

impl MockCalendar {
    pub fn with_events(events: Vec<CalendarEvent>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    /// Every call fails with a backend error
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Default::default()
        }
    }

    /// Listings answer only after `delay`
    pub fn with_slow_list(events: Vec<CalendarEvent>, delay: Duration) -> Self {
        Self {
            events,
            list_delay: Some(delay),
            ..Default::default()
        }
    }

    /// Calls in the order they completed
    pub fn finished(&self) -> Vec<Call> {
        self.finished.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Insert(_) | Call::Update(..) | Call::Delete(_)))
            .collect()
    }

    fn finish(&self, call: Call) {
        self.finished.lock().unwrap().push(call);
    }

    fn record(&self, call: Call) -> AppResult<()> {
        self.calls.lock().unwrap().push(call);
        match &self.fail_with {
            Some(message) => Err(google_calendar_error(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CalendarService for MockCalendar {
    async fn list(&self, _credential: &Credential, query: ListQuery) -> AppResult<Vec<CalendarEvent>> {
        self.record(Call::List(query.clone()))?;
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        self.finish(Call::List(query.clone()));
        let needle = query.query.as_deref().map(str::to_lowercase);
        Ok(self
            .events
            .iter()
            .filter(|event| match &needle {
                Some(needle) => event
                    .summary
                    .as_deref()
                    .map(|s| s.to_lowercase().contains(needle))
                    .unwrap_or(false),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn get(&self, _credential: &Credential, event_id: &str) -> AppResult<CalendarEvent> {
        self.record(Call::Get(event_id.to_string()))?;
        self.events
            .iter()
            .find(|event| event.id == event_id)
            .cloned()
            .ok_or_else(|| google_calendar_error("Failed to fetch event: HTTP 404 Not Found"))
    }

    async fn insert(&self, _credential: &Credential, event: CalendarEvent) -> AppResult<CalendarEvent> {
        self.record(Call::Insert(event.clone()))?;
        Ok(CalendarEvent {
            id: "created-1".to_string(),
            ..event
        })
    }

    async fn update(
        &self,
        _credential: &Credential,
        event_id: &str,
        event: CalendarEvent,
    ) -> AppResult<CalendarEvent> {
        self.record(Call::Update(event_id.to_string(), event.clone()))?;
        Ok(event)
    }

    async fn delete(&self, _credential: &Credential, event_id: &str) -> AppResult<()> {
        self.record(Call::Delete(event_id.to_string()))?;
        self.finish(Call::Delete(event_id.to_string()));
        Ok(())
    }
}

/// Extractor that always answers with the same extraction
pub struct ScriptedExtractor(pub Extraction);

#[async_trait]
impl IntentExtractor for ScriptedExtractor {
    async fn extract(&self, _prompt: &str, _context: &PromptContext) -> AppResult<Extraction> {
        Ok(self.0.clone())
    }
}

pub fn timed_event(id: &str, summary: &str, start: &str, end: &str, tz: &str) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        etag: Some(format!("\"etag-{}\"", id)),
        summary: Some(summary.to_string()),
        start: Some(EventDateTime::timed(start, tz)),
        end: Some(EventDateTime::timed(end, tz)),
        ..Default::default()
    }
}

pub fn credential() -> Credential {
    Credential::new("test-token")
}
