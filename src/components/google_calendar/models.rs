use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Start or end of a calendar event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// All-day events carry a date instead of a date-time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    /// Timed boundary in an explicit zone
    pub fn timed(date_time: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.into()),
            date: None,
            time_zone: Some(time_zone.into()),
        }
    }
}

/// Calendar event as exchanged with the Google Calendar API.
///
/// Fields the assistant does not work with (attendees, reminders, recurrence
/// and so on) are carried in `extra` so that a full replacement update sends
/// them back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Concurrency token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CalendarEvent {
    /// Start as reported by the service, date-time preferred over all-day date
    pub fn start_label(&self) -> Option<String> {
        boundary_label(self.start.as_ref())
    }

    /// End as reported by the service, date-time preferred over all-day date
    pub fn end_label(&self) -> Option<String> {
        boundary_label(self.end.as_ref())
    }
}

fn boundary_label(boundary: Option<&EventDateTime>) -> Option<String> {
    boundary.and_then(|b| b.date_time.clone().or_else(|| b.date.clone()))
}
