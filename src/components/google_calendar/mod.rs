//! Google Calendar v3 client.
//!
//! Requests go through an actor that owns the HTTP client; callers use the
//! cloneable [`GoogleCalendarHandle`], which implements [`CalendarService`].

mod actor;
mod handle;
pub mod models;
pub mod service;

pub use handle::GoogleCalendarHandle;
pub use models::{CalendarEvent, EventDateTime};
pub use service::{CalendarService, Credential, ListQuery};
