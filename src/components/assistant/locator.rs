use super::request::LookupQuery;
use crate::components::google_calendar::{CalendarEvent, CalendarService, Credential, ListQuery};
use crate::error::AppResult;
use crate::utils::time::{day_window, look_ahead_window};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::debug;

/// Most candidates a single lookup returns
pub const MAX_CANDIDATES: u32 = 50;

/// What a lookup found
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    NotFound,
    Unique(CalendarEvent),
    Ambiguous(Vec<CalendarEvent>),
}

impl From<Vec<CalendarEvent>> for Resolution {
    fn from(mut candidates: Vec<CalendarEvent>) -> Self {
        match candidates.len() {
            0 => Resolution::NotFound,
            1 => match candidates.pop() {
                Some(event) => Resolution::Unique(event),
                None => Resolution::NotFound,
            },
            _ => Resolution::Ambiguous(candidates),
        }
    }
}

/// Finds events matching a description using the calendar's own search
pub struct EventLocator<'a> {
    calendar: &'a dyn CalendarService,
}

impl<'a> EventLocator<'a> {
    pub fn new(calendar: &'a dyn CalendarService) -> Self {
        Self { calendar }
    }

    /// Candidates ordered by start time, at most [`MAX_CANDIDATES`].
    ///
    /// A date narrows the search to that whole day in `timezone`; without one
    /// the search runs from `now` over the look-ahead window.
    pub async fn find_candidates(
        &self,
        credential: &Credential,
        lookup: &LookupQuery,
        timezone: Tz,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<CalendarEvent>> {
        let (time_min, time_max) = match lookup.date {
            Some(date) => day_window(date, timezone),
            None => look_ahead_window(now, lookup.max_look_ahead_days),
        };

        debug!(
            "Searching events q={:?} from {} to {}",
            lookup.query, time_min, time_max
        );

        let mut events = self
            .calendar
            .list(
                credential,
                ListQuery {
                    time_min,
                    time_max: Some(time_max),
                    max_results: MAX_CANDIDATES,
                    query: lookup.query.clone(),
                },
            )
            .await?;

        events.truncate(MAX_CANDIDATES as usize);
        debug!("Search found {} candidate(s)", events.len());

        Ok(events)
    }

    /// Search and classify the outcome
    pub async fn resolve(
        &self,
        credential: &Credential,
        lookup: &LookupQuery,
        timezone: Tz,
        now: DateTime<Utc>,
    ) -> AppResult<Resolution> {
        self.find_candidates(credential, lookup, timezone, now)
            .await
            .map(Resolution::from)
    }
}
