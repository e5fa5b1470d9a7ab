use super::request::EventPatch;
use crate::components::google_calendar::{CalendarEvent, EventDateTime};
use crate::error::{validation_error, AppResult};

/// Zone used when neither the patch, the caller nor the event names one
pub const FALLBACK_TIMEZONE: &str = "UTC";

/// Build the full replacement body for an update.
///
/// Only fields present in `patch` change. Identity (`id`, `etag`) always comes
/// from `existing`. A touched start or end is replaced as a whole, with its
/// zone taken from the patch, then the caller, then the existing boundary.
pub fn merge_for_update(
    existing: &CalendarEvent,
    patch: &EventPatch,
    fallback_timezone: Option<&str>,
) -> CalendarEvent {
    let mut merged = existing.clone();

    if let Some(summary) = &patch.summary {
        merged.summary = Some(summary.clone());
    }
    if let Some(description) = &patch.description {
        merged.description = Some(description.clone());
    }
    if let Some(location) = &patch.location {
        merged.location = Some(location.clone());
    }
    if let Some(color_id) = &patch.color_id {
        merged.color_id = Some(color_id.clone());
    }

    if let Some(start) = &patch.start_date_time {
        let zone = pick_timezone(patch, fallback_timezone, existing.start.as_ref());
        merged.start = Some(EventDateTime::timed(start.clone(), zone));
    }
    if let Some(end) = &patch.end_date_time {
        let zone = pick_timezone(patch, fallback_timezone, existing.end.as_ref());
        merged.end = Some(EventDateTime::timed(end.clone(), zone));
    }

    merged.id = existing.id.clone();
    merged.etag = existing.etag.clone();
    merged
}

/// Reject a patch that would leave one boundary all-day and the other timed.
pub fn check_boundaries(existing: &CalendarEvent, patch: &EventPatch) -> AppResult<()> {
    let untouched = match (&patch.start_date_time, &patch.end_date_time) {
        (Some(_), None) => existing.end.as_ref(),
        (None, Some(_)) => existing.start.as_ref(),
        _ => return Ok(()),
    };
    if untouched.is_some_and(is_all_day) {
        return Err(validation_error(
            "Both startDateTime and endDateTime are needed to change an all-day event",
        ));
    }
    Ok(())
}

fn is_all_day(boundary: &EventDateTime) -> bool {
    boundary.date.is_some() && boundary.date_time.is_none()
}

fn pick_timezone(patch: &EventPatch, fallback: Option<&str>, current: Option<&EventDateTime>) -> String {
    patch
        .time_zone
        .as_deref()
        .or(fallback)
        .or_else(|| current.and_then(|b| b.time_zone.as_deref()))
        .unwrap_or(FALLBACK_TIMEZONE)
        .to_string()
}
