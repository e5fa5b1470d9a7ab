use super::context::{DispatchContext, ResolvedIdSlot};
use super::locator::{EventLocator, Resolution};
use super::merge::{check_boundaries, merge_for_update};
use super::request::{
    CreateRequest, EventRef, ListRequest, LookupQuery, OperationKind, OperationRequest, RawOperation,
    RequestDefaults, UpdateRequest,
};
use super::result::{normalize, Candidate, DispatchResponse, OperationResult};
use crate::components::google_calendar::{
    CalendarEvent, CalendarService, Credential, EventDateTime, ListQuery,
};
use crate::config::Config;
use crate::error::{validation_error, AppResult};
use crate::utils::time::parse_timezone;
use chrono::Utc;
use chrono_tz::Tz;
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Part a request plays in the id hand-off of its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Independent,
    /// Search whose single match is cached for a later step
    Publisher,
    /// Update/delete without an id that reads the cached match
    Consumer,
}

/// Which mutation a resolution is for; selects the user-facing wording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mutation {
    Update,
    Delete,
}

impl Mutation {
    fn not_found(self) -> String {
        match self {
            Mutation::Update => t!("update_not_found").to_string(),
            Mutation::Delete => t!("delete_not_found").to_string(),
        }
    }

    fn ambiguous(self) -> String {
        match self {
            Mutation::Update => t!("update_ambiguous").to_string(),
            Mutation::Delete => t!("delete_ambiguous").to_string(),
        }
    }

    fn unresolved(self) -> String {
        match self {
            Mutation::Update => t!("update_unresolved").to_string(),
            Mutation::Delete => t!("delete_unresolved").to_string(),
        }
    }
}

/// Outcome of the resolving phase of an update or delete
enum Target {
    Resolved(String),
    /// Lifecycle ended without a mutation
    Settled(OperationResult),
}

/// Tunables applied to every batch
#[derive(Debug, Clone, Copy)]
pub struct DispatchSettings {
    pub max_look_ahead_days: u32,
    pub list_max_results: u32,
    /// Zone for search days, list bounds and new events when the caller sent none
    pub default_timezone: Tz,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_look_ahead_days: 30,
            list_max_results: 10,
            default_timezone: chrono_tz::UTC,
        }
    }
}

impl From<&Config> for DispatchSettings {
    fn from(config: &Config) -> Self {
        // Config::validate has already rejected unknown zones
        let default_timezone = parse_timezone(&config.default_timezone).unwrap_or(chrono_tz::UTC);
        Self {
            max_look_ahead_days: config.max_look_ahead_days,
            list_max_results: config.list_default_max_results,
            default_timezone,
        }
    }
}

/// Executes batches of operation requests against a calendar service
#[derive(Clone)]
pub struct Dispatcher {
    calendar: Arc<dyn CalendarService>,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(calendar: Arc<dyn CalendarService>, settings: DispatchSettings) -> Self {
        Self { calendar, settings }
    }

    /// Run one batch.
    ///
    /// Every request is validated before anything is sent to the calendar.
    /// Independent requests run concurrently; an update or delete naming no
    /// target takes its id from the nearest search before it. Any
    /// error aborts the whole batch.
    ///
    /// `user_timezone` is the zone the caller sent, not the configured default.
    pub async fn dispatch(
        &self,
        operations: &[RawOperation],
        credential: Credential,
        user_timezone: Option<Tz>,
    ) -> AppResult<DispatchResponse> {
        let defaults = RequestDefaults {
            user_timezone: Some(user_timezone.unwrap_or(self.settings.default_timezone)),
            max_look_ahead_days: self.settings.max_look_ahead_days,
            list_max_results: self.settings.list_max_results,
        };

        let requests = operations
            .iter()
            .map(|raw| OperationRequest::parse(raw, &defaults))
            .collect::<AppResult<Vec<_>>>()?;

        let roles = plan(&requests)?;
        let slot = if roles.contains(&Role::Publisher) {
            ResolvedIdSlot::armed()
        } else {
            ResolvedIdSlot::unused()
        };
        let ctx = DispatchContext::new(
            credential,
            user_timezone,
            self.settings.default_timezone,
            slot,
        );

        info!("Dispatching {} operation(s)", requests.len());

        let results = try_join_all(
            requests
                .iter()
                .zip(roles)
                .map(|(request, role)| self.execute(&ctx, request, role)),
        )
        .await?;

        Ok(normalize(results))
    }

    async fn execute(
        &self,
        ctx: &DispatchContext,
        request: &OperationRequest,
        role: Role,
    ) -> AppResult<OperationResult> {
        debug!("Executing {} as {:?}", request.kind().tool_name(), role);

        match request {
            OperationRequest::List(list) => self.list(ctx, list).await,
            OperationRequest::Create(create) => self.create(ctx, create).await,
            OperationRequest::FindByQuery(lookup) => self.find(ctx, lookup, role).await,
            OperationRequest::Update(update) => {
                match self.resolve(ctx, update.target.as_ref(), role, Mutation::Update).await? {
                    Target::Resolved(event_id) => self.update(ctx, &event_id, update).await,
                    Target::Settled(result) => Ok(result),
                }
            }
            OperationRequest::Delete(delete) => {
                match self.resolve(ctx, delete.target.as_ref(), role, Mutation::Delete).await? {
                    Target::Resolved(event_id) => self.delete(ctx, event_id).await,
                    Target::Settled(result) => Ok(result),
                }
            }
        }
    }

    async fn list(&self, ctx: &DispatchContext, list: &ListRequest) -> AppResult<OperationResult> {
        let events = self
            .calendar
            .list(
                &ctx.credential,
                ListQuery {
                    time_min: list.time_min.unwrap_or_else(Utc::now),
                    time_max: list.time_max,
                    max_results: list.max_results,
                    query: None,
                },
            )
            .await?;

        Ok(OperationResult::Events { events })
    }

    async fn create(&self, ctx: &DispatchContext, create: &CreateRequest) -> AppResult<OperationResult> {
        let event = CalendarEvent {
            summary: Some(create.summary.clone()),
            description: create.description.clone(),
            location: create.location.clone(),
            color_id: create.color_id.clone(),
            start: Some(EventDateTime::timed(create.start_date_time.clone(), create.time_zone.clone())),
            end: Some(EventDateTime::timed(create.end_date_time.clone(), create.time_zone.clone())),
            ..Default::default()
        };

        let created = self.calendar.insert(&ctx.credential, event).await?;
        info!("Event created successfully: {}", created.id);

        Ok(OperationResult::Event {
            event: created,
            message: t!("event_created").to_string(),
        })
    }

    async fn find(&self, ctx: &DispatchContext, lookup: &LookupQuery, role: Role) -> AppResult<OperationResult> {
        let candidates = EventLocator::new(self.calendar.as_ref())
            .find_candidates(&ctx.credential, lookup, ctx.local_timezone(), Utc::now())
            .await?;

        if role == Role::Publisher {
            let single = match candidates.as_slice() {
                [only] => Some(only.id.clone()),
                _ => None,
            };
            ctx.last_resolved_id.publish(single);
        }

        if candidates.is_empty() {
            return Ok(OperationResult::text(t!("search_not_found")));
        }

        Ok(OperationResult::SearchResults {
            message: t!("search_results", count = candidates.len()).to_string(),
            candidates: candidates.iter().map(Candidate::from).collect(),
        })
    }

    /// RESOLVING phase: turn the request's reference into exactly one id
    async fn resolve(
        &self,
        ctx: &DispatchContext,
        target: Option<&EventRef>,
        role: Role,
        mutation: Mutation,
    ) -> AppResult<Target> {
        if let Some(EventRef::Id(event_id)) = target {
            return Ok(Target::Resolved(event_id.clone()));
        }

        if role == Role::Consumer {
            if let Some(event_id) = ctx.last_resolved_id.take().await {
                debug!("Using event id {} from earlier search", event_id);
                return Ok(Target::Resolved(event_id));
            }
        }

        let lookup = match target {
            Some(EventRef::Lookup(lookup)) => lookup,
            _ => {
                warn!("No event could be resolved from the earlier search");
                return Ok(Target::Settled(OperationResult::text(mutation.unresolved())));
            }
        };

        let resolution = EventLocator::new(self.calendar.as_ref())
            .resolve(&ctx.credential, lookup, ctx.local_timezone(), Utc::now())
            .await?;

        Ok(match resolution {
            Resolution::Unique(event) => Target::Resolved(event.id),
            Resolution::NotFound => {
                debug!("No events matched {:?}", lookup);
                Target::Settled(OperationResult::text(mutation.not_found()))
            }
            Resolution::Ambiguous(events) => {
                debug!("{} events matched {:?}", events.len(), lookup);
                Target::Settled(OperationResult::Disambiguation {
                    message: mutation.ambiguous(),
                    candidates: events.iter().map(Candidate::from).collect(),
                })
            }
        })
    }

    async fn update(
        &self,
        ctx: &DispatchContext,
        event_id: &str,
        update: &UpdateRequest,
    ) -> AppResult<OperationResult> {
        let existing = self.calendar.get(&ctx.credential, event_id).await?;
        check_boundaries(&existing, &update.patch)?;
        let merged = merge_for_update(&existing, &update.patch, ctx.timezone_name());
        debug!("Updating event {} with merged body", event_id);

        let updated = self.calendar.update(&ctx.credential, event_id, merged).await?;
        info!("Event updated successfully: {}", updated.id);

        Ok(OperationResult::Event {
            event: updated,
            message: t!("event_updated").to_string(),
        })
    }

    async fn delete(&self, ctx: &DispatchContext, event_id: String) -> AppResult<OperationResult> {
        self.calendar.delete(&ctx.credential, &event_id).await?;
        info!("Event deleted successfully: {}", event_id);

        Ok(OperationResult::Success {
            message: t!("event_deleted").to_string(),
            deleted_event_id: Some(event_id),
        })
    }
}

/// Assign hand-off roles and reject updates/deletes that cannot be identified.
///
/// The first update or delete with neither an id nor a query/date consumes the
/// id published by the nearest search before it. Every other update or delete
/// must name its target itself.
fn plan(requests: &[OperationRequest]) -> AppResult<Vec<Role>> {
    let mut roles = vec![Role::Independent; requests.len()];

    let chain = requests
        .iter()
        .position(OperationRequest::lacks_target)
        .and_then(|consumer| {
            requests[..consumer]
                .iter()
                .rposition(|r| r.kind() == OperationKind::FindByQuery)
                .map(|publisher| (publisher, consumer))
        });

    if let Some((publisher, consumer)) = chain {
        roles[publisher] = Role::Publisher;
        roles[consumer] = Role::Consumer;
    }

    for (request, role) in requests.iter().zip(&roles) {
        if request.lacks_target() && *role != Role::Consumer {
            return Err(validation_error(
                "Either eventId or search criteria (q/date) must be provided",
            ));
        }
    }

    Ok(roles)
}
