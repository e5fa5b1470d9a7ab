use crate::error::{validation_error, AppResult, Error};
use crate::utils::time::{event_instant, parse_date, parse_event_datetime, parse_time_bound, parse_timezone};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Hard cap on a single listing, as enforced by the Calendar API
pub const MAX_LIST_RESULTS: u32 = 250;
/// Longest search window accepted when no date is given
pub const MAX_LOOK_AHEAD_DAYS: u32 = 365;

/// One operation as emitted by a language-understanding provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOperation {
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl RawOperation {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        let args = match args {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Operation kinds understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    List,
    Create,
    Update,
    Delete,
    FindByQuery,
}

impl OperationKind {
    /// Tool name the language model calls for this kind
    pub fn tool_name(self) -> &'static str {
        match self {
            OperationKind::List => "listEvents",
            OperationKind::Create => "createEvent",
            OperationKind::Update => "updateEvent",
            OperationKind::Delete => "deleteEvent",
            OperationKind::FindByQuery => "findEvents",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        match name {
            "listEvents" => Some(OperationKind::List),
            "createEvent" => Some(OperationKind::Create),
            "updateEvent" => Some(OperationKind::Update),
            "deleteEvent" => Some(OperationKind::Delete),
            "findEvents" => Some(OperationKind::FindByQuery),
            _ => None,
        }
    }
}

/// Values that fill in what a request leaves unspecified
#[derive(Debug, Clone, Copy)]
pub struct RequestDefaults {
    /// Caller's zone, or the configured default when the caller sent none
    pub user_timezone: Option<Tz>,
    pub max_look_ahead_days: u32,
    pub list_max_results: u32,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            user_timezone: None,
            max_look_ahead_days: 30,
            list_max_results: 10,
        }
    }
}

/// Free-text and/or date description of an event whose id is unknown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    pub query: Option<String>,
    pub date: Option<NaiveDate>,
    pub max_look_ahead_days: u32,
}

/// How an update or delete names its target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRef {
    Id(String),
    Lookup(LookupQuery),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListRequest {
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
    pub max_results: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub color_id: Option<String>,
    pub start_date_time: String,
    pub end_date_time: String,
    pub time_zone: String,
}

/// Fields an update wants to change; `None` means "leave as is"
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventPatch {
    pub id: Option<String>,
    pub etag: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub color_id: Option<String>,
    pub start_date_time: Option<String>,
    pub end_date_time: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// `None` when the request relies on an earlier search in the same batch
    pub target: Option<EventRef>,
    pub patch: EventPatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    pub target: Option<EventRef>,
}

/// A validated operation request
#[derive(Debug, Clone, PartialEq)]
pub enum OperationRequest {
    List(ListRequest),
    Create(CreateRequest),
    Update(UpdateRequest),
    Delete(DeleteRequest),
    FindByQuery(LookupQuery),
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::List(_) => OperationKind::List,
            OperationRequest::Create(_) => OperationKind::Create,
            OperationRequest::Update(_) => OperationKind::Update,
            OperationRequest::Delete(_) => OperationKind::Delete,
            OperationRequest::FindByQuery(_) => OperationKind::FindByQuery,
        }
    }

    /// Update or delete that names neither an event id nor a search of its own
    pub fn lacks_target(&self) -> bool {
        match self {
            OperationRequest::Update(update) => update.target.is_none(),
            OperationRequest::Delete(delete) => delete.target.is_none(),
            _ => false,
        }
    }

    /// Validate a provider payload into a typed request
    pub fn parse(raw: &RawOperation, defaults: &RequestDefaults) -> AppResult<Self> {
        let kind = OperationKind::from_tool_name(raw.name.trim())
            .ok_or_else(|| Error::UnsupportedOperation(raw.name.clone()))?;
        let args = Args(&raw.args);

        match kind {
            OperationKind::List => parse_list(&args, defaults).map(OperationRequest::List),
            OperationKind::Create => parse_create(&args, defaults).map(OperationRequest::Create),
            OperationKind::Update => Ok(OperationRequest::Update(UpdateRequest {
                target: parse_target(&args, defaults)?,
                patch: parse_patch(&args, defaults)?,
            })),
            OperationKind::Delete => Ok(OperationRequest::Delete(DeleteRequest {
                target: parse_target(&args, defaults)?,
            })),
            OperationKind::FindByQuery => {
                let lookup = parse_lookup(&args, defaults)?;
                if lookup.query.is_none() && lookup.date.is_none() {
                    return Err(validation_error("A search needs a query (q) or a date"));
                }
                Ok(OperationRequest::FindByQuery(lookup))
            }
        }
    }
}

/// Read-only view over loosely typed tool-call arguments
struct Args<'a>(&'a Map<String, Value>);

impl Args<'_> {
    /// String argument with surrounding whitespace removed; empty strings are kept
    fn text(&self, key: &str) -> AppResult<Option<String>> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(_) => Err(validation_error(&format!("{} must be a string", key))),
        }
    }

    /// String argument where an empty value counts as absent
    fn non_empty(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.text(key)?.filter(|s| !s.is_empty()))
    }

    /// Integer argument, tolerating numbers sent as floats or strings
    fn integer(&self, key: &str) -> AppResult<Option<i64>> {
        let invalid = || validation_error(&format!("{} must be an integer", key));
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => Ok(Some(i)),
                None => n
                    .as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| Some(f as i64))
                    .ok_or_else(invalid),
            },
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| invalid()),
            Some(_) => Err(invalid()),
        }
    }
}

fn clamp(value: Option<i64>, default: u32, max: u32) -> u32 {
    match value {
        Some(v) => v.clamp(1, i64::from(max)) as u32,
        None => default.clamp(1, max),
    }
}

fn parse_list(args: &Args<'_>, defaults: &RequestDefaults) -> AppResult<ListRequest> {
    let tz = defaults.user_timezone.unwrap_or(chrono_tz::UTC);
    let time_min = args
        .non_empty("timeMin")?
        .map(|v| parse_time_bound(&v, tz))
        .transpose()?;
    let time_max = args
        .non_empty("timeMax")?
        .map(|v| parse_time_bound(&v, tz))
        .transpose()?;

    if let (Some(min), Some(max)) = (time_min, time_max) {
        if max < min {
            return Err(validation_error("timeMax must not be earlier than timeMin"));
        }
    }

    Ok(ListRequest {
        time_min,
        time_max,
        max_results: clamp(
            args.integer("maxResults")?,
            defaults.list_max_results,
            MAX_LIST_RESULTS,
        ),
    })
}

fn parse_create(args: &Args<'_>, defaults: &RequestDefaults) -> AppResult<CreateRequest> {
    let summary = args
        .non_empty("summary")?
        .ok_or_else(|| validation_error("Missing required field: summary"))?;
    let start_date_time = args
        .non_empty("startDateTime")?
        .ok_or_else(|| validation_error("Missing required field: startDateTime"))?;
    let end_date_time = args
        .non_empty("endDateTime")?
        .ok_or_else(|| validation_error("Missing required field: endDateTime"))?;

    let tz = match args.non_empty("timeZone")? {
        Some(tz) => parse_timezone(&tz)?,
        None => defaults
            .user_timezone
            .ok_or_else(|| validation_error("Missing required field: timeZone"))?,
    };

    check_order(&start_date_time, &end_date_time, tz)?;

    Ok(CreateRequest {
        summary,
        description: args.non_empty("description")?,
        location: args.non_empty("location")?,
        color_id: parse_color(args.non_empty("colorId")?)?,
        start_date_time,
        end_date_time,
        time_zone: tz.name().to_string(),
    })
}

fn parse_lookup(args: &Args<'_>, defaults: &RequestDefaults) -> AppResult<LookupQuery> {
    Ok(LookupQuery {
        query: args.non_empty("q")?,
        date: args.non_empty("date")?.map(|d| parse_date(&d)).transpose()?,
        max_look_ahead_days: clamp(
            args.integer("maxLookAheadDays")?,
            defaults.max_look_ahead_days,
            MAX_LOOK_AHEAD_DAYS,
        ),
    })
}

fn parse_target(args: &Args<'_>, defaults: &RequestDefaults) -> AppResult<Option<EventRef>> {
    if let Some(id) = args.non_empty("eventId")? {
        return Ok(Some(EventRef::Id(id)));
    }
    let lookup = parse_lookup(args, defaults)?;
    if lookup.query.is_none() && lookup.date.is_none() {
        return Ok(None);
    }
    Ok(Some(EventRef::Lookup(lookup)))
}

fn parse_patch(args: &Args<'_>, defaults: &RequestDefaults) -> AppResult<EventPatch> {
    let start_date_time = args.non_empty("startDateTime")?;
    let end_date_time = args.non_empty("endDateTime")?;
    if let Some(start) = &start_date_time {
        parse_event_datetime(start)?;
    }
    if let Some(end) = &end_date_time {
        parse_event_datetime(end)?;
    }

    let tz = args
        .non_empty("timeZone")?
        .map(|tz| parse_timezone(&tz))
        .transpose()?;
    if let (Some(start), Some(end)) = (&start_date_time, &end_date_time) {
        let order_tz = tz.or(defaults.user_timezone).unwrap_or(chrono_tz::UTC);
        check_order(start, end, order_tz)?;
    }
    let time_zone = tz.map(|tz| tz.name().to_string());

    let color_id = match args.text("colorId")? {
        Some(color) if color.is_empty() => Some(color),
        other => parse_color(other)?,
    };

    Ok(EventPatch {
        id: args.non_empty("id")?,
        etag: args.non_empty("etag")?,
        summary: args.text("summary")?,
        description: args.text("description")?,
        location: args.text("location")?,
        color_id,
        start_date_time,
        end_date_time,
        time_zone,
    })
}

fn parse_color(color: Option<String>) -> AppResult<Option<String>> {
    match color {
        None => Ok(None),
        Some(c) => match c.parse::<u8>() {
            Ok(n) if (1..=11).contains(&n) => Ok(Some(n.to_string())),
            _ => Err(validation_error(&format!(
                "Invalid colorId '{}', expected a value from 1 to 11",
                c
            ))),
        },
    }
}

fn check_order(start: &str, end: &str, tz: Tz) -> AppResult<()> {
    let start_at = event_instant(start, tz)?;
    let end_at = event_instant(end, tz)?;
    if end_at < start_at {
        return Err(validation_error("endDateTime must not be earlier than startDateTime"));
    }
    Ok(())
}
