use super::PromptContext;
use crate::components::assistant::OperationKind;
use serde_json::{json, Value};

/// Calendar tool declarations in JSON Schema form
pub fn tool_declarations() -> Vec<Value> {
    let update_properties = json!({
        "eventId": {"type": "string", "description": "ID of the event to update"},
        "q": {"type": "string", "description": "free-text search to find the event when ID is unknown (summary, description, location, attendees)"},
        "date": {"type": "string", "description": "date of the event (YYYY-MM-DD) to narrow the search"},
        "summary": {"type": "string", "description": "Updated event title/summary"},
        "description": {"type": "string", "description": "Updated event description"},
        "location": {"type": "string", "description": "Updated event location"},
        "colorId": {"type": "string", "description": "Updated color ID, \"1\" to \"11\""},
        "startDateTime": {"type": "string", "description": "Updated start date and time in ISO 8601 format (YYYY-MM-DDTHH:mm:ss)"},
        "endDateTime": {"type": "string", "description": "Updated end date and time in ISO 8601 format (YYYY-MM-DDTHH:mm:ss)"},
        "timeZone": {"type": "string", "description": "IANA time zone identifier (e.g., America/New_York, Europe/London)"}
    });

    vec![
        json!({
            "name": OperationKind::List.tool_name(),
            "description": "list upcoming events from user primary google calendar",
            "parameters": {
                "type": "object",
                "properties": {
                    "maxResults": {"type": "integer", "description": "maximum number of events to retrieve"},
                    "timeMin": {"type": "string", "description": "RFC3339 timestamp to list events starting from (inclusive)"},
                    "timeMax": {"type": "string", "description": "RFC3339 timestamp to list events up to (inclusive)"}
                }
            }
        }),
        json!({
            "name": OperationKind::Create.tool_name(),
            "description": "create a new event in user primary google calendar",
            "parameters": {
                "type": "object",
                "properties": {
                    "summary": {"type": "string", "description": "Event title/summary"},
                    "description": {"type": "string", "description": "Event description"},
                    "colorId": {"type": "string", "description": "Color ID for the event (optional, Google Calendar color IDs range from \"1\" to \"11\")"},
                    "location": {"type": "string", "description": "Event location"},
                    "startDateTime": {"type": "string", "description": "Start date and time in ISO 8601 format (YYYY-MM-DDTHH:mm:ss)"},
                    "endDateTime": {"type": "string", "description": "End date and time in ISO 8601 format (YYYY-MM-DDTHH:mm:ss)"},
                    "timeZone": {"type": "string", "description": "IANA time zone identifier (e.g., America/New_York, Europe/London)"}
                },
                "required": ["summary", "startDateTime", "endDateTime", "timeZone"]
            }
        }),
        json!({
            "name": OperationKind::Update.tool_name(),
            "description": "update an existing event in user primary google calendar",
            "parameters": {"type": "object", "properties": update_properties}
        }),
        json!({
            "name": OperationKind::Delete.tool_name(),
            "description": "delete an event from user primary google calendar",
            "parameters": {
                "type": "object",
                "properties": {
                    "eventId": {"type": "string", "description": "ID of the event to delete"},
                    "q": {"type": "string", "description": "free-text search to find the event when ID is unknown (summary, description, location, attendees)"},
                    "date": {"type": "string", "description": "date of the event (YYYY-MM-DD) to narrow the search"}
                }
            }
        }),
        json!({
            "name": OperationKind::FindByQuery.tool_name(),
            "description": "search events in user primary google calendar by text and/or date",
            "parameters": {
                "type": "object",
                "properties": {
                    "q": {"type": "string", "description": "free-text search (summary, description, location, attendees)"},
                    "date": {"type": "string", "description": "date of the event (YYYY-MM-DD)"},
                    "maxLookAheadDays": {"type": "integer", "description": "days ahead to search when no date is given (default 30)"}
                }
            }
        }),
    ]
}

/// System instruction carrying the tool rules and the user's date context
pub fn system_instruction(context: &PromptContext) -> String {
    let clock = &context.clock;
    format!(
        "You are a calendar assistant for Google Calendar management.

TOOLS: listEvents, createEvent, updateEvent, deleteEvent, findEvents

RULES:
- list/show/get events → listEvents
- add/schedule/create → createEvent
- move/reschedule/change → updateEvent
- cancel/remove/delete → deleteEvent
- find/search/look up → findEvents
- greetings/small talk → plain text response

DATE CONTEXT:
- Today: {today}
- Current time: {now}
- Tomorrow: {tomorrow}
- Timezone: {tz}

EVENT STRUCTURE:
- summary (required for create), description, location (optional)
- colorId: 1-11 (optional)
- startDateTime/endDateTime: YYYY-MM-DDTHH:mm:ss (required)
- timeZone: IANA identifier (required)

CRITICAL:
- Use timezone \"{tz}\" for all times
- \"today\" = {today}, \"tomorrow\" = {tomorrow}
- Never use UTC or \"Z\" unless requested
- For search, use 'q' and 'date' params instead of assuming IDs
- To change or remove an event you first have to find, call findEvents and then updateEvent/deleteEvent without eventId, q or date",
        today = clock.today,
        now = clock.now,
        tomorrow = clock.tomorrow,
        tz = clock.timezone,
    )
}

/// Gemini expects upper-case OpenAPI type names
pub fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| match (key.as_str(), value) {
                    ("type", Value::String(t)) => (key.clone(), Value::String(t.to_ascii_uppercase())),
                    _ => (key.clone(), to_gemini_schema(value)),
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}

/// Chat Completions `tools` array
pub fn to_openai_tools(declarations: &[Value]) -> Vec<Value> {
    declarations
        .iter()
        .map(|declaration| {
            json!({
                "type": "function",
                "function": {
                    "name": declaration["name"],
                    "description": declaration["description"],
                    "parameters": declaration["parameters"],
                }
            })
        })
        .collect()
}
