mod common;

use calendar_pilot::components::assistant::{
    Assistant, DispatchResponse, DispatchSettings, Dispatcher, OperationResult, RawOperation,
};
use calendar_pilot::components::google_calendar::{CalendarService, EventDateTime};
use calendar_pilot::components::intent::Extraction;
use calendar_pilot::error::Error;
use chrono::{TimeZone, Utc};
use common::{credential, timed_event, Call, MockCalendar, ScriptedExtractor};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn dispatcher(calendar: &Arc<MockCalendar>) -> Dispatcher {
    let calendar: Arc<dyn CalendarService> = calendar.clone();
    Dispatcher::new(calendar, DispatchSettings::default())
}

fn op(name: &str, args: serde_json::Value) -> RawOperation {
    RawOperation::new(name, args)
}

#[tokio::test]
async fn empty_batch_yields_empty_list() {
    let calendar = Arc::new(MockCalendar::default());

    let response = dispatcher(&calendar).dispatch(&[], credential(), None).await.unwrap();

    assert_eq!(response, DispatchResponse::Batch(vec![]));
    assert_eq!(serde_json::to_value(&response).unwrap(), json!([]));
    assert!(calendar.calls().is_empty());
}

#[tokio::test]
async fn single_result_is_not_wrapped() {
    let calendar = Arc::new(MockCalendar::with_events(vec![timed_event(
        "a",
        "Gym",
        "2025-03-10T18:00:00",
        "2025-03-10T19:00:00",
        "UTC",
    )]));

    let response = dispatcher(&calendar)
        .dispatch(&[op("listEvents", json!({}))], credential(), None)
        .await
        .unwrap();

    match response {
        DispatchResponse::Single(OperationResult::Events { events }) => assert_eq!(events.len(), 1),
        other => panic!("unexpected response: {:?}", other),
    }
    let body = serde_json::to_value(
        dispatcher(&calendar)
            .dispatch(&[op("listEvents", json!({}))], credential(), None)
            .await
            .unwrap(),
    )
    .unwrap();
    assert_eq!(body["type"], "events");
}

#[tokio::test]
async fn batch_results_follow_request_order() {
    let calendar = Arc::new(MockCalendar::default());

    let response = dispatcher(&calendar)
        .dispatch(
            &[
                op("deleteEvent", json!({"eventId": "old"})),
                op("listEvents", json!({"maxResults": 5})),
            ],
            credential(),
            None,
        )
        .await
        .unwrap();

    let results = response.into_results();
    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0],
        OperationResult::Success {
            message: "Event deleted successfully".to_string(),
            deleted_event_id: Some("old".to_string()),
        }
    );
    assert!(matches!(results[1], OperationResult::Events { .. }));
    assert!(calendar.calls().iter().any(|c| matches!(c, Call::List(q) if q.max_results == 5)));
}

#[tokio::test]
async fn results_keep_request_order_when_first_finishes_last() {
    let calendar = Arc::new(MockCalendar::with_slow_list(
        vec![timed_event("a", "Gym", "2025-03-10T18:00:00", "2025-03-10T19:00:00", "UTC")],
        Duration::from_millis(200),
    ));

    let response = dispatcher(&calendar)
        .dispatch(
            &[op("listEvents", json!({})), op("deleteEvent", json!({"eventId": "old"}))],
            credential(),
            None,
        )
        .await
        .unwrap();

    let finished = calendar.finished();
    assert_eq!(finished.len(), 2);
    assert_eq!(finished[0], Call::Delete("old".to_string()));
    assert!(matches!(finished[1], Call::List(_)));

    let results = response.into_results();
    assert!(matches!(&results[0], OperationResult::Events { events } if events.len() == 1));
    assert!(matches!(
        &results[1],
        OperationResult::Success { deleted_event_id: Some(id), .. } if id == "old"
    ));
}

#[tokio::test]
async fn search_then_update_moves_the_found_event() {
    let mut standup = timed_event(
        "evt-standup",
        "Standup",
        "2025-03-10T09:00:00",
        "2025-03-10T09:15:00",
        "Europe/London",
    );
    standup.description = Some("Daily sync".to_string());
    standup.location = Some("Room 4".to_string());
    standup
        .extra
        .insert("attendees".to_string(), json!([{"email": "dev@example.com"}]));
    let calendar = Arc::new(MockCalendar::with_events(vec![standup.clone()]));

    let response = dispatcher(&calendar)
        .dispatch(
            &[
                op("findEvents", json!({"q": "standup", "date": "2025-03-10"})),
                op(
                    "updateEvent",
                    json!({"startDateTime": "2025-03-10T15:00:00", "timeZone": "Europe/Istanbul"}),
                ),
            ],
            credential(),
            Some(chrono_tz::Europe::Istanbul),
        )
        .await
        .unwrap();

    let results = response.into_results();
    assert!(matches!(&results[0], OperationResult::SearchResults { candidates, .. } if candidates.len() == 1));

    let updates: Vec<_> = calendar
        .mutations()
        .into_iter()
        .filter_map(|c| match c {
            Call::Update(id, body) => Some((id, body)),
            _ => None,
        })
        .collect();
    assert_eq!(updates.len(), 1);
    let (id, body) = &updates[0];
    assert_eq!(id, "evt-standup");
    assert_eq!(
        body.start,
        Some(EventDateTime::timed("2025-03-10T15:00:00", "Europe/Istanbul"))
    );
    assert_eq!(body.end, standup.end);
    assert_eq!(body.summary, standup.summary);
    assert_eq!(body.description, standup.description);
    assert_eq!(body.location, standup.location);
    assert_eq!(body.etag, standup.etag);
    assert_eq!(body.extra, standup.extra);

    match &results[1] {
        OperationResult::Event { event, message } => {
            assert_eq!(event.id, "evt-standup");
            assert_eq!(message, "Event updated successfully");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn search_uses_the_callers_day() {
    let calendar = Arc::new(MockCalendar::default());

    dispatcher(&calendar)
        .dispatch(
            &[op("findEvents", json!({"date": "2025-03-10"}))],
            credential(),
            Some(chrono_tz::Europe::Istanbul),
        )
        .await
        .unwrap();

    match calendar.calls().as_slice() {
        [Call::List(query)] => {
            assert_eq!(query.time_min, Utc.with_ymd_and_hms(2025, 3, 9, 21, 0, 0).unwrap());
            assert!(query.time_max.unwrap() > Utc.with_ymd_and_hms(2025, 3, 10, 20, 59, 0).unwrap());
            assert_eq!(query.query, None);
        }
        other => panic!("unexpected calls: {:?}", other),
    }
}

#[tokio::test]
async fn update_without_match_reports_not_found() {
    let calendar = Arc::new(MockCalendar::default());

    let response = dispatcher(&calendar)
        .dispatch(
            &[op("updateEvent", json!({"q": "dentist", "summary": "Dentist (moved)"}))],
            credential(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        response,
        DispatchResponse::Single(OperationResult::text(
            "No events found matching the criteria to update."
        ))
    );
    assert!(calendar.mutations().is_empty());
}

#[tokio::test]
async fn ambiguous_delete_asks_to_choose() {
    let calendar = Arc::new(MockCalendar::with_events(vec![
        timed_event("l1", "Lunch with Ana", "2025-03-11T12:00:00", "2025-03-11T13:00:00", "UTC"),
        timed_event("l2", "Lunch with Bo", "2025-03-12T12:00:00", "2025-03-12T13:00:00", "UTC"),
    ]));

    let response = dispatcher(&calendar)
        .dispatch(&[op("deleteEvent", json!({"q": "lunch"}))], credential(), None)
        .await
        .unwrap();

    match response {
        DispatchResponse::Single(OperationResult::Disambiguation { message, candidates }) => {
            assert_eq!(message, "Multiple matching events found. Please choose which to delete.");
            let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();
            assert_eq!(ids, vec!["l1", "l2"]);
            assert_eq!(candidates[0].start.as_deref(), Some("2025-03-11T12:00:00"));
        }
        other => panic!("unexpected response: {:?}", other),
    }
    assert!(calendar.mutations().is_empty());
}

#[tokio::test]
async fn ambiguous_update_asks_to_choose() {
    let calendar = Arc::new(MockCalendar::with_events(vec![
        timed_event("s1", "Standup (web)", "2025-03-10T09:00:00", "2025-03-10T09:15:00", "UTC"),
        timed_event("s2", "Standup (mobile)", "2025-03-10T09:30:00", "2025-03-10T09:45:00", "UTC"),
    ]));

    let response = dispatcher(&calendar)
        .dispatch(
            &[op("updateEvent", json!({"q": "standup", "startDateTime": "2025-03-10T10:00:00"}))],
            credential(),
            None,
        )
        .await
        .unwrap();

    match response {
        DispatchResponse::Single(OperationResult::Disambiguation { message, candidates }) => {
            assert_eq!(message, "Multiple matching events found. Please choose which to update.");
            let ids: Vec<_> = candidates.iter().map(|c| c.id.as_str()).collect();
            assert_eq!(ids, vec!["s1", "s2"]);
        }
        other => panic!("unexpected response: {:?}", other),
    }
    assert!(calendar.mutations().is_empty());
    assert!(!calendar.calls().iter().any(|c| matches!(c, Call::Get(_))));
}

#[tokio::test]
async fn own_search_wins_over_earlier_find() {
    let calendar = Arc::new(MockCalendar::with_events(vec![
        timed_event("s1", "Standup", "2025-03-10T09:00:00", "2025-03-10T09:15:00", "UTC"),
        timed_event("l1", "Lunch", "2025-03-10T12:00:00", "2025-03-10T13:00:00", "UTC"),
    ]));

    let response = dispatcher(&calendar)
        .dispatch(
            &[op("findEvents", json!({"q": "standup"})), op("deleteEvent", json!({"q": "lunch"}))],
            credential(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(calendar.mutations(), vec![Call::Delete("l1".to_string())]);
    let results = response.into_results();
    assert!(matches!(
        &results[1],
        OperationResult::Success { deleted_event_id: Some(id), .. } if id == "l1"
    ));
}

#[tokio::test]
async fn single_boundary_change_on_all_day_event_is_rejected() {
    let mut offsite = timed_event("o1", "Offsite", "", "", "UTC");
    offsite.start = Some(EventDateTime {
        date: Some("2025-03-12".to_string()),
        ..Default::default()
    });
    offsite.end = Some(EventDateTime {
        date: Some("2025-03-13".to_string()),
        ..Default::default()
    });
    let calendar = Arc::new(MockCalendar::with_events(vec![offsite]));

    let err = dispatcher(&calendar)
        .dispatch(
            &[op("updateEvent", json!({"eventId": "o1", "startDateTime": "2025-03-12T09:00:00"}))],
            credential(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(ref m) if m.contains("all-day")));
    assert!(err.is_client_error());
    assert!(calendar.mutations().is_empty());
}

#[tokio::test]
async fn reschedule_without_caller_zone_keeps_event_zone() {
    let calendar = Arc::new(MockCalendar::with_events(vec![timed_event(
        "e1",
        "Standup",
        "2025-03-10T09:00:00",
        "2025-03-10T09:15:00",
        "Europe/Helsinki",
    )]));
    let service: Arc<dyn CalendarService> = calendar.clone();
    let settings = DispatchSettings {
        default_timezone: chrono_tz::America::New_York,
        ..Default::default()
    };
    let assistant = Assistant::new(
        Arc::new(ScriptedExtractor(Extraction::Operations(vec![op(
            "updateEvent",
            json!({"eventId": "e1", "startDateTime": "2025-03-10T15:00:00"}),
        )]))),
        Dispatcher::new(service, settings),
        chrono_tz::America::New_York,
    );

    assistant
        .handle_prompt("move standup to 3pm", credential(), None)
        .await
        .unwrap();

    match calendar.mutations().as_slice() {
        [Call::Update(id, body)] => {
            assert_eq!(id, "e1");
            assert_eq!(
                body.start,
                Some(EventDateTime::timed("2025-03-10T15:00:00", "Europe/Helsinki"))
            );
        }
        other => panic!("unexpected calls: {:?}", other),
    }
}

#[tokio::test]
async fn create_without_any_zone_uses_configured_default() {
    let calendar = Arc::new(MockCalendar::default());
    let service: Arc<dyn CalendarService> = calendar.clone();
    let settings = DispatchSettings {
        default_timezone: chrono_tz::Europe::Helsinki,
        ..Default::default()
    };

    Dispatcher::new(service, settings)
        .dispatch(
            &[op(
                "createEvent",
                json!({"summary": "Sauna", "startDateTime": "2025-03-11T18:00:00", "endDateTime": "2025-03-11T19:00:00"}),
            )],
            credential(),
            None,
        )
        .await
        .unwrap();

    match calendar.mutations().as_slice() {
        [Call::Insert(event)] => assert_eq!(
            event.start,
            Some(EventDateTime::timed("2025-03-11T18:00:00", "Europe/Helsinki"))
        ),
        other => panic!("unexpected calls: {:?}", other),
    }
}

#[tokio::test]
async fn unique_match_is_deleted() {
    let calendar = Arc::new(MockCalendar::with_events(vec![
        timed_event("d1", "Dentist", "2025-03-12T08:00:00", "2025-03-12T09:00:00", "UTC"),
        timed_event("g1", "Gym", "2025-03-12T18:00:00", "2025-03-12T19:00:00", "UTC"),
    ]));

    let response = dispatcher(&calendar)
        .dispatch(&[op("deleteEvent", json!({"q": "dentist"}))], credential(), None)
        .await
        .unwrap();

    assert_eq!(calendar.mutations(), vec![Call::Delete("d1".to_string())]);
    let body = serde_json::to_value(response).unwrap();
    assert_eq!(body["type"], "success");
    assert_eq!(body["deletedEventId"], "d1");
}

#[tokio::test]
async fn chained_delete_without_single_match_is_not_executed() {
    let calendar = Arc::new(MockCalendar::default());

    let response = dispatcher(&calendar)
        .dispatch(
            &[op("findEvents", json!({"q": "retro"})), op("deleteEvent", json!({}))],
            credential(),
            None,
        )
        .await
        .unwrap();

    let results = response.into_results();
    assert_eq!(results[0], OperationResult::text("No events found matching the search."));
    assert!(matches!(&results[1], OperationResult::Text { .. }));
    assert!(calendar.mutations().is_empty());
}

#[tokio::test]
async fn invalid_request_stops_batch_before_any_call() {
    let calendar = Arc::new(MockCalendar::default());

    let err = dispatcher(&calendar)
        .dispatch(
            &[
                op("listEvents", json!({})),
                op(
                    "createEvent",
                    json!({"summary": "Standup", "startDateTime": "2025-03-10T09:00:00", "timeZone": "UTC"}),
                ),
            ],
            credential(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(ref m) if m.contains("endDateTime")));
    assert!(calendar.calls().is_empty());
}

#[tokio::test]
async fn unknown_operation_is_rejected() {
    let calendar = Arc::new(MockCalendar::default());

    let err = dispatcher(&calendar)
        .dispatch(&[op("shareCalendar", json!({}))], credential(), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedOperation(ref name) if name == "shareCalendar"));
    assert!(err.is_client_error());
    assert!(calendar.calls().is_empty());
}

#[tokio::test]
async fn backend_failure_aborts_the_batch() {
    let calendar = Arc::new(MockCalendar::failing("Failed to fetch events: HTTP 503"));

    let err = dispatcher(&calendar)
        .dispatch(
            &[op("listEvents", json!({})), op("deleteEvent", json!({"eventId": "x"}))],
            credential(),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::GoogleCalendar(_)));
    assert!(!err.is_client_error());
}

#[tokio::test]
async fn create_uses_callers_timezone_when_missing() {
    let calendar = Arc::new(MockCalendar::default());

    let response = dispatcher(&calendar)
        .dispatch(
            &[op(
                "createEvent",
                json!({
                    "summary": "Team Meeting",
                    "startDateTime": "2025-03-11T10:00:00",
                    "endDateTime": "2025-03-11T11:00:00",
                    "colorId": "5"
                }),
            )],
            credential(),
            Some(chrono_tz::America::New_York),
        )
        .await
        .unwrap();

    match calendar.mutations().as_slice() {
        [Call::Insert(event)] => {
            assert_eq!(
                event.start,
                Some(EventDateTime::timed("2025-03-11T10:00:00", "America/New_York"))
            );
            assert_eq!(event.color_id.as_deref(), Some("5"));
        }
        other => panic!("unexpected calls: {:?}", other),
    }
    match response {
        DispatchResponse::Single(OperationResult::Event { event, message }) => {
            assert_eq!(event.id, "created-1");
            assert_eq!(message, "Event created successfully");
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn concurrent_batches_do_not_share_resolved_ids() {
    let calendar = Arc::new(MockCalendar::with_events(vec![
        timed_event("yoga-1", "Yoga", "2025-03-13T07:00:00", "2025-03-13T08:00:00", "UTC"),
        timed_event("piano-1", "Piano lesson", "2025-03-13T17:00:00", "2025-03-13T18:00:00", "UTC"),
    ]));
    let dispatcher = dispatcher(&calendar);

    let yoga = [op("findEvents", json!({"q": "yoga"})), op("deleteEvent", json!({}))];
    let piano = [op("findEvents", json!({"q": "piano"})), op("deleteEvent", json!({}))];

    let (first, second) = tokio::join!(
        dispatcher.dispatch(&yoga, credential(), None),
        dispatcher.dispatch(&piano, credential(), None),
    );

    let deleted = |response: DispatchResponse| match response.into_results().pop() {
        Some(OperationResult::Success { deleted_event_id, .. }) => deleted_event_id,
        other => panic!("unexpected result: {:?}", other),
    };
    assert_eq!(deleted(first.unwrap()).as_deref(), Some("yoga-1"));
    assert_eq!(deleted(second.unwrap()).as_deref(), Some("piano-1"));
}
