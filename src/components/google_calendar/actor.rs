use super::models::CalendarEvent;
use super::service::{Credential, ListQuery};
use crate::error::{google_calendar_error, AppResult};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};
use url::Url;

type Reply<T> = oneshot::Sender<AppResult<T>>;

/// Commands that can be sent to the Google Calendar actor
pub enum GoogleCalendarCommand {
    List {
        credential: Credential,
        query: ListQuery,
        respond_to: Reply<Vec<CalendarEvent>>,
    },
    Get {
        credential: Credential,
        event_id: String,
        respond_to: Reply<CalendarEvent>,
    },
    Insert {
        credential: Credential,
        event: CalendarEvent,
        respond_to: Reply<CalendarEvent>,
    },
    Update {
        credential: Credential,
        event_id: String,
        event: CalendarEvent,
        respond_to: Reply<CalendarEvent>,
    },
    Delete {
        credential: Credential,
        event_id: String,
        respond_to: Reply<()>,
    },
    Shutdown,
}

/// Location of the events collection of one calendar
#[derive(Debug, Clone)]
pub struct EventsEndpoint {
    events_url: Url,
}

impl EventsEndpoint {
    /// Build `{base}/calendars/{calendar_id}/events`
    pub fn new(base_url: &str, calendar_id: &str) -> AppResult<Self> {
        let mut events_url = Url::parse(base_url)
            .map_err(|e| google_calendar_error(&format!("Failed to parse URL: {}", e)))?;
        events_url
            .path_segments_mut()
            .map_err(|_| google_calendar_error("Calendar API URL cannot be a base"))?
            .pop_if_empty()
            .extend(["calendars", calendar_id, "events"]);
        Ok(Self { events_url })
    }

    pub fn collection(&self) -> Url {
        self.events_url.clone()
    }

    pub fn event(&self, event_id: &str) -> AppResult<Url> {
        let mut url = self.events_url.clone();
        url.path_segments_mut()
            .map_err(|_| google_calendar_error("Calendar API URL cannot be a base"))?
            .push(event_id);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

/// Handle for communicating with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarActorHandle {
    command_tx: mpsc::Sender<GoogleCalendarCommand>,
}

impl GoogleCalendarActorHandle {
    /// Send a command and wait for the actor's reply
    pub async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> GoogleCalendarCommand,
    ) -> AppResult<T> {
        let (response_tx, response_rx) = oneshot::channel();
        self.command_tx
            .send(build(response_tx))
            .await
            .map_err(|e| google_calendar_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .await
            .map_err(|_| google_calendar_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        let _ = self.command_tx.send(GoogleCalendarCommand::Shutdown).await;
        Ok(())
    }
}

/// The Google Calendar actor that processes messages
pub struct GoogleCalendarActor {
    endpoint: EventsEndpoint,
    client: Client,
    command_rx: mpsc::Receiver<GoogleCalendarCommand>,
}

impl GoogleCalendarActor {
    /// Create a new actor and return its handle
    pub fn new(endpoint: EventsEndpoint) -> (Self, GoogleCalendarActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);

        let actor = Self {
            endpoint,
            client: Client::new(),
            command_rx,
        };

        (actor, GoogleCalendarActorHandle { command_tx })
    }

    /// Start the actor's processing loop.
    ///
    /// Each request runs on its own task so independent operations of one
    /// batch reach the API concurrently.
    pub async fn run(&mut self) {
        info!("Google Calendar actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            if let GoogleCalendarCommand::Shutdown = cmd {
                info!("Google Calendar actor shutting down");
                break;
            }

            let client = self.client.clone();
            let endpoint = self.endpoint.clone();
            tokio::spawn(async move {
                Self::execute(client, endpoint, cmd).await;
            });
        }

        info!("Google Calendar actor shut down");
    }

    async fn execute(client: Client, endpoint: EventsEndpoint, cmd: GoogleCalendarCommand) {
        match cmd {
            GoogleCalendarCommand::List {
                credential,
                query,
                respond_to,
            } => {
                let result = Self::list_events(&client, &endpoint, &credential, &query).await;
                let _ = respond_to.send(result);
            }
            GoogleCalendarCommand::Get {
                credential,
                event_id,
                respond_to,
            } => {
                let result = Self::get_event(&client, &endpoint, &credential, &event_id).await;
                let _ = respond_to.send(result);
            }
            GoogleCalendarCommand::Insert {
                credential,
                event,
                respond_to,
            } => {
                let result = Self::insert_event(&client, &endpoint, &credential, &event).await;
                let _ = respond_to.send(result);
            }
            GoogleCalendarCommand::Update {
                credential,
                event_id,
                event,
                respond_to,
            } => {
                let result =
                    Self::update_event(&client, &endpoint, &credential, &event_id, &event).await;
                let _ = respond_to.send(result);
            }
            GoogleCalendarCommand::Delete {
                credential,
                event_id,
                respond_to,
            } => {
                let result = Self::delete_event(&client, &endpoint, &credential, &event_id).await;
                let _ = respond_to.send(result);
            }
            GoogleCalendarCommand::Shutdown => {}
        }
    }

    async fn get_event(
        client: &Client,
        endpoint: &EventsEndpoint,
        credential: &Credential,
        event_id: &str,
    ) -> AppResult<CalendarEvent> {
        let url = endpoint.event(event_id)?;
        let response = send(client.get(url), credential, "fetch event").await?;
        parse_json(response, "event").await
    }

    async fn insert_event(
        client: &Client,
        endpoint: &EventsEndpoint,
        credential: &Credential,
        event: &CalendarEvent,
    ) -> AppResult<CalendarEvent> {
        debug!("Inserting event: {:?}", event.summary);
        let request = client.post(endpoint.collection()).json(event);
        let response = send(request, credential, "create event").await?;
        parse_json(response, "event").await
    }

    async fn update_event(
        client: &Client,
        endpoint: &EventsEndpoint,
        credential: &Credential,
        event_id: &str,
        event: &CalendarEvent,
    ) -> AppResult<CalendarEvent> {
        debug!("Replacing event {}", event_id);
        let request = client.put(endpoint.event(event_id)?).json(event);
        let response = send(request, credential, "update event").await?;
        parse_json(response, "event").await
    }

    async fn delete_event(
        client: &Client,
        endpoint: &EventsEndpoint,
        credential: &Credential,
        event_id: &str,
    ) -> AppResult<()> {
        let url = endpoint.event(event_id)?;
        send(client.delete(url), credential, "delete event").await?;
        Ok(())
    }

    /// List events in a time range
    async fn list_events(
        client: &Client,
        endpoint: &EventsEndpoint,
        credential: &Credential,
        query: &ListQuery,
    ) -> AppResult<Vec<CalendarEvent>> {
        let mut url = endpoint.collection();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("timeMin", &query.time_min.to_rfc3339());
            if let Some(time_max) = query.time_max {
                pairs.append_pair("timeMax", &time_max.to_rfc3339());
            }
            pairs.append_pair("maxResults", &query.max_results.to_string());
            pairs.append_pair("singleEvents", "true");
            pairs.append_pair("orderBy", "startTime");
            if let Some(q) = &query.query {
                pairs.append_pair("q", q);
            }
        }

        let response = send(client.get(url), credential, "fetch events").await?;
        let page: EventsPage = parse_json(response, "events").await?;
        Ok(page.items)
    }
}

/// Attach the credential, send, and turn non-success statuses into errors
async fn send(request: RequestBuilder, credential: &Credential, action: &str) -> AppResult<Response> {
    let response = request
        .bearer_auth(credential.as_str())
        .send()
        .await
        .map_err(|e| google_calendar_error(&format!("Failed to {}: {}", action, e)))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error response".to_string());
        error!("Failed to {}: HTTP {} - {}", action, status, error_body);
        return Err(google_calendar_error(&format!(
            "Failed to {}: HTTP {}",
            action, status
        )));
    }

    Ok(response)
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: Response, what: &str) -> AppResult<T> {
    response
        .json()
        .await
        .map_err(|e| google_calendar_error(&format!("Failed to parse {} response: {}", what, e)))
}
