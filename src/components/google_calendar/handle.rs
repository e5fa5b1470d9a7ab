use super::actor::{EventsEndpoint, GoogleCalendarActor, GoogleCalendarActorHandle, GoogleCalendarCommand};
use super::models::CalendarEvent;
use super::service::{CalendarService, Credential, ListQuery};
use crate::config::Config;
use crate::error::AppResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handle for interacting with the Google Calendar actor
#[derive(Clone)]
pub struct GoogleCalendarHandle {
    actor_handle: GoogleCalendarActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl GoogleCalendarHandle {
    /// Create a new GoogleCalendarHandle and spawn the actor
    pub fn new(base_url: &str, calendar_id: &str) -> AppResult<Self> {
        let endpoint = EventsEndpoint::new(base_url, calendar_id)?;

        // Create the actor and get its handle
        let (mut actor, handle) = GoogleCalendarActor::new(endpoint);

        // Spawn a task to run the actor
        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Ok(Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        })
    }

    /// Create a handle for the calendar named in the config
    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(&config.google_api_base_url, &config.google_calendar_id)
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> AppResult<()> {
        self.actor_handle.shutdown().await
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarHandle {
    async fn list(&self, credential: &Credential, query: ListQuery) -> AppResult<Vec<CalendarEvent>> {
        let credential = credential.clone();
        self.actor_handle
            .request(|respond_to| GoogleCalendarCommand::List {
                credential,
                query,
                respond_to,
            })
            .await
    }

    async fn get(&self, credential: &Credential, event_id: &str) -> AppResult<CalendarEvent> {
        let credential = credential.clone();
        let event_id = event_id.to_string();
        self.actor_handle
            .request(|respond_to| GoogleCalendarCommand::Get {
                credential,
                event_id,
                respond_to,
            })
            .await
    }

    async fn insert(&self, credential: &Credential, event: CalendarEvent) -> AppResult<CalendarEvent> {
        let credential = credential.clone();
        self.actor_handle
            .request(|respond_to| GoogleCalendarCommand::Insert {
                credential,
                event,
                respond_to,
            })
            .await
    }

    async fn update(
        &self,
        credential: &Credential,
        event_id: &str,
        event: CalendarEvent,
    ) -> AppResult<CalendarEvent> {
        let credential = credential.clone();
        let event_id = event_id.to_string();
        self.actor_handle
            .request(|respond_to| GoogleCalendarCommand::Update {
                credential,
                event_id,
                event,
                respond_to,
            })
            .await
    }

    async fn delete(&self, credential: &Credential, event_id: &str) -> AppResult<()> {
        let credential = credential.clone();
        let event_id = event_id.to_string();
        self.actor_handle
            .request(|respond_to| GoogleCalendarCommand::Delete {
                credential,
                event_id,
                respond_to,
            })
            .await
    }
}
