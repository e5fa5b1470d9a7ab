use crate::components::google_calendar::Credential;
use chrono_tz::Tz;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

/// Hand-off of one resolved event id from a search to a later step.
///
/// The writer and reader each take their half exactly once, so the slot has
/// at most one writer and at most one reader. A reader waits until the writer
/// has published or given up.
#[derive(Debug, Default)]
pub struct ResolvedIdSlot {
    sender: Mutex<Option<oneshot::Sender<String>>>,
    receiver: Mutex<Option<oneshot::Receiver<String>>>,
}

impl ResolvedIdSlot {
    /// Slot with nobody writing to it; reads return `None` immediately
    pub fn unused() -> Self {
        Self::default()
    }

    /// Slot waiting for a writer
    pub fn armed() -> Self {
        let (sender, receiver) = oneshot::channel();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
        }
    }

    /// Store the id found by a search, or release waiting readers with nothing
    pub fn publish(&self, event_id: Option<String>) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let (Some(sender), Some(event_id)) = (sender, event_id) {
            debug!("Caching resolved event id {}", event_id);
            let _ = sender.send(event_id);
        }
    }

    /// Take the cached id, waiting for a pending writer
    pub async fn take(&self) -> Option<String> {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match receiver {
            Some(receiver) => receiver.await.ok(),
            None => None,
        }
    }
}

/// State scoped to one dispatch call.
///
/// Created fresh for every batch and dropped with it, so concurrent calls
/// never observe each other's cached ids.
#[derive(Debug)]
pub struct DispatchContext {
    pub credential: Credential,
    /// Zone the caller sent with the request, if any
    pub user_timezone: Option<Tz>,
    /// Configured zone used for calendar dates when the caller sent none
    pub default_timezone: Tz,
    pub last_resolved_id: ResolvedIdSlot,
}

impl DispatchContext {
    pub fn new(
        credential: Credential,
        user_timezone: Option<Tz>,
        default_timezone: Tz,
        last_resolved_id: ResolvedIdSlot,
    ) -> Self {
        Self {
            credential,
            user_timezone,
            default_timezone,
            last_resolved_id,
        }
    }

    /// Zone used to interpret calendar dates such as search days
    pub fn local_timezone(&self) -> Tz {
        self.user_timezone.unwrap_or(self.default_timezone)
    }

    /// Caller's own timezone name, used as a merge fallback.
    ///
    /// Never the configured default: without a caller zone a rescheduled
    /// event keeps the zone it already has.
    pub fn timezone_name(&self) -> Option<&'static str> {
        self.user_timezone.map(|tz| tz.name())
    }
}
