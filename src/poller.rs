use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::model::CampaignId;
use crate::store::{CampaignStore, SelectionToken};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Polling(CampaignId),
}

/// Keeps the reply count of the selected campaign fresh.
///
/// At most one poll task exists at a time; starting a new one aborts the old
/// one first. Results are applied through the selection token they were
/// issued for, so a slow response for an abandoned selection is dropped.
pub struct ReplyPoller {
    store: Arc<CampaignStore>,
    every: Duration,
    current: Mutex<Option<(CampaignId, JoinHandle<()>)>>,
}

impl ReplyPoller {
    pub fn new(store: Arc<CampaignStore>, every: Duration) -> Self {
        Self {
            store,
            every,
            current: Mutex::new(None),
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<(CampaignId, JoinHandle<()>)>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Poll for `token`'s campaign, replacing any running poll. A token with no
    /// campaign just stops polling.
    pub fn start(&self, token: SelectionToken) {
        let mut current = self.current();
        if let Some((id, handle)) = current.take() {
            handle.abort();
            debug!(campaign_id = %id, "reply polling stopped");
        }
        let Some(id) = token.id().cloned() else {
            return;
        };

        debug!(campaign_id = %id, every_ms = self.every.as_millis() as u64, "reply polling started");
        let handle = tokio::spawn(poll_replies(Arc::clone(&self.store), token, self.every));
        *current = Some((id, handle));
    }

    pub fn stop(&self) {
        if let Some((id, handle)) = self.current().take() {
            handle.abort();
            debug!(campaign_id = %id, "reply polling stopped");
        }
    }

    pub fn state(&self) -> PollState {
        match self.current().as_ref() {
            Some((id, handle)) if !handle.is_finished() => PollState::Polling(id.clone()),
            _ => PollState::Idle,
        }
    }
}

impl Drop for ReplyPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_replies(store: Arc<CampaignStore>, token: SelectionToken, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        // First tick completes immediately.
        ticker.tick().await;
        if !store.fetch_reply_count(&token).await {
            debug!(campaign_id = ?token.id(), "selection moved on; reply poll exiting");
            break;
        }
    }
}
