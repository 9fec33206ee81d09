//! Recipient upload, sending and admin actions for the M-UI role.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use crate::api::model::{SendOutcome, UploadOutcome};
use crate::api::{CampaignApi, CLEAR_ALL_PHRASE};
use crate::error::StoreError;
use crate::export::{export_csv, CsvKind};
use crate::model::{Campaign, CampaignId, CampaignStatus};
use crate::poller::{PollState, ReplyPoller};
use crate::store::{CampaignStore, SelectionToken};

/// Operator prompts used to gate destructive actions.
pub trait Confirm {
    /// Yes/no question.
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Free-text answer; `None` when the operator cancelled.
    fn phrase(&mut self, prompt: &str) -> Option<String>;
}

pub struct SendConsole {
    store: Arc<CampaignStore>,
    poller: ReplyPoller,
}

impl SendConsole {
    pub fn new(api: Arc<dyn CampaignApi>, poll_every: Duration) -> Self {
        let store = Arc::new(CampaignStore::new(api));
        let poller = ReplyPoller::new(Arc::clone(&store), poll_every);
        Self { store, poller }
    }

    pub fn store(&self) -> &CampaignStore {
        &self.store
    }

    pub async fn refresh(&self) -> Result<usize, StoreError> {
        self.store.refresh().await
    }

    pub async fn create(&self, name: &str) -> Result<Campaign, StoreError> {
        let (created, token) = self.store.create(name).await?;
        self.poller.start(token);
        Ok(created)
    }

    pub fn select(&self, id: Option<CampaignId>) -> SelectionToken {
        let before = self.store.selection();
        let token = self.store.select(id);
        if token != before {
            self.poller.start(token.clone());
        }
        token
    }

    /// Sending is only offered for campaigns whose content is ready.
    pub fn can_send(&self) -> bool {
        !self.store.is_busy()
            && !self.store.is_stale()
            && self
                .store
                .selected()
                .is_some_and(|c| c.status == CampaignStatus::Ready)
    }

    pub async fn upload_recipients(&self, path: &Path) -> Result<UploadOutcome, StoreError> {
        let text = fs::read_to_string(path).await?;
        self.store.upload_recipients(&text).await
    }

    pub async fn send_now(&self) -> Result<SendOutcome, StoreError> {
        self.store.send().await
    }

    pub async fn upload_and_send(&self, path: &Path) -> Result<SendOutcome, StoreError> {
        let contents = fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("recipients.csv");
        self.store.upload_and_send(file_name, contents).await
    }

    /// Delete everything on the server after two explicit confirmations.
    /// Nothing is sent unless the typed phrase matches exactly.
    pub async fn clear_all_data(&self, confirm: &mut dyn Confirm) -> Result<(), StoreError> {
        if !confirm.confirm("This permanently deletes ALL campaigns, recipients and replies. Continue?") {
            info!("clear-all declined");
            return Err(StoreError::ConfirmationDeclined);
        }
        let prompt = format!("Type {CLEAR_ALL_PHRASE} to confirm");
        let Some(phrase) = confirm.phrase(&prompt) else {
            return Err(StoreError::ConfirmationDeclined);
        };
        if phrase != CLEAR_ALL_PHRASE {
            warn!("clear-all confirmation phrase mismatch");
            return Err(StoreError::ConfirmationMismatch);
        }

        self.store.clear_all(&phrase).await?;
        self.poller.stop();
        Ok(())
    }

    pub async fn export(&self, kind: CsvKind, dir: &Path) -> Result<PathBuf, StoreError> {
        export_csv(&self.store, kind, dir).await
    }

    pub fn poll_state(&self) -> PollState {
        self.poller.state()
    }
}
