//! Content editing for the C-UI role.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::api::CampaignApi;
use crate::error::StoreError;
use crate::export::{export_csv, CsvKind};
use crate::model::{Campaign, CampaignId};
use crate::poller::{PollState, ReplyPoller};
use crate::store::{CampaignStore, SelectionToken};

pub struct ContentEditor {
    store: Arc<CampaignStore>,
    poller: ReplyPoller,
    subject: String,
    body: String,
}

impl ContentEditor {
    pub fn new(api: Arc<dyn CampaignApi>, poll_every: Duration) -> Self {
        let store = Arc::new(CampaignStore::new(api));
        let poller = ReplyPoller::new(Arc::clone(&store), poll_every);
        Self {
            store,
            poller,
            subject: String::new(),
            body: String::new(),
        }
    }

    pub fn store(&self) -> &CampaignStore {
        &self.store
    }

    pub async fn refresh(&self) -> Result<usize, StoreError> {
        self.store.refresh().await
    }

    pub async fn create(&mut self, name: &str) -> Result<Campaign, StoreError> {
        let (created, token) = self.store.create(name).await?;
        self.on_selection(token);
        Ok(created)
    }

    /// Switch to `id` (or to nothing). Drafts are reseeded and polling
    /// restarted only when the selection actually changes.
    pub fn select(&mut self, id: Option<CampaignId>) -> SelectionToken {
        let before = self.store.selection();
        let token = self.store.select(id);
        if token != before {
            self.on_selection(token.clone());
        }
        token
    }

    fn on_selection(&mut self, token: SelectionToken) {
        let selected = self.store.selected();
        self.subject = selected
            .as_ref()
            .and_then(|c| c.subject.clone())
            .unwrap_or_default();
        self.body = selected
            .as_ref()
            .and_then(|c| c.body.clone())
            .unwrap_or_default();
        self.poller.start(token);
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    /// Inputs and the save action are disabled once a campaign is sent.
    pub fn can_edit(&self) -> bool {
        !self.store.is_stale()
            && self
                .store
                .selected()
                .is_some_and(|c| !c.status.is_terminal())
    }

    pub async fn save(&self) -> Result<(), StoreError> {
        self.store.save_content(&self.subject, &self.body).await
    }

    pub fn reply_count(&self) -> usize {
        self.store.reply_count()
    }

    pub fn can_download_replies(&self) -> bool {
        self.store.selected().is_some() && self.reply_count() > 0
    }

    pub async fn export_replies(&self, dir: &Path) -> Result<PathBuf, StoreError> {
        export_csv(&self.store, CsvKind::Replies, dir).await
    }

    pub fn poll_state(&self) -> PollState {
        self.poller.state()
    }
}
