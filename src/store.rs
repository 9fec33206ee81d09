//! Client-side cache of the server's campaigns and the transitions that mutate it.
//!
//! Every operation validates locally first and only then talks to the API. A
//! failed request never touches the cached list.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

use crate::api::model::{SendOutcome, UploadOutcome};
use crate::api::{CampaignApi, CLEAR_ALL_PHRASE};
use crate::error::StoreError;
use crate::model::{parse_recipients, sort_newest_first, Campaign, CampaignId, CampaignStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    Failed(String),
}

/// Identity of a selection. Every change of selected campaign yields a new
/// generation, so responses issued for an older one can be recognised.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionToken {
    generation: u64,
    id: Option<CampaignId>,
}

impl SelectionToken {
    pub fn id(&self) -> Option<&CampaignId> {
        self.id.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
struct StoreState {
    campaigns: Vec<Campaign>,
    load: LoadState,
    selection: SelectionToken,
    reply_count: usize,
}

impl StoreState {
    fn select(&mut self, id: Option<CampaignId>) -> SelectionToken {
        if self.selection.id == id {
            return self.selection.clone();
        }
        self.selection = SelectionToken {
            generation: self.selection.generation + 1,
            id,
        };
        self.reply_count = 0;
        self.selection.clone()
    }

    fn selected(&self) -> Option<&Campaign> {
        let id = self.selection.id.as_ref()?;
        self.campaigns.iter().find(|c| &c.id == id)
    }
}

/// Clears the busy flag when dropped, whatever path the action exits through.
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct CampaignStore {
    api: Arc<dyn CampaignApi>,
    state: Mutex<StoreState>,
    busy: AtomicBool,
}

impl CampaignStore {
    pub fn new(api: Arc<dyn CampaignApi>) -> Self {
        Self {
            api,
            state: Mutex::new(StoreState {
                campaigns: Vec::new(),
                load: LoadState::Loading,
                selection: SelectionToken::default(),
                reply_count: 0,
            }),
            busy: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn api(&self) -> Arc<dyn CampaignApi> {
        Arc::clone(&self.api)
    }

    pub fn campaigns(&self) -> Vec<Campaign> {
        self.state().campaigns.clone()
    }

    pub fn load_state(&self) -> LoadState {
        self.state().load.clone()
    }

    pub fn selection(&self) -> SelectionToken {
        self.state().selection.clone()
    }

    pub fn selected(&self) -> Option<Campaign> {
        self.state().selected().cloned()
    }

    pub fn reply_count(&self) -> usize {
        self.state().reply_count
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Mark the store busy for the lifetime of the returned guard.
    pub fn begin(&self) -> Result<BusyGuard<'_>, StoreError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| StoreError::Busy)?;
        Ok(BusyGuard { flag: &self.busy })
    }

    /// True when the last refresh failed and the cached list may be out of date.
    pub fn is_stale(&self) -> bool {
        matches!(self.state().load, LoadState::Failed(_))
    }

    fn require_fresh(&self) -> Result<(), StoreError> {
        if self.is_stale() {
            return Err(StoreError::Stale);
        }
        Ok(())
    }

    fn require_selected(&self) -> Result<(SelectionToken, Campaign), StoreError> {
        self.require_fresh()?;
        let state = self.state();
        let campaign = state.selected().cloned().ok_or(StoreError::NoSelection)?;
        Ok((state.selection.clone(), campaign))
    }

    /// Replace the cached list with a fresh copy from the server.
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> Result<usize, StoreError> {
        match self.api.list_campaigns().await {
            Ok(mut campaigns) => {
                sort_newest_first(&mut campaigns);
                let count = campaigns.len();
                let mut state = self.state();
                state.campaigns = campaigns;
                state.load = LoadState::Ready;
                info!(count, "campaigns loaded");
                Ok(count)
            }
            Err(err) => {
                warn!(?err, "failed to load campaigns");
                let err = StoreError::Load(err);
                self.state().load = LoadState::Failed(err.to_string());
                Err(err)
            }
        }
    }

    /// Create a campaign shell and select it.
    #[instrument(skip_all)]
    pub async fn create(&self, name: &str) -> Result<(Campaign, SelectionToken), StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::BlankName);
        }
        self.require_fresh()?;
        let _busy = self.begin()?;

        let created = self.api.create_campaign(name).await.map_err(|err| {
            warn!(?err, name, "failed to create campaign");
            StoreError::Create(err)
        })?;

        let mut state = self.state();
        state.campaigns.insert(0, created.clone());
        let token = state.select(Some(created.id.clone()));
        info!(campaign_id = %created.id, name, "campaign created");
        Ok((created, token))
    }

    pub fn select(&self, id: Option<CampaignId>) -> SelectionToken {
        let token = self.state().select(id);
        debug!(campaign_id = ?token.id(), generation = token.generation(), "selection");
        token
    }

    /// Store a reply count fetched for `token`. Returns false, leaving the
    /// displayed count alone, when the selection has moved on since.
    pub fn apply_reply_count(&self, token: &SelectionToken, count: usize) -> bool {
        let mut state = self.state();
        if &state.selection != token {
            return false;
        }
        state.reply_count = count;
        true
    }

    /// Fetch the reply count for `token`'s campaign and apply it if the
    /// selection is still current. A failed fetch shows 0. Returns false once
    /// the selection has moved on.
    pub async fn fetch_reply_count(&self, token: &SelectionToken) -> bool {
        let Some(id) = token.id() else {
            return false;
        };
        let count = match self.api.list_replies(id).await {
            Ok(replies) => replies.len(),
            Err(err) => {
                debug!(?err, campaign_id = %id, "reply count fetch failed; showing 0");
                0
            }
        };
        self.apply_reply_count(token, count)
    }

    /// Fetch the selected campaign's reply count once and return what is
    /// displayed afterwards.
    pub async fn refresh_reply_count(&self) -> usize {
        let token = self.selection();
        if !self.fetch_reply_count(&token).await {
            debug!(generation = token.generation(), "reply count not applied");
        }
        self.reply_count()
    }

    /// Replace subject and body of the selected campaign.
    #[instrument(skip_all)]
    pub async fn save_content(&self, subject: &str, body: &str) -> Result<(), StoreError> {
        let (token, campaign) = self.require_selected()?;
        if subject.trim().is_empty() || body.trim().is_empty() {
            return Err(StoreError::BlankContent);
        }
        if campaign.status.is_terminal() {
            return Err(StoreError::ContentLocked);
        }
        let _busy = self.begin()?;

        self.api
            .save_content(&campaign.id, subject, body)
            .await
            .map_err(|err| {
                warn!(?err, campaign_id = %campaign.id, "failed to save content");
                StoreError::Save(err)
            })?;

        // Patch the record the request was issued for, not whatever is selected now.
        let mut state = self.state();
        if let Some(cached) = state.campaigns.iter_mut().find(|c| c.id == campaign.id) {
            cached.subject = Some(subject.to_string());
            cached.body = Some(body.to_string());
            cached.status = CampaignStatus::Ready;
        }
        if state.selection != token {
            debug!(campaign_id = %campaign.id, "selection changed while saving");
        }
        info!(campaign_id = %campaign.id, "campaign content saved");
        Ok(())
    }

    /// Post the addresses found in `text` as the selected campaign's recipients.
    #[instrument(skip_all)]
    pub async fn upload_recipients(&self, text: &str) -> Result<UploadOutcome, StoreError> {
        let (_, campaign) = self.require_selected()?;
        let emails = parse_recipients(text);
        if emails.is_empty() {
            return Err(StoreError::NoValidEmails);
        }
        let _busy = self.begin()?;

        let outcome = self
            .api
            .upload_emails(&campaign.id, &emails)
            .await
            .map_err(|err| {
                warn!(?err, campaign_id = %campaign.id, "failed to upload recipients");
                StoreError::Upload(err)
            })?;
        info!(
            campaign_id = %campaign.id,
            parsed = emails.len(),
            uploaded = outcome.uploaded,
            "recipients uploaded"
        );
        Ok(outcome)
    }

    /// Trigger sending of the selected campaign, then reload the list to pick
    /// up the status the server assigned.
    #[instrument(skip_all)]
    pub async fn send(&self) -> Result<SendOutcome, StoreError> {
        let campaign = self.require_ready()?;
        let _busy = self.begin()?;

        let outcome = self.api.send(&campaign.id).await.map_err(|err| {
            warn!(?err, campaign_id = %campaign.id, "send failed");
            StoreError::Send(err)
        })?;
        info!(campaign_id = %campaign.id, sent = outcome.sent, failed = outcome.failed, "campaign sent");

        if let Err(err) = self.refresh().await {
            warn!(?err, "refresh after send failed");
        }
        Ok(outcome)
    }

    /// Upload a recipient file and send in a single request.
    #[instrument(skip_all)]
    pub async fn upload_and_send(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<SendOutcome, StoreError> {
        let campaign = self.require_ready()?;
        let _busy = self.begin()?;

        let outcome = self
            .api
            .upload_and_send(&campaign.id, file_name, contents)
            .await
            .map_err(|err| {
                warn!(?err, campaign_id = %campaign.id, "upload-and-send failed");
                StoreError::Send(err)
            })?;
        info!(campaign_id = %campaign.id, sent = outcome.sent, failed = outcome.failed, "campaign sent");

        if let Err(err) = self.refresh().await {
            warn!(?err, "refresh after send failed");
        }
        Ok(outcome)
    }

    fn require_ready(&self) -> Result<Campaign, StoreError> {
        let (_, campaign) = self.require_selected()?;
        if campaign.status != CampaignStatus::Ready {
            return Err(StoreError::NotReady(campaign.status));
        }
        Ok(campaign)
    }

    /// Wipe all server state. `phrase` must be exactly `DELETE_ALL_DATA`.
    #[instrument(skip_all)]
    pub async fn clear_all(&self, phrase: &str) -> Result<(), StoreError> {
        if phrase != CLEAR_ALL_PHRASE {
            return Err(StoreError::ConfirmationMismatch);
        }
        self.require_fresh()?;
        let _busy = self.begin()?;

        self.api.clear_all().await.map_err(|err| {
            warn!(?err, "clear-all failed");
            StoreError::Clear(err)
        })?;

        let mut state = self.state();
        state.campaigns.clear();
        state.select(None);
        warn!("all campaign data cleared");
        Ok(())
    }
}
