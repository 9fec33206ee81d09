#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use campaign_console::api::model::{SendOutcome, UploadOutcome};
use campaign_console::api::CampaignApi;
use campaign_console::error::ApiError;
use campaign_console::export::CsvKind;
use campaign_console::model::{Campaign, CampaignId, CampaignStatus, Reply};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListCampaigns,
    CreateCampaign(String),
    ListReplies(String),
    SaveContent {
        id: String,
        subject: String,
        body: String,
    },
    DownloadCsv(String, CsvKind),
    UploadEmails(String, Vec<String>),
    Send(String),
    UploadAndSend(String, String, Vec<u8>),
    ClearAll,
}

impl Call {
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Call::ListCampaigns | Call::ListReplies(_) | Call::DownloadCsv(..)
        )
    }
}

/// In-memory stand-in for the campaign API that records every call.
#[derive(Clone, Default)]
pub struct RecordingApi {
    calls: Arc<Mutex<Vec<Call>>>,
    campaigns: Arc<Mutex<Vec<Campaign>>>,
    replies: Arc<Mutex<HashMap<String, (usize, Duration)>>>,
    failures: Arc<Mutex<HashMap<&'static str, (StatusCode, Option<String>)>>>,
    created: Arc<Mutex<u32>>,
}

impl RecordingApi {
    pub fn with_campaigns(campaigns: Vec<Campaign>) -> Self {
        Self {
            campaigns: Arc::new(Mutex::new(campaigns)),
            ..Default::default()
        }
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn mutating_calls(&self) -> Vec<Call> {
        self.calls().await.into_iter().filter(Call::is_mutating).collect()
    }

    pub async fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().await.iter().filter(|c| pred(*c)).count()
    }

    /// Make `op` fail with `status` until `succeed` is called.
    pub async fn fail(&self, op: &'static str, status: StatusCode, message: Option<&str>) {
        self.failures
            .lock()
            .await
            .insert(op, (status, message.map(str::to_string)));
    }

    pub async fn succeed(&self, op: &'static str) {
        self.failures.lock().await.remove(op);
    }

    /// Reply count for `id`, answered after `delay`.
    pub async fn set_replies(&self, id: &str, count: usize, delay: Duration) {
        self.replies
            .lock()
            .await
            .insert(id.to_string(), (count, delay));
    }

    async fn record(&self, call: Call, op: &'static str) -> Result<(), ApiError> {
        self.calls.lock().await.push(call);
        match self.failures.lock().await.get(op) {
            Some((status, message)) => Err(ApiError::Status {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn set_status(&self, id: &CampaignId, status: CampaignStatus) {
        if let Some(c) = self.campaigns.lock().await.iter_mut().find(|c| &c.id == id) {
            c.status = status;
        }
    }
}

#[async_trait]
impl CampaignApi for RecordingApi {
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, ApiError> {
        self.record(Call::ListCampaigns, "list_campaigns").await?;
        Ok(self.campaigns.lock().await.clone())
    }

    async fn create_campaign(&self, name: &str) -> Result<Campaign, ApiError> {
        self.record(Call::CreateCampaign(name.to_string()), "create_campaign")
            .await?;
        let n = {
            let mut created = self.created.lock().await;
            *created += 1;
            *created
        };
        let created = campaign(&format!("new-{n}"), name, None, Some("2030-01-01T00:00:00Z"));
        self.campaigns.lock().await.push(created.clone());
        Ok(created)
    }

    async fn list_replies(&self, id: &CampaignId) -> Result<Vec<Reply>, ApiError> {
        self.record(Call::ListReplies(id.to_string()), "list_replies")
            .await?;
        let (count, delay) = self
            .replies
            .lock()
            .await
            .get(id.as_str())
            .copied()
            .unwrap_or((0, Duration::ZERO));
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok((0..count)
            .map(|i| serde_json::json!({ "id": i, "campaign_id": id.as_str() }))
            .collect())
    }

    async fn save_content(
        &self,
        id: &CampaignId,
        subject: &str,
        body: &str,
    ) -> Result<(), ApiError> {
        self.record(
            Call::SaveContent {
                id: id.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            },
            "save_content",
        )
        .await?;
        if let Some(c) = self.campaigns.lock().await.iter_mut().find(|c| &c.id == id) {
            c.subject = Some(subject.to_string());
            c.body = Some(body.to_string());
            c.status = CampaignStatus::Ready;
        }
        Ok(())
    }

    async fn download_csv(&self, id: &CampaignId, kind: CsvKind) -> Result<Vec<u8>, ApiError> {
        self.record(Call::DownloadCsv(id.to_string(), kind), "download_csv")
            .await?;
        Ok(match kind {
            CsvKind::Replies => b"email,reply\nalice@example.com,thanks\n".to_vec(),
            CsvKind::Recipients => b"email,token\nalice@example.com,tok-1\n".to_vec(),
        })
    }

    async fn upload_emails(
        &self,
        id: &CampaignId,
        emails: &[String],
    ) -> Result<UploadOutcome, ApiError> {
        self.record(Call::UploadEmails(id.to_string(), emails.to_vec()), "upload_emails")
            .await?;
        Ok(UploadOutcome {
            uploaded: emails.len() as u64,
        })
    }

    async fn send(&self, id: &CampaignId) -> Result<SendOutcome, ApiError> {
        self.record(Call::Send(id.to_string()), "send").await?;
        self.set_status(id, CampaignStatus::Sent).await;
        Ok(SendOutcome { sent: 2, failed: 1 })
    }

    async fn upload_and_send(
        &self,
        id: &CampaignId,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<SendOutcome, ApiError> {
        self.record(
            Call::UploadAndSend(id.to_string(), file_name.to_string(), contents),
            "upload_and_send",
        )
        .await?;
        self.set_status(id, CampaignStatus::Sent).await;
        Ok(SendOutcome { sent: 3, failed: 0 })
    }

    async fn clear_all(&self) -> Result<(), ApiError> {
        self.record(Call::ClearAll, "clear_all").await?;
        self.campaigns.lock().await.clear();
        Ok(())
    }
}

pub fn campaign(
    id: &str,
    name: &str,
    status: Option<&str>,
    created_at: Option<&str>,
) -> Campaign {
    Campaign {
        id: CampaignId::from(id),
        name: name.to_string(),
        subject: None,
        body: None,
        status: CampaignStatus::from(status.map(str::to_string)),
        created_at: created_at.map(str::to_string),
    }
}

/// Campaign A is ready and older; B is a draft and newer.
pub fn sample_campaigns() -> Vec<Campaign> {
    vec![
        campaign("1", "A", Some("ready"), Some("2024-01-02")),
        campaign("2", "B", Some("draft"), Some("2024-01-03")),
    ]
}

pub fn id(raw: &str) -> CampaignId {
    CampaignId::from(raw)
}
