use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{multipart, Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::export::CsvKind;
use crate::model::{Campaign, CampaignId, Reply};

pub mod model;

use model::{
    ClearAllReq, CreateCampaignReq, ErrorBody, SaveContentReq, SendOutcome, UploadEmailsReq,
    UploadOutcome,
};

/// Literal the server requires before it wipes everything.
pub const CLEAR_ALL_PHRASE: &str = "DELETE_ALL_DATA";

/// Which application is talking. Each role authenticates with its own header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Role {
    /// C-UI, the content editor.
    Content,
    /// M-UI, the send console.
    Manager,
}

impl Role {
    pub fn header(&self) -> &'static str {
        match self {
            Role::Content => "X-C-Key",
            Role::Manager => "X-M-Key",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Content => f.write_str("content"),
            Role::Manager => f.write_str("manager"),
        }
    }
}

#[async_trait]
pub trait CampaignApi: Send + Sync {
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, ApiError>;

    async fn create_campaign(&self, name: &str) -> Result<Campaign, ApiError>;

    async fn list_replies(&self, id: &CampaignId) -> Result<Vec<Reply>, ApiError>;

    async fn save_content(&self, id: &CampaignId, subject: &str, body: &str)
        -> Result<(), ApiError>;

    async fn download_csv(&self, id: &CampaignId, kind: CsvKind) -> Result<Vec<u8>, ApiError>;

    async fn upload_emails(
        &self,
        id: &CampaignId,
        emails: &[String],
    ) -> Result<UploadOutcome, ApiError>;

    async fn send(&self, id: &CampaignId) -> Result<SendOutcome, ApiError>;

    async fn upload_and_send(
        &self,
        id: &CampaignId,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<SendOutcome, ApiError>;

    async fn clear_all(&self) -> Result<(), ApiError>;
}

/// `CampaignApi` over HTTPS.
#[derive(Clone)]
pub struct HttpCampaignApi {
    http: Client,
    base_url: Url,
    role: Role,
    key: String,
}

impl fmt::Debug for HttpCampaignApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpCampaignApi")
            .field("base_url", &self.base_url)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl HttpCampaignApi {
    pub fn new(base_url: &str, role: Role, key: String, timeout: Duration) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::Url(format!("{base_url}: {e}")))?;
        let http = Client::builder()
            .user_agent(concat!("campaign-console/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url,
            role,
            key,
        })
    }

    /// Build a client for `role`, pulling the key from the environment variable
    /// the config names for it.
    pub fn from_config(cfg: &Config, role: Role) -> Result<Self> {
        let key = cfg.api_key(role)?;
        Ok(Self::new(&cfg.api.base_url, role, key, cfg.timeout())?)
    }

    /// Append path segments to the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn get(&self, url: Url) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    pub fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> RequestBuilder {
        self.request(Method::POST, url)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(self.role.header(), &self.key)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let request = builder.build()?;
        debug!(method = %request.method(), url = %request.url(), role = %self.role, "campaign api request");
        for (name, value) in request.headers() {
            if name.as_str().eq_ignore_ascii_case(self.role.header()) {
                debug!("  {}: [REDACTED]", name);
            } else {
                debug!("  {}: {}", name, value.to_str().unwrap_or("[invalid]"));
            }
        }

        let res = self.http.execute(request).await?;
        let status = res.status();
        debug!(%status, "campaign api response");
        if status.is_success() {
            return Ok(res);
        }

        let body = res.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);
        warn!(%status, body = %body, "campaign api error");
        Err(ApiError::Status { status, message })
    }

    async fn fetch_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let res = self.execute(builder).await?;
        let text = res.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl CampaignApi for HttpCampaignApi {
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, ApiError> {
        let url = self.endpoint(&["campaigns"])?;
        self.fetch_json(self.get(url)).await
    }

    async fn create_campaign(&self, name: &str) -> Result<Campaign, ApiError> {
        let url = self.endpoint(&["campaigns"])?;
        self.fetch_json(self.post_json(url, &CreateCampaignReq { name }))
            .await
    }

    async fn list_replies(&self, id: &CampaignId) -> Result<Vec<Reply>, ApiError> {
        let mut url = self.endpoint(&["replies"])?;
        url.query_pairs_mut().append_pair("campaign_id", id.as_str());
        self.fetch_json(self.get(url)).await
    }

    async fn save_content(
        &self,
        id: &CampaignId,
        subject: &str,
        body: &str,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["campaigns", id.as_str(), "content"])?;
        self.execute(self.post_json(url, &SaveContentReq { subject, body }))
            .await?;
        Ok(())
    }

    async fn download_csv(&self, id: &CampaignId, kind: CsvKind) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(&["campaigns", id.as_str(), kind.resource()])?;
        let res = self.execute(self.get(url)).await?;
        Ok(res.bytes().await?.to_vec())
    }

    async fn upload_emails(
        &self,
        id: &CampaignId,
        emails: &[String],
    ) -> Result<UploadOutcome, ApiError> {
        let url = self.endpoint(&["campaigns", id.as_str(), "upload-emails"])?;
        self.fetch_json(self.post_json(url, &UploadEmailsReq { emails }))
            .await
    }

    async fn send(&self, id: &CampaignId) -> Result<SendOutcome, ApiError> {
        let url = self.endpoint(&["campaigns", id.as_str(), "send"])?;
        self.fetch_json(self.request(Method::POST, url)).await
    }

    async fn upload_and_send(
        &self,
        id: &CampaignId,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<SendOutcome, ApiError> {
        let url = self.endpoint(&["campaigns", id.as_str(), "upload-and-send"])?;
        let part = multipart::Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part("file", part);
        self.fetch_json(self.request(Method::POST, url).multipart(form))
            .await
    }

    async fn clear_all(&self) -> Result<(), ApiError> {
        let url = self.endpoint(&["admin", "clear-all"])?;
        self.execute(self.post_json(
            url,
            &ClearAllReq {
                confirm: CLEAR_ALL_PHRASE,
            },
        ))
        .await?;
        Ok(())
    }
}
