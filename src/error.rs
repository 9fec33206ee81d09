use reqwest::StatusCode;
use thiserror::Error;

use crate::export::CsvKind;
use crate::model::CampaignStatus;

/// Failure talking to the remote campaign API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}{}", suffix(.message))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cannot build request url from {0}")]
    Url(String),
}

impl ApiError {
    /// The `error` field the server put in its response body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status {
                message: Some(m), ..
            } if !m.trim().is_empty() => Some(m),
            _ => None,
        }
    }
}

fn suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

fn server_or<'a>(err: &'a ApiError, fallback: &'a str) -> &'a str {
    err.server_message().unwrap_or(fallback)
}

/// Typed failure of a store transition. `Display` is the operator-facing text.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no campaign selected")]
    NoSelection,
    #[error("campaign name must not be blank")]
    BlankName,
    #[error("subject and body must not be blank")]
    BlankContent,
    #[error("campaign has already been sent")]
    ContentLocked,
    #[error("campaign must be marked ready before sending (status: {0})")]
    NotReady(CampaignStatus),
    #[error("no valid emails found")]
    NoValidEmails,
    #[error("clear-all cancelled")]
    ConfirmationDeclined,
    #[error("confirmation phrase did not match; nothing was deleted")]
    ConfirmationMismatch,
    #[error("another action is still in progress")]
    Busy,
    #[error("campaign list could not be loaded; refresh before continuing")]
    Stale,

    #[error("Failed to load campaigns")]
    Load(#[source] ApiError),
    #[error("Failed to create campaign")]
    Create(#[source] ApiError),
    #[error("{}", server_or(.0, "Save failed"))]
    Save(#[source] ApiError),
    #[error("{}", server_or(.0, "Upload failed"))]
    Upload(#[source] ApiError),
    #[error("{}", server_or(.0, "Send failed"))]
    Send(#[source] ApiError),
    #[error("{}", .kind.failure_message())]
    Export {
        kind: CsvKind,
        #[source]
        source: ApiError,
    },
    #[error("{}", server_or(.0, "Failed to clear data"))]
    Clear(#[source] ApiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
