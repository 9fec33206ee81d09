use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Opaque campaign identifier. The server may send it as a string or a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CampaignId(String);

impl CampaignId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CampaignId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CampaignId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for CampaignId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => CampaignId(s),
            Raw::Number(n) => CampaignId(n.to_string()),
        })
    }
}

/// Lifecycle status as reported by the server.
///
/// Only `draft`, `ready` and `sent` are known to the clients. Anything else is
/// kept as-is so a newer server does not break deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum CampaignStatus {
    #[default]
    Draft,
    Ready,
    Sent,
    Other(String),
}

impl CampaignStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Ready => "ready",
            CampaignStatus::Sent => "sent",
            CampaignStatus::Other(s) => s,
        }
    }

    /// Content can no longer change once a campaign is sent.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Sent)
    }
}

impl From<Option<String>> for CampaignStatus {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref().map(str::trim) {
            None | Some("") | Some("draft") => CampaignStatus::Draft,
            Some("ready") => CampaignStatus::Ready,
            Some("sent") => CampaignStatus::Sent,
            Some(other) => CampaignStatus::Other(other.to_string()),
        }
    }
}

impl From<CampaignStatus> for Option<String> {
    fn from(status: CampaignStatus) -> Self {
        Some(status.as_str().to_string())
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached copy of a server-owned campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub status: CampaignStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Campaign {
    pub fn created_at_parsed(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }
}

/// Parse the timestamp shapes the API has been seen to emit.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Newest first. Records without a usable timestamp go last, in server order.
pub fn sort_newest_first(campaigns: &mut [Campaign]) {
    campaigns.sort_by(|a, b| b.created_at_parsed().cmp(&a.created_at_parsed()));
}

/// Reply records are opaque; only their number matters here.
pub type Reply = serde_json::Value;

/// Extract recipient addresses from an uploaded text file: one per line, any
/// line containing `@` counts. A leading byte-order mark is ignored.
pub fn parse_recipients(text: &str) -> Vec<String> {
    text.lines()
        .flat_map(|line| line.split('\r'))
        .map(|line| line.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}'))
        .filter(|line| line.contains('@'))
        .map(str::to_string)
        .collect()
}
