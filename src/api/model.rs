use serde::{Deserialize, Serialize};

#[derive(Serialize, Debug)]
pub struct CreateCampaignReq<'a> {
    pub name: &'a str,
}

#[derive(Serialize, Debug)]
pub struct SaveContentReq<'a> {
    pub subject: &'a str,
    pub body: &'a str,
}

#[derive(Serialize, Debug)]
pub struct UploadEmailsReq<'a> {
    pub emails: &'a [String],
}

#[derive(Serialize, Debug)]
pub struct ClearAllReq<'a> {
    pub confirm: &'a str,
}

/// Body of a failed request. Only `error` is ever read.
#[derive(Deserialize, Debug, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendOutcome {
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub failed: u64,
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UploadOutcome {
    #[serde(default)]
    pub uploaded: u64,
}
