//! GitHub REST API data models for the contents endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata of a file stored in a repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentMeta {
    /// Repository-relative path
    pub path: String,

    /// Blob SHA; required to update the file
    pub sha: String,

    #[serde(default)]
    pub size: u64,

    #[serde(default)]
    pub html_url: Option<String>,
}

/// Commit created by a contents write
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitMeta {
    pub sha: String,

    #[serde(default)]
    pub html_url: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `PUT /repos/{owner}/{repo}/contents/{path}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PutContentsResponse {
    #[serde(default)]
    pub content: Option<ContentMeta>,

    pub commit: CommitMeta,
}

/// Body of a contents write
#[derive(Debug, Serialize)]
pub(crate) struct PutContentsRequest<'a> {
    pub message: &'a str,

    /// Base64 encoded file content
    pub content: String,

    /// Revision being replaced; omitted for creates
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<&'a str>,
}

/// Installation access token minted for a GitHub App
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct InstallationToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
