use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque access-token record issued by an authentication provider.
/// Stored per provider inside an `Authorisation`; the token value and its
/// refresh metadata belong to the provider collaborator, not to this crate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// Absolute token expiry, epoch seconds.
    #[serde(default)]
    pub expires: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub resource_owner_id: Option<String>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into(), expires: None, refresh_token: None, resource_owner_id: None }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|e| e <= now.timestamp()).unwrap_or(false)
    }
}
