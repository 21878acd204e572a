use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member account. The guid is assigned once at creation and is the
/// stable identity every other entity hangs off.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub guid: String,
    pub displayname: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub verified: bool,
}

impl Account {
    pub fn new(displayname: &str, email: &str, roles: &[String]) -> Self {
        Self {
            guid: Uuid::new_v4().to_string(),
            displayname: displayname.to_string(),
            email: email.to_string(),
            roles: roles.to_vec(),
            enabled: true,
            verified: false,
        }
    }
}

/// Local login credential. `enabled` marks the account as locally
/// authenticatable; accounts reached only through a third-party provider
/// have no credential row at all.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credential {
    pub guid: String,
    pub resource_owner_id: String,
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(default)]
    pub enabled: bool,
}

impl Credential {
    pub fn new(guid: &str, resource_owner_id: &str, enabled: bool) -> Self {
        Self {
            guid: guid.to_string(),
            resource_owner_id: resource_owner_id.to_string(),
            password_hash: None,
            enabled,
        }
    }
}

/// Binding between an account and one authentication provider's remote id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderLink {
    pub guid: String,
    pub provider: String,
    pub resource_owner_id: String,
    pub lastupdate: DateTime<Utc>,
}

impl ProviderLink {
    pub fn new(guid: &str, provider: &str, resource_owner_id: &str) -> Self {
        Self {
            guid: guid.to_string(),
            provider: provider.to_lowercase(),
            resource_owner_id: resource_owner_id.to_string(),
            lastupdate: Utc::now(),
        }
    }

    /// Draft link for a provider identity that has no account yet.
    /// The guid stays empty until registration binds it.
    pub fn draft(provider: &str, resource_owner_id: &str) -> Self {
        Self::new("", provider, resource_owner_id)
    }
}

/// One key/value metadata entry attached to an account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccountMeta {
    pub guid: String,
    pub meta: String,
    pub value: String,
}

impl AccountMeta {
    pub fn new(guid: &str, meta: &str, value: &str) -> Self {
        Self { guid: guid.to_string(), meta: meta.to_string(), value: value.to_string() }
    }
}
