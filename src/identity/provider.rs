use anyhow::Result;

use super::token::AccessToken;

/// External OAuth provider collaborator.
///
/// The provisioning core needs exactly one operation from it: the
/// password-grant token exchange used when registration runs without a
/// transitional provider in flight. Implementations own the transport,
/// timeout and retry policy; a failure here aborts the calling workflow
/// before any authorisation is created.
pub trait ProviderClient: Send + Sync {
    fn password_grant(&self, username: &str, password: &str) -> Result<AccessToken>;
}
