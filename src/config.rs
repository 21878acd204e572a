//! Library configuration for session issuance and registration.

/// Meta key under which the email-verification key is stored on an account.
pub const VERIFICATION_KEY_NAME: &str = "account-verification-key";

/// Provider name used for password-authenticated local credentials.
pub const LOCAL_PROVIDER: &str = "local";

#[derive(Debug, Clone)]
pub struct Config {
    /// Lifetime of a newly created authorisation, in seconds.
    pub session_lifetime_secs: u64,
    /// Roles granted to accounts created through registration.
    pub registration_roles: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_lifetime_secs: 60 * 60,
            registration_roles: vec!["members".to_string()],
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_session_lifetime_secs(mut self, secs: u64) -> Self {
        self.session_lifetime_secs = secs;
        self
    }

    #[must_use]
    pub fn with_registration_roles(mut self, roles: Vec<String>) -> Self {
        self.registration_roles = roles;
        self
    }
}
