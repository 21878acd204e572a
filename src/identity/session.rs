use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::debug;

use crate::storage::ProviderLink;

use super::authorisation::Authorisation;
use super::token::AccessToken;

/// A provider identity authenticated before any local account exists.
/// Lives only between the provider callback and account creation; the
/// draft link carries no guid until registration binds it.
#[derive(Debug, Clone)]
pub struct TransitionalProvider {
    pub access_token: AccessToken,
    pub provider_link: ProviderLink,
}

impl TransitionalProvider {
    pub fn new(provider: &str, resource_owner_id: &str, access_token: AccessToken) -> Self {
        Self {
            access_token,
            provider_link: ProviderLink::draft(provider, resource_owner_id),
        }
    }
}

/// Per-request session manager: the current authorisation (if any) plus the
/// transitional-provider slot. One value per request context — never shared
/// across requests, so concurrent users cannot observe each other's
/// in-flight provider state.
#[derive(Debug, Clone)]
pub struct Session {
    authorisation: Option<Authorisation>,
    transitional: Option<TransitionalProvider>,
    pub ttl: Duration,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60))
    }
}

impl Session {
    pub fn new(ttl: Duration) -> Self {
        Self { authorisation: None, transitional: None, ttl }
    }

    pub fn for_config(config: &crate::config::Config) -> Self {
        Self::new(Duration::from_secs(config.session_lifetime_secs))
    }

    /// True while a provider identity is parked here with no authorisation
    /// bound yet.
    pub fn is_transitional(&self) -> bool {
        self.transitional.is_some() && self.authorisation.is_none()
    }

    pub fn authorisation(&self) -> Option<&Authorisation> {
        self.authorisation.as_ref()
    }

    pub fn authorisation_mut(&mut self) -> Option<&mut Authorisation> {
        self.authorisation.as_mut()
    }

    /// Install a reconstructed authorisation (deserialized from storage).
    pub fn set_authorisation(&mut self, authorisation: Authorisation) {
        self.authorisation = Some(authorisation);
    }

    /// Store a provider token on the current authorisation, creating an
    /// empty one first when none exists yet.
    pub fn add_access_token(&mut self, provider: &str, token: AccessToken) {
        let auth = self.authorisation.get_or_insert_with(Authorisation::new);
        auth.add_access_token(provider, token);
    }

    /// Bind the current authorisation to an account guid with the default
    /// session lifetime, generating the session token as a side effect.
    pub fn create_authorisation(&mut self, guid: &str) -> Result<()> {
        let expires = Utc::now() + chrono::Duration::seconds(self.ttl.as_secs() as i64);
        let auth = self.authorisation.get_or_insert_with(Authorisation::new);
        auth.set_guid(guid);
        auth.set_expiry(expires)?;
        let token_len = auth.cookie().len();
        debug!("session.authorise guid={} token_len={} ttl_secs={}", guid, token_len, self.ttl.as_secs());
        Ok(())
    }

    pub fn set_transitional_provider(&mut self, provider: TransitionalProvider) {
        self.transitional = Some(provider);
    }

    pub fn transitional_provider(&self) -> Option<&TransitionalProvider> {
        self.transitional.as_ref()
    }

    /// One-shot consumption of the transitional slot. The slot is cleared
    /// so a later request can never replay it.
    pub fn take_transitional_provider(&mut self) -> Option<TransitionalProvider> {
        let taken = self.transitional.take();
        if let Some(tp) = &taken {
            debug!("session.transitional consumed provider={}", tp.provider_link.provider);
        }
        taken
    }

    /// Drop all session state (logout, or expiry observed by the caller).
    pub fn clear(&mut self) {
        self.authorisation = None;
        self.transitional = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitional_slot_is_consumed_once() {
        let mut session = Session::default();
        session.set_transitional_provider(TransitionalProvider::new(
            "google",
            "remote-1",
            AccessToken::new("tok"),
        ));
        assert!(session.is_transitional());
        let taken = session.take_transitional_provider();
        assert!(taken.is_some());
        assert!(session.take_transitional_provider().is_none());
        assert!(!session.is_transitional());
    }

    #[test]
    fn transitional_requires_no_authorisation() {
        let mut session = Session::default();
        session.set_transitional_provider(TransitionalProvider::new(
            "google",
            "remote-1",
            AccessToken::new("tok"),
        ));
        session.create_authorisation("g-1").unwrap();
        assert!(!session.is_transitional(), "an authorised session is no longer transitional");
    }

    #[test]
    fn create_authorisation_sets_identity_token_and_future_expiry() {
        let mut session = Session::new(Duration::from_secs(120));
        session.add_access_token("GitHub", AccessToken::new("tok"));
        session.create_authorisation("g-1").unwrap();
        let auth = session.authorisation_mut().unwrap();
        assert_eq!(auth.guid(), Some("g-1"));
        assert!(!auth.cookie().is_empty());
        assert!(!auth.is_expired(Utc::now()));
        assert_eq!(auth.access_token("github").unwrap().token, "tok");
    }
}
