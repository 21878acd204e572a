//! Account provisioning workflow.
//!
//! Orchestrates profile saves, registration and password recovery across
//! the persistence, notification and provider collaborators. The multi-step
//! sequences here are deliberately not transactional: every persistence
//! step is a separate `Records` call, the first failure propagates to the
//! caller, and steps already committed stay committed. An account that
//! exists without its credential or provider link is inert — it cannot
//! authenticate — so a retried registration simply provisions a fresh
//! account rather than repairing a half-written one.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::{Config, LOCAL_PROVIDER, VERIFICATION_KEY_NAME};
use crate::error::{AppError, AppResult};
use crate::event::{EventSink, ProfileEvent, ProfileEventKind};
use crate::identity::{AccessToken, ProviderClient, Session};
use crate::security;
use crate::storage::{Account, AccountMeta, Credential, Records};

/// Display-name/email/password edits for an existing profile, plus values
/// for any meta fields listeners declare during pre-save.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub displayname: String,
    pub email: String,
    pub password: Option<String>,
    pub meta: BTreeMap<String, String>,
}

/// Submitted registration data.
#[derive(Debug, Clone)]
pub struct Registration {
    pub displayname: String,
    pub email: String,
    pub password: Option<String>,
}

pub struct ProfileManager {
    config: Config,
    records: Arc<dyn Records>,
    events: Arc<dyn EventSink>,
}

impl ProfileManager {
    pub fn new(config: Config, records: Arc<dyn Records>, events: Arc<dyn EventSink>) -> Self {
        Self { config, records, events }
    }

    /// Apply edits to an existing account.
    ///
    /// Requires the account guid to be set — a missing guid is a programmer
    /// error, not a user condition. Fires the pre-save notification, saves
    /// the account, bootstraps or updates the local credential when a
    /// password was supplied, persists listener-declared meta fields, then
    /// fires post-save. A failure after the account write leaves the
    /// account change committed.
    pub fn save_profile(&self, account: &mut Account, form: &ProfileUpdate) -> AppResult<()> {
        if account.guid.is_empty() {
            return Err(AppError::precondition("guid_unset", "profile save requires an account guid"));
        }
        account.displayname = form.displayname.clone();
        account.email = form.email.clone();

        let mut event = ProfileEvent::new(account.clone());
        self.dispatch(ProfileEventKind::ProfilePreSave, &mut event)?;

        self.records.save_account(account)?;

        if let Some(password) = form.password.as_deref() {
            let hash = self.hash(password)?;
            let mut credential = match self.records.credential_by_resource_owner_id(&account.guid)? {
                Some(existing) => existing,
                None => {
                    let created = self.records.create_credential(&account.guid, &account.guid, true)?;
                    self.create_local_provider_link(&account.guid)?;
                    created
                }
            };
            credential.password_hash = Some(hash);
            self.records.save_credential(&credential)?;
        }

        // Persist the meta fields pre-save listeners declared
        for name in event.meta_field_names().to_vec() {
            let Some(value) = form.meta.get(&name) else { continue };
            let mut meta = match self.records.account_meta(&account.guid, &name)? {
                Some(existing) => existing,
                None => AccountMeta::new(&account.guid, &name, ""),
            };
            meta.value = value.clone();
            self.records.save_account_meta(&meta)?;
            event.add_meta_field(&name, value);
        }

        self.dispatch(ProfileEventKind::ProfilePostSave, &mut event)?;
        debug!("profile.save guid={}", account.guid);
        Ok(())
    }

    /// Replace the password hash of an existing local credential.
    ///
    /// Accounts without one authenticate only through a third-party
    /// provider, so recovery against them is a successful no-op with zero
    /// writes.
    pub fn save_recovery(&self, guid: &str, password: &str) -> AppResult<()> {
        let Some(mut credential) = self.records.credential_by_guid(guid)? else {
            debug!("profile.recovery no local credential guid={}", guid);
            return Ok(());
        };
        credential.password_hash = Some(self.hash(password)?);
        self.records.save_credential(&credential)?;
        debug!("profile.recovery guid={}", guid);
        Ok(())
    }

    /// Provision a new account from submitted registration data.
    ///
    /// Creates and saves the account (assigning its guid), issues the
    /// verification key, bootstraps a local credential when a password was
    /// supplied, resolves the provider access token — from the session's
    /// transitional provider if one is in flight, otherwise via a
    /// password grant against `provider` — then binds the session to the
    /// new identity and fires the registration notification.
    pub fn register(
        &self,
        session: &mut Session,
        registration: &Registration,
        provider: &dyn ProviderClient,
        provider_name: &str,
    ) -> AppResult<Account> {
        let account = self.records.create_account(
            &registration.displayname,
            &registration.email,
            &self.config.registration_roles,
        )?;
        self.records.save_account(&account)?;
        let guid = account.guid.clone();

        let mut event = ProfileEvent::new(account.clone());
        self.create_verification_key(&mut event, &guid)?;

        if let Some(password) = registration.password.as_deref() {
            self.create_local_credential(&guid, password)?;
            self.create_local_provider_link(&guid)?;
        }

        let access_token = if session.is_transitional() {
            self.convert_transitional_provider(session, &guid)?
        } else {
            provider
                .password_grant(&registration.email, registration.password.as_deref().unwrap_or_default())
                .map_err(|e| AppError::upstream("provider_grant_failed", e.to_string()))?
        };

        session.add_access_token(provider_name, access_token);
        session
            .create_authorisation(&guid)
            .map_err(|e| AppError::internal("authorisation_failed", e.to_string()))?;

        self.dispatch(ProfileEventKind::ProfileRegister, &mut event)?;
        info!("profile.register guid={} provider={}", guid, provider_name);
        Ok(account)
    }

    /// Issue the single-use email-verification key: persisted as account
    /// meta and attached to the event so a downstream mailer can send it.
    fn create_verification_key(&self, event: &mut ProfileEvent, guid: &str) -> AppResult<String> {
        let key = security::random_token();
        let meta = AccountMeta::new(guid, VERIFICATION_KEY_NAME, &key);
        self.records.save_account_meta(&meta)?;
        event.add_meta_field(VERIFICATION_KEY_NAME, &key);
        Ok(key)
    }

    fn create_local_credential(&self, guid: &str, password: &str) -> AppResult<Credential> {
        let mut credential = self.records.create_credential(guid, guid, true)?;
        credential.password_hash = Some(self.hash(password)?);
        self.records.save_credential(&credential)?;
        Ok(credential)
    }

    fn create_local_provider_link(&self, guid: &str) -> AppResult<()> {
        let link = self.records.create_provider_link(guid, LOCAL_PROVIDER, guid)?;
        self.records.save_provider_link(&link)?;
        Ok(())
    }

    /// Convert the session's in-flight provider identity into a persisted
    /// link bound to the new guid, consuming the transitional slot.
    fn convert_transitional_provider(&self, session: &mut Session, guid: &str) -> AppResult<AccessToken> {
        let transitional = session
            .take_transitional_provider()
            .ok_or_else(|| AppError::internal("transitional_missing", "transitional slot emptied mid-request"))?;
        let mut link = transitional.provider_link;
        link.guid = guid.to_string();
        link.lastupdate = Utc::now();
        self.records.save_provider_link(&link)?;
        debug!("profile.register converted transitional provider={} guid={}", link.provider, guid);
        Ok(transitional.access_token)
    }

    fn hash(&self, password: &str) -> AppResult<String> {
        security::hash_password(password).map_err(|e| AppError::internal("hash_failed", e.to_string()))
    }

    fn dispatch(&self, kind: ProfileEventKind, event: &mut ProfileEvent) -> AppResult<()> {
        self.events
            .dispatch(kind, event)
            .map_err(|e| AppError::internal("event_dispatch_failed", e.to_string()))
    }
}
