use anyhow::Result;

use super::entities::{Account, AccountMeta, Credential, ProviderLink};

/// Persistence collaborator for accounts, credentials, provider links and
/// account metadata. The provisioning workflow only ever talks to storage
/// through this trait; lookups model absence as `Ok(None)`.
///
/// The `create_*` operations build fresh entities (assigning identifiers
/// where needed) without persisting them; the matching `save_*` call is a
/// separate write.
pub trait Records: Send + Sync {
    fn create_account(&self, displayname: &str, email: &str, roles: &[String]) -> Result<Account> {
        Ok(Account::new(displayname, email, roles))
    }

    fn save_account(&self, account: &Account) -> Result<()>;

    fn create_credential(&self, guid: &str, resource_owner_id: &str, enabled: bool) -> Result<Credential> {
        Ok(Credential::new(guid, resource_owner_id, enabled))
    }

    fn save_credential(&self, credential: &Credential) -> Result<()>;

    fn credential_by_guid(&self, guid: &str) -> Result<Option<Credential>>;

    fn credential_by_resource_owner_id(&self, resource_owner_id: &str) -> Result<Option<Credential>>;

    fn create_provider_link(&self, guid: &str, provider: &str, resource_owner_id: &str) -> Result<ProviderLink> {
        Ok(ProviderLink::new(guid, provider, resource_owner_id))
    }

    fn save_provider_link(&self, link: &ProviderLink) -> Result<()>;

    fn account_meta(&self, guid: &str, meta: &str) -> Result<Option<AccountMeta>>;

    fn save_account_meta(&self, meta: &AccountMeta) -> Result<()>;
}
