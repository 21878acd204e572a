use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use parking_lot::Mutex;

use super::entities::{Account, AccountMeta, Credential, ProviderLink};
use super::records::Records;

/// In-memory `Records` implementation backed by mutex-guarded maps.
/// Used by the test suite and by embedders that keep member state in
/// process. Every `save_*` bumps a write counter so callers can assert
/// on persistence traffic.
#[derive(Default)]
pub struct MemoryRecords {
    accounts: Mutex<BTreeMap<String, Account>>,
    credentials: Mutex<BTreeMap<String, Credential>>,
    links: Mutex<BTreeMap<(String, String), ProviderLink>>,
    meta: Mutex<BTreeMap<(String, String), AccountMeta>>,
    writes: AtomicUsize,
}

impl MemoryRecords {
    pub fn new() -> Self { Self::default() }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.lock().values().cloned().collect()
    }

    pub fn account(&self, guid: &str) -> Option<Account> {
        self.accounts.lock().get(guid).cloned()
    }

    pub fn credential(&self, guid: &str) -> Option<Credential> {
        self.credentials.lock().get(guid).cloned()
    }

    pub fn provider_links(&self) -> Vec<ProviderLink> {
        self.links.lock().values().cloned().collect()
    }

    pub fn provider_links_for(&self, guid: &str) -> Vec<ProviderLink> {
        self.links.lock().values().filter(|l| l.guid == guid).cloned().collect()
    }

    pub fn meta(&self, guid: &str, meta: &str) -> Option<AccountMeta> {
        self.meta.lock().get(&(guid.to_string(), meta.to_string())).cloned()
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Records for MemoryRecords {
    fn save_account(&self, account: &Account) -> Result<()> {
        self.accounts.lock().insert(account.guid.clone(), account.clone());
        self.record_write();
        Ok(())
    }

    fn save_credential(&self, credential: &Credential) -> Result<()> {
        self.credentials.lock().insert(credential.guid.clone(), credential.clone());
        self.record_write();
        Ok(())
    }

    fn credential_by_guid(&self, guid: &str) -> Result<Option<Credential>> {
        Ok(self.credentials.lock().get(guid).cloned())
    }

    fn credential_by_resource_owner_id(&self, resource_owner_id: &str) -> Result<Option<Credential>> {
        Ok(self.credentials.lock().values().find(|c| c.resource_owner_id == resource_owner_id).cloned())
    }

    fn save_provider_link(&self, link: &ProviderLink) -> Result<()> {
        self.links.lock().insert((link.guid.clone(), link.provider.clone()), link.clone());
        self.record_write();
        Ok(())
    }

    fn account_meta(&self, guid: &str, meta: &str) -> Result<Option<AccountMeta>> {
        Ok(self.meta.lock().get(&(guid.to_string(), meta.to_string())).cloned())
    }

    fn save_account_meta(&self, meta: &AccountMeta) -> Result<()> {
        self.meta.lock().insert((meta.guid.clone(), meta.meta.clone()), meta.clone());
        self.record_write();
        Ok(())
    }
}
