//! Profile notification events.
//! The workflow dispatches synchronously at fixed points; listeners sit
//! behind the `EventSink` trait rather than a process-wide bus.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::storage::Account;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileEventKind {
    ProfilePreSave,
    ProfilePostSave,
    ProfileRegister,
}

/// Payload carried through one profile operation: the account snapshot,
/// the meta field names listeners declared during pre-save, and the meta
/// values the workflow actually persisted.
#[derive(Debug, Clone)]
pub struct ProfileEvent {
    account: Account,
    meta_field_names: Vec<String>,
    meta_fields: BTreeMap<String, String>,
}

impl ProfileEvent {
    pub fn new(account: Account) -> Self {
        Self { account, meta_field_names: Vec::new(), meta_fields: BTreeMap::new() }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Declare a meta field the workflow should persist after the account
    /// save. Meant for pre-save listeners; duplicate names collapse.
    pub fn declare_meta_field(&mut self, name: &str) {
        if !self.meta_field_names.iter().any(|n| n == name) {
            self.meta_field_names.push(name.to_string());
        }
    }

    pub fn meta_field_names(&self) -> &[String] {
        &self.meta_field_names
    }

    /// Record a persisted meta value back onto the event so post-save and
    /// register listeners (e.g. a mailer) can read it.
    pub fn add_meta_field(&mut self, name: &str, value: &str) {
        self.meta_fields.insert(name.to_string(), value.to_string());
    }

    pub fn meta_fields(&self) -> &BTreeMap<String, String> {
        &self.meta_fields
    }
}

pub trait EventSink: Send + Sync {
    fn dispatch(&self, kind: ProfileEventKind, event: &mut ProfileEvent) -> Result<()>;
}

/// Sink for embedders with no listeners.
pub struct NullSink;

impl EventSink for NullSink {
    fn dispatch(&self, _kind: ProfileEventKind, _event: &mut ProfileEvent) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_meta_fields_collapse_duplicates() {
        let account = Account::new("Ada", "ada@example.com", &[]);
        let mut event = ProfileEvent::new(account);
        event.declare_meta_field("newsletter");
        event.declare_meta_field("newsletter");
        assert_eq!(event.meta_field_names(), ["newsletter".to_string()]);
        event.add_meta_field("newsletter", "weekly");
        assert_eq!(event.meta_fields().get("newsletter").map(String::as_str), Some("weekly"));
    }
}
