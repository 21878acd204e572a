//! Authorisation state object.
//!
//! Holds one authenticated session: the account guid, the lazily generated
//! session token handed to the client, the expiry instant, and the access
//! tokens collected per provider. The serialized record is server-side
//! state keyed by the session token; only the token itself is ever exposed
//! as a cookie value.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::security;

use super::token::AccessToken;

/// Expiry value accepted at the boundary: an absolute instant, or a date
/// string paired with a named timezone. Resolved once into UTC; only the
/// resolved instant is stored.
#[derive(Debug, Clone, PartialEq)]
pub enum Expiry {
    At(DateTime<Utc>),
    Zoned { date: String, timezone: String },
}

impl Expiry {
    pub fn zoned(date: impl Into<String>, timezone: impl Into<String>) -> Self {
        Expiry::Zoned { date: date.into(), timezone: timezone.into() }
    }

    pub fn resolve(self) -> Result<DateTime<Utc>> {
        match self {
            Expiry::At(at) => Ok(at),
            Expiry::Zoned { date, timezone } => resolve_zoned(&date, &timezone),
        }
    }
}

impl From<DateTime<Utc>> for Expiry {
    fn from(at: DateTime<Utc>) -> Self {
        Expiry::At(at)
    }
}

fn resolve_zoned(date: &str, timezone: &str) -> Result<DateTime<Utc>> {
    let tz: chrono_tz::Tz = timezone
        .parse()
        .map_err(|e| anyhow!("unknown timezone '{}': {}", timezone, e))?;
    let naive = NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| anyhow!("bad expiry date '{}': {}", date, e))?;
    let local = tz
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| anyhow!("expiry '{}' is not a single instant in '{}'", date, timezone))?;
    Ok(local.with_timezone(&Utc))
}

/// One authenticated session's state.
///
/// Serializes to exactly `{identity, sessionToken, expiry, tokens}` with
/// `expiry` as epoch seconds. Deserialization additionally accepts the
/// structured `{date, timezone}` expiry form for records written by older
/// deployments.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Authorisation {
    #[serde(rename = "identity", default)]
    guid: Option<String>,
    #[serde(rename = "sessionToken", default)]
    cookie: Option<String>,
    #[serde(default, with = "expiry_serde")]
    expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    tokens: HashMap<String, AccessToken>,
}

impl Authorisation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guid(&self) -> Option<&str> {
        self.guid.as_deref()
    }

    pub fn set_guid(&mut self, guid: &str) {
        self.guid = Some(guid.to_string());
    }

    /// Session token, generated on first call and stable for the object's
    /// lifetime afterwards.
    pub fn cookie(&mut self) -> &str {
        self.cookie.get_or_insert_with(security::random_token)
    }

    pub fn set_cookie(&mut self, cookie: &str) {
        self.cookie = Some(cookie.to_string());
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry
    }

    /// Normalize and overwrite the expiry instant.
    pub fn set_expiry(&mut self, expiry: impl Into<Expiry>) -> Result<()> {
        self.expiry = Some(expiry.into().resolve()?);
        Ok(())
    }

    /// True when the expiry has passed. A session that never had an expiry
    /// set is treated as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry.map(|e| e <= now).unwrap_or(true)
    }

    /// Insert or replace the token stored under a provider name.
    /// Keys are folded to lower case so lookups are case-insensitive.
    pub fn add_access_token(&mut self, provider: &str, token: AccessToken) {
        self.tokens.insert(provider.to_lowercase(), token);
    }

    pub fn access_token(&self, provider: &str) -> AppResult<&AccessToken> {
        let provider = provider.to_lowercase();
        self.tokens.get(&provider).ok_or_else(|| {
            AppError::not_found("token_not_found", format!("no access token for provider '{provider}'"))
        })
    }

    pub fn access_tokens(&self) -> &HashMap<String, AccessToken> {
        &self.tokens
    }

    pub fn set_access_tokens(&mut self, tokens: HashMap<String, AccessToken>) {
        self.tokens = tokens.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect();
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reconstruct from serialized JSON.
    ///
    /// Malformed input — anything that is not a record carrying an identity
    /// — yields `None`: the caller has no valid prior session. Parse
    /// problems never surface as errors here.
    pub fn from_json(data: &str) -> Option<Authorisation> {
        let value: serde_json::Value = serde_json::from_str(data).ok()?;
        if !value.is_object() {
            return None;
        }
        let mut auth: Authorisation = serde_json::from_value(value).ok()?;
        match auth.guid.as_deref() {
            Some(guid) if !guid.is_empty() => {}
            _ => return None,
        }
        let tokens = std::mem::take(&mut auth.tokens);
        auth.tokens = tokens.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect();
        Some(auth)
    }
}

mod expiry_serde {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Epoch(i64),
        Zoned { date: String, timezone: String },
    }

    pub(super) fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(at) => s.serialize_i64(at.timestamp()),
            None => s.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<Repr>::deserialize(d)? {
            None => Ok(None),
            Some(Repr::Epoch(secs)) => Utc
                .timestamp_opt(secs, 0)
                .single()
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom("expiry out of range")),
            Some(Repr::Zoned { date, timezone }) => super::resolve_zoned(&date, &timezone)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Authorisation {
        let mut auth = Authorisation::new();
        auth.set_guid("11111111-2222-3333-4444-555555555555");
        auth.set_expiry(Utc::now() + chrono::Duration::hours(1)).unwrap();
        auth.add_access_token("GitHub", AccessToken::new("gh-token"));
        auth
    }

    #[test]
    fn cookie_is_generated_once_and_stable() {
        let mut auth = Authorisation::new();
        let first = auth.cookie().to_string();
        let second = auth.cookie().to_string();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn access_token_lookup_folds_case() {
        let auth = sample();
        assert_eq!(auth.access_token("github").unwrap().token, "gh-token");
        assert_eq!(auth.access_token("GITHUB").unwrap().token, "gh-token");
        assert!(matches!(auth.access_token("gitlab"), Err(AppError::NotFound { .. })));
    }

    #[test]
    fn adding_same_provider_in_different_case_replaces() {
        let mut auth = Authorisation::new();
        auth.add_access_token("local", AccessToken::new("t1"));
        auth.add_access_token("Local", AccessToken::new("t2"));
        assert_eq!(auth.access_tokens().len(), 1);
        assert_eq!(auth.access_token("local").unwrap().token, "t2");
    }

    #[test]
    fn serialized_record_has_exact_fields() {
        let mut auth = sample();
        auth.cookie();
        let value = serde_json::to_value(&auth).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<&str> = obj.keys().map(|k| k.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["expiry", "identity", "sessionToken", "tokens"]);
        assert!(obj["expiry"].is_i64());
    }

    #[test]
    fn json_round_trip_preserves_tokens_and_expiry() {
        let mut auth = sample();
        auth.cookie();
        let json = auth.to_json().unwrap();
        let back = Authorisation::from_json(&json).expect("round trip");
        assert_eq!(back.access_tokens(), auth.access_tokens());
        // Expiry serializes at second precision
        assert_eq!(back.expiry().unwrap().timestamp(), auth.expiry().unwrap().timestamp());
        assert_eq!(back.guid(), auth.guid());
    }

    #[test]
    fn from_json_accepts_zoned_expiry() {
        let json = r#"{
            "identity": "g-1",
            "sessionToken": "abc",
            "expiry": {"date": "2026-03-08 10:00:00.000000", "timezone": "Europe/Amsterdam"},
            "tokens": {"Google": {"token": "goog"}}
        }"#;
        let auth = Authorisation::from_json(json).expect("zoned expiry");
        // 10:00 CET (+01:00, before the DST switch) is 09:00 UTC
        let expected = Utc.with_ymd_and_hms(2026, 3, 8, 9, 0, 0).unwrap();
        assert_eq!(auth.expiry().unwrap(), expected);
        // Token keys come back lower-cased
        assert_eq!(auth.access_token("google").unwrap().token, "goog");
        // Re-serializing emits the instant form; it must parse to the same state
        let again = Authorisation::from_json(&auth.to_json().unwrap()).unwrap();
        assert_eq!(again.expiry(), auth.expiry());
        assert_eq!(again.access_tokens(), auth.access_tokens());
    }

    #[test]
    fn from_json_rejects_non_records() {
        assert!(Authorisation::from_json("42").is_none());
        assert!(Authorisation::from_json("\"hello\"").is_none());
        assert!(Authorisation::from_json("[1, 2, 3]").is_none());
        assert!(Authorisation::from_json("{}").is_none());
        assert!(Authorisation::from_json("not json at all").is_none());
    }

    #[test]
    fn from_json_rejects_unresolvable_expiry() {
        let json = r#"{"identity": "g-1", "expiry": {"date": "never", "timezone": "Mars/Olympus"}}"#;
        assert!(Authorisation::from_json(json).is_none());
    }

    #[test]
    fn expiry_check() {
        let mut auth = Authorisation::new();
        let now = Utc::now();
        assert!(auth.is_expired(now), "no expiry means not a live session");
        auth.set_expiry(now + chrono::Duration::hours(1)).unwrap();
        assert!(!auth.is_expired(now));
        assert!(auth.is_expired(now + chrono::Duration::hours(2)));
    }
}
