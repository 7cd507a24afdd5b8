//! `--with-colons --fixed-list-mode` key listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner trust as stored in the trust database (field 9 of a `pub` record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerTrust {
    Unknown,
    Undefined,
    Never,
    Marginal,
    Full,
    Ultimate,
}

impl OwnerTrust {
    pub fn from_colon(c: char) -> Self {
        match c {
            'q' => OwnerTrust::Undefined,
            'n' => OwnerTrust::Never,
            'm' => OwnerTrust::Marginal,
            'f' => OwnerTrust::Full,
            'u' => OwnerTrust::Ultimate,
            _ => OwnerTrust::Unknown,
        }
    }

    /// The number `gpg --edit-key trust` expects for this level.
    pub fn level(self) -> i32 {
        match self {
            OwnerTrust::Unknown | OwnerTrust::Undefined => 1,
            OwnerTrust::Never => 2,
            OwnerTrust::Marginal => 3,
            OwnerTrust::Full => 4,
            OwnerTrust::Ultimate => 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subkey {
    pub key_id: String,
    pub fingerprint: String,
    pub algorithm: u32,
    pub length: u32,
    pub created: Option<i64>,
    pub expires: Option<i64>,
    pub revoked: bool,
    pub capabilities: String,
}

/// A key as read back from one key database. `subkeys[0]` is the primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHandle {
    pub fingerprint: String,
    pub owner_trust: OwnerTrust,
    pub user_ids: Vec<String>,
    pub subkeys: Vec<Subkey>,
}

impl Subkey {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created.and_then(|t| DateTime::from_timestamp(t, 0))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires.and_then(|t| DateTime::from_timestamp(t, 0))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|e| e <= now)
    }
}

impl KeyHandle {
    pub fn primary(&self) -> Option<&Subkey> {
        self.subkeys.first()
    }
}

/// Parses every `pub` block in a colon listing. Unknown record types are
/// skipped; a `fpr` record applies to the key record right before it.
pub fn parse_colon_listing(text: &str) -> Vec<KeyHandle> {
    let mut keys: Vec<KeyHandle> = Vec::new();
    let mut in_key = false;

    for line in text.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        let field = |i: usize| fields.get(i).copied().unwrap_or("");

        match field(0) {
            "pub" => {
                in_key = true;
                keys.push(KeyHandle {
                    fingerprint: String::new(),
                    owner_trust: OwnerTrust::from_colon(field(8).chars().next().unwrap_or('-')),
                    user_ids: Vec::new(),
                    subkeys: vec![subkey_from(&fields)],
                });
            }
            "sub" if in_key => {
                if let Some(key) = keys.last_mut() {
                    key.subkeys.push(subkey_from(&fields));
                }
            }
            "fpr" if in_key => {
                let Some(key) = keys.last_mut() else { continue };
                let fpr = field(9).to_string();
                if let Some(sk) = key.subkeys.last_mut() {
                    if sk.fingerprint.is_empty() {
                        sk.fingerprint = fpr.clone();
                    }
                }
                if key.fingerprint.is_empty() {
                    key.fingerprint = fpr;
                }
            }
            "uid" if in_key => {
                if let Some(key) = keys.last_mut() {
                    key.user_ids.push(field(9).to_string());
                }
            }
            "sec" | "crt" | "crs" => in_key = false,
            _ => {}
        }
    }
    keys
}

fn subkey_from(fields: &[&str]) -> Subkey {
    let field = |i: usize| fields.get(i).copied().unwrap_or("");
    let ts = |s: &str| s.parse::<i64>().ok().filter(|v| *v > 0);
    Subkey {
        key_id: field(4).to_string(),
        fingerprint: String::new(),
        algorithm: field(3).parse().unwrap_or(0),
        length: field(2).parse().unwrap_or(0),
        created: ts(field(5)),
        expires: ts(field(6)),
        revoked: field(1) == "r",
        capabilities: field(11).to_string(),
    }
}
