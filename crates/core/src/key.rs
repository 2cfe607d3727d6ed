//! Record keys - deterministic, namespaced addresses
//!
//! Every record is addressed by hashing its namespace tag together with an
//! ordered list of seeds. Relations are found by recomputing a key, never by
//! storing a pointer.
//!
//! | Namespace    | Seeds                        |
//! |--------------|------------------------------|
//! | `org_config` | authority                    |
//! | `vendor`     | org key, vendor name         |
//! | `request`    | org key, requester           |
//! | `invoice`    | org key, requester           |

use crate::identity::{Identity, IdentityError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// Keyspace of a record type
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, EnumIter, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    OrgConfig,
    Vendor,
    Request,
    Invoice,
}

impl Namespace {
    /// Tag mixed into key derivation and used as the storage discriminator
    pub fn tag(&self) -> &'static str {
        self.into()
    }
}

/// 32-byte record address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordKey([u8; 32]);

/// Derive a key from a namespace and ordered seeds.
///
/// Each seed is length-prefixed so `["ab", "c"]` and `["a", "bc"]` differ.
pub fn derive_key(namespace: Namespace, seeds: &[&[u8]]) -> RecordKey {
    let mut hasher = Sha256::new();
    hasher.update(namespace.tag().as_bytes());
    for seed in seeds {
        hasher.update((seed.len() as u32).to_le_bytes());
        hasher.update(seed);
    }
    RecordKey(hasher.finalize().into())
}

impl RecordKey {
    /// Organization config key, one per authority
    pub fn org(authority: &Identity) -> Self {
        derive_key(Namespace::OrgConfig, &[authority.as_bytes()])
    }

    pub fn vendor(org: &RecordKey, vendor_name: &str) -> Self {
        derive_key(Namespace::Vendor, &[org.as_bytes(), vendor_name.as_bytes()])
    }

    pub fn request(org: &RecordKey, requester: &Identity) -> Self {
        derive_key(Namespace::Request, &[org.as_bytes(), requester.as_bytes()])
    }

    pub fn invoice(org: &RecordKey, requester: &Identity) -> Self {
        derive_key(Namespace::Invoice, &[org.as_bytes(), requester.as_bytes()])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        Identity::from_hex(s).map(|id| Self(*id.as_bytes()))
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordKey({}..)", &self.to_hex()[..12])
    }
}

impl FromStr for RecordKey {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for RecordKey {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<RecordKey> for String {
    fn from(key: RecordKey) -> Self {
        key.to_hex()
    }
}
