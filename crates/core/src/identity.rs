//! Identities and signing keys
//!
//! An `Identity` is a 32-byte ed25519 public key. Every principal in the
//! system (org authority, oracle signer, requester, vendor payout, randomness
//! oracle) is addressed by one.

use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors from identity parsing, key files, and signature checks
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Signature verification failed: {0}")]
    SignatureMismatch(String),

    #[error("Key file error: {0}")]
    Io(#[from] std::io::Error),
}

/// A principal's public identity (ed25519 public key bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity([u8; 32]);

impl Identity {
    /// The all-zero identity, never a valid payout target
    pub const ZERO: Self = Self([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(s.trim()).map_err(|e| IdentityError::InvalidHex(e.to_string()))?;
        let actual = bytes.len();
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidLength { expected: 32, actual })?;
        Ok(Self(array))
    }

    /// Verify an ed25519 signature made by this identity
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<(), IdentityError> {
        let verifying_key = VerifyingKey::from_bytes(&self.0)
            .map_err(|e| IdentityError::InvalidKey(e.to_string()))?;

        let sig_array: [u8; 64] = signature.try_into().map_err(|_| IdentityError::InvalidLength {
            expected: 64,
            actual: signature.len(),
        })?;

        verifying_key
            .verify(message, &Signature::from_bytes(&sig_array))
            .map_err(|e| IdentityError::SignatureMismatch(e.to_string()))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({}..)", &self.to_hex()[..12])
    }
}

impl FromStr for Identity {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.to_hex()
    }
}

impl From<VerifyingKey> for Identity {
    fn from(key: VerifyingKey) -> Self {
        Self(key.to_bytes())
    }
}

/// An ed25519 signing key with its derived identity
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random signing key
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            signing_key: SigningKey::generate(&mut rng),
        }
    }

    /// Create from a 32-byte seed (hex-encoded)
    pub fn from_seed_hex(hex_seed: &str) -> Result<Self, IdentityError> {
        let bytes = hex::decode(hex_seed.trim()).map_err(|e| IdentityError::InvalidHex(e.to_string()))?;
        let actual = bytes.len();
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdentityError::InvalidLength { expected: 32, actual })?;

        Ok(Self {
            signing_key: SigningKey::from_bytes(&seed),
        })
    }

    /// Deterministic keypair from a seed (tests and fixtures)
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Read a key file containing the hex seed
    pub fn read_file(path: impl AsRef<Path>) -> Result<Self, IdentityError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_seed_hex(&content)
    }

    /// Write the hex seed to a key file
    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<(), IdentityError> {
        std::fs::write(path, self.seed_hex())?;
        Ok(())
    }

    /// Export the seed as hex (for storage)
    pub fn seed_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn identity(&self) -> Identity {
        Identity::from(self.signing_key.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("identity", &self.identity())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let identity = Keypair::generate().identity();
        let parsed: Identity = identity.to_hex().parse().unwrap();
        assert_eq!(identity, parsed);
    }

    #[test]
    fn test_invalid_length() {
        let result = Identity::from_hex("abcd");
        assert!(matches!(
            result,
            Err(IdentityError::InvalidLength { expected: 32, actual: 2 })
        ));
    }

    #[test]
    fn test_invalid_hex() {
        assert!(matches!(Identity::from_hex("zz"), Err(IdentityError::InvalidHex(_))));
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = Keypair::generate();
        let signature = keypair.sign(b"invoice");

        assert!(keypair.identity().verify(b"invoice", &signature).is_ok());
        assert!(keypair.identity().verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn test_seed_roundtrip() {
        let keypair = Keypair::generate();
        let restored = Keypair::from_seed_hex(&keypair.seed_hex()).unwrap();
        assert_eq!(keypair.identity(), restored.identity());
    }

    #[test]
    fn test_key_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("authority.key");

        let keypair = Keypair::generate();
        keypair.write_file(&path).unwrap();

        let loaded = Keypair::read_file(&path).unwrap();
        assert_eq!(keypair.identity(), loaded.identity());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let identity = Identity::new([7u8; 32]);
        let json = serde_json::to_string(&identity).unwrap();
        assert_eq!(json, format!("\"{}\"", "07".repeat(32)));

        let parsed: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, identity);
    }

    #[test]
    fn test_zero_identity() {
        assert!(Identity::ZERO.is_zero());
        assert!(!Keypair::from_seed([1u8; 32]).identity().is_zero());
    }
}
