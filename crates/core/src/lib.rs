//! InvoiceClaim Core - Domain types
//!
//! This crate contains the fundamental types used across InvoiceClaim:
//! - `TokenAmount`: Fixed-point monetary amount in smallest units
//! - `Identity` / `Keypair`: ed25519 principals that sign operations
//! - `RecordKey`: Deterministic, namespaced record addresses
//! - `Clock`: Time source (system or manual for tests)

pub mod amount;
pub mod clock;
pub mod identity;
pub mod key;

pub use amount::{AmountError, TokenAmount};
pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::{Identity, IdentityError, Keypair};
pub use key::{derive_key, Namespace, RecordKey};
