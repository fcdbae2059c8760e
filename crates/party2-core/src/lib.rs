//! # Party 2 Core
//!
//! Client side ("Party 2") of a two-party threshold Ed25519 scheme. The
//! signing key never exists in one place: Party 2 holds one additive share,
//! a remote Party 1 holds the other, and the two cooperate to produce
//! signatures that any standard Ed25519 verifier accepts under the
//! aggregated public key.
//!
//! This crate provides:
//! - The scalar/point data model and the key share entities
//! - The hex/wire codec used at the Party 1 and signature boundaries
//! - The [`RemoteParty`] interface and the [`Party2`] driver
//! - Per-share signing locks
//!
//! ## Example
//!
//! ```rust,ignore
//! use party2_core::{Party2, SigningLocks};
//! use party1_client::Party1Client;
//!
//! let party = Party2::new(Party1Client::new("http://127.0.0.1:8000"));
//!
//! // Generate a share; persisting it is up to the caller
//! let share = party.generate_key().await?;
//!
//! // Sign a digest, never more than once at a time per share
//! let locks = SigningLocks::new();
//! let signature = party.sign_exclusive(&locks, &digest, &share).await?;
//! let bytes: [u8; 64] = signature.to_bytes();
//! ```

pub mod codec;
pub mod eddsa;
pub mod error;
pub mod lock;
pub mod party2;
pub mod remote;
pub mod types;
pub mod wire;

pub use error::{Error, Result};
pub use lock::SigningLocks;
pub use party2::Party2;
pub use remote::{MemoryParty, RemoteParty, TimeoutParty};
pub use types::{AggregatedKey, ExpandedPrivateKey, KeyPair, KeyShare, Point, Scalar, Signature};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
