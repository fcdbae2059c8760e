//! Party 1 boundary
//!
//! Party 1 is an opaque peer reached through exactly two operations. The
//! endpoint is bound when the implementation is constructed, and the
//! implementation is handed to [`Party2`](crate::Party2) rather than looked
//! up from anywhere global.

use crate::wire::{KeyGenResponse, SignRequest, SignResponse};
use crate::Result;

pub use ::async_trait::async_trait;

/// The two request/response operations Party 1 exposes.
///
/// Both may advance hidden state on Party 1 (nonce commitments, share
/// records), so neither is safe to retry.
#[async_trait]
pub trait RemoteParty: Send + Sync {
    /// Where Party 1 lives, for logging
    fn endpoint(&self) -> &str;

    /// Run key generation and return `[key_pair, agg_pub_key, id]`
    async fn request_key_generation(&self) -> Result<KeyGenResponse>;

    /// Run a signing session for the share named in `request`
    async fn request_signature(&self, request: &SignRequest) -> Result<SignResponse>;
}

/// In-process Party 1 for tests
pub mod memory;
mod timeout;

pub use memory::MemoryParty;
pub use timeout::TimeoutParty;
