//! Deadline wrapper for any [`RemoteParty`]

use super::{async_trait, RemoteParty};
use crate::wire::{KeyGenResponse, SignRequest, SignResponse};
use crate::{Error, Result};
use std::time::Duration;
use tracing::warn;

/// Fails a call with [`Error::Network`] once `timeout` elapses.
///
/// An abandoned signing call may still complete on Party 1's side. Start a
/// fresh session rather than retrying the same one.
pub struct TimeoutParty<R> {
    inner: R,
    timeout: Duration,
}

impl<R> TimeoutParty<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[async_trait]
impl<R: RemoteParty> RemoteParty for TimeoutParty<R> {
    fn endpoint(&self) -> &str {
        self.inner.endpoint()
    }

    async fn request_key_generation(&self) -> Result<KeyGenResponse> {
        match tokio::time::timeout(self.timeout, self.inner.request_key_generation()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(endpoint = self.endpoint(), timeout = ?self.timeout, "Key generation timed out");
                Err(Error::Network(format!(
                    "key generation timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }

    async fn request_signature(&self, request: &SignRequest) -> Result<SignResponse> {
        match tokio::time::timeout(self.timeout, self.inner.request_signature(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(endpoint = self.endpoint(), id = %request.id, timeout = ?self.timeout, "Signing timed out");
                Err(Error::Network(format!(
                    "signing timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }
}
