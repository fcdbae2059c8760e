//! In-memory Party 1 for testing
//!
//! Runs both halves of the joint protocol in-process. Party 1's key pairs
//! live in a map keyed by share id, so the simulator behaves like a remote
//! peer that only knows the shares it generated itself.

use super::{async_trait, RemoteParty};
use crate::eddsa::{self, EphemeralKey, PARTY1_INDEX, PARTY2_INDEX};
use crate::types::{AggregatedKey, KeyPair};
use crate::wire::{KeyAggRecord, KeyGenResponse, KeyPairRecord, SignRequest, SignResponse};
use crate::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::rngs::OsRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Party 1's half of a share
#[derive(Clone)]
struct Party1Share {
    key_pair: KeyPair,
    agg_pub_key: AggregatedKey,
}

/// In-memory Party 1
#[derive(Clone)]
pub struct MemoryParty {
    /// Party 1 shares by id
    shares: Arc<DashMap<String, Party1Share>>,
    /// Ids with a signing session in progress
    in_flight: Arc<DashMap<String, ()>>,
    /// Pause between the commit and reveal rounds
    round_delay: Duration,
}

impl MemoryParty {
    pub const ENDPOINT: &'static str = "memory://party1";

    /// Create a new in-memory Party 1
    pub fn new() -> Self {
        Self {
            shares: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
            round_delay: Duration::ZERO,
        }
    }

    /// Sleep between rounds so overlapping sessions become observable
    pub fn with_round_delay(mut self, round_delay: Duration) -> Self {
        self.round_delay = round_delay;
        self
    }

    /// Number of shares generated so far
    pub fn share_count(&self) -> usize {
        self.shares.len()
    }

    /// Drop Party 1's half of a share
    pub fn forget(&self, id: &str) -> bool {
        self.shares.remove(id).is_some()
    }
}

impl Default for MemoryParty {
    fn default() -> Self {
        Self::new()
    }
}

/// Marks a share id busy until dropped
struct InFlight {
    sessions: Arc<DashMap<String, ()>>,
    id: String,
}

impl InFlight {
    fn enter(sessions: &Arc<DashMap<String, ()>>, id: &str) -> Result<Self> {
        match sessions.entry(id.to_string()) {
            Entry::Occupied(_) => Err(Error::Protocol(format!(
                "a signing session for share {} is already in progress",
                id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(Self {
                    sessions: Arc::clone(sessions),
                    id: id.to_string(),
                })
            }
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.sessions.remove(&self.id);
    }
}

#[async_trait]
impl RemoteParty for MemoryParty {
    fn endpoint(&self) -> &str {
        Self::ENDPOINT
    }

    async fn request_key_generation(&self) -> Result<KeyGenResponse> {
        let mut rng = OsRng;
        let party1 = eddsa::generate_key_pair(&mut rng);
        let party2 = eddsa::generate_key_pair(&mut rng);

        let keys = [*party1.public_key(), *party2.public_key()];
        let party1_agg = eddsa::aggregate_public_keys(&keys, PARTY1_INDEX)?;
        let party2_agg = eddsa::aggregate_public_keys(&keys, PARTY2_INDEX)?;

        let id = Uuid::new_v4().to_string();
        self.shares.insert(
            id.clone(),
            Party1Share {
                key_pair: party1,
                agg_pub_key: party1_agg,
            },
        );
        debug!(id = %id, "Generated share");

        Ok(KeyGenResponse(
            KeyPairRecord::from(&party2),
            KeyAggRecord::from(&party2_agg),
            id,
        ))
    }

    async fn request_signature(&self, request: &SignRequest) -> Result<SignResponse> {
        let party1 = self
            .shares
            .get(&request.id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::Protocol(format!("unknown share id {}", request.id)))?;
        let _session = InFlight::enter(&self.in_flight, &request.id)?;

        let party2 = KeyPair::try_from(&request.key_pair)?;
        let party2_agg = AggregatedKey::try_from(&request.agg_pub_key)?;
        if party2_agg.apk() != party1.agg_pub_key.apk() {
            return Err(Error::Protocol(
                "aggregated key does not match the stored share".into(),
            ));
        }
        let digest = request.digest()?;

        // Commit round
        let mut rng = OsRng;
        let eph1 = EphemeralKey::generate(
            party1.key_pair.expanded_private_key().prefix(),
            &digest,
            &mut rng,
        );
        let eph2 = EphemeralKey::generate(party2.expanded_private_key().prefix(), &digest, &mut rng);
        let (commit1, commit2) = (eph1.commitment(), eph2.commitment());

        if !self.round_delay.is_zero() {
            tokio::time::sleep(self.round_delay).await;
        }

        // Reveal round
        eddsa::verify_commitment(&commit1, eph1.public(), eph1.blind())?;
        eddsa::verify_commitment(&commit2, eph2.public(), eph2.blind())?;

        let big_r = eddsa::combine_nonces(eph1.public(), eph2.public());
        let c = eddsa::challenge(&big_r, party2_agg.apk(), &digest);
        let s1 = eddsa::partial_sign(&eph1, &party1.key_pair, &party1.agg_pub_key, &c);
        let s2 = eddsa::partial_sign(&eph2, &party2, &party2_agg, &c);

        let signature = eddsa::add_partial_signatures(big_r, &[s1, s2]);
        debug!(id = %request.id, "Signed");
        Ok(SignResponse::from(&signature))
    }
}
