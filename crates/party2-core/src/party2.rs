//! Party 2 protocol driver

use crate::lock::SigningLocks;
use crate::remote::RemoteParty;
use crate::types::{KeyShare, Signature};
use crate::wire::SignRequest;
use crate::{Error, Result};
use tracing::{debug, info, instrument};

/// Client side of the two-party protocol.
///
/// Holds no state between calls: every call is one exchange with Party 1
/// over the injected [`RemoteParty`]. Failures are all-or-nothing, and
/// nothing is retried.
pub struct Party2<R> {
    remote: R,
}

impl<R: RemoteParty> Party2<R> {
    pub fn new(remote: R) -> Self {
        Self { remote }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Jointly generate a key share with Party 1.
    ///
    /// Every returned field is decoded and range-checked before the share is
    /// assembled. No other local computation happens here.
    #[instrument(skip(self), fields(endpoint = self.remote.endpoint()))]
    pub async fn generate_key(&self) -> Result<KeyShare> {
        info!("Starting key generation");

        let response = self.remote.request_key_generation().await?;
        let share = KeyShare::try_from(&response)?;

        info!(
            id = share.id(),
            public_key = hex::encode(share.public_key_bytes()),
            "Key generation completed"
        );
        Ok(share)
    }

    /// Jointly sign `message_digest` with the share from [`generate_key`](Self::generate_key).
    ///
    /// The digest is opaque here; pre-hashing the actual message is the
    /// caller's job. Callers must not run two `sign` calls for the same
    /// share id at once; see [`sign_exclusive`](Self::sign_exclusive).
    #[instrument(skip(self, message_digest, share), fields(endpoint = self.remote.endpoint(), id = share.id()))]
    pub async fn sign(&self, message_digest: &[u8], share: &KeyShare) -> Result<Signature> {
        if message_digest.is_empty() {
            return Err(Error::Precondition("message digest is empty".into()));
        }
        share.ensure_initialized()?;

        let request = SignRequest::new(message_digest, share);
        debug!(digest = %request.message_digest, "Requesting signature");

        let response = self.remote.request_signature(&request).await?;
        let signature = Signature::try_from(&response)?;
        signature.verify(&share.public_key(), message_digest)?;

        info!(
            r = hex::encode(signature.r.as_bytes()),
            "Signature completed"
        );
        Ok(signature)
    }

    /// [`sign`](Self::sign) while holding the share's lock in `locks`
    pub async fn sign_exclusive(
        &self,
        locks: &SigningLocks,
        message_digest: &[u8],
        share: &KeyShare,
    ) -> Result<Signature> {
        let _guard = locks.acquire(share.id()).await;
        self.sign(message_digest, share).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_scalar_hex;
    use crate::eddsa::key_pair_from_seed;
    use crate::remote::{async_trait, MemoryParty};
    use crate::wire::{KeyGenResponse, KeyPairRecord, SignResponse};
    use serde::de::DeserializeOwned;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Canned Party 1 behaviour
    enum Reply {
        Json(serde_json::Value),
        Refused,
        Rejected,
    }

    impl Reply {
        fn resolve<T: DeserializeOwned>(&self) -> Result<T> {
            match self {
                Reply::Json(value) => Ok(serde_json::from_value(value.clone())?),
                Reply::Refused => Err(Error::Network("connection refused".into())),
                Reply::Rejected => Err(Error::Protocol("unknown share id".into())),
            }
        }
    }

    struct StubParty {
        keygen: Reply,
        sign: Reply,
        calls: AtomicUsize,
    }

    impl StubParty {
        fn new(keygen: Reply, sign: Reply) -> Self {
            Self {
                keygen,
                sign,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl RemoteParty for StubParty {
        fn endpoint(&self) -> &str {
            "stub://party1"
        }

        async fn request_key_generation(&self) -> Result<KeyGenResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.keygen.resolve()
        }

        async fn request_signature(&self, _request: &SignRequest) -> Result<SignResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sign.resolve()
        }
    }

    fn key_pair_json() -> serde_json::Value {
        serde_json::to_value(KeyPairRecord::from(&key_pair_from_seed(&[7u8; 32]))).unwrap()
    }

    /// Compressed encoding of the identity, short one leading zero nibble
    fn identity_hex() -> String {
        format!("1{}", "0".repeat(62))
    }

    fn keygen_reply(apk: &str, hash: &str, id: &str) -> Reply {
        Reply::Json(json!([key_pair_json(), { "apk": { "bytes_str": apk }, "hash": hash }, id]))
    }

    fn stub_share() -> KeyShare {
        serde_json::from_value(json!({
            "key_pair": key_pair_json(),
            "agg_pub_key": { "apk": { "bytes_str": "5866666666666666666666666666666666666666666666666666666666666666" }, "hash": "1" },
            "id": "share-1"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_scenario_padded_apk() {
        let apk = format!("1{}", "0".repeat(62));
        let hash = format!("2{}", "0".repeat(62));
        let party = Party2::new(StubParty::new(keygen_reply(&apk, &hash, "share-1"), Reply::Refused));

        let share = party.generate_key().await.unwrap();

        let mut expected = [0u8; 32];
        expected[0] = 0x01;
        assert_eq!(share.public_key().to_bytes(), expected);
        assert_eq!(share.id(), "share-1");
        assert_eq!(encode_scalar_hex(share.agg_pub_key().hash()), format!("0{}", hash));
    }

    #[tokio::test]
    async fn test_non_hex_apk_is_encoding_error() {
        let party = Party2::new(StubParty::new(keygen_reply("not-hex", "2", "share-1"), Reply::Refused));
        let err = party.generate_key().await.unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_hash_is_encoding_error() {
        let order = "1000000000000000000000000000000014def9dea2f79cd65812631a5cf5d3ed";
        let party = Party2::new(StubParty::new(keygen_reply(&identity_hex(), order, "share-1"), Reply::Refused));
        let err = party.generate_key().await.unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[tokio::test]
    async fn test_malformed_keygen_shape_is_encoding_error() {
        let reply = Reply::Json(json!({ "apk": "1", "hash": "2", "id": "share-1" }));
        let party = Party2::new(StubParty::new(reply, Reply::Refused));
        let err = party.generate_key().await.unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[tokio::test]
    async fn test_empty_id_is_protocol_error() {
        let party = Party2::new(StubParty::new(keygen_reply(&identity_hex(), "2", ""), Reply::Refused));
        let err = party.generate_key().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_blank_id_is_rejected_at_keygen_not_sign() {
        let party = Party2::new(StubParty::new(keygen_reply(&identity_hex(), "2", "  "), Reply::Refused));
        let err = party.generate_key().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let party = Party2::new(StubParty::new(Reply::Refused, Reply::Refused));
        assert!(matches!(party.generate_key().await, Err(Error::Network(_))));
        assert!(matches!(
            party.sign(&[1u8; 32], &stub_share()).await,
            Err(Error::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_rejection_is_protocol_error() {
        let party = Party2::new(StubParty::new(Reply::Rejected, Reply::Rejected));
        assert!(matches!(
            party.sign(&[1u8; 32], &stub_share()).await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_rejects_uninitialized_share_without_calling_party1() {
        let share: KeyShare = serde_json::from_value(json!({
            "key_pair": key_pair_json(),
            "agg_pub_key": { "apk": { "bytes_str": identity_hex() }, "hash": "1" },
            "id": ""
        }))
        .unwrap();
        let party = Party2::new(StubParty::new(Reply::Refused, Reply::Refused));

        let err = party.sign(&[1u8; 32], &share).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(party.remote().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sign_rejects_empty_digest() {
        let party = Party2::new(StubParty::new(Reply::Refused, Reply::Refused));
        let err = party.sign(&[], &stub_share()).await.unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
    }

    #[tokio::test]
    async fn test_bad_signature_fields_are_encoding_errors() {
        let reply = Reply::Json(json!({ "R": { "bytes_str": identity_hex() }, "s": "zz" }));
        let party = Party2::new(StubParty::new(Reply::Refused, reply));
        assert!(matches!(
            party.sign(&[1u8; 32], &stub_share()).await,
            Err(Error::Encoding(_))
        ));

        let reply = Reply::Json(json!({ "R": { "bytes_str": format!("02{}", "0".repeat(62)) }, "s": "1" }));
        let party = Party2::new(StubParty::new(Reply::Refused, reply));
        assert!(matches!(
            party.sign(&[1u8; 32], &stub_share()).await,
            Err(Error::Encoding(_))
        ));
    }

    #[tokio::test]
    async fn test_forged_signature_is_protocol_error() {
        // Well-formed, but does not satisfy the verification equation
        let reply = Reply::Json(json!({
            "R": { "bytes_str": "5866666666666666666666666666666666666666666666666666666666666666" },
            "s": "1"
        }));
        let party = Party2::new(StubParty::new(Reply::Refused, reply));
        assert!(matches!(
            party.sign(&[1u8; 32], &stub_share()).await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_signature_verifies_as_plain_ed25519() {
        let party = Party2::new(MemoryParty::new());
        let share = party.generate_key().await.unwrap();

        for digest in [[0u8; 32], [0xffu8; 32], [0x5au8; 32]] {
            let signature = party.sign(&digest, &share).await.unwrap();
            let wire = signature.to_bytes();
            assert_eq!(wire.len(), 64);

            let verifying_key =
                ed25519_dalek::VerifyingKey::from_bytes(&share.public_key_bytes()).unwrap();
            verifying_key
                .verify_strict(&digest, &ed25519_dalek::Signature::from_bytes(&wire))
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_key_generation_yields_distinct_shares() {
        let party = Party2::new(MemoryParty::new());
        let first = party.generate_key().await.unwrap();
        let second = party.generate_key().await.unwrap();

        assert_ne!(first.id(), second.id());
        assert_ne!(first.public_key(), second.public_key());
    }

    #[tokio::test]
    async fn test_persisted_share_still_signs() {
        let party = Party2::new(MemoryParty::new());
        let share = party.generate_key().await.unwrap();

        let stored = serde_json::to_string(&share).unwrap();
        let restored: KeyShare = serde_json::from_str(&stored).unwrap();

        let signature = party.sign(&[9u8; 32], &restored).await.unwrap();
        signature.verify(&share.public_key(), &[9u8; 32]).unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_signs_on_one_share_are_unsafe() {
        let party = Party2::new(MemoryParty::new().with_round_delay(Duration::from_millis(50)));
        let share = party.generate_key().await.unwrap();

        let (a, b) = tokio::join!(party.sign(&[1u8; 32], &share), party.sign(&[2u8; 32], &share));

        // The simulator refuses the overlapping session; a real Party 1 may not
        let failures = [&a, &b].iter().filter(|r| r.is_err()).count();
        assert_eq!(failures, 1);
        assert!(matches!(a.err().or(b.err()), Some(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_signing_locks_serialize_signs() {
        let party = Party2::new(MemoryParty::new().with_round_delay(Duration::from_millis(20)));
        let locks = SigningLocks::new();
        let share = party.generate_key().await.unwrap();

        let (a, b) = tokio::join!(
            party.sign_exclusive(&locks, &[1u8; 32], &share),
            party.sign_exclusive(&locks, &[2u8; 32], &share)
        );

        a.unwrap().verify(&share.public_key(), &[1u8; 32]).unwrap();
        b.unwrap().verify(&share.public_key(), &[2u8; 32]).unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_signing_locks_across_tasks() {
        let party = Arc::new(Party2::new(
            MemoryParty::new().with_round_delay(Duration::from_millis(5)),
        ));
        let locks = SigningLocks::new();
        let share = Arc::new(party.generate_key().await.unwrap());

        let tasks = (0..8u8).map(|i| {
            let (party, locks, share) = (Arc::clone(&party), locks.clone(), Arc::clone(&share));
            tokio::spawn(async move {
                let digest = [i; 32];
                let signature = party.sign_exclusive(&locks, &digest, &share).await?;
                signature.verify(&share.public_key(), &digest)
            })
        });

        for result in futures_util::future::join_all(tasks).await {
            result.unwrap().unwrap();
        }
    }
}
