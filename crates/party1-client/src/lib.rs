//! Party 1 Client
//!
//! HTTP implementation of [`RemoteParty`]. Party 2's half of key generation
//! and signing runs here, and only public values are posted to Party 1.
//!
//! Routes, relative to the endpoint:
//! - `POST /eddsa/keygen`
//! - `POST /eddsa/sign/{id}/commit`
//! - `POST /eddsa/sign/{id}/reveal`

pub mod messages;

use messages::{
    KeyGenReply, KeyGenRequest, SignCommitReply, SignCommitRequest, SignRevealReply,
    SignRevealRequest,
};
use party2_core::codec::{decode_point_hex, decode_scalar_hex};
use party2_core::eddsa::{self, EphemeralKey, PARTY2_INDEX};
use party2_core::remote::{async_trait, RemoteParty};
use party2_core::wire::{
    KeyAggRecord, KeyGenResponse, KeyPairRecord, PointRecord, SignRequest, SignResponse,
};
use party2_core::{AggregatedKey, Error, KeyPair, KeyShare, Result};
use rand::rngs::OsRng;
use reqwest::{Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// HTTP client for a Party 1 service
pub struct Party1Client {
    /// HTTP client
    client: Client,
    /// Party 1 base URL
    url: String,
    /// Request timeout
    timeout: Duration,
}

impl Party1Client {
    /// Create a new Party 1 client
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn route(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| Error::Precondition(format!("invalid Party 1 endpoint {}: {}", self.url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Precondition(format!("Party 1 endpoint {} cannot take a path", self.url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Post a JSON body and decode the JSON reply
    #[instrument(skip(self, body))]
    async fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        let url = self.route(segments)?;

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Network(format!("{} timed out after {:?}", url, self.timeout))
                } else {
                    Error::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::Protocol(format!("{} not found: unknown share id or route", url)));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Protocol(format!(
                "{} rejected with status {}: {}",
                url, status, detail
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        debug!(status = %status, len = bytes.len(), "Reply received");
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn decode_fixed<const N: usize>(s: &str, what: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(s).map_err(|e| Error::Encoding(format!("invalid {} hex: {}", what, e)))?;
    bytes
        .try_into()
        .map_err(|_| Error::Encoding(format!("{} must be {} bytes", what, N)))
}

#[async_trait]
impl RemoteParty for Party1Client {
    fn endpoint(&self) -> &str {
        &self.url
    }

    #[instrument(skip(self), fields(endpoint = %self.url))]
    async fn request_key_generation(&self) -> Result<KeyGenResponse> {
        let key_pair = eddsa::generate_key_pair(&mut OsRng);

        let request = KeyGenRequest {
            public_key: PointRecord::from(key_pair.public_key()),
        };
        let reply: KeyGenReply = self.post(&["eddsa", "keygen"], &request).await?;

        if !KeyShare::is_valid_id(&reply.id) {
            return Err(Error::Protocol("Party 1 returned a blank share id".into()));
        }
        let party1_public_key = decode_point_hex(&reply.public_key.bytes_str)?;
        let party1_apk = decode_point_hex(&reply.apk.bytes_str)?;

        let keys = [party1_public_key, *key_pair.public_key()];
        let agg_pub_key = eddsa::aggregate_public_keys(&keys, PARTY2_INDEX)?;
        if agg_pub_key.apk() != &party1_apk {
            return Err(Error::Protocol(
                "Party 1 aggregated a different public key".into(),
            ));
        }
        info!(id = %reply.id, "Key aggregation agreed with Party 1");
        Ok(KeyGenResponse(
            KeyPairRecord::from(&key_pair),
            KeyAggRecord::from(&agg_pub_key),
            reply.id,
        ))
    }

    #[instrument(skip(self, request), fields(endpoint = %self.url, id = %request.id))]
    async fn request_signature(&self, request: &SignRequest) -> Result<SignResponse> {
        let key_pair = KeyPair::try_from(&request.key_pair)?;
        let agg_pub_key = AggregatedKey::try_from(&request.agg_pub_key)?;
        let digest = request.digest()?;
        let id = request.id.as_str();

        let ephemeral = EphemeralKey::generate(
            key_pair.expanded_private_key().prefix(),
            &digest,
            &mut OsRng,
        );

        // Round 1: exchange nonce commitments
        debug!("Sign round 1: commit");
        let commit_reply: SignCommitReply = self
            .post(
                &["eddsa", "sign", id, "commit"],
                &SignCommitRequest {
                    message_digest: request.message_digest.clone(),
                    commitment: hex::encode(ephemeral.commitment()),
                },
            )
            .await?;
        let party1_commitment: [u8; 64] = decode_fixed(&commit_reply.commitment, "commitment")?;

        // Round 2: reveal nonces, receive Party 1's partial signature
        debug!("Sign round 2: reveal");
        let reveal_reply: SignRevealReply = self
            .post(
                &["eddsa", "sign", id, "reveal"],
                &SignRevealRequest {
                    r: PointRecord::from(ephemeral.public()),
                    blind: hex::encode(ephemeral.blind()),
                },
            )
            .await?;

        let party1_r = decode_point_hex(&reveal_reply.r.bytes_str)?;
        let party1_blind: [u8; 32] = decode_fixed(&reveal_reply.blind, "blind")?;
        let party1_s = decode_scalar_hex(&reveal_reply.s)?;
        eddsa::verify_commitment(&party1_commitment, &party1_r, &party1_blind)?;

        let big_r = eddsa::combine_nonces(&party1_r, ephemeral.public());
        let c = eddsa::challenge(&big_r, agg_pub_key.apk(), &digest);
        let party1_key = eddsa::counterpart_weighted_key(&agg_pub_key, key_pair.public_key());
        eddsa::verify_partial_signature(&party1_s, &party1_r, &c, &party1_key)?;

        let own_s = eddsa::partial_sign(&ephemeral, &key_pair, &agg_pub_key, &c);
        let signature = eddsa::add_partial_signatures(big_r, &[party1_s, own_s]);

        info!("Joint signature assembled");
        Ok(SignResponse::from(&signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, State},
        http::StatusCode,
        routing::post,
        Json, Router,
    };
    use dashmap::DashMap;
    use party2_core::codec::encode_scalar_hex;
    use party2_core::eddsa::PARTY1_INDEX;
    use party2_core::{Party2, Point};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Copy, PartialEq)]
    enum Behaviour {
        Honest,
        WrongApk,
        BlankId,
        BadCommitment,
        BadPartial,
    }

    struct Pending {
        digest: Vec<u8>,
        ephemeral: EphemeralKey,
        counterpart_commitment: Vec<u8>,
    }

    struct Session {
        key_pair: KeyPair,
        agg_pub_key: AggregatedKey,
        pending: Option<Pending>,
    }

    /// Minimal Party 1 service
    #[derive(Clone)]
    struct Fixture {
        sessions: Arc<DashMap<String, Session>>,
        next_id: Arc<AtomicUsize>,
        behaviour: Behaviour,
    }

    async fn keygen(
        State(fixture): State<Fixture>,
        Json(request): Json<KeyGenRequest>,
    ) -> std::result::Result<Json<KeyGenReply>, StatusCode> {
        let party2_key = Point::try_from(&request.public_key).map_err(|_| StatusCode::BAD_REQUEST)?;
        let key_pair = eddsa::generate_key_pair(&mut OsRng);
        let keys = [*key_pair.public_key(), party2_key];
        let agg_pub_key = eddsa::aggregate_public_keys(&keys, PARTY1_INDEX)
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

        let apk = match fixture.behaviour {
            Behaviour::WrongApk => *key_pair.public_key(),
            _ => *agg_pub_key.apk(),
        };
        let id = match fixture.behaviour {
            Behaviour::BlankId => " ".to_string(),
            _ => format!("share-{}", fixture.next_id.fetch_add(1, Ordering::SeqCst)),
        };
        let reply = KeyGenReply {
            public_key: PointRecord::from(key_pair.public_key()),
            apk: PointRecord::from(&apk),
            id: id.clone(),
        };

        fixture.sessions.insert(
            id,
            Session {
                key_pair,
                agg_pub_key,
                pending: None,
            },
        );
        Ok(Json(reply))
    }

    async fn commit(
        State(fixture): State<Fixture>,
        Path(id): Path<String>,
        Json(request): Json<SignCommitRequest>,
    ) -> std::result::Result<Json<SignCommitReply>, StatusCode> {
        let mut session = fixture.sessions.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
        let digest = hex::decode(&request.message_digest).map_err(|_| StatusCode::BAD_REQUEST)?;
        let counterpart_commitment =
            hex::decode(&request.commitment).map_err(|_| StatusCode::BAD_REQUEST)?;

        let ephemeral = EphemeralKey::generate(
            session.key_pair.expanded_private_key().prefix(),
            &digest,
            &mut OsRng,
        );
        let mut commitment = ephemeral.commitment();
        if fixture.behaviour == Behaviour::BadCommitment {
            commitment[0] ^= 1;
        }

        session.pending = Some(Pending {
            digest,
            ephemeral,
            counterpart_commitment,
        });
        Ok(Json(SignCommitReply {
            commitment: hex::encode(commitment),
        }))
    }

    async fn reveal(
        State(fixture): State<Fixture>,
        Path(id): Path<String>,
        Json(request): Json<SignRevealRequest>,
    ) -> std::result::Result<Json<SignRevealReply>, StatusCode> {
        let mut session = fixture.sessions.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
        let pending = session.pending.take().ok_or(StatusCode::CONFLICT)?;

        let party2_r = Point::try_from(&request.r).map_err(|_| StatusCode::BAD_REQUEST)?;
        let blind: [u8; 32] =
            decode_fixed(&request.blind, "blind").map_err(|_| StatusCode::BAD_REQUEST)?;
        eddsa::verify_commitment(&pending.counterpart_commitment, &party2_r, &blind)
            .map_err(|_| StatusCode::FORBIDDEN)?;

        let big_r = eddsa::combine_nonces(pending.ephemeral.public(), &party2_r);
        let signed_digest: &[u8] = match fixture.behaviour {
            Behaviour::BadPartial => &b"something else"[..],
            _ => pending.digest.as_slice(),
        };
        let c = eddsa::challenge(&big_r, session.agg_pub_key.apk(), signed_digest);
        let s = eddsa::partial_sign(&pending.ephemeral, &session.key_pair, &session.agg_pub_key, &c);

        Ok(Json(SignRevealReply {
            r: PointRecord::from(pending.ephemeral.public()),
            blind: hex::encode(pending.ephemeral.blind()),
            s: encode_scalar_hex(&s),
        }))
    }

    async fn spawn_party1(behaviour: Behaviour) -> String {
        let fixture = Fixture {
            sessions: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicUsize::new(1)),
            behaviour,
        };
        let app = Router::new()
            .route("/eddsa/keygen", post(keygen))
            .route("/eddsa/sign/:id/commit", post(commit))
            .route("/eddsa/sign/:id/reveal", post(reveal))
            .with_state(fixture);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn test_keygen_and_sign_over_http() {
        let url = spawn_party1(Behaviour::Honest).await;
        let party = Party2::new(Party1Client::new(&url));

        let share = party.generate_key().await.unwrap();
        assert_eq!(share.id(), "share-1");

        let digest = [0x11u8; 32];
        let signature = party.sign(&digest, &share).await.unwrap();

        let verifying_key =
            ed25519_dalek::VerifyingKey::from_bytes(&share.public_key_bytes()).unwrap();
        verifying_key
            .verify_strict(&digest, &ed25519_dalek::Signature::from_bytes(&signature.to_bytes()))
            .unwrap();
    }

    #[tokio::test]
    async fn test_apk_mismatch_is_protocol_error() {
        let url = spawn_party1(Behaviour::WrongApk).await;
        let party = Party2::new(Party1Client::new(&url));
        assert!(matches!(party.generate_key().await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_blank_share_id_is_protocol_error() {
        let url = spawn_party1(Behaviour::BlankId).await;
        let party = Party2::new(Party1Client::new(&url));
        assert!(matches!(party.generate_key().await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn test_bad_commitment_is_protocol_error() {
        let url = spawn_party1(Behaviour::BadCommitment).await;
        let party = Party2::new(Party1Client::new(&url));
        let share = party.generate_key().await.unwrap();
        assert!(matches!(
            party.sign(&[1u8; 32], &share).await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_partial_signature_is_protocol_error() {
        let url = spawn_party1(Behaviour::BadPartial).await;
        let party = Party2::new(Party1Client::new(&url));
        let share = party.generate_key().await.unwrap();
        assert!(matches!(
            party.sign(&[1u8; 32], &share).await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_id_is_protocol_error() {
        let first = Party2::new(Party1Client::new(&spawn_party1(Behaviour::Honest).await));
        let share = first.generate_key().await.unwrap();

        // A different Party 1 never issued this share
        let second = Party2::new(Party1Client::new(&spawn_party1(Behaviour::Honest).await));
        assert!(matches!(
            second.sign(&[1u8; 32], &share).await,
            Err(Error::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let party = Party2::new(Party1Client::new(&format!("http://{}", addr)));
        assert!(matches!(party.generate_key().await, Err(Error::Network(_))));
    }

    #[tokio::test]
    async fn test_silent_party1_times_out() {
        // Accepts connections at the TCP level, never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client =
            Party1Client::new(&format!("http://{}", addr)).with_timeout(Duration::from_millis(100));
        let err = client.request_key_generation().await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        drop(listener);
    }

    #[test]
    fn test_route_encodes_id() {
        let client = Party1Client::new("http://127.0.0.1:8000/");
        let url = client.route(&["eddsa", "sign", "a/b", "commit"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/eddsa/sign/a%2Fb/commit");
    }
}
