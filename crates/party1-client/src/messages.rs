//! HTTP message types exchanged with Party 1
//!
//! Only public values cross the wire: public keys, nonce commitments, nonce
//! points, blinding factors and Party 1's partial signature.

use party2_core::wire::PointRecord;
use serde::{Deserialize, Serialize};

/// `POST /eddsa/keygen`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyGenRequest {
    /// Party 2's public key
    pub public_key: PointRecord,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyGenReply {
    /// Party 1's public key
    pub public_key: PointRecord,
    /// Aggregated key as Party 1 computed it
    pub apk: PointRecord,
    /// Share id
    pub id: String,
}

/// `POST /eddsa/sign/{id}/commit`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignCommitRequest {
    pub message_digest: String,
    /// Hex of Party 2's nonce commitment
    pub commitment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignCommitReply {
    /// Hex of Party 1's nonce commitment
    pub commitment: String,
}

/// `POST /eddsa/sign/{id}/reveal`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignRevealRequest {
    #[serde(rename = "R")]
    pub r: PointRecord,
    pub blind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignRevealReply {
    #[serde(rename = "R")]
    pub r: PointRecord,
    pub blind: String,
    /// Party 1's partial signature
    pub s: String,
}
