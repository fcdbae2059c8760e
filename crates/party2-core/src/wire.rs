//! Hex records exchanged with Party 1
//!
//! Field names mirror the entities field for field. Every record rejects
//! unknown fields, and every string goes through the codec before an entity
//! is built from it.

use crate::codec::{
    decode_point_hex, decode_scalar_hex, encode_digest_hex, encode_point_hex, encode_scalar_hex,
};
use crate::types::{AggregatedKey, ExpandedPrivateKey, KeyPair, KeyShare, Point, Signature};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Point as the hex of its compressed encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PointRecord {
    pub bytes_str: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(deny_unknown_fields)]
pub struct ExpandedPrivateKeyRecord {
    pub prefix: String,
    pub private_key: String,
}

impl fmt::Debug for ExpandedPrivateKeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExpandedPrivateKeyRecord(..)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyPairRecord {
    pub public_key: PointRecord,
    pub expanded_private_key: ExpandedPrivateKeyRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyAggRecord {
    pub apk: PointRecord,
    pub hash: String,
}

/// Key generation reply: `[key_pair, agg_pub_key, id]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyGenResponse(pub KeyPairRecord, pub KeyAggRecord, pub String);

/// Everything Party 1 needs to locate and use its half of a share
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignRequest {
    pub message_digest: String,
    pub key_pair: KeyPairRecord,
    pub agg_pub_key: KeyAggRecord,
    pub id: String,
}

impl SignRequest {
    pub fn new(message_digest: &[u8], share: &KeyShare) -> Self {
        Self {
            message_digest: encode_digest_hex(message_digest),
            key_pair: KeyPairRecord::from(share.key_pair()),
            agg_pub_key: KeyAggRecord::from(share.agg_pub_key()),
            id: share.id().to_string(),
        }
    }

    /// Raw digest bytes
    pub fn digest(&self) -> Result<Vec<u8>> {
        hex::decode(&self.message_digest)
            .map_err(|e| Error::Encoding(format!("invalid message digest hex: {}", e)))
    }
}

/// Signature reply: `{R, s}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignResponse {
    #[serde(rename = "R")]
    pub r: PointRecord,
    pub s: String,
}

/// Persisted form of a [`KeyShare`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyShareRecord {
    pub key_pair: KeyPairRecord,
    pub agg_pub_key: KeyAggRecord,
    pub id: String,
}

impl From<&Point> for PointRecord {
    fn from(point: &Point) -> Self {
        Self {
            bytes_str: encode_point_hex(point),
        }
    }
}

impl TryFrom<&PointRecord> for Point {
    type Error = Error;

    fn try_from(record: &PointRecord) -> Result<Self> {
        decode_point_hex(&record.bytes_str)
    }
}

impl From<&ExpandedPrivateKey> for ExpandedPrivateKeyRecord {
    fn from(key: &ExpandedPrivateKey) -> Self {
        Self {
            prefix: encode_scalar_hex(key.prefix()),
            private_key: encode_scalar_hex(key.private_key()),
        }
    }
}

impl TryFrom<&ExpandedPrivateKeyRecord> for ExpandedPrivateKey {
    type Error = Error;

    fn try_from(record: &ExpandedPrivateKeyRecord) -> Result<Self> {
        Ok(ExpandedPrivateKey::new(
            decode_scalar_hex(&record.prefix)?,
            decode_scalar_hex(&record.private_key)?,
        ))
    }
}

impl From<&KeyPair> for KeyPairRecord {
    fn from(key_pair: &KeyPair) -> Self {
        Self {
            public_key: PointRecord::from(key_pair.public_key()),
            expanded_private_key: ExpandedPrivateKeyRecord::from(key_pair.expanded_private_key()),
        }
    }
}

impl TryFrom<&KeyPairRecord> for KeyPair {
    type Error = Error;

    fn try_from(record: &KeyPairRecord) -> Result<Self> {
        Ok(KeyPair::new(
            Point::try_from(&record.public_key)?,
            ExpandedPrivateKey::try_from(&record.expanded_private_key)?,
        ))
    }
}

impl From<&AggregatedKey> for KeyAggRecord {
    fn from(agg: &AggregatedKey) -> Self {
        Self {
            apk: PointRecord::from(agg.apk()),
            hash: encode_scalar_hex(agg.hash()),
        }
    }
}

impl TryFrom<&KeyAggRecord> for AggregatedKey {
    type Error = Error;

    fn try_from(record: &KeyAggRecord) -> Result<Self> {
        Ok(AggregatedKey::new(
            Point::try_from(&record.apk)?,
            decode_scalar_hex(&record.hash)?,
        ))
    }
}

impl TryFrom<&KeyGenResponse> for KeyShare {
    type Error = Error;

    fn try_from(response: &KeyGenResponse) -> Result<Self> {
        let KeyGenResponse(key_pair, agg_pub_key, id) = response;
        if !KeyShare::is_valid_id(id) {
            return Err(Error::Protocol("Party 1 returned a blank share id".into()));
        }
        Ok(KeyShare::new(
            KeyPair::try_from(key_pair)?,
            AggregatedKey::try_from(agg_pub_key)?,
            id.clone(),
        ))
    }
}

impl From<&Signature> for SignResponse {
    fn from(signature: &Signature) -> Self {
        Self {
            r: PointRecord::from(&signature.r),
            s: encode_scalar_hex(&signature.s),
        }
    }
}

impl TryFrom<&SignResponse> for Signature {
    type Error = Error;

    fn try_from(response: &SignResponse) -> Result<Self> {
        Ok(Signature::new(
            Point::try_from(&response.r)?,
            decode_scalar_hex(&response.s)?,
        ))
    }
}

impl From<KeyShare> for KeyShareRecord {
    fn from(share: KeyShare) -> Self {
        Self {
            key_pair: KeyPairRecord::from(share.key_pair()),
            agg_pub_key: KeyAggRecord::from(share.agg_pub_key()),
            id: share.id().to_string(),
        }
    }
}

// Persisted shares are not checked for an id here: `sign` rejects a blank
// one as a precondition failure instead.
impl TryFrom<KeyShareRecord> for KeyShare {
    type Error = Error;

    fn try_from(record: KeyShareRecord) -> Result<Self> {
        Ok(KeyShare::new(
            KeyPair::try_from(&record.key_pair)?,
            AggregatedKey::try_from(&record.agg_pub_key)?,
            record.id,
        ))
    }
}
