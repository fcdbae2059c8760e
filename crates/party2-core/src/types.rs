//! Core types for two-party Ed25519

use crate::wire::KeyShareRecord;
use crate::{codec, Error, Result};
use curve25519_dalek::{
    edwards::{CompressedEdwardsY, EdwardsPoint},
    scalar::Scalar as DalekScalar,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Width of a canonical scalar encoding
pub const SCALAR_BYTES: usize = 32;

/// Width of a compressed point encoding
pub const POINT_BYTES: usize = 32;

/// Width of the `R ‖ s` signature encoding
pub const SIGNATURE_BYTES: usize = POINT_BYTES + SCALAR_BYTES;

/// Integer modulo the group order L, always canonical
#[derive(Clone, Copy, PartialEq, Eq, Zeroize)]
pub struct Scalar(pub(crate) DalekScalar);

impl Scalar {
    /// The additive identity
    pub const ZERO: Scalar = Scalar(DalekScalar::ZERO);

    /// Parse a little-endian encoding, rejecting values `>= L`
    pub fn from_le_bytes(bytes: [u8; SCALAR_BYTES]) -> Result<Self> {
        Option::<DalekScalar>::from(DalekScalar::from_canonical_bytes(bytes))
            .map(Scalar)
            .ok_or_else(|| Error::Encoding("scalar is not below the group order".into()))
    }

    /// Parse a big-endian encoding, rejecting values `>= L`
    pub fn from_be_bytes(mut bytes: [u8; SCALAR_BYTES]) -> Result<Self> {
        bytes.reverse();
        let scalar = Self::from_le_bytes(bytes);
        bytes.zeroize();
        scalar
    }

    /// Little-endian encoding, the order the signature wire format uses
    pub fn to_le_bytes(&self) -> [u8; SCALAR_BYTES] {
        self.0.to_bytes()
    }

    /// Big-endian encoding, the order the hex exchange format uses
    pub fn to_be_bytes(&self) -> [u8; SCALAR_BYTES] {
        let mut bytes = self.0.to_bytes();
        bytes.reverse();
        bytes
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scalar({})", hex::encode(self.to_be_bytes()))
    }
}

/// A curve point that is known to decompress
#[derive(Clone, Copy)]
pub struct Point {
    compressed: CompressedEdwardsY,
    point: EdwardsPoint,
}

impl Point {
    /// Decompress a 32-byte Edwards-Y encoding
    pub fn from_bytes(bytes: [u8; POINT_BYTES]) -> Result<Self> {
        let compressed = CompressedEdwardsY(bytes);
        let point = compressed
            .decompress()
            .ok_or_else(|| Error::Encoding("invalid curve point encoding".into()))?;
        Ok(Self { compressed, point })
    }

    pub(crate) fn from_edwards(point: EdwardsPoint) -> Self {
        Self {
            compressed: point.compress(),
            point,
        }
    }

    pub(crate) fn as_edwards(&self) -> &EdwardsPoint {
        &self.point
    }

    /// Compressed encoding
    pub fn as_bytes(&self) -> &[u8; POINT_BYTES] {
        self.compressed.as_bytes()
    }

    /// Compressed encoding, copied
    pub fn to_bytes(&self) -> [u8; POINT_BYTES] {
        self.compressed.to_bytes()
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.compressed == other.compressed
    }
}

impl Eq for Point {}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({})", hex::encode(self.as_bytes()))
    }
}

/// This party's secret material. Never sent to Party 1.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExpandedPrivateKey {
    /// Seeds deterministic nonce derivation
    prefix: Scalar,
    /// This party's additive share of the signing scalar
    private_key: Scalar,
}

impl ExpandedPrivateKey {
    pub fn new(prefix: Scalar, private_key: Scalar) -> Self {
        Self {
            prefix,
            private_key,
        }
    }

    pub fn prefix(&self) -> &Scalar {
        &self.prefix
    }

    pub fn private_key(&self) -> &Scalar {
        &self.private_key
    }
}

impl fmt::Debug for ExpandedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExpandedPrivateKey(..)")
    }
}

/// This party's key-generation output
#[derive(Debug, Clone)]
pub struct KeyPair {
    public_key: Point,
    expanded_private_key: ExpandedPrivateKey,
}

impl KeyPair {
    pub fn new(public_key: Point, expanded_private_key: ExpandedPrivateKey) -> Self {
        Self {
            public_key,
            expanded_private_key,
        }
    }

    pub fn public_key(&self) -> &Point {
        &self.public_key
    }

    pub fn expanded_private_key(&self) -> &ExpandedPrivateKey {
        &self.expanded_private_key
    }
}

/// Jointly derived aggregated public key and this party's aggregation coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatedKey {
    apk: Point,
    hash: Scalar,
}

impl AggregatedKey {
    pub fn new(apk: Point, hash: Scalar) -> Self {
        Self { apk, hash }
    }

    /// Aggregated public key
    pub fn apk(&self) -> &Point {
        &self.apk
    }

    /// Aggregation coefficient applied to this party's public key
    pub fn hash(&self) -> &Scalar {
        &self.hash
    }
}

/// Key share held by Party 2 after key generation.
///
/// Created once by [`Party2::generate_key`](crate::Party2::generate_key) and
/// read-only afterwards. The id must be resent unchanged on every signing
/// call so Party 1 can find its half. Persisting the share is the caller's
/// business; the serde form uses the same hex records as the Party 1 exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "KeyShareRecord", into = "KeyShareRecord")]
pub struct KeyShare {
    key_pair: KeyPair,
    agg_pub_key: AggregatedKey,
    id: String,
}

impl KeyShare {
    pub fn new(key_pair: KeyPair, agg_pub_key: AggregatedKey, id: impl Into<String>) -> Self {
        Self {
            key_pair,
            agg_pub_key,
            id: id.into(),
        }
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn agg_pub_key(&self) -> &AggregatedKey {
        &self.agg_pub_key
    }

    /// Opaque id assigned by Party 1
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The aggregated public key signatures verify under.
    ///
    /// `apk` went through [`codec::decode_point_hex`] when the share was
    /// built, so no round trip to Party 1 is needed.
    pub fn public_key(&self) -> Point {
        self.agg_pub_key.apk
    }

    /// 32-byte compressed public key
    pub fn public_key_bytes(&self) -> [u8; POINT_BYTES] {
        codec::point_to_wire_bytes(&self.agg_pub_key.apk)
    }

    /// Whether `id` can name a share on Party 1
    pub fn is_valid_id(id: &str) -> bool {
        !id.trim().is_empty()
    }

    pub(crate) fn ensure_initialized(&self) -> Result<()> {
        if !Self::is_valid_id(&self.id) {
            return Err(Error::Precondition(
                "key share has no id; run key generation first".into(),
            ));
        }
        Ok(())
    }
}

/// EdDSA signature `(R, s)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Nonce commitment
    pub r: Point,
    /// Response scalar
    pub s: Scalar,
}

impl Signature {
    pub fn new(r: Point, s: Scalar) -> Self {
        Self { r, s }
    }

    /// Standard 64-byte Ed25519 encoding (`R ‖ s`, `s` little-endian)
    pub fn to_bytes(&self) -> [u8; SIGNATURE_BYTES] {
        codec::signature_to_wire(self)
    }

    /// Check `s·B = R + c·A` for `c = H(R ‖ A ‖ digest)`
    pub fn verify(&self, public_key: &Point, message_digest: &[u8]) -> Result<()> {
        crate::eddsa::verify(self, public_key, message_digest)
    }
}
