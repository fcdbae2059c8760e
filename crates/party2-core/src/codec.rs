//! Hex and wire encodings for scalars, points and signatures
//!
//! Party 1 exchanges scalars as big-endian hex integers and points as the hex
//! of their compressed encoding, with leading zeros possibly stripped. The
//! signature wire format stores `s` little-endian while `R` travels in the
//! compressed encoding's own byte order, so only the scalar half is swapped.

use crate::types::{Point, Scalar, Signature, POINT_BYTES, SCALAR_BYTES, SIGNATURE_BYTES};
use crate::{Error, Result};
use zeroize::Zeroizing;

/// Hex characters in a 32-byte field
const FIELD_HEX_LEN: usize = 64;

/// Decode a big-endian hex scalar, rejecting anything wider than 32 bytes or `>= L`
pub fn decode_scalar_hex(s: &str) -> Result<Scalar> {
    let bytes = decode_field_hex(s, "scalar")?;
    Scalar::from_be_bytes(*bytes)
}

/// Decode a hex point, left-padding it with zero nibbles to 64 characters first
pub fn decode_point_hex(s: &str) -> Result<Point> {
    let bytes = decode_field_hex(s, "point")?;
    Point::from_bytes(*bytes)
}

fn decode_field_hex(s: &str, what: &str) -> Result<Zeroizing<[u8; 32]>> {
    if s.is_empty() {
        return Err(Error::Encoding(format!("empty {} hex", what)));
    }
    if s.len() > FIELD_HEX_LEN {
        return Err(Error::Encoding(format!(
            "{} hex is {} characters, at most {} allowed",
            what,
            s.len(),
            FIELD_HEX_LEN
        )));
    }

    let padded = Zeroizing::new(format!("{:0>width$}", s, width = FIELD_HEX_LEN));
    let mut bytes = Zeroizing::new([0u8; 32]);
    hex::decode_to_slice(padded.as_str(), &mut bytes[..])
        .map_err(|e| Error::Encoding(format!("invalid {} hex: {}", what, e)))?;
    Ok(bytes)
}

/// 64 lowercase hex characters, big-endian
pub fn encode_scalar_hex(scalar: &Scalar) -> String {
    hex::encode(scalar.to_be_bytes())
}

/// 64 lowercase hex characters of the compressed encoding
pub fn encode_point_hex(point: &Point) -> String {
    hex::encode(point.as_bytes())
}

/// Hex text form of a message digest
pub fn encode_digest_hex(digest: &[u8]) -> String {
    hex::encode(digest)
}

/// Scalar in signature wire order (little-endian)
pub fn scalar_to_wire_bytes(scalar: &Scalar) -> [u8; SCALAR_BYTES] {
    scalar.to_le_bytes()
}

/// Point in signature wire order (the compressed encoding, unchanged)
pub fn point_to_wire_bytes(point: &Point) -> [u8; POINT_BYTES] {
    point.to_bytes()
}

/// `R ‖ s` as a standard 64-byte Ed25519 signature
pub fn signature_to_wire(signature: &Signature) -> [u8; SIGNATURE_BYTES] {
    let mut bytes = [0u8; SIGNATURE_BYTES];
    bytes[..POINT_BYTES].copy_from_slice(&point_to_wire_bytes(&signature.r));
    bytes[POINT_BYTES..].copy_from_slice(&scalar_to_wire_bytes(&signature.s));
    bytes
}
