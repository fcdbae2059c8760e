//! Key pairs and key aggregation

use super::scalar_from_hash;
use crate::types::{AggregatedKey, ExpandedPrivateKey, KeyPair, Point, Scalar};
use crate::{Error, Result};
use curve25519_dalek::{edwards::EdwardsPoint, scalar::Scalar as DalekScalar};
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};
use zeroize::Zeroizing;

const KEY_AGG_TAG: &[u8] = b"ed25519-2p/key-agg";

/// Fresh key pair from a random seed
pub fn generate_key_pair<R: RngCore + CryptoRng>(rng: &mut R) -> KeyPair {
    let mut seed = Zeroizing::new([0u8; 32]);
    rng.fill_bytes(&mut seed[..]);
    key_pair_from_seed(&seed)
}

/// Expand a seed as RFC 8032 does: clamp the lower half of `SHA-512(seed)`
/// into the private scalar and keep the upper half as the nonce prefix.
pub fn key_pair_from_seed(seed: &[u8; 32]) -> KeyPair {
    let hash = Sha512::digest(seed);

    let mut lower = Zeroizing::new([0u8; 32]);
    lower.copy_from_slice(&hash[..32]);
    lower[0] &= 248;
    lower[31] &= 127;
    lower[31] |= 64;

    let mut upper = Zeroizing::new([0u8; 32]);
    upper.copy_from_slice(&hash[32..]);

    // B has order L, so reducing the clamped value leaves x·B unchanged
    let private_key = DalekScalar::from_bytes_mod_order(*lower);
    let prefix = DalekScalar::from_bytes_mod_order(*upper);
    let public_key = EdwardsPoint::mul_base(&private_key);

    KeyPair::new(
        Point::from_edwards(public_key),
        ExpandedPrivateKey::new(Scalar(prefix), Scalar(private_key)),
    )
}

/// Aggregate `public_keys` and return the coefficient for the key at `index`.
///
/// Every party must pass the keys in the same order to arrive at the same `apk`.
pub fn aggregate_public_keys(public_keys: &[Point], index: usize) -> Result<AggregatedKey> {
    if index >= public_keys.len() {
        return Err(Error::Precondition(format!(
            "party index {} out of range for {} keys",
            index,
            public_keys.len()
        )));
    }

    let coefficients: Vec<DalekScalar> = public_keys
        .iter()
        .map(|key| aggregation_coefficient(key, public_keys))
        .collect();

    let apk: EdwardsPoint = public_keys
        .iter()
        .zip(&coefficients)
        .map(|(key, a)| key.as_edwards() * a)
        .sum();

    Ok(AggregatedKey::new(
        Point::from_edwards(apk),
        Scalar(coefficients[index]),
    ))
}

fn aggregation_coefficient(key: &Point, all: &[Point]) -> DalekScalar {
    let mut hasher = Sha512::new();
    hasher.update(KEY_AGG_TAG);
    hasher.update(key.as_bytes());
    for other in all {
        hasher.update(other.as_bytes());
    }
    scalar_from_hash(hasher)
}
