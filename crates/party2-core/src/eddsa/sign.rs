//! Nonces, commitments and partial signatures

use super::scalar_from_hash;
use crate::types::{AggregatedKey, KeyPair, Point, Scalar, Signature};
use crate::{Error, Result};
use curve25519_dalek::edwards::EdwardsPoint;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

const NONCE_TAG: &[u8] = b"ed25519-2p/nonce";
const COMMIT_TAG: &[u8] = b"ed25519-2p/commit";

/// Hash binding a nonce point before it is revealed
pub type Commitment = [u8; 64];

/// One party's nonce for a single signing session.
///
/// Derived from the prefix, the digest and fresh randomness, so two sessions
/// over the same digest still use different nonces.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EphemeralKey {
    r: Scalar,
    #[zeroize(skip)]
    big_r: Point,
    blind: [u8; 32],
}

impl EphemeralKey {
    pub fn generate<R: RngCore + CryptoRng>(
        prefix: &Scalar,
        message_digest: &[u8],
        rng: &mut R,
    ) -> Self {
        let mut noise = Zeroizing::new([0u8; 64]);
        rng.fill_bytes(&mut noise[..]);

        let mut hasher = Sha512::new();
        hasher.update(NONCE_TAG);
        hasher.update(prefix.to_le_bytes());
        hasher.update(message_digest);
        hasher.update(&noise[..]);
        let r = scalar_from_hash(hasher);

        let mut blind = [0u8; 32];
        rng.fill_bytes(&mut blind);

        Self {
            r: Scalar(r),
            big_r: Point::from_edwards(EdwardsPoint::mul_base(&r)),
            blind,
        }
    }

    /// The nonce point `R_i`
    pub fn public(&self) -> &Point {
        &self.big_r
    }

    /// Blinding factor that opens the commitment
    pub fn blind(&self) -> &[u8; 32] {
        &self.blind
    }

    pub fn commitment(&self) -> Commitment {
        commit(&self.big_r, &self.blind)
    }
}

/// `SHA-512(tag ‖ blind ‖ R)`
pub fn commit(big_r: &Point, blind: &[u8; 32]) -> Commitment {
    let mut hasher = Sha512::new();
    hasher.update(COMMIT_TAG);
    hasher.update(blind);
    hasher.update(big_r.as_bytes());

    let mut commitment = [0u8; 64];
    commitment.copy_from_slice(&hasher.finalize());
    commitment
}

/// Check that a revealed nonce opens an earlier commitment
pub fn verify_commitment(commitment: &[u8], big_r: &Point, blind: &[u8; 32]) -> Result<()> {
    let expected = commit(big_r, blind);
    if bool::from(expected.as_slice().ct_eq(commitment)) {
        Ok(())
    } else {
        Err(Error::Protocol("nonce commitment does not open".into()))
    }
}

pub fn combine_nonces(first: &Point, second: &Point) -> Point {
    Point::from_edwards(first.as_edwards() + second.as_edwards())
}

/// Standard Ed25519 challenge `c = SHA-512(R ‖ A ‖ M) mod L`
pub fn challenge(big_r: &Point, apk: &Point, message_digest: &[u8]) -> Scalar {
    let mut hasher = Sha512::new();
    hasher.update(big_r.as_bytes());
    hasher.update(apk.as_bytes());
    hasher.update(message_digest);
    Scalar(scalar_from_hash(hasher))
}

/// `s_i = r_i + c·a_i·x_i`
pub fn partial_sign(
    ephemeral: &EphemeralKey,
    key_pair: &KeyPair,
    agg_pub_key: &AggregatedKey,
    challenge: &Scalar,
) -> Scalar {
    let x = &key_pair.expanded_private_key().private_key().0;
    Scalar(ephemeral.r.0 + challenge.0 * agg_pub_key.hash().0 * x)
}

/// `a_j·P_j` of the other party, recovered as `apk − a_i·P_i`
pub fn counterpart_weighted_key(agg_pub_key: &AggregatedKey, own_public_key: &Point) -> Point {
    let own = own_public_key.as_edwards() * agg_pub_key.hash().0;
    Point::from_edwards(agg_pub_key.apk().as_edwards() - own)
}

/// Check `s_j·B = R_j + c·(a_j·P_j)` for the other party's contribution
pub fn verify_partial_signature(
    partial: &Scalar,
    nonce: &Point,
    challenge: &Scalar,
    weighted_key: &Point,
) -> Result<()> {
    let lhs = EdwardsPoint::mul_base(&partial.0);
    let rhs = nonce.as_edwards() + weighted_key.as_edwards() * challenge.0;
    if lhs == rhs {
        Ok(())
    } else {
        Err(Error::Protocol("counterpart partial signature is invalid".into()))
    }
}

pub fn add_partial_signatures(big_r: Point, partials: &[Scalar]) -> Signature {
    let s = partials
        .iter()
        .fold(Scalar::ZERO, |acc, partial| Scalar(acc.0 + partial.0));
    Signature::new(big_r, s)
}
