//! Ed25519 arithmetic shared by both sides of the two-party protocol
//!
//! Key aggregation follows MuSig: each public key `P_i` is weighted by
//! `a_i = H(tag ‖ P_i ‖ P_0 ‖ … ‖ P_{n-1})` and the aggregated key is
//! `Σ a_i·P_i`. A signature is the sum of partial signatures
//! `s_i = r_i + c·a_i·x_i` over the summed nonce `R = Σ R_i`, which makes it a
//! plain Ed25519 signature under the aggregated key.

mod keygen;
mod sign;

pub use keygen::{aggregate_public_keys, generate_key_pair, key_pair_from_seed};
pub use sign::{
    add_partial_signatures, challenge, combine_nonces, commit, counterpart_weighted_key,
    partial_sign, verify_commitment, verify_partial_signature, Commitment, EphemeralKey,
};

use crate::types::{Point, Signature};
use crate::{Error, Result};
use curve25519_dalek::scalar::Scalar as DalekScalar;
use sha2::{Digest, Sha512};

/// Position of Party 1's key in the aggregation order
pub const PARTY1_INDEX: usize = 0;

/// Position of Party 2's key in the aggregation order
pub const PARTY2_INDEX: usize = 1;

fn scalar_from_hash(hasher: Sha512) -> DalekScalar {
    let digest = hasher.finalize();
    let mut wide = [0u8; 64];
    wide.copy_from_slice(&digest);
    DalekScalar::from_bytes_mod_order_wide(&wide)
}

/// Verify with the standard Ed25519 equation, independently of this crate's arithmetic
pub fn verify(signature: &Signature, public_key: &Point, message_digest: &[u8]) -> Result<()> {
    let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(public_key.as_bytes())
        .map_err(|e| Error::Encoding(format!("unusable public key: {}", e)))?;
    let signature = ed25519_dalek::Signature::from_bytes(&signature.to_bytes());

    verifying_key
        .verify_strict(message_digest, &signature)
        .map_err(|_| Error::Protocol("signature does not verify under the aggregated key".into()))
}
