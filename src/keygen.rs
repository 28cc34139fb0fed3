//! secp256k1 keypair generation (SPEC_FULL.md §2, §4.3 steps 1-3).

use bitcoin::secp256k1::{PublicKey, Secp256k1, SecretKey, SignOnly};
use rand::RngCore;

/// A generated keypair: 32-byte scalar and its 64-byte uncompressed public
/// key with the leading `0x04` SEC1 tag stripped.
pub struct Keypair {
    pub secret_key: SecretKey,
    /// X‖Y, 64 bytes, no `0x04` prefix.
    pub public_key_xy: [u8; 64],
}

/// Draws 32 bytes of CSPRNG entropy and tries to build a secp256k1 secret
/// key from them. Returns `None` when the sample is zero or `>=` the curve
/// order — the §4.3 "non-fatal, retry next attempt" rejection path. The
/// caller is expected to call this in a loop.
pub fn try_random_keypair<R: RngCore>(
    secp: &Secp256k1<SignOnly>,
    rng: &mut R,
) -> Option<Keypair> {
    let mut scalar = [0u8; 32];
    rng.fill_bytes(&mut scalar);

    let secret_key = match SecretKey::from_slice(&scalar) {
        Ok(sk) => sk,
        Err(_) => return None, // zero or >= curve order
    };

    let public_key = PublicKey::from_secret_key(secp, &secret_key);
    let uncompressed = public_key.serialize_uncompressed(); // 65 bytes, 0x04 || X || Y
    debug_assert_eq!(uncompressed[0], 0x04);

    let mut public_key_xy = [0u8; 64];
    public_key_xy.copy_from_slice(&uncompressed[1..]);

    Some(Keypair { secret_key, public_key_xy })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::secp256k1::Secp256k1;

    #[test]
    fn generates_valid_keypair() {
        let secp = Secp256k1::signing_only();
        let mut rng = rand::thread_rng();
        let kp = try_random_keypair(&secp, &mut rng).expect("virtually never rejected");
        assert_eq!(kp.public_key_xy.len(), 64);
        // Recomputing the public key from the secret key must match.
        let recomputed = PublicKey::from_secret_key(&secp, &kp.secret_key).serialize_uncompressed();
        assert_eq!(&recomputed[1..], &kp.public_key_xy[..]);
    }
}
