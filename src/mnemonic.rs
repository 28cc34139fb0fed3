//! BIP-39/BIP-32 mnemonic seeding (SPEC_FULL.md §4.4): derives the first
//! candidate keypair of a search from a freshly generated mnemonic along the
//! standard Ethereum path `m/44'/60'/0'/0/0`, for callers who want the found
//! wallet to also be recoverable from a seed phrase.

use bip39::{Language, Mnemonic};
use bitcoin::bip32::{ChildNumber, DerivationPath, Xpriv};
use bitcoin::secp256k1::{Secp256k1, SecretKey, SignOnly};
use bitcoin::Network;
use rand::RngCore;

use crate::address::derive_address;
use crate::error::{EngineError, EngineResult};

const COMPONENT: &str = "mnemonic";
const ENTROPY_BYTES: usize = 16; // 128 bits -> 12 words

/// A mnemonic-derived candidate: the phrase plus the keypair at index 0 of
/// the standard Ethereum account path.
pub struct MnemonicSeed {
    pub phrase: String,
    pub secret_key: SecretKey,
    pub public_key_xy: [u8; 64],
    pub address: [u8; 20],
}

/// Generates a fresh 12-word English mnemonic and derives
/// `m/44'/60'/0'/0/0` from it.
pub fn generate(secp: &Secp256k1<SignOnly>, rng: &mut impl RngCore) -> EngineResult<MnemonicSeed> {
    let mut entropy = [0u8; ENTROPY_BYTES];
    rng.fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| EngineError::crypto(COMPONENT, "generate", format!("failed to build mnemonic: {e}")))?;

    let seed = mnemonic.to_seed("");
    let master = Xpriv::new_master(Network::Bitcoin, &seed)
        .map_err(|e| EngineError::crypto(COMPONENT, "generate", format!("failed to derive master key: {e}")))?;

    let path = DerivationPath::from(vec![
        ChildNumber::from_hardened_idx(44).expect("44 < 2^31"),
        ChildNumber::from_hardened_idx(60).expect("60 < 2^31"),
        ChildNumber::from_hardened_idx(0).expect("0 < 2^31"),
        ChildNumber::from_normal_idx(0).expect("0 < 2^31"),
        ChildNumber::from_normal_idx(0).expect("0 < 2^31"),
    ]);

    // secp256k1::Secp256k1<SignOnly> doesn't implement the Verification the
    // bip32 crate wants for derive_priv; a fresh `Secp256k1::new()` covers
    // both and the extra context is cheap relative to the keccak/sign work.
    let full_secp = Secp256k1::new();
    let child = master
        .derive_priv(&full_secp, &path)
        .map_err(|e| EngineError::crypto(COMPONENT, "generate", format!("child derivation failed: {e}")))?;

    let secret_key = child.private_key;
    let public_key = secret_key.public_key(&full_secp);
    let uncompressed = public_key.serialize_uncompressed();
    let mut public_key_xy = [0u8; 64];
    public_key_xy.copy_from_slice(&uncompressed[1..]);
    let address = derive_address(&public_key_xy);

    let _ = secp; // the caller's signing-only context isn't needed for this derivation path

    Ok(MnemonicSeed { phrase: mnemonic.to_string(), secret_key, public_key_xy, address })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn generates_a_twelve_word_phrase_with_a_consistent_address() {
        let secp = Secp256k1::signing_only();
        let mut rng = thread_rng();
        let seed = generate(&secp, &mut rng).unwrap();

        assert_eq!(seed.phrase.split_whitespace().count(), 12);
        assert_eq!(derive_address(&seed.public_key_xy), seed.address);
    }

    #[test]
    fn reparsing_the_phrase_reproduces_the_same_seed() {
        let secp = Secp256k1::signing_only();
        let mut rng = thread_rng();
        let seed = generate(&secp, &mut rng).unwrap();

        let reparsed = Mnemonic::parse_in_normalized(Language::English, &seed.phrase).unwrap();
        assert_eq!(reparsed.to_seed(""), Mnemonic::parse(&seed.phrase).unwrap().to_seed(""));
    }
}
