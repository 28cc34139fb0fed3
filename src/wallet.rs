//! §3 data model: `Wallet` and `GenerationResult`.

use std::time::Duration;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A found keypair whose address matched the requested pattern.
///
/// The raw key material is zeroised on drop (`ZeroizeOnDrop`); ownership is
/// meant to be transferred exactly once, from the worker that found it to
/// the caller of `generate_wallet`.
#[derive(ZeroizeOnDrop)]
pub struct Wallet {
    pub private_key: [u8; 32],
    #[zeroize(skip)]
    pub public_key: [u8; 64],
    #[zeroize(skip)]
    pub address: [u8; 20],
    pub mnemonic: Option<String>,
}

impl Wallet {
    pub fn new(
        private_key: [u8; 32],
        public_key: [u8; 64],
        address: [u8; 20],
        mnemonic: Option<String>,
    ) -> Self {
        Self { private_key, public_key, address, mnemonic }
    }

    pub fn address_lower_hex(&self) -> String {
        crate::address::to_lower_hex(&self.address)
    }

    pub fn address_checksum_hex(&self) -> String {
        crate::address::to_checksum_hex(&self.address)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address_lower_hex())
            .field("private_key", &"<redacted>")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The full outcome of a `generate_wallet` call (§3).
#[derive(Debug)]
pub struct GenerationResult {
    pub wallet: Wallet,
    /// Attempts across the whole pool at discovery time, not just the
    /// finding worker's local counter.
    pub attempts: u64,
    pub duration: Duration,
    pub worker_id: u32,
}

/// Zeroizes an owned byte buffer in place; used for mnemonic strings and
/// ad-hoc secret buffers that don't carry their own `Drop` impl.
pub fn zeroize_string(mut s: String) {
    s.zeroize();
}
