//! Parallel Ethereum vanity-address engine: generate secp256k1 keypairs
//! until one derives to an address matching a requested prefix/suffix
//! (optionally EIP-55 checksum-cased), then persist it as an encrypted
//! KeyStore V3 file.

pub mod address;
pub mod config;
pub mod engine;
pub mod error;
pub mod hash;
pub mod kdf;
pub mod keygen;
pub mod keystore;
pub mod mnemonic;
pub mod pattern;
pub mod wallet;

pub use config::EngineConfig;
pub use engine::WorkerPool;
pub use error::{EngineError, EngineResult};
pub use pattern::GenerationCriteria;
pub use wallet::{GenerationResult, Wallet};
