//! §6 external file layout: `<outputDir>/0x<address>.{json,pwd,mnemonic}`,
//! written through the atomic writer (§4.8) and retry wrapper (§4.9).

use std::path::{Path, PathBuf};

use rand::RngCore;

use crate::error::{EngineError, EngineResult};
use crate::kdf::KdfRegistry;
use crate::keystore::atomic::{remove_if_exists, write_atomic};
use crate::keystore::retry::{with_retry, RetryPolicy};
use crate::keystore::{encrypt_key, to_pretty_json};
use crate::wallet::Wallet;

const COMPONENT: &str = "keystore::storage";
const SECRET_MODE: u32 = 0o600;
const PASSWORD_LEN: usize = 32;

pub struct StoredPaths {
    pub keystore: PathBuf,
    pub password: PathBuf,
    pub mnemonic: Option<PathBuf>,
}

fn file_stem(address_lower_hex: &str) -> String {
    format!("0x{address_lower_hex}")
}

pub fn keystore_path(out_dir: &Path, address_lower_hex: &str) -> PathBuf {
    out_dir.join(format!("{}.json", file_stem(address_lower_hex)))
}

pub fn password_path(out_dir: &Path, address_lower_hex: &str) -> PathBuf {
    out_dir.join(format!("{}.pwd", file_stem(address_lower_hex)))
}

pub fn mnemonic_path(out_dir: &Path, address_lower_hex: &str) -> PathBuf {
    out_dir.join(format!("{}.mnemonic", file_stem(address_lower_hex)))
}

/// Generates a random ASCII password for a fresh keystore. Not specified by
/// the schema itself; length and charset are an implementation choice, kept
/// generous (32 chars over a 94-symbol alphabet) since the KDF work factor,
/// not the password length, carries the security budget here.
fn generate_password(rng: &mut impl RngCore) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+";
    (0..PASSWORD_LEN)
        .map(|_| {
            let idx = (rng.next_u32() as usize) % CHARSET.len();
            CHARSET[idx] as char
        })
        .collect()
}

/// Writes keystore + password (+ optional mnemonic) files for `wallet` under
/// `out_dir`, through the §4.9 retry loop. Each retry attempt re-derives a
/// fresh password, salt, and IV (via a fresh `encrypt_key` call), so a
/// partial failure never reuses secret material from a prior attempt.
///
/// If the keystore file is written successfully but the password file
/// fails, the keystore file is unlinked to avoid an orphaned credential; if
/// that cleanup itself fails, both errors are reported together.
pub fn persist_wallet(
    registry: &KdfRegistry,
    out_dir: &Path,
    wallet: &Wallet,
    kdf_name: &str,
    retry_policy: RetryPolicy,
) -> EngineResult<StoredPaths> {
    let address_hex = wallet.address_lower_hex();
    let keystore_path = keystore_path(out_dir, &address_hex);
    let password_path = password_path(out_dir, &address_hex);
    let mnemonic_path = wallet.mnemonic.as_ref().map(|_| mnemonic_path(out_dir, &address_hex));

    with_retry(retry_policy, |_try_index| {
        let mut rng = rand::thread_rng();
        let password = generate_password(&mut rng);

        let keystore = encrypt_key(
            registry,
            &wallet.private_key,
            &wallet.address,
            password.as_bytes(),
            kdf_name,
            serde_json::Map::new(),
            &mut rng,
        )?;
        let json = to_pretty_json(&keystore)?;

        write_atomic(&keystore_path, json.as_bytes(), SECRET_MODE)?;

        if let Err(password_err) = write_atomic(&password_path, password.as_bytes(), SECRET_MODE) {
            return Err(unlink_and_report(&keystore_path, password_err));
        }

        if let (Some(path), Some(mnemonic)) = (&mnemonic_path, &wallet.mnemonic) {
            if let Err(mnemonic_err) = write_atomic(path, mnemonic.as_bytes(), SECRET_MODE) {
                let _ = remove_if_exists(&password_path);
                return Err(unlink_and_report(&keystore_path, mnemonic_err));
            }
        }

        Ok(())
    })?;

    Ok(StoredPaths { keystore: keystore_path, password: password_path, mnemonic: mnemonic_path })
}

fn unlink_and_report(keystore_path: &Path, original: EngineError) -> EngineError {
    match remove_if_exists(keystore_path) {
        Ok(()) => original,
        Err(cleanup_err) => EngineError::filesystem(
            COMPONENT,
            "persist_wallet",
            format!("{original}; additionally failed to remove orphaned keystore: {cleanup_err}"),
            original.is_recoverable(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::Wallet;

    fn tempdir() -> PathBuf {
        let mut p = std::env::temp_dir();
        let suffix: u64 = rand::thread_rng().next_u64();
        p.push(format!("vanity-eth-storage-test-{suffix:016x}"));
        p
    }

    #[test]
    fn persists_keystore_and_password_at_fixed_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir();
        let registry = KdfRegistry::new(2 * 1024 * 1024 * 1024);
        let wallet = Wallet::new([0x09u8; 32], [0u8; 64], [0xabu8; 20], None);

        let paths = persist_wallet(&registry, &dir, &wallet, "scrypt", RetryPolicy::default()).unwrap();
        assert!(paths.keystore.exists());
        assert!(paths.password.exists());
        assert!(paths.mnemonic.is_none());

        let mode = std::fs::metadata(&paths.keystore).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn writes_mnemonic_file_when_present() {
        let dir = tempdir();
        let registry = KdfRegistry::new(2 * 1024 * 1024 * 1024);
        let wallet = Wallet::new([0x0au8; 32], [0u8; 64], [0xcdu8; 20], Some("test mnemonic phrase".to_string()));

        let paths = persist_wallet(&registry, &dir, &wallet, "scrypt", RetryPolicy::default()).unwrap();
        assert!(paths.mnemonic.unwrap().exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
