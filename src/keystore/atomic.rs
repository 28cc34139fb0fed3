//! Atomic file writer (SPEC_FULL.md §4.8): temp-file + fsync + rename, with
//! a fixed mode applied before any secret bytes are written.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::{EngineError, EngineResult};

const COMPONENT: &str = "keystore::atomic";
const TMP_PREFIX: &str = ".keystore-tmp-";
const DIR_MODE: u32 = 0o755;

/// Writes `bytes` to `path` atomically at the given Unix `mode`.
///
/// 1. create parent dirs (0755) if missing
/// 2. create a `.keystore-tmp-<random>` file in the same directory
/// 3. chmod it to `mode` before writing
/// 4. write + fsync + close
/// 5. rename temp -> final
/// 6. verify the final file's mode
///
/// Any failure after temp creation removes the temp file before returning.
pub fn write_atomic(path: &Path, bytes: &[u8], mode: u32) -> EngineResult<()> {
    let dir = path.parent().ok_or_else(|| {
        EngineError::filesystem(COMPONENT, "write_atomic", "path has no parent directory", false)
    })?;

    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| {
            EngineError::filesystem(COMPONENT, "write_atomic", format!("failed to create {}: {e}", dir.display()), true)
        })?;
        fs::set_permissions(dir, fs::Permissions::from_mode(DIR_MODE)).map_err(|e| {
            EngineError::filesystem(COMPONENT, "write_atomic", format!("failed to chmod {}: {e}", dir.display()), true)
        })?;
    }

    let tmp_path = temp_path(dir);
    let result = write_temp_then_rename(&tmp_path, path, bytes, mode);
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_temp_then_rename(tmp_path: &Path, final_path: &Path, bytes: &[u8], mode: u32) -> EngineResult<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(tmp_path)
        .map_err(|e| EngineError::filesystem(COMPONENT, "write_atomic", format!("failed to create temp file: {e}"), true))?;

    // §4.8 step 3: chmod explicitly too, since umask can widen the mode
    // passed to `open` on some platforms.
    file.set_permissions(fs::Permissions::from_mode(mode)).map_err(|e| {
        EngineError::filesystem(COMPONENT, "write_atomic", format!("failed to chmod temp file: {e}"), true)
    })?;

    let written = file
        .write(bytes)
        .map_err(|e| EngineError::filesystem(COMPONENT, "write_atomic", format!("write failed: {e}"), true))?;
    if written != bytes.len() {
        return Err(EngineError::filesystem(
            COMPONENT,
            "write_atomic",
            format!("short write: {written} of {} bytes", bytes.len()),
            true,
        ));
    }

    file.sync_all()
        .map_err(|e| EngineError::filesystem(COMPONENT, "write_atomic", format!("fsync failed: {e}"), true))?;
    drop(file);

    fs::rename(tmp_path, final_path)
        .map_err(|e| EngineError::filesystem(COMPONENT, "write_atomic", format!("rename failed: {e}"), true))?;

    let metadata = fs::metadata(final_path)
        .map_err(|e| EngineError::filesystem(COMPONENT, "write_atomic", format!("stat failed: {e}"), true))?;
    let actual_mode = metadata.permissions().mode() & 0o777;
    if actual_mode != mode {
        return Err(EngineError::filesystem(
            COMPONENT,
            "write_atomic",
            format!("final mode {actual_mode:o} != requested {mode:o}"),
            false,
        ));
    }

    Ok(())
}

fn temp_path(dir: &Path) -> PathBuf {
    let suffix: u64 = rand::thread_rng().gen();
    dir.join(format!("{TMP_PREFIX}{suffix:016x}"))
}

/// Removes `path` if it exists, used by the §4.8 "unlink the keystore on a
/// failed password write" cleanup rule. Tolerant of the file already being
/// gone.
pub fn remove_if_exists(path: &Path) -> EngineResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EngineError::filesystem(COMPONENT, "remove_if_exists", e.to_string(), false)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt as _;

    #[test]
    fn writes_at_exact_mode_and_cleans_up_temp() {
        let dir = tempdir();
        let target = dir.join("sub").join("secret.json");
        write_atomic(&target, b"hello", 0o600).unwrap();

        assert!(target.exists());
        let mode = fs::metadata(&target).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        let leftovers: Vec<_> = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(TMP_PREFIX))
            .collect();
        assert!(leftovers.is_empty());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn remove_if_exists_tolerates_missing_file() {
        let dir = tempdir();
        let missing = dir.join("does-not-exist.json");
        assert!(remove_if_exists(&missing).is_ok());
        fs::remove_dir_all(&dir).ok();
    }

    fn tempdir() -> PathBuf {
        let mut p = std::env::temp_dir();
        let suffix: u64 = rand::thread_rng().gen();
        p.push(format!("vanity-eth-test-{suffix:016x}"));
        fs::create_dir_all(&p).unwrap();
        p
    }
}
