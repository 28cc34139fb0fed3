//! PBKDF2 handler (SHA-256/SHA-512 PRF variants), SPEC_FULL.md §4.5.

use serde_json::{Map, Value};
use sha2::{Sha256, Sha512};

use crate::error::{EngineError, EngineResult};
use crate::kdf::params::{as_u64, get_alias, parse_salt, salt_to_value, Prf, RawParams};

const COMPONENT: &str = "kdf::pbkdf2";

pub const C_RANGE: (u64, u64) = (1_000, 10_000_000);
pub const DKLEN_RANGE: (u64, u64) = (16, 128);
pub const C_WARNING_THRESHOLD: u64 = 100_000;

#[derive(Debug, Clone)]
pub struct Pbkdf2Params {
    pub c: u32,
    pub dklen: u32,
    pub prf: Prf,
    pub salt: Vec<u8>,
}

impl Pbkdf2Params {
    pub fn default_with_salt(prf: Prf, salt: Vec<u8>) -> Self {
        Self { c: 262_144, dklen: 32, prf, salt }
    }

    /// Parses + validates a raw `kdfparams` object. `c < 100_000` is a
    /// warning, not a fatal error; the caller surfaces it via the
    /// compatibility analyser rather than here.
    pub fn parse(raw: &RawParams) -> EngineResult<(Self, Vec<String>)> {
        let c = get_alias(raw, &["c", "iter", "iterations", "rounds"])
            .ok_or_else(|| missing("c"))
            .and_then(|v| as_u64(COMPONENT, "c", v))?;
        let dklen = get_alias(raw, &["dklen", "dkLen"])
            .ok_or_else(|| missing("dklen"))
            .and_then(|v| as_u64(COMPONENT, "dklen", v))?;
        let prf = match get_alias(raw, &["prf", "PRF", "hash", "hashFunc"]) {
            Some(Value::String(s)) => Prf::parse(s).ok_or_else(|| {
                EngineError::kdf(
                    COMPONENT,
                    "parse",
                    "prf",
                    s.clone(),
                    "hmac-sha256 or hmac-sha512",
                    vec![],
                )
            })?,
            Some(other) => {
                return Err(EngineError::validation(COMPONENT, "parse", format!("prf has unsupported type {other:?}")))
            }
            None => Prf::HmacSha256,
        };
        let salt = get_alias(raw, &["salt", "Salt", "SALT"]).ok_or_else(|| missing("salt")).and_then(parse_salt)?;

        let params = Self { c: c as u32, dklen: dklen as u32, prf, salt };
        let warnings = params.validate()?;
        Ok((params, warnings))
    }

    /// Returns non-fatal warnings (e.g. `c` below the recommended floor).
    pub fn validate(&self) -> EngineResult<Vec<String>> {
        in_range("c", self.c as u64, C_RANGE)?;
        in_range("dklen", self.dklen as u64, DKLEN_RANGE)?;
        if self.salt.is_empty() {
            return Err(EngineError::validation(COMPONENT, "validate", "salt must not be empty"));
        }

        let mut warnings = Vec::new();
        if (self.c as u64) < C_WARNING_THRESHOLD {
            warnings.push(format!(
                "c = {} is below the recommended floor of {C_WARNING_THRESHOLD}",
                self.c
            ));
        }
        Ok(warnings)
    }

    /// Always derives exactly 32 bytes, the fixed `DK` length KeyStore V3's
    /// AES/MAC key split (`DK[0..16]`/`DK[16..32]`) requires. `self.dklen` is
    /// wire/informational only — stored and validated, never fed to PBKDF2.
    pub fn derive_key(&self, password: &[u8]) -> EngineResult<[u8; 32]> {
        let mut key = [0u8; 32];
        match self.prf {
            Prf::HmacSha256 => pbkdf2::pbkdf2_hmac::<Sha256>(password, &self.salt, self.c, &mut key),
            Prf::HmacSha512 => pbkdf2::pbkdf2_hmac::<Sha512>(password, &self.salt, self.c, &mut key),
        }
        Ok(key)
    }

    pub fn to_wire(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("dklen".to_string(), Value::from(self.dklen));
        map.insert("c".to_string(), Value::from(self.c));
        map.insert("prf".to_string(), Value::from(self.prf.as_str()));
        map.insert("salt".to_string(), salt_to_value(&self.salt));
        map
    }
}

fn in_range(name: &str, value: u64, range: (u64, u64)) -> EngineResult<()> {
    if value < range.0 || value > range.1 {
        return Err(EngineError::kdf(
            COMPONENT,
            "validate",
            name,
            value.to_string(),
            format!("in [{}, {}]", range.0, range.1),
            vec![],
        ));
    }
    Ok(())
}

fn missing(name: &str) -> EngineError {
    EngineError::validation(COMPONENT, "parse", format!("missing required parameter '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warns_below_recommended_c() {
        let params = Pbkdf2Params { c: 50_000, dklen: 32, prf: Prf::HmacSha256, salt: vec![1, 2, 3] };
        let warnings = params.validate().unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn rejects_c_out_of_range() {
        let params = Pbkdf2Params { c: 999, dklen: 32, prf: Prf::HmacSha256, salt: vec![1] };
        assert!(params.validate().is_err());
    }

    #[test]
    fn derives_deterministic_key() {
        let params = Pbkdf2Params { c: 1000, dklen: 32, prf: Prf::HmacSha256, salt: vec![0u8; 16] };
        let a = params.derive_key(b"password").unwrap();
        let b = params.derive_key(b"password").unwrap();
        assert_eq!(a, b);
    }
}
