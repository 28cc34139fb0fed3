//! Scrypt handler: parameter contract, validation, and key derivation
//! (SPEC_FULL.md §4.5).

use serde_json::{Map, Value};

use crate::error::{EngineError, EngineResult};
use crate::kdf::params::{as_u64, get_alias, parse_salt, salt_to_value, RawParams};

const COMPONENT: &str = "kdf::scrypt";

pub const N_RANGE: (u64, u64) = (1024, 67_108_864);
pub const R_RANGE: (u64, u64) = (1, 1024);
pub const P_RANGE: (u64, u64) = (1, 16);
pub const DKLEN_RANGE: (u64, u64) = (16, 128);

#[derive(Debug, Clone)]
pub struct ScryptParams {
    pub n: u64,
    pub r: u32,
    pub p: u32,
    pub dklen: u32,
    pub salt: Vec<u8>,
}

impl ScryptParams {
    pub fn default_with_salt(salt: Vec<u8>) -> Self {
        Self { n: 1 << 18, r: 8, p: 1, dklen: 32, salt }
    }

    /// Parses + validates a raw `kdfparams` object, including alias
    /// resolution and the memory-budget check (`128*n*r <= budget`).
    pub fn parse(raw: &RawParams, memory_budget_bytes: u64) -> EngineResult<Self> {
        let n = get_alias(raw, &["n", "N", "cost"])
            .ok_or_else(|| missing("n"))
            .and_then(|v| as_u64(COMPONENT, "n", v))?;
        let r = get_alias(raw, &["r", "R", "blocksize"])
            .ok_or_else(|| missing("r"))
            .and_then(|v| as_u64(COMPONENT, "r", v))?;
        let p = get_alias(raw, &["p", "P", "parallel"])
            .ok_or_else(|| missing("p"))
            .and_then(|v| as_u64(COMPONENT, "p", v))?;
        let dklen = get_alias(raw, &["dklen", "dkLen", "keylen", "length"])
            .ok_or_else(|| missing("dklen"))
            .and_then(|v| as_u64(COMPONENT, "dklen", v))?;
        let salt = get_alias(raw, &["salt", "Salt", "SALT"])
            .ok_or_else(|| missing("salt"))
            .and_then(parse_salt)?;

        let params = Self { n, r: r as u32, p: p as u32, dklen: dklen as u32, salt };
        params.validate(memory_budget_bytes)?;
        Ok(params)
    }

    pub fn validate(&self, memory_budget_bytes: u64) -> EngineResult<()> {
        if !self.n.is_power_of_two() {
            return Err(kdf_err(
                "n",
                self.n.to_string(),
                "a power of 2",
                vec!["try 16384, 262144, or 1048576".to_string()],
            ));
        }
        in_range("n", self.n, N_RANGE)?;
        in_range("r", self.r as u64, R_RANGE)?;
        in_range("p", self.p as u64, P_RANGE)?;
        in_range("dklen", self.dklen as u64, DKLEN_RANGE)?;
        if self.salt.is_empty() {
            return Err(EngineError::validation(COMPONENT, "validate", "salt must not be empty"));
        }

        let predicted_memory = 128u128 * self.n as u128 * self.r as u128;
        if predicted_memory > memory_budget_bytes as u128 {
            return Err(EngineError::Kdf {
                component: COMPONENT,
                operation: "validate",
                parameter: "n,r".to_string(),
                value: format!("128*{}*{} = {} bytes", self.n, self.r, predicted_memory),
                expected: format!("<= {memory_budget_bytes} bytes"),
                suggestions: vec!["lower n or r, or raise the configured memory budget".to_string()],
            });
        }
        Ok(())
    }

    /// Always derives exactly 32 bytes, the fixed `DK` length KeyStore V3's
    /// AES/MAC key split (`DK[0..16]`/`DK[16..32]`) requires. `self.dklen` is
    /// wire/informational only — stored and validated, never fed to scrypt.
    pub fn derive_key(&self, password: &[u8]) -> EngineResult<[u8; 32]> {
        let log2_n = self.n.trailing_zeros() as u8;
        let params = scrypt::Params::new(log2_n, self.r, self.p, 32).map_err(|e| {
            EngineError::crypto(COMPONENT, "derive_key", format!("invalid scrypt params: {e}"))
        })?;
        let mut key = [0u8; 32];
        scrypt::scrypt(password, &self.salt, &params, &mut key)
            .map_err(|e| EngineError::crypto(COMPONENT, "derive_key", format!("scrypt failed: {e}")))?;
        Ok(key)
    }

    pub fn to_wire(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("dklen".to_string(), Value::from(self.dklen));
        map.insert("n".to_string(), Value::from(self.n));
        map.insert("p".to_string(), Value::from(self.p));
        map.insert("r".to_string(), Value::from(self.r));
        map.insert("salt".to_string(), salt_to_value(&self.salt));
        map
    }
}

fn in_range(name: &str, value: u64, range: (u64, u64)) -> EngineResult<()> {
    if value < range.0 || value > range.1 {
        return Err(kdf_err(
            name,
            value.to_string(),
            format!("in [{}, {}]", range.0, range.1),
            vec![],
        ));
    }
    Ok(())
}

fn kdf_err(parameter: &str, value: impl Into<String>, expected: impl Into<String>, suggestions: Vec<String>) -> EngineError {
    EngineError::kdf(COMPONENT, "validate", parameter, value, expected, suggestions)
}

fn missing(name: &str) -> EngineError {
    EngineError::validation(COMPONENT, "parse", format!("missing required parameter '{name}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two_n() {
        let params = ScryptParams { n: 12345, r: 8, p: 1, dklen: 32, salt: vec![1, 2, 3] };
        assert!(params.validate(2 * 1024 * 1024 * 1024).is_err());
    }

    #[test]
    fn rejects_memory_over_budget() {
        let params = ScryptParams { n: 1 << 20, r: 64, p: 1, dklen: 32, salt: vec![1] };
        // 128 * 2^20 * 64 ~= 8 GiB, well over a 2 GiB budget.
        assert!(params.validate(2 * 1024 * 1024 * 1024).is_err());
    }

    #[test]
    fn accepts_defaults() {
        let params = ScryptParams::default_with_salt(vec![0u8; 32]);
        assert!(params.validate(2 * 1024 * 1024 * 1024).is_ok());
    }
}
