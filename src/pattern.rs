//! §3 `GenerationCriteria` and §4.2 pattern predicate / difficulty model.

use crate::address::{checksum_from_lower, to_lower_hex};
use crate::error::{EngineError, EngineResult};

const COMPONENT: &str = "pattern";

/// The user's desired address shape (§3).
#[derive(Debug, Clone)]
pub struct GenerationCriteria {
    prefix: String,
    suffix: String,
    checksum: bool,
    use_mnemonic: bool,
}

impl GenerationCriteria {
    /// Validates `len(prefix) + len(suffix) <= 40` and that both are hex.
    /// In non-checksum mode the case of `prefix`/`suffix` is discarded.
    pub fn new(prefix: &str, suffix: &str, checksum: bool, use_mnemonic: bool) -> EngineResult<Self> {
        if !prefix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EngineError::validation(
                COMPONENT,
                "new",
                format!("prefix '{prefix}' contains non-hex characters"),
            ));
        }
        if !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(EngineError::validation(
                COMPONENT,
                "new",
                format!("suffix '{suffix}' contains non-hex characters"),
            ));
        }
        if prefix.len() + suffix.len() > 40 {
            return Err(EngineError::validation(
                COMPONENT,
                "new",
                format!(
                    "prefix ({}) + suffix ({}) exceed 40 hex characters",
                    prefix.len(),
                    suffix.len()
                ),
            ));
        }

        let (prefix, suffix) = if checksum {
            (prefix.to_string(), suffix.to_string())
        } else {
            (prefix.to_ascii_lowercase(), suffix.to_ascii_lowercase())
        };

        Ok(Self { prefix, suffix, checksum, use_mnemonic })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn checksum(&self) -> bool {
        self.checksum
    }

    pub fn use_mnemonic(&self) -> bool {
        self.use_mnemonic
    }

    /// §4.2: exact-match test against a candidate 20-byte address.
    pub fn matches(&self, address: &[u8; 20]) -> bool {
        let lower = to_lower_hex(address);
        if !self.checksum {
            return lower.starts_with(&self.prefix) && lower.ends_with(&self.suffix);
        }

        let checksummed = checksum_from_lower(&lower);
        checksummed.starts_with(&self.prefix) && checksummed.ends_with(&self.suffix)
    }

    /// §4.2 difficulty model: expected attempts for a uniform-random match.
    pub fn difficulty(&self) -> f64 {
        let total_chars = (self.prefix.len() + self.suffix.len()) as i32;
        let base = 16f64.powi(total_chars);
        if !self.checksum {
            return base;
        }
        let k = self
            .prefix
            .chars()
            .chain(self.suffix.chars())
            .filter(|c| c.is_ascii_alphabetic())
            .count() as i32;
        base * 2f64.powi(k)
    }

    /// §4.2: attempts at which match probability crosses 50%.
    pub fn probability50(&self) -> u64 {
        (self.difficulty() * std::f64::consts::LN_2) as u64
    }
}

/// §4.2 ETA: `remaining_attempts / speed`, surfaced as `None` (never `0`)
/// when either input is zero or non-finite.
pub fn eta_seconds(speed_addr_per_sec: f64, remaining_attempts: f64) -> Option<f64> {
    if speed_addr_per_sec <= 0.0 || remaining_attempts <= 0.0 || !speed_addr_per_sec.is_finite() {
        return None;
    }
    Some(remaining_attempts / speed_addr_per_sec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlong_pattern() {
        let prefix = "a".repeat(21);
        let suffix = "b".repeat(20);
        assert!(GenerationCriteria::new(&prefix, &suffix, false, false).is_err());
    }

    #[test]
    fn non_checksum_difficulty_matches_spec_example() {
        let c = GenerationCriteria::new("abcd", "", false, false).unwrap();
        assert_eq!(c.difficulty(), 65536.0);
        assert_eq!(c.probability50(), 45426);
    }

    #[test]
    fn non_checksum_match_is_case_insensitive() {
        let c = GenerationCriteria::new("AB", "", false, false).unwrap();
        let mut addr = [0u8; 20];
        addr[0] = 0xab;
        assert!(c.matches(&addr));
    }

    #[test]
    fn checksum_mode_enforces_case() {
        // Build an address whose checksum form we know, then require exact case.
        let addr: [u8; 20] = [
            0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        let checksummed = checksum_from_lower(&to_lower_hex(&addr));
        let prefix = &checksummed[..4];
        let c = GenerationCriteria::new(prefix, "", true, false).unwrap();
        assert!(c.matches(&addr));

        // Flipping the case of an alphabetic character must break the match.
        let flipped = flip_first_alpha_case(prefix);
        if flipped != prefix {
            let c2 = GenerationCriteria::new(&flipped, "", true, false).unwrap();
            assert!(!c2.matches(&addr));
        }
    }

    fn flip_first_alpha_case(s: &str) -> String {
        let mut out = String::new();
        let mut flipped_once = false;
        for c in s.chars() {
            if !flipped_once && c.is_ascii_alphabetic() {
                out.push(if c.is_ascii_uppercase() {
                    c.to_ascii_lowercase()
                } else {
                    c.to_ascii_uppercase()
                });
                flipped_once = true;
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn eta_is_none_for_zero_inputs() {
        assert_eq!(eta_seconds(0.0, 100.0), None);
        assert_eq!(eta_seconds(100.0, 0.0), None);
        assert_eq!(eta_seconds(1000.0, 500.0), Some(0.5));
    }
}
