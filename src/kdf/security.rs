//! Security-level classification and the compatibility analyser
//! (SPEC_FULL.md §4.6).

use std::collections::HashMap;

use crate::kdf::params::NormalizedKdf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityLevel {
    BelowLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl SecurityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BelowLow => "below-low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::VeryHigh => "very-high",
        }
    }
}

/// §4.6 scrypt classification.
pub fn classify_scrypt(n: u64, r: u32, p: u32) -> SecurityLevel {
    if n >= (1 << 20) && r >= 8 && p >= 1 {
        SecurityLevel::VeryHigh
    } else if n >= (1 << 18) {
        SecurityLevel::High
    } else if n >= (1 << 15) {
        SecurityLevel::Medium
    } else if n >= (1 << 12) {
        SecurityLevel::Low
    } else {
        SecurityLevel::BelowLow
    }
}

/// §4.6 PBKDF2 classification.
pub fn classify_pbkdf2(c: u32) -> SecurityLevel {
    let c = c as u64;
    if c >= 1_000_000 {
        SecurityLevel::VeryHigh
    } else if c >= 262_144 {
        SecurityLevel::High
    } else if c >= 100_000 {
        SecurityLevel::Medium
    } else if c >= 10_000 {
        SecurityLevel::Low
    } else {
        SecurityLevel::BelowLow
    }
}

/// §3/§4.6 advisory report produced for a KDF parameter set.
#[derive(Debug, Clone)]
pub struct CompatibilityReport {
    pub compatible: bool,
    pub kdf_type: String,
    pub normalized_kdf: String,
    pub parameters: HashMap<String, String>,
    pub security_level: SecurityLevel,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl CompatibilityReport {
    pub fn scrypt(kdf_type: &str, n: u64, r: u32, p: u32, dklen: u32, issues: Vec<String>) -> Self {
        let level = classify_scrypt(n, r, p);
        let mut parameters = HashMap::new();
        parameters.insert("n".to_string(), n.to_string());
        parameters.insert("r".to_string(), r.to_string());
        parameters.insert("p".to_string(), p.to_string());
        parameters.insert("dklen".to_string(), dklen.to_string());

        let mut suggestions = Vec::new();
        if level == SecurityLevel::BelowLow {
            suggestions.push("raise n to at least 4096 (2^12) for a Low rating".to_string());
        }

        Self {
            compatible: issues.is_empty(),
            kdf_type: kdf_type.to_string(),
            normalized_kdf: NormalizedKdf::Scrypt.as_str().to_string(),
            parameters,
            security_level: level,
            issues,
            warnings: Vec::new(),
            suggestions,
        }
    }

    pub fn pbkdf2(
        normalized: NormalizedKdf,
        c: u32,
        dklen: u32,
        issues: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        let level = classify_pbkdf2(c);
        let mut parameters = HashMap::new();
        parameters.insert("c".to_string(), c.to_string());
        parameters.insert("dklen".to_string(), dklen.to_string());

        let mut suggestions = Vec::new();
        if !warnings.is_empty() {
            suggestions.push("raise c to at least 100000 to clear the Medium threshold".to_string());
        }

        Self {
            compatible: issues.is_empty(),
            kdf_type: "pbkdf2".to_string(),
            normalized_kdf: normalized.as_str().to_string(),
            parameters,
            security_level: level,
            issues,
            warnings,
            suggestions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrypt_thresholds() {
        assert_eq!(classify_scrypt(1 << 20, 8, 1), SecurityLevel::VeryHigh);
        assert_eq!(classify_scrypt(1 << 18, 1, 1), SecurityLevel::High);
        assert_eq!(classify_scrypt(1 << 15, 1, 1), SecurityLevel::Medium);
        assert_eq!(classify_scrypt(1 << 12, 1, 1), SecurityLevel::Low);
        assert_eq!(classify_scrypt(1 << 11, 1, 1), SecurityLevel::BelowLow);
    }

    #[test]
    fn pbkdf2_thresholds() {
        assert_eq!(classify_pbkdf2(1_000_000), SecurityLevel::VeryHigh);
        assert_eq!(classify_pbkdf2(262_144), SecurityLevel::High);
        assert_eq!(classify_pbkdf2(100_000), SecurityLevel::Medium);
        assert_eq!(classify_pbkdf2(10_000), SecurityLevel::Low);
        assert_eq!(classify_pbkdf2(9_999), SecurityLevel::BelowLow);
    }
}
