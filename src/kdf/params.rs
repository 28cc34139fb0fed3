//! Alias-tolerant parameter extraction from the untyped `kdfparams` object
//! (SPEC_FULL.md §4.5, §9 "polymorphic KDF parameters").
//!
//! Each KDF handler owns its own tagged parameter struct; this module only
//! supplies the shared plumbing for pulling named fields (with aliases) and
//! the `salt` shapes out of a `serde_json::Map`, so no handler needs runtime
//! reflection over field names.

use serde_json::{Map, Value};

use crate::error::{EngineError, EngineResult};

pub type RawParams = Map<String, Value>;

const COMPONENT: &str = "kdf::params";

/// Looks up the first alias present in `raw`, returning its value.
pub fn get_alias<'a>(raw: &'a RawParams, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|a| raw.get(*a))
}

/// Coerces a JSON number (or numeric string) into `u64`.
pub fn as_u64(component: &'static str, name: &str, value: &Value) -> EngineResult<u64> {
    match value {
        Value::Number(n) => n.as_u64().ok_or_else(|| {
            EngineError::validation(component, "as_u64", format!("'{name}' is not a non-negative integer"))
        }),
        Value::String(s) => s
            .parse::<u64>()
            .map_err(|_| EngineError::validation(component, "as_u64", format!("'{name}' ('{s}') is not an integer"))),
        other => Err(EngineError::validation(
            component,
            "as_u64",
            format!("'{name}' has unsupported type {other:?}"),
        )),
    }
}

/// §4.5 salt shapes: a hex string (with or without `0x`), or a JSON array of
/// numeric bytes. Must be non-empty.
pub fn parse_salt(value: &Value) -> EngineResult<Vec<u8>> {
    let bytes = match value {
        Value::String(s) => {
            let trimmed = s.strip_prefix("0x").unwrap_or(s);
            hex::decode(trimmed).map_err(|e| {
                EngineError::validation(COMPONENT, "parse_salt", format!("invalid hex salt: {e}"))
            })?
        }
        Value::Array(items) => {
            let mut bytes = Vec::with_capacity(items.len());
            for item in items {
                let n = item.as_u64().ok_or_else(|| {
                    EngineError::validation(COMPONENT, "parse_salt", "salt array must contain byte values 0..255")
                })?;
                if n > 255 {
                    return Err(EngineError::validation(
                        COMPONENT,
                        "parse_salt",
                        format!("salt array element {n} is out of byte range"),
                    ));
                }
                bytes.push(n as u8);
            }
            bytes
        }
        other => {
            return Err(EngineError::validation(
                COMPONENT,
                "parse_salt",
                format!("unsupported salt shape {other:?}"),
            ))
        }
    };

    if bytes.is_empty() {
        return Err(EngineError::validation(COMPONENT, "parse_salt", "salt must not be empty"));
    }
    Ok(bytes)
}

pub fn salt_to_value(salt: &[u8]) -> Value {
    Value::String(hex::encode(salt))
}

/// The normalised canonical name of a KDF, folding case and separator
/// variants per §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedKdf {
    Scrypt,
    Pbkdf2Sha256,
    Pbkdf2Sha512,
}

impl NormalizedKdf {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scrypt => "scrypt",
            Self::Pbkdf2Sha256 => "pbkdf2-sha256",
            Self::Pbkdf2Sha512 => "pbkdf2-sha512",
        }
    }

    /// The name persisted into the keystore's `kdf` field (§3, §4.7 step 7):
    /// pbkdf2 variants collapse to the bare `"pbkdf2"`.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Scrypt => "scrypt",
            Self::Pbkdf2Sha256 | Self::Pbkdf2Sha512 => "pbkdf2",
        }
    }
}

/// Folds case and rewrites underscore/hyphen/no-separator variants, per
/// §4.5's normalisation table.
pub fn normalize_kdf_name(name: &str) -> Option<NormalizedKdf> {
    let folded: String = name.chars().filter(|c| *c != '_' && *c != '-').collect::<String>().to_ascii_lowercase();
    match folded.as_str() {
        "scrypt" => Some(NormalizedKdf::Scrypt),
        "pbkdf2" | "pbkdf2sha256" | "pbkdf2256" => Some(NormalizedKdf::Pbkdf2Sha256),
        "pbkdf2sha512" | "pbkdf2512" => Some(NormalizedKdf::Pbkdf2Sha512),
        _ => None,
    }
}

/// §4.5 PRF field: missing implies `hmac-sha256`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prf {
    HmacSha256,
    HmacSha512,
}

impl Prf {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HmacSha256 => "hmac-sha256",
            Self::HmacSha512 => "hmac-sha512",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let folded: String = raw.chars().filter(|c| *c != '_' && *c != '-').collect::<String>().to_ascii_lowercase();
        match folded.as_str() {
            "hmacsha256" | "sha256" => Some(Self::HmacSha256),
            "hmacsha512" | "sha512" => Some(Self::HmacSha512),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_common_variants() {
        assert_eq!(normalize_kdf_name("SCRYPT"), Some(NormalizedKdf::Scrypt));
        assert_eq!(normalize_kdf_name("Scrypt"), Some(NormalizedKdf::Scrypt));
        assert_eq!(normalize_kdf_name("PBKDF2_SHA256"), Some(NormalizedKdf::Pbkdf2Sha256));
        assert_eq!(normalize_kdf_name("pbkdf2sha256"), Some(NormalizedKdf::Pbkdf2Sha256));
        assert_eq!(normalize_kdf_name("pbkdf2-256"), Some(NormalizedKdf::Pbkdf2Sha256));
        assert_eq!(normalize_kdf_name("PBKDF2_SHA512"), Some(NormalizedKdf::Pbkdf2Sha512));
        assert_eq!(normalize_kdf_name("nonsense"), None);
    }

    #[test]
    fn parses_hex_salt_with_and_without_prefix() {
        let a = parse_salt(&Value::String("0xdeadbeef".into())).unwrap();
        let b = parse_salt(&Value::String("deadbeef".into())).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn parses_array_salt() {
        let v = parse_salt(&Value::Array(vec![Value::from(1), Value::from(2), Value::from(3)])).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn rejects_empty_salt() {
        assert!(parse_salt(&Value::String(String::new())).is_err());
    }
}
