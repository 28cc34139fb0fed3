//! Address derivation and EIP-55 checksum encoding (SPEC_FULL.md §4.1).

use crate::hash::keccak256;

/// `last20(Keccak256(publicKey))` where `publicKey` is the 64-byte
/// uncompressed point (no `0x04` prefix).
pub fn derive_address(public_key_xy: &[u8; 64]) -> [u8; 20] {
    let digest = keccak256(public_key_xy);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    address
}

/// Lowercase, unprefixed 40-hex-character address string.
pub fn to_lower_hex(address: &[u8; 20]) -> String {
    hex::encode(address)
}

/// EIP-55 mixed-case checksum encoding. Input is lowercase hex without `0x`;
/// output is the 40-character mixed-case string, also without `0x`.
///
/// For each alphabetic nibble position `i` of the lowercase address, the
/// character is uppercased iff the corresponding nibble of
/// `Keccak256(lowercase_address_bytes)` is `>= 8`.
pub fn to_checksum_hex(address: &[u8; 20]) -> String {
    let lower = to_lower_hex(address);
    checksum_from_lower(&lower)
}

/// Same as [`to_checksum_hex`] but takes the lowercase hex string directly —
/// used by the pattern predicate, which already has the lowercase form on
/// hand, and by tests that want to checksum a pattern fragment.
pub fn checksum_from_lower(lower_hex: &str) -> String {
    let hash = keccak256(lower_hex.as_bytes());
    let mut out = String::with_capacity(lower_hex.len());
    for (i, c) in lower_hex.chars().enumerate() {
        if c.is_ascii_alphabetic() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // EIP-55 test vectors from the ERC.
    #[test]
    fn eip55_vectors() {
        let cases = [
            "5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "fB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "dbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "D1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ];
        for case in cases {
            let lower = case.to_ascii_lowercase();
            assert_eq!(checksum_from_lower(&lower), case);
        }
    }
}
