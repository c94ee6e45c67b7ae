use std::{fmt, str::FromStr};

use alloy_primitives::{U256, hex};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

/// Size of a single ABI word in bytes.
const WORD_SIZE: usize = 32;

/// Number of `uint256` words in an encoded Groth16 proof.
pub const PROOF_WORDS: usize = 8;

/// Errors produced while decoding ABI-encoded integers.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The input is not a `0x`-prefixed hex string.
    #[error("expected a 0x-prefixed hex string")]
    MissingPrefix,
    /// The payload is not valid hex.
    #[error("invalid hex encoding: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    /// The payload does not split into whole 32-byte words.
    #[error("payload of {0} bytes is not a whole number of 32-byte words")]
    Misaligned(usize),
    /// The payload holds a different number of words than the target type.
    #[error("expected {expected} ABI words, found {found}")]
    WrongLength {
        /// Number of words the target type occupies.
        expected: usize,
        /// Number of words present in the payload.
        found: usize,
    },
    /// The ABI decoder rejected the payload.
    #[error("ABI decoding failed: {0}")]
    Abi(#[from] alloy_sol_types::Error),
}

/// An unsigned 256-bit integer taken from a proof request.
///
/// Field elements are always rendered in their canonical form: `0x` followed by exactly 64
/// lowercase hex digits. Every comparison and every payload sent to the sequencer uses this
/// form, so two textually different encodings of the same number can never diverge downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FieldElement(U256);

impl FieldElement {
    /// The zero element.
    pub const ZERO: Self = Self(U256::ZERO);

    /// Returns the underlying integer.
    #[must_use]
    pub const fn as_u256(&self) -> U256 {
        self.0
    }

    /// Returns the 32-byte big-endian representation.
    #[must_use]
    pub fn to_be_bytes(&self) -> [u8; 32] {
        self.0.to_be_bytes::<32>()
    }

    /// Renders the canonical fixed-width lowercase hex form.
    #[must_use]
    pub fn to_canonical_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_be_bytes()))
    }
}

impl From<U256> for FieldElement {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<FieldElement> for U256 {
    fn from(value: FieldElement) -> Self {
        value.0
    }
}

impl FromStr for FieldElement {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_uint256(s)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_hex())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        decode_uint256(&s).map_err(D::Error::custom)
    }
}

/// Hex-decodes an ABI payload and checks it is made of whole words.
fn abi_payload(s: &str) -> Result<Vec<u8>, DecodeError> {
    let payload = s.strip_prefix("0x").ok_or(DecodeError::MissingPrefix)?;
    // hex::decode tolerates a second `0x`; only bare digits are valid here
    if let Some((index, c)) = payload.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(hex::FromHexError::InvalidHexCharacter { c, index }.into());
    }
    let bytes = hex::decode(payload)?;
    if bytes.len() % WORD_SIZE != 0 {
        return Err(DecodeError::Misaligned(bytes.len()));
    }
    Ok(bytes)
}

const fn expect_words(bytes: &[u8], expected: usize) -> Result<(), DecodeError> {
    let found = bytes.len() / WORD_SIZE;
    if found != expected {
        return Err(DecodeError::WrongLength { expected, found });
    }
    Ok(())
}

/// Decodes an ABI-encoded `uint256`.
///
/// The input must be `0x` followed by exactly one 32-byte word in hex (either case).
///
/// # Errors
/// Returns a [`DecodeError`] if the prefix is missing, the hex is invalid or the payload is not
/// exactly one word long.
pub fn decode_uint256(s: &str) -> Result<FieldElement, DecodeError> {
    let bytes = abi_payload(s)?;
    expect_words(&bytes, 1)?;
    let value = U256::abi_decode(&bytes)?;
    Ok(FieldElement(value))
}

/// Decodes an ABI-encoded `uint256[8]`, preserving element order.
///
/// # Errors
/// Returns a [`DecodeError`] if the encoding is malformed or holds a number of words other
/// than eight.
pub fn decode_uint256_array8(s: &str) -> Result<[FieldElement; PROOF_WORDS], DecodeError> {
    let bytes = abi_payload(s)?;
    expect_words(&bytes, PROOF_WORDS)?;
    let values = <[U256; PROOF_WORDS]>::abi_decode(&bytes)?;
    Ok(values.map(FieldElement))
}

/// Returns whether `s` looks like an ABI-encoded value: `0x` followed by at least one
/// lowercase hex digit.
///
/// This only checks the shape of the string; a value that passes may still fail
/// [`decode_uint256`].
#[must_use]
pub fn is_abi_like(s: &str) -> bool {
    s.strip_prefix("0x").is_some_and(|payload| {
        !payload.is_empty()
            && payload
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abi(values: &[u64]) -> String {
        let words: String = values.iter().map(|v| format!("{v:064x}")).collect();
        format!("0x{words}")
    }

    #[test]
    fn decodes_single_word() {
        let value = decode_uint256(&abi(&[42])).unwrap();
        assert_eq!(value.as_u256(), U256::from(42));
    }

    #[test]
    fn canonical_hex_is_fixed_width_lowercase() {
        let upper = format!("0x{}", "AB".repeat(32));
        let value = decode_uint256(&upper).unwrap();
        assert_eq!(value.to_canonical_hex(), format!("0x{}", "ab".repeat(32)));

        let small = decode_uint256(&abi(&[10])).unwrap();
        assert_eq!(
            small.to_string(),
            "0x000000000000000000000000000000000000000000000000000000000000000a"
        );
        assert_eq!(FieldElement::ZERO.to_string().len(), 66);
    }

    #[test]
    fn equivalent_encodings_share_a_canonical_form() {
        let lower = decode_uint256(&format!("0x{}", "0f".repeat(32))).unwrap();
        let upper = decode_uint256(&format!("0x{}", "0F".repeat(32))).unwrap();
        assert_eq!(lower, upper);
        assert_eq!(lower.to_canonical_hex(), upper.to_canonical_hex());
    }

    #[test]
    fn rejects_missing_prefix() {
        let input = "00".repeat(32);
        assert!(matches!(
            decode_uint256(&input),
            Err(DecodeError::MissingPrefix)
        ));
    }

    #[test]
    fn rejects_decimal_and_bad_hex() {
        assert!(decode_uint256("12345").is_err());
        assert!(matches!(
            decode_uint256(&format!("0x{}", "zz".repeat(32))),
            Err(DecodeError::InvalidHex(_))
        ));
        assert!(matches!(
            decode_uint256("0x123"),
            Err(DecodeError::InvalidHex(_))
        ));
    }

    #[test]
    fn rejects_doubled_prefix() {
        let word = format!("0x0x{}", "00".repeat(31) + "0a");
        assert!(matches!(
            decode_uint256(&word),
            Err(DecodeError::InvalidHex(_))
        ));
        assert!(decode_uint256(&format!("0x0X{}", "00".repeat(32))).is_err());

        let proof = abi(&[1, 2, 3, 4, 5, 6, 7, 8]).replacen("0x", "0x0x", 1);
        assert!(matches!(
            decode_uint256_array8(&proof),
            Err(DecodeError::InvalidHex(_))
        ));
    }

    #[test]
    fn rejects_short_and_long_payloads() {
        assert!(matches!(
            decode_uint256("0x0a"),
            Err(DecodeError::Misaligned(1))
        ));
        assert!(matches!(
            decode_uint256("0x"),
            Err(DecodeError::WrongLength {
                expected: 1,
                found: 0
            })
        ));
        assert!(matches!(
            decode_uint256(&abi(&[1, 2])),
            Err(DecodeError::WrongLength {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn array_preserves_order() {
        let decoded = decode_uint256_array8(&abi(&[8, 7, 6, 5, 4, 3, 2, 1])).unwrap();
        let values: Vec<U256> = decoded.iter().map(FieldElement::as_u256).collect();
        let expected: Vec<U256> = [8u64, 7, 6, 5, 4, 3, 2, 1].map(U256::from).to_vec();
        assert_eq!(values, expected);
    }

    #[test]
    fn array_rejects_wrong_arity() {
        for len in [0usize, 1, 6, 7, 9, 16] {
            let values: Vec<u64> = (0..len as u64).collect();
            match decode_uint256_array8(&abi(&values)) {
                Err(DecodeError::WrongLength { expected, found }) => {
                    assert_eq!(expected, PROOF_WORDS);
                    assert_eq!(found, len);
                }
                other => panic!("expected WrongLength for {len} words, got {other:?}"),
            }
        }
    }

    #[test]
    fn abi_like_shape() {
        assert!(is_abi_like("0x1"));
        assert!(is_abi_like(&abi(&[1])));
        assert!(!is_abi_like("0x"));
        assert!(!is_abi_like("0xABCD"));
        assert!(!is_abi_like("hello"));
        assert!(!is_abi_like("1234"));
    }

    #[test]
    fn serde_uses_canonical_hex() {
        let value = decode_uint256(&abi(&[255])).unwrap();
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(
            json,
            "\"0x00000000000000000000000000000000000000000000000000000000000000ff\""
        );
        let back: FieldElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
