use serde::{Deserialize, Serialize};

use crate::{
    ErrorCode, FieldElement, VerificationError,
    field::{PROOF_WORDS, decode_uint256, decode_uint256_array8, is_abi_like},
    hashing::hash_signal,
};

const PROOF_FORMAT_MESSAGE: &str =
    "This attribute is improperly formatted. Expected an ABI-encoded uint256[8].";
const UINT256_FORMAT_MESSAGE: &str =
    "This attribute is improperly formatted. Expected an ABI-encoded uint256.";
const SIGNAL_FORMAT_MESSAGE: &str =
    "This attribute is improperly formatted. Expected an ABI-encoded uint256 or a string.";

/// The five proof inputs exactly as submitted. Nothing about them is trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProofRequest {
    /// ABI-encoded `uint256` Merkle root.
    pub merkle_root: String,
    /// Either an ABI-encoded `uint256` or an arbitrary string to hash.
    pub signal: String,
    /// ABI-encoded `uint256` nullifier hash.
    pub nullifier_hash: String,
    /// ABI-encoded `uint256` external nullifier.
    pub external_nullifier: String,
    /// ABI-encoded `uint256[8]` Groth16 proof.
    pub proof: String,
}

/// A decoded Groth16 proof in the point layout the sequencer expects.
///
/// Serializes as `[[a0, a1], [[b00, b01], [b10, b11]], [c0, c1]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanonicalProof([FieldElement; PROOF_WORDS]);

impl CanonicalProof {
    /// Wraps the eight proof words in input order.
    #[must_use]
    pub const fn from_words(words: [FieldElement; PROOF_WORDS]) -> Self {
        Self(words)
    }

    /// The `A` point.
    #[must_use]
    pub const fn a(&self) -> [FieldElement; 2] {
        [self.0[0], self.0[1]]
    }

    /// The `B` point.
    #[must_use]
    pub const fn b(&self) -> [[FieldElement; 2]; 2] {
        [[self.0[2], self.0[3]], [self.0[4], self.0[5]]]
    }

    /// The `C` point.
    #[must_use]
    pub const fn c(&self) -> [FieldElement; 2] {
        [self.0[6], self.0[7]]
    }

    /// The eight proof words in input order.
    #[must_use]
    pub const fn flatten(&self) -> [FieldElement; PROOF_WORDS] {
        self.0
    }
}

impl Serialize for CanonicalProof {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.a(), self.b(), self.c()).serialize(serializer)
    }
}

/// Canonicalized proof inputs ready to be sent to the sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalParams {
    /// Merkle root of the identity set.
    pub merkle_root: FieldElement,
    /// Nullifier hash of the identity for this action.
    pub nullifier_hash: FieldElement,
    /// External nullifier identifying the action.
    pub external_nullifier: FieldElement,
    /// Signal, either decoded directly or hashed.
    pub signal_hash: FieldElement,
    /// The reshaped proof.
    pub proof: CanonicalProof,
}

fn invalid_format(attribute: &'static str, message: &str) -> VerificationError {
    VerificationError::bad_request(ErrorCode::InvalidFormat, message).with_attribute(attribute)
}

/// Decodes one ABI-encoded `uint256` attribute, reporting failures against `attribute`.
///
/// # Errors
/// Returns an `invalid_format` error naming `attribute` when the value is not a single
/// ABI-encoded `uint256`.
pub fn decode_scalar(value: &str, attribute: &'static str) -> Result<FieldElement, VerificationError> {
    decode_uint256(value).map_err(|error| {
        tracing::error!(%error, attribute, "failed to decode proof input");
        invalid_format(attribute, UINT256_FORMAT_MESSAGE)
    })
}

/// Decodes the ABI-encoded `uint256[8]` proof attribute.
///
/// # Errors
/// Returns an `invalid_format` error on `proof` when the value is not exactly eight
/// ABI-encoded words.
pub fn decode_proof(value: &str) -> Result<CanonicalProof, VerificationError> {
    decode_uint256_array8(value)
        .map(CanonicalProof::from_words)
        .map_err(|error| {
            tracing::error!(%error, attribute = "proof", "failed to decode proof input");
            invalid_format("proof", PROOF_FORMAT_MESSAGE)
        })
}

fn signal_hash(signal: &str) -> Result<FieldElement, VerificationError> {
    if !is_abi_like(signal) {
        return Ok(hash_signal(signal));
    }
    decode_uint256(signal).map_err(|error| {
        tracing::error!(%error, attribute = "signal", "failed to decode proof input");
        invalid_format("signal", SIGNAL_FORMAT_MESSAGE)
    })
}

/// Validates and canonicalizes a raw proof request.
///
/// Attributes are checked in a fixed order (`proof`, `nullifier_hash`, `merkle_root`,
/// `external_nullifier`, `signal`) and the first failure is returned.
///
/// # Errors
/// Returns an `invalid_format` [`VerificationError`] naming the first malformed attribute.
pub fn parse(raw: &RawProofRequest) -> Result<CanonicalParams, VerificationError> {
    let proof = decode_proof(&raw.proof)?;
    let nullifier_hash = decode_scalar(&raw.nullifier_hash, "nullifier_hash")?;
    let merkle_root = decode_scalar(&raw.merkle_root, "merkle_root")?;
    let external_nullifier = decode_scalar(&raw.external_nullifier, "external_nullifier")?;
    let signal_hash = signal_hash(&raw.signal)?;

    Ok(CanonicalParams {
        merkle_root,
        nullifier_hash,
        external_nullifier,
        signal_hash,
        proof,
    })
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use serde_json::json;

    use super::*;
    use crate::hashing::hash_to_field;

    fn abi(values: &[u64]) -> String {
        let words: String = values.iter().map(|v| format!("{v:064x}")).collect();
        format!("0x{words}")
    }

    fn valid_request() -> RawProofRequest {
        RawProofRequest {
            merkle_root: abi(&[0xa]),
            signal: "hello".to_string(),
            nullifier_hash: abi(&[0xb]),
            external_nullifier: abi(&[0xc]),
            proof: abi(&[1, 2, 3, 4, 5, 6, 7, 8]),
        }
    }

    fn fe(value: u64) -> FieldElement {
        FieldElement::from(U256::from(value))
    }

    #[test]
    fn parses_valid_request() {
        let params = parse(&valid_request()).unwrap();
        assert_eq!(params.merkle_root, fe(0xa));
        assert_eq!(params.nullifier_hash, fe(0xb));
        assert_eq!(params.external_nullifier, fe(0xc));
        assert_eq!(params.signal_hash, hash_to_field(b"hello"));
    }

    #[test]
    fn reshapes_proof_in_input_order() {
        let params = parse(&valid_request()).unwrap();
        assert_eq!(params.proof.a(), [fe(1), fe(2)]);
        assert_eq!(params.proof.b(), [[fe(3), fe(4)], [fe(5), fe(6)]]);
        assert_eq!(params.proof.c(), [fe(7), fe(8)]);
        assert_eq!(params.proof.flatten(), [1, 2, 3, 4, 5, 6, 7, 8].map(fe));
    }

    #[test]
    fn proof_serializes_as_nested_arrays() {
        let proof = CanonicalProof::from_words([1, 2, 3, 4, 5, 6, 7, 8].map(fe));
        let h = |v: u64| fe(v).to_canonical_hex();
        assert_eq!(
            serde_json::to_value(proof).unwrap(),
            json!([[h(1), h(2)], [[h(3), h(4)], [h(5), h(6)]], [h(7), h(8)]])
        );
    }

    #[test]
    fn wrong_proof_arity_is_reported_on_proof() {
        for len in [0u64, 6, 7, 9] {
            let mut request = valid_request();
            request.proof = abi(&(1..=len).collect::<Vec<_>>());
            let error = parse(&request).unwrap_err();
            assert_eq!(error.code, ErrorCode::InvalidFormat);
            assert_eq!(error.attribute.as_deref(), Some("proof"));
            assert_eq!(error.message, PROOF_FORMAT_MESSAGE);
            assert_eq!(error.status_code, 400);
        }
    }

    #[test]
    fn first_failure_wins() {
        let request = RawProofRequest {
            merkle_root: "bad".to_string(),
            signal: "0x1".to_string(),
            nullifier_hash: "bad".to_string(),
            external_nullifier: "bad".to_string(),
            proof: "bad".to_string(),
        };
        assert_eq!(
            parse(&request).unwrap_err().attribute.as_deref(),
            Some("proof")
        );

        let mut request = valid_request();
        request.nullifier_hash = "bad".to_string();
        request.merkle_root = "bad".to_string();
        assert_eq!(
            parse(&request).unwrap_err().attribute.as_deref(),
            Some("nullifier_hash")
        );

        let mut request = valid_request();
        request.merkle_root = "0x0a".to_string();
        request.external_nullifier = "bad".to_string();
        assert_eq!(
            parse(&request).unwrap_err().attribute.as_deref(),
            Some("merkle_root")
        );
    }

    #[test]
    fn scalar_failures_use_uint256_message() {
        let mut request = valid_request();
        request.external_nullifier = "12".to_string();
        let error = parse(&request).unwrap_err();
        assert_eq!(error.attribute.as_deref(), Some("external_nullifier"));
        assert_eq!(error.message, UINT256_FORMAT_MESSAGE);
    }

    #[test]
    fn encoded_signal_is_decoded_not_hashed() {
        let mut request = valid_request();
        request.signal = abi(&[42]);
        let params = parse(&request).unwrap();
        assert_eq!(params.signal_hash, fe(42));
        assert_ne!(params.signal_hash, hash_signal(&request.signal));
    }

    #[test]
    fn abi_like_signal_that_fails_decoding_is_rejected() {
        let mut request = valid_request();
        request.signal = "0x1".to_string();
        let error = parse(&request).unwrap_err();
        assert_eq!(error.attribute.as_deref(), Some("signal"));
        assert_eq!(error.message, SIGNAL_FORMAT_MESSAGE);
    }

    #[test]
    fn uppercase_hex_signal_is_hashed() {
        let mut request = valid_request();
        request.signal = format!("0x{}", "AB".repeat(32));
        let params = parse(&request).unwrap();
        assert_eq!(params.signal_hash, hash_to_field(&[0xab; 32]));
    }

    #[test]
    fn empty_signal_is_hashed() {
        let mut request = valid_request();
        request.signal = String::new();
        let params = parse(&request).unwrap();
        assert_eq!(params.signal_hash, hash_to_field(&[]));
    }
}
