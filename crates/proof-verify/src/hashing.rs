use std::borrow::Cow;

use alloy_primitives::{U256, hex, keccak256};

use crate::FieldElement;

/// Hashes arbitrary bytes with keccak256 and reduces the digest to a field element.
///
/// The digest is shifted right by one byte so the result always fits the BN254 scalar field.
/// This is the same reduction the sequencer and the World ID SDKs apply, so it must not change.
#[must_use]
pub fn hash_to_field(bytes: &[u8]) -> FieldElement {
    let digest = U256::from_be_bytes(keccak256(bytes).0);
    FieldElement::from(digest >> 8)
}

/// Hashes a signal string to a field element.
///
/// A string made of `0x` and hex digits is hashed as the bytes it encodes (an odd number of
/// digits is left-padded with a zero). Anything else is hashed as its UTF-8 bytes.
#[must_use]
pub fn hash_signal(signal: &str) -> FieldElement {
    match hex_bytes(signal) {
        Some(bytes) => hash_to_field(&bytes),
        None => hash_to_field(signal.as_bytes()),
    }
}

fn hex_bytes(s: &str) -> Option<Vec<u8>> {
    let payload = s.strip_prefix("0x")?;
    if !payload.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let payload = if payload.len() % 2 == 1 {
        Cow::Owned(format!("0{payload}"))
    } else {
        Cow::Borrowed(payload)
    };
    hex::decode(payload.as_ref()).ok()
}

/// Derives the external nullifier for an action of an app.
///
/// The app id is hashed first; the action (when present) is then packed after the 32-byte
/// app hash and the pair is hashed again. An empty action yields the app hash alone.
#[must_use]
pub fn external_nullifier(app_id: &str, action: &str) -> FieldElement {
    let app_hash = hash_signal(app_id);
    if action.is_empty() {
        return app_hash;
    }

    let mut packed = app_hash.to_be_bytes().to_vec();
    packed.extend_from_slice(action.as_bytes());
    hash_to_field(&packed)
}
