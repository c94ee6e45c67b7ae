use crate::{ErrorCode, VerificationError};

/// A sequencer rejection message with a stable mapping to an [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownError {
    /// Contract error selector of the rejection, if it has one. Informational only.
    pub raw_code: Option<&'static str>,
    /// The exact response body the sequencer sends.
    pub raw_message: &'static str,
    /// The code reported to callers.
    pub code: ErrorCode,
    /// The message reported to callers.
    pub detail: &'static str,
}

/// Known sequencer rejections, matched by exact body text.
pub static KNOWN_ERRORS: [KnownError; 3] = [
    KnownError {
        raw_code: Some("0x504570e3"),
        raw_message: "invalid root",
        code: ErrorCode::InvalidMerkleRoot,
        detail: "The provided Merkle root is invalid. User appears to be unverified.",
    },
    KnownError {
        raw_code: Some("0x09bde339"),
        raw_message: "invalid proof",
        code: ErrorCode::InvalidProof,
        detail: "The provided proof is invalid and it cannot be verified. Please check all inputs and try again.",
    },
    KnownError {
        raw_code: None,
        raw_message: "Root provided in semaphore proof is too old.",
        code: ErrorCode::RootTooOld,
        detail: "The provided merkle root is too old. Please generate a new proof and try again.",
    },
];

impl KnownError {
    /// Looks up a rejection by the exact body the sequencer returned.
    ///
    /// No trimming or case folding is applied.
    #[must_use]
    pub fn lookup(raw_message: &str) -> Option<&'static Self> {
        KNOWN_ERRORS
            .iter()
            .find(|entry| entry.raw_message == raw_message)
    }

    /// The caller-facing error for this rejection.
    #[must_use]
    pub fn to_error(&self) -> VerificationError {
        VerificationError::bad_request(self.code, self.detail)
    }
}
