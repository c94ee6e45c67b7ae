use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable error codes returned to API consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// An input attribute is not encoded as expected.
    InvalidFormat,
    /// The request body failed validation.
    ValidationError,
    /// The app does not exist or is no longer active.
    NotFound,
    /// The action does not exist under the app.
    InvalidAction,
    /// The action is not verified through the cloud engine.
    InvalidEngine,
    /// The action has been deactivated.
    ActionInactive,
    /// The nullifier has already been used the maximum number of times.
    MaxVerificationsReached,
    /// The sequencer does not know the Merkle root.
    InvalidMerkleRoot,
    /// The sequencer rejected the proof.
    InvalidProof,
    /// The Merkle root is older than the accepted window.
    RootTooOld,
    /// Something went wrong on our side or on the sequencer's transport.
    InternalError,
    /// Verification was aborted before the sequencer answered.
    Cancelled,
}

/// A structured, caller-facing verification error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationError {
    /// Human-readable explanation.
    pub message: String,
    /// Stable error code.
    pub code: ErrorCode,
    /// HTTP status code to answer with.
    pub status_code: u16,
    /// The request attribute at fault, when one can be singled out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl VerificationError {
    /// Creates a new error without an attribute.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            code,
            status_code,
            attribute: None,
        }
    }

    /// Creates a `400 Bad Request` error.
    #[must_use]
    pub fn bad_request(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message, 400)
    }

    /// The generic `500` answer used whenever the sequencer exchange itself breaks down.
    #[must_use]
    pub fn internal_error() -> Self {
        Self::new(
            ErrorCode::InternalError,
            "There was an internal issue verifying this proof.",
            500,
        )
    }

    /// The answer for a verification aborted by cancellation.
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(
            ErrorCode::Cancelled,
            "Verification was cancelled before the proof could be checked.",
            503,
        )
    }

    /// Attaches the offending request attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

impl fmt::Display for VerificationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error Code: `{}`. Message: {}", self.code, self.message)?;
        if let Some(attribute) = &self.attribute {
            write!(f, " (attribute: {attribute})")?;
        }
        Ok(())
    }
}

impl std::error::Error for VerificationError {}

/// Where an accepted proof stands on the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProofStatus {
    /// The identity's inclusion has been mined on-chain.
    #[serde(rename = "on-chain")]
    OnChain,
    /// The identity's inclusion is still queued for mining.
    #[serde(rename = "pending")]
    Pending,
}

/// Terminal result of one verification attempt.
///
/// Serializes to `{"success": true, "status": ...}` or `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OutcomeBody", into = "OutcomeBody")]
pub enum VerificationOutcome {
    /// The sequencer accepted the proof.
    Success {
        /// Inclusion status reported by the sequencer.
        status: ProofStatus,
    },
    /// The proof was not accepted.
    Failure(VerificationError),
}

impl VerificationOutcome {
    /// Returns whether the proof was accepted.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// HTTP status code matching this outcome.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Success { .. } => 200,
            Self::Failure(error) => error.status_code,
        }
    }
}

impl From<VerificationError> for VerificationOutcome {
    fn from(error: VerificationError) -> Self {
        Self::Failure(error)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OutcomeBody {
    Success { success: bool, status: ProofStatus },
    Failure { error: VerificationError },
}

impl From<OutcomeBody> for VerificationOutcome {
    fn from(body: OutcomeBody) -> Self {
        match body {
            OutcomeBody::Success { status, .. } => Self::Success { status },
            OutcomeBody::Failure { error } => Self::Failure(error),
        }
    }
}

impl From<VerificationOutcome> for OutcomeBody {
    fn from(outcome: VerificationOutcome) -> Self {
        match outcome {
            VerificationOutcome::Success { status } => Self::Success {
                success: true,
                status,
            },
            VerificationOutcome::Failure(error) => Self::Failure { error },
        }
    }
}
