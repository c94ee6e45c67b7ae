//! Server-side verification of World ID Semaphore proofs.
//!
//! This crate takes the five untrusted strings that make up a proof submission, decodes and
//! canonicalizes them, hashes the signal to a field element when needed, relays the result to
//! the sequencer and classifies the sequencer's answer into a [`VerificationOutcome`].
//!
//! It does not implement the proof system itself. The metadata store that decides whether an
//! action may be verified at all is modelled by the [`ActionResolver`] trait.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(clippy::all, clippy::nursery)]
#![warn(missing_docs)]

/// Action lookup boundary and the gate rules applied to its results.
pub mod action;
pub use action::{
    ActionDetails, ActionMetadata, ActionRecord, ActionResolver, ActionStatus, AppRecord, Engine,
    NullifierRecord, ResolverError, check_action, resolve_action,
};

/// Static table of known sequencer rejection messages.
pub mod catalogue;
pub use catalogue::{KNOWN_ERRORS, KnownError};

/// ABI decoding of `uint256` values and their canonical hex form.
pub mod field;
pub use field::{DecodeError, FieldElement, decode_uint256, decode_uint256_array8, is_abi_like};

/// Hashing of arbitrary signals and actions to field elements.
pub mod hashing;
pub use hashing::{external_nullifier, hash_signal, hash_to_field};

/// Caller-facing outcome and error types.
pub mod outcome;
pub use outcome::{ErrorCode, ProofStatus, VerificationError, VerificationOutcome};

/// Validation and normalization of raw proof inputs.
pub mod parser;
pub use parser::{
    CanonicalParams, CanonicalProof, RawProofRequest, decode_proof, decode_scalar, parse,
};

/// Static sequencer routing table.
pub mod routing;
pub use routing::{SequencerRoutes, VerificationLevel};

/// Sequencer client and response classification.
pub mod sequencer;
pub use sequencer::{DispatchError, SequencerClient, VerifyOptions};
