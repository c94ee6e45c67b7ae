use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use world_id_proof_verify::{
    ErrorCode, ProofStatus, RawProofRequest, VerificationError, VerificationLevel,
    VerificationOutcome, VerifyOptions, decode_proof, decode_scalar, resolve_action,
};

use crate::{AppState, error::ErrorResponse};

/// Accepted range for `max_age`: one hour to seven days.
const MIN_MAX_AGE_SECS: u64 = 60 * 60;
const MAX_MAX_AGE_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyRequest {
    action: String,
    #[serde(default)]
    signal: String,
    proof: String,
    nullifier_hash: String,
    merkle_root: String,
    #[serde(default)]
    verification_level: VerificationLevel,
    #[serde(default)]
    max_age: Option<u64>,
}

impl VerifyRequest {
    fn validate(&self) -> Result<(), ErrorResponse> {
        match self.max_age {
            Some(secs) if secs != 0 && !(MIN_MAX_AGE_SECS..=MAX_MAX_AGE_SECS).contains(&secs) => {
                Err(ErrorResponse::validation_error(
                    format!(
                        "max_age must be between {MIN_MAX_AGE_SECS} and {MAX_MAX_AGE_SECS} seconds."
                    ),
                    "max_age",
                ))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyResponse {
    success: bool,
    status: ProofStatus,
    action: String,
    nullifier_hash: String,
}

pub(crate) async fn verify(
    State(state): State<AppState>,
    Path(app_id): Path<String>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ErrorResponse> {
    let Json(request) = payload.map_err(|rejection| {
        ErrorResponse::from(VerificationError::bad_request(
            ErrorCode::ValidationError,
            rejection.body_text(),
        ))
    })?;
    request.validate()?;

    // caller inputs are checked in parse order before any lookup
    decode_proof(&request.proof)?;
    let nullifier_hash =
        decode_scalar(&request.nullifier_hash, "nullifier_hash")?.to_canonical_hex();
    decode_scalar(&request.merkle_root, "merkle_root")?;

    let metadata = resolve_action(
        state.resolver.as_ref(),
        &app_id,
        &request.action,
        &nullifier_hash,
    )
    .await?;
    metadata.check_usage()?;

    let raw = RawProofRequest {
        merkle_root: request.merkle_root,
        signal: request.signal,
        nullifier_hash: nullifier_hash.clone(),
        external_nullifier: metadata.external_nullifier_or_derived(),
        proof: request.proof,
    };
    let options = VerifyOptions {
        is_staging: metadata.is_staging,
        verification_level: request.verification_level,
        max_age: request.max_age,
    };

    match state
        .sequencer
        .verify_proof(&raw, &options, &state.shutdown)
        .await?
    {
        VerificationOutcome::Success { status } => {
            tracing::info!(
                %app_id,
                action = %metadata.action.action,
                ?status,
                "proof verified"
            );
            Ok(Json(VerifyResponse {
                success: true,
                status,
                action: metadata.action.action,
                nullifier_hash,
            }))
        }
        VerificationOutcome::Failure(error) => {
            tracing::debug!(%app_id, code = %error.code, "proof rejected");
            Err(error.into())
        }
    }
}
