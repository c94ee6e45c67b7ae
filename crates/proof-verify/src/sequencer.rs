use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    CanonicalParams, CanonicalProof, FieldElement, KnownError, ProofStatus, RawProofRequest,
    SequencerRoutes, VerificationError, VerificationLevel, VerificationOutcome, parse,
};

/// Sequencer endpoint that verifies Semaphore proofs.
const VERIFY_PATH: &str = "verifySemaphoreProof";

/// Status value the sequencer reports once the identity is mined on-chain.
const MINED_STATUS: &str = "mined";

/// Conditions that are not a verdict on the proof and indicate a broken deployment, a protocol
/// drift with the sequencer or an aborted call.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No sequencer is configured for the requested combination.
    #[error("no sequencer configured for verification level `{level}` (staging: {is_staging})")]
    NoRoute {
        /// Requested verification level.
        level: VerificationLevel,
        /// Whether the app is a staging app.
        is_staging: bool,
    },
    /// The configured sequencer URL cannot be turned into an endpoint.
    #[error("invalid sequencer URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The sequencer accepted the proof but its answer could not be understood.
    #[error("unexpected response received from sequencer: {reason}")]
    UnexpectedResponse {
        /// What was wrong with the response.
        reason: String,
        /// The raw response body.
        body: String,
    },
    /// The call was cancelled before the sequencer answered.
    #[error("verification was cancelled")]
    Cancelled,
}

/// Per-request verification settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Whether the app is a staging app, which selects the staging sequencer.
    pub is_staging: bool,
    /// Credential level the proof was generated for.
    pub verification_level: VerificationLevel,
    /// Maximum accepted age of the Merkle root, in seconds.
    pub max_age: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifySemaphoreProofRequest<'a> {
    root: &'a FieldElement,
    nullifier_hash: &'a FieldElement,
    external_nullifier_hash: &'a FieldElement,
    signal_hash: &'a FieldElement,
    proof: &'a CanonicalProof,
}

impl<'a> From<&'a CanonicalParams> for VerifySemaphoreProofRequest<'a> {
    fn from(params: &'a CanonicalParams) -> Self {
        Self {
            root: &params.merkle_root,
            nullifier_hash: &params.nullifier_hash,
            external_nullifier_hash: &params.external_nullifier,
            signal_hash: &params.signal_hash,
            proof: &params.proof,
        }
    }
}

/// Builds the verification endpoint for a sequencer base URL.
///
/// `maxRootAgeSeconds` is appended when `max_age` is set to a non-zero value.
///
/// # Errors
/// Returns [`DispatchError::InvalidUrl`] if the joined URL does not parse.
pub fn endpoint(base: &Url, max_age: Option<u64>) -> Result<Url, DispatchError> {
    let mut url: Url = format!("{}/{VERIFY_PATH}", base.as_str().trim_end_matches('/')).parse()?;
    if let Some(max_age) = max_age.filter(|secs| *secs > 0) {
        url.query_pairs_mut()
            .append_pair("maxRootAgeSeconds", &max_age.to_string());
    }
    Ok(url)
}

/// Maps the body of a non-2xx sequencer response to a caller-facing error.
///
/// Known rejections get their catalogue code; anything else becomes a generic
/// `invalid_proof` that embeds the raw text.
#[must_use]
pub fn classify_rejection(raw_message: &str) -> VerificationError {
    KnownError::lookup(raw_message).map_or_else(
        || {
            VerificationError::bad_request(
                crate::ErrorCode::InvalidProof,
                format!("We couldn't verify the provided proof (error code {raw_message})."),
            )
        },
        KnownError::to_error,
    )
}

/// Reads the proof status out of a 2xx sequencer response body.
///
/// # Errors
/// Returns [`DispatchError::UnexpectedResponse`] when the body is not JSON or carries no
/// non-empty string `status`. Such a response is never coerced into a success.
pub fn classify_acceptance(body: &str) -> Result<ProofStatus, DispatchError> {
    let unexpected = |reason: &str| DispatchError::UnexpectedResponse {
        reason: reason.to_string(),
        body: body.to_string(),
    };

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|_| unexpected("response body is not JSON"))?;
    let status = value
        .get("status")
        .and_then(serde_json::Value::as_str)
        .filter(|status| !status.is_empty())
        .ok_or_else(|| unexpected("response carries no status"))?;

    if status == MINED_STATUS {
        Ok(ProofStatus::OnChain)
    } else {
        Ok(ProofStatus::Pending)
    }
}

/// HTTP client for the sequencer's proof verification endpoint.
///
/// One call is one attempt; retries are left to the caller.
#[derive(Debug, Clone)]
pub struct SequencerClient {
    http: reqwest::Client,
    routes: SequencerRoutes,
}

impl SequencerClient {
    /// Creates a client whose requests give up after `timeout`.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(routes: SequencerRoutes, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, routes })
    }

    /// Creates a client around an existing HTTP client.
    #[must_use]
    pub const fn with_http_client(http: reqwest::Client, routes: SequencerRoutes) -> Self {
        Self { http, routes }
    }

    /// The routing table this client dispatches with.
    #[must_use]
    pub const fn routes(&self) -> &SequencerRoutes {
        &self.routes
    }

    /// Sends canonical parameters to the sequencer and classifies its answer.
    ///
    /// Rejections and transport failures come back as [`VerificationOutcome::Failure`].
    ///
    /// # Errors
    /// Returns a [`DispatchError`] when no route is configured or when a successful response
    /// cannot be understood.
    pub async fn verify(
        &self,
        params: &CanonicalParams,
        options: &VerifyOptions,
    ) -> Result<VerificationOutcome, DispatchError> {
        let base = self
            .routes
            .route(options.verification_level, options.is_staging)
            .ok_or(DispatchError::NoRoute {
                level: options.verification_level,
                is_staging: options.is_staging,
            })?;
        let url = endpoint(base, options.max_age)?;

        let response = match self
            .http
            .post(url.clone())
            .json(&VerifySemaphoreProofRequest::from(params))
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(%error, %url, "sequencer request failed");
                return Ok(VerificationError::internal_error().into());
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                tracing::error!(%error, %url, %status, "failed to read sequencer response");
                return Ok(VerificationError::internal_error().into());
            }
        };

        if !status.is_success() {
            tracing::debug!(%url, %status, body = %body, "sequencer rejected proof");
            return Ok(classify_rejection(&body).into());
        }

        match classify_acceptance(&body) {
            Ok(status) => Ok(VerificationOutcome::Success { status }),
            Err(error) => {
                tracing::error!(%error, %url, body = %body, "unexpected response received from sequencer");
                Err(error)
            }
        }
    }

    /// Like [`Self::verify`], but gives up with [`DispatchError::Cancelled`] as soon as
    /// `cancel` fires. The in-flight request is dropped.
    ///
    /// # Errors
    /// See [`Self::verify`].
    pub async fn verify_with_cancellation(
        &self,
        params: &CanonicalParams,
        options: &VerifyOptions,
        cancel: &CancellationToken,
    ) -> Result<VerificationOutcome, DispatchError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::warn!("proof verification cancelled");
                Err(DispatchError::Cancelled)
            }
            outcome = self.verify(params, options) => outcome,
        }
    }

    /// Runs the full pipeline: parse the raw inputs, then verify them.
    ///
    /// Malformed inputs yield a failure outcome without contacting the sequencer.
    ///
    /// # Errors
    /// See [`Self::verify`].
    pub async fn verify_proof(
        &self,
        raw: &RawProofRequest,
        options: &VerifyOptions,
        cancel: &CancellationToken,
    ) -> Result<VerificationOutcome, DispatchError> {
        let params = match parse(raw) {
            Ok(params) => params,
            Err(error) => return Ok(error.into()),
        };
        self.verify_with_cancellation(&params, options, cancel).await
    }
}
