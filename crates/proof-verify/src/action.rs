use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ErrorCode, VerificationError, hashing};

/// The engine an action is verified with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Engine {
    /// Verified through this service.
    Cloud,
    /// Verified by a smart contract.
    OnChain,
    /// An engine this service does not know about.
    #[serde(other)]
    Unknown,
}

/// Lifecycle status of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActionStatus {
    /// The action accepts verifications.
    Active,
    /// The action has been switched off by its owner.
    Inactive,
    /// A status this service does not know about.
    #[serde(other)]
    Unknown,
}

/// A prior use of a nullifier hash for an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifierRecord {
    /// How many times the nullifier has been verified.
    pub uses: u64,
    /// When the nullifier was first seen.
    #[serde(default)]
    pub created_at: Option<String>,
    /// The nullifier hash.
    pub nullifier_hash: String,
}

/// An action as stored in the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Action id.
    pub id: String,
    /// Action name, as sent by the caller.
    pub action: String,
    /// Maximum number of verifications per nullifier; zero means unlimited.
    pub max_verifications: u64,
    /// Stored external nullifier; may be empty for legacy actions.
    #[serde(default)]
    pub external_nullifier: String,
    /// Lifecycle status.
    pub status: ActionStatus,
    /// Prior uses of the requested nullifier hash.
    #[serde(default)]
    pub nullifiers: Vec<NullifierRecord>,
}

/// An app as returned by the metadata store, already filtered to the requested action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    /// App id.
    pub id: String,
    /// Whether the app runs against staging sequencers.
    pub is_staging: bool,
    /// Verification engine.
    pub engine: Engine,
    /// Matching actions; empty when the action does not exist.
    #[serde(default)]
    pub actions: Vec<ActionRecord>,
}

/// The action part of [`ActionMetadata`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDetails {
    /// Action id.
    pub id: String,
    /// Action name.
    pub action: String,
    /// Stored external nullifier; may be empty.
    pub external_nullifier: String,
    /// Lifecycle status.
    pub status: ActionStatus,
    /// Maximum number of verifications per nullifier; zero means unlimited.
    pub max_verifications: u64,
    /// How many times the requested nullifier hash has already been used.
    pub nullifier_uses_for_this_hash: u64,
}

/// A resolved cloud action, snapshot for a single verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMetadata {
    /// App id.
    pub app_id: String,
    /// Whether the app runs against staging sequencers.
    pub is_staging: bool,
    /// Verification engine. Always [`Engine::Cloud`] once resolved.
    pub engine: Engine,
    /// The resolved action.
    pub action: ActionDetails,
}

impl ActionMetadata {
    /// Checks that the action still accepts a verification for this nullifier.
    ///
    /// # Errors
    /// Returns `action_inactive` for a deactivated action and `max_verifications_reached`
    /// once the nullifier has used up its allowance.
    pub fn check_usage(&self) -> Result<(), VerificationError> {
        if self.action.status == ActionStatus::Inactive {
            return Err(VerificationError::bad_request(
                ErrorCode::ActionInactive,
                "This action is inactive.",
            )
            .with_attribute("action"));
        }

        let max = self.action.max_verifications;
        if max > 0 && self.action.nullifier_uses_for_this_hash >= max {
            let message = if max == 1 {
                "This person has already verified for this action.".to_string()
            } else {
                format!(
                    "This person has already verified for this action the maximum number of times ({max})."
                )
            };
            return Err(VerificationError::bad_request(
                ErrorCode::MaxVerificationsReached,
                message,
            ));
        }

        Ok(())
    }

    /// The external nullifier to verify against: the stored one, or one derived from the app
    /// id and action name when none is stored.
    #[must_use]
    pub fn external_nullifier_or_derived(&self) -> String {
        if self.action.external_nullifier.is_empty() {
            hashing::external_nullifier(&self.app_id, &self.action.action).to_canonical_hex()
        } else {
            self.action.external_nullifier.clone()
        }
    }
}

/// Errors raised while talking to the metadata store.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// The request could not be sent or the response not read.
    #[error("metadata store request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The store answered with a non-success status.
    #[error("metadata store returned status {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },
    /// The store reported a query error.
    #[error("metadata store query failed: {0}")]
    Query(String),
}

/// Looks up apps and actions in the metadata store.
///
/// Implementations return `None` when the app is absent, inactive or archived, and an
/// [`AppRecord`] with no actions when the action does not exist under the app.
#[async_trait]
pub trait ActionResolver: Send + Sync {
    /// Fetches the app, the named action and the usage of `nullifier_hash` for it.
    async fn resolve(
        &self,
        app_id: &str,
        action: &str,
        nullifier_hash: &str,
    ) -> Result<Option<AppRecord>, ResolverError>;
}

/// Applies the lookup gates to a store result.
///
/// # Errors
/// Returns `not_found` (404) when there is no app, `invalid_action` when the action does not
/// exist and `invalid_engine` when the action is not verified in the cloud.
pub fn check_action(record: Option<AppRecord>) -> Result<ActionMetadata, VerificationError> {
    let Some(app) = record else {
        return Err(VerificationError::new(
            ErrorCode::NotFound,
            "App not found. App may be no longer active.",
            404,
        ));
    };

    let Some(action) = app.actions.into_iter().next() else {
        return Err(
            VerificationError::bad_request(ErrorCode::InvalidAction, "Action not found.")
                .with_attribute("action"),
        );
    };

    if app.engine != Engine::Cloud {
        return Err(VerificationError::bad_request(
            ErrorCode::InvalidEngine,
            "This action runs on-chain and can't be verified here.",
        )
        .with_attribute("engine"));
    }

    let nullifier_uses_for_this_hash = action.nullifiers.first().map_or(0, |n| n.uses);

    Ok(ActionMetadata {
        app_id: app.id,
        is_staging: app.is_staging,
        engine: app.engine,
        action: ActionDetails {
            id: action.id,
            action: action.action,
            external_nullifier: action.external_nullifier,
            status: action.status,
            max_verifications: action.max_verifications,
            nullifier_uses_for_this_hash,
        },
    })
}

/// Resolves an action and applies the lookup gates.
///
/// Store failures are logged and reported as `internal_error`.
///
/// # Errors
/// See [`check_action`].
pub async fn resolve_action(
    resolver: &dyn ActionResolver,
    app_id: &str,
    action: &str,
    nullifier_hash: &str,
) -> Result<ActionMetadata, VerificationError> {
    let record = resolver
        .resolve(app_id, action, nullifier_hash)
        .await
        .map_err(|error| {
            tracing::error!(%error, app_id, action, "failed to fetch action from metadata store");
            VerificationError::internal_error()
        })?;
    check_action(record)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct StaticResolver(Option<AppRecord>);

    #[async_trait]
    impl ActionResolver for StaticResolver {
        async fn resolve(
            &self,
            _app_id: &str,
            _action: &str,
            _nullifier_hash: &str,
        ) -> Result<Option<AppRecord>, ResolverError> {
            Ok(self.0.clone())
        }
    }

    struct FailingResolver;

    #[async_trait]
    impl ActionResolver for FailingResolver {
        async fn resolve(
            &self,
            _app_id: &str,
            _action: &str,
            _nullifier_hash: &str,
        ) -> Result<Option<AppRecord>, ResolverError> {
            Err(ResolverError::Query("boom".to_string()))
        }
    }

    fn app(engine: Engine, actions: Vec<ActionRecord>) -> AppRecord {
        AppRecord {
            id: "app_staging_123".to_string(),
            is_staging: true,
            engine,
            actions,
        }
    }

    fn action(max_verifications: u64, uses: Option<u64>) -> ActionRecord {
        ActionRecord {
            id: "action_1".to_string(),
            action: "login".to_string(),
            max_verifications,
            external_nullifier: String::new(),
            status: ActionStatus::Active,
            nullifiers: uses
                .map(|uses| NullifierRecord {
                    uses,
                    created_at: None,
                    nullifier_hash: "0x01".to_string(),
                })
                .into_iter()
                .collect(),
        }
    }

    #[test]
    fn missing_app_is_not_found() {
        let error = check_action(None).unwrap_err();
        assert_eq!(error.code, ErrorCode::NotFound);
        assert_eq!(error.status_code, 404);
        assert!(error.attribute.is_none());
    }

    #[test]
    fn missing_action_is_invalid_action() {
        let error = check_action(Some(app(Engine::Cloud, vec![]))).unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidAction);
        assert_eq!(error.status_code, 400);
        assert_eq!(error.attribute.as_deref(), Some("action"));
    }

    #[test]
    fn on_chain_engine_is_rejected() {
        let error = check_action(Some(app(Engine::OnChain, vec![action(0, None)]))).unwrap_err();
        assert_eq!(error.code, ErrorCode::InvalidEngine);
        assert_eq!(error.attribute.as_deref(), Some("engine"));
    }

    #[test]
    fn cloud_action_resolves_with_usage() {
        let metadata = check_action(Some(app(Engine::Cloud, vec![action(2, Some(1))]))).unwrap();
        assert_eq!(metadata.app_id, "app_staging_123");
        assert!(metadata.is_staging);
        assert_eq!(metadata.action.nullifier_uses_for_this_hash, 1);
        assert!(metadata.check_usage().is_ok());
    }

    #[test]
    fn exhausted_nullifier_is_rejected() {
        let metadata = check_action(Some(app(Engine::Cloud, vec![action(1, Some(1))]))).unwrap();
        let error = metadata.check_usage().unwrap_err();
        assert_eq!(error.code, ErrorCode::MaxVerificationsReached);
        assert_eq!(
            error.message,
            "This person has already verified for this action."
        );

        let metadata = check_action(Some(app(Engine::Cloud, vec![action(3, Some(5))]))).unwrap();
        let error = metadata.check_usage().unwrap_err();
        assert!(error.message.contains("maximum number of times (3)"));
    }

    #[test]
    fn zero_max_verifications_is_unlimited() {
        let metadata =
            check_action(Some(app(Engine::Cloud, vec![action(0, Some(1_000))]))).unwrap();
        assert!(metadata.check_usage().is_ok());
    }

    #[test]
    fn inactive_action_is_rejected() {
        let mut inactive = action(0, None);
        inactive.status = ActionStatus::Inactive;
        let metadata = check_action(Some(app(Engine::Cloud, vec![inactive]))).unwrap();
        assert_eq!(
            metadata.check_usage().unwrap_err().code,
            ErrorCode::ActionInactive
        );
    }

    #[test]
    fn external_nullifier_prefers_stored_value() {
        let mut stored = action(0, None);
        stored.external_nullifier = format!("0x{}", "11".repeat(32));
        let metadata = check_action(Some(app(Engine::Cloud, vec![stored]))).unwrap();
        assert_eq!(metadata.external_nullifier_or_derived(), format!("0x{}", "11".repeat(32)));

        let metadata = check_action(Some(app(Engine::Cloud, vec![action(0, None)]))).unwrap();
        assert_eq!(
            metadata.external_nullifier_or_derived(),
            "0x005137451151ed3de3dac68fb855ccf7aa0d32137da39a2acb7ca3a17d967ae2"
        );
    }

    #[test]
    fn parses_store_payload() {
        let record: AppRecord = serde_json::from_value(json!({
            "id": "app_123",
            "is_staging": false,
            "engine": "on-chain",
            "actions": [{
                "id": "action_1",
                "action": "vote",
                "max_verifications": 1,
                "external_nullifier": "",
                "status": "active",
                "nullifiers": [{ "uses": 1, "created_at": "2024-01-01T00:00:00Z", "nullifier_hash": "0x01" }]
            }]
        }))
        .unwrap();
        assert_eq!(record.engine, Engine::OnChain);
        assert_eq!(record.actions[0].nullifiers[0].uses, 1);

        let record: AppRecord =
            serde_json::from_value(json!({ "id": "app_1", "is_staging": true, "engine": "edge" }))
                .unwrap();
        assert_eq!(record.engine, Engine::Unknown);
        assert!(record.actions.is_empty());
    }

    #[tokio::test]
    async fn resolve_action_applies_gates() {
        let resolver = StaticResolver(Some(app(Engine::Cloud, vec![action(0, None)])));
        let metadata = resolve_action(&resolver, "app_staging_123", "login", "0x01")
            .await
            .unwrap();
        assert_eq!(metadata.action.action, "login");

        let error = resolve_action(&StaticResolver(None), "app_x", "login", "0x01")
            .await
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn store_failure_is_internal_error() {
        let error = resolve_action(&FailingResolver, "app_x", "login", "0x01")
            .await
            .unwrap_err();
        assert_eq!(error.code, ErrorCode::InternalError);
        assert_eq!(error.status_code, 500);
    }
}
