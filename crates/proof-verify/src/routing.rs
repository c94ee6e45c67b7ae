use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// The credential level a proof was generated for. Each level has its own sequencer.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VerificationLevel {
    /// Orb-verified identities.
    #[default]
    Orb,
    /// Device-verified identities.
    Device,
}

/// Read-only table mapping `(verification level, staging)` to a sequencer base URL.
///
/// Built once at startup and shared across requests.
#[derive(Debug, Clone, Default)]
pub struct SequencerRoutes {
    routes: HashMap<(VerificationLevel, bool), Url>,
}

impl SequencerRoutes {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a route.
    #[must_use]
    pub fn with_route(mut self, level: VerificationLevel, is_staging: bool, url: Url) -> Self {
        self.routes.insert((level, is_staging), url);
        self
    }

    /// Returns the sequencer base URL for the combination, if configured.
    #[must_use]
    pub fn route(&self, level: VerificationLevel, is_staging: bool) -> Option<&Url> {
        self.routes.get(&(level, is_staging))
    }

    /// Number of configured routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` when no route is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
