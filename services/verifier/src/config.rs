use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use url::Url;
use world_id_proof_verify::{SequencerRoutes, VerificationLevel};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one sequencer URL must be configured")]
    NoSequencers,
    #[error("{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct VerifierConfig {
    /// The address and port to listen for HTTP requests
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8080")]
    pub listen_addr: SocketAddr,

    /// HTTP request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Timeout for a single sequencer call, in seconds
    #[arg(long, env = "SEQUENCER_TIMEOUT_SECS", default_value = "10")]
    pub sequencer_timeout_secs: u64,

    /// Sequencer for orb credentials of production apps
    #[arg(long, env = "ORB_SEQUENCER_URL")]
    pub orb_sequencer_url: Option<Url>,

    /// Sequencer for orb credentials of staging apps
    #[arg(long, env = "ORB_SEQUENCER_STAGING_URL")]
    pub orb_sequencer_staging_url: Option<Url>,

    /// Sequencer for device credentials of production apps
    #[arg(long, env = "PHONE_SEQUENCER_URL")]
    pub phone_sequencer_url: Option<Url>,

    /// Sequencer for device credentials of staging apps
    #[arg(long, env = "PHONE_SEQUENCER_STAGING_URL")]
    pub phone_sequencer_staging_url: Option<Url>,

    /// GraphQL endpoint of the app metadata store
    #[arg(long, env = "METADATA_GRAPHQL_URL")]
    pub metadata_graphql_url: Url,

    /// Bearer token for the metadata store
    #[arg(long, env = "METADATA_GRAPHQL_TOKEN")]
    pub metadata_graphql_token: Option<String>,

    /// Timeout for metadata store queries, in seconds
    #[arg(long, env = "METADATA_TIMEOUT_SECS", default_value = "10")]
    pub metadata_timeout_secs: u64,
}

impl VerifierConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sequencer_routes().is_empty() {
            return Err(ConfigError::NoSequencers);
        }

        for (name, secs) in [
            ("--request-timeout-secs", self.request_timeout_secs),
            ("--sequencer-timeout-secs", self.sequencer_timeout_secs),
            ("--metadata-timeout-secs", self.metadata_timeout_secs),
        ] {
            if secs == 0 {
                return Err(ConfigError::ZeroTimeout(name));
            }
        }

        if self.listen_addr.port() != 8080 {
            tracing::warn!(
                "Verifier is not running on port 8080, this may not work as expected when running dockerized (image exposes port 8080)"
            );
        }

        Ok(())
    }

    /// Builds the routing table from whichever sequencer URLs are set.
    pub fn sequencer_routes(&self) -> SequencerRoutes {
        [
            (VerificationLevel::Orb, false, &self.orb_sequencer_url),
            (VerificationLevel::Orb, true, &self.orb_sequencer_staging_url),
            (VerificationLevel::Device, false, &self.phone_sequencer_url),
            (VerificationLevel::Device, true, &self.phone_sequencer_staging_url),
        ]
        .into_iter()
        .fold(SequencerRoutes::new(), |routes, (level, is_staging, url)| match url {
            Some(url) => routes.with_route(level, is_staging, url.clone()),
            None => routes,
        })
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn sequencer_timeout(&self) -> Duration {
        Duration::from_secs(self.sequencer_timeout_secs)
    }

    pub const fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }
}
