//! Marketplace configuration.
//!
//! The auditor panel size and the reward split are protocol constants; only
//! the candidate cap and the voting window are tunable.

use crate::marketplace::domain::AUDITOR_PANEL_SIZE;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by invalid marketplace configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The candidate cap would make it impossible to fill the panel.
    #[error("max_candidates must be at least {minimum}, got {actual}")]
    CandidateLimitTooSmall {
        /// Smallest permitted cap.
        minimum: usize,
        /// Configured cap.
        actual: usize,
    },

    /// The voting period is zero or does not fit a time delta.
    #[error("voting_period_secs must be positive and representable, got {0}")]
    InvalidVotingPeriod(u64),

    /// The configuration document could not be parsed.
    #[error("invalid marketplace configuration: {0}")]
    Malformed(String),
}

/// Tunable marketplace parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Maximum developer and auditor candidates per task.
    pub max_candidates: usize,
    /// Length of the dispute voting window in seconds.
    pub voting_period_secs: u64,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            max_candidates: 15,
            voting_period_secs: 7 * 24 * 60 * 60,
        }
    }
}

impl MarketplaceConfig {
    /// Sets the per-task candidate cap.
    #[must_use]
    pub const fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    /// Sets the voting window length.
    #[must_use]
    pub const fn with_voting_period_secs(mut self, voting_period_secs: u64) -> Self {
        self.voting_period_secs = voting_period_secs;
        self
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Malformed`] for unparsable input and any error
    /// reported by [`MarketplaceConfig::validate`].
    pub fn from_json(document: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(document).map_err(|err| ConfigError::Malformed(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the voting window as a time delta.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVotingPeriod`] for a zero or oversized
    /// period.
    pub fn voting_period(&self) -> Result<TimeDelta, ConfigError> {
        let invalid = ConfigError::InvalidVotingPeriod(self.voting_period_secs);
        if self.voting_period_secs == 0 {
            return Err(invalid);
        }
        let seconds = i64::try_from(self.voting_period_secs).map_err(|_| invalid.clone())?;
        TimeDelta::try_seconds(seconds).ok_or(invalid)
    }

    /// Checks that the configuration can run a marketplace.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CandidateLimitTooSmall`] when fewer candidates
    /// than panel seats are allowed and [`ConfigError::InvalidVotingPeriod`]
    /// for an unusable voting window.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_candidates < AUDITOR_PANEL_SIZE {
            return Err(ConfigError::CandidateLimitTooSmall {
                minimum: AUDITOR_PANEL_SIZE,
                actual: self.max_candidates,
            });
        }
        self.voting_period().map(|_| ())
    }
}
