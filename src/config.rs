use crate::error::{Result, ResultsError};
use serde::{Deserialize, Serialize};
use std::env;

/// Voting power at which a single contribution becomes its own time-series
/// checkpoint instead of being accumulated.
pub const DEFAULT_VP_THRESHOLD: f64 = 50_000.0;

const THRESHOLD_KEY: &str = "RESULTS_VP_THRESHOLD";
const QUADRATIC_MODE_KEY: &str = "RESULTS_QUADRATIC_MODE";
const MAX_IRV_ROUNDS_KEY: &str = "RESULTS_MAX_IRV_ROUNDS";

/// Per-request output flags.
///
/// Outputs differ materially between flag combinations, so anything caching
/// processed results must key on the whole struct alongside the proposal id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOptions {
    pub with_votes: bool,
    pub with_timeseries: bool,
    pub aggregated_votes: bool,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            with_votes: true,
            with_timeseries: true,
            aggregated_votes: false,
        }
    }
}

/// How the quadratic tabulator treats voting power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuadraticMode {
    /// Tally `sqrt(votingPower)` per ballot.
    #[default]
    SquareRoot,
    /// Tally raw voting power, same as basic.
    Linear,
}

impl std::str::FromStr for QuadraticMode {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqrt" | "square-root" => Ok(QuadraticMode::SquareRoot),
            "linear" | "basic" => Ok(QuadraticMode::Linear),
            _ => Err(ResultsError::InvalidConfig {
                key: QUADRATIC_MODE_KEY,
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub vp_threshold: f64,
    pub quadratic_mode: QuadraticMode,
    /// Upper bound on IRV rounds per evaluation. `None` means one round per choice.
    pub max_irv_rounds: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            vp_threshold: DEFAULT_VP_THRESHOLD,
            quadratic_mode: QuadraticMode::default(),
            max_irv_rounds: None,
        }
    }
}

impl EngineConfig {
    /// Reads overrides from the process environment. Unset keys keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(THRESHOLD_KEY) {
            let threshold: f64 = raw.trim().parse().map_err(|_| ResultsError::InvalidConfig {
                key: THRESHOLD_KEY,
                value: raw.clone(),
            })?;
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(ResultsError::InvalidConfig {
                    key: THRESHOLD_KEY,
                    value: raw,
                });
            }
            config.vp_threshold = threshold;
        }

        if let Some(raw) = lookup(QUADRATIC_MODE_KEY) {
            config.quadratic_mode = raw.parse()?;
        }

        if let Some(raw) = lookup(MAX_IRV_ROUNDS_KEY) {
            let rounds: usize = raw.trim().parse().map_err(|_| ResultsError::InvalidConfig {
                key: MAX_IRV_ROUNDS_KEY,
                value: raw.clone(),
            })?;
            config.max_irv_rounds = Some(rounds.max(1));
        }

        Ok(config)
    }
}
