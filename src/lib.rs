//! Vote tabulation for governance proposals.
//!
//! [`process_results`] takes a proposal and its ballots and produces final
//! per-choice totals, a winner, an optional chronological time series and the
//! normalized vote list, for basic, weighted, approval, quadratic and
//! ranked-choice proposals.

pub mod config;
pub mod error;
pub mod models;
pub mod voting;

pub use config::{EngineConfig, ProcessOptions, QuadraticMode};
pub use error::{Result, ResultsError};
pub use models::{Ballot, ProcessedResults, Proposal, VoteType};
pub use voting::color::color_for_choice;
pub use voting::{process_results, process_results_with};
