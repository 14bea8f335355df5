use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ResultsError;

/// Placeholder label for a choice index that does not exist on the proposal.
pub const UNKNOWN_CHOICE: &str = "Unknown Choice";

/// Time-series key used once a hidden vote's breakdown has been collapsed.
pub const HIDDEN_CHOICE_KEY: i64 = -1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: Uuid,
    pub choices: Vec<String>,
    #[serde(default)]
    pub quorum: Option<f64>,
    #[serde(default)]
    pub metadata: ProposalMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalMetadata {
    /// Raw vote type tag. Unrecognised or missing tags are tabulated as basic.
    #[serde(default)]
    pub vote_type: Option<String>,
    #[serde(default)]
    pub quorum_choices: Vec<usize>,
    #[serde(default)]
    pub hidden_vote: bool,
    #[serde(default)]
    pub scores_state: Option<ScoresState>,
    #[serde(default)]
    pub total_delegated_vp: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoresState {
    Pending,
    Final,
    Invalid,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoteType {
    Basic,
    SingleChoice,
    Weighted,
    Approval,
    Quadratic,
    RankedChoice,
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VoteType::Basic => write!(f, "basic"),
            VoteType::SingleChoice => write!(f, "single-choice"),
            VoteType::Weighted => write!(f, "weighted"),
            VoteType::Approval => write!(f, "approval"),
            VoteType::Quadratic => write!(f, "quadratic"),
            VoteType::RankedChoice => write!(f, "ranked-choice"),
        }
    }
}

impl FromStr for VoteType {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(VoteType::Basic),
            "single-choice" => Ok(VoteType::SingleChoice),
            "weighted" => Ok(VoteType::Weighted),
            "approval" => Ok(VoteType::Approval),
            "quadratic" => Ok(VoteType::Quadratic),
            "ranked-choice" => Ok(VoteType::RankedChoice),
            other => Err(ResultsError::UnknownVoteType(other.to_string())),
        }
    }
}

/// The choice field of a stored ballot. Which shape is expected depends on the
/// proposal's vote type; normalization decides how to read each one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawChoice {
    Index(i64),
    List(Vec<i64>),
    Weights(BTreeMap<String, f64>),
}

/// One voter's ballot as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub id: Uuid,
    pub voter_address: String,
    pub voting_power: f64,
    pub choice: RawChoice,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A single resolved choice on a ballot. `choice_index` is 0-based and may point
/// outside the proposal's choices, in which case `text` is [`UNKNOWN_CHOICE`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteChoice {
    pub choice_index: i64,
    /// Share of the ballot in percent (0-100).
    pub weight: f64,
    pub text: String,
    pub color: String,
}

/// A ballot after ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedVote {
    pub id: Uuid,
    pub voter_address: String,
    pub voting_power: f64,
    pub choice: Vec<VoteChoice>,
    pub choice_text: String,
    pub created_at: DateTime<Utc>,
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub aggregated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesPoint {
    pub timestamp: DateTime<Utc>,
    /// Cumulative power per choice index at this point.
    pub values: BTreeMap<i64, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_threshold: Option<f64>,
}

/// One elimination round of an instant-runoff count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IrvRound {
    pub round: usize,
    pub tallies: BTreeMap<usize, f64>,
    pub total_votes: f64,
    pub eliminated: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedResults {
    pub proposal_id: Uuid,
    pub vote_type: VoteType,
    pub choices: Vec<String>,
    pub choice_colors: Vec<String>,
    pub final_results: BTreeMap<usize, f64>,
    pub winner: Option<usize>,
    pub total_voting_power: f64,
    pub total_delegated_vp: Option<f64>,
    pub participation: f64,
    pub quorum: Option<f64>,
    pub quorum_choices: Vec<usize>,
    pub quorum_voting_power: f64,
    pub quorum_reached: Option<bool>,
    pub hidden_vote: bool,
    pub scores_state: Option<ScoresState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votes: Option<Vec<ProcessedVote>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeseries_data: Option<Vec<TimeseriesPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rounds: Option<Vec<IrvRound>>,
}

impl ProcessedResults {
    /// Label of the winning choice, if any.
    pub fn winner_text(&self) -> Option<&str> {
        self.winner
            .and_then(|idx| self.choices.get(idx))
            .map(String::as_str)
    }
}

/// Input document accepted by the command line tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsInput {
    pub proposal: Proposal,
    #[serde(default)]
    pub votes: Vec<Ballot>,
}
