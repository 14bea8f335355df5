//! Ballot ingestion.
//!
//! Stored ballots encode their choice as a bare index, an index list or a weight
//! map, and the indexing base differs per vote type. Everything downstream works
//! on [`ProcessedVote`] whose `choice` is a list of 0-based [`VoteChoice`]s with
//! percentage weights, so the tabulators never branch on the raw shape.

use log::warn;

use crate::models::{Ballot, ProcessedVote, RawChoice, UNKNOWN_CHOICE, VoteChoice, VoteType};
use crate::voting::color::color_for_choice;

const FULL_WEIGHT: f64 = 100.0;

/// Choice labels and their colors, indexed together.
#[derive(Debug, Clone, Copy)]
pub struct ChoiceLabels<'a> {
    pub choices: &'a [String],
    pub colors: &'a [String],
}

impl<'a> ChoiceLabels<'a> {
    pub fn new(choices: &'a [String], colors: &'a [String]) -> Self {
        Self { choices, colors }
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// In-range 0-based index for a raw choice index.
    pub fn position(&self, index: i64) -> Option<usize> {
        usize::try_from(index).ok().filter(|&i| i < self.choices.len())
    }

    pub fn text(&self, index: i64) -> &'a str {
        self.position(index)
            .map(|i| self.choices[i].as_str())
            .unwrap_or(UNKNOWN_CHOICE)
    }

    fn choice(&self, index: i64, weight: f64) -> VoteChoice {
        let color = match self.position(index).and_then(|i| self.colors.get(i)) {
            Some(c) => c.clone(),
            None => color_for_choice(Some(UNKNOWN_CHOICE)).to_string(),
        };
        VoteChoice {
            choice_index: index,
            weight,
            text: self.text(index).to_string(),
            color,
        }
    }
}

/// Normalizes every ballot and returns them in ascending `created_at` order.
/// Ballots sharing a timestamp keep their input order.
pub fn normalize_votes(
    vote_type: VoteType,
    labels: ChoiceLabels<'_>,
    ballots: &[Ballot],
) -> Vec<ProcessedVote> {
    let mut votes: Vec<ProcessedVote> = ballots
        .iter()
        .map(|ballot| normalize_ballot(vote_type, labels, ballot))
        .collect();
    votes.sort_by_key(|v| v.created_at);
    votes
}

pub fn normalize_ballot(
    vote_type: VoteType,
    labels: ChoiceLabels<'_>,
    ballot: &Ballot,
) -> ProcessedVote {
    let (choice, choice_text) = match vote_type {
        VoteType::Basic | VoteType::SingleChoice | VoteType::Quadratic => {
            single_choice(labels, &ballot.choice)
        }
        VoteType::Weighted => weighted_choice(labels, &ballot.choice),
        VoteType::Approval => listed_choice(labels, &ballot.choice),
        VoteType::RankedChoice => ranked_choice(labels, &ballot.choice),
    };

    ProcessedVote {
        id: ballot.id,
        voter_address: ballot.voter_address.clone(),
        voting_power: sanitize_power(ballot),
        choice,
        choice_text,
        created_at: ballot.created_at,
        reason: ballot.reason.clone(),
        aggregated: false,
    }
}

fn sanitize_power(ballot: &Ballot) -> f64 {
    let power = ballot.voting_power;
    if power.is_finite() && power >= 0.0 {
        power
    } else {
        warn!(
            "Ballot {} carries invalid voting power {}, counting it as 0",
            ballot.id, power
        );
        0.0
    }
}

// Basic ballots are stored 0-based; other shapes fall back to their first or
// heaviest entry.
fn single_choice(labels: ChoiceLabels<'_>, raw: &RawChoice) -> (Vec<VoteChoice>, String) {
    let index = match raw {
        RawChoice::Index(i) => Some(*i),
        RawChoice::List(list) => list.first().copied(),
        RawChoice::Weights(map) => parse_weights(map)
            .into_iter()
            .fold(None, |best: Option<(i64, f64)>, (idx, w)| match best {
                Some((_, bw)) if bw >= w => best,
                _ => Some((idx, w)),
            })
            .map(|(idx, _)| idx),
    };

    match index {
        Some(idx) => {
            let choice = labels.choice(idx, FULL_WEIGHT);
            let text = choice.text.clone();
            (vec![choice], text)
        }
        None => (Vec::new(), UNKNOWN_CHOICE.to_string()),
    }
}

fn weighted_choice(labels: ChoiceLabels<'_>, raw: &RawChoice) -> (Vec<VoteChoice>, String) {
    let entries: Vec<(i64, f64)> = match raw {
        RawChoice::Weights(map) => parse_weights(map),
        RawChoice::Index(i) => vec![(zero_based(*i), 1.0)],
        RawChoice::List(list) => dedup(list.iter().copied().map(zero_based))
            .into_iter()
            .map(|idx| (idx, 1.0))
            .collect(),
    };

    let total: f64 = entries.iter().map(|(_, w)| w).sum();
    let choices: Vec<VoteChoice> = entries
        .into_iter()
        .map(|(idx, w)| {
            let percent = if total > 0.0 { w / total * FULL_WEIGHT } else { 0.0 };
            labels.choice(idx, percent)
        })
        .collect();

    let text = choices
        .iter()
        .map(|c| format!("{} ({}%)", c.text, c.weight.round() as i64))
        .collect::<Vec<_>>()
        .join(", ");

    (choices, text)
}

fn listed_choice(labels: ChoiceLabels<'_>, raw: &RawChoice) -> (Vec<VoteChoice>, String) {
    let indices = match raw {
        RawChoice::Index(i) => vec![zero_based(*i)],
        RawChoice::List(list) => dedup(list.iter().copied().map(zero_based)),
        RawChoice::Weights(map) => parse_weights(map)
            .into_iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(idx, _)| idx)
            .collect(),
    };
    joined(labels, indices)
}

fn ranked_choice(labels: ChoiceLabels<'_>, raw: &RawChoice) -> (Vec<VoteChoice>, String) {
    let indices = match raw {
        RawChoice::Index(i) => vec![zero_based(*i)],
        RawChoice::List(list) => dedup(list.iter().copied().map(zero_based)),
        RawChoice::Weights(map) => {
            // Heavier weight ranks higher.
            let mut entries = parse_weights(map);
            entries.sort_by(|a, b| b.1.total_cmp(&a.1));
            entries.into_iter().map(|(idx, _)| idx).collect()
        }
    };
    joined(labels, indices)
}

fn joined(labels: ChoiceLabels<'_>, indices: Vec<i64>) -> (Vec<VoteChoice>, String) {
    let choices: Vec<VoteChoice> = indices
        .into_iter()
        .map(|idx| labels.choice(idx, FULL_WEIGHT))
        .collect();
    let text = choices
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    (choices, text)
}

/// Weight map entries as `(0-based index, weight)`, sorted by index. Keys that
/// are not integers map to -1; negative or non-finite weights count as 0.
fn parse_weights(map: &std::collections::BTreeMap<String, f64>) -> Vec<(i64, f64)> {
    let mut entries: Vec<(i64, f64)> = map
        .iter()
        .map(|(key, weight)| {
            let idx = key.trim().parse::<i64>().map(zero_based).unwrap_or(-1);
            let weight = if weight.is_finite() && *weight > 0.0 { *weight } else { 0.0 };
            (idx, weight)
        })
        .collect();
    entries.sort_by_key(|(idx, _)| *idx);
    entries
}

// Stored 1-based index to 0-based. An index with no predecessor becomes -1.
fn zero_based(index: i64) -> i64 {
    index.checked_sub(1).unwrap_or(-1)
}

fn dedup(indices: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut out = Vec::new();
    for idx in indices {
        if !out.contains(&idx) {
            out.push(idx);
        }
    }
    out
}
