use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::models::{ProcessedVote, VoteChoice};

pub const AGGREGATED_REASON: &str = "Aggregated votes";
pub const AGGREGATED_VOTER: &str = "aggregated";

/// Small votes cast between two large ones, for one primary choice.
struct PendingGroup {
    seed: Uuid,
    choice: Option<VoteChoice>,
    voting_power: f64,
    last_at: DateTime<Utc>,
}

impl PendingGroup {
    fn into_vote(self, key: i64) -> ProcessedVote {
        let name = format!("{}:{}", self.seed, key);
        let choice: Vec<VoteChoice> = self
            .choice
            .map(|c| VoteChoice { weight: 100.0, ..c })
            .into_iter()
            .collect();
        let choice_text = choice.first().map(|c| c.text.clone()).unwrap_or_default();

        ProcessedVote {
            id: Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()),
            voter_address: AGGREGATED_VOTER.to_string(),
            voting_power: self.voting_power,
            choice,
            choice_text,
            created_at: self.last_at,
            reason: Some(AGGREGATED_REASON.to_string()),
            aggregated: true,
        }
    }
}

/// Collapses runs of votes below `threshold` into one synthetic vote per
/// primary choice. Votes at or above the threshold pass through unchanged and
/// close the run before them. Input must be in chronological order.
pub fn aggregate_votes(votes: Vec<ProcessedVote>, threshold: f64) -> Vec<ProcessedVote> {
    let mut out = Vec::with_capacity(votes.len());
    let mut pending: BTreeMap<i64, PendingGroup> = BTreeMap::new();

    for vote in votes {
        if vote.voting_power >= threshold {
            flush(&mut pending, &mut out);
            out.push(vote);
            continue;
        }

        let primary = vote.choice.first().cloned();
        let key = primary.as_ref().map_or(-1, |c| c.choice_index);
        let group = pending.entry(key).or_insert_with(|| PendingGroup {
            seed: vote.id,
            choice: primary,
            voting_power: 0.0,
            last_at: vote.created_at,
        });
        group.voting_power += vote.voting_power;
        group.last_at = vote.created_at;
    }

    flush(&mut pending, &mut out);
    out
}

fn flush(pending: &mut BTreeMap<i64, PendingGroup>, out: &mut Vec<ProcessedVote>) {
    let groups = std::mem::take(pending);
    out.extend(groups.into_iter().map(|(key, group)| group.into_vote(key)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn vote(choice: i64, power: f64, secs: i64) -> ProcessedVote {
        ProcessedVote {
            id: Uuid::new_v4(),
            voter_address: format!("0x{}", secs),
            voting_power: power,
            choice: vec![VoteChoice {
                choice_index: choice,
                weight: 100.0,
                text: format!("Choice {}", choice),
                color: "#000000".into(),
            }],
            choice_text: format!("Choice {}", choice),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            reason: Some("because".into()),
            aggregated: false,
        }
    }

    #[test]
    fn groups_small_votes_between_large_ones() {
        let votes = vec![
            vote(0, 10.0, 1),
            vote(1, 5.0, 2),
            vote(0, 15.0, 3),
            vote(1, 500.0, 4),
            vote(0, 1.0, 5),
        ];
        let big_id = votes[3].id;
        let out = aggregate_votes(votes, 100.0);

        assert_eq!(out.len(), 4);
        assert!(out[0].aggregated);
        assert_eq!(out[0].choice[0].choice_index, 0);
        assert_eq!(out[0].voting_power, 25.0);
        assert_eq!(out[0].created_at, Utc.timestamp_opt(3, 0).unwrap());
        assert_eq!(out[0].reason.as_deref(), Some(AGGREGATED_REASON));
        assert_eq!(out[1].voting_power, 5.0);
        assert_eq!(out[1].choice_text, "Choice 1");

        assert_eq!(out[2].id, big_id);
        assert!(!out[2].aggregated);
        assert_eq!(out[2].reason.as_deref(), Some("because"));

        assert!(out[3].aggregated);
        assert_eq!(out[3].voting_power, 1.0);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let votes = vec![vote(0, 10.0, 1), vote(0, 20.0, 2)];
        let first = aggregate_votes(votes.clone(), 100.0);
        let second = aggregate_votes(votes, 100.0);
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn large_votes_only_pass_through() {
        let votes = vec![vote(0, 200.0, 1), vote(1, 300.0, 2)];
        let out = aggregate_votes(votes.clone(), 100.0);
        assert_eq!(out, votes);
    }
}
