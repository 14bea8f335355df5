use crate::models::ProcessedVote;
use crate::voting::timeseries::{Contribution, choice_series};
use crate::voting::{Tabulation, TabulationContext, leading_choice};

/// Weighted tabulation: each ballot's power is split across its choices by
/// their percentage weights.
pub fn calculate_results(ctx: &TabulationContext<'_>, votes: &[ProcessedVote]) -> Tabulation {
    let mut final_results = ctx.empty_results();
    let mut contributions = Vec::with_capacity(votes.len());

    for vote in votes {
        for (choice, power) in split_power(vote) {
            let Some(choice) = ctx.labels.position(choice) else {
                continue;
            };
            *final_results.entry(choice).or_insert(0.0) += power;
            // Each fragment feeds the time series on its own
            contributions.push(Contribution {
                timestamp: vote.created_at,
                key: choice,
                power,
            });
        }
    }

    let timeseries = ctx
        .with_timeseries
        .then(|| choice_series(ctx.config.vp_threshold, ctx.choice_count(), contributions));
    let winner = leading_choice(&final_results);

    Tabulation {
        final_results,
        timeseries,
        winner,
        rounds: None,
    }
}

/// `(choice_index, power)` fragments of one ballot. Fragments sum to the
/// ballot's power unless every weight was zero.
pub fn split_power(vote: &ProcessedVote) -> impl Iterator<Item = (i64, f64)> + '_ {
    vote.choice
        .iter()
        .map(move |c| (c.choice_index, vote.voting_power * c.weight / 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::models::{Ballot, RawChoice, VoteType};
    use crate::voting::normalize::{ChoiceLabels, normalize_ballot};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn weighted_vote(labels: ChoiceLabels<'_>, weights: &[(&str, f64)], power: f64, secs: i64) -> ProcessedVote {
        let map: BTreeMap<String, f64> = weights.iter().map(|(k, w)| (k.to_string(), *w)).collect();
        let ballot = Ballot {
            id: Uuid::new_v4(),
            voter_address: format!("0x{}", secs),
            voting_power: power,
            choice: RawChoice::Weights(map),
            created_at: Utc.timestamp_opt(secs, 0).unwrap(),
            reason: None,
        };
        normalize_ballot(VoteType::Weighted, labels, &ballot)
    }

    fn setup() -> (Vec<String>, Vec<String>) {
        let choices = vec!["Alpha".to_string(), "Beta".to_string(), "Gamma".to_string()];
        let colors = vec![String::new(); 3];
        (choices, colors)
    }

    #[test]
    fn splits_by_weight() {
        let (choices, colors) = setup();
        let labels = ChoiceLabels::new(&choices, &colors);
        let config = EngineConfig::default();
        let ctx = TabulationContext {
            labels,
            config: &config,
            with_timeseries: true,
        };
        let votes = vec![
            weighted_vote(labels, &[("1", 1.0), ("2", 3.0)], 200.0, 1),
            weighted_vote(labels, &[("3", 50.0)], 10.0, 2),
        ];
        let tab = calculate_results(&ctx, &votes);
        assert_eq!(tab.final_results, BTreeMap::from([(0, 50.0), (1, 150.0), (2, 10.0)]));
        assert_eq!(tab.winner, Some(1));
        assert_eq!(votes[0].choice_text, "Alpha (25%), Beta (75%)");
    }

    #[test]
    fn fragments_feed_series_independently() {
        let (choices, colors) = setup();
        let labels = ChoiceLabels::new(&choices, &colors);
        let config = EngineConfig {
            vp_threshold: 100.0,
            ..Default::default()
        };
        let ctx = TabulationContext {
            labels,
            config: &config,
            with_timeseries: true,
        };
        // 300 power split 50/50: two fragments of 150, each a spike.
        let votes = vec![weighted_vote(labels, &[("1", 1.0), ("2", 1.0)], 300.0, 1)];
        let series = calculate_results(&ctx, &votes).timeseries.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].values.get(&0), Some(&150.0));
        assert_eq!(series[0].values.get(&1), Some(&0.0));
        assert_eq!(series[1].values.get(&1), Some(&150.0));
    }

    #[test]
    fn zero_weights_contribute_nothing() {
        let (choices, colors) = setup();
        let labels = ChoiceLabels::new(&choices, &colors);
        let config = EngineConfig::default();
        let ctx = TabulationContext {
            labels,
            config: &config,
            with_timeseries: false,
        };
        let votes = vec![weighted_vote(labels, &[("1", 0.0)], 100.0, 1)];
        let tab = calculate_results(&ctx, &votes);
        assert!(tab.final_results.values().all(|p| p.is_finite() && *p == 0.0));
    }

    proptest! {
        #[test]
        fn fragments_sum_to_ballot_power(
            weights in prop::collection::vec(0.1f64..1000.0, 1..3),
            power in 0.0f64..10_000_000.0
        ) {
            let (choices, colors) = setup();
            let labels = ChoiceLabels::new(&choices, &colors);
            let keys = ["1", "2", "3"];
            let entries: Vec<(&str, f64)> = keys.iter().copied().zip(weights.iter().copied()).collect();
            let vote = weighted_vote(labels, &entries, power, 1);
            let sum: f64 = split_power(&vote).map(|(_, p)| p).sum();
            prop_assert!((sum - power).abs() <= 1e-9 * power.max(1.0));
        }
    }
}
