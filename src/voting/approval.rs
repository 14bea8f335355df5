use crate::models::ProcessedVote;
use crate::voting::timeseries::{Contribution, choice_series};
use crate::voting::{Tabulation, TabulationContext, leading_choice};

/// Approval tabulation: every approved choice receives the ballot's full power,
/// so totals across choices can exceed the power actually cast.
pub fn calculate_results(ctx: &TabulationContext<'_>, votes: &[ProcessedVote]) -> Tabulation {
    let mut final_results = ctx.empty_results();
    let mut contributions = Vec::new();

    for vote in votes {
        let approved = vote
            .choice
            .iter()
            .filter_map(|c| ctx.labels.position(c.choice_index));

        for choice in approved {
            *final_results.entry(choice).or_insert(0.0) += vote.voting_power;
            contributions.push(Contribution {
                timestamp: vote.created_at,
                key: choice,
                power: vote.voting_power,
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
