use crate::models::ProcessedVote;
use crate::voting::timeseries::{Contribution, choice_series};
use crate::voting::{Tabulation, TabulationContext, leading_choice};

/// Single-choice tabulation: each ballot's full power goes to its one choice.
pub fn calculate_results(ctx: &TabulationContext<'_>, votes: &[ProcessedVote]) -> Tabulation {
    tally_with(ctx, votes, |power| power)
}

/// Single-choice tabulation with `effective` applied to each ballot's power
/// before it is counted.
pub fn tally_with<F>(ctx: &TabulationContext<'_>, votes: &[ProcessedVote], effective: F) -> Tabulation
where
    F: Fn(f64) -> f64,
{
    let mut final_results = ctx.empty_results();
    let mut contributions = Vec::with_capacity(votes.len());

    for vote in votes {
        // Unknown choices are shown on the vote but never counted
        let Some(choice) = vote
            .choice
            .first()
            .and_then(|c| ctx.labels.position(c.choice_index))
        else {
            continue;
        };

        let power = effective(vote.voting_power);
        *final_results.entry(choice).or_insert(0.0) += power;
        contributions.push(Contribution {
            timestamp: vote.created_at,
            key: choice,
            power,
        });
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
