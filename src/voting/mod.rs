pub mod aggregate;
pub mod approval;
pub mod basic;
pub mod color;
pub mod normalize;
pub mod quadratic;
pub mod ranked;
pub mod redact;
pub mod timeseries;
pub mod weighted;

use log::{debug, warn};
use std::collections::BTreeMap;

use crate::config::{EngineConfig, ProcessOptions};
use crate::models::{Ballot, IrvRound, ProcessedResults, Proposal, TimeseriesPoint, VoteType};
use normalize::ChoiceLabels;

/// What a tabulator produces for one proposal.
#[derive(Debug, Clone, PartialEq)]
pub struct Tabulation {
    /// Power per choice, with an entry for every choice of the proposal.
    pub final_results: BTreeMap<usize, f64>,
    pub timeseries: Option<Vec<TimeseriesPoint>>,
    pub winner: Option<usize>,
    pub rounds: Option<Vec<IrvRound>>,
}

/// Everything a tabulator needs besides the votes themselves.
#[derive(Debug, Clone, Copy)]
pub struct TabulationContext<'a> {
    pub labels: ChoiceLabels<'a>,
    pub config: &'a EngineConfig,
    pub with_timeseries: bool,
}

impl TabulationContext<'_> {
    pub fn choice_count(&self) -> usize {
        self.labels.len()
    }

    pub fn empty_results(&self) -> BTreeMap<usize, f64> {
        (0..self.choice_count()).map(|i| (i, 0.0)).collect()
    }
}

/// Choice with the most power; the lowest index wins a tie. `None` when nothing
/// was cast.
pub fn leading_choice(results: &BTreeMap<usize, f64>) -> Option<usize> {
    results
        .iter()
        .filter(|(_, power)| **power > 0.0)
        .fold(None, |best: Option<(usize, f64)>, (&choice, &power)| match best {
            Some((_, best_power)) if best_power >= power => best,
            _ => Some((choice, power)),
        })
        .map(|(choice, _)| choice)
}

/// Resolves the proposal's declared vote type, falling back to basic.
pub fn resolve_vote_type(proposal: &Proposal) -> VoteType {
    match proposal.metadata.vote_type.as_deref() {
        Some(tag) => tag.parse::<VoteType>().unwrap_or_else(|e| {
            warn!("Proposal {}: {}, tabulating as basic", proposal.id, e);
            VoteType::Basic
        }),
        None => VoteType::Basic,
    }
}

/// Tabulates `ballots` for `proposal` using the default engine configuration.
pub fn process_results(
    proposal: &Proposal,
    ballots: &[Ballot],
    options: ProcessOptions,
) -> ProcessedResults {
    process_results_with(proposal, ballots, options, &EngineConfig::default())
}

pub fn process_results_with(
    proposal: &Proposal,
    ballots: &[Ballot],
    options: ProcessOptions,
    config: &EngineConfig,
) -> ProcessedResults {
    let vote_type = resolve_vote_type(proposal);
    let choice_colors = color::choice_colors(&proposal.choices);
    let labels = ChoiceLabels::new(&proposal.choices, &choice_colors);

    let votes = normalize::normalize_votes(vote_type, labels, ballots);
    debug!(
        "Processing {} votes for proposal {} as {}",
        votes.len(),
        proposal.id,
        vote_type
    );

    let ctx = TabulationContext {
        labels,
        config,
        with_timeseries: options.with_timeseries,
    };

    let tabulation = match vote_type {
        VoteType::Basic | VoteType::SingleChoice => basic::calculate_results(&ctx, &votes),
        VoteType::Weighted => weighted::calculate_results(&ctx, &votes),
        VoteType::Approval => approval::calculate_results(&ctx, &votes),
        VoteType::Quadratic => quadratic::calculate_results(&ctx, &votes),
        VoteType::RankedChoice => ranked::calculate_results(&ctx, &votes),
    };

    let total_voting_power: f64 = votes.iter().map(|v| v.voting_power).sum();
    let total_delegated_vp = proposal.metadata.total_delegated_vp;
    let participation = match total_delegated_vp {
        Some(total) if total > 0.0 && total.is_finite() => total_voting_power / total * 100.0,
        _ => 0.0,
    };

    let quorum_choices = proposal.metadata.quorum_choices.clone();
    let quorum_voting_power: f64 = if quorum_choices.is_empty() {
        tabulation.final_results.values().sum()
    } else {
        quorum_choices
            .iter()
            .filter_map(|choice| tabulation.final_results.get(choice))
            .sum()
    };
    let quorum_reached = proposal.quorum.map(|quorum| quorum_voting_power >= quorum);

    let votes = if options.with_votes {
        if options.aggregated_votes {
            Some(aggregate::aggregate_votes(votes, config.vp_threshold))
        } else {
            Some(votes)
        }
    } else {
        None
    };

    let mut results = ProcessedResults {
        proposal_id: proposal.id,
        vote_type,
        choices: proposal.choices.clone(),
        choice_colors,
        final_results: tabulation.final_results,
        winner: tabulation.winner,
        total_voting_power,
        total_delegated_vp,
        participation,
        quorum: proposal.quorum,
        quorum_choices,
        quorum_voting_power,
        quorum_reached,
        hidden_vote: proposal.metadata.hidden_vote,
        scores_state: proposal.metadata.scores_state,
        votes,
        timeseries_data: tabulation.timeseries,
        rounds: tabulation.rounds,
    };

    if redact::is_sealed(&results) {
        redact::redact_timeseries(&mut results);
    }

    results
}
