//! Instant-runoff tabulation.
//!
//! Each round credits every ballot to its highest-ranked choice still in the
//! running. A choice holding more than half of the credited power wins;
//! otherwise the weakest choice is eliminated and the count is repeated.
//! The count is re-run on growing prefixes of the chronological ballot stream
//! to chart how the runoff evolved.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{IrvRound, ProcessedVote, TimeseriesPoint};
use crate::voting::timeseries::Accumulator;
use crate::voting::{Tabulation, TabulationContext};

/// A ballot reduced to what the runoff needs: in-range preferences, most
/// preferred first.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedBallot {
    pub preferences: Vec<usize>,
    pub power: f64,
    pub created_at: DateTime<Utc>,
}

impl RankedBallot {
    pub fn from_vote(vote: &ProcessedVote, choice_count: usize) -> Self {
        let preferences = vote
            .choice
            .iter()
            .filter_map(|c| usize::try_from(c.choice_index).ok())
            .filter(|&idx| idx < choice_count)
            .collect();
        Self {
            preferences,
            power: vote.voting_power,
            created_at: vote.created_at,
        }
    }

    fn top_preference(&self, eliminated: &BTreeSet<usize>) -> Option<usize> {
        self.preferences
            .iter()
            .copied()
            .find(|choice| !eliminated.contains(choice))
    }
}

/// State of a runoff between rounds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrvState {
    pub eliminated: BTreeSet<usize>,
    pub rounds: Vec<IrvRound>,
    pub winner: Option<usize>,
    pub finished: bool,
}

impl IrvState {
    /// Tallies of the most recent round.
    pub fn last_tallies(&self) -> Option<&BTreeMap<usize, f64>> {
        self.rounds.last().map(|r| &r.tallies)
    }

    /// Half of the power credited in the most recent round.
    pub fn winning_threshold(&self) -> f64 {
        self.rounds.last().map_or(0.0, |r| r.total_votes / 2.0)
    }
}

/// First-preference tallies for every choice still running, and the power
/// they add up to. Exhausted ballots are not counted.
pub fn tally_round(
    choice_count: usize,
    ballots: &[RankedBallot],
    eliminated: &BTreeSet<usize>,
) -> (BTreeMap<usize, f64>, f64) {
    let initial: BTreeMap<usize, f64> = (0..choice_count)
        .filter(|c| !eliminated.contains(c))
        .map(|c| (c, 0.0))
        .collect();

    ballots.iter().fold((initial, 0.0), |(mut tallies, total), ballot| {
        match ballot.top_preference(eliminated) {
            Some(choice) => {
                *tallies.entry(choice).or_insert(0.0) += ballot.power;
                (tallies, total + ballot.power)
            }
            None => (tallies, total),
        }
    })
}

fn majority(tallies: &BTreeMap<usize, f64>, total: f64) -> Option<usize> {
    if total <= 0.0 {
        return None;
    }
    tallies
        .iter()
        .find(|(_, power)| **power > total / 2.0)
        .map(|(choice, _)| *choice)
}

// Lowest tally among running choices; the first one found wins a tie.
fn weakest(tallies: &BTreeMap<usize, f64>) -> Option<usize> {
    tallies
        .iter()
        .fold(None, |lowest: Option<(usize, f64)>, (&choice, &power)| match lowest {
            Some((_, low)) if low <= power => lowest,
            _ => Some((choice, power)),
        })
        .map(|(choice, _)| choice)
}

fn strongest(tallies: &BTreeMap<usize, f64>) -> Option<usize> {
    tallies
        .iter()
        .filter(|(_, power)| **power > 0.0)
        .fold(None, |best: Option<(usize, f64)>, (&choice, &power)| match best {
            Some((_, high)) if high >= power => best,
            _ => Some((choice, power)),
        })
        .map(|(choice, _)| choice)
}

/// Runs one round on `state` and returns the state after it.
pub fn run_round(
    state: &IrvState,
    choice_count: usize,
    ballots: &[RankedBallot],
    max_rounds: usize,
) -> IrvState {
    if state.finished {
        return state.clone();
    }

    let (tallies, total_votes) = tally_round(choice_count, ballots, &state.eliminated);
    let round = state.rounds.len() + 1;
    let remaining = tallies.len();

    let mut next = state.clone();
    let mut record = IrvRound {
        round,
        tallies,
        total_votes,
        eliminated: None,
    };

    if let Some(winner) = majority(&record.tallies, total_votes) {
        debug!("IRV round {}: choice {} holds a majority", round, winner);
        next.winner = Some(winner);
        next.finished = true;
    } else if remaining <= 1 || round >= max_rounds {
        if remaining > 1 {
            warn!(
                "IRV stopped after {} rounds with {} choices left, taking the leader",
                round, remaining
            );
        }
        next.winner = strongest(&record.tallies);
        next.finished = true;
    } else if let Some(loser) = weakest(&record.tallies) {
        debug!(
            "IRV round {}: no majority of {}, eliminating choice {}",
            round, total_votes, loser
        );
        record.eliminated = Some(loser);
        next.eliminated.insert(loser);
    } else {
        next.finished = true;
    }

    next.rounds.push(record);
    next
}

/// Runs rounds until a winner emerges or one choice is left.
pub fn run_irv(choice_count: usize, ballots: &[RankedBallot], max_rounds: Option<usize>) -> IrvState {
    let max_rounds = max_rounds.unwrap_or(choice_count).max(1);
    let mut state = IrvState::default();
    if choice_count == 0 {
        state.finished = true;
        return state;
    }
    while !state.finished {
        state = run_round(&state, choice_count, ballots, max_rounds);
    }
    state
}

/// Final tallies for every choice; eliminated choices report 0.
fn full_tallies(choice_count: usize, state: &IrvState) -> BTreeMap<usize, f64> {
    let mut results: BTreeMap<usize, f64> = (0..choice_count).map(|c| (c, 0.0)).collect();
    if let Some(tallies) = state.last_tallies() {
        for (choice, power) in tallies {
            results.insert(*choice, *power);
        }
    }
    results
}

fn point(choice_count: usize, timestamp: DateTime<Utc>, state: &IrvState) -> TimeseriesPoint {
    TimeseriesPoint {
        timestamp,
        values: full_tallies(choice_count, state)
            .into_iter()
            .map(|(choice, power)| (choice as i64, power))
            .collect(),
        winning_threshold: Some(state.winning_threshold()),
    }
}

/// Re-runs the runoff each time the accumulated power crosses the threshold,
/// on every ballot cast up to that moment.
fn runoff_series(
    choice_count: usize,
    ballots: &[RankedBallot],
    threshold: f64,
    max_rounds: Option<usize>,
) -> Vec<TimeseriesPoint> {
    let mut accumulator = Accumulator::new(threshold);
    let mut series = Vec::new();
    let mut covered = 0;

    for (i, ballot) in ballots.iter().enumerate() {
        if let Some(checkpoint) = accumulator.push(ballot.created_at, (), ballot.power) {
            let state = run_irv(choice_count, &ballots[..=i], max_rounds);
            series.push(point(choice_count, checkpoint.timestamp, &state));
            covered = i + 1;
        }
    }
    // A spike on the last ballot already ran the runoff over everything.
    if let Some(checkpoint) = accumulator.finish() {
        if covered < ballots.len() {
            let state = run_irv(choice_count, ballots, max_rounds);
            series.push(point(choice_count, checkpoint.timestamp, &state));
        }
    }
    series
}

pub fn calculate_results(ctx: &TabulationContext<'_>, votes: &[ProcessedVote]) -> Tabulation {
    let choice_count = ctx.choice_count();

    if votes.is_empty() {
        return Tabulation {
            final_results: ctx.empty_results(),
            timeseries: ctx.with_timeseries.then(Vec::new),
            winner: None,
            rounds: Some(Vec::new()),
        };
    }

    let ballots: Vec<RankedBallot> = votes
        .iter()
        .map(|v| RankedBallot::from_vote(v, choice_count))
        .collect();

    let state = run_irv(choice_count, &ballots, ctx.config.max_irv_rounds);
    let timeseries = ctx.with_timeseries.then(|| {
        runoff_series(
            choice_count,
            &ballots,
            ctx.config.vp_threshold,
            ctx.config.max_irv_rounds,
        )
    });

    Tabulation {
        final_results: full_tallies(choice_count, &state),
        timeseries,
        winner: state.winner,
        rounds: Some(state.rounds),
    }
}
