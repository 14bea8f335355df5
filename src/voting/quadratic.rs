use crate::config::QuadraticMode;
use crate::models::ProcessedVote;
use crate::voting::{Tabulation, TabulationContext, basic};

/// Quadratic tabulation over single-choice ballots.
///
/// There is no credit-spending model: in [`QuadraticMode::SquareRoot`] each
/// ballot counts `sqrt(votingPower)`, in [`QuadraticMode::Linear`] it is
/// tabulated exactly like a basic vote. Time series and spikes are measured in
/// the dampened power.
pub fn calculate_results(ctx: &TabulationContext<'_>, votes: &[ProcessedVote]) -> Tabulation {
    match ctx.config.quadratic_mode {
        QuadraticMode::SquareRoot => basic::tally_with(ctx, votes, f64::sqrt),
        QuadraticMode::Linear => basic::calculate_results(ctx, votes),
    }
}
