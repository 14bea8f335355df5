use std::collections::BTreeMap;

use crate::models::{HIDDEN_CHOICE_KEY, ProcessedResults, ScoresState};

/// Hidden votes stay sealed until their scores are final.
pub fn is_sealed(results: &ProcessedResults) -> bool {
    results.hidden_vote && results.scores_state != Some(ScoresState::Final)
}

/// Replaces every time-series point's per-choice breakdown with its sum under
/// [`HIDDEN_CHOICE_KEY`].
pub fn redact_timeseries(results: &mut ProcessedResults) {
    if let Some(series) = results.timeseries_data.as_mut() {
        for point in series.iter_mut() {
            let total: f64 = point.values.values().sum();
            point.values = BTreeMap::from([(HIDDEN_CHOICE_KEY, total)]);
        }
    }
}
