use clap::Parser;
use log::{error, info};
use std::fs;
use std::path::{Path, PathBuf};

use proposal_results::models::ResultsInput;
use proposal_results::{EngineConfig, ProcessOptions, Result, ResultsError, process_results_with};

/// Tabulate a proposal's ballots and print the processed results as JSON.
#[derive(Parser)]
struct Opts {
    /// JSON file with `proposal` and `votes`
    input: PathBuf,
    /// Leave the per-ballot list out of the output
    #[clap(long)]
    no_votes: bool,
    /// Leave the time series out of the output
    #[clap(long)]
    no_timeseries: bool,
    /// Collapse small ballots between large ones in the vote list
    #[clap(long)]
    aggregated: bool,
    /// Voting power threshold for time-series spikes, overrides RESULTS_VP_THRESHOLD
    #[clap(long)]
    threshold: Option<f64>,
    /// Pretty-print the JSON output
    #[clap(long)]
    pretty: bool,
}

fn read_input(path: &Path) -> Result<ResultsInput> {
    let raw = fs::read_to_string(path).map_err(|source| ResultsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

fn run(opts: Opts) -> Result<()> {
    let mut config = EngineConfig::from_env()?;
    if let Some(threshold) = opts.threshold {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ResultsError::InvalidConfig {
                key: "--threshold",
                value: threshold.to_string(),
            });
        }
        config.vp_threshold = threshold;
    }

    let options = ProcessOptions {
        with_votes: !opts.no_votes,
        with_timeseries: !opts.no_timeseries,
        aggregated_votes: opts.aggregated,
    };

    let input = read_input(&opts.input)?;
    info!(
        "Tabulating proposal {} ({} ballots, vote type {})",
        input.proposal.id,
        input.votes.len(),
        input.proposal.metadata.vote_type.as_deref().unwrap_or("basic")
    );

    let results = process_results_with(&input.proposal, &input.votes, options, &config);
    if let Some(winner) = results.winner_text() {
        info!("Leading choice: {}", winner);
    }

    let output = if opts.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{}", output);
    Ok(())
}

fn main() {
    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let opts = Opts::parse();
    if let Err(e) = run(opts) {
        error!("Failed to process results: {}", e);
        std::process::exit(1);
    }
}
