//! Cluster Audit
//!
//! Command line entry point for auditing a running cluster.
//! Validates epoch fairness of sampled block production, waits for layers to
//! be released, and summarises log hits. Outcomes map to exit codes so test
//! scripts can branch on them.

use anyhow::{Context, Result};
use audit_types::BlockMap;
use clap::{Parser, Subcommand};
use epoch_fairness::{FairnessError, FairnessReport, FairnessValidatorBuilder};
use layer_watch::{hit_time_span, log_entry_counts, ElasticSource, LayerWaiter, WaitOutcome};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;

use config::HarnessConfig;

const EXIT_OK: u8 = 0;
/// Exit code for a fairness violation
const EXIT_UNFAIR: u8 = 1;
/// Exit code for a bad layer window or protocol parameters
const EXIT_PRECONDITION: u8 = 2;
/// Exit code when the layer waiter ran out of time
const EXIT_TIMEOUT: u8 = 3;
/// Exit code when the harness itself failed (bad input, unreachable log service)
const EXIT_HARNESS_ERROR: u8 = 4;

/// Cluster Audit
#[derive(Parser, Debug)]
#[command(name = "cluster-audit")]
#[command(about = "Correctness checks for block production on a running cluster", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Elasticsearch URL (overrides config)
    #[arg(long, global = true)]
    elastic_url: Option<String>,

    /// Log index pattern (overrides config)
    #[arg(long, global = true)]
    index: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check every miner produced its share of blocks over whole epochs
    Validate {
        /// JSON block map: node id -> {"layers": {layer: [block ids]}}
        #[arg(long)]
        block_map: PathBuf,

        #[arg(long)]
        from_layer: u64,

        #[arg(long)]
        to_layer: u64,

        #[arg(long)]
        layers_per_epoch: u64,

        /// Network-wide average number of blocks per layer
        #[arg(long)]
        layer_avg_size: u64,

        /// Number of nodes expected to produce blocks
        #[arg(long)]
        num_miners: u64,

        /// Node ids left out of the check (repeatable)
        #[arg(long = "ignore")]
        ignore: Vec<String>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Block until the namespace released `delta` more release ticks
    WaitLayers {
        #[arg(long)]
        namespace: String,

        /// Release ticks to wait for (one per reporting node and layer)
        #[arg(long)]
        delta: usize,

        #[arg(long, default_value = "300")]
        timeout_secs: u64,

        /// Seconds between polls (overrides config)
        #[arg(long)]
        poll_interval_secs: Option<u64>,
    },

    /// Count occurrences of a log entry's values across matching hits
    HitCounts {
        #[arg(long)]
        namespace: String,

        /// Message to search for
        #[arg(long)]
        message: String,

        /// Logical log entry to count
        #[arg(long, default_value = "message")]
        entry: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    ExitCode::from(exit_code(run(args).await))
}

/// Map the outcome of a command to the process exit code
///
/// Harness failures get their own code so they never read as a verdict.
fn exit_code(result: Result<u8>) -> u8 {
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            EXIT_HARNESS_ERROR
        }
    }
}

async fn run(args: Args) -> Result<u8> {
    let config = load_config(&args)?;

    match args.command {
        Command::Validate {
            block_map,
            from_layer,
            to_layer,
            layers_per_epoch,
            layer_avg_size,
            num_miners,
            ignore,
            json,
        } => {
            let block_map = read_block_map(&block_map)?;
            let ignore: HashSet<String> = ignore.into_iter().collect();

            let result = FairnessValidatorBuilder::new()
                .layers_per_epoch(layers_per_epoch)
                .layer_avg_size(layer_avg_size)
                .num_miners(num_miners)
                .build()
                .validate(&block_map, from_layer, to_layer, &ignore);

            if let (Ok(report), true) = (&result, json) {
                println!("{}", serde_json::to_string_pretty(report)?);
            }
            Ok(validation_exit_code(&result))
        }
        Command::WaitLayers {
            namespace,
            delta,
            timeout_secs,
            poll_interval_secs,
        } => {
            let mut wait_config = config.wait();
            if let Some(secs) = poll_interval_secs {
                wait_config.poll_interval = Duration::from_secs(secs);
            }

            let source = ElasticSource::new(config.elastic())?;
            let outcome = LayerWaiter::with_config(source, wait_config)
                .wait_for_layers(&namespace, delta, Duration::from_secs(timeout_secs))
                .await
                .with_context(|| format!("Failed to query release ticks for {}", namespace))?;

            Ok(wait_exit_code(&outcome))
        }
        Command::HitCounts {
            namespace,
            message,
            entry,
        } => {
            let source = ElasticSource::new(config.elastic())?;
            let hits = source
                .search(&namespace, &message)
                .await
                .with_context(|| format!("Failed to query '{}' in {}", message, namespace))?;
            tracing::info!("{} hits for '{}' in {}", hits.len(), message, namespace);
            if let Some((first, last)) = hit_time_span(&hits) {
                tracing::info!("hits span {} to {}", first, last);
            }

            log_entry_counts(&hits, &entry)?;
            Ok(EXIT_OK)
        }
    }
}

/// Config file values with command line overrides applied
fn load_config(args: &Args) -> Result<HarnessConfig> {
    let mut config = match &args.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(url) = &args.elastic_url {
        config.elastic_url = url.clone();
    }
    if let Some(index) = &args.index {
        config.index = index.clone();
    }
    Ok(config)
}

fn read_block_map(path: &Path) -> Result<BlockMap> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read block map {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid block map {:?}", path))
}

fn validation_exit_code(result: &Result<FairnessReport, FairnessError>) -> u8 {
    match result {
        Ok(_) => EXIT_OK,
        Err(e) if e.is_precondition() => {
            tracing::error!("Validation not attempted: {}", e);
            EXIT_PRECONDITION
        }
        Err(e) => {
            tracing::error!("Validation failed: {}", e);
            EXIT_UNFAIR
        }
    }
}

fn wait_exit_code(outcome: &WaitOutcome) -> u8 {
    if outcome.timed_out() {
        EXIT_TIMEOUT
    } else {
        EXIT_OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audit_types::NoExclusions;
    use epoch_fairness::validate_blocks_per_node;

    #[test]
    fn test_parse_validate_command() {
        let args = Args::try_parse_from([
            "cluster-audit",
            "validate",
            "--block-map",
            "blocks.json",
            "--from-layer",
            "0",
            "--to-layer",
            "20",
            "--layers-per-epoch",
            "5",
            "--layer-avg-size",
            "10",
            "--num-miners",
            "4",
            "--ignore",
            "bootstrap",
            "--ignore",
            "poet",
        ])
        .unwrap();

        match args.command {
            Command::Validate {
                to_layer, ignore, ..
            } => {
                assert_eq!(to_layer, 20);
                assert_eq!(ignore, vec!["bootstrap".to_string(), "poet".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_overrides_apply_to_config() {
        let args = Args::try_parse_from([
            "cluster-audit",
            "--elastic-url",
            "http://es:9200",
            "wait-layers",
            "--namespace",
            "audit",
            "--delta",
            "10",
        ])
        .unwrap();

        let config = load_config(&args).unwrap();
        assert_eq!(config.elastic_url, "http://es:9200");
        assert_eq!(config.index, HarnessConfig::default().index);
    }

    #[test]
    fn test_exit_codes() {
        let map = BlockMap::new();
        let ok = validate_blocks_per_node(&map, 5, 10, 5, 10, 4, NoExclusions);
        assert_eq!(validation_exit_code(&ok), EXIT_OK);

        let misaligned = validate_blocks_per_node(&map, 6, 10, 5, 10, 4, NoExclusions);
        assert_eq!(validation_exit_code(&misaligned), EXIT_PRECONDITION);

        let mut map = BlockMap::new();
        map.insert("idle".to_string(), Default::default());
        let unfair = validate_blocks_per_node(&map, 5, 10, 5, 10, 4, NoExclusions);
        assert_eq!(validation_exit_code(&unfair), EXIT_UNFAIR);

        let timed_out = WaitOutcome::TimedOut { old: 1, new: 1 };
        assert_eq!(wait_exit_code(&timed_out), EXIT_TIMEOUT);
        assert_eq!(wait_exit_code(&WaitOutcome::Aligned { count: 3 }), EXIT_OK);
    }

    #[tokio::test]
    async fn test_harness_failure_is_not_a_verdict() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let args = Args::try_parse_from([
            "cluster-audit",
            "validate",
            "--block-map",
            missing.to_str().unwrap(),
            "--from-layer",
            "5",
            "--to-layer",
            "10",
            "--layers-per-epoch",
            "5",
            "--layer-avg-size",
            "10",
            "--num-miners",
            "4",
        ])
        .unwrap();

        let code = exit_code(run(args).await);
        assert_eq!(code, EXIT_HARNESS_ERROR);
        assert_ne!(code, EXIT_UNFAIR);
    }

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            EXIT_OK,
            EXIT_UNFAIR,
            EXIT_PRECONDITION,
            EXIT_TIMEOUT,
            EXIT_HARNESS_ERROR,
        ];
        let unique: HashSet<u8> = codes.iter().copied().collect();
        assert_eq!(unique.len(), codes.len());
        assert_eq!(exit_code(Ok(EXIT_TIMEOUT)), EXIT_TIMEOUT);
    }

    #[test]
    fn test_read_block_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blocks.json");
        std::fs::write(&path, r#"{"n1": {"layers": {"5": ["a"]}}}"#).unwrap();

        let map = read_block_map(&path).unwrap();
        assert_eq!(map["n1"].blocks_in(5).len(), 1);
    }
}
