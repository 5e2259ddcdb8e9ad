use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use thicket_io::AfmReader;
use thicket_split::{
    CONTRAST_SUFFIX, FeatureMatrix, MissingPolicy, Prediction, SplitConfig, SplitMethod,
    SplitOutcome, Splitter,
};

#[derive(Parser)]
#[command(name = "thicket")]
#[command(about = "Best-split search over annotated feature matrices")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Shared search parameters.
#[derive(Args, Debug, Clone)]
struct SearchArgs {
    /// Path to the input AFM (tab-separated, one feature per row)
    #[arg(long)]
    data: PathBuf,

    /// Name of the response feature, including its type prefix
    #[arg(long)]
    target: String,

    /// Candidate features (comma-separated); all non-target features if omitted
    #[arg(long, value_delimiter = ',')]
    features: Vec<String>,

    /// Minimum number of cases on each side of a split
    #[arg(long, default_value_t = 1)]
    leaf_size: usize,

    /// Search strategy: "exhaustive" or "randomized"
    #[arg(long, default_value = "exhaustive")]
    split_method: String,

    /// Thresholds or category bipartitions drawn per feature in randomized mode
    #[arg(long, default_value_t = 1)]
    random_candidates: usize,

    /// Score missing values as a third branch instead of leaving them out
    #[arg(long, default_value_t = false)]
    three_way: bool,

    /// Replace missing values with the feature mean or mode before searching
    #[arg(long, default_value_t = false)]
    impute: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Find the best splitter for all cases of a dataset
    Split {
        #[command(flatten)]
        search: SearchArgs,

        /// Append this many shuffled contrast features before searching
        #[arg(long, default_value_t = 0)]
        contrasts: usize,

        /// Append one shuffled contrast copy of every feature before searching
        #[arg(long, default_value_t = false)]
        contrast_all: bool,
    },

    /// Repeat the search over freshly shuffled contrast copies and count how
    /// often a contrast feature wins
    ContrastScan {
        #[command(flatten)]
        search: SearchArgs,

        /// Number of independent shuffles
        #[arg(long, default_value_t = 20)]
        rounds: u64,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct SplitOutput {
    target: String,
    n_cases: usize,
    n_features: usize,
    n_candidates: usize,
    splitter: Option<Splitter>,
    impurity_decrease: f64,
    constant_features: Vec<String>,
    branches: Option<BranchOutput>,
}

#[derive(Serialize)]
struct BranchOutput {
    left: usize,
    right: usize,
    missing: usize,
    left_prediction: Option<Prediction>,
    right_prediction: Option<Prediction>,
}

#[derive(Serialize)]
struct ContrastScanOutput {
    target: String,
    rounds: u64,
    contrast_wins: usize,
    no_split: usize,
    contrast_win_rate: f64,
    winners: BTreeMap<String, usize>,
}

fn parse_split_method(s: &str) -> Result<SplitMethod> {
    match s {
        "exhaustive" => Ok(SplitMethod::Exhaustive),
        "randomized" => Ok(SplitMethod::Randomized),
        other => anyhow::bail!("unknown split method: {other} (expected exhaustive or randomized)"),
    }
}

fn build_config(search: &SearchArgs) -> Result<SplitConfig> {
    let policy = if search.three_way {
        MissingPolicy::ThreeWay
    } else {
        MissingPolicy::Exclude
    };
    let config = SplitConfig::new(search.leaf_size)?
        .with_split_method(parse_split_method(&search.split_method)?)
        .with_missing_policy(policy)
        .with_random_candidates(search.random_candidates)?;
    Ok(config)
}

/// Load an AFM, keeping the columns parsed before any malformed row.
fn load_matrix(path: &Path) -> Result<FeatureMatrix> {
    let parsed = AfmReader::new(path)
        .read()
        .context("failed to open input AFM")?;
    if let Some(e) = &parsed.error {
        warn!(error = %e, "continuing with partially parsed matrix");
    }
    if parsed.matrix.is_empty() {
        anyhow::bail!("no features parsed from {}", path.display());
    }
    Ok(parsed.matrix)
}

/// Resolve candidate positions: the named features, or every feature but
/// the target.
fn resolve_candidates(fm: &FeatureMatrix, target: &str, names: &[String]) -> Result<Vec<usize>> {
    if names.is_empty() {
        let target_index = fm.index_of(target);
        return Ok((0..fm.n_features())
            .filter(|&i| Some(i) != target_index)
            .collect());
    }
    names
        .iter()
        .map(|name| {
            fm.index_of(name)
                .with_context(|| format!("unknown candidate feature: {name}"))
        })
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    let seed = cli.seed;
    match cli.command {
        Command::Split {
            search,
            contrasts,
            contrast_all,
        } => {
            let config = build_config(&search)?;
            let mut fm = load_matrix(&search.data)?;
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            if search.impute {
                fm.impute_missing();
            }
            if contrast_all {
                fm.contrast_all(&mut rng);
            }
            fm.add_contrasts(contrasts, &mut rng)
                .context("failed to add contrast features")?;

            let candidates = resolve_candidates(&fm, &search.target, &search.features)?;
            let target = fm
                .target(&search.target)
                .context("failed to resolve target feature")?;
            let cases: Vec<usize> = (0..fm.n_cases()).collect();
            let mut allocs = fm.new_allocs();

            let SplitOutcome {
                splitter,
                impurity_decrease,
                constant,
                ..
            } = fm.best_splitter(target, &cases, &candidates, &config, &mut allocs, &mut rng);

            let branches = match &splitter {
                Some(s) => {
                    let p = s.split_matrix(&fm, &cases)?;
                    Some(BranchOutput {
                        left: p.left.len(),
                        right: p.right.len(),
                        missing: p.missing.len(),
                        left_prediction: target.predicted(&p.left),
                        right_prediction: target.predicted(&p.right),
                    })
                }
                None => None,
            };

            let output = SplitOutput {
                target: search.target,
                n_cases: fm.n_cases(),
                n_features: fm.n_features(),
                n_candidates: candidates.len(),
                splitter,
                impurity_decrease,
                constant_features: constant
                    .iter()
                    .filter_map(|&i| fm.get(i).map(|f| f.name().to_string()))
                    .collect(),
                branches,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::ContrastScan { search, rounds } => {
            let config = build_config(&search)?;
            let mut base = load_matrix(&search.data)?;
            if search.impute {
                base.impute_missing();
            }
            let n_real = base.n_features();
            // Validate names once before fanning out.
            resolve_candidates(&base, &search.target, &search.features)?;
            base.target(&search.target)
                .context("failed to resolve target feature")?;

            let winners = (0..rounds)
                .into_par_iter()
                .map(|round| -> Result<Option<String>> {
                    let mut fm = base.clone();
                    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(round));
                    fm.contrast_all(&mut rng);

                    let mut candidates = resolve_candidates(&fm, &search.target, &search.features)?;
                    if !search.features.is_empty() {
                        // Named candidates compete against their own contrasts.
                        candidates.extend(candidates.clone().into_iter().map(|i| i + n_real));
                    }
                    let target = fm.target(&search.target)?;
                    let cases: Vec<usize> = (0..fm.n_cases()).collect();
                    let mut allocs = fm.new_allocs();
                    let out =
                        fm.best_splitter(target, &cases, &candidates, &config, &mut allocs, &mut rng);
                    Ok(out.splitter.map(|s| s.feature))
                })
                .collect::<Result<Vec<_>>>()?;

            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            let mut no_split = 0;
            for winner in winners {
                match winner {
                    Some(name) => *counts.entry(name).or_default() += 1,
                    None => no_split += 1,
                }
            }
            let contrast_wins: usize = counts
                .iter()
                .filter(|(name, _)| name.contains(CONTRAST_SUFFIX))
                .map(|(_, n)| n)
                .sum();
            info!(rounds, contrast_wins, "contrast scan complete");

            let output = ContrastScanOutput {
                target: search.target,
                rounds,
                contrast_wins,
                no_split,
                contrast_win_rate: if rounds == 0 {
                    0.0
                } else {
                    contrast_wins as f64 / rounds as f64
                },
                winners: counts,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
