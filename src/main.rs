use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use qa_ensemble::artifacts::ModelOutputs;
use qa_ensemble::config::{
    parse_weight_vector, split_paths, CoveragePolicy, EnsembleConfig, OutputMode,
};
use qa_ensemble::evaluation::{Benchmark, EnsembleEvaluator, SquadEvaluator};
use qa_ensemble::search::{GridSearchOptimizer, SimplexGrid};
use qa_ensemble::{EnsembleError, Result};

#[derive(Parser, Debug)]
#[command(name = "qa-ensemble", about = "Weighted ensembling of QA model outputs")]
struct Cli {
    /// TOML config file; defaults to $QA_ENSEMBLE_CONFIG or config/ensemble.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Comma-joined answerability (null odds) score files.
    #[arg(long)]
    input_null_files: Option<String>,
    /// Comma-joined n-best candidate files.
    #[arg(long)]
    input_nbest_files: Option<String>,
    /// Predict no answer when the aggregated score exceeds this.
    #[arg(long, allow_hyphen_values = true)]
    null_score_diff_threshold: Option<f64>,
    /// Benchmark file with gold answers.
    #[arg(long)]
    predict_file: Option<PathBuf>,
    /// Benchmark contains unanswerable questions.
    #[arg(long)]
    v2: bool,
    /// Precomputed answerability weights; skips the first search.
    #[arg(long)]
    fin_cof: Option<String>,
    /// Precomputed candidate weights; skips the second search.
    #[arg(long)]
    fin_best_cof: Option<String>,
    #[arg(long, conflicts_with = "predict_pri_test")]
    predict_test: bool,
    #[arg(long, conflicts_with = "predict_test")]
    predict_pri_test: bool,
    /// First-component start of the answerability search.
    #[arg(long)]
    start: Option<u32>,
    /// First-component start of the candidate search.
    #[arg(long)]
    start_cof: Option<u32>,
    #[arg(long)]
    step: Option<u32>,
    #[arg(long)]
    step_cof: Option<u32>,
    /// Tolerate questions missing from some model files instead of failing.
    #[arg(long)]
    allow_partial_coverage: bool,
}

fn main() {
    load_dotenv();
    init_tracing();
    if let Err(err) = run() {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let (mut config, config_path) = EnsembleConfig::load(cli.config.clone())?;
    apply_cli_overrides(&cli, &mut config)?;

    let mode = OutputMode::from_flags(cli.predict_test, cli.predict_pri_test)?;
    config.validate(mode)?;

    if let Some(path) = config_path.as_ref().filter(|path| path.exists()) {
        info!(path = %path.display(), "loaded config");
    }
    log_files("null files", &config.inputs.null_files);
    log_files("nbest files", &config.inputs.nbest_files);

    let outputs = ModelOutputs::load(&config.inputs.null_files, &config.inputs.nbest_files)?;

    let metric = if mode.is_scored() {
        let benchmark = Benchmark::load(&config.inputs.predict_file, config.inputs.two_class)?;
        Some(SquadEvaluator::new(benchmark))
    } else {
        None
    };

    let mut evaluator = EnsembleEvaluator::new(
        &outputs,
        mode,
        config.output.path_for(mode),
        config.decision.null_score_diff_threshold,
        config.inputs.coverage,
    );
    if let Some(metric) = metric.as_ref() {
        evaluator = evaluator.with_metric(metric);
    }

    let search = &config.search;
    let score_grid = SimplexGrid::new(
        outputs.scores.len(),
        search.score_total,
        search.score_step,
        search.score_start,
    )?;
    let candidate_grid = SimplexGrid::new(
        outputs.candidates.len(),
        search.candidate_total,
        search.candidate_step,
        search.candidate_start,
    )?;

    let outcome = GridSearchOptimizer::new(&evaluator, score_grid, candidate_grid)
        .with_score_weights(config.score_weights())
        .with_candidate_weights(config.candidate_weights())
        .run()?;

    if let Some(best) = outcome.candidate_search.as_ref() {
        info!(best_score = best.score, best_thresh = best.threshold, "candidate search optimum");
    }

    let payload = serde_json::to_string_pretty(&outcome.evaluation)
        .map_err(|err| EnsembleError::MetricFailure(err.to_string()))?;
    println!("{}", payload);
    Ok(())
}

fn apply_cli_overrides(cli: &Cli, config: &mut EnsembleConfig) -> Result<()> {
    if let Some(files) = cli.input_null_files.as_deref() {
        config.inputs.null_files = split_paths(files);
    }
    if let Some(files) = cli.input_nbest_files.as_deref() {
        config.inputs.nbest_files = split_paths(files);
    }
    if let Some(threshold) = cli.null_score_diff_threshold {
        config.decision.null_score_diff_threshold = threshold;
    }
    if let Some(predict_file) = cli.predict_file.clone() {
        config.inputs.predict_file = predict_file;
    }
    if cli.v2 {
        config.inputs.two_class = true;
    }
    if cli.allow_partial_coverage {
        config.inputs.coverage = CoveragePolicy::Partial;
    }
    if let Some(weights) = cli.fin_cof.as_deref() {
        config.search.score_weights = Some(parse_weight_vector(weights)?.as_slice().to_vec());
    }
    if let Some(weights) = cli.fin_best_cof.as_deref() {
        config.search.candidate_weights = Some(parse_weight_vector(weights)?.as_slice().to_vec());
    }
    if let Some(start) = cli.start {
        config.search.score_start = start;
    }
    if let Some(start) = cli.start_cof {
        config.search.candidate_start = start;
    }
    if let Some(step) = cli.step {
        config.search.score_step = step;
    }
    if let Some(step) = cli.step_cof {
        config.search.candidate_step = step;
    }
    Ok(())
}

fn log_files(label: &str, files: &[PathBuf]) {
    for file in files {
        info!(kind = label, path = %file.display(), "input file");
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qa_ensemble=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_dotenv() {
    let _ = dotenvy::dotenv();
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    let manifest_path = Path::new(manifest_dir).join(".env");
    let _ = dotenvy::from_path(manifest_path);
}
