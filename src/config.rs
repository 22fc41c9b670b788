use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{EnsembleError, Result};
use crate::WeightVector;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    Test,
    PrivateTest,
    #[default]
    Validation,
}

impl OutputMode {
    pub fn from_flags(predict_test: bool, predict_pri_test: bool) -> Result<Self> {
        match (predict_test, predict_pri_test) {
            (true, true) => Err(EnsembleError::config(
                "--predict-test and --predict-pri-test are mutually exclusive",
            )),
            (true, false) => Ok(OutputMode::Test),
            (false, true) => Ok(OutputMode::PrivateTest),
            (false, false) => Ok(OutputMode::Validation),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputMode::Test => "test",
            OutputMode::PrivateTest => "private-test",
            OutputMode::Validation => "validation",
        }
    }

    pub fn is_scored(self) -> bool {
        matches!(self, OutputMode::Validation)
    }
}

/// How to treat a question that some per-model files do not cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoveragePolicy {
    /// Every score file and every candidate file must contain every question.
    #[default]
    Strict,
    /// Average over whichever score files contain the question and merge the
    /// candidates that exist.
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub null_files: Vec<PathBuf>,
    pub nbest_files: Vec<PathBuf>,
    pub predict_file: PathBuf,
    pub two_class: bool,
    pub coverage: CoveragePolicy,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            null_files: split_paths(
                "cls_score.json,ensemble/model1/null_odds.json,ensemble/model2/null_odds.json,ensemble/model3/null_odds.json",
            ),
            nbest_files: split_paths(
                "ensemble/model1/nbest_predictions.json,ensemble/model2/nbest_predictions.json,ensemble/model3/nbest_predictions.json",
            ),
            predict_file: PathBuf::from("dev-v2.0.json"),
            two_class: false,
            coverage: CoveragePolicy::Strict,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub null_score_diff_threshold: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            null_score_diff_threshold: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub score_start: u32,
    pub score_step: u32,
    pub score_total: u32,
    pub score_weights: Option<Vec<f64>>,
    pub candidate_start: u32,
    pub candidate_step: u32,
    pub candidate_total: u32,
    pub candidate_weights: Option<Vec<f64>>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            score_start: 100,
            score_step: 10,
            score_total: 100,
            score_weights: None,
            candidate_start: 100,
            candidate_step: 5,
            candidate_total: 100,
            candidate_weights: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub test_predictions: PathBuf,
    pub private_test_predictions: PathBuf,
    pub validation_predictions: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            test_predictions: PathBuf::from("results.json"),
            private_test_predictions: PathBuf::from("pri_results.json"),
            validation_predictions: PathBuf::from("valid_predictions.json"),
        }
    }
}

impl OutputConfig {
    pub fn path_for(&self, mode: OutputMode) -> &Path {
        match mode {
            OutputMode::Test => &self.test_predictions,
            OutputMode::PrivateTest => &self.private_test_predictions,
            OutputMode::Validation => &self.validation_predictions,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    pub inputs: InputsConfig,
    pub decision: DecisionConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
}

impl EnsembleConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>)> {
        let config_path = path.or_else(default_config_path);
        let mut config = match config_path.as_ref() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| EnsembleError::io(path, err))?;
                Self::from_toml(&contents)?
            }
            _ => EnsembleConfig::default(),
        };

        config.apply_env_overrides()?;
        Ok((config, config_path))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|err| EnsembleError::config(format!("failed to parse config: {}", err)))
    }

    pub fn score_weights(&self) -> Option<WeightVector> {
        self.search.score_weights.clone().map(WeightVector::new)
    }

    pub fn candidate_weights(&self) -> Option<WeightVector> {
        self.search.candidate_weights.clone().map(WeightVector::new)
    }

    pub fn validate(&self, mode: OutputMode) -> Result<()> {
        if self.inputs.null_files.is_empty() {
            return Err(EnsembleError::config("no answerability score files configured"));
        }
        if self.inputs.nbest_files.is_empty() {
            return Err(EnsembleError::config("no candidate list files configured"));
        }
        if self.search.score_step == 0 || self.search.candidate_step == 0 {
            return Err(EnsembleError::config("search step must be positive"));
        }
        if self.search.score_total == 0 || self.search.candidate_total == 0 {
            return Err(EnsembleError::config("search total must be positive"));
        }
        if !self.decision.null_score_diff_threshold.is_finite() {
            return Err(EnsembleError::config("no-answer threshold must be finite"));
        }

        if let Some(weights) = self.score_weights() {
            validate_weight_vector(&weights, self.inputs.null_files.len(), "answerability")?;
        }
        if let Some(weights) = self.candidate_weights() {
            validate_weight_vector(&weights, self.inputs.nbest_files.len(), "candidate")?;
        }

        if !mode.is_scored()
            && (self.search.score_weights.is_none() || self.search.candidate_weights.is_none())
        {
            return Err(EnsembleError::config(format!(
                "{} mode produces no metric; supply both weight vectors instead of searching",
                mode.label()
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(files) = env::var("QA_ENSEMBLE_NULL_FILES") {
            if !files.trim().is_empty() {
                self.inputs.null_files = split_paths(&files);
            }
        }
        if let Ok(files) = env::var("QA_ENSEMBLE_NBEST_FILES") {
            if !files.trim().is_empty() {
                self.inputs.nbest_files = split_paths(&files);
            }
        }
        if let Ok(threshold) = env::var("QA_ENSEMBLE_THRESHOLD") {
            if !threshold.trim().is_empty() {
                self.decision.null_score_diff_threshold =
                    threshold.trim().parse::<f64>().map_err(|err| {
                        EnsembleError::config(format!(
                            "invalid QA_ENSEMBLE_THRESHOLD {:?}: {}",
                            threshold, err
                        ))
                    })?;
            }
        }
        if let Ok(predict_file) = env::var("QA_ENSEMBLE_PREDICT_FILE") {
            if !predict_file.trim().is_empty() {
                self.inputs.predict_file = PathBuf::from(predict_file.trim());
            }
        }
        Ok(())
    }
}

pub fn split_paths(value: &str) -> Vec<PathBuf> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Parses a comma-separated list of reals such as `0.3, 0.7`.
pub fn parse_weight_vector(value: &str) -> Result<WeightVector> {
    let mut weights = Vec::new();
    for item in value.split(',') {
        let item = item.trim();
        let weight = item.parse::<f64>().map_err(|err| {
            EnsembleError::config(format!("invalid weight {:?} in {:?}: {}", item, value, err))
        })?;
        weights.push(weight);
    }
    Ok(WeightVector::new(weights))
}

pub fn validate_weight_vector(weights: &WeightVector, expected_len: usize, label: &str) -> Result<()> {
    if weights.len() != expected_len {
        return Err(EnsembleError::config(format!(
            "{} weights have {} components but {} files are configured",
            label,
            weights.len(),
            expected_len
        )));
    }
    if let Some(bad) = weights.iter().find(|weight| !weight.is_finite() || **weight < 0.0) {
        return Err(EnsembleError::config(format!(
            "{} weights must be non-negative, got {}",
            label, bad
        )));
    }
    let sum = weights.sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(EnsembleError::config(format!(
            "{} weights must sum to 1.0, got {}",
            label, sum
        )));
    }
    Ok(())
}

fn default_config_path() -> Option<PathBuf> {
    env::var("QA_ENSEMBLE_CONFIG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/ensemble.toml")))
}
