use serde::Serialize;
use std::path::PathBuf;

use crate::aggregate::{AnswerAggregator, PredictionSelector, ScoreAggregator};
use crate::artifacts::{write_predictions, ModelOutputs};
use crate::config::{CoveragePolicy, OutputMode};
use crate::error::{EnsembleError, Result};
use crate::evaluation::{MetricEvaluator, MetricReport};
use crate::{PredictionMap, WeightVector};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Evaluation {
    Scored(MetricReport),
    Predictions(PredictionMap),
}

impl Evaluation {
    pub fn metric(&self) -> Option<&MetricReport> {
        match self {
            Evaluation::Scored(report) => Some(report),
            Evaluation::Predictions(_) => None,
        }
    }
}

pub struct EnsembleEvaluator<'a> {
    outputs: &'a ModelOutputs,
    metric: Option<&'a dyn MetricEvaluator>,
    score_aggregator: ScoreAggregator,
    answer_aggregator: AnswerAggregator,
    selector: PredictionSelector,
    mode: OutputMode,
    artifact_path: PathBuf,
}

impl<'a> EnsembleEvaluator<'a> {
    pub fn new(
        outputs: &'a ModelOutputs,
        mode: OutputMode,
        artifact_path: impl Into<PathBuf>,
        threshold: f64,
        policy: CoveragePolicy,
    ) -> Self {
        Self {
            outputs,
            metric: None,
            score_aggregator: ScoreAggregator::new(policy),
            answer_aggregator: AnswerAggregator::new(policy),
            selector: PredictionSelector::new(threshold),
            mode,
            artifact_path: artifact_path.into(),
        }
    }

    pub fn with_metric(mut self, metric: &'a dyn MetricEvaluator) -> Self {
        self.metric = Some(metric);
        self
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn candidate_source_count(&self) -> usize {
        self.outputs.candidates.len()
    }

    pub fn evaluate(
        &self,
        score_weights: &WeightVector,
        candidate_weights: &WeightVector,
    ) -> Result<Evaluation> {
        let scores = self
            .score_aggregator
            .aggregate(&self.outputs.scores, score_weights)?;
        let candidates = self
            .answer_aggregator
            .aggregate(&self.outputs.candidates, candidate_weights)?;
        let predictions = self.selector.select(&scores, &candidates)?;

        write_predictions(&self.artifact_path, &predictions)?;

        match self.mode {
            OutputMode::Test | OutputMode::PrivateTest => Ok(Evaluation::Predictions(predictions)),
            OutputMode::Validation => {
                let metric = self.metric.ok_or_else(|| {
                    EnsembleError::config("validation mode requires a metric evaluator")
                })?;
                let report = metric.evaluate(&predictions, &scores, self.selector.threshold())?;
                Ok(Evaluation::Scored(report))
            }
        }
    }

    pub fn score(
        &self,
        score_weights: &WeightVector,
        candidate_weights: &WeightVector,
    ) -> Result<MetricReport> {
        match self.evaluate(score_weights, candidate_weights)? {
            Evaluation::Scored(report) => Ok(report),
            Evaluation::Predictions(_) => Err(EnsembleError::config(format!(
                "{} mode does not produce a metric",
                self.mode.label()
            ))),
        }
    }
}
