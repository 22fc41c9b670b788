pub mod benchmark;
pub mod evaluator;
pub mod squad;

pub use benchmark::{Benchmark, GoldAnswers};
pub use evaluator::{EnsembleEvaluator, Evaluation};
pub use squad::SquadEvaluator;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::{AggregatedScore, PredictionMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricReport {
    pub best_f1: f64,
    pub best_f1_thresh: f64,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl MetricReport {
    pub fn new(best_f1: f64, best_f1_thresh: f64) -> Self {
        Self {
            best_f1,
            best_f1_thresh,
            extra: IndexMap::new(),
        }
    }
}

/// Scores a prediction set against ground truth.
pub trait MetricEvaluator {
    fn evaluate(
        &self,
        predictions: &PredictionMap,
        na_scores: &AggregatedScore,
        threshold: f64,
    ) -> Result<MetricReport>;
}
