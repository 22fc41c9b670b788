use tracing::info;

use crate::error::{EnsembleError, Result};
use crate::evaluation::{EnsembleEvaluator, Evaluation};
use crate::search::SimplexGrid;
use crate::WeightVector;

#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    /// Position of the trial in the grid's canonical enumeration order.
    pub index: usize,
    pub score_weights: WeightVector,
    pub candidate_weights: WeightVector,
    pub score: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Default)]
pub struct BestTrial {
    best: Option<TrialResult>,
}

impl BestTrial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&TrialResult> {
        self.best.as_ref()
    }

    pub fn into_inner(self) -> Option<TrialResult> {
        self.best
    }

    pub fn offer(&mut self, trial: TrialResult) -> bool {
        let replace = match &self.best {
            Some(best) => trial.score > best.score,
            None => true,
        };
        if replace {
            self.best = Some(trial);
        }
        replace
    }

    pub fn merge(self, other: BestTrial) -> BestTrial {
        let best = match (self.best, other.best) {
            (Some(left), Some(right)) => {
                let right_wins = right.score > left.score
                    || (right.score == left.score && right.index < left.index);
                Some(if right_wins { right } else { left })
            }
            (left, right) => left.or(right),
        };
        BestTrial { best }
    }
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub score_weights: WeightVector,
    pub candidate_weights: WeightVector,
    pub score_search: Option<TrialResult>,
    pub candidate_search: Option<TrialResult>,
    pub evaluation: Evaluation,
}

pub struct GridSearchOptimizer<'a> {
    evaluator: &'a EnsembleEvaluator<'a>,
    score_grid: SimplexGrid,
    candidate_grid: SimplexGrid,
    score_weights: Option<WeightVector>,
    candidate_weights: Option<WeightVector>,
}

impl<'a> GridSearchOptimizer<'a> {
    pub fn new(
        evaluator: &'a EnsembleEvaluator<'a>,
        score_grid: SimplexGrid,
        candidate_grid: SimplexGrid,
    ) -> Self {
        Self {
            evaluator,
            score_grid,
            candidate_grid,
            score_weights: None,
            candidate_weights: None,
        }
    }

    pub fn with_score_weights(mut self, weights: Option<WeightVector>) -> Self {
        self.score_weights = weights;
        self
    }

    pub fn with_candidate_weights(mut self, weights: Option<WeightVector>) -> Self {
        self.candidate_weights = weights;
        self
    }

    pub fn run(&self) -> Result<SearchOutcome> {
        let (score_weights, score_search) = match &self.score_weights {
            Some(weights) => (weights.clone(), None),
            None => {
                let best = self.search_score_weights()?;
                (best.score_weights.clone(), Some(best))
            }
        };

        let (candidate_weights, candidate_search) = match &self.candidate_weights {
            Some(weights) => (weights.clone(), None),
            None => {
                let best = self.search_candidate_weights(&score_weights)?;
                (best.candidate_weights.clone(), Some(best))
            }
        };

        let evaluation = self.evaluator.evaluate(&score_weights, &candidate_weights)?;
        info!(
            score_weights = %score_weights,
            candidate_weights = %candidate_weights,
            mode = self.evaluator.mode().label(),
            "final evaluation complete"
        );

        Ok(SearchOutcome {
            score_weights,
            candidate_weights,
            score_search,
            candidate_search,
            evaluation,
        })
    }

    pub fn search_score_weights(&self) -> Result<TrialResult> {
        let candidate_weights = WeightVector::ones(self.evaluator.candidate_source_count());
        self.search("answerability", &self.score_grid, |weights| {
            (weights, candidate_weights.clone())
        })
    }

    pub fn search_candidate_weights(&self, score_weights: &WeightVector) -> Result<TrialResult> {
        self.search("candidate", &self.candidate_grid, |weights| {
            (score_weights.clone(), weights)
        })
    }

    fn search<F>(&self, label: &str, grid: &SimplexGrid, mut trial_weights: F) -> Result<TrialResult>
    where
        F: FnMut(WeightVector) -> (WeightVector, WeightVector),
    {
        let mut best = BestTrial::new();

        for (index, weights) in grid.weights().enumerate() {
            let (score_weights, candidate_weights) = trial_weights(weights);
            let report = self.evaluator.score(&score_weights, &candidate_weights)?;

            info!(
                search = label,
                trial = index,
                score = report.best_f1,
                score_weights = %score_weights,
                candidate_weights = %candidate_weights,
                "trial evaluated"
            );

            let improved = best.offer(TrialResult {
                index,
                score_weights,
                candidate_weights,
                score: report.best_f1,
                threshold: report.best_f1_thresh,
            });
            if improved {
                info!(search = label, trial = index, best_score = report.best_f1, "new best");
            }
        }

        let best = best.into_inner().ok_or_else(|| {
            EnsembleError::config(format!(
                "{} grid (total {}, step {}, start {}) produced no weight vectors",
                label,
                grid.total(),
                grid.step(),
                grid.start()
            ))
        })?;

        info!(
            search = label,
            score = best.score,
            threshold = best.threshold,
            score_weights = %best.score_weights,
            candidate_weights = %best.candidate_weights,
            "search finished"
        );
        Ok(best)
    }
}
