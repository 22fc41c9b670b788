use indexmap::IndexMap;

use crate::aggregate::check_weight_count;
use crate::artifacts::ScoreSource;
use crate::config::CoveragePolicy;
use crate::error::{EnsembleError, Result};
use crate::{AggregatedScore, QuestionId, WeightVector};

/// Weighted answerability score per question, divided by the number of
/// sources that scored it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreAggregator {
    policy: CoveragePolicy,
}

impl ScoreAggregator {
    pub fn new(policy: CoveragePolicy) -> Self {
        Self { policy }
    }

    pub fn aggregate(&self, sources: &[ScoreSource], weights: &WeightVector) -> Result<AggregatedScore> {
        check_weight_count(weights, sources.len(), "answerability")?;

        let mut sums: IndexMap<QuestionId, (f64, usize)> = IndexMap::new();
        for (source, weight) in sources.iter().zip(weights.iter()) {
            for (question_id, score) in &source.scores {
                let entry = sums.entry(question_id.clone()).or_insert((0.0, 0));
                entry.0 += weight * score;
                entry.1 += 1;
            }
        }

        let mut aggregated = AggregatedScore::with_capacity(sums.len());
        for (question_id, (sum, count)) in sums {
            if self.policy == CoveragePolicy::Strict && count != sources.len() {
                return Err(coverage_gap(sources, question_id));
            }
            aggregated.insert(question_id, sum / count as f64);
        }

        Ok(aggregated)
    }
}

fn coverage_gap(sources: &[ScoreSource], question_id: QuestionId) -> EnsembleError {
    let source_name = sources
        .iter()
        .find(|source| !source.scores.contains_key(&question_id))
        .map(|source| source.name.clone())
        .unwrap_or_default();
    EnsembleError::KeyCoverageGap {
        question_id,
        source_name,
    }
}
