use crate::aggregate::check_weight_count;
use crate::artifacts::CandidateSource;
use crate::config::CoveragePolicy;
use crate::error::{EnsembleError, Result};
use crate::{AggregatedCandidates, WeightVector};

/// Sums weighted candidate probabilities per answer text.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnswerAggregator {
    policy: CoveragePolicy,
}

impl AnswerAggregator {
    pub fn new(policy: CoveragePolicy) -> Self {
        Self { policy }
    }

    pub fn aggregate(
        &self,
        sources: &[CandidateSource],
        weights: &WeightVector,
    ) -> Result<AggregatedCandidates> {
        check_weight_count(weights, sources.len(), "candidate")?;

        let mut aggregated = AggregatedCandidates::new();
        for (source, weight) in sources.iter().zip(weights.iter()) {
            for (question_id, entries) in &source.candidates {
                let masses = aggregated.entry(question_id.clone()).or_default();
                for entry in entries {
                    *masses.entry(entry.text.clone()).or_insert(0.0) += weight * entry.probability;
                }
            }
        }

        if self.policy == CoveragePolicy::Strict {
            for question_id in aggregated.keys() {
                if let Some(source) = sources
                    .iter()
                    .find(|source| !source.candidates.contains_key(question_id))
                {
                    return Err(EnsembleError::KeyCoverageGap {
                        question_id: question_id.clone(),
                        source_name: source.name.clone(),
                    });
                }
            }
        }

        Ok(aggregated)
    }
}
