use indexmap::IndexMap;

use crate::error::{EnsembleError, Result};
use crate::{AggregatedCandidates, AggregatedScore, PredictionMap};

#[derive(Debug, Clone, Copy)]
pub struct PredictionSelector {
    threshold: f64,
}

impl PredictionSelector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Picks one answer per question that has candidates. A question whose
    /// aggregated score exceeds the threshold is answered with "".
    pub fn select(
        &self,
        scores: &AggregatedScore,
        candidates: &AggregatedCandidates,
    ) -> Result<PredictionMap> {
        let mut predictions = PredictionMap::with_capacity(candidates.len());
        for (question_id, masses) in candidates {
            let null_score = scores.get(question_id).ok_or_else(|| EnsembleError::MissingKey {
                question_id: question_id.clone(),
            })?;

            let answer = if *null_score > self.threshold {
                String::new()
            } else {
                best_text(masses).map(str::to_string).unwrap_or_default()
            };
            predictions.insert(question_id.clone(), answer);
        }
        Ok(predictions)
    }
}

/// Highest-mass text; on exact ties the earliest inserted text wins.
pub fn best_text(masses: &IndexMap<String, f64>) -> Option<&str> {
    let mut best: Option<(&str, f64)> = None;
    for (text, mass) in masses {
        let replace = match best {
            Some((_, best_mass)) => *mass > best_mass,
            None => true,
        };
        if replace {
            best = Some((text.as_str(), *mass));
        }
    }
    best.map(|(text, _)| text)
}
