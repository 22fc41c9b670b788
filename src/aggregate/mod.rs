pub mod answers;
pub mod scores;
pub mod selector;

pub use answers::AnswerAggregator;
pub use scores::ScoreAggregator;
pub use selector::PredictionSelector;

use crate::error::{EnsembleError, Result};
use crate::WeightVector;

fn check_weight_count(weights: &WeightVector, sources: usize, label: &str) -> Result<()> {
    if weights.len() != sources {
        return Err(EnsembleError::config(format!(
            "{} weights have {} components for {} sources",
            label,
            weights.len(),
            sources
        )));
    }
    Ok(())
}
