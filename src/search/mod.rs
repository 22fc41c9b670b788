pub mod grid;
pub mod optimizer;

pub use grid::{SimplexGrid, SimplexPoints};
pub use optimizer::{BestTrial, GridSearchOptimizer, SearchOutcome, TrialResult};
