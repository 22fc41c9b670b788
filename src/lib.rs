pub mod aggregate;
pub mod artifacts;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod search;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::error::{EnsembleError, Result};

pub type QuestionId = String;

pub type AnswerabilityScoreSet = IndexMap<QuestionId, f64>;

pub type CandidateListSet = IndexMap<QuestionId, Vec<CandidateAnswer>>;

pub type AggregatedScore = IndexMap<QuestionId, f64>;

pub type AggregatedCandidates = IndexMap<QuestionId, IndexMap<String, f64>>;

pub type PredictionMap = IndexMap<QuestionId, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAnswer {
    pub text: String,
    pub probability: f64,
}

impl CandidateAnswer {
    pub fn new(text: impl Into<String>, probability: f64) -> Self {
        Self {
            text: text.into(),
            probability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn ones(len: usize) -> Self {
        Self(vec![1.0; len])
    }

    pub fn from_units(units: &[u32]) -> Self {
        Self(units.iter().map(|unit| f64::from(*unit) / 100.0).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }
}

impl fmt::Display for WeightVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (idx, value) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", value)?;
        }
        write!(f, "]")
    }
}
