use indexmap::IndexMap;
use serde_json::json;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::{EnsembleError, Result};
use crate::evaluation::{Benchmark, MetricEvaluator, MetricReport};
use crate::{AggregatedScore, PredictionMap, QuestionId};

#[derive(Debug, Clone)]
pub struct SquadEvaluator {
    benchmark: Benchmark,
}

impl SquadEvaluator {
    pub fn new(benchmark: Benchmark) -> Self {
        Self { benchmark }
    }
}

struct RawScores {
    exact: IndexMap<QuestionId, f64>,
    f1: IndexMap<QuestionId, f64>,
    has_answer: IndexMap<QuestionId, bool>,
}

impl MetricEvaluator for SquadEvaluator {
    fn evaluate(
        &self,
        predictions: &PredictionMap,
        na_scores: &AggregatedScore,
        threshold: f64,
    ) -> Result<MetricReport> {
        if self.benchmark.is_empty() {
            return Err(EnsembleError::MetricFailure(
                "benchmark contains no questions".to_string(),
            ));
        }

        let raw = self.raw_scores(predictions, na_scores)?;

        let exact = apply_no_answer_threshold(&raw.exact, na_scores, &raw.has_answer, threshold);
        let f1 = apply_no_answer_threshold(&raw.f1, na_scores, &raw.has_answer, threshold);

        let (best_exact, best_exact_thresh) =
            find_best_threshold(predictions, &raw.exact, na_scores, &raw.has_answer);
        let (best_f1, best_f1_thresh) =
            find_best_threshold(predictions, &raw.f1, na_scores, &raw.has_answer);

        let mut report = MetricReport::new(best_f1, best_f1_thresh);
        report.extra.insert("exact".into(), json!(percent_mean(exact.values())));
        report.extra.insert("f1".into(), json!(percent_mean(f1.values())));
        report.extra.insert("total".into(), json!(exact.len()));

        if self.benchmark.is_two_class() {
            for (prefix, wanted) in [("HasAns", true), ("NoAns", false)] {
                let ids: Vec<&QuestionId> = raw
                    .has_answer
                    .iter()
                    .filter(|(_, has_answer)| **has_answer == wanted)
                    .map(|(question_id, _)| question_id)
                    .collect();
                if ids.is_empty() {
                    continue;
                }
                let subset_exact = percent_mean(ids.iter().map(|id| &exact[id.as_str()]));
                let subset_f1 = percent_mean(ids.iter().map(|id| &f1[id.as_str()]));
                report.extra.insert(format!("{}_exact", prefix), json!(subset_exact));
                report.extra.insert(format!("{}_f1", prefix), json!(subset_f1));
                report.extra.insert(format!("{}_total", prefix), json!(ids.len()));
            }
        }

        report.extra.insert("best_exact".into(), json!(best_exact));
        report.extra.insert("best_exact_thresh".into(), json!(best_exact_thresh));
        Ok(report)
    }
}

impl SquadEvaluator {
    fn raw_scores(&self, predictions: &PredictionMap, na_scores: &AggregatedScore) -> Result<RawScores> {
        let mut raw = RawScores {
            exact: IndexMap::with_capacity(self.benchmark.len()),
            f1: IndexMap::with_capacity(self.benchmark.len()),
            has_answer: IndexMap::with_capacity(self.benchmark.len()),
        };

        for (question_id, gold) in self.benchmark.iter() {
            let prediction = predictions.get(question_id).ok_or_else(|| {
                EnsembleError::KeyCoverageGap {
                    question_id: question_id.clone(),
                    source_name: "ensemble predictions".to_string(),
                }
            })?;
            if !na_scores.contains_key(question_id) {
                return Err(EnsembleError::KeyCoverageGap {
                    question_id: question_id.clone(),
                    source_name: "aggregated answerability scores".to_string(),
                });
            }

            let golds: Vec<&str> = if gold.answers.is_empty() {
                vec![""]
            } else {
                gold.answers.iter().map(String::as_str).collect()
            };

            let exact = golds
                .iter()
                .map(|gold| compute_exact(gold, prediction))
                .fold(0.0, f64::max);
            let f1 = golds
                .iter()
                .map(|gold| compute_f1(gold, prediction))
                .fold(0.0, f64::max);

            raw.exact.insert(question_id.clone(), exact);
            raw.f1.insert(question_id.clone(), f1);
            raw.has_answer.insert(question_id.clone(), gold.has_answer);
        }

        Ok(raw)
    }
}

pub fn normalize_answer(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped: String = lowered.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    stripped
        .split_whitespace()
        .filter(|token| !matches!(*token, "a" | "an" | "the"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn compute_exact(gold: &str, prediction: &str) -> f64 {
    if normalize_answer(gold) == normalize_answer(prediction) {
        1.0
    } else {
        0.0
    }
}

pub fn compute_f1(gold: &str, prediction: &str) -> f64 {
    let gold_normalized = normalize_answer(gold);
    let prediction_normalized = normalize_answer(prediction);
    let gold_tokens: Vec<&str> = gold_normalized.split_whitespace().collect();
    let prediction_tokens: Vec<&str> = prediction_normalized.split_whitespace().collect();

    if gold_tokens.is_empty() || prediction_tokens.is_empty() {
        return if gold_tokens == prediction_tokens { 1.0 } else { 0.0 };
    }

    let mut gold_counts: HashMap<&str, usize> = HashMap::new();
    for token in &gold_tokens {
        *gold_counts.entry(*token).or_insert(0) += 1;
    }
    let mut common = 0usize;
    for token in &prediction_tokens {
        if let Some(count) = gold_counts.get_mut(token) {
            if *count > 0 {
                *count -= 1;
                common += 1;
            }
        }
    }

    if common == 0 {
        return 0.0;
    }
    let precision = common as f64 / prediction_tokens.len() as f64;
    let recall = common as f64 / gold_tokens.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

fn apply_no_answer_threshold(
    scores: &IndexMap<QuestionId, f64>,
    na_scores: &AggregatedScore,
    has_answer: &IndexMap<QuestionId, bool>,
    threshold: f64,
) -> IndexMap<QuestionId, f64> {
    scores
        .iter()
        .map(|(question_id, score)| {
            let predicted_no_answer = na_scores
                .get(question_id)
                .is_some_and(|na_score| *na_score > threshold);
            let value = if predicted_no_answer {
                if has_answer[question_id.as_str()] {
                    0.0
                } else {
                    1.0
                }
            } else {
                *score
            };
            (question_id.clone(), value)
        })
        .collect()
}

fn find_best_threshold(
    predictions: &PredictionMap,
    scores: &IndexMap<QuestionId, f64>,
    na_scores: &AggregatedScore,
    has_answer: &IndexMap<QuestionId, bool>,
) -> (f64, f64) {
    let no_answer_count = has_answer.values().filter(|has_answer| !**has_answer).count();
    let mut current = no_answer_count as f64;
    let mut best = current;
    let mut best_threshold = 0.0;

    let mut ordered: Vec<(&QuestionId, f64)> = na_scores
        .iter()
        .filter(|(question_id, _)| scores.contains_key(question_id.as_str()))
        .map(|(question_id, na_score)| (question_id, *na_score))
        .collect();
    ordered.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    for (question_id, na_score) in ordered {
        let diff = if has_answer[question_id.as_str()] {
            scores[question_id.as_str()]
        } else if predictions
            .get(question_id)
            .is_some_and(|prediction| !prediction.is_empty())
        {
            -1.0
        } else {
            0.0
        };
        current += diff;
        if current > best {
            best = current;
            best_threshold = na_score;
        }
    }

    (100.0 * best / scores.len() as f64, best_threshold)
}

fn percent_mean<'a>(values: impl Iterator<Item = &'a f64>) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for value in values {
        total += value;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        100.0 * total / count as f64
    }
}
