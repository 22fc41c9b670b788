use indexmap::IndexMap;
use qa_ensemble::aggregate::{selector::best_text, AnswerAggregator, PredictionSelector, ScoreAggregator};
use qa_ensemble::artifacts::{CandidateSource, ScoreSource};
use qa_ensemble::config::CoveragePolicy;
use qa_ensemble::{AggregatedScore, CandidateAnswer, EnsembleError, WeightVector};

fn score_source(name: &str, entries: &[(&str, f64)]) -> ScoreSource {
    ScoreSource::new(
        name,
        entries
            .iter()
            .map(|(id, score)| (id.to_string(), *score))
            .collect(),
    )
}

fn candidate_source(name: &str, entries: Vec<(&str, Vec<(&str, f64)>)>) -> CandidateSource {
    CandidateSource::new(
        name,
        entries
            .into_iter()
            .map(|(id, answers)| {
                let answers = answers
                    .into_iter()
                    .map(|(text, probability)| CandidateAnswer::new(text, probability))
                    .collect();
                (id.to_string(), answers)
            })
            .collect(),
    )
}

fn weights(values: &[f64]) -> WeightVector {
    WeightVector::new(values.to_vec())
}

#[test]
fn uniform_ensemble_divides_by_source_count() {
    let sources = vec![
        score_source("a", &[("q1", 0.2)]),
        score_source("b", &[("q1", 0.8)]),
    ];

    let aggregated = ScoreAggregator::default()
        .aggregate(&sources, &weights(&[0.5, 0.5]))
        .unwrap();

    assert!((aggregated["q1"] - 0.25).abs() < 1e-9);

    let mut masses = IndexMap::new();
    masses.insert("paris".to_string(), 0.4);
    let mut candidates = IndexMap::new();
    candidates.insert("q1".to_string(), masses);

    let predictions = PredictionSelector::new(0.3).select(&aggregated, &candidates).unwrap();
    assert_eq!(predictions["q1"], "paris");
}

#[test]
fn candidate_masses_merge_by_summation() {
    let sources = vec![
        candidate_source("a", vec![("q2", vec![("paris", 0.6)])]),
        candidate_source("b", vec![("q2", vec![("paris", 0.3), ("france", 0.4)])]),
    ];

    let aggregated = AnswerAggregator::default()
        .aggregate(&sources, &weights(&[0.5, 0.5]))
        .unwrap();

    let masses = &aggregated["q2"];
    assert_eq!(masses.len(), 2);
    assert!((masses["paris"] - 0.45).abs() < 1e-9);
    assert!((masses["france"] - 0.2).abs() < 1e-9);
    assert_eq!(best_text(masses), Some("paris"));
}

#[test]
fn repeated_text_within_one_source_accumulates() {
    let sources = vec![candidate_source(
        "a",
        vec![("q1", vec![("blue", 0.2), ("red", 0.3), ("blue", 0.2)])],
    )];

    let aggregated = AnswerAggregator::default()
        .aggregate(&sources, &weights(&[1.0]))
        .unwrap();

    assert!((aggregated["q1"]["blue"] - 0.4).abs() < 1e-9);
    assert_eq!(best_text(&aggregated["q1"]), Some("blue"));
}

#[test]
fn score_above_threshold_predicts_no_answer() {
    let mut scores = AggregatedScore::new();
    scores.insert("q3".to_string(), 0.9);
    let mut masses = IndexMap::new();
    masses.insert("anything".to_string(), 1.0);
    let mut candidates = IndexMap::new();
    candidates.insert("q3".to_string(), masses);

    let predictions = PredictionSelector::new(0.5).select(&scores, &candidates).unwrap();

    assert_eq!(predictions["q3"], "");
}

#[test]
fn score_equal_to_threshold_is_answered() {
    let mut scores = AggregatedScore::new();
    scores.insert("q".to_string(), 0.5);
    let mut masses = IndexMap::new();
    masses.insert("yes".to_string(), 0.1);
    let mut candidates = IndexMap::new();
    candidates.insert("q".to_string(), masses);

    let predictions = PredictionSelector::new(0.5).select(&scores, &candidates).unwrap();

    assert_eq!(predictions["q"], "yes");
}

#[test]
fn exact_ties_keep_first_seen_text_across_sources() {
    let sources = vec![
        candidate_source("a", vec![("q", vec![("alpha", 0.5)])]),
        candidate_source("b", vec![("q", vec![("beta", 0.5)])]),
    ];

    for _ in 0..3 {
        let aggregated = AnswerAggregator::default()
            .aggregate(&sources, &weights(&[1.0, 1.0]))
            .unwrap();
        assert_eq!(best_text(&aggregated["q"]), Some("alpha"));
    }

    let reversed = vec![sources[1].clone(), sources[0].clone()];
    let aggregated = AnswerAggregator::default()
        .aggregate(&reversed, &weights(&[1.0, 1.0]))
        .unwrap();
    assert_eq!(best_text(&aggregated["q"]), Some("beta"));
}

#[test]
fn aggregation_is_deterministic() {
    let scores = vec![
        score_source("a", &[("q1", 0.13), ("q2", -1.7), ("q3", 4.25)]),
        score_source("b", &[("q1", 0.91), ("q2", 2.2), ("q3", -0.03)]),
        score_source("c", &[("q1", 0.33), ("q2", 0.0), ("q3", 1.1)]),
    ];
    let candidates = vec![
        candidate_source("a", vec![("q1", vec![("x", 0.7), ("y", 0.2)])]),
        candidate_source("b", vec![("q1", vec![("y", 0.6), ("z", 0.3)])]),
        candidate_source("c", vec![("q1", vec![("z", 0.9)])]),
    ];
    let score_weights = weights(&[0.1, 0.3, 0.6]);
    let candidate_weights = weights(&[0.25, 0.35, 0.4]);

    let aggregator = ScoreAggregator::default();
    let first = aggregator.aggregate(&scores, &score_weights).unwrap();
    let second = aggregator.aggregate(&scores, &score_weights).unwrap();
    for (key, value) in &first {
        assert_eq!(value.to_bits(), second[key.as_str()].to_bits());
    }

    let first = AnswerAggregator::default().aggregate(&candidates, &candidate_weights).unwrap();
    let second = AnswerAggregator::default().aggregate(&candidates, &candidate_weights).unwrap();
    assert_eq!(first, second);
    let first_keys: Vec<&String> = first["q1"].keys().collect();
    assert_eq!(first_keys, vec!["x", "y", "z"]);
}

#[test]
fn raising_threshold_never_withdraws_an_answer() {
    let mut scores = AggregatedScore::new();
    let mut candidates = IndexMap::new();
    for (idx, score) in [-0.4, 0.1, 0.25, 0.6, 1.3].iter().enumerate() {
        let id = format!("q{}", idx);
        scores.insert(id.clone(), *score);
        let mut masses = IndexMap::new();
        masses.insert(format!("answer{}", idx), 0.5);
        candidates.insert(id, masses);
    }

    let thresholds = [-1.0, 0.0, 0.2, 0.5, 1.0, 2.0];
    for pair in thresholds.windows(2) {
        let low = PredictionSelector::new(pair[0]).select(&scores, &candidates).unwrap();
        let high = PredictionSelector::new(pair[1]).select(&scores, &candidates).unwrap();
        for (id, answer) in &low {
            if !answer.is_empty() {
                assert_eq!(&high[id.as_str()], answer);
            }
        }
    }
}

#[test]
fn strict_policy_reports_coverage_gap() {
    let sources = vec![
        score_source("model-a", &[("q1", 0.2), ("q2", 0.4)]),
        score_source("model-b", &[("q1", 0.8)]),
    ];

    let err = ScoreAggregator::new(CoveragePolicy::Strict)
        .aggregate(&sources, &weights(&[0.5, 0.5]))
        .unwrap_err();

    match err {
        EnsembleError::KeyCoverageGap {
            question_id,
            source_name,
        } => {
            assert_eq!(question_id, "q2");
            assert_eq!(source_name, "model-b");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn partial_policy_divides_by_contributing_sources() {
    let sources = vec![
        score_source("a", &[("q1", 0.2), ("q2", 0.4)]),
        score_source("b", &[("q1", 0.8)]),
    ];

    let aggregated = ScoreAggregator::new(CoveragePolicy::Partial)
        .aggregate(&sources, &weights(&[0.5, 0.5]))
        .unwrap();

    assert!((aggregated["q1"] - 0.25).abs() < 1e-9);
    assert!((aggregated["q2"] - 0.2).abs() < 1e-9);
}

#[test]
fn selector_requires_a_score_for_every_answered_question() {
    let scores = AggregatedScore::new();
    let mut masses = IndexMap::new();
    masses.insert("text".to_string(), 1.0);
    let mut candidates = IndexMap::new();
    candidates.insert("orphan".to_string(), masses);

    let err = PredictionSelector::new(0.0).select(&scores, &candidates).unwrap_err();

    assert!(matches!(err, EnsembleError::MissingKey { question_id } if question_id == "orphan"));
}

#[test]
fn empty_candidate_list_yields_empty_answer() {
    let sources = vec![candidate_source("a", vec![("q", vec![])])];
    let aggregated = AnswerAggregator::default()
        .aggregate(&sources, &weights(&[1.0]))
        .unwrap();
    let mut scores = AggregatedScore::new();
    scores.insert("q".to_string(), -5.0);

    let predictions = PredictionSelector::new(0.0).select(&scores, &aggregated).unwrap();

    assert_eq!(predictions["q"], "");
}

#[test]
fn weight_count_must_match_sources() {
    let sources = vec![score_source("a", &[("q1", 0.2)])];

    let err = ScoreAggregator::default()
        .aggregate(&sources, &weights(&[0.5, 0.5]))
        .unwrap_err();

    assert!(matches!(err, EnsembleError::InvalidConfiguration(_)));
}

#[test]
fn strict_policy_reports_missing_candidate_list() {
    let scores = vec![
        score_source("a", &[("q1", -1.0)]),
        score_source("b", &[("q1", -1.0)]),
    ];
    let candidates = vec![
        candidate_source("a", vec![("q1", vec![("x", 0.9)])]),
        candidate_source("b", vec![("q2", vec![("y", 0.8)])]),
    ];
    let equal = weights(&[0.5, 0.5]);

    let aggregated = ScoreAggregator::new(CoveragePolicy::Strict)
        .aggregate(&scores, &equal)
        .unwrap();
    assert!((aggregated["q1"] + 0.5).abs() < 1e-9);

    let err = AnswerAggregator::new(CoveragePolicy::Strict)
        .aggregate(&candidates, &equal)
        .unwrap_err();

    match err {
        EnsembleError::KeyCoverageGap {
            question_id,
            source_name,
        } => {
            assert_eq!(question_id, "q1");
            assert_eq!(source_name, "b");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn partial_policy_merges_whatever_candidates_exist() {
    let candidates = vec![
        candidate_source("a", vec![("q1", vec![("x", 0.9)])]),
        candidate_source("b", vec![("q2", vec![("y", 0.8)])]),
    ];

    let aggregated = AnswerAggregator::new(CoveragePolicy::Partial)
        .aggregate(&candidates, &weights(&[0.5, 0.5]))
        .unwrap();

    assert!((aggregated["q1"]["x"] - 0.45).abs() < 1e-9);
    assert!((aggregated["q2"]["y"] - 0.4).abs() < 1e-9);
}
