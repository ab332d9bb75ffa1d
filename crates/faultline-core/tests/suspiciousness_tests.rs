//! Suspiciousness scenario: a two-treatment table where one variable's value
//! never explains the outcome and the other separates it perfectly.

use faultline_core::aggregate::LogAggregator;
use faultline_core::causal::{parse_raw_csv, preprocess, rank, ranking_to_csv, train_models, ModelStore};
use faultline_core::transform::ParentMap;
use faultline_core::PipelineConfig;

/// Build the raw table through the aggregator, as the pipeline would.
fn two_treatment_table() -> String {
    let mut aggregator = LogAggregator::new(ParentMap::new());
    // Treatment a_1 only appears in failing tests, so its rows carry one
    // outcome class; treatment b_1's value equals the outcome everywhere.
    for (test, a, b, outcome) in [
        ("t1", None, "0", 0),
        ("t2", Some("4"), "1", 1),
        ("t3", None, "0", 0),
        ("t4", Some("3"), "1", 1),
        ("t5", Some("5"), "1", 1),
        ("t6", None, "0", 0),
    ] {
        let mut lines = Vec::new();
        if let Some(a) = a {
            lines.push(format!("a_1 = {a}"));
        }
        lines.push(format!("b_1 = {b}"));
        aggregator.add_test(test, &lines, outcome);
    }
    aggregator.to_csv_string().expect("csv renders")
}

#[test]
fn test_separating_treatment_outranks_inert_one() {
    let table = preprocess(&parse_raw_csv(&two_treatment_table()).unwrap());
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    let config = PipelineConfig::default();
    train_models(&table, &store, &config).unwrap();

    let scores = rank(&table, &store);
    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0].treatment_var, "b_1");
    assert!(
        (scores[0].score - 1.0).abs() < 1e-9,
        "b_1 separates outcomes: avg(1.0) - avg(0.0) = 1"
    );
    assert!(
        scores[0].score > scores[1].score,
        "ranking is descending: {scores:?}"
    );
}

#[test]
fn test_constant_outcome_treatment_scores_zero() {
    let mut aggregator = LogAggregator::new(ParentMap::new());
    for test in ["t1", "t2", "t3"] {
        aggregator.add_test(test, &["c_1 = 7".to_string()], 1);
    }
    let table = preprocess(&parse_raw_csv(&aggregator.to_csv_string().unwrap()).unwrap());
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    train_models(&table, &store, &PipelineConfig::default()).unwrap();

    let scores = rank(&table, &store);
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].score, 0.0, "constant predictor spreads nothing");
}

#[test]
fn test_ranking_csv_is_sorted_and_formatted() {
    let table = preprocess(&parse_raw_csv(&two_treatment_table()).unwrap());
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::new(dir.path());
    train_models(&table, &store, &PipelineConfig::default()).unwrap();
    let scores = rank(&table, &store);
    let csv = ranking_to_csv(&scores).unwrap();

    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("TreatmentVar,Suspiciousness Score"));
    let parsed: Vec<f64> = lines
        .map(|line| line.split(',').nth(1).unwrap().parse().unwrap())
        .collect();
    assert!(parsed.windows(2).all(|pair| pair[0] >= pair[1]));
    for score in parsed {
        assert!((0.0..=1.0).contains(&score));
    }
}
