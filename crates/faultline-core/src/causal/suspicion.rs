//! Counterfactual suspiciousness scoring.
//!
//! Per treatment variable: pick representative treatment values, hold
//! covariates at observed values (missing -> per-variable mean), sweep the
//! treatment feature across the representatives, and average the model's
//! predictions. The score is the spread `max_r avg(r) - min_r avg(r)`: a
//! variable whose value flips the predicted outcome scores high, one the
//! outcome ignores scores zero.

use super::model::{Model, ModelStore};
use super::table::{PreprocessedRow, PreprocessedTable};
use crate::error::{Error, Result};
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct SuspiciousnessScore {
    pub treatment_var: String,
    pub score: f64,
}

/// Representative treatment values for one variable (§ rules: binary ->
/// {0, 1}; 3+ distinct -> min/median/max; otherwise the sorted uniques).
pub fn representative_values(observed: &[f64]) -> Vec<f64> {
    let mut unique: Vec<f64> = Vec::new();
    for &value in observed {
        if value.is_nan() {
            continue;
        }
        if !unique.iter().any(|&u| u == value) {
            unique.push(value);
        }
    }
    unique.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    if unique.iter().all(|&v| v == 0.0 || v == 1.0) {
        return vec![0.0, 1.0];
    }
    if unique.len() >= 3 {
        let median = unique[unique.len() / 2];
        let median = if unique.len() % 2 == 0 {
            (unique[unique.len() / 2 - 1] + unique[unique.len() / 2]) / 2.0
        } else {
            median
        };
        return vec![unique[0], median, unique[unique.len() - 1]];
    }
    unique
}

/// Column means over one treatment variable's rows, ignoring missing values.
fn covariate_means(rows: &[&PreprocessedRow], width: usize) -> Vec<f64> {
    let mut means = vec![0.0; width];
    for (index, mean) in means.iter_mut().enumerate() {
        let mut sum = 0.0;
        let mut count = 0usize;
        for row in rows {
            let value = row.covariates[index];
            if !value.is_nan() {
                sum += value;
                count += 1;
            }
        }
        *mean = if count > 0 { sum / count as f64 } else { 0.0 };
    }
    means
}

/// Score one treatment variable against its model.
fn score_variable(
    rows: &[&PreprocessedRow],
    model: &Model,
    width: usize,
) -> f64 {
    let observed: Vec<f64> = rows.iter().map(|row| row.treatment_val).collect();
    let representatives = representative_values(&observed);
    if representatives.is_empty() || rows.is_empty() {
        return 0.0;
    }
    let means = covariate_means(rows, width);

    let mut averages = Vec::with_capacity(representatives.len());
    for &representative in &representatives {
        let mut total = 0.0;
        for row in rows {
            let mut features: Vec<f64> = row
                .covariates
                .iter()
                .enumerate()
                .map(|(i, &v)| if v.is_nan() { means[i] } else { v })
                .collect();
            features.push(representative);
            // An indifferent 0.5 stands in when the model cannot score the
            // row.
            total += match model.try_predict(&features) {
                Some(prediction) => f64::from(prediction),
                None => 0.5,
            };
        }
        averages.push(total / rows.len() as f64);
    }

    let max = averages.iter().copied().fold(f64::MIN, f64::max);
    let min = averages.iter().copied().fold(f64::MAX, f64::min);
    (max - min).clamp(0.0, 1.0)
}

/// Train a model per treatment variable and persist each artifact.
pub fn train_models(
    table: &PreprocessedTable,
    store: &ModelStore,
    config: &crate::config::PipelineConfig,
) -> Result<Vec<String>> {
    let mut trained = Vec::new();
    for treatment_var in table.treatment_vars() {
        let rows = table.rows_for(&treatment_var);
        let means = covariate_means(&rows, table.covariate_names.len());
        let features: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| {
                let mut f: Vec<f64> = row
                    .covariates
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| if v.is_nan() { means[i] } else { v })
                    .collect();
                f.push(row.treatment_val);
                f
            })
            .collect();
        let outcomes: Vec<u8> = rows.iter().map(|row| row.outcome).collect();
        let mut feature_names = table.covariate_names.clone();
        feature_names.push("TreatmentVal".to_string());
        let model = Model::train(&features, &outcomes, feature_names, config);
        store.save(&treatment_var, &model)?;
        trained.push(treatment_var);
    }
    Ok(trained)
}

/// Score every treatment variable and rank descending. Variables without a
/// model artifact are skipped with a warning.
pub fn rank(table: &PreprocessedTable, store: &ModelStore) -> Vec<SuspiciousnessScore> {
    let width = table.covariate_names.len();
    let mut scores = Vec::new();
    for treatment_var in table.treatment_vars() {
        let model = match store.load(&treatment_var) {
            Ok(model) => model,
            Err(err) => {
                warn!(%treatment_var, %err, "skipping treatment variable");
                continue;
            }
        };
        let rows = table.rows_for(&treatment_var);
        let score = score_variable(&rows, &model, width);
        scores.push(SuspiciousnessScore {
            treatment_var,
            score,
        });
    }
    scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scores
}

/// Render the ranking CSV, scores to five fractional digits.
pub fn ranking_to_csv(scores: &[SuspiciousnessScore]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(["TreatmentVar", "Suspiciousness Score"])
        .map_err(|e| Error::Data(e.to_string()))?;
    for score in scores {
        writer
            .write_record([score.treatment_var.as_str(), &format!("{:.5}", score.score)])
            .map_err(|e| Error::Data(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Data(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::Data(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::causal::table::{parse_raw_csv, preprocess};
    use crate::config::PipelineConfig;
    use proptest::prelude::*;

    #[test]
    fn test_representative_values_rules() {
        assert_eq!(representative_values(&[0.0, 1.0, 0.0]), vec![0.0, 1.0]);
        assert_eq!(representative_values(&[1.0, 1.0]), vec![0.0, 1.0]);
        assert_eq!(
            representative_values(&[5.0, 9.0, 7.0, 5.0]),
            vec![5.0, 7.0, 9.0]
        );
        assert_eq!(representative_values(&[4.0, 2.0]), vec![2.0, 4.0]);
        let five = representative_values(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        assert_eq!(five, vec![10.0, 30.0, 50.0]);
    }

    fn two_treatment_table() -> PreprocessedTable {
        // Treatment a_1: identical outcomes. Treatment b_1: outcome equals
        // its value.
        let csv = "TestArgs,Covariates,TreatmentVar,TreatmentVal,Outcome\n\
                   t1,,a_1,3,1\n\
                   t2,,a_1,4,1\n\
                   t1,,b_1,0,0\n\
                   t2,,b_1,1,1\n\
                   t3,,b_1,0,0\n\
                   t4,,b_1,1,1\n";
        preprocess(&parse_raw_csv(csv).unwrap())
    }

    #[test]
    fn test_constant_treatment_scores_zero_and_separating_scores_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let table = two_treatment_table();
        let config = PipelineConfig::default();
        train_models(&table, &store, &config).unwrap();

        let scores = rank(&table, &store);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].treatment_var, "b_1", "ranked first");
        assert!((scores[0].score - 1.0).abs() < 1e-9);
        assert!(scores[1].score.abs() < 1e-9);
    }

    #[test]
    fn test_missing_model_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::new(dir.path());
        let table = two_treatment_table();
        // No training: nothing to load, so nothing to rank.
        assert!(rank(&table, &store).is_empty());
    }

    #[test]
    fn test_ranking_csv_format() {
        let scores = vec![
            SuspiciousnessScore {
                treatment_var: "b_1".into(),
                score: 1.0,
            },
            SuspiciousnessScore {
                treatment_var: "a_1".into(),
                score: 0.33333333,
            },
        ];
        let csv = ranking_to_csv(&scores).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("TreatmentVar,Suspiciousness Score"));
        assert_eq!(lines.next(), Some("b_1,1.00000"));
        assert_eq!(lines.next(), Some("a_1,0.33333"));
    }

    proptest! {
        /// Scores stay in [0, 1] and come out sorted non-increasing for any
        /// mix of outcomes and treatment values.
        #[test]
        fn prop_scores_bounded_and_sorted(
            data in proptest::collection::vec((0u8..4, 0f64..10.0, 0u8..2), 4..24)
        ) {
            let mut body = String::from("TestArgs,Covariates,TreatmentVar,TreatmentVal,Outcome\n");
            for (var, val, outcome) in &data {
                body.push_str(&format!("t,,v{var}_1,{val},{outcome}\n"));
            }
            let table = preprocess(&parse_raw_csv(&body).unwrap());
            let dir = tempfile::tempdir().unwrap();
            let store = ModelStore::new(dir.path());
            train_models(&table, &store, &PipelineConfig::default()).unwrap();
            let scores = rank(&table, &store);
            for pair in scores.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
            for score in &scores {
                prop_assert!((0.0..=1.0).contains(&score.score));
            }
        }
    }
}
