//! Raw-table preprocessing.
//!
//! Decomposes the aggregator's Covariates column into one column per
//! discovered covariate, decides numeric vs categorical per column (numeric
//! iff every observed value parses as a real), label-encodes categoricals in
//! first-seen order, and median-imputes missing numerics. Treatment values
//! are encoded by the same rule, per treatment variable. Outcomes normalize
//! `1`/`true`/`pass` to 1 and everything else to 0.

use crate::aggregate::{HEADERS, MISSING_VALUE};
use crate::error::{Error, Result};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use tracing::warn;

/// One raw row of the execution table, still textual.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub test_args: String,
    pub covariates: Vec<(String, String)>,
    pub treatment_var: String,
    pub treatment_val: String,
    pub outcome: u8,
}

/// Columnar table ready for training and counterfactual evaluation.
#[derive(Debug)]
pub struct PreprocessedTable {
    /// Column order: numeric covariates in discovery order, then categorical.
    pub covariate_names: Vec<String>,
    pub rows: Vec<PreprocessedRow>,
}

#[derive(Debug, Clone)]
pub struct PreprocessedRow {
    pub test_args: String,
    /// Aligned with `covariate_names`; missing values are NaN.
    pub covariates: Vec<f64>,
    pub treatment_var: String,
    pub treatment_val: f64,
    pub outcome: u8,
}

impl PreprocessedTable {
    /// Treatment variables in first-appearance order.
    pub fn treatment_vars(&self) -> Vec<String> {
        let mut vars: IndexSet<String> = IndexSet::new();
        for row in &self.rows {
            vars.insert(row.treatment_var.clone());
        }
        vars.into_iter().collect()
    }

    pub fn rows_for(&self, treatment_var: &str) -> Vec<&PreprocessedRow> {
        self.rows
            .iter()
            .filter(|row| row.treatment_var == treatment_var)
            .collect()
    }

    /// Render as CSV: TestArgs, one column per covariate, TreatmentVar,
    /// TreatmentVal, Outcome.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        let mut header = vec!["TestArgs".to_string()];
        header.extend(self.covariate_names.iter().cloned());
        header.extend(["TreatmentVar".into(), "TreatmentVal".into(), "Outcome".into()]);
        writer
            .write_record(&header)
            .map_err(|e| Error::Data(e.to_string()))?;
        for row in &self.rows {
            let mut record = vec![row.test_args.clone()];
            for value in &row.covariates {
                record.push(format_number(*value));
            }
            record.push(row.treatment_var.clone());
            record.push(format_number(row.treatment_val));
            record.push(row.outcome.to_string());
            writer
                .write_record(&record)
                .map_err(|e| Error::Data(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| Error::Data(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| Error::Data(e.to_string()))
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        MISSING_VALUE.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Parse the aggregator's CSV output. Rows with the wrong arity or an
/// unparseable outcome are dropped and counted.
pub fn parse_raw_csv(content: &str) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());
    {
        let headers = reader.headers().map_err(|e| Error::Data(e.to_string()))?;
        if headers.len() != HEADERS.len() {
            return Err(Error::Data(format!(
                "expected {} columns, found {}",
                HEADERS.len(),
                headers.len()
            )));
        }
    }

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        if record.len() != HEADERS.len() {
            dropped += 1;
            continue;
        }
        let outcome = match record[4].trim() {
            "1" | "true" | "pass" => 1,
            _ => 0,
        };
        let covariates = record[1]
            .split(';')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                pair.split_once('=')
                    .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            })
            .collect();
        rows.push(RawRow {
            test_args: record[0].to_string(),
            covariates,
            treatment_var: record[2].to_string(),
            treatment_val: record[3].to_string(),
            outcome,
        });
    }
    if dropped > 0 {
        warn!(dropped, "dropped malformed execution-table rows");
    }
    Ok(rows)
}

/// A column is numeric iff every observed (non-missing) value parses.
fn is_numeric_column(values: &[&str]) -> bool {
    let mut saw_value = false;
    for value in values {
        if *value == MISSING_VALUE {
            continue;
        }
        saw_value = true;
        if parse_value(value).is_none() {
            return false;
        }
    }
    saw_value
}

/// Numbers plus the boolean spellings the tracer produces.
fn parse_value(value: &str) -> Option<f64> {
    match value {
        "true" => Some(1.0),
        "false" => Some(0.0),
        _ => value.parse::<f64>().ok(),
    }
}

fn median(values: &mut Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    }
}

/// Build the preprocessed table from raw rows.
pub fn preprocess(raw: &[RawRow]) -> PreprocessedTable {
    // Discover covariates and their observed values, in insertion order.
    let mut observed: IndexMap<String, Vec<String>> = IndexMap::new();
    for row in raw {
        for (name, value) in &row.covariates {
            observed.entry(name.clone()).or_default().push(value.clone());
        }
    }

    let mut numeric_names = Vec::new();
    let mut categorical_names = Vec::new();
    for (name, values) in &observed {
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        if is_numeric_column(&refs) {
            numeric_names.push(name.clone());
        } else {
            categorical_names.push(name.clone());
        }
    }

    // Label-encode categoricals in first-seen order.
    let mut encodings: FxHashMap<String, IndexSet<String>> = FxHashMap::default();
    for name in &categorical_names {
        let mut labels = IndexSet::new();
        for value in &observed[name] {
            labels.insert(value.clone());
        }
        encodings.insert(name.clone(), labels);
    }

    let covariate_names: Vec<String> = numeric_names
        .iter()
        .chain(categorical_names.iter())
        .cloned()
        .collect();

    // Per-treatment encoding rule for treatment values.
    let mut treatment_values: IndexMap<String, Vec<String>> = IndexMap::new();
    for row in raw {
        treatment_values
            .entry(row.treatment_var.clone())
            .or_default()
            .push(row.treatment_val.clone());
    }
    let mut treatment_encodings: FxHashMap<String, IndexSet<String>> = FxHashMap::default();
    for (var, values) in &treatment_values {
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        if !is_numeric_column(&refs) {
            let mut labels = IndexSet::new();
            for value in values {
                labels.insert(value.clone());
            }
            treatment_encodings.insert(var.clone(), labels);
        }
    }

    let mut rows = Vec::with_capacity(raw.len());
    for row in raw {
        let lookup: FxHashMap<&str, &str> = row
            .covariates
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let covariates: Vec<f64> = covariate_names
            .iter()
            .map(|name| {
                let Some(&value) = lookup.get(name.as_str()) else {
                    return f64::NAN;
                };
                if value == MISSING_VALUE {
                    return f64::NAN;
                }
                match encodings.get(name) {
                    Some(labels) => labels
                        .get_index_of(value)
                        .map(|i| i as f64)
                        .unwrap_or(f64::NAN),
                    None => parse_value(value).unwrap_or(f64::NAN),
                }
            })
            .collect();
        let treatment_val = match treatment_encodings.get(&row.treatment_var) {
            Some(labels) => labels
                .get_index_of(row.treatment_val.as_str())
                .map(|i| i as f64)
                .unwrap_or(f64::NAN),
            None => parse_value(&row.treatment_val).unwrap_or(f64::NAN),
        };
        rows.push(PreprocessedRow {
            test_args: row.test_args.clone(),
            covariates,
            treatment_var: row.treatment_var.clone(),
            treatment_val,
            outcome: row.outcome,
        });
    }

    // Median-impute numeric covariates.
    for (index, name) in covariate_names.iter().enumerate() {
        if encodings.contains_key(name) {
            continue;
        }
        let mut present: Vec<f64> = rows
            .iter()
            .filter_map(|row| {
                let v = row.covariates[index];
                (!v.is_nan()).then_some(v)
            })
            .collect();
        let fill = median(&mut present);
        for row in &mut rows {
            if row.covariates[index].is_nan() {
                row.covariates[index] = fill;
            }
        }
    }

    PreprocessedTable {
        covariate_names,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(covariates: &str, var: &str, val: &str, outcome: &str) -> String {
        format!("t,{covariates},{var},{val},{outcome}\n")
    }

    fn table(body: &str) -> PreprocessedTable {
        let csv = format!("TestArgs,Covariates,TreatmentVar,TreatmentVal,Outcome\n{body}");
        preprocess(&parse_raw_csv(&csv).unwrap())
    }

    #[test]
    fn test_numeric_and_categorical_split() {
        let body = format!(
            "{}{}",
            raw("a=1;b=red", "x_1", "3", "0"),
            raw("a=2;b=blue", "x_1", "4", "1"),
        );
        let t = table(&body);
        assert_eq!(t.covariate_names, vec!["a".to_string(), "b".into()]);
        assert_eq!(t.rows[0].covariates, vec![1.0, 0.0]);
        assert_eq!(t.rows[1].covariates, vec![2.0, 1.0], "labels in first-seen order");
    }

    #[test]
    fn test_boolean_values_are_numeric() {
        let body = format!(
            "{}{}",
            raw("p=true", "x_1", "true", "0"),
            raw("p=false", "x_1", "false", "1"),
        );
        let t = table(&body);
        assert_eq!(t.rows[0].covariates, vec![1.0]);
        assert_eq!(t.rows[1].treatment_val, 0.0);
    }

    #[test]
    fn test_missing_numeric_median_imputed() {
        let body = format!(
            "{}{}{}",
            raw("a=1", "x_1", "1", "0"),
            raw("a=N/A", "x_1", "2", "0"),
            raw("a=5", "x_1", "3", "1"),
        );
        let t = table(&body);
        assert_eq!(t.rows[1].covariates[0], 3.0, "median of {{1, 5}}");
    }

    #[test]
    fn test_outcome_normalization() {
        let body = format!(
            "{}{}{}",
            raw("", "x_1", "1", "pass"),
            raw("", "x_1", "2", "true"),
            raw("", "x_1", "3", "0"),
        );
        let rows = parse_raw_csv(&format!(
            "TestArgs,Covariates,TreatmentVar,TreatmentVal,Outcome\n{body}"
        ))
        .unwrap();
        assert_eq!(rows[0].outcome, 1);
        assert_eq!(rows[1].outcome, 1);
        assert_eq!(rows[2].outcome, 0);
    }

    #[test]
    fn test_wrong_arity_rows_dropped_and_odd_outcomes_are_zero() {
        let csv = "TestArgs,Covariates,TreatmentVar,TreatmentVal,Outcome\n\
                   t,,x_1,1,0\n\
                   t,,x_1,2\n\
                   t,,x_1,3,banana\n";
        let rows = parse_raw_csv(csv).unwrap();
        assert_eq!(rows.len(), 2, "short row dropped");
        assert_eq!(rows[1].outcome, 0, "unknown outcome text normalizes to 0");
    }

    #[test]
    fn test_treatment_vars_in_first_appearance_order() {
        let body = format!(
            "{}{}{}",
            raw("", "b_1", "1", "0"),
            raw("", "a_1", "1", "0"),
            raw("", "b_1", "2", "1"),
        );
        let t = table(&body);
        assert_eq!(t.treatment_vars(), vec!["b_1".to_string(), "a_1".into()]);
        assert_eq!(t.rows_for("b_1").len(), 2);
    }

    #[test]
    fn test_preprocessed_csv_shape() {
        let body = format!(
            "{}{}",
            raw("a=1", "x_1", "3", "0"),
            raw("a=2", "x_1", "4", "1"),
        );
        let t = table(&body);
        let csv = t.to_csv_string().unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("TestArgs,a,TreatmentVar,TreatmentVal,Outcome"));
        assert_eq!(lines.next(), Some("t,1,x_1,3,0"));
    }
}
