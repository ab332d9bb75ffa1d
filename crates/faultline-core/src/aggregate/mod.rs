//! Per-test trace aggregation.
//!
//! Each test contributes one row per surviving treatment variable: the
//! variable's final logged value, the last values of its parent-map parents
//! as covariates, and the test outcome. `temp*` and `*_debug` names are
//! bookkeeping, not treatments, and are filtered out. Rows append in test
//! submission order; within a test, in first-appearance order of the
//! treatment variable.

use crate::error::{Error, Result};
use crate::trace::TEST_SEPARATOR;
use crate::transform::ParentMap;
use indexmap::IndexMap;

/// Fixed output header.
pub const HEADERS: [&str; 5] = [
    "TestArgs",
    "Covariates",
    "TreatmentVar",
    "TreatmentVal",
    "Outcome",
];

/// Value recorded when a parent never appears in a trace.
pub const MISSING_VALUE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRow {
    pub test_args: String,
    /// `;`-joined `name=value` pairs.
    pub covariates: String,
    pub treatment_var: String,
    pub treatment_val: String,
    pub outcome: u8,
}

pub struct LogAggregator {
    parent_map: ParentMap,
    rows: Vec<AggregatedRow>,
    header_written: bool,
}

impl LogAggregator {
    pub fn new(parent_map: ParentMap) -> Self {
        LogAggregator {
            parent_map,
            rows: Vec::new(),
            header_written: false,
        }
    }

    /// Truncate the output table between runs.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.header_written = false;
    }

    pub fn rows(&self) -> &[AggregatedRow] {
        &self.rows
    }

    /// Ingest one test: its argument string, trace lines, and 0/1 outcome.
    pub fn add_test(&mut self, test_args: &str, lines: &[String], outcome: u8) {
        // Last value per name, in first-appearance order.
        let mut final_values: IndexMap<String, String> = IndexMap::new();
        for line in lines {
            if line.starts_with(TEST_SEPARATOR) {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if name.is_empty() {
                continue;
            }
            match final_values.get_mut(name) {
                Some(existing) => *existing = value.to_string(),
                None => {
                    final_values.insert(name.to_string(), value.to_string());
                }
            }
        }

        for (name, value) in &final_values {
            if is_filtered(name) {
                continue;
            }
            let covariates = match self.parent_map.get(name) {
                Some(parents) => parents
                    .iter()
                    .map(|parent| {
                        let parent_value = final_values
                            .get(parent)
                            .map(String::as_str)
                            .unwrap_or(MISSING_VALUE);
                        format!("{parent}={parent_value}")
                    })
                    .collect::<Vec<_>>()
                    .join(";"),
                None => String::new(),
            };
            self.rows.push(AggregatedRow {
                test_args: test_args.to_string(),
                covariates,
                treatment_var: name.clone(),
                treatment_val: value.clone(),
                outcome,
            });
        }
    }

    /// Render the accumulated rows as CSV. The header is written once per
    /// aggregator lifetime; `reset` re-arms it.
    pub fn write_csv<W: std::io::Write>(&mut self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if !self.header_written {
            csv_writer
                .write_record(HEADERS)
                .map_err(|e| Error::Data(e.to_string()))?;
            self.header_written = true;
        }
        for row in &self.rows {
            csv_writer
                .write_record([
                    row.test_args.as_str(),
                    row.covariates.as_str(),
                    row.treatment_var.as_str(),
                    row.treatment_val.as_str(),
                    if row.outcome == 1 { "1" } else { "0" },
                ])
                .map_err(|e| Error::Data(e.to_string()))?;
        }
        csv_writer.flush().map_err(|e| Error::Data(e.to_string()))?;
        Ok(())
    }

    pub fn to_csv_string(&mut self) -> Result<String> {
        let mut out = Vec::new();
        self.write_csv(&mut out)?;
        String::from_utf8(out).map_err(|e| Error::Data(e.to_string()))
    }
}

/// Treatment filter: temporaries and debug values never become treatments.
fn is_filtered(name: &str) -> bool {
    name.starts_with("temp") || name.ends_with("_debug")
}

/// Parse one `*.trace` run file: line 1 is the test argument string, line 2
/// the outcome digit, the rest are trace lines.
pub fn parse_run_file(content: &str) -> Result<(String, Vec<String>, u8)> {
    let mut lines = content.lines();
    let test_args = lines
        .next()
        .ok_or_else(|| Error::Data("empty run file".to_string()))?
        .to_string();
    let outcome_line = lines
        .next()
        .ok_or_else(|| Error::Data("run file has no outcome line".to_string()))?;
    let outcome = match outcome_line.trim() {
        "0" => 0,
        "1" => 1,
        other => {
            return Err(Error::Data(format!(
                "outcome must be 0 or 1, found `{other}`"
            )))
        }
    };
    let trace_lines = lines.map(str::to_string).collect();
    Ok((test_args, trace_lines, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent_map() -> ParentMap {
        let mut map = ParentMap::new();
        map.insert(
            "result_4".into(),
            vec!["P1_1".into(), "result_2".into(), "result_3".into()],
        );
        map.insert("P2_1".into(), vec!["result_4".into()]);
        map
    }

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_one_row_per_treatment_with_last_value() {
        let mut aggregator = LogAggregator::new(parent_map());
        aggregator.add_test(
            "4",
            &lines(&[
                "x_0 = 4",
                "P1_1 = false",
                "result_3 = 7",
                "result_4 = 7",
                "result_4 = 15",
            ]),
            1,
        );
        let rows = aggregator.rows();
        assert_eq!(rows.len(), 4);
        let result_row = rows
            .iter()
            .find(|r| r.treatment_var == "result_4")
            .unwrap();
        assert_eq!(result_row.treatment_val, "15", "last value wins");
        assert_eq!(result_row.outcome, 1);
        assert_eq!(
            result_row.covariates,
            "P1_1=false;result_2=N/A;result_3=7"
        );
    }

    #[test]
    fn test_temp_and_debug_names_filtered() {
        let mut aggregator = LogAggregator::new(ParentMap::new());
        aggregator.add_test(
            "1",
            &lines(&["tempCond1 = true", "x_debug = 9", "a_1 = 3"]),
            0,
        );
        let rows = aggregator.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].treatment_var, "a_1");
    }

    #[test]
    fn test_filtered_names_still_usable_as_covariates() {
        let mut map = ParentMap::new();
        map.insert("a_1".into(), vec!["tempRes1".into()]);
        let mut aggregator = LogAggregator::new(map);
        aggregator.add_test("1", &lines(&["tempRes1 = 8", "a_1 = 8"]), 0);
        assert_eq!(aggregator.rows()[0].covariates, "tempRes1=8");
    }

    #[test]
    fn test_separator_lines_skipped() {
        let mut aggregator = LogAggregator::new(ParentMap::new());
        aggregator.add_test("1", &lines(&["-----", "a_1 = 3", "-----"]), 0);
        assert_eq!(aggregator.rows().len(), 1);
    }

    #[test]
    fn test_rows_in_first_appearance_order() {
        let mut aggregator = LogAggregator::new(ParentMap::new());
        aggregator.add_test(
            "1",
            &lines(&["b_1 = 1", "a_1 = 2", "b_1 = 3"]),
            0,
        );
        let names: Vec<&str> = aggregator
            .rows()
            .iter()
            .map(|r| r.treatment_var.as_str())
            .collect();
        assert_eq!(names, vec!["b_1", "a_1"]);
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let mut aggregator = LogAggregator::new(ParentMap::new());
        aggregator.add_test("4, 5", &lines(&["a_1 = 3"]), 0);
        let csv = aggregator.to_csv_string().unwrap();
        let mut csv_lines = csv.lines();
        assert_eq!(
            csv_lines.next(),
            Some("TestArgs,Covariates,TreatmentVar,TreatmentVal,Outcome")
        );
        assert_eq!(csv_lines.next(), Some("\"4, 5\",,a_1,3,0"));
    }

    #[test]
    fn test_reset_truncates() {
        let mut aggregator = LogAggregator::new(ParentMap::new());
        aggregator.add_test("1", &lines(&["a_1 = 3"]), 0);
        aggregator.reset();
        assert!(aggregator.rows().is_empty());
        let csv = aggregator.to_csv_string().unwrap();
        assert_eq!(csv.lines().count(), 1, "header only after reset");
    }

    #[test]
    fn test_parse_run_file() {
        let (args, trace, outcome) = parse_run_file("4\n1\nx_0 = 4\nresult_4 = 15\n").unwrap();
        assert_eq!(args, "4");
        assert_eq!(outcome, 1);
        assert_eq!(trace.len(), 2);
        assert!(parse_run_file("4\n2\n").is_err());
    }
}
