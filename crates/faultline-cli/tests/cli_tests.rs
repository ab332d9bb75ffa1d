//! End-to-end tests for the `faultline` binary: each stage on real files,
//! composed the way the external driver would.

use assert_cmd::Command;
use indoc::indoc;
use predicates::prelude::*;
use std::path::Path;

const SIMPLE_METHOD: &str = indoc! {"
    int simpleMethod(int x) {
        int result;
        if (x > 5) {
            result = x * 2;
        } else {
            result = x + 3;
        }
        while (result < 15) {
            result += 2;
        }
        return result;
    }
"};

fn faultline() -> Command {
    Command::cargo_bin("faultline").expect("binary builds")
}

fn write(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
}

#[test]
fn test_gsa_derives_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Simple.java");
    write(&input, SIMPLE_METHOD);

    faultline().arg("gsa").arg(&input).assert().success();

    let gsa = std::fs::read_to_string(dir.path().join("Simple.gsa.java")).unwrap();
    assert!(gsa.contains("int result_4 = P1_1 ? result_2 : result_3;"));
    assert!(gsa.contains("methodBody: {"));
}

#[test]
fn test_cfg_dot_export() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Simple.java");
    write(&input, SIMPLE_METHOD);
    let output = dir.path().join("graph.dot");

    faultline()
        .arg("cfg")
        .arg(&input)
        .arg(&output)
        .assert()
        .success();

    let dot = std::fs::read_to_string(&output).unwrap();
    assert!(dot.starts_with("digraph cfg {"));
    assert!(dot.contains("Method Start: simpleMethod"));
    assert!(dot.contains("while-exit"));
}

#[test]
fn test_instrument_is_idempotent_via_marker() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Simple.java");
    write(&input, SIMPLE_METHOD);

    faultline().arg("gsa").arg(&input).assert().success();
    let gsa_path = dir.path().join("Simple.gsa.java");
    faultline().arg("instrument").arg(&gsa_path).assert().success();

    let inst_path = dir.path().join("Simple.gsa.inst.java");
    let once = std::fs::read_to_string(&inst_path).unwrap();
    assert!(once.contains("trace(\"result_4\", result_4);"));

    // Instrumenting the instrumented file changes nothing.
    let again = dir.path().join("again.java");
    faultline()
        .arg("instrument")
        .arg(&inst_path)
        .arg(&again)
        .assert()
        .success();
    assert_eq!(once, std::fs::read_to_string(&again).unwrap());
}

#[test]
fn test_full_table_to_ranking() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Simple.java");
    write(&input, SIMPLE_METHOD);

    faultline().arg("gsa").arg(&input).assert().success();
    let gsa_path = dir.path().join("Simple.gsa.java");
    faultline().arg("parents").arg(&gsa_path).assert().success();
    let parents_path = dir.path().join("Simple.gsa.json");
    assert!(std::fs::read_to_string(&parents_path)
        .unwrap()
        .contains("result_4"));

    // Hand-written traces standing in for the external instrumented run:
    // outcome follows P1_1.
    let traces = dir.path().join("traces");
    std::fs::create_dir(&traces).unwrap();
    for (name, p1, result, outcome) in [
        ("t1", "false", "15", "1"),
        ("t2", "false", "15", "1"),
        ("t3", "true", "16", "0"),
        ("t4", "true", "18", "0"),
    ] {
        write(
            &traces.join(format!("{name}.trace")),
            &format!("{name}\n{outcome}\nP1_1 = {p1}\nresult_4 = {result}\n"),
        );
    }

    faultline()
        .arg("aggregate")
        .arg(&traces)
        .arg("--parents")
        .arg(&parents_path)
        .assert()
        .success();
    let table_path = traces.join("table.csv");
    let table = std::fs::read_to_string(&table_path).unwrap();
    assert!(table.starts_with("TestArgs,Covariates,TreatmentVar,TreatmentVal,Outcome"));

    faultline()
        .arg("rank")
        .arg(&table_path)
        .arg("--models")
        .arg(dir.path().join("models"))
        .arg("--train")
        .assert()
        .success();

    let ranking = std::fs::read_to_string(traces.join("table.rank.csv")).unwrap();
    let mut lines = ranking.lines();
    assert_eq!(lines.next(), Some("TreatmentVar,Suspiciousness Score"));
    // P1_1 separates outcomes perfectly and must outrank everything.
    let first = lines.next().unwrap();
    assert!(first.starts_with("P1_1,"), "unexpected ranking: {ranking}");
}

#[test]
fn test_preprocess_output_columns() {
    let dir = tempfile::tempdir().unwrap();
    let table = dir.path().join("table.csv");
    write(
        &table,
        "TestArgs,Covariates,TreatmentVar,TreatmentVal,Outcome\n\
         t1,P1_1=false,result_4,15,1\n\
         t2,P1_1=true,result_4,16,0\n",
    );

    faultline().arg("preprocess").arg(&table).assert().success();
    let pre = std::fs::read_to_string(dir.path().join("table.pre.csv")).unwrap();
    assert!(pre.starts_with("TestArgs,P1_1,TreatmentVar,TreatmentVal,Outcome"));
    assert!(pre.contains("t1,0,result_4,15,1"));
}

#[test]
fn test_parse_failure_reports_stage_and_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.java");
    write(&input, "int m( {");

    faultline()
        .arg("gsa")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("gsa:"));
}

#[test]
fn test_missing_input_fails_cleanly() {
    faultline()
        .arg("cfg")
        .arg("does-not-exist.java")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cfg:"));
}
