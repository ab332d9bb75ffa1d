//! Instrumented-output scenario tests: the trace-call schedule of the simple
//! method matches the trace an execution with input 4 would produce, and
//! instrumentation is a no-op the second time around.

use faultline_core::transform::{instrument_source, INSTRUMENTED_MARKER};
use faultline_core::PipelineConfig;
use faultline_test_helpers::{gsa, instrumented};
use indoc::indoc;

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

/// The static schedule of trace calls mirrors the dynamic trace of S4: the
/// parameter first, then the predicate, the branch writes, the merge, the
/// loop predicate, the loop body values, and finally the exit variable.
#[test]
fn test_trace_call_schedule_for_simple_method() {
    let out = instrumented(SIMPLE_METHOD);
    let expectations = [
        "trace(\"x_0\", x_0);",
        "trace(\"P1_1\", P1_1);",
        "trace(\"result_2\", result_2);",
        "trace(\"result_3\", result_3);",
        "trace(\"result_4\", result_4);",
        "trace(\"P2_1\", P2_1);",
        "trace(\"result_temp\", result_temp);",
        "trace(\"result_4\", result_4);",
        "trace(\"P2_1\", P2_1);",
        "trace(\"_exit\", _exit);",
    ];
    let mut cursor = 0;
    for expected in expectations {
        match out[cursor..].find(expected) {
            Some(found) => cursor += found + expected.len(),
            None => panic!("`{expected}` missing or out of order in:\n{out}"),
        }
    }
}

#[test]
fn test_branch_writes_get_ensure_declarations() {
    let out = instrumented(SIMPLE_METHOD);
    // result_2/result_3 are assigned in branches without a declaration; the
    // hoisted zero-initialized declarations make the trace calls compile and
    // are themselves untraced.
    let ensure_2 = out.find("int result_2 = 0;").expect("result_2 ensured");
    let first_trace = out.find("trace(").expect("traces exist");
    assert!(ensure_2 < first_trace, "ensure-decls precede all traces");
    assert!(out.contains("int result_3 = 0;"));
}

#[test]
fn test_gating_ternary_lifted_into_traced_temps() {
    let out = instrumented(SIMPLE_METHOD);
    assert!(out.contains("boolean tempCond1 = P1_1;"));
    assert!(out.contains("int tempThen1 = result_2;"));
    assert!(out.contains("int tempElse1 = result_3;"));
    assert!(out.contains("int tempRes1 = tempCond1 ? tempThen1 : tempElse1;"));
    assert!(out.contains("int result_4 = tempRes1;"));
    // The original ternary is gone from the merge declaration.
    assert!(!out.contains("int result_4 = P1_1 ? result_2 : result_3;"));
}

#[test]
fn test_instrumentation_idempotent() {
    let once = instrumented(SIMPLE_METHOD);
    assert!(once.trim_end().ends_with(&format!("// {INSTRUMENTED_MARKER}")));
    let twice = instrument_source(&once, &PipelineConfig::default()).expect("re-instrument");
    assert_eq!(once, twice);
}

#[test]
fn test_main_input_wiring() {
    let out = instrumented(indoc! {"
        void main(String[] argv) {
            int input = 4;
            int doubled = input * 2;
            f(doubled);
        }
    "});
    assert!(out.contains("void main(String[] args)"));
    assert!(out.contains("args.length > 0"));
    assert!(out.contains("Integer.parseInt(args[0])"));
    assert!(out.contains("int input_1 = tempRes1;"));
    assert!(out.contains("trace(\"input_1\", input_1);"));
}
