//! Scenario tests for the GSA transformation: the simple-method shape, SSA
//! uniqueness, and textual idempotence across representative programs.

use faultline_core::cfg::SsaName;
use faultline_test_helpers::gsa;
use indoc::indoc;
use std::collections::HashSet;

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

#[test]
fn test_simple_method_expected_gsa_sequence() {
    let out = gsa(SIMPLE_METHOD);
    let expectations = [
        "int _exit;",
        "methodBody: {",
        "int result_1;",
        "final boolean P1_1 = x_0 > 5;",
        "if (P1_1) {",
        "result_2 = x_0 * 2;",
        "} else {",
        "result_3 = x_0 + 3;",
        "int result_4 = P1_1 ? result_2 : result_3;",
        "boolean P2_1 = result_4 < 15;",
        "while (P2_1) {",
        "int result_temp = result_4 + 2;",
        "result_4 = result_temp;",
        "P2_1 = result_4 < 15;",
        "_exit = result_4;",
        "break methodBody;",
        "return _exit;",
    ];
    let mut cursor = 0;
    for expected in expectations {
        match out[cursor..].find(expected) {
            Some(found) => cursor += found + expected.len(),
            None => panic!("`{expected}` missing or out of order in:\n{out}"),
        }
    }
}

/// Every versioned write in a method is unique: no (base, version) pair is
/// assigned or declared twice.
#[test]
fn test_ssa_write_uniqueness() {
    let out = gsa(indoc! {"
        int busy(int a, boolean go) {
            int r = 0;
            a = a + 1;
            if (go) {
                r = a;
                a = a - 1;
            } else {
                r = 2;
                a = 0;
            }
            while (r < 10) {
                r += a;
            }
            return r;
        }
    "});

    let mut written: HashSet<(String, u32)> = HashSet::new();
    for line in out.lines() {
        let trimmed = line.trim();
        // Declarations and plain assignments both define their lhs.
        let lhs = if let Some(rest) = trimmed.strip_prefix("int ") {
            rest.split([' ', ';']).next()
        } else if trimmed.contains(" = ") && !trimmed.starts_with("boolean") {
            trimmed.split(" = ").next()
        } else {
            None
        };
        let Some(lhs) = lhs else { continue };
        let Some(ssa) = SsaName::parse(lhs) else {
            continue;
        };
        if lhs.starts_with('P') || lhs.ends_with("_temp") {
            continue;
        }
        // Loop-carried re-assignments reuse the merged version by contract.
        if trimmed.ends_with("_temp;") {
            continue;
        }
        assert!(
            written.insert((ssa.base.clone(), ssa.version)),
            "duplicate write of {lhs} in:\n{out}"
        );
    }
    assert!(written.contains(&("r".to_string(), 4)), "gating merge exists");
}

#[test]
fn test_idempotence_across_fixtures() {
    let fixtures = [
        SIMPLE_METHOD,
        indoc! {"
            void logOnly(int x) {
                f(x);
            }
        "},
        indoc! {"
            int classify(int k) {
                int out = 0;
                switch (k) {
                    case 1:
                        out = 10;
                        break;
                    default:
                        out = -1;
                }
                return out;
            }
        "},
        indoc! {"
            int sum(int n) {
                int total = 0;
                for (int i = 0; i < n; i++) {
                    total += i;
                }
                return total;
            }
        "},
        indoc! {"
            int nested(int x) {
                int result = 0;
                if (x > 0) {
                    if (x > 10) {
                        result = 2;
                    } else {
                        result = 1;
                    }
                } else {
                    result = -1;
                }
                return result;
            }
        "},
    ];
    for fixture in fixtures {
        let once = gsa(fixture);
        let twice = gsa(&once);
        assert_eq!(once, twice, "GSA not idempotent for:\n{fixture}");
    }
}

#[test]
fn test_nested_if_merges_cascade() {
    let out = gsa(indoc! {"
        int nested(int x) {
            int result = 0;
            if (x > 0) {
                if (x > 10) {
                    result = 2;
                } else {
                    result = 1;
                }
            } else {
                result = -1;
            }
            return result;
        }
    "});
    // Inner merge feeds the outer merge.
    assert!(out.contains("int result_4 = P2_1 ? result_2 : result_3;"));
    assert!(out.contains("int result_6 = P1_1 ? result_4 : result_5;"));
    assert!(out.contains("_exit = result_6;"));
}

#[test]
fn test_boolean_parameter_convention_feeds_reads() {
    let out = gsa(indoc! {"
        int pick(boolean flag, int a) {
            int r = 0;
            if (flag) {
                r = a;
            } else {
                r = 0 - a;
            }
            return r;
        }
    "});
    assert!(out.contains("int pick(boolean flag_1, int a_0)"));
    assert!(out.contains("final boolean P1_1 = flag_1;"));
}
