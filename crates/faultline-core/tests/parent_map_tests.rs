//! Parent-map round-trip and pipeline-shape tests.

use faultline_core::transform::{
    extract_parent_map, parent_map_from_json, parent_map_to_json,
};
use faultline_test_helpers::{gsa, parse};
use indoc::indoc;

#[test]
fn test_simple_method_parent_map() {
    let gsa_src = gsa(indoc! {"
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
    "});
    let map = extract_parent_map(&parse(&gsa_src));

    assert_eq!(map["P1_1"], vec!["x_0"]);
    assert_eq!(map["result_2"], vec!["x_0"]);
    assert_eq!(map["result_3"], vec!["x_0"]);
    assert_eq!(map["result_4"], vec!["P1_1", "result_2", "result_3"]);
    assert_eq!(map["P2_1"], vec!["result_4"]);
    assert_eq!(map["result_temp"], vec!["result_4"]);
    assert_eq!(map["_exit"], vec!["result_4"]);
}

#[test]
fn test_json_round_trip_canonical() {
    let gsa_src = gsa("int m(int a) { int r = a + 1; return r; }");
    let map = extract_parent_map(&parse(&gsa_src));

    let json = parent_map_to_json(&map).unwrap();
    let back = parent_map_from_json(&json).unwrap();
    assert_eq!(map, back);
    assert_eq!(json, parent_map_to_json(&back).unwrap());

    // Keys serialize in insertion order.
    let r_pos = json.find("\"r_1\"").unwrap();
    let exit_pos = json.find("\"_exit\"").unwrap();
    assert!(r_pos < exit_pos);
}

#[test]
fn test_reassignment_keeps_earliest_parents() {
    let map = extract_parent_map(&parse(indoc! {"
        void m() {
            x_1 = a_0 + b_0;
            x_1 = c_0;
        }
    "}));
    assert_eq!(map["x_1"], vec!["a_0", "b_0"]);
}
