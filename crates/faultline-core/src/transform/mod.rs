//! Source-to-source transformation passes.
//!
//! The passes run in pipeline order: predicate hoisting, SSA/GSA renaming
//! (with gating merges, loop-carried rewrites, return rewriting and
//! single-exit conversion), instrumentation, then parent-map extraction over
//! the GSA output. Each pass is a pure `Program -> Program` function with its
//! state threaded through an explicit context.

pub mod gsa;
pub mod instrument;
pub mod parents;
pub mod predicates;

pub use gsa::gated_single_assignment;
pub use instrument::{instrument_program, instrument_source, INSTRUMENTED_MARKER};
pub use parents::{extract_parent_map, parent_map_from_json, parent_map_to_json, ParentMap};
pub use predicates::hoist_predicates;

/// True for hoisted predicate/selector names (`P3_1`, `S2_1`, ...), which
/// carry their own versioning and are exempt from SSA renaming.
pub fn is_predicate_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(['P', 'S']) else {
        return false;
    };
    let Some((counter, version)) = rest.split_once('_') else {
        return false;
    };
    !counter.is_empty()
        && !version.is_empty()
        && counter.bytes().all(|b| b.is_ascii_digit())
        && version.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_predicate_name() {
        assert!(is_predicate_name("P1_1"));
        assert!(is_predicate_name("P12_3"));
        assert!(is_predicate_name("S2_1"));
        assert!(!is_predicate_name("Q1_1"));
        assert!(!is_predicate_name("P_1"));
        assert!(!is_predicate_name("P1"));
        assert!(!is_predicate_name("result_4"));
        assert!(!is_predicate_name("Px_1"));
    }
}
