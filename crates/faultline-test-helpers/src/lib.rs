//! Shared helpers for Faultline tests: one-call wrappers around the
//! transformation stages so integration tests stay about their assertions.

use faultline_core::cfg::{CfgBuilder, ControlFlowGraph, NodeId};
use faultline_core::codegen::emit_program;
use faultline_core::transform::{gated_single_assignment, hoist_predicates};
use faultline_core::PipelineConfig;
use faultline_parser::ast::Program;

/// Parse source, panicking with the parse diagnostic on failure.
pub fn parse(source: &str) -> Program {
    match faultline_parser::parse(source) {
        Ok(program) => program,
        Err(err) => panic!("fixture failed to parse: {err}\n{source}"),
    }
}

/// Predicate hoisting + GSA, as source text.
pub fn gsa(source: &str) -> String {
    emit_program(&gated_single_assignment(&hoist_predicates(&parse(source))))
}

/// GSA + instrumentation, as source text.
pub fn instrumented(source: &str) -> String {
    let gsa_src = gsa(source);
    match faultline_core::transform::instrument_source(&gsa_src, &PipelineConfig::default()) {
        Ok(out) => out,
        Err(err) => panic!("instrumentation failed: {err}"),
    }
}

/// Build the whole-program CFG.
pub fn cfg(source: &str) -> ControlFlowGraph {
    CfgBuilder::build(&parse(source))
}

/// Find the unique node with this exact label.
pub fn node_labelled(graph: &ControlFlowGraph, label: &str) -> NodeId {
    let matches: Vec<NodeId> = graph
        .nodes()
        .iter()
        .filter(|n| n.label == label)
        .map(|n| n.id)
        .collect();
    match matches.as_slice() {
        [id] => *id,
        [] => panic!("no node labelled `{label}`"),
        _ => panic!("label `{label}` is not unique"),
    }
}
