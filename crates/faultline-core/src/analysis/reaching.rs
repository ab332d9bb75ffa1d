//! Reaching-definitions dataflow.
//!
//! Gen sets come from the structured per-node defs the CFG builder recorded,
//! so the analysis never re-parses labels. A node's kill set covers every
//! version strictly below the largest version it generates for a variable.
//! Standard union/worklist fixed point, run to stability.

use crate::cfg::{ControlFlowGraph, NodeId};
use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Variable name -> set of version numbers that may reach a point.
pub type DefSets = FxHashMap<String, BTreeSet<u32>>;

#[derive(Debug)]
pub struct ReachingDefinitions {
    pub in_sets: FxHashMap<NodeId, DefSets>,
    pub out_sets: FxHashMap<NodeId, DefSets>,
}

impl ReachingDefinitions {
    /// Versions of `var` reaching the entry of `node`.
    pub fn reaching_in(&self, node: NodeId, var: &str) -> Option<&BTreeSet<u32>> {
        self.in_sets.get(&node).and_then(|sets| sets.get(var))
    }

    pub fn reaching_out(&self, node: NodeId, var: &str) -> Option<&BTreeSet<u32>> {
        self.out_sets.get(&node).and_then(|sets| sets.get(var))
    }
}

/// Compute reaching definitions for every node of `graph`.
pub fn compute(graph: &ControlFlowGraph) -> Result<ReachingDefinitions> {
    // gen and the per-variable kill threshold, per node.
    let mut gen: FxHashMap<NodeId, DefSets> = FxHashMap::default();
    let mut kill_below: FxHashMap<NodeId, FxHashMap<String, u32>> = FxHashMap::default();
    for node in graph.nodes() {
        let gen_entry: &mut DefSets = gen.entry(node.id).or_default();
        let kill_entry = kill_below.entry(node.id).or_default();
        for def in &node.defs {
            gen_entry
                .entry(def.base.clone())
                .or_default()
                .insert(def.version);
            let threshold = kill_entry.entry(def.base.clone()).or_insert(def.version);
            *threshold = (*threshold).max(def.version);
        }
    }

    let preds = graph.predecessor_map();
    let mut in_sets: FxHashMap<NodeId, DefSets> = FxHashMap::default();
    let mut out_sets: FxHashMap<NodeId, DefSets> = FxHashMap::default();
    for node in graph.nodes() {
        in_sets.insert(node.id, DefSets::default());
        out_sets.insert(node.id, DefSets::default());
    }

    let cap = graph.node_count() * graph.node_count() + 64;
    let mut sweeps = 0;
    loop {
        let mut changed = false;
        for node in graph.nodes() {
            let id = node.id;

            let mut incoming = DefSets::default();
            if let Some(pred_list) = preds.get(&id) {
                for pred in pred_list {
                    for (var, versions) in &out_sets[pred] {
                        incoming
                            .entry(var.clone())
                            .or_default()
                            .extend(versions.iter().copied());
                    }
                }
            }

            // OUT = (IN \ kill) ∪ gen
            let mut outgoing = incoming.clone();
            for (var, &threshold) in &kill_below[&id] {
                if let Some(versions) = outgoing.get_mut(var) {
                    versions.retain(|&v| v >= threshold);
                }
            }
            for (var, versions) in &gen[&id] {
                outgoing
                    .entry(var.clone())
                    .or_default()
                    .extend(versions.iter().copied());
            }

            if in_sets[&id] != incoming {
                in_sets.insert(id, incoming);
                changed = true;
            }
            if out_sets[&id] != outgoing {
                out_sets.insert(id, outgoing);
                changed = true;
            }
        }
        if !changed {
            break;
        }
        sweeps += 1;
        if sweeps > cap {
            return Err(Error::Convergence {
                analysis: "reaching definitions",
                cap,
            });
        }
    }

    Ok(ReachingDefinitions { in_sets, out_sets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::CfgBuilder;
    use indoc::indoc;

    fn build(src: &str) -> ControlFlowGraph {
        CfgBuilder::build(&faultline_parser::parse(src).unwrap())
    }

    fn find(graph: &ControlFlowGraph, label: &str) -> NodeId {
        graph
            .nodes()
            .iter()
            .find(|n| n.label == label)
            .unwrap_or_else(|| panic!("no node labelled `{label}`"))
            .id
    }

    #[test]
    fn test_straight_line_gen_and_kill() {
        let graph = build(indoc! {"
            void m() {
                int result_1 = 0;
                result_2 = result_1 + 1;
                result_3 = result_2 + 1;
            }
        "});
        let defs = compute(&graph).unwrap();
        let last = find(&graph, "result_3 = result_2 + 1");
        let reaching = defs.reaching_in(last, "result").unwrap();
        // Version 1 is killed by the node generating version 2.
        assert!(!reaching.contains(&1));
        assert!(reaching.contains(&2));
        let out = defs.reaching_out(last, "result").unwrap();
        assert!(out.contains(&3));
        assert!(!out.contains(&2));
    }

    #[test]
    fn test_both_branch_versions_reach_merge() {
        let graph = build(indoc! {"
            void m(int x_0) {
                if (x_0 > 5) {
                    result_2 = x_0 * 2;
                } else {
                    result_3 = x_0 + 3;
                }
                use_1 = result_2;
            }
        "});
        let defs = compute(&graph).unwrap();
        let merge = find(&graph, "if-merge");
        let reaching = defs.reaching_in(merge, "result").unwrap();
        assert!(reaching.contains(&2));
        assert!(reaching.contains(&3));
    }

    #[test]
    fn test_loop_definitions_cycle_back() {
        let graph = build(indoc! {"
            void m(int x_0) {
                int result_1 = 0;
                while (x_0 > 0) {
                    result_2 = result_1 + 1;
                }
            }
        "});
        let defs = compute(&graph).unwrap();
        let cond = find(&graph, "x_0 > 0");
        let reaching = defs.reaching_in(cond, "result").unwrap();
        // Both the pre-loop version and the loop-carried one reach the header.
        assert!(reaching.contains(&1));
        assert!(reaching.contains(&2));
    }

    #[test]
    fn test_monotone_growth_until_fixpoint() {
        // A second run over the same graph must be identical: the fixed point
        // is deterministic and stable.
        let graph = build(indoc! {"
            void m(int x_0) {
                int a_1 = 0;
                while (x_0 > 0) {
                    a_2 = a_1 + 1;
                }
            }
        "});
        let first = compute(&graph).unwrap();
        let second = compute(&graph).unwrap();
        for node in graph.nodes() {
            assert_eq!(first.in_sets[&node.id], second.in_sets[&node.id]);
            assert_eq!(first.out_sets[&node.id], second.out_sets[&node.id]);
        }
    }
}
