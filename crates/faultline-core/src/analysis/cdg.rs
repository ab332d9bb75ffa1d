//! Control-dependence graph construction.
//!
//! Per method: extract the Start-reachable sub-CFG, compute its immediate
//! postdominators, then for every branch walk each successor up the ipdom
//! chain, recording control edges. A final cover step links every otherwise
//! uncontrolled node to the method Start, so the CDG spans the whole method.

use super::dominance::postdominators;
use crate::cfg::{ControlFlowGraph, NodeId};
use crate::error::Result;
use indexmap::{IndexMap, IndexSet};

/// Controller node -> set of controlled nodes, in discovery order.
#[derive(Debug, Default)]
pub struct ControlDependenceGraph {
    pub controls: IndexMap<NodeId, IndexSet<NodeId>>,
}

impl ControlDependenceGraph {
    pub fn record(&mut self, controller: NodeId, controlled: NodeId) {
        self.controls.entry(controller).or_default().insert(controlled);
    }

    pub fn controlled_by(&self, controller: NodeId) -> Option<&IndexSet<NodeId>> {
        self.controls.get(&controller)
    }

    pub fn is_controlled(&self, node: NodeId) -> bool {
        self.controls.values().any(|set| set.contains(&node))
    }

    pub fn controllers_of(&self, node: NodeId) -> Vec<NodeId> {
        self.controls
            .iter()
            .filter(|(_, set)| set.contains(&node))
            .map(|(&controller, _)| controller)
            .collect()
    }
}

/// Build the CDG for every method in the graph.
pub fn build_cdg(graph: &ControlFlowGraph) -> Result<ControlDependenceGraph> {
    let mut cdg = ControlDependenceGraph::default();
    for start in graph.nodes_with_label_prefix("Method Start:") {
        build_method_cdg(graph, start, &mut cdg)?;
    }
    Ok(cdg)
}

fn build_method_cdg(
    graph: &ControlFlowGraph,
    start: NodeId,
    cdg: &mut ControlDependenceGraph,
) -> Result<()> {
    let reachable = graph.reachable_from(start);
    let sub = graph.subgraph(&reachable);
    let postdom = postdominators(&sub)?;
    let succs = sub.successor_map();

    let mut method_controlled: IndexSet<NodeId> = IndexSet::new();
    for node in sub.nodes() {
        let x = node.id;
        let Some(targets) = succs.get(&x) else {
            continue;
        };
        if targets.len() < 2 {
            continue;
        }
        let ipdom_x = postdom.immediate(x);
        for &y in targets {
            // A loop condition controls its exit even though the exit
            // postdominates it.
            if sub.label(x).starts_with("for-cond:") && Some(y) == ipdom_x {
                cdg.record(x, y);
                method_controlled.insert(y);
                continue;
            }
            let mut walker = y;
            while walker != x && Some(walker) != ipdom_x {
                cdg.record(x, walker);
                method_controlled.insert(walker);
                match postdom.immediate(walker) {
                    Some(next) => walker = next,
                    None => break,
                }
            }
        }
    }

    // Cover step: everything not yet controlled answers to the method Start.
    for node in sub.nodes() {
        if node.id != start && !method_controlled.contains(&node.id) {
            cdg.record(start, node.id);
        }
    }
    Ok(())
}
