//! Dominator and postdominator computation.
//!
//! Uses the classic iterative set-intersection fixed point over a virtual
//! entry node: `Dom(entry) = {entry}`, `Dom(n) = {n} ∪ ⋂ Dom(pred)` with all
//! other sets initialized to the universe. The node iteration order is the
//! graph's stable node order, so results never depend on hash iteration.

use crate::cfg::{ControlFlowGraph, NodeId};
use crate::error::{Error, Result};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Synthetic root that precedes the designated entry during the fixed point.
/// It never appears in the returned sets.
const VIRTUAL_ENTRY: NodeId = NodeId(u32::MAX);

/// Dominator sets plus the derived immediate-dominator mapping.
///
/// The same structure serves postdominators: compute on the reversed graph
/// with the method's End node as entry.
#[derive(Debug)]
pub struct DominatorInfo {
    pub dom: FxHashMap<NodeId, BTreeSet<NodeId>>,
    pub idom: FxHashMap<NodeId, Option<NodeId>>,
}

impl DominatorInfo {
    /// True if `a` dominates `b` (reflexively).
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        self.dom.get(&b).is_some_and(|set| set.contains(&a))
    }

    pub fn immediate(&self, n: NodeId) -> Option<NodeId> {
        self.idom.get(&n).copied().flatten()
    }

    /// Dominator tree as a child map, children in node-id order.
    pub fn tree(&self) -> FxHashMap<NodeId, Vec<NodeId>> {
        let mut children: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        let mut nodes: Vec<NodeId> = self.idom.keys().copied().collect();
        nodes.sort();
        for node in nodes {
            if let Some(Some(parent)) = self.idom.get(&node) {
                children.entry(*parent).or_default().push(node);
            }
        }
        children
    }
}

/// Dominators of every node reachable in `graph`, rooted at `entry`.
pub fn dominators(graph: &ControlFlowGraph, entry: NodeId) -> Result<DominatorInfo> {
    let universe: BTreeSet<NodeId> = graph
        .nodes()
        .iter()
        .map(|n| n.id)
        .chain(std::iter::once(VIRTUAL_ENTRY))
        .collect();
    let preds = graph.predecessor_map();

    let mut dom: FxHashMap<NodeId, BTreeSet<NodeId>> = FxHashMap::default();
    dom.insert(VIRTUAL_ENTRY, [VIRTUAL_ENTRY].into_iter().collect());
    for node in graph.nodes() {
        dom.insert(node.id, universe.clone());
    }

    let cap = graph.node_count() * graph.node_count() + 64;
    let mut sweeps = 0;
    loop {
        let mut changed = false;
        for node in graph.nodes() {
            let id = node.id;
            let mut incoming: Option<BTreeSet<NodeId>> = None;
            let mut fold = |pred: NodeId, dom: &FxHashMap<NodeId, BTreeSet<NodeId>>| {
                let pred_dom = &dom[&pred];
                incoming = Some(match incoming.take() {
                    None => pred_dom.clone(),
                    Some(acc) => acc.intersection(pred_dom).copied().collect(),
                });
            };
            if id == entry {
                fold(VIRTUAL_ENTRY, &dom);
            }
            if let Some(pred_list) = preds.get(&id) {
                for &pred in pred_list {
                    fold(pred, &dom);
                }
            }
            let mut next = incoming.unwrap_or_else(|| universe.clone());
            next.insert(id);
            if dom[&id] != next {
                dom.insert(id, next);
                changed = true;
            }
        }
        if !changed {
            break;
        }
        sweeps += 1;
        if sweeps > cap {
            return Err(Error::Convergence {
                analysis: "dominators",
                cap,
            });
        }
    }

    // The virtual entry is an implementation detail; strip it.
    dom.remove(&VIRTUAL_ENTRY);
    for set in dom.values_mut() {
        set.remove(&VIRTUAL_ENTRY);
    }

    let idom = derive_idoms(&dom, entry);
    Ok(DominatorInfo { dom, idom })
}

/// Postdominators of the sub-CFG, rooted at its unique method End node.
///
/// Fails when the graph carries no `Method End:` node, which happens when a
/// method's exit is unreachable from its Start.
pub fn postdominators(graph: &ControlFlowGraph) -> Result<DominatorInfo> {
    let ends = graph.nodes_with_label_prefix("Method End:");
    let end = match ends.as_slice() {
        [end] => *end,
        [] => {
            return Err(Error::Graph(
                "postdominator computation found no method End node".to_string(),
            ))
        }
        _ => {
            return Err(Error::Graph(format!(
                "postdominator computation expects one method End node, found {}",
                ends.len()
            )))
        }
    };
    dominators(&graph.reversed(), end)
}

/// The immediate dominator of `n` is the element of `Dom(n) \ {n}` that
/// dominates no other element of that set.
fn derive_idoms(
    dom: &FxHashMap<NodeId, BTreeSet<NodeId>>,
    entry: NodeId,
) -> FxHashMap<NodeId, Option<NodeId>> {
    let mut idom: FxHashMap<NodeId, Option<NodeId>> = FxHashMap::default();
    for (&node, dominators) in dom {
        if node == entry {
            idom.insert(node, None);
            continue;
        }
        let candidates: Vec<NodeId> = dominators.iter().copied().filter(|&d| d != node).collect();
        let immediate = candidates.iter().copied().find(|&d| {
            candidates
                .iter()
                .all(|&other| other == d || !dom.get(&other).is_some_and(|set| set.contains(&d)))
        });
        idom.insert(node, immediate);
    }
    idom
}
