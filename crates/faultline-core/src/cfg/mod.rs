//! Control flow graph representation.
//!
//! Nodes are statement-level program points with free-form labels carrying
//! role tags ("Method Start: m", "if-merge", "while-exit", ...). Edges are a
//! deduplicated set of ordered id pairs. Adjacency maps are recomputed per
//! analysis from the authoritative edge set, so back edges cost nothing to
//! represent.

pub mod builder;

pub use builder::CfgBuilder;

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use std::fmt;

/// Stable node identifier, unique within one graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A versioned variable name, `base_version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SsaName {
    pub base: String,
    pub version: u32,
}

impl SsaName {
    pub fn new(base: impl Into<String>, version: u32) -> Self {
        SsaName {
            base: base.into(),
            version,
        }
    }

    /// Split an identifier of the shape `<base>_<integer>`.
    pub fn parse(name: &str) -> Option<SsaName> {
        let (base, suffix) = name.rsplit_once('_')?;
        if base.is_empty() || suffix.is_empty() {
            return None;
        }
        let version = suffix.parse::<u32>().ok()?;
        Some(SsaName {
            base: base.to_string(),
            version,
        })
    }
}

impl fmt::Display for SsaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.base, self.version)
    }
}

/// One program point.
#[derive(Debug, Clone)]
pub struct CfgNode {
    pub id: NodeId,
    pub label: String,
    /// Variables this node defines, recorded structurally at lowering time
    /// so dataflow never has to re-parse labels.
    pub defs: Vec<SsaName>,
}

/// Ordered node sequence plus a deduplicated edge set.
#[derive(Debug, Clone, Default)]
pub struct ControlFlowGraph {
    nodes: Vec<CfgNode>,
    edges: IndexSet<(NodeId, NodeId)>,
    next_id: u32,
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        ControlFlowGraph::default()
    }

    /// Append a node and return its id.
    pub fn add_node(&mut self, label: impl Into<String>) -> NodeId {
        self.add_node_with_defs(label, Vec::new())
    }

    pub fn add_node_with_defs(&mut self, label: impl Into<String>, defs: Vec<SsaName>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.push(CfgNode {
            id,
            label: label.into(),
            defs,
        });
        id
    }

    /// Insert a directed edge. Re-adding an existing edge is a no-op.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        debug_assert!(self.contains(from), "edge source {from} is not a node");
        debug_assert!(self.contains(to), "edge target {to} is not a node");
        self.edges.insert((from, to));
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn nodes(&self) -> &[CfgNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&CfgNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn label(&self, id: NodeId) -> &str {
        self.node(id).map(|n| n.label.as_str()).unwrap_or("")
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.edges.iter().copied()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.contains(&(from, to))
    }

    /// Successor adjacency recomputed from the edge set; target lists keep
    /// edge insertion order.
    pub fn successor_map(&self) -> FxHashMap<NodeId, Vec<NodeId>> {
        let mut map: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        for node in &self.nodes {
            map.entry(node.id).or_default();
        }
        for &(from, to) in &self.edges {
            map.entry(from).or_default().push(to);
        }
        map
    }

    pub fn predecessor_map(&self) -> FxHashMap<NodeId, Vec<NodeId>> {
        let mut map: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
        for node in &self.nodes {
            map.entry(node.id).or_default();
        }
        for &(from, to) in &self.edges {
            map.entry(to).or_default().push(from);
        }
        map
    }

    pub fn successors_of(&self, id: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|(from, _)| *from == id)
            .map(|(_, to)| *to)
            .collect()
    }

    /// Ids of nodes whose label starts with `prefix`, in node order.
    pub fn nodes_with_label_prefix(&self, prefix: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.label.starts_with(prefix))
            .map(|n| n.id)
            .collect()
    }

    /// Nodes reachable forward from `start` (inclusive), in BFS order.
    pub fn reachable_from(&self, start: NodeId) -> IndexSet<NodeId> {
        let succs = self.successor_map();
        let mut seen: IndexSet<NodeId> = IndexSet::new();
        let mut queue = std::collections::VecDeque::new();
        seen.insert(start);
        queue.push_back(start);
        while let Some(id) = queue.pop_front() {
            if let Some(targets) = succs.get(&id) {
                for &next in targets {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    /// The sub-CFG restricted to `keep`: nodes in original order, edges with
    /// both endpoints kept. Node ids are preserved.
    pub fn subgraph(&self, keep: &IndexSet<NodeId>) -> ControlFlowGraph {
        let nodes: Vec<CfgNode> = self
            .nodes
            .iter()
            .filter(|n| keep.contains(&n.id))
            .cloned()
            .collect();
        let edges: IndexSet<(NodeId, NodeId)> = self
            .edges
            .iter()
            .filter(|(from, to)| keep.contains(from) && keep.contains(to))
            .copied()
            .collect();
        ControlFlowGraph {
            nodes,
            edges,
            next_id: self.next_id,
        }
    }

    /// The graph with every edge reversed.
    pub fn reversed(&self) -> ControlFlowGraph {
        ControlFlowGraph {
            nodes: self.nodes.clone(),
            edges: self.edges.iter().map(|&(from, to)| (to, from)).collect(),
            next_id: self.next_id,
        }
    }

    /// Export to Graphviz dot for diagnostics.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph cfg {\n");
        for node in &self.nodes {
            out.push_str(&format!(
                "  \"{}\" [label=\"{}\"];\n",
                node.id,
                escape_label(&node.label)
            ));
        }
        for (from, to) in &self.edges {
            out.push_str(&format!("  \"{from}\" -> \"{to}\";\n"));
        }
        out.push_str("}\n");
        out
    }
}

/// Escape quotes and parentheses so labels survive the dot format.
fn escape_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for ch in label.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_edge_deduplication() {
        let mut graph = ControlFlowGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        graph.add_edge(a, b);
        graph.add_edge(a, b);
        graph.add_edge(a, b);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_ssa_name_parse() {
        assert_eq!(SsaName::parse("result_4"), Some(SsaName::new("result", 4)));
        assert_eq!(SsaName::parse("a_b_2"), Some(SsaName::new("a_b", 2)));
        assert_eq!(SsaName::parse("plain"), None);
        assert_eq!(SsaName::parse("x_"), None);
        assert_eq!(SsaName::parse("_3"), None);
    }

    #[test]
    fn test_reachable_from() {
        let mut graph = ControlFlowGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        let d = graph.add_node("island");
        graph.add_edge(a, b);
        graph.add_edge(b, c);
        graph.add_edge(c, b);
        let reach = graph.reachable_from(a);
        assert!(reach.contains(&a) && reach.contains(&b) && reach.contains(&c));
        assert!(!reach.contains(&d));
    }

    #[test]
    fn test_subgraph_preserves_ids_and_filters_edges() {
        let mut graph = ControlFlowGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        graph.add_edge(a, b);
        graph.add_edge(b, c);
        let keep: IndexSet<NodeId> = [a, b].into_iter().collect();
        let sub = graph.subgraph(&keep);
        assert_eq!(sub.node_count(), 2);
        assert!(sub.has_edge(a, b));
        assert!(!sub.has_edge(b, c));
    }

    #[test]
    fn test_dot_export_escapes() {
        let mut graph = ControlFlowGraph::new();
        let a = graph.add_node("if (x > \"s\")");
        let b = graph.add_node("b");
        graph.add_edge(a, b);
        let dot = graph.to_dot();
        assert!(dot.contains("\\(x > \\\"s\\\"\\)"));
        assert!(dot.contains("\"n0\" -> \"n1\";"));
    }

    proptest! {
        /// The edge set equals the set of distinct pairs supplied, in any
        /// insertion order and multiplicity.
        #[test]
        fn prop_edges_are_a_set(pairs in proptest::collection::vec((0u32..8, 0u32..8), 0..64)) {
            let mut graph = ControlFlowGraph::new();
            for _ in 0..8 {
                graph.add_node("n");
            }
            for &(from, to) in &pairs {
                graph.add_edge(NodeId(from), NodeId(to));
            }
            let distinct: std::collections::HashSet<(u32, u32)> =
                pairs.iter().copied().collect();
            prop_assert_eq!(graph.edge_count(), distinct.len());
        }
    }
}
