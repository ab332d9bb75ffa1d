//! Graph analyses over the CFG.
//!
//! The analyses form a dependency chain and never modify the graph:
//!
//! ```text
//! CFG (needs only AST)
//!  ├─> Dominators / Postdominators (needs CFG)
//!  │    └─> CDG (needs postdominators of each method sub-CFG)
//!  └─> Reaching definitions (needs per-node defs)
//! ```
//!
//! Every fixed point iterates in the graph's stable node order and carries a
//! watchdog sweep cap; the lattices are finite, so the cap only ever trips on
//! an implementation bug.

pub mod cdg;
pub mod dominance;
pub mod reaching;

pub use cdg::{build_cdg, ControlDependenceGraph};
pub use dominance::{dominators, postdominators, DominatorInfo};
pub use reaching::{compute as reaching_definitions, DefSets, ReachingDefinitions};
