//! faultline-core: static analysis, GSA transformation and counterfactual
//! suspiciousness scoring.
//!
//! The pipeline takes a C-family source program and finds the variables whose
//! values best explain failing tests:
//!
//! ```text
//! source ──> CFG ──> dominators ──> CDG
//!    │                └──> reaching definitions
//!    ├──> predicates ──> GSA ──> instrumented source ──> (external run)
//!    │                   └──> parent map ─────────┐
//!    └── traces per test ──> aggregated table ──> models ──> ranking
//! ```
//!
//! Analyses are synchronous CPU work over in-memory structures; file I/O
//! happens at stage boundaries only, and every fixed point iterates in a
//! stable order so runs are deterministic.

pub mod aggregate;
pub mod analysis;
pub mod causal;
pub mod cfg;
pub mod codegen;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod trace;
pub mod transform;

pub use config::PipelineConfig;
pub use error::{Error, Result};
