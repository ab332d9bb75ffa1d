//! Counterfactual scoring: table preprocessing, per-treatment models, and
//! the suspiciousness ranking.

pub mod model;
pub mod suspicion;
pub mod table;

pub use model::{Model, ModelStore};
pub use suspicion::{
    rank, ranking_to_csv, representative_values, train_models, SuspiciousnessScore,
};
pub use table::{parse_raw_csv, preprocess, PreprocessedRow, PreprocessedTable, RawRow};
