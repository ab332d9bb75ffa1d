//! Pipeline configuration.
//!
//! All tunables live here so no stage reaches for process-global state; the
//! CLI builds one of these from flags and threads it through.

/// Shared knobs for the transformation and scoring stages.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Value traced for `main` when no command-line argument is supplied to
    /// the instrumented program.
    pub default_input: i64,
    /// Training epochs for the logistic classifier.
    pub training_epochs: usize,
    /// Learning rate for the logistic classifier.
    pub learning_rate: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            default_input: 10,
            training_epochs: 400,
            learning_rate: 0.1,
        }
    }
}
