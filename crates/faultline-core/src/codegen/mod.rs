//! Source emission.

pub mod emitter;

pub use emitter::{declaration_text, emit_program, expression_text, statement_label, Emitter};
