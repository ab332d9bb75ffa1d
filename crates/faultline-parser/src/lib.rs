//! faultline-parser: lexer, AST and parser for the analyzed language.
//!
//! The pipeline in `faultline-core` consumes the [`ast::Program`] produced
//! here and emits transformed source text back out, so the AST is owned and
//! span-carrying rather than borrowed from the input.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod span;

pub use lexer::{Lexer, Token, TokenStream};
pub use parser::Parser;
pub use span::Span;

use thiserror::Error;

/// A surface-language parse failure with its source position.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{span}: {message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

impl ParseError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        ParseError {
            span,
            message: message.into(),
        }
    }
}

/// Parse a compilation unit.
pub fn parse(source: &str) -> Result<ast::Program, ParseError> {
    Parser::parse_program(source)
}
