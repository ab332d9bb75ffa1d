//! Owned abstract syntax tree for the analyzed language.
//!
//! The tree is deliberately decoupled from the source text: nodes own their
//! strings and children, so transformation passes can splice synthesized
//! nodes (with [`crate::span::Span::dummy`] spans) next to parsed ones.

pub mod expression;
pub mod statement;

pub use expression::{
    AssignOp, BinaryOp, Expression, ExpressionKind, IncDecOp, Literal, UnaryOp,
};
pub use statement::{
    Block, BreakStatement, ContinueStatement, Declarator, DoWhileStatement, ExpressionStatement,
    ForEachStatement, ForInit, ForStatement, IfStatement, LabeledStatement, MethodDeclaration,
    Parameter, Program, ReturnStatement, Statement, SwitchCase, SwitchStatement, ThrowStatement,
    Type, VariableDeclaration, WhileStatement,
};
