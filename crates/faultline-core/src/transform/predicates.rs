//! Predicate hoisting.
//!
//! Every branch condition moves into a named variable so later stages can
//! trace it like any other value: `if`/`while` conditions become boolean
//! `P<k>_1` variables, `switch` selectors become integer `S<k>_1` variables,
//! and `for` loops are rewritten into initializer + predicate + `while`. The
//! counter `k` is file-scoped and allocation happens in pre-order, so hoisted
//! names are stable across runs.

use super::is_predicate_name;
use faultline_parser::ast::*;
use faultline_parser::span::Span;

struct PredicateContext {
    counter: u32,
}

impl PredicateContext {
    fn fresh(&mut self, prefix: char) -> String {
        let k = self.counter;
        self.counter += 1;
        format!("{prefix}{k}_1")
    }
}

/// Hoist every branch condition in the program into a predicate variable.
pub fn hoist_predicates(program: &Program) -> Program {
    let mut ctx = PredicateContext { counter: 1 };
    let methods = program
        .methods
        .iter()
        .map(|method| MethodDeclaration {
            body: method.body.as_ref().map(|body| Block {
                statements: hoist_block(&body.statements, &mut ctx),
                span: body.span,
            }),
            ..method.clone()
        })
        .collect();
    Program {
        class_name: program.class_name.clone(),
        methods,
        trailing_comment: program.trailing_comment.clone(),
    }
}

fn hoist_block(statements: &[Statement], ctx: &mut PredicateContext) -> Vec<Statement> {
    let mut out = Vec::with_capacity(statements.len());
    for stmt in statements {
        hoist_statement(stmt, ctx, &mut out);
    }
    out
}

/// Already-hoisted conditions are bare predicate references; leave them be.
fn is_hoisted(condition: &Expression) -> bool {
    condition.as_identifier().is_some_and(is_predicate_name)
}

fn hoist_statement(stmt: &Statement, ctx: &mut PredicateContext, out: &mut Vec<Statement>) {
    match stmt {
        Statement::If(if_stmt) => {
            let condition = if is_hoisted(&if_stmt.condition) {
                if_stmt.condition.clone()
            } else {
                let name = ctx.fresh('P');
                out.push(predicate_declaration(
                    &name,
                    Type::Boolean,
                    true,
                    if_stmt.condition.clone(),
                ));
                Expression::ident(name, Span::dummy())
            };
            let then_branch = Box::new(hoist_substatement(&if_stmt.then_branch, ctx));
            let else_branch = if_stmt
                .else_branch
                .as_ref()
                .map(|branch| Box::new(hoist_substatement(branch, ctx)));
            out.push(Statement::If(IfStatement {
                condition,
                then_branch,
                else_branch,
                span: if_stmt.span,
            }));
        }
        Statement::While(while_stmt) => {
            if is_hoisted(&while_stmt.condition) {
                let body = Box::new(hoist_substatement(&while_stmt.body, ctx));
                out.push(Statement::While(WhileStatement {
                    condition: while_stmt.condition.clone(),
                    body,
                    span: while_stmt.span,
                }));
                return;
            }
            let name = ctx.fresh('P');
            out.push(predicate_declaration(
                &name,
                Type::Boolean,
                false,
                while_stmt.condition.clone(),
            ));
            let mut body = hoist_substatement(&while_stmt.body, ctx).into_block();
            // The predicate refreshes at the loop tail.
            body.statements
                .push(predicate_update(&name, while_stmt.condition.clone()));
            out.push(Statement::While(WhileStatement {
                condition: Expression::ident(name, Span::dummy()),
                body: Box::new(Statement::Block(body)),
                span: while_stmt.span,
            }));
        }
        Statement::For(for_stmt) => {
            hoist_for(for_stmt, ctx, out);
        }
        Statement::Switch(switch) => {
            let selector = if is_hoisted(&switch.selector) {
                switch.selector.clone()
            } else {
                let name = ctx.fresh('S');
                out.push(predicate_declaration(
                    &name,
                    Type::Int,
                    true,
                    switch.selector.clone(),
                ));
                Expression::ident(name, Span::dummy())
            };
            let cases = switch
                .cases
                .iter()
                .map(|case| SwitchCase {
                    label: case.label.clone(),
                    statements: hoist_block(&case.statements, ctx),
                    span: case.span,
                })
                .collect();
            out.push(Statement::Switch(SwitchStatement {
                selector,
                cases,
                span: switch.span,
            }));
        }
        Statement::DoWhile(do_stmt) => {
            let body = Box::new(hoist_substatement(&do_stmt.body, ctx));
            out.push(Statement::DoWhile(DoWhileStatement {
                body,
                condition: do_stmt.condition.clone(),
                span: do_stmt.span,
            }));
        }
        Statement::ForEach(foreach) => {
            let body = Box::new(hoist_substatement(&foreach.body, ctx));
            out.push(Statement::ForEach(ForEachStatement {
                body,
                ..foreach.clone()
            }));
        }
        Statement::Block(block) => {
            out.push(Statement::Block(Block {
                statements: hoist_block(&block.statements, ctx),
                span: block.span,
            }));
        }
        Statement::Labeled(labeled) => {
            out.push(Statement::Labeled(LabeledStatement {
                label: labeled.label.clone(),
                body: Box::new(hoist_substatement(&labeled.body, ctx)),
                span: labeled.span,
            }));
        }
        other => out.push(other.clone()),
    }
}

fn hoist_substatement(stmt: &Statement, ctx: &mut PredicateContext) -> Statement {
    let mut out = Vec::new();
    hoist_statement(stmt, ctx, &mut out);
    match out.len() {
        1 => out.into_iter().next().unwrap_or_else(|| stmt.clone()),
        _ => {
            let span = stmt.span();
            Statement::Block(Block {
                statements: out,
                span,
            })
        }
    }
}

/// `for (init; cond; update) body` becomes a bounded block:
/// `{ init; boolean P = cond; while (P) { body; update; P = cond; } }`.
fn hoist_for(for_stmt: &ForStatement, ctx: &mut PredicateContext, out: &mut Vec<Statement>) {
    let name = ctx.fresh('P');
    let mut wrapped = Vec::new();

    match &for_stmt.init {
        Some(ForInit::Declaration(decl)) => wrapped.push(Statement::Variable(decl.clone())),
        Some(ForInit::Expressions(exprs)) => {
            for expr in exprs {
                wrapped.push(Statement::Expression(ExpressionStatement {
                    expr: expr.clone(),
                    span: expr.span,
                }));
            }
        }
        None => {}
    }

    let compare = for_stmt.condition.clone().unwrap_or_else(|| {
        Expression::new(
            ExpressionKind::Literal(Literal::Bool(true)),
            Span::dummy(),
        )
    });
    wrapped.push(predicate_declaration(
        &name,
        Type::Boolean,
        false,
        compare.clone(),
    ));

    let mut body = hoist_substatement(&for_stmt.body, ctx).into_block();
    for update in &for_stmt.update {
        body.statements.push(Statement::Expression(ExpressionStatement {
            expr: update.clone(),
            span: update.span,
        }));
    }
    body.statements.push(predicate_update(&name, compare));

    wrapped.push(Statement::While(WhileStatement {
        condition: Expression::ident(name, Span::dummy()),
        body: Box::new(Statement::Block(body)),
        span: for_stmt.span,
    }));

    // The block bounds the predicate's scope.
    out.push(Statement::Block(Block {
        statements: wrapped,
        span: for_stmt.span,
    }));
}

fn predicate_declaration(
    name: &str,
    ty: Type,
    is_final: bool,
    init: Expression,
) -> Statement {
    Statement::Variable(VariableDeclaration {
        is_final,
        ty,
        declarators: vec![Declarator {
            name: name.to_string(),
            init: Some(init),
            span: Span::dummy(),
        }],
        span: Span::dummy(),
    })
}

fn predicate_update(name: &str, condition: Expression) -> Statement {
    let span = condition.span;
    Statement::Expression(ExpressionStatement {
        expr: Expression::new(
            ExpressionKind::Assign {
                op: AssignOp::Assign,
                target: Expression::ident(name, Span::dummy()).boxed(),
                value: condition.boxed(),
            },
            span,
        ),
        span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::emit_program;
    use indoc::indoc;

    fn hoist(src: &str) -> String {
        let program = faultline_parser::parse(src).unwrap();
        emit_program(&hoist_predicates(&program))
    }

    #[test]
    fn test_if_condition_hoisted_final() {
        let out = hoist(indoc! {"
            void m(int x) {
                if (x > 5) {
                    x = 1;
                }
            }
        "});
        assert!(out.contains("final boolean P1_1 = x > 5;"));
        assert!(out.contains("if (P1_1) {"));
    }

    #[test]
    fn test_while_predicate_mutable_and_refreshed() {
        let out = hoist(indoc! {"
            void m(int x) {
                while (x < 15) {
                    x = x + 2;
                }
            }
        "});
        assert!(out.contains("boolean P1_1 = x < 15;"));
        assert!(!out.contains("final boolean P1_1"));
        assert!(out.contains("while (P1_1) {"));
        // Refresh assignment closes the body.
        let refresh = out.rfind("P1_1 = x < 15;").unwrap();
        let decl = out.find("boolean P1_1").unwrap();
        assert!(refresh > decl);
    }

    #[test]
    fn test_for_rewritten_to_while() {
        let out = hoist(indoc! {"
            void m() {
                for (int i = 0; i < 3; i++) {
                    f(i);
                }
            }
        "});
        assert!(out.contains("int i = 0;"));
        assert!(out.contains("boolean P1_1 = i < 3;"));
        assert!(out.contains("while (P1_1) {"));
        assert!(out.contains("i++;"));
        assert!(out.contains("P1_1 = i < 3;"));
        assert!(!out.contains("for ("));
    }

    #[test]
    fn test_switch_selector_hoisted() {
        let out = hoist(indoc! {"
            void m(int k) {
                switch (k + 1) {
                    case 1:
                        f(1);
                    default:
                        f(0);
                }
            }
        "});
        assert!(out.contains("final int S1_1 = k + 1;"));
        assert!(out.contains("switch (S1_1) {"));
    }

    #[test]
    fn test_counter_is_file_scoped_preorder() {
        let out = hoist(indoc! {"
            void a(int x) {
                if (x > 0) {
                    while (x > 1) {
                        x = x - 1;
                    }
                }
            }

            void b(int y) {
                if (y > 0) {
                    y = 0;
                }
            }
        "});
        assert!(out.contains("final boolean P1_1 = x > 0;"));
        assert!(out.contains("boolean P2_1 = x > 1;"));
        assert!(out.contains("final boolean P3_1 = y > 0;"));
    }

    #[test]
    fn test_idempotent_on_hoisted_source() {
        let src = indoc! {"
            void m(int x) {
                if (x > 5) {
                    x = 1;
                }
                while (x < 15) {
                    x = x + 2;
                }
            }
        "};
        let once = hoist(src);
        let twice = hoist(&once);
        assert_eq!(once, twice);
    }
}
