//! AST to CFG lowering.
//!
//! Each method gets explicit `Method Start:`/`Method End:` nodes; every
//! construct lowers to an (entry, exit) node pair and sequential composition
//! wires `previous.exit -> current.entry`. A stack of loop contexts resolves
//! `break`/`continue`; a dangling jump keeps its node as a self-contained
//! fragment.

use super::{ControlFlowGraph, NodeId, SsaName};
use crate::codegen::{declaration_text, expression_text, statement_label};
use faultline_parser::ast::*;
use tracing::warn;

/// Targets for `break`/`continue` inside the innermost enclosing loop.
#[derive(Debug, Clone, Copy)]
struct LoopContext {
    cond: NodeId,
    exit: NodeId,
}

pub struct CfgBuilder {
    graph: ControlFlowGraph,
    loop_stack: Vec<LoopContext>,
    /// Loops and switches both accept a plain `break`.
    break_targets: Vec<NodeId>,
    current_method_end: Option<NodeId>,
}

impl CfgBuilder {
    /// Lower a whole compilation unit into one graph.
    pub fn build(program: &Program) -> ControlFlowGraph {
        let mut builder = CfgBuilder {
            graph: ControlFlowGraph::new(),
            loop_stack: Vec::new(),
            break_targets: Vec::new(),
            current_method_end: None,
        };
        for method in &program.methods {
            builder.build_method(method);
        }
        builder.graph
    }

    fn build_method(&mut self, method: &MethodDeclaration) {
        let Some(body) = &method.body else {
            return;
        };
        let start = self.graph.add_node(format!("Method Start: {}", method.name));
        let end = self.graph.add_node(format!("Method End: {}", method.name));
        self.current_method_end = Some(end);

        if body.statements.is_empty() {
            self.graph.add_edge(start, end);
        } else {
            let (entry, exit) = self.build_statements(&body.statements);
            self.graph.add_edge(start, entry);
            self.graph.add_edge(exit, end);
        }
        self.current_method_end = None;
    }

    /// Lower a statement sequence; empty sequences materialize a single
    /// "empty block" node so the pair is always well-defined.
    fn build_statements(&mut self, statements: &[Statement]) -> (NodeId, NodeId) {
        let Some((first, rest)) = statements.split_first() else {
            let node = self.graph.add_node("empty block");
            return (node, node);
        };
        let (entry, mut prev_exit) = self.build_statement(first);
        for stmt in rest {
            let (stmt_entry, stmt_exit) = self.build_statement(stmt);
            self.graph.add_edge(prev_exit, stmt_entry);
            prev_exit = stmt_exit;
        }
        (entry, prev_exit)
    }

    fn build_statement(&mut self, stmt: &Statement) -> (NodeId, NodeId) {
        match stmt {
            Statement::Variable(decl) => {
                let node = self
                    .graph
                    .add_node_with_defs(declaration_text(decl), declaration_defs(decl));
                (node, node)
            }
            Statement::Expression(es) => {
                let node = self
                    .graph
                    .add_node_with_defs(expression_text(&es.expr), expression_defs(&es.expr));
                (node, node)
            }
            Statement::Empty(_) => {
                let node = self.graph.add_node(";");
                (node, node)
            }
            Statement::Return(_) => {
                let node = self.graph.add_node(statement_label(stmt));
                if let Some(end) = self.current_method_end {
                    self.graph.add_edge(node, end);
                }
                (node, node)
            }
            Statement::Throw(_) => {
                // Exceptions are not modeled as control flow.
                let node = self.graph.add_node(statement_label(stmt));
                (node, node)
            }
            Statement::Break(_) => {
                let node = self.graph.add_node(statement_label(stmt));
                match self.break_targets.last() {
                    Some(&target) => self.graph.add_edge(node, target),
                    None => warn!("break outside a loop; node kept as a dangling fragment"),
                }
                (node, node)
            }
            Statement::Continue(_) => {
                let node = self.graph.add_node(statement_label(stmt));
                match self.loop_stack.last() {
                    Some(ctx) => {
                        let cond = ctx.cond;
                        self.graph.add_edge(node, cond);
                    }
                    None => warn!("continue outside a loop; node kept as a dangling fragment"),
                }
                (node, node)
            }
            Statement::If(if_stmt) => self.build_if(if_stmt),
            Statement::While(while_stmt) => self.build_while(while_stmt),
            Statement::DoWhile(do_stmt) => self.build_do_while(do_stmt),
            Statement::For(for_stmt) => self.build_for(for_stmt),
            Statement::ForEach(foreach) => self.build_foreach(foreach),
            Statement::Switch(switch) => self.build_switch(switch),
            Statement::Block(block) => self.build_statements(&block.statements),
            Statement::Labeled(labeled) => self.build_statement(&labeled.body),
        }
    }

    /// A branch exit is terminal when control cannot fall through it: it is a
    /// jump (return/throw/break/continue) or a node with its outgoing edge
    /// already resolved away from the join.
    fn is_terminal(&self, exit: NodeId) -> bool {
        let label = self.graph.label(exit);
        label.starts_with("return")
            || label.starts_with("throw")
            || label.starts_with("break")
            || label.starts_with("continue")
    }

    fn build_if(&mut self, if_stmt: &IfStatement) -> (NodeId, NodeId) {
        let cond = self.graph.add_node(expression_text(&if_stmt.condition));

        let (then_entry, then_exit) = self.build_branch(&if_stmt.then_branch);
        self.graph.add_edge(cond, then_entry);

        match &if_stmt.else_branch {
            Some(else_branch) => {
                let (else_entry, else_exit) = self.build_branch(else_branch);
                self.graph.add_edge(cond, else_entry);

                let then_terminal = self.is_terminal(then_exit);
                let else_terminal = self.is_terminal(else_exit);
                if then_terminal && else_terminal {
                    // No merge required.
                    return (cond, then_exit);
                }
                let merge = self.graph.add_node("if-merge");
                if !then_terminal {
                    self.graph.add_edge(then_exit, merge);
                }
                if !else_terminal {
                    self.graph.add_edge(else_exit, merge);
                }
                (cond, merge)
            }
            None => {
                let merge = self.graph.add_node("if-merge");
                self.graph.add_edge(cond, merge);
                if !self.is_terminal(then_exit) {
                    self.graph.add_edge(then_exit, merge);
                }
                (cond, merge)
            }
        }
    }

    fn build_branch(&mut self, stmt: &Statement) -> (NodeId, NodeId) {
        match stmt {
            Statement::Block(block) => self.build_statements(&block.statements),
            other => self.build_statement(other),
        }
    }

    fn build_while(&mut self, while_stmt: &WhileStatement) -> (NodeId, NodeId) {
        let cond = self.graph.add_node(expression_text(&while_stmt.condition));
        let exit = self.graph.add_node("while-exit");

        self.loop_stack.push(LoopContext { cond, exit });
        self.break_targets.push(exit);
        let (body_entry, body_exit) = self.build_branch(&while_stmt.body);
        self.break_targets.pop();
        self.loop_stack.pop();

        self.graph.add_edge(cond, body_entry);
        self.graph.add_edge(body_exit, cond);
        self.graph.add_edge(cond, exit);
        (cond, exit)
    }

    fn build_do_while(&mut self, do_stmt: &DoWhileStatement) -> (NodeId, NodeId) {
        let cond = self.graph.add_node(expression_text(&do_stmt.condition));
        let exit = self.graph.add_node("while-exit");

        self.loop_stack.push(LoopContext { cond, exit });
        self.break_targets.push(exit);
        let (body_entry, body_exit) = self.build_branch(&do_stmt.body);
        self.break_targets.pop();
        self.loop_stack.pop();

        self.graph.add_edge(body_exit, cond);
        self.graph.add_edge(cond, body_entry);
        self.graph.add_edge(cond, exit);
        (body_entry, exit)
    }

    fn build_for(&mut self, for_stmt: &ForStatement) -> (NodeId, NodeId) {
        let init = for_stmt.init.as_ref().map(|init| match init {
            ForInit::Declaration(decl) => self
                .graph
                .add_node_with_defs(format!("for-init:{}", declaration_text(decl)), declaration_defs(decl)),
            ForInit::Expressions(exprs) => {
                let label = format!(
                    "for-init:{}",
                    exprs.iter().map(expression_text).collect::<Vec<_>>().join(", ")
                );
                let defs = exprs.iter().flat_map(expression_defs).collect();
                self.graph.add_node_with_defs(label, defs)
            }
        });
        let cond_text = for_stmt
            .condition
            .as_ref()
            .map(expression_text)
            .unwrap_or_else(|| "true".to_string());
        let cond = self.graph.add_node(format!("for-cond:{cond_text}"));
        let update = if for_stmt.update.is_empty() {
            None
        } else {
            let label = format!(
                "for-update:{}",
                for_stmt
                    .update
                    .iter()
                    .map(expression_text)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            let defs = for_stmt.update.iter().flat_map(expression_defs).collect();
            Some(self.graph.add_node_with_defs(label, defs))
        };
        let exit = self.graph.add_node("for-exit");

        self.loop_stack.push(LoopContext { cond, exit });
        self.break_targets.push(exit);
        let (body_entry, body_exit) = self.build_branch(&for_stmt.body);
        self.break_targets.pop();
        self.loop_stack.pop();

        if let Some(init) = init {
            self.graph.add_edge(init, cond);
        }
        self.graph.add_edge(cond, body_entry);
        match update {
            Some(update) => {
                self.graph.add_edge(body_exit, update);
                self.graph.add_edge(update, cond);
            }
            None => self.graph.add_edge(body_exit, cond),
        }
        self.graph.add_edge(cond, exit);
        (init.unwrap_or(cond), exit)
    }

    fn build_foreach(&mut self, foreach: &ForEachStatement) -> (NodeId, NodeId) {
        let label = format!(
            "for-each: {} {} : {}",
            foreach.ty,
            foreach.name,
            expression_text(&foreach.iterable)
        );
        let defs = SsaName::parse(&foreach.name).into_iter().collect();
        let cond = self.graph.add_node_with_defs(label, defs);
        let exit = self.graph.add_node("for-exit");

        self.loop_stack.push(LoopContext { cond, exit });
        self.break_targets.push(exit);
        let (body_entry, body_exit) = self.build_branch(&foreach.body);
        self.break_targets.pop();
        self.loop_stack.pop();

        self.graph.add_edge(cond, body_entry);
        self.graph.add_edge(body_exit, cond);
        self.graph.add_edge(cond, exit);
        (cond, exit)
    }

    fn build_switch(&mut self, switch: &SwitchStatement) -> (NodeId, NodeId) {
        let selector = self
            .graph
            .add_node(format!("switch {}", expression_text(&switch.selector)));
        let merge = self.graph.add_node("switch-merge");

        self.break_targets.push(merge);
        for case in &switch.cases {
            let case_label = match &case.label {
                Some(label) => format!("case {}", expression_text(label)),
                None => "default:".to_string(),
            };
            let case_node = self.graph.add_node(case_label);
            self.graph.add_edge(selector, case_node);
            if case.statements.is_empty() {
                self.graph.add_edge(case_node, merge);
            } else {
                let (entry, exit) = self.build_statements(&case.statements);
                self.graph.add_edge(case_node, entry);
                if !self.is_terminal(exit) {
                    self.graph.add_edge(exit, merge);
                }
            }
        }
        self.break_targets.pop();
        (selector, merge)
    }
}

/// Versioned names a declaration defines.
fn declaration_defs(decl: &VariableDeclaration) -> Vec<SsaName> {
    decl.declarators
        .iter()
        .filter_map(|d| SsaName::parse(&d.name))
        .collect()
}

/// Versioned names an expression defines through (possibly nested)
/// assignments.
fn expression_defs(expr: &Expression) -> Vec<SsaName> {
    let mut defs = Vec::new();
    collect_expression_defs(expr, &mut defs);
    defs
}

fn collect_expression_defs(expr: &Expression, defs: &mut Vec<SsaName>) {
    match &expr.kind {
        ExpressionKind::Assign { target, value, .. } => {
            if let Some(name) = target.as_identifier() {
                if let Some(ssa) = SsaName::parse(name) {
                    defs.push(ssa);
                }
            }
            collect_expression_defs(value, defs);
        }
        ExpressionKind::IncDec { target, .. } => {
            if let Some(name) = target.as_identifier() {
                if let Some(ssa) = SsaName::parse(name) {
                    defs.push(ssa);
                }
            }
        }
        ExpressionKind::Unary { operand, .. } => collect_expression_defs(operand, defs),
        ExpressionKind::Binary { lhs, rhs, .. } => {
            collect_expression_defs(lhs, defs);
            collect_expression_defs(rhs, defs);
        }
        ExpressionKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            collect_expression_defs(cond, defs);
            collect_expression_defs(then_expr, defs);
            collect_expression_defs(else_expr, defs);
        }
        ExpressionKind::Call { args, .. } => {
            for arg in args {
                collect_expression_defs(arg, defs);
            }
        }
        ExpressionKind::Grouping(inner) => collect_expression_defs(inner, defs),
        ExpressionKind::Member { .. }
        | ExpressionKind::Index { .. }
        | ExpressionKind::Literal(_)
        | ExpressionKind::Identifier(_) => {}
    }
}
