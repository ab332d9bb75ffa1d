//! Gated single-assignment rewriting.
//!
//! Stages applied in order to the predicate-transformed source, one method
//! scope at a time:
//!
//! 1. renaming — parameters, declarations, reads and writes get versioned
//!    names (`x` -> `x_0`, boolean parameters start at `_1`);
//! 2. gating — an if/else writing the same base in both branches gets a
//!    `base_m = cond ? base_then : base_else` merge declaration after the if;
//! 3. loop-carried updates — a compound update inside a `while` keeps the
//!    enclosing merged version and routes the new value through `base_temp`;
//! 4. return rewriting — returned names move to the method's final version;
//! 5. single-exit conversion — non-void methods route every return through
//!    `_exit` and a labeled `methodBody` block.
//!
//! Running the transformer on its own output is a no-op: versioned names,
//! predicate references and the `methodBody` label all act as markers.

use super::is_predicate_name;
use crate::cfg::SsaName;
use faultline_parser::ast::*;
use faultline_parser::span::Span;
use indexmap::IndexSet;
use rustc_hash::FxHashMap;

/// Label wrapped around converted method bodies.
pub const METHOD_BODY_LABEL: &str = "methodBody";
/// Single-exit result variable.
pub const EXIT_VAR: &str = "_exit";

/// Apply the full GSA transformation to every method.
pub fn gated_single_assignment(program: &Program) -> Program {
    Program {
        class_name: program.class_name.clone(),
        methods: program.methods.iter().map(transform_method).collect(),
        trailing_comment: program.trailing_comment.clone(),
    }
}

fn transform_method(method: &MethodDeclaration) -> MethodDeclaration {
    let Some(body) = &method.body else {
        return method.clone();
    };
    if already_converted(body) {
        return method.clone();
    }

    let mut renamer = Renamer::default();
    let params = renamer.rename_params(&method.params);
    let mut statements = renamer.rename_block(&body.statements);
    rewrite_returns(&mut statements, &renamer.current);

    if !method.return_type.is_void() {
        statements = single_exit(statements, &method.return_type, body.span);
    }

    MethodDeclaration {
        modifiers: method.modifiers.clone(),
        return_type: method.return_type.clone(),
        name: method.name.clone(),
        params,
        body: Some(Block {
            statements,
            span: body.span,
        }),
        span: method.span,
    }
}

/// A converted body starts carrying the `methodBody` label.
fn already_converted(body: &Block) -> bool {
    body.statements.iter().any(
        |stmt| matches!(stmt, Statement::Labeled(labeled) if labeled.label == METHOD_BODY_LABEL),
    )
}

#[derive(Default)]
struct Renamer {
    /// Version a read of each base currently resolves to.
    current: FxHashMap<String, u32>,
    /// Highest version ever allocated per base; fresh writes always exceed it.
    highest: FxHashMap<String, u32>,
    /// Declared type per base, for merge and temporary declarations.
    types: FxHashMap<String, Type>,
    /// Assignment targets per open branch scope, innermost last.
    write_scopes: Vec<IndexSet<String>>,
    /// Loop-carried merges `(base, version)` per open `while`, innermost last.
    loop_merge_scopes: Vec<Vec<(String, u32)>>,
    while_depth: usize,
}

impl Renamer {
    fn rename_params(&mut self, params: &[Parameter]) -> Vec<Parameter> {
        params
            .iter()
            .map(|param| {
                if let Some(ssa) = SsaName::parse(&param.name) {
                    self.current.insert(ssa.base.clone(), ssa.version);
                    self.highest.insert(ssa.base.clone(), ssa.version);
                    self.types.insert(ssa.base, param.ty.clone());
                    return param.clone();
                }
                // Boolean parameters start at version 1, everything else at 0.
                let version = if param.ty.is_boolean() { 1 } else { 0 };
                self.current.insert(param.name.clone(), version);
                self.highest.insert(param.name.clone(), version);
                self.types.insert(param.name.clone(), param.ty.clone());
                Parameter {
                    ty: param.ty.clone(),
                    name: format!("{}_{version}", param.name),
                    span: param.span,
                }
            })
            .collect()
    }

    fn record_write(&mut self, base: &str) {
        if let Some(scope) = self.write_scopes.last_mut() {
            scope.insert(base.to_string());
        }
    }

    fn next_version(&mut self, base: &str) -> u32 {
        let version = self.highest.get(base).copied().unwrap_or(0) + 1;
        self.highest.insert(base.to_string(), version);
        self.current.insert(base.to_string(), version);
        version
    }

    fn rename_block(&mut self, statements: &[Statement]) -> Vec<Statement> {
        let mut out = Vec::with_capacity(statements.len());
        for stmt in statements {
            self.rename_statement(stmt, &mut out);
        }
        out
    }

    fn rename_substatement(&mut self, stmt: &Statement) -> Statement {
        let mut out = Vec::new();
        match stmt {
            Statement::Block(block) => {
                return Statement::Block(Block {
                    statements: self.rename_block(&block.statements),
                    span: block.span,
                });
            }
            other => self.rename_statement(other, &mut out),
        }
        if out.len() == 1 {
            out.swap_remove(0)
        } else {
            let span = stmt.span();
            Statement::Block(Block {
                statements: out,
                span,
            })
        }
    }

    fn rename_statement(&mut self, stmt: &Statement, out: &mut Vec<Statement>) {
        match stmt {
            Statement::Variable(decl) => self.rename_declaration(decl, out),
            Statement::Expression(es) => self.rename_expression_statement(es, out),
            Statement::If(if_stmt) => self.rename_if(if_stmt, out),
            Statement::While(while_stmt) => self.rename_while(while_stmt, out),
            Statement::DoWhile(do_stmt) => {
                let body = Box::new(self.rename_substatement(&do_stmt.body));
                let condition = self.rename_expr(&do_stmt.condition);
                out.push(Statement::DoWhile(DoWhileStatement {
                    body,
                    condition,
                    span: do_stmt.span,
                }));
            }
            Statement::Switch(switch) => {
                let selector = self.rename_expr(&switch.selector);
                let cases = switch
                    .cases
                    .iter()
                    .map(|case| SwitchCase {
                        label: case.label.clone(),
                        statements: self.rename_block(&case.statements),
                        span: case.span,
                    })
                    .collect();
                out.push(Statement::Switch(SwitchStatement {
                    selector,
                    cases,
                    span: switch.span,
                }));
            }
            Statement::ForEach(foreach) => {
                let iterable = self.rename_expr(&foreach.iterable);
                let version = self.next_version(&foreach.name);
                self.types
                    .insert(foreach.name.clone(), foreach.ty.clone());
                let name = format!("{}_{version}", foreach.name);
                let body = Box::new(self.rename_substatement(&foreach.body));
                out.push(Statement::ForEach(ForEachStatement {
                    ty: foreach.ty.clone(),
                    name,
                    iterable,
                    body,
                    span: foreach.span,
                }));
            }
            Statement::For(for_stmt) => {
                // For loops are rewritten to while by the predicate stage;
                // one that survives is renamed in place.
                let init = for_stmt.init.as_ref().map(|init| match init {
                    ForInit::Declaration(decl) => {
                        let mut tmp = Vec::new();
                        self.rename_declaration(decl, &mut tmp);
                        match tmp.swap_remove(0) {
                            Statement::Variable(decl) => ForInit::Declaration(decl),
                            _ => ForInit::Declaration(decl.clone()),
                        }
                    }
                    ForInit::Expressions(exprs) => {
                        ForInit::Expressions(exprs.iter().map(|e| self.rename_expr(e)).collect())
                    }
                });
                let condition = for_stmt.condition.as_ref().map(|c| self.rename_expr(c));
                let update = for_stmt.update.iter().map(|e| self.rename_expr(e)).collect();
                let body = Box::new(self.rename_substatement(&for_stmt.body));
                out.push(Statement::For(ForStatement {
                    init,
                    condition,
                    update,
                    body,
                    span: for_stmt.span,
                }));
            }
            Statement::Return(ret) => {
                let value = ret.value.as_ref().map(|v| self.rename_expr(v));
                out.push(Statement::Return(ReturnStatement {
                    value,
                    span: ret.span,
                }));
            }
            Statement::Throw(throw) => {
                out.push(Statement::Throw(ThrowStatement {
                    value: self.rename_expr(&throw.value),
                    span: throw.span,
                }));
            }
            Statement::Block(block) => {
                out.push(Statement::Block(Block {
                    statements: self.rename_block(&block.statements),
                    span: block.span,
                }));
            }
            Statement::Labeled(labeled) => {
                out.push(Statement::Labeled(LabeledStatement {
                    label: labeled.label.clone(),
                    body: Box::new(self.rename_substatement(&labeled.body)),
                    span: labeled.span,
                }));
            }
            Statement::Break(_) | Statement::Continue(_) | Statement::Empty(_) => {
                out.push(stmt.clone());
            }
        }
    }

    fn rename_declaration(&mut self, decl: &VariableDeclaration, out: &mut Vec<Statement>) {
        let declarators = decl
            .declarators
            .iter()
            .map(|declarator| {
                let init = declarator.init.as_ref().map(|init| self.rename_expr(init));
                let name = if is_predicate_name(&declarator.name) {
                    declarator.name.clone()
                } else if let Some(ssa) = SsaName::parse(&declarator.name) {
                    // Already versioned: adopt it.
                    let cur = self.current.get(&ssa.base).copied().unwrap_or(0);
                    self.current.insert(ssa.base.clone(), cur.max(ssa.version));
                    let high = self.highest.get(&ssa.base).copied().unwrap_or(0);
                    self.highest.insert(ssa.base.clone(), high.max(ssa.version));
                    self.types.insert(ssa.base, decl.ty.clone());
                    declarator.name.clone()
                } else {
                    let version = self.next_version(&declarator.name);
                    self.types
                        .insert(declarator.name.clone(), decl.ty.clone());
                    format!("{}_{version}", declarator.name)
                };
                Declarator {
                    name,
                    init,
                    span: declarator.span,
                }
            })
            .collect();
        out.push(Statement::Variable(VariableDeclaration {
            is_final: decl.is_final,
            ty: decl.ty.clone(),
            declarators,
            span: decl.span,
        }));
    }

    fn rename_expression_statement(&mut self, es: &ExpressionStatement, out: &mut Vec<Statement>) {
        match &es.expr.kind {
            ExpressionKind::Assign { op, target, value } => {
                if let Some(name) = target.as_identifier() {
                    let name = name.to_string();
                    let value = self.rename_expr(value);
                    self.rename_simple_assignment(&name, *op, value, es.span, out);
                    return;
                }
                // Non-simple targets (array element, member) keep their shape.
                out.push(Statement::Expression(ExpressionStatement {
                    expr: self.rename_expr(&es.expr),
                    span: es.span,
                }));
            }
            ExpressionKind::IncDec { op, target, .. } => {
                if let Some(name) = target.as_identifier() {
                    let name = name.to_string();
                    let binop = match op {
                        IncDecOp::Inc => BinaryOp::Add,
                        IncDecOp::Dec => BinaryOp::Sub,
                    };
                    let one = Expression::int(1, Span::dummy());
                    self.rename_compound(&name, binop, one, es.span, out);
                    return;
                }
                out.push(Statement::Expression(es.clone()));
            }
            _ => out.push(Statement::Expression(ExpressionStatement {
                expr: self.rename_expr(&es.expr),
                span: es.span,
            })),
        }
    }

    fn rename_simple_assignment(
        &mut self,
        name: &str,
        op: AssignOp,
        value: Expression,
        span: Span,
        out: &mut Vec<Statement>,
    ) {
        if is_predicate_name(name) || SsaName::parse(name).is_some() || name == EXIT_VAR {
            // Predicates version themselves; versioned targets are left as
            // found so a second run changes nothing.
            out.push(assignment(name, op, value, span));
            return;
        }
        match op.binary_op() {
            Some(binop) => self.rename_compound(name, binop, value, span, out),
            None => {
                let version = self.next_version(name);
                self.record_write(name);
                out.push(assignment(
                    &format!("{name}_{version}"),
                    AssignOp::Assign,
                    value,
                    span,
                ));
            }
        }
    }

    /// Compound updates: inside a `while` on an already-versioned base, the
    /// merged version is kept and the new value goes through `base_temp`;
    /// elsewhere they desugar to a fresh-version assignment.
    fn rename_compound(
        &mut self,
        name: &str,
        binop: BinaryOp,
        value: Expression,
        span: Span,
        out: &mut Vec<Statement>,
    ) {
        let merged_version = self.current.get(name).copied().unwrap_or(0);
        if self.while_depth > 0 && merged_version >= 1 {
            let merged = format!("{name}_{merged_version}");
            let temp = format!("{name}_temp");
            let ty = self.types.get(name).cloned().unwrap_or(Type::Int);
            let new_value = Expression::new(
                ExpressionKind::Binary {
                    op: binop,
                    lhs: Expression::ident(&merged, Span::dummy()).boxed(),
                    rhs: value.boxed(),
                },
                span,
            );
            out.push(Statement::Variable(VariableDeclaration {
                is_final: false,
                ty,
                declarators: vec![Declarator {
                    name: temp.clone(),
                    init: Some(new_value),
                    span,
                }],
                span,
            }));
            out.push(assignment(
                &merged,
                AssignOp::Assign,
                Expression::ident(&temp, Span::dummy()),
                span,
            ));
            if let Some(scope) = self.loop_merge_scopes.last_mut() {
                scope.push((name.to_string(), merged_version));
            }
            return;
        }

        let old = format!("{name}_{}", self.current.get(name).copied().unwrap_or(0));
        let version = self.next_version(name);
        self.record_write(name);
        let new_value = Expression::new(
            ExpressionKind::Binary {
                op: binop,
                lhs: Expression::ident(&old, Span::dummy()).boxed(),
                rhs: value.boxed(),
            },
            span,
        );
        out.push(assignment(
            &format!("{name}_{version}"),
            AssignOp::Assign,
            new_value,
            span,
        ));
    }

    fn rename_if(&mut self, if_stmt: &IfStatement, out: &mut Vec<Statement>) {
        let condition = self.rename_expr(&if_stmt.condition);
        let snapshot = self.current.clone();

        self.write_scopes.push(IndexSet::new());
        let then_branch = Box::new(self.rename_substatement(&if_stmt.then_branch));
        let then_writes = self.write_scopes.pop().unwrap_or_default();
        let then_versions = self.current.clone();

        let (else_branch, else_writes, else_versions) = match &if_stmt.else_branch {
            Some(else_branch) => {
                self.current = snapshot.clone();
                self.write_scopes.push(IndexSet::new());
                let renamed = Box::new(self.rename_substatement(else_branch));
                let writes = self.write_scopes.pop().unwrap_or_default();
                (Some(renamed), writes, self.current.clone())
            }
            None => (None, IndexSet::new(), snapshot.clone()),
        };

        out.push(Statement::If(IfStatement {
            condition: condition.clone(),
            then_branch,
            else_branch,
            span: if_stmt.span,
        }));

        // Versions after the if: merged bases get a gating declaration, bases
        // written on one side keep that side's version.
        self.current = snapshot;
        for base in then_writes.union(&else_writes) {
            let then_v = then_versions.get(base).copied().unwrap_or(0);
            let else_v = else_versions.get(base).copied().unwrap_or(0);
            if then_writes.contains(base) && else_writes.contains(base) {
                let merged = self.highest.get(base).copied().unwrap_or(0) + 1;
                self.highest.insert(base.clone(), merged);
                self.current.insert(base.clone(), merged);
                self.record_write(base);
                let ty = self.types.get(base).cloned().unwrap_or(Type::Int);
                let gate = Expression::new(
                    ExpressionKind::Ternary {
                        cond: condition.clone().boxed(),
                        then_expr: Expression::ident(format!("{base}_{then_v}"), Span::dummy())
                            .boxed(),
                        else_expr: Expression::ident(format!("{base}_{else_v}"), Span::dummy())
                            .boxed(),
                    },
                    Span::dummy(),
                );
                out.push(Statement::Variable(VariableDeclaration {
                    is_final: false,
                    ty,
                    declarators: vec![Declarator {
                        name: format!("{base}_{merged}"),
                        init: Some(gate),
                        span: Span::dummy(),
                    }],
                    span: Span::dummy(),
                }));
            } else {
                let version = then_v.max(else_v);
                self.current.insert(base.clone(), version);
                self.record_write(base);
            }
        }
    }

    fn rename_while(&mut self, while_stmt: &WhileStatement, out: &mut Vec<Statement>) {
        let condition = self.rename_expr(&while_stmt.condition);

        self.while_depth += 1;
        self.loop_merge_scopes.push(Vec::new());
        let body = Box::new(self.rename_substatement(&while_stmt.body));
        let merges = self.loop_merge_scopes.pop().unwrap_or_default();
        self.while_depth -= 1;

        // Refresh the predicate declaration's initializer: any reference to a
        // merged base, suffixed or not, now means the merged version.
        if let Some(predicate) = condition.as_identifier() {
            for stmt in out.iter_mut() {
                if let Statement::Variable(decl) = stmt {
                    for declarator in &mut decl.declarators {
                        if declarator.name == predicate {
                            if let Some(init) = &mut declarator.init {
                                for (base, version) in &merges {
                                    substitute_base(init, base, &format!("{base}_{version}"));
                                }
                            }
                        }
                    }
                }
            }
        }

        out.push(Statement::While(WhileStatement {
            condition,
            body,
            span: while_stmt.span,
        }));
    }

    fn rename_expr(&mut self, expr: &Expression) -> Expression {
        let kind = match &expr.kind {
            ExpressionKind::Identifier(name) => {
                if is_predicate_name(name) || SsaName::parse(name).is_some() || name == EXIT_VAR {
                    ExpressionKind::Identifier(name.clone())
                } else {
                    let version = self.current.get(name).copied().unwrap_or(0);
                    ExpressionKind::Identifier(format!("{name}_{version}"))
                }
            }
            ExpressionKind::Literal(lit) => ExpressionKind::Literal(lit.clone()),
            ExpressionKind::Unary { op, operand } => ExpressionKind::Unary {
                op: *op,
                operand: self.rename_expr(operand).boxed(),
            },
            ExpressionKind::Binary { op, lhs, rhs } => ExpressionKind::Binary {
                op: *op,
                lhs: self.rename_expr(lhs).boxed(),
                rhs: self.rename_expr(rhs).boxed(),
            },
            ExpressionKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => ExpressionKind::Ternary {
                cond: self.rename_expr(cond).boxed(),
                then_expr: self.rename_expr(then_expr).boxed(),
                else_expr: self.rename_expr(else_expr).boxed(),
            },
            ExpressionKind::Grouping(inner) => {
                ExpressionKind::Grouping(self.rename_expr(inner).boxed())
            }
            ExpressionKind::Index { base, index } => ExpressionKind::Index {
                base: self.rename_expr(base).boxed(),
                index: self.rename_expr(index).boxed(),
            },
            ExpressionKind::Call { callee, args } => ExpressionKind::Call {
                // Callees are function names, not variables.
                callee: self.rename_callee(callee).boxed(),
                args: args.iter().map(|arg| self.rename_expr(arg)).collect(),
            },
            ExpressionKind::Member { base, name } => ExpressionKind::Member {
                base: self.rename_member_base(base).boxed(),
                name: name.clone(),
            },
            ExpressionKind::Assign { op, target, value } => ExpressionKind::Assign {
                op: *op,
                target: target.clone(),
                value: self.rename_expr(value).boxed(),
            },
            ExpressionKind::IncDec { op, prefix, target } => ExpressionKind::IncDec {
                op: *op,
                prefix: *prefix,
                target: target.clone(),
            },
        };
        Expression::new(kind, expr.span)
    }

    fn rename_callee(&mut self, callee: &Expression) -> Expression {
        match &callee.kind {
            ExpressionKind::Identifier(_) => callee.clone(),
            ExpressionKind::Member { base, name } => Expression::new(
                ExpressionKind::Member {
                    base: self.rename_member_base(base).boxed(),
                    name: name.clone(),
                },
                callee.span,
            ),
            _ => self.rename_expr(callee),
        }
    }

    /// A leading uppercase identifier in a member chain is a type reference,
    /// not a variable.
    fn rename_member_base(&mut self, base: &Expression) -> Expression {
        if let ExpressionKind::Identifier(name) = &base.kind {
            if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                return base.clone();
            }
        }
        self.rename_expr(base)
    }
}

fn assignment(name: &str, op: AssignOp, value: Expression, span: Span) -> Statement {
    Statement::Expression(ExpressionStatement {
        expr: Expression::new(
            ExpressionKind::Assign {
                op,
                target: Expression::ident(name, Span::dummy()).boxed(),
                value: value.boxed(),
            },
            span,
        ),
        span,
    })
}

/// Replace references to `base` (with or without a version suffix) by
/// `replacement`, in place.
fn substitute_base(expr: &mut Expression, base: &str, replacement: &str) {
    match &mut expr.kind {
        ExpressionKind::Identifier(name) => {
            let matches_base = name.as_str() == base
                || SsaName::parse(name).is_some_and(|ssa| ssa.base == base);
            if matches_base {
                *name = replacement.to_string();
            }
        }
        ExpressionKind::Unary { operand, .. } => substitute_base(operand, base, replacement),
        ExpressionKind::Binary { lhs, rhs, .. } => {
            substitute_base(lhs, base, replacement);
            substitute_base(rhs, base, replacement);
        }
        ExpressionKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => {
            substitute_base(cond, base, replacement);
            substitute_base(then_expr, base, replacement);
            substitute_base(else_expr, base, replacement);
        }
        ExpressionKind::Grouping(inner) => substitute_base(inner, base, replacement),
        ExpressionKind::Index { base: b, index } => {
            substitute_base(b, base, replacement);
            substitute_base(index, base, replacement);
        }
        ExpressionKind::Call { args, .. } => {
            for arg in args {
                substitute_base(arg, base, replacement);
            }
        }
        ExpressionKind::Member { .. }
        | ExpressionKind::Literal(_)
        | ExpressionKind::Assign { .. }
        | ExpressionKind::IncDec { .. } => {}
    }
}

/// Replace returned names with the method's final version.
fn rewrite_returns(statements: &mut [Statement], final_versions: &FxHashMap<String, u32>) {
    for stmt in statements {
        rewrite_return_statement(stmt, final_versions);
    }
}

fn rewrite_return_statement(stmt: &mut Statement, final_versions: &FxHashMap<String, u32>) {
    match stmt {
        Statement::Return(ret) => {
            if let Some(value) = &mut ret.value {
                if let ExpressionKind::Identifier(name) = &mut value.kind {
                    if let Some(ssa) = SsaName::parse(name) {
                        if let Some(&latest) = final_versions.get(&ssa.base) {
                            if latest != ssa.version && !is_predicate_name(name) {
                                *name = format!("{}_{latest}", ssa.base);
                            }
                        }
                    }
                }
            }
        }
        Statement::If(if_stmt) => {
            rewrite_return_statement(&mut if_stmt.then_branch, final_versions);
            if let Some(else_branch) = &mut if_stmt.else_branch {
                rewrite_return_statement(else_branch, final_versions);
            }
        }
        Statement::While(while_stmt) => {
            rewrite_return_statement(&mut while_stmt.body, final_versions)
        }
        Statement::DoWhile(do_stmt) => rewrite_return_statement(&mut do_stmt.body, final_versions),
        Statement::For(for_stmt) => rewrite_return_statement(&mut for_stmt.body, final_versions),
        Statement::ForEach(foreach) => rewrite_return_statement(&mut foreach.body, final_versions),
        Statement::Switch(switch) => {
            for case in &mut switch.cases {
                rewrite_returns(&mut case.statements, final_versions);
            }
        }
        Statement::Block(block) => rewrite_returns(&mut block.statements, final_versions),
        Statement::Labeled(labeled) => rewrite_return_statement(&mut labeled.body, final_versions),
        _ => {}
    }
}

/// Wrap a non-void body in `_exit` + labeled block + trailing return.
fn single_exit(statements: Vec<Statement>, return_type: &Type, span: Span) -> Vec<Statement> {
    let mut inner = statements;
    for stmt in &mut inner {
        replace_returns_with_breaks(stmt);
    }

    vec![
        Statement::Variable(VariableDeclaration {
            is_final: false,
            ty: return_type.clone(),
            declarators: vec![Declarator {
                name: EXIT_VAR.to_string(),
                init: None,
                span: Span::dummy(),
            }],
            span: Span::dummy(),
        }),
        Statement::Labeled(LabeledStatement {
            label: METHOD_BODY_LABEL.to_string(),
            body: Box::new(Statement::Block(Block {
                statements: inner,
                span,
            })),
            span: Span::dummy(),
        }),
        Statement::Return(ReturnStatement {
            value: Some(Expression::ident(EXIT_VAR, Span::dummy())),
            span: Span::dummy(),
        }),
    ]
}

fn replace_returns_with_breaks(stmt: &mut Statement) {
    match stmt {
        Statement::Return(ret) => {
            let span = ret.span;
            let replacement = match ret.value.take() {
                Some(value) => Statement::Block(Block {
                    statements: vec![
                        assignment(EXIT_VAR, AssignOp::Assign, value, span),
                        Statement::Break(BreakStatement {
                            label: Some(METHOD_BODY_LABEL.to_string()),
                            span,
                        }),
                    ],
                    span,
                }),
                None => Statement::Break(BreakStatement {
                    label: Some(METHOD_BODY_LABEL.to_string()),
                    span,
                }),
            };
            *stmt = replacement;
        }
        Statement::If(if_stmt) => {
            replace_returns_with_breaks(&mut if_stmt.then_branch);
            if let Some(else_branch) = &mut if_stmt.else_branch {
                replace_returns_with_breaks(else_branch);
            }
        }
        Statement::While(while_stmt) => replace_returns_with_breaks(&mut while_stmt.body),
        Statement::DoWhile(do_stmt) => replace_returns_with_breaks(&mut do_stmt.body),
        Statement::For(for_stmt) => replace_returns_with_breaks(&mut for_stmt.body),
        Statement::ForEach(foreach) => replace_returns_with_breaks(&mut foreach.body),
        Statement::Switch(switch) => {
            for case in &mut switch.cases {
                for stmt in &mut case.statements {
                    replace_returns_with_breaks(stmt);
                }
            }
        }
        Statement::Block(block) => {
            for stmt in &mut block.statements {
                replace_returns_with_breaks(stmt);
            }
        }
        Statement::Labeled(labeled) => replace_returns_with_breaks(&mut labeled.body),
        _ => {}
    }
}
