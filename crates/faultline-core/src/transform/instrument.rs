//! Value-tracing instrumentation over GSA output.
//!
//! A `trace("name", name)` call lands after every initialized declaration and
//! every simple-name assignment; parameters are traced once at method entry.
//! Ternary initializers are lifted into `tempCond`/`tempThen`/`tempElse`/
//! `tempRes` temporaries so each leg's value is observable. Assignments to
//! names with no declaration in the method get an `int name = 0;` hoisted to
//! the body head so the trace calls compile.
//!
//! The emitted unit ends with a marker comment; instrumenting marked source
//! is a no-op.

use crate::codegen::emit_program;
use crate::config::PipelineConfig;
use crate::error::Result;
use faultline_parser::ast::*;
use faultline_parser::span::Span;
use indexmap::IndexSet;
use rustc_hash::FxHashMap;

/// Marker appended as a trailing comment to instrumented units.
pub const INSTRUMENTED_MARKER: &str = "faultline:instrumented";

/// Collector entry point the instrumented program calls.
const TRACE_FN: &str = "trace";

/// Instrument source text; already-marked input passes through unchanged.
pub fn instrument_source(source: &str, config: &PipelineConfig) -> Result<String> {
    if source.contains(INSTRUMENTED_MARKER) {
        return Ok(source.to_string());
    }
    let program = faultline_parser::parse(source)?;
    Ok(emit_program(&instrument_program(&program, config)))
}

/// Instrument a parsed unit.
pub fn instrument_program(program: &Program, config: &PipelineConfig) -> Program {
    Program {
        class_name: program.class_name.clone(),
        methods: program
            .methods
            .iter()
            .map(|m| instrument_method(m, config))
            .collect(),
        trailing_comment: Some(INSTRUMENTED_MARKER.to_string()),
    }
}

struct Instrumenter {
    /// Names with a declaration somewhere in the method (or a parameter).
    declared: IndexSet<String>,
    /// Declared type per name, for ternary temporaries.
    types: FxHashMap<String, Type>,
    /// Simple-name assignment targets seen during the walk.
    assigned: IndexSet<String>,
    /// Ternary temporary counter, per method.
    temp_counter: u32,
}

fn instrument_method(method: &MethodDeclaration, config: &PipelineConfig) -> MethodDeclaration {
    let Some(body) = &method.body else {
        return method.clone();
    };

    let mut method = method.clone();
    if method.name == "main" {
        adapt_main(&mut method, config);
    }
    let body = match &method.body {
        Some(body) => body.clone(),
        None => body.clone(),
    };

    let mut ctx = Instrumenter {
        declared: IndexSet::new(),
        types: FxHashMap::default(),
        assigned: IndexSet::new(),
        temp_counter: 1,
    };
    for param in &method.params {
        ctx.declared.insert(param.name.clone());
        ctx.types.insert(param.name.clone(), param.ty.clone());
    }
    collect_declared(&body.statements, &mut ctx);

    let instrumented = instrument_block(&body.statements, &mut ctx);

    let mut statements = Vec::new();
    // Assignments to undeclared names need a declaration to compile.
    for name in &ctx.assigned {
        if !ctx.declared.contains(name) {
            statements.push(Statement::Variable(VariableDeclaration {
                is_final: false,
                ty: Type::Int,
                declarators: vec![Declarator {
                    name: name.clone(),
                    init: Some(Expression::int(0, Span::dummy())),
                    span: Span::dummy(),
                }],
                span: Span::dummy(),
            }));
        }
    }
    for param in &method.params {
        if !matches!(param.ty, Type::Array(_)) {
            statements.push(trace_call(&param.name));
        }
    }
    statements.extend(instrumented);

    MethodDeclaration {
        body: Some(Block {
            statements,
            span: body.span,
        }),
        ..method
    }
}

/// `main` gets a canonical `args` parameter, and an `input_1` local is fed
/// from the first command-line argument with a configured fallback.
fn adapt_main(method: &mut MethodDeclaration, config: &PipelineConfig) {
    let Some(first) = method.params.first_mut() else {
        return;
    };
    let old_name = first.name.clone();
    if old_name != "args" {
        first.name = "args".to_string();
        if let Some(body) = &mut method.body {
            for stmt in &mut body.statements {
                rename_identifier(stmt, &old_name, "args");
            }
        }
    }
    if let Some(body) = &mut method.body {
        rewrite_input_initializer(&mut body.statements, config);
    }
}

fn rewrite_input_initializer(statements: &mut [Statement], config: &PipelineConfig) {
    for stmt in statements {
        match stmt {
            Statement::Variable(decl) => {
                for declarator in &mut decl.declarators {
                    if declarator.name == "input_1" && declarator.init.is_some() {
                        declarator.init = Some(input_from_args(config));
                    }
                }
            }
            Statement::Block(block) => rewrite_input_initializer(&mut block.statements, config),
            Statement::Labeled(labeled) => {
                if let Statement::Block(block) = labeled.body.as_mut() {
                    rewrite_input_initializer(&mut block.statements, config);
                }
            }
            _ => {}
        }
    }
}

/// `args.length > 0 ? Integer.parseInt(args[0]) : <default>`
fn input_from_args(config: &PipelineConfig) -> Expression {
    let args = || Expression::ident("args", Span::dummy());
    let length = Expression::new(
        ExpressionKind::Member {
            base: args().boxed(),
            name: "length".to_string(),
        },
        Span::dummy(),
    );
    let cond = Expression::new(
        ExpressionKind::Binary {
            op: BinaryOp::Gt,
            lhs: length.boxed(),
            rhs: Expression::int(0, Span::dummy()).boxed(),
        },
        Span::dummy(),
    );
    let parse_call = Expression::new(
        ExpressionKind::Call {
            callee: Expression::new(
                ExpressionKind::Member {
                    base: Expression::ident("Integer", Span::dummy()).boxed(),
                    name: "parseInt".to_string(),
                },
                Span::dummy(),
            )
            .boxed(),
            args: vec![Expression::new(
                ExpressionKind::Index {
                    base: args().boxed(),
                    index: Expression::int(0, Span::dummy()).boxed(),
                },
                Span::dummy(),
            )],
        },
        Span::dummy(),
    );
    Expression::new(
        ExpressionKind::Ternary {
            cond: cond.boxed(),
            then_expr: parse_call.boxed(),
            else_expr: Expression::int(config.default_input, Span::dummy()).boxed(),
        },
        Span::dummy(),
    )
}

fn rename_identifier(stmt: &mut Statement, from: &str, to: &str) {
    fn in_expr(expr: &mut Expression, from: &str, to: &str) {
        match &mut expr.kind {
            ExpressionKind::Identifier(name) => {
                if name.as_str() == from {
                    *name = to.to_string();
                }
            }
            ExpressionKind::Unary { operand, .. } => in_expr(operand, from, to),
            ExpressionKind::Binary { lhs, rhs, .. } => {
                in_expr(lhs, from, to);
                in_expr(rhs, from, to);
            }
            ExpressionKind::Assign { target, value, .. } => {
                in_expr(target, from, to);
                in_expr(value, from, to);
            }
            ExpressionKind::IncDec { target, .. } => in_expr(target, from, to),
            ExpressionKind::Ternary {
                cond,
                then_expr,
                else_expr,
            } => {
                in_expr(cond, from, to);
                in_expr(then_expr, from, to);
                in_expr(else_expr, from, to);
            }
            ExpressionKind::Call { callee, args } => {
                in_expr(callee, from, to);
                for arg in args {
                    in_expr(arg, from, to);
                }
            }
            ExpressionKind::Member { base, .. } => in_expr(base, from, to),
            ExpressionKind::Index { base, index } => {
                in_expr(base, from, to);
                in_expr(index, from, to);
            }
            ExpressionKind::Grouping(inner) => in_expr(inner, from, to),
            ExpressionKind::Literal(_) => {}
        }
    }

    visit_expressions(stmt, &mut |expr| in_expr(expr, from, to));
}

fn visit_expressions(stmt: &mut Statement, f: &mut impl FnMut(&mut Expression)) {
    match stmt {
        Statement::Variable(decl) => {
            for declarator in &mut decl.declarators {
                if let Some(init) = &mut declarator.init {
                    f(init);
                }
            }
        }
        Statement::Expression(es) => f(&mut es.expr),
        Statement::If(if_stmt) => {
            f(&mut if_stmt.condition);
            visit_expressions(&mut if_stmt.then_branch, f);
            if let Some(else_branch) = &mut if_stmt.else_branch {
                visit_expressions(else_branch, f);
            }
        }
        Statement::While(while_stmt) => {
            f(&mut while_stmt.condition);
            visit_expressions(&mut while_stmt.body, f);
        }
        Statement::DoWhile(do_stmt) => {
            visit_expressions(&mut do_stmt.body, f);
            f(&mut do_stmt.condition);
        }
        Statement::For(for_stmt) => {
            match &mut for_stmt.init {
                Some(ForInit::Declaration(decl)) => {
                    for declarator in &mut decl.declarators {
                        if let Some(init) = &mut declarator.init {
                            f(init);
                        }
                    }
                }
                Some(ForInit::Expressions(exprs)) => {
                    for expr in exprs {
                        f(expr);
                    }
                }
                None => {}
            }
            if let Some(cond) = &mut for_stmt.condition {
                f(cond);
            }
            for update in &mut for_stmt.update {
                f(update);
            }
            visit_expressions(&mut for_stmt.body, f);
        }
        Statement::ForEach(foreach) => {
            f(&mut foreach.iterable);
            visit_expressions(&mut foreach.body, f);
        }
        Statement::Switch(switch) => {
            f(&mut switch.selector);
            for case in &mut switch.cases {
                for stmt in &mut case.statements {
                    visit_expressions(stmt, f);
                }
            }
        }
        Statement::Return(ret) => {
            if let Some(value) = &mut ret.value {
                f(value);
            }
        }
        Statement::Throw(throw) => f(&mut throw.value),
        Statement::Block(block) => {
            for stmt in &mut block.statements {
                visit_expressions(stmt, f);
            }
        }
        Statement::Labeled(labeled) => visit_expressions(&mut labeled.body, f),
        Statement::Break(_) | Statement::Continue(_) | Statement::Empty(_) => {}
    }
}

fn collect_declared(statements: &[Statement], ctx: &mut Instrumenter) {
    for stmt in statements {
        match stmt {
            Statement::Variable(decl) => {
                for declarator in &decl.declarators {
                    ctx.declared.insert(declarator.name.clone());
                    ctx.types.insert(declarator.name.clone(), decl.ty.clone());
                }
            }
            Statement::If(if_stmt) => {
                collect_declared_sub(&if_stmt.then_branch, ctx);
                if let Some(else_branch) = &if_stmt.else_branch {
                    collect_declared_sub(else_branch, ctx);
                }
            }
            Statement::While(while_stmt) => collect_declared_sub(&while_stmt.body, ctx),
            Statement::DoWhile(do_stmt) => collect_declared_sub(&do_stmt.body, ctx),
            Statement::For(for_stmt) => {
                if let Some(ForInit::Declaration(decl)) = &for_stmt.init {
                    for declarator in &decl.declarators {
                        ctx.declared.insert(declarator.name.clone());
                        ctx.types.insert(declarator.name.clone(), decl.ty.clone());
                    }
                }
                collect_declared_sub(&for_stmt.body, ctx);
            }
            Statement::ForEach(foreach) => {
                ctx.declared.insert(foreach.name.clone());
                ctx.types.insert(foreach.name.clone(), foreach.ty.clone());
                collect_declared_sub(&foreach.body, ctx);
            }
            Statement::Switch(switch) => {
                for case in &switch.cases {
                    collect_declared(&case.statements, ctx);
                }
            }
            Statement::Block(block) => collect_declared(&block.statements, ctx),
            Statement::Labeled(labeled) => collect_declared_sub(&labeled.body, ctx),
            _ => {}
        }
    }
}

fn collect_declared_sub(stmt: &Statement, ctx: &mut Instrumenter) {
    collect_declared(std::slice::from_ref(stmt), ctx);
}

fn instrument_block(statements: &[Statement], ctx: &mut Instrumenter) -> Vec<Statement> {
    let mut out = Vec::with_capacity(statements.len());
    for stmt in statements {
        instrument_statement(stmt, ctx, &mut out);
    }
    out
}

fn instrument_substatement(stmt: &Statement, ctx: &mut Instrumenter) -> Statement {
    let mut out = Vec::new();
    match stmt {
        Statement::Block(block) => {
            return Statement::Block(Block {
                statements: instrument_block(&block.statements, ctx),
                span: block.span,
            })
        }
        other => instrument_statement(other, ctx, &mut out),
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

fn instrument_statement(stmt: &Statement, ctx: &mut Instrumenter, out: &mut Vec<Statement>) {
    match stmt {
        Statement::Variable(decl) => {
            let mut decl = decl.clone();
            for declarator in &mut decl.declarators {
                if let Some(init) = &declarator.init {
                    if let Some(lifted) =
                        lift_ternary(init, &decl.ty, ctx, out)
                    {
                        declarator.init = Some(lifted);
                    }
                }
            }
            let traces: Vec<Statement> = decl
                .declarators
                .iter()
                .filter(|d| d.init.is_some())
                .map(|d| trace_call(&d.name))
                .collect();
            out.push(Statement::Variable(decl));
            out.extend(traces);
        }
        Statement::Expression(es) => {
            if let ExpressionKind::Assign { op, target, value } = &es.expr.kind {
                if let Some(name) = target.as_identifier() {
                    let name = name.to_string();
                    ctx.assigned.insert(name.clone());
                    let value_ty = ctx.types.get(&name).cloned().unwrap_or(Type::Int);
                    let value = match lift_ternary(value, &value_ty, ctx, out) {
                        Some(lifted) => lifted,
                        None => value.as_ref().clone(),
                    };
                    out.push(Statement::Expression(ExpressionStatement {
                        expr: Expression::new(
                            ExpressionKind::Assign {
                                op: *op,
                                target: target.clone(),
                                value: value.boxed(),
                            },
                            es.expr.span,
                        ),
                        span: es.span,
                    }));
                    out.push(trace_call(&name));
                    return;
                }
            }
            out.push(Statement::Expression(es.clone()));
        }
        Statement::If(if_stmt) => {
            let then_branch = Box::new(instrument_substatement(&if_stmt.then_branch, ctx));
            let else_branch = if_stmt
                .else_branch
                .as_ref()
                .map(|b| Box::new(instrument_substatement(b, ctx)));
            out.push(Statement::If(IfStatement {
                condition: if_stmt.condition.clone(),
                then_branch,
                else_branch,
                span: if_stmt.span,
            }));
        }
        Statement::While(while_stmt) => {
            out.push(Statement::While(WhileStatement {
                condition: while_stmt.condition.clone(),
                body: Box::new(instrument_substatement(&while_stmt.body, ctx)),
                span: while_stmt.span,
            }));
        }
        Statement::DoWhile(do_stmt) => {
            out.push(Statement::DoWhile(DoWhileStatement {
                body: Box::new(instrument_substatement(&do_stmt.body, ctx)),
                condition: do_stmt.condition.clone(),
                span: do_stmt.span,
            }));
        }
        Statement::For(for_stmt) => {
            out.push(Statement::For(ForStatement {
                init: for_stmt.init.clone(),
                condition: for_stmt.condition.clone(),
                update: for_stmt.update.clone(),
                body: Box::new(instrument_substatement(&for_stmt.body, ctx)),
                span: for_stmt.span,
            }));
        }
        Statement::ForEach(foreach) => {
            out.push(Statement::ForEach(ForEachStatement {
                body: Box::new(instrument_substatement(&foreach.body, ctx)),
                ..foreach.clone()
            }));
        }
        Statement::Switch(switch) => {
            let cases = switch
                .cases
                .iter()
                .map(|case| SwitchCase {
                    label: case.label.clone(),
                    statements: instrument_block(&case.statements, ctx),
                    span: case.span,
                })
                .collect();
            out.push(Statement::Switch(SwitchStatement {
                selector: switch.selector.clone(),
                cases,
                span: switch.span,
            }));
        }
        Statement::Block(block) => {
            out.push(Statement::Block(Block {
                statements: instrument_block(&block.statements, ctx),
                span: block.span,
            }));
        }
        Statement::Labeled(labeled) => {
            out.push(Statement::Labeled(LabeledStatement {
                label: labeled.label.clone(),
                body: Box::new(instrument_substatement(&labeled.body, ctx)),
                span: labeled.span,
            }));
        }
        other => out.push(other.clone()),
    }
}

/// Lift `c ? t : e` into traced temporaries; returns the replacement
/// reference when the expression was a ternary.
fn lift_ternary(
    expr: &Expression,
    result_ty: &Type,
    ctx: &mut Instrumenter,
    out: &mut Vec<Statement>,
) -> Option<Expression> {
    let ExpressionKind::Ternary {
        cond,
        then_expr,
        else_expr,
    } = &strip_grouping(expr).kind
    else {
        return None;
    };
    let n = ctx.temp_counter;
    ctx.temp_counter += 1;
    let temp_cond = format!("tempCond{n}");
    let temp_then = format!("tempThen{n}");
    let temp_else = format!("tempElse{n}");
    let temp_res = format!("tempRes{n}");

    let mut push_temp = |name: &str, ty: Type, init: Expression, out: &mut Vec<Statement>| {
        ctx.declared.insert(name.to_string());
        out.push(Statement::Variable(VariableDeclaration {
            is_final: false,
            ty,
            declarators: vec![Declarator {
                name: name.to_string(),
                init: Some(init),
                span: Span::dummy(),
            }],
            span: Span::dummy(),
        }));
        out.push(trace_call(name));
    };

    push_temp(&temp_cond, Type::Boolean, cond.as_ref().clone(), out);
    push_temp(&temp_then, result_ty.clone(), then_expr.as_ref().clone(), out);
    push_temp(&temp_else, result_ty.clone(), else_expr.as_ref().clone(), out);
    let gate = Expression::new(
        ExpressionKind::Ternary {
            cond: Expression::ident(&temp_cond, Span::dummy()).boxed(),
            then_expr: Expression::ident(&temp_then, Span::dummy()).boxed(),
            else_expr: Expression::ident(&temp_else, Span::dummy()).boxed(),
        },
        Span::dummy(),
    );
    push_temp(&temp_res, result_ty.clone(), gate, out);

    Some(Expression::ident(temp_res, Span::dummy()))
}

fn strip_grouping(expr: &Expression) -> &Expression {
    match &expr.kind {
        ExpressionKind::Grouping(inner) => strip_grouping(inner),
        _ => expr,
    }
}

fn trace_call(name: &str) -> Statement {
    Statement::Expression(ExpressionStatement {
        expr: Expression::new(
            ExpressionKind::Call {
                callee: Expression::ident(TRACE_FN, Span::dummy()).boxed(),
                args: vec![
                    Expression::new(
                        ExpressionKind::Literal(Literal::Str(name.to_string())),
                        Span::dummy(),
                    ),
                    Expression::ident(name, Span::dummy()),
                ],
            },
            Span::dummy(),
        ),
        span: Span::dummy(),
    })
}
