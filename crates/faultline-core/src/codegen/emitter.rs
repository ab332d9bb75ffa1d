//! AST-to-source emitter.
//!
//! The transformation stages are source-to-source, so every pass ends in a
//! call to [`emit_program`]. Emission normalizes layout (4-space indent,
//! braces around every branch body), which is what makes the transformer
//! idempotence checks textual.
//!
//! The single-line renderers ([`expression_text`], [`statement_label`]) are
//! shared with the CFG builder, whose node labels are exactly the rendered
//! statement text.

use faultline_parser::ast::*;

/// Output accumulator with indent management.
pub struct Emitter {
    output: String,
    indent_level: usize,
    indent_str: &'static str,
}

impl Default for Emitter {
    fn default() -> Self {
        Emitter::new()
    }
}

impl Emitter {
    pub fn new() -> Self {
        Emitter {
            output: String::new(),
            indent_level: 0,
            indent_str: "    ",
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn writeln(&mut self, s: &str) {
        self.output.push_str(s);
        self.output.push('\n');
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent_level {
            self.output.push_str(self.indent_str);
        }
    }

    pub fn emit_program(&mut self, program: &Program) {
        if let Some(class_name) = &program.class_name {
            self.writeln(&format!("public class {class_name} {{"));
            self.indent_level += 1;
        }
        for (i, method) in program.methods.iter().enumerate() {
            if i > 0 {
                self.writeln("");
            }
            self.emit_method(method);
        }
        if program.class_name.is_some() {
            self.indent_level -= 1;
            self.writeln("}");
        }
        if let Some(comment) = &program.trailing_comment {
            self.writeln(&format!("// {comment}"));
        }
    }

    fn emit_method(&mut self, method: &MethodDeclaration) {
        self.write_indent();
        for modifier in &method.modifiers {
            self.write(modifier);
            self.write(" ");
        }
        self.write(&format!("{} {}(", method.return_type, method.name));
        for (i, param) in method.params.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&format!("{} {}", param.ty, param.name));
        }
        self.write(")");
        match &method.body {
            Some(body) => {
                self.write(" ");
                self.emit_block_here(body);
                self.writeln("");
            }
            None => self.writeln(";"),
        }
    }

    /// Emit `{ ... }` starting at the cursor (no leading indent).
    fn emit_block_here(&mut self, block: &Block) {
        self.writeln("{");
        self.indent_level += 1;
        for stmt in &block.statements {
            self.emit_statement(stmt);
        }
        self.indent_level -= 1;
        self.write_indent();
        self.write("}");
    }

    /// Emit any statement as a braced block at the cursor.
    fn emit_branch(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Block(block) => self.emit_block_here(block),
            other => {
                self.writeln("{");
                self.indent_level += 1;
                self.emit_statement(other);
                self.indent_level -= 1;
                self.write_indent();
                self.write("}");
            }
        }
    }

    pub fn emit_statement(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Variable(decl) => {
                self.write_indent();
                self.write(&declaration_text(decl));
                self.writeln(";");
            }
            Statement::Expression(es) => {
                self.write_indent();
                self.write(&expression_text(&es.expr));
                self.writeln(";");
            }
            Statement::If(if_stmt) => {
                self.write_indent();
                self.write(&format!("if ({}) ", expression_text(&if_stmt.condition)));
                self.emit_branch(&if_stmt.then_branch);
                if let Some(else_branch) = &if_stmt.else_branch {
                    if let Statement::If(_) = else_branch.as_ref() {
                        self.write(" else ");
                        // `else if` chains stay flat.
                        let mark = self.output.len();
                        self.emit_statement(else_branch);
                        // emit_statement wrote its own indent; splice it out.
                        let indented: String = self.output.split_off(mark);
                        self.output.push_str(indented.trim_start());
                        return;
                    }
                    self.write(" else ");
                    self.emit_branch(else_branch);
                }
                self.writeln("");
            }
            Statement::While(while_stmt) => {
                self.write_indent();
                self.write(&format!(
                    "while ({}) ",
                    expression_text(&while_stmt.condition)
                ));
                self.emit_branch(&while_stmt.body);
                self.writeln("");
            }
            Statement::DoWhile(do_stmt) => {
                self.write_indent();
                self.write("do ");
                self.emit_branch(&do_stmt.body);
                self.writeln(&format!(
                    " while ({});",
                    expression_text(&do_stmt.condition)
                ));
            }
            Statement::For(for_stmt) => {
                self.write_indent();
                let init = match &for_stmt.init {
                    Some(ForInit::Declaration(decl)) => declaration_text(decl),
                    Some(ForInit::Expressions(exprs)) => join_expressions(exprs),
                    None => String::new(),
                };
                let cond = for_stmt
                    .condition
                    .as_ref()
                    .map(expression_text)
                    .unwrap_or_default();
                let update = join_expressions(&for_stmt.update);
                self.write(&format!("for ({init}; {cond}; {update}) "));
                self.emit_branch(&for_stmt.body);
                self.writeln("");
            }
            Statement::ForEach(foreach) => {
                self.write_indent();
                self.write(&format!(
                    "for ({} {} : {}) ",
                    foreach.ty,
                    foreach.name,
                    expression_text(&foreach.iterable)
                ));
                self.emit_branch(&foreach.body);
                self.writeln("");
            }
            Statement::Switch(switch) => {
                self.write_indent();
                self.writeln(&format!(
                    "switch ({}) {{",
                    expression_text(&switch.selector)
                ));
                self.indent_level += 1;
                for case in &switch.cases {
                    self.write_indent();
                    match &case.label {
                        Some(label) => self.writeln(&format!("case {}:", expression_text(label))),
                        None => self.writeln("default:"),
                    }
                    self.indent_level += 1;
                    for stmt in &case.statements {
                        self.emit_statement(stmt);
                    }
                    self.indent_level -= 1;
                }
                self.indent_level -= 1;
                self.write_indent();
                self.writeln("}");
            }
            Statement::Return(ret) => {
                self.write_indent();
                match &ret.value {
                    Some(value) => self.writeln(&format!("return {};", expression_text(value))),
                    None => self.writeln("return;"),
                }
            }
            Statement::Break(brk) => {
                self.write_indent();
                match &brk.label {
                    Some(label) => self.writeln(&format!("break {label};")),
                    None => self.writeln("break;"),
                }
            }
            Statement::Continue(cont) => {
                self.write_indent();
                match &cont.label {
                    Some(label) => self.writeln(&format!("continue {label};")),
                    None => self.writeln("continue;"),
                }
            }
            Statement::Throw(throw) => {
                self.write_indent();
                self.writeln(&format!("throw {};", expression_text(&throw.value)));
            }
            Statement::Block(block) => {
                self.write_indent();
                self.emit_block_here(block);
                self.writeln("");
            }
            Statement::Labeled(labeled) => {
                self.write_indent();
                self.write(&format!("{}: ", labeled.label));
                match labeled.body.as_ref() {
                    Statement::Block(block) => {
                        self.emit_block_here(block);
                        self.writeln("");
                    }
                    other => {
                        self.writeln("");
                        self.emit_statement(other);
                    }
                }
            }
            Statement::Empty(_) => {
                self.write_indent();
                self.writeln(";");
            }
        }
    }
}

/// Render a whole compilation unit.
pub fn emit_program(program: &Program) -> String {
    let mut emitter = Emitter::new();
    emitter.emit_program(program);
    emitter.finish()
}

fn join_expressions(exprs: &[Expression]) -> String {
    exprs
        .iter()
        .map(expression_text)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single-line rendering of an expression.
pub fn expression_text(expr: &Expression) -> String {
    match &expr.kind {
        ExpressionKind::Literal(lit) => literal_text(lit),
        ExpressionKind::Identifier(name) => name.clone(),
        ExpressionKind::Unary { op, operand } => {
            format!("{}{}", op.as_str(), expression_text(operand))
        }
        ExpressionKind::Binary { op, lhs, rhs } => format!(
            "{} {} {}",
            expression_text(lhs),
            op.as_str(),
            expression_text(rhs)
        ),
        ExpressionKind::Assign { op, target, value } => format!(
            "{} {} {}",
            expression_text(target),
            op.as_str(),
            expression_text(value)
        ),
        ExpressionKind::IncDec { op, prefix, target } => {
            let sigil = match op {
                IncDecOp::Inc => "++",
                IncDecOp::Dec => "--",
            };
            if *prefix {
                format!("{sigil}{}", expression_text(target))
            } else {
                format!("{}{sigil}", expression_text(target))
            }
        }
        ExpressionKind::Ternary {
            cond,
            then_expr,
            else_expr,
        } => format!(
            "{} ? {} : {}",
            expression_text(cond),
            expression_text(then_expr),
            expression_text(else_expr)
        ),
        ExpressionKind::Call { callee, args } => {
            format!("{}({})", expression_text(callee), join_expressions(args))
        }
        ExpressionKind::Member { base, name } => {
            format!("{}.{}", expression_text(base), name)
        }
        ExpressionKind::Index { base, index } => {
            format!("{}[{}]", expression_text(base), expression_text(index))
        }
        ExpressionKind::Grouping(inner) => format!("({})", expression_text(inner)),
    }
}

fn literal_text(lit: &Literal) -> String {
    match lit {
        Literal::Int(v) => v.to_string(),
        Literal::Float(v) => {
            if v.fract() == 0.0 && v.is_finite() {
                format!("{v:.1}")
            } else {
                v.to_string()
            }
        }
        Literal::Bool(v) => v.to_string(),
        Literal::Str(s) => {
            let mut out = String::from("\"");
            for ch in s.chars() {
                match ch {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    _ => out.push(ch),
                }
            }
            out.push('"');
            out
        }
        Literal::Char(c) => match c {
            '\'' => "'\\''".to_string(),
            '\n' => "'\\n'".to_string(),
            '\t' => "'\\t'".to_string(),
            '\\' => "'\\\\'".to_string(),
            other => format!("'{other}'"),
        },
    }
}

/// Single-line rendering of a declaration, without the trailing semicolon.
pub fn declaration_text(decl: &VariableDeclaration) -> String {
    let mut out = String::new();
    if decl.is_final {
        out.push_str("final ");
    }
    out.push_str(&decl.ty.to_string());
    out.push(' ');
    for (i, declarator) in decl.declarators.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&declarator.name);
        if let Some(init) = &declarator.init {
            out.push_str(" = ");
            out.push_str(&expression_text(init));
        }
    }
    out
}

/// CFG node label for a simple (non-compound) statement.
pub fn statement_label(stmt: &Statement) -> String {
    match stmt {
        Statement::Variable(decl) => declaration_text(decl),
        Statement::Expression(es) => expression_text(&es.expr),
        Statement::Return(ret) => match &ret.value {
            Some(value) => format!("return {}", expression_text(value)),
            None => "return".to_string(),
        },
        Statement::Throw(throw) => format!("throw {}", expression_text(&throw.value)),
        Statement::Break(brk) => match &brk.label {
            Some(label) => format!("break {label}"),
            None => "break".to_string(),
        },
        Statement::Continue(cont) => match &cont.label {
            Some(label) => format!("continue {label}"),
            None => "continue".to_string(),
        },
        Statement::Empty(_) => ";".to_string(),
        other => format!("<{:?}>", std::mem::discriminant(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn roundtrip(src: &str) -> String {
        let program = faultline_parser::parse(src).unwrap();
        emit_program(&program)
    }

    #[test]
    fn test_emit_simple_method() {
        let out = roundtrip(indoc! {"
            int simpleMethod(int x) {
                int result;
                if (x > 5) {
                    result = x * 2;
                } else {
                    result = x + 3;
                }
                return result;
            }
        "});
        assert_eq!(
            out,
            indoc! {"
                int simpleMethod(int x) {
                    int result;
                    if (x > 5) {
                        result = x * 2;
                    } else {
                        result = x + 3;
                    }
                    return result;
                }
            "}
        );
    }

    #[test]
    fn test_emit_is_stable() {
        let src = indoc! {"
            void m(int a) {
                while (a < 10) a = a + 1;
                do {
                    a = a - 1;
                } while (a > 0);
                for (int i = 0; i < 3; i++) {
                    f(i);
                }
            }
        "};
        let once = roundtrip(src);
        let twice = {
            let program = faultline_parser::parse(&once).unwrap();
            emit_program(&program)
        };
        assert_eq!(once, twice);
    }

    #[test]
    fn test_expression_text_forms() {
        let program =
            faultline_parser::parse("void m(int a) { int r = a > 0 ? f(a.b[1]) : -a; }").unwrap();
        let body = program.methods[0].body.as_ref().unwrap();
        let faultline_parser::ast::Statement::Variable(decl) = &body.statements[0] else {
            panic!("expected declaration");
        };
        let init = decl.declarators[0].init.as_ref().unwrap();
        assert_eq!(expression_text(init), "a > 0 ? f(a.b[1]) : -a");
    }

    #[test]
    fn test_trailing_comment_survives() {
        let out = roundtrip("void m() {\n}\n// marker line\n");
        assert!(out.ends_with("// marker line\n"));
    }

    #[test]
    fn test_labeled_block_and_switch() {
        let out = roundtrip(indoc! {"
            int m(int k) {
                methodBody: {
                    switch (k) {
                        case 1:
                            break methodBody;
                        default:
                            k = 0;
                    }
                }
                return k;
            }
        "});
        assert!(out.contains("methodBody: {"));
        assert!(out.contains("case 1:"));
        assert!(out.contains("break methodBody;"));
        assert!(out.contains("default:"));
    }
}
