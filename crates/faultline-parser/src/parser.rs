//! Recursive-descent parser producing the owned AST.
//!
//! Grammar is the C-family statement subset the pipeline analyzes: method
//! declarations (optionally wrapped in a single class), the statement forms
//! of §blocks/if/while/do/for/for-each/switch/return/break/continue/throw,
//! and expressions with Java operator precedence.

use crate::ast::*;
use crate::lexer::{Lexer, Token, TokenStream};
use crate::span::Span;
use crate::ParseError;

pub struct Parser {
    tokens: Vec<(Span, Token)>,
    pos: usize,
    eof: Span,
}

impl Parser {
    pub fn new(stream: TokenStream) -> Self {
        let eof = stream
            .tokens
            .last()
            .map(|(span, _)| Span::new(span.end, span.end, span.line, span.column))
            .unwrap_or_else(|| Span::new(0, 0, 1, 1));
        Parser {
            tokens: stream.tokens,
            pos: 0,
            eof,
        }
    }

    /// Parse a whole compilation unit.
    pub fn parse_program(source: &str) -> Result<Program, ParseError> {
        let stream = Lexer::new(source).tokenize()?;
        let trailing_comment = stream.trailing_comment.clone();
        let mut parser = Parser::new(stream);

        let mut class_name = None;
        let mut class_body = false;
        // Leading modifiers before `class` are accepted and dropped.
        while matches!(parser.peek(), Some(Token::Identifier(w)) if w == "public" || w == "abstract")
        {
            if matches!(parser.peek_at(1), Some(Token::Class)) {
                parser.advance();
            } else {
                break;
            }
        }
        if matches!(parser.peek(), Some(Token::Class)) {
            parser.advance();
            class_name = Some(parser.expect_identifier("class name")?);
            parser.expect(&Token::OpenBrace)?;
            class_body = true;
        }

        let mut methods = Vec::new();
        loop {
            match parser.peek() {
                None => break,
                Some(Token::CloseBrace) if class_body => {
                    parser.advance();
                    break;
                }
                _ => methods.push(parser.parse_method()?),
            }
        }

        if let Some((span, _)) = parser.current() {
            return Err(ParseError::new(span, "unexpected trailing input"));
        }

        Ok(Program {
            class_name,
            methods,
            trailing_comment,
        })
    }

    fn parse_method(&mut self) -> Result<MethodDeclaration, ParseError> {
        let start = self.current_span();
        let mut modifiers = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Identifier(word))
                    if matches!(word.as_str(), "public" | "private" | "protected" | "static") =>
                {
                    modifiers.push(word.clone());
                    self.advance();
                }
                Some(Token::Final) => {
                    modifiers.push("final".to_string());
                    self.advance();
                }
                _ => break,
            }
        }

        let return_type = self.parse_type()?;
        let name = self.expect_identifier("method name")?;
        self.expect(&Token::OpenParen)?;

        let mut params = Vec::new();
        if !matches!(self.peek(), Some(Token::CloseParen)) {
            loop {
                let param_start = self.current_span();
                let ty = self.parse_type()?;
                let pname = self.expect_identifier("parameter name")?;
                params.push(Parameter {
                    ty,
                    name: pname,
                    span: param_start,
                });
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&Token::CloseParen)?;

        let body = if matches!(self.peek(), Some(Token::Semicolon)) {
            self.advance();
            None
        } else {
            Some(self.parse_block()?)
        };

        let end = self.previous_span();
        Ok(MethodDeclaration {
            modifiers,
            return_type,
            name,
            params,
            body,
            span: start.merge(&end),
        })
    }

    fn parse_type(&mut self) -> Result<Type, ParseError> {
        let base = match self.peek() {
            Some(Token::Int) => Type::Int,
            Some(Token::Long) => Type::Long,
            Some(Token::Double) => Type::Double,
            Some(Token::Boolean) => Type::Boolean,
            Some(Token::StringType) => Type::Str,
            Some(Token::Void) => Type::Void,
            Some(Token::Identifier(name)) => Type::Named(name.clone()),
            _ => {
                return Err(ParseError::new(
                    self.current_span(),
                    format!("expected a type, found {}", self.describe_current()),
                ))
            }
        };
        self.advance();
        let mut ty = base;
        while matches!(self.peek(), Some(Token::OpenBracket))
            && matches!(self.peek_at(1), Some(Token::CloseBracket))
        {
            self.advance();
            self.advance();
            ty = Type::Array(Box::new(ty));
        }
        Ok(ty)
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let start = self.current_span();
        self.expect(&Token::OpenBrace)?;
        let mut statements = Vec::new();
        while !matches!(self.peek(), Some(Token::CloseBrace)) {
            if self.peek().is_none() {
                return Err(ParseError::new(start, "unterminated block"));
            }
            statements.push(self.parse_statement()?);
        }
        self.advance();
        let end = self.previous_span();
        Ok(Block {
            statements,
            span: start.merge(&end),
        })
    }

    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let span = self.current_span();
        match self.peek() {
            Some(Token::OpenBrace) => Ok(Statement::Block(self.parse_block()?)),
            Some(Token::Semicolon) => {
                self.advance();
                Ok(Statement::Empty(span))
            }
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => self.parse_while(),
            Some(Token::Do) => self.parse_do_while(),
            Some(Token::For) => self.parse_for(),
            Some(Token::Switch) => self.parse_switch(),
            Some(Token::Return) => {
                self.advance();
                let value = if matches!(self.peek(), Some(Token::Semicolon)) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.expect(&Token::Semicolon)?;
                Ok(Statement::Return(ReturnStatement { value, span }))
            }
            Some(Token::Break) => {
                self.advance();
                let label = self.take_optional_label();
                self.expect(&Token::Semicolon)?;
                Ok(Statement::Break(BreakStatement { label, span }))
            }
            Some(Token::Continue) => {
                self.advance();
                let label = self.take_optional_label();
                self.expect(&Token::Semicolon)?;
                Ok(Statement::Continue(ContinueStatement { label, span }))
            }
            Some(Token::Throw) => {
                self.advance();
                let value = self.parse_expression()?;
                self.expect(&Token::Semicolon)?;
                Ok(Statement::Throw(ThrowStatement { value, span }))
            }
            Some(Token::Final) => {
                let decl = self.parse_variable_declaration()?;
                Ok(Statement::Variable(decl))
            }
            _ if self.at_declaration() => {
                let decl = self.parse_variable_declaration()?;
                Ok(Statement::Variable(decl))
            }
            Some(Token::Identifier(_)) if matches!(self.peek_at(1), Some(Token::Colon)) => {
                let label = self.expect_identifier("label")?;
                self.advance(); // colon
                let body = self.parse_statement()?;
                Ok(Statement::Labeled(LabeledStatement {
                    label,
                    body: Box::new(body),
                    span,
                }))
            }
            Some(_) => {
                let expr = self.parse_expression()?;
                self.expect(&Token::Semicolon)?;
                Ok(Statement::Expression(ExpressionStatement { expr, span }))
            }
            None => Err(ParseError::new(self.eof, "unexpected end of input")),
        }
    }

    /// Lookahead: does a declaration start here? Covers builtin types, `T x`,
    /// and `T[] x` with a user type.
    fn at_declaration(&self) -> bool {
        match self.peek() {
            Some(
                Token::Int
                | Token::Long
                | Token::Double
                | Token::Boolean
                | Token::StringType
                | Token::Final,
            ) => true,
            Some(Token::Identifier(_)) => match self.peek_at(1) {
                Some(Token::Identifier(_)) => true,
                Some(Token::OpenBracket) => {
                    matches!(self.peek_at(2), Some(Token::CloseBracket))
                        && matches!(self.peek_at(3), Some(Token::Identifier(_)))
                }
                _ => false,
            },
            _ => false,
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<VariableDeclaration, ParseError> {
        let span = self.current_span();
        let is_final = if matches!(self.peek(), Some(Token::Final)) {
            self.advance();
            true
        } else {
            false
        };
        let ty = self.parse_type()?;
        let mut declarators = Vec::new();
        loop {
            let dspan = self.current_span();
            let name = self.expect_identifier("variable name")?;
            let init = if matches!(self.peek(), Some(Token::Assign)) {
                self.advance();
                Some(self.parse_expression()?)
            } else {
                None
            };
            declarators.push(Declarator {
                name,
                init,
                span: dspan,
            });
            if matches!(self.peek(), Some(Token::Comma)) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&Token::Semicolon)?;
        Ok(VariableDeclaration {
            is_final,
            ty,
            declarators,
            span,
        })
    }

    fn parse_if(&mut self) -> Result<Statement, ParseError> {
        let span = self.current_span();
        self.advance();
        self.expect(&Token::OpenParen)?;
        let condition = self.parse_expression()?;
        self.expect(&Token::CloseParen)?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if matches!(self.peek(), Some(Token::Else)) {
            self.advance();
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If(IfStatement {
            condition,
            then_branch,
            else_branch,
            span,
        }))
    }

    fn parse_while(&mut self) -> Result<Statement, ParseError> {
        let span = self.current_span();
        self.advance();
        self.expect(&Token::OpenParen)?;
        let condition = self.parse_expression()?;
        self.expect(&Token::CloseParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::While(WhileStatement {
            condition,
            body,
            span,
        }))
    }

    fn parse_do_while(&mut self) -> Result<Statement, ParseError> {
        let span = self.current_span();
        self.advance();
        let body = Box::new(self.parse_statement()?);
        self.expect(&Token::While)?;
        self.expect(&Token::OpenParen)?;
        let condition = self.parse_expression()?;
        self.expect(&Token::CloseParen)?;
        self.expect(&Token::Semicolon)?;
        Ok(Statement::DoWhile(DoWhileStatement {
            body,
            condition,
            span,
        }))
    }

    fn parse_for(&mut self) -> Result<Statement, ParseError> {
        let span = self.current_span();
        self.advance();
        self.expect(&Token::OpenParen)?;

        // For-each: `for (T name : iterable)`.
        if self.at_declaration() {
            let save = self.pos;
            let ty = self.parse_type()?;
            if matches!(self.peek(), Some(Token::Identifier(_)))
                && matches!(self.peek_at(1), Some(Token::Colon))
            {
                let name = self.expect_identifier("loop variable")?;
                self.advance(); // colon
                let iterable = self.parse_expression()?;
                self.expect(&Token::CloseParen)?;
                let body = Box::new(self.parse_statement()?);
                return Ok(Statement::ForEach(ForEachStatement {
                    ty,
                    name,
                    iterable,
                    body,
                    span,
                }));
            }
            self.pos = save;
        }

        let init = if matches!(self.peek(), Some(Token::Semicolon)) {
            self.advance();
            None
        } else if self.at_declaration() {
            Some(ForInit::Declaration(self.parse_variable_declaration()?))
        } else {
            let mut exprs = vec![self.parse_expression()?];
            while matches!(self.peek(), Some(Token::Comma)) {
                self.advance();
                exprs.push(self.parse_expression()?);
            }
            self.expect(&Token::Semicolon)?;
            Some(ForInit::Expressions(exprs))
        };

        let condition = if matches!(self.peek(), Some(Token::Semicolon)) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&Token::Semicolon)?;

        let mut update = Vec::new();
        if !matches!(self.peek(), Some(Token::CloseParen)) {
            update.push(self.parse_expression()?);
            while matches!(self.peek(), Some(Token::Comma)) {
                self.advance();
                update.push(self.parse_expression()?);
            }
        }
        self.expect(&Token::CloseParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::For(ForStatement {
            init,
            condition,
            update,
            body,
            span,
        }))
    }

    fn parse_switch(&mut self) -> Result<Statement, ParseError> {
        let span = self.current_span();
        self.advance();
        self.expect(&Token::OpenParen)?;
        let selector = self.parse_expression()?;
        self.expect(&Token::CloseParen)?;
        self.expect(&Token::OpenBrace)?;

        let mut cases = Vec::new();
        while !matches!(self.peek(), Some(Token::CloseBrace)) {
            let case_span = self.current_span();
            let label = match self.peek() {
                Some(Token::Case) => {
                    self.advance();
                    let label = self.parse_expression()?;
                    self.expect(&Token::Colon)?;
                    Some(label)
                }
                Some(Token::Default) => {
                    self.advance();
                    self.expect(&Token::Colon)?;
                    None
                }
                _ => {
                    return Err(ParseError::new(
                        case_span,
                        format!("expected `case` or `default`, found {}", self.describe_current()),
                    ))
                }
            };
            let mut statements = Vec::new();
            while !matches!(
                self.peek(),
                Some(Token::Case | Token::Default | Token::CloseBrace) | None
            ) {
                statements.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                label,
                statements,
                span: case_span,
            });
        }
        self.advance();
        Ok(Statement::Switch(SwitchStatement {
            selector,
            cases,
            span,
        }))
    }

    fn take_optional_label(&mut self) -> Option<String> {
        if let Some(Token::Identifier(name)) = self.peek() {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        }
    }

    // ── Expressions ──────────────────────────────────────────────────────

    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, ParseError> {
        let lhs = self.parse_ternary()?;
        let op = match self.peek() {
            Some(Token::Assign) => AssignOp::Assign,
            Some(Token::PlusAssign) => AssignOp::AddAssign,
            Some(Token::MinusAssign) => AssignOp::SubAssign,
            Some(Token::StarAssign) => AssignOp::MulAssign,
            Some(Token::SlashAssign) => AssignOp::DivAssign,
            Some(Token::PercentAssign) => AssignOp::RemAssign,
            _ => return Ok(lhs),
        };
        self.advance();
        let value = self.parse_assignment()?;
        let span = lhs.span.merge(&value.span);
        Ok(Expression::new(
            ExpressionKind::Assign {
                op,
                target: lhs.boxed(),
                value: value.boxed(),
            },
            span,
        ))
    }

    fn parse_ternary(&mut self) -> Result<Expression, ParseError> {
        let cond = self.parse_or()?;
        if !matches!(self.peek(), Some(Token::Question)) {
            return Ok(cond);
        }
        self.advance();
        let then_expr = self.parse_expression()?;
        self.expect(&Token::Colon)?;
        let else_expr = self.parse_ternary()?;
        let span = cond.span.merge(&else_expr.span);
        Ok(Expression::new(
            ExpressionKind::Ternary {
                cond: cond.boxed(),
                then_expr: then_expr.boxed(),
                else_expr: else_expr.boxed(),
            },
            span,
        ))
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::OrOr)) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Self::binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_equality()?;
        while matches!(self.peek(), Some(Token::AndAnd)) {
            self.advance();
            let rhs = self.parse_equality()?;
            lhs = Self::binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => BinaryOp::Eq,
                Some(Token::Ne) => BinaryOp::Ne,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_relational()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_relational(&mut self) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => BinaryOp::Lt,
                Some(Token::Le) => BinaryOp::Le,
                Some(Token::Gt) => BinaryOp::Gt,
                Some(Token::Ge) => BinaryOp::Ge,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                Some(Token::Percent) => BinaryOp::Rem,
                _ => return Ok(lhs),
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Self::binary(op, lhs, rhs);
        }
    }

    fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let span = self.current_span();
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                let operand = self.parse_unary()?;
                let span = span.merge(&operand.span);
                Ok(Expression::new(
                    ExpressionKind::Unary {
                        op: UnaryOp::Neg,
                        operand: operand.boxed(),
                    },
                    span,
                ))
            }
            Some(Token::Not) => {
                self.advance();
                let operand = self.parse_unary()?;
                let span = span.merge(&operand.span);
                Ok(Expression::new(
                    ExpressionKind::Unary {
                        op: UnaryOp::Not,
                        operand: operand.boxed(),
                    },
                    span,
                ))
            }
            Some(Token::PlusPlus | Token::MinusMinus) => {
                let op = if matches!(self.peek(), Some(Token::PlusPlus)) {
                    IncDecOp::Inc
                } else {
                    IncDecOp::Dec
                };
                self.advance();
                let target = self.parse_unary()?;
                let span = span.merge(&target.span);
                Ok(Expression::new(
                    ExpressionKind::IncDec {
                        op,
                        prefix: true,
                        target: target.boxed(),
                    },
                    span,
                ))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::OpenParen) => {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Token::CloseParen)) {
                        args.push(self.parse_expression()?);
                        while matches!(self.peek(), Some(Token::Comma)) {
                            self.advance();
                            args.push(self.parse_expression()?);
                        }
                    }
                    let close = self.current_span();
                    self.expect(&Token::CloseParen)?;
                    let span = expr.span.merge(&close);
                    expr = Expression::new(
                        ExpressionKind::Call {
                            callee: expr.boxed(),
                            args,
                        },
                        span,
                    );
                }
                Some(Token::Dot) => {
                    self.advance();
                    let name = self.expect_identifier("member name")?;
                    let span = expr.span.merge(&self.previous_span());
                    expr = Expression::new(
                        ExpressionKind::Member {
                            base: expr.boxed(),
                            name,
                        },
                        span,
                    );
                }
                Some(Token::OpenBracket) => {
                    self.advance();
                    let index = self.parse_expression()?;
                    let close = self.current_span();
                    self.expect(&Token::CloseBracket)?;
                    let span = expr.span.merge(&close);
                    expr = Expression::new(
                        ExpressionKind::Index {
                            base: expr.boxed(),
                            index: index.boxed(),
                        },
                        span,
                    );
                }
                Some(Token::PlusPlus | Token::MinusMinus) => {
                    let op = if matches!(self.peek(), Some(Token::PlusPlus)) {
                        IncDecOp::Inc
                    } else {
                        IncDecOp::Dec
                    };
                    let end = self.current_span();
                    self.advance();
                    let span = expr.span.merge(&end);
                    expr = Expression::new(
                        ExpressionKind::IncDec {
                            op,
                            prefix: false,
                            target: expr.boxed(),
                        },
                        span,
                    );
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        let span = self.current_span();
        let expr = match self.peek() {
            Some(Token::IntLiteral(v)) => {
                let v = *v;
                self.advance();
                Expression::new(ExpressionKind::Literal(Literal::Int(v)), span)
            }
            Some(Token::FloatLiteral(v)) => {
                let v = *v;
                self.advance();
                Expression::new(ExpressionKind::Literal(Literal::Float(v)), span)
            }
            Some(Token::True) => {
                self.advance();
                Expression::new(ExpressionKind::Literal(Literal::Bool(true)), span)
            }
            Some(Token::False) => {
                self.advance();
                Expression::new(ExpressionKind::Literal(Literal::Bool(false)), span)
            }
            Some(Token::StringLiteral(s)) => {
                let s = s.clone();
                self.advance();
                Expression::new(ExpressionKind::Literal(Literal::Str(s)), span)
            }
            Some(Token::CharLiteral(c)) => {
                let c = *c;
                self.advance();
                Expression::new(ExpressionKind::Literal(Literal::Char(c)), span)
            }
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                Expression::ident(name, span)
            }
            // `Integer.parseInt(...)` style: type keywords usable as a
            // qualifier resolve to identifiers here.
            Some(Token::StringType) => {
                self.advance();
                Expression::ident("String", span)
            }
            Some(Token::OpenParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                let close = self.current_span();
                self.expect(&Token::CloseParen)?;
                Expression::new(
                    ExpressionKind::Grouping(inner.boxed()),
                    span.merge(&close),
                )
            }
            _ => {
                return Err(ParseError::new(
                    span,
                    format!("expected an expression, found {}", self.describe_current()),
                ))
            }
        };
        Ok(expr)
    }

    fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Expression {
        let span = lhs.span.merge(&rhs.span);
        Expression::new(
            ExpressionKind::Binary {
                op,
                lhs: lhs.boxed(),
                rhs: rhs.boxed(),
            },
            span,
        )
    }

    // ── Token cursor ─────────────────────────────────────────────────────

    fn current(&self) -> Option<(Span, &Token)> {
        self.tokens.get(self.pos).map(|(span, token)| (*span, token))
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, token)| token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|(_, token)| token)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(span, _)| *span)
            .unwrap_or(self.eof)
    }

    fn previous_span(&self) -> Span {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|(span, _)| *span)
            .unwrap_or(self.eof)
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            Some(token) => format!("`{token}`"),
            None => "end of input".to_string(),
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), ParseError> {
        if self.peek() == Some(token) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(
                self.current_span(),
                format!("expected `{token}`, found {}", self.describe_current()),
            ))
        }
    }

    fn expect_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(ParseError::new(
                self.current_span(),
                format!("expected {what}, found {}", self.describe_current()),
            )),
        }
    }
}
