//! Handwritten lexer for the analyzed language.
//!
//! A custom lexer keeps the token stream small and lets us track 1-based
//! line/column positions exactly, which the parent-map extractor depends on.

use crate::span::Span;
use crate::ParseError;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),
    CharLiteral(char),

    // keywords
    Int,
    Long,
    Double,
    Boolean,
    StringType,
    Void,
    Final,
    Class,
    If,
    Else,
    While,
    Do,
    For,
    Switch,
    Case,
    Default,
    Return,
    Break,
    Continue,
    Throw,
    New,
    True,
    False,

    // punctuation
    Semicolon,
    Comma,
    Colon,
    Question,
    Dot,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,

    // operators
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    PlusPlus,
    MinusMinus,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Not,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Identifier(name) => write!(f, "{name}"),
            Token::IntLiteral(v) => write!(f, "{v}"),
            Token::FloatLiteral(v) => write!(f, "{v}"),
            Token::StringLiteral(s) => write!(f, "\"{s}\""),
            Token::CharLiteral(c) => write!(f, "'{c}'"),
            Token::Int => write!(f, "int"),
            Token::Long => write!(f, "long"),
            Token::Double => write!(f, "double"),
            Token::Boolean => write!(f, "boolean"),
            Token::StringType => write!(f, "String"),
            Token::Void => write!(f, "void"),
            Token::Final => write!(f, "final"),
            Token::Class => write!(f, "class"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::While => write!(f, "while"),
            Token::Do => write!(f, "do"),
            Token::For => write!(f, "for"),
            Token::Switch => write!(f, "switch"),
            Token::Case => write!(f, "case"),
            Token::Default => write!(f, "default"),
            Token::Return => write!(f, "return"),
            Token::Break => write!(f, "break"),
            Token::Continue => write!(f, "continue"),
            Token::Throw => write!(f, "throw"),
            Token::New => write!(f, "new"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Question => write!(f, "?"),
            Token::Dot => write!(f, "."),
            Token::OpenParen => write!(f, "("),
            Token::CloseParen => write!(f, ")"),
            Token::OpenBrace => write!(f, "{{"),
            Token::CloseBrace => write!(f, "}}"),
            Token::OpenBracket => write!(f, "["),
            Token::CloseBracket => write!(f, "]"),
            Token::Assign => write!(f, "="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Percent => write!(f, "%"),
            Token::PlusAssign => write!(f, "+="),
            Token::MinusAssign => write!(f, "-="),
            Token::StarAssign => write!(f, "*="),
            Token::SlashAssign => write!(f, "/="),
            Token::PercentAssign => write!(f, "%="),
            Token::PlusPlus => write!(f, "++"),
            Token::MinusMinus => write!(f, "--"),
            Token::Eq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::AndAnd => write!(f, "&&"),
            Token::OrOr => write!(f, "||"),
            Token::Not => write!(f, "!"),
        }
    }
}

fn keyword(word: &str) -> Option<Token> {
    Some(match word {
        "int" => Token::Int,
        "long" => Token::Long,
        "double" => Token::Double,
        "boolean" => Token::Boolean,
        "String" => Token::StringType,
        "void" => Token::Void,
        "final" => Token::Final,
        "class" => Token::Class,
        "if" => Token::If,
        "else" => Token::Else,
        "while" => Token::While,
        "do" => Token::Do,
        "for" => Token::For,
        "switch" => Token::Switch,
        "case" => Token::Case,
        "default" => Token::Default,
        "return" => Token::Return,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "throw" => Token::Throw,
        "new" => Token::New,
        "true" => Token::True,
        "false" => Token::False,
        _ => return None,
    })
}

/// The full token stream for one compilation unit.
pub struct TokenStream {
    pub tokens: Vec<(Span, Token)>,
    /// Text of a `//` comment that closes the file, if any.
    pub trailing_comment: Option<String>,
}

pub struct Lexer<'input> {
    source: &'input str,
    chars: Peekable<CharIndices<'input>>,
    line: u32,
    column: u32,
}

impl<'input> Lexer<'input> {
    pub fn new(source: &'input str) -> Self {
        Lexer {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
        }
    }

    /// Lex the whole input.
    pub fn tokenize(mut self) -> Result<TokenStream, ParseError> {
        let mut tokens = Vec::new();
        let mut last_comment: Option<(usize, String)> = None;
        let mut last_token_end = 0usize;

        while let Some(&(offset, ch)) = self.chars.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\n' => {
                    self.bump();
                }
                '/' => {
                    // Comment or division.
                    let span = self.here(offset);
                    self.bump();
                    match self.chars.peek() {
                        Some(&(_, '/')) => {
                            let text = self.take_line_comment();
                            last_comment = Some((offset, text));
                        }
                        Some(&(_, '*')) => {
                            self.bump();
                            self.skip_block_comment(span)?;
                        }
                        Some(&(_, '=')) => {
                            self.bump();
                            tokens.push((self.span_to_here(span), Token::SlashAssign));
                            last_token_end = span.end.max(offset + 2);
                        }
                        _ => {
                            tokens.push((self.span_to_here(span), Token::Slash));
                            last_token_end = offset + 1;
                        }
                    }
                }
                _ if ch.is_ascii_alphabetic() || ch == '_' || ch == '$' => {
                    let span = self.here(offset);
                    let word = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
                    let token = keyword(&word).unwrap_or(Token::Identifier(word));
                    tokens.push((self.span_to_here(span), token));
                    last_token_end = self.offset();
                }
                _ if ch.is_ascii_digit() => {
                    let span = self.here(offset);
                    let token = self.take_number(span)?;
                    tokens.push((self.span_to_here(span), token));
                    last_token_end = self.offset();
                }
                '"' => {
                    let span = self.here(offset);
                    self.bump();
                    let token = self.take_string(span)?;
                    tokens.push((self.span_to_here(span), token));
                    last_token_end = self.offset();
                }
                '\'' => {
                    let span = self.here(offset);
                    self.bump();
                    let token = self.take_char(span)?;
                    tokens.push((self.span_to_here(span), token));
                    last_token_end = self.offset();
                }
                _ => {
                    let span = self.here(offset);
                    let token = self.take_operator(ch, span)?;
                    tokens.push((self.span_to_here(span), token));
                    last_token_end = self.offset();
                }
            }
        }

        // A comment only counts as trailing when no token follows it.
        let trailing_comment = match last_comment {
            Some((start, text)) if start >= last_token_end => Some(text),
            _ => None,
        };

        Ok(TokenStream {
            tokens,
            trailing_comment,
        })
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((_, ch)) = next {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        next
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(o, _)| o)
            .unwrap_or(self.source.len())
    }

    fn here(&self, offset: usize) -> Span {
        Span::new(offset, offset, self.line, self.column)
    }

    fn span_to_here(&mut self, start: Span) -> Span {
        Span::new(start.start, self.offset(), start.line, start.column)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(&(_, ch)) = self.chars.peek() {
            if pred(ch) {
                out.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    fn take_line_comment(&mut self) -> String {
        // Called with the peek at the second '/'.
        self.bump();
        let text = self.take_while(|c| c != '\n');
        text.trim().to_string()
    }

    fn skip_block_comment(&mut self, start: Span) -> Result<(), ParseError> {
        let mut prev = '\0';
        while let Some((_, ch)) = self.bump() {
            if prev == '*' && ch == '/' {
                return Ok(());
            }
            prev = ch;
        }
        Err(ParseError::new(start, "unterminated block comment"))
    }

    fn take_number(&mut self, span: Span) -> Result<Token, ParseError> {
        let integral = self.take_while(|c| c.is_ascii_digit());
        let is_float = matches!(self.chars.peek(), Some(&(_, '.')))
            && self
                .source
                .get(self.offset() + 1..)
                .and_then(|rest| rest.chars().next())
                .is_some_and(|c| c.is_ascii_digit());
        if is_float {
            self.bump();
            let frac = self.take_while(|c| c.is_ascii_digit());
            let text = format!("{integral}.{frac}");
            let value = text
                .parse::<f64>()
                .map_err(|_| ParseError::new(span, format!("invalid number `{text}`")))?;
            Ok(Token::FloatLiteral(value))
        } else {
            // Trailing L/l on long literals is accepted and dropped.
            if matches!(self.chars.peek(), Some(&(_, 'L' | 'l'))) {
                self.bump();
            }
            let value = integral
                .parse::<i64>()
                .map_err(|_| ParseError::new(span, format!("invalid number `{integral}`")))?;
            Ok(Token::IntLiteral(value))
        }
    }

    fn take_string(&mut self, span: Span) -> Result<Token, ParseError> {
        let mut out = String::new();
        while let Some((_, ch)) = self.bump() {
            match ch {
                '"' => return Ok(Token::StringLiteral(out)),
                '\\' => match self.bump() {
                    Some((_, 'n')) => out.push('\n'),
                    Some((_, 't')) => out.push('\t'),
                    Some((_, '\\')) => out.push('\\'),
                    Some((_, '"')) => out.push('"'),
                    Some((_, other)) => out.push(other),
                    None => break,
                },
                _ => out.push(ch),
            }
        }
        Err(ParseError::new(span, "unterminated string literal"))
    }

    fn take_char(&mut self, span: Span) -> Result<Token, ParseError> {
        let ch = match self.bump() {
            Some((_, '\\')) => match self.bump() {
                Some((_, 'n')) => '\n',
                Some((_, 't')) => '\t',
                Some((_, other)) => other,
                None => return Err(ParseError::new(span, "unterminated char literal")),
            },
            Some((_, ch)) => ch,
            None => return Err(ParseError::new(span, "unterminated char literal")),
        };
        match self.bump() {
            Some((_, '\'')) => Ok(Token::CharLiteral(ch)),
            _ => Err(ParseError::new(span, "unterminated char literal")),
        }
    }

    fn take_operator(&mut self, first: char, span: Span) -> Result<Token, ParseError> {
        self.bump();
        let second = self.chars.peek().map(|&(_, c)| c);
        let two = |lexer: &mut Self, token| {
            lexer.bump();
            token
        };
        let token = match (first, second) {
            (';', _) => Token::Semicolon,
            (',', _) => Token::Comma,
            (':', _) => Token::Colon,
            ('?', _) => Token::Question,
            ('.', _) => Token::Dot,
            ('(', _) => Token::OpenParen,
            (')', _) => Token::CloseParen,
            ('{', _) => Token::OpenBrace,
            ('}', _) => Token::CloseBrace,
            ('[', _) => Token::OpenBracket,
            (']', _) => Token::CloseBracket,
            ('+', Some('+')) => two(self, Token::PlusPlus),
            ('+', Some('=')) => two(self, Token::PlusAssign),
            ('+', _) => Token::Plus,
            ('-', Some('-')) => two(self, Token::MinusMinus),
            ('-', Some('=')) => two(self, Token::MinusAssign),
            ('-', _) => Token::Minus,
            ('*', Some('=')) => two(self, Token::StarAssign),
            ('*', _) => Token::Star,
            ('%', Some('=')) => two(self, Token::PercentAssign),
            ('%', _) => Token::Percent,
            ('=', Some('=')) => two(self, Token::Eq),
            ('=', _) => Token::Assign,
            ('!', Some('=')) => two(self, Token::Ne),
            ('!', _) => Token::Not,
            ('<', Some('=')) => two(self, Token::Le),
            ('<', _) => Token::Lt,
            ('>', Some('=')) => two(self, Token::Ge),
            ('>', _) => Token::Gt,
            ('&', Some('&')) => two(self, Token::AndAnd),
            ('|', Some('|')) => two(self, Token::OrOr),
            _ => {
                return Err(ParseError::new(
                    span,
                    format!("unexpected character `{first}`"),
                ))
            }
        };
        Ok(token)
    }
}
