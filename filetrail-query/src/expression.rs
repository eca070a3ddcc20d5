// Copyright 2025 Filetrail Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Expression language: lexer, AST and Pratt parser
//!
//! A JMESPath-style subset for selecting, filtering and projecting JSON:
//!
//! | Form | Example |
//! |------|---------|
//! | field / current node | `message`, `@` |
//! | sub-expression | `operation.kind` |
//! | index, slice | `[0]`, `[-1]`, `[1:3]`, `[::2]` |
//! | list / value projection | `[*].id`, `*.path` |
//! | flatten | `[*].files[]` |
//! | filter | `[?length(files) > \`1\`]` |
//! | comparison, logic | `==`, `!=`, `<`, `<=`, `>`, `>=`, `&&`, `\|\|`, `!` |
//! | literals | `'raw'`, `` `{"json": true}` ``, `42` |
//! | multiselect | `[id, message]`, `{id: id, n: length(files)}` |
//! | pipe | `[*].files[] \| [0]` |
//! | functions | `length`, `contains`, `starts_with`, `ends_with`, `to_string` |
//!
//! Parsing is bounded by [`MAX_EXPRESSION_LENGTH`] and
//! [`MAX_NESTING_DEPTH`] and never panics on malformed input.

use crate::error::QueryError;
use filetrail_core::CancellationToken;
use serde_json::Value;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

/// Longest expression accepted by the parser
pub const MAX_EXPRESSION_LENGTH: usize = 4096;

/// Maximum nesting of sub-expressions
pub const MAX_NESTING_DEPTH: usize = 128;

/// Tokens with a binding power below this end a projection
const PROJECTION_STOP: usize = 10;

// ============================================================================
// AST
// ============================================================================

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Length,
    Contains,
    StartsWith,
    EndsWith,
    ToString,
}

impl Function {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "length" => Some(Function::Length),
            "contains" => Some(Function::Contains),
            "starts_with" => Some(Function::StartsWith),
            "ends_with" => Some(Function::EndsWith),
            "to_string" => Some(Function::ToString),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Length => "length",
            Function::Contains => "contains",
            Function::StartsWith => "starts_with",
            Function::EndsWith => "ends_with",
            Function::ToString => "to_string",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Function::Length | Function::ToString => 1,
            Function::Contains | Function::StartsWith | Function::EndsWith => 2,
        }
    }
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Ast {
    /// `@`
    Current,
    Field(String),
    /// Evaluate the right side against the result of the left
    Subexpr(Box<Ast>, Box<Ast>),
    Index(i64),
    Slice {
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    },
    /// Apply the right side to every element of the (array) left side
    Projection(Box<Ast>, Box<Ast>),
    /// Apply the right side to every value of the (object) left side
    ObjectProjection(Box<Ast>, Box<Ast>),
    FilterProjection {
        lhs: Box<Ast>,
        predicate: Box<Ast>,
        rhs: Box<Ast>,
    },
    Flatten(Box<Ast>),
    Comparison {
        op: Comparator,
        lhs: Box<Ast>,
        rhs: Box<Ast>,
    },
    And(Box<Ast>, Box<Ast>),
    Or(Box<Ast>, Box<Ast>),
    Not(Box<Ast>),
    Literal(Value),
    MultiList(Vec<Ast>),
    MultiHash(Vec<(String, Ast)>),
    Pipe(Box<Ast>, Box<Ast>),
    Function {
        function: Function,
        args: Vec<Ast>,
    },
}

/// Left side followed by right side, eliding a leading `@`
fn chain(lhs: Ast, rhs: Ast) -> Ast {
    if lhs == Ast::Current {
        rhs
    } else {
        Ast::Subexpr(Box::new(lhs), Box::new(rhs))
    }
}

// ============================================================================
// Compiled expression
// ============================================================================

/// A parsed, reusable expression
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    source: String,
    ast: Ast,
}

impl Expression {
    pub fn parse(source: &str) -> Result<Self, QueryError> {
        Ok(Self {
            source: source.to_string(),
            ast: parse(source)?,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Evaluate against `data`
    pub fn search(&self, data: &Value) -> Result<Value, QueryError> {
        self.search_with(data, &CancellationToken::new())
    }

    /// Evaluate against `data`, polling `token` between projected elements
    pub fn search_with(&self, data: &Value, token: &CancellationToken) -> Result<Value, QueryError> {
        crate::eval::evaluate(&self.ast, data, token)
    }
}

impl FromStr for Expression {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Expression::parse(s)
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Identifier(String),
    QuotedIdentifier(String),
    Number(i64),
    Literal(Value),
    Dot,
    Star,
    Flatten,
    Filter,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Colon,
    Pipe,
    Or,
    And,
    Not,
    At,
    Cmp(Comparator),
    Eof,
}

impl Token {
    /// Left binding power
    fn lbp(&self) -> usize {
        match self {
            Token::Pipe => 1,
            Token::Or => 2,
            Token::And => 3,
            Token::Cmp(_) => 5,
            Token::Flatten => 9,
            Token::Star => 20,
            Token::Filter => 21,
            Token::Dot => 40,
            Token::Not => 45,
            Token::LBrace => 50,
            Token::LBracket => 55,
            Token::LParen => 60,
            _ => 0,
        }
    }
}

type Chars<'a> = Peekable<CharIndices<'a>>;

fn punctuation(ch: char) -> Option<Token> {
    match ch {
        '.' => Some(Token::Dot),
        '*' => Some(Token::Star),
        '@' => Some(Token::At),
        ',' => Some(Token::Comma),
        ':' => Some(Token::Colon),
        ']' => Some(Token::RBracket),
        '{' => Some(Token::LBrace),
        '}' => Some(Token::RBrace),
        '(' => Some(Token::LParen),
        ')' => Some(Token::RParen),
        _ => None,
    }
}

/// Consume `next` if it is the upcoming character
fn eat(chars: &mut Chars<'_>, next: char) -> bool {
    if matches!(chars.peek(), Some((_, c)) if *c == next) {
        chars.next();
        true
    } else {
        false
    }
}

/// Read up to the closing delimiter, keeping escape sequences verbatim
fn delimited(
    chars: &mut Chars<'_>,
    close: char,
    start: usize,
    what: &'static str,
) -> Result<String, QueryError> {
    let mut body = String::new();
    while let Some((_, c)) = chars.next() {
        if c == close {
            return Ok(body);
        }
        if c == '\\' {
            match chars.next() {
                Some((_, escaped)) => {
                    body.push('\\');
                    body.push(escaped);
                    continue;
                }
                None => break,
            }
        }
        body.push(c);
    }
    Err(QueryError::Unterminated { what, pos: start })
}

fn tokenize(input: &str) -> Result<Vec<(usize, Token)>, QueryError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, ch)) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
            continue;
        }
        if let Some(token) = punctuation(ch) {
            chars.next();
            tokens.push((pos, token));
            continue;
        }

        chars.next();
        let token = match ch {
            'a'..='z' | 'A'..='Z' | '_' => {
                let mut ident = ch.to_string();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                Token::Identifier(ident)
            }
            '0'..='9' | '-' => {
                let mut text = ch.to_string();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_digit() {
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if text == "-" {
                    return Err(QueryError::UnexpectedChar { ch, pos });
                }
                let n = text
                    .parse()
                    .map_err(|_| QueryError::InvalidNumber(text.clone()))?;
                Token::Number(n)
            }
            '"' => {
                let body = delimited(&mut chars, '"', pos, "quoted identifier")?;
                let name: String = serde_json::from_str(&format!("\"{}\"", body))
                    .map_err(|e| QueryError::InvalidLiteral(e.to_string()))?;
                Token::QuotedIdentifier(name)
            }
            '\'' => {
                let body = delimited(&mut chars, '\'', pos, "raw string")?;
                Token::Literal(Value::String(body.replace("\\'", "'")))
            }
            '`' => {
                let body = delimited(&mut chars, '`', pos, "JSON literal")?;
                let value = serde_json::from_str(body.replace("\\`", "`").trim())
                    .map_err(|e| QueryError::InvalidLiteral(e.to_string()))?;
                Token::Literal(value)
            }
            '[' => {
                if eat(&mut chars, ']') {
                    Token::Flatten
                } else if eat(&mut chars, '?') {
                    Token::Filter
                } else {
                    Token::LBracket
                }
            }
            '|' => {
                if eat(&mut chars, '|') {
                    Token::Or
                } else {
                    Token::Pipe
                }
            }
            '&' if eat(&mut chars, '&') => Token::And,
            '!' => {
                if eat(&mut chars, '=') {
                    Token::Cmp(Comparator::Ne)
                } else {
                    Token::Not
                }
            }
            '=' if eat(&mut chars, '=') => Token::Cmp(Comparator::Eq),
            '<' => {
                if eat(&mut chars, '=') {
                    Token::Cmp(Comparator::Le)
                } else {
                    Token::Cmp(Comparator::Lt)
                }
            }
            '>' => {
                if eat(&mut chars, '=') {
                    Token::Cmp(Comparator::Ge)
                } else {
                    Token::Cmp(Comparator::Gt)
                }
            }
            _ => return Err(QueryError::UnexpectedChar { ch, pos }),
        };
        tokens.push((pos, token));
    }

    tokens.push((input.len(), Token::Eof));
    Ok(tokens)
}

// ============================================================================
// Parser
// ============================================================================

/// Parse an expression into its AST
pub fn parse(input: &str) -> Result<Ast, QueryError> {
    if input.trim().is_empty() {
        return Err(QueryError::Empty);
    }
    if input.len() > MAX_EXPRESSION_LENGTH {
        return Err(QueryError::TooLong(MAX_EXPRESSION_LENGTH));
    }

    let mut parser = Parser {
        tokens: tokenize(input)?,
        index: 0,
        depth: 0,
    };
    let ast = parser.expression(0)?;
    if *parser.peek() != Token::Eof {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(ast)
}

enum Bracket {
    Index(i64),
    Slice(Option<i64>, Option<i64>, Option<i64>),
}

struct Parser {
    /// Always ends with `Eof`
    tokens: Vec<(usize, Token)>,
    index: usize,
    /// Depth of the tree built so far along the current path
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.index].1
    }

    fn peek_second(&self) -> Option<&Token> {
        self.tokens.get(self.index + 1).map(|(_, t)| t)
    }

    fn pos(&self) -> usize {
        self.tokens[self.index].0
    }

    /// Take the current token; `Eof` is never consumed
    fn advance(&mut self) -> Token {
        let token = self.tokens[self.index].1.clone();
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
        token
    }

    fn unexpected(&self, expected: &'static str) -> QueryError {
        unexpected_token(self.peek(), self.pos(), expected)
    }

    fn expect(&mut self, want: Token, expected: &'static str) -> Result<(), QueryError> {
        if *self.peek() == want {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expression(&mut self, rbp: usize) -> Result<Ast, QueryError> {
        let entry = self.depth;
        let result = self.bound_expression(rbp);
        self.depth = entry;
        result
    }

    /// Every frame and every chained operator deepens the tree by one
    fn descend(&mut self) -> Result<(), QueryError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(QueryError::TooDeep(MAX_NESTING_DEPTH));
        }
        Ok(())
    }

    fn bound_expression(&mut self, rbp: usize) -> Result<Ast, QueryError> {
        self.descend()?;
        let mut left = self.nud()?;
        while rbp < self.peek().lbp() {
            self.descend()?;
            left = self.led(left)?;
        }
        Ok(left)
    }

    /// Tokens that start an expression
    fn nud(&mut self) -> Result<Ast, QueryError> {
        let pos = self.pos();
        match self.advance() {
            Token::At => Ok(Ast::Current),
            Token::Identifier(name) => {
                if *self.peek() == Token::LParen {
                    self.advance();
                    self.function(name)
                } else {
                    Ok(Ast::Field(name))
                }
            }
            Token::QuotedIdentifier(name) => Ok(Ast::Field(name)),
            Token::Literal(value) => Ok(Ast::Literal(value)),
            Token::Number(n) => Ok(Ast::Literal(Value::from(n))),
            Token::Star => {
                let rhs = self.projection_rhs(Token::Star.lbp())?;
                Ok(Ast::ObjectProjection(Box::new(Ast::Current), Box::new(rhs)))
            }
            Token::Flatten => {
                let rhs = self.projection_rhs(Token::Flatten.lbp())?;
                Ok(Ast::Projection(
                    Box::new(Ast::Flatten(Box::new(Ast::Current))),
                    Box::new(rhs),
                ))
            }
            Token::Filter => self.filter(Ast::Current),
            Token::LBracket => self.bracket(Ast::Current, true),
            Token::LBrace => self.multi_hash(),
            Token::Not => {
                let inner = self.expression(Token::Not.lbp())?;
                Ok(Ast::Not(Box::new(inner)))
            }
            Token::LParen => {
                let inner = self.expression(0)?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            token => Err(unexpected_token(&token, pos, "expression")),
        }
    }

    /// Tokens that continue an expression
    fn led(&mut self, left: Ast) -> Result<Ast, QueryError> {
        let pos = self.pos();
        match self.advance() {
            Token::Dot => {
                let rhs = self.dot_rhs(Token::Dot.lbp())?;
                Ok(Ast::Subexpr(Box::new(left), Box::new(rhs)))
            }
            Token::Pipe => {
                let rhs = self.expression(Token::Pipe.lbp())?;
                Ok(Ast::Pipe(Box::new(left), Box::new(rhs)))
            }
            Token::Or => {
                let rhs = self.expression(Token::Or.lbp())?;
                Ok(Ast::Or(Box::new(left), Box::new(rhs)))
            }
            Token::And => {
                let rhs = self.expression(Token::And.lbp())?;
                Ok(Ast::And(Box::new(left), Box::new(rhs)))
            }
            Token::Cmp(op) => {
                let rhs = self.expression(5)?;
                Ok(Ast::Comparison {
                    op,
                    lhs: Box::new(left),
                    rhs: Box::new(rhs),
                })
            }
            Token::LBracket => self.bracket(left, false),
            Token::Flatten => {
                let rhs = self.projection_rhs(Token::Flatten.lbp())?;
                Ok(Ast::Projection(
                    Box::new(Ast::Flatten(Box::new(left))),
                    Box::new(rhs),
                ))
            }
            Token::Filter => self.filter(left),
            token => Err(unexpected_token(&token, pos, "operator")),
        }
    }

    /// After `[`: index, slice, `[*]` or (at expression start) a multiselect list
    fn bracket(&mut self, lhs: Ast, allow_multi: bool) -> Result<Ast, QueryError> {
        match self.peek() {
            Token::Number(_) | Token::Colon => match self.index_or_slice()? {
                Bracket::Index(i) => Ok(chain(lhs, Ast::Index(i))),
                Bracket::Slice(start, stop, step) => {
                    let rhs = self.projection_rhs(Token::Star.lbp())?;
                    Ok(Ast::Projection(
                        Box::new(chain(lhs, Ast::Slice { start, stop, step })),
                        Box::new(rhs),
                    ))
                }
            },
            Token::Star if self.peek_second() == Some(&Token::RBracket) => {
                self.advance();
                self.advance();
                let rhs = self.projection_rhs(Token::Star.lbp())?;
                Ok(Ast::Projection(Box::new(lhs), Box::new(rhs)))
            }
            _ if allow_multi => self.multi_list(),
            _ => Err(self.unexpected("index, slice or '*'")),
        }
    }

    fn index_or_slice(&mut self) -> Result<Bracket, QueryError> {
        let mut parts: [Option<i64>; 3] = [None; 3];
        let mut slot = 0;
        loop {
            let pos = self.pos();
            match self.advance() {
                Token::Number(n) if parts[slot].is_none() => parts[slot] = Some(n),
                Token::Colon if slot < 2 => slot += 1,
                Token::RBracket => break,
                token => return Err(unexpected_token(&token, pos, "number, ':' or ']'")),
            }
        }

        match (slot, parts[0]) {
            (0, Some(i)) => Ok(Bracket::Index(i)),
            (0, None) => Err(self.unexpected("index")),
            _ => Ok(Bracket::Slice(parts[0], parts[1], parts[2])),
        }
    }

    fn filter(&mut self, lhs: Ast) -> Result<Ast, QueryError> {
        let predicate = self.expression(0)?;
        self.expect(Token::RBracket, "']'")?;
        let rhs = self.projection_rhs(Token::Filter.lbp())?;
        Ok(Ast::FilterProjection {
            lhs: Box::new(lhs),
            predicate: Box::new(predicate),
            rhs: Box::new(rhs),
        })
    }

    /// Expression applied to each projected element
    fn projection_rhs(&mut self, bp: usize) -> Result<Ast, QueryError> {
        if self.peek().lbp() < PROJECTION_STOP {
            return Ok(Ast::Current);
        }
        match self.peek() {
            Token::LBracket | Token::Filter => self.expression(bp),
            Token::Dot => {
                self.advance();
                self.dot_rhs(bp)
            }
            _ => Err(self.unexpected("'.', '[' or end of projection")),
        }
    }

    fn dot_rhs(&mut self, bp: usize) -> Result<Ast, QueryError> {
        match self.peek() {
            Token::LBracket => {
                self.advance();
                self.multi_list()
            }
            Token::Identifier(_) | Token::QuotedIdentifier(_) | Token::Star | Token::LBrace => {
                self.expression(bp)
            }
            _ => Err(self.unexpected("identifier, '*', '[' or '{' after '.'")),
        }
    }

    fn multi_list(&mut self) -> Result<Ast, QueryError> {
        let mut items = Vec::new();
        loop {
            items.push(self.expression(0)?);
            let pos = self.pos();
            match self.advance() {
                Token::Comma => continue,
                Token::RBracket => break,
                token => return Err(unexpected_token(&token, pos, "',' or ']'")),
            }
        }
        Ok(Ast::MultiList(items))
    }

    fn multi_hash(&mut self) -> Result<Ast, QueryError> {
        let mut pairs = Vec::new();
        loop {
            let pos = self.pos();
            let key = match self.advance() {
                Token::Identifier(key) | Token::QuotedIdentifier(key) => key,
                token => return Err(unexpected_token(&token, pos, "key")),
            };
            self.expect(Token::Colon, "':'")?;
            pairs.push((key, self.expression(0)?));

            let pos = self.pos();
            match self.advance() {
                Token::Comma => continue,
                Token::RBrace => break,
                token => return Err(unexpected_token(&token, pos, "',' or '}'")),
            }
        }
        Ok(Ast::MultiHash(pairs))
    }

    /// After `name(`
    fn function(&mut self, name: String) -> Result<Ast, QueryError> {
        let function = Function::from_name(&name).ok_or(QueryError::UnknownFunction(name))?;

        let mut args = Vec::new();
        if *self.peek() == Token::RParen {
            self.advance();
        } else {
            loop {
                args.push(self.expression(0)?);
                let pos = self.pos();
                match self.advance() {
                    Token::Comma => continue,
                    Token::RParen => break,
                    token => return Err(unexpected_token(&token, pos, "',' or ')'")),
                }
            }
        }

        if args.len() != function.arity() {
            return Err(QueryError::Arity {
                name: function.name(),
                expected: function.arity(),
                got: args.len(),
            });
        }
        Ok(Ast::Function { function, args })
    }
}

fn unexpected_token(token: &Token, pos: usize, expected: &'static str) -> QueryError {
    let found = match token {
        Token::Eof => "end of expression".to_string(),
        Token::Identifier(name) | Token::QuotedIdentifier(name) => format!("identifier '{}'", name),
        Token::Number(n) => format!("number {}", n),
        Token::Literal(value) => format!("literal {}", value),
        other => format!("{:?}", other),
    };
    QueryError::UnexpectedToken {
        found,
        pos,
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Box<Ast> {
        Box::new(Ast::Field(name.to_string()))
    }

    #[test]
    fn test_parse_subexpression() {
        assert_eq!(
            parse("operation.kind").unwrap(),
            Ast::Subexpr(field("operation"), field("kind"))
        );
    }

    #[test]
    fn test_parse_projection() {
        assert_eq!(
            parse("[*].id").unwrap(),
            Ast::Projection(Box::new(Ast::Current), field("id"))
        );
        assert_eq!(
            parse("files[]").unwrap(),
            Ast::Projection(Box::new(Ast::Flatten(field("files"))), Box::new(Ast::Current))
        );
    }

    #[test]
    fn test_parse_index_and_slice() {
        assert_eq!(parse("[-1]").unwrap(), Ast::Index(-1));
        assert_eq!(
            parse("files[1:]").unwrap(),
            Ast::Projection(
                Box::new(Ast::Subexpr(
                    field("files"),
                    Box::new(Ast::Slice {
                        start: Some(1),
                        stop: None,
                        step: None
                    })
                )),
                Box::new(Ast::Current)
            )
        );
    }

    #[test]
    fn test_parse_filter_with_function() {
        let ast = parse("[?contains(files, 'a.txt')].message").unwrap();
        match ast {
            Ast::FilterProjection { lhs, predicate, rhs } => {
                assert_eq!(*lhs, Ast::Current);
                assert_eq!(rhs, field("message"));
                assert!(matches!(
                    *predicate,
                    Ast::Function {
                        function: Function::Contains,
                        ..
                    }
                ));
            }
            other => panic!("unexpected ast: {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        // comparison binds tighter than &&, which binds tighter than ||
        let ast = parse("a == `1` || b && !c").unwrap();
        match ast {
            Ast::Or(lhs, rhs) => {
                assert!(matches!(*lhs, Ast::Comparison { op: Comparator::Eq, .. }));
                assert!(matches!(*rhs, Ast::And(_, _)));
            }
            other => panic!("unexpected ast: {:?}", other),
        }
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse("'it\\'s'").unwrap(),
            Ast::Literal(Value::String("it's".to_string()))
        );
        assert_eq!(
            parse("`{\"a\": [1, 2]}`").unwrap(),
            Ast::Literal(serde_json::json!({"a": [1, 2]}))
        );
        assert_eq!(parse("\"with space\"").unwrap(), Ast::Field("with space".to_string()));
    }

    #[test]
    fn test_multiselect() {
        assert_eq!(
            parse("[id, message]").unwrap(),
            Ast::MultiList(vec![Ast::Field("id".into()), Ast::Field("message".into())])
        );
        assert_eq!(
            parse("{n: sequence}").unwrap(),
            Ast::MultiHash(vec![("n".into(), Ast::Field("sequence".into()))])
        );
    }

    #[test]
    fn test_malformed_expressions() {
        for bad in [
            "",
            "   ",
            "a.",
            "[?a == 1",
            "a ==",
            "foo(1)",
            "length(a, b)",
            "'unterminated",
            "`{bad json}`",
            "a = b",
            "a & b",
            "[1:2:3:4]",
            "a b",
            "#",
        ] {
            assert!(parse(bad).is_err(), "expected error for {:?}", bad);
        }
    }

    #[test]
    fn test_length_limit() {
        let long = "a.".repeat(MAX_EXPRESSION_LENGTH) + "a";
        assert!(matches!(parse(&long), Err(QueryError::TooLong(_))));
    }

    #[test]
    fn test_nesting_depth_bounded() {
        let negations = "!".repeat(4000) + "@";
        assert!(matches!(parse(&negations), Err(QueryError::TooDeep(_))));

        let parens = "(".repeat(2000) + "@" + &")".repeat(2000);
        assert!(matches!(parse(&parens), Err(QueryError::TooDeep(_))));

        let lists = "[".repeat(1000) + "@" + &"]".repeat(1000);
        assert!(matches!(parse(&lists), Err(QueryError::TooDeep(_))));

        let chain = vec!["a"; 1000].join(".");
        assert!(matches!(parse(&chain), Err(QueryError::TooDeep(_))));

        let shallow = "!".repeat(MAX_NESTING_DEPTH / 2) + "@";
        assert!(parse(&shallow).is_ok());
    }

    #[test]
    fn test_expression_from_str() {
        let expr: Expression = "message".parse().unwrap();
        assert_eq!(expr.source(), "message");
        assert_eq!(expr.ast(), &Ast::Field("message".into()));
    }
}
