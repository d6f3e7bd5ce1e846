//! Syntactic analyzer.
//!
//! A Pratt parser with one token of lookahead. Rather than registries of
//! function pointers, the prefix and infix roles are two match statements:
//! `parse_prefix` handles a token opening an expression, `parse_infix`
//! handles a token continuing one. A token can play both roles — `(` is
//! grouping in prefix position and a call in infix position, `[` an array
//! literal in prefix position and indexing in infix position.
//!
//! The parser never fails outright. Each diagnostic is recorded as a
//! message string and the failed production yields `None`, while the
//! statement loop keeps going to find more issues. Callers must inspect
//! the error list before evaluating anything.

use std::error::Error;
use std::fmt;

use crate::ast::{Block, Expr, Program, Stmt};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Binding powers, weakest first. The `Ord` derive is the precedence
/// ladder.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
    Index,
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Slash | TokenKind::Asterisk => Precedence::Product,
        TokenKind::LParen => Precedence::Call,
        TokenKind::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

/// Whether `kind` can continue an expression in infix position.
fn has_infix(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Slash
            | TokenKind::Asterisk
            | TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LParen
            | TokenKind::LBracket
    )
}

#[derive(Debug)]
pub struct Parser {
    lexer: Lexer,
    cur_token: Token,
    peek_token: Token,
    errors: Vec<String>,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Parser {
        let mut p = Parser {
            lexer,
            cur_token: Token::new(TokenKind::Eof, ""),
            peek_token: Token::new(TokenKind::Eof, ""),
            errors: vec![],
        };
        // Fill both lookahead slots.
        p.next_token();
        p.next_token();
        p
    }

    /// Collects statements until end of input. Statements that failed to
    /// parse are absent from the program and present in `errors`.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();
        while !self.cur_token_is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                program.statements.push(stmt);
            }
            self.next_token();
        }
        program
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn next_token(&mut self) {
        self.cur_token = std::mem::replace(&mut self.peek_token, self.lexer.next_token());
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.cur_token.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Stmt> {
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.cur_token.literal.clone();
        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Stmt::Let(name, value))
    }

    fn parse_return_statement(&mut self) -> Option<Stmt> {
        self.next_token();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Stmt::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }
        Some(Stmt::Expr(expr))
    }

    /// Parse statements until `}` or end of input. The current token is
    /// the opening `{`.
    fn parse_block(&mut self) -> Block {
        let mut stmts = vec![];
        self.next_token();
        while !self.cur_token_is(TokenKind::RBrace) && !self.cur_token_is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                stmts.push(stmt);
            }
            self.next_token();
        }
        Block(stmts)
    }

    /// The Pratt core. `rbp` is the caller's right-binding power: the loop
    /// folds `left` into every following operator that binds more tightly,
    /// which makes equal precedence associate to the left.
    fn parse_expression(&mut self, rbp: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix()?;

        while !self.peek_token_is(TokenKind::Semicolon) && rbp < self.peek_precedence() {
            if !has_infix(self.peek_token.kind) {
                return Some(left);
            }
            self.next_token();
            left = self.parse_infix(left)?;
        }

        Some(left)
    }

    /// Prefix role: parses a complete expression starting at the current
    /// token, consuming only the tokens it needs.
    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.cur_token.kind {
            TokenKind::Ident => Some(Expr::Ident(self.cur_token.literal.clone())),
            TokenKind::Int => self.parse_integer_literal(),
            TokenKind::Str => Some(Expr::Str(self.cur_token.literal.clone())),
            TokenKind::True => Some(Expr::Bool(true)),
            TokenKind::False => Some(Expr::Bool(false)),
            TokenKind::Bang | TokenKind::Minus => self.parse_prefix_expression(),
            TokenKind::LParen => self.parse_grouped_expression(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::Function => self.parse_function_literal(),
            TokenKind::LBracket => {
                let elements = self.parse_expression_list(TokenKind::RBracket)?;
                Some(Expr::Array(elements))
            }
            TokenKind::LBrace => self.parse_hash_literal(),
            kind => {
                self.errors
                    .push(format!("no prefix parse function for {} found", kind));
                None
            }
        }
    }

    /// Infix role: `left` is already parsed and the operator token is
    /// current.
    fn parse_infix(&mut self, left: Expr) -> Option<Expr> {
        match self.cur_token.kind {
            TokenKind::LParen => self.parse_call_expression(left),
            TokenKind::LBracket => self.parse_index_expression(left),
            _ => self.parse_infix_expression(left),
        }
    }

    fn parse_integer_literal(&mut self) -> Option<Expr> {
        match self.cur_token.literal.parse::<i64>() {
            Ok(value) => Some(Expr::Int(value)),
            Err(_) => {
                self.errors.push(format!(
                    "could not parse \"{}\" as integer",
                    self.cur_token.literal
                ));
                None
            }
        }
    }

    fn parse_prefix_expression(&mut self) -> Option<Expr> {
        let op = self.cur_token.literal.clone();
        self.next_token();
        // Prefix binding power keeps anything weaker out of the operand.
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expr::Prefix(op, Box::new(right)))
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        let op = self.cur_token.literal.clone();
        let precedence = self.cur_precedence();
        self.next_token();
        let right = self.parse_expression(precedence)?;
        Some(Expr::Infix(op, Box::new(left), Box::new(right)))
    }

    fn parse_grouped_expression(&mut self) -> Option<Expr> {
        self.next_token();
        let expr = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(expr)
    }

    fn parse_if_expression(&mut self) -> Option<Expr> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.next_token();
        let cond = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let consequence = self.parse_block();

        let alternative = if self.peek_token_is(TokenKind::Else) {
            self.next_token();
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            Some(self.parse_block())
        } else {
            None
        };

        Some(Expr::If(Box::new(cond), consequence, alternative))
    }

    fn parse_function_literal(&mut self) -> Option<Expr> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let params = self.parse_function_parameters()?;
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block();
        Some(Expr::Function(params, body))
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<String>> {
        let mut params = vec![];

        if self.peek_token_is(TokenKind::RParen) {
            self.next_token();
            return Some(params);
        }

        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        params.push(self.cur_token.literal.clone());

        while self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            if !self.expect_peek(TokenKind::Ident) {
                return None;
            }
            params.push(self.cur_token.literal.clone());
        }

        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(params)
    }

    fn parse_call_expression(&mut self, callee: Expr) -> Option<Expr> {
        let args = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expr::Call(Box::new(callee), args))
    }

    /// Comma-separated expressions terminated by `end`; used by array
    /// literals and call arguments.
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expr>> {
        let mut list = vec![];

        if self.peek_token_is(end) {
            self.next_token();
            return Some(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek(end) {
            return None;
        }
        Some(list)
    }

    fn parse_index_expression(&mut self, left: Expr) -> Option<Expr> {
        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RBracket) {
            return None;
        }
        Some(Expr::Index(Box::new(left), Box::new(index)))
    }

    fn parse_hash_literal(&mut self) -> Option<Expr> {
        let mut pairs = vec![];

        while !self.peek_token_is(TokenKind::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(TokenKind::Colon) {
                return None;
            }
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !self.peek_token_is(TokenKind::RBrace) && !self.expect_peek(TokenKind::Comma) {
                return None;
            }
        }

        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        Some(Expr::Hash(pairs))
    }

    fn cur_token_is(&self, kind: TokenKind) -> bool {
        self.cur_token.kind == kind
    }

    fn peek_token_is(&self, kind: TokenKind) -> bool {
        self.peek_token.kind == kind
    }

    /// Advances when the peek token matches; otherwise records a
    /// diagnostic and stays put.
    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_token_is(kind) {
            self.next_token();
            true
        } else {
            self.errors.push(format!(
                "expected next token to be {}, got {} instead",
                kind, self.peek_token.kind
            ));
            false
        }
    }

    fn peek_precedence(&self) -> Precedence {
        precedence_of(self.peek_token.kind)
    }

    fn cur_precedence(&self) -> Precedence {
        precedence_of(self.cur_token.kind)
    }
}

/// Parses `source` in one shot, refusing to hand back a program when any
/// diagnostic was recorded.
pub fn parse(source: &str) -> Result<Program, ParseErrors> {
    let mut parser = Parser::new(Lexer::new(source));
    let program = parser.parse_program();
    if parser.errors.is_empty() {
        Ok(program)
    } else {
        Err(ParseErrors(parser.errors))
    }
}

/// The diagnostics of a failed parse, one message per issue found.
#[derive(Debug, PartialEq)]
pub struct ParseErrors(pub Vec<String>);

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("\n"))
    }
}

impl Error for ParseErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_prg(input: &str) -> Program {
        let mut parser = Parser::new(Lexer::new(input));
        let program = parser.parse_program();
        assert!(
            parser.errors().is_empty(),
            "parser errors for {:?}: {:?}",
            input,
            parser.errors()
        );
        program
    }

    fn parse_expr(input: &str) -> Expr {
        let program = parse_prg(input);
        assert_eq!(program.statements.len(), 1, "program: {:?}", program);
        match program.statements.into_iter().next().unwrap() {
            Stmt::Expr(expr) => expr,
            stmt => panic!("not an expression statement: {:?}", stmt),
        }
    }

    fn parse_errors(input: &str) -> Vec<String> {
        let mut parser = Parser::new(Lexer::new(input));
        parser.parse_program();
        parser.errors().to_vec()
    }

    #[test]
    fn let_statements() {
        assert_eq!(
            parse_prg("let x = 5; let foobar = y;").statements,
            vec![
                Stmt::Let("x".to_string(), Expr::Int(5)),
                Stmt::Let("foobar".to_string(), Expr::Ident("y".to_string())),
            ]
        );
    }

    #[test]
    fn return_statements() {
        assert_eq!(
            parse_prg("return 5; return a + b;").statements,
            vec![
                Stmt::Return(Expr::Int(5)),
                Stmt::Return(Expr::Infix(
                    "+".to_string(),
                    Box::new(Expr::Ident("a".to_string())),
                    Box::new(Expr::Ident("b".to_string())),
                )),
            ]
        );
    }

    #[test]
    fn literal_expressions() {
        assert_eq!(parse_expr("foobar"), Expr::Ident("foobar".to_string()));
        assert_eq!(parse_expr("5"), Expr::Int(5));
        assert_eq!(parse_expr("true"), Expr::Bool(true));
        assert_eq!(parse_expr("false"), Expr::Bool(false));
        assert_eq!(
            parse_expr("\"hello world\""),
            Expr::Str("hello world".to_string())
        );
    }

    #[test]
    fn prefix_expressions() {
        assert_eq!(
            parse_expr("!5"),
            Expr::Prefix("!".to_string(), Box::new(Expr::Int(5)))
        );
        assert_eq!(
            parse_expr("-15"),
            Expr::Prefix("-".to_string(), Box::new(Expr::Int(15)))
        );
        assert_eq!(
            parse_expr("!true"),
            Expr::Prefix("!".to_string(), Box::new(Expr::Bool(true)))
        );
    }

    #[test]
    fn infix_expressions() {
        for op in ["+", "-", "*", "/", "<", ">", "==", "!="] {
            assert_eq!(
                parse_expr(&format!("5 {} 7", op)),
                Expr::Infix(op.to_string(), Box::new(Expr::Int(5)), Box::new(Expr::Int(7))),
                "operator {}",
                op
            );
        }
    }

    // Each pair is (input, rendering with explicit parentheses).
    const PRECEDENCE_CASES: [(&str, &str); 17] = [
        ("-a * b", "((-a) * b)"),
        ("!-a", "(!(-a))"),
        ("a + b + c", "((a + b) + c)"),
        ("a + b - c", "((a + b) - c)"),
        ("a * b * c", "((a * b) * c)"),
        ("a + b * c", "(a + (b * c))"),
        ("a + b * c + d / e - f", "(((a + (b * c)) + (d / e)) - f)"),
        ("5 < 4 != 3 > 4", "((5 < 4) != (3 > 4))"),
        ("3 + 4 * 5 == 3 * 1 + 4 * 5", "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)))"),
        ("1 + (2 + 3) + 4", "((1 + (2 + 3)) + 4)"),
        ("2 / (5 + 5)", "(2 / (5 + 5))"),
        ("-(5 + 5)", "(-(5 + 5))"),
        ("!(true == true)", "(!(true == true))"),
        ("a + add(b * c) + d", "((a + add((b * c))) + d)"),
        (
            "add(a, b, 1, 2 * 3, 4 + 5, add(6, 7 * 8))",
            "add(a, b, 1, (2 * 3), (4 + 5), add(6, (7 * 8)))",
        ),
        ("a * [1, 2, 3][b * c] * d", "((a * ([1, 2, 3][(b * c)])) * d)"),
        (
            "add(a * b[2], b[1], 2 * [1, 2][1])",
            "add((a * (b[2])), (b[1]), (2 * ([1, 2][1])))",
        ),
    ];

    #[test]
    fn operator_precedence() {
        for (input, expected) in PRECEDENCE_CASES {
            assert_eq!(parse_prg(input).to_string(), expected, "input {:?}", input);
        }
    }

    #[test]
    fn rendering_is_a_fixed_point() {
        for (input, _) in PRECEDENCE_CASES {
            let rendered = parse_prg(input).to_string();
            assert_eq!(parse_prg(&rendered).to_string(), rendered, "input {:?}", input);
        }
    }

    #[test]
    fn if_expression() {
        assert_eq!(
            parse_expr("if (x < y) { x }"),
            Expr::If(
                Box::new(Expr::Infix(
                    "<".to_string(),
                    Box::new(Expr::Ident("x".to_string())),
                    Box::new(Expr::Ident("y".to_string())),
                )),
                Block(vec![Stmt::Expr(Expr::Ident("x".to_string()))]),
                None,
            )
        );
    }

    #[test]
    fn if_else_expression() {
        assert_eq!(
            parse_expr("if (x < y) { x } else { y }"),
            Expr::If(
                Box::new(Expr::Infix(
                    "<".to_string(),
                    Box::new(Expr::Ident("x".to_string())),
                    Box::new(Expr::Ident("y".to_string())),
                )),
                Block(vec![Stmt::Expr(Expr::Ident("x".to_string()))]),
                Some(Block(vec![Stmt::Expr(Expr::Ident("y".to_string()))])),
            )
        );
    }

    #[test]
    fn function_literal() {
        assert_eq!(
            parse_expr("fn(x, y) { x + y; }"),
            Expr::Function(
                vec!["x".to_string(), "y".to_string()],
                Block(vec![Stmt::Expr(Expr::Infix(
                    "+".to_string(),
                    Box::new(Expr::Ident("x".to_string())),
                    Box::new(Expr::Ident("y".to_string())),
                ))]),
            )
        );
    }

    #[test]
    fn function_parameter_lists() {
        assert_eq!(parse_expr("fn() {}"), Expr::Function(vec![], Block(vec![])));
        assert_eq!(
            parse_expr("fn(x) {}"),
            Expr::Function(vec!["x".to_string()], Block(vec![]))
        );
        assert_eq!(
            parse_expr("fn(x, y, z) {}"),
            Expr::Function(
                vec!["x".to_string(), "y".to_string(), "z".to_string()],
                Block(vec![]),
            )
        );
    }

    #[test]
    fn call_expression() {
        assert_eq!(
            parse_expr("add(1, 2 * 3)"),
            Expr::Call(
                Box::new(Expr::Ident("add".to_string())),
                vec![
                    Expr::Int(1),
                    Expr::Infix("*".to_string(), Box::new(Expr::Int(2)), Box::new(Expr::Int(3))),
                ],
            )
        );
    }

    #[test]
    fn array_literals() {
        assert_eq!(parse_expr("[]"), Expr::Array(vec![]));
        assert_eq!(
            parse_expr("[1, 2 * 2, \"three\"]"),
            Expr::Array(vec![
                Expr::Int(1),
                Expr::Infix("*".to_string(), Box::new(Expr::Int(2)), Box::new(Expr::Int(2))),
                Expr::Str("three".to_string()),
            ])
        );
    }

    #[test]
    fn index_expression() {
        assert_eq!(
            parse_expr("myArray[1 + 1]"),
            Expr::Index(
                Box::new(Expr::Ident("myArray".to_string())),
                Box::new(Expr::Infix(
                    "+".to_string(),
                    Box::new(Expr::Int(1)),
                    Box::new(Expr::Int(1)),
                )),
            )
        );
    }

    #[test]
    fn empty_hash_literal() {
        assert_eq!(parse_expr("{}"), Expr::Hash(vec![]));
    }

    #[test]
    fn hash_literal_keeps_lexical_order() {
        assert_eq!(
            parse_expr("{\"one\": 1, \"two\": 2, \"one\": 3}"),
            Expr::Hash(vec![
                (Expr::Str("one".to_string()), Expr::Int(1)),
                (Expr::Str("two".to_string()), Expr::Int(2)),
                (Expr::Str("one".to_string()), Expr::Int(3)),
            ])
        );
    }

    #[test]
    fn hash_literal_with_expressions() {
        assert_eq!(
            parse_expr("{1: 0 + 1, true: two}"),
            Expr::Hash(vec![
                (
                    Expr::Int(1),
                    Expr::Infix("+".to_string(), Box::new(Expr::Int(0)), Box::new(Expr::Int(1))),
                ),
                (Expr::Bool(true), Expr::Ident("two".to_string())),
            ])
        );
    }

    #[test]
    fn missing_assign_in_let() {
        assert_eq!(
            parse_errors("let x 5;"),
            vec!["expected next token to be =, got INT instead".to_string()]
        );
    }

    #[test]
    fn missing_identifier_in_let() {
        // Recovery resumes at the `=`, which records a second error.
        let errors = parse_errors("let = 5;");
        assert_eq!(errors[0], "expected next token to be IDENT, got = instead");
    }

    #[test]
    fn unclosed_group() {
        assert_eq!(
            parse_errors("(1"),
            vec!["expected next token to be ), got EOF instead".to_string()]
        );
    }

    #[test]
    fn missing_prefix_parser() {
        assert_eq!(
            parse_errors("!"),
            vec!["no prefix parse function for EOF found".to_string()]
        );
    }

    #[test]
    fn illegal_token_is_rejected() {
        assert_eq!(
            parse_errors("@"),
            vec!["no prefix parse function for ILLEGAL found".to_string()]
        );
    }

    #[test]
    fn out_of_range_integer() {
        assert_eq!(
            parse_errors("99999999999999999999999"),
            vec!["could not parse \"99999999999999999999999\" as integer".to_string()]
        );
    }

    #[test]
    fn recovery_continues_after_a_bad_statement() {
        let mut parser = Parser::new(Lexer::new("let x 5; let y = 10;"));
        let program = parser.parse_program();
        assert_eq!(parser.errors().len(), 1);
        assert!(program
            .statements
            .contains(&Stmt::Let("y".to_string(), Expr::Int(10))));
    }

    #[test]
    fn parse_refuses_programs_with_errors() {
        match parse("let x 5;") {
            Err(ParseErrors(errors)) => assert_eq!(errors.len(), 1),
            r => panic!("unexpected output: {:?}", r),
        }
        assert!(parse("let x = 5;").is_ok());
    }
}
