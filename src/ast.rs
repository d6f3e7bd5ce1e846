//! Abstract syntax tree.
//!
//! Statements and expressions are closed sum types; dispatch everywhere is
//! exhaustive matching. `Display` renders the canonical source form with
//! explicit parentheses around every operator application, which is what
//! the parser tests compare against.

use std::fmt;

/// An ordered sequence of statements; the root of every parse.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Stmt {
    Let(String, Expr),
    Return(Expr),
    Expr(Expr),
}

/// The body of a function literal or an `if` arm. Statement order is
/// source order.
#[derive(Debug, PartialEq, Clone)]
pub struct Block(pub Vec<Stmt>);

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Ident(String),
    Int(i64),
    Bool(bool),
    Str(String),
    Prefix(String, Box<Expr>),
    Infix(String, Box<Expr>, Box<Expr>),
    If(Box<Expr>, Block, Option<Block>),
    Function(Vec<String>, Block),
    Call(Box<Expr>, Vec<Expr>),
    Array(Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    // Pairs keep lexical order; duplicate keys are resolved at evaluation
    // time, not here.
    Hash(Vec<(Expr, Expr)>),
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Let(name, value) => write!(f, "let {} = {};", name, value),
            Stmt::Return(value) => write!(f, "return {};", value),
            Stmt::Expr(expr) => write!(f, "{}", expr),
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.0 {
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ident(name) => write!(f, "{}", name),
            Expr::Int(value) => write!(f, "{}", value),
            Expr::Bool(value) => write!(f, "{}", value),
            Expr::Str(value) => write!(f, "{}", value),
            Expr::Prefix(op, right) => write!(f, "({}{})", op, right),
            Expr::Infix(op, left, right) => write!(f, "({} {} {})", left, op, right),
            Expr::If(cond, consequence, alternative) => {
                write!(f, "if{} {}", cond, consequence)?;
                if let Some(alt) = alternative {
                    write!(f, "else {}", alt)?;
                }
                Ok(())
            }
            Expr::Function(params, body) => {
                write!(f, "fn({}) {}", params.join(", "), body)
            }
            Expr::Call(callee, args) => {
                let args = args.iter().map(Expr::to_string).collect::<Vec<_>>();
                write!(f, "{}({})", callee, args.join(", "))
            }
            Expr::Array(elements) => {
                let elements = elements.iter().map(Expr::to_string).collect::<Vec<_>>();
                write!(f, "[{}]", elements.join(", "))
            }
            Expr::Index(left, index) => write!(f, "({}[{}])", left, index),
            Expr::Hash(pairs) => {
                let pairs = pairs
                    .iter()
                    .map(|(k, v)| format!("{}:{}", k, v))
                    .collect::<Vec<_>>();
                write!(f, "{{{}}}", pairs.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn let_statement_renders_itself() {
        let prg = Program {
            statements: vec![Stmt::Let(
                "myVar".to_string(),
                Expr::Ident("anotherVar".to_string()),
            )],
        };
        assert_eq!(prg.to_string(), "let myVar = anotherVar;");
    }

    #[test]
    fn operators_render_with_explicit_parentheses() {
        let expr = Expr::Infix(
            "*".to_string(),
            Box::new(Expr::Prefix("-".to_string(), Box::new(Expr::Int(1)))),
            Box::new(Expr::Int(2)),
        );
        assert_eq!(expr.to_string(), "((-1) * 2)");
    }

    #[test]
    fn index_renders_as_grouped() {
        let expr = Expr::Index(
            Box::new(Expr::Ident("a".to_string())),
            Box::new(Expr::Int(0)),
        );
        assert_eq!(expr.to_string(), "(a[0])");
    }

    #[test]
    fn function_literal_renders_parameters() {
        let expr = Expr::Function(
            vec!["x".to_string(), "y".to_string()],
            Block(vec![Stmt::Expr(Expr::Infix(
                "+".to_string(),
                Box::new(Expr::Ident("x".to_string())),
                Box::new(Expr::Ident("y".to_string())),
            ))]),
        );
        assert_eq!(expr.to_string(), "fn(x, y) (x + y)");
    }
}
