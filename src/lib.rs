//! A tree-walking interpreter for the Monkey programming language.
//!
//! Source text flows through [`lexer::Lexer`] into [`parser::Parser`],
//! which produces an [`ast::Program`]; [`eval::Evaluator`] walks the tree
//! against an [`object::Environment`] chain and yields an
//! [`object::Object`].
//!
//! # Examples
//!
//! See [`crate::interpreter::Interpreter`].
//!
//! # Limitations
//!
//! - The lexer is ASCII only; identifiers are letters and underscores.
//! - Run-time failures are error values, never panics; the parser
//!   accumulates diagnostics instead of bailing out.
//! - Self-referential closures keep their environment alive for the rest
//!   of the process.

#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod interpreter;

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod token;
