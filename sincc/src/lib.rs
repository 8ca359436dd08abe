//! Compiler core for the SIN language.
//!
//! The lexer, parser and command-line driver are external collaborators;
//! this crate owns everything from the typed AST down to SINASM text:
//! the type and symbol model ([`types`], [`symbol`]), the statement and
//! expression variants the parser produces ([`ast`]), and the code
//! generator ([`codegen`]).

pub mod ast;
pub mod codegen;
pub mod error;
pub mod symbol;
pub mod types;

pub use codegen::{CodeGen, Compilation};
pub use error::CompilerError;
