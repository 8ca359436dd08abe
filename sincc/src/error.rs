//! Compiler errors. All are fatal to compilation and carry the line the
//! offending statement started on; warnings travel separately on the
//! diagnostics stream.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompilerError {
    #[error("line {line}: duplicate definition of '{name}'")]
    DuplicateDefinition { name: String, line: usize },

    #[error("line {line}: unknown symbol '{name}'")]
    UnknownSymbol { name: String, line: usize },

    #[error("line {line}: type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: String,
        line: usize,
    },

    #[error("line {line}: wrong number of arguments to '{name}': expected at most {expected}, got {found}")]
    WrongArity {
        name: String,
        expected: usize,
        found: usize,
        line: usize,
    },

    #[error("line {line}: call to '{name}' is missing an argument for '{parameter}', which has no default")]
    MissingDefault {
        name: String,
        parameter: String,
        line: usize,
    },

    #[error("line {line}: default-valued parameters must come last; '{name}' follows one")]
    DefaultParameterOrder { name: String, line: usize },

    #[error("line {line}: function '{name}' must be defined in the global scope")]
    NonGlobalDefinition { name: String, line: usize },

    #[error("line {line}: function '{name}' has an empty body")]
    EmptyFunctionBody { name: String, line: usize },

    #[error("line {line}: cannot assign to const symbol '{name}' after its allocation")]
    ConstMutation { name: String, line: usize },

    #[error("line {line}: const symbol '{name}' must be initialized at allocation")]
    UninitializedConst { name: String, line: usize },

    #[error("line {line}: statement is unreachable after a return")]
    UnreachableReturn { line: usize },

    #[error("line {line}: '{name}' referenced before assignment")]
    ReferencedBeforeAssignment { name: String, line: usize },

    #[error("line {line}: expression is not assignable")]
    InvalidLValue { line: usize },

    #[error("line {line}: '{name}' is not a function")]
    NotAFunction { name: String, line: usize },

    #[error("line {line}: expression has no value")]
    EmptyExpression { line: usize },
}
