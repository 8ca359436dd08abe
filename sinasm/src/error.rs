//! Errors for the assembler, object codec, and linker phases.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AsmError {
    #[error("line {line}: unknown mnemonic '{mnemonic}'")]
    UnknownMnemonic { mnemonic: String, line: usize },

    #[error("line {line}: addressing mode not permitted for '{mnemonic}'")]
    IllegalAddressingMode { mnemonic: String, line: usize },

    #[error("line {line}: '{mnemonic}' requires an operand")]
    MissingOperand { mnemonic: String, line: usize },

    #[error("line {line}: operand value {value:#x} does not fit the operand width")]
    OversizedImmediate { value: u32, line: usize },

    #[error("line {line}: cannot parse operand '{text}'")]
    BadOperand { text: String, line: usize },

    #[error("line {line}: duplicate label '{name}'")]
    DuplicateLabel { name: String, line: usize },

    #[error("line {line}: malformed directive '{text}'")]
    BadDirective { text: String, line: usize },

    #[error("line {line}: @include must be expanded before assembly")]
    UnexpandedInclude { line: usize },

    #[error("line {line}: @rs region exhausted allocating {bytes} bytes for '{name}'")]
    RsOverflow {
        name: String,
        bytes: u16,
        line: usize,
    },

    #[error("line {line}: a symbol reference needs a word operand, not a short one")]
    ShortSymbolOperand { line: usize },

    #[error("undefined local label '{name}'")]
    UndefinedLocalLabel { name: String },
}

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("bad magic number in file header")]
    BadMagic,

    #[error("unsupported object file version {0}")]
    UnsupportedVersion(u8),

    #[error("bad number in symbol class specifier: {0}")]
    BadSymbolClass(u8),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("unresolved external symbol '{name}'")]
    UnresolvedSymbol { name: String },

    #[error("duplicate global symbol '{name}'")]
    DuplicateSymbol { name: String },

    #[error("linked image ({size} bytes) does not fit the program region")]
    ImageTooLarge { size: usize },

    #[error("object files disagree on word size ({0} vs {1})")]
    WordsizeMismatch(u8, u8),

    #[error("nothing to link")]
    NoInput,
}
