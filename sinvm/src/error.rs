//! Runtime errors. Each carries the program counter at the faulting
//! instruction where one exists.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("stack overflow at pc ${pc:04X}")]
    StackOverflow { pc: u16 },

    #[error("stack underflow at pc ${pc:04X}")]
    StackUnderflow { pc: u16 },

    #[error("call stack overflow at pc ${pc:04X}")]
    CallStackOverflow { pc: u16 },

    #[error("call stack underflow at pc ${pc:04X}")]
    CallStackUnderflow { pc: u16 },

    #[error("write access violation at pc ${pc:04X}: cannot write to ${addr:04X}")]
    NullWrite { addr: u16, pc: u16 },

    #[error("no heap object starts at ${addr:04X} (pc ${pc:04X})")]
    MissingHeapObject { addr: u16, pc: u16 },

    #[error("cannot execute an empty program")]
    EmptyProgram,

    #[error("incompatible word size: this VM is {vm}-bit, the image is {file}-bit", vm = arch::WORDSIZE)]
    IncompatibleWordsize { file: u8 },

    #[error("program ({size} bytes) too large for the program region")]
    ProgramTooLarge { size: usize },

    #[error("unknown opcode ${byte:02X} at pc ${pc:04X}")]
    UnknownOpcode { byte: u8, pc: u16 },

    #[error("invalid addressing mode byte ${byte:02X} at pc ${pc:04X}")]
    InvalidAddressingMode { byte: u8, pc: u16 },

    #[error("unknown syscall {number} at pc ${pc:04X}")]
    UnknownSyscall { number: u16, pc: u16 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
