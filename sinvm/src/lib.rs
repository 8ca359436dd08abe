//! The SIN virtual machine.
//!
//! A 16-bit register machine over a 64 KiB byte-addressed memory with the
//! fixed map of [`arch::mem`]: registers `A`, `B`, `X`, `Y`, a data stack
//! and a call stack both growing downward, a first-fit heap allocator, and
//! an ALU/FPU for integer and half/single-precision float arithmetic.

pub mod alu;
pub mod error;
pub mod fpu;
pub mod heap;
pub mod machine;
pub mod syscall;

pub use error::VmError;
pub use heap::{DynamicObject, Heap};
pub use machine::SinVm;
