//! The SYSCALL instruction.
//!
//! The syscall number is the instruction's operand, fetched through the
//! ordinary addressing-mode decoder; registers carry arguments and
//! results (see [`arch::syscall`]).

use crate::error::VmError;
use crate::heap::Realloc;
use crate::machine::SinVm;
use arch::mem::{BUFFER_END, BUFFER_START};
use arch::status::Flag;
use arch::syscall;
use std::io::{self, BufRead, Write};

impl SinVm {
    pub(crate) fn execute_syscall(&mut self) -> Result<(), VmError> {
        let number = self.execute_load()?;
        match number {
            syscall::READ_INPUT => self.sys_read_input()?,
            syscall::PRINT_INT => {
                println!("{}", self.a as i16);
            }
            syscall::PRINT_STRING => {
                let bytes: Vec<u8> = (0..self.b)
                    .map(|i| self.mem_read(self.a.wrapping_add(i)))
                    .collect();
                let mut out = io::stdout().lock();
                out.write_all(&bytes)?;
                out.write_all(b"\n")?;
            }
            syscall::ALLOC => match self.heap.allocate(self.a) {
                Some(addr) => self.b = addr,
                None => {
                    self.a = 0;
                    self.b = 0;
                }
            },
            syscall::FREE => {
                if !self.heap.free(self.b) {
                    return Err(VmError::MissingHeapObject {
                        addr: self.b,
                        pc: self.pc,
                    });
                }
            }
            syscall::REALLOC => self.sys_reallocate(false),
            syscall::EXIT => {
                self.exit_code = self.b;
                self.status.set(Flag::H);
            }
            number => {
                return Err(VmError::UnknownSyscall {
                    number,
                    pc: self.pc,
                })
            }
        }
        Ok(())
    }

    fn sys_read_input(&mut self) -> Result<(), VmError> {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        let bytes = line.trim_end_matches(['\n', '\r']).as_bytes();
        let max = (BUFFER_END - BUFFER_START) as usize;
        let len = bytes.len().min(max);
        for (i, byte) in bytes[..len].iter().enumerate() {
            self.memory[BUFFER_START as usize + i] = *byte;
        }
        self.a = BUFFER_START;
        self.b = len as u16;
        Ok(())
    }

    /// Reallocate the block at `B` to `A` bytes. A missing block either
    /// zeroes the registers or falls back to a fresh allocation.
    fn sys_reallocate(&mut self, error_if_not_found: bool) {
        match self.heap.reallocate(self.b, self.a) {
            Realloc::InPlace => {}
            Realloc::Moved {
                to,
                old_start,
                old_size,
            } => {
                for i in 0..old_size {
                    self.memory[to.wrapping_add(i) as usize] =
                        self.memory[old_start.wrapping_add(i) as usize];
                }
                self.b = to;
            }
            Realloc::Failed => {
                self.a = 0;
                self.b = 0;
            }
            Realloc::NotFound => {
                if error_if_not_found {
                    self.a = 0;
                    self.b = 0;
                } else {
                    match self.heap.allocate(self.a) {
                        Some(addr) => self.b = addr,
                        None => {
                            self.a = 0;
                            self.b = 0;
                        }
                    }
                }
            }
        }
    }
}
