//! Integer arithmetic on the `A` register.
//!
//! `ADDCA`/`SUBCA` honor the carry flag; multiplication and division put
//! the high word / remainder in `B`; division by zero sets the Undefined
//! flag and leaves the registers alone. Shifts and rotates are byte-wide
//! on the low byte, rotating through carry.

use crate::error::VmError;
use crate::machine::SinVm;
use arch::addr::AddrMode;
use arch::op::Opcode;
use arch::status::Flag;

impl SinVm {
    fn set_zn(&mut self, value: u16) {
        self.status.assign(Flag::Z, value == 0);
        self.status.assign(Flag::N, value & 0x8000 != 0);
    }

    pub(crate) fn alu_add(&mut self, rhs: u16) {
        let carry = self.status.is_set(Flag::C) as u32;
        let sum = self.a as u32 + rhs as u32 + carry;
        let result = sum as u16;
        self.status.assign(Flag::C, sum > 0xFFFF);
        self.status
            .assign(Flag::V, (self.a ^ result) & (rhs ^ result) & 0x8000 != 0);
        self.a = result;
        self.set_zn(result);
    }

    pub(crate) fn alu_sub(&mut self, rhs: u16) {
        // carry acts as the inverse borrow, 6502 style
        let borrow = !self.status.is_set(Flag::C) as i32;
        let diff = self.a as i32 - rhs as i32 - borrow;
        let result = diff as u16;
        self.status.assign(Flag::C, diff >= 0);
        self.status
            .assign(Flag::V, (self.a ^ rhs) & (self.a ^ result) & 0x8000 != 0);
        self.a = result;
        self.set_zn(result);
    }

    pub(crate) fn alu_mult_signed(&mut self, rhs: u16) {
        let product = (self.a as i16 as i32) * (rhs as i16 as i32);
        self.b = (product >> 16) as u16;
        self.a = product as u16;
        self.status.assign(Flag::Z, product == 0);
        self.status.assign(Flag::N, product < 0);
    }

    pub(crate) fn alu_div_signed(&mut self, rhs: u16) {
        if rhs == 0 {
            self.status.set(Flag::U);
            return;
        }
        let lhs = self.a as i16;
        let quotient = lhs.wrapping_div(rhs as i16);
        let remainder = lhs.wrapping_rem(rhs as i16);
        self.a = quotient as u16;
        self.b = remainder as u16;
        self.status.assign(Flag::Z, quotient == 0);
        self.status.assign(Flag::N, quotient < 0);
    }

    pub(crate) fn alu_mult_unsigned(&mut self, rhs: u16) {
        let product = self.a as u32 * rhs as u32;
        self.b = (product >> 16) as u16;
        self.a = product as u16;
        self.status.assign(Flag::Z, product == 0);
        self.status.clear(Flag::N);
    }

    pub(crate) fn alu_div_unsigned(&mut self, rhs: u16) {
        if rhs == 0 {
            self.status.set(Flag::U);
            return;
        }
        let quotient = self.a / rhs;
        let remainder = self.a % rhs;
        self.a = quotient;
        self.b = remainder;
        self.status.assign(Flag::Z, quotient == 0);
        self.status.clear(Flag::N);
    }

    pub(crate) fn execute_bitshift(&mut self, op: Opcode) -> Result<(), VmError> {
        self.pc = self.pc.wrapping_add(1);
        let mode_byte = self.mem_read(self.pc);
        let (mode, short) = AddrMode::decode(mode_byte).map_err(|_| {
            VmError::InvalidAddressingMode {
                byte: mode_byte,
                pc: self.pc,
            }
        })?;
        if !op.mode_legal(mode) {
            return Err(VmError::InvalidAddressingMode {
                byte: mode_byte,
                pc: self.pc,
            });
        }

        let carry_in = self.status.is_set(Flag::C);
        if mode == AddrMode::RegA {
            let (result, carry_out) = shift_byte(op, self.a as u8, carry_in);
            self.a = result as u16;
            self.status.assign(Flag::C, carry_out);
            self.status.assign(Flag::Z, result == 0);
            return Ok(());
        }

        self.pc = self.pc.wrapping_add(1);
        let operand = if short {
            self.mem_read(self.pc) as u16
        } else {
            self.operand_word()
        };
        let addr = match mode {
            AddrMode::Absolute => operand,
            AddrMode::XIndexed => operand.wrapping_add(self.x),
            AddrMode::YIndexed => operand.wrapping_add(self.y),
            AddrMode::IndirectIndexedX => self.read_word(operand).wrapping_add(self.x),
            AddrMode::IndirectIndexedY => self.read_word(operand).wrapping_add(self.y),
            _ => unreachable!("mode legality checked above"),
        };
        let (result, carry_out) = shift_byte(op, self.mem_read(addr), carry_in);
        self.write_byte(addr, result)?;
        self.status.assign(Flag::C, carry_out);
        self.status.assign(Flag::Z, result == 0);
        Ok(())
    }
}

/// One byte-wide shift or rotate; returns the result and the bit that
/// fell out.
fn shift_byte(op: Opcode, value: u8, carry_in: bool) -> (u8, bool) {
    match op {
        Opcode::LSR => (value >> 1, value & 0x01 != 0),
        Opcode::LSL => (value << 1, value & 0x80 != 0),
        Opcode::ROR => ((value >> 1) | ((carry_in as u8) << 7), value & 0x01 != 0),
        Opcode::ROL => ((value << 1) | carry_in as u8, value & 0x80 != 0),
        _ => unreachable!("not a bitshift opcode"),
    }
}
