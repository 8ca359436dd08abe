//! Expression evaluation.
//!
//! Every expression leaves its result in `A`; strings additionally carry
//! their length in `B`, with `A` pointing at the character bytes. Binary
//! operands travel through the data stack so nested evaluation can reuse
//! the registers freely.

use super::CodeGen;
use crate::ast::{BinaryOp, Expression, UnaryOp};
use crate::error::CompilerError;
use crate::types::{DataType, SymbolQuality, Type};

impl CodeGen {
    pub(crate) fn gen_expression(
        &mut self,
        expr: &Expression,
        line: usize,
    ) -> Result<DataType, CompilerError> {
        match expr {
            Expression::IntLiteral(value) => {
                self.emit(format!("loada #${:04x}", *value as u16));
                Ok(DataType::new(Type::Int))
            }
            Expression::FloatLiteral(value) => {
                let bits = arch::half::pack(value.to_bits());
                self.emit(format!("loada #${:04x}", bits));
                Ok(DataType::new(Type::Float))
            }
            Expression::BoolLiteral(value) => {
                self.emit(format!("loada #${:04x}", *value as u16));
                Ok(DataType::new(Type::Bool))
            }
            Expression::StringLiteral(text) => {
                let label = self.add_string_data(text);
                self.emit(format!("loadb {}", label));
                self.emit(format!("loada #{}", label));
                self.emit("clc");
                self.emit("addca #$0002");
                Ok(DataType::new(Type::String))
            }
            Expression::LValue(name) => self.gen_lvalue(name, line),
            Expression::Indexed { base, index } => self.gen_indexed(base, index, line),
            Expression::Unary { op, operand } => self.gen_unary(*op, operand, line),
            Expression::Binary { op, lhs, rhs } => self.gen_binary(*op, lhs, rhs, line),
            Expression::Call { name, args } => self.gen_call(name, args, line),
            Expression::AddressOf { name } => self.gen_address_of(name, line),
            Expression::Dereferenced(inner) => self.gen_deref(inner, line),
            Expression::SizeOf(dt) => {
                self.emit(format!("loada #${:04x}", dt.size_bytes() as u16));
                Ok(DataType::new(Type::Int))
            }
            Expression::Empty => Err(CompilerError::EmptyExpression { line }),
        }
    }

    fn gen_lvalue(&mut self, name: &str, line: usize) -> Result<DataType, CompilerError> {
        let sym = self
            .symbols
            .lookup(name, &self.scope_name)
            .ok_or_else(|| CompilerError::UnknownSymbol {
                name: name.to_string(),
                line,
            })?;
        if !sym.defined {
            return Err(CompilerError::ReferencedBeforeAssignment {
                name: name.to_string(),
                line,
            });
        }
        let slot = sym.stack_offset;
        let dt = sym.data_type.clone();
        match dt.primary {
            Type::Int | Type::Float | Type::Bool | Type::Ptr => {
                self.emit_load_local(slot);
                Ok(dt)
            }
            Type::String => {
                // the slot holds the address of the length prefix
                self.emit_load_local(slot);
                self.emit("tax");
                self.emit("loadb $0000, x");
                self.emit("txa");
                self.emit("clc");
                self.emit("addca #$0002");
                Ok(dt)
            }
            Type::Array | Type::Struct => Err(CompilerError::TypeMismatch {
                expected: "a scalar value".into(),
                found: dt.to_string(),
                line,
            }),
            Type::Void | Type::None => Err(CompilerError::EmptyExpression { line }),
        }
    }

    /// Leaves the address of `base[index]` in `A` and returns the element
    /// type. `base` must name an array local.
    pub(crate) fn gen_element_address(
        &mut self,
        base: &Expression,
        index: &Expression,
        line: usize,
    ) -> Result<(DataType, usize), CompilerError> {
        let Expression::LValue(name) = base else {
            return Err(CompilerError::InvalidLValue { line });
        };
        let sym = self
            .symbols
            .lookup(name, &self.scope_name)
            .ok_or_else(|| CompilerError::UnknownSymbol {
                name: name.to_string(),
                line,
            })?;
        if sym.data_type.primary != Type::Array {
            return Err(CompilerError::TypeMismatch {
                expected: "array".into(),
                found: sym.data_type.to_string(),
                line,
            });
        }
        let slot = sym.stack_offset;
        let subtype = sym.data_type.subtype.unwrap_or(Type::Int);
        let elem_type = DataType::new(subtype);
        let stride = (elem_type.size_words().max(1) * 2) as u16;
        let stride = if subtype == Type::String { 4 } else { stride };

        let it = self.gen_expression(index, line)?;
        if it.primary != Type::Int {
            return Err(CompilerError::TypeMismatch {
                expected: "int".into(),
                found: it.to_string(),
                line,
            });
        }
        // element i sits `stride * i` bytes below element 0 on the
        // downward-growing stack
        self.emit(format!("multa #${:04x}", stride));
        self.emit("tab");
        self.emit("tspa");
        self.emit("clc");
        self.emit(format!("addca #${:04x}", self.slot_distance(slot)));
        self.emit("sec");
        self.emit("subca B");
        Ok((elem_type, slot))
    }

    fn gen_indexed(
        &mut self,
        base: &Expression,
        index: &Expression,
        line: usize,
    ) -> Result<DataType, CompilerError> {
        if let Expression::LValue(name) = base {
            let is_string = self
                .symbols
                .lookup(name, &self.scope_name)
                .map(|s| s.data_type.primary == Type::String)
                .unwrap_or(false);
            if is_string {
                // character access: a byte-granular load
                self.gen_lvalue(name, line)?;
                self.emit("pha");
                self.stack_offset += 1;
                let it = self.gen_expression(index, line)?;
                if it.primary != Type::Int {
                    return Err(CompilerError::TypeMismatch {
                        expected: "int".into(),
                        found: it.to_string(),
                        line,
                    });
                }
                self.emit("tab");
                self.emit("pla");
                self.stack_offset -= 1;
                self.emit("clc");
                self.emit("addca B");
                self.emit("tax");
                self.emit("loada <$00, x");
                return Ok(DataType::new(Type::Int));
            }
        }

        let (elem_type, _) = self.gen_element_address(base, index, line)?;
        self.emit("tax");
        self.emit("loada $0000, x");
        if elem_type.primary == Type::String {
            // the element word is the string's base address
            self.emit("tax");
            self.emit("loadb $0000, x");
            self.emit("txa");
            self.emit("clc");
            self.emit("addca #$0002");
        }
        Ok(elem_type)
    }

    fn gen_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expression,
        line: usize,
    ) -> Result<DataType, CompilerError> {
        let ot = self.gen_expression(operand, line)?;
        match (op, ot.primary) {
            (UnaryOp::Minus, Type::Int) => {
                self.emit("tab");
                self.emit("loada #$0000");
                self.emit("sec");
                self.emit("subca B");
                Ok(ot)
            }
            (UnaryOp::Minus, Type::Float) => {
                self.emit("xora #$8000");
                Ok(ot)
            }
            (UnaryOp::Not, Type::Bool) => {
                self.emit("xora #$0001");
                Ok(ot)
            }
            (UnaryOp::Not, Type::Int) => {
                self.emit("xora #$ffff");
                Ok(ot)
            }
            _ => Err(CompilerError::TypeMismatch {
                expected: match op {
                    UnaryOp::Minus => "int or float".into(),
                    UnaryOp::Not => "bool or int".into(),
                },
                found: ot.to_string(),
                line,
            }),
        }
    }

    fn gen_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
        line: usize,
    ) -> Result<DataType, CompilerError> {
        if op.is_logical() {
            return self.gen_logical(op, lhs, rhs, line);
        }

        let lt = self.gen_expression(lhs, line)?;
        self.emit("pha");
        self.stack_offset += 1;
        let rt = self.gen_expression(rhs, line)?;
        self.emit("tab");
        self.emit("pla");
        self.stack_offset -= 1;

        if lt.primary != rt.primary {
            return Err(CompilerError::TypeMismatch {
                expected: lt.to_string(),
                found: rt.to_string(),
                line,
            });
        }
        self.warn_sign_mix(&lt, &rt, line);

        match lt.primary {
            Type::Int => self.gen_int_binary(op, &lt, &rt, line),
            Type::Float => self.gen_float_binary(op, line),
            Type::Bool if matches!(op, BinaryOp::Equal | BinaryOp::NotEqual) => {
                self.gen_int_comparison(op);
                Ok(DataType::new(Type::Bool))
            }
            _ => Err(CompilerError::TypeMismatch {
                expected: "int or float operands".into(),
                found: lt.to_string(),
                line,
            }),
        }
    }

    fn gen_int_binary(
        &mut self,
        op: BinaryOp,
        lt: &DataType,
        rt: &DataType,
        line: usize,
    ) -> Result<DataType, CompilerError> {
        if op.is_comparison() {
            self.gen_int_comparison(op);
            return Ok(DataType::new(Type::Bool));
        }
        let unsigned = lt.has_quality(SymbolQuality::Unsigned) || rt.has_quality(SymbolQuality::Unsigned);
        match op {
            BinaryOp::Add => {
                self.emit("clc");
                self.emit("addca B");
            }
            BinaryOp::Sub => {
                self.emit("sec");
                self.emit("subca B");
            }
            BinaryOp::Mul => {
                self.emit(if unsigned { "multua B" } else { "multa B" });
            }
            BinaryOp::Div => {
                self.emit(if unsigned { "divua B" } else { "diva B" });
            }
            BinaryOp::Mod => {
                self.emit(if unsigned { "divua B" } else { "diva B" });
                self.emit("tba");
            }
            BinaryOp::BitAnd => self.emit("anda B"),
            BinaryOp::BitOr => self.emit("ora B"),
            BinaryOp::BitXor => self.emit("xora B"),
            _ => {
                return Err(CompilerError::TypeMismatch {
                    expected: "a numeric operator".into(),
                    found: "logical operator".into(),
                    line,
                })
            }
        }
        Ok(lt.clone())
    }

    /// Integer comparison on `A` and `B`: materializes a bool in `A`.
    /// CMP leaves carry untouched on equality, so the equal case branches
    /// before the carry test.
    fn gen_int_comparison(&mut self, op: BinaryOp) {
        let yes = self.fresh_label("true");
        let no = self.fresh_label("false");
        let end = self.fresh_label("end");
        self.emit("cmpa B");
        match op {
            BinaryOp::Equal => self.emit(format!("breq {}", yes)),
            BinaryOp::NotEqual => self.emit(format!("brne {}", yes)),
            BinaryOp::Greater => {
                self.emit(format!("breq {}", no));
                self.emit(format!("brgt {}", yes));
            }
            BinaryOp::Less => {
                self.emit(format!("breq {}", no));
                self.emit(format!("brlt {}", yes));
            }
            BinaryOp::GreaterEqual => {
                self.emit(format!("breq {}", yes));
                self.emit(format!("brgt {}", yes));
            }
            BinaryOp::LessEqual => {
                self.emit(format!("breq {}", yes));
                self.emit(format!("brlt {}", yes));
            }
            _ => unreachable!("comparison operator expected"),
        }
        self.emit_label(&no);
        self.emit("loada #$0000");
        self.emit(format!("jmp {}", end));
        self.emit_label(&yes);
        self.emit("loada #$0001");
        self.emit_label(&end);
    }

    fn gen_float_binary(&mut self, op: BinaryOp, line: usize) -> Result<DataType, CompilerError> {
        match op {
            BinaryOp::Add => self.emit("fadda B"),
            BinaryOp::Sub => self.emit("fsuba B"),
            BinaryOp::Mul => self.emit("fmulta B"),
            BinaryOp::Div => self.emit("fdiva B"),
            BinaryOp::Equal | BinaryOp::NotEqual => {
                let yes = self.fresh_label("true");
                let end = self.fresh_label("end");
                self.emit("fsuba B");
                let branch = if op == BinaryOp::Equal { "breq" } else { "brne" };
                self.emit(format!("{} {}", branch, yes));
                self.emit("loada #$0000");
                self.emit(format!("jmp {}", end));
                self.emit_label(&yes);
                self.emit("loada #$0001");
                self.emit_label(&end);
                return Ok(DataType::new(Type::Bool));
            }
            BinaryOp::Less | BinaryOp::GreaterEqual => {
                // sign of the difference decides; >= is the negation
                self.emit("fsuba B");
                self.emit("anda #$8000");
                let yes = self.fresh_label("true");
                let end = self.fresh_label("end");
                self.emit("cmpa #$0000");
                self.emit(format!("brne {}", yes));
                self.emit("loada #$0000");
                self.emit(format!("jmp {}", end));
                self.emit_label(&yes);
                self.emit("loada #$0001");
                self.emit_label(&end);
                if op == BinaryOp::GreaterEqual {
                    self.emit("xora #$0001");
                }
                return Ok(DataType::new(Type::Bool));
            }
            BinaryOp::Greater | BinaryOp::LessEqual => {
                // greater: difference is nonzero and non-negative
                let no = self.fresh_label("false");
                let yes = self.fresh_label("true");
                let end = self.fresh_label("end");
                self.emit("fsuba B");
                self.emit(format!("breq {}", no));
                self.emit("anda #$8000");
                self.emit("cmpa #$0000");
                self.emit(format!("breq {}", yes));
                self.emit_label(&no);
                self.emit("loada #$0000");
                self.emit(format!("jmp {}", end));
                self.emit_label(&yes);
                self.emit("loada #$0001");
                self.emit_label(&end);
                if op == BinaryOp::LessEqual {
                    self.emit("xora #$0001");
                }
                return Ok(DataType::new(Type::Bool));
            }
            _ => {
                return Err(CompilerError::TypeMismatch {
                    expected: "float operator".into(),
                    found: "integer-only operator".into(),
                    line,
                })
            }
        }
        Ok(DataType::new(Type::Float))
    }

    fn gen_logical(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
        line: usize,
    ) -> Result<DataType, CompilerError> {
        let end = self.fresh_label("end");
        let shortcut = self.fresh_label(if op == BinaryOp::And { "false" } else { "true" });

        let lt = self.gen_expression(lhs, line)?;
        if lt.primary != Type::Bool {
            return Err(CompilerError::TypeMismatch {
                expected: "bool".into(),
                found: lt.to_string(),
                line,
            });
        }
        self.emit("cmpa #$0000");
        match op {
            BinaryOp::And => self.emit(format!("breq {}", shortcut)),
            BinaryOp::Or => self.emit(format!("brne {}", shortcut)),
            _ => unreachable!(),
        }
        let rt = self.gen_expression(rhs, line)?;
        if rt.primary != Type::Bool {
            return Err(CompilerError::TypeMismatch {
                expected: "bool".into(),
                found: rt.to_string(),
                line,
            });
        }
        self.emit(format!("jmp {}", end));
        self.emit_label(&shortcut);
        self.emit(if op == BinaryOp::And {
            "loada #$0000"
        } else {
            "loada #$0001"
        });
        self.emit_label(&end);
        Ok(DataType::new(Type::Bool))
    }

    fn gen_address_of(&mut self, name: &str, line: usize) -> Result<DataType, CompilerError> {
        let sym = self
            .symbols
            .lookup(name, &self.scope_name)
            .ok_or_else(|| CompilerError::UnknownSymbol {
                name: name.to_string(),
                line,
            })?;
        let slot = sym.stack_offset;
        let pointee = match sym.data_type.primary {
            Type::Array => sym.data_type.subtype.unwrap_or(Type::Int),
            primary => primary,
        };
        let dist = self.slot_distance(slot);
        self.emit("tspa");
        self.emit("clc");
        self.emit(format!("addca #${:04x}", dist));
        Ok(DataType::with_subtype(Type::Ptr, pointee))
    }

    fn gen_deref(&mut self, inner: &Expression, line: usize) -> Result<DataType, CompilerError> {
        let pt = self.gen_expression(inner, line)?;
        if pt.primary != Type::Ptr {
            return Err(CompilerError::TypeMismatch {
                expected: "ptr".into(),
                found: pt.to_string(),
                line,
            });
        }
        self.emit("tax");
        self.emit("loada $0000, x");
        let pointee = pt.subtype.unwrap_or(Type::Int);
        if pointee == Type::String {
            self.emit("tax");
            self.emit("loadb $0000, x");
            self.emit("txa");
            self.emit("clc");
            self.emit("addca #$0002");
        }
        Ok(DataType::new(pointee))
    }
}
