//! The code generator: lowers a [`StatementBlock`] to SINASM text.
//!
//! The generator threads three pieces of state through emission: the
//! current scope `(name, level)`, the stack offset (words pushed above the
//! enclosing frame base), and the frame base itself. Locals are reached by
//! walking SP between known word offsets with `incsp`/`decsp` and moving
//! values through `pha`/`pla`; the walk is purely positional, so no
//! generated address ever needs relocating against the stack.

mod expr;
mod func;

use crate::ast::{Allocation, Expression, Statement, StatementBlock, StatementKind};
use crate::error::CompilerError;
use crate::symbol::{Symbol, SymbolKind, SymbolTable, GLOBAL_SCOPE};
use crate::types::{SymbolQuality, Type};
use color_print::cformat;

/// The result of a successful compilation: the assembly stream plus any
/// non-fatal diagnostics.
#[derive(Debug)]
pub struct Compilation {
    pub assembly: String,
    pub warnings: Vec<String>,
}

pub struct CodeGen {
    pub(crate) symbols: SymbolTable,
    /// Current emission sink; swapped out while a function body compiles.
    out: String,
    /// Compiled function bodies, appended after the global block's halt.
    functions: String,
    /// String-literal data entries: (label, text).
    data: Vec<(String, String)>,
    label_counter: usize,
    pub(crate) scope_name: String,
    pub(crate) scope_level: usize,
    /// Words currently pushed above the enclosing frame base.
    pub(crate) stack_offset: usize,
    /// Stack offset at which the enclosing frame began.
    pub(crate) frame_base: usize,
    warnings: Vec<String>,
}

impl Default for CodeGen {
    fn default() -> Self {
        CodeGen::new()
    }
}

impl CodeGen {
    pub fn new() -> Self {
        CodeGen {
            symbols: SymbolTable::new(),
            out: String::new(),
            functions: String::new(),
            data: Vec::new(),
            label_counter: 0,
            scope_name: GLOBAL_SCOPE.to_string(),
            scope_level: 0,
            stack_offset: 0,
            frame_base: 0,
            warnings: Vec::new(),
        }
    }

    /// Lowers a whole program: the global block, a terminating `halt`,
    /// the buffered function subroutines, then the string data entries.
    pub fn generate(mut self, program: &StatementBlock) -> Result<Compilation, CompilerError> {
        self.gen_block(program)?;
        self.emit("halt");
        self.out.push_str(&self.functions);
        for (label, text) in &self.data {
            self.out
                .push_str(&format!("@db {} \"{}\"\n", label, escape(text)));
        }
        Ok(Compilation {
            assembly: self.out,
            warnings: self.warnings,
        })
    }

    // ------------------------------------------------------------------
    // statement lowering

    pub(crate) fn gen_block(&mut self, block: &StatementBlock) -> Result<(), CompilerError> {
        let mut returned = false;
        for stmt in &block.statements {
            if returned {
                return Err(CompilerError::UnreachableReturn {
                    line: stmt.line_number,
                });
            }
            if matches!(stmt.kind, StatementKind::Return { .. }) {
                returned = true;
            }
            self.gen_statement(stmt)?;
        }
        Ok(())
    }

    /// A nested block opens one scope level; on exit its locals are popped
    /// off the stack and its symbols dropped from the table.
    fn gen_nested_block(&mut self, block: &StatementBlock) -> Result<(), CompilerError> {
        self.scope_level += 1;
        let entry_offset = self.stack_offset;
        self.gen_block(block)?;
        for _ in entry_offset..self.stack_offset {
            self.emit("incsp");
        }
        self.stack_offset = entry_offset;
        let scope_name = self.scope_name.clone();
        self.symbols.remove_scope(&scope_name, self.scope_level);
        self.scope_level -= 1;
        Ok(())
    }

    fn gen_statement(&mut self, stmt: &Statement) -> Result<(), CompilerError> {
        let line = stmt.line_number;
        match &stmt.kind {
            StatementKind::Include { .. } => Ok(()),
            StatementKind::Allocation(alloc) => self.gen_allocation(alloc, line),
            StatementKind::Assignment { lvalue, rvalue } => {
                self.gen_assignment(lvalue, rvalue, line)
            }
            StatementKind::Return { value } => self.gen_return(value.as_ref(), line),
            StatementKind::IfThenElse {
                condition,
                then_branch,
                else_branch,
            } => self.gen_if_then_else(condition, then_branch, else_branch.as_ref(), line),
            StatementKind::WhileLoop { condition, body } => {
                self.gen_while_loop(condition, body, line)
            }
            StatementKind::Definition(def) => self.gen_definition(def, line),
            StatementKind::Call { name, args } => {
                self.gen_call(name, args, line)?;
                Ok(())
            }
            StatementKind::InlineAssembly { dialect, code } => {
                if dialect == arch::DIALECT {
                    for asm_line in code.lines() {
                        self.emit(asm_line.trim());
                    }
                } else {
                    self.warn(cformat!(
                        "<yellow>warning</>: line {}: skipping inline assembly for dialect '{}'",
                        line,
                        dialect
                    ));
                }
                Ok(())
            }
            StatementKind::FreeMemory { lvalue } => self.gen_free(lvalue, line),
        }
    }

    fn gen_allocation(&mut self, alloc: &Allocation, line: usize) -> Result<(), CompilerError> {
        let dt = alloc.data_type.clone();
        let is_const = dt.has_quality(SymbolQuality::Const);
        let is_dynamic = dt.has_quality(SymbolQuality::Dynamic);
        let composite = matches!(dt.primary, Type::Array | Type::Struct);

        if is_const && !alloc.has_initializer() {
            return Err(CompilerError::UninitializedConst {
                name: alloc.name.clone(),
                line,
            });
        }
        if composite && alloc.has_initializer() && !is_dynamic {
            return Err(CompilerError::TypeMismatch {
                expected: "no initializer for a composite allocation".into(),
                found: dt.to_string(),
                line,
            });
        }

        let mut symbol = Symbol::variable(&alloc.name, dt.clone(), &self.scope_name, self.scope_level);
        symbol.stack_offset = self.stack_offset;

        if is_dynamic {
            // the slot holds the heap pointer returned by the allocator
            let slot = symbol.stack_offset;
            self.emit(format!("loada #${:04x}", dt.size_bytes() as u16));
            self.emit(format!("syscall #${:02x}", arch::syscall::ALLOC));
            self.emit("tba");
            self.emit("pha");
            self.stack_offset += 1;
            if alloc.has_initializer() {
                let init_type = self.gen_expression(&alloc.initializer, line)?;
                if !dt.is_compatible(&init_type) {
                    return Err(CompilerError::TypeMismatch {
                        expected: dt.to_string(),
                        found: init_type.to_string(),
                        line,
                    });
                }
                self.emit("pha");
                self.stack_offset += 1;
                self.emit_load_local(slot);
                self.emit("tay");
                self.emit("pla");
                self.stack_offset -= 1;
                self.emit("storea $0000, y");
            }
            symbol.defined = true;
            symbol.allocated = true;
        } else if alloc.has_initializer() {
            let init_type = self.gen_expression(&alloc.initializer, line)?;
            if !dt.is_compatible(&init_type) {
                return Err(CompilerError::TypeMismatch {
                    expected: dt.to_string(),
                    found: init_type.to_string(),
                    line,
                });
            }
            self.warn_sign_mix(&dt, &init_type, line);
            if dt.primary == Type::String {
                // store the address of the length prefix
                self.emit("deca");
                self.emit("deca");
            }
            self.emit("pha");
            self.stack_offset += 1;
            symbol.defined = true;
        } else {
            for _ in 0..dt.size_words() {
                self.emit("decsp");
            }
            self.stack_offset += dt.size_words();
            // composite slots are written element-wise, so count them ready
            symbol.defined = composite;
        }

        self.symbols.insert(symbol, line)
    }

    fn gen_assignment(
        &mut self,
        lvalue: &Expression,
        rvalue: &Expression,
        line: usize,
    ) -> Result<(), CompilerError> {
        match lvalue {
            Expression::LValue(name) => {
                let sym = self.symbols.lookup(name, &self.scope_name).ok_or_else(|| {
                    CompilerError::UnknownSymbol {
                        name: name.clone(),
                        line,
                    }
                })?;
                if sym.kind != SymbolKind::Variable {
                    return Err(CompilerError::InvalidLValue { line });
                }
                if sym.data_type.has_quality(SymbolQuality::Const) && sym.defined {
                    return Err(CompilerError::ConstMutation {
                        name: name.clone(),
                        line,
                    });
                }
                let slot = sym.stack_offset;
                let dt = sym.data_type.clone();

                let rt = self.gen_expression(rvalue, line)?;
                if !dt.is_compatible(&rt) {
                    return Err(CompilerError::TypeMismatch {
                        expected: dt.to_string(),
                        found: rt.to_string(),
                        line,
                    });
                }
                self.warn_sign_mix(&dt, &rt, line);
                if dt.primary == Type::String {
                    self.emit("deca");
                    self.emit("deca");
                }
                self.emit_store_local(slot);
                let scope = self.scope_name.clone();
                self.symbols.lookup_mut(name, &scope).unwrap().defined = true;
                Ok(())
            }
            Expression::Dereferenced(inner) => {
                let pt = self.gen_expression(inner, line)?;
                if pt.primary != Type::Ptr {
                    return Err(CompilerError::TypeMismatch {
                        expected: "ptr".into(),
                        found: pt.to_string(),
                        line,
                    });
                }
                self.emit("pha");
                self.stack_offset += 1;
                let rt = self.gen_expression(rvalue, line)?;
                if let Some(sub) = pt.subtype {
                    if rt.primary != sub {
                        return Err(CompilerError::TypeMismatch {
                            expected: sub.to_string(),
                            found: rt.to_string(),
                            line,
                        });
                    }
                }
                self.emit("tab");
                self.emit("pla");
                self.stack_offset -= 1;
                self.emit("tay");
                self.emit("tba");
                self.emit("storea $0000, y");
                Ok(())
            }
            Expression::Indexed { base, index } => {
                let (elem_type, _) = self.gen_element_address(base, index, line)?;
                self.emit("pha");
                self.stack_offset += 1;
                let rt = self.gen_expression(rvalue, line)?;
                if !elem_type.is_compatible(&rt) {
                    return Err(CompilerError::TypeMismatch {
                        expected: elem_type.to_string(),
                        found: rt.to_string(),
                        line,
                    });
                }
                if elem_type.primary == Type::String {
                    self.emit("deca");
                    self.emit("deca");
                }
                self.emit("tab");
                self.emit("pla");
                self.stack_offset -= 1;
                self.emit("tay");
                self.emit("tba");
                self.emit("storea $0000, y");
                Ok(())
            }
            _ => Err(CompilerError::InvalidLValue { line }),
        }
    }

    fn gen_if_then_else(
        &mut self,
        condition: &Expression,
        then_branch: &StatementBlock,
        else_branch: Option<&StatementBlock>,
        line: usize,
    ) -> Result<(), CompilerError> {
        let else_label = self.fresh_label("else");
        let end_label = self.fresh_label("end");

        let ct = self.gen_expression(condition, line)?;
        if ct.primary != Type::Bool {
            return Err(CompilerError::TypeMismatch {
                expected: "bool".into(),
                found: ct.to_string(),
                line,
            });
        }
        self.emit("cmpa #$0000");
        let target = if else_branch.is_some() {
            &else_label
        } else {
            &end_label
        };
        self.emit(format!("breq {}", target));

        self.gen_nested_block(then_branch)?;

        if let Some(else_block) = else_branch {
            self.emit(format!("jmp {}", end_label));
            self.emit_label(&else_label);
            self.gen_nested_block(else_block)?;
        }
        self.emit_label(&end_label);
        Ok(())
    }

    fn gen_while_loop(
        &mut self,
        condition: &Expression,
        body: &StatementBlock,
        line: usize,
    ) -> Result<(), CompilerError> {
        let top_label = self.fresh_label("while");
        let exit_label = self.fresh_label("done");

        self.emit_label(&top_label);
        let ct = self.gen_expression(condition, line)?;
        if ct.primary != Type::Bool {
            return Err(CompilerError::TypeMismatch {
                expected: "bool".into(),
                found: ct.to_string(),
                line,
            });
        }
        self.emit("cmpa #$0000");
        self.emit(format!("breq {}", exit_label));
        self.gen_nested_block(body)?;
        self.emit(format!("jmp {}", top_label));
        self.emit_label(&exit_label);
        Ok(())
    }

    fn gen_free(&mut self, lvalue: &Expression, line: usize) -> Result<(), CompilerError> {
        let Expression::LValue(name) = lvalue else {
            return Err(CompilerError::InvalidLValue { line });
        };
        let sym = self.symbols.lookup(name, &self.scope_name).ok_or_else(|| {
            CompilerError::UnknownSymbol {
                name: name.clone(),
                line,
            }
        })?;
        let dynamic = sym.data_type.has_quality(SymbolQuality::Dynamic);
        if sym.data_type.primary != Type::Ptr && !dynamic {
            return Err(CompilerError::TypeMismatch {
                expected: "ptr or dynamic allocation".into(),
                found: sym.data_type.to_string(),
                line,
            });
        }
        let slot = sym.stack_offset;
        self.emit_load_local(slot);
        self.emit("tab");
        self.emit(format!("syscall #${:02x}", arch::syscall::FREE));
        let scope = self.scope_name.clone();
        self.symbols.lookup_mut(name, &scope).unwrap().freed = true;
        Ok(())
    }

    // ------------------------------------------------------------------
    // emission helpers

    pub(crate) fn emit(&mut self, line: impl AsRef<str>) {
        self.out.push('\t');
        self.out.push_str(line.as_ref());
        self.out.push('\n');
    }

    pub(crate) fn emit_label(&mut self, label: &str) {
        self.out.push_str(label);
        self.out.push_str(":\n");
    }

    pub(crate) fn fresh_label(&mut self, stem: &str) -> String {
        let label = format!("__{}_{}", stem, self.label_counter);
        self.label_counter += 1;
        label
    }

    pub(crate) fn add_string_data(&mut self, text: &str) -> String {
        let label = format!("__str_{}", self.label_counter);
        self.label_counter += 1;
        self.data.push((label.clone(), text.to_string()));
        label
    }

    /// Emits `incsp`/`decsp` to walk SP from word offset `from` to `to`.
    /// Purely physical: the tracked `stack_offset` is not changed.
    fn emit_move_sp(&mut self, from: usize, to: usize) {
        if from >= to {
            for _ in to..from {
                self.emit("incsp");
            }
        } else {
            for _ in from..to {
                self.emit("decsp");
            }
        }
    }

    /// Loads the word in stack slot `slot` into `A`.
    pub(crate) fn emit_load_local(&mut self, slot: usize) {
        let cur = self.stack_offset;
        self.emit_move_sp(cur, slot + 1);
        self.emit("pla");
        self.emit_move_sp(slot, cur);
    }

    /// Stores `A` into stack slot `slot`.
    pub(crate) fn emit_store_local(&mut self, slot: usize) {
        let cur = self.stack_offset;
        self.emit_move_sp(cur, slot);
        self.emit("pha");
        self.emit_move_sp(slot + 1, cur);
    }

    /// Unwinds SP back to `target` (at or below the current offset)
    /// without touching any register. Used by return paths; the tracked
    /// offset is left alone so sibling branches keep balancing.
    pub(crate) fn emit_unwind_to(&mut self, target: usize) {
        let cur = self.stack_offset;
        self.emit_move_sp(cur, target);
    }

    /// Byte distance from SP to the first word of `slot`, for address-of.
    pub(crate) fn slot_distance(&self, slot: usize) -> u16 {
        (2 * (self.stack_offset - slot) - 1) as u16
    }

    pub(crate) fn append_function(&mut self, text: String) {
        self.functions.push_str(&text);
    }

    pub(crate) fn swap_out(&mut self, replacement: String) -> String {
        std::mem::replace(&mut self.out, replacement)
    }

    pub(crate) fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    pub(crate) fn warn_sign_mix(
        &mut self,
        a: &crate::types::DataType,
        b: &crate::types::DataType,
        line: usize,
    ) {
        let signed = |t: &crate::types::DataType| t.has_quality(SymbolQuality::Signed);
        let unsigned = |t: &crate::types::DataType| t.has_quality(SymbolQuality::Unsigned);
        if (signed(a) && unsigned(b)) || (unsigned(a) && signed(b)) {
            self.warn(cformat!(
                "<yellow>warning</>: line {}: mixing signed and unsigned operands; the unsigned interpretation wins",
                line
            ));
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
