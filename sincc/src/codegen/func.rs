//! Function definition, call, and return lowering.
//!
//! Callers push actuals left to right; the callee sees each parameter as
//! a local at a known word offset above its frame base, which is the
//! caller's stack offset from before the first actual was pushed. Return
//! values travel in `A` (`B` carries string lengths); composite returns
//! are copied onto the stack starting at the frame base.

use super::CodeGen;
use crate::ast::{Definition, Expression};
use crate::error::CompilerError;
use crate::symbol::{Symbol, SymbolKind, GLOBAL_SCOPE};
use crate::types::{DataType, Type};

impl CodeGen {
    pub(crate) fn gen_definition(
        &mut self,
        def: &Definition,
        line: usize,
    ) -> Result<(), CompilerError> {
        if self.scope_name != GLOBAL_SCOPE || self.scope_level != 0 {
            return Err(CompilerError::NonGlobalDefinition {
                name: def.name.clone(),
                line,
            });
        }
        if self.symbols.lookup(&def.name, GLOBAL_SCOPE).is_some() {
            return Err(CompilerError::DuplicateDefinition {
                name: def.name.clone(),
                line,
            });
        }
        let mut must_be_default = false;
        for param in &def.parameters {
            if param.has_initializer() {
                must_be_default = true;
            } else if must_be_default {
                return Err(CompilerError::DefaultParameterOrder {
                    name: param.name.clone(),
                    line,
                });
            }
        }
        if def.body.statements.is_empty() {
            return Err(CompilerError::EmptyFunctionBody {
                name: def.name.clone(),
                line,
            });
        }

        // insert before compiling the body so recursion resolves
        self.symbols.insert(
            Symbol::function(&def.name, def.return_type.clone(), def.parameters.clone()),
            line,
        )?;

        let saved_out = self.swap_out(String::new());
        let saved_offset = self.stack_offset;
        let saved_base = self.frame_base;
        self.scope_name = def.name.clone();
        self.scope_level = 1;
        self.stack_offset = 0;
        self.frame_base = 0;

        self.emit_label(&def.name);

        for param in &def.parameters {
            let mut sym = Symbol::variable(&param.name, param.data_type.clone(), &def.name, 1);
            sym.stack_offset = self.stack_offset;
            sym.defined = true;
            self.symbols.insert(sym, line)?;
            self.stack_offset += param.data_type.size_words();
        }

        self.gen_block(&def.body)?;

        // fall-through epilogue for bodies that do not end in a return
        self.emit_unwind_to(0);
        self.emit("rts");

        self.symbols.remove_scope(&def.name, 1);
        self.scope_name = GLOBAL_SCOPE.to_string();
        self.scope_level = 0;
        self.stack_offset = saved_offset;
        self.frame_base = saved_base;

        let body_text = self.swap_out(saved_out);
        self.append_function(body_text);
        Ok(())
    }

    pub(crate) fn gen_call(
        &mut self,
        name: &str,
        args: &[Expression],
        line: usize,
    ) -> Result<DataType, CompilerError> {
        let func = self
            .symbols
            .lookup(name, GLOBAL_SCOPE)
            .ok_or_else(|| CompilerError::UnknownSymbol {
                name: name.to_string(),
                line,
            })?;
        if func.kind != SymbolKind::FunctionDefinition {
            return Err(CompilerError::NotAFunction {
                name: name.to_string(),
                line,
            });
        }
        let formals = func.formal_parameters.clone();
        let return_type = func.data_type.clone();

        if args.len() > formals.len() {
            return Err(CompilerError::WrongArity {
                name: name.to_string(),
                expected: formals.len(),
                found: args.len(),
                line,
            });
        }

        let base = self.stack_offset;
        for (i, formal) in formals.iter().enumerate() {
            let actual = if i < args.len() {
                &args[i]
            } else if formal.has_initializer() {
                &formal.initializer
            } else {
                return Err(CompilerError::MissingDefault {
                    name: name.to_string(),
                    parameter: formal.name.clone(),
                    line,
                });
            };

            if matches!(formal.data_type.primary, Type::Array | Type::Struct) {
                self.push_composite_actual(actual, &formal.data_type, line)?;
                continue;
            }

            let atype = self.gen_expression(actual, line)?;
            if !atype.matches_exactly(&formal.data_type) {
                return Err(CompilerError::TypeMismatch {
                    expected: formal.data_type.to_string(),
                    found: atype.to_string(),
                    line,
                });
            }
            if formal.data_type.primary == Type::String {
                self.emit("deca");
                self.emit("deca");
            }
            self.emit("pha");
            self.stack_offset += 1;
        }

        self.emit(format!("jsr {}", name));

        // the callee unwinds the data stack to the frame base; composite
        // results stay on the stack just above it
        match return_type.primary {
            Type::Array | Type::Struct => {
                self.stack_offset = base + return_type.size_words();
            }
            _ => self.stack_offset = base,
        }
        Ok(return_type)
    }

    /// Pushes an array or struct actual word by word, element 0 first, so
    /// the callee's slot layout matches a local allocation.
    fn push_composite_actual(
        &mut self,
        actual: &Expression,
        formal_type: &DataType,
        line: usize,
    ) -> Result<(), CompilerError> {
        let Expression::LValue(arg_name) = actual else {
            return Err(CompilerError::TypeMismatch {
                expected: formal_type.to_string(),
                found: "a non-variable expression".into(),
                line,
            });
        };
        let sym = self
            .symbols
            .lookup(arg_name, &self.scope_name)
            .ok_or_else(|| CompilerError::UnknownSymbol {
                name: arg_name.clone(),
                line,
            })?;
        if !sym.data_type.matches_exactly(formal_type) {
            return Err(CompilerError::TypeMismatch {
                expected: formal_type.to_string(),
                found: sym.data_type.to_string(),
                line,
            });
        }
        let src = sym.stack_offset;
        for word in 0..formal_type.size_words() {
            self.emit_load_local(src + word);
            self.emit("pha");
            self.stack_offset += 1;
        }
        Ok(())
    }

    pub(crate) fn gen_return(
        &mut self,
        value: Option<&Expression>,
        line: usize,
    ) -> Result<(), CompilerError> {
        if self.scope_name == GLOBAL_SCOPE {
            // a global-scope return ends the program with the value in A
            if let Some(expr) = value {
                self.gen_expression(expr, line)?;
            }
            self.emit("halt");
            return Ok(());
        }

        let func = self
            .symbols
            .lookup(&self.scope_name.clone(), GLOBAL_SCOPE)
            .ok_or_else(|| CompilerError::UnknownSymbol {
                name: self.scope_name.clone(),
                line,
            })?;
        let expected = func.data_type.clone();

        match value {
            None => {
                if !matches!(expected.primary, Type::Void | Type::None) {
                    return Err(CompilerError::TypeMismatch {
                        expected: expected.to_string(),
                        found: "void".into(),
                        line,
                    });
                }
                self.emit_unwind_to(self.frame_base);
                self.emit("rts");
                Ok(())
            }
            Some(expr) => {
                if matches!(expected.primary, Type::Array | Type::Struct) {
                    return self.gen_composite_return(expr, &expected, line);
                }
                let rt = self.gen_expression(expr, line)?;
                if !expected.is_compatible(&rt) {
                    return Err(CompilerError::TypeMismatch {
                        expected: expected.to_string(),
                        found: rt.to_string(),
                        line,
                    });
                }
                // unwinding uses only incsp, so A and B survive it
                self.emit_unwind_to(self.frame_base);
                self.emit("rts");
                Ok(())
            }
        }
    }

    /// Copies a composite result into the words just above the frame base
    /// and leaves SP below it, so the caller finds the value on the stack.
    fn gen_composite_return(
        &mut self,
        expr: &Expression,
        expected: &DataType,
        line: usize,
    ) -> Result<(), CompilerError> {
        let Expression::LValue(name) = expr else {
            return Err(CompilerError::TypeMismatch {
                expected: expected.to_string(),
                found: "a non-variable expression".into(),
                line,
            });
        };
        let sym = self
            .symbols
            .lookup(name, &self.scope_name)
            .ok_or_else(|| CompilerError::UnknownSymbol {
                name: name.clone(),
                line,
            })?;
        if !sym.data_type.matches_exactly(expected) {
            return Err(CompilerError::TypeMismatch {
                expected: expected.to_string(),
                found: sym.data_type.to_string(),
                line,
            });
        }
        let src = sym.stack_offset;
        let size = expected.size_words();
        let base = self.frame_base;
        if src != base {
            // the source sits above the destination, so an ascending copy
            // never reads a word it has already overwritten
            for word in 0..size {
                self.emit_load_local(src + word);
                self.emit_store_local(base + word);
            }
        }
        self.emit_unwind_to(base + size);
        self.emit("rts");
        Ok(())
    }
}
