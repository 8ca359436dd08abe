//! The two-pass assembler.
//!
//! Pass 1 scans statements, assigns label addresses, reserves `@rs`
//! storage, collects `@db` data and `@macro` constants, and sizes every
//! instruction. Pass 2 emits the byte stream: `@macro` constants are
//! inlined; every other symbol reference writes zero operand bytes and a
//! relocation entry for the linker, and a defined label so referenced is
//! upgraded from class `D` to `R`.

use crate::error::AsmError;
use crate::line::{Inst, Stmt, Value};
use crate::object::{AsmSymbol, DataEntry, ObjectFile, RelocationEntry, SymbolClass};
use arch::addr::AddrMode;
use arch::op::OpClass;
use indexmap::IndexMap;

pub fn assemble(source: &str) -> Result<ObjectFile, AsmError> {
    let mut stmts = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        if let Some(stmt) = Stmt::parse(raw, idx + 1)? {
            stmts.push((idx + 1, stmt));
        }
    }

    let mut unit = Unit::default();
    unit.pass1(&stmts)?;
    unit.pass2(&stmts)?;
    unit.finish()
}

#[derive(Default)]
struct Unit {
    symbols: IndexMap<String, AsmSymbol>,
    data: Vec<DataEntry>,
    relocations: Vec<RelocationEntry>,
    text: Vec<u8>,
    entry: Option<String>,
}

impl Unit {
    fn define(
        &mut self,
        name: &str,
        class: SymbolClass,
        value: u16,
        width: u8,
        line: usize,
    ) -> Result<(), AsmError> {
        let existing = self.symbols.insert(
            name.to_string(),
            AsmSymbol {
                name: name.to_string(),
                value,
                width,
                class,
            },
        );
        if existing.is_some() {
            return Err(AsmError::DuplicateLabel {
                name: name.to_string(),
                line,
            });
        }
        Ok(())
    }

    fn pass1(&mut self, stmts: &[(usize, Stmt)]) -> Result<(), AsmError> {
        let mut text_cursor: u16 = 0;
        let mut bss_cursor: u16 = arch::mem::RS_START;
        let mut data_cursor: usize = 0;

        for (line, stmt) in stmts {
            let line = *line;
            match stmt {
                Stmt::Label(name) => {
                    self.define(name, SymbolClass::D, text_cursor, 2, line)?;
                }
                Stmt::Rs { name, bytes } => {
                    if bss_cursor + bytes > arch::mem::RS_END {
                        return Err(AsmError::RsOverflow {
                            name: name.clone(),
                            bytes: *bytes,
                            line,
                        });
                    }
                    let width = (*bytes).min(255) as u8;
                    self.define(name, SymbolClass::M, bss_cursor, width, line)?;
                    bss_cursor += bytes;
                }
                Stmt::Db { name, bytes } => {
                    self.define(name, SymbolClass::C, data_cursor as u16, 2, line)?;
                    self.data.push(DataEntry {
                        name: name.clone(),
                        offset: data_cursor,
                        bytes: bytes.clone(),
                    });
                    data_cursor += bytes.len();
                }
                Stmt::Macro { name, value } => {
                    self.define(name, SymbolClass::C, *value, 2, line)?;
                }
                Stmt::Global { name } => {
                    self.entry = Some(name.clone());
                }
                Stmt::Include { .. } => {
                    return Err(AsmError::UnexpandedInclude { line });
                }
                Stmt::Inst(inst) => {
                    text_cursor += self.check_instruction(inst, line)?;
                }
            }
        }
        Ok(())
    }

    /// Validates shape and addressing mode, returning the encoded size.
    fn check_instruction(&self, inst: &Inst, line: usize) -> Result<u16, AsmError> {
        let mnemonic = inst.op.mnemonic().to_string();
        match (&inst.operand, inst.op.class()) {
            (None, OpClass::Implied) => Ok(1),
            (Some(_), OpClass::Implied) => Err(AsmError::IllegalAddressingMode { mnemonic, line }),
            // operand-less single-precision form pops its right operand
            (None, OpClass::FloatSingle) => Ok(2),
            (None, _) => Err(AsmError::MissingOperand { mnemonic, line }),
            (Some(operand), class) => {
                if !inst.op.mode_legal(operand.mode) {
                    return Err(AsmError::IllegalAddressingMode { mnemonic, line });
                }
                if operand.short && !operand.mode.is_memory() {
                    return Err(AsmError::IllegalAddressingMode { mnemonic, line });
                }
                // branch payloads are fixed at three bytes
                if class == OpClass::Branch && operand.short {
                    return Err(AsmError::IllegalAddressingMode { mnemonic, line });
                }
                if operand.short && matches!(operand.value, Value::Symbol(_)) {
                    return Err(AsmError::ShortSymbolOperand { line });
                }
                if class == OpClass::FloatSingle && matches!(operand.value, Value::Symbol(_)) {
                    return Err(AsmError::BadOperand {
                        text: "symbol in a 32-bit float immediate".into(),
                        line,
                    });
                }
                Ok(inst.op.encoded_len(operand.mode, operand.short))
            }
        }
    }

    fn pass2(&mut self, stmts: &[(usize, Stmt)]) -> Result<(), AsmError> {
        for (line, stmt) in stmts {
            let Stmt::Inst(inst) = stmt else { continue };
            let line = *line;
            self.text.push(inst.op.into());

            let class = inst.op.class();
            if class == OpClass::Implied {
                continue;
            }
            let Some(operand) = &inst.operand else {
                // operand-less single-precision float: stack form
                self.text.push(AddrMode::Absolute.encode(false));
                continue;
            };
            self.text.push(operand.mode.encode(operand.short));

            let operand_len = match class {
                OpClass::FloatSingle => 4,
                _ => operand.mode.operand_len(operand.short) as usize,
            };
            if operand_len == 0 {
                continue;
            }

            match &operand.value {
                Value::Literal(value) => {
                    let fits = match operand_len {
                        1 => *value <= 0xFF,
                        2 => *value <= 0xFFFF,
                        _ => true,
                    };
                    if !fits {
                        return Err(AsmError::OversizedImmediate {
                            value: *value,
                            line,
                        });
                    }
                    // operand bytes are big-endian, the VM's word order
                    let bytes = value.to_be_bytes();
                    self.text.extend_from_slice(&bytes[4 - operand_len..]);
                }
                Value::Symbol(name) => {
                    if let Some(symbol) = self.symbols.get(name) {
                        if symbol.class == SymbolClass::C && !self.owns_data(name) {
                            // @macro constants are inlined
                            let value = symbol.value;
                            self.text.extend_from_slice(&value.to_be_bytes());
                            continue;
                        }
                    }
                    self.reference(name);
                    self.relocations.push(RelocationEntry {
                        name: name.clone(),
                        address: self.text.len() as u16,
                    });
                    self.text.extend_from_slice(&[0, 0]);
                }
            }
        }
        Ok(())
    }

    fn owns_data(&self, name: &str) -> bool {
        self.data.iter().any(|d| d.name == name)
    }

    /// Marks a symbol as referenced: defined labels become relocation
    /// targets (`R`), unknown names become externals (`U`).
    fn reference(&mut self, name: &str) {
        match self.symbols.get_mut(name) {
            Some(symbol) => {
                if symbol.class == SymbolClass::D {
                    symbol.class = SymbolClass::R;
                }
            }
            None => {
                self.symbols.insert(
                    name.to_string(),
                    AsmSymbol {
                        name: name.to_string(),
                        value: 0,
                        width: 2,
                        class: SymbolClass::U,
                    },
                );
            }
        }
    }

    fn finish(mut self) -> Result<ObjectFile, AsmError> {
        // compiler-generated local labels must resolve within the unit
        for symbol in self.symbols.values() {
            if symbol.class == SymbolClass::U && symbol.name.starts_with("__") {
                return Err(AsmError::UndefinedLocalLabel {
                    name: symbol.name.clone(),
                });
            }
        }

        let entry_point = match &self.entry {
            Some(name) => match self.symbols.get(name) {
                Some(symbol)
                    if matches!(symbol.class, SymbolClass::D | SymbolClass::R) =>
                {
                    symbol.value
                }
                _ => {
                    return Err(AsmError::UndefinedLocalLabel { name: name.clone() });
                }
            },
            None => 0,
        };

        // data entries sit immediately behind .text in the image
        let text_len = self.text.len();
        for entry in &mut self.data {
            entry.offset += text_len;
        }

        Ok(ObjectFile {
            entry_point,
            text: self.text,
            symbols: self.symbols.into_values().collect(),
            relocations: self.relocations,
            data: self.data,
            ..ObjectFile::default()
        })
    }
}
