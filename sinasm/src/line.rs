//! Line-level parsing of SINASM source.
//!
//! A line is a `;`-comment, a `label:`, a directive, or an instruction.
//! Operand syntax:
//!
//! ```text
//! loada $1234        absolute           loada #$1234      immediate
//! loada $1234, x     x-indexed          loada ($1234)     indirect
//! loada ($12), y     indirect-indexed   loada ($12, x)    indexed-indirect
//! addca B            register           loada <$12        short (byte) access
//! jmp some_label     symbol operand
//! ```
//!
//! Literals are `$hex` or decimal; a `<` prefix selects the short variant
//! of a memory mode. Directives: `@rs name n`, `@db name bytes… | "text"`,
//! `@macro name value`, `@global name`, `@include "file"`.

use crate::error::AsmError;
use arch::addr::AddrMode;
use arch::op::Opcode;
use color_print::cformat;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Literal(u32),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub mode: AddrMode,
    pub short: bool,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Inst {
    pub op: Opcode,
    pub operand: Option<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Label(String),
    Rs { name: String, bytes: u16 },
    Db { name: String, bytes: Vec<u8> },
    Macro { name: String, value: u16 },
    Global { name: String },
    Include { path: String },
    Inst(Inst),
}

/// One parsed source line, comment and all, for listings.
#[derive(Debug)]
pub struct Line {
    pub file: String,
    pub idx: usize,
    pub code: String,
    pub comment: String,
    pub stmt: Option<Stmt>,
}

impl Line {
    pub fn parse(file: &str, idx: usize, raw: &str) -> Result<Line, AsmError> {
        let (code, comment) = raw.split_once(';').unwrap_or((raw, ""));
        let stmt = Stmt::parse(code, idx + 1)?;
        Ok(Line {
            file: file.to_string(),
            idx,
            code: code.trim().to_string(),
            comment: comment.trim().to_string(),
            stmt,
        })
    }

    pub fn print_pos(&self) -> String {
        format!("{}:{}", self.file, self.idx + 1)
    }

    pub fn cprint(&self) -> String {
        let body = match &self.stmt {
            Some(Stmt::Label(l)) => cformat!("<green>{}:</>", l),
            Some(Stmt::Inst(_)) => cformat!("  <red>{}</>", self.code),
            Some(_) => cformat!("<blue>{}</>", self.code),
            None => String::new(),
        };
        if self.comment.is_empty() {
            format!("{} | {}", self.print_pos(), body)
        } else {
            format!("{} | {:<40} ;{}", self.print_pos(), body, self.comment)
        }
    }
}

impl Stmt {
    pub fn parse(code: &str, line: usize) -> Result<Option<Stmt>, AsmError> {
        let code = code.split(';').next().unwrap_or("").trim();
        if code.is_empty() {
            return Ok(None);
        }

        if let Some(rest) = code.strip_prefix('@') {
            return Stmt::parse_directive(rest, code, line).map(Some);
        }

        if let Some(label) = code.strip_suffix(':') {
            let label = label.trim();
            if is_identifier(label) {
                return Ok(Some(Stmt::Label(label.to_string())));
            }
            return Err(AsmError::BadOperand {
                text: code.to_string(),
                line,
            });
        }

        let (mnemonic, rest) = match code.split_once(char::is_whitespace) {
            Some((m, r)) => (m, r.trim()),
            None => (code, ""),
        };
        let op = Opcode::from_mnemonic(mnemonic).ok_or_else(|| AsmError::UnknownMnemonic {
            mnemonic: mnemonic.to_string(),
            line,
        })?;
        let operand = if rest.is_empty() {
            None
        } else {
            Some(parse_operand(rest, line)?)
        };
        Ok(Some(Stmt::Inst(Inst { op, operand })))
    }

    fn parse_directive(rest: &str, code: &str, line: usize) -> Result<Stmt, AsmError> {
        let bad = || AsmError::BadDirective {
            text: code.to_string(),
            line,
        };
        let mut words = rest.split_whitespace();
        let keyword = words.next().ok_or_else(bad)?;
        match keyword {
            "rs" => {
                let name = words.next().ok_or_else(bad)?;
                let count = words.next().ok_or_else(bad)?;
                let bytes = parse_literal(count).ok_or_else(bad)? as u16;
                Ok(Stmt::Rs {
                    name: name.to_string(),
                    bytes,
                })
            }
            "db" => {
                let name = words.next().ok_or_else(bad)?;
                let payload = rest[rest.find(name).unwrap() + name.len()..].trim();
                let bytes = parse_db_payload(payload).ok_or_else(bad)?;
                Ok(Stmt::Db {
                    name: name.to_string(),
                    bytes,
                })
            }
            "macro" => {
                let name = words.next().ok_or_else(bad)?;
                let value = words.next().and_then(parse_literal).ok_or_else(bad)?;
                Ok(Stmt::Macro {
                    name: name.to_string(),
                    value: value as u16,
                })
            }
            "global" => {
                let name = words.next().ok_or_else(bad)?;
                Ok(Stmt::Global {
                    name: name.to_string(),
                })
            }
            "include" => {
                let path = words.next().ok_or_else(bad)?;
                Ok(Stmt::Include {
                    path: path.trim_matches('"').to_string(),
                })
            }
            _ => Err(bad()),
        }
    }
}

/// `@db` payload: either a quoted string (stored as a big-endian length
/// word followed by the bytes, the VM's string layout) or a list of byte
/// literals.
fn parse_db_payload(payload: &str) -> Option<Vec<u8>> {
    let payload = payload.trim();
    if let Some(inner) = payload.strip_prefix('"') {
        let inner = inner.strip_suffix('"')?;
        let text = inner.replace("\\\"", "\"").replace("\\\\", "\\");
        let mut bytes = Vec::with_capacity(text.len() + 2);
        bytes.extend_from_slice(&(text.len() as u16).to_be_bytes());
        bytes.extend_from_slice(text.as_bytes());
        return Some(bytes);
    }
    let mut bytes = Vec::new();
    for word in payload.split_whitespace() {
        let value = parse_literal(word)?;
        if value > 0xFF {
            return None;
        }
        bytes.push(value as u8);
    }
    if bytes.is_empty() {
        None
    } else {
        Some(bytes)
    }
}

pub fn parse_operand(text: &str, line: usize) -> Result<Operand, AsmError> {
    let bad = || AsmError::BadOperand {
        text: text.to_string(),
        line,
    };
    let mut text = text.trim();

    match text {
        "A" | "a" => {
            return Ok(Operand {
                mode: AddrMode::RegA,
                short: false,
                value: Value::Literal(0),
            })
        }
        "B" | "b" => {
            return Ok(Operand {
                mode: AddrMode::RegB,
                short: false,
                value: Value::Literal(0),
            })
        }
        _ => {}
    }

    let short = if let Some(rest) = text.strip_prefix('<') {
        text = rest.trim();
        true
    } else {
        false
    };

    if let Some(rest) = text.strip_prefix('#') {
        let value = parse_value(rest.trim()).ok_or_else(bad)?;
        return Ok(Operand {
            mode: AddrMode::Immediate,
            short,
            value,
        });
    }

    if let Some(rest) = text.strip_prefix('(') {
        // ($addr, x) indexed-indirect, ($addr) [, x/y] indirect family
        if let Some((inner, after)) = rest.split_once(')') {
            let after = after.trim();
            let inner = inner.trim();
            if let Some((value_text, reg)) = inner.split_once(',') {
                if !after.is_empty() {
                    return Err(bad());
                }
                let value = parse_value(value_text.trim()).ok_or_else(bad)?;
                let mode = match reg.trim() {
                    "x" | "X" => AddrMode::IndexedIndirectX,
                    "y" | "Y" => AddrMode::IndexedIndirectY,
                    _ => return Err(bad()),
                };
                return Ok(Operand { mode, short, value });
            }
            let value = parse_value(inner).ok_or_else(bad)?;
            let mode = match after.strip_prefix(',').map(str::trim) {
                None => AddrMode::Indirect,
                Some("x") | Some("X") => AddrMode::IndirectIndexedX,
                Some("y") | Some("Y") => AddrMode::IndirectIndexedY,
                Some(_) => return Err(bad()),
            };
            return Ok(Operand { mode, short, value });
        }
        return Err(bad());
    }

    // absolute, possibly indexed
    if let Some((value_text, reg)) = text.split_once(',') {
        let value = parse_value(value_text.trim()).ok_or_else(bad)?;
        let mode = match reg.trim() {
            "x" | "X" => AddrMode::XIndexed,
            "y" | "Y" => AddrMode::YIndexed,
            _ => return Err(bad()),
        };
        return Ok(Operand { mode, short, value });
    }
    let value = parse_value(text).ok_or_else(bad)?;
    Ok(Operand {
        mode: AddrMode::Absolute,
        short,
        value,
    })
}

fn parse_value(text: &str) -> Option<Value> {
    if let Some(v) = parse_literal(text) {
        return Some(Value::Literal(v));
    }
    if is_identifier(text) {
        return Some(Value::Symbol(text.to_string()));
    }
    None
}

fn parse_literal(text: &str) -> Option<u32> {
    if let Some(hex) = text.strip_prefix('$') {
        return u32::from_str_radix(hex, 16).ok();
    }
    if let Some(hex) = text.strip_prefix("0x") {
        return u32::from_str_radix(hex, 16).ok();
    }
    text.parse().ok()
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operand(text: &str) -> Operand {
        parse_operand(text, 1).unwrap()
    }

    #[test]
    fn operand_modes() {
        assert_eq!(operand("$1234").mode, AddrMode::Absolute);
        assert_eq!(operand("$1234, x").mode, AddrMode::XIndexed);
        assert_eq!(operand("$1234, y").mode, AddrMode::YIndexed);
        assert_eq!(operand("#$12").mode, AddrMode::Immediate);
        assert_eq!(operand("($1234)").mode, AddrMode::Indirect);
        assert_eq!(operand("($12), x").mode, AddrMode::IndirectIndexedX);
        assert_eq!(operand("($12), y").mode, AddrMode::IndirectIndexedY);
        assert_eq!(operand("($12, x)").mode, AddrMode::IndexedIndirectX);
        assert_eq!(operand("($12, y)").mode, AddrMode::IndexedIndirectY);
        assert_eq!(operand("A").mode, AddrMode::RegA);
        assert_eq!(operand("B").mode, AddrMode::RegB);
    }

    #[test]
    fn short_prefix_and_literals() {
        let op = operand("<$12");
        assert!(op.short);
        assert_eq!(op.value, Value::Literal(0x12));
        assert_eq!(operand("#42").value, Value::Literal(42));
        assert_eq!(operand("#$ff").value, Value::Literal(0xFF));
    }

    #[test]
    fn symbol_operands() {
        assert_eq!(operand("main").value, Value::Symbol("main".into()));
        assert_eq!(operand("#myconst").value, Value::Symbol("myconst".into()));
        assert_eq!(operand("table, x").value, Value::Symbol("table".into()));
    }

    #[test]
    fn statements() {
        assert_eq!(
            Stmt::parse("main:", 1).unwrap(),
            Some(Stmt::Label("main".into()))
        );
        assert_eq!(
            Stmt::parse("@rs counter 2", 1).unwrap(),
            Some(Stmt::Rs {
                name: "counter".into(),
                bytes: 2
            })
        );
        assert_eq!(
            Stmt::parse("@macro limit $100", 1).unwrap(),
            Some(Stmt::Macro {
                name: "limit".into(),
                value: 0x100
            })
        );
        assert_eq!(Stmt::parse("  ; just a comment", 1).unwrap(), None);
        assert!(Stmt::parse("frobnicate $12", 1).is_err());
    }

    #[test]
    fn db_string_payload_is_length_prefixed() {
        let stmt = Stmt::parse("@db greeting \"hi\"", 1).unwrap().unwrap();
        let Stmt::Db { bytes, .. } = stmt else {
            panic!("expected db");
        };
        assert_eq!(bytes, vec![0x00, 0x02, b'h', b'i']);
    }

    #[test]
    fn instruction_with_operand() {
        let stmt = Stmt::parse("loada #$0005", 1).unwrap().unwrap();
        let Stmt::Inst(inst) = stmt else {
            panic!("expected instruction");
        };
        assert_eq!(inst.op, Opcode::LOADA);
        let operand = inst.operand.unwrap();
        assert_eq!(operand.mode, AddrMode::Immediate);
        assert_eq!(operand.value, Value::Literal(5));
    }
}
