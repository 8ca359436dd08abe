//! The linker: merges object files into a single loadable image.
//!
//! Units are placed back to back starting at the bottom of the program
//! region, each unit's `.data` immediately behind its `.text`. Defined
//! symbols are offset by their unit's placement; `@rs` reservations and
//! pure constants are already absolute and stay put. Every relocation
//! entry then patches the operand word it names.

use crate::error::{LinkError, ObjectError};
use crate::object::{ObjectFile, SymbolClass};
use arch::binio;
use std::collections::HashMap;
use std::io::{Read, Write};

/// A linked program image, loadable at [`arch::mem::PRG_BOTTOM`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub wordsize: u8,
    pub entry: u16,
    pub bytes: Vec<u8>,
}

pub fn link(objects: &[ObjectFile]) -> Result<Image, LinkError> {
    let first = objects.first().ok_or(LinkError::NoInput)?;
    for obj in objects {
        if obj.wordsize != first.wordsize {
            return Err(LinkError::WordsizeMismatch(first.wordsize, obj.wordsize));
        }
    }

    // place units and collect every resolvable symbol
    let mut placements = Vec::with_capacity(objects.len());
    let mut cursor = arch::mem::PRG_BOTTOM as usize;
    for obj in objects {
        placements.push(cursor as u16);
        cursor += obj.text.len() + obj.data_len();
    }
    let image_len = cursor - arch::mem::PRG_BOTTOM as usize;
    if cursor > arch::mem::PRG_TOP as usize {
        return Err(LinkError::ImageTooLarge { size: image_len });
    }

    let mut resolved: HashMap<String, u16> = HashMap::new();
    let mut define = |name: &str, value: u16| -> Result<(), LinkError> {
        if resolved.insert(name.to_string(), value).is_some() {
            return Err(LinkError::DuplicateSymbol {
                name: name.to_string(),
            });
        }
        Ok(())
    };
    for (obj, base) in objects.iter().zip(&placements) {
        let data_base = base + obj.text.len() as u16;
        for symbol in &obj.symbols {
            match symbol.class {
                SymbolClass::D | SymbolClass::R => define(&symbol.name, base + symbol.value)?,
                SymbolClass::C => {
                    if obj.data.iter().any(|d| d.name == symbol.name) {
                        // a data name: its value is the offset in .data
                        define(&symbol.name, data_base + symbol.value)?;
                    } else {
                        // a pure constant, already inlined by the assembler
                        define(&symbol.name, symbol.value)?;
                    }
                }
                SymbolClass::M => define(&symbol.name, symbol.value)?,
                SymbolClass::U => {}
            }
        }
    }

    // build the image: .text then .data per unit
    let mut bytes = Vec::with_capacity(image_len);
    for obj in objects {
        bytes.extend_from_slice(&obj.text);
        for entry in &obj.data {
            bytes.extend_from_slice(&entry.bytes);
        }
    }

    // patch relocations
    for (obj, base) in objects.iter().zip(&placements) {
        let unit_offset = (base - arch::mem::PRG_BOTTOM) as usize;
        for entry in &obj.relocations {
            let value = *resolved
                .get(&entry.name)
                .ok_or_else(|| LinkError::UnresolvedSymbol {
                    name: entry.name.clone(),
                })?;
            let at = unit_offset + entry.address as usize;
            // operand words are big-endian in the VM's memory
            bytes[at] = (value >> 8) as u8;
            bytes[at + 1] = value as u8;
        }
    }

    Ok(Image {
        wordsize: first.wordsize,
        entry: placements[0] + first.entry_point,
        bytes,
    })
}

impl Image {
    /// Image file layout: word size, entry address, byte count, bytes.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), ObjectError> {
        binio::write_u8(w, self.wordsize)?;
        binio::write_u16(w, self.entry)?;
        binio::write_u32(w, self.bytes.len() as u32)?;
        w.write_all(&self.bytes)?;
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Image, ObjectError> {
        let wordsize = binio::read_u8(r)?;
        let entry = binio::read_u16(r)?;
        let len = binio::read_u32(r)? as usize;
        let mut bytes = vec![0u8; len];
        r.read_exact(&mut bytes)?;
        Ok(Image {
            wordsize,
            entry,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble;

    #[test]
    fn single_unit_branch_is_patched_to_its_placement() {
        let obj = assemble("start:\n\tnoop\n\tjmp start\n").unwrap();
        let image = link(&[obj]).unwrap();
        // noop at PRG_BOTTOM, jmp operand patched to absolute start
        let patched = u16::from_be_bytes([image.bytes[3], image.bytes[4]]);
        assert_eq!(patched, arch::mem::PRG_BOTTOM);
        assert_eq!(image.entry, arch::mem::PRG_BOTTOM);
    }

    #[test]
    fn cross_unit_call_resolves() {
        let caller = assemble("\tjsr helper\n\thalt\n").unwrap();
        let helper = assemble("helper:\n\trts\n").unwrap();
        let caller_len = caller.text.len() as u16;
        let image = link(&[caller, helper]).unwrap();
        let patched = u16::from_be_bytes([image.bytes[2], image.bytes[3]]);
        assert_eq!(patched, arch::mem::PRG_BOTTOM + caller_len);
    }

    #[test]
    fn unresolved_external_is_fatal() {
        let obj = assemble("\tjsr missing\n").unwrap();
        assert!(matches!(
            link(&[obj]),
            Err(LinkError::UnresolvedSymbol { .. })
        ));
    }

    #[test]
    fn duplicate_definitions_across_units_are_fatal() {
        let a = assemble("same:\n\thalt\n").unwrap();
        let b = assemble("same:\n\tnoop\n").unwrap();
        assert!(matches!(link(&[a, b]), Err(LinkError::DuplicateSymbol { .. })));
    }

    #[test]
    fn data_symbols_land_behind_text() {
        let obj = assemble("@db msg \"ok\"\n\tloada #msg\n\thalt\n").unwrap();
        let text_len = obj.text.len() as u16;
        let image = link(&[obj]).unwrap();
        let patched = u16::from_be_bytes([image.bytes[2], image.bytes[3]]);
        assert_eq!(patched, arch::mem::PRG_BOTTOM + text_len);
        // the data bytes themselves are in the image
        let data_at = text_len as usize;
        assert_eq!(&image.bytes[data_at..data_at + 4], &[0x00, 0x02, b'o', b'k']);
    }

    #[test]
    fn image_roundtrips_through_its_file_form() {
        let obj = assemble("\tloada #$0001\n\thalt\n").unwrap();
        let image = link(&[obj]).unwrap();
        let mut buf = Vec::new();
        image.write(&mut buf).unwrap();
        let back = Image::read(&mut buf.as_slice()).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn rs_references_stay_absolute() {
        let obj = assemble("@rs counter 2\n\tloada counter\n\thalt\n").unwrap();
        let image = link(&[obj]).unwrap();
        let patched = u16::from_be_bytes([image.bytes[2], image.bytes[3]]);
        assert_eq!(patched, arch::mem::RS_START);
    }
}
