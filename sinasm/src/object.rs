//! The binary `sinC` object-file format.
//!
//! Layout (all file scalars little-endian; strings length-prefixed):
//!
//! ```text
//! offset  size  field
//! 0       4     magic "sinC"
//! 4       1     word size in bits
//! 5       1     VM endianness (1 = LE, 2 = BE)
//! 6       1     file endianness
//! 7       1     file version (2)
//! 8       1     target VM version
//! 9       2     entry-point address
//! 11      4     program byte count P
//! 15      4     symbol count S, then S symbol records
//! ...     4     relocation count R, then R relocation records
//! ...     P     .text bytes
//! ...     4     data-entry count D, then D data records
//! ```

use crate::error::ObjectError;
use arch::binio;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::io::{Read, Write};

pub const MAGIC: &[u8; 4] = b"sinC";
pub const FILE_VERSION: u8 = 2;
pub const VM_VERSION: u8 = 1;
/// The VM stores machine words big-endian.
pub const VM_ENDIAN: u8 = 2;
/// The file itself is little-endian per the binary I/O contract.
pub const FILE_ENDIAN: u8 = 1;

/// Symbol classes: `U` external reference, `D` defined label, `C`
/// constant (an `@macro` value, or an `@db` data name whose value is its
/// offset in `.data`), `R` a defined label referenced in an operand, `M`
/// an `@rs` reservation at an absolute address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SymbolClass {
    U = 1,
    D = 2,
    C = 3,
    R = 4,
    M = 5,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsmSymbol {
    pub name: String,
    pub value: u16,
    pub width: u8,
    pub class: SymbolClass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationEntry {
    pub name: String,
    /// Offset of the operand word within this unit's `.text`.
    pub address: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntry {
    pub name: String,
    /// Offset of the bytes behind the end of `.text`; recomputed on read.
    pub offset: usize,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFile {
    pub wordsize: u8,
    pub vm_endianness: u8,
    pub file_endianness: u8,
    pub version: u8,
    pub vm_version: u8,
    pub entry_point: u16,
    pub text: Vec<u8>,
    pub symbols: Vec<AsmSymbol>,
    pub relocations: Vec<RelocationEntry>,
    pub data: Vec<DataEntry>,
}

impl Default for ObjectFile {
    fn default() -> Self {
        ObjectFile {
            wordsize: arch::WORDSIZE,
            vm_endianness: VM_ENDIAN,
            file_endianness: FILE_ENDIAN,
            version: FILE_VERSION,
            vm_version: VM_VERSION,
            entry_point: 0,
            text: Vec::new(),
            symbols: Vec::new(),
            relocations: Vec::new(),
            data: Vec::new(),
        }
    }
}

impl ObjectFile {
    pub fn write<W: Write>(&self, w: &mut W) -> Result<(), ObjectError> {
        w.write_all(MAGIC)?;
        binio::write_u8(w, self.wordsize)?;
        binio::write_u8(w, self.vm_endianness)?;
        binio::write_u8(w, self.file_endianness)?;
        binio::write_u8(w, self.version)?;
        binio::write_u8(w, self.vm_version)?;
        binio::write_u16(w, self.entry_point)?;
        binio::write_u32(w, self.text.len() as u32)?;

        binio::write_u32(w, self.symbols.len() as u32)?;
        for symbol in &self.symbols {
            binio::write_u16(w, symbol.value)?;
            binio::write_u8(w, symbol.width)?;
            binio::write_u8(w, symbol.class.into())?;
            binio::write_string(w, &symbol.name)?;
        }

        binio::write_u32(w, self.relocations.len() as u32)?;
        for entry in &self.relocations {
            binio::write_u16(w, entry.address)?;
            binio::write_string(w, &entry.name)?;
        }

        w.write_all(&self.text)?;

        binio::write_u32(w, self.data.len() as u32)?;
        for entry in &self.data {
            binio::write_u16(w, entry.bytes.len() as u16)?;
            binio::write_string(w, &entry.name)?;
            w.write_all(&entry.bytes)?;
        }
        Ok(())
    }

    pub fn read<R: Read>(r: &mut R) -> Result<ObjectFile, ObjectError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(ObjectError::BadMagic);
        }

        let wordsize = binio::read_u8(r)?;
        let vm_endianness = binio::read_u8(r)?;
        let file_endianness = binio::read_u8(r)?;
        let version = binio::read_u8(r)?;
        if version != FILE_VERSION {
            return Err(ObjectError::UnsupportedVersion(version));
        }
        let vm_version = binio::read_u8(r)?;
        let entry_point = binio::read_u16(r)?;
        let text_len = binio::read_u32(r)? as usize;

        let symbol_count = binio::read_u32(r)? as usize;
        let mut symbols = Vec::with_capacity(symbol_count);
        for _ in 0..symbol_count {
            let value = binio::read_u16(r)?;
            let width = binio::read_u8(r)?;
            let class_byte = binio::read_u8(r)?;
            let class = SymbolClass::try_from(class_byte)
                .map_err(|_| ObjectError::BadSymbolClass(class_byte))?;
            let name = binio::read_string(r)?;
            symbols.push(AsmSymbol {
                name,
                value,
                width,
                class,
            });
        }

        let relocation_count = binio::read_u32(r)? as usize;
        let mut relocations = Vec::with_capacity(relocation_count);
        for _ in 0..relocation_count {
            let address = binio::read_u16(r)?;
            let name = binio::read_string(r)?;
            relocations.push(RelocationEntry { name, address });
        }

        let mut text = vec![0u8; text_len];
        r.read_exact(&mut text)?;

        let data_count = binio::read_u32(r)? as usize;
        let mut data = Vec::with_capacity(data_count);
        // the data section lands immediately behind .text
        let mut offset = text.len();
        for _ in 0..data_count {
            let byte_count = binio::read_u16(r)? as usize;
            let name = binio::read_string(r)?;
            let mut bytes = vec![0u8; byte_count];
            r.read_exact(&mut bytes)?;
            data.push(DataEntry {
                name,
                offset,
                bytes,
            });
            offset += byte_count;
        }

        Ok(ObjectFile {
            wordsize,
            vm_endianness,
            file_endianness,
            version,
            vm_version,
            entry_point,
            text,
            symbols,
            relocations,
            data,
        })
    }

    /// Total `.data` length in bytes.
    pub fn data_len(&self) -> usize {
        self.data.iter().map(|d| d.bytes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn bad_magic_is_fatal() {
        let mut cur = Cursor::new(b"ELF\x7f rest of file".to_vec());
        assert!(matches!(
            ObjectFile::read(&mut cur),
            Err(ObjectError::BadMagic)
        ));
    }

    #[test]
    fn unsupported_version_is_fatal() {
        let mut obj = ObjectFile::default();
        obj.version = 3;
        let mut buf = Vec::new();
        obj.write(&mut buf).unwrap();
        assert!(matches!(
            ObjectFile::read(&mut Cursor::new(buf)),
            Err(ObjectError::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn bad_symbol_class_is_fatal() {
        let mut obj = ObjectFile::default();
        obj.symbols.push(AsmSymbol {
            name: "x".into(),
            value: 0,
            width: 2,
            class: SymbolClass::D,
        });
        let mut buf = Vec::new();
        obj.write(&mut buf).unwrap();
        // corrupt the class byte: it sits after the 19-byte header and the
        // symbol's value + width
        buf[19 + 3] = 9;
        assert!(matches!(
            ObjectFile::read(&mut Cursor::new(buf)),
            Err(ObjectError::BadSymbolClass(9))
        ));
    }
}
