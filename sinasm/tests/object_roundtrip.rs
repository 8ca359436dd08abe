//! Object-file round-trip: `read(write(x)) == x` for assembler output.

use sinasm::object::{AsmSymbol, DataEntry, ObjectFile, RelocationEntry, SymbolClass};
use std::io::Cursor;

fn roundtrip(obj: &ObjectFile) -> ObjectFile {
    let mut buf = Vec::new();
    obj.write(&mut buf).unwrap();
    ObjectFile::read(&mut Cursor::new(buf)).unwrap()
}

#[test]
fn handwritten_tables_roundtrip_byte_identical() {
    // one symbol of each of D, U, C plus two relocations
    let obj = ObjectFile {
        entry_point: 0x0004,
        text: vec![0x10, 0x03, 0x00, 0x05, 0x00],
        symbols: vec![
            AsmSymbol {
                name: "main".into(),
                value: 0x0000,
                width: 2,
                class: SymbolClass::D,
            },
            AsmSymbol {
                name: "printf".into(),
                value: 0x0000,
                width: 2,
                class: SymbolClass::U,
            },
            AsmSymbol {
                name: "limit".into(),
                value: 0x0100,
                width: 2,
                class: SymbolClass::C,
            },
        ],
        relocations: vec![
            RelocationEntry {
                name: "printf".into(),
                address: 0x0002,
            },
            RelocationEntry {
                name: "main".into(),
                address: 0x0007,
            },
        ],
        data: vec![DataEntry {
            name: "greeting".into(),
            offset: 5,
            bytes: vec![0x00, 0x05, b'h', b'e', b'l', b'l', b'o'],
        }],
        ..ObjectFile::default()
    };

    let back = roundtrip(&obj);
    assert_eq!(back, obj);

    // and writing the re-read file reproduces the bytes exactly
    let mut first = Vec::new();
    obj.write(&mut first).unwrap();
    let mut second = Vec::new();
    back.write(&mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn assembled_unit_roundtrips() {
    let source = "\
@macro limit $40
@rs counter 2
@db banner \"sin\"
start:
\tloada #limit
\tjsr helper
\tcmpa counter
\tbrne start
\thalt
@global start
";
    let obj = sinasm::assemble(source).unwrap();
    let back = roundtrip(&obj);
    assert_eq!(back, obj);
}

#[test]
fn empty_unit_roundtrips() {
    let obj = sinasm::assemble("; nothing but a comment\n").unwrap();
    assert!(obj.text.is_empty());
    assert_eq!(roundtrip(&obj), obj);
}

#[test]
fn header_fields_survive() {
    let obj = sinasm::assemble("\thalt\n").unwrap();
    let back = roundtrip(&obj);
    assert_eq!(back.wordsize, arch::WORDSIZE);
    assert_eq!(back.vm_endianness, sinasm::object::VM_ENDIAN);
    assert_eq!(back.file_endianness, sinasm::object::FILE_ENDIAN);
    assert_eq!(back.version, sinasm::object::FILE_VERSION);
}
