//! Little-endian binary I/O.
//!
//! The object-file codec and the image loader speak this contract: all
//! multi-byte file quantities are little-endian, strings are written as a
//! 16-bit length followed by the bytes. The VM's in-memory word order is
//! big-endian and deliberately separate from this module.

use std::io::{self, Read, Write};

pub fn read_u8<R: Read>(r: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_u16<R: Read>(r: &mut R) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = read_u16(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

pub fn write_u8<W: Write>(w: &mut W, value: u8) -> io::Result<()> {
    w.write_all(&[value])
}

pub fn write_u16<W: Write>(w: &mut W, value: u16) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn write_u32<W: Write>(w: &mut W, value: u32) -> io::Result<()> {
    w.write_all(&value.to_le_bytes())
}

pub fn write_string<W: Write>(w: &mut W, value: &str) -> io::Result<()> {
    write_u16(w, value.len() as u16)?;
    w.write_all(value.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn scalar_roundtrip() {
        let mut buf = Vec::new();
        write_u8(&mut buf, 0xAB).unwrap();
        write_u16(&mut buf, 0x1234).unwrap();
        write_u32(&mut buf, 0xDEADBEEF).unwrap();
        let mut cur = Cursor::new(buf);
        assert_eq!(read_u8(&mut cur).unwrap(), 0xAB);
        assert_eq!(read_u16(&mut cur).unwrap(), 0x1234);
        assert_eq!(read_u32(&mut cur).unwrap(), 0xDEADBEEF);
    }

    #[test]
    fn u16_is_little_endian() {
        let mut buf = Vec::new();
        write_u16(&mut buf, 0x1234).unwrap();
        assert_eq!(buf, [0x34, 0x12]);
    }

    #[test]
    fn string_roundtrip() {
        let mut buf = Vec::new();
        write_string(&mut buf, "factorial").unwrap();
        let mut cur = Cursor::new(buf);
        assert_eq!(read_string(&mut cur).unwrap(), "factorial");
    }
}
