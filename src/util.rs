/*
    FluxFox
    https://github.com/dbalsom/fluxfox

    Copyright 2024-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/util.rs

    CRC and dump helpers shared by the controller, the image parser and mdctool.
*/
use crate::io::{Seek, SeekFrom, Write};

/// CRC-CCITT generator polynomial.
pub const CRC_POLY: u16 = 0x1021;

pub(crate) fn get_length<T: Seek>(source: &mut T) -> Result<u64, crate::io::Error> {
    // Seek to the end of the source
    let length = source.seek(SeekFrom::End(0))?;
    // Seek back to the beginning of the source
    source.seek(SeekFrom::Start(0))?;
    Ok(length)
}

/// Shift a single data bit through a CRC-CCITT register, MSB first.
#[inline]
pub fn crc_ccitt_bit(crc: u16, bit: bool) -> u16 {
    let out = crc & 0x8000 != 0;
    if out ^ bit {
        (crc << 1) ^ CRC_POLY
    }
    else {
        crc << 1
    }
}

/// Calculate the CRC-CCITT of a byte slice, shifting each byte in MSB first exactly as the
/// controller's bit-serial generator does. The register starts at `start`, or 0 if not provided,
/// which matches the controller's state after reset.
pub fn crc_ccitt(data: &[u8], start: Option<u16>) -> u16 {
    let mut crc = start.unwrap_or(0);
    for byte in data {
        for i in (0..8).rev() {
            crc = crc_ccitt_bit(crc, byte & (1 << i) != 0);
        }
    }
    crc
}

/// Write a hex/ASCII dump of `data` to `out`, `row_size` bytes per row, with addresses starting
/// at `start_address`.
pub fn dump_slice<W: Write>(data: &[u8], start_address: usize, row_size: usize, out: &mut W) -> crate::io::Result<()> {
    let row_size = row_size.max(1);
    for (row_idx, row) in data.chunks(row_size).enumerate() {
        write!(out, "{:05X} | ", start_address + row_idx * row_size)?;
        for byte in row {
            write!(out, "{:02X} ", byte)?;
        }
        for _ in row.len()..row_size {
            write!(out, "   ")?;
        }
        write!(out, "| ")?;
        for &byte in row {
            let c = if byte.is_ascii_graphic() || byte == b' ' { byte as char } else { '.' };
            write!(out, "{}", c)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_ccitt_check_value() {
        // CRC-16/XMODEM check value: CCITT polynomial with a zero preset.
        assert_eq!(crc_ccitt(b"123456789", None), 0x31C3);
        // Same polynomial preset to 0xFFFF (IBM 3740).
        assert_eq!(crc_ccitt(b"123456789", Some(0xFFFF)), 0x29B1);
    }

    #[test]
    fn test_crc_ccitt_residue_is_zero() {
        let mut data = b"MCZ sector".to_vec();
        let crc = crc_ccitt(&data, None);
        data.extend_from_slice(&crc.to_be_bytes());
        assert_eq!(crc_ccitt(&data, None), 0);
    }

    #[test]
    fn test_dump_slice() {
        let mut out = Vec::new();
        dump_slice(b"AB\x00", 0x10, 4, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "00010 | 41 42 00    | AB.\n");
    }
}
