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

    src/file_parsers/mcz.rs

    A parser for Zilog MCZ floppy images.

    MCZ images are a plain dump of 77 tracks of 32 hard sectors, each sector
    stored as the 136-byte record written by the MCZ/PDS firmware:

    | Offset | Size | Field                                     |
    |--------|------|-------------------------------------------|
    | 0      | 1    | Address mark: bit 7 set, sector number    |
    | 1      | 1    | Track number                              |
    | 2      | 128  | Data                                      |
    | 130    | 2    | Backward link (little-endian)             |
    | 132    | 2    | Forward link (little-endian)              |
    | 134    | 2    | CRC-CCITT of bytes 0-133 (big-endian)     |

    On the medium each record is preceded by sixteen 0x00 bytes of preamble
    and followed by one 0x00 trailer byte, all FM encoded.
*/
use crate::{
    bitstream::{fm::fm_encode_fill, fm_encode},
    io::{Cursor, Read, ReadSeek, ReadWriteSeek},
    util::{crc_ccitt, get_length},
    MdcError,
};
use binrw::{binrw, BinRead, BinWrite};
use bit_vec::BitVec;

pub const MCZ_TRACKS: usize = 77;
pub const MCZ_SECTORS: usize = 32;
pub const MCZ_RECORD_SIZE: usize = 136;
pub const MCZ_DATA_SIZE: usize = 128;
pub const MCZ_PREAMBLE_LEN: usize = 16;
pub const MCZ_TRAILER_LEN: usize = 1;
pub const MCZ_TRACK_SIZE: usize = MCZ_SECTORS * MCZ_RECORD_SIZE;
pub const MCZ_IMAGE_SIZE: usize = MCZ_TRACKS * MCZ_TRACK_SIZE;
/// Encoded half-cells per track.
pub const MCZ_TRACK_BITCELLS: usize = MCZ_SECTORS * (MCZ_PREAMBLE_LEN + MCZ_RECORD_SIZE + MCZ_TRAILER_LEN) * 16;

#[binrw]
#[brw(big)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MczSectorRecord {
    pub address: u8,
    pub track: u8,
    pub data: [u8; MCZ_DATA_SIZE],
    #[brw(little)]
    pub back_link: u16,
    #[brw(little)]
    pub forward_link: u16,
    pub crc: u16,
}

impl MczSectorRecord {
    pub fn sector_number(&self) -> u8 {
        self.address & 0x7F
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, MdcError> {
        let mut cursor = Cursor::new(Vec::with_capacity(MCZ_RECORD_SIZE));
        self.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Recompute the CRC over the record and compare it with the stored value.
    pub fn crc_valid(&self) -> bool {
        match self.to_bytes() {
            Ok(bytes) => crc_ccitt(&bytes[..MCZ_RECORD_SIZE - 2], None) == self.crc,
            Err(_) => false,
        }
    }
}

/// A loaded MCZ image.
#[derive(Clone, Debug)]
pub struct MczImage {
    data: Vec<u8>,
}

impl MczImage {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, MdcError> {
        if data.len() != MCZ_IMAGE_SIZE {
            log::error!(
                "MczImage::from_bytes(): Image size {} does not match expected size {}",
                data.len(),
                MCZ_IMAGE_SIZE
            );
            return Err(MdcError::UnknownFormat);
        }
        Ok(MczImage { data })
    }

    pub fn track_count(&self) -> usize {
        MCZ_TRACKS
    }

    pub fn sector_count(&self) -> usize {
        MCZ_SECTORS
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The raw 136-byte record of a sector.
    pub fn sector_raw(&self, track: usize, sector: usize) -> Option<&[u8]> {
        if track >= MCZ_TRACKS || sector >= MCZ_SECTORS {
            return None;
        }
        let offset = track * MCZ_TRACK_SIZE + sector * MCZ_RECORD_SIZE;
        self.data.get(offset..offset + MCZ_RECORD_SIZE)
    }

    pub fn sector_record(&self, track: usize, sector: usize) -> Result<MczSectorRecord, MdcError> {
        let raw = self.sector_raw(track, sector).ok_or(MdcError::SeekError)?;
        Ok(MczSectorRecord::read(&mut Cursor::new(raw))?)
    }

    /// FM encode a whole track, sector 0 first, starting at the index pulse.
    pub fn track_bitcells(&self, track: usize) -> BitVec {
        let mut bits = BitVec::with_capacity(MCZ_TRACK_BITCELLS);
        for sector in 0..MCZ_SECTORS {
            if let Some(record) = self.sector_raw(track, sector) {
                fm_encode_fill(0x00, MCZ_PREAMBLE_LEN, &mut bits);
                fm_encode(record, &mut bits);
                fm_encode_fill(0x00, MCZ_TRAILER_LEN, &mut bits);
            }
        }
        bits
    }
}

pub struct MczFormat;

impl MczFormat {
    pub fn extensions() -> Vec<&'static str> {
        vec!["mcz"]
    }

    /// MCZ images have no header; they are identified by size alone.
    pub fn detect<RS: ReadSeek>(mut image: RS) -> bool {
        get_length(&mut image).map_or(false, |len| len == MCZ_IMAGE_SIZE as u64)
    }

    pub fn load_image<RS: ReadSeek>(mut image: RS) -> Result<MczImage, MdcError> {
        if !Self::detect(&mut image) {
            return Err(MdcError::UnknownFormat);
        }
        let mut data = Vec::with_capacity(MCZ_IMAGE_SIZE);
        image.read_to_end(&mut data)?;
        log::debug!(
            "MczFormat::load_image(): Loaded {} tracks of {} sectors",
            MCZ_TRACKS,
            MCZ_SECTORS
        );
        MczImage::from_bytes(data)
    }

    pub fn can_write(_image: &MczImage) -> bool {
        false
    }

    pub fn save_image<RWS: ReadWriteSeek>(_image: &MczImage, _output: &mut RWS) -> Result<(), MdcError> {
        log::error!("MczFormat::save_image(): Writing MCZ images is not supported");
        Err(MdcError::UnsupportedFormat)
    }
}
