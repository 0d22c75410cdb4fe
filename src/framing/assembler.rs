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

    src/framing/assembler.rs

    Shifts recovered bits into the clock and data registers and tracks
    whether the host has taken the last assembled byte.
*/
use crate::{drive::MediumSource, flux::Pll, framing::CrcRegister};

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ByteAssembler {
    data_sr: u8,
    clock_sr: u8,
    crc: CrcRegister,
    consumed: bool,
    overrun: bool,
}

impl Default for ByteAssembler {
    fn default() -> Self {
        ByteAssembler {
            data_sr: 0,
            clock_sr: 0,
            crc: CrcRegister::default(),
            consumed: true,
            overrun: false,
        }
    }
}

impl ByteAssembler {
    /// Return to the power-on state. This is the only way to clear the overrun flag.
    pub fn reset(&mut self) {
        *self = ByteAssembler::default();
    }

    /// Discard the transient state of a read. The CRC register and overrun flag are kept.
    pub fn restart(&mut self) {
        self.clear_registers();
        self.consumed = true;
    }

    pub fn clear_registers(&mut self) {
        self.data_sr = 0;
        self.clock_sr = 0;
    }

    /// Read one bit cell (a clock half-bit followed by a data half-bit) and shift it into the
    /// registers. The data bit feeds the CRC generator when `crc_update` is set.
    pub fn read_bit(&mut self, pll: &mut Pll, medium: Option<&dyn MediumSource>, crc_update: bool) {
        let clock_bit = pll.read_half_bit(medium);
        let data_bit = pll.read_half_bit(medium);

        self.clock_sr = (self.clock_sr << 1) | clock_bit as u8;
        self.data_sr = (self.data_sr << 1) | data_bit as u8;
        if crc_update {
            self.crc.update(data_bit);
        }
    }

    /// Assemble the next byte. Sets the overrun flag if the previous byte was never taken.
    /// Returns true if this byte caused an overrun.
    pub fn assemble_byte(&mut self, pll: &mut Pll, medium: Option<&dyn MediumSource>) -> bool {
        let overrun = !self.consumed;
        if overrun {
            self.overrun = true;
        }
        for _ in 0..8 {
            self.read_bit(pll, medium, true);
        }
        self.publish();
        log::trace!(
            "ByteAssembler::assemble_byte(): D={:02X}/C={:02X} crc={:04X}",
            self.data_sr,
            self.clock_sr,
            self.crc.value()
        );
        overrun
    }

    /// Mark the contents of the data register as a fresh byte for the host.
    pub fn publish(&mut self) {
        self.consumed = false;
    }

    /// Take the current byte if the host has not already taken it.
    pub fn take(&mut self) -> Option<u8> {
        if self.consumed {
            return None;
        }
        self.consumed = true;
        Some(self.data_sr)
    }

    pub fn data(&self) -> u8 {
        self.data_sr
    }

    pub fn clock(&self) -> u8 {
        self.clock_sr
    }

    pub fn overrun(&self) -> bool {
        self.overrun
    }

    pub fn crc(&self) -> &CrcRegister {
        &self.crc
    }

    pub fn crc_mut(&mut self) -> &mut CrcRegister {
        &mut self.crc
    }
}
