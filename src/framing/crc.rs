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
*/
use crate::util::crc_ccitt_bit;

/// The controller's bit-serial CRC-CCITT generator.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CrcRegister {
    value: u16,
    enabled: bool,
    output: bool,
}

impl CrcRegister {
    pub fn value(&self) -> u16 {
        self.value
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn output(&self) -> bool {
        self.output
    }

    /// Enable or disable the generator. Returns true on an off to on transition, in which case
    /// the register has been cleared.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        let rising = enabled && !self.enabled;
        if rising {
            self.value = 0;
        }
        self.enabled = enabled;
        rising
    }

    /// In output mode the register is being shifted out to the medium and stops accumulating.
    /// Only the write path enters output mode, after the data field; nothing on the read path
    /// sets it, so reads always accumulate while enabled.
    pub fn set_output(&mut self, output: bool) {
        self.output = output;
    }

    /// Shift one data bit in. Ignored unless enabled and not in output mode.
    pub fn update(&mut self, bit: bool) {
        if self.enabled && !self.output {
            self.value = crc_ccitt_bit(self.value, bit);
        }
    }

    pub fn clear(&mut self) {
        *self = CrcRegister::default();
    }
}
