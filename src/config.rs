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
use crate::{timing::VirtualTime, MdcError};

/// Nominal IBM-mode bit cell frequency, in Hz. Bit cells are 4µs.
pub const IBMMODE_BIT_FREQ: u32 = 250_000;
/// Consecutive unequal clock/data half-bit pairs required for bit lock.
pub const MIN_SYNC_BITS: u8 = 29;
pub const DEFAULT_DATA_PORT: u8 = 0xCF;
pub const DEFAULT_PIO_BASE: u8 = 0xD0;
pub const DEFAULT_TIMEOUT_MS: u64 = 450;
pub const DEFAULT_INDEX_PULSE_US: u64 = 2_000;
/// Highest bit frequency that still leaves a half bit cell of at least 2ns.
pub const MAX_BIT_FREQ: u32 = 250_000_000;

/// Parameters for a controller and the drives attached to it. Fixed for the lifetime of a
/// [crate::MdcMachine].
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MdcConfig {
    /// Nominal frequency of whole bit cells, in Hz.
    pub bit_frequency: u32,
    /// Lock threshold for the synchronizer.
    pub sync_threshold: u8,
    /// Port of the data register.
    pub data_port: u8,
    /// First of the four PIO ports (control/status, drive select, and two unused ports).
    pub pio_base: u8,
    /// Period of the timeout timer.
    pub timeout: VirtualTime,
    /// How long the index pulse stays asserted at the start of each revolution.
    pub index_pulse_width: VirtualTime,
}

impl Default for MdcConfig {
    fn default() -> Self {
        MdcConfig {
            bit_frequency: IBMMODE_BIT_FREQ,
            sync_threshold: MIN_SYNC_BITS,
            data_port: DEFAULT_DATA_PORT,
            pio_base: DEFAULT_PIO_BASE,
            timeout: VirtualTime::from_ms(DEFAULT_TIMEOUT_MS),
            index_pulse_width: VirtualTime::from_us(DEFAULT_INDEX_PULSE_US),
        }
    }
}

impl MdcConfig {
    /// Check that the timing and port parameters describe a controller that can be built.
    pub fn validate(&self) -> Result<(), MdcError> {
        if self.bit_frequency == 0 || self.bit_frequency > MAX_BIT_FREQ {
            return Err(MdcError::InvalidConfig(format!(
                "bit frequency {} Hz out of range 1..={}",
                self.bit_frequency, MAX_BIT_FREQ
            )));
        }
        if self.sync_threshold == 0 {
            return Err(MdcError::InvalidConfig("sync threshold must be at least 1".to_string()));
        }
        if self.pio_base > u8::MAX - 3 {
            return Err(MdcError::InvalidConfig(format!(
                "PIO base {:#04X} leaves no room for four ports",
                self.pio_base
            )));
        }
        Ok(())
    }

    /// Duration of one half bit cell: 1 / (2 × bit frequency).
    pub fn half_bit_period(&self) -> VirtualTime {
        VirtualTime::from_hz(self.bit_frequency.saturating_mul(2))
    }

    /// Duration of one recovered byte: 16 half bit cells.
    pub fn byte_period(&self) -> VirtualTime {
        self.half_bit_period() * 16
    }
}
