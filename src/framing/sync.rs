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

    src/framing/sync.rs

    Bit lock and address mark search.

    The preamble before every sector is a run of 0x00 bytes, which FM encodes
    as alternating clock and data half-cells (1 0 1 0 ...). Bit lock is
    declared once enough consecutive unequal half-bit pairs have been seen.
    The first 1 data bit after lock starts the address mark byte.
*/
use crate::{config::MIN_SYNC_BITS, drive::MediumSource, flux::Pll, framing::ByteAssembler};
use std::fmt::{self, Display, Formatter};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SyncState {
    #[default]
    SearchingSync,
    SearchingMark,
    Locked,
}

impl Display for SyncState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            SyncState::SearchingSync => write!(f, "Searching sync"),
            SyncState::SearchingMark => write!(f, "Searching address mark"),
            SyncState::Locked => write!(f, "Locked"),
        }
    }
}

/// The result of one lock search step.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    None,
    /// Bit lock acquired; now searching for the address mark.
    BitLock,
    /// The address mark byte has been shifted into the data register.
    AddressMark(u8),
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Synchronizer {
    state: SyncState,
    sync_count: u8,
    threshold: u8,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Synchronizer::new(MIN_SYNC_BITS)
    }
}

impl Synchronizer {
    pub fn new(threshold: u8) -> Self {
        Synchronizer {
            state: SyncState::SearchingSync,
            sync_count: 0,
            threshold: threshold.max(1),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn sync_count(&self) -> u8 {
        self.sync_count
    }

    /// Go back to searching for sync.
    pub fn restart(&mut self) {
        self.state = SyncState::SearchingSync;
        self.sync_count = 0;
    }

    /// Run one lock search step. Each step consumes one bit cell from the PLL, plus one
    /// extra half bit when bit lock is acquired out of phase, plus seven more bit cells when
    /// the address mark is found.
    pub fn tick(&mut self, pll: &mut Pll, medium: Option<&dyn MediumSource>, asm: &mut ByteAssembler) -> SyncEvent {
        match self.state {
            SyncState::SearchingSync => {
                let half_bit0 = pll.read_half_bit(medium);
                let half_bit1 = pll.read_half_bit(medium);

                if half_bit0 == half_bit1 {
                    self.sync_count = 0;
                    return SyncEvent::None;
                }

                self.sync_count = self.sync_count.saturating_add(1);
                if self.sync_count < self.threshold {
                    return SyncEvent::None;
                }

                // Preamble is clock 1, data 0. If the pair ended on a 1 we sampled
                // data then clock, so skip a half bit to realign on the clock.
                if half_bit1 {
                    pll.read_half_bit(medium);
                }
                asm.clear_registers();
                self.state = SyncState::SearchingMark;
                SyncEvent::BitLock
            }
            SyncState::SearchingMark => {
                asm.read_bit(pll, medium, false);
                if asm.data() & 0x01 == 0 {
                    return SyncEvent::None;
                }
                for _ in 0..7 {
                    asm.read_bit(pll, medium, false);
                }
                asm.publish();
                self.state = SyncState::Locked;
                SyncEvent::AddressMark(asm.data())
            }
            SyncState::Locked => SyncEvent::None,
        }
    }
}
