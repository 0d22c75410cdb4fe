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

    flags.rs

    Defines the PIO register bitflags
*/

use bitflags::bitflags;

bitflags! {
    /// Output bits of the control/status port (DSKCOM).
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[rustfmt::skip]
    pub struct ControlBits: u8 {
        #[doc = "Step direction. Set steps toward higher cylinders"]
        const DIRECTION     = 0b0000_0001;
        #[doc = "Head step line. A step occurs when the line is released"]
        const STEP          = 0b0000_0010;
        #[doc = "Read mode"]
        const READ_ENABLE   = 0b0000_0100;
        #[doc = "Write mode"]
        const WRITE_ENABLE  = 0b0000_1000;
        #[doc = "Enable the CRC generator"]
        const CRC_ENABLE    = 0b0001_0000;
    }
}

bitflags! {
    /// Input bits of the control/status port (DSSTAT). All bits read clear with no drive
    /// selected.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[rustfmt::skip]
    pub struct StatusBits: u8 {
        #[doc = "Selected drive is ready"]
        const READY         = 0b0010_0000;
        #[doc = "Selected drive's head is on cylinder 0 (active low)"]
        const TRACK0_N      = 0b0100_0000;
        #[doc = "CRC error"]
        const CRC_ERROR     = 0b1000_0000;
    }
}

bitflags! {
    /// Bits of the drive select port (DSKSEL). The drive index occupies bits 0-2.
    /// Input bits 5-7 are active low.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    #[rustfmt::skip]
    pub struct SelectBits: u8 {
        const DRIVE_MASK        = 0b0000_0111;
        #[doc = "Set to select the drive in bits 0-2, clear to deselect all drives"]
        const SELECT            = 0b0000_1000;
        #[doc = "Sector/index pulse (active low)"]
        const SECTOR_PULSE_N    = 0b0010_0000;
        #[doc = "Drive present (active low)"]
        const DRIVE_PRESENT_N   = 0b0100_0000;
        #[doc = "Write protected (active low)"]
        const WRITE_PROTECT_N   = 0b1000_0000;
    }
}

impl SelectBits {
    pub fn drive_index(&self) -> usize {
        (self.bits() & SelectBits::DRIVE_MASK.bits()) as usize
    }
}
