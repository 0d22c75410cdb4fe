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

    src/lib.rs

    mcz_mdc emulates the read side of the Zilog MCZ MDC floppy disk module:
    the data separator, the sync/address mark logic, the byte assembler and
    the CPU handshake that stalls the host until each byte is recovered.
*/

pub mod bitstream;
pub mod config;
pub mod controller;
pub mod drive;
pub mod file_parsers;
pub mod flux;
pub mod framing;
pub mod host;
pub mod io;
pub mod machine;
pub mod timing;
pub mod types;
pub mod util;

use thiserror::Error;

/// The number of drive slots on the MDC cable.
pub const MAX_DRIVES: usize = 8;

#[derive(Debug, Error)]
pub enum MdcError {
    #[error("An IO error occurred reading or writing the disk image: {0}")]
    IoError(String),
    #[error("Unknown disk image format")]
    UnknownFormat,
    #[error("Unsupported disk image format for requested operation")]
    UnsupportedFormat,
    #[error("The disk image format parser encountered an error: {0}")]
    FormatParseError(String),
    #[error("The requested track or sector could not be found")]
    SeekError,
    #[error("Invalid controller configuration: {0}")]
    InvalidConfig(String),
    #[error("I/O port {0:#04X} is already claimed by another device")]
    PortConflict(u8),
    #[error("Invalid drive index: {0}")]
    InvalidDrive(usize),
    #[error("The host CPU remained stalled for {0}")]
    HostStalled(timing::VirtualTime),
}

impl From<std::io::Error> for MdcError {
    fn from(err: std::io::Error) -> Self {
        MdcError::IoError(err.to_string())
    }
}

impl From<binrw::Error> for MdcError {
    fn from(err: binrw::Error) -> Self {
        MdcError::FormatParseError(err.to_string())
    }
}

pub use crate::{
    config::MdcConfig,
    controller::{MdcController, TRIGGER_BYTE_READY},
    drive::{FluxDrive, MediumSource},
    file_parsers::{
        mcz::{MczFormat, MczImage, MczSectorRecord},
        supported_extensions,
    },
    framing::{ByteAssembler, SyncState, Synchronizer},
    host::{BusRead, HostBus, IoMap, MdcPort, TriggerId, WaitGate},
    machine::MdcMachine,
    timing::{Scheduler, TimerId, TimerQueue, VirtualTime},
    types::{ControlBits, ControllerMode, SelectBits, StatusBits},
};
