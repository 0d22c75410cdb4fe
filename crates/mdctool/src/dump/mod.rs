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
pub(crate) mod args;

use anyhow::{bail, Context, Error};
use std::io::{BufWriter, Write};

use crate::{args::GlobalOptions, check_extension, read_file};
use mcz_mdc::{
    file_parsers::mcz::{MCZ_RECORD_SIZE, MCZ_SECTORS, MCZ_TRACKS},
    util::{crc_ccitt, dump_slice},
    ControlBits,
    MczFormat,
    MdcConfig,
    MdcMachine,
    SelectBits,
    StatusBits,
    VirtualTime,
};

/// How long the CPU may stay stalled on any single access. A little over two revolutions.
const STALL_BUDGET: VirtualTime = VirtualTime::from_ms(400);

/// The controller's ports, as firmware sees them.
struct Ports {
    data: u8,
    control: u8,
    select: u8,
}

impl Ports {
    fn new(config: &MdcConfig) -> Self {
        Ports {
            data: config.data_port,
            control: config.pio_base,
            select: config.pio_base.wrapping_add(1),
        }
    }
}

fn read_status(machine: &mut MdcMachine, ports: &Ports) -> Result<StatusBits, Error> {
    let value = machine.read_port_blocking(ports.control, STALL_BUDGET)?;
    Ok(StatusBits::from_bits_truncate(value))
}

fn step(machine: &mut MdcMachine, ports: &Ports, inward: bool) {
    let direction = if inward { ControlBits::DIRECTION } else { ControlBits::empty() };
    machine.io_write(ports.control, (direction | ControlBits::STEP).bits());
    machine.io_write(ports.control, direction.bits());
}

/// Recalibrate to cylinder 0, then step in to `cylinder`.
fn seek(machine: &mut MdcMachine, ports: &Ports, cylinder: u8) -> Result<(), Error> {
    let mut steps = 0;
    while read_status(machine, ports)?.contains(StatusBits::TRACK0_N) {
        if steps > MCZ_TRACKS {
            bail!("Track 0 not found after {} steps", steps);
        }
        step(machine, ports, false);
        steps += 1;
    }
    for _ in 0..cylinder {
        step(machine, ports, true);
    }
    Ok(())
}

/// Enable read and return the next address mark seen.
fn next_address_mark(machine: &mut MdcMachine, ports: &Ports) -> Result<u8, Error> {
    machine.io_write(ports.control, ControlBits::READ_ENABLE.bits());
    machine
        .run_until_resumed(STALL_BUDGET)
        .context("No address mark found")?;
    Ok(machine.read_port_blocking(ports.data, STALL_BUDGET)?)
}

pub(crate) fn run(global: &GlobalOptions, params: &args::DumpParams) -> Result<(), Error> {
    let row_size = params.row_size.unwrap_or(16) as usize;
    let drive = params.drive.unwrap_or(0);

    check_extension(&params.in_file);
    let cursor = read_file(&params.in_file)?;
    let image = MczFormat::load_image(cursor).context("Error loading disk image")?;

    let config = MdcConfig::default();
    let ports = Ports::new(&config);
    // Once locked, each byte arrives one byte period after the previous one.
    let byte_budget = config.byte_period() * 2;
    let mut machine = MdcMachine::new(config)?;
    machine.insert_image(drive as usize, &image)?;

    machine.io_write(ports.select, SelectBits::SELECT.bits() | drive);
    if !read_status(&mut machine, &ports)?.contains(StatusBits::READY) {
        bail!("Drive {} is not ready", drive);
    }
    seek(&mut machine, &ports, params.cylinder)?;

    // Sectors pass under the head in order; give up after a full revolution.
    let mut record = Vec::with_capacity(MCZ_RECORD_SIZE);
    for _ in 0..=MCZ_SECTORS {
        let mark = next_address_mark(&mut machine, &ports)?;
        log::debug!("Address mark {:02X} @ {}", mark, machine.now());
        if mark & 0x7F == params.sector {
            record.push(mark);
            for _ in 1..MCZ_RECORD_SIZE {
                record.push(machine.read_port_blocking(ports.data, byte_budget)?);
            }
            break;
        }
        // Drop read and search again from here.
        machine.io_write(ports.control, 0);
    }
    machine.io_write(ports.control, 0);

    if record.is_empty() {
        bail!("Sector {} not found on cylinder {}", params.sector, params.cylinder);
    }

    let mut buf = BufWriter::new(std::io::stdout());
    if !global.silent {
        writeln!(
            buf,
            "Sector {} of cylinder {} read through drive {} @ {}:",
            params.sector,
            params.cylinder,
            drive,
            machine.now()
        )?;
        writeln!(
            buf,
            "Track byte: {}  back link: {:04X}  forward link: {:04X}",
            record[1],
            u16::from_le_bytes([record[130], record[131]]),
            u16::from_le_bytes([record[132], record[133]])
        )?;
        let stored = u16::from_be_bytes([record[134], record[135]]);
        let computed = crc_ccitt(&record[..134], None);
        writeln!(
            buf,
            "CRC: {:04X} (calculated {:04X}) {}",
            stored,
            computed,
            if stored == computed { "ok" } else { "bad" }
        )?;
        if machine.controller().overrun() {
            writeln!(buf, "Warning: data overrun during read")?;
        }
    }

    dump_slice(&record[2..130], 0, row_size, &mut buf)?;
    buf.flush()?;
    Ok(())
}
