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
use crate::{args::GlobalOptions, check_extension, read_file};
use anyhow::{bail, Error};
use mcz_mdc::{
    file_parsers::mcz::{MCZ_IMAGE_SIZE, MCZ_RECORD_SIZE},
    MczFormat,
};

pub mod args;

pub(crate) fn run(global: &GlobalOptions, params: &args::InfoParams) -> Result<(), Error> {
    check_extension(&params.in_file);
    let mut reader = read_file(&params.in_file)?;

    if !MczFormat::detect(&mut reader) {
        bail!(
            "{} is not an MCZ image (expected exactly {} bytes)",
            params.in_file.display(),
            MCZ_IMAGE_SIZE
        );
    }
    let image = MczFormat::load_image(&mut reader)?;

    if !global.silent {
        println!("Detected disk image type: MCZ");
    }
    println!("Disk image info:");
    println!("{}", "-".repeat(79));
    println!("Tracks:            {}", image.track_count());
    println!("Sectors per track: {}", image.sector_count());
    println!("Record size:       {} bytes", MCZ_RECORD_SIZE);
    println!("Writable:          {}", MczFormat::can_write(&image));
    println!();

    let cylinder = params.cylinder.unwrap_or(0) as usize;
    println!("Sector records of cylinder {}:", cylinder);
    println!("{}", "-".repeat(79));
    println!("idx  addr  sec  trk  back   fwd    crc    status");

    let mut bad = 0;
    for sector in 0..image.sector_count() {
        let record = image.sector_record(cylinder, sector)?;
        let crc_ok = record.crc_valid();
        if !crc_ok {
            bad += 1;
        }
        println!(
            "{:<4} {:02X}    {:<4} {:<4} {:04X}   {:04X}   {:04X}   {}",
            sector,
            record.address,
            record.sector_number(),
            record.track,
            record.back_link,
            record.forward_link,
            record.crc,
            if crc_ok { "ok" } else { "bad crc" }
        );
    }
    println!();
    println!("{} of {} records have a bad CRC", bad, image.sector_count());

    Ok(())
}
