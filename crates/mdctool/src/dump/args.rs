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
use crate::args::*;
use bpaf::{construct, long, Parser};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub(crate) struct DumpParams {
    pub(crate) in_file: PathBuf,
    pub(crate) cylinder: u8,
    pub(crate) sector: u8,
    pub(crate) drive: Option<u8>,
    pub(crate) row_size: Option<u8>,
}

fn sector_parser() -> impl Parser<u8> {
    long("sector")
        .short('s')
        .argument::<u8>("SECTOR")
        .help("Specify the sector number to read")
        .guard(|&s| s < 32, "Sector must be between 0 and 31")
}

fn drive_parser() -> impl Parser<u8> {
    long("drive")
        .short('d')
        .argument::<u8>("DRIVE")
        .help("Specify the drive slot to insert the image into")
        .guard(|&d| d < 8, "Drive must be between 0 and 7")
}

fn row_size_parser() -> impl Parser<u8> {
    long("row-size")
        .argument::<u8>("ROW_SIZE")
        .help("Specify the number of elements per row to be dumped")
        .guard(|&size| (8..=128).contains(&size), "Size must be between 8 and 128")
}

pub(crate) fn dump_parser() -> impl Parser<DumpParams> {
    let in_file = in_file_parser();
    let cylinder = cylinder_parser();
    let sector = sector_parser();
    let drive = drive_parser().optional();
    let row_size = row_size_parser().optional();

    construct!(DumpParams {
        in_file,
        cylinder,
        sector,
        drive,
        row_size
    })
}
