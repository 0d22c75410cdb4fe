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
use bpaf::*;
use std::{
    fmt::{self, Display, Formatter},
    path::PathBuf,
};

use crate::{
    dump::args::{dump_parser, DumpParams},
    info::args::{info_parser, InfoParams},
};

#[derive(Clone, Debug)]
pub enum Command {
    Version,
    Dump(DumpParams),
    Info(InfoParams),
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Command::Version => write!(f, "version"),
            Command::Dump(_) => write!(f, "dump"),
            Command::Info(_) => write!(f, "info"),
        }
    }
}

#[derive(Debug)]
pub struct AppParams {
    pub global: GlobalOptions,
    pub command: Command,
}

#[derive(Debug)]
pub struct GlobalOptions {
    pub silent: bool,
}

pub fn global_options_parser() -> impl Parser<GlobalOptions> {
    let silent = long("silent")
        .help("Suppress all output except required output")
        .switch();

    construct!(GlobalOptions { silent })
}

pub(crate) fn in_file_parser() -> impl Parser<PathBuf> {
    long("in_file")
        .short('i')
        .argument::<PathBuf>("IN_FILE")
        .help("Path to input file")
}

pub(crate) fn command_parser() -> impl Parser<AppParams> {
    let global = global_options_parser();

    let version = pure(Command::Version)
        .to_options()
        .command("version")
        .help("Display version information and exit");

    let dump = construct!(Command::Dump(dump_parser()))
        .to_options()
        .command("dump")
        .help("Read a sector through the emulated controller and dump it");
    let info = construct!(Command::Info(info_parser()))
        .to_options()
        .command("info")
        .help("Display information about an MCZ image");

    let command = construct!([version, dump, info]);

    construct!(AppParams { global, command })
}

pub(crate) fn cylinder_parser() -> impl Parser<u8> {
    long("cylinder")
        .short('c')
        .argument::<u8>("CYLINDER")
        .help("Specify the cylinder number")
        .guard(|&c| (c as usize) < mcz_mdc::file_parsers::mcz::MCZ_TRACKS, "Cylinder must be between 0 and 76")
}
