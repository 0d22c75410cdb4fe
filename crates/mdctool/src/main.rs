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

    crates/mdctool/src/main.rs

    Command line front end: inspect MCZ images and read sectors through the
    emulated controller.
*/

pub mod args;
pub mod dump;
pub mod info;

use anyhow::Error;
use bpaf::Parser;
use std::{io::Cursor, path::Path};

use crate::args::Command;
use args::command_parser;

fn main() -> Result<(), Error> {
    env_logger::init();

    let app_params = command_parser().run();

    let command_result = match &app_params.command {
        Command::Version => {
            println!("mdctool v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Dump(params) => dump::run(&app_params.global, params),
        Command::Info(params) => info::run(&app_params.global, params),
    };

    match command_result {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("Command '{}' failed: {}", app_params.command, e);
            for cause in e.chain().skip(1) {
                eprintln!("Caused by: {}", cause);
            }
            std::process::exit(1);
        }
    }
}

pub(crate) fn read_file(path: &Path) -> Result<Cursor<Vec<u8>>, Error> {
    let buffer = std::fs::read(path)?;
    Ok(Cursor::new(buffer))
}

/// Warn about a file extension that does not belong to a supported image format. Detection
/// does not depend on it.
pub(crate) fn check_extension(path: &Path) {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if !mcz_mdc::file_parsers::is_supported_ext(ext) {
            log::warn!(
                "Unexpected file extension '{}', expected one of: {}",
                ext,
                mcz_mdc::supported_extensions().join(", ")
            );
        }
    }
}
