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

    tests/common/mod.rs

    Common support routines for tests
*/
#![allow(dead_code)]

use bit_vec::BitVec;
use mcz_mdc::{
    file_parsers::mcz::{MCZ_IMAGE_SIZE, MCZ_RECORD_SIZE, MCZ_SECTORS},
    flux::FluxTimeline,
    util::crc_ccitt,
    BusRead,
    MczImage,
    MdcConfig,
    MdcMachine,
    VirtualTime,
};

use hex::encode;
use sha1::{Digest, Sha1};

pub const DATA_PORT: u8 = 0xCF;
pub const CONTROL_PORT: u8 = 0xD0;
pub const SELECT_PORT: u8 = 0xD1;

pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn compute_slice_hash(slice: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(slice);
    let result = hasher.finalize();

    encode(result)
}

/// Build a full size MCZ image. Every sector carries printable ASCII data and links that never
/// contain two zero bytes in a row, so the only long runs of zero bits on a track are the
/// preambles.
pub fn build_test_image() -> Vec<u8> {
    let mut data = vec![0u8; MCZ_IMAGE_SIZE];
    for (i, record) in data.chunks_mut(MCZ_RECORD_SIZE).enumerate() {
        let (track, sector) = (i / MCZ_SECTORS, i % MCZ_SECTORS);
        record[0] = 0x80 | sector as u8;
        record[1] = track as u8;
        for (j, b) in record[2..130].iter_mut().enumerate() {
            *b = b' ' + ((i * 7 + j) % 64) as u8;
        }
        record[130..132].copy_from_slice(&(0x1000 + i as u16).to_le_bytes());
        record[132..134].copy_from_slice(&(0x1001 + i as u16).to_le_bytes());
        let crc = crc_ccitt(&record[..134], None);
        record[134..136].copy_from_slice(&crc.to_be_bytes());
    }
    data
}

pub fn test_image() -> MczImage {
    MczImage::from_bytes(build_test_image()).unwrap()
}

/// A machine with the test image in drive 0.
pub fn machine_with_image() -> MdcMachine {
    let mut machine = MdcMachine::new(MdcConfig::default()).unwrap();
    machine.insert_image(0, &test_image()).unwrap();
    machine
}

/// Select `drive`, enable read at `start` and wait for the address mark. Returns the address
/// mark byte.
pub fn read_address_mark(machine: &mut MdcMachine, drive: u8, start: VirtualTime) -> u8 {
    machine.io_write(SELECT_PORT, 0x08 | drive);
    machine.run_until(start);
    machine.io_write(CONTROL_PORT, 0x04);
    assert!(machine.cpu_blocked());
    machine.run_until_resumed(VirtualTime::from_ms(20)).unwrap();
    match machine.io_read(DATA_PORT) {
        BusRead::Data(mark) => mark,
        BusRead::Wait => panic!("address mark not available after resume"),
    }
}

/// Read `count` bytes from the data port, stalling on each.
pub fn read_bytes(machine: &mut MdcMachine, count: usize) -> Vec<u8> {
    (0..count)
        .map(|_| machine.read_port_blocking(DATA_PORT, VirtualTime::from_ms(1)).unwrap())
        .collect()
}

/// Build a flux timeline from FM half-cells as a real drive would deliver it: every transition
/// is stretched by `speed_percent` (over 100 is a slow disk) and then displaced by a
/// deterministic pseudo-random amount within ±`jitter_ns`.
pub fn distorted_track(
    bits: &BitVec,
    half_period: VirtualTime,
    speed_percent: u64,
    jitter_ns: u64,
    seed: u64,
) -> FluxTimeline {
    let hp = half_period.as_ns();
    let mut state = seed.max(1);
    let mut transitions: Vec<u64> = bits
        .iter()
        .enumerate()
        .filter(|(_, bit)| *bit)
        .map(|(i, _)| {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let offset = state % (2 * jitter_ns + 1);
            let nominal = (i as u64 * hp + hp / 2) * speed_percent / 100;
            (nominal + offset).saturating_sub(jitter_ns)
        })
        .collect();
    transitions.sort_unstable();

    let revolution = VirtualTime::from_ns(hp * bits.len() as u64 * speed_percent / 100);
    FluxTimeline::from_transitions(transitions, revolution)
}
