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

    src/bitstream/fm.rs

    FM (single density) encoder. Every data bit occupies one bit cell made of
    a clock half-cell, which always holds a transition, followed by a data
    half-cell which holds a transition only for a 1. Bytes are sent MSB first.
*/
use bit_vec::BitVec;

/// Number of half-cells in one FM encoded byte.
pub const FM_BYTE_LEN: usize = 16;

/// Encode `data` as FM half-cells, appending them to `bits`.
pub fn fm_encode(data: &[u8], bits: &mut BitVec) {
    bits.reserve(data.len() * FM_BYTE_LEN);
    for &byte in data {
        for i in (0..8).rev() {
            // Clock
            bits.push(true);
            bits.push(byte & (1 << i) != 0);
        }
    }
}

/// Encode `count` copies of `byte`, appending them to `bits`.
pub fn fm_encode_fill(byte: u8, count: usize, bits: &mut BitVec) {
    for _ in 0..count {
        fm_encode(&[byte], bits);
    }
}
