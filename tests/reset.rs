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

    tests/reset.rs

    Controller reset from every read state.
*/
mod common;

use common::*;
use mcz_mdc::{ControllerMode, MdcMachine, SyncState, VirtualTime};

fn assert_reset_state(machine: &MdcMachine) {
    let ctrl = machine.controller();
    assert_eq!(ctrl.mode(), ControllerMode::Idle);
    assert_eq!(ctrl.sync_state(), SyncState::SearchingSync);
    assert_eq!(ctrl.sync_count(), 0);
    assert_eq!(ctrl.crc(), 0);
    assert_eq!(ctrl.selected_drive(), None);
    assert!(!ctrl.overrun());
    assert!(!machine.cpu_blocked());
}

#[test]
fn test_reset_while_searching_sync() {
    init();
    let mut machine = machine_with_image();
    machine.io_write(SELECT_PORT, 0x08);
    // Sector 1's preamble starts at 4.896ms.
    machine.run_until(VirtualTime::from_us(4_900));
    machine.io_write(CONTROL_PORT, 0x04);
    machine.run_for(VirtualTime::from_us(40));
    assert!(machine.controller().sync_count() > 0);

    machine.reset();
    assert_reset_state(&machine);
}

#[test]
fn test_reset_while_locked_with_crc_and_overrun() {
    init();
    let mut machine = machine_with_image();
    read_address_mark(&mut machine, 0, VirtualTime::from_ms(2));
    machine.io_write(CONTROL_PORT, 0x14);
    machine.run_for(VirtualTime::from_us(200));
    assert!(machine.controller().overrun());
    assert_ne!(machine.controller().crc(), 0);

    machine.reset();
    assert_reset_state(&machine);

    // No timer survives the reset: nothing moves while time passes.
    machine.run_for(VirtualTime::from_ms(10));
    assert_reset_state(&machine);
}

#[test]
fn test_reset_is_idempotent() {
    init();
    let mut machine = machine_with_image();
    machine.reset();
    machine.reset();
    assert_reset_state(&machine);

    // The machine is usable after reset.
    let mark = read_address_mark(&mut machine, 0, VirtualTime::from_ms(2));
    assert_eq!(mark & 0x7F, 1);
}
