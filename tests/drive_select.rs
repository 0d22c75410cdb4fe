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

    tests/drive_select.rs

    Drive selection, head positioning and status bits through the PIO ports.
*/
mod common;

use common::*;
use mcz_mdc::{FluxDrive, SelectBits, StatusBits, VirtualTime};

fn status(machine: &mut mcz_mdc::MdcMachine) -> StatusBits {
    StatusBits::from_bits_truncate(machine.read_port_blocking(CONTROL_PORT, VirtualTime::from_ms(1)).unwrap())
}

fn select(machine: &mut mcz_mdc::MdcMachine) -> SelectBits {
    SelectBits::from_bits_truncate(machine.read_port_blocking(SELECT_PORT, VirtualTime::from_ms(1)).unwrap())
}

#[test]
fn test_select_not_ready_drive() {
    init();
    let mut machine = machine_with_image();
    machine.insert_drive(4, Box::new(FluxDrive::empty())).unwrap();

    // Empty slot.
    machine.io_write(SELECT_PORT, 0x08 | 6);
    assert_eq!(machine.controller().selected_drive(), None);
    assert!(!status(&mut machine).contains(StatusBits::READY));

    // Drive with no medium.
    machine.io_write(SELECT_PORT, 0x08 | 4);
    assert_eq!(machine.controller().selected_drive(), None);
    assert!(!status(&mut machine).contains(StatusBits::READY));
    let sel = select(&mut machine);
    assert!(!sel.contains(SelectBits::SELECT));
    assert!(sel.contains(SelectBits::DRIVE_PRESENT_N));

    // Selecting a ready drive after a failed select works, and a failed select drops it again.
    machine.io_write(SELECT_PORT, 0x08);
    assert_eq!(machine.controller().selected_drive(), Some(0));
    machine.io_write(SELECT_PORT, 0x08 | 4);
    assert_eq!(machine.controller().selected_drive(), None);
}

#[test]
fn test_select_ready_drive_reports_track_and_index() {
    init();
    let mut machine = machine_with_image();
    machine.insert_image(5, &test_image()).unwrap();

    machine.io_write(SELECT_PORT, 0x08 | 5);
    assert_eq!(machine.controller().selected_drive(), Some(5));
    // Cylinder 0: TRACK0_N is active low.
    assert_eq!(status(&mut machine), StatusBits::READY);

    // Index pulse is asserted (low) for the first 2ms of each revolution.
    let sel = select(&mut machine);
    assert_eq!(sel.drive_index(), 5);
    assert!(sel.contains(SelectBits::SELECT));
    assert!(!sel.contains(SelectBits::SECTOR_PULSE_N));
    assert!(!sel.contains(SelectBits::DRIVE_PRESENT_N));
    assert!(!sel.contains(SelectBits::WRITE_PROTECT_N));

    machine.run_until(VirtualTime::from_ms(3));
    assert!(select(&mut machine).contains(SelectBits::SECTOR_PULSE_N));

    // Step in twice.
    for _ in 0..2 {
        machine.io_write(CONTROL_PORT, 0x03);
        machine.io_write(CONTROL_PORT, 0x01);
    }
    assert_eq!(machine.controller().drive(5).map(|d| d.cylinder()), Some(2));
    assert_eq!(status(&mut machine), StatusBits::READY | StatusBits::TRACK0_N);

    // Reselecting keeps the cylinder.
    machine.io_write(SELECT_PORT, 0x00);
    assert_eq!(status(&mut machine), StatusBits::empty());
    machine.io_write(SELECT_PORT, 0x08 | 5);
    assert_eq!(status(&mut machine), StatusBits::READY | StatusBits::TRACK0_N);
}

#[test]
fn test_select_while_stepping_does_not_move_head() {
    init();
    let mut machine = machine_with_image();
    machine.io_write(SELECT_PORT, 0x08);

    // Leave the step line asserted, then select the same drive again.
    machine.io_write(CONTROL_PORT, 0x03);
    machine.io_write(SELECT_PORT, 0x08);
    assert_eq!(machine.controller().drive(0).map(|d| d.cylinder()), Some(0));
    assert_eq!(status(&mut machine), StatusBits::READY);

    machine.io_write(CONTROL_PORT, 0x01);
    assert_eq!(machine.controller().drive(0).map(|d| d.cylinder()), Some(0));

    // A full pulse after the select still steps.
    machine.io_write(CONTROL_PORT, 0x03);
    machine.io_write(CONTROL_PORT, 0x01);
    assert_eq!(machine.controller().drive(0).map(|d| d.cylinder()), Some(1));
}

#[test]
fn test_seek_to_track0_by_status() {
    init();
    let mut machine = machine_with_image();
    machine.io_write(SELECT_PORT, 0x08);
    for _ in 0..5 {
        machine.io_write(CONTROL_PORT, 0x03);
        machine.io_write(CONTROL_PORT, 0x01);
    }

    // Step out until the active-low track 0 bit clears.
    let mut steps = 0;
    while status(&mut machine).contains(StatusBits::TRACK0_N) {
        machine.io_write(CONTROL_PORT, 0x02);
        machine.io_write(CONTROL_PORT, 0x00);
        steps += 1;
        assert!(steps <= 77);
    }
    assert_eq!(steps, 5);
    assert_eq!(machine.controller().drive(0).map(|d| d.cylinder()), Some(0));
}

#[test]
fn test_read_from_stepped_cylinder() {
    init();
    let mut machine = machine_with_image();
    machine.io_write(SELECT_PORT, 0x08);
    for _ in 0..3 {
        machine.io_write(CONTROL_PORT, 0x03);
        machine.io_write(CONTROL_PORT, 0x01);
    }

    let mark = read_address_mark(&mut machine, 0, VirtualTime::from_ms(2));
    assert_eq!(mark, 0x81);
    let bytes = read_bytes(&mut machine, 1);
    assert_eq!(bytes[0], 3, "track byte");
}
