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

    src/machine.rs

    A minimal host harness around the controller: the timer queue, the CPU
    wait gate and the port map. It stands in for the system bus and CPU so
    that the controller can be driven the way firmware drives it.
*/
use crate::{
    config::MdcConfig,
    controller::MdcController,
    drive::{FluxDrive, MediumSource},
    file_parsers::mcz::MczImage,
    host::{BusRead, IoMap, WaitGate},
    timing::{Scheduler, TimerQueue, VirtualTime},
    MdcError,
};

pub struct MdcMachine {
    queue: TimerQueue,
    gate: WaitGate,
    io_map: IoMap,
    controller: MdcController,
}

impl MdcMachine {
    /// Build a machine and register the controller's ports. Fails if the configuration is out
    /// of range or the configured ports overlap.
    pub fn new(config: MdcConfig) -> Result<Self, MdcError> {
        config.validate()?;
        let controller = MdcController::new(config);
        let mut io_map = IoMap::new();
        controller.install(&mut io_map)?;

        let mut machine = MdcMachine {
            queue: TimerQueue::new(),
            gate: WaitGate::new(),
            io_map,
            controller,
        };
        machine.reset();
        Ok(machine)
    }

    /// Reset the controller and release the CPU. Virtual time keeps running.
    pub fn reset(&mut self) {
        self.gate.clear();
        self.controller.reset(&mut self.queue);
    }

    pub fn insert_image(&mut self, drive: usize, image: &MczImage) -> Result<(), MdcError> {
        let flux_drive = FluxDrive::new(image, self.controller.config());
        self.insert_drive(drive, Box::new(flux_drive))
    }

    pub fn insert_drive(&mut self, drive: usize, medium: Box<dyn MediumSource>) -> Result<(), MdcError> {
        self.controller.insert_drive(drive, medium)
    }

    pub fn now(&self) -> VirtualTime {
        self.queue.now()
    }

    pub fn controller(&self) -> &MdcController {
        &self.controller
    }

    pub fn cpu_blocked(&self) -> bool {
        self.gate.is_blocked()
    }

    pub fn gate(&self) -> &WaitGate {
        &self.gate
    }

    /// Perform a CPU port read. A stalled CPU cannot issue accesses, so this returns
    /// [BusRead::Wait] until the gate opens.
    pub fn io_read(&mut self, port: u8) -> BusRead {
        if self.gate.is_blocked() {
            return BusRead::Wait;
        }
        let value = match self.io_map.decode(port) {
            Some(reg) => self.controller.io_read(reg, self.queue.now(), &mut self.gate),
            None => 0xFF,
        };
        if self.gate.is_blocked() {
            BusRead::Wait
        }
        else {
            BusRead::Data(value)
        }
    }

    /// Perform a CPU port write. The write always takes effect; check [MdcMachine::cpu_blocked]
    /// afterwards to see whether it stalled the CPU.
    pub fn io_write(&mut self, port: u8, value: u8) {
        if let Some(reg) = self.io_map.decode(port) {
            self.controller.io_write(reg, value, &mut self.queue, &mut self.gate);
        }
    }

    /// Deliver every timer due up to and including `deadline`, then move time to `deadline`.
    pub fn run_until(&mut self, deadline: VirtualTime) {
        while let Some(timer) = self.queue.pop_due(deadline) {
            self.controller.on_timer(timer, &mut self.queue, &mut self.gate);
        }
        self.queue.advance_to(deadline);
    }

    pub fn run_for(&mut self, duration: VirtualTime) {
        self.run_until(self.queue.now() + duration);
    }

    /// Deliver timers until the CPU is released. Time stops at the event that released it.
    /// Fails if the CPU is still stalled after `budget`.
    pub fn run_until_resumed(&mut self, budget: VirtualTime) -> Result<(), MdcError> {
        let deadline = self.queue.now() + budget;
        while self.gate.is_blocked() {
            match self.queue.pop_due(deadline) {
                Some(timer) => self.controller.on_timer(timer, &mut self.queue, &mut self.gate),
                None => {
                    self.queue.advance_to(deadline);
                    log::trace!("MdcMachine::run_until_resumed(): {} resumes so far", self.gate.resumes());
                    log::error!("MdcMachine::run_until_resumed(): CPU still stalled after {}", budget);
                    return Err(MdcError::HostStalled(budget));
                }
            }
        }
        Ok(())
    }

    /// Read a port the way a CPU does: if the access stalls, wait for the gate to open and
    /// retry.
    pub fn read_port_blocking(&mut self, port: u8, budget: VirtualTime) -> Result<u8, MdcError> {
        loop {
            match self.io_read(port) {
                BusRead::Data(value) => return Ok(value),
                BusRead::Wait => self.run_until_resumed(budget)?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_overlap_is_fatal() {
        let config = MdcConfig {
            data_port: 0xD2,
            ..MdcConfig::default()
        };
        assert!(matches!(MdcMachine::new(config), Err(MdcError::PortConflict(0xD2))));
    }

    #[test]
    fn test_bad_config_is_an_error() {
        let config = MdcConfig {
            bit_frequency: 0,
            ..MdcConfig::default()
        };
        assert!(matches!(MdcMachine::new(config), Err(MdcError::InvalidConfig(_))));

        let config = MdcConfig {
            bit_frequency: u32::MAX,
            ..MdcConfig::default()
        };
        assert!(matches!(MdcMachine::new(config), Err(MdcError::InvalidConfig(_))));
    }

    #[test]
    fn test_unmapped_and_secondary_ports() {
        let mut machine = MdcMachine::new(MdcConfig::default()).unwrap();
        assert_eq!(machine.io_read(0x10), BusRead::Data(0xFF));
        machine.io_write(0xD2, 0x55);
        assert_eq!(machine.io_read(0xD2), BusRead::Data(0x00));
        assert_eq!(machine.io_read(0xD3), BusRead::Data(0x00));
    }

    #[test]
    fn test_stall_without_medium_times_out() {
        let mut machine = MdcMachine::new(MdcConfig::default()).unwrap();
        let bits = bit_vec::BitVec::from_elem(1024, false);
        let blank = crate::flux::FluxTimeline::from_bitcells(&bits, VirtualTime::from_us(2));
        machine
            .insert_drive(0, Box::new(FluxDrive::from_tracks(vec![blank], VirtualTime::from_us(4))))
            .unwrap();

        machine.io_write(0xD1, 0x08);
        machine.io_write(0xD0, 0x04);
        assert!(machine.cpu_blocked());
        assert_eq!(machine.io_read(0xCF), BusRead::Wait);

        let budget = VirtualTime::from_ms(5);
        assert!(matches!(machine.run_until_resumed(budget), Err(MdcError::HostStalled(_))));
        assert_eq!(machine.now(), budget);
        assert!(machine.cpu_blocked());

        machine.reset();
        assert!(!machine.cpu_blocked());
    }
}
