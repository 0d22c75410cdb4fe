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

    src/host.rs

    The controller's view of the host: the CPU wait gate and the I/O port map.
*/
use crate::MdcError;
use std::ops::RangeInclusive;

pub type TriggerId = u32;

/// The CPU-side capability the controller is given. Suspension is cooperative: the CPU context
/// is marked as waiting on a trigger and does not run again until that trigger fires.
pub trait HostBus {
    fn suspend_until_trigger(&mut self, trigger: TriggerId);
    fn trigger(&mut self, trigger: TriggerId);
}

/// A single-slot wait gate for the CPU execution context. Triggers that nobody is waiting on
/// are dropped.
#[derive(Clone, Debug, Default)]
pub struct WaitGate {
    waiting_on: Option<TriggerId>,
    resumes: u64,
}

impl WaitGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blocked(&self) -> bool {
        self.waiting_on.is_some()
    }

    pub fn waiting_on(&self) -> Option<TriggerId> {
        self.waiting_on
    }

    /// Number of times the gate has been opened by a matching trigger.
    pub fn resumes(&self) -> u64 {
        self.resumes
    }

    /// Release the CPU unconditionally, as on a system reset.
    pub fn clear(&mut self) {
        self.waiting_on = None;
    }
}

impl HostBus for WaitGate {
    fn suspend_until_trigger(&mut self, trigger: TriggerId) {
        log::trace!("WaitGate::suspend_until_trigger(): waiting on {}", trigger);
        self.waiting_on = Some(trigger);
    }

    fn trigger(&mut self, trigger: TriggerId) {
        if self.waiting_on == Some(trigger) {
            log::trace!("WaitGate::trigger(): resuming on {}", trigger);
            self.waiting_on = None;
            self.resumes += 1;
        }
    }
}

/// The outcome of a CPU port read.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusRead {
    Data(u8),
    /// The access stalled the CPU. It must be retried once the wait gate opens.
    Wait,
}

/// The controller registers reachable through the port map.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MdcPort {
    Data,
    ControlStatus,
    DriveSelect,
    /// One of the two unused PIO ports, by offset from the PIO base.
    Secondary(u8),
}

/// Ownership of the 256 8-bit I/O ports.
#[derive(Clone, Debug)]
pub struct IoMap {
    ports: [Option<MdcPort>; 256],
}

impl Default for IoMap {
    fn default() -> Self {
        IoMap { ports: [None; 256] }
    }
}

impl IoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a range of ports. `decode` maps each port in the range to a register. Fails
    /// without claiming anything if any port in the range is already taken.
    pub fn install<F>(&mut self, range: RangeInclusive<u8>, decode: F) -> Result<(), MdcError>
    where
        F: Fn(u8) -> MdcPort,
    {
        if let Some(port) = self.conflict(range.clone()) {
            log::error!("IoMap::install(): port {:#04X} is already claimed", port);
            return Err(MdcError::PortConflict(port));
        }
        for port in range {
            self.ports[port as usize] = Some(decode(port));
        }
        Ok(())
    }

    /// The first port in `range` that is already claimed, if any.
    pub fn conflict(&self, mut range: RangeInclusive<u8>) -> Option<u8> {
        range.find(|&p| self.ports[p as usize].is_some())
    }

    pub fn decode(&self, port: u8) -> Option<MdcPort> {
        self.ports[port as usize]
    }
}
