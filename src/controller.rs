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

    src/controller.rs

    The MDC controller: register decode, drive selection, and the timer
    callbacks that run the PLL, synchronizer and byte assembler.
*/
use crate::{
    config::MdcConfig,
    drive::MediumSource,
    flux::Pll,
    framing::{ByteAssembler, SyncEvent, SyncState, Synchronizer},
    host::{HostBus, IoMap, MdcPort, TriggerId},
    timing::{Scheduler, TimerId, VirtualTime},
    types::{ControlBits, ControllerMode, SelectBits, StatusBits},
    MdcError,
    MAX_DRIVES,
};
use strum::IntoEnumIterator;

/// Fired when a byte is available in the data register. A CPU stalled on the data register or on
/// read-enable waits for this trigger.
pub const TRIGGER_BYTE_READY: TriggerId = 1;

pub struct MdcController {
    config: MdcConfig,
    drives: [Option<Box<dyn MediumSource>>; MAX_DRIVES],
    selected: Option<usize>,
    mode: ControllerMode,
    control: ControlBits,
    pll: Pll,
    sync: Synchronizer,
    asm: ByteAssembler,
    /// Time of the previous bit lock, for diagnostics.
    last_sync_time: Option<VirtualTime>,
}

impl MdcController {
    pub fn new(config: MdcConfig) -> Self {
        let pll = Pll::new(config.half_bit_period());
        let sync = Synchronizer::new(config.sync_threshold);
        MdcController {
            config,
            drives: std::array::from_fn(|_| None),
            selected: None,
            mode: ControllerMode::Idle,
            control: ControlBits::empty(),
            pll,
            sync,
            asm: ByteAssembler::default(),
            last_sync_time: None,
        }
    }

    /// Claim the data port and the four PIO ports. Nothing is claimed unless both ranges are
    /// free and disjoint.
    pub fn install(&self, map: &mut IoMap) -> Result<(), MdcError> {
        let data = self.config.data_port;
        let base = self.config.pio_base;
        let pio = base..=base.saturating_add(3);

        let conflict = map
            .conflict(data..=data)
            .or_else(|| pio.contains(&data).then_some(data))
            .or_else(|| map.conflict(pio.clone()));
        if let Some(port) = conflict {
            log::error!("MdcController::install(): port {:#04X} is already claimed", port);
            return Err(MdcError::PortConflict(port));
        }

        map.install(data..=data, |_| MdcPort::Data)?;
        map.install(pio, move |port| match port - base {
            0 => MdcPort::ControlStatus,
            1 => MdcPort::DriveSelect,
            n => MdcPort::Secondary(n),
        })
    }

    /// Return to the power-on state. Inserted drives stay inserted.
    pub fn reset(&mut self, sched: &mut dyn Scheduler) {
        for timer in TimerId::iter() {
            sched.reset(timer);
        }
        self.selected = None;
        self.mode = ControllerMode::Idle;
        self.control = ControlBits::empty();
        self.pll.set_clock(self.config.half_bit_period());
        self.sync.restart();
        self.asm.reset();
        self.last_sync_time = None;
        log::debug!("MdcController::reset(): Controller reset @ {}", sched.now());
    }

    pub fn insert_drive(&mut self, index: usize, drive: Box<dyn MediumSource>) -> Result<(), MdcError> {
        let slot = self.drives.get_mut(index).ok_or(MdcError::InvalidDrive(index))?;
        *slot = Some(drive);
        Ok(())
    }

    pub fn drive(&self, index: usize) -> Option<&dyn MediumSource> {
        self.drives.get(index)?.as_deref()
    }

    fn selected_medium(&self) -> Option<&dyn MediumSource> {
        self.drive(self.selected?)
    }

    pub fn io_read(&mut self, port: MdcPort, now: VirtualTime, host: &mut dyn HostBus) -> u8 {
        match port {
            MdcPort::Data => self.read_data(host),
            MdcPort::ControlStatus => self.read_status().bits(),
            MdcPort::DriveSelect => self.read_select(now).bits(),
            MdcPort::Secondary(_) => 0,
        }
    }

    pub fn io_write(&mut self, port: MdcPort, value: u8, sched: &mut dyn Scheduler, host: &mut dyn HostBus) {
        match port {
            MdcPort::Data => {
                log::trace!("MdcController::io_write(): Ignoring data register write: {:02X}", value);
            }
            MdcPort::ControlStatus => self.write_control(ControlBits::from_bits_truncate(value), sched, host),
            MdcPort::DriveSelect => self.write_select(value),
            MdcPort::Secondary(_) => {}
        }
    }

    /// Read the data register. If the current byte was already taken and a read is in progress,
    /// the CPU is stalled until the next byte is assembled and the stale value is returned; the
    /// CPU is expected to retry the access once resumed.
    pub fn read_data(&mut self, host: &mut dyn HostBus) -> u8 {
        if let Some(byte) = self.asm.take() {
            log::trace!("MdcController::read_data(): {:02X}", byte);
            return byte;
        }
        if self.mode == ControllerMode::Reading {
            log::trace!("MdcController::read_data(): Byte already taken, stalling CPU");
            host.suspend_until_trigger(TRIGGER_BYTE_READY);
        }
        self.asm.data()
    }

    pub fn read_status(&self) -> StatusBits {
        let mut status = StatusBits::empty();
        if let Some(drive) = self.selected_medium() {
            status.set(StatusBits::READY, drive.ready());
            status.set(StatusBits::TRACK0_N, drive.cylinder() != 0);
        }
        // CRC_ERROR is never raised; the comparison against the trailer is not performed.
        status
    }

    pub fn read_select(&self, now: VirtualTime) -> SelectBits {
        let mut bits = SelectBits::SECTOR_PULSE_N | SelectBits::DRIVE_PRESENT_N | SelectBits::WRITE_PROTECT_N;
        if let (Some(index), Some(drive)) = (self.selected, self.selected_medium()) {
            bits |= SelectBits::SELECT | SelectBits::from_bits_truncate(index as u8);
            bits.remove(SelectBits::DRIVE_PRESENT_N);
            bits.set(SelectBits::SECTOR_PULSE_N, !drive.index_pulse(now));
            bits.set(SelectBits::WRITE_PROTECT_N, !drive.write_protected());
        }
        bits
    }

    pub fn write_select(&mut self, value: u8) {
        let bits = SelectBits::from_bits_truncate(value);
        if !bits.contains(SelectBits::SELECT) {
            if let Some(index) = self.selected.take() {
                log::debug!("MdcController::write_select(): Deselected drive {}", index);
            }
            return;
        }

        let index = bits.drive_index();
        match self.drives[index].as_deref_mut() {
            Some(drive) if drive.ready() => {
                drive.idle_lines();
                self.selected = Some(index);
                log::debug!(
                    "MdcController::write_select(): Selected drive {} (cylinder {})",
                    index,
                    drive.cylinder()
                );
            }
            _ => {
                log::debug!("MdcController::write_select(): Drive {} not ready", index);
                self.selected = None;
            }
        }
    }

    pub fn write_control(&mut self, bits: ControlBits, sched: &mut dyn Scheduler, host: &mut dyn HostBus) {
        let index = match self.selected {
            Some(index) => index,
            None => {
                log::warn!(
                    "MdcController::write_control(): No drive selected, ignoring {:02X}",
                    bits.bits()
                );
                return;
            }
        };

        if let Some(drive) = self.drives[index].as_deref_mut() {
            drive.set_direction(bits.contains(ControlBits::DIRECTION));
            drive.set_step(bits.contains(ControlBits::STEP));
        }

        let crc_on = bits.contains(ControlBits::CRC_ENABLE);
        if self.asm.crc_mut().set_enabled(crc_on) {
            sched.arm(TimerId::Timeout, self.config.timeout);
        }
        else if !crc_on && self.control.contains(ControlBits::CRC_ENABLE) {
            sched.reset(TimerId::Timeout);
        }
        self.control = bits;

        self.set_read_write(
            bits.contains(ControlBits::READ_ENABLE),
            bits.contains(ControlBits::WRITE_ENABLE),
            sched,
            host,
        );
    }

    fn set_read_write(&mut self, read: bool, write: bool, sched: &mut dyn Scheduler, host: &mut dyn HostBus) {
        let reading = self.mode == ControllerMode::Reading;

        if !reading && read {
            let now = sched.now();
            let half_period = self.config.half_bit_period();
            self.pll.set_clock(half_period);
            self.pll.read_reset(now);

            sched.reset(TimerId::Byte);
            sched.reset(TimerId::Aux);
            self.sync.restart();
            self.asm.restart();
            sched.arm(TimerId::HalfBit, half_period);

            log::debug!("MdcController::set_read_write(): Start read @ {}", now);
            // The CPU waits for the address mark.
            host.suspend_until_trigger(TRIGGER_BYTE_READY);
        }
        else if reading && !read {
            sched.reset(TimerId::HalfBit);
            sched.reset(TimerId::Byte);
            sched.reset(TimerId::Aux);
            self.sync.restart();
            self.asm.restart();
            log::debug!("MdcController::set_read_write(): Stop read @ {}", sched.now());
        }

        self.mode = if read {
            if write {
                log::warn!("MdcController::set_read_write(): Write enable ignored while reading");
            }
            ControllerMode::Reading
        }
        else if write {
            if self.mode != ControllerMode::Writing {
                log::warn!("MdcController::set_read_write(): Write requested, write path is not emulated");
            }
            ControllerMode::Writing
        }
        else {
            ControllerMode::Idle
        };
    }

    /// Dispatch an expired timer.
    pub fn on_timer(&mut self, timer: TimerId, sched: &mut dyn Scheduler, host: &mut dyn HostBus) {
        match timer {
            TimerId::Timeout => log::trace!("MdcController::on_timer(): Timeout @ {}", sched.now()),
            TimerId::HalfBit => self.half_bit_tick(sched, host),
            TimerId::Byte => self.byte_tick(sched, host),
            TimerId::Aux => {}
        }
    }

    fn half_bit_tick(&mut self, sched: &mut dyn Scheduler, host: &mut dyn HostBus) {
        if self.mode != ControllerMode::Reading {
            return;
        }
        let now = sched.now();
        self.pll.set_ctime(now);

        let medium = self.selected.and_then(|i| self.drives[i].as_deref());
        match self.sync.tick(&mut self.pll, medium, &mut self.asm) {
            SyncEvent::None => {}
            SyncEvent::BitLock => {
                match self.last_sync_time {
                    Some(last) => log::debug!(
                        "MdcController::half_bit_tick(): Bit lock @ {}, {} since last lock",
                        now,
                        crate::format_ms!(now.saturating_sub(last).as_secs_f64())
                    ),
                    None => log::debug!("MdcController::half_bit_tick(): Bit lock @ {}", now),
                }
                self.last_sync_time = Some(now);
            }
            SyncEvent::AddressMark(mark) => {
                let adjust = self.pll.ctime().saturating_sub(now);
                log::debug!(
                    "MdcController::half_bit_tick(): Address mark @ {}, adj={}, D={:02X}/C={:02X}, cylinder {} sector {}",
                    now,
                    adjust,
                    mark,
                    self.asm.clock(),
                    self.selected_medium().map_or(0, |d| d.cylinder()),
                    mark & 0x7F
                );
                sched.reset(TimerId::HalfBit);
                sched.arm(TimerId::Byte, adjust);
                host.trigger(TRIGGER_BYTE_READY);
                return;
            }
        }

        sched.arm(TimerId::HalfBit, self.pll.ctime().saturating_sub(now));
    }

    fn byte_tick(&mut self, sched: &mut dyn Scheduler, host: &mut dyn HostBus) {
        if self.mode != ControllerMode::Reading || self.sync.state() != SyncState::Locked {
            return;
        }
        let now = sched.now();
        self.pll.set_ctime(now);

        let was_overrun = self.asm.overrun();
        let medium = self.selected.and_then(|i| self.drives[i].as_deref());
        if self.asm.assemble_byte(&mut self.pll, medium) {
            if was_overrun {
                log::trace!("MdcController::byte_tick(): Data overrun @ {}", now);
            }
            else {
                log::warn!("MdcController::byte_tick(): Data overrun @ {}", now);
            }
        }

        host.trigger(TRIGGER_BYTE_READY);
        sched.arm(TimerId::Byte, self.pll.ctime().saturating_sub(now));
    }

    pub fn config(&self) -> &MdcConfig {
        &self.config
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    pub fn control(&self) -> ControlBits {
        self.control
    }

    pub fn selected_drive(&self) -> Option<usize> {
        self.selected
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    pub fn sync_count(&self) -> u8 {
        self.sync.sync_count()
    }

    pub fn crc(&self) -> u16 {
        self.asm.crc().value()
    }

    pub fn overrun(&self) -> bool {
        self.asm.overrun()
    }

    pub fn data_register(&self) -> u8 {
        self.asm.data()
    }

    pub fn last_sync_time(&self) -> Option<VirtualTime> {
        self.last_sync_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{drive::FluxDrive, host::WaitGate, timing::TimerQueue};

    fn controller_with_drive() -> (MdcController, TimerQueue, WaitGate) {
        let mut ctrl = MdcController::new(MdcConfig::default());
        let bits = bit_vec::BitVec::from_bytes(&[0xAA; 64]);
        let timeline = crate::flux::FluxTimeline::from_bitcells(&bits, VirtualTime::from_us(2));
        ctrl.insert_drive(2, Box::new(FluxDrive::from_tracks(vec![timeline; 3], VirtualTime::from_us(8))))
            .unwrap();
        (ctrl, TimerQueue::new(), WaitGate::new())
    }

    #[test]
    fn test_install_claims_ports() {
        let ctrl = MdcController::new(MdcConfig::default());
        let mut map = IoMap::new();
        ctrl.install(&mut map).unwrap();
        assert_eq!(map.decode(0xCF), Some(MdcPort::Data));
        assert_eq!(map.decode(0xD0), Some(MdcPort::ControlStatus));
        assert_eq!(map.decode(0xD1), Some(MdcPort::DriveSelect));
        assert_eq!(map.decode(0xD3), Some(MdcPort::Secondary(3)));
        assert_eq!(map.decode(0xD4), None);
        assert!(matches!(ctrl.install(&mut map), Err(MdcError::PortConflict(0xCF))));
    }

    #[test]
    fn test_select_and_status() {
        let (mut ctrl, _queue, _gate) = controller_with_drive();

        ctrl.write_select(0x08 | 1);
        assert_eq!(ctrl.selected_drive(), None);
        assert!(!ctrl.read_status().contains(StatusBits::READY));

        ctrl.write_select(0x08 | 2);
        assert_eq!(ctrl.selected_drive(), Some(2));
        assert_eq!(ctrl.read_status(), StatusBits::READY);

        let sel = ctrl.read_select(VirtualTime::from_us(1));
        assert_eq!(sel.drive_index(), 2);
        assert!(sel.contains(SelectBits::SELECT));
        // Index pulse asserted, drive present, write protected: all active low.
        assert!(!sel.intersects(
            SelectBits::SECTOR_PULSE_N | SelectBits::DRIVE_PRESENT_N | SelectBits::WRITE_PROTECT_N
        ));
        assert!(ctrl.read_select(VirtualTime::from_us(100)).contains(SelectBits::SECTOR_PULSE_N));

        ctrl.write_select(0x00);
        assert_eq!(ctrl.selected_drive(), None);
        assert_eq!(ctrl.read_status(), StatusBits::empty());
    }

    #[test]
    fn test_step_through_control_register() {
        let (mut ctrl, mut queue, mut gate) = controller_with_drive();
        ctrl.write_select(0x08 | 2);

        for _ in 0..2 {
            ctrl.write_control(ControlBits::DIRECTION | ControlBits::STEP, &mut queue, &mut gate);
            ctrl.write_control(ControlBits::DIRECTION, &mut queue, &mut gate);
        }
        assert_eq!(ctrl.drive(2).map(|d| d.cylinder()), Some(2));
        assert_eq!(ctrl.read_status(), StatusBits::READY | StatusBits::TRACK0_N);

        ctrl.write_control(ControlBits::STEP, &mut queue, &mut gate);
        ctrl.write_control(ControlBits::empty(), &mut queue, &mut gate);
        assert_eq!(ctrl.drive(2).map(|d| d.cylinder()), Some(1));
    }

    #[test]
    fn test_install_conflict_claims_nothing() {
        let mut map = IoMap::new();
        map.install(0xD2..=0xD2, |_| MdcPort::Secondary(0)).unwrap();

        let ctrl = MdcController::new(MdcConfig::default());
        assert!(matches!(ctrl.install(&mut map), Err(MdcError::PortConflict(0xD2))));
        assert_eq!(map.decode(0xCF), None);
        assert_eq!(map.decode(0xD0), None);
    }

    #[test]
    fn test_reselect_with_step_asserted_keeps_cylinder() {
        let (mut ctrl, mut queue, mut gate) = controller_with_drive();
        ctrl.write_select(0x08 | 2);
        ctrl.write_control(ControlBits::DIRECTION | ControlBits::STEP, &mut queue, &mut gate);
        assert_eq!(ctrl.drive(2).map(|d| d.cylinder()), Some(0));

        ctrl.write_select(0x08 | 2);
        assert_eq!(ctrl.drive(2).map(|d| d.cylinder()), Some(0));
        assert_eq!(ctrl.read_status(), StatusBits::READY);

        // The step latch was cleared by the select, so this release is not a step.
        ctrl.write_control(ControlBits::empty(), &mut queue, &mut gate);
        assert_eq!(ctrl.drive(2).map(|d| d.cylinder()), Some(0));
    }

    #[test]
    fn test_read_enable_arms_lock_search_and_stalls() {
        let (mut ctrl, mut queue, mut gate) = controller_with_drive();
        ctrl.write_select(0x08 | 2);
        ctrl.write_control(ControlBits::READ_ENABLE, &mut queue, &mut gate);

        assert_eq!(ctrl.mode(), ControllerMode::Reading);
        assert_eq!(gate.waiting_on(), Some(TRIGGER_BYTE_READY));
        assert_eq!(queue.deadline(TimerId::HalfBit), Some(VirtualTime::from_us(2)));

        // Still reading: no new stall.
        gate.clear();
        ctrl.write_control(ControlBits::READ_ENABLE | ControlBits::CRC_ENABLE, &mut queue, &mut gate);
        assert!(!gate.is_blocked());
        assert!(queue.is_armed(TimerId::Timeout));

        ctrl.write_control(ControlBits::empty(), &mut queue, &mut gate);
        assert_eq!(ctrl.mode(), ControllerMode::Idle);
        assert!(!queue.is_armed(TimerId::HalfBit));
        assert!(!queue.is_armed(TimerId::Timeout));
        assert_eq!(ctrl.sync_state(), SyncState::SearchingSync);
    }

    #[test]
    fn test_control_without_drive_is_ignored() {
        let (mut ctrl, mut queue, mut gate) = controller_with_drive();
        ctrl.write_control(ControlBits::READ_ENABLE, &mut queue, &mut gate);
        assert_eq!(ctrl.mode(), ControllerMode::Idle);
        assert!(!gate.is_blocked());
        assert!(!queue.is_armed(TimerId::HalfBit));
    }

    #[test]
    fn test_write_enable_sets_mode_only() {
        let (mut ctrl, mut queue, mut gate) = controller_with_drive();
        ctrl.write_select(0x08 | 2);
        ctrl.write_control(ControlBits::WRITE_ENABLE, &mut queue, &mut gate);
        assert_eq!(ctrl.mode(), ControllerMode::Writing);
        assert!(!gate.is_blocked());
        assert!(!queue.is_armed(TimerId::HalfBit));
        assert!(!queue.is_armed(TimerId::Byte));
    }

    #[test]
    fn test_data_read_when_idle_does_not_stall() {
        let (mut ctrl, _queue, mut gate) = controller_with_drive();
        assert_eq!(ctrl.read_data(&mut gate), 0);
        assert!(!gate.is_blocked());
    }

    #[test]
    fn test_insert_invalid_drive() {
        let mut ctrl = MdcController::new(MdcConfig::default());
        assert!(matches!(
            ctrl.insert_drive(8, Box::new(FluxDrive::empty())),
            Err(MdcError::InvalidDrive(8))
        ));
    }
}
