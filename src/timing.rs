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

    src/timing.rs

    Virtual time and the one-shot timers that drive the controller.
*/
use std::{
    fmt,
    fmt::{Display, Formatter},
    ops::{Add, Mul},
};

use strum::{EnumCount, IntoEnumIterator};

#[doc(hidden)]
#[macro_export]
macro_rules! format_us {
    ($value:expr) => {
        format!("{:.4}μs", $value * 1_000_000.0)
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! format_ms {
    ($value:expr) => {
        format!("{:.4}ms", $value * 1_000.0)
    };
}

/// A point in (or span of) emulated time, with nanosecond resolution.
/// Virtual time starts at zero when a machine is created and only moves when the scheduler
/// delivers a timer or the host explicitly advances it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(u64);

impl VirtualTime {
    pub const ZERO: VirtualTime = VirtualTime(0);

    pub const fn from_ns(ns: u64) -> Self {
        VirtualTime(ns)
    }

    pub const fn from_us(us: u64) -> Self {
        VirtualTime(us * 1_000)
    }

    pub const fn from_ms(ms: u64) -> Self {
        VirtualTime(ms * 1_000_000)
    }

    /// The period of one cycle at the given frequency, truncated to whole nanoseconds.
    pub fn from_hz(hz: u32) -> Self {
        assert!(hz > 0);
        VirtualTime(1_000_000_000 / hz as u64)
    }

    pub const fn as_ns(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1e9
    }

    pub fn saturating_sub(self, rhs: VirtualTime) -> VirtualTime {
        VirtualTime(self.0.saturating_sub(rhs.0))
    }
}

impl Add for VirtualTime {
    type Output = VirtualTime;

    fn add(self, rhs: VirtualTime) -> VirtualTime {
        VirtualTime(self.0 + rhs.0)
    }
}

impl Mul<u64> for VirtualTime {
    type Output = VirtualTime;

    fn mul(self, rhs: u64) -> VirtualTime {
        VirtualTime(self.0 * rhs)
    }
}

impl Display for VirtualTime {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", format_us!(self.as_secs_f64()))
    }
}

/// The controller's four one-shot timers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::EnumIter, strum::EnumCount, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimerId {
    /// Bounds how long CRC-enabled conditions may persist. Armed, never acted upon.
    Timeout,
    /// Lock search. Fires once per bit cell while hunting for sync and the address mark.
    HalfBit,
    /// Fires at each byte boundary once the address mark has been found.
    Byte,
    /// Write path byte strobe. Reset with the others, otherwise idle.
    Aux,
}

/// The scheduling capability the controller is given. Arming is always relative to the
/// scheduler's current time; arming an armed timer replaces its deadline.
pub trait Scheduler {
    fn now(&self) -> VirtualTime;
    fn arm(&mut self, timer: TimerId, delay: VirtualTime);
    fn reset(&mut self, timer: TimerId);
    fn is_armed(&self, timer: TimerId) -> bool;
}

/// A fixed set of one-shot timers delivered in strict deadline order. Timers with equal
/// deadlines fire in [TimerId] declaration order.
#[derive(Clone, Debug, Default)]
pub struct TimerQueue {
    now: VirtualTime,
    deadlines: [Option<VirtualTime>; TimerId::COUNT],
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deadline(&self, timer: TimerId) -> Option<VirtualTime> {
        self.deadlines[timer as usize]
    }

    /// Return the next timer due at or before `limit`, without firing it.
    pub fn next_due(&self, limit: VirtualTime) -> Option<(TimerId, VirtualTime)> {
        TimerId::iter()
            .filter_map(|timer| self.deadline(timer).map(|when| (timer, when)))
            .filter(|(_, when)| *when <= limit)
            .min_by_key(|(timer, when)| (*when, *timer as usize))
    }

    /// Disarm the next timer due at or before `limit` and move the current time up to its
    /// deadline. The caller is expected to dispatch the returned timer.
    pub fn pop_due(&mut self, limit: VirtualTime) -> Option<TimerId> {
        let (timer, when) = self.next_due(limit)?;
        self.deadlines[timer as usize] = None;
        self.advance_to(when);
        Some(timer)
    }

    /// Move the current time forward. Time never moves backwards.
    pub fn advance_to(&mut self, when: VirtualTime) {
        if when > self.now {
            self.now = when;
        }
    }

    pub fn reset_all(&mut self) {
        self.deadlines = [None; TimerId::COUNT];
    }
}

impl Scheduler for TimerQueue {
    fn now(&self) -> VirtualTime {
        self.now
    }

    fn arm(&mut self, timer: TimerId, delay: VirtualTime) {
        log::trace!("TimerQueue::arm(): {} in {}", timer, delay);
        self.deadlines[timer as usize] = Some(self.now + delay);
    }

    fn reset(&mut self, timer: TimerId) {
        self.deadlines[timer as usize] = None;
    }

    fn is_armed(&self, timer: TimerId) -> bool {
        self.deadlines[timer as usize].is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_bit_period() {
        assert_eq!(VirtualTime::from_hz(500_000), VirtualTime::from_us(2));
        assert_eq!(VirtualTime::from_us(2) * 16, VirtualTime::from_us(32));
    }

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let mut queue = TimerQueue::new();
        queue.arm(TimerId::Byte, VirtualTime::from_us(30));
        queue.arm(TimerId::HalfBit, VirtualTime::from_us(4));
        queue.arm(TimerId::Timeout, VirtualTime::from_ms(450));

        let limit = VirtualTime::from_ms(1);
        assert_eq!(queue.pop_due(limit), Some(TimerId::HalfBit));
        assert_eq!(queue.now(), VirtualTime::from_us(4));
        assert_eq!(queue.pop_due(limit), Some(TimerId::Byte));
        assert_eq!(queue.now(), VirtualTime::from_us(30));
        // Timeout is past the limit and stays armed.
        assert_eq!(queue.pop_due(limit), None);
        assert!(queue.is_armed(TimerId::Timeout));
    }

    #[test]
    fn test_equal_deadlines_fire_in_declaration_order() {
        let mut queue = TimerQueue::new();
        queue.arm(TimerId::Aux, VirtualTime::from_us(10));
        queue.arm(TimerId::HalfBit, VirtualTime::from_us(10));

        assert_eq!(queue.pop_due(VirtualTime::from_us(10)), Some(TimerId::HalfBit));
        assert_eq!(queue.pop_due(VirtualTime::from_us(10)), Some(TimerId::Aux));
    }

    #[test]
    fn test_arm_is_relative_and_reset_cancels() {
        let mut queue = TimerQueue::new();
        queue.advance_to(VirtualTime::from_us(100));
        queue.arm(TimerId::Byte, VirtualTime::from_us(32));
        assert_eq!(queue.deadline(TimerId::Byte), Some(VirtualTime::from_us(132)));

        queue.reset(TimerId::Byte);
        assert!(!queue.is_armed(TimerId::Byte));
        assert_eq!(queue.pop_due(VirtualTime::from_ms(10)), None);
    }

    #[test]
    fn test_time_never_moves_backwards() {
        let mut queue = TimerQueue::new();
        queue.advance_to(VirtualTime::from_us(50));
        queue.advance_to(VirtualTime::from_us(20));
        assert_eq!(queue.now(), VirtualTime::from_us(50));
    }
}
