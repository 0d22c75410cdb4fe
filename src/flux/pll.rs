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

    src/flux/pll.rs

    Digital PLL data separator. Each call to feed_read_data() consumes one
    half bit cell window and reports whether a flux transition fell inside it.
*/
use crate::{drive::MediumSource, format_us, timing::VirtualTime};

/// Fraction of the measured phase error, in percent, applied to the next window.
const PHASE_GAIN: i64 = 65;
/// Fraction of the measured phase error, in percent, applied to the working period.
const CLOCK_GAIN: i64 = 5;
/// Maximum deviation of the working period from the nominal period, in percent.
const MAX_ADJUST: i64 = 15;

/// A PLL bit separator working in virtual time.
///
/// The separator keeps its own clock, `ctime`, which marks the start of the next half bit cell
/// window. Windows are `period` long, shifted by a phase adjustment computed from the last
/// transition seen. Phase correction never exceeds half of the current window.
#[derive(Clone, Debug)]
pub struct Pll {
    nominal_period: u64,
    period: u64,
    min_period: u64,
    max_period: u64,
    phase_adjust: i64,
    ctime: VirtualTime,
}

impl Default for Pll {
    fn default() -> Self {
        Pll::new(VirtualTime::from_us(2))
    }
}

impl Pll {
    pub fn new(half_period: VirtualTime) -> Self {
        let mut pll = Pll {
            nominal_period: 0,
            period: 0,
            min_period: 0,
            max_period: 0,
            phase_adjust: 0,
            ctime: VirtualTime::ZERO,
        };
        pll.set_clock(half_period);
        pll
    }

    /// Set the nominal half bit cell period and reset the working period to it.
    pub fn set_clock(&mut self, half_period: VirtualTime) {
        self.nominal_period = half_period.as_ns().max(1);
        self.min_period = self.nominal_period - self.nominal_period * MAX_ADJUST as u64 / 100;
        self.max_period = self.nominal_period + self.nominal_period * MAX_ADJUST as u64 / 100;
        self.reset_clock();
        log::trace!(
            "Pll::set_clock(): Setting half bit period to {}, max adjust: {}%",
            format_us!(half_period.as_secs_f64()),
            MAX_ADJUST
        );
    }

    /// Restore the working period to the nominal period and drop any phase adjustment.
    pub fn reset_clock(&mut self) {
        self.period = self.nominal_period;
        self.phase_adjust = 0;
    }

    /// Start a new read at `when`.
    pub fn read_reset(&mut self, when: VirtualTime) {
        self.reset_clock();
        self.ctime = when;
    }

    /// The start of the next half bit cell window.
    pub fn ctime(&self) -> VirtualTime {
        self.ctime
    }

    pub fn set_ctime(&mut self, when: VirtualTime) {
        self.ctime = when;
    }

    pub fn period(&self) -> VirtualTime {
        VirtualTime::from_ns(self.period)
    }

    /// Consume one half bit cell window. `edge` is the first flux transition at or after the
    /// current window start, if any. Returns true if the transition falls inside the window.
    /// The window always advances, so a missing or distant edge simply reads as 0.
    pub fn feed_read_data(&mut self, edge: Option<VirtualTime>) -> bool {
        let start = self.ctime.as_ns() as i64;
        let period = self.period as i64;
        let next = start + period + self.phase_adjust;
        self.ctime = VirtualTime::from_ns(next as u64);

        match edge {
            Some(edge) if (edge.as_ns() as i64) < next => {
                // Error relative to the centre of the window that just closed.
                let phase_err = edge.as_ns() as i64 - (next - period / 2);

                self.phase_adjust = (phase_err * PHASE_GAIN / 100).clamp(-period / 2, period / 2);
                self.period = (self.period as i64 + phase_err * CLOCK_GAIN / 100)
                    .clamp(self.min_period as i64, self.max_period as i64) as u64;
                true
            }
            _ => {
                self.phase_adjust = 0;
                false
            }
        }
    }

    /// Read one half bit from `medium`, starting at the current window. Without a medium every
    /// half bit reads as 0.
    pub fn read_half_bit(&mut self, medium: Option<&dyn MediumSource>) -> bool {
        let edge = medium.and_then(|m| m.next_transition(self.ctime));
        self.feed_read_data(edge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HP: u64 = 2_000;

    fn run(pll: &mut Pll, edges: &[u64], half_bits: usize) -> Vec<bool> {
        let mut out = Vec::new();
        for _ in 0..half_bits {
            let from = pll.ctime().as_ns();
            let edge = edges.iter().copied().find(|&e| e >= from).map(VirtualTime::from_ns);
            out.push(pll.feed_read_data(edge));
        }
        out
    }

    #[test]
    fn test_centered_edges_read_cleanly() {
        let mut pll = Pll::new(VirtualTime::from_ns(HP));
        pll.read_reset(VirtualTime::ZERO);
        // 1 0 1 1 0 0 1
        let edges = [HP / 2, 2 * HP + HP / 2, 3 * HP + HP / 2, 6 * HP + HP / 2];
        let bits = run(&mut pll, &edges, 7);
        assert_eq!(bits, vec![true, false, true, true, false, false, true]);
        assert_eq!(pll.ctime(), VirtualTime::from_ns(7 * HP));
        assert_eq!(pll.period(), VirtualTime::from_ns(HP));
    }

    #[test]
    fn test_missing_edges_read_as_zero() {
        let mut pll = Pll::new(VirtualTime::from_ns(HP));
        pll.read_reset(VirtualTime::from_us(100));
        for _ in 0..1000 {
            assert!(!pll.feed_read_data(None));
        }
        assert_eq!(pll.ctime(), VirtualTime::from_us(100) + VirtualTime::from_ns(1000 * HP));
    }

    #[test]
    fn test_tracks_slow_medium() {
        // Medium running 5% slow: transitions every 2.1µs, always a 1.
        let slow = HP + HP / 20;
        let edges: Vec<u64> = (0..400).map(|i| i * slow + slow / 2).collect();
        let mut pll = Pll::new(VirtualTime::from_ns(HP));
        pll.read_reset(VirtualTime::ZERO);

        let bits = run(&mut pll, &edges, 390);
        assert!(bits.iter().all(|b| *b));
        assert!(pll.period().as_ns() > HP);
        assert!(pll.period().as_ns() <= HP + HP * 15 / 100);
    }

    #[test]
    fn test_phase_correction_is_bounded() {
        let mut pll = Pll::new(VirtualTime::from_ns(HP));
        pll.read_reset(VirtualTime::ZERO);
        // Edge at the very start of the window: maximal early error.
        assert!(pll.feed_read_data(Some(VirtualTime::ZERO)));
        let ctime = pll.ctime().as_ns();
        assert!(!pll.feed_read_data(None));
        let step = pll.ctime().as_ns() - ctime;
        assert!(step >= HP / 2 && step < HP);
    }
}
