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

    src/flux/timeline.rs

    A single revolution of flux transitions for one track, repeated forever.
*/
use crate::timing::VirtualTime;
use bit_vec::BitVec;

/// The flux transitions of one track, expressed as offsets in nanoseconds from the index
/// pulse. The timeline repeats every `revolution`.
#[derive(Clone, Debug, Default)]
pub struct FluxTimeline {
    transitions: Vec<u64>,
    revolution:  VirtualTime,
}

impl FluxTimeline {
    /// Build a timeline from a vector of encoded half-cells. Every half-cell holding a 1
    /// produces one transition in the centre of its cell.
    pub fn from_bitcells(bits: &BitVec, half_period: VirtualTime) -> Self {
        let hp = half_period.as_ns();
        let transitions = bits
            .iter()
            .enumerate()
            .filter(|(_, bit)| *bit)
            .map(|(i, _)| i as u64 * hp + hp / 2)
            .collect();

        FluxTimeline {
            transitions,
            revolution: half_period * bits.len() as u64,
        }
    }

    /// Build a timeline from explicit transition offsets. Offsets must be sorted and lie within
    /// the revolution.
    pub fn from_transitions(transitions: Vec<u64>, revolution: VirtualTime) -> Self {
        debug_assert!(transitions.windows(2).all(|w| w[0] <= w[1]));
        FluxTimeline {
            transitions,
            revolution,
        }
    }

    pub fn revolution(&self) -> VirtualTime {
        self.revolution
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Return the first transition at or after `from`, wrapping into the following revolution
    /// when needed. Returns None for a blank track.
    pub fn next_after(&self, from: VirtualTime) -> Option<VirtualTime> {
        let rev = self.revolution.as_ns();
        if rev == 0 || self.transitions.is_empty() {
            return None;
        }

        let offset = from.as_ns() % rev;
        let base = from.as_ns() - offset;
        let idx = self.transitions.partition_point(|&t| t < offset);

        match self.transitions.get(idx) {
            Some(&t) => Some(VirtualTime::from_ns(base + t)),
            None => Some(VirtualTime::from_ns(base + rev + self.transitions[0])),
        }
    }
}
