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

    src/drive.rs

    The drive mechanism: head positioning, the index pulse, and the flux
    stream under the head.
*/
use crate::{config::MdcConfig, file_parsers::mcz::MczImage, flux::FluxTimeline, timing::VirtualTime};

/// What the controller needs from a drive.
pub trait MediumSource {
    /// The first flux transition at or after `from` on the track under the head.
    fn next_transition(&self, from: VirtualTime) -> Option<VirtualTime>;
    /// Whether the index pulse is asserted at `now`.
    fn index_pulse(&self, now: VirtualTime) -> bool;
    fn ready(&self) -> bool;
    fn cylinder(&self) -> u8;
    fn write_protected(&self) -> bool;
    /// Drive the direction line. True moves the head toward higher cylinders.
    fn set_direction(&mut self, inward: bool);
    /// Drive the step line. The head moves when the line is released.
    fn set_step(&mut self, asserted: bool);
    /// Release the step line and point the direction line toward cylinder 0 without moving
    /// the head.
    fn idle_lines(&mut self);
}

/// A drive holding a read-only flux image, one timeline per cylinder.
#[derive(Clone, Debug, Default)]
pub struct FluxDrive {
    tracks: Vec<FluxTimeline>,
    cylinder: u8,
    inward: bool,
    step_asserted: bool,
    index_width: VirtualTime,
}

impl FluxDrive {
    /// Build a drive from an MCZ image. The image is encoded once, up front.
    pub fn new(image: &MczImage, config: &MdcConfig) -> Self {
        let half_period = config.half_bit_period();
        let tracks = (0..image.track_count())
            .map(|t| FluxTimeline::from_bitcells(&image.track_bitcells(t), half_period))
            .collect();
        FluxDrive::from_tracks(tracks, config.index_pulse_width)
    }

    pub fn from_tracks(tracks: Vec<FluxTimeline>, index_width: VirtualTime) -> Self {
        FluxDrive {
            tracks,
            index_width,
            ..Default::default()
        }
    }

    /// A drive with no medium inserted.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    fn max_cylinder(&self) -> u8 {
        self.tracks.len().saturating_sub(1).min(u8::MAX as usize) as u8
    }

    fn current_track(&self) -> Option<&FluxTimeline> {
        self.tracks.get(self.cylinder as usize)
    }
}

impl MediumSource for FluxDrive {
    fn next_transition(&self, from: VirtualTime) -> Option<VirtualTime> {
        self.current_track()?.next_after(from)
    }

    fn index_pulse(&self, now: VirtualTime) -> bool {
        match self.current_track() {
            Some(track) if track.revolution() > VirtualTime::ZERO => {
                now.as_ns() % track.revolution().as_ns() < self.index_width.as_ns()
            }
            _ => false,
        }
    }

    fn ready(&self) -> bool {
        !self.tracks.is_empty()
    }

    fn cylinder(&self) -> u8 {
        self.cylinder
    }

    fn write_protected(&self) -> bool {
        true
    }

    fn set_direction(&mut self, inward: bool) {
        self.inward = inward;
    }

    fn set_step(&mut self, asserted: bool) {
        if self.step_asserted && !asserted {
            let old = self.cylinder;
            self.cylinder = if self.inward {
                self.cylinder.saturating_add(1).min(self.max_cylinder())
            }
            else {
                self.cylinder.saturating_sub(1)
            };
            log::debug!("FluxDrive::set_step(): cylinder {} -> {}", old, self.cylinder);
        }
        self.step_asserted = asserted;
    }

    fn idle_lines(&mut self) {
        self.step_asserted = false;
        self.inward = false;
    }
}
