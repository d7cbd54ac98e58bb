/*
 *  countdown.rs
 *
 *  PowMon - fresh tracks, fresh data
 *	(c) 2023-26 Stuart Hunter
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use crate::config::{BrightnessStep, default_brightness_steps};

/// Idle countdown measured in controller ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    start: u32,
    remaining: u32,
}

impl Countdown {
    pub fn new(start: u32) -> Self {
        Self { start, remaining: start }
    }

    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    pub fn reset(&mut self) {
        self.remaining = self.start;
    }

    /// One tick elapsed; saturates at zero.
    #[inline]
    pub fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

/// Step table mapping remaining ticks to indicator brightness, so the
/// light dims as time runs out.
#[derive(Debug, Clone, PartialEq)]
pub struct BrightnessTable {
    steps: Vec<BrightnessStep>, // descending by ticks
}

impl Default for BrightnessTable {
    fn default() -> Self {
        Self::new(default_brightness_steps())
    }
}

impl BrightnessTable {
    pub fn new(mut steps: Vec<BrightnessStep>) -> Self {
        steps.sort_by(|a, b| b.ticks.cmp(&a.ticks));
        Self { steps }
    }

    /// Ticks in `(next, this]` take this step's level; above the top step
    /// the top level holds, and zero means off.
    pub fn level(&self, remaining: u32) -> f32 {
        if remaining == 0 {
            return 0.0;
        }
        self.steps
            .iter()
            .rev()
            .find(|s| remaining <= s.ticks)
            .or_else(|| self.steps.first())
            .map(|s| s.level)
            .unwrap_or(0.0)
    }

    /// Lowest level the table will ever show while time remains.
    pub fn floor_level(&self) -> f32 {
        self.steps.last().map(|s| s.level).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_saturates() {
        let mut c = Countdown::new(2);
        c.tick();
        c.tick();
        assert!(c.is_expired());
        c.tick();
        assert_eq!(c.remaining(), 0);
        c.reset();
        assert_eq!(c.remaining(), 2);
    }

    #[test]
    fn test_brightness_steps() {
        let t = BrightnessTable::default();
        assert_eq!(t.level(1500), 0.30);
        assert_eq!(t.level(1400), 0.30);
        assert_eq!(t.level(1350), 0.25);
        assert_eq!(t.level(151), 0.02);
        assert_eq!(t.level(150), 0.01);
        assert_eq!(t.level(150), t.floor_level());
        assert_eq!(t.level(1), 0.01);
        assert_eq!(t.level(0), 0.0);
        // longer countdowns hold the top level
        assert_eq!(t.level(5000), 0.30);
    }

    #[test]
    fn test_brightness_is_monotonic() {
        let t = BrightnessTable::default();
        let mut last = f32::MAX;
        for remaining in (0..=1500).rev() {
            let level = t.level(remaining);
            assert!(level <= last, "brightness rose at {remaining}");
            last = level;
        }
    }

    #[test]
    fn test_unsorted_steps_are_ordered() {
        let t = BrightnessTable::new(vec![
            BrightnessStep { ticks: 10, level: 0.1 },
            BrightnessStep { ticks: 100, level: 0.5 },
        ]);
        assert_eq!(t.level(50), 0.5);
        assert_eq!(t.level(10), 0.1);
    }
}
