/*
 *  selection.rs
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

use crate::config::DEFAULT_MAX_DAY_OFFSET;

/// Highest page index; only today has the parks/season page.
pub const MAX_PAGE: u8 = 2;
/// Highest page index for forecast days.
pub const MAX_FUTURE_PAGE: u8 = 1;

/// The tag's buttons, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left, // confirm / back
    Up,
    Down,
    Wake, // right button, also the deep-sleep wake pin
}

/// Raw button levels as sampled on one tick (true = held).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ButtonLevels {
    pub left: bool,
    pub up: bool,
    pub down: bool,
    pub wake: bool,
}

impl ButtonLevels {
    pub fn pressed(button: Button) -> Self {
        let mut levels = Self::default();
        match button {
            Button::Left => levels.left = true,
            Button::Up => levels.up = true,
            Button::Down => levels.down = true,
            Button::Wake => levels.wake = true,
        }
        levels
    }

    pub fn any(&self) -> bool {
        self.left || self.up || self.down || self.wake
    }

    /// Pick a single button when several are held: left > up > down > wake.
    pub fn highest_priority(&self) -> Option<Button> {
        if self.left {
            Some(Button::Left)
        } else if self.up {
            Some(Button::Up)
        } else if self.down {
            Some(Button::Down)
        } else if self.wake {
            Some(Button::Wake)
        } else {
            None
        }
    }
}

/// Turns sampled levels into press events; a held button fires once.
#[derive(Debug, Default)]
pub struct EdgeDetector {
    last: ButtonLevels,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns only the buttons that went from released to held.
    pub fn update(&mut self, now: ButtonLevels) -> ButtonLevels {
        let rising = ButtonLevels {
            left: now.left && !self.last.left,
            up: now.up && !self.last.up,
            down: now.down && !self.last.down,
            wake: now.wake && !self.last.wake,
        };
        self.last = now;
        rising
    }
}

/// A (day, page) pair to fetch and render.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Selection {
    pub day_offset: u8,
    pub page: u8,
}

impl Selection {
    pub fn is_today(&self) -> bool {
        self.day_offset == 0
    }
}

/// Day offset and page chosen with the buttons.
///
/// Both values are clamped; leaving today while on the parks page drops
/// back to page 1 since forecast days have no such page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionState {
    day_offset: u8,
    page: u8,
    max_day_offset: u8,
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DAY_OFFSET)
    }
}

impl SelectionState {
    pub fn new(max_day_offset: u8) -> Self {
        Self { day_offset: 0, page: 0, max_day_offset }
    }

    pub fn day_offset(&self) -> u8 {
        self.day_offset
    }

    pub fn page(&self) -> u8 {
        self.page
    }

    pub fn current(&self) -> Selection {
        Selection { day_offset: self.day_offset, page: self.page }
    }

    /// Highest page reachable for the current day.
    pub fn max_page(&self) -> u8 {
        if self.day_offset == 0 { MAX_PAGE } else { MAX_FUTURE_PAGE }
    }

    pub fn next_day(&mut self) -> bool {
        if self.day_offset >= self.max_day_offset {
            return false;
        }
        self.set_day(self.day_offset + 1);
        true
    }

    pub fn prev_day(&mut self) -> bool {
        if self.day_offset == 0 {
            return false;
        }
        self.set_day(self.day_offset - 1);
        true
    }

    pub fn next_page(&mut self) -> bool {
        if self.page >= self.max_page() {
            return false;
        }
        self.page += 1;
        true
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page == 0 {
            return false;
        }
        self.page -= 1;
        true
    }

    fn set_day(&mut self, day: u8) {
        self.day_offset = day.min(self.max_day_offset);
        if self.page > self.max_page() {
            self.page = self.max_page();
        }
    }
}
