/*
 *  controller.rs
 *
 *  PowMon - fresh tracks, fresh data
 *  (c) 2023-26 Stuart Hunter
 *
 *  Selection controller - day/page state machine driven by button presses
 *  and the idle countdown
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use crate::config::{BrightnessStep, Config, DEFAULT_COUNTDOWN_TICKS, DEFAULT_MAX_DAY_OFFSET, default_brightness_steps};
use crate::countdown::{BrightnessTable, Countdown};
use crate::selection::{Button, Selection, SelectionState};

/// Configuration for the selection controller
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Idle ticks before day selection auto-confirms or browsing sleeps
    pub countdown_ticks: u32,

    /// Furthest forecast day offered
    pub max_day_offset: u8,

    /// Countdown indicator steps
    pub brightness_steps: Vec<BrightnessStep>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            countdown_ticks: DEFAULT_COUNTDOWN_TICKS,
            max_day_offset: DEFAULT_MAX_DAY_OFFSET,
            brightness_steps: default_brightness_steps(),
        }
    }
}

impl From<&Config> for ControllerSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            countdown_ticks: cfg.countdown_ticks(),
            max_day_offset: cfg.max_day_offset(),
            brightness_steps: cfg.brightness_steps(),
        }
    }
}

/// Where the controller is within a wake cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SelectingDay,
    BrowsingPage,
    Sleeping,
}

/// What the runtime must do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// show the "press up or down" prompt
    DayPrompt,
    /// day offset changed while selecting
    DayChanged(u8),
    /// fetch (if needed) and render this selection
    Show(Selection),
    /// re-download the feed, then render this selection
    Refresh(Selection),
    /// countdown ran out while browsing
    Sleep,
}

/// Selection controller - one per wake cycle, dropped on sleep
#[derive(Debug)]
pub struct SelectionController {
    state: SelectionState,
    countdown: Countdown,
    brightness: BrightnessTable,
    phase: Phase,
}

impl SelectionController {
    pub fn new(settings: &ControllerSettings) -> Self {
        Self {
            state: SelectionState::new(settings.max_day_offset),
            countdown: Countdown::new(settings.countdown_ticks),
            brightness: BrightnessTable::new(settings.brightness_steps.clone()),
            phase: Phase::SelectingDay,
        }
    }

    /// Action to perform before the first tick
    pub fn start(&self) -> Action {
        Action::DayPrompt
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selection(&self) -> Selection {
        self.state.current()
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.countdown.remaining()
    }

    /// Indicator level for the current countdown
    pub fn brightness(&self) -> f32 {
        self.brightness.level(self.countdown.remaining())
    }

    /// Advance one tick with at most one (already edge-detected) press.
    /// An expired countdown wins over any press on the same tick.
    pub fn tick(&mut self, pressed: Option<Button>) -> Option<Action> {
        match self.phase {
            Phase::SelectingDay => self.tick_selecting(pressed),
            Phase::BrowsingPage => self.tick_browsing(pressed),
            Phase::Sleeping => None,
        }
    }

    fn tick_selecting(&mut self, pressed: Option<Button>) -> Option<Action> {
        if self.countdown.is_expired() || pressed == Some(Button::Left) {
            log::debug!("Day {} confirmed with {} ticks left", self.state.day_offset(), self.countdown.remaining());
            self.phase = Phase::BrowsingPage;
            self.countdown.reset();
            return Some(Action::Show(self.state.current()));
        }

        let action = match pressed {
            Some(Button::Up) if self.state.next_day() => Some(Action::DayChanged(self.state.day_offset())),
            Some(Button::Down) if self.state.prev_day() => Some(Action::DayChanged(self.state.day_offset())),
            _ => None,
        };
        self.countdown.tick();
        action
    }

    fn tick_browsing(&mut self, pressed: Option<Button>) -> Option<Action> {
        if self.countdown.is_expired() {
            log::info!("Browsing idle, going to sleep");
            self.phase = Phase::Sleeping;
            return Some(Action::Sleep);
        }

        let action = match pressed {
            Some(Button::Left) => {
                self.phase = Phase::SelectingDay;
                Some(Action::DayPrompt)
            }
            Some(Button::Up) if self.state.next_page() => Some(Action::Show(self.state.current())),
            Some(Button::Down) if self.state.prev_page() => Some(Action::Show(self.state.current())),
            Some(Button::Wake) => Some(Action::Refresh(self.state.current())),
            _ => None,
        };

        if let Some(a) = action {
            log::debug!("Browsing action {:?}", a);
            self.countdown.reset();
        } else {
            self.countdown.tick();
        }
        action
    }
}
