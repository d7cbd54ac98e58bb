/*
 *  device/traits.rs
 *
 *  PowMon - fresh tracks, fresh data
 *  (c) 2023-26 Stuart Hunter
 *
 *  Core trait definitions for the tag's peripherals
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

use std::fmt;
use std::time::Duration;

use crate::device::error::DeviceError;
use crate::selection::ButtonLevels;

/// Indicator colour, full intensity; brightness is applied separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const RED: Rgb = Rgb(255, 0, 0);
    pub const GREEN: Rgb = Rgb(0, 255, 0);
    pub const BLUE: Rgb = Rgb(0, 0, 255);
    pub const YELLOW: Rgb = Rgb(255, 255, 0);
    pub const CYAN: Rgb = Rgb(0, 255, 255);
    pub const PURPLE: Rgb = Rgb(255, 0, 255);
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Single-region text display
///
/// Every render replaces the whole screen; there is no partial refresh.
pub trait TextDisplay: Send {
    /// Prepare the panel for rendering
    fn init(&mut self) -> Result<(), DeviceError>;

    /// Replace the screen contents with `text` (newline separated rows)
    fn render_text(&mut self, text: &str) -> Result<(), DeviceError>;

    /// Power the panel down before deep sleep; the last image stays visible
    fn release(&mut self) -> Result<(), DeviceError>;
}

/// Tri-colour status light
pub trait Indicator: Send {
    fn fill(&mut self, color: Rgb) -> Result<(), DeviceError>;

    /// Brightness as a fraction 0.0..=1.0
    fn set_brightness(&mut self, level: f32) -> Result<(), DeviceError>;

    fn off(&mut self) -> Result<(), DeviceError>;
}

/// Momentary buttons, sampled once per tick
pub trait ButtonReader: Send {
    fn read(&mut self) -> ButtonLevels;
}

/// Conditions that end a deep sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WakeAlarm {
    /// wake unconditionally after this long
    pub after: Duration,
    /// how often to sample the wake button
    pub poll: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    Button,
    Timer,
}

/// Network association and power management
#[allow(async_fn_in_trait)]
pub trait Platform {
    /// Join the configured network
    async fn connect(&mut self, ssid: &str, password: &str) -> Result<(), DeviceError>;

    /// Suspend until the wake button is pressed or the alarm timer fires
    async fn deep_sleep(&mut self, alarm: WakeAlarm, buttons: &mut dyn ButtonReader) -> WakeReason;

    /// Block for a fixed delay (error back-off before restart)
    async fn pause(&mut self, duration: Duration);
}

pub type BoxedDisplay = Box<dyn TextDisplay>;
pub type BoxedIndicator = Box<dyn Indicator>;
pub type BoxedButtons = Box<dyn ButtonReader>;
