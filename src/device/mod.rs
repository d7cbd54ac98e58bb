/*
 *  device/mod.rs
 *
 *  PowMon - fresh tracks, fresh data
 *  (c) 2023-26 Stuart Hunter
 *
 *  Device subsystem - panel, indicator, buttons and power
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod framebuf;
pub mod panel;

pub mod drivers;

// Re-exports for convenience
pub use traits::{
    BoxedButtons, BoxedDisplay, BoxedIndicator, ButtonReader, Indicator, Platform, Rgb, TextDisplay,
    WakeAlarm, WakeReason,
};
pub use error::{DeviceError, DeviceResult};
pub use framebuf::PanelBuf;
pub use panel::PanelDisplay;
