/*
 *  device/drivers/mod.rs
 *
 *  PowMon - fresh tracks, fresh data
 *  (c) 2023-26 Stuart Hunter
 *
 *  Device driver implementations
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

// Host drivers: keyboard buttons, logged LED, host network
pub mod console;

// Mock drivers, shared with the integration tests
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use console::{ConsoleButtons, ConsoleIndicator, HostPlatform};
