/*
 *  device/error.rs
 *
 *  PowMon - fresh tracks, fresh data
 *  (c) 2023-26 Stuart Hunter
 *
 *  Error type shared by the panel, indicator, buttons and platform
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

use thiserror::Error;

/// Unified error type for all device operations
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Network association failed
    #[error("Network unavailable: {0}")]
    Network(String),

    /// Drawing operation failed
    #[error("Drawing error: {0}")]
    DrawingError(String),

    /// Operation attempted before init() or after release()
    #[error("Device not initialized")]
    NotInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DeviceResult = Result<(), DeviceError>;
