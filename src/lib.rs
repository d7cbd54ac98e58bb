/*
 *  lib.rs
 *
 *  PowMon - fresh tracks, fresh data
 *  (c) 2023-26 Stuart Hunter
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

//! Resort snow and weather monitor for a battery-powered e-paper tag.

pub mod config;
pub mod controller;
pub mod countdown;
pub mod cycle;
pub mod device;
pub mod feed;
pub mod render;
pub mod selection;
pub mod snapshot;

pub use config::{Cli, Config, ConfigError, FetchPolicy};
pub use controller::{Action, ControllerSettings, Phase, SelectionController};
pub use cycle::{CycleError, CycleSettings, DeviceContext, FailureKind, RestartLog};
pub use feed::{FeedClient, FeedError, FeedSource, FileFeed, RawFeed};
pub use selection::{Button, ButtonLevels, Selection, SelectionState};
pub use snapshot::{SnapshotFields, WeatherSnapshot};
