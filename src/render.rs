/*
 *  render.rs
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

//! Screen text for every phase of a wake cycle. Each screen starts with a
//! blank line so the first row clears the panel's top bezel.

use crate::snapshot::{SnapshotFields, WeatherSnapshot};

pub fn connecting(ssid: &str) -> String {
    format!("\nConnecting to\n{ssid}...")
}

pub fn connect_error(ssid: &str, restart_secs: u64) -> String {
    format!("\nError connecting to\n{ssid}.\nRestarting in {restart_secs} seconds.")
}

pub fn downloading() -> String {
    "\nDownloading weather\ndata...".to_string()
}

pub fn day_prompt() -> String {
    "\nPress up or down to\nselect a day.\nPress left to continue.".to_string()
}

pub fn day_requesting(day_offset: u8) -> String {
    format!("\nDay Requesting: +{day_offset}")
}

pub fn requesting(day_offset: u8) -> String {
    if day_offset == 0 {
        "\nRequesting the weather\nfor today...".to_string()
    } else {
        format!("\nRequesting the weather\nfor {day_offset} day(s) in the\nfuture...")
    }
}

pub fn fetch_error(restart_secs: u64) -> String {
    format!("\nError obtaining the\nweather.\nRestarting in {restart_secs} seconds.")
}

/// Data page for a snapshot, headed by `<place> on <date>`.
pub fn page(place_name: &str, snapshot: &WeatherSnapshot) -> String {
    let header = format!("\n{} on {}", place_name, snapshot.date);
    match &snapshot.fields {
        SnapshotFields::Conditions { temperature_c, wind_chill_c, skies } => format!(
            "{header}\nWeather: {temperature_c} C\nWind Chill: {wind_chill_c} C\n{skies}"
        ),
        SnapshotFields::Outlook { high_c, low_c, skies } => format!(
            "{header}\nHigh: {high_c} C\nLow: {low_c} C\n{skies}"
        ),
        SnapshotFields::Mountain { open_trails, total_trails, open_lifts, total_lifts, open_terrain_pct } => format!(
            "{header}\n{}\nTrails: {open_trails}/{total_trails}\nLifts: {open_lifts}/{total_lifts}\nOpen Terrain: {open_terrain_pct}%",
            snapshot.operating_status
        ),
        SnapshotFields::Parks { open_parks, total_parks, season_total_cm, last_24h_cm } => format!(
            "{header}\n{}\nParks: {open_parks}/{total_parks}\nSeason Total: {season_total_cm} cm\nLast 24h: {last_24h_cm} cm",
            snapshot.operating_status
        ),
        SnapshotFields::Wind { snow_cm, wind_kph, wind_direction } => format!(
            "{header}\nSnowfall: {snow_cm} cm\nWind Speed: {wind_kph}\nWind Direction: {wind_direction}"
        ),
    }
}
