/*
 *  snapshot.rs
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

use crate::feed::{FeedError, RawFeed};
use crate::selection::{MAX_FUTURE_PAGE, MAX_PAGE, Selection};

/// Forecast block names by day offset.
pub const FORECAST_DAYS: [&str; 5] = ["OneDay", "TwoDay", "ThreeDay", "FourDay", "FiveDay"];

const CURRENT: &str = "CurrentConditions.Base";
const SNOW_REPORT: &str = "SnowReport";

/// Fields shown for one (day, page) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotFields {
    /// today, page 0
    Conditions { temperature_c: i32, wind_chill_c: i32, skies: String },
    /// today, page 1
    Mountain {
        open_trails: u32,
        total_trails: u32,
        open_lifts: u32,
        total_lifts: u32,
        open_terrain_pct: u32,
    },
    /// today, page 2
    Parks {
        open_parks: u32,
        total_parks: u32,
        season_total_cm: String,
        last_24h_cm: String,
    },
    /// forecast day, page 0
    Outlook { high_c: i32, low_c: i32, skies: String },
    /// forecast day, page 1
    Wind { snow_cm: String, wind_kph: String, wind_direction: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub selection: Selection,
    pub is_today: bool,
    pub date: String,
    pub fields: SnapshotFields,
    /// resort status line; only the mountain pages carry it
    pub operating_status: String,
}

impl WeatherSnapshot {
    /// Pull the fields for `selection` out of the feed. Any absent or
    /// unparsable key fails the whole snapshot.
    pub fn build(feed: &RawFeed, selection: Selection) -> Result<Self, FeedError> {
        let day = (selection.day_offset as usize).min(FORECAST_DAYS.len() - 1);
        let is_today = day == 0;
        // forecast days have no parks page
        let page = if is_today {
            selection.page.min(MAX_PAGE)
        } else {
            selection.page.min(MAX_FUTURE_PAGE)
        };
        let forecast = format!("Forecast.{}", FORECAST_DAYS[day]);
        let date = feed.text(&format!("{forecast}.date"))?;

        let fields = match (is_today, page) {
            (true, 0) => SnapshotFields::Conditions {
                temperature_c: ceil_c(feed, &format!("{CURRENT}.TemperatureC"))?,
                wind_chill_c: ceil_c(feed, &format!("{CURRENT}.WindChillC"))?,
                skies: feed.text(&format!("{CURRENT}.Skies"))?,
            },
            (true, 1) => {
                let open_acres = feed.number(&format!("{SNOW_REPORT}.OpenTerrainAcres"))?;
                let total_acres = feed.number(&format!("{SNOW_REPORT}.TotalTerrainAcres"))?;
                SnapshotFields::Mountain {
                    open_trails: feed.count(&format!("{SNOW_REPORT}.TotalOpenTrails"))?,
                    total_trails: feed.count(&format!("{SNOW_REPORT}.TotalTrails"))?,
                    open_lifts: feed.count(&format!("{SNOW_REPORT}.TotalOpenLifts"))?,
                    total_lifts: feed.count(&format!("{SNOW_REPORT}.TotalLifts"))?,
                    open_terrain_pct: percent_floor(open_acres, total_acres),
                }
            }
            (true, _) => SnapshotFields::Parks {
                open_parks: feed.count(&format!("{SNOW_REPORT}.TotalOpenParks"))?,
                total_parks: feed.count(&format!("{SNOW_REPORT}.TotalParks"))?,
                season_total_cm: feed.text(&format!("{SNOW_REPORT}.SeasonTotalCm"))?,
                last_24h_cm: feed.text(&format!("{SNOW_REPORT}.Last24HoursCm"))?,
            },
            (false, 0) => SnapshotFields::Outlook {
                high_c: ceil_c(feed, &format!("{forecast}.temp_high_c"))?,
                low_c: ceil_c(feed, &format!("{forecast}.temp_low_c"))?,
                skies: feed.text(&format!("{forecast}.skies"))?,
            },
            (false, _) => SnapshotFields::Wind {
                snow_cm: feed.text(&format!("{forecast}.forecasted_snow_cm"))?,
                wind_kph: feed.text(&format!("{forecast}.avewind.kph"))?,
                wind_direction: feed.text(&format!("{forecast}.avewind.dir"))?,
            },
        };

        let operating_status = match &fields {
            SnapshotFields::Mountain { .. } | SnapshotFields::Parks { .. } => feed.text("OperatingStatus")?,
            _ => String::new(),
        };

        Ok(Self {
            selection: Selection { day_offset: day as u8, page },
            is_today,
            date,
            fields,
            operating_status,
        })
    }
}

/// Temperatures are shown rounded up to the whole degree.
fn ceil_c(feed: &RawFeed, path: &str) -> Result<i32, FeedError> {
    Ok(feed.number(path)?.ceil() as i32)
}

fn percent_floor(open: f64, total: f64) -> u32 {
    if total <= 0.0 {
        return 0;
    }
    (open / total * 100.0).floor().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feed() -> RawFeed {
        RawFeed::new(json!({
            "OperatingStatus": "Open",
            "CurrentConditions": {"Base": {"TemperatureC": "-2.7", "WindChillC": "-5.1", "Skies": "Cloudy"}},
            "Forecast": {
                "OneDay": {"date": "2024-01-12"},
                "TwoDay": {"date": "2024-01-13", "temp_high_c": "1.2", "temp_low_c": "-8.0", "skies": "Snow",
                           "forecasted_snow_cm": "10", "avewind": {"kph": "20", "dir": "W"}},
                "ThreeDay": {"date": "2024-01-14", "temp_high_c": -3.5, "temp_low_c": -11.9, "skies": "Sunny",
                             "forecasted_snow_cm": 5, "avewind": {"kph": 12, "dir": "NW"}}
            },
            "SnowReport": {
                "TotalOpenTrails": 80, "TotalTrails": 102,
                "TotalOpenLifts": "12", "TotalLifts": "14",
                "OpenTerrainAcres": 500, "TotalTerrainAcres": 755,
                "TotalOpenParks": 3, "TotalParks": 5,
                "SeasonTotalCm": "180", "Last24HoursCm": "4"
            }
        }))
    }

    #[test]
    fn test_today_conditions_ceil() {
        let s = WeatherSnapshot::build(&feed(), Selection { day_offset: 0, page: 0 }).unwrap();
        assert!(s.is_today);
        assert_eq!(s.date, "2024-01-12");
        assert_eq!(s.fields, SnapshotFields::Conditions {
            temperature_c: -2,
            wind_chill_c: -5,
            skies: "Cloudy".into(),
        });
        assert_eq!(s.operating_status, "");
    }

    #[test]
    fn test_today_mountain_floor_pct() {
        let s = WeatherSnapshot::build(&feed(), Selection { day_offset: 0, page: 1 }).unwrap();
        // 500 / 755 = 66.2%
        assert_eq!(s.fields, SnapshotFields::Mountain {
            open_trails: 80,
            total_trails: 102,
            open_lifts: 12,
            total_lifts: 14,
            open_terrain_pct: 66,
        });
        assert_eq!(s.operating_status, "Open");
    }

    #[test]
    fn test_today_parks() {
        let s = WeatherSnapshot::build(&feed(), Selection { day_offset: 0, page: 2 }).unwrap();
        assert_eq!(s.fields, SnapshotFields::Parks {
            open_parks: 3,
            total_parks: 5,
            season_total_cm: "180".into(),
            last_24h_cm: "4".into(),
        });
    }

    #[test]
    fn test_future_outlook_and_wind() {
        let s = WeatherSnapshot::build(&feed(), Selection { day_offset: 1, page: 0 }).unwrap();
        assert!(!s.is_today);
        assert_eq!(s.fields, SnapshotFields::Outlook { high_c: 2, low_c: -8, skies: "Snow".into() });

        let s = WeatherSnapshot::build(&feed(), Selection { day_offset: 2, page: 1 }).unwrap();
        assert_eq!(s.date, "2024-01-14");
        assert_eq!(s.fields, SnapshotFields::Wind {
            snow_cm: "5".into(),
            wind_kph: "12".into(),
            wind_direction: "NW".into(),
        });
    }

    #[test]
    fn test_future_parks_degrades_to_wind() {
        let s = WeatherSnapshot::build(&feed(), Selection { day_offset: 2, page: 2 }).unwrap();
        assert_eq!(s.selection, Selection { day_offset: 2, page: 1 });
        assert!(matches!(s.fields, SnapshotFields::Wind { .. }));
    }

    #[test]
    fn test_missing_key_fails_whole_snapshot() {
        // FourDay block absent
        let err = WeatherSnapshot::build(&feed(), Selection { day_offset: 3, page: 0 }).unwrap_err();
        assert!(matches!(err, FeedError::Missing(_)));

        let mut root = feed().root().clone();
        root["CurrentConditions"]["Base"]["WindChillC"] = json!("--");
        let err = WeatherSnapshot::build(&RawFeed::new(root), Selection { day_offset: 0, page: 0 }).unwrap_err();
        assert!(matches!(err, FeedError::Unparsable { .. }));
    }

    #[test]
    fn test_zero_terrain_total() {
        assert_eq!(percent_floor(10.0, 0.0), 0);
        assert_eq!(percent_floor(755.0, 755.0), 100);
        assert_eq!(percent_floor(1.0, 3.0), 33);
    }
}
