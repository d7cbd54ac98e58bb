/*
 *  cycle.rs
 *
 *  PowMon - fresh tracks, fresh data
 *  (c) 2023-26 Stuart Hunter
 *
 *  Wake cycle runtime - connect, download, select, show, sleep
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

use log::{debug, error, info, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::config::{Config, FetchPolicy};
use crate::controller::{Action, ControllerSettings, SelectionController};
use crate::device::{BoxedButtons, BoxedDisplay, BoxedIndicator, DeviceError, Platform, Rgb, WakeAlarm, WakeReason};
use crate::feed::{FeedError, FeedSource, RawFeed};
use crate::render;
use crate::selection::{EdgeDetector, Selection};
use crate::snapshot::WeatherSnapshot;

/// Indicator level while connecting and requesting
const STATUS_LEVEL: f32 = 0.1;

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Error connecting to {ssid}: {source}")]
    Connect {
        ssid: String,
        #[source]
        source: DeviceError,
    },
    #[error("Error obtaining the weather: {0}")]
    Feed(#[from] FeedError),
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
}

/// The two ways a wake cycle can fail. Both end in the same restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Connectivity,
    FeedShape,
}

impl CycleError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CycleError::Feed(e) if !e.is_connectivity() => FailureKind::FeedShape,
            _ => FailureKind::Connectivity,
        }
    }

    /// Error screen text
    pub fn screen(&self, ssid: &str, restart_secs: u64) -> String {
        match self {
            CycleError::Connect { .. } => render::connect_error(ssid, restart_secs),
            _ => render::fetch_error(restart_secs),
        }
    }
}

/// Everything a wake cycle needs from the configuration.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub ssid: String,
    pub password: String,
    pub place_name: String,
    pub policy: FetchPolicy,
    pub tick: Duration,
    pub wake_after: Duration,
    pub restart_delay: Duration,
    pub controller: ControllerSettings,
}

impl From<&Config> for CycleSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            ssid: cfg.ssid().to_string(),
            password: cfg.password().to_string(),
            place_name: cfg.place_name(),
            policy: cfg.fetch_policy(),
            tick: Duration::from_millis(cfg.tick_ms()),
            wake_after: Duration::from_secs(cfg.wake_after_secs()),
            restart_delay: Duration::from_secs(cfg.restart_delay_secs()),
            controller: ControllerSettings::from(cfg),
        }
    }
}

impl Default for CycleSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// The tag's peripherals, owned by the main loop and lent to each cycle.
pub struct DeviceContext<P: Platform> {
    pub display: BoxedDisplay,
    pub indicator: BoxedIndicator,
    pub buttons: BoxedButtons,
    pub platform: P,
}

impl<P: Platform> DeviceContext<P> {
    pub fn new(display: BoxedDisplay, indicator: BoxedIndicator, buttons: BoxedButtons, platform: P) -> Self {
        Self { display, indicator, buttons, platform }
    }

    /// One wake cycle from cold start to deep sleep. Returns what ended
    /// the sleep.
    pub async fn run_cycle<F: FeedSource>(
        &mut self,
        feed: &mut F,
        settings: &CycleSettings,
    ) -> Result<WakeReason, CycleError> {
        self.display.init()?;
        self.indicator.fill(Rgb::BLUE)?;
        self.indicator.set_brightness(STATUS_LEVEL)?;
        self.display.render_text(&render::connecting(&settings.ssid))?;
        self.platform
            .connect(&settings.ssid, &settings.password)
            .await
            .map_err(|source| CycleError::Connect { ssid: settings.ssid.clone(), source })?;

        self.indicator.fill(Rgb::PURPLE)?;
        self.display.render_text(&render::downloading())?;
        let mut cached = feed.fetch().await?;
        debug!("Feed fetched at {}", cached.fetched_at.format("%H:%M:%S"));

        let mut controller = SelectionController::new(&settings.controller);
        let mut edges = EdgeDetector::new();
        let mut ticker = tokio::time::interval(settings.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut pending = Some(controller.start());
        loop {
            if let Some(action) = pending.take() {
                if action == Action::Sleep {
                    break;
                }
                self.perform(action, feed, settings, &mut cached).await?;
            }
            self.indicator.set_brightness(controller.brightness())?;
            ticker.tick().await;
            let pressed = edges.update(self.buttons.read()).highest_priority();
            pending = controller.tick(pressed);
        }

        self.display.release()?;
        self.indicator.off()?;
        let alarm = WakeAlarm { after: settings.wake_after, poll: settings.tick };
        let reason = self.platform.deep_sleep(alarm, self.buttons.as_mut()).await;
        info!("Woke up ({:?})", reason);
        Ok(reason)
    }

    async fn perform<F: FeedSource>(
        &mut self,
        action: Action,
        feed: &mut F,
        settings: &CycleSettings,
        cached: &mut RawFeed,
    ) -> Result<(), CycleError> {
        match action {
            Action::DayPrompt => {
                self.indicator.fill(Rgb::YELLOW)?;
                self.display.render_text(&render::day_prompt())?;
            }
            Action::DayChanged(day_offset) => {
                self.display.render_text(&render::day_requesting(day_offset))?;
            }
            Action::Show(selection) => {
                let refetch = settings.policy == FetchPolicy::PerRequest;
                self.show(selection, refetch, feed, settings, cached).await?;
            }
            Action::Refresh(selection) => {
                info!("Manual refresh, feed was {}s old", cached.age().num_seconds());
                self.show(selection, true, feed, settings, cached).await?;
            }
            Action::Sleep => {}
        }
        Ok(())
    }

    async fn show<F: FeedSource>(
        &mut self,
        selection: Selection,
        refetch: bool,
        feed: &mut F,
        settings: &CycleSettings,
        cached: &mut RawFeed,
    ) -> Result<(), CycleError> {
        self.indicator.fill(Rgb::CYAN)?;
        self.indicator.set_brightness(STATUS_LEVEL)?;
        self.display.render_text(&render::requesting(selection.day_offset))?;
        if refetch {
            *cached = feed.fetch().await?;
        }
        let snapshot = WeatherSnapshot::build(cached, selection)?;
        debug!(
            "Showing day +{} page {} from feed fetched at {}",
            snapshot.selection.day_offset,
            snapshot.selection.page,
            cached.fetched_at.format("%H:%M:%S")
        );
        self.indicator.fill(Rgb::GREEN)?;
        self.display.render_text(&render::page(&settings.place_name, &snapshot))?;
        Ok(())
    }

    /// Error screen, red light, fixed pause. The caller then starts over.
    async fn recover(&mut self, err: &CycleError, settings: &CycleSettings) {
        if let Err(e) = self.indicator.fill(Rgb::RED) {
            warn!("Unable to set indicator: {}", e);
        }
        let text = err.screen(&settings.ssid, settings.restart_delay.as_secs());
        // the panel may have failed before or after init
        if let Err(e) = self.display.init().and_then(|_| self.display.render_text(&text)) {
            warn!("Unable to show error screen: {}", e);
        }
        info!("Restarting in {} seconds", settings.restart_delay.as_secs());
        self.platform.pause(settings.restart_delay).await;
        if let Err(e) = self.display.release() {
            warn!("Unable to release display: {}", e);
        }
    }
}

/// Run one wake cycle and, on failure, show the error and wait out the
/// restart delay.
pub async fn run_supervised<P: Platform, F: FeedSource>(
    dev: &mut DeviceContext<P>,
    feed: &mut F,
    settings: &CycleSettings,
) -> Result<WakeReason, FailureKind> {
    match dev.run_cycle(feed, settings).await {
        Ok(reason) => Ok(reason),
        Err(e) => {
            let kind = e.kind();
            error!("Wake cycle failed ({:?}): {}", kind, e);
            dev.recover(&e, settings).await;
            Err(kind)
        }
    }
}

/// Counts wake cycles and failed cycles in a row.
#[derive(Debug, Default)]
pub struct RestartLog {
    pub cycles: u64,
    pub consecutive_failures: u32,
    pub last_failure: Option<FailureKind>,
}

impl RestartLog {
    /// Record how a cycle ended. Returns the failures in a row so far.
    pub fn record(&mut self, outcome: &Result<WakeReason, FailureKind>) -> u32 {
        self.cycles += 1;
        match outcome {
            Ok(reason) => {
                if self.consecutive_failures > 0 {
                    info!("Recovered after {} failed cycle(s)", self.consecutive_failures);
                }
                debug!("Cycle {} ended, woken by {:?}", self.cycles, reason);
                self.consecutive_failures = 0;
            }
            Err(kind) => {
                self.consecutive_failures += 1;
                self.last_failure = Some(*kind);
                warn!(
                    "Cycle {} failed ({:?}), {} failure(s) in a row",
                    self.cycles, kind, self.consecutive_failures
                );
            }
        }
        self.consecutive_failures
    }
}

/// Wake cycles back to back, forever.
pub async fn run_forever<P: Platform, F: FeedSource>(
    dev: &mut DeviceContext<P>,
    feed: &mut F,
    settings: &CycleSettings,
) {
    let mut restarts = RestartLog::default();
    loop {
        info!("Wake cycle {}", restarts.cycles + 1);
        let outcome = run_supervised(dev, feed, settings).await;
        restarts.record(&outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_kinds() {
        let connect = CycleError::Connect { ssid: "lodge".into(), source: DeviceError::Network("down".into()) };
        assert_eq!(connect.kind(), FailureKind::Connectivity);
        assert_eq!(
            connect.screen("lodge", 10),
            "\nError connecting to\nlodge.\nRestarting in 10 seconds."
        );

        let http = CycleError::Feed(FeedError::Unreachable("timeout".into()));
        assert_eq!(http.kind(), FailureKind::Connectivity);
        assert!(http.screen("lodge", 10).contains("Error obtaining the\nweather."));

        let shape = CycleError::Feed(FeedError::Missing("OperatingStatus".into()));
        assert_eq!(shape.kind(), FailureKind::FeedShape);
        assert!(shape.screen("lodge", 10).contains("Error obtaining the\nweather."));
    }

    #[test]
    fn test_settings_from_config() {
        let settings = CycleSettings::default();
        assert_eq!(settings.tick, Duration::from_millis(10));
        assert_eq!(settings.wake_after, Duration::from_secs(3600));
        assert_eq!(settings.restart_delay, Duration::from_secs(10));
        assert_eq!(settings.policy, FetchPolicy::PerCycle);
        assert_eq!(settings.place_name, "Village");
        assert_eq!(settings.controller.countdown_ticks, 1500);
    }

    #[test]
    fn test_shape_error_from_snapshot() {
        let feed = RawFeed::new(json!({"Forecast": {}}));
        let err: CycleError = WeatherSnapshot::build(&feed, Selection::default()).unwrap_err().into();
        assert_eq!(err.kind(), FailureKind::FeedShape);
    }

    #[test]
    fn test_restart_log_counts_failures_in_a_row() {
        let mut restarts = RestartLog::default();
        assert_eq!(restarts.record(&Err(FailureKind::Connectivity)), 1);
        assert_eq!(restarts.record(&Err(FailureKind::FeedShape)), 2);
        assert_eq!(restarts.last_failure, Some(FailureKind::FeedShape));
        assert_eq!(restarts.record(&Ok(WakeReason::Timer)), 0);
        assert_eq!(restarts.record(&Err(FailureKind::Connectivity)), 1);
        assert_eq!(restarts.cycles, 4);
        assert_eq!(restarts.last_failure, Some(FailureKind::Connectivity));
    }
}
