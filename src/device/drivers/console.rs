/*
 *  device/drivers/console.rs
 *
 *  PowMon - fresh tracks, fresh data
 *  (c) 2023-26 Stuart Hunter
 *
 *  Host drivers - keyboard buttons, logged indicator, host network
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

use local_ip_address::local_ip;
use log::{debug, info, warn};
use reqwest::Url;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::device::error::{DeviceError, DeviceResult};
use crate::device::traits::{ButtonReader, Indicator, Platform, Rgb, WakeAlarm, WakeReason};
use crate::selection::{Button, ButtonLevels};

/// Map a typed key to a tag button. The MagTag labels (a/b/c/d) work too.
pub fn parse_key(ch: char) -> Option<Button> {
    match ch.to_ascii_lowercase() {
        'l' | 'a' => Some(Button::Left),
        'u' | 'b' => Some(Button::Up),
        'd' | 'c' => Some(Button::Down),
        'w' | 'r' => Some(Button::Wake),
        _ => None,
    }
}

/// Buttons fed from stdin; each typed key is one press followed by a
/// release on the next sample.
#[derive(Debug)]
pub struct ConsoleButtons {
    rx: UnboundedReceiver<Button>,
    held: bool,
}

impl ConsoleButtons {
    pub fn from_receiver(rx: UnboundedReceiver<Button>) -> Self {
        Self { rx, held: false }
    }

    /// Spawn the stdin reader on the current tokio runtime.
    pub fn spawn_stdin() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                for button in line.chars().filter_map(parse_key) {
                    if tx.send(button).is_err() {
                        return;
                    }
                }
            }
            debug!("stdin closed, keyboard buttons disabled");
        });
        Self::from_receiver(rx)
    }
}

impl ButtonReader for ConsoleButtons {
    fn read(&mut self) -> ButtonLevels {
        if self.held {
            self.held = false;
            return ButtonLevels::default();
        }
        match self.rx.try_recv() {
            Ok(button) => {
                self.held = true;
                ButtonLevels::pressed(button)
            }
            Err(_) => ButtonLevels::default(),
        }
    }
}

/// Indicator that reports colour and brightness changes to the log.
#[derive(Debug, Default)]
pub struct ConsoleIndicator {
    color: Option<Rgb>,
    level: f32,
}

impl Indicator for ConsoleIndicator {
    fn fill(&mut self, color: Rgb) -> DeviceResult {
        if self.color != Some(color) {
            info!("LED {}", color);
            self.color = Some(color);
        }
        Ok(())
    }

    fn set_brightness(&mut self, level: f32) -> DeviceResult {
        let level = level.clamp(0.0, 1.0);
        if (level - self.level).abs() > f32::EPSILON {
            debug!("LED brightness {:.2}", level);
            self.level = level;
        }
        Ok(())
    }

    fn off(&mut self) -> DeviceResult {
        info!("LED off");
        self.color = None;
        self.level = 0.0;
        Ok(())
    }
}

/// Host "radio": the network is already up, so association is a DNS
/// lookup of the feed host. Deep sleep is a timed wait.
#[derive(Debug)]
pub struct HostPlatform {
    feed_host: Option<String>,
}

impl HostPlatform {
    pub fn new(feed_url: &str) -> Self {
        let feed_host = Url::parse(feed_url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string));
        Self { feed_host }
    }

    /// No lookup; used when the feed is read from disk.
    pub fn offline() -> Self {
        Self { feed_host: None }
    }
}

impl Platform for HostPlatform {
    async fn connect(&mut self, ssid: &str, _password: &str) -> Result<(), DeviceError> {
        if ssid.is_empty() {
            debug!("No SSID configured, using host network");
        }
        if let Some(host) = self.feed_host.as_deref() {
            let mut addrs = tokio::net::lookup_host((host, 443))
                .await
                .map_err(|e| DeviceError::Network(format!("{host}: {e}")))?;
            if addrs.next().is_none() {
                return Err(DeviceError::Network(format!("{host}: no addresses")));
            }
        }
        match local_ip() {
            Ok(ip) => info!("Successfully connected to {}. IP address: {}", ssid, ip),
            Err(e) => warn!("Connected to {} but local IP unknown: {}", ssid, e),
        }
        Ok(())
    }

    async fn deep_sleep(&mut self, alarm: WakeAlarm, buttons: &mut dyn ButtonReader) -> WakeReason {
        info!("Sleeping for up to {:?}, press wake to resume", alarm.after);
        wait_for_wake(alarm, buttons).await
    }

    async fn pause(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Sample the wake button until it is pressed or the alarm timer fires.
pub async fn wait_for_wake(alarm: WakeAlarm, buttons: &mut dyn ButtonReader) -> WakeReason {
    let timer = tokio::time::sleep(alarm.after);
    tokio::pin!(timer);
    let mut poll = tokio::time::interval(alarm.poll.max(Duration::from_millis(1)));
    loop {
        tokio::select! {
            _ = &mut timer => return WakeReason::Timer,
            _ = poll.tick() => {
                if buttons.read().wake {
                    return WakeReason::Button;
                }
            }
        }
    }
}
