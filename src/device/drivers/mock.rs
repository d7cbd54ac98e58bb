/*
 *  device/drivers/mock.rs
 *
 *  PowMon - fresh tracks, fresh data
 *  (c) 2023-26 Stuart Hunter
 *
 *  Mock devices for testing - record everything, touch nothing
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

use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::device::error::{DeviceError, DeviceResult};
use crate::device::traits::{ButtonReader, Indicator, Platform, Rgb, TextDisplay, WakeAlarm, WakeReason};
use crate::feed::{FeedError, FeedSource, RawFeed};
use crate::selection::{Button, ButtonLevels};

/// Everything the mocks saw, in call order.
#[derive(Debug, Clone, Default)]
pub struct MockState {
    pub renders: Vec<String>,
    pub colors: Vec<Rgb>,
    /// brightness changes only
    pub brightness: Vec<f32>,
    pub led_off: usize,
    pub inits: usize,
    pub releases: usize,
    pub connects: Vec<String>,
    pub pauses: Vec<Duration>,
    pub sleeps: Vec<WakeAlarm>,
    pub fetches: usize,
    /// the next this-many connect attempts fail
    pub connect_failures: usize,
}

impl MockState {
    pub fn last_render(&self) -> Option<&str> {
        self.renders.last().map(String::as_str)
    }

    pub fn rendered(&self, needle: &str) -> bool {
        self.renders.iter().any(|r| r.contains(needle))
    }
}

pub type SharedState = Arc<Mutex<MockState>>;

fn lock(state: &SharedState) -> MutexGuard<'_, MockState> {
    // a panicking test thread must not hide the recording from the others
    state.lock().unwrap_or_else(|p| p.into_inner())
}

/// Hands out mocks that share one recording.
#[derive(Debug, Clone, Default)]
pub struct MockRig {
    state: SharedState,
}

impl MockRig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the recording so far
    pub fn state(&self) -> MockState {
        lock(&self.state).clone()
    }

    pub fn fail_connects(&self, attempts: usize) {
        lock(&self.state).connect_failures = attempts;
    }

    pub fn display(&self) -> MockDisplay {
        MockDisplay { state: self.state.clone(), initialized: false }
    }

    pub fn indicator(&self) -> MockIndicator {
        MockIndicator { state: self.state.clone(), level: None }
    }

    pub fn platform(&self) -> MockPlatform {
        MockPlatform { state: self.state.clone(), wake: WakeReason::Timer }
    }

    pub fn feed(&self, document: Value) -> StaticFeed {
        StaticFeed { state: self.state.clone(), queued: VecDeque::new(), document: Some(document) }
    }
}

#[derive(Debug)]
pub struct MockDisplay {
    state: SharedState,
    initialized: bool,
}

impl TextDisplay for MockDisplay {
    fn init(&mut self) -> DeviceResult {
        lock(&self.state).inits += 1;
        self.initialized = true;
        Ok(())
    }

    fn render_text(&mut self, text: &str) -> DeviceResult {
        if !self.initialized {
            return Err(DeviceError::NotInitialized);
        }
        lock(&self.state).renders.push(text.to_string());
        Ok(())
    }

    fn release(&mut self) -> DeviceResult {
        lock(&self.state).releases += 1;
        self.initialized = false;
        Ok(())
    }
}

#[derive(Debug)]
pub struct MockIndicator {
    state: SharedState,
    level: Option<f32>,
}

impl Indicator for MockIndicator {
    fn fill(&mut self, color: Rgb) -> DeviceResult {
        lock(&self.state).colors.push(color);
        Ok(())
    }

    fn set_brightness(&mut self, level: f32) -> DeviceResult {
        if self.level != Some(level) {
            self.level = Some(level);
            lock(&self.state).brightness.push(level);
        }
        Ok(())
    }

    fn off(&mut self) -> DeviceResult {
        self.level = None;
        lock(&self.state).led_off += 1;
        Ok(())
    }
}

/// Platform that never blocks: pauses and sleeps are recorded and
/// return at once.
#[derive(Debug)]
pub struct MockPlatform {
    state: SharedState,
    wake: WakeReason,
}

impl MockPlatform {
    pub fn waking_by(mut self, reason: WakeReason) -> Self {
        self.wake = reason;
        self
    }
}

impl Platform for MockPlatform {
    async fn connect(&mut self, ssid: &str, _password: &str) -> Result<(), DeviceError> {
        let mut state = lock(&self.state);
        state.connects.push(ssid.to_string());
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(DeviceError::Network(format!("{ssid} not found")));
        }
        Ok(())
    }

    async fn deep_sleep(&mut self, alarm: WakeAlarm, _buttons: &mut dyn ButtonReader) -> WakeReason {
        lock(&self.state).sleeps.push(alarm);
        self.wake
    }

    async fn pause(&mut self, duration: Duration) {
        lock(&self.state).pauses.push(duration);
    }
}

/// Button levels for successive ticks.
#[derive(Debug, Clone, Default)]
pub struct ButtonScript {
    frames: Vec<ButtonLevels>,
}

impl ButtonScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// nothing pressed for `ticks`
    pub fn idle(mut self, ticks: usize) -> Self {
        self.frames.extend(std::iter::repeat_n(ButtonLevels::default(), ticks));
        self
    }

    /// one tick down, one tick up
    pub fn press(self, button: Button) -> Self {
        self.hold(button, 1).idle(1)
    }

    pub fn hold(mut self, button: Button, ticks: usize) -> Self {
        self.frames.extend(std::iter::repeat_n(ButtonLevels::pressed(button), ticks));
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Replays a script, then reports everything released.
#[derive(Debug)]
pub struct ScriptedButtons {
    frames: VecDeque<ButtonLevels>,
}

impl ScriptedButtons {
    pub fn new(script: ButtonScript) -> Self {
        Self { frames: script.frames.into() }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl ButtonReader for ScriptedButtons {
    fn read(&mut self) -> ButtonLevels {
        self.frames.pop_front().unwrap_or_default()
    }
}

/// Feed that serves a fixed document, after any queued failures.
#[derive(Debug)]
pub struct StaticFeed {
    state: SharedState,
    queued: VecDeque<Result<Value, String>>,
    document: Option<Value>,
}

impl StaticFeed {
    /// Queue a transport failure for the next fetch
    pub fn then_fail(mut self, reason: &str) -> Self {
        self.queued.push_back(Err(reason.to_string()));
        self
    }

    /// Queue a one-off document for the next fetch
    pub fn then_serve(mut self, document: Value) -> Self {
        self.queued.push_back(Ok(document));
        self
    }
}

impl FeedSource for StaticFeed {
    async fn fetch(&mut self) -> Result<RawFeed, FeedError> {
        lock(&self.state).fetches += 1;
        match self.queued.pop_front() {
            Some(Ok(doc)) => Ok(RawFeed::new(doc)),
            Some(Err(reason)) => Err(FeedError::Unreachable(reason)),
            None => self
                .document
                .clone()
                .map(RawFeed::new)
                .ok_or_else(|| FeedError::Unreachable("no document".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_records_renders() {
        let rig = MockRig::new();
        let mut display = rig.display();
        assert!(display.render_text("early").is_err());
        display.init().unwrap();
        display.render_text("one").unwrap();
        display.render_text("two").unwrap();
        display.release().unwrap();

        let state = rig.state();
        assert_eq!(state.renders, vec!["one", "two"]);
        assert_eq!(state.inits, 1);
        assert_eq!(state.releases, 1);
        assert_eq!(state.last_render(), Some("two"));
    }

    #[test]
    fn test_indicator_records_changes() {
        let rig = MockRig::new();
        let mut led = rig.indicator();
        led.fill(Rgb::BLUE).unwrap();
        led.set_brightness(0.1).unwrap();
        led.set_brightness(0.1).unwrap();
        led.set_brightness(0.3).unwrap();
        led.off().unwrap();
        let state = rig.state();
        assert_eq!(state.colors, vec![Rgb::BLUE]);
        assert_eq!(state.brightness, vec![0.1, 0.3]);
        assert_eq!(state.led_off, 1);
    }

    #[test]
    fn test_button_script() {
        let script = ButtonScript::new().idle(2).press(Button::Up).hold(Button::Left, 2);
        assert_eq!(script.len(), 6);
        let mut buttons = ScriptedButtons::new(script);
        assert!(!buttons.read().any());
        assert!(!buttons.read().any());
        assert!(buttons.read().up);
        assert!(!buttons.read().any());
        assert!(buttons.read().left);
        assert!(buttons.read().left);
        assert_eq!(buttons.remaining(), 0);
        assert!(!buttons.read().any());
    }

    #[tokio::test]
    async fn test_static_feed_queue() {
        let rig = MockRig::new();
        let mut feed = rig
            .feed(json!({"OperatingStatus": "Open"}))
            .then_fail("timeout")
            .then_serve(json!({"OperatingStatus": "Closed"}));

        assert!(matches!(feed.fetch().await, Err(FeedError::Unreachable(_))));
        assert_eq!(feed.fetch().await.unwrap().text("OperatingStatus").unwrap(), "Closed");
        assert_eq!(feed.fetch().await.unwrap().text("OperatingStatus").unwrap(), "Open");
        assert_eq!(rig.state().fetches, 3);
    }

    #[tokio::test]
    async fn test_platform_connect_failures() {
        let rig = MockRig::new();
        rig.fail_connects(1);
        let mut platform = rig.platform();
        assert!(platform.connect("lodge", "pw").await.is_err());
        assert!(platform.connect("lodge", "pw").await.is_ok());
        platform.pause(Duration::from_secs(10)).await;
        let state = rig.state();
        assert_eq!(state.connects, vec!["lodge", "lodge"]);
        assert_eq!(state.pauses, vec![Duration::from_secs(10)]);
    }
}
