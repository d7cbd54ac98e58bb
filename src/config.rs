/*
 *  config.rs
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
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every group is optional in YAML; the
/// effective values come from the accessor methods which fill defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    pub network: Option<NetworkConfig>,
    pub feed: Option<FeedConfig>,
    pub controller: Option<ControllerConfig>,
    pub sleep: Option<SleepConfig>,
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    pub ssid: Option<String>,
    pub password: Option<String>,
}

/// When the feed is downloaded during a wake cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FetchPolicy {
    /// once per wake, plus manual refresh from the wake button
    #[default]
    PerCycle,
    /// before every page render
    PerRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FeedConfig {
    pub url: Option<String>,
    pub resort_id: Option<u32>,
    pub place_name: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u8>,
    pub policy: Option<FetchPolicy>,
    /// read the document from this file instead of the network
    pub file: Option<PathBuf>,
}

/// One step of the countdown indicator: at or below `ticks` remaining the
/// light runs at `level`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrightnessStep {
    pub ticks: u32,
    pub level: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ControllerConfig {
    pub tick_ms: Option<u64>,
    pub countdown_ticks: Option<u32>,
    pub max_day_offset: Option<u8>,
    pub brightness_steps: Option<Vec<BrightnessStep>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SleepConfig {
    pub wake_after_secs: Option<u64>,
    pub restart_delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// write a PBM of the panel after every render
    pub snapshot: Option<PathBuf>,
}

pub const DEFAULT_FEED_URL: &str = "https://mtnpowder.com/feed";
pub const DEFAULT_RESORT_ID: u32 = 4;
pub const DEFAULT_PLACE_NAME: &str = "Village";
pub const DEFAULT_TICK_MS: u64 = 10;
pub const DEFAULT_COUNTDOWN_TICKS: u32 = 1500;
pub const DEFAULT_MAX_DAY_OFFSET: u8 = 4;
pub const DEFAULT_WAKE_AFTER_SECS: u64 = 3600;
pub const DEFAULT_RESTART_DELAY_SECS: u64 = 10;
// MagTag 2.9" panel
pub const DEFAULT_PANEL_WIDTH: u32 = 296;
pub const DEFAULT_PANEL_HEIGHT: u32 = 128;

pub fn default_brightness_steps() -> Vec<BrightnessStep> {
    [
        (1500, 0.30), (1350, 0.25), (1200, 0.20), (1050, 0.16), (900, 0.12),
        (750, 0.09), (600, 0.06), (450, 0.04), (300, 0.02), (150, 0.01),
    ]
    .into_iter()
    .map(|(ticks, level)| BrightnessStep { ticks, level })
    .collect()
}

impl Config {
    pub fn ssid(&self) -> &str {
        self.network.as_ref().and_then(|n| n.ssid.as_deref()).unwrap_or("")
    }

    pub fn password(&self) -> &str {
        self.network.as_ref().and_then(|n| n.password.as_deref()).unwrap_or("")
    }

    /// Full feed URL including the resort query.
    pub fn feed_url(&self) -> String {
        let feed = self.feed.clone().unwrap_or_default();
        let base = feed.url.unwrap_or_else(|| DEFAULT_FEED_URL.to_string());
        let id = feed.resort_id.unwrap_or(DEFAULT_RESORT_ID);
        if base.contains('?') {
            format!("{base}&resortId={id}")
        } else {
            format!("{base}?resortId={id}")
        }
    }

    pub fn place_name(&self) -> String {
        self.feed.as_ref()
            .and_then(|f| f.place_name.clone())
            .unwrap_or_else(|| DEFAULT_PLACE_NAME.to_string())
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        self.feed.as_ref().and_then(|f| f.policy).unwrap_or_default()
    }

    pub fn feed_file(&self) -> Option<PathBuf> {
        self.feed.as_ref().and_then(|f| f.file.clone())
    }

    pub fn tick_ms(&self) -> u64 {
        self.controller.as_ref().and_then(|c| c.tick_ms).unwrap_or(DEFAULT_TICK_MS)
    }

    pub fn countdown_ticks(&self) -> u32 {
        self.controller.as_ref().and_then(|c| c.countdown_ticks).unwrap_or(DEFAULT_COUNTDOWN_TICKS)
    }

    pub fn max_day_offset(&self) -> u8 {
        self.controller.as_ref().and_then(|c| c.max_day_offset).unwrap_or(DEFAULT_MAX_DAY_OFFSET)
    }

    pub fn brightness_steps(&self) -> Vec<BrightnessStep> {
        self.controller.as_ref()
            .and_then(|c| c.brightness_steps.clone())
            .unwrap_or_else(default_brightness_steps)
    }

    pub fn wake_after_secs(&self) -> u64 {
        self.sleep.as_ref().and_then(|s| s.wake_after_secs).unwrap_or(DEFAULT_WAKE_AFTER_SECS)
    }

    pub fn restart_delay_secs(&self) -> u64 {
        self.sleep.as_ref().and_then(|s| s.restart_delay_secs).unwrap_or(DEFAULT_RESTART_DELAY_SECS)
    }

    pub fn panel_size(&self) -> (u32, u32) {
        let d = self.display.clone().unwrap_or_default();
        (d.width.unwrap_or(DEFAULT_PANEL_WIDTH), d.height.unwrap_or(DEFAULT_PANEL_HEIGHT))
    }
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "PowMon", version, about = "PowMon resort monitor", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short = 'c', long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(short = 'v', long, alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long)]
    pub log_level: Option<String>,
    #[arg(long)]
    pub ssid: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub feed_url: Option<String>,
    #[arg(short = 'R', long)]
    pub resort_id: Option<u32>,
    #[arg(short = 'P', long)]
    pub place_name: Option<String>,
    #[arg(long, value_enum)]
    pub policy: Option<CliPolicy>,
    /// Read the resort feed from a saved JSON document
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub feed_file: Option<PathBuf>,
    #[arg(long)]
    pub tick_ms: Option<u64>,
    #[arg(long)]
    pub countdown_ticks: Option<u32>,
    #[arg(long)]
    pub wake_after_secs: Option<u64>,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub snapshot: Option<PathBuf>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliPolicy {
    PerCycle,
    PerRequest,
}

impl From<CliPolicy> for FetchPolicy {
    fn from(p: CliPolicy) -> Self {
        match p {
            CliPolicy::PerCycle => FetchPolicy::PerCycle,
            CliPolicy::PerRequest => FetchPolicy::PerRequest,
        }
    }
}

/// Read YAML, merge the CLI over it, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/powmon/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/powmon/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/powmon.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["powmon.yaml", "config.yaml", "config/powmon.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

pub fn to_yaml(cfg: &Config) -> Result<String, ConfigError> {
    Ok(serde_yaml::to_string(cfg)?)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
pub fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    match (&mut dst.network, src.network) {
        (None, Some(n)) => dst.network = Some(n),
        (Some(d), Some(s)) => {
            if s.ssid.is_some()     { d.ssid = s.ssid; }
            if s.password.is_some() { d.password = s.password; }
        }
        _ => {}
    }
    match (&mut dst.feed, src.feed) {
        (None, Some(f)) => dst.feed = Some(f),
        (Some(d), Some(s)) => merge_feed(d, s),
        _ => {}
    }
    match (&mut dst.controller, src.controller) {
        (None, Some(c)) => dst.controller = Some(c),
        (Some(d), Some(s)) => {
            if s.tick_ms.is_some()          { d.tick_ms = s.tick_ms; }
            if s.countdown_ticks.is_some()  { d.countdown_ticks = s.countdown_ticks; }
            if s.max_day_offset.is_some()   { d.max_day_offset = s.max_day_offset; }
            if s.brightness_steps.is_some() { d.brightness_steps = s.brightness_steps; }
        }
        _ => {}
    }
    match (&mut dst.sleep, src.sleep) {
        (None, Some(s)) => dst.sleep = Some(s),
        (Some(d), Some(s)) => {
            if s.wake_after_secs.is_some()    { d.wake_after_secs = s.wake_after_secs; }
            if s.restart_delay_secs.is_some() { d.restart_delay_secs = s.restart_delay_secs; }
        }
        _ => {}
    }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => {
            if s.width.is_some()    { d.width = s.width; }
            if s.height.is_some()   { d.height = s.height; }
            if s.snapshot.is_some() { d.snapshot = s.snapshot; }
        }
        _ => {}
    }
}

fn merge_feed(dst: &mut FeedConfig, src: FeedConfig) {
    if src.url.is_some()                { dst.url = src.url; }
    if src.resort_id.is_some()          { dst.resort_id = src.resort_id; }
    if src.place_name.is_some()         { dst.place_name = src.place_name; }
    if src.connect_timeout_ms.is_some() { dst.connect_timeout_ms = src.connect_timeout_ms; }
    if src.timeout_ms.is_some()         { dst.timeout_ms = src.timeout_ms; }
    if src.max_retries.is_some()        { dst.max_retries = src.max_retries; }
    if src.policy.is_some()             { dst.policy = src.policy; }
    if src.file.is_some()               { dst.file = src.file; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }

    if cli.ssid.is_some() || cli.password.is_some() {
        let network = cfg.network.get_or_insert_with(NetworkConfig::default);
        if cli.ssid.is_some()     { network.ssid = cli.ssid.clone(); }
        if cli.password.is_some() { network.password = cli.password.clone(); }
    }

    let any_feed = cli.feed_url.is_some()
        || cli.resort_id.is_some()
        || cli.place_name.is_some()
        || cli.policy.is_some()
        || cli.feed_file.is_some();
    if any_feed {
        let feed = cfg.feed.get_or_insert_with(FeedConfig::default);
        if cli.feed_url.is_some()   { feed.url = cli.feed_url.clone(); }
        if cli.resort_id.is_some()  { feed.resort_id = cli.resort_id; }
        if cli.place_name.is_some() { feed.place_name = cli.place_name.clone(); }
        if let Some(p) = cli.policy { feed.policy = Some(p.into()); }
        if cli.feed_file.is_some()  { feed.file = cli.feed_file.clone(); }
    }

    if cli.tick_ms.is_some() || cli.countdown_ticks.is_some() {
        let controller = cfg.controller.get_or_insert_with(ControllerConfig::default);
        if cli.tick_ms.is_some()         { controller.tick_ms = cli.tick_ms; }
        if cli.countdown_ticks.is_some() { controller.countdown_ticks = cli.countdown_ticks; }
    }

    if cli.wake_after_secs.is_some() {
        cfg.sleep.get_or_insert_with(SleepConfig::default).wake_after_secs = cli.wake_after_secs;
    }

    if cli.snapshot.is_some() {
        cfg.display.get_or_insert_with(DisplayConfig::default).snapshot = cli.snapshot.clone();
    }
}

/// Put any invariants here (required fields, ranges, etc.)
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.tick_ms() == 0 {
        return Err(ConfigError::Validation("controller tick_ms must be > 0".into()));
    }
    if cfg.countdown_ticks() == 0 {
        return Err(ConfigError::Validation("controller countdown_ticks must be > 0".into()));
    }
    if cfg.max_day_offset() > DEFAULT_MAX_DAY_OFFSET {
        return Err(ConfigError::Validation(format!(
            "controller max_day_offset must be 0..={DEFAULT_MAX_DAY_OFFSET} (feed has five days)"
        )));
    }
    let steps = cfg.brightness_steps();
    if steps.is_empty() {
        return Err(ConfigError::Validation("controller brightness_steps must not be empty".into()));
    }
    if steps.windows(2).any(|w| w[0].ticks <= w[1].ticks) {
        return Err(ConfigError::Validation("controller brightness_steps must be strictly descending by ticks".into()));
    }
    if let Some(bad) = steps.iter().find(|s| !(0.0..=1.0).contains(&s.level)) {
        return Err(ConfigError::Validation(format!(
            "brightness level {} at {} ticks must be within 0..=1", bad.level, bad.ticks
        )));
    }
    let (w, h) = cfg.panel_size();
    if w == 0 || h == 0 {
        return Err(ConfigError::Validation("display width/height must be > 0".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.feed_url(), "https://mtnpowder.com/feed?resortId=4");
        assert_eq!(cfg.place_name(), "Village");
        assert_eq!(cfg.tick_ms(), 10);
        assert_eq!(cfg.countdown_ticks(), 1500);
        assert_eq!(cfg.wake_after_secs(), 3600);
        assert_eq!(cfg.restart_delay_secs(), 10);
        assert_eq!(cfg.fetch_policy(), FetchPolicy::PerCycle);
        assert_eq!(cfg.brightness_steps().len(), 10);
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_yaml_and_merge() {
        let yaml = r#"
network:
  ssid: chalet
  password: hunter2
feed:
  resort_id: 7
  policy: per_request
controller:
  tick_ms: 20
"#;
        let mut cfg = Config::default();
        merge(&mut cfg, parse_yaml(yaml).unwrap());
        assert_eq!(cfg.ssid(), "chalet");
        assert_eq!(cfg.password(), "hunter2");
        assert_eq!(cfg.feed_url(), "https://mtnpowder.com/feed?resortId=7");
        assert_eq!(cfg.fetch_policy(), FetchPolicy::PerRequest);
        assert_eq!(cfg.tick_ms(), 20);
        // untouched members keep defaults
        assert_eq!(cfg.countdown_ticks(), 1500);

        // a second layer only replaces what it names
        merge(&mut cfg, parse_yaml("feed:\n  place_name: Summit\n").unwrap());
        assert_eq!(cfg.place_name(), "Summit");
        assert_eq!(cfg.fetch_policy(), FetchPolicy::PerRequest);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut cfg = parse_yaml("feed:\n  resort_id: 7\n").unwrap();
        let cli = Cli {
            resort_id: Some(9),
            ssid: Some("lodge".into()),
            policy: Some(CliPolicy::PerRequest),
            countdown_ticks: Some(300),
            feed_file: Some(PathBuf::from("feed.json")),
            ..Default::default()
        };
        apply_cli_overrides(&mut cfg, &cli);
        assert_eq!(cfg.feed_url(), "https://mtnpowder.com/feed?resortId=9");
        assert_eq!(cfg.ssid(), "lodge");
        assert_eq!(cfg.fetch_policy(), FetchPolicy::PerRequest);
        assert_eq!(cfg.countdown_ticks(), 300);
        assert_eq!(cfg.feed_file(), Some(PathBuf::from("feed.json")));
    }

    #[test]
    fn test_example_config_is_valid() {
        let cfg = parse_yaml(include_str!("../powmon.example.yaml")).unwrap();
        assert!(validate(&cfg).is_ok());
        assert_eq!(cfg.brightness_steps(), default_brightness_steps());
        assert_eq!(cfg.ssid(), "chalet-guest");
        assert_eq!(cfg.feed_file(), None);
    }

    #[test]
    fn test_dump_round_trips() {
        let cfg = parse_yaml("feed:\n  policy: per_request\n").unwrap();
        let again = parse_yaml(&to_yaml(&cfg).unwrap()).unwrap();
        assert_eq!(again.fetch_policy(), FetchPolicy::PerRequest);
    }

    #[test]
    fn test_feed_url_with_existing_query() {
        let cfg = parse_yaml("feed:\n  url: https://example.test/feed?format=json\n  resort_id: 2\n").unwrap();
        assert_eq!(cfg.feed_url(), "https://example.test/feed?format=json&resortId=2");
    }

    #[test]
    fn test_validation_rejects_bad_steps() {
        let cfg = parse_yaml(
            "controller:\n  brightness_steps:\n    - {ticks: 100, level: 0.1}\n    - {ticks: 200, level: 0.2}\n",
        ).unwrap();
        assert!(matches!(validate(&cfg), Err(ConfigError::Validation(_))));

        let cfg = parse_yaml("controller:\n  brightness_steps:\n    - {ticks: 100, level: 1.5}\n").unwrap();
        assert!(validate(&cfg).is_err());

        let cfg = parse_yaml("controller:\n  tick_ms: 0\n").unwrap();
        assert!(validate(&cfg).is_err());

        let cfg = parse_yaml("display:\n  width: 0\n").unwrap();
        assert!(validate(&cfg).is_err());
    }

    fn temp_yaml(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("powmon-{}-{}.yaml", name, std::process::id()));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let cli = Cli {
            config: Some(std::env::temp_dir().join("powmon-no-such-config.yaml")),
            ..Default::default()
        };
        match load(&cli) {
            Err(ConfigError::Validation(msg)) => assert!(msg.starts_with("Config file not found")),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_layers_file_then_cli() {
        let path = temp_yaml("layers", "network:\n  ssid: chalet\nfeed:\n  resort_id: 7\n  policy: per_request\n");
        let cli = Cli { config: Some(path.clone()), resort_id: Some(9), ..Default::default() };
        let cfg = load(&cli);
        fs::remove_file(&path).unwrap();

        let cfg = cfg.unwrap();
        assert_eq!(cfg.feed_url(), "https://mtnpowder.com/feed?resortId=9");
        assert_eq!(cfg.ssid(), "chalet");
        assert_eq!(cfg.fetch_policy(), FetchPolicy::PerRequest);
        assert_eq!(cfg.tick_ms(), 10);
    }

    #[test]
    fn test_load_validates_merged_config() {
        let path = temp_yaml("invalid", "controller:\n  tick_ms: 0\n");
        let cli = Cli { config: Some(path.clone()), ..Default::default() };
        let rejected = load(&cli);
        let cli = Cli { config: Some(path.clone()), tick_ms: Some(25), ..Default::default() };
        let fixed = load(&cli);
        fs::remove_file(&path).unwrap();

        assert!(matches!(rejected, Err(ConfigError::Validation(_))));
        assert_eq!(fixed.unwrap().tick_ms(), 25);
    }

    #[test]
    fn test_load_reports_bad_yaml() {
        let path = temp_yaml("broken", "feed: [unterminated\n");
        let cli = Cli { config: Some(path.clone()), ..Default::default() };
        let result = load(&cli);
        fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(ConfigError::Yaml(_))));
    }
}
