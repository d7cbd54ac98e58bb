/*
 *  feed.rs
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
use chrono::{DateTime, Local};
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use reqwest::{Client, header};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;

/// Errors raised while downloading or reading the resort feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Missing feed data: {0}")]
    Missing(String),
    #[error("Unparsable feed value at {path}: {value}")]
    Unparsable { path: String, value: String },
    #[error("Feed unreachable: {0}")]
    Unreachable(String),
}

impl FeedError {
    /// True for transport failures, false when the document was fetched but
    /// did not have the expected shape.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, FeedError::Http(_) | FeedError::Json(_) | FeedError::Unreachable(_))
    }
}

/// The resort document as downloaded, held for the rest of the wake cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFeed {
    root: Value,
    pub fetched_at: DateTime<Local>,
}

impl RawFeed {
    pub fn new(root: Value) -> Self {
        Self { root, fetched_at: Local::now() }
    }

    pub fn from_json(text: &str) -> Result<Self, FeedError> {
        let root: Value = serde_json::from_str(text)?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Time since the document was downloaded or read.
    pub fn age(&self) -> chrono::Duration {
        Local::now() - self.fetched_at
    }

    /// Walk a dotted key path, e.g. `CurrentConditions.Base.TemperatureC`.
    pub fn get(&self, path: &str) -> Result<&Value, FeedError> {
        let mut node = &self.root;
        for key in path.split('.') {
            node = node.get(key).ok_or_else(|| FeedError::Missing(path.to_string()))?;
        }
        if node.is_null() {
            return Err(FeedError::Missing(path.to_string()));
        }
        Ok(node)
    }

    /// Numeric leaf; the feed mixes JSON numbers and numeric strings.
    pub fn number(&self, path: &str) -> Result<f64, FeedError> {
        let v = self.get(path)?;
        let parsed = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .filter(|n| n.is_finite())
            .ok_or_else(|| FeedError::Unparsable { path: path.to_string(), value: v.to_string() })
    }

    /// Non-negative whole count, e.g. open trails.
    pub fn count(&self, path: &str) -> Result<u32, FeedError> {
        let n = self.number(path)?;
        if n < 0.0 || n.fract() != 0.0 || n > u32::MAX as f64 {
            return Err(FeedError::Unparsable { path: path.to_string(), value: n.to_string() });
        }
        Ok(n as u32)
    }

    /// Text leaf. Numbers are rendered the way they appear in the document.
    pub fn text(&self, path: &str) -> Result<String, FeedError> {
        match self.get(path)? {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(FeedError::Unparsable { path: path.to_string(), value: other.to_string() }),
        }
    }
}

/// Anything that can produce the resort document.
#[allow(async_fn_in_trait)]
pub trait FeedSource {
    async fn fetch(&mut self) -> Result<RawFeed, FeedError>;
}

/// HTTPS client for the resort feed.
#[derive(Debug)]
pub struct FeedClient {
    url: String,
    client: Client,
    max_retries: u8,
}

impl FeedClient {
    pub fn new(cfg: &Config) -> Result<Self, FeedError> {
        const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

        let feed = cfg.feed.clone().unwrap_or_default();

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(VERSION));
        headers.insert("Accept", header::HeaderValue::from_static("application/json"));
        headers.insert("Accept-Encoding", header::HeaderValue::from_static("deflate, gzip"));
        headers.insert("Connection", header::HeaderValue::from_static("close"));

        let client = Client::builder()
            .connect_timeout(Duration::from_millis(feed.connect_timeout_ms.unwrap_or(5_000)))
            .default_headers(headers)
            .timeout(Duration::from_millis(feed.timeout_ms.unwrap_or(20_000)))
            .build()?;

        Ok(Self {
            url: cfg.feed_url(),
            client,
            max_retries: feed.max_retries.unwrap_or(0),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// One request plus up to `max_retries` more, a second apart.
    async fn send_with_retries(&self) -> Result<String, reqwest::Error> {
        let mut retries = 0;
        loop {
            let result = match self.client.get(&self.url).send().await.and_then(|r| r.error_for_status()) {
                Ok(response) => response.bytes().await,
                Err(e) => Err(e),
            };
            match result {
                Ok(raw) => return Ok(decode_body(&raw)),
                Err(e) => {
                    if retries >= self.max_retries {
                        return Err(e);
                    }
                    retries += 1;
                    warn!("Feed request failed ({}), retry {}/{}", e, retries, self.max_retries);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

impl FeedSource for FeedClient {
    async fn fetch(&mut self) -> Result<RawFeed, FeedError> {
        info!("Fetching resort feed {}", self.url);
        let plain = self.send_with_retries().await?;
        debug!("Feed payload {} bytes", plain.len());
        let feed = RawFeed::from_json(&plain)?;
        info!("Resort feed fetched successfully.");
        Ok(feed)
    }
}

/// Feed read from a saved document, for running without the network.
#[derive(Debug, Clone)]
pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedSource for FileFeed {
    async fn fetch(&mut self) -> Result<RawFeed, FeedError> {
        info!("Reading resort feed from {}", self.path.display());
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| FeedError::Unreachable(format!("{}: {}", self.path.display(), e)))?;
        RawFeed::from_json(&decode_body(&raw))
    }
}

/// Try to decode as gzip first, fall back to plain text if it fails.
fn decode_body(raw: &[u8]) -> String {
    let mut decoder = GzDecoder::new(raw);
    let mut decoded = String::new();
    match decoder.read_to_string(&mut decoded) {
        Ok(_) => decoded,
        Err(_) => String::from_utf8_lossy(raw).to_string(),
    }
}
