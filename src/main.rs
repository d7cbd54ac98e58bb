/*
 *  main.rs
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

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::info;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use powmon::config::{self, Cli};
use powmon::cycle::{self, CycleSettings, DeviceContext};
use powmon::device::drivers::{ConsoleButtons, ConsoleIndicator, HostPlatform};
use powmon::device::{Platform, PanelDisplay};
use powmon::feed::{FeedClient, FeedSource, FileFeed};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Waits for a SIGINT, SIGTERM, or SIGHUP signal and logs which one arrived.
#[cfg(unix)]
async fn signal_handler() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

#[cfg(not(unix))]
async fn signal_handler() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received. Initiating graceful shutdown.");
    Ok(())
}

async fn run_until_signal<P: Platform, F: FeedSource>(
    dev: &mut DeviceContext<P>,
    feed: &mut F,
    settings: &CycleSettings,
) -> anyhow::Result<()> {
    tokio::select! {
        res = signal_handler() => res.context("installing signal handlers")?,
        _ = cycle::run_forever(dev, feed, settings) => {}
    }
    // leave the panel and light dark on the way out
    dev.display.release()?;
    dev.indicator.off()?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli).context("loading configuration")?;

    if cli.dump_config {
        print!("{}", config::to_yaml(&cfg)?);
        return Ok(());
    }

    let level = if cli.debug { "debug" } else { cfg.log_level.as_deref().unwrap_or("info") };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    info!("Fresh tracks, fresh data from {}", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let settings = CycleSettings::from(&cfg);
    let (width, height) = cfg.panel_size();
    let snapshot = cfg.display.as_ref().and_then(|d| d.snapshot.clone());

    let platform = match cfg.feed_file() {
        Some(_) => HostPlatform::offline(),
        None => HostPlatform::new(&cfg.feed_url()),
    };
    let mut dev = DeviceContext::new(
        Box::new(PanelDisplay::new(width, height, snapshot)),
        Box::new(ConsoleIndicator::default()),
        Box::new(ConsoleButtons::spawn_stdin()),
        platform,
    );
    info!("Keys: l = left, u = up, d = down, w = wake/refresh (then Enter)");

    match cfg.feed_file() {
        Some(path) => {
            info!("Offline: resort feed from {}", path.display());
            run_until_signal(&mut dev, &mut FileFeed::new(path), &settings).await
        }
        None => {
            let mut client = FeedClient::new(&cfg).context("building HTTP client")?;
            info!("Resort feed {}", client.url());
            run_until_signal(&mut dev, &mut client, &settings).await
        }
    }
}
