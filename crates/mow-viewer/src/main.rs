//! Media-Over-Web viewer entry point.
//!
//! Loads the configuration, opens one session per configured feed and renders
//! what arrives until every session ends or Ctrl+C is pressed.
//!
//! # Usage
//!
//! ```text
//! mow-viewer [OPTIONS]
//!
//! Options:
//!   --config <PATH>              TOML config file
//!   --host <HOST>                Feeder host [default: localhost]
//!   --transport <KIND>           webtransport | websocket
//!   --feed <FEED>                counter | video (repeatable, comma separated)
//!   --accept-invalid-certs       Trust self-signed feeders
//!   --reconnect-interval <SECS>  Reconnect after failure or closure
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ ViewerConfig::load() + CLI overrides
//!  └─ per feed: tokio::spawn(supervise(...))
//!        └─ TransportSession::connect ─▶ run ─▶ RenderSink
//!                                               ├─ H264Probe
//!                                               └─ ConsoleDisplay
//!  └─ Ctrl+C ─▶ Shutdown::trigger ─▶ every open session is closed
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mow_core::{FeedKind, TransportKind, TransportSession};
use mow_viewer::application::render::RenderSink;
use mow_viewer::application::supervise::{supervise, Shutdown};
use mow_viewer::infrastructure::config::ViewerConfig;
use mow_viewer::infrastructure::connector::NetworkConnector;
use mow_viewer::infrastructure::console_display::ConsoleDisplay;
use mow_viewer::infrastructure::h264_probe::H264Probe;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Media-Over-Web viewer.
///
/// Every flag overrides the matching field of the config file.
#[derive(Debug, Parser)]
#[command(
    name = "mow-viewer",
    about = "Receives counter and H.264 feeds over WebTransport or WebSocket",
    version
)]
struct Cli {
    /// TOML config file.  Defaults apply when omitted.
    #[arg(long, env = "MOW_CONFIG")]
    config: Option<PathBuf>,

    /// Feeder host name or IP literal.
    #[arg(long, env = "MOW_HOST")]
    host: Option<String>,

    /// WebTransport (UDP) port.
    #[arg(long, env = "MOW_UNRELIABLE_PORT")]
    unreliable_port: Option<u16>,

    /// WebSocket (TCP) port.
    #[arg(long, env = "MOW_RELIABLE_PORT")]
    reliable_port: Option<u16>,

    /// Transport for every feed: `webtransport` or `websocket`.
    #[arg(long, env = "MOW_TRANSPORT")]
    transport: Option<TransportKind>,

    /// Feeds to open, one session each.
    #[arg(long = "feed", env = "MOW_FEEDS", value_delimiter = ',')]
    feeds: Vec<FeedKind>,

    /// RFC 6381 codec identifier for the video feed.
    #[arg(long, env = "MOW_CODEC")]
    codec: Option<String>,

    /// Events buffered between the WebSocket and its read loop.
    #[arg(long, env = "MOW_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// Skip server certificate verification.
    #[arg(long, env = "MOW_ACCEPT_INVALID_CERTS")]
    accept_invalid_certs: bool,

    /// Reconnect interval in seconds; sessions run once when unset.
    #[arg(long = "reconnect-interval", env = "MOW_RECONNECT_INTERVAL")]
    reconnect_interval_secs: Option<u64>,

    /// Log every Nth counter value.
    #[arg(long, env = "MOW_COUNTER_LOG_EVERY")]
    counter_log_every: Option<u64>,
}

impl Cli {
    /// Loads the config file (if any) and applies the CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// combined configuration fails validation.
    fn into_viewer_config(self) -> anyhow::Result<ViewerConfig> {
        let mut config = ViewerConfig::load(self.config.as_deref()).with_context(|| {
            format!(
                "loading config {}",
                self.config
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            )
        })?;

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.unreliable_port {
            config.unreliable_port = port;
        }
        if let Some(port) = self.reliable_port {
            config.reliable_port = port;
        }
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if !self.feeds.is_empty() {
            config.feeds = self.feeds;
        }
        if let Some(codec) = self.codec {
            config.codec = codec;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if self.accept_invalid_certs {
            config.accept_invalid_certs = true;
        }
        if self.reconnect_interval_secs.is_some() {
            config.reconnect_interval_secs = self.reconnect_interval_secs;
        }
        if let Some(every) = self.counter_log_every {
            config.counter_log_every = every;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_viewer_config()?;

    // ── Logging setup ─────────────────────────────────────────────────────────
    // `RUST_LOG` wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    // Both rustls users (WebSocket and WebTransport) share one provider.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        info!("a rustls crypto provider was already installed");
    }

    let endpoint = config.endpoint();
    info!(
        "Media-Over-Web viewer starting: {} feeds {:?} via {}",
        endpoint.host,
        config.feeds,
        endpoint.url(config.transport)
    );

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, closing sessions");
                trigger.trigger();
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // ── One supervised session per feed ───────────────────────────────────────
    let connector = NetworkConnector::new(config.accept_invalid_certs, config.queue_capacity);
    let policy = config.reconnect_policy();
    let mut tasks = Vec::with_capacity(config.feeds.len());

    for &feed in &config.feeds {
        let sink = RenderSink::new(
            H264Probe::new(),
            &config.codec,
            ConsoleDisplay::new(feed.as_str(), config.counter_log_every),
        )
        .with_context(|| format!("configuring codec {:?}", config.codec))?;
        let transport = TransportSession::new(connector.clone(), feed);
        let endpoint = endpoint.clone();
        let kind = config.transport;
        let shutdown = shutdown.clone();

        tasks.push(tokio::spawn(async move {
            let report = supervise(&transport, &endpoint, kind, sink, policy, &shutdown).await;
            (feed, report)
        }));
    }

    for task in tasks {
        match task.await {
            Ok((feed, report)) => info!(
                "{feed} feed finished: {} sessions, {} failed attempts, {} units",
                report.sessions, report.failures, report.units
            ),
            Err(e) => error!("feed task panicked: {e}"),
        }
    }

    info!("Media-Over-Web viewer stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
