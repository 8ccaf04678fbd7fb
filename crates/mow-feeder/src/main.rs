//! Media-Over-Web feeder entry point.
//!
//! Serves one feed (counter or H.264 video) on both transports at once until
//! Ctrl+C is pressed.
//!
//! # Usage
//!
//! ```text
//! mow-feeder [OPTIONS]
//!
//! Options:
//!   --bind <ADDR>                Address for both servers [default: ::]
//!   --webtransport-port <PORT>   WebTransport (UDP) port [default: 4433]
//!   --websocket-port <PORT>      WebSocket (TCP) port [default: 4434]
//!   --feed <FEED>                counter | video [default: counter]
//!   --max-value <N>              Counter feed sends 0..N [default: 1000000]
//!   --video-file <PATH>          Annex-B H.264 file [default: built-in test pattern]
//!   --frame-interval-ms <MS>     Pause between access units [default: 16]
//!   --linger-secs <SECS>         Keep counter sessions open after the last value [default: 3]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                  | Default        |
//! |---------------------------|----------------|
//! | `MOW_BIND`                | `::`           |
//! | `MOW_WEBTRANSPORT_PORT`   | `4433`         |
//! | `MOW_WEBSOCKET_PORT`      | `4434`         |
//! | `MOW_FEED`                | `counter`      |
//! | `MOW_MAX_VALUE`           | `1000000`      |
//! | `MOW_VIDEO_FILE`          | (test pattern) |
//! | `MOW_FRAME_INTERVAL_MS`   | `16`           |
//! | `MOW_LINGER_SECS`         | `3`            |
//!
//! # Architecture overview
//!
//! ```text
//! main()
//!  ├─ Feed::from_config        (groups the video file or builds the test pattern)
//!  ├─ ServerIdentity           (one self-signed certificate)
//!  ├─ serve_webtransport ──▶ per session: datagrams | uni streams
//!  └─ serve_websocket    ──▶ per session: TLS + binary messages
//! ```

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mow_core::domain::{FeedKind, RELIABLE_PORT, UNRELIABLE_PORT};
use mow_feeder::application::Feed;
use mow_feeder::domain::config::{default_certificate_names, DEFAULT_MAX_VALUE};
use mow_feeder::domain::FeederConfig;
use mow_feeder::infrastructure::{
    bind_webtransport, bind_websocket, serve_webtransport, serve_websocket, ServerIdentity,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Media-Over-Web feeder.
///
/// Serves a counter or H.264 feed over WebTransport and WebSocket.
#[derive(Debug, Parser)]
#[command(
    name = "mow-feeder",
    about = "Serves counter and H.264 feeds over WebTransport and WebSocket",
    version
)]
struct Cli {
    /// IP address both servers bind to.
    #[arg(long, default_value = "::", env = "MOW_BIND")]
    bind: String,

    /// UDP port of the WebTransport server.
    #[arg(long, default_value_t = UNRELIABLE_PORT, env = "MOW_WEBTRANSPORT_PORT")]
    webtransport_port: u16,

    /// TCP port of the WebSocket server.
    #[arg(long, default_value_t = RELIABLE_PORT, env = "MOW_WEBSOCKET_PORT")]
    websocket_port: u16,

    /// Feed served to every session: `counter` or `video`.
    #[arg(long, default_value = "counter", env = "MOW_FEED")]
    feed: FeedKind,

    /// Counter feed sends the values `0..max_value`.
    #[arg(long, default_value_t = DEFAULT_MAX_VALUE, env = "MOW_MAX_VALUE")]
    max_value: u64,

    /// Annex-B H.264 file for the video feed; the built-in test pattern is
    /// served when absent.
    #[arg(long, env = "MOW_VIDEO_FILE")]
    video_file: Option<PathBuf>,

    /// Pause between two access units of the video feed.
    #[arg(long, default_value_t = 16, env = "MOW_FRAME_INTERVAL_MS")]
    frame_interval_ms: u64,

    /// Seconds a WebTransport counter session stays open after the last value.
    #[arg(long, default_value_t = 3, env = "MOW_LINGER_SECS")]
    linger_secs: u64,
}

impl Cli {
    /// Converts the parsed CLI arguments into a [`FeederConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if `--bind` is not an IP address.
    fn into_feeder_config(self) -> anyhow::Result<FeederConfig> {
        let bind: IpAddr = self
            .bind
            .parse()
            .with_context(|| format!("invalid bind address: '{}'", self.bind))?;

        Ok(FeederConfig {
            bind,
            webtransport_port: self.webtransport_port,
            websocket_port: self.websocket_port,
            feed: self.feed,
            max_value: self.max_value,
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            video_file: self.video_file,
            linger: Duration::from_secs(self.linger_secs),
            certificate_names: default_certificate_names(),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// # What happens at startup
///
/// 1. Logging is initialised (`RUST_LOG`, default `info`).
/// 2. The CLI is parsed into a [`FeederConfig`] and the feed is prepared.
/// 3. One self-signed certificate is generated for both servers.
/// 4. A Ctrl+C handler clears the shared `running` flag.
/// 5. Both accept loops run until the flag is cleared.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        info!("a rustls crypto provider was already installed");
    }

    let config = Cli::parse().into_feeder_config()?;
    let feed = Arc::new(Feed::from_config(&config).context("preparing feed")?);
    info!(
        "Media-Over-Web feeder starting: feed={} webtransport={} websocket={}",
        feed.kind(),
        config.webtransport_addr(),
        config.websocket_addr()
    );

    let identity = ServerIdentity::self_signed(&config.certificate_names)?;

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // ── Both servers ──────────────────────────────────────────────────────────
    let webtransport =
        bind_webtransport(config.webtransport_addr(), identity.webtransport_identity())?;
    let websocket = bind_websocket(config.websocket_addr()).await?;

    tokio::join!(
        serve_webtransport(
            webtransport,
            Arc::clone(&feed),
            config.linger,
            Arc::clone(&running)
        ),
        serve_websocket(websocket, identity.tls_config(), feed, running),
    );

    info!("Media-Over-Web feeder stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
