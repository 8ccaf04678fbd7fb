//! Reconnect supervision around `connect + run`.
//!
//! The ingest layer deliberately has no retry logic: a failed connection is
//! reported once and a closed session stays closed.  Viewers that want to
//! survive feeder restarts wrap the pair here:
//!
//! ```text
//!        ┌──────────── ReconnectPolicy::Every(d) ─────────────┐
//!        ▼                                                    │
//!   connect ──ok──▶ run(session, &mut sink) ──closed──▶ sleep(d)
//!      │                                                      ▲
//!      └──────────────────── err ─────────────────────────────┘
//! ```
//!
//! The same sink is reused across sessions, so display state survives a
//! reconnect.  A [`Shutdown`] trigger ends the loop at any point: a pending
//! connect is abandoned, an open session is closed locally, a pending sleep
//! is cut short.

use std::sync::Arc;
use std::time::Duration;

use mow_core::{run, Connector, Endpoint, PayloadSink, TransportKind, TransportSession};
use tokio::sync::watch;
use tracing::{error, info};

/// What to do after a connection attempt fails or a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Run once and return.
    Never,
    /// Wait the given interval, then connect again.
    Every(Duration),
}

impl ReconnectPolicy {
    /// `None` or zero means [`ReconnectPolicy::Never`].
    pub fn from_interval_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(secs) if secs > 0 => Self::Every(Duration::from_secs(secs)),
            _ => Self::Never,
        }
    }
}

/// A cloneable, one-way shutdown trigger.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`trigger`](Self::trigger) has been called.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The sender is kept alive by `self`.
        let _ = rx.wait_for(|triggered| *triggered).await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Totals across every session a supervisor ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuperviseReport {
    /// Sessions that reached `Open`.
    pub sessions: u32,
    /// Connection attempts that failed.
    pub failures: u32,
    /// Units delivered across all sessions.
    pub units: u64,
}

/// Connects and runs sessions according to `policy` until it says stop or
/// `shutdown` is triggered.
pub async fn supervise<C, S>(
    transport: &TransportSession<C>,
    endpoint: &Endpoint,
    kind: TransportKind,
    mut sink: S,
    policy: ReconnectPolicy,
    shutdown: &Shutdown,
) -> SuperviseReport
where
    C: Connector,
    S: PayloadSink,
{
    let feed = transport.feed();
    let mut report = SuperviseReport::default();

    while !shutdown.is_triggered() {
        let attempt = tokio::select! {
            attempt = transport.connect(endpoint, kind) => attempt,
            _ = shutdown.wait() => break,
        };

        match attempt {
            Ok(session) => {
                report.sessions += 1;
                let handle = session.handle();
                let reading = run(session, &mut sink);
                tokio::pin!(reading);
                let summary = tokio::select! {
                    summary = &mut reading => summary,
                    _ = shutdown.wait() => {
                        handle.close();
                        reading.await
                    }
                };
                report.units += summary.units;
            }
            Err(e) => {
                report.failures += 1;
                error!("{feed} feed over {kind}: {e}");
            }
        }

        let ReconnectPolicy::Every(interval) = policy else {
            break;
        };
        if shutdown.is_triggered() {
            break;
        }
        info!("{feed} feed: reconnecting in {interval:?}");
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.wait() => break,
        }
    }

    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────
