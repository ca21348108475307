//! Termination signal sources
//!
//! The orchestrator selects on a [`Signals`] source next to resource
//! completions. Besides the OS source, a channel source lets callers (and
//! tests) deliver signals programmatically.

use tokio::sync::mpsc;

/// SIGINT
pub const SIGINT: i32 = 2;

/// SIGTERM
pub const SIGTERM: i32 = 15;

/// A stream of termination signal numbers
#[derive(Debug)]
pub struct Signals {
    source: Source,
}

#[derive(Debug)]
enum Source {
    #[cfg(unix)]
    Os {
        interrupt: tokio::signal::unix::Signal,
        terminate: tokio::signal::unix::Signal,
    },
    #[cfg(not(unix))]
    CtrlC,
    Channel(mpsc::UnboundedReceiver<i32>),
    Never,
}

/// Sending half of [`Signals::channel`]
#[derive(Debug, Clone)]
pub struct SignalSender {
    tx: mpsc::UnboundedSender<i32>,
}

impl SignalSender {
    /// Deliver `signal`; a no-op once the receiving side is gone
    pub fn send(&self, signal: i32) {
        let _ = self.tx.send(signal);
    }
}

impl Signals {
    /// SIGINT and SIGTERM from the operating system
    ///
    /// Must be called from within a tokio runtime.
    #[cfg(unix)]
    pub fn os() -> std::io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        Ok(Self {
            source: Source::Os {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            },
        })
    }

    /// Ctrl-C from the console, reported as SIGINT
    #[cfg(not(unix))]
    pub fn os() -> std::io::Result<Self> {
        Ok(Self {
            source: Source::CtrlC,
        })
    }

    /// Signals delivered through the returned sender
    pub fn channel() -> (SignalSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let signals = Self {
            source: Source::Channel(rx),
        };
        (SignalSender { tx }, signals)
    }

    /// A source that never fires
    pub fn never() -> Self {
        Self {
            source: Source::Never,
        }
    }

    /// Wait for the next signal
    ///
    /// Pends forever once the source is exhausted, so it is safe to poll
    /// in a `select!` loop.
    pub async fn recv(&mut self) -> i32 {
        let received = match &mut self.source {
            #[cfg(unix)]
            Source::Os {
                interrupt,
                terminate,
            } => {
                tokio::select! {
                    Some(()) = interrupt.recv() => Some(SIGINT),
                    Some(()) = terminate.recv() => Some(SIGTERM),
                    else => None,
                }
            }
            #[cfg(not(unix))]
            Source::CtrlC => tokio::signal::ctrl_c().await.ok().map(|()| SIGINT),
            Source::Channel(rx) => rx.recv().await,
            Source::Never => None,
        };
        match received {
            Some(signal) => {
                tracing::info!(signal, "Received termination signal");
                signal
            }
            None => std::future::pending().await,
        }
    }
}
