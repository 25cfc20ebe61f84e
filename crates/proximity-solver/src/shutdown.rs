//! Cooperative shutdown.
//!
//! Loops check [`Shutdown::is_triggered`] at the top of each iteration and
//! before each push, and wake from idle waits through [`Shutdown::wait`].
//! The first SIGINT/SIGTERM triggers shutdown; a second one exits at once.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Shared shutdown flag. Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Returns `true` if it was already requested.
    pub fn trigger(&self) -> bool {
        self.tx.send_replace(true)
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once shutdown has been requested.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep for `duration`, returning early on shutdown.
pub async fn idle(shutdown: &Shutdown, duration: std::time::Duration) {
    tokio::select! {
        _ = shutdown.wait() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}

/// Listen for SIGINT/SIGTERM for the lifetime of the process.
///
/// The listeners are installed before this returns, so a signal sent
/// afterwards is never missed. Must be called from within the runtime.
pub fn spawn_signal_handler(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    let mut signals = Signals::install()?;
    Ok(tokio::spawn(async move {
        loop {
            if !signals.recv().await {
                error!("Shutdown signal listener closed");
                return;
            }
            info!("Exiting...");
            if shutdown.trigger() {
                std::process::exit(0);
            }
        }
    }))
}

/// Signal streams that request shutdown, registered once.
#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Wait for the next signal. `false` once the streams are closed.
    async fn recv(&mut self) -> bool {
        tokio::select! {
            sig = self.interrupt.recv() => sig.is_some(),
            sig = self.terminate.recv() => sig.is_some(),
        }
    }
}

#[cfg(not(unix))]
struct Signals {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(not(unix))]
impl Signals {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) -> bool {
        self.ctrl_c.recv().await.is_some()
    }
}
