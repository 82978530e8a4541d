//! Shutdown coordination.
//!
//! The main task blocks in [`wait_for_signal`] while the server runs on its
//! own task. When a termination signal arrives, main calls
//! [`ShutdownController::shutdown`] and every [`ShutdownSignal`] holder sees it.

use tokio::sync::watch;
use tracing::{error, info};

/// Receiving half of the shutdown channel. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolves once shutdown was requested. Also resolves if the controller
    /// was dropped.
    pub async fn wait(&mut self) {
        while !*self.receiver.borrow_and_update() {
            if self.receiver.changed().await.is_err() {
                break;
            }
        }
    }

    /// Owned variant of [`wait`](ShutdownSignal::wait), handy for passing to
    /// [`Server::serve`](crate::Server::serve).
    pub async fn recv(mut self) {
        self.wait().await;
    }

    /// Non-blocking check.
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Sending half of the shutdown channel.
#[derive(Debug)]
pub struct ShutdownController {
    sender: watch::Sender<bool>,
}

impl ShutdownController {
    pub fn shutdown(&self) {
        self.sender.send_replace(true);
        info!("shutdown requested");
    }
}

/// Creates a connected controller/signal pair.
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// Resolves on the first termination signal the process receives and returns
/// its name.
///
/// On Unix this listens for **SIGTERM** (sent by the orchestrator) and
/// **SIGINT** (Ctrl-C). Elsewhere only Ctrl-C is available. If a handler
/// cannot be installed the error is logged and that source is ignored.
#[cfg(unix)]
pub async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let sigterm = async {
        match signal(SignalKind::terminate()) {
            Ok(mut s) => { s.recv().await; }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    let sigint = async {
        match signal(SignalKind::interrupt()) {
            Ok(mut s) => { s.recv().await; }
            Err(e) => {
                error!(error = %e, "failed to install SIGINT handler");
                std::future::pending::<()>().await;
            }
        }
    };

    let name = tokio::select! {
        () = sigterm => "SIGTERM",
        () = sigint  => "SIGINT",
    };
    info!(signal = name, "termination signal received");
    name
}

#[cfg(not(unix))]
pub async fn wait_for_signal() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to wait for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!(signal = "CTRL_C", "termination signal received");
    "CTRL_C"
}
