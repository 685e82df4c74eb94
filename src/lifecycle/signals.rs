//! Termination event sources.
//!
//! # Responsibilities
//! - Subscribe to OS signals (SIGTERM, SIGINT, SIGHUP, SIGQUIT) on demand
//! - Offer an injectable source so shutdown can be triggered without the OS
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Subscription happens when the orchestrator starts waiting, not earlier
//! - A source that cannot fire simply never resolves

use std::fmt;

use futures_util::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// External termination signals the orchestrator can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// SIGINT / Ctrl+C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGHUP.
    Hangup,
    /// SIGQUIT.
    Quit,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signal::Interrupt => "SIGINT",
            Signal::Terminate => "SIGTERM",
            Signal::Hangup => "SIGHUP",
            Signal::Quit => "SIGQUIT",
        };
        f.write_str(name)
    }
}

/// Something that can deliver a one-shot termination notification.
pub trait TerminationSource {
    /// Start listening. The returned future resolves with the first signal
    /// delivered, or never if the source has nothing to deliver.
    fn subscribe(self) -> BoxFuture<'static, Signal>;
}

/// A source that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl TerminationSource for Never {
    fn subscribe(self) -> BoxFuture<'static, Signal> {
        future::pending().boxed()
    }
}

/// OS signal subscription for exactly the given set.
#[derive(Debug, Clone, Default)]
pub struct Signals {
    set: Vec<Signal>,
}

impl Signals {
    pub fn new(signals: impl IntoIterator<Item = Signal>) -> Self {
        let mut set = Vec::new();
        for signal in signals {
            if !set.contains(&signal) {
                set.push(signal);
            }
        }
        Self { set }
    }

    /// SIGTERM and SIGINT, the usual pair for service shutdown.
    pub fn terminate_or_interrupt() -> Self {
        Self::new([Signal::Terminate, Signal::Interrupt])
    }

    pub fn signals(&self) -> &[Signal] {
        &self.set
    }
}

impl TerminationSource for Signals {
    fn subscribe(self) -> BoxFuture<'static, Signal> {
        let listeners: Vec<BoxFuture<'static, Signal>> =
            self.set.into_iter().filter_map(listen).collect();

        if listeners.is_empty() {
            return future::pending().boxed();
        }

        async move {
            let (signal, _, _) = future::select_all(listeners).await;
            signal
        }
        .boxed()
    }
}

#[cfg(unix)]
fn listen(signal: Signal) -> Option<BoxFuture<'static, Signal>> {
    use tokio::signal::unix::{self, SignalKind};

    let kind = match signal {
        Signal::Interrupt => SignalKind::interrupt(),
        Signal::Terminate => SignalKind::terminate(),
        Signal::Hangup => SignalKind::hangup(),
        Signal::Quit => SignalKind::quit(),
    };

    match unix::signal(kind) {
        Ok(mut stream) => Some(
            async move {
                // recv() yields None only if the driver is gone; stay pending then.
                match stream.recv().await {
                    Some(()) => signal,
                    None => future::pending().await,
                }
            }
            .boxed(),
        ),
        Err(e) => {
            tracing::error!(signal = %signal, error = %e, "Failed to install signal handler");
            None
        }
    }
}

#[cfg(not(unix))]
fn listen(signal: Signal) -> Option<BoxFuture<'static, Signal>> {
    match signal {
        Signal::Interrupt => Some(
            async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => signal,
                    Err(e) => {
                        tracing::error!(signal = %signal, error = %e, "Failed to listen for Ctrl+C");
                        future::pending().await
                    }
                }
            }
            .boxed(),
        ),
        other => {
            tracing::warn!(signal = %other, "Signal not supported on this platform");
            None
        }
    }
}

/// Injected termination source for driving shutdown by hand.
#[derive(Debug)]
pub struct ManualTrigger {
    rx: oneshot::Receiver<Signal>,
}

/// Fires the paired [`ManualTrigger`].
#[derive(Debug)]
pub struct TriggerHandle {
    tx: oneshot::Sender<Signal>,
}

impl ManualTrigger {
    pub fn new() -> (Self, TriggerHandle) {
        let (tx, rx) = oneshot::channel();
        (Self { rx }, TriggerHandle { tx })
    }
}

impl TriggerHandle {
    /// Deliver a simulated signal. Has no effect if nobody is listening.
    pub fn fire(self, signal: Signal) {
        let _ = self.tx.send(signal);
    }
}

impl TerminationSource for ManualTrigger {
    fn subscribe(self) -> BoxFuture<'static, Signal> {
        async move {
            match self.rx.await {
                Ok(signal) => signal,
                // Handle dropped without firing.
                Err(_) => future::pending().await,
            }
        }
        .boxed()
    }
}
