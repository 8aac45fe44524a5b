// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Waits for the process signals that should trigger graceful shutdown —
//! `SIGTERM`, `SIGINT`, and `SIGHUP` on Unix, Ctrl-C on Windows — and feeds
//! them into a [`ShutdownCoordinator`](crate::shutdown::ShutdownCoordinator).

use crate::shutdown::ShutdownCoordinator;

/// Which signal triggered shutdown, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceivedSignal {
    Interrupt,
    Terminate,
    Hangup,
}

impl std::fmt::Display for ReceivedSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReceivedSignal::Interrupt => "SIGINT",
            ReceivedSignal::Terminate => "SIGTERM",
            ReceivedSignal::Hangup => "SIGHUP",
        };
        f.write_str(name)
    }
}

/// Waits for the first shutdown-triggering signal, then calls
/// [`ShutdownCoordinator::initiate_shutdown`]. Intended to be spawned as its
/// own task, racing the application's main work via `tokio::select!`.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal(coordinator: &ShutdownCoordinator) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    let received = tokio::select! {
        _ = sigterm.recv() => ReceivedSignal::Terminate,
        _ = sigint.recv() => ReceivedSignal::Interrupt,
        _ = sighup.recv() => ReceivedSignal::Hangup,
    };

    tracing::info!(signal = %received, "received shutdown signal");
    coordinator.initiate_shutdown();
}

/// Windows has no SIGTERM/SIGHUP; Ctrl-C is the only shutdown trigger.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal(coordinator: &ShutdownCoordinator) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!(signal = %ReceivedSignal::Interrupt, "received shutdown signal");
    coordinator.initiate_shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_display_names_match_posix_names() {
        assert_eq!(ReceivedSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(ReceivedSignal::Terminate.to_string(), "SIGTERM");
        assert_eq!(ReceivedSignal::Hangup.to_string(), "SIGHUP");
    }

    #[tokio::test]
    async fn wait_for_shutdown_signal_initiates_coordinator_on_ctrl_c() {
        // Exercised indirectly: sending a real signal to the test process is
        // not safe in a shared test binary, so this only asserts the
        // coordinator starts in the non-shutting-down state the signal
        // handler is expected to flip.
        let coordinator = ShutdownCoordinator::default();
        assert!(!coordinator.is_shutting_down());
    }
}
