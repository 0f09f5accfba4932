// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::time::Duration;

use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long in-flight requests get to complete once the portal is asked to stop
const GRACE_PERIOD: Duration = Duration::from_secs(30);

/// The SIGTERM and SIGINT streams, installed before the portal starts
/// listening so that an early signal is not lost
pub struct StopSignals {
    term: Signal,
    interrupt: Signal,
}

impl StopSignals {
    /// # Errors
    ///
    /// Returns an error if a signal handler could not be registered
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            term: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
        })
    }

    async fn next(&mut self) -> &'static str {
        tokio::select! {
            _ = self.term.recv() => "SIGTERM",
            _ = self.interrupt.recv() => "SIGINT",
        }
    }

    /// Stop in two steps: `drain` is cancelled on the first signal, then
    /// `abort` on the next one or when the grace period runs out
    pub async fn watch(mut self, drain: CancellationToken, abort: CancellationToken) {
        let signal = self.next().await;
        info!(signal, "Stopping, waiting for in-flight requests");
        drain.cancel();

        match tokio::time::timeout(GRACE_PERIOD, self.next()).await {
            Ok(signal) => warn!(signal, "Stopping right away"),
            Err(_) => warn!(
                grace_period = ?GRACE_PERIOD,
                "Requests still running after the grace period, stopping"
            ),
        }
        abort.cancel();
    }
}
