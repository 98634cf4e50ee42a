// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{process::ExitCode, time::Duration};

use tokio::signal::unix::{Signal, SignalKind};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

/// Drives the shutdown of the service
///
/// The first SIGTERM or SIGINT starts a soft shutdown: listeners stop
/// accepting connections and finish the requests in flight. A second signal,
/// or the soft shutdown lasting more than a minute, turns it into a hard
/// shutdown which drops everything.
///
/// Servers watch the tokens handed out here and run on the [`TaskTracker`],
/// which tells when the soft shutdown is over. A server cancelling the soft
/// shutdown token itself is treated as a crash.
///
/// The service manager is kept informed through [`sd_notify`], including the
/// watchdog when it is enabled.
pub struct LifecycleManager {
    hard_shutdown_token: CancellationToken,
    soft_shutdown_token: CancellationToken,
    task_tracker: TaskTracker,
    sigterm: Signal,
    sigint: Signal,
    timeout: Duration,
}

fn notify(states: &[sd_notify::NotifyState]) {
    if let Err(e) = sd_notify::notify(false, states) {
        tracing::error!(
            error = &e as &dyn std::error::Error,
            "Failed to notify service manager"
        );
    }
}

impl LifecycleManager {
    /// Install the signal handlers
    ///
    /// # Errors
    ///
    /// Returns an error if a signal handler could not be installed
    pub fn new() -> Result<Self, std::io::Error> {
        let hard_shutdown_token = CancellationToken::new();
        let soft_shutdown_token = hard_shutdown_token.child_token();

        notify(&[sd_notify::NotifyState::MainPid(std::process::id())]);

        Ok(Self {
            hard_shutdown_token,
            soft_shutdown_token,
            task_tracker: TaskTracker::new(),
            sigterm: tokio::signal::unix::signal(SignalKind::terminate())?,
            sigint: tokio::signal::unix::signal(SignalKind::interrupt())?,
            timeout: Duration::from_secs(60),
        })
    }

    #[must_use]
    pub fn task_tracker(&self) -> &TaskTracker {
        &self.task_tracker
    }

    #[must_use]
    pub fn hard_shutdown_token(&self) -> CancellationToken {
        self.hard_shutdown_token.clone()
    }

    #[must_use]
    pub fn soft_shutdown_token(&self) -> CancellationToken {
        self.soft_shutdown_token.clone()
    }

    async fn next_signal(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }

    /// Ping the systemd watchdog, if enabled, until the hard shutdown
    fn spawn_watchdog(&self) {
        let mut watchdog_usec = 0;
        if !sd_notify::watchdog_enabled(false, &mut watchdog_usec) {
            return;
        }

        let mut interval = tokio::time::interval(Duration::from_micros(watchdog_usec / 2));
        let hard_shutdown_token = self.hard_shutdown_token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = hard_shutdown_token.cancelled() => break,
                    _ = interval.tick() => notify(&[sd_notify::NotifyState::Watchdog]),
                }
            }
        });
    }

    /// Run until the service is completely shut down
    pub async fn run(mut self) -> ExitCode {
        notify(&[sd_notify::NotifyState::Ready]);
        self.spawn_watchdog();

        let soft_shutdown_token = self.soft_shutdown_token.clone();
        let likely_crashed = tokio::select! {
            () = soft_shutdown_token.cancelled() => {
                tracing::warn!("Another task triggered a shutdown, it likely crashed! Shutting down");
                true
            },

            signal = self.next_signal() => {
                tracing::info!("Shutdown signal received ({signal}), shutting down");
                false
            },
        };

        notify(&[sd_notify::NotifyState::Stopping]);

        self.soft_shutdown_token.cancel();
        self.task_tracker.close();

        let task_tracker = self.task_tracker.clone();
        let timeout = tokio::time::sleep(self.timeout);
        tokio::select! {
            signal = self.next_signal() => {
                tracing::warn!("Second shutdown signal received ({signal}), abort");
            },

            () = timeout => {
                tracing::warn!("Shutdown timeout reached, abort");
            },

            () = task_tracker.wait() => {},
        }

        self.hard_shutdown_token.cancel();
        task_tracker.wait().await;

        tracing::info!("All tasks are done, exiting");

        if likely_crashed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_crash_waits_for_tasks() {
        let mut manager = LifecycleManager::new().unwrap();
        manager.timeout = Duration::from_secs(5);

        let soft_shutdown_token = manager.soft_shutdown_token();
        let hard_shutdown_token = manager.hard_shutdown_token();
        let task = manager.task_tracker().spawn({
            let soft_shutdown_token = soft_shutdown_token.clone();
            async move {
                soft_shutdown_token.cancelled().await;
                hard_shutdown_token.is_cancelled()
            }
        });

        // A server giving up on its own
        soft_shutdown_token.cancel();

        assert_eq!(manager.run().await, ExitCode::FAILURE);
        assert!(!task.await.unwrap(), "the task finished before the hard shutdown");
    }

    #[tokio::test]
    async fn test_stuck_task_hits_timeout() {
        let mut manager = LifecycleManager::new().unwrap();
        manager.timeout = Duration::from_millis(50);

        let hard_shutdown_token = manager.hard_shutdown_token();
        manager.task_tracker().spawn(async move {
            // Ignores the soft shutdown
            hard_shutdown_token.cancelled().await;
        });
        manager.soft_shutdown_token().cancel();

        assert_eq!(manager.run().await, ExitCode::FAILURE);
    }
}
