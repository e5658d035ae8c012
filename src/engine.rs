use std::path::{Path, PathBuf};

use crate::error::WatchError;
use crate::logger::{verbose_log, LogLevel};
use crate::notifier::Notifier;
use crate::target::WatchTarget;
use crate::watcher::{EventKind, RawEvent, Subscription};

/// Presence of the target during one `run()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Unconfirmed,
    Missing,
    Present,
}

/// Waits for a single file to appear and reports the transitions.
///
/// At most two notifications go out per `run()`: "missing" when the first
/// check fails, "arrived" when a matching event moves the state from
/// `Missing` to `Present`. Notification failures are logged and never stop
/// the watch.
pub struct FileWatchEngine<S, N> {
    target: WatchTarget,
    subscription: S,
    notifier: N,
    state: WatchState,
    verbose: Option<bool>,
}

impl<S: Subscription, N: Notifier> FileWatchEngine<S, N> {
    pub fn new(target: WatchTarget, subscription: S, notifier: N) -> Self {
        Self {
            target,
            subscription,
            notifier,
            state: WatchState::Unconfirmed,
            verbose: None,
        }
    }

    pub fn verbose(mut self, verbose: Option<bool>) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn target(&self) -> &WatchTarget {
        &self.target
    }

    /// Hands the subscription and notifier back to the caller for release
    pub fn into_parts(self) -> (S, N) {
        (self.subscription, self.notifier)
    }

    /// Runs the watch until the target is present or the subscription ends.
    ///
    /// Only registration can fail; closure or breakage of the subscription
    /// ends the loop normally and the last state is returned.
    pub fn run(&mut self) -> Result<WatchState, WatchError> {
        self.state = WatchState::Unconfirmed;
        let target_path = self.target.path();

        if target_path.exists() {
            self.state = WatchState::Present;
            verbose_log(
                LogLevel::Info,
                &format!("{} is already present", target_path.display()),
                self.verbose,
            );
            return Ok(self.state);
        }

        self.state = WatchState::Missing;
        verbose_log(
            LogLevel::Info,
            &format!("{} is missing, waiting for it", target_path.display()),
            self.verbose,
        );
        if let Err(e) = self.notifier.notify_missing(self.target.file_name()) {
            verbose_log(
                LogLevel::Error,
                &format!("Failed to send missing notice: {}", e),
                self.verbose,
            );
        }

        self.subscription.register()?;

        // Arrivals before registration produce no event.
        if target_path.exists() {
            self.mark_arrived();
        }

        while self.state != WatchState::Present {
            let Some(batch) = self.subscription.next_batch() else {
                verbose_log(LogLevel::Debug, "Subscription closed", self.verbose);
                break;
            };

            if batch.is_empty() {
                if target_path.exists() {
                    self.mark_arrived();
                }
            } else {
                for event in &batch {
                    self.handle_event(event, &target_path);
                }
            }

            if self.state == WatchState::Present {
                break;
            }
            if !self.subscription.rearm() {
                verbose_log(
                    LogLevel::Debug,
                    &format!(
                        "Watch on {} can no longer be re-armed",
                        self.target.directory().display()
                    ),
                    self.verbose,
                );
                break;
            }
        }

        Ok(self.state)
    }

    fn handle_event(&mut self, event: &RawEvent, target_path: &Path) {
        if event.kind == EventKind::Overflow {
            verbose_log(
                LogLevel::Debug,
                "Event overflow reported, some changes may have been missed",
                self.verbose,
            );
            return;
        }

        if self.resolve_subject(&event.subject) == target_path {
            self.mark_arrived();
        } else {
            verbose_log(
                LogLevel::Debug,
                &format!("Ignored {:?} for {}", event.kind, event.subject.display()),
                self.verbose,
            );
        }
    }

    fn resolve_subject(&self, subject: &Path) -> PathBuf {
        if subject.is_absolute() {
            subject.to_path_buf()
        } else {
            self.target.directory().join(subject)
        }
    }

    fn mark_arrived(&mut self) {
        if self.state != WatchState::Missing {
            return;
        }
        self.state = WatchState::Present;
        verbose_log(
            LogLevel::Info,
            &format!("{} has arrived", self.target.path().display()),
            self.verbose,
        );
        if let Err(e) = self.notifier.notify_arrived(self.target.file_name()) {
            verbose_log(
                LogLevel::Error,
                &format!("Failed to send arrival notice: {}", e),
                self.verbose,
            );
        }
    }
}
