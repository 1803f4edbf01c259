//! Device location settings checks and the resolution dialog.

use std::fmt;
use std::sync::{Arc, Mutex};

use futures::channel::oneshot;
use futures::future::BoxFuture;
use locator_permission::{RESULT_CANCELED, RESULT_OK};
use log::{debug, warn};

use crate::{LocationRequest, SettingsError};

/// Request code the host uses for the settings resolution dialog.
pub const REQUEST_CODE_SETTINGS: i32 = 30;

/// Whether device settings satisfy a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsAdequacy {
    /// Settings are good enough.
    Adequate,
    /// Settings are insufficient.
    Inadequate {
        /// A user-facing dialog can fix the settings.
        resolvable: bool,
    },
}

/// Host-side settings subsystem.
pub trait SettingsClient: Send + Sync {
    /// Checks the device settings against `request`.
    fn check_location_settings(&self, request: LocationRequest) -> BoxFuture<'_, SettingsAdequacy>;

    /// Shows the resolution dialog for the last inadequate check.
    ///
    /// The user's decision is delivered later through
    /// [`SettingsResolver::on_resolution_outcome`].
    ///
    /// # Errors
    /// Returns the platform's message if the dialog could not be launched.
    fn start_resolution(&self) -> Result<(), String>;
}

type Waiter = oneshot::Sender<Result<(), SettingsError>>;

// `waiters` is only non-empty while `dialog_open` is set: both are reset
// together by `take_waiters`.
#[derive(Default)]
struct PendingResolution {
    waiters: Vec<Waiter>,
    dialog_open: bool,
}

/// Serializes settings checks behind at most one resolution dialog.
///
/// Callers that need the dialog while it is already showing join the
/// pending queue and receive the same outcome.
pub struct SettingsResolver {
    client: Arc<dyn SettingsClient>,
    pending: Mutex<PendingResolution>,
}

impl fmt::Debug for SettingsResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.pending.lock().expect("pending resolution mutex poisoned");
        f.debug_struct("SettingsResolver")
            .field("waiters", &pending.waiters.len())
            .field("dialog_open", &pending.dialog_open)
            .finish_non_exhaustive()
    }
}

impl SettingsResolver {
    /// Creates a resolver over the host settings client.
    pub fn new(client: Arc<dyn SettingsClient>) -> Self {
        Self {
            client,
            pending: Mutex::new(PendingResolution::default()),
        }
    }

    /// Checks device settings for `request`, prompting the user to fix
    /// them when `may_prompt` is set and a dialog can help.
    ///
    /// # Errors
    /// Returns a [`SettingsError`] when the settings are inadequate and
    /// were not (or could not be) fixed.
    pub async fn check_and_resolve(
        &self,
        may_prompt: bool,
        request: LocationRequest,
    ) -> Result<(), SettingsError> {
        match self.client.check_location_settings(request).await {
            SettingsAdequacy::Adequate => Ok(()),
            SettingsAdequacy::Inadequate { resolvable: false } => {
                debug!("location settings inadequate and not resolvable");
                Err(SettingsError::NotFulfilled)
            }
            SettingsAdequacy::Inadequate { resolvable: true } if !may_prompt => {
                debug!("location settings inadequate, prompting not allowed");
                Err(SettingsError::NotMet)
            }
            SettingsAdequacy::Inadequate { resolvable: true } => self.resolve().await,
        }
    }

    async fn resolve(&self) -> Result<(), SettingsError> {
        let (sender, receiver) = oneshot::channel();
        let launch = {
            let mut pending = self.pending.lock().expect("pending resolution mutex poisoned");
            pending.waiters.push(sender);
            !std::mem::replace(&mut pending.dialog_open, true)
        };

        if launch {
            if let Err(err) = self.client.start_resolution() {
                warn!("failed to launch settings resolution: {err}");
                // Our own waiter reads as canceled once its receiver is gone;
                // anyone who joined since shares the failure.
                drop(receiver);
                for waiter in self.take_waiters() {
                    if waiter.is_canceled() {
                        continue;
                    }
                    if waiter.send(Err(SettingsError::LaunchFailed)).is_err() {
                        warn!("settings resolution waiter dropped before the failure arrived");
                    }
                }
                return Err(SettingsError::LaunchFailed);
            }
            debug!("settings resolution dialog launched");
        } else {
            debug!("joining outstanding settings resolution");
        }

        receiver.await.unwrap_or(Err(SettingsError::Canceled))
    }

    /// Delivers the user's decision on the resolution dialog to every
    /// pending caller, in the order they asked.
    pub fn on_resolution_outcome(&self, succeeded: bool) {
        let waiters = self.take_waiters();
        debug!(
            "settings resolution finished (succeeded: {succeeded}), notifying {} waiter(s)",
            waiters.len()
        );
        for waiter in waiters {
            let outcome = if succeeded {
                Ok(())
            } else {
                Err(SettingsError::Canceled)
            };
            if waiter.send(outcome).is_err() {
                warn!("settings resolution waiter dropped before the outcome arrived");
            }
        }
    }

    /// Routes a raw host activity result of the resolution dialog.
    /// Codes other than OK and CANCELED are ignored.
    pub fn on_activity_result(&self, result_code: i32) {
        match result_code {
            RESULT_OK => self.on_resolution_outcome(true),
            RESULT_CANCELED => self.on_resolution_outcome(false),
            other => debug!("ignoring settings activity result {other}"),
        }
    }

    /// Whether a resolution dialog is currently showing.
    #[must_use]
    pub fn is_resolution_pending(&self) -> bool {
        self.pending
            .lock()
            .expect("pending resolution mutex poisoned")
            .dialog_open
    }

    /// Number of callers waiting on the dialog.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .expect("pending resolution mutex poisoned")
            .waiters
            .len()
    }

    fn take_waiters(&self) -> Vec<Waiter> {
        let mut pending = self.pending.lock().expect("pending resolution mutex poisoned");
        pending.dialog_open = false;
        std::mem::take(&mut pending.waiters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSettingsClient;

    fn resolver(client: &Arc<FakeSettingsClient>) -> SettingsResolver {
        SettingsResolver::new(client.clone())
    }

    #[tokio::test]
    async fn adequate_settings_succeed_without_dialog() {
        let client = Arc::new(FakeSettingsClient::adequate());
        let resolver = resolver(&client);

        assert_eq!(
            resolver.check_and_resolve(true, LocationRequest::default()).await,
            Ok(())
        );
        assert_eq!(client.launches(), 0);
        assert_eq!(client.checked_requests(), vec![LocationRequest::default()]);
    }

    #[tokio::test]
    async fn unresolvable_settings_fail() {
        let client = Arc::new(FakeSettingsClient::inadequate(false));
        let resolver = resolver(&client);

        let err = resolver
            .check_and_resolve(true, LocationRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err, SettingsError::NotFulfilled);
        assert_eq!(err.to_string(), "Settings resolution is not fulfilled");
        assert_eq!(client.launches(), 0);
    }

    #[tokio::test]
    async fn resolvable_settings_without_prompt_fail() {
        let client = Arc::new(FakeSettingsClient::inadequate(true));
        let resolver = resolver(&client);

        assert_eq!(
            resolver.check_and_resolve(false, LocationRequest::default()).await,
            Err(SettingsError::NotMet)
        );
        assert_eq!(client.launches(), 0);
        assert!(!resolver.is_resolution_pending());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_dialog() {
        let client = Arc::new(FakeSettingsClient::inadequate(true));
        let resolver = resolver(&client);

        let (first, second, ()) = futures::join!(
            resolver.check_and_resolve(true, LocationRequest::default()),
            resolver.check_and_resolve(true, LocationRequest::default()),
            async {
                assert_eq!(resolver.pending_count(), 2);
                resolver.on_resolution_outcome(true);
            }
        );

        assert_eq!(first, Ok(()));
        assert_eq!(second, Ok(()));
        assert_eq!(client.launches(), 1);
        assert!(!resolver.is_resolution_pending());
        assert_eq!(resolver.pending_count(), 0);
    }

    #[tokio::test]
    async fn canceled_dialog_fails_every_waiter() {
        let client = Arc::new(FakeSettingsClient::inadequate(true));
        let resolver = resolver(&client);

        let (first, second, ()) = futures::join!(
            resolver.check_and_resolve(true, LocationRequest::default()),
            resolver.check_and_resolve(true, LocationRequest::default()),
            async { resolver.on_activity_result(RESULT_CANCELED) }
        );

        assert_eq!(first, Err(SettingsError::Canceled));
        assert_eq!(second, Err(SettingsError::Canceled));
        assert_eq!(
            SettingsError::Canceled.to_string(),
            "Settings change request canceled by user"
        );
    }

    #[tokio::test]
    async fn unknown_activity_result_keeps_waiters() {
        let client = Arc::new(FakeSettingsClient::inadequate(true));
        let resolver = resolver(&client);

        let (outcome, ()) = futures::join!(
            resolver.check_and_resolve(true, LocationRequest::default()),
            async {
                resolver.on_activity_result(42);
                assert_eq!(resolver.pending_count(), 1);
                resolver.on_activity_result(RESULT_OK);
            }
        );
        assert_eq!(outcome, Ok(()));
    }

    #[tokio::test]
    async fn launch_failure_reports_once_and_leaves_queue_empty() {
        let client = Arc::new(FakeSettingsClient::inadequate(true).failing_launch());
        let resolver = resolver(&client);

        let err = resolver
            .check_and_resolve(true, LocationRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err, SettingsError::LaunchFailed);
        assert_eq!(resolver.pending_count(), 0);
        assert!(!resolver.is_resolution_pending());

        // A late outcome has nobody left to notify.
        resolver.on_resolution_outcome(true);
        assert_eq!(client.launches(), 1);
    }

    #[tokio::test]
    async fn caller_after_launch_failure_opens_a_fresh_dialog() {
        let client = Arc::new(FakeSettingsClient::inadequate(true).failing_launch());
        let resolver = resolver(&client);

        for _ in 0..2 {
            assert_eq!(
                resolver.check_and_resolve(true, LocationRequest::default()).await,
                Err(SettingsError::LaunchFailed)
            );
            assert_eq!(resolver.pending_count(), 0);
        }
        assert_eq!(client.launches(), 2);
    }
}
