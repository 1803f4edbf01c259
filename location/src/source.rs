//! Permission, settings and provider orchestration.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use locator_permission::{Permission, PermissionManager, PermissionStatus, RequestOutcome};
use log::{debug, info, warn};

use crate::manager::LocationUpdatesListener;
use crate::retry::recover_fix;
use crate::{
    ConfigError, Location, LocationBatch, LocationDelegate, LocationError, LocationProvider,
    LocationRequest, LocationResult, LocatorConfig, SettingsResolver, UpdateHandle,
};

const LOCATION_PERMISSION: Permission = Permission::FineLocation;

/// Forwards the long-lived update stream to the updates listener until closed.
struct ForwardingDelegate {
    listener: Arc<dyn LocationUpdatesListener>,
    open: Arc<AtomicBool>,
}

impl fmt::Debug for ForwardingDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardingDelegate")
            .field("open", &self.open.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl LocationDelegate for ForwardingDelegate {
    fn on_location_result(&self, batch: Option<LocationBatch>) {
        let Some(batch) = batch else {
            return;
        };
        for location in &batch.locations {
            if !self.open.load(Ordering::Acquire) {
                warn!("dropping location delivered after the update stream stopped");
                return;
            }
            self.listener.on_location_changed(location);
        }
    }
}

#[derive(Debug)]
struct ActiveStream {
    handle: UpdateHandle,
    open: Arc<AtomicBool>,
}

#[derive(Debug, Default)]
struct StreamState {
    active: Option<ActiveStream>,
    // Bumped by every stop so an in-flight start can tell it was superseded.
    generation: u64,
}

/// Decides, per request, whether permission and settings allow touching
/// the provider, and owns the long-lived update stream.
pub struct LocationSource {
    permissions: Arc<dyn PermissionManager>,
    provider: Arc<dyn LocationProvider>,
    settings: Arc<SettingsResolver>,
    config: LocatorConfig,
    updates_listener: Option<Arc<dyn LocationUpdatesListener>>,
    stream: Mutex<StreamState>,
}

impl fmt::Debug for LocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationSource")
            .field("config", &self.config)
            .field("settings", &self.settings)
            .field("has_updates_listener", &self.updates_listener.is_some())
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl LocationSource {
    /// Creates a source. Without an `updates_listener` the update stream
    /// operations do nothing.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if `config` fails [`LocatorConfig::validate`].
    pub fn new(
        permissions: Arc<dyn PermissionManager>,
        provider: Arc<dyn LocationProvider>,
        settings: Arc<SettingsResolver>,
        config: LocatorConfig,
        updates_listener: Option<Arc<dyn LocationUpdatesListener>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_parts(
            permissions,
            provider,
            settings,
            config,
            updates_listener,
        ))
    }

    /// `config` must already be valid.
    pub(crate) fn from_parts(
        permissions: Arc<dyn PermissionManager>,
        provider: Arc<dyn LocationProvider>,
        settings: Arc<SettingsResolver>,
        config: LocatorConfig,
        updates_listener: Option<Arc<dyn LocationUpdatesListener>>,
    ) -> Self {
        Self {
            permissions,
            provider,
            settings,
            config,
            updates_listener,
            stream: Mutex::new(StreamState::default()),
        }
    }

    /// The request used for settings checks and streams.
    #[must_use]
    pub const fn request(&self) -> &LocationRequest {
        &self.config.request
    }

    /// Fetches the last known location.
    ///
    /// Checks the fine location permission (prompting if
    /// `may_request_permission`), then the device settings (offering the
    /// resolution dialog if `may_request_settings_change`). With
    /// `care_about_result` unset the call stops there and yields `Ok(None)`.
    /// When the provider has no cached fix, a retry session recovers one
    /// from a temporary update stream.
    ///
    /// # Errors
    /// Returns a [`LocationError`] for missing permission, inadequate
    /// settings, provider failures or an exhausted retry session.
    pub async fn get_last_location(
        &self,
        may_request_permission: bool,
        may_request_settings_change: bool,
        care_about_result: bool,
    ) -> LocationResult<Option<Location>> {
        self.ensure_permission(may_request_permission).await?;

        debug!("checking location settings");
        self.settings
            .check_and_resolve(may_request_settings_change, self.config.request)
            .await?;

        if !care_about_result {
            return Ok(None);
        }

        match self.provider.last_location().await {
            Ok(Some(location)) => Ok(Some(location)),
            Ok(None) => {
                debug!("no cached location, starting retry session");
                recover_fix(
                    self.provider.clone(),
                    &self.config.request,
                    self.config.retry_limit,
                )
                .await
                .map(Some)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn ensure_permission(&self, may_request_permission: bool) -> LocationResult<()> {
        if self.permissions.has_permission(LOCATION_PERMISSION) {
            return Ok(());
        }

        if !may_request_permission {
            return match self.permissions.permission_status(LOCATION_PERMISSION) {
                PermissionStatus::Granted => Ok(()),
                PermissionStatus::Denied => Err(LocationError::MissingPermission),
                PermissionStatus::DeniedDoNotAskAgain => {
                    Err(LocationError::MissingPermissionDoNotAskAgain)
                }
            };
        }

        debug!("requesting {LOCATION_PERMISSION}");
        match self.permissions.request_if_needed(LOCATION_PERMISSION).await {
            RequestOutcome::Granted => Ok(()),
            RequestOutcome::Denied {
                do_not_ask_again: true,
            } => Err(LocationError::MissingPermissionDoNotAskAgain),
            RequestOutcome::Denied {
                do_not_ask_again: false,
            } => Err(LocationError::CanceledPermissionChange),
        }
    }

    /// Starts the long-lived update stream.
    ///
    /// Never prompts: a missing permission or inadequate settings are
    /// reported to the updates listener instead. Does nothing while a
    /// stream is already active.
    pub async fn start_receiving_location_updates(&self) {
        let Some(listener) = &self.updates_listener else {
            return;
        };

        let generation = {
            let state = self.stream.lock().expect("stream state mutex poisoned");
            if state.active.is_some() {
                debug!("update stream already active");
                return;
            }
            state.generation
        };

        let status = self.permissions.permission_status(LOCATION_PERMISSION);
        match status {
            PermissionStatus::Granted => {}
            PermissionStatus::Denied => {
                listener.on_location_changed_error(&LocationError::MissingPermission);
                return;
            }
            PermissionStatus::DeniedDoNotAskAgain => {
                listener.on_location_changed_error(&LocationError::MissingPermissionDoNotAskAgain);
                return;
            }
        }

        if let Err(err) = self
            .settings
            .check_and_resolve(false, self.config.request)
            .await
        {
            listener.on_location_changed_error(&err.into());
            return;
        }

        {
            let state = self.stream.lock().expect("stream state mutex poisoned");
            if state.generation != generation || state.active.is_some() {
                debug!("update stream start superseded");
                return;
            }
        }

        let open = Arc::new(AtomicBool::new(true));
        let delegate = Arc::new(ForwardingDelegate {
            listener: listener.clone(),
            open: open.clone(),
        });
        let handle = self
            .provider
            .request_location_updates(&self.config.request, delegate);

        let mut state = self.stream.lock().expect("stream state mutex poisoned");
        if state.generation == generation && state.active.is_none() {
            state.active = Some(ActiveStream { handle, open });
            info!("location update stream {handle} started");
        } else {
            // Stopped while the provider was delivering synchronously.
            drop(state);
            open.store(false, Ordering::Release);
            self.provider.remove_location_updates(handle);
            debug!("location update stream {handle} stopped during start");
        }
    }

    /// Cancels the long-lived update stream. Safe to call when none is active.
    pub fn stop_receiving_location_updates(&self) {
        let active = {
            let mut state = self.stream.lock().expect("stream state mutex poisoned");
            state.generation += 1;
            state.active.take()
        };

        match active {
            Some(stream) => {
                stream.open.store(false, Ordering::Release);
                self.provider.remove_location_updates(stream.handle);
                info!("location update stream {} stopped", stream.handle);
            }
            None => debug!("no location update stream to stop"),
        }
    }

    /// Stops and starts the update stream, re-checking its preconditions.
    pub async fn restart_location_updates(&self) {
        self.stop_receiving_location_updates();
        self.start_receiving_location_updates().await;
    }

    /// Whether the long-lived update stream is active.
    #[must_use]
    pub fn is_receiving_updates(&self) -> bool {
        self.stream
            .lock()
            .expect("stream state mutex poisoned")
            .active
            .is_some()
    }
}
