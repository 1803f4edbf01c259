//! Public entry point: last location, live subscriptions and host callbacks.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use locator_permission::{Permission, PermissionManager, PermissionOutcome};
use log::debug;

use crate::{
    ConfigError, Location, LocationError, LocationProvider, LocationRequest, LocationResult,
    LocationSource, LocatorConfig, REQUEST_CODE_SETTINGS, SettingsClient, SettingsError,
    SettingsResolver,
};

/// Receives live location updates.
pub trait LocationUpdatesListener: Send + Sync {
    /// Called for every location of the update stream, in delivery order.
    fn on_location_changed(&self, location: &Location);

    /// Called when the update stream could not be started.
    fn on_location_changed_error(&self, error: &LocationError) {
        let _ = error;
    }
}

/// Identifies a subscription made with
/// [`LocationManager::subscribe_to_location_changes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = (SubscriptionId, Arc<dyn LocationUpdatesListener>);

/// Ordered subscriber registry. Notification iterates over a snapshot, so
/// listeners may (un)subscribe while being notified.
#[derive(Default)]
struct Subscribers {
    entries: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl Subscribers {
    /// Adds a listener; the flag tells whether it is the first one.
    fn insert(&self, listener: Arc<dyn LocationUpdatesListener>) -> (SubscriptionId, bool) {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.lock().expect("subscribers mutex poisoned");
        let was_empty = entries.is_empty();
        entries.push((id, listener));
        (id, was_empty)
    }

    /// Removes a listener; the flag tells whether the registry is now empty.
    fn remove(&self, id: SubscriptionId) -> Option<bool> {
        let mut entries = self.entries.lock().expect("subscribers mutex poisoned");
        let index = entries.iter().position(|(entry, _)| *entry == id)?;
        entries.remove(index);
        Some(entries.is_empty())
    }

    fn len(&self) -> usize {
        self.entries.lock().expect("subscribers mutex poisoned").len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn LocationUpdatesListener>> {
        self.entries
            .lock()
            .expect("subscribers mutex poisoned")
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect()
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl LocationUpdatesListener for Subscribers {
    fn on_location_changed(&self, location: &Location) {
        for listener in self.snapshot() {
            listener.on_location_changed(location);
        }
    }

    fn on_location_changed_error(&self, error: &LocationError) {
        for listener in self.snapshot() {
            listener.on_location_changed_error(error);
        }
    }
}

/// Single entry point for location access.
///
/// The update stream runs exactly while at least one subscriber is
/// registered.
pub struct LocationManager {
    source: LocationSource,
    subscribers: Arc<Subscribers>,
    settings: Arc<SettingsResolver>,
    permissions: Arc<dyn PermissionManager>,
}

impl fmt::Debug for LocationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationManager")
            .field("source", &self.source)
            .field("subscribers", &self.subscribers)
            .finish_non_exhaustive()
    }
}

impl LocationManager {
    /// Creates a manager with the default [`LocatorConfig`].
    pub fn new(
        permissions: Arc<dyn PermissionManager>,
        provider: Arc<dyn LocationProvider>,
        settings_client: Arc<dyn SettingsClient>,
    ) -> Self {
        Self::assemble(permissions, provider, settings_client, LocatorConfig::default())
    }

    /// Creates a manager with a custom configuration.
    ///
    /// # Errors
    /// Returns a [`ConfigError`] if `config` fails [`LocatorConfig::validate`].
    pub fn with_config(
        permissions: Arc<dyn PermissionManager>,
        provider: Arc<dyn LocationProvider>,
        settings_client: Arc<dyn SettingsClient>,
        config: LocatorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(permissions, provider, settings_client, config))
    }

    fn assemble(
        permissions: Arc<dyn PermissionManager>,
        provider: Arc<dyn LocationProvider>,
        settings_client: Arc<dyn SettingsClient>,
        config: LocatorConfig,
    ) -> Self {
        let subscribers = Arc::new(Subscribers::default());
        let settings = Arc::new(SettingsResolver::new(settings_client));
        let source = LocationSource::from_parts(
            permissions.clone(),
            provider,
            settings.clone(),
            config,
            Some(subscribers.clone()),
        );
        Self {
            source,
            subscribers,
            settings,
            permissions,
        }
    }

    /// Fetches the last known location, prompting for permission and
    /// settings changes if needed.
    ///
    /// # Errors
    /// See [`LocationSource::get_last_location`].
    pub async fn get_last_location(&self) -> LocationResult<Option<Location>> {
        self.source.get_last_location(true, true, true).await
    }

    /// Registers a listener for live updates, starting the update stream
    /// for the first one.
    pub async fn subscribe_to_location_changes(
        &self,
        listener: Arc<dyn LocationUpdatesListener>,
    ) -> SubscriptionId {
        let (id, first) = self.subscribers.insert(listener);
        if first {
            self.source.start_receiving_location_updates().await;
        }
        id
    }

    /// Removes a listener, stopping the update stream after the last one.
    /// Returns `false` for unknown ids.
    pub fn unsubscribe_from_location_changes(&self, id: SubscriptionId) -> bool {
        match self.subscribers.remove(id) {
            Some(true) => {
                self.source.stop_receiving_location_updates();
                true
            }
            Some(false) => true,
            None => false,
        }
    }

    /// Reacts to the end of a host permission flow. Only location
    /// permissions matter; a grant starts the stream if anyone listens, a
    /// denial stops it.
    pub async fn notify_permission_outcome(
        &self,
        permission: Permission,
        outcome: PermissionOutcome,
    ) {
        if !permission.is_location() {
            return;
        }
        match outcome {
            PermissionOutcome::Granted if !self.subscribers.is_empty() => {
                self.source.start_receiving_location_updates().await;
            }
            PermissionOutcome::Granted => debug!("{permission} granted, no subscribers"),
            PermissionOutcome::Denied => self.source.stop_receiving_location_updates(),
        }
    }

    /// Host entry point for raw permission results: parallel lists of
    /// permission names and result codes. Unknown names and codes are skipped.
    pub async fn notify_permission_request_results(
        &self,
        permissions: &[&str],
        grant_results: &[i32],
    ) {
        for (name, &code) in permissions.iter().zip(grant_results) {
            let (Some(permission), Some(outcome)) = (
                Permission::from_name(name),
                PermissionOutcome::from_result_code(code),
            ) else {
                continue;
            };
            self.notify_permission_outcome(permission, outcome).await;
        }
    }

    /// Routes a host activity result. Returns `true` if it belonged to the
    /// settings resolution dialog.
    pub fn on_activity_result(&self, request_code: i32, result_code: i32) -> bool {
        if request_code != REQUEST_CODE_SETTINGS {
            return false;
        }
        self.settings.on_activity_result(result_code);
        true
    }

    /// Checks whether device settings satisfy a default request, without
    /// offering the resolution dialog.
    ///
    /// # Errors
    /// Returns a [`SettingsError`] if the settings are inadequate.
    pub async fn device_location_setting_fulfilled(&self) -> Result<(), SettingsError> {
        self.settings
            .check_and_resolve(false, LocationRequest::default())
            .await
    }

    /// Re-checks preconditions and reopens the update stream. Without
    /// subscribers the stream is only stopped.
    pub async fn restart_location_updates(&self) {
        if self.subscribers.is_empty() {
            debug!("restart requested without subscribers");
            self.source.stop_receiving_location_updates();
        } else {
            self.source.restart_location_updates().await;
        }
    }

    /// Whether the fine location permission is held.
    #[must_use]
    pub fn has_location_permission(&self) -> bool {
        self.permissions.has_permission(Permission::FineLocation)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether the update stream is active.
    #[must_use]
    pub fn is_receiving_updates(&self) -> bool {
        self.source.is_receiving_updates()
    }
}
