//! Location acquisition on top of a platform location provider.
//!
//! The crate negotiates runtime permissions and device location settings
//! before touching the provider, recovers a fix through a short-lived
//! update stream when no cached location exists, and fans live updates out
//! to any number of subscribers.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use locator_location::LocationManager;
//!
//! let manager = LocationManager::new(permissions, provider, settings_client);
//!
//! // One-shot fix, prompting for permission and settings changes if needed.
//! match manager.get_last_location().await {
//!     Ok(Some(location)) => println!("{}, {}", location.latitude, location.longitude),
//!     Ok(None) => {}
//!     Err(err) => eprintln!("{err} ({:?})", err.code()),
//! }
//!
//! // Live updates.
//! let id = manager.subscribe_to_location_changes(Arc::new(MyListener)).await;
//! // ...
//! manager.unsubscribe_from_location_changes(id);
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod manager;
mod provider;
mod request;
mod retry;
mod settings;
mod source;

#[cfg(test)]
mod testing;

use serde::{Deserialize, Serialize};

pub use config::{ConfigError, LocatorConfig};
pub use error::{ErrorCode, LocationError, ProviderError, SettingsError};
pub use locator_permission::{
    Permission, PermissionManager, PermissionOutcome, PermissionStatus, RequestOutcome,
};
pub use manager::{LocationManager, LocationUpdatesListener, SubscriptionId};
pub use provider::{LocationDelegate, LocationProvider, UpdateHandle};
pub use request::{LocationRequest, Priority};
pub use retry::{DEFAULT_RETRY_LIMIT, RetrySession, RetryStep};
pub use settings::{REQUEST_CODE_SETTINGS, SettingsAdequacy, SettingsClient, SettingsResolver};
pub use source::LocationSource;

/// Result type for location operations.
pub type LocationResult<T> = Result<T, LocationError>;

/// A geographic location with coordinates and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Altitude in meters above sea level, if available.
    pub altitude: Option<f64>,
    /// Horizontal accuracy in meters, if available.
    pub horizontal_accuracy: Option<f64>,
    /// Vertical accuracy in meters, if available.
    pub vertical_accuracy: Option<f64>,
    /// Timestamp as Unix epoch milliseconds.
    pub timestamp: u64,
    /// Name of the provider that produced the fix (`"fused"`, `"gps"`, ...).
    pub provider: Option<String>,
}

impl Location {
    /// Creates a location with only coordinates and a timestamp.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, timestamp: u64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            horizontal_accuracy: None,
            vertical_accuracy: None,
            timestamp,
            provider: None,
        }
    }
}

/// One delivery of the provider's update stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationBatch {
    /// Locations in the order the provider computed them. May be empty.
    pub locations: Vec<Location>,
}

impl LocationBatch {
    /// Wraps a list of locations.
    #[must_use]
    pub const fn new(locations: Vec<Location>) -> Self {
        Self { locations }
    }

    /// The first location of the batch, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Location> {
        self.locations.first()
    }

    /// Whether the batch carries no location.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

impl From<Vec<Location>> for LocationBatch {
    fn from(locations: Vec<Location>) -> Self {
        Self::new(locations)
    }
}
