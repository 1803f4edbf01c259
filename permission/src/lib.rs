//! Location permission handling.
//!
//! This crate describes the permissions the locator cares about, the
//! statuses a host can report for them, and the [`PermissionManager`]
//! trait a host implements to answer "is this granted?" and "please ask
//! the user for it".

#![warn(missing_docs)]

use std::fmt;

use futures::future::BoxFuture;

/// Host result code reported when the user accepted a request.
pub const RESULT_OK: i32 = -1;

/// Host result code reported when the user dismissed a request.
pub const RESULT_CANCELED: i32 = 0;

/// Types of permissions that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Permission {
    /// Precise (GPS) location.
    FineLocation,
    /// Approximate (network) location.
    CoarseLocation,
    /// The whole location permission group.
    LocationGroup,
    /// Location while the app is in the background.
    BackgroundLocation,
}

impl Permission {
    /// Returns the platform permission name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FineLocation => "android.permission.ACCESS_FINE_LOCATION",
            Self::CoarseLocation => "android.permission.ACCESS_COARSE_LOCATION",
            Self::LocationGroup => "android.permission-group.LOCATION",
            Self::BackgroundLocation => "android.permission.ACCESS_BACKGROUND_LOCATION",
        }
    }

    /// Parses a platform permission name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        [
            Self::FineLocation,
            Self::CoarseLocation,
            Self::LocationGroup,
            Self::BackgroundLocation,
        ]
        .into_iter()
        .find(|permission| permission.as_str() == name)
    }

    /// Whether a result for this permission affects foreground location updates.
    #[must_use]
    pub const fn is_location(self) -> bool {
        matches!(
            self,
            Self::FineLocation | Self::CoarseLocation | Self::LocationGroup
        )
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current status of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionStatus {
    /// Permission has been granted by the user.
    Granted,
    /// Permission is not granted, but may still be requested.
    Denied,
    /// Permission is not granted and the user asked never to be prompted again.
    DeniedDoNotAskAgain,
}

impl PermissionStatus {
    /// Returns `true` for [`PermissionStatus::Granted`].
    #[must_use]
    pub const fn is_granted(self) -> bool {
        matches!(self, Self::Granted)
    }
}

/// Result of prompting the user for a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
    /// The permission is (now) granted.
    Granted,
    /// The user refused the permission.
    Denied {
        /// The user also ticked "don't ask again".
        do_not_ask_again: bool,
    },
}

/// Final outcome of a host permission flow, as delivered to the locator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionOutcome {
    /// The user granted the permission.
    Granted,
    /// The user denied the permission.
    Denied,
}

impl PermissionOutcome {
    /// Maps a raw host result code; codes other than
    /// [`RESULT_OK`] and [`RESULT_CANCELED`] carry no outcome.
    #[must_use]
    pub const fn from_result_code(code: i32) -> Option<Self> {
        match code {
            RESULT_OK => Some(Self::Granted),
            RESULT_CANCELED => Some(Self::Denied),
            _ => None,
        }
    }
}

/// Host-side permission subsystem.
pub trait PermissionManager: Send + Sync {
    /// Whether `permission` is currently held.
    fn has_permission(&self, permission: Permission) -> bool;

    /// Current status of `permission`, without prompting.
    fn permission_status(&self, permission: Permission) -> PermissionStatus;

    /// Prompts for `permission` unless it is already held.
    ///
    /// The returned future resolves once the user answered the prompt.
    fn request_if_needed(&self, permission: Permission) -> BoxFuture<'_, RequestOutcome>;
}
