use std::fmt;

use thiserror::Error;

/// Stable symbolic codes reported alongside coded location errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Fine location permission is not granted.
    MissingPermission,
    /// Fine location permission is not granted and may not be asked for again.
    MissingPermissionDoNotAskAgain,
    /// The user dismissed the permission prompt.
    CanceledPermissionChange,
    /// The platform provider failed to fetch a location.
    FusedLocationError,
    /// No fix arrived within the retry budget.
    LocationUpdatesRetryLimit,
}

impl ErrorCode {
    /// Returns the code as its symbolic name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingPermission => "MISSING_PERMISSION",
            Self::MissingPermissionDoNotAskAgain => "MISSING_PERMISSION_DO_NOT_ASK_AGAIN",
            Self::CanceledPermissionChange => "CANCELED_PERMISSION_CHANGE",
            Self::FusedLocationError => "FUSED_LOCATION_ERROR",
            Self::LocationUpdatesRetryLimit => "LOCATION_UPDATES_RETRY_LIMIT",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures of a device settings check or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// Settings are inadequate and no dialog can fix them.
    #[error("Settings resolution is not fulfilled")]
    NotFulfilled,
    /// Settings are inadequate and the caller did not allow prompting.
    #[error("Location settings aren't met")]
    NotMet,
    /// The resolution dialog could not be shown.
    #[error("Send Intent to change location settings failed")]
    LaunchFailed,
    /// The user dismissed the resolution dialog.
    #[error("Settings change request canceled by user")]
    Canceled,
}

/// Failure reported by the platform provider for a last-location fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    /// Creates a provider error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that can occur when acquiring a location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// Location permission was not granted.
    #[error("Location permission missing")]
    MissingPermission,
    /// Location permission was not granted and the user opted out of prompts.
    #[error("Location permission missing, never ask me again")]
    MissingPermissionDoNotAskAgain,
    /// The user dismissed the permission prompt.
    #[error("Permission change request canceled by user")]
    CanceledPermissionChange,
    /// The platform provider reported an error.
    #[error("{0}")]
    FusedLocation(String),
    /// The retry stream ended without a fix.
    #[error("Location updates retry limit reached. No location found.")]
    RetryLimit,
    /// Device location settings are inadequate.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl LocationError {
    /// The symbolic code of this error; settings failures are uncoded.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::MissingPermission => Some(ErrorCode::MissingPermission),
            Self::MissingPermissionDoNotAskAgain => Some(ErrorCode::MissingPermissionDoNotAskAgain),
            Self::CanceledPermissionChange => Some(ErrorCode::CanceledPermissionChange),
            Self::FusedLocation(_) => Some(ErrorCode::FusedLocationError),
            Self::RetryLimit => Some(ErrorCode::LocationUpdatesRetryLimit),
            Self::Settings(_) => None,
        }
    }
}

impl From<ProviderError> for LocationError {
    fn from(err: ProviderError) -> Self {
        Self::FusedLocation(err.0)
    }
}
