use serde::{Deserialize, Serialize};

/// Accuracy/power trade-off requested from the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Most accurate fix available, typically GPS.
    #[default]
    HighAccuracy,
    /// Block-level accuracy.
    BalancedPowerAccuracy,
    /// City-level accuracy.
    LowPower,
    /// Only fixes computed for other clients.
    NoPower,
}

impl Priority {
    /// The provider's numeric priority constant.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::HighAccuracy => 100,
            Self::BalancedPowerAccuracy => 102,
            Self::LowPower => 104,
            Self::NoPower => 105,
        }
    }
}

/// Parameters of a location request, also used for settings checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationRequest {
    /// Desired interval between updates, in milliseconds.
    pub update_interval_ms: u64,
    /// Fastest interval the app can handle, in milliseconds.
    pub fastest_interval_ms: u64,
    /// Accuracy/power trade-off.
    pub priority: Priority,
}

impl LocationRequest {
    /// Default update interval.
    pub const DEFAULT_UPDATE_INTERVAL_MS: u64 = 10_000;
    /// Default fastest interval.
    pub const DEFAULT_FASTEST_INTERVAL_MS: u64 = 5_000;

    /// Set the update interval.
    #[must_use]
    pub const fn with_update_interval_ms(mut self, interval_ms: u64) -> Self {
        self.update_interval_ms = interval_ms;
        self
    }

    /// Set the fastest interval.
    #[must_use]
    pub const fn with_fastest_interval_ms(mut self, interval_ms: u64) -> Self {
        self.fastest_interval_ms = interval_ms;
        self
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

impl Default for LocationRequest {
    fn default() -> Self {
        Self {
            update_interval_ms: Self::DEFAULT_UPDATE_INTERVAL_MS,
            fastest_interval_ms: Self::DEFAULT_FASTEST_INTERVAL_MS,
            priority: Priority::HighAccuracy,
        }
    }
}
