//! Platform location provider contract.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{Location, LocationBatch, LocationRequest, ProviderError};

/// Identifies one update subscription registered with a [`LocationProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpdateHandle(pub u64);

impl fmt::Display for UpdateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receives batches from a provider update stream.
pub trait LocationDelegate: Send + Sync {
    /// Called for every delivery, in the order the provider emits them.
    ///
    /// `None` stands for a delivery without a result.
    fn on_location_result(&self, batch: Option<LocationBatch>);
}

/// Host-side location provider (for example the fused location client).
pub trait LocationProvider: Send + Sync {
    /// Fetches the last known location. Resolves to `Ok(None)` when the
    /// provider has no cached fix.
    fn last_location(&self) -> BoxFuture<'_, Result<Option<Location>, ProviderError>>;

    /// Starts streaming updates for `request` into `delegate` until the
    /// returned handle is removed.
    fn request_location_updates(
        &self,
        request: &LocationRequest,
        delegate: Arc<dyn LocationDelegate>,
    ) -> UpdateHandle;

    /// Stops the stream registered under `handle`. Unknown handles are ignored.
    fn remove_location_updates(&self, handle: UpdateHandle);
}
