//! Recovering a fix through a short-lived update stream.
//!
//! When the provider has no cached location, the source opens a temporary
//! stream and takes the first location it delivers, giving up after a
//! bounded number of deliveries.

use std::fmt;
use std::sync::Arc;

use async_channel::{Receiver, Sender, unbounded};
use log::{debug, warn};

use crate::{
    Location, LocationBatch, LocationDelegate, LocationError, LocationProvider, LocationRequest,
    LocationResult, UpdateHandle,
};

/// Deliveries a retry session consumes before giving up.
pub const DEFAULT_RETRY_LIMIT: u32 = 5;

const STREAM_CLOSED: &str = "location updates ended before a fix was found";

/// What a retry session decided after one delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryStep {
    /// Keep waiting for the next delivery.
    Pending,
    /// A fix arrived.
    Found(Location),
    /// The attempt budget is spent.
    Exhausted,
}

/// Attempt counter of one retry session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySession {
    attempts: u32,
    max_attempts: u32,
}

impl RetrySession {
    /// Creates a session allowing `max_attempts` deliveries.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
        }
    }

    /// Deliveries consumed so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The attempt budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Consumes one delivery. Empty and missing batches count as attempts.
    pub fn on_batch(&mut self, batch: Option<LocationBatch>) -> RetryStep {
        self.attempts += 1;
        if let Some(location) = batch.and_then(|batch| batch.locations.into_iter().next()) {
            return RetryStep::Found(location);
        }
        if self.attempts >= self.max_attempts {
            RetryStep::Exhausted
        } else {
            RetryStep::Pending
        }
    }
}

struct ChannelLocationDelegate {
    sender: Sender<Option<LocationBatch>>,
}

impl fmt::Debug for ChannelLocationDelegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelLocationDelegate").finish()
    }
}

impl LocationDelegate for ChannelLocationDelegate {
    fn on_location_result(&self, batch: Option<LocationBatch>) {
        if let Err(err) = self.sender.try_send(batch) {
            warn!("dropping retry location batch: {err}");
        }
    }
}

/// The temporary stream of one retry session. Removing it from the
/// provider on drop also covers callers that abandon the future.
struct RetryStream {
    provider: Arc<dyn LocationProvider>,
    handle: UpdateHandle,
    receiver: Receiver<Option<LocationBatch>>,
}

impl RetryStream {
    fn open(provider: Arc<dyn LocationProvider>, request: &LocationRequest) -> Self {
        let (sender, receiver) = unbounded();
        let delegate = Arc::new(ChannelLocationDelegate { sender });
        let handle = provider.request_location_updates(request, delegate);
        debug!("retry stream {handle} opened");
        Self {
            provider,
            handle,
            receiver,
        }
    }
}

impl Drop for RetryStream {
    fn drop(&mut self) {
        self.receiver.close();
        self.provider.remove_location_updates(self.handle);
        debug!("retry stream {} removed", self.handle);
    }
}

/// Opens a temporary update stream and waits for its first location.
pub(crate) async fn recover_fix(
    provider: Arc<dyn LocationProvider>,
    request: &LocationRequest,
    max_attempts: u32,
) -> LocationResult<Location> {
    let stream = RetryStream::open(provider, request);
    let mut session = RetrySession::new(max_attempts);

    loop {
        let Ok(batch) = stream.receiver.recv().await else {
            warn!("retry stream {} closed by the provider", stream.handle);
            return Err(LocationError::FusedLocation(STREAM_CLOSED.into()));
        };
        match session.on_batch(batch) {
            RetryStep::Pending => {
                debug!(
                    "retry attempt {}/{} without a location",
                    session.attempts(),
                    session.max_attempts()
                );
            }
            RetryStep::Found(location) => {
                debug!("retry attempt {} produced a fix", session.attempts());
                return Ok(location);
            }
            RetryStep::Exhausted => return Err(LocationError::RetryLimit),
        }
    }
}
