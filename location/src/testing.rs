//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use locator_permission::{Permission, PermissionManager, PermissionStatus, RequestOutcome};

use crate::{
    Location, LocationBatch, LocationDelegate, LocationError, LocationProvider, LocationRequest,
    LocationUpdatesListener, ProviderError, SettingsAdequacy, SettingsClient, UpdateHandle,
};

pub fn location(latitude: f64) -> Location {
    Location::new(latitude, -latitude, 1_700_000_000_000)
}

pub struct FakePermissions {
    status: Mutex<PermissionStatus>,
    answer: RequestOutcome,
    requests: AtomicUsize,
}

impl FakePermissions {
    pub fn new(status: PermissionStatus) -> Self {
        Self {
            status: Mutex::new(status),
            answer: RequestOutcome::Denied {
                do_not_ask_again: false,
            },
            requests: AtomicUsize::new(0),
        }
    }

    pub fn answering(mut self, answer: RequestOutcome) -> Self {
        self.answer = answer;
        self
    }

    pub fn set_status(&self, status: PermissionStatus) {
        *self.status.lock().unwrap() = status;
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PermissionManager for FakePermissions {
    fn has_permission(&self, _permission: Permission) -> bool {
        self.status.lock().unwrap().is_granted()
    }

    fn permission_status(&self, _permission: Permission) -> PermissionStatus {
        *self.status.lock().unwrap()
    }

    fn request_if_needed(&self, _permission: Permission) -> BoxFuture<'_, RequestOutcome> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let answer = self.answer;
        self.set_status(match answer {
            RequestOutcome::Granted => PermissionStatus::Granted,
            RequestOutcome::Denied {
                do_not_ask_again: true,
            } => PermissionStatus::DeniedDoNotAskAgain,
            RequestOutcome::Denied { .. } => PermissionStatus::Denied,
        });
        Box::pin(async move { answer })
    }
}

pub struct FakeProvider {
    last: Mutex<Result<Option<Location>, ProviderError>>,
    retry_batches: Mutex<VecDeque<Option<LocationBatch>>>,
    close_retry_streams: bool,
    delegates: Mutex<Vec<(UpdateHandle, Arc<dyn LocationDelegate>)>>,
    requested: Mutex<Vec<UpdateHandle>>,
    removed: Mutex<Vec<UpdateHandle>>,
    next_handle: AtomicU64,
    fetches: AtomicUsize,
    delivered: AtomicUsize,
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self {
            last: Mutex::new(Ok(None)),
            retry_batches: Mutex::new(VecDeque::new()),
            close_retry_streams: false,
            delegates: Mutex::new(Vec::new()),
            requested: Mutex::new(Vec::new()),
            removed: Mutex::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            fetches: AtomicUsize::new(0),
            delivered: AtomicUsize::new(0),
        }
    }
}

impl FakeProvider {
    pub fn with_last_location(self, last: Result<Option<Location>, ProviderError>) -> Self {
        *self.last.lock().unwrap() = last;
        self
    }

    /// Batches delivered synchronously to the next subscription.
    pub fn with_retry_batches(self, batches: Vec<Option<LocationBatch>>) -> Self {
        *self.retry_batches.lock().unwrap() = batches.into();
        self
    }

    /// Subscriptions drop their delegate right away.
    pub fn closing_retry_streams(mut self) -> Self {
        self.close_retry_streams = true;
        self
    }

    /// Delivers a batch to every active subscription.
    pub fn emit(&self, batch: Option<LocationBatch>) {
        for delegate in self.delegates() {
            delegate.on_location_result(batch.clone());
        }
    }

    pub fn delegates(&self) -> Vec<Arc<dyn LocationDelegate>> {
        self.delegates
            .lock()
            .unwrap()
            .iter()
            .map(|(_, delegate)| delegate.clone())
            .collect()
    }

    pub fn requested(&self) -> Vec<UpdateHandle> {
        self.requested.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<UpdateHandle> {
        self.removed.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }
}

impl LocationProvider for FakeProvider {
    fn last_location(&self) -> BoxFuture<'_, Result<Option<Location>, ProviderError>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let last = self.last.lock().unwrap().clone();
        Box::pin(async move { last })
    }

    fn request_location_updates(
        &self,
        _request: &LocationRequest,
        delegate: Arc<dyn LocationDelegate>,
    ) -> UpdateHandle {
        let handle = UpdateHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.requested.lock().unwrap().push(handle);

        let batches: Vec<_> = self.retry_batches.lock().unwrap().drain(..).collect();
        for batch in batches {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            delegate.on_location_result(batch);
        }

        if !self.close_retry_streams {
            self.delegates.lock().unwrap().push((handle, delegate));
        }
        handle
    }

    fn remove_location_updates(&self, handle: UpdateHandle) {
        self.removed.lock().unwrap().push(handle);
        self.delegates
            .lock()
            .unwrap()
            .retain(|(registered, _)| *registered != handle);
    }
}

pub struct FakeSettingsClient {
    adequacy: Mutex<SettingsAdequacy>,
    gate: Option<(async_channel::Sender<()>, async_channel::Receiver<()>)>,
    fail_launch: bool,
    launches: AtomicUsize,
    checked: Mutex<Vec<LocationRequest>>,
}

impl FakeSettingsClient {
    fn with_adequacy(adequacy: SettingsAdequacy) -> Self {
        Self {
            adequacy: Mutex::new(adequacy),
            gate: None,
            fail_launch: false,
            launches: AtomicUsize::new(0),
            checked: Mutex::new(Vec::new()),
        }
    }

    pub fn adequate() -> Self {
        Self::with_adequacy(SettingsAdequacy::Adequate)
    }

    pub fn inadequate(resolvable: bool) -> Self {
        Self::with_adequacy(SettingsAdequacy::Inadequate { resolvable })
    }

    /// Settings checks stay pending until [`Self::release`].
    pub fn gated(mut self) -> Self {
        self.gate = Some(async_channel::unbounded());
        self
    }

    /// Completes every pending and future settings check.
    pub fn release(&self) {
        if let Some((sender, _)) = &self.gate {
            sender.close();
        }
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn set_adequacy(&self, adequacy: SettingsAdequacy) {
        *self.adequacy.lock().unwrap() = adequacy;
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn checked_requests(&self) -> Vec<LocationRequest> {
        self.checked.lock().unwrap().clone()
    }
}

impl SettingsClient for FakeSettingsClient {
    fn check_location_settings(&self, request: LocationRequest) -> BoxFuture<'_, SettingsAdequacy> {
        self.checked.lock().unwrap().push(request);
        let adequacy = *self.adequacy.lock().unwrap();
        let gate = self.gate.as_ref().map(|(_, receiver)| receiver.clone());
        Box::pin(async move {
            if let Some(gate) = gate {
                // Only ever closed, never sent to.
                let _ = gate.recv().await;
            }
            adequacy
        })
    }

    fn start_resolution(&self) -> Result<(), String> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            Err("activity not found".into())
        } else {
            Ok(())
        }
    }
}

type Hook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct RecordingListener {
    locations: Mutex<Vec<Location>>,
    errors: Mutex<Vec<LocationError>>,
    journal: Option<(usize, Arc<Mutex<Vec<usize>>>)>,
    hook: Mutex<Option<Arc<Hook>>>,
}

impl RecordingListener {
    /// Also appends `tag` to `journal` on every location.
    pub fn tagged(tag: usize, journal: Arc<Mutex<Vec<usize>>>) -> Self {
        Self {
            journal: Some((tag, journal)),
            ..Self::default()
        }
    }

    /// Runs `hook` after every recorded location.
    pub fn set_hook(&self, hook: Hook) {
        *self.hook.lock().unwrap() = Some(Arc::new(hook));
    }

    pub fn locations(&self) -> Vec<Location> {
        self.locations.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<LocationError> {
        self.errors.lock().unwrap().clone()
    }
}

impl LocationUpdatesListener for RecordingListener {
    fn on_location_changed(&self, location: &Location) {
        self.locations.lock().unwrap().push(location.clone());
        if let Some((tag, journal)) = &self.journal {
            journal.lock().unwrap().push(*tag);
        }
        let hook = self.hook.lock().unwrap().clone();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn on_location_changed_error(&self, error: &LocationError) {
        self.errors.lock().unwrap().push(error.clone());
    }
}
