//! Observable load state driven by a [`WeatherSource`].
//!
//! Every load gets a generation number. Bumping the generation and writing
//! the state both happen under the watch channel's write lock, so a result
//! is applied only while its generation is still the newest one.

use parking_lot::Mutex;
use std::sync::{
    Arc, Weak,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    Config,
    error::{FetchError, FetchErrorKind},
    location::{Coordinate, LONDON},
    model::{Units, WeatherRequest, WeatherSnapshot},
    source::WeatherSource,
};

/// Why the latest load failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub kind: FetchErrorKind,
    pub reason: String,
}

impl From<&FetchError> for LoadFailure {
    fn from(err: &FetchError) -> Self {
        Self { kind: err.kind(), reason: err.user_message() }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Success(Arc<WeatherSnapshot>),
    Failure(LoadFailure),
}

impl LoadState {
    fn from_outcome(outcome: Result<WeatherSnapshot, FetchError>) -> Self {
        match outcome {
            Ok(snapshot) => LoadState::Success(Arc::new(snapshot)),
            Err(err) => LoadState::Failure(LoadFailure::from(&err)),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    /// Success or Failure.
    pub fn is_settled(&self) -> bool {
        matches!(self, LoadState::Success(_) | LoadState::Failure(_))
    }

    pub fn snapshot(&self) -> Option<&WeatherSnapshot> {
        match self {
            LoadState::Success(snapshot) => Some(snapshot.as_ref()),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&LoadFailure> {
        match self {
            LoadState::Failure(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Loading => "loading",
            LoadState::Success(_) => "success",
            LoadState::Failure(_) => "failure",
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub default_location: Coordinate,
    pub units: Units,
    /// See [`WeatherStore::start`].
    pub reload_after: Option<Duration>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_location: LONDON,
            units: Units::default(),
            reload_after: Some(Duration::from_millis(crate::config::DEFAULT_RELOAD_AFTER_MS)),
        }
    }
}

impl StoreOptions {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            default_location: config.default_location()?.coordinate,
            units: config.units,
            reload_after: config.reload_after(),
        })
    }
}

#[derive(Debug)]
struct Shared {
    tx: watch::Sender<LoadState>,
    // Written only inside `tx.send_modify`.
    generation: AtomicU64,
    current: Mutex<WeatherRequest>,
    source: Arc<dyn WeatherSource>,
}

impl Shared {
    fn begin(&self, request: WeatherRequest) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *self.current.lock() = request;
            *state = LoadState::Loading;
        });
        tracing::info!(generation, coordinate = %request.coordinate, units = %request.units, "state -> loading");
        generation
    }

    fn finish(&self, generation: u64, outcome: Result<WeatherSnapshot, FetchError>) -> bool {
        self.tx.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = LoadState::from_outcome(outcome);
            tracing::info!(generation, state = state.label(), "state updated");
            true
        })
    }

    // Caller holds the watch write lock.
    fn bump_current(&self, state: &mut LoadState) -> (u64, WeatherRequest) {
        let request = *self.current.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *state = LoadState::Loading;
        tracing::info!(generation, coordinate = %request.coordinate, units = %request.units, "state -> loading");
        (generation, request)
    }

    /// Re-issue the current request.
    fn begin_current(&self) -> (u64, WeatherRequest) {
        let mut issued = (0, WeatherRequest { coordinate: LONDON, units: Units::default() });
        self.tx.send_modify(|state| issued = self.bump_current(state));
        issued
    }

    /// Re-issue the current request only if `expected` is still the newest
    /// generation and still loading. Check and bump happen under one lock.
    fn begin_if_pending(&self, expected: u64) -> Option<(u64, WeatherRequest)> {
        let mut issued = None;
        self.tx.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != expected || !state.is_loading() {
                return false;
            }
            issued = Some(self.bump_current(state));
            true
        });
        issued
    }

    fn spawn_load(self: &Arc<Self>, request: WeatherRequest) -> LoadTicket {
        let generation = self.begin(request);
        self.spawn_fetch(generation, request)
    }

    fn reload_if_pending(self: &Arc<Self>, expected: u64) -> Option<LoadTicket> {
        let (generation, request) = self.begin_if_pending(expected)?;
        Some(self.spawn_fetch(generation, request))
    }

    fn spawn_fetch(self: &Arc<Self>, generation: u64, request: WeatherRequest) -> LoadTicket {
        let source = Arc::clone(&self.source);
        let weak = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let outcome = source.fetch(request.coordinate, request.units).await;

            let Some(shared) = weak.upgrade() else {
                tracing::debug!(generation, "store dropped before load finished");
                return;
            };
            if !shared.finish(generation, outcome) {
                tracing::debug!(generation, "discarding superseded result");
            }
        });

        LoadTicket { generation, handle }
    }
}

/// Handle to one spawned load.
#[derive(Debug)]
pub struct LoadTicket {
    generation: u64,
    handle: JoinHandle<()>,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait until the fetch has returned and its result was applied or discarded.
    pub async fn finished(self) {
        if let Err(err) = self.handle.await {
            tracing::warn!(generation = self.generation, %err, "load task did not complete");
        }
    }
}

/// Owner of the single [`LoadState`] observed by the presentation layer.
///
/// Must be created inside a Tokio runtime; loads run as spawned tasks.
#[derive(Debug)]
pub struct WeatherStore {
    shared: Arc<Shared>,
    reload_guard: Option<JoinHandle<()>>,
}

impl WeatherStore {
    /// An idle store. Nothing is fetched until [`load`](Self::load) is called.
    pub fn new(source: Arc<dyn WeatherSource>, options: &StoreOptions) -> Self {
        let (tx, _rx) = watch::channel(LoadState::Idle);
        let shared = Shared {
            tx,
            generation: AtomicU64::new(0),
            current: Mutex::new(WeatherRequest {
                coordinate: options.default_location,
                units: options.units,
            }),
            source,
        };

        Self { shared: Arc::new(shared), reload_guard: None }
    }

    /// A store that immediately loads the default location.
    ///
    /// If `options.reload_after` is set and that first load is still the
    /// newest one and still loading when the delay expires, it is issued
    /// once more.
    pub fn start(source: Arc<dyn WeatherSource>, options: &StoreOptions) -> Self {
        let mut store = Self::new(source, options);
        let first = store.load(options.default_location, options.units);

        if let Some(after) = options.reload_after {
            let weak: Weak<Shared> = Arc::downgrade(&store.shared);
            let generation = first.generation();

            store.reload_guard = Some(tokio::spawn(async move {
                tokio::time::sleep(after).await;

                let Some(shared) = weak.upgrade() else { return };
                if shared.reload_if_pending(generation).is_some() {
                    tracing::info!(generation, ?after, "startup load still pending, reloaded");
                }
            }));
        }

        store
    }

    /// Mark the state Loading and fetch in the background.
    ///
    /// Any load still in flight is superseded: its result will be dropped.
    pub fn load(&self, coordinate: Coordinate, units: Units) -> LoadTicket {
        self.shared.spawn_load(WeatherRequest { coordinate, units })
    }

    /// Same as `load(coordinate, self.units())`.
    pub fn select_location(&self, coordinate: Coordinate) -> LoadTicket {
        self.load(coordinate, self.units())
    }

    /// Re-issue the most recent request.
    pub fn refresh(&self) -> LoadTicket {
        let (generation, request) = self.shared.begin_current();
        self.shared.spawn_fetch(generation, request)
    }

    /// Re-issue the current request if the load tagged `generation` is still
    /// the newest one and still loading. This is the startup reload step.
    pub fn reload_if_pending(&self, generation: u64) -> Option<LoadTicket> {
        self.shared.reload_if_pending(generation)
    }

    pub fn current_request(&self) -> WeatherRequest {
        *self.shared.current.lock()
    }

    pub fn units(&self) -> Units {
        self.current_request().units
    }

    pub fn state(&self) -> LoadState {
        self.shared.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.shared.tx.subscribe()
    }

    /// Generation of the newest load; 0 before the first one.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }
}

impl Drop for WeatherStore {
    fn drop(&mut self) {
        if let Some(guard) = self.reload_guard.take() {
            guard.abort();
        }
    }
}
