//! Generic cache-and-sync store shared by the budget, category and transaction services.

use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard,
    },
};

use fintrack_domain::Entity;
use futures::future::{BoxFuture, FutureExt, Shared};
use secrecy::SecretString;
use tokio::{
    sync::Mutex as AsyncMutex,
    task::{JoinError, JoinHandle},
};
use tracing::{debug, warn};

use crate::{ApiError, ApiResult, AuthProvider, Backend};

/// Where a freshly created record lands in the item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// Newest first, for logs.
    Prepend,
    /// Creation order, for reference data.
    Append,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Get,
    Create,
    Update,
    Delete,
}

impl Operation {
    fn verb(self) -> &'static str {
        match self {
            Operation::Load | Operation::Get => "load",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Per-domain naming and ordering rules of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreProfile {
    pub plural: &'static str,
    pub singular: &'static str,
    pub insert: InsertPosition,
}

impl StoreProfile {
    pub fn for_entity<T: Entity>(insert: InsertPosition) -> Self {
        Self {
            plural: T::RESOURCE,
            singular: T::LABEL,
            insert,
        }
    }

    pub fn sign_in_message(&self, operation: Operation) -> String {
        format!("Please sign in to {} {}.", operation.verb(), self.plural)
    }

    pub fn failure_message(&self, operation: Operation) -> String {
        match operation {
            Operation::Load => format!("Failed to load {}", self.plural),
            other => format!("Failed to {} {}", other.verb(), self.singular),
        }
    }
}

/// Point-in-time copy of a store's observable state.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot<T> {
    pub items: Vec<T>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Derived data recomputed from the full item list after every successful change.
pub trait DerivedView<T>: Send + Sync {
    fn recompute(&self, items: &[T]);
}

pub type SubscriptionId = u64;

type Observer<T> = Arc<dyn Fn(&StoreSnapshot<T>) + Send + Sync>;
type PendingLoad<T> = Shared<BoxFuture<'static, Vec<T>>>;

struct StoreState<T> {
    items: Vec<T>,
    pending: usize,
    error: Option<String>,
}

struct StoreInner<T: Entity> {
    profile: StoreProfile,
    backend: Arc<dyn Backend<T>>,
    auth: Arc<dyn AuthProvider>,
    views: Vec<Arc<dyn DerivedView<T>>>,
    state: RwLock<StoreState<T>>,
    in_flight: Mutex<Option<PendingLoad<T>>>,
    // Serialises backend access: check state, call backend, apply result.
    op_lock: AsyncMutex<()>,
    observers: RwLock<Vec<(SubscriptionId, Observer<T>)>>,
    next_subscription: AtomicU64,
}

/// Authoritative in-memory list of one entity type, kept in sync with a [`Backend`].
///
/// Every backend call runs on a spawned tokio task, so an operation settles and is
/// applied even when its caller stops awaiting it. Must be used inside a tokio runtime.
pub struct EntityStore<T: Entity> {
    inner: Arc<StoreInner<T>>,
}

impl<T: Entity> Clone for EntityStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Entity> fmt::Debug for EntityStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.read();
        f.debug_struct("EntityStore")
            .field("resource", &self.inner.profile.plural)
            .field("items", &state.items.len())
            .field("loading", &(state.pending > 0))
            .field("error", &state.error)
            .finish()
    }
}

impl<T: Entity> EntityStore<T> {
    pub fn new(
        profile: StoreProfile,
        backend: Arc<dyn Backend<T>>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self::with_views(profile, backend, auth, Vec::new())
    }

    pub fn with_views(
        profile: StoreProfile,
        backend: Arc<dyn Backend<T>>,
        auth: Arc<dyn AuthProvider>,
        views: Vec<Arc<dyn DerivedView<T>>>,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                profile,
                backend,
                auth,
                views,
                state: RwLock::new(StoreState {
                    items: Vec::new(),
                    pending: 0,
                    error: None,
                }),
                in_flight: Mutex::new(None),
                op_lock: AsyncMutex::new(()),
                observers: RwLock::new(Vec::new()),
                next_subscription: AtomicU64::new(1),
            }),
        }
    }

    pub fn profile(&self) -> &StoreProfile {
        &self.inner.profile
    }

    pub fn items(&self) -> Vec<T> {
        self.inner.read().items.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    pub fn loading(&self) -> bool {
        self.inner.read().pending > 0
    }

    pub fn error(&self) -> Option<String> {
        self.inner.read().error.clone()
    }

    pub fn snapshot(&self) -> StoreSnapshot<T> {
        self.inner.snapshot()
    }

    pub fn find(&self, id: &str) -> Option<T> {
        self.inner
            .read()
            .items
            .iter()
            .find(|item| item.has_id(id))
            .cloned()
    }

    /// Registers an observer called with a snapshot after each state transition.
    ///
    /// Observers run synchronously on the notifying thread and must not start store
    /// operations themselves.
    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&StoreSnapshot<T>) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);
        self.inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self
            .inner
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        observers.len() != before
    }

    /// Returns the cached items, or fetches them when the cache is empty or `force` is set.
    ///
    /// Concurrent callers share one outstanding fetch. Failures are recorded in
    /// [`error`](Self::error) and yield an empty list.
    pub async fn load(&self, force: bool) -> Vec<T> {
        if !force {
            let state = self.inner.read();
            if !state.items.is_empty() {
                debug!(resource = self.inner.profile.plural, "serving cached items");
                return state.items.clone();
            }
        }

        let Ok(token) = self.inner.require_token(Operation::Load) else {
            return Vec::new();
        };

        let pending = {
            let mut slot = self.inner.lock_in_flight();
            match slot.as_ref() {
                Some(pending) => {
                    debug!(resource = self.inner.profile.plural, "joining in-flight load");
                    pending.clone()
                }
                None => {
                    // A load may have settled between the cache check and taking the slot.
                    if !force {
                        let state = self.inner.read();
                        if !state.items.is_empty() {
                            return state.items.clone();
                        }
                    }
                    let guard = self.inner.begin();
                    let task = tokio::spawn(Arc::clone(&self.inner).run_load(token, guard));
                    let inner = Arc::clone(&self.inner);
                    let pending = async move {
                        match task.await {
                            Ok(items) => items,
                            Err(err) => {
                                inner.task_failed(Operation::Load, &err);
                                Vec::new()
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    *slot = Some(pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    /// Fetches one record without touching the cached list or the loading flag.
    pub async fn get(&self, id: &str) -> ApiResult<T> {
        let token = self.inner.require_token(Operation::Get)?;
        self.inner.require_id(Operation::Get, id)?;
        match self.inner.backend.get(&token, id).await {
            Ok(record) => Ok(record),
            Err(err) => {
                self.inner.record_failure(Operation::Get, &err);
                Err(err)
            }
        }
    }

    pub async fn create(&self, draft: T::Draft) -> ApiResult<T> {
        let token = self.inner.require_token(Operation::Create)?;
        let guard = self.inner.begin();
        let inner = Arc::clone(&self.inner);
        join(&self.inner, Operation::Create, tokio::spawn(async move {
            let _pending = guard;
            let _op = inner.op_lock.lock().await;
            match inner.backend.create(&token, &draft).await {
                Ok(record) => {
                    debug!(
                        resource = inner.profile.plural,
                        id = record.id().unwrap_or_default(),
                        "record created"
                    );
                    inner.transition(|state| {
                        merge_created(&mut state.items, record.clone(), inner.profile.insert);
                        true
                    });
                    Ok(record)
                }
                Err(err) => {
                    inner.record_failure(Operation::Create, &err);
                    Err(err)
                }
            }
        }))
        .await
    }

    /// Replaces the record `id` with the backend's representation after applying `patch`.
    ///
    /// Fails with [`ApiError::NotFound`] without contacting the backend when `id` is not
    /// among the cached items.
    pub async fn update(&self, id: &str, patch: T::Patch) -> ApiResult<T> {
        let token = self.inner.require_token(Operation::Update)?;
        self.inner.require_id(Operation::Update, id)?;
        let guard = self.inner.begin();
        let inner = Arc::clone(&self.inner);
        let id = id.to_string();
        join(&self.inner, Operation::Update, tokio::spawn(async move {
            let _pending = guard;
            let _op = inner.op_lock.lock().await;
            if !inner.contains(&id) {
                let err = ApiError::not_found(id);
                inner.record_failure(Operation::Update, &err);
                return Err(err);
            }
            match inner.backend.update(&token, &id, &patch).await {
                Ok(mut record) => {
                    if record.id() != Some(id.as_str()) {
                        warn!(
                            resource = inner.profile.plural,
                            id = %id,
                            returned = ?record.id(),
                            "backend returned a different identifier; keeping the original"
                        );
                        record.assign_id(id.clone());
                    }
                    inner.transition(|state| {
                        if let Some(slot) = state.items.iter_mut().find(|item| item.has_id(&id)) {
                            *slot = record.clone();
                        }
                        true
                    });
                    debug!(resource = inner.profile.plural, id = %id, "record updated");
                    Ok(record)
                }
                Err(err) => {
                    inner.record_failure(Operation::Update, &err);
                    Err(err)
                }
            }
        }))
        .await
    }

    /// Deletes `id` through the backend, then drops it from the cached items.
    ///
    /// Missing ids are the backend's call: remote backends report them, the local
    /// surrogate accepts them silently.
    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        let token = self.inner.require_token(Operation::Delete)?;
        self.inner.require_id(Operation::Delete, id)?;
        let guard = self.inner.begin();
        let inner = Arc::clone(&self.inner);
        let id = id.to_string();
        join(&self.inner, Operation::Delete, tokio::spawn(async move {
            let _pending = guard;
            let _op = inner.op_lock.lock().await;
            match inner.backend.delete(&token, &id).await {
                Ok(()) => {
                    inner.transition(|state| {
                        state.items.retain(|item| !item.has_id(&id));
                        true
                    });
                    debug!(resource = inner.profile.plural, id = %id, "record deleted");
                    Ok(())
                }
                Err(err) => {
                    inner.record_failure(Operation::Delete, &err);
                    Err(err)
                }
            }
        }))
        .await
    }
}

impl<T: Entity> StoreInner<T> {
    fn read(&self) -> RwLockReadGuard<'_, StoreState<T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, Option<PendingLoad<T>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> StoreSnapshot<T> {
        let state = self.read();
        StoreSnapshot {
            items: state.items.clone(),
            loading: state.pending > 0,
            error: state.error.clone(),
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.read().items.iter().any(|item| item.has_id(id))
    }

    /// Applies `change` under the state lock. When it reports that the items changed,
    /// derived views are recomputed before observers are notified.
    fn transition(&self, change: impl FnOnce(&mut StoreState<T>) -> bool) {
        let observed = !self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty();
        let snapshot = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            if change(&mut state) {
                for view in &self.views {
                    view.recompute(&state.items);
                }
            }
            observed.then(|| StoreSnapshot {
                items: state.items.clone(),
                loading: state.pending > 0,
                error: state.error.clone(),
            })
        };
        if let Some(snapshot) = snapshot {
            self.notify(&snapshot);
        }
    }

    fn notify(&self, snapshot: &StoreSnapshot<T>) {
        let observers: Vec<Observer<T>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(snapshot);
        }
    }

    /// Marks an operation as dispatched: loading on, previous error cleared.
    fn begin(self: &Arc<Self>) -> PendingGuard<T> {
        self.transition(|state| {
            state.pending += 1;
            state.error = None;
            false
        });
        PendingGuard {
            inner: Arc::clone(self),
        }
    }

    fn fail(&self, message: String) {
        self.transition(|state| {
            state.error = Some(message);
            false
        });
    }

    fn require_token(&self, operation: Operation) -> ApiResult<SecretString> {
        match self.auth.token() {
            Some(token) => Ok(token),
            None => {
                warn!(
                    resource = self.profile.plural,
                    operation = %operation,
                    "no credential available"
                );
                self.fail(self.profile.sign_in_message(operation));
                Err(ApiError::Unauthenticated)
            }
        }
    }

    fn require_id(&self, operation: Operation, id: &str) -> ApiResult<()> {
        if !id.trim().is_empty() {
            return Ok(());
        }
        let err = ApiError::validation(format!("A {} id is required.", self.profile.singular));
        self.record_failure(operation, &err);
        Err(err)
    }

    fn record_failure(&self, operation: Operation, err: &ApiError) {
        warn!(
            resource = self.profile.plural,
            operation = %operation,
            error = %err,
            "store operation failed"
        );
        self.fail(err.user_message(&self.profile.failure_message(operation)));
    }

    async fn run_load(self: Arc<Self>, token: SecretString, guard: PendingGuard<T>) -> Vec<T> {
        let in_flight = InFlightGuard {
            inner: Arc::clone(&self),
        };
        let items = {
            let _op = self.op_lock.lock().await;
            match self.backend.list_all(&token).await {
                Ok(fetched) => {
                    let fetched = dedupe_by_id(fetched);
                    debug!(
                        resource = self.profile.plural,
                        count = fetched.len(),
                        "load settled"
                    );
                    self.transition(|state| {
                        state.items = fetched.clone();
                        true
                    });
                    fetched
                }
                Err(err) => {
                    self.record_failure(Operation::Load, &err);
                    Vec::new()
                }
            }
        };
        drop(guard);
        drop(in_flight);
        items
    }

    /// Records a backend task that ended without a result, e.g. because it panicked.
    fn task_failed(&self, operation: Operation, err: &JoinError) {
        self.record_failure(operation, &ApiError::Unknown(format!("store task failed: {err}")));
    }
}

/// Keeps the loading flag raised until the owning operation settles, even on panic.
struct PendingGuard<T: Entity> {
    inner: Arc<StoreInner<T>>,
}

impl<T: Entity> Drop for PendingGuard<T> {
    fn drop(&mut self) {
        self.inner.transition(|state| {
            state.pending = state.pending.saturating_sub(1);
            false
        });
    }
}

/// Releases the single-flight slot when a load task ends, including by unwinding.
struct InFlightGuard<T: Entity> {
    inner: Arc<StoreInner<T>>,
}

impl<T: Entity> Drop for InFlightGuard<T> {
    fn drop(&mut self) {
        self.inner.lock_in_flight().take();
    }
}

async fn join<T: Entity, R>(
    inner: &StoreInner<T>,
    operation: Operation,
    task: JoinHandle<ApiResult<R>>,
) -> ApiResult<R> {
    match task.await {
        Ok(result) => result,
        Err(err) => {
            inner.task_failed(operation, &err);
            Err(ApiError::Unknown(format!("store task failed: {err}")))
        }
    }
}

fn merge_created<T: Entity>(items: &mut Vec<T>, record: T, position: InsertPosition) {
    let existing = record
        .id()
        .and_then(|id| items.iter().position(|item| item.has_id(id)));
    match (existing, position) {
        (Some(index), _) => items[index] = record,
        (None, InsertPosition::Prepend) => items.insert(0, record),
        (None, InsertPosition::Append) => items.push(record),
    }
}

fn dedupe_by_id<T: Entity>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| match item.id() {
            Some(id) if !id.is_empty() => seen.insert(id.to_string()),
            _ => true,
        })
        .collect()
}
