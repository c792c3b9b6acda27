use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use fintrack_core::{
    ApiError, ApiResult, AuthProvider, Backend, BudgetService, CategoryService, EntityStore,
    SessionAuth, TransactionService,
};
use fintrack_domain::{
    AlertSeverity, Budget, BudgetDraft, BudgetPeriod, Category, CategoryDraft, CategoryPatch,
    Entity, EntryKind, Transaction, TransactionDraft,
};
use secrecy::SecretString;

/// In-memory backend that counts calls and can be told to fail or stall.
struct FakeBackend<T: Entity> {
    records: Mutex<Vec<T>>,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delay: Duration,
    failure: Mutex<Option<ApiError>>,
    rewrite_update_id: Option<String>,
    panic_next: AtomicBool,
}

impl<T: Entity> FakeBackend<T> {
    fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            list_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            failure: Mutex::new(None),
            rewrite_update_id: None,
            panic_next: AtomicBool::new(false),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn seeded(self, records: Vec<T>) -> Self {
        *self.records.lock().expect("records lock") = records;
        self
    }

    fn fail_with(&self, err: Option<ApiError>) {
        *self.failure.lock().expect("failure lock") = err;
    }

    fn panic_once(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    async fn settle(&self) -> ApiResult<()> {
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("backend crashed");
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.failure.lock().expect("failure lock").clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl<T: Entity> Backend<T> for FakeBackend<T> {
    async fn list_all(&self, _token: &SecretString) -> ApiResult<Vec<T>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.settle().await?;
        Ok(self.records.lock().expect("records lock").clone())
    }

    async fn get(&self, _token: &SecretString, id: &str) -> ApiResult<T> {
        self.settle().await?;
        self.records
            .lock()
            .expect("records lock")
            .iter()
            .find(|record| record.has_id(id))
            .cloned()
            .ok_or_else(|| ApiError::not_found(id))
    }

    async fn create(&self, _token: &SecretString, draft: &T::Draft) -> ApiResult<T> {
        self.settle().await?;
        let mut record = T::from_draft(draft.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        record.assign_id(format!("id-{id}"));
        self.records
            .lock()
            .expect("records lock")
            .push(record.clone());
        Ok(record)
    }

    async fn update(&self, _token: &SecretString, id: &str, patch: &T::Patch) -> ApiResult<T> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.settle().await?;
        let mut records = self.records.lock().expect("records lock");
        let record = records
            .iter_mut()
            .find(|record| record.has_id(id))
            .ok_or_else(|| ApiError::not_found(id))?;
        record.apply_patch(patch);
        let mut returned = record.clone();
        if let Some(other) = &self.rewrite_update_id {
            returned.assign_id(other.clone());
        }
        Ok(returned)
    }

    async fn delete(&self, _token: &SecretString, id: &str) -> ApiResult<()> {
        self.settle().await?;
        let mut records = self.records.lock().expect("records lock");
        let before = records.len();
        records.retain(|record| !record.has_id(id));
        if records.len() == before {
            return Err(ApiError::not_found(id));
        }
        Ok(())
    }
}

fn signed_in() -> Arc<dyn AuthProvider> {
    Arc::new(SessionAuth::with_token("test-token"))
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).expect("valid date")
}

fn seeded_category(id: &str, name: &str) -> Category {
    let mut category = Category::from_draft(CategoryDraft::new(name, EntryKind::Expense));
    category.assign_id(id.to_string());
    category
}

fn seeded_budget(id: &str, amount: f64, spent: f64) -> Budget {
    let draft = BudgetDraft::new("cat-1", amount, BudgetPeriod::Monthly, day(1))
        .with_category_name("Groceries")
        .with_spent(spent);
    let mut budget = Budget::from_draft(draft);
    budget.assign_id(id.to_string());
    budget
}

fn category_store(backend: Arc<FakeBackend<Category>>) -> EntityStore<Category> {
    CategoryService::open(backend, signed_in())
}

#[tokio::test]
async fn concurrent_loads_share_one_fetch() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_delay(Duration::from_millis(50))
            .seeded(vec![seeded_category("c1", "Food")]),
    );
    let store = category_store(backend.clone());

    let (first, second) = tokio::join!(store.load(false), store.load(false));

    assert_eq!(backend.list_calls(), 1);
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert!(!store.loading());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn loads_racing_on_worker_threads_fetch_once() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_delay(Duration::from_millis(20))
            .seeded(vec![seeded_category("c1", "Food")]),
    );
    let store = category_store(backend.clone());

    let mut tasks = Vec::new();
    for n in 0..32u64 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(n % 8 * 5)).await;
            store.load(false).await
        }));
    }
    for task in tasks {
        assert_eq!(task.await.expect("join").len(), 1);
    }
    assert_eq!(backend.list_calls(), 1);
}

#[tokio::test]
async fn cached_items_are_served_without_fetching() {
    let backend = Arc::new(FakeBackend::new().seeded(vec![seeded_category("c1", "Food")]));
    let store = category_store(backend.clone());

    store.load(false).await;
    store.load(false).await;
    assert_eq!(backend.list_calls(), 1);

    store.load(true).await;
    assert_eq!(backend.list_calls(), 2);
}

#[tokio::test]
async fn empty_cache_is_refetched() {
    let backend = Arc::new(FakeBackend::<Category>::new());
    let store = category_store(backend.clone());

    assert!(store.load(false).await.is_empty());
    assert!(store.load(false).await.is_empty());
    assert_eq!(backend.list_calls(), 2);
}

#[tokio::test]
async fn load_without_credential_reports_sign_in() {
    let backend = Arc::new(FakeBackend::<Budget>::new());
    let service = BudgetService::new(backend.clone(), Arc::new(SessionAuth::new()));

    let items = service.store().load(false).await;

    assert!(items.is_empty());
    assert_eq!(backend.list_calls(), 0);
    assert_eq!(
        service.store().error().as_deref(),
        Some("Please sign in to load budgets.")
    );
    assert!(!service.store().loading());
}

#[tokio::test]
async fn mutations_without_credential_fail_fast() {
    let backend = Arc::new(FakeBackend::<Category>::new());
    let store = CategoryService::open(backend, Arc::new(SessionAuth::new()));

    let err = store
        .create(CategoryDraft::new("Food", EntryKind::Expense))
        .await
        .expect_err("unauthenticated");

    assert_eq!(err, ApiError::Unauthenticated);
    assert_eq!(
        store.error().as_deref(),
        Some("Please sign in to create categories.")
    );
}

#[tokio::test]
async fn failed_load_keeps_previous_items_and_sets_message() {
    let backend = Arc::new(FakeBackend::new().seeded(vec![seeded_category("c1", "Food")]));
    let store = category_store(backend.clone());
    store.load(false).await;

    backend.fail_with(Some(ApiError::ServerError { status: 500 }));
    let items = store.load(true).await;

    assert!(items.is_empty());
    assert_eq!(store.len(), 1);
    assert_eq!(
        store.error().as_deref(),
        Some("Server error. Please try again later.")
    );

    backend.fail_with(None);
    store.load(true).await;
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn unreachable_backend_message_wins() {
    let backend = Arc::new(FakeBackend::<Category>::new());
    backend.fail_with(Some(ApiError::NetworkUnreachable("refused".into())));
    let store = category_store(backend);

    store.load(false).await;

    assert_eq!(
        store.error().as_deref(),
        Some("Unable to reach the server. Please check the API and try again.")
    );
}

#[tokio::test]
async fn transactions_are_prepended_with_distinct_ids() {
    let backend = Arc::new(FakeBackend::<Transaction>::new());
    let store = TransactionService::open(backend, signed_in());

    let first = store
        .create(TransactionDraft::new(
            "Coffee",
            3.5,
            EntryKind::Expense,
            "c1",
            day(2),
        ))
        .await
        .expect("create first");
    let second = store
        .create(TransactionDraft::new(
            "Lunch",
            12.0,
            EntryKind::Expense,
            "c1",
            day(3),
        ))
        .await
        .expect("create second");

    assert_ne!(first.id, second.id);
    let titles: Vec<String> = store.items().into_iter().map(|txn| txn.title).collect();
    assert_eq!(titles, vec!["Lunch", "Coffee"]);
}

#[tokio::test]
async fn categories_are_appended() {
    let backend = Arc::new(FakeBackend::<Category>::new());
    let store = category_store(backend);

    store
        .create(CategoryDraft::new("Food", EntryKind::Expense))
        .await
        .expect("create food");
    store
        .create(CategoryDraft::new("Salary", EntryKind::Income))
        .await
        .expect("create salary");

    let names: Vec<String> = store.items().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Food", "Salary"]);
}

#[tokio::test]
async fn update_of_unknown_id_skips_backend() {
    let backend = Arc::new(FakeBackend::new().seeded(vec![seeded_category("c1", "Food")]));
    let store = category_store(backend.clone());
    store.load(false).await;
    let before = store.items();

    let err = store
        .update("missing", CategoryPatch::rename("Other"))
        .await
        .expect_err("not cached");

    assert!(matches!(err, ApiError::NotFound { .. }));
    assert_eq!(backend.update_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.items(), before);
    assert_eq!(store.error().as_deref(), Some("Failed to update category"));
}

#[tokio::test]
async fn update_replaces_record_in_place() {
    let backend = Arc::new(FakeBackend::new().seeded(vec![
        seeded_category("c1", "Food"),
        seeded_category("c2", "Rent"),
    ]));
    let store = category_store(backend);
    store.load(false).await;

    let updated = store
        .update("c1", CategoryPatch::rename("Groceries"))
        .await
        .expect("update");

    assert_eq!(updated.name, "Groceries");
    let names: Vec<String> = store.items().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Groceries", "Rent"]);
}

#[tokio::test]
async fn update_keeps_original_id_when_backend_rewrites_it() {
    let mut backend = FakeBackend::new().seeded(vec![seeded_category("c1", "Food")]);
    backend.rewrite_update_id = Some("c999".into());
    let store = category_store(Arc::new(backend));
    store.load(false).await;

    let updated = store
        .update("c1", CategoryPatch::rename("Groceries"))
        .await
        .expect("update");

    assert_eq!(updated.id.as_deref(), Some("c1"));
    assert!(store.find("c1").is_some());
    assert!(store.find("c999").is_none());
}

#[tokio::test]
async fn delete_drops_record_and_reports_missing_ids() {
    let backend = Arc::new(FakeBackend::new().seeded(vec![
        seeded_category("c1", "Food"),
        seeded_category("c2", "Rent"),
    ]));
    let store = category_store(backend);
    store.load(false).await;

    store.delete("c1").await.expect("delete");
    assert_eq!(store.len(), 1);

    let err = store.delete("c1").await.expect_err("already gone");
    assert!(matches!(err, ApiError::NotFound { .. }));
    assert_eq!(store.len(), 1);
    assert_eq!(store.error().as_deref(), Some("Failed to delete category"));
}

#[tokio::test]
async fn blank_ids_are_rejected() {
    let store = category_store(Arc::new(FakeBackend::new()));

    let err = store.get("  ").await.expect_err("blank id");

    assert!(matches!(err, ApiError::ValidationFailed { .. }));
    assert_eq!(store.error().as_deref(), Some("A category id is required."));
}

#[tokio::test]
async fn get_leaves_cache_untouched() {
    let backend = Arc::new(FakeBackend::new().seeded(vec![seeded_category("c1", "Food")]));
    let store = category_store(backend);

    let fetched = store.get("c1").await.expect("get");

    assert_eq!(fetched.name, "Food");
    assert!(store.is_empty());
    assert!(!store.loading());
}

#[tokio::test]
async fn alerts_follow_budget_changes() {
    let backend = Arc::new(FakeBackend::new().seeded(vec![
        seeded_budget("b1", 1000.0, 850.0),
        seeded_budget("b2", 1000.0, 500.0),
    ]));
    let service = BudgetService::new(backend, signed_in());
    service.store().load(false).await;

    let alerts = service.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Warning);

    service.record_spent("b1", 1000.0).await.expect("spent");
    let alerts = service.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::Danger);
    assert_eq!(alerts[0].percentage, 100.0);

    service.record_spent("b1", 100.0).await.expect("spent");
    assert!(service.alerts().is_empty());
}

#[tokio::test]
async fn created_budget_can_raise_alert() {
    let backend = Arc::new(FakeBackend::<Budget>::new());
    let service = BudgetService::new(backend, signed_in());

    service
        .store()
        .create(
            BudgetDraft::new("cat-9", 200.0, BudgetPeriod::Monthly, day(1))
                .with_category_name("Travel")
                .with_spent(190.0),
        )
        .await
        .expect("create budget");

    let alerts = service.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].category_name, "Travel");
}

#[tokio::test]
async fn observers_see_loading_transitions() {
    let backend = Arc::new(FakeBackend::new().seeded(vec![seeded_category("c1", "Food")]));
    let store = category_store(backend);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let subscription = store.subscribe(move |snapshot| {
        sink.lock()
            .expect("seen lock")
            .push((snapshot.loading, snapshot.items.len()));
    });

    store.load(false).await;

    let events = seen.lock().expect("seen lock").clone();
    assert_eq!(events.first(), Some(&(true, 0)));
    assert!(events.contains(&(true, 1)));
    assert_eq!(events.last(), Some(&(false, 1)));

    assert!(store.unsubscribe(subscription));
    let count = seen.lock().expect("seen lock").len();
    store.load(true).await;
    assert_eq!(seen.lock().expect("seen lock").len(), count);
}

#[tokio::test]
async fn dropped_caller_still_settles_operation() {
    let backend = Arc::new(
        FakeBackend::<Category>::new().with_delay(Duration::from_millis(30)),
    );
    let store = category_store(backend.clone());

    let pending = tokio::time::timeout(
        Duration::from_millis(5),
        store.create(CategoryDraft::new("Food", EntryKind::Expense)),
    )
    .await;
    assert!(pending.is_err());
    assert!(store.loading());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!store.loading());
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn load_recovers_after_backend_panic() {
    let backend = Arc::new(FakeBackend::new().seeded(vec![seeded_category("c1", "Rent")]));
    backend.panic_once();
    let store = category_store(backend.clone());

    assert!(store.load(true).await.is_empty());
    assert_eq!(store.error().as_deref(), Some("Failed to load categories"));
    assert!(!store.loading());

    let items = store.load(true).await;
    assert_eq!(items.len(), 1);
    assert_eq!(backend.list_calls(), 2);
    assert!(store.error().is_none());

    backend.panic_once();
    store.load(true).await;
    assert_eq!(backend.list_calls(), 3);
    assert_eq!(store.load(false).await.len(), 1);
    assert_eq!(backend.list_calls(), 3);
}

#[tokio::test]
async fn write_panic_is_recorded_as_failure() {
    let backend = Arc::new(FakeBackend::<Category>::new());
    backend.panic_once();
    let store = category_store(backend.clone());

    let err = store
        .create(CategoryDraft::new("Food", EntryKind::Expense))
        .await
        .expect_err("task panicked");

    assert!(matches!(err, ApiError::Unknown(_)));
    assert_eq!(store.error().as_deref(), Some("Failed to create category"));
    assert!(!store.loading());
    assert!(store.is_empty());

    store
        .create(CategoryDraft::new("Food", EntryKind::Expense))
        .await
        .expect("second create");
    assert_eq!(store.len(), 1);
}

#[test]
fn persisted_session_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session").join("token");

    let auth = SessionAuth::persisted(path.clone()).expect("open");
    assert!(!auth.is_authenticated());
    auth.set_token("  abc123\n").expect("set token");

    let reopened = SessionAuth::persisted(path.clone()).expect("reopen");
    assert!(reopened.is_authenticated());

    reopened.clear_token().expect("clear");
    assert!(!path.exists());
    assert!(!SessionAuth::persisted(path).expect("reopen").is_authenticated());
}

#[cfg(unix)]
#[test]
fn persisted_token_is_private_to_owner() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("session.token");

    let auth = SessionAuth::persisted(path.clone()).expect("open");
    auth.set_token("secret-bearer").expect("set token");
    auth.set_token("rotated-bearer").expect("rotate token");

    let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o077, 0);
    assert_eq!(
        std::fs::read_to_string(&path).expect("token file"),
        "rotated-bearer"
    );

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("session.token")]);
}
