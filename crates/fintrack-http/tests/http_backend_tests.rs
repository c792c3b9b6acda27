use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use fintrack_core::{ApiError, Backend, CategoryService, SessionAuth};
use fintrack_domain::{Category, CategoryDraft, CategoryPatch, Entity, EntryKind};
use fintrack_http::{build_client, HttpBackend};
use secrecy::SecretString;
use serde_json::json;

const TOKEN: &str = "secret-token";

#[derive(Clone, Default)]
struct ApiState {
    categories: Arc<Mutex<Vec<Category>>>,
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some(format!("Bearer {TOKEN}").as_str())
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Invalid token" })),
    )
        .into_response()
}

fn missing() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Category not found" })),
    )
        .into_response()
}

async fn list(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let items = state.categories.lock().expect("state lock").clone();
    Json(items).into_response()
}

async fn create(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(draft): Json<CategoryDraft>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if draft.name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Name is required" })),
        )
            .into_response();
    }
    let mut categories = state.categories.lock().expect("state lock");
    let mut record = Category::from_draft(draft);
    record.assign_id(format!("srv-{}", categories.len() + 1));
    categories.push(record.clone());
    (StatusCode::CREATED, Json(record)).into_response()
}

async fn fetch(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let categories = state.categories.lock().expect("state lock");
    match categories.iter().find(|record| record.has_id(&id)) {
        Some(record) => Json(record.clone()).into_response(),
        None => missing(),
    }
}

async fn replace(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<CategoryPatch>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut categories = state.categories.lock().expect("state lock");
    match categories.iter_mut().find(|record| record.has_id(&id)) {
        Some(record) => {
            record.apply_patch(&patch);
            Json(record.clone()).into_response()
        }
        None => missing(),
    }
}

async fn remove(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut categories = state.categories.lock().expect("state lock");
    let before = categories.len();
    categories.retain(|record| !record.has_id(&id));
    if categories.len() == before {
        return missing();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn forbidden() -> Response {
    StatusCode::FORBIDDEN.into_response()
}

async fn broken() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response()
}

async fn slow() -> Response {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(Vec::<Category>::new()).into_response()
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/api/categories", get(list).post(create))
        .route(
            "/api/categories/{id}",
            get(fetch).put(replace).delete(remove),
        )
        .route("/forbidden/api/categories", get(forbidden))
        .route("/broken/api/categories", get(broken))
        .route("/slow/api/categories", get(slow))
        .with_state(ApiState::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn backend(base: &str) -> HttpBackend<Category> {
    HttpBackend::new(base, Duration::from_secs(5)).expect("client")
}

fn token() -> SecretString {
    SecretString::from(TOKEN.to_string())
}

#[test]
fn collection_url_joins_base_and_resource() {
    let backend = HttpBackend::<Category>::new("http://localhost:3000/", Duration::from_secs(1))
        .expect("client");
    assert_eq!(
        backend.collection_url(),
        "http://localhost:3000/api/categories"
    );
}

#[tokio::test]
async fn http_backend_crud_round_trip() {
    let base = spawn_server().await;
    let backend = backend(&base);

    let created = backend
        .create(&token(), &CategoryDraft::new("Food", EntryKind::Expense))
        .await
        .expect("create");
    assert_eq!(created.id.as_deref(), Some("srv-1"));
    assert_eq!(created.kind, EntryKind::Expense);

    let listed = backend.list_all(&token()).await.expect("list");
    assert_eq!(listed, vec![created.clone()]);

    let updated = backend
        .update(&token(), "srv-1", &CategoryPatch::rename("Groceries"))
        .await
        .expect("update");
    assert_eq!(updated.name, "Groceries");

    let fetched = backend.get(&token(), "srv-1").await.expect("get");
    assert_eq!(fetched, updated);

    backend.delete(&token(), "srv-1").await.expect("delete");
    assert!(backend.list_all(&token()).await.expect("list").is_empty());
}

#[tokio::test]
async fn backends_built_from_one_client_see_the_same_server() {
    let base = spawn_server().await;
    let client = build_client(Duration::from_secs(5)).expect("client");
    let writer = HttpBackend::<Category>::with_client(client.clone(), &base);
    let reader = HttpBackend::<Category>::with_client(client, &base);

    let created = writer
        .create(&token(), &CategoryDraft::new("Rent", EntryKind::Expense))
        .await
        .expect("create");

    assert_eq!(reader.list_all(&token()).await.expect("list"), vec![created]);
    assert_eq!(reader.collection_url(), writer.collection_url());
}

#[tokio::test]
async fn http_backend_maps_status_codes() {
    let base = spawn_server().await;
    let client = backend(&base);

    let bad_token = SecretString::from("wrong".to_string());
    let err = client.list_all(&bad_token).await.expect_err("401");
    assert_eq!(err, ApiError::Unauthorized);

    let err = client.get(&token(), "nope").await.expect_err("404");
    assert_eq!(
        err,
        ApiError::NotFound {
            id: "nope".into(),
            message: Some("Category not found".into()),
        }
    );

    let err = client.delete(&token(), "nope").await.expect_err("404");
    assert!(matches!(err, ApiError::NotFound { .. }));

    let err = client
        .create(&token(), &CategoryDraft::new("  ", EntryKind::Expense))
        .await
        .expect_err("400");
    assert_eq!(
        err,
        ApiError::ValidationFailed {
            status: Some(400),
            message: Some("Name is required".into()),
        }
    );

    let err = backend(&format!("{base}/forbidden"))
        .list_all(&token())
        .await
        .expect_err("403");
    assert_eq!(err, ApiError::Forbidden);

    let err = backend(&format!("{base}/broken"))
        .list_all(&token())
        .await
        .expect_err("503");
    assert_eq!(err, ApiError::ServerError { status: 503 });
}

#[tokio::test]
async fn http_backend_reports_unreachable_server() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = backend(&format!("http://{addr}"))
        .list_all(&token())
        .await
        .expect_err("connection refused");
    assert!(matches!(err, ApiError::NetworkUnreachable(_)));
}

#[tokio::test]
async fn http_backend_applies_request_timeout() {
    let base = spawn_server().await;
    let backend = HttpBackend::<Category>::new(&format!("{base}/slow"), Duration::from_millis(50))
        .expect("client");

    let err = backend.list_all(&token()).await.expect_err("timeout");
    assert!(matches!(err, ApiError::NetworkUnreachable(_)));
}

#[tokio::test]
async fn store_surfaces_backend_messages() {
    let base = spawn_server().await;
    let store = CategoryService::open(
        Arc::new(backend(&base)),
        Arc::new(SessionAuth::with_token(TOKEN)),
    );

    store
        .create(CategoryDraft::new("Food", EntryKind::Expense))
        .await
        .expect("create");
    assert_eq!(store.len(), 1);

    store
        .create(CategoryDraft::new("", EntryKind::Expense))
        .await
        .expect_err("rejected");
    assert_eq!(store.error().as_deref(), Some("Name is required"));
    assert_eq!(store.len(), 1);

    store.delete("srv-404").await.expect_err("remote 404");
    assert_eq!(store.error().as_deref(), Some("Category not found"));

    let wrong = CategoryService::open(
        Arc::new(backend(&base)),
        Arc::new(SessionAuth::with_token("expired")),
    );
    assert!(wrong.load(false).await.is_empty());
    assert_eq!(wrong.error().as_deref(), Some("Please sign in to continue."));
}
