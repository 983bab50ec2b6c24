//! The dev store router, exercised directly and through `HttpStore` + `NotificationSync`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use portal_notify::store::http::HttpStore;
use portal_notify::store::memory::MemoryStore;
use portal_notify::{NewNotification, NotificationKind, NotificationStore, NotificationSync};

fn app(store: &MemoryStore) -> axum::Router {
    portal_notify::api::app(Arc::new(store.clone()))
}

async fn call(app: axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn patch(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn seeded(store: &MemoryStore, user: Uuid, title: &str) -> Uuid {
    store
        .create(NewNotification {
            user_id: user,
            r#type: NotificationKind::Submission,
            title: title.into(),
            message: "submitted".into(),
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn healthz_is_ok() {
    let store = MemoryStore::new();
    let req = Request::get("/healthz").body(Body::empty()).unwrap();
    let resp = app(&store).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn unread_patch_is_rejected() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();
    let id = seeded(&store, user, "essay").await;

    let (status, body) = call(
        app(&store),
        patch(&format!("/api/v1/notifications/{}", id), json!({ "is_read": false })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "read_state_regression");
    assert!(!store.get(id).unwrap().is_read);
}

#[tokio::test]
async fn unknown_id_is_404() {
    let store = MemoryStore::new();
    let (status, body) = call(
        app(&store),
        patch(
            &format!("/api/v1/notifications/{}", Uuid::new_v4()),
            json!({ "is_read": true }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "notification_not_found");
}

#[tokio::test]
async fn malformed_id_is_400() {
    let store = MemoryStore::new();
    let (status, _) = call(
        app(&store),
        patch("/api/v1/notifications/not-a-uuid", json!({ "is_read": true })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_requires_user_id() {
    let store = MemoryStore::new();
    let req = Request::get("/api/v1/notifications").body(Body::empty()).unwrap();
    let (status, _) = call(app(&store), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_returns_201_with_server_fields() {
    let store = MemoryStore::new();
    let user = Uuid::new_v4();
    let req = Request::post("/api/v1/notifications")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "user_id": user,
                "type": "course_material",
                "title": "Week 3 slides",
                "message": "Uploaded by your teacher",
            })
            .to_string(),
        ))
        .unwrap();

    let (status, body) = call(app(&store), req).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["type"], "course_material");
    assert_eq!(body["is_read"], false);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn sync_over_http_end_to_end() {
    let store = MemoryStore::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    let first = seeded(&store, alice, "assignment 1 graded").await;
    seeded(&store, alice, "quiz published").await;
    seeded(&store, alice, "slides uploaded").await;
    seeded(&store, bob, "not for alice").await;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(&store);
    let server = tokio::spawn(async move { axum::serve(listener, router).await });

    let client = HttpStore::new(format!("http://{}", addr), None, Duration::from_secs(5)).unwrap();
    let sync = NotificationSync::new(Arc::new(client), Duration::from_secs(30));

    sync.start(Some(alice)).await;
    let snapshot = sync.snapshot();
    assert_eq!(snapshot.notifications.len(), 3);
    assert_eq!(snapshot.unread_count, 3);
    assert!(snapshot.notifications.iter().all(|n| n.user_id == alice));

    sync.mark_as_read(first).await;
    assert_eq!(sync.snapshot().unread_count, 2);
    assert!(store.get(first).unwrap().is_read);

    sync.mark_all_as_read(alice).await;
    assert_eq!(sync.snapshot().unread_count, 0);
    assert_eq!(store.unread_count(alice).await.unwrap(), 0);
    assert_eq!(store.unread_count(bob).await.unwrap(), 1);

    sync.refresh(alice).await;
    let snapshot = sync.snapshot();
    assert_eq!(snapshot.unread_count, 0);
    assert!(snapshot.notifications.iter().all(|n| n.is_read));
    assert_eq!(sync.stats().unconfirmed_writes, 0);
    assert_eq!(sync.stats().failed_fetches, 0);

    sync.stop();
    server.abort();
}
