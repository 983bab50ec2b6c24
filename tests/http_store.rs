//! Request shapes sent by `HttpStore`, verified against a wiremock server.

use std::time::Duration;

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use portal_notify::store::http::HttpStore;
use portal_notify::{NotificationKind, NotificationStore, StoreError};

fn store_for(server: &MockServer) -> HttpStore {
    HttpStore::new(server.uri(), Some("anon-key".into()), Duration::from_secs(2)).unwrap()
}

fn row(id: Uuid, user_id: Uuid, created_at: &str) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": user_id,
        "type": "test",
        "title": "Midterm published",
        "message": "Chapter 4 midterm is open",
        "is_read": false,
        "created_at": created_at,
    })
}

#[tokio::test]
async fn list_sends_user_filter_and_key() {
    let server = MockServer::start().await;
    let user = Uuid::new_v4();
    let id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/api/v1/notifications"))
        .and(query_param("user_id", user.to_string()))
        .and(header("authorization", "Bearer anon-key"))
        .and(header("apikey", "anon-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([row(id, user, "2024-03-01T10:00:00Z")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let rows = tokio_test::assert_ok!(store_for(&server).list(user).await);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id);
    assert_eq!(rows[0].r#type, NotificationKind::Test);
    assert!(!rows[0].is_read);
}

#[tokio::test]
async fn unread_count_reads_count_field() {
    let server = MockServer::start().await;
    let user = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/unread"))
        .and(query_param("user_id", user.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 4 })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(store_for(&server).unread_count(user).await.unwrap(), 4);
}

#[tokio::test]
async fn mark_read_patches_single_row() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path(format!("/api/v1/notifications/{}", id)))
        .and(body_json(json!({ "is_read": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    tokio_test::assert_ok!(store_for(&server).mark_read(id).await);
}

#[tokio::test]
async fn mark_all_read_is_one_bulk_patch() {
    let server = MockServer::start().await;
    let user = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/api/v1/notifications"))
        .and(query_param("user_id", user.to_string()))
        .and(body_json(json!({ "is_read": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(store_for(&server).mark_all_read(user).await.unwrap(), 3);
}

#[tokio::test]
async fn missing_row_maps_to_not_found() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path(format!("/api/v1/notifications/{}", id)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = store_for(&server).mark_read(id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(missing) if missing == id));
}

#[tokio::test]
async fn server_error_keeps_status_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/notifications"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = store_for(&server).list(Uuid::new_v4()).await.unwrap_err();
    match err {
        StoreError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/unread"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = store_for(&server).unread_count(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, StoreError::Decode(_)));
}

#[tokio::test]
async fn unreachable_store_is_a_transport_error() {
    let store = HttpStore::new("http://127.0.0.1:1", None, Duration::from_secs(1)).unwrap();
    let err = store.list(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)));
}

#[tokio::test]
async fn trailing_slash_in_base_url_is_ignored() {
    let server = MockServer::start().await;
    let user = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/unread"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "count": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let store = HttpStore::new(format!("{}/", server.uri()), None, Duration::from_secs(2)).unwrap();
    assert_eq!(store.unread_count(user).await.unwrap(), 0);
}
