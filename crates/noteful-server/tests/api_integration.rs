//! Full-stack REST API integration tests.
//!
//! Each test opens a real `SqliteStore` backed by a tempdir, constructs the
//! axum Router, and sends actual HTTP requests via `tower::ServiceExt`. This
//! validates routing, serialisation, handler logic, and storage in one pass.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt; // for `.oneshot()`

use noteful_server::{create_router, AppState};
use noteful_storage::SqliteStore;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup() -> (axum::Router, TempDir) {
    let tmp = TempDir::new().expect("tempdir");
    let store = SqliteStore::open(&tmp.path().join("noteful.sqlite")).expect("open store");
    let state = Arc::new(AppState::new(Arc::new(store)));
    (create_router(state), tmp)
}

fn json_request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    match body {
        Some(val) => builder.body(Body::from(val.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
}

async fn send(router: &axum::Router, req: Request<Body>) -> axum::response::Response {
    router.clone().oneshot(req).await.unwrap()
}

async fn create_folder(router: &axum::Router, name: &str) -> Value {
    let resp = send(
        router,
        json_request(Method::POST, "/folders", Some(json!({ "name": name }))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

async fn create_tag(router: &axum::Router, name: &str) -> Value {
    let resp = send(
        router,
        json_request(Method::POST, "/tags", Some(json!({ "name": name }))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

async fn create_note(router: &axum::Router, body: Value) -> Value {
    let resp = send(router, json_request(Method::POST, "/notes", Some(body))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let (router, _tmp) = setup();
    let resp = send(&router, json_request(Method::GET, "/health", None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "ok");
}

// ---------------------------------------------------------------------------
// Notes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn note_create_read_round_trip() {
    let (router, _tmp) = setup();
    let created = create_note(
        &router,
        json!({ "title": "groceries", "content": "milk, eggs" }),
    )
    .await;
    assert_eq!(created["title"], "groceries");
    assert_eq!(created["content"], "milk, eggs");
    assert!(created["folderId"].is_null() || created.get("folderId").is_none());

    let id = created["id"].as_str().unwrap();
    let resp = send(&router, json_request(Method::GET, &format!("/notes/{id}"), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched = body_json(resp).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn note_create_sets_location_header() {
    let (router, _tmp) = setup();
    let resp = send(
        &router,
        json_request(Method::POST, "/notes", Some(json!({ "title": "locate me" }))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let location = resp
        .headers()
        .get(header::LOCATION)
        .expect("Location header")
        .to_str()
        .unwrap()
        .to_string();
    let body = body_json(resp).await;
    assert_eq!(location, format!("/notes/{}", body["id"].as_str().unwrap()));
}

#[tokio::test]
async fn note_without_title_is_rejected() {
    let (router, _tmp) = setup();
    for body in [json!({}), json!({ "title": "" }), json!({ "title": "   " })] {
        let resp = send(&router, json_request(Method::POST, "/notes", Some(body))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err = body_json(resp).await;
        assert_eq!(err["message"], "Missing title in request body");
    }
}

#[tokio::test]
async fn note_update_without_title_is_rejected() {
    let (router, _tmp) = setup();
    let created = create_note(&router, json!({ "title": "keep" })).await;
    let id = created["id"].as_str().unwrap();
    let resp = send(
        &router,
        json_request(
            Method::PUT,
            &format!("/notes/{id}"),
            Some(json!({ "content": "no title" })),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "Missing title in request body"
    );
}

#[tokio::test]
async fn duplicate_note_title_is_rejected() {
    let (router, _tmp) = setup();
    create_note(&router, json!({ "title": "unique" })).await;
    let resp = send(
        &router,
        json_request(Method::POST, "/notes", Some(json!({ "title": "unique" }))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "The note title already exists"
    );
}

#[tokio::test]
async fn malformed_note_id_yields_400_not_404() {
    let (router, _tmp) = setup();
    for method in [Method::GET, Method::DELETE] {
        let resp = send(&router, json_request(method, "/notes/NOT-AN-ID", None)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let err = body_json(resp).await;
        assert_eq!(err["message"], "The id entered is not a valid ID");
    }
}

#[tokio::test]
async fn missing_note_yields_404() {
    let (router, _tmp) = setup();
    let resp = send(
        &router,
        json_request(
            Method::GET,
            "/notes/00000000-0000-7000-8000-000000000000",
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn note_delete_is_idempotent() {
    let (router, _tmp) = setup();
    let created = create_note(&router, json!({ "title": "ephemeral" })).await;
    let id = created["id"].as_str().unwrap().to_string();

    for _ in 0..2 {
        let resp = send(
            &router,
            json_request(Method::DELETE, &format!("/notes/{id}"), None),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}

#[tokio::test]
async fn note_update_replaces_fields_and_bumps_updated_at() {
    let (router, _tmp) = setup();
    let created = create_note(&router, json!({ "title": "draft", "content": "v1" })).await;
    let id = created["id"].as_str().unwrap();

    let resp = send(
        &router,
        json_request(
            Method::PUT,
            &format!("/notes/{id}"),
            Some(json!({ "title": "final", "content": "v2" })),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated = body_json(resp).await;
    assert_eq!(updated["title"], "final");
    assert_eq!(updated["content"], "v2");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert!(updated["updatedAt"].as_str() >= created["updatedAt"].as_str());
}

#[tokio::test]
async fn notes_list_sorts_by_most_recently_updated() {
    let (router, _tmp) = setup();
    create_note(&router, json!({ "title": "first" })).await;
    create_note(&router, json!({ "title": "second" })).await;
    let third = create_note(&router, json!({ "title": "third" })).await;

    let resp = send(&router, json_request(Method::GET, "/notes", None)).await;
    let listed = body_json(resp).await;
    let titles: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
    assert_eq!(listed[0]["id"], third["id"]);
}

#[tokio::test]
async fn notes_search_term_matches_title_and_content() {
    let (router, _tmp) = setup();
    create_note(&router, json!({ "title": "Shipping labels", "content": "print them" })).await;
    create_note(&router, json!({ "title": "Work log", "content": "SHIP the release" })).await;
    create_note(&router, json!({ "title": "Travel", "content": "pack shirts" })).await;

    // Matches are case-insensitive and apply to both title and content.
    let resp = send(
        &router,
        json_request(Method::GET, "/notes?searchTerm=ship", None),
    )
    .await;
    let listed = body_json(resp).await;
    let titles: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap())
        .collect();
    assert!(titles.contains(&"Shipping labels"));
    assert!(titles.contains(&"Work log"));
    assert!(!titles.contains(&"Travel"));
}

#[tokio::test]
async fn notes_filter_by_folder_and_tag() {
    let (router, _tmp) = setup();
    let folder = create_folder(&router, "inbox").await;
    let folder_id = folder["id"].as_str().unwrap();
    let tag = create_tag(&router, "urgent").await;
    let tag_id = tag["id"].as_str().unwrap();

    create_note(
        &router,
        json!({ "title": "filed", "folderId": folder_id, "tags": [tag_id] }),
    )
    .await;
    create_note(&router, json!({ "title": "loose" })).await;

    let resp = send(
        &router,
        json_request(Method::GET, &format!("/notes?folderId={folder_id}"), None),
    )
    .await;
    let by_folder = body_json(resp).await;
    assert_eq!(by_folder.as_array().unwrap().len(), 1);
    assert_eq!(by_folder[0]["title"], "filed");

    let resp = send(
        &router,
        json_request(Method::GET, &format!("/notes?tagId={tag_id}"), None),
    )
    .await;
    let by_tag = body_json(resp).await;
    assert_eq!(by_tag.as_array().unwrap().len(), 1);
    assert_eq!(by_tag[0]["title"], "filed");
}

#[tokio::test]
async fn note_response_expands_tag_documents() {
    let (router, _tmp) = setup();
    let tag = create_tag(&router, "projects").await;
    let tag_id = tag["id"].as_str().unwrap();

    let created = create_note(&router, json!({ "title": "tagged", "tags": [tag_id] })).await;
    assert_eq!(created["tags"].as_array().unwrap().len(), 1);
    assert_eq!(created["tags"][0]["id"], tag["id"]);
    assert_eq!(created["tags"][0]["name"], "projects");
}

#[tokio::test]
async fn note_with_malformed_reference_id_is_rejected() {
    let (router, _tmp) = setup();
    let resp = send(
        &router,
        json_request(
            Method::POST,
            "/notes",
            Some(json!({ "title": "bad ref", "folderId": "garbage" })),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "The folderId entered is not a valid ID"
    );

    let resp = send(
        &router,
        json_request(
            Method::POST,
            "/notes",
            Some(json!({ "title": "bad tags", "tags": ["garbage"] })),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "The tags entered is not a valid ID"
    );
}

// ---------------------------------------------------------------------------
// Folders
// ---------------------------------------------------------------------------

#[tokio::test]
async fn folders_list_sorts_by_name() {
    let (router, _tmp) = setup();
    for name in ["zeta", "alpha", "mid"] {
        create_folder(&router, name).await;
    }
    let resp = send(&router, json_request(Method::GET, "/folders", None)).await;
    let listed = body_json(resp).await;
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);
}

#[tokio::test]
async fn folder_without_name_is_rejected() {
    let (router, _tmp) = setup();
    let resp = send(&router, json_request(Method::POST, "/folders", Some(json!({})))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "Missing name in request body"
    );
}

#[tokio::test]
async fn duplicate_folder_name_is_rejected() {
    let (router, _tmp) = setup();
    create_folder(&router, "inbox").await;
    let resp = send(
        &router,
        json_request(Method::POST, "/folders", Some(json!({ "name": "inbox" }))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "The folder name already exists"
    );
}

#[tokio::test]
async fn folder_rename_to_existing_name_is_rejected() {
    let (router, _tmp) = setup();
    create_folder(&router, "inbox").await;
    let other = create_folder(&router, "archive").await;
    let id = other["id"].as_str().unwrap();
    let resp = send(
        &router,
        json_request(
            Method::PUT,
            &format!("/folders/{id}"),
            Some(json!({ "name": "inbox" })),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "The folder name already exists"
    );
}

#[tokio::test]
async fn folder_delete_clears_note_references() {
    let (router, _tmp) = setup();
    let folder = create_folder(&router, "inbox").await;
    let folder_id = folder["id"].as_str().unwrap();
    let note = create_note(&router, json!({ "title": "filed", "folderId": folder_id })).await;
    assert_eq!(note["folderId"], folder["id"]);

    let resp = send(
        &router,
        json_request(Method::DELETE, &format!("/folders/{folder_id}"), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(
        &router,
        json_request(Method::GET, &format!("/folders/{folder_id}"), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let note_id = note["id"].as_str().unwrap();
    let resp = send(
        &router,
        json_request(Method::GET, &format!("/notes/{note_id}"), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let surviving = body_json(resp).await;
    assert!(surviving.get("folderId").is_none() || surviving["folderId"].is_null());
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tags_list_sorts_by_name() {
    let (router, _tmp) = setup();
    for name in ["work", "errands", "someday"] {
        create_tag(&router, name).await;
    }
    let resp = send(&router, json_request(Method::GET, "/tags", None)).await;
    let listed = body_json(resp).await;
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["errands", "someday", "work"]);
}

#[tokio::test]
async fn duplicate_tag_name_is_rejected() {
    let (router, _tmp) = setup();
    create_tag(&router, "urgent").await;
    let resp = send(
        &router,
        json_request(Method::POST, "/tags", Some(json!({ "name": "urgent" }))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "The tag name already exists"
    );
}

#[tokio::test]
async fn tag_delete_detaches_from_notes() {
    let (router, _tmp) = setup();
    let keep = create_tag(&router, "keep").await;
    let doomed = create_tag(&router, "doomed").await;
    let keep_id = keep["id"].as_str().unwrap();
    let drop_id = doomed["id"].as_str().unwrap();

    let note = create_note(
        &router,
        json!({ "title": "tagged", "tags": [keep_id, drop_id] }),
    )
    .await;
    let note_id = note["id"].as_str().unwrap();

    let resp = send(
        &router,
        json_request(Method::DELETE, &format!("/tags/{drop_id}"), None),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send(
        &router,
        json_request(Method::GET, &format!("/notes/{note_id}"), None),
    )
    .await;
    let surviving = body_json(resp).await;
    let tags = surviving["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["id"], keep["id"]);
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[tokio::test]
async fn user_registration_omits_password_from_response() {
    let (router, _tmp) = setup();
    let resp = send(
        &router,
        json_request(
            Method::POST,
            "/users",
            Some(json!({
                "fullname": "Ada Lovelace",
                "username": "ada",
                "password": "s3cret"
            })),
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user = body_json(resp).await;
    assert_eq!(user["username"], "ada");
    assert_eq!(user["fullname"], "Ada Lovelace");
    assert!(user.get("password").is_none());
}

#[tokio::test]
async fn user_registration_requires_username_and_password() {
    let (router, _tmp) = setup();
    let resp = send(
        &router,
        json_request(Method::POST, "/users", Some(json!({ "password": "x" }))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "Missing username in request body"
    );

    let resp = send(
        &router,
        json_request(Method::POST, "/users", Some(json!({ "username": "x" }))),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["message"],
        "Missing password in request body"
    );
}

#[tokio::test]
async fn duplicate_username_is_rejected() {
    let (router, _tmp) = setup();
    for expected_status in [StatusCode::CREATED, StatusCode::BAD_REQUEST] {
        let resp = send(
            &router,
            json_request(
                Method::POST,
                "/users",
                Some(json!({ "username": "ada", "password": "pw" })),
            ),
        )
        .await;
        assert_eq!(resp.status(), expected_status);
        if expected_status == StatusCode::BAD_REQUEST {
            assert_eq!(
                body_json(resp).await["message"],
                "The username already exists"
            );
        }
    }
}
