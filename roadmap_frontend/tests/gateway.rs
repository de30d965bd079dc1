//! Drives the blocking HTTP gateway against an in-process axum backend.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use roadmap_frontend::models::{ItemQuery, SortKey, Status, VoteAction};
use roadmap_frontend::{ApiClient, CredentialStore, RoadmapApi, RoadmapError};

type Reply = (StatusCode, Json<Value>);

#[derive(Clone, Default)]
struct Seen {
    authorization: Arc<Mutex<Vec<Option<String>>>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl Seen {
    fn record(&self, headers: &HeaderMap) {
        let value = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.authorization.lock().expect("lock").push(value);
    }

    fn last_authorization(&self) -> Option<String> {
        self.authorization
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .flatten()
    }
}

fn user() -> Value {
    json!({ "id": "u1", "username": "alice", "email": "alice@example.com" })
}

fn ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "success": true, "data": data })))
}

fn fail(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "success": false, "message": message })))
}

async fn login(State(seen): State<Seen>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    seen.record(&headers);
    if body["password"] != "secret" {
        return fail(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    (
        StatusCode::OK,
        Json(json!({ "success": true, "data": user(), "token": "tok-1" })),
    )
}

async fn profile(State(seen): State<Seen>, headers: HeaderMap) -> Reply {
    seen.record(&headers);
    match seen.last_authorization().as_deref() {
        Some("Bearer tok-1") => ok(user()),
        _ => fail(StatusCode::UNAUTHORIZED, "Access token required"),
    }
}

async fn items(
    State(seen): State<Seen>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    seen.record(&headers);
    seen.queries.lock().expect("lock").push(params);
    ok(json!({
        "items": [{
            "id": "abc123",
            "title": "Dark mode",
            "description": "Easier on the eyes",
            "status": "PLANNED",
            "category": "UI_UX",
            "priority": "HIGH",
            "upvotes": 10,
            "createdAt": "2024-01-01T00:00:00Z"
        }]
    }))
}

async fn toggle_vote(Path(item_id): Path<String>) -> Reply {
    if item_id != "abc123" {
        return fail(StatusCode::NOT_FOUND, "Roadmap item not found");
    }
    ok(json!({ "action": "added", "voteCount": 11 }))
}

async fn comments(Path(item_id): Path<String>) -> Reply {
    ok(json!({
        "comments": [{
            "id": "c1", "userId": "u2", "username": "bob", "content": "+1",
            "createdAt": "2024-01-01T00:00:00Z", "itemId": item_id,
            "replies": [{
                "id": "c2", "userId": "u1", "username": "alice", "content": "thanks",
                "createdAt": "2024-01-02T00:00:00Z", "parentId": "c1", "replies": []
            }]
        }]
    }))
}

async fn remove_comment(Path(_comment_id): Path<String>) -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn unread() -> Reply {
    ok(json!({ "unreadCount": 3 }))
}

async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "upstream exploded")
}

fn spawn_backend(seen: Seen) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    listener.set_nonblocking(true).expect("nonblocking");
    let router = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/profile", get(profile))
        .route("/api/roadmap", get(items))
        .route("/api/votes/:id/toggle", post(toggle_vote))
        .route("/api/comments/item/:id", get(comments))
        .route("/api/comments/:id", delete(remove_comment))
        .route("/api/notifications/unread-count", get(unread))
        .route("/api/roadmap/admin/templates", get(broken))
        .with_state(seen);
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(listener).expect("listener");
            axum::serve(listener, router).await.expect("serve");
        });
    });
    format!("http://{addr}/api/")
}

fn client(seen: &Seen) -> (ApiClient, CredentialStore) {
    let credentials = CredentialStore::in_memory();
    let client = ApiClient::new(spawn_backend(seen.clone()), credentials.clone()).expect("client");
    (client, credentials)
}

#[test]
fn login_stores_token_and_later_requests_carry_it() {
    let seen = Seen::default();
    let (api, credentials) = client(&seen);

    let user = api.login("alice@example.com", "secret").expect("login");
    assert_eq!(user.username, "alice");
    assert_eq!(credentials.token().as_deref(), Some("tok-1"));
    assert_eq!(seen.last_authorization(), None);

    let profile = api.get_profile().expect("profile");
    assert_eq!(profile.id, "u1");
    assert_eq!(seen.last_authorization().as_deref(), Some("Bearer tok-1"));

    api.logout();
    assert_eq!(credentials.token(), None);
    match api.get_profile() {
        Err(RoadmapError::RequestFailed { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Access token required");
        }
        other => panic!("expected 401, got {other:?}"),
    }
}

#[test]
fn rejected_login_surfaces_server_message() {
    let seen = Seen::default();
    let (api, credentials) = client(&seen);
    let err = api
        .login("alice@example.com", "wrong")
        .expect_err("bad password");
    assert_eq!(err.user_message(), "Invalid credentials");
    assert_eq!(credentials.token(), None);
}

#[test]
fn listing_forwards_filters_and_unwraps_envelope() {
    let seen = Seen::default();
    let (api, _) = client(&seen);
    let query = ItemQuery {
        status: Some(Status::Planned),
        search: "  dark ".into(),
        sort_by: SortKey::CreatedAt,
        ..ItemQuery::default()
    };
    let items = api.list_items(&query).expect("items");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].upvote_count, 10);
    assert_eq!(items[0].status, Status::Planned);

    let params = seen.queries.lock().expect("lock").pop().expect("query seen");
    assert_eq!(params.get("status").map(String::as_str), Some("PLANNED"));
    assert_eq!(params.get("search").map(String::as_str), Some("dark"));
    assert_eq!(params.get("sortBy").map(String::as_str), Some("createdAt"));
    assert_eq!(params.get("sortOrder").map(String::as_str), Some("desc"));
    assert!(!params.contains_key("category"));
}

#[test]
fn votes_comments_and_counters() {
    let seen = Seen::default();
    let (api, _) = client(&seen);

    let toggle = api.toggle_vote("abc123").expect("toggle");
    assert_eq!(toggle.action, VoteAction::Added);
    assert_eq!(toggle.vote_count, 11);
    assert!(matches!(
        api.toggle_vote("missing"),
        Err(RoadmapError::RequestFailed { status: 404, .. })
    ));

    let tree = api.list_comments("abc123").expect("comments");
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].author_name, "bob");
    assert_eq!(tree[0].children[0].parent_id.as_deref(), Some("c1"));

    api.delete_comment("c2").expect("delete with empty body");
    assert_eq!(api.get_unread_count().expect("unread"), 3);
}

#[test]
fn non_json_errors_fall_back_to_generic_message() {
    let seen = Seen::default();
    let (api, _) = client(&seen);
    match api.list_templates() {
        Err(RoadmapError::RequestFailed { status, message }) => {
            assert_eq!(status, 502);
            assert_eq!(message, "Something went wrong");
        }
        other => panic!("expected failure, got {other:?}"),
    }
}
