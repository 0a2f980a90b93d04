use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use taskdeck::dashboard::{Mode, Phase};
use taskdeck::{
    ClientError, CredentialStore, Credentials, Dashboard, Filter, HttpTaskClient,
    MemoryCredentialStore, Task, TaskApi,
};

// ─── Fake API server ────────────────────────────────────────────────────

const USER_ID: &str = "user-1";
const TOKEN: &str = "tok-1";

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
    body: Option<Value>,
}

#[derive(Default)]
struct ServerState {
    tasks: Vec<Task>,
    next_id: i64,
    requests: Vec<Recorded>,
}

type Shared = Arc<Mutex<ServerState>>;

fn record(state: &Shared, method: Method, uri: &Uri, headers: &HeaderMap, body: Option<Value>) {
    state.lock().unwrap().requests.push(Recorded {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
}

fn authorize(headers: &HeaderMap, user_id: &str) -> Result<(), Response> {
    let expected = format!("Bearer {}", TOKEN);
    let header = headers.get("authorization").and_then(|v| v.to_str().ok());
    if header != Some(expected.as_str()) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid or expired token"})),
        )
            .into_response());
    }
    if user_id != USER_ID {
        return Err((StatusCode::FORBIDDEN, Json(json!({"detail": "Access forbidden"}))).into_response());
    }
    Ok(())
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Task not found"}))).into_response()
}

async fn signup(State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, method, &uri, &headers, Some(body.clone()));
    if body["email"] == "taken@example.com" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Email already registered"})),
        )
            .into_response();
    }
    Json(json!({
        "id": USER_ID,
        "email": body["email"],
        "name": body["name"],
        "token": TOKEN,
    }))
    .into_response()
}

async fn signin(State(state): State<Shared>, method: Method, uri: Uri, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record(&state, method, &uri, &headers, None);
    if body["password"] != "secret" {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid credentials"})),
        )
            .into_response();
    }
    Json(json!({"id": USER_ID, "email": body["email"], "name": "Ada", "token": TOKEN})).into_response()
}

async fn list_tasks(
    State(state): State<Shared>,
    Path(user_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, method, &uri, &headers, None);
    if let Err(resp) = authorize(&headers, &user_id) {
        return resp;
    }
    let status = params.get("status").map(String::as_str).unwrap_or("all");
    let tasks: Vec<Task> = state
        .lock()
        .unwrap()
        .tasks
        .iter()
        .filter(|t| match status {
            "pending" => !t.completed,
            "completed" => t.completed,
            _ => true,
        })
        .cloned()
        .collect();
    Json(tasks).into_response()
}

async fn create_task(
    State(state): State<Shared>,
    Path(user_id): Path<String>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, method, &uri, &headers, Some(body.clone()));
    if let Err(resp) = authorize(&headers, &user_id) {
        return resp;
    }
    let mut guard = state.lock().unwrap();
    guard.next_id += 1;
    let now = Utc::now().naive_utc();
    let task = Task {
        id: guard.next_id,
        user_id,
        title: body["title"].as_str().unwrap_or_default().to_string(),
        description: body["description"].as_str().map(str::to_string),
        completed: false,
        created_at: now,
        updated_at: now,
    };
    guard.tasks.push(task.clone());
    (StatusCode::CREATED, Json(task)).into_response()
}

async fn update_task(
    State(state): State<Shared>,
    Path((user_id, id)): Path<(String, i64)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&state, method, &uri, &headers, Some(body.clone()));
    if let Err(resp) = authorize(&headers, &user_id) {
        return resp;
    }
    let mut guard = state.lock().unwrap();
    let Some(task) = guard.tasks.iter_mut().find(|t| t.id == id) else {
        return not_found();
    };
    if let Some(title) = body.get("title").and_then(Value::as_str) {
        task.title = title.to_string();
    }
    if let Some(description) = body.get("description").and_then(Value::as_str) {
        task.description = Some(description.to_string());
    }
    task.updated_at = Utc::now().naive_utc();
    Json(task.clone()).into_response()
}

async fn delete_task(
    State(state): State<Shared>,
    Path((user_id, id)): Path<(String, i64)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, method, &uri, &headers, None);
    if let Err(resp) = authorize(&headers, &user_id) {
        return resp;
    }
    let mut guard = state.lock().unwrap();
    let before = guard.tasks.len();
    guard.tasks.retain(|t| t.id != id);
    if guard.tasks.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn toggle_task(
    State(state): State<Shared>,
    Path((user_id, id)): Path<(String, i64)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    record(&state, method, &uri, &headers, None);
    if let Err(resp) = authorize(&headers, &user_id) {
        return resp;
    }
    let mut guard = state.lock().unwrap();
    let Some(task) = guard.tasks.iter_mut().find(|t| t.id == id) else {
        return not_found();
    };
    task.completed = !task.completed;
    Json(task.clone()).into_response()
}

struct TestServer {
    url: String,
    state: Shared,
}

impl TestServer {
    async fn start(seed: Vec<(&str, bool)>) -> Self {
        let mut initial = ServerState::default();
        let now = Utc::now().naive_utc();
        for (title, completed) in seed {
            initial.next_id += 1;
            initial.tasks.push(Task {
                id: initial.next_id,
                user_id: USER_ID.to_string(),
                title: title.to_string(),
                description: None,
                completed,
                created_at: now,
                updated_at: now,
            });
        }
        let state: Shared = Arc::new(Mutex::new(initial));

        let app = Router::new()
            .route("/auth/signup", post(signup))
            .route("/auth/signin", post(signin))
            .route("/api/{user_id}/tasks", get(list_tasks).post(create_task))
            .route("/api/{user_id}/tasks/{id}", put(update_task).delete(delete_task))
            .route("/api/{user_id}/tasks/{id}/complete", patch(toggle_task))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state,
        }
    }

    fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    fn client(&self, store: Arc<dyn CredentialStore>) -> HttpTaskClient {
        HttpTaskClient::new(&self.url, store)
    }

    fn signed_in_client(&self) -> HttpTaskClient {
        self.client(Arc::new(MemoryCredentialStore::with(Credentials::new(
            TOKEN, USER_ID,
        ))))
    }
}

// ─── Task sync client ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_sends_status_and_bearer_for_every_filter() {
    let server = TestServer::start(vec![("A", false), ("B", true), ("C", false)]).await;
    let client = server.signed_in_client();

    let all = client.list_tasks(Filter::All).await.unwrap();
    let titles: Vec<&str> = all.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B", "C"]);

    let pending = client.list_tasks(Filter::Pending).await.unwrap();
    assert_eq!(pending.len(), 2);
    let completed = client.list_tasks(Filter::Completed).await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].title, "B");

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    for (req, filter) in requests.iter().zip(Filter::ALL) {
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.path, format!("/api/{}/tasks", USER_ID));
        assert_eq!(req.query.as_deref(), Some(format!("status={}", filter).as_str()));
        assert_eq!(req.authorization.as_deref(), Some("Bearer tok-1"));
    }
}

#[tokio::test]
async fn test_no_credentials_never_touches_the_network() {
    let server = TestServer::start(vec![("A", false)]).await;
    let client = server.client(Arc::new(MemoryCredentialStore::new()));

    for result in [
        client.list_tasks(Filter::All).await.map(|_| ()),
        client.create_task("x", None).await.map(|_| ()),
        client.update_task(1, Some("x"), None).await.map(|_| ()),
        client.delete_task(1).await,
        client.toggle_complete(1).await.map(|_| ()),
    ] {
        assert!(matches!(result, Err(ClientError::Unauthenticated)));
    }
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_create_and_partial_update() {
    let server = TestServer::start(vec![]).await;
    let client = server.signed_in_client();

    let created = client
        .create_task("Write report", Some("quarterly numbers"))
        .await
        .unwrap();
    assert_eq!(created.id, 1);
    assert_eq!(created.user_id, USER_ID);
    assert_eq!(created.description.as_deref(), Some("quarterly numbers"));
    assert!(!created.completed);

    let updated = client
        .update_task(created.id, Some("Write final report"), None)
        .await
        .unwrap();
    assert_eq!(updated.title, "Write final report");
    assert_eq!(updated.description.as_deref(), Some("quarterly numbers"));

    let requests = server.requests();
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(
        requests[0].body,
        Some(json!({"title": "Write report", "description": "quarterly numbers"}))
    );
    assert_eq!(requests[1].method, Method::PUT);
    assert_eq!(requests[1].path, format!("/api/{}/tasks/1", USER_ID));
    assert_eq!(requests[1].body, Some(json!({"title": "Write final report"})));
}

#[tokio::test]
async fn test_update_missing_task_fails() {
    let server = TestServer::start(vec![]).await;
    let client = server.signed_in_client();

    let err = client.update_task(42, Some("x"), None).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::FetchFailed { status, .. } if status == reqwest::StatusCode::NOT_FOUND
    ));
}

#[tokio::test]
async fn test_delete_is_not_idempotent() {
    let server = TestServer::start(vec![("A", false)]).await;
    let client = server.signed_in_client();

    client.delete_task(1).await.unwrap();
    let err = client.delete_task(1).await.unwrap_err();
    assert!(matches!(err, ClientError::FetchFailed { .. }));

    let methods: Vec<Method> = server.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![Method::DELETE, Method::DELETE]);
}

#[tokio::test]
async fn test_toggle_twice_restores_state_with_two_round_trips() {
    let server = TestServer::start(vec![("A", true)]).await;
    let client = server.signed_in_client();

    assert!(!client.toggle_complete(1).await.unwrap().completed);
    assert!(client.toggle_complete(1).await.unwrap().completed);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    for req in requests {
        assert_eq!(req.method, Method::PATCH);
        assert_eq!(req.path, format!("/api/{}/tasks/1/complete", USER_ID));
    }
}

#[tokio::test]
async fn test_rejected_token_is_fetch_failure() {
    let server = TestServer::start(vec![("A", false)]).await;
    let client = server.client(Arc::new(MemoryCredentialStore::with(Credentials::new(
        "stale", USER_ID,
    ))));

    let err = client.list_tasks(Filter::All).await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::FetchFailed { status, .. } if status == reqwest::StatusCode::UNAUTHORIZED
    ));
}

#[tokio::test]
async fn test_dashboard_signs_out_when_token_is_rejected() {
    let server = TestServer::start(vec![("A", false)]).await;
    let client = server.client(Arc::new(MemoryCredentialStore::with(Credentials::new(
        "stale", USER_ID,
    ))));
    let store = client.credential_store();
    let mut board = Dashboard::new(client, store);

    board.load().await;
    assert_eq!(board.phase, Phase::SignedOut);
    assert!(board.tasks.is_empty());

    let foreign = server.client(Arc::new(MemoryCredentialStore::with(Credentials::new(
        TOKEN, "someone-else",
    ))));
    let store = foreign.credential_store();
    let mut board = Dashboard::new(foreign, store);
    board.load().await;
    assert_eq!(board.phase, Phase::SignedOut);
}

// ─── Auth ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_signin_saves_credentials_and_logout_clears_them() {
    let server = TestServer::start(vec![("A", false)]).await;
    let store = Arc::new(MemoryCredentialStore::new());
    let client = server.client(store.clone());

    let user = client.signin("ada@example.com", "secret").await.unwrap();
    assert_eq!(user.id, USER_ID);
    assert_eq!(store.read(), Some(Credentials::new(TOKEN, USER_ID)));
    assert_eq!(client.list_tasks(Filter::All).await.unwrap().len(), 1);

    client.logout();
    assert_eq!(store.read(), None);
    assert!(client.list_tasks(Filter::All).await.unwrap_err().is_unauthenticated());
}

#[tokio::test]
async fn test_auth_failures_surface_server_detail() {
    let server = TestServer::start(vec![]).await;
    let store = Arc::new(MemoryCredentialStore::new());
    let client = server.client(store.clone());

    let err = client.signin("ada@example.com", "wrong").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid credentials");

    let err = client
        .signup("taken@example.com", "pw", "Ada")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Email already registered");
    assert_eq!(store.read(), None);

    let user = client.signup("new@example.com", "pw", "Ada").await.unwrap();
    assert_eq!(user.name, "Ada");
    assert_eq!(store.read(), Some(Credentials::new(TOKEN, USER_ID)));
}

// ─── Dashboard over HTTP ────────────────────────────────────────────────

#[tokio::test]
async fn test_dashboard_reloads_after_each_mutation() {
    let server = TestServer::start(vec![("A", false)]).await;
    let client = server.signed_in_client();
    let store = client.credential_store();
    let mut board = Dashboard::new(client, store);

    board.set_filter(Filter::Pending).await;
    assert_eq!(board.phase, Phase::Ready);
    assert_eq!(board.tasks.len(), 1);
    assert_eq!(board.tasks[0].title, "A");
    assert!(!board.tasks[0].completed);

    board.toggle(1).await.unwrap();
    assert!(board.tasks.is_empty());

    board.open_add();
    board.draft.title = "B".into();
    board.submit().await.unwrap();
    assert_eq!(board.tasks.len(), 1);
    assert_eq!(board.tasks[0].title, "B");

    let seen: Vec<(Method, Option<String>)> = server
        .requests()
        .into_iter()
        .map(|r| (r.method, r.query))
        .collect();
    let pending = Some("status=pending".to_string());
    assert_eq!(
        seen,
        vec![
            (Method::GET, pending.clone()),
            (Method::PATCH, None),
            (Method::GET, pending.clone()),
            (Method::POST, None),
            (Method::GET, pending),
        ]
    );
}

#[tokio::test]
async fn test_dashboard_failed_delete_keeps_list() {
    let server = TestServer::start(vec![("A", false)]).await;
    let client = server.signed_in_client();
    let store = client.credential_store();
    let mut board = Dashboard::new(client, store);
    board.load().await;

    board.request_delete(5);
    let err = board.confirm_delete().await.unwrap_err();
    assert!(matches!(err, ClientError::FetchFailed { .. }));
    assert_eq!(board.mode, Mode::Idle);
    assert_eq!(board.tasks.len(), 1);

    let methods: Vec<Method> = server.requests().into_iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![Method::GET, Method::DELETE]);
}
