//! HTTP surface tests against the router, without a listening socket.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use nazm::api::{self, ApiState};
use nazm::auth::TokenIssuer;
use nazm::blob::MemoryBlobStore;
use nazm::engine::{EngineConfig, NazmEngine};
use nazm::model::{Role, User};

const SECRET: &[u8] = b"test-secret";
const BOUNDARY: &str = "nazm-test-boundary";

struct TestApp {
    _dir: TempDir,
    router: Router,
    state: Arc<ApiState>,
    admin_token: String,
}

async fn app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let mut engine = NazmEngine::open(
        EngineConfig::new(dir.path().to_path_buf()),
        Arc::new(MemoryBlobStore::new()),
    )
    .await
    .unwrap();
    engine
        .ensure_admin("Admin", "admin@example.com", "admin-pass")
        .await
        .unwrap();

    let tokens = TokenIssuer::new(SECRET, Duration::from_secs(3600));
    let state = Arc::new(ApiState::new(engine, tokens));
    let router = api::router(state.clone());

    let mut app = TestApp {
        _dir: dir,
        router,
        state,
        admin_token: String::new(),
    };
    app.admin_token = app.login("admin@example.com", "admin-pass").await;
    app
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, body)
    }

    async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn multipart(&self, uri: &str, token: &str, parts: &[(&str, Option<&str>, &str)]) -> (StatusCode, Value) {
        let mut body = String::new();
        for (name, file_name, value) in parts {
            body.push_str(&format!("--{BOUNDARY}\r\n"));
            match file_name {
                Some(file_name) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Register a poet and return (user id, token).
    async fn register(&self, name: &str) -> (Uuid, String) {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/auth/register",
                None,
                Some(json!({
                    "name": name,
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "password": "password123",
                    "country": "Pakistan",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let id = body["user"]["id"].as_str().unwrap().parse().unwrap();
        (id, body["access_token"].as_str().unwrap().to_string())
    }

    async fn submit(&self, token: &str, kind: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/v1/poems/manual",
                Some(token),
                Some(json!({
                    "type": kind,
                    "submissionMethod": "manual",
                    "language": "English",
                    "content": "A line of verse",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "Nazm submitted successfully");
        body["poemId"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn status_is_public() {
    let app = app().await;
    let (status, body) = app.call(Method::GET, "/api/v1/status", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["blob_backend"], "memory");
    assert_eq!(body["total_submissions"], 0);
}

#[tokio::test]
async fn register_login_and_me() {
    let app = app().await;
    let (id, token) = app.register("Amina").await;

    let (status, body) = app.call(Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.to_string());
    assert_eq!(body["email"], "amina@example.com");
    assert_eq!(body["role"], "user");
    assert!(body.get("passwordHash").is_none());

    let relogin = app.login("AMINA@example.com", "password123").await;
    assert!(!relogin.is_empty());

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "amina@example.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({
                "name": "Other",
                "email": "amina@example.com",
                "password": "password123",
                "country": "India",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(Method::GET, &format!("/api/v1/poets/{id}"), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country"], "Pakistan");
    assert_eq!(body["poemsCount"], 0);
}

#[tokio::test]
async fn tokens_are_checked() {
    let app = app().await;

    let (status, _) = app.call(Method::GET, "/api/v1/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/api/v1/auth/me", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Validly signed, but the user does not exist.
    let ghost = User {
        id: Uuid::new_v4(),
        name: "Ghost".into(),
        email: "ghost@example.com".into(),
        password_hash: String::new(),
        role: Role::Admin,
        created_at: chrono::Utc::now(),
    };
    let token = app.state.tokens.issue(&ghost).unwrap();
    let (status, _) = app.call(Method::GET, "/api/v1/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn moderation_is_admin_only() {
    let app = app().await;
    let (author_id, token) = app.register("Amina").await;
    let poem = app.submit(&token, "individual").await;

    let approve_uri = format!("/api/v1/poems/{poem}/approve");
    let (status, _) = app
        .call(Method::PUT, &approve_uri, Some(&token), Some(json!({ "approved": true })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Rating before approval is a state error.
    let rate_uri = format!("/api/v1/poems/{poem}/rate");
    let (status, _) = app
        .call(Method::PUT, &rate_uri, Some(&app.admin_token), Some(json!({ "rating": 4.0 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::PUT, &approve_uri, Some(&app.admin_token), Some(json!({ "approved": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["poem"]["status"], "araz_done");

    let (status, _) = app
        .call(Method::PUT, &rate_uri, Some(&app.admin_token), Some(json!({ "rating": 1.3 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::PUT, &rate_uri, Some(&app.admin_token), Some(json!({ "rating": 4.5 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["poem"]["rating"], 4.5);

    let (_, profile) = app
        .call(Method::GET, &format!("/api/v1/poets/{author_id}"), Some(&token), None)
        .await;
    assert_eq!(profile["points"], 90);
    assert_eq!(profile["poemsCount"], 1);

    let (status, body) = app
        .call(
            Method::PATCH,
            &format!("/api/v1/poems/{poem}/feature"),
            Some(&app.admin_token),
            Some(json!({ "featured": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Poem featured successfully");

    let (_, featured) = app
        .call(Method::GET, "/api/v1/poems/featured", Some(&token), None)
        .await;
    assert_eq!(featured["poem"]["id"], poem);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/api/v1/poems/{poem}/status"),
            Some(&app.admin_token),
            Some(json!({ "status": "araz_pending" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["poem"]["status"], "araz_pending");
}

#[tokio::test]
async fn list_is_scoped_to_caller() {
    let app = app().await;
    let (amina, amina_token) = app.register("Amina").await;
    let (bilal, bilal_token) = app.register("Bilal").await;

    app.submit(&amina_token, "individual").await;
    app.submit(&amina_token, "full").await;
    let bilal_poem = app.submit(&bilal_token, "full").await;

    let (status, body) = app.call(Method::GET, "/api/v1/poems", Some(&amina_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 1);
    assert_eq!(body["perPage"], 20);
    assert!(body["poems"]
        .as_array()
        .unwrap()
        .iter()
        .all(|p| p["author"]["userId"] == amina.to_string()));

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/poems?authorId={bilal}"),
            Some(&amina_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/poems/{bilal_poem}"),
            Some(&amina_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = app
        .call(Method::GET, "/api/v1/poems?type=full", Some(&app.admin_token), None)
        .await;
    assert_eq!(body["total"], 2);

    let (_, body) = app
        .call(
            Method::GET,
            "/api/v1/poems?approved=false&perPage=1&page=2",
            Some(&app.admin_token),
            None,
        )
        .await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["poems"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .call(Method::GET, "/api/v1/poems?perPage=500", Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(Method::GET, "/api/v1/poems/not-a-uuid", Some(&amina_token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/poems/{}", Uuid::new_v4()),
            Some(&amina_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn upload_and_download() {
    let app = app().await;
    let (_, token) = app.register("Amina").await;

    let draft = json!({
        "type": "full",
        "submissionMethod": "recording",
        "language": "Urdu",
    })
    .to_string();

    let (status, _) = app
        .multipart(
            "/api/v1/poems/upload",
            &token,
            &[("poem_json", None, draft.as_str()), ("file", Some("take.exe"), "MZ")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .multipart(
            "/api/v1/poems/upload",
            &token,
            &[("poem_json", None, draft.as_str()), ("file", Some("take.ogg"), "OggS")],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let poem = body["poemId"].as_str().unwrap().to_string();

    let (_, body) = app
        .call(Method::GET, &format!("/api/v1/poems/{poem}"), Some(&token), None)
        .await;
    assert_eq!(body["audioFileName"], format!("poems/{poem}/take.ogg"));
    assert_eq!(body["submissionMethod"], "recording");

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/poems/{poem}/download"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["url"].as_str().unwrap().starts_with("memory://poems/"));
    assert!(body["expiresAt"].is_string());

    let (status, _) = app
        .multipart("/api/v1/poems/upload", &token, &[("file", Some("take.ogg"), "OggS")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn araz_via_multipart() {
    let app = app().await;
    let (_, token) = app.register("Amina").await;
    let poem = app.submit(&token, "individual").await;
    let uri = format!("/api/v1/poems/{poem}/araz");

    let (status, _) = app
        .multipart(&uri, &app.admin_token, &[("araz_content", None, "Fine rhyme")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.call(
        Method::PUT,
        &format!("/api/v1/poems/{poem}/approve"),
        Some(&app.admin_token),
        Some(json!({ "approved": true })),
    )
    .await;

    let (status, _) = app
        .multipart(&uri, &token, &[("araz_content", None, "Self review")])
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .multipart(
            &uri,
            &app.admin_token,
            &[
                ("araz_content", None, "Fine rhyme"),
                ("araz_file", Some("review.txt"), "Longer notes"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["poem"]["arazContent"], "Fine rhyme");
    assert_eq!(body["poem"]["arazFileName"], format!("poems/{poem}/araz/review.txt"));
}

#[tokio::test]
async fn verses_crud() {
    let app = app().await;
    let (_, token) = app.register("Amina").await;
    let verse = json!({ "content": "Opening line", "day": 3, "language": "Urdu", "author": "Iqbal" });

    let (status, _) = app
        .call(Method::POST, "/api/v1/verses", Some(&token), Some(verse.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = app
        .call(Method::POST, "/api/v1/verses", Some(&app.admin_token), Some(verse))
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/verses",
            Some(&app.admin_token),
            Some(json!({ "content": "x", "day": 11, "language": "Urdu" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .call(
            Method::PATCH,
            &format!("/api/v1/verses/{id}"),
            Some(&app.admin_token),
            Some(json!({ "language": "Lisan al-Dawah" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["language"], "Lisan al-Dawah");
    assert_eq!(updated["day"], 3);

    let (status, listed) = app
        .call(Method::GET, "/api/v1/verses?day=3", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/verses/{id}"), Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/v1/verses/{id}"), Some(&app.admin_token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn leaderboard_endpoint() {
    let app = app().await;
    let (_, token) = app.register("Amina").await;

    let (status, _) = app
        .call(Method::GET, "/api/v1/leaderboard?type=individual", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let poem = app.submit(&token, "individual").await;
    app.call(
        Method::PUT,
        &format!("/api/v1/poems/{poem}/approve"),
        Some(&app.admin_token),
        Some(json!({ "approved": true })),
    )
    .await;
    app.call(
        Method::PUT,
        &format!("/api/v1/poems/{poem}/rate"),
        Some(&app.admin_token),
        Some(json!({ "rating": 3.5 })),
    )
    .await;

    let (status, body) = app
        .call(Method::GET, "/api/v1/leaderboard?type=individual", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"][0]["authorName"], "Amina");
    assert_eq!(body["entries"][0]["totalStars"], 3.5);
    assert_eq!(body["entries"][0]["submissionCount"], 1);

    let (status, _) = app
        .call(Method::GET, "/api/v1/leaderboard?type=epic", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, best) = app
        .call(Method::GET, "/api/v1/poems/best", Some(&token), None)
        .await;
    assert_eq!(best["poems"][0]["id"], poem);
}

#[tokio::test]
async fn unknown_inspiring_verse_is_rejected() {
    let app = app().await;
    let (_, token) = app.register("Amina").await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/poems/manual",
            Some(&token),
            Some(json!({
                "type": "individual",
                "submissionMethod": "manual",
                "language": "English",
                "content": "A line of verse",
                "inspiredBy": Uuid::new_v4().to_string(),
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert!(body.as_str().unwrap().starts_with("Invalid inspiredBy verse"));

    let (_, page) = app.call(Method::GET, "/api/v1/poems", Some(&token), None).await;
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn poet_email_is_private() {
    let app = app().await;
    let (amina, amina_token) = app.register("Amina").await;
    let (_, other_token) = app.register("Other").await;
    let uri = format!("/api/v1/poets/{amina}");

    let (status, body) = app.call(Method::GET, &uri, Some(&other_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Amina");
    assert!(body.get("email").is_none());

    let (_, body) = app.call(Method::GET, &uri, Some(&amina_token), None).await;
    assert_eq!(body["email"], "amina@example.com");

    let (_, body) = app.call(Method::GET, &uri, Some(&app.admin_token), None).await;
    assert_eq!(body["email"], "amina@example.com");
}
