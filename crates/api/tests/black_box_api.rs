use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use aluguetudo_api::config::ApiConfig;
use aluguetudo_auth::{JwtClaims, Role};
use aluguetudo_core::UserId;
use aluguetudo_gateway::{InMemoryBackend, Op};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    backend: Arc<InMemoryBackend>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(ApiConfig::in_memory(JWT_SECRET)).await
    }

    async fn spawn_with(config: ApiConfig) -> Self {
        let backend = Arc::new(InMemoryBackend::new());
        backend.seed_user("admin@aluguetudo.com", "admin123", "Administrador", &["admin"]);
        backend.seed_user("rh@aluguetudo.com", "senha123", "Rita Lima", &["rh"]);

        // Same router as prod, bound to an ephemeral port.
        let app = aluguetudo_api::app::build_app_with_backend(config, backend.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            backend,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let res = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK, "login failed for {email}");
        let body: Value = res.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(jwt_secret: &str, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(),
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn has_notice(body: &Value, level: &str) -> bool {
    body["notices"]
        .as_array()
        .is_some_and(|n| n.iter().any(|n| n["level"] == level))
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_identifies_the_caller() {
    let srv = TestServer::spawn().await;
    let token = srv.login("rh@aluguetudo.com", "senha123").await;

    let res = srv.get("/whoami", &token).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["email"], "rh@aluguetudo.com");
    assert_eq!(body["is_admin"], false);
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "rh"));
}

#[tokio::test]
async fn unknown_email_stays_on_login_with_error_notice() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "ninguem@aluguetudo.com", "password": "x" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["route"], "/login");
    assert!(has_notice(&body, "error"));
}

#[tokio::test]
async fn backend_outage_during_login_is_a_gateway_error() {
    let srv = TestServer::spawn().await;
    srv.backend.fail(Op::SignIn);

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "rh@aluguetudo.com", "password": "senha123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "backend_error");
    assert!(has_notice(&body, "error"));
}

#[tokio::test]
async fn empty_credentials_are_rejected_without_backend_call() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "", "password": "" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(srv.backend.call_count(Op::SignIn), 0);
}

#[tokio::test]
async fn logout_invalidates_the_token() {
    let srv = TestServer::spawn().await;
    let token = srv.login("rh@aluguetudo.com", "senha123").await;

    let res = srv
        .client
        .post(srv.url("/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.get("/whoami", &token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "session_expired");
}

#[tokio::test]
async fn well_signed_token_without_session_is_rejected() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(JWT_SECRET, vec![Role::admin()]);

    let res = srv.get("/whoami", &token).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

// ─────────────────────────────────────────────────────────────────────────────
// Routing and navigation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn route_resolution_follows_the_role_gate() {
    let srv = TestServer::spawn().await;
    let rh = srv.login("rh@aluguetudo.com", "senha123").await;
    let admin = srv.login("admin@aluguetudo.com", "admin123").await;

    let anonymous: Value = srv
        .client
        .get(srv.url("/routes/resolve?path=/usuarios"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(anonymous, json!({ "kind": "redirect", "to": "/login" }));

    let denied: Value = srv.get("/routes/resolve?path=/usuarios", &rh).await.json().await.unwrap();
    assert_eq!(denied, json!({ "kind": "redirect", "to": "/" }));

    let own_sector: Value = srv.get("/routes/resolve?path=/rh", &rh).await.json().await.unwrap();
    assert_eq!(own_sector["kind"], "render");

    let granted: Value = srv.get("/routes/resolve?path=/usuarios", &admin).await.json().await.unwrap();
    assert_eq!(granted["kind"], "render");

    let missing: Value = srv.get("/routes/resolve?path=/nao-existe", &admin).await.json().await.unwrap();
    assert_eq!(missing["kind"], "not_found");
}

#[tokio::test]
async fn navigation_hides_entries_the_gate_denies() {
    let srv = TestServer::spawn().await;
    let rh = srv.login("rh@aluguetudo.com", "senha123").await;

    let body: Value = srv.get("/navigation", &rh).await.json().await.unwrap();
    let paths: Vec<&str> = body["sections"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|s| s["items"].as_array().unwrap().iter())
        .map(|i| i["path"].as_str().unwrap())
        .collect();

    assert!(paths.contains(&"/rh"));
    assert!(paths.contains(&"/tarefas"));
    assert!(!paths.contains(&"/usuarios"));
    assert!(!paths.contains(&"/financeiro"));
}

// ─────────────────────────────────────────────────────────────────────────────
// User management
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn non_admin_cannot_manage_users() {
    let srv = TestServer::spawn().await;
    let rh = srv.login("rh@aluguetudo.com", "senha123").await;

    let res = srv.get("/users", &rh).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(srv.backend.call_count(Op::GetAllUsers), 0);
}

#[tokio::test]
async fn admin_provisions_and_finds_a_user() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin@aluguetudo.com", "admin123").await;

    let res = srv
        .client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "Carla Mendes",
            "email": "carla@aluguetudo.com",
            "password": "senha123",
            "role": ["comercial"],
            "status": "ativo"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["via"], "server_procedure");
    assert!(has_notice(&body, "success"));

    let res = srv.get("/users?q=CARLA", &admin).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["email"], "carla@aluguetudo.com");

    // The admin's own session is untouched.
    let me: Value = srv.get("/whoami", &admin).await.json().await.unwrap();
    assert_eq!(me["email"], "admin@aluguetudo.com");
}

#[tokio::test]
async fn empty_role_selection_is_rejected_before_backend() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin@aluguetudo.com", "admin123").await;

    let res = srv
        .client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "Sem Papel",
            "email": "sem@aluguetudo.com",
            "password": "senha123",
            "role": []
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(srv.backend.call_count(Op::CreateNewAuthUser), 0);
    assert_eq!(srv.backend.call_count(Op::SignUp), 0);
}

#[tokio::test]
async fn failed_delete_returns_the_restored_list() {
    let srv = TestServer::spawn().await;
    let admin = srv.login("admin@aluguetudo.com", "admin123").await;
    let users: Value = srv.get("/users", &admin).await.json().await.unwrap();
    let rh_id = users["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "rh@aluguetudo.com")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    srv.backend.fail(Op::DeleteUser);
    let res = srv
        .client
        .delete(srv.url(&format!("/users/{rh_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["items"], users["items"]);
    assert!(has_notice(&body, "error"));

    srv.backend.heal(Op::DeleteUser);
    let res = srv
        .client
        .delete(srv.url(&format!("/users/{rh_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn lost_session_during_fallback_requires_reauthentication() {
    let mut config = ApiConfig::in_memory(JWT_SECRET);
    config.provisioning.signup_fallback = true;
    let srv = TestServer::spawn_with(config).await;
    let admin = srv.login("admin@aluguetudo.com", "admin123").await;

    srv.backend.fail(Op::CreateNewAuthUser);
    srv.backend.fail(Op::RefreshSession);
    let res = srv
        .client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "Davi Costa",
            "email": "davi@aluguetudo.com",
            "password": "senha123",
            "role": ["operacional"]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "reauthentication_required");
    assert_eq!(body["redirect"], "/login");
    assert_eq!(body["redirect_after_ms"], 2000);

    let res = srv.get("/whoami", &admin).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bootstrap_admin_runs_once() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .post(srv.url("/auth/bootstrap-admin"))
        .json(&json!({ "email": "admin@aluguetudo.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // An admin is already seeded.
    let res = srv
        .client
        .post(srv.url("/auth/bootstrap-admin"))
        .json(&json!({ "email": "admin@aluguetudo.com", "password": "admin123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(srv.backend.call_count(Op::SignUp), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tasks
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn task_status_only_moves_forward() {
    let srv = TestServer::spawn().await;
    let token = srv.login("rh@aluguetudo.com", "senha123").await;

    let res = srv
        .client
        .post(srv.url("/tasks"))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Processo seletivo desenvolvedor",
            "description": "Analisar currículos e agendar entrevistas",
            "due_date": "2026-11-20",
            "sector": "rh",
            "priority": "alta"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let task: Value = res.json().await.unwrap();
    assert_eq!(task["status"], "pendente");
    let id = task["id"].as_str().unwrap().to_string();

    let advance = |id: String| {
        let client = srv.client.clone();
        let url = srv.url(&format!("/tasks/{id}/advance"));
        let token = token.clone();
        async move { client.post(url).bearer_auth(token).send().await.unwrap() }
    };

    let body: Value = advance(id.clone()).await.json().await.unwrap();
    assert_eq!(body["status"], "em-andamento");
    let body: Value = advance(id.clone()).await.json().await.unwrap();
    assert_eq!(body["status"], "concluida");
    assert_eq!(advance(id.clone()).await.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let listed: Value = srv.get("/tasks?status=concluida", &token).await.json().await.unwrap();
    assert_eq!(listed["items"].as_array().unwrap().len(), 1);
    assert_eq!(listed["summary"]["completed"], 1);

    // Another user's board is separate.
    let other = srv.login("admin@aluguetudo.com", "admin123").await;
    let listed: Value = srv.get("/tasks", &other).await.json().await.unwrap();
    assert!(listed["items"].as_array().unwrap().is_empty());
}
