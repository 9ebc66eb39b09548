#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Once;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use jobboard::{
    auth::PasswordHasher,
    config::AppConfig,
    create_app,
    models::{NewUser, Role},
    store::{DocumentStore, JobBoardStore, SqlStore},
    AppState,
};
use sea_orm::{ConnectOptions, Database};
use serde_json::{json, Value};
use tower::ServiceExt;

static INIT: Once = Once::new();

pub const PASSWORD: &str = "password123";

fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn fast_hasher() -> PasswordHasher {
    PasswordHasher::with_params(4096, 1, 1).unwrap()
}

/// The application wired to one store adapter, plus direct store access
/// for arranging fixtures the HTTP surface cannot create (admins).
pub struct TestApp {
    pub name: &'static str,
    pub app: Router,
    pub store: Arc<dyn JobBoardStore>,
}

pub async fn document_app() -> TestApp {
    setup();
    build("document", Arc::new(DocumentStore::in_memory()))
}

pub async fn sql_app() -> TestApp {
    setup();
    // One pooled connection keeps the in-memory database alive for the test.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();
    let store = SqlStore::new(db);
    store.migrate().await.unwrap();
    build("sql", Arc::new(store))
}

/// Both adapters; scenarios run once against each.
pub async fn backends() -> Vec<TestApp> {
    vec![document_app().await, sql_app().await]
}

fn build(name: &'static str, store: Arc<dyn JobBoardStore>) -> TestApp {
    let config = AppConfig {
        jwt_secret: "integration-test-secret-integration".to_string(),
        ..AppConfig::default()
    };
    let app = create_app(AppState::new(store.clone(), fast_hasher(), config));
    TestApp { name, app, store }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, token, Some(body)).await
    }

    /// Registers a USER and returns its token.
    pub async fn register(&self, email: &str) -> String {
        let (status, body) = self
            .post("/api/auth/register", None, json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "[{}] register {email}: {body}", self.name);
        body["token"].as_str().unwrap().to_string()
    }

    /// Inserts an account with any role straight into the store and logs in.
    pub async fn account(&self, email: &str, role: Role) -> String {
        self.store
            .create_user(NewUser {
                email: email.to_string(),
                password_hash: fast_hasher().hash(PASSWORD.to_string()).await.unwrap(),
                name: None,
                role,
                company_id: None,
            })
            .await
            .unwrap();
        self.login(email).await
    }

    pub async fn login(&self, email: &str) -> String {
        let (status, body) = self
            .post("/api/auth/login", None, json!({ "email": email, "password": PASSWORD }))
            .await;
        assert_eq!(status, StatusCode::OK, "[{}] login {email}: {body}", self.name);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin(&self) -> String {
        self.account("admin@example.com", Role::Admin).await
    }

    pub async fn company(&self, admin: &str, name: &str) -> String {
        let (status, body) = self.post("/api/companies", Some(admin), json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED, "[{}] company {name}: {body}", self.name);
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn job(&self, token: &str, company_id: &str, title: &str) -> String {
        let (status, body) = self
            .post(
                "/api/jobs",
                Some(token),
                json!({ "title": title, "description": "Build and run services", "companyId": company_id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "[{}] job {title}: {body}", self.name);
        body["id"].as_str().unwrap().to_string()
    }

    pub async fn apply(&self, token: &str, job_id: &str) -> (StatusCode, Value) {
        self.post(
            "/api/applications",
            Some(token),
            json!({ "jobId": job_id, "coverLetter": "I would love to work with you" }),
        )
        .await
    }
}
