use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode as AxumStatusCode;
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::Mutex;
use uuid::Uuid;

use formgate::config::Config;
use formgate::state::SharedState;

/// A running test server instance with a dedicated test database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub pool: PgPool,
    pub state: SharedState,
    pub client: Client,
    pub db_name: String,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Create a form, return the form JSON.
    pub async fn create_form(&self, body: &Value) -> Value {
        let resp = self
            .client
            .post(self.url("/api/v1/forms"))
            .json(body)
            .send()
            .await
            .expect("create form failed");
        assert_eq!(resp.status(), StatusCode::OK, "create form non-200");
        resp.json().await.unwrap()
    }

    /// Create a webhook, return the webhook JSON.
    pub async fn create_webhook(&self, body: &Value) -> Value {
        let resp = self
            .client
            .post(self.url("/api/v1/webhooks"))
            .json(body)
            .send()
            .await
            .expect("create webhook failed");
        assert_eq!(resp.status(), StatusCode::OK, "create webhook non-200");
        resp.json().await.unwrap()
    }

    /// Attach a webhook to a form.
    pub async fn attach_webhook(&self, form_id: &str, webhook_id: &str) {
        let resp = self
            .client
            .post(self.url(&format!("/api/v1/forms/{form_id}/webhooks")))
            .json(&json!({ "webhook_id": webhook_id }))
            .send()
            .await
            .expect("attach webhook failed");
        assert_eq!(resp.status(), StatusCode::OK, "attach webhook non-200");
    }

    /// Submit JSON data to a form, return (body, status).
    pub async fn submit_json(&self, form_id: &str, data: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(&format!("/v1/f/{form_id}")))
            .json(data)
            .send()
            .await
            .expect("submit json failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Submit form-urlencoded data to a form, return (body, status).
    pub async fn submit_form(&self, form_id: &str, data: &[(&str, &str)]) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(&format!("/v1/f/{form_id}")))
            .form(data)
            .send()
            .await
            .expect("submit form failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Make a GET request, return (body, status).
    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    /// Count submission rows matching a pending flag.
    pub async fn count_submissions(&self, pending: bool) -> i64 {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM submissions WHERE pending = $1")
            .bind(pending)
            .fetch_one(&self.pool)
            .await
            .expect("count query failed")
    }

    /// Push every submission's sent_at into the past so sweeps see it as
    /// expired.
    pub async fn backdate_submissions(&self) {
        sqlx::query("UPDATE submissions SET sent_at = sent_at - interval '1 hour'")
            .execute(&self.pool)
            .await
            .expect("backdate failed");
    }
}

/// Spawn a test app with a fresh temporary database, or None when
/// TEST_DATABASE_URL is not set.
pub async fn try_spawn_app() -> Option<TestApp> {
    try_spawn_app_with(0).await
}

pub async fn try_spawn_app_with(postpone_duration_mins: u64) -> Option<TestApp> {
    let _ = dotenvy::dotenv();

    let Ok(base_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set; skipping integration test");
        return None;
    };

    // Create a unique test database
    let db_name = format!(
        "formgate_test_{}",
        Uuid::now_v7().to_string().replace('-', "")
    );

    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect to postgres for test DB creation");

    sqlx::query(&format!("CREATE DATABASE \"{db_name}\""))
        .execute(&admin_pool)
        .await
        .expect("Failed to create test database");

    admin_pool.close().await;

    let test_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/{db_name}"))
        .unwrap_or_else(|| base_url.clone());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&test_url)
        .await
        .expect("Failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations on test database");

    let config = Config {
        database_url: test_url,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to a random port
        base_url: "http://localhost".to_string(),
        hostname: "test.example.com".to_string(),
        max_body_size: 1_048_576,
        trusted_proxies: vec![],
        log_level: "warn".to_string(),
        postpone_duration_mins,
        sweep_interval_secs: 3600,
        smtp: None,
    };

    let state = formgate::build_state(pool.clone(), config);
    let app = formgate::build_app(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .expect("Server failed");
    });

    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    Some(TestApp {
        addr,
        pool,
        state,
        client,
        db_name,
    })
}

/// Drop the test database after tests complete.
pub async fn cleanup(app: TestApp) {
    let db_name = app.db_name.clone();
    app.pool.close().await;

    let base_url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let admin_url = base_url
        .rsplit_once('/')
        .map(|(base, _)| format!("{base}/postgres"))
        .unwrap_or_else(|| base_url.clone());

    let admin_pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&admin_url)
        .await
        .expect("Failed to connect for cleanup");

    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS \"{db_name}\" WITH (FORCE)"))
        .execute(&admin_pool)
        .await;
    admin_pool.close().await;
}

/// A local HTTP server that records bodies posted to it. JSON bodies land on
/// `/hook`; form-encoded bodies land on `/form-hook` as string-valued objects.
pub struct CaptureServer {
    pub url: String,
    pub form_url: String,
    pub received: Arc<Mutex<Vec<Value>>>,
}

pub async fn spawn_capture_server() -> CaptureServer {
    let received: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));

    let app = Router::new()
        .route(
            "/hook",
            axum::routing::post(
                |State(store): State<Arc<Mutex<Vec<Value>>>>, Json(body): Json<Value>| async move {
                    store.lock().await.push(body);
                    AxumStatusCode::OK
                },
            ),
        )
        .route(
            "/form-hook",
            axum::routing::post(
                |State(store): State<Arc<Mutex<Vec<Value>>>>,
                 axum::Form(fields): axum::Form<Vec<(String, String)>>| async move {
                    let map: serde_json::Map<String, Value> = fields
                        .into_iter()
                        .map(|(k, v)| (k, Value::String(v)))
                        .collect();
                    store.lock().await.push(Value::Object(map));
                    AxumStatusCode::OK
                },
            ),
        )
        .with_state(received.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind capture server");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Capture server failed");
    });

    CaptureServer {
        url: format!("http://{addr}/hook"),
        form_url: format!("http://{addr}/form-hook"),
        received,
    }
}
