//! Test application setup utilities
//!
//! Provides utilities for setting up test instances of the application
//! with temporary SQLite databases and swappable collaborators.

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use tower::ServiceExt;
use uuid::Uuid;

use school_portal::{
    api,
    config::{AppConfig, DatabaseConfig},
    db::{self, OwnershipRepository},
    AppState,
};

use super::{factories::AuthAs, fixtures::TEST_JWT_SECRET};

/// Test application wrapper for integration testing
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// Create a new test application with a temporary SQLite database
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a new test application with custom configuration
    pub async fn with_config(config: AppConfig) -> Self {
        Self::customized(config, |state| state).await
    }

    /// Create a test application, letting the caller swap collaborators
    pub async fn customized(config: AppConfig, customize: impl FnOnce(AppState) -> AppState) -> Self {
        let db = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize test database");

        let state = customize(AppState::new(config, db).expect("Failed to build test state"));
        let router = api::router(state.clone());

        Self { router, state }
    }

    /// Repository for seeding assignments and links
    pub fn ownership_repo(&self) -> OwnershipRepository {
        OwnershipRepository::new(self.state.db.clone())
    }

    /// Send a request as the given caller
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        auth: &AuthAs,
        body: Option<serde_json::Value>,
    ) -> TestResponse {
        self.send_from(method, uri, auth, body, None).await
    }

    /// Send a request as the given caller, optionally from a forwarded client address
    pub async fn send_from(
        &self,
        method: Method,
        uri: &str,
        auth: &AuthAs,
        body: Option<serde_json::Value>,
        forwarded_for: Option<&str>,
    ) -> TestResponse {
        let mut builder = auth.apply(Request::builder().method(method).uri(uri));
        if let Some(ip) = forwarded_for {
            builder = builder.header("x-forwarded-for", ip);
        }

        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.request(request).await
    }

    /// Make a GET request as the given caller
    pub async fn get(&self, uri: &str, auth: &AuthAs) -> TestResponse {
        self.send(Method::GET, uri, auth, None).await
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, auth: &AuthAs, body: serde_json::Value) -> TestResponse {
        self.send(Method::POST, uri, auth, Some(body)).await
    }

    /// Make a PUT request with JSON body
    pub async fn put_json(&self, uri: &str, auth: &AuthAs, body: serde_json::Value) -> TestResponse {
        self.send(Method::PUT, uri, auth, Some(body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, uri: &str, auth: &AuthAs) -> TestResponse {
        self.send(Method::DELETE, uri, auth, None).await
    }

    /// Make an arbitrary request
    pub async fn request(&self, request: Request<Body>) -> TestResponse {
        send_to(self.router.clone(), request).await
    }
}

/// Run one request through any router and collect the response
pub async fn send_to(router: Router, request: Request<Body>) -> TestResponse {
    let response = router
        .oneshot(request)
        .await
        .expect("Failed to execute request");

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Get the response body as a string
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Parse the response body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("Failed to parse response as JSON")
    }

    /// The `error` field of a guard rejection
    pub fn error_message(&self) -> String {
        let body: serde_json::Value = self.json();
        body["error"].as_str().unwrap_or_default().to_string()
    }

    /// Assert the response status
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// Assert the response status is OK (200)
    pub fn assert_ok(&self) -> &Self {
        self.assert_status(StatusCode::OK)
    }

    /// Assert the response status is Created (201)
    pub fn assert_created(&self) -> &Self {
        self.assert_status(StatusCode::CREATED)
    }

    /// Assert a guard rejection with the given status and message
    pub fn assert_rejected(&self, status: StatusCode, message: &str) -> &Self {
        self.assert_status(status);
        assert_eq!(self.error_message(), message);
        self
    }
}

/// Create a test configuration with temporary SQLite database
///
/// Rate limiting is off so tests only meet it when they ask for it.
pub fn test_config() -> AppConfig {
    let db_path = std::env::temp_dir().join(format!(
        "school_portal_test_{}.db",
        Uuid::new_v4().simple()
    ));

    let mut config = AppConfig::default();
    config.auth.jwt_secret = TEST_JWT_SECRET.to_string();
    config.database = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", db_path.display()),
        max_connections: 1,
        min_connections: 1,
        connect_timeout_secs: 30,
        idle_timeout_secs: 600,
    };
    config.rate_limit.enabled = false;
    config
}

/// Test configuration with a fixed-window limit on every protected route
pub fn rate_limited_config(max_requests: u32, window_ms: u64) -> AppConfig {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.window_ms = window_ms;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = TestApp::new().await;
        let response = app.get("/api/health", &AuthAs::Anonymous).await;
        response.assert_ok();
        let json: serde_json::Value = response.json();
        assert_eq!(json["status"], "healthy");
    }
}
