//! Common test utilities for ops-ledger integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{EncodingKey, Header};
use tempfile::TempDir;

use ops_ledger_service::auth::JwtClaims;
use ops_ledger_service::{create_router, AppState, ServiceConfig};
use ops_ledger_store::RocksStore;

/// HS256 secret the harness configures and signs test tokens with.
pub const TEST_AUTH_SECRET: &str = "test-auth-secret";

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// The service API key for usage ingest requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let service_api_key = "test-service-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            auth_secret: Some(TEST_AUTH_SECRET.into()),
            service_api_key: Some(service_api_key.clone()),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            max_mutation_retries: 5,
        };

        let state = AppState::new(Arc::new(store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
            service_api_key,
        }
    }

    /// Authorization header for the default test operator.
    pub fn operator_auth_header(&self) -> String {
        Self::auth_header_for("ops@example.com")
    }

    /// Authorization header for an arbitrary operator identity.
    pub fn auth_header_for(actor: &str) -> String {
        let claims = JwtClaims {
            sub: actor.to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TEST_AUTH_SECRET.as_bytes()),
        )
        .expect("Failed to sign test token");
        format!("Bearer {token}")
    }

    /// Provision a tenant and return its ID.
    pub async fn create_tenant(&self, name: &str, base_credit: i64) -> String {
        let response = self
            .server
            .post("/v1/tenants")
            .add_header("authorization", self.operator_auth_header())
            .json(&serde_json::json!({
                "name": name,
                "base_credit": base_credit
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["tenant_id"].as_str().unwrap().to_string()
    }

    /// Report one usage event through the ingest surface.
    pub async fn report_usage(&self, tenant_id: &str, credits_used: i64) {
        self.server
            .post("/v1/usage")
            .add_header("x-api-key", self.service_api_key.clone())
            .json(&serde_json::json!({
                "tenant_id": tenant_id,
                "credits_used": credits_used,
                "endpoint": "/v2/lookup"
            }))
            .await
            .assert_status_ok();
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
