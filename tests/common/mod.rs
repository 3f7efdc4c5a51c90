// Shared by several test binaries; not every binary uses every helper.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request},
    middleware, Router,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use hostdeck_api::{
    auth::{AuthConfig, AuthService, Claims},
    config::AppConfig,
    db,
    errors::ServiceError,
    events::{self, EventSender},
    handlers::AppServices,
    payments::{CreateSessionRequest, GatewaySession, PaymentGateway},
    AppState,
};
use serde_json::Value;
use sha2::Sha256;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

type HmacSha256 = Hmac<Sha256>;

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Payment gateway stub that records every request and can be told to fail.
pub struct MockGateway {
    requests: Mutex<Vec<CreateSessionRequest>>,
    fail: AtomicBool,
    counter: AtomicUsize,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<CreateSessionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> CreateSessionRequest {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no gateway request recorded")
    }

    /// Id of the most recently created session (`cs_test_1`, `cs_test_2`, ...).
    pub fn last_session_id(&self) -> String {
        format!("cs_test_{}", self.counter.load(Ordering::SeqCst))
    }
}

#[async_trait::async_trait]
impl PaymentGateway for MockGateway {
    async fn create_recurring_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<GatewaySession, ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalServiceError(
                "mock gateway is down".to_string(),
            ));
        }

        self.requests.lock().unwrap().push(request);
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(GatewaySession {
            id: format!("cs_test_{}", n),
            redirect_url: format!("https://pay.example/session/cs_test_{}", n),
        })
    }
}

/// Test application backed by a throwaway sqlite database and the mock
/// payment gateway.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub gateway: Arc<MockGateway>,
    _event_task: tokio::task::JoinHandle<()>,
    _tmp: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir for test db");
        let db_path = tmp.path().join("hostdeck_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.payment_webhook_secret = Some(TEST_WEBHOOK_SECRET.to_string());
        cfg.base_url = "https://shop.example".to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let cfg = Arc::new(cfg);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let gateway = Arc::new(MockGateway::new());
        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            gateway.clone(),
            cfg.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg.clone(),
            event_sender,
            services,
        };

        let auth_service = Arc::new(AuthService::new(AuthConfig::new(
            &cfg.jwt_secret,
            &cfg.auth_issuer,
            &cfg.auth_audience,
        )));

        let router = Router::new()
            .nest("/api/v1", hostdeck_api::api_v1_routes())
            .layer(middleware::from_fn_with_state(
                auth_service,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: Request<Body>,
                 next: middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            gateway,
            _event_task: event_task,
            _tmp: tmp,
        }
    }

    /// Issues a bearer token the app's auth config accepts.
    pub fn token_for(&self, user_id: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: Some(format!("{}@example.com", user_id)),
            iat: now,
            exp: now + 3600,
            iss: self.state.config.auth_issuer.clone(),
            aud: self.state.config.auth_audience.clone(),
        };

        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(self.state.config.jwt_secret.as_bytes()),
        )
        .expect("encode test token")
    }

    /// Sends a request against the in-process router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("serialize request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience wrapper carrying a session id header.
    pub async fn session_request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        session_id: &str,
    ) -> axum::response::Response {
        self.request(method, uri, body, &[("x-session-id", session_id)])
            .await
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Reads a response body as JSON.
pub async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&body).expect("response body should be json")
}

/// Builds a `Stripe-Signature` header value for a webhook payload.
pub fn sign_webhook(payload: &str, timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(TEST_WEBHOOK_SECRET.as_bytes()).expect("hmac from secret");
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}
