use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use canteen_api::{
    auth::{AuthService, ROLE_ADMIN},
    config::AppConfig,
    db::{self, DbConfig},
    events::{self, EventSender},
    handlers::AppServices,
    notifications::{LogTransport, NotificationService},
    AppState,
};

const TEST_JWT_SECRET: &str = "a_test_secret_that_is_long_enough_for_validation";

/// Test harness: the full application router over an in-memory SQLite
/// database, with the event loop running against the logging transport.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub auth: Arc<AuthService>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        // A single connection keeps the in-memory database alive and shared.
        let db_cfg = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("test database");
        db::run_migrations(&pool).await.expect("migrations");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let notifications = Arc::new(NotificationService::new(Arc::new(LogTransport)));
        let event_task = tokio::spawn(events::process_events(event_rx, notifications));

        let auth = Arc::new(AuthService::new(
            TEST_JWT_SECRET,
            Duration::from_secs(3600),
        ));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()));
        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let auth_for_layer = auth.clone();
        let router = Router::new()
            .nest("/api/v1", canteen_api::api_v1_routes())
            .layer(axum::middleware::from_fn_with_state(
                auth_for_layer,
                |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
                 mut req: axum::http::Request<Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(auth);
                    next.run(req).await
                },
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            auth,
            _event_task: event_task,
        }
    }

    pub fn token_for(&self, user_id: Uuid, email: &str, roles: &[&str]) -> String {
        self.auth
            .issue_token(user_id, email, None, roles)
            .expect("token")
    }

    pub fn customer_token(&self, user_id: Uuid, email: &str) -> String {
        self.token_for(user_id, email, &[])
    }

    pub fn admin_token(&self) -> String {
        self.token_for(Uuid::new_v4(), "staff@canteen.test", &[ROLE_ADMIN])
    }

    /// Fire one request through the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        self.router.clone().oneshot(request).await.expect("response")
    }
}

pub async fn response_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
