#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use negocios::auth;
use negocios::config::Config;
use negocios::db;
use negocios::domain::Role;
use negocios::infrastructure::AppState;
use negocios::modules::integrations::hubspot::{CrmClient, HubSpotClient};
use negocios::server::build_router;
use negocios::services::user_service::{self, NewUserInput};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_crm_url("http://127.0.0.1:9").await
    }

    /// HubSpot calls go to `crm_url` (a wiremock server in sync tests).
    pub async fn with_crm_url(crm_url: &str) -> Self {
        Self::with_config(Config::in_memory(), crm_url).await
    }

    pub async fn with_config(config: Config, crm_url: &str) -> Self {
        let db = db::init_db("sqlite::memory:")
            .await
            .expect("Failed to init DB");
        let crm: Arc<dyn CrmClient> =
            Arc::new(HubSpotClient::new(crm_url).expect("valid wiremock url"));
        let state = AppState::new(db, crm, config);
        let router = build_router(state.clone());
        Self { state, router }
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Creates a user with the given role and returns (id, bearer token).
    pub async fn login_as(&self, username: &str, role: Role) -> (i32, String) {
        let user = user_service::create_user(
            self.state.db(),
            NewUserInput {
                username: username.to_string(),
                password: "password-123".to_string(),
                role: Some(role.to_string()),
            },
        )
        .await
        .expect("Failed to create user");
        let token = auth::create_jwt(&user.username, user.id, role).expect("Failed to sign");
        (user.id, token)
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
