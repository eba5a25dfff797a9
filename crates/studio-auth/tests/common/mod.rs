#![allow(dead_code)]

use serde_json::{json, Value};
use session_store::jwt::token_expiring_in;
use session_store::{MemoryCookieJar, OrgContext, SessionRecord};
use std::sync::Arc;
use std::time::Duration;
use studio_auth::{RecordingNavigator, SessionManager};
use studio_config_and_utils::{AppMode, Config, RefreshStrategy};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GET_USER_TARGET: &str = "AWSCognitoIdentityProviderService.GetUser";

pub struct Harness {
    pub server: MockServer,
    pub config: Config,
    pub manager: Arc<SessionManager>,
    pub navigator: Arc<RecordingNavigator>,
}

pub async fn harness(mode: AppMode) -> Harness {
    harness_with_strategy(mode, RefreshStrategy::Interval).await
}

pub async fn harness_with_strategy(mode: AppMode, strategy: RefreshStrategy) -> Harness {
    let server = MockServer::start().await;

    let mut config = Config::default();
    config.mode = mode;
    config.api_url = format!("{}/api/", server.uri());
    config.cognito.domain = format!("{}/oauth2", server.uri());
    config.cognito.client_id = "static-client".to_string();
    config.cognito.client_secret = "static-secret".to_string();
    config.cognito.redirect_uri = "http://localhost:3000/loading".to_string();
    config.cognito.api_endpoint = Some(format!("{}/idp/", server.uri()));
    config.refresh.strategy = strategy;
    config.http_timeout_secs = 5;

    let store = Arc::new(SessionManager::open_store(
        &config,
        Arc::new(MemoryCookieJar::new()),
    ));
    let navigator = Arc::new(RecordingNavigator::new());
    let manager = SessionManager::new(&config, store, navigator.clone()).unwrap();

    Harness {
        server,
        config,
        manager,
        navigator,
    }
}

/// A logged-in record as left behind by a previous exchange.
pub fn seed_session(manager: &SessionManager) {
    manager.store().transaction(|record: &mut SessionRecord| {
        record.id_token = Some(token_expiring_in(60));
        record.access_token = Some("access-old".to_string());
        record.refresh_token = Some("refresh-1".to_string());
        record.usercid = Some("sub-1".to_string());
        record.username = Some("Jane".to_string());
        record.usermail = Some("jane@acme.io".to_string());
        record.coguser = Some("azuread_jane".to_string());
        record.primary_org = Some("acme".to_string());
        record.app_user_logged_in = Some(true);
        record.org = Some(OrgContext {
            domain: "acme.io".to_string(),
            ..Default::default()
        });
    });
}

pub fn token_response(with_refresh_token: bool) -> Value {
    let mut body = json!({
        "id_token": token_expiring_in(3600),
        "access_token": "access-new",
        "expires_in": 3600,
        "token_type": "Bearer"
    });
    if with_refresh_token {
        body["refresh_token"] = json!("refresh-new");
    }
    body
}

pub fn get_user_response(org_id: Option<&str>) -> Value {
    let mut attributes = vec![
        json!({"Name": "sub", "Value": "sub-1"}),
        json!({"Name": "name", "Value": "Jane"}),
        json!({"Name": "email", "Value": "jane@acme.io"}),
    ];
    if let Some(org_id) = org_id {
        attributes.push(json!({"Name": "custom:org_id", "Value": org_id}));
    }
    json!({"Username": "azuread_jane", "UserAttributes": attributes})
}

pub fn check_user_response(admin_approve: bool, user_type: &str) -> Value {
    json!({
        "admin_approve": admin_approve,
        "primary_org": "acme",
        "user_type": user_type,
        "userPerms": {"admin": ["acme"], "readonly": [], "dev": []}
    })
}

pub async fn mount_get_user(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path("/idp/"))
        .and(header("X-Amz-Target", GET_USER_TARGET))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_check_user(server: &MockServer, body: Value) {
    Mock::given(method("POST"))
        .and(path("/api/checkUsr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_profile(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/profile/get"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"imageUrl": "https://cdn.example.com/jane.png"})),
        )
        .mount(server)
        .await;
}

/// Wait for a background task to write into the store.
pub async fn wait_for<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
