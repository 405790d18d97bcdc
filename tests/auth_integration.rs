use crm_system::auth::{hash_password, sign, ClaimsPair, SessionAuthorizer, TokenKeys};
use crm_system::model::{CredentialRecord, NewCredential, Role};
use crm_system::startup::run;
use crm_system::store::{CredentialRepository, InMemoryStore};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

pub struct TestApp {
    pub address: String,
    pub store: InMemoryStore,
    pub keys: TokenKeys,
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let keys = TokenKeys::load("tests/fixtures/access_key.pem", "tests/fixtures/refresh_key.pem")
        .expect("Failed to load fixture keys");
    let store = InMemoryStore::new();
    let authorizer =
        SessionAuthorizer::new(keys.clone(), Arc::new(store.clone()), Duration::from_secs(1));

    let server = run(
        listener,
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        authorizer,
    )
    .expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        keys,
    }
}

impl TestApp {
    async fn add_user(&self, username: &str, password: &str, role: Role) -> CredentialRecord {
        self.store
            .create(NewCredential {
                username: username.to_string(),
                password_hash: hash_password(password),
                role,
            })
            .await
            .expect("Failed to seed user")
    }

    async fn post_json(&self, path: &str, body: &Value, token: Option<&str>) -> reqwest::Response {
        let mut request = reqwest::Client::new()
            .post(&format!("{}{}", &self.address, path))
            .json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    async fn login(&self, username: &str, password: &str) -> Value {
        let response = self
            .post_json(
                "/api/v1/login",
                &json!({ "username": username, "password": password }),
                None,
            )
            .await;
        assert_eq!(200, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }
}

async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("Failed to parse error body");
    body["code"].as_str().unwrap_or_default().to_string()
}

// --- Login Tests ---

#[tokio::test]
async fn login_returns_token_pair_for_valid_credentials() {
    let app = spawn_app();
    app.add_user("alice", "pw1", Role::Admin).await;

    let body = app.login("alice", "pw1").await;

    let access = body["accessToken"].as_str().unwrap();
    let refresh = body["refreshToken"].as_str().unwrap();
    assert_eq!(access.split('.').count(), 3);
    assert_eq!(refresh.split('.').count(), 3);
    assert_ne!(access, refresh);
}

#[tokio::test]
async fn login_returns_401_for_wrong_password() {
    let app = spawn_app();
    app.add_user("alice", "pw1", Role::Admin).await;

    let response = app
        .post_json("/api/v1/login", &json!({ "username": "alice", "password": "bad" }), None)
        .await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "UNAUTHORIZED");
}

#[tokio::test]
async fn login_returns_401_for_unknown_user() {
    let app = spawn_app();

    let response = app
        .post_json("/api/v1/login", &json!({ "username": "nobody", "password": "pw" }), None)
        .await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn login_trims_surrounding_whitespace() {
    let app = spawn_app();
    app.add_user("alice", "pw1", Role::Base).await;

    app.login("  alice ", " pw1 ").await;
}

#[tokio::test]
async fn login_returns_400_for_invalid_body() {
    let app = spawn_app();
    let test_cases = vec![
        (json!({ "username": "alice" }), "missing password"),
        (json!({ "password": "pw1" }), "missing username"),
        (json!({ "username": "   ", "password": "pw1" }), "blank username"),
        (json!({}), "missing both"),
    ];

    for (body, description) in test_cases {
        let response = app.post_json("/api/v1/login", &body, None).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 when the payload was {}.",
            description
        );
        assert_eq!(error_code(response).await, "INVALID_BODY");
    }
}

#[tokio::test]
async fn login_returns_400_for_malformed_json() {
    let app = spawn_app();

    let response = reqwest::Client::new()
        .post(&format!("{}/api/v1/login", &app.address))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(400, response.status().as_u16());
    assert_eq!(error_code(response).await, "INVALID_BODY");
}

// --- Refresh Tests ---

#[tokio::test]
async fn refresh_returns_new_pair() {
    let app = spawn_app();
    app.add_user("alice", "pw1", Role::Admin).await;
    let tokens = app.login("alice", "pw1").await;

    let response = app.post_json("/api/v1/refresh", &tokens, None).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["accessToken"].is_string());
    assert_ne!(body["refreshToken"], tokens["refreshToken"]);
}

#[tokio::test]
async fn refresh_returns_401_for_expired_refresh_token() {
    let app = spawn_app();
    let user = app.add_user("alice", "pw1", Role::Admin).await;

    let now = chrono::Utc::now().timestamp();
    let mut pair = ClaimsPair::build(user.id, user.role);
    pair.refresh.base.iat = now - 60;
    pair.refresh.base.exp = now - 1;
    let expired = sign(&pair.refresh, app.keys.refresh.encoding()).unwrap();

    let response = app
        .post_json(
            "/api/v1/refresh",
            &json!({ "accessToken": "", "refreshToken": expired }),
            None,
        )
        .await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "UNAUTHORIZED");
}

#[tokio::test]
async fn refresh_rejects_access_token_in_refresh_slot() {
    let app = spawn_app();
    app.add_user("alice", "pw1", Role::Admin).await;
    let tokens = app.login("alice", "pw1").await;

    let response = app
        .post_json(
            "/api/v1/refresh",
            &json!({ "accessToken": "", "refreshToken": tokens["accessToken"] }),
            None,
        )
        .await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn refresh_picks_up_current_role() {
    let app = spawn_app();
    let user = app.add_user("alice", "pw1", Role::Admin).await;
    let tokens = app.login("alice", "pw1").await;
    app.store.set_role(user.id, Role::Base).unwrap();

    let response = app.post_json("/api/v1/refresh", &tokens, None).await;
    assert_eq!(200, response.status().as_u16());
    let refreshed: Value = response.json().await.unwrap();

    // the refreshed token is BASE now, so registration is refused
    let response = app
        .post_json(
            "/api/v1/registration",
            &json!({ "username": "bob", "password": "pw2", "role": "BASE" }),
            refreshed["accessToken"].as_str(),
        )
        .await;
    assert_eq!(400, response.status().as_u16());
    assert_eq!(error_code(response).await, "INVALID_ROLE");
}

// --- Registration Tests ---

#[tokio::test]
async fn admin_can_register_user_who_can_then_login() {
    let app = spawn_app();
    app.add_user("alice", "pw1", Role::Admin).await;
    let tokens = app.login("alice", "pw1").await;

    let response = app
        .post_json(
            "/api/v1/registration",
            &json!({ "username": "bob", "password": "pw2", "role": "BASE" }),
            tokens["accessToken"].as_str(),
        )
        .await;

    assert_eq!(200, response.status().as_u16());
    app.login("bob", "pw2").await;
}

#[tokio::test]
async fn registration_returns_400_for_duplicate_username() {
    let app = spawn_app();
    app.add_user("alice", "pw1", Role::Admin).await;
    let tokens = app.login("alice", "pw1").await;
    let body = json!({ "username": "bob", "password": "pw2", "role": "BASE" });

    let first = app
        .post_json("/api/v1/registration", &body, tokens["accessToken"].as_str())
        .await;
    assert_eq!(200, first.status().as_u16());

    let second = app
        .post_json("/api/v1/registration", &body, tokens["accessToken"].as_str())
        .await;
    assert_eq!(400, second.status().as_u16());
    assert_eq!(error_code(second).await, "USERNAME_EXISTS");
    assert_eq!(app.store.credential_count(), 2);
}

#[tokio::test]
async fn registration_by_base_user_returns_400_invalid_role() {
    let app = spawn_app();
    app.add_user("carol", "pw3", Role::Base).await;
    let tokens = app.login("carol", "pw3").await;

    let response = app
        .post_json(
            "/api/v1/registration",
            &json!({ "username": "dave", "password": "pw4", "role": "BASE" }),
            tokens["accessToken"].as_str(),
        )
        .await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(error_code(response).await, "INVALID_ROLE");
    assert_eq!(app.store.credential_count(), 1);
}

#[tokio::test]
async fn registration_returns_400_for_missing_role() {
    let app = spawn_app();
    app.add_user("alice", "pw1", Role::Admin).await;
    let tokens = app.login("alice", "pw1").await;

    let response = app
        .post_json(
            "/api/v1/registration",
            &json!({ "username": "bob", "password": "pw2" }),
            tokens["accessToken"].as_str(),
        )
        .await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(error_code(response).await, "INVALID_BODY");
}

#[tokio::test]
async fn registration_without_token_returns_401() {
    let app = spawn_app();

    let response = app
        .post_json(
            "/api/v1/registration",
            &json!({ "username": "bob", "password": "pw2", "role": "BASE" }),
            None,
        )
        .await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert_eq!(error_code(response).await, "UNAUTHORIZED");
    assert_eq!(app.store.credential_count(), 0);
}

#[tokio::test]
async fn registration_with_stale_role_returns_refresh_expired() {
    let app = spawn_app();
    let user = app.add_user("alice", "pw1", Role::Admin).await;
    let tokens = app.login("alice", "pw1").await;
    app.store.set_role(user.id, Role::Base).unwrap();

    let response = app
        .post_json(
            "/api/v1/registration",
            &json!({ "username": "bob", "password": "pw2", "role": "BASE" }),
            tokens["accessToken"].as_str(),
        )
        .await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "REFRESH_EXPIRED");
}

#[tokio::test]
async fn registration_with_refresh_token_is_rejected() {
    let app = spawn_app();
    app.add_user("alice", "pw1", Role::Admin).await;
    let tokens = app.login("alice", "pw1").await;

    let response = app
        .post_json(
            "/api/v1/registration",
            &json!({ "username": "bob", "password": "pw2", "role": "BASE" }),
            tokens["refreshToken"].as_str(),
        )
        .await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "REFRESH_EXPIRED");
}

// --- Change Password Tests ---

async fn change_password(
    app: &TestApp,
    token: Option<&str>,
    old_password: &str,
    new_password: &str,
) -> reqwest::Response {
    let mut request = reqwest::Client::new()
        .patch(&format!("{}/api/v1/change-password", &app.address))
        .json(&json!({ "old_password": old_password, "new_password": new_password }));
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    request.send().await.expect("Failed to execute request.")
}

#[tokio::test]
async fn change_password_swaps_credentials() {
    let app = spawn_app();
    app.add_user("alice", "pw1", Role::Base).await;
    let tokens = app.login("alice", "pw1").await;

    let response = change_password(&app, tokens["accessToken"].as_str(), "pw1", "pw9").await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body["accessToken"].is_string());

    let old = app
        .post_json("/api/v1/login", &json!({ "username": "alice", "password": "pw1" }), None)
        .await;
    assert_eq!(401, old.status().as_u16());
    app.login("alice", "pw9").await;
}

#[tokio::test]
async fn change_password_returns_401_for_wrong_old_password() {
    let app = spawn_app();
    app.add_user("alice", "pw1", Role::Base).await;
    let tokens = app.login("alice", "pw1").await;

    let response = change_password(&app, tokens["accessToken"].as_str(), "nope", "pw9").await;

    assert_eq!(401, response.status().as_u16());
    app.login("alice", "pw1").await;
}

#[tokio::test]
async fn change_password_without_token_returns_401() {
    let app = spawn_app();

    let response = change_password(&app, None, "pw1", "pw9").await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn change_password_for_deleted_user_returns_refresh_expired() {
    let app = spawn_app();
    let user = app.add_user("alice", "pw1", Role::Base).await;
    let tokens = app.login("alice", "pw1").await;
    app.store.delete(user.id).await.unwrap();

    let response = change_password(&app, tokens["accessToken"].as_str(), "pw1", "pw9").await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(error_code(response).await, "REFRESH_EXPIRED");
}
