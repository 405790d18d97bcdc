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
        address: format!("http://127.0.0.1:{}", port),
        store,
        keys,
    }
}

impl TestApp {
    async fn seed_session(&self) -> (CredentialRecord, String) {
        let user = self
            .store
            .create(NewCredential {
                username: "alice".to_string(),
                password_hash: hash_password("pw1"),
                role: Role::Base,
            })
            .await
            .expect("Failed to seed user");

        let response = reqwest::Client::new()
            .post(&format!("{}/api/v1/login", &self.address))
            .json(&json!({ "username": "alice", "password": "pw1" }))
            .send()
            .await
            .expect("Failed to execute request.");
        let body: Value = response.json().await.unwrap();
        let token = body["accessToken"].as_str().unwrap().to_string();

        (user, token)
    }

    async fn get_profile(&self, token: Option<&str>) -> reqwest::Response {
        let mut request = reqwest::Client::new().get(&format!("{}/api/v1/user/", &self.address));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    async fn update_info(&self, token: &str, body: &Value) -> reqwest::Response {
        reqwest::Client::new()
            .patch(&format!("{}/api/v1/user/update-info", &self.address))
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

#[tokio::test]
async fn new_user_has_empty_profile() {
    let app = spawn_app();
    let (_, token) = app.seed_session().await;

    let response = app.get_profile(Some(token.as_str())).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "");
    assert_eq!(body["address"], "");
    assert!(body.get("user_id").is_none());
}

#[tokio::test]
async fn profile_is_served_without_trailing_slash() {
    let app = spawn_app();
    let (_, token) = app.seed_session().await;

    let response = reqwest::Client::new()
        .get(&format!("{}/api/v1/user", &app.address))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn update_info_persists_profile() {
    let app = spawn_app();
    let (_, token) = app.seed_session().await;

    let response = app
        .update_info(
            &token,
            &json!({
                "name": "Alice",
                "surname": "Liddell",
                "phone": "+1 555 0100",
                "address": "Wonderland"
            }),
        )
        .await;
    assert_eq!(200, response.status().as_u16());
    let updated: Value = response.json().await.unwrap();
    assert_eq!(updated["surname"], "Liddell");

    let fetched: Value = app.get_profile(Some(token.as_str())).await.json().await.unwrap();
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn update_info_clears_omitted_fields() {
    let app = spawn_app();
    let (_, token) = app.seed_session().await;
    app.update_info(&token, &json!({ "name": "Alice", "phone": "123" }))
        .await;

    let response = app.update_info(&token, &json!({ "name": "Alicia" })).await;

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["name"], "Alicia");
    assert_eq!(body["phone"], "");
}

#[tokio::test]
async fn profile_without_token_returns_401() {
    let app = spawn_app();

    let response = app.get_profile(None).await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn profile_with_expired_token_returns_refresh_expired() {
    let app = spawn_app();
    let (user, _) = app.seed_session().await;

    let now = chrono::Utc::now().timestamp();
    let mut pair = ClaimsPair::build(user.id, user.role);
    pair.access.base.iat = now - 60;
    pair.access.base.exp = now - 1;
    let expired = sign(&pair.access, app.keys.access.encoding()).unwrap();

    let response = app.get_profile(Some(expired.as_str())).await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "REFRESH_EXPIRED");
}

#[tokio::test]
async fn profile_for_deleted_user_returns_refresh_expired() {
    let app = spawn_app();
    let (user, token) = app.seed_session().await;
    app.store.delete(user.id).await.unwrap();

    let response = app.get_profile(Some(token.as_str())).await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "REFRESH_EXPIRED");
}

#[tokio::test]
async fn malformed_authorization_header_returns_401() {
    let app = spawn_app();
    let (_, token) = app.seed_session().await;

    for header in [token.clone(), format!("Bearer {} extra", token)] {
        let response = reqwest::Client::new()
            .get(&format!("{}/api/v1/user/", &app.address))
            .header("Authorization", header)
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(401, response.status().as_u16());
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["code"], "UNAUTHORIZED");
    }
}

#[tokio::test]
async fn guard_rejection_carries_cors_headers() {
    let app = spawn_app();

    let response = app.get_profile(None).await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn stale_session_rejection_carries_cors_headers() {
    let app = spawn_app();
    let (user, token) = app.seed_session().await;
    app.store.delete(user.id).await.unwrap();

    let response = app.get_profile(Some(token.as_str())).await;

    assert_eq!(401, response.status().as_u16());
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "REFRESH_EXPIRED");
}
