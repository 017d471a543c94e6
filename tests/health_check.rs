//! Integration tests for the authkeeper server

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use authkeeper::auth::{BcryptHasher, JwtSigner, RequestAuthenticator};
use authkeeper::configuration::AuthConfig;
use authkeeper::service::{SessionIssuer, UserService};
use authkeeper::startup::{run, AppState};
use authkeeper::store::{InMemoryRefreshTokenStore, InMemoryUserStore};

fn spawn_app() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let config = AuthConfig {
        secret: b"health-check-secret-0123456789abcdef".to_vec(),
        access_token_ttl: Duration::from_secs(120),
        refresh_token_ttl: Duration::from_secs(600),
        leeway: Duration::ZERO,
        store_timeout: Duration::from_secs(3),
        bcrypt_cost: 4,
    };
    let users = Arc::new(InMemoryUserStore::new());
    let hasher = Arc::new(BcryptHasher::new(config.bcrypt_cost).unwrap());
    let signer = Arc::new(JwtSigner::new(&config.secret, config.leeway));
    let state = AppState {
        sessions: SessionIssuer::new(
            users.clone(),
            Arc::new(InMemoryRefreshTokenStore::new()),
            hasher.clone(),
            signer.clone(),
            config.clone(),
        ),
        users: UserService::new(users, hasher, config.store_timeout),
        authenticator: RequestAuthenticator::new(signer),
    };

    let server = run(listener, state).expect("Failed to create server");
    let _ = tokio::spawn(async move {
        let _ = server.await;
    });

    format!("http://127.0.0.1:{}", port)
}

#[tokio::test]
async fn health_check_works() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/health_check", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let addr = spawn_app();

    let response = reqwest::Client::new()
        .get(&format!("{}/subscriptions", addr))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(404, response.status().as_u16());
}
