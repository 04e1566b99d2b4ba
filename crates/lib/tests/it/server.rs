//! End-to-end calls over loopback.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::post};
use vaultkeeper::{
    app::server_builder,
    rpc::{Code, client::VaultClient},
    token::TokenManager,
};

use crate::helpers::{Subject, TOKEN_LIFETIME, TestServer, loopback_config, test_store, test_tokens};

#[tokio::test]
async fn test_secret_lifecycle_scenario() {
    let server = TestServer::start().await;
    let client = server.client_for("a@x.com").await;

    let created = client.create_secret("n1", "raw", vec![1, 2]).await.unwrap();
    assert_eq!(created.name, "n1");
    assert_eq!(created.kind, "raw");

    let read = client.read_secret("n1").await.unwrap();
    assert_eq!(read.content, vec![1, 2]);
    assert_eq!(read.kind, "raw");

    client.delete_secret("n1").await.unwrap();

    let err = client.read_secret("n1").await.unwrap_err();
    assert_eq!(err.code(), Code::NotFound);

    server.stop().await;
}

#[tokio::test]
async fn test_register_twice_is_already_exists() {
    let server = TestServer::start().await;
    let client = server.client();

    client.register("b@x.com", "pw").await.unwrap();
    let err = client.register("b@x.com", "pw").await.unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);

    server.stop().await;
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthenticated() {
    let server = TestServer::start().await;
    let client = server.client();

    client.register("b@x.com", "right").await.unwrap();
    let err = client.login("b@x.com", "wrong").await.unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);

    let token = client.login("b@x.com", "right").await.unwrap();
    let listed = client.with_token(token).list_secrets().await.unwrap();
    assert!(listed.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_list_is_sorted_and_scoped() {
    let server = TestServer::start().await;
    let alice = server.client_for("alice@x.com").await;
    let bob = server.client_for("bob@x.com").await;

    for name in ["zeta", "alpha", "mid"] {
        alice.create_secret(name, "raw", vec![0]).await.unwrap();
    }
    bob.create_secret("alpha", "lp", vec![1]).await.unwrap();

    let names: Vec<_> = alice
        .list_secrets()
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(names, vec!["alpha", "mid", "zeta"]);

    let err = alice.create_secret("alpha", "raw", vec![2]).await.unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);

    let bobs = bob.list_secrets().await.unwrap();
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].kind, "lp");

    server.stop().await;
}

#[tokio::test]
async fn test_owner_scoped_calls_need_a_token() {
    let server = TestServer::start().await;
    let anonymous = server.client();

    assert_eq!(
        anonymous.list_secrets().await.unwrap_err().code(),
        Code::Unauthenticated
    );
    assert_eq!(
        anonymous.read_secret("n1").await.unwrap_err().code(),
        Code::Unauthenticated
    );

    let garbage = server.client().with_token("not.a.token");
    assert_eq!(
        garbage.list_secrets().await.unwrap_err().code(),
        Code::Unauthenticated
    );

    server.stop().await;
}

#[tokio::test]
async fn test_unparsable_subject_is_unauthenticated() {
    let server = TestServer::start().await;
    let token = server
        .tokens
        .issue(&Subject("definitely-not-a-uuid".to_string()), TOKEN_LIFETIME)
        .unwrap();

    let err = server
        .client()
        .with_token(token)
        .create_secret("n1", "raw", vec![1])
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unauthenticated);

    server.stop().await;
}

#[tokio::test]
async fn test_expired_token_is_unauthenticated() {
    let server = TestServer::start().await;
    let client = server.client_for("a@x.com").await;
    assert!(client.list_secrets().await.is_ok());

    server.clock.advance(TOKEN_LIFETIME);
    assert_eq!(
        client.list_secrets().await.unwrap_err().code(),
        Code::Unauthenticated
    );

    server.stop().await;
}

#[tokio::test]
async fn test_empty_arguments_are_invalid() {
    let server = TestServer::start().await;

    let err = server.client().register("", "pw").await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    let client = server.client_for("a@x.com").await;
    let err = client.create_secret("", "raw", vec![1]).await.unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);

    server.stop().await;
}

#[tokio::test]
async fn test_health_is_exempt() {
    let server = TestServer::start().await;
    assert_eq!(server.client().health().await.unwrap().status, "ok");
    server.stop().await;
}

async fn boom() -> &'static str {
    panic!("handler exploded")
}

#[tokio::test]
async fn test_panicking_handler_is_internal_and_server_survives() {
    let store = test_store().await;
    let (tokens, _) = test_tokens();
    let server = server_builder(
        loopback_config(),
        store.users.clone(),
        store.secrets.clone(),
        tokens,
        TOKEN_LIFETIME,
    )
    .service(Router::new().route("/test.Panic/Boom", post(boom)))
    .exempt("/test.Panic/Boom")
    .start()
    .await
    .unwrap();

    let base = format!("http://{}", server.local_addr());
    let response = reqwest::Client::new()
        .post(format!("{base}/test.Panic/Boom"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["code"], "internal");

    // Still serving after the panic.
    let client = VaultClient::new(base);
    client.register("after@x.com", "pw").await.unwrap();

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_port_zero_resolves_and_stop_refuses_connections() {
    let server = TestServer::start().await;
    let addr = server.addr();
    assert_ne!(addr.port(), 0);
    assert!(server.client().health().await.is_ok());

    server.stop().await;

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    let err = VaultClient::new(format!("http://{addr}"))
        .health()
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Unavailable);
}

#[tokio::test]
async fn test_stop_drains_in_flight_calls() {
    let store = test_store().await;
    let (tokens, _) = test_tokens();
    let server = server_builder(
        loopback_config(),
        store.users.clone(),
        store.secrets.clone(),
        tokens,
        TOKEN_LIFETIME,
    )
    .service(Router::new().route(
        "/test.Slow/Sleep",
        post(|| async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            "done"
        }),
    ))
    .exempt("/test.Slow/Sleep")
    .start()
    .await
    .unwrap();

    let url = format!("http://{}/test.Slow/Sleep", server.local_addr());
    let in_flight = tokio::spawn(async move { reqwest::Client::new().post(url).send().await });

    // Let the call reach the handler before stopping.
    tokio::time::sleep(Duration::from_millis(100)).await;
    server.stop().await.unwrap();

    let response = in_flight.await.unwrap().unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "done");
}

#[tokio::test]
async fn test_client_deadline_is_enforced() {
    let store = test_store().await;
    let (tokens, _) = test_tokens();
    let tokens: Arc<dyn TokenManager> = tokens;
    let server = server_builder(
        loopback_config(),
        store.users.clone(),
        store.secrets.clone(),
        tokens,
        TOKEN_LIFETIME,
    )
    .service(Router::new().route(
        "/test.Slow/Sleep",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }),
    ))
    .exempt("/test.Slow/Sleep")
    .start()
    .await
    .unwrap();

    let response = reqwest::Client::new()
        .post(format!("http://{}/test.Slow/Sleep", server.local_addr()))
        .header(vaultkeeper::rpc::protocol::TIMEOUT_HEADER, "50")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::GATEWAY_TIMEOUT);

    server.stop().await.unwrap();
}
