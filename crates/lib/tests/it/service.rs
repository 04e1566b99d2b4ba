//! Router-level calls with the network left out.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;
use vaultkeeper::{
    model::{Secret, SecretSummary, User},
    rpc::{Code, Status, auth::FixedAuthenticator, protocol::methods, server::RpcServerBuilder},
    service::{KeeperService, keeper_routes},
    storage::{InMemory, SecretRepository, UserRepository},
    token::TokenManager,
};

use crate::helpers::loopback_config;

async fn keeper_router() -> Router {
    let store = Arc::new(InMemory::new());
    let owner = UserRepository::create(store.as_ref(), User::new("a@x.com", "pw"))
        .await
        .unwrap()
        .id;

    RpcServerBuilder::new(loopback_config())
        .service(keeper_routes(Arc::new(KeeperService::new(store))))
        .authenticator(Arc::new(FixedAuthenticator(owner)))
        .into_router()
        .unwrap()
}

fn json_call(method: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(method)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_create_then_read_over_router() {
    let router = keeper_router().await;

    let response = router
        .clone()
        .oneshot(json_call(
            methods::CREATE_SECRET,
            json!({"name": "n1", "type": "raw", "content": "AQI="}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"name": "n1", "type": "raw"}));

    let response = router
        .oneshot(json_call(methods::READ_SECRET, json!({"name": "n1"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"name": "n1", "type": "raw", "content": "AQI="})
    );
}

#[tokio::test]
async fn test_list_accepts_empty_body() {
    let router = keeper_router().await;

    let request = Request::builder()
        .method("POST")
        .uri(methods::LIST_SECRETS)
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"secrets": []}));
}

#[tokio::test]
async fn test_malformed_body_is_invalid_argument() {
    let router = keeper_router().await;

    let request = Request::builder()
        .method("POST")
        .uri(methods::READ_SECRET)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let status: Status = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(status.code(), Code::InvalidArgument);

    let response = router
        .oneshot(json_call(
            methods::CREATE_SECRET,
            json!({"name": "n1", "type": "raw", "content": "%%%"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_secret_status_body() {
    let router = keeper_router().await;

    let response = router
        .oneshot(json_call(methods::DELETE_SECRET, json!({"name": "ghost"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({"code": "not_found", "message": "secret not found"})
    );
}

#[tokio::test]
async fn test_unexempt_method_requires_identity() {
    // Token authentication with no token configured on the request.
    let store = Arc::new(InMemory::new());
    let (tokens, _) = crate::helpers::test_tokens();
    let router = vaultkeeper::app::server_builder(
        loopback_config(),
        store.clone(),
        store,
        tokens,
        crate::helpers::TOKEN_LIFETIME,
    )
    .into_router()
    .unwrap();

    let response = router
        .clone()
        .oneshot(json_call(methods::LIST_SECRETS, json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Register is exempt and reaches its handler.
    let response = router
        .oneshot(json_call(
            methods::REGISTER,
            json!({"email": format!("{}@x.com", Uuid::new_v4()), "password": "pw"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

/// Secret storage that records how often it was reached.
#[derive(Default)]
struct CountingSecrets {
    inner: InMemory,
    calls: AtomicUsize,
}

impl CountingSecrets {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SecretRepository for CountingSecrets {
    async fn create(&self, owner_id: &Uuid, secret: Secret) -> vaultkeeper::Result<Secret> {
        self.hit();
        SecretRepository::create(&self.inner, owner_id, secret).await
    }

    async fn read_by_name(&self, owner_id: &Uuid, name: &str) -> vaultkeeper::Result<Secret> {
        self.hit();
        self.inner.read_by_name(owner_id, name).await
    }

    async fn delete_by_name(&self, owner_id: &Uuid, name: &str) -> vaultkeeper::Result<()> {
        self.hit();
        self.inner.delete_by_name(owner_id, name).await
    }

    async fn list(&self, owner_id: &Uuid) -> vaultkeeper::Result<Vec<SecretSummary>> {
        self.hit();
        self.inner.list(owner_id).await
    }
}

#[tokio::test]
async fn test_rejected_calls_never_reach_storage() {
    let users = Arc::new(InMemory::new());
    let secrets = Arc::new(CountingSecrets::default());
    let (tokens, _) = crate::helpers::test_tokens();
    let router = vaultkeeper::app::server_builder(
        loopback_config(),
        users.clone(),
        secrets.clone(),
        tokens.clone(),
        crate::helpers::TOKEN_LIFETIME,
    )
    .into_router()
    .unwrap();

    let calls = [
        (
            methods::CREATE_SECRET,
            json!({"name": "n1", "type": "raw", "content": "AQI="}),
        ),
        (methods::READ_SECRET, json!({"name": "n1"})),
        (methods::DELETE_SECRET, json!({"name": "n1"})),
        (methods::LIST_SECRETS, json!({})),
    ];
    let unparsable_subject = tokens
        .issue(
            &crate::helpers::Subject("not-a-uuid".to_string()),
            crate::helpers::TOKEN_LIFETIME,
        )
        .unwrap();

    for (method, body) in &calls {
        let headers = [
            None,
            Some("Bearer garbage".to_string()),
            Some(format!("Bearer {unparsable_subject}")),
        ];
        for authorization in headers {
            let mut request = json_call(method, body.clone());
            if let Some(value) = authorization {
                request
                    .headers_mut()
                    .insert(AUTHORIZATION, value.parse().unwrap());
            }
            let response = router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method}");
        }
    }
    assert_eq!(secrets.calls(), 0);

    // A valid token does reach the repository.
    let user = UserRepository::create(users.as_ref(), User::new("a@x.com", "pw"))
        .await
        .unwrap();
    let token = tokens.issue(&user, crate::helpers::TOKEN_LIFETIME).unwrap();
    let mut request = json_call(methods::LIST_SECRETS, json!({}));
    request
        .headers_mut()
        .insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(secrets.calls(), 1);
}
