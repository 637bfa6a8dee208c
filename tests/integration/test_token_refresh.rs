// CSRF token lifecycle across requests

use crate::common::*;
use adt_client::core::errors::ErrorKind;
use adt_client::core::models::{Method, RequestSpec};
use adt_client::session::TokenState;

#[tokio::test]
async fn test_token_is_fetched_once_and_reused() {
    let (client, backend) = create_test_client();
    assert_eq!(client.session().csrf().state().await, TokenState::Unset);

    client.post("/activation", "<adtcore:objectReferences/>").await.unwrap_err();
    client.post("/activation", "<adtcore:objectReferences/>").await.unwrap_err();

    assert_eq!(backend.tokens_issued(), 1);
    assert_eq!(client.session().csrf().state().await, TokenState::Valid);

    let seen = backend.requests();
    assert_eq!(seen[0].method, Method::Get);
    assert_eq!(seen[0].url.path(), "/sap/bc/adt/discovery");
    assert_eq!(seen[0].header("x-csrf-token"), Some("Fetch"));
    assert_eq!(seen[1].header("x-csrf-token"), Some("tok-1"));
    assert_eq!(seen[2].header("x-csrf-token"), Some("tok-1"));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_transparently() {
    let (client, backend) = create_test_client();
    client.csrf_token().await.unwrap();
    backend.expire_token_once();

    let value = client
        .with_lock(Z_REPORT, |locked| async move { Ok(locked.handle().to_string()) })
        .await
        .unwrap();

    assert_eq!(value, "LH0001");
    assert_eq!(backend.tokens_issued(), 2);
    assert_eq!(client.session().csrf().state().await, TokenState::Valid);

    let locks: Vec<_> = backend
        .requests()
        .into_iter()
        .filter(|r| r.query_param("_action").as_deref() == Some("LOCK"))
        .collect();
    assert_eq!(locks.len(), 2);
    assert_eq!(locks[0].header("x-csrf-token"), Some("tok-1"));
    assert_eq!(locks[1].header("x-csrf-token"), Some("tok-2"));
    // A resend keeps the connection id of the edit it belongs to
    assert_eq!(
        locks[0].header("sap-adt-connection-id"),
        locks[1].header("sap-adt-connection-id")
    );
}

#[tokio::test]
async fn test_session_cookies_follow_every_request() {
    let (client, backend) = create_test_client();
    client.csrf_token().await.unwrap();
    client.get("/discovery").await.unwrap();

    let cookies = client.session().cookies();
    assert_eq!(cookies.len(), 2);
    assert_eq!(cookies.get("SAP_SESSIONID_DEV_100"), Some("s1"));

    let seen = backend.requests();
    assert!(seen[0].header("cookie").is_none());
    assert_eq!(
        seen[1].header("cookie"),
        Some("SAP_SESSIONID_DEV_100=s1; sap-usercontext=sap-client=100")
    );
}

#[tokio::test]
async fn test_reads_do_not_fetch_tokens() {
    let (client, backend) = create_test_client();

    let tree = client.discover().await.unwrap();
    assert_eq!(tree.local_name(), "service");
    assert_eq!(backend.tokens_issued(), 0);

    client
        .request(&RequestSpec::get("/discovery").require_csrf())
        .await
        .unwrap();
    assert_eq!(backend.tokens_issued(), 1);
}

#[tokio::test]
async fn test_idempotent_reads_survive_dropped_connections() {
    let (client, backend) = create_test_client();
    backend.drop_connections(2);

    let response = client.get("/discovery").await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(backend.requests().len(), 3);
}

#[tokio::test]
async fn test_writes_are_not_resent_after_dropped_connection() {
    let (client, backend) = create_test_client();
    client.csrf_token().await.unwrap();
    backend.clear_requests();
    backend.drop_connections(1);

    let err = client.post("/activation", "<x/>").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn test_reads_give_up_after_retry_bound() {
    let (client, backend) = create_test_client();
    backend.drop_connections(5);

    let err = client.get("/discovery").await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(backend.requests().len(), 3);
}
