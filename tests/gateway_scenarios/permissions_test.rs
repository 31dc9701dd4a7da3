//! Permission resolution scenarios.

use serde_json::json;

use ils_gateway::permissions::DEFAULT_PERM_METHOD;
use ils_gateway::TransportError;

use crate::common::{mock_gateway, AUTH_TOKEN};

#[tokio::test]
async fn test_event_on_first_signature_falls_through() {
    let (gateway, transport) = mock_gateway();
    transport
        .push_response(
            DEFAULT_PERM_METHOD,
            vec![json!({"ilsevent": 1234, "textcode": "PERM_FAILURE"})],
        )
        .await;
    transport
        .push_response(DEFAULT_PERM_METHOD, vec![json!([true, false])])
        .await;

    let grants = gateway
        .resolve_permissions(AUTH_TOKEN, Some(4), &["A", "B"])
        .await
        .unwrap();

    assert_eq!(serde_json::to_value(&grants).unwrap(), json!({"A": true, "B": false}));

    let calls = transport.calls_to(DEFAULT_PERM_METHOD).await;
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].params, vec![json!(AUTH_TOKEN), json!(["A", "B"])]);
    assert_eq!(calls[1].params, vec![json!(AUTH_TOKEN), json!(4), json!(["A", "B"])]);
}

#[tokio::test]
async fn test_empty_answer_denies_everything() {
    let (gateway, transport) = mock_gateway();
    transport.set_default(DEFAULT_PERM_METHOD, vec![json!([])]).await;

    let grants = gateway
        .resolve_permissions(AUTH_TOKEN, None, &["A", "B"])
        .await
        .unwrap();

    assert!(grants.is_empty());
    assert!(!grants.is_granted("A"));
    assert!(!grants.any_granted(&["A", "B"]));
}

#[tokio::test]
async fn test_unreachable_bus_aborts_resolution() {
    let (gateway, transport) = mock_gateway();
    transport
        .push_error(DEFAULT_PERM_METHOD, TransportError::Timeout)
        .await;

    let err = gateway
        .resolve_permissions(AUTH_TOKEN, Some(4), &["A"])
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert_eq!(transport.call_count().await, 1);
}

#[tokio::test]
async fn test_bus_exception_moves_to_next_signature() {
    let (gateway, transport) = mock_gateway();
    transport
        .push_error(
            DEFAULT_PERM_METHOD,
            TransportError::Status {
                status: 500,
                debug: "Exception: bad args".to_string(),
            },
        )
        .await;
    transport
        .push_response(DEFAULT_PERM_METHOD, vec![json!([true, false])])
        .await;

    let grants = gateway
        .resolve_permissions(AUTH_TOKEN, Some(4), &["A", "B"])
        .await
        .unwrap();

    assert_eq!(serde_json::to_value(&grants).unwrap(), json!({"A": true, "B": false}));
    assert_eq!(transport.call_count().await, 2);
}

#[tokio::test]
async fn test_object_answers() {
    let (gateway, transport) = mock_gateway();
    transport
        .push_response(
            DEFAULT_PERM_METHOD,
            vec![json!([
                {"perm": "UPDATE_COPY", "value": "t"},
                {"perm": "DELETE_COPY", "value": "f"},
                {"perm": "CREATE_COPY", "value": 1}
            ])],
        )
        .await;
    transport
        .push_response(DEFAULT_PERM_METHOD, vec![json!({"STAFF_LOGIN": [1, 4]})])
        .await;

    let grants = gateway
        .resolve_permissions(AUTH_TOKEN, None, &["UPDATE_COPY", "DELETE_COPY"])
        .await
        .unwrap();
    assert!(grants.is_granted("UPDATE_COPY"));
    assert_eq!(grants.get("DELETE_COPY"), Some(false));
    assert_eq!(grants.get("CREATE_COPY"), None);

    let grants = gateway
        .resolve_permissions(AUTH_TOKEN, None, &["STAFF_LOGIN"])
        .await
        .unwrap();
    assert!(grants.all_granted(&["STAFF_LOGIN"]));
}
