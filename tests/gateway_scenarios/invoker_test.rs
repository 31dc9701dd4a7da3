//! Invocation scenarios: auth placement, event gating, transport failures.

use std::time::Duration;

use futures::future::join_all;
use serde_json::{json, Value};

use ils_gateway::{AuthParam, TransportError};

use crate::common::{mock_gateway, AUTH_TOKEN};

const SEARCH: &str = "open-ils.search";
const COPY_RETRIEVE: &str = "open-ils.search.asset.copy.retrieve";

#[tokio::test]
async fn test_omitted_and_null_auth_are_different_calls() {
    let (gateway, transport) = mock_gateway();
    transport.set_default(COPY_RETRIEVE, vec![Value::Null]).await;

    gateway
        .invoke(&AuthParam::Omit, SEARCH, COPY_RETRIEVE, vec![json!(7)])
        .await
        .unwrap();
    gateway
        .invoke(&AuthParam::Null, SEARCH, COPY_RETRIEVE, vec![json!(7)])
        .await
        .unwrap();
    gateway
        .invoke(&AuthParam::token(AUTH_TOKEN), SEARCH, COPY_RETRIEVE, vec![json!(7)])
        .await
        .unwrap();

    let calls = transport.calls_to(COPY_RETRIEVE).await;
    assert_eq!(calls[0].params, vec![json!(7)]);
    assert_eq!(calls[1].params, vec![Value::Null, json!(7)]);
    assert_eq!(calls[2].params, vec![json!(AUTH_TOKEN), json!(7)]);
}

#[tokio::test]
async fn test_event_payload_surfaces_as_remote_event() {
    let (gateway, transport) = mock_gateway();
    transport
        .push_response(
            COPY_RETRIEVE,
            vec![json!({
                "ilsevent": 1001,
                "textcode": "NO_SESSION",
                "desc": "User login session has either timed out or does not exist"
            })],
        )
        .await;

    let response = gateway
        .invoke(&AuthParam::token(AUTH_TOKEN), SEARCH, COPY_RETRIEVE, vec![json!(7)])
        .await
        .expect("events are payload, not transport failures");

    let err = response.into_record(gateway.codec(), "acp").unwrap_err();
    assert!(!err.is_transport());
    assert!(!err.is_retryable());
    assert_eq!(err.event().map(|e| e.code), Some(1001));
}

#[tokio::test]
async fn test_transport_failure_is_retryable_and_distinct() {
    let (gateway, transport) = mock_gateway();
    transport
        .push_error(COPY_RETRIEVE, TransportError::Connection("connection reset".to_string()))
        .await;

    let err = gateway
        .fetch_record(&AuthParam::token(AUTH_TOKEN), SEARCH, COPY_RETRIEVE, vec![json!(7)], "acp")
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert!(err.is_retryable());
    assert!(err.event().is_none());
}

#[tokio::test]
async fn test_caller_cancellation_is_transport_error() {
    let (gateway, transport) = mock_gateway();
    transport.set_default(COPY_RETRIEVE, vec![Value::Null]).await;
    transport.set_latency(Duration::from_secs(60)).await;

    let err = gateway
        .invoker()
        .invoke_cancellable(
            tokio::time::sleep(Duration::from_millis(20)),
            &AuthParam::Omit,
            SEARCH,
            COPY_RETRIEVE,
            vec![],
        )
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::Cancelled);
}

#[tokio::test]
async fn test_fan_out_enrichment() {
    let (gateway, transport) = mock_gateway();
    for id in 1..=8 {
        transport
            .push_response(
                COPY_RETRIEVE,
                vec![json!({"__c": "acp", "id": id, "barcode": format!("3900000000000{id}")})],
            )
            .await;
    }

    let auth = AuthParam::token(AUTH_TOKEN);
    let lookups = (1..=8).map(|id| {
        gateway.fetch_record(
            &auth,
            SEARCH,
            COPY_RETRIEVE,
            vec![json!(id)],
            "acp",
        )
    });
    let records = join_all(lookups).await;

    assert_eq!(records.len(), 8);
    for record in records {
        let record = record.unwrap().unwrap();
        assert!(record.id().is_some());
        assert!(record.string("barcode").is_some());
    }
    assert_eq!(transport.call_count().await, 8);
}
