//! Connector behaviour against an in-memory transport.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use sendsay_connector::{
    Connector, ConnectorError, RequestObject, RequestOptions, Transport, TransportError,
    TransportRequest, TransportResponse,
};
use serde_json::{json, Value};
use url::form_urlencoded;

type Responder = dyn Fn(&TransportRequest) -> Result<TransportResponse, TransportError> + Send + Sync;

/// Transport that answers through a closure and records every request.
struct FakeTransport {
    responder: Box<Responder>,
    sent: Mutex<Vec<TransportRequest>>,
}

impl FakeTransport {
    fn new(
        responder: impl Fn(&TransportRequest) -> Result<TransportResponse, TransportError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent(&self) -> Vec<TransportRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        tokio::task::yield_now().await;
        self.sent.lock().unwrap().push(request.clone());
        (self.responder)(&request)
    }
}

fn ok(body: Value) -> Result<TransportResponse, TransportError> {
    Ok(TransportResponse {
        status: 200,
        status_text: "OK".to_string(),
        body: Bytes::from(body.to_string()),
    })
}

fn request_object(value: Value) -> RequestObject {
    value.as_object().cloned().unwrap()
}

fn action_of(request: &TransportRequest) -> String {
    let request_json = form_urlencoded::parse(request.body.as_bytes())
        .find(|(key, _)| key == "request")
        .map(|(_, value)| value.into_owned())
        .unwrap();
    let object: Value = serde_json::from_str(&request_json).unwrap();
    object["action"].as_str().unwrap().to_string()
}

const BASE_URL: &str = "https://api.example.com/general/api/v100/json/acc";

#[tokio::test]
async fn redirect_suffix_is_appended_to_base_url() {
    let transport = FakeTransport::new(|request| {
        if request.url == BASE_URL {
            ok(json!({ "REDIRECT": "/other" }))
        } else {
            ok(json!({ "ok": true }))
        }
    });
    let connector = Connector::with_transport(BASE_URL, transport).unwrap();

    let result = connector
        .execute(&request_object(json!({ "action": "pong" })), RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(result, json!({ "ok": true }));
    let urls: Vec<String> = connector.transport().sent().into_iter().map(|r| r.url).collect();
    assert_eq!(urls, vec![BASE_URL.to_string(), format!("{BASE_URL}/other")]);
}

#[tokio::test]
async fn concurrent_calls_follow_their_own_redirects() {
    let transport = FakeTransport::new(|request| {
        let action = action_of(request);
        if request.url == BASE_URL {
            ok(json!({ "REDIRECT": format!("/{action}") }))
        } else {
            assert_eq!(request.url, format!("{BASE_URL}/{action}"));
            ok(json!({ "served": action }))
        }
    });
    let connector = Arc::new(Connector::with_transport(BASE_URL, transport).unwrap());

    let first = request_object(json!({ "action": "first" }));
    let second = request_object(json!({ "action": "second" }));
    let (a, b) = tokio::join!(
        connector.execute(&first, RequestOptions::default()),
        connector.execute(&second, RequestOptions::default()),
    );

    assert_eq!(a.unwrap(), json!({ "served": "first" }));
    assert_eq!(b.unwrap(), json!({ "served": "second" }));
    assert_eq!(connector.transport().sent().len(), 4);
}

#[tokio::test]
async fn redirects_can_be_disabled() {
    let transport = FakeTransport::new(|_| ok(json!({ "REDIRECT": "/x" })));
    let connector = Connector::builder(BASE_URL)
        .max_redirects(0)
        .build_with_transport(transport)
        .unwrap();

    let result = connector
        .execute(&request_object(json!({ "action": "pong" })), RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(result, json!({ "REDIRECT": "/x" }));
    assert_eq!(connector.transport().sent().len(), 1);
}

#[tokio::test]
async fn unclassified_transport_error_passes_through() {
    let transport = FakeTransport::new(|_| Err(TransportError::other("certificate rejected")));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let connector = Connector::builder(BASE_URL)
        .on_error(move |err| sink.lock().unwrap().push(err.to_string()))
        .build_with_transport(transport)
        .unwrap();

    let err = connector
        .execute(&request_object(json!({ "action": "pong" })), RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Transport(_)));
    assert!(err.kind().is_none());
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["transport failure: certificate rejected".to_string()]
    );
}

#[tokio::test]
async fn unreachable_transport_error_is_normalized() {
    let transport = FakeTransport::new(|_| Err(TransportError::unreachable("connection reset")));
    let connector = Connector::with_transport(BASE_URL, transport).unwrap();

    let err = connector
        .execute(&request_object(json!({ "action": "pong" })), RequestOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind().as_deref(), Some("fetch:failed"));
}

#[tokio::test]
async fn status_text_comes_from_transport() {
    let transport = FakeTransport::new(|_| {
        Ok(TransportResponse {
            status: 418,
            status_text: "I'm a teapot".to_string(),
            body: Bytes::from_static(b"{}"),
        })
    });
    let connector = Connector::with_transport(BASE_URL, transport).unwrap();

    let err = connector
        .execute(&request_object(json!({ "action": "pong" })), RequestOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.kind().as_deref(), Some("I'm a teapot"));
}

#[tokio::test]
async fn request_id_is_fresh_per_call_and_fixed_across_redirects() {
    let transport = FakeTransport::new(|request| {
        if request.url == BASE_URL {
            ok(json!({ "REDIRECT": "/x" }))
        } else {
            ok(json!({}))
        }
    });
    let connector = Connector::builder(BASE_URL)
        .session("bob:token")
        .request_prefix("IT")
        .build_with_transport(transport)
        .unwrap();

    let request = request_object(json!({ "action": "pong" }));
    connector.execute(&request, RequestOptions::default()).await.unwrap();
    connector.execute(&request, RequestOptions::default()).await.unwrap();

    let ids: Vec<String> = connector
        .transport()
        .sent()
        .iter()
        .map(|r| {
            form_urlencoded::parse(r.body.as_bytes())
                .find(|(key, _)| key == "request.id")
                .map(|(_, value)| value.into_owned())
                .unwrap()
        })
        .collect();

    assert_eq!(ids.len(), 4);
    assert!(ids.iter().all(|id| id.starts_with("IT_BOB_")));
    assert_eq!(ids[0], ids[1]);
    assert_eq!(ids[2], ids[3]);
    assert_ne!(ids[0], ids[2]);
}
