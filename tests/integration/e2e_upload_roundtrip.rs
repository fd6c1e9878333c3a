//! End-to-end: `uploader::upload` submits a payload to a real `broker`,
//! a stand-in "signer" (playing the part of the out-of-scope browser SPA)
//! posts signed bytes back, and the signed bytes land at a stub bundler.
//!
//! Real components spun up on ephemeral ports and driven through `reqwest`,
//! rather than calling handlers directly.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use broker::config::BrokerConfig;
use broker::lifecycle::Broker;
use broker::AppState;
use uploader::upload;

#[derive(Clone, Default)]
struct BundlerState {
    received: Arc<Mutex<Vec<bytes::Bytes>>>,
}

async fn bundler_handler(State(state): State<BundlerState>, body: bytes::Bytes) -> &'static str {
    state.received.lock().await.push(body);
    "accepted"
}

async fn start_stub_bundler() -> (String, BundlerState) {
    let state = BundlerState::default();
    let router = Router::new().route("/", post(bundler_handler)).with_state(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}/"), state)
}

/// Polls the broker's in-process store (available to the test because it
/// holds the same `AppState` handed to `Broker::start`) until the request
/// the uploader just submitted appears, returning its identifier.
async fn wait_for_the_only_pending_request(state: &AppState) -> uuid::Uuid {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let pending: Vec<_> = state.store.list().await.into_iter().filter(|r| !r.is_signed()).collect();
        if let Some(request) = pending.first() {
            return request.id;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("no pending signing request appeared within the deadline");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

#[tokio::test]
async fn upload_round_trips_a_payload_through_signing_and_bundling() {
    let broker_config = BrokerConfig { host: "127.0.0.1".to_owned(), port: 0, ..BrokerConfig::default() };
    let broker_state = AppState::new(broker_config);
    let broker = Broker::start(broker_state.clone()).await.unwrap();
    let broker_url = format!("http://{}", broker.local_addr);

    let (bundler_url, bundler_state) = start_stub_bundler().await;

    let payload = bytes::Bytes::from_static(b"the unsigned bytes");
    let upload_broker_url = broker_url.clone();
    let upload_bundler_url = bundler_url.clone();
    let upload_task = tokio::spawn(async move {
        upload(
            &upload_broker_url,
            &upload_bundler_url,
            payload,
            vec![],
            Some("app-data".to_owned()),
            None,
        )
        .await
    });

    // Act as the browser-based signer: wait for the submission to land,
    // then post the "signed" bytes back.
    let uuid = wait_for_the_only_pending_request(&broker_state).await;
    let client = reqwest::Client::new();
    let sign_response = client
        .post(format!("{broker_url}/{uuid}"))
        .body("the signed bytes")
        .send()
        .await
        .unwrap();
    assert_eq!(sign_response.status(), reqwest::StatusCode::OK);

    let result = tokio::time::timeout(Duration::from_secs(10), upload_task)
        .await
        .expect("upload task did not finish in time")
        .expect("upload task panicked")
        .expect("upload should succeed");

    assert_eq!(result.uuid, uuid);
    assert_eq!(result.bundler_status, 200);

    let received = bundler_state.received.lock().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], bytes::Bytes::from_static(b"the signed bytes"));
    drop(received);

    broker.stop().await.unwrap();
}

#[tokio::test]
async fn upload_falls_back_to_spawning_its_own_broker_when_none_is_reachable() {
    let (bundler_url, bundler_state) = start_stub_bundler().await;

    let payload = bytes::Bytes::from_static(b"owned-broker payload");
    let upload_task = tokio::spawn(async move {
        // Port 1 is never listening on a test host; this forces the
        // "spawn an owned broker" path in `ensure_broker`.
        upload("http://127.0.0.1:1", &bundler_url, payload, vec![], None, None).await
    });

    // The owned broker has no externally-visible address for this test to
    // poll, so instead give the orchestrator time to spawn it, submit, and
    // surface a pending request nowhere -- there is no signer to complete
    // it, so this path is expected to eventually time out waiting to be
    // signed. That still proves the broker was reachable (a `BrokerUnavailable`
    // would return immediately instead).
    let result = tokio::time::timeout(Duration::from_secs(2), upload_task).await;
    assert!(result.is_err(), "upload should still be waiting on signing, not have failed fast");

    assert!(bundler_state.received.lock().await.is_empty());
}
