//! Helpers for tests that need a live backend on the loopback interface.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use serde_json::Value;

use crate::api::ApiClient;
use crate::config::ClientConfig;

/// Request bodies captured by a test backend, in arrival order.
pub(crate) type Recorded = Arc<Mutex<Vec<Value>>>;

/// Serve `router` on an ephemeral port and return its base URL.
pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("test listener address");

    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    format!("http://{addr}")
}

/// Serve `router` and return a client pointed at it.
pub(crate) async fn api_for(router: Router) -> Arc<ApiClient> {
    let base = serve(router).await;
    Arc::new(ApiClient::new(&ClientConfig::new().with_base_url(base)).expect("test client"))
}

/// A client pointed at a port nothing listens on.
pub(crate) fn unreachable_api() -> Arc<ApiClient> {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("reserve free port");

    let config = ClientConfig::new()
        .with_base_url(format!("http://127.0.0.1:{port}"))
        .with_connect_timeout(Duration::from_secs(1))
        .with_timeout(Duration::from_secs(2));
    Arc::new(ApiClient::new(&config).expect("test client"))
}

/// Fresh, empty request log.
pub(crate) fn recorder() -> Recorded {
    Arc::new(Mutex::new(Vec::new()))
}

/// Snapshot of everything recorded so far.
pub(crate) fn recorded(log: &Recorded) -> Vec<Value> {
    log.lock().expect("recorder lock").clone()
}
