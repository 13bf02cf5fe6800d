use plant_dashboard::ApiClient;
use plant_stub_api::{create_router, StubState};
use std::time::Duration;
use tokio::net::TcpListener;

/// Serves `state` on an ephemeral local port and returns a client pointed at it
pub async fn spawn_stub(state: StubState) -> ApiClient {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    ApiClient::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
}
