//! Test fixtures: configuration, audio frames and an in-process gateway.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use voxcall_gateway::{AppState, ServerConfig, routes};

pub const VONAGE_TEST_KEY: &str = include_str!("vonage_test_key.pem");

/// 20 ms of µ-law silence at 8 kHz.
pub fn mulaw_silence_frame() -> Vec<u8> {
    vec![0xFF; 160]
}

/// 20 ms of 16-bit PCM silence at 8 kHz.
pub fn pcm_silence_frame() -> Vec<u8> {
    vec![0; 320]
}

/// Configuration with no provider credentials and a short debounce.
pub fn base_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.server_url = Some("voice.example.com".to_string());
    config.debounce_ms = 100;
    config
}

/// The gateway's full router bound to `state`.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::api::create_api_router())
        .merge(routes::stream::create_stream_router())
        .with_state(state)
}

/// Serve the gateway on an ephemeral local port.
pub async fn spawn_gateway(state: Arc<AppState>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = app(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
