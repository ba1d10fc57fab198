//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use roundrobin_proxy::config::ProxyConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub const PAYLOAD: &str = r#"{"game":"Mobile Legends","gamerID":"GYUTDTE","points":20}"#;

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Loopback fleet config: front door on `front`, one backend per `backends`.
pub fn fleet_config(front: u16, backends: &[u16]) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.server.port = front.to_string();
    config.server.bind_address = "127.0.0.1".into();
    config.server.timeout = 1;
    config.backend.host = "127.0.0.1".into();
    config.backend.routes = backends.iter().map(u16::to_string).collect();
    config.health_check_interval_secs = 1;
    config.graceful_timeout_secs = 5;
    for endpoint in config.backend.endpoints.values_mut() {
        endpoint.timeout = 1;
    }
    config
}

/// Poll `http://127.0.0.1:{port}{path}` until it answers 200.
pub async fn wait_for_health(port: u16, path: &str) {
    let client = reqwest::Client::new();
    let url = format!("http://127.0.0.1:{port}{path}");
    for _ in 0..100 {
        if let Ok(res) = client.get(&url).send().await {
            if res.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("{url} never became healthy");
}

/// Start a raw TCP backend that reads one request and writes `response` verbatim.
pub async fn start_raw_backend(response: &'static [u8]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        let _ = socket.read(&mut buf).await;
                        let _ = socket.write_all(response).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}
