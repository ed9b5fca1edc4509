//! Status polling against the HTTP provider and the background monitor

use practice_context::cache::CacheService;
use practice_context::error::StatusError;
use practice_context::status::{
    ConnectionState, ConnectionStatus, ConnectionStatusProvider, HttpStatusProvider,
    PollerConfig, ScriptedStatusProvider, StatusPoller,
};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

/// Serve canned HTTP responses on a local port; returns the base URL.
fn spawn_stub(respond: fn(&str, &str) -> (u16, String)) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }
            let request = String::from_utf8_lossy(&buf);
            let mut parts = request.lines().next().unwrap_or("").split_whitespace();
            let method = parts.next().unwrap_or("").to_string();
            let path = parts.next().unwrap_or("").to_string();
            let (code, body) = respond(&method, &path);
            let response = format!(
                "HTTP/1.1 {} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                code,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{}", addr)
}

fn session_service(method: &str, path: &str) -> (u16, String) {
    match (method, path) {
        ("GET", "/sessions/s1/status") => (
            200,
            r#"{"status": "open", "jid": "5511999@s.net", "name": "Clinic"}"#.to_string(),
        ),
        ("GET", "/sessions/s2/status") => (200, r#"{"status": "sleeping"}"#.to_string()),
        ("POST", "/sessions/s1/pairing") => (200, r#"{"qr": "qr-data"}"#.to_string()),
        ("DELETE", "/sessions/s1") => (500, "session service down".to_string()),
        _ => (404, "not found".to_string()),
    }
}

fn http_poller() -> StatusPoller {
    let base = spawn_stub(session_service);
    let provider = HttpStatusProvider::new(base, Duration::from_secs(5)).unwrap();
    StatusPoller::new(CacheService::new(), Arc::new(provider), PollerConfig::default())
}

#[tokio::test]
async fn test_http_status_is_mapped_and_cached() {
    let poller = http_poller();

    let status = poller.check("s1", false).await.unwrap();
    assert!(status.is_connected());
    assert_eq!(status.peer_identifier.as_deref(), Some("5511999@s.net"));
    assert_eq!(status.display_name.as_deref(), Some("Clinic"));
    assert_eq!(poller.latest("s1"), Some(status));
}

#[tokio::test]
async fn test_http_unknown_state_degrades_to_error() {
    let poller = http_poller();
    let status = poller.check("s2", false).await.unwrap();
    assert_eq!(status.state, ConnectionState::Error);
    assert!(status.detail.unwrap().contains("sleeping"));

    let missing = poller.check("s3", false).await.unwrap();
    assert_eq!(missing.state, ConnectionState::Error);
}

#[tokio::test]
async fn test_http_pairing_and_failed_disconnect() {
    let poller = http_poller();

    assert_eq!(poller.request_pairing("s1").await.unwrap(), "qr-data");
    assert_eq!(
        poller.latest("s1"),
        Some(ConnectionStatus::awaiting_pairing("qr-data"))
    );

    // Local state is reset even though the service failed
    assert!(matches!(
        poller.disconnect("s1").await,
        Err(StatusError::Upstream(_))
    ));
    assert_eq!(poller.latest("s1"), Some(ConnectionStatus::disconnected()));
}

#[tokio::test(start_paused = true)]
async fn test_monitor_restarts_wait_after_pairing() {
    let provider = Arc::new(ScriptedStatusProvider::new());
    provider.set_state("s1", "close");
    let poller = Arc::new(StatusPoller::new(
        CacheService::new(),
        Arc::clone(&provider) as Arc<dyn ConnectionStatusProvider>,
        PollerConfig::default(),
    ));

    let monitor = poller.spawn_monitor("s1");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(provider.fetch_count(), 1);
    assert_eq!(
        poller.latest("s1").map(|s| s.state),
        Some(ConnectionState::Disconnected)
    );

    // Awaiting pairing is re-checked after 8s rather than the 60s of disconnected
    poller.request_pairing("s1").await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(provider.fetch_count(), 1);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(provider.fetch_count(), 2);
    assert_eq!(
        poller.latest("s1").map(|s| s.state),
        Some(ConnectionState::Disconnected)
    );

    monitor.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cache_stops_monitor() {
    let provider = Arc::new(ScriptedStatusProvider::new());
    provider.set_state("s1", "open");
    let cache = CacheService::new();
    let poller = Arc::new(StatusPoller::new(
        cache.clone(),
        Arc::clone(&provider) as Arc<dyn ConnectionStatusProvider>,
        PollerConfig::default(),
    ));

    let monitor = poller.spawn_monitor("s1");
    tokio::time::sleep(Duration::from_secs(1)).await;
    cache.shutdown();

    tokio::time::sleep(Duration::from_secs(301)).await;
    assert!(!monitor.is_running());
    assert_eq!(provider.fetch_count(), 1);
}
