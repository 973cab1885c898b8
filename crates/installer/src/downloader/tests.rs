//! Unit tests for the archive fetcher

use super::*;
use crate::config::InstallerConfig;
use crate::error::{ErrorKind, InstallError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

/// Helper struct to capture progress reports during testing
#[derive(Debug, Default)]
struct ProgressCapture {
    events: Arc<Mutex<Vec<DownloadProgress>>>,
}

impl ProgressCapture {
    fn new() -> Self {
        Self::default()
    }

    fn get_callback(&self) -> ProgressCallback {
        let events = self.events.clone();
        Arc::new(move |event| {
            events.lock().unwrap().push(event);
        })
    }

    fn get_events(&self) -> Vec<DownloadProgress> {
        self.events.lock().unwrap().clone()
    }
}

async fn setup_mock_server_with_content(route: &str, content: &[u8]) -> (MockServer, String) {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .mount(&mock_server)
        .await;

    let url = format!("{}{}", mock_server.uri(), route);
    (mock_server, url)
}

fn client_with_interval(interval: Duration) -> HttpClient {
    let config = InstallerConfig::default().with_progress_interval(interval);
    HttpClient::from_config(&config).unwrap()
}

#[tokio::test]
async fn test_download_writes_file_and_reports_completion() {
    let content = b"Hello, modpack!".repeat(100);
    let (_server, url) = setup_mock_server_with_content("/pack.zip", &content).await;
    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("nested").join("pack.zip");

    let client = client_with_interval(Duration::from_millis(100));
    let progress = ProgressCapture::new();
    let size = client
        .download_to_file(&url, &dest, Some(progress.get_callback()))
        .await
        .unwrap();

    assert_eq!(size, content.len() as u64);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), content);
    assert!(!partial_path(&dest).exists());

    let events = progress.get_events();
    let last = events.last().expect("final progress report");
    assert_eq!(last.downloaded, content.len() as u64);
    assert_eq!(last.total, content.len() as u64);
    assert_eq!(last.eta_secs, Some(0.0));
}

#[tokio::test]
async fn test_download_progress_is_monotonic() {
    // Many 8 KiB blocks, no throttling so every block reports
    let content = vec![7u8; BLOCK_SIZE * 20 + 123];
    let (_server, url) = setup_mock_server_with_content("/big.zip", &content).await;
    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("big.zip");

    let client = client_with_interval(Duration::ZERO);
    let progress = ProgressCapture::new();
    client
        .download_to_file(&url, &dest, Some(progress.get_callback()))
        .await
        .unwrap();

    let events = progress.get_events();
    assert!(events.len() > 1);
    for pair in events.windows(2) {
        assert!(pair[0].downloaded <= pair[1].downloaded);
    }
    let total = content.len() as u64;
    assert!(events.iter().all(|e| e.total == total));
    assert_eq!(events.last().unwrap().downloaded, total);
}

#[tokio::test]
async fn test_download_throttles_reports() {
    let content = vec![1u8; BLOCK_SIZE * 64];
    let (_server, url) = setup_mock_server_with_content("/throttled.zip", &content).await;
    let temp_dir = tempdir().unwrap();

    let client = client_with_interval(Duration::from_secs(60));
    let progress = ProgressCapture::new();
    client
        .download_to_file(&url, &temp_dir.path().join("t.zip"), Some(progress.get_callback()))
        .await
        .unwrap();

    // Nothing is due within a minute, only the guaranteed final report
    let events = progress.get_events();
    assert_eq!(events.len(), 1);
    assert!(events[0].is_complete());
}

#[tokio::test]
async fn test_download_http_error_leaves_nothing_behind() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.zip"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("missing.zip");
    let url = format!("{}/missing.zip", mock_server.uri());

    let client = client_with_interval(Duration::from_millis(100));
    let progress = ProgressCapture::new();
    let result = client.download_to_file(&url, &dest, Some(progress.get_callback())).await;

    match result.unwrap_err() {
        InstallError::HttpStatus { status, url: failed } => {
            assert_eq!(status, 404);
            assert_eq!(failed, url);
        }
        other => panic!("Expected HttpStatus error, got {:?}", other),
    }
    assert!(!dest.exists());
    assert!(!partial_path(&dest).exists());
    assert!(progress.get_events().is_empty());
}

#[tokio::test]
async fn test_get_bytes_returns_body() {
    let (_server, url) = setup_mock_server_with_content("/catalog.json", b"{\"a\":{}}").await;
    let client = client_with_interval(Duration::from_millis(100));

    let body = client.get_bytes(&url, Duration::from_secs(5)).await.unwrap();
    assert_eq!(body, b"{\"a\":{}}");
}

#[tokio::test]
async fn test_invalid_url_is_reported_with_text() {
    let client = client_with_interval(Duration::from_millis(100));
    let err = client
        .get_bytes("not a url", Duration::from_secs(1))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Download);
    match err {
        InstallError::InvalidUrl { url, .. } => assert_eq!(url, "not a url"),
        other => panic!("Expected InvalidUrl error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_refused_is_download_failure() {
    // Bind then drop a listener so the port is very likely closed
    let uri = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        format!("http://{}", listener.local_addr().unwrap())
    };
    let client = client_with_interval(Duration::from_millis(100));
    let temp_dir = tempdir().unwrap();

    let err = client
        .download_to_file(&format!("{}/gone.zip", uri), &temp_dir.path().join("gone.zip"), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Download);
}

/// Serve one response whose body trickles out a byte at a time, then optionally stalls
async fn spawn_trickle_server(body_len: usize, sent: usize, gap: Duration) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await;
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body_len
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        for _ in 0..sent {
            tokio::time::sleep(gap).await;
            if socket.write_all(b"x").await.is_err() {
                return;
            }
            let _ = socket.flush().await;
        }
        // Hold the connection open without sending anything more
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    format!("http://{}/pack.zip", addr)
}

#[tokio::test]
async fn test_slow_steady_download_outlives_archive_timeout() {
    // 30 bytes at 100 ms each is three times the idle timeout overall
    let url = spawn_trickle_server(30, 30, Duration::from_millis(100)).await;
    let config = InstallerConfig::default()
        .with_progress_interval(Duration::ZERO)
        .with_archive_timeout(Duration::from_secs(1));
    let client = HttpClient::from_config(&config).unwrap();
    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("pack.zip");

    let size = client.download_to_file(&url, &dest, None).await.unwrap();

    assert_eq!(size, 30);
    assert_eq!(tokio::fs::read(&dest).await.unwrap(), vec![b'x'; 30]);
}

#[tokio::test]
async fn test_stalled_download_times_out_and_cleans_up() {
    let url = spawn_trickle_server(30, 5, Duration::from_millis(10)).await;
    let config = InstallerConfig::default().with_archive_timeout(Duration::from_millis(500));
    let client = HttpClient::from_config(&config).unwrap();
    let temp_dir = tempdir().unwrap();
    let dest = temp_dir.path().join("pack.zip");

    let err = client.download_to_file(&url, &dest, None).await.unwrap_err();

    match err {
        InstallError::NetworkTimeout { url: failed, .. } => assert_eq!(failed, url),
        other => panic!("Expected NetworkTimeout error, got {:?}", other),
    }
    assert!(!dest.exists());
    assert!(!partial_path(&dest).exists());
}

#[test]
fn test_partial_path_appends_suffix() {
    let p = partial_path(std::path::Path::new("/mc/temp_loader.zip"));
    assert_eq!(p, std::path::PathBuf::from("/mc/temp_loader.zip.part"));
}

#[test]
fn test_missing_ca_bundle_falls_back_to_platform_store() {
    let config = InstallerConfig::default().with_ca_bundle("/definitely/not/here.pem");
    assert!(HttpClient::from_config(&config).is_ok());
}
