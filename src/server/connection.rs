// Connection handling module
// Accepts a TCP stream and serves HTTP/1 requests on it

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::handler;
use crate::logger;

/// Accept a connection, enforcing `max_connections`, and serve it on a
/// spawned task.
///
/// Returns `false` when the connection was rejected.
pub fn accept_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    active: &Arc<AtomicUsize>,
) -> bool {
    // Increment first, then check, so two accepts can't both squeeze in
    let prev = active.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.settings.performance.max_connections {
        if prev >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            active.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev}/{max_conn}. Rejected {peer_addr}"
            ));
            drop(stream);
            return false;
        }
    }

    if state.access_log_enabled() {
        logger::log_debug(&format!("Accepted connection from {peer_addr}"));
    }

    handle_connection(stream, peer_addr, Arc::clone(state), Arc::clone(active));
    true
}

fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    active: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let performance = &state.settings.performance;
        let timeout = Duration::from_secs(performance.read_timeout);

        let mut builder = http1::Builder::new();
        builder.keep_alive(performance.keep_alive);

        let service_state = Arc::clone(&state);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| handler::handle_request(req, Arc::clone(&service_state), peer_addr)),
        );

        match tokio::time::timeout(timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => logger::log_warning(&format!(
                "Connection from {peer_addr} timed out after {} seconds",
                timeout.as_secs()
            )),
        }

        active.fetch_sub(1, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::server::listener::bind_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn state_with(max_connections: Option<u64>) -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "home").unwrap();
        let mut settings = Settings::from_toml_str(&format!(
            "[assets]\ndirectory = {:?}\n",
            dir.path().to_str().unwrap()
        ))
        .unwrap();
        settings.performance.max_connections = max_connections;
        let state = AppState::new(settings, "unused.toml").await.unwrap();
        (dir, Arc::new(state))
    }

    #[tokio::test]
    async fn test_serves_request_and_releases_slot() {
        let (_dir, state) = state_with(None).await;
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let active = Arc::new(AtomicUsize::new(0));

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET / HTTP/1.1\r\nHost: example.com\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        });

        let (stream, peer) = listener.accept().await.unwrap();
        assert!(accept_connection(stream, peer, &state, &active));

        let response = client.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("home"));

        for _ in 0..100 {
            if active.load(Ordering::SeqCst) == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(active.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejects_over_limit() {
        let (_dir, state) = state_with(Some(1)).await;
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let active = Arc::new(AtomicUsize::new(1));

        let client = tokio::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (stream, peer) = listener.accept().await.unwrap();
        let _client = client.await.unwrap();

        assert!(!accept_connection(stream, peer, &state, &active));
        assert_eq!(active.load(Ordering::SeqCst), 1);
    }
}
