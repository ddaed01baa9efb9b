// Server module
// Accept loop, connection serving, signal-driven reload and shutdown

pub mod connection;
pub mod listener;
pub mod signal;

pub use listener::bind_listener;
pub use signal::{start_signal_handler, SignalHandler};

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::AppState;
use crate::logger;

/// Run the accept loop until a shutdown notification arrives
///
/// Reloads run on their own task so indexing a large asset directory never
/// stalls accepting. Requests already in flight finish against the snapshot
/// they started with.
pub async fn run(listener: TcpListener, state: Arc<AppState>, signals: Arc<SignalHandler>) {
    let active = Arc::new(AtomicUsize::new(0));
    let reloader = tokio::spawn(reload_on_signal(Arc::clone(&state), Arc::clone(&signals)));

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    connection::accept_connection(stream, peer_addr, &state, &active);
                }
                Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
            },
            () = signals.shutdown.notified() => {
                logger::log_shutdown();
                break;
            }
        }
    }

    reloader.abort();
}

/// Rebuild the snapshot on every reload notification, one reload at a time
async fn reload_on_signal(state: Arc<AppState>, signals: Arc<SignalHandler>) {
    loop {
        signals.reload.notified().await;
        match state.reload().await {
            Ok(snapshot) => logger::log_reload(&snapshot, state.generation().1),
            Err(e) => logger::log_reload_failed(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn get(addr: std::net::SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_reload_then_shutdown() {
        let site = tempfile::tempdir().unwrap();
        std::fs::write(site.path().join("a.html"), "first").unwrap();
        let config_dir = tempfile::tempdir().unwrap();
        let config_path = config_dir.path().join("assetgate.toml");
        let body = format!("[assets]\ndirectory = {:?}\n", site.path().to_str().unwrap());
        std::fs::write(&config_path, &body).unwrap();

        let settings = Settings::from_toml_str(&body).unwrap();
        let state = Arc::new(
            AppState::new(settings, config_path.to_str().unwrap())
                .await
                .unwrap(),
        );
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let signals = SignalHandler::new();
        let server = tokio::spawn(run(listener, Arc::clone(&state), Arc::clone(&signals)));

        assert!(get(addr, "/a").await.ends_with("first"));
        assert!(get(addr, "/b").await.starts_with("HTTP/1.1 404"));

        let initial = state.snapshot().generation;
        std::fs::write(site.path().join("b.html"), "second").unwrap();
        signals.reload.notify_one();
        for _ in 0..100 {
            if state.snapshot().generation > initial {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(get(addr, "/b").await.ends_with("second"));

        signals.shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_accepts_while_reloading() {
        let site = tempfile::tempdir().unwrap();
        std::fs::write(site.path().join("index.html"), "home").unwrap();
        for i in 0..500 {
            std::fs::write(site.path().join(format!("page{i}.html")), format!("page {i}")).unwrap();
        }
        let config_dir = tempfile::tempdir().unwrap();
        let config_path = config_dir.path().join("assetgate.toml");
        let body = format!("[assets]\ndirectory = {:?}\n", site.path().to_str().unwrap());
        std::fs::write(&config_path, &body).unwrap();

        let settings = Settings::from_toml_str(&body).unwrap();
        let state = Arc::new(
            AppState::new(settings, config_path.to_str().unwrap())
                .await
                .unwrap(),
        );
        let listener = bind_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let signals = SignalHandler::new();
        let server = tokio::spawn(run(listener, Arc::clone(&state), Arc::clone(&signals)));

        // Served from whichever snapshot is active while the index is rebuilt
        signals.reload.notify_one();
        let response = tokio::time::timeout(Duration::from_secs(5), get(addr, "/page7"))
            .await
            .unwrap();
        assert!(response.ends_with("page 7"));

        for _ in 0..200 {
            if state.snapshot().generation > 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state.snapshot().generation, 2);

        signals.shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }
}
