use std::sync::Arc;

use assetgate::config::{AppState, Settings, DEFAULT_CONFIG_PATH};
use assetgate::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let settings = Settings::load_from(&config_path)?;
    logger::init(&settings)?;

    // Thread count follows the workers setting, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = settings.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(settings, config_path))
}

async fn async_main(
    settings: Settings,
    config_path: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let addr = settings.get_socket_addr()?;
    let listener = server::bind_listener(addr)?;
    let state = Arc::new(AppState::new(settings, &config_path).await?);

    logger::log_server_start(&addr, &state.settings, &state.snapshot());

    let signals = server::SignalHandler::new();
    server::start_signal_handler(Arc::clone(&signals));
    server::run(listener, state, signals).await;
    Ok(())
}
