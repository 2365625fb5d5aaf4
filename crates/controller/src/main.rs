use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use controller::{
    config::{load_display_settings, load_line, load_settings},
    spawn_controller,
    ws::{build_router, AppState},
};
use shared::bus::BroadcastBus;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let line_file = settings
        .line_file
        .as_deref()
        .context("no line definition configured; set line_file in controller.toml or PIDS_LINE_FILE")?;
    let line = load_line(line_file)?;
    let display_settings = settings
        .display_settings_file
        .as_deref()
        .map(load_display_settings)
        .transpose()?;

    let bus = BroadcastBus::new(settings.channel_capacity);
    let (handle, controller_task) =
        spawn_controller(line, display_settings, Arc::new(bus.clone()))?;
    if let Some(ms) = settings.autoplay_interval_ms {
        handle.start_autoplay(Duration::from_millis(ms))?;
    }

    let app = build_router(Arc::new(AppState { bus }));
    let addr: SocketAddr = settings.bind_addr.parse()?;
    info!(%addr, "controller listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    handle.shutdown()?;
    controller_task.await?;
    Ok(())
}
