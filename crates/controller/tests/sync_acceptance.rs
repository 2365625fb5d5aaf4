use std::{sync::Arc, time::Duration};

use controller::{
    spawn_controller,
    ws::{build_router, AppState},
    ControllerHandle,
};
use display_core::{BusTransport, DisplayClient, DisplayEvent, DisplayTransport, WsTransport};
use shared::{
    bus::BroadcastBus,
    domain::{DirType, Line, LineMode, Phase, RuntimeState},
    protocol::UiCommand,
};
use tokio::{net::TcpListener, time::timeout};

const WAIT: Duration = Duration::from_secs(5);

fn line() -> Line {
    Line::new("L1", LineMode::Linear, DirType::Up).with_stations(["S1", "S2", "S3"])
}

async fn start_server() -> (String, ControllerHandle) {
    let bus = BroadcastBus::new(64);
    let (handle, _task) = spawn_controller(line(), None, Arc::new(bus.clone())).expect("spawn");

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = build_router(Arc::new(AppState { bus }));
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    (format!("ws://{addr}/ws"), handle)
}

async fn state_change<T: DisplayTransport>(client: &mut DisplayClient<T>) -> RuntimeState {
    let event = timeout(WAIT, client.next_event())
        .await
        .expect("event in time")
        .expect("channel open");
    assert_eq!(event, DisplayEvent::StateChanged);
    client.view().runtime()
}

#[tokio::test]
async fn websocket_display_follows_controller_and_drives_it_with_keys() {
    let (url, handle) = start_server().await;

    let mut first = DisplayClient::new(WsTransport::connect(&url).await.expect("connect"));
    first.attach().await.expect("attach");
    assert_eq!(state_change(&mut first).await, RuntimeState::arrived_at(0));
    assert_eq!(
        first.view().current_station().map(|s| s.name.as_str()),
        Some("S1")
    );

    first.send_key("Space").await.expect("key");
    assert_eq!(
        state_change(&mut first).await,
        RuntimeState {
            idx: 0,
            state: Phase::Departed
        }
    );

    // A display joining mid-run sees the current state, not the initial one.
    let mut late = DisplayClient::new(WsTransport::connect(&url).await.expect("connect"));
    late.attach().await.expect("attach");
    assert_eq!(
        state_change(&mut late).await,
        RuntimeState {
            idx: 0,
            state: Phase::Departed
        }
    );

    handle.next().expect("next");
    assert_eq!(state_change(&mut first).await, RuntimeState::arrived_at(1));
    assert_eq!(state_change(&mut late).await, RuntimeState::arrived_at(1));
}

#[tokio::test]
async fn in_process_display_shares_the_bus() {
    let bus = BroadcastBus::new(64);
    let (handle, _task) = spawn_controller(line(), None, Arc::new(bus.clone())).expect("spawn");

    let mut display = DisplayClient::new(BusTransport::attach(Arc::new(bus.clone())));
    let mut other = DisplayClient::new(BusTransport::attach(Arc::new(bus.clone())));
    display.attach().await.expect("attach");
    assert_eq!(state_change(&mut display).await, RuntimeState::arrived_at(0));
    assert_eq!(state_change(&mut other).await, RuntimeState::arrived_at(0));

    // Window commands from one display are not orders for another.
    display
        .send_ui_command(UiCommand::Close)
        .await
        .expect("ui command");
    display.send_key("ArrowRight").await.expect("key");
    assert_eq!(state_change(&mut other).await, RuntimeState::arrived_at(1));
    assert_eq!(state_change(&mut display).await, RuntimeState::arrived_at(1));

    assert_eq!(
        handle.snapshot().await.expect("snapshot").r,
        RuntimeState::arrived_at(1)
    );
}
