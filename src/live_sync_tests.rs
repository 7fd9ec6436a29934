//! End-to-end stream scenarios against a loopback websocket server.

use crate::config::LiveConfig;
use crate::connection::ConnectionManager;
use crate::fleet_dataset::{ConnectionState, StreamFrame, VehiclePosition};
use crate::position_store::PositionStore;
use crate::shutdown::ShutdownSignal;
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tungstenite::accept;
use tungstenite::Message;

fn position(vehicle_id: &str, latitude: f64, longitude: f64) -> VehiclePosition {
    VehiclePosition {
        vehicle_id: vehicle_id.to_string(),
        latitude,
        longitude,
        heading: Some(90.0),
        speed: Some(11.0),
        timestamp: "2025-06-01T17:00:00Z".to_string(),
        status: "in_service".to_string(),
        route_id: Some("R7".to_string()),
        current_stop: None,
        moving: true,
        fuel_level: None,
        battery_level: None,
    }
}

fn frame_text(frame: &StreamFrame) -> String {
    serde_json::to_string(frame).unwrap()
}

fn test_config(addr: std::net::SocketAddr, keepalive_ms: u64, base_ms: u64) -> LiveConfig {
    LiveConfig {
        stream_url: format!("ws://{}/ws", addr),
        keepalive_interval: Duration::from_millis(keepalive_ms),
        reconnect_base_delay: Duration::from_millis(base_ms),
        reconnect_max_delay: Duration::from_millis(base_ms * 4),
        ..LiveConfig::default()
    }
}

async fn eventually<F, Fut>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn snapshot_update_keepalive_and_teardown() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let pings = Arc::new(AtomicUsize::new(0));
    let pings_server = pings.clone();

    std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut websocket = accept(stream).unwrap();
        websocket
            .send(Message::text(frame_text(&StreamFrame::Snapshot(vec![
                position("T1", 34.05, -118.24),
                position("T2", 34.10, -118.30),
            ]))))
            .unwrap();
        websocket
            .send(Message::text(frame_text(&StreamFrame::Update(position(
                "T1", 34.06, -118.25,
            )))))
            .unwrap();
        loop {
            match websocket.read() {
                Ok(message) if message.is_text() => {
                    let text = message.to_text().unwrap().to_string();
                    if matches!(
                        serde_json::from_str::<StreamFrame>(&text),
                        Ok(StreamFrame::Ping)
                    ) {
                        pings_server.fetch_add(1, Ordering::SeqCst);
                        let _ = websocket
                            .send(Message::text(frame_text(&StreamFrame::HeartbeatAck)));
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });

    let store = PositionStore::new();
    let shutdown = ShutdownSignal::new();
    let manager = ConnectionManager::new(test_config(addr, 200, 100), store.clone(), shutdown);
    manager.connect().await;
    //second call must be a no-op while the supervisor lives
    manager.connect().await;

    let settled = {
        let store = store.clone();
        eventually(
            move || {
                let store = store.clone();
                async move {
                    store.len().await == 2
                        && store.get("T1").await.map(|p| p.latitude) == Some(34.06)
                }
            },
            Duration::from_secs(3),
        )
        .await
    };
    assert!(settled, "snapshot then update should settle in the store");
    assert_eq!(store.get("T2").await.unwrap().latitude, 34.10);
    assert!(manager.is_connected().await);
    assert!(manager.last_error().await.is_none());

    let pinged = {
        let pings = pings.clone();
        eventually(
            move || {
                let pings = pings.clone();
                async move { pings.load(Ordering::SeqCst) >= 2 }
            },
            Duration::from_secs(3),
        )
        .await
    };
    assert!(pinged, "keepalive pings should arrive at the configured interval");

    manager.teardown().await;
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
    let pings_at_teardown = pings.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(
        pings.load(Ordering::SeqCst),
        pings_at_teardown,
        "keepalive must cease after teardown"
    );
    //the store outlives the connection
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn reconnects_once_after_close_and_keeps_positions() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let session_times = Arc::new(Mutex::new((None::<Instant>, None::<Instant>)));
    let session_times_server = session_times.clone();

    std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut websocket = accept(stream).unwrap();
        websocket
            .send(Message::text(frame_text(&StreamFrame::Snapshot(vec![
                position("T1", 34.05, -118.24),
            ]))))
            .unwrap();
        std::thread::sleep(Duration::from_millis(100));
        session_times_server.lock().unwrap().0 = Some(Instant::now());
        let _ = websocket.close(None);
        drop(websocket);

        let (stream, _) = listener.accept().unwrap();
        session_times_server.lock().unwrap().1 = Some(Instant::now());
        let mut websocket = accept(stream).unwrap();
        websocket
            .send(Message::text(frame_text(&StreamFrame::Update(position(
                "T1", 34.07, -118.26,
            )))))
            .unwrap();
        loop {
            if websocket.read().is_err() {
                break;
            }
        }
    });

    let store = PositionStore::new();
    let shutdown = ShutdownSignal::new();
    let manager = ConnectionManager::new(test_config(addr, 5_000, 150), store.clone(), shutdown);
    manager.connect().await;

    let first_session = {
        let store = store.clone();
        eventually(
            move || {
                let store = store.clone();
                async move { store.len().await == 1 }
            },
            Duration::from_secs(3),
        )
        .await
    };
    assert!(first_session, "first session should deliver the snapshot");

    //the close must not clear the store
    let reconnected = {
        let store = store.clone();
        eventually(
            move || {
                let store = store.clone();
                async move { store.get("T1").await.map(|p| p.latitude) == Some(34.07) }
            },
            Duration::from_secs(5),
        )
        .await
    };
    assert!(reconnected, "second session should deliver the update");
    assert_eq!(store.len().await, 1);
    assert!(manager.is_connected().await);

    let (closed_at, reaccepted_at) = *session_times.lock().unwrap();
    let closed_at = closed_at.unwrap();
    let reaccepted_at = reaccepted_at.unwrap();
    assert!(
        reaccepted_at.duration_since(closed_at) >= Duration::from_millis(150),
        "reconnect must not fire earlier than the base delay"
    );

    manager.teardown().await;
}

#[tokio::test]
async fn connect_failure_is_nonfatal_and_recorded() {
    //claim a port, then free it so nothing is listening there
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let store = PositionStore::new();
    let shutdown = ShutdownSignal::new();
    let manager = ConnectionManager::new(test_config(addr, 5_000, 50), store.clone(), shutdown);
    manager.connect().await;

    let errored = {
        let manager = &manager;
        eventually(
            move || async move { manager.last_error().await.is_some() },
            Duration::from_secs(3),
        )
        .await
    };
    assert!(errored, "connect failure should be recorded");
    assert!(!manager.is_connected().await);
    assert!(store.is_empty().await);

    manager.teardown().await;
    assert_eq!(manager.state().await, ConnectionState::Disconnected);
}
