//! End-to-end finish node tests over loopback TCP
//!
//! The start node is played by `send_start_timestamp`, the finish sensor by the
//! simulated pin and the finish clock by a `ManualClock`.

use finishline::{
    Finishline, Level, ManualClock, RaceCommand, RaceEvent, RaceState, SensorBackend, TimerConfig,
    send_start_timestamp,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

fn config(dir: &tempfile::TempDir) -> TimerConfig {
    let mut config = TimerConfig::default();
    config.signal.bind_address = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config.signal.port = free_port();
    config.sensor.backend = SensorBackend::Simulated;
    config.sensor.poll_interval_ms = 1;
    config.storage.path = dir.path().join("classifica.csv");
    config
}

/// The listener is bound by the worker after the start command returns, so
/// keep trying until it accepts.
async fn send_start(addr: SocketAddr, timestamp: f64) {
    for _ in 0..200 {
        if send_start_timestamp(addr, timestamp).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("finish node never accepted the start signal on {}", addr);
}

async fn wait_for(events: &mut broadcast::Receiver<RaceEvent>, wanted: RaceState) {
    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for race status")
            .expect("event channel closed");
        if event == RaceEvent::RaceStatusChanged(wanted) {
            return;
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timed_run_is_ranked_and_saved() {
    let _ = tracing_subscriber::fmt::try_init();
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let clock = ManualClock::new(0.0);
    let node = Finishline::launch_with_clock(&config, Arc::new(clock.clone())).unwrap();
    let pin = node.simulated_pin.clone().expect("simulated sensor");
    let timekeeper = node.timekeeper;
    let mut events = timekeeper.subscribe();

    timekeeper.handle(RaceCommand::StartRequested { competitor: "Mario".into() }).unwrap();
    send_start(config.signal.socket_addr(), 100.0).await;
    wait_for(&mut events, RaceState::AwaitingFinish).await;

    clock.set(101.234);
    pin.set_level(Level::Low);
    wait_for(&mut events, RaceState::Completed).await;
    pin.set_level(Level::High);
    wait_for(&mut events, RaceState::Idle).await;

    let rows = timekeeper.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].competitor.as_str(), "Mario");
    assert_eq!(rows[0].elapsed, 1.234);

    let saved = std::fs::read_to_string(&config.storage.path).unwrap();
    assert_eq!(saved, "Posizione;Pilota;Tempo (s);Dist. prec.;Dist. 1°\n1;Mario;1,234;-;-\n");

    // A faster second run takes the lead and pushes Mario down
    timekeeper.start("Luigi").unwrap();
    send_start(config.signal.socket_addr(), 200.0).await;
    wait_for(&mut events, RaceState::AwaitingFinish).await;
    clock.set(201.0);
    pin.set_level(Level::Low);

    let rendered = loop {
        match events.recv().await.unwrap() {
            RaceEvent::LeaderboardUpdated(rows) => break rows,
            _ => continue,
        }
    };
    assert_eq!(rendered[0].competitor.as_str(), "Luigi");
    assert_eq!(rendered[0].movement, finishline::Movement::First);
    assert_eq!(rendered[1].competitor.as_str(), "Mario");
    assert_eq!(rendered[1].movement, finishline::Movement::Down);
    assert_eq!(rendered[1].delta_to_first_text(), "+0.234");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_run_leaves_leaderboard_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let node = Finishline::launch_with_clock(&config, Arc::new(ManualClock::new(0.0))).unwrap();
    let timekeeper = node.timekeeper;
    let mut events = timekeeper.subscribe();

    timekeeper.handle(RaceCommand::StartRequested { competitor: "Luigi".into() }).unwrap();
    timekeeper.handle(RaceCommand::CancelRequested).unwrap();
    wait_for(&mut events, RaceState::Cancelled).await;
    wait_for(&mut events, RaceState::Idle).await;

    assert_eq!(timekeeper.state(), RaceState::Idle);
    assert!(timekeeper.rows().is_empty());
    assert!(!config.storage.path.exists());

    // The port is free again for the next attempt
    timekeeper.start("Luigi").unwrap();
    send_start(config.signal.socket_addr(), 1.0).await;
    wait_for(&mut events, RaceState::AwaitingFinish).await;
    assert!(timekeeper.cancel());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn garbage_start_payload_cancels_the_attempt() {
    use tokio::io::AsyncWriteExt;

    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let node = Finishline::launch_with_clock(&config, Arc::new(ManualClock::new(0.0))).unwrap();
    let timekeeper = node.timekeeper;
    let mut events = timekeeper.subscribe();

    timekeeper.start("Peach").unwrap();
    let addr = config.signal.socket_addr();
    let mut stream = loop {
        match tokio::net::TcpStream::connect(addr).await {
            Ok(stream) => break stream,
            Err(_) => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    };
    stream.write_all(b"soon\n").await.unwrap();
    drop(stream);

    wait_for(&mut events, RaceState::Cancelled).await;
    wait_for(&mut events, RaceState::Idle).await;
    assert!(timekeeper.rows().is_empty());
}
