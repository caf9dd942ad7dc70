//! Full-bridge scenarios over the host-bridge backend with a scripted
//! fake module. Time-sensitive flows run under paused time, so probe
//! and join timers elapse instantly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lorart_bridge::{JoinError, LoraBridge};
use lorart_transport::{Backend, HostBridge};
use serde_json::json;
use tokio::sync::mpsc;

struct Harness {
    host: Arc<HostBridge>,
    bridge: Arc<LoraBridge>,
    commands: mpsc::UnboundedReceiver<String>,
    data: Arc<Mutex<Vec<(u8, serde_json::Value)>>>,
    disconnects: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        let (tx, commands) = mpsc::unbounded_channel();
        let host = HostBridge::new(move |line: &str| {
            let _ = tx.send(line.trim().to_string());
        });
        let backend = Backend::detect(Some(Arc::clone(&host)), None).unwrap();
        Self {
            host,
            bridge: Arc::new(LoraBridge::new(backend)),
            commands,
            data: Arc::new(Mutex::new(Vec::new())),
            disconnects: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn connect(&self) -> bool {
        let data = Arc::clone(&self.data);
        let disconnects = Arc::clone(&self.disconnects);
        self.bridge.connect(
            move |fport, value| data.lock().unwrap().push((fport, value)),
            move || {
                disconnects.fetch_add(1, Ordering::SeqCst);
            },
        )
    }

    /// Module output, one CRLF line.
    fn reply(&self, line: &str) {
        self.host.push_data(format!("{line}\r\n").as_bytes());
    }

    async fn next_command(&mut self) -> String {
        self.commands.recv().await.expect("command channel open")
    }
}

/// Let the read loop and callbacks catch up with pushed bytes.
async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn connect_is_idempotent() {
    let harness = Harness::new();
    assert!(harness.connect());
    assert!(harness.connect());
    assert!(harness.bridge.is_connected());
    assert!(!harness.bridge.is_joined());
}

#[tokio::test(start_paused = true)]
async fn probe_answer_one_joins_without_configuration() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    let bridge = Arc::clone(&harness.bridge);
    let join = tokio::spawn(async move { bridge.join().await });

    assert_eq!(harness.next_command().await, "AT+NJS=?");
    harness.reply("1");

    assert_eq!(join.await.unwrap(), Ok(()));
    assert!(harness.bridge.is_joined());
    // No configuration or join traffic followed the probe.
    assert!(harness.commands.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn probe_answer_zero_runs_full_sequence_to_success() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    let bridge = Arc::clone(&harness.bridge);
    let join = tokio::spawn(async move { bridge.join().await });

    assert_eq!(harness.next_command().await, "AT+NJS=?");
    harness.reply("0");

    assert_eq!(harness.next_command().await, "AT+MODE=LWOTAA");
    assert!(harness.next_command().await.starts_with("AT+DEUI="));
    assert!(harness.next_command().await.starts_with("AT+APPEUI="));
    assert!(harness.next_command().await.starts_with("AT+APPKEY="));
    assert_eq!(harness.next_command().await, "AT+JOIN");
    harness.reply("+JOIN: OK");

    assert_eq!(join.await.unwrap(), Ok(()));
    assert!(harness.bridge.is_joined());
}

#[tokio::test(start_paused = true)]
async fn device_failure_marker_rejects_the_join() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    let bridge = Arc::clone(&harness.bridge);
    let join = tokio::spawn(async move { bridge.join().await });

    assert_eq!(harness.next_command().await, "AT+NJS=?");
    harness.reply("0");
    for _ in 0..4 {
        harness.next_command().await;
    }
    assert_eq!(harness.next_command().await, "AT+JOIN");
    harness.reply("+JOIN: Failed");

    assert_eq!(join.await.unwrap(), Err(JoinError::RejectedByDevice));
    assert!(!harness.bridge.is_joined());
}

#[tokio::test(start_paused = true)]
async fn concurrent_join_fails_fast_and_leaves_the_first_running() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    let bridge = Arc::clone(&harness.bridge);
    let first = tokio::spawn(async move { bridge.join().await });
    assert_eq!(harness.next_command().await, "AT+NJS=?");

    assert_eq!(
        harness.bridge.join().await,
        Err(JoinError::AlreadyInProgress)
    );

    harness.reply("1");
    assert_eq!(first.await.unwrap(), Ok(()));
    assert!(harness.bridge.is_joined());
}

#[tokio::test(start_paused = true)]
async fn probe_silence_fails_open_into_configuration() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    let bridge = Arc::clone(&harness.bridge);
    let join = tokio::spawn(async move { bridge.join().await });

    assert_eq!(harness.next_command().await, "AT+NJS=?");
    // No probe answer: the 5s probe window elapses under paused time and
    // the sequence continues as if the module had answered "0".
    assert_eq!(harness.next_command().await, "AT+MODE=LWOTAA");
    for _ in 0..3 {
        harness.next_command().await;
    }
    assert_eq!(harness.next_command().await, "AT+JOIN");
    harness.reply("JOINED");

    assert_eq!(join.await.unwrap(), Ok(()));
}

#[tokio::test(start_paused = true)]
async fn unanswered_join_times_out_and_clears_the_gate() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    let bridge = Arc::clone(&harness.bridge);
    let join = tokio::spawn(async move { bridge.join().await });

    assert_eq!(harness.next_command().await, "AT+NJS=?");
    harness.reply("0");
    for _ in 0..4 {
        harness.next_command().await;
    }
    assert_eq!(harness.next_command().await, "AT+JOIN");
    // Silence until the 30s global timer expires.
    assert_eq!(join.await.unwrap(), Err(JoinError::Timeout));
    assert!(!harness.bridge.is_joined());

    // The gate is released: a new attempt starts cleanly.
    let bridge = Arc::clone(&harness.bridge);
    let retry = tokio::spawn(async move { bridge.join().await });
    assert_eq!(harness.next_command().await, "AT+NJS=?");
    harness.reply("1");
    assert_eq!(retry.await.unwrap(), Ok(()));
}

#[tokio::test(start_paused = true)]
async fn late_at_error_is_a_protocol_error() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    let bridge = Arc::clone(&harness.bridge);
    let join = tokio::spawn(async move { bridge.join().await });

    assert_eq!(harness.next_command().await, "AT+NJS=?");
    harness.reply("0");
    for _ in 0..4 {
        harness.next_command().await;
    }
    assert_eq!(harness.next_command().await, "AT+JOIN");

    // Early AT_ERROR is configuration residue and must be ignored.
    harness.reply("AT_ERROR");
    settle().await;
    tokio::time::advance(std::time::Duration::from_secs(4)).await;
    harness.reply("AT_ERROR");

    assert_eq!(join.await.unwrap(), Err(JoinError::ProtocolError));
}

#[tokio::test(start_paused = true)]
async fn rx_done_triggers_fetch_and_downlink_is_dispatched() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    harness.reply("rxDone");
    assert_eq!(harness.next_command().await, "AT+RECVB=?");

    harness.reply("2:7b2278223a317d");
    settle().await;

    let data = harness.data.lock().unwrap();
    assert_eq!(data.as_slice(), [(2, json!({"x": 1}))]);
}

#[tokio::test(start_paused = true)]
async fn recv_form_downlink_is_dispatched_too() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    harness.reply("+RECV:7,14,7b2278223a317d");
    settle().await;

    let data = harness.data.lock().unwrap();
    assert_eq!(data.as_slice(), [(7, json!({"x": 1}))]);
}

#[tokio::test(start_paused = true)]
async fn malformed_downlink_is_dropped_and_the_loop_survives() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    harness.reply("2:zz");
    settle().await;
    assert!(harness.data.lock().unwrap().is_empty());

    harness.reply("2:7b2278223a317d");
    settle().await;
    assert_eq!(harness.data.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn boot_banner_clears_joined_and_notifies_once() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    let bridge = Arc::clone(&harness.bridge);
    let join = tokio::spawn(async move { bridge.join().await });
    assert_eq!(harness.next_command().await, "AT+NJS=?");
    harness.reply("1");
    assert_eq!(join.await.unwrap(), Ok(()));

    harness.reply("DRAGINO LA66 Device");
    settle().await;
    assert!(!harness.bridge.is_joined());
    assert!(harness.bridge.is_connected());
    assert_eq!(harness.disconnects.load(Ordering::SeqCst), 1);

    // A second banner while already unjoined stays silent.
    harness.reply("DRAGINO LA66 Device");
    settle().await;
    assert_eq!(harness.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn host_disconnect_clears_flags_and_notifies() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    let bridge = Arc::clone(&harness.bridge);
    let join = tokio::spawn(async move { bridge.join().await });
    assert_eq!(harness.next_command().await, "AT+NJS=?");
    harness.reply("1");
    assert_eq!(join.await.unwrap(), Ok(()));

    harness.host.notify_disconnect();
    settle().await;

    assert!(!harness.bridge.is_connected());
    assert!(!harness.bridge.is_joined());
    assert_eq!(harness.disconnects.load(Ordering::SeqCst), 1);

    // Reconnecting attaches a fresh link.
    assert!(harness.connect());
    assert!(harness.bridge.is_connected());
}

#[tokio::test(start_paused = true)]
async fn send_is_gated_on_joined_and_encodes_the_payload() {
    let mut harness = Harness::new();
    assert!(harness.connect());

    harness.bridge.send(&json!({"x": 1}));
    settle().await;
    assert!(harness.commands.try_recv().is_err());

    let bridge = Arc::clone(&harness.bridge);
    let join = tokio::spawn(async move { bridge.join().await });
    assert_eq!(harness.next_command().await, "AT+NJS=?");
    harness.reply("1");
    assert_eq!(join.await.unwrap(), Ok(()));

    harness.bridge.send(&json!({"x": 1}));
    assert_eq!(
        harness.next_command().await,
        "AT+SENDB=0,2,7,7b2278223a317d"
    );
}

#[tokio::test(start_paused = true)]
async fn explicit_disconnect_is_idempotent() {
    let harness = Harness::new();
    assert!(harness.connect());
    harness.bridge.disconnect();
    harness.bridge.disconnect();
    assert!(!harness.bridge.is_connected());
    assert!(!harness.bridge.is_joined());
}
