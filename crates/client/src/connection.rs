//! Connection manager
//!
//! Owns the primary WebSocket to one session: application-level
//! ping/pong keepalive, exponential-backoff reconnect, and a permanent
//! downgrade to the one-way SSE stream after too many consecutive
//! failures. All timers live inside a single driver task, so aborting
//! that task cancels every pending reconnect and keepalive atomically.

use std::time::Duration;

use agentdeck_protocol::{codec, ControlFrame, StreamEvent};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::sse::SseAssembler;

const SSE_DEFAULT_RETRY_MS: u64 = 3_000;
const NOTICE_CHANNEL_CAPACITY: usize = 256;

/// Observable lifecycle of the session stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Reconnecting,
    /// Primary transport abandoned; events arrive one-way over SSE.
    FallbackActive,
    Disconnected,
}

/// What the manager delivers to its consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamNotice {
    /// A decoded stream event.
    Event(StreamEvent),
    /// The connection state changed.
    State(ConnectionState),
    /// A transport (re)opened after a gap; events may have been missed,
    /// so the consumer should refresh from the authoritative read.
    Resync,
}

/// Delay before reconnect attempt number `failures` (1-based).
fn backoff_delay(failures: u32, config: &ClientConfig) -> Duration {
    let exp = failures.saturating_sub(1).min(31);
    let ms = config
        .reconnect_base_ms
        .saturating_mul(1u64 << exp)
        .min(config.reconnect_cap_ms);
    Duration::from_millis(ms)
}

pub struct ConnectionManager {
    out_tx: mpsc::UnboundedSender<ControlFrame>,
    state_rx: watch::Receiver<ConnectionState>,
    state_tx: watch::Sender<ConnectionState>,
    driver: JoinHandle<()>,
}

impl ConnectionManager {
    /// Spawn the driver task for one session and return the manager
    /// plus the notice stream.
    pub fn establish(
        config: ClientConfig,
        session_id: impl Into<String>,
    ) -> (Self, mpsc::Receiver<StreamNotice>) {
        let session_id = session_id.into();
        let (notice_tx, notice_rx) = mpsc::channel(NOTICE_CHANNEL_CAPACITY);
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);

        let driver = tokio::spawn(drive(
            config,
            session_id,
            notice_tx,
            out_rx,
            state_tx.clone(),
        ));

        (
            Self {
                out_tx,
                state_rx,
                state_tx,
                driver,
            },
            notice_rx,
        )
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Queue a control frame on the primary transport. Fails while the
    /// socket is down or after the fallback downgrade — the fallback
    /// stream is one-way.
    pub fn send(&self, frame: ControlFrame) -> Result<(), ClientError> {
        if self.state() != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }
        self.out_tx
            .send(frame)
            .map_err(|_| ClientError::NotConnected)
    }

    /// Tear everything down. Idempotent; cancels any in-progress
    /// reconnect timer along with the transport.
    pub fn disconnect(&self) {
        self.driver.abort();
        let _ = self.state_tx.send(ConnectionState::Disconnected);
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

async fn drive(
    config: ClientConfig,
    session_id: String,
    notice_tx: mpsc::Sender<StreamNotice>,
    mut out_rx: mpsc::UnboundedReceiver<ControlFrame>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let mut failures: u32 = 0;

    loop {
        if failures >= config.fallback_threshold {
            warn!(
                component = "connection",
                session_id = %session_id,
                failures,
                "primary transport abandoned, switching to fallback stream"
            );
            publish(&state_tx, &notice_tx, ConnectionState::FallbackActive).await;
            run_fallback(&config, &session_id, &notice_tx).await;
            // run_fallback only returns when the notice channel closes
            return;
        }

        if failures > 0 {
            publish(&state_tx, &notice_tx, ConnectionState::Reconnecting).await;
            let delay = backoff_delay(failures, &config);
            debug!(
                component = "connection",
                session_id = %session_id,
                failures,
                delay_ms = delay.as_millis() as u64,
                "waiting before reconnect"
            );
            tokio::time::sleep(delay).await;
        }

        match tokio_tungstenite::connect_async(config.ws_url(&session_id)).await {
            Ok((socket, _)) => {
                info!(component = "connection", session_id = %session_id, "primary transport open");
                failures = 0;
                publish(&state_tx, &notice_tx, ConnectionState::Connected).await;
                if notice_tx.send(StreamNotice::Resync).await.is_err() {
                    return;
                }
                let closed =
                    run_primary(&config, socket, &notice_tx, &mut out_rx, &session_id).await;
                if closed {
                    return;
                }
                failures = 1;
            }
            Err(err) => {
                failures += 1;
                warn!(
                    component = "connection",
                    session_id = %session_id,
                    failures,
                    error = %err,
                    "primary connect failed"
                );
            }
        }
    }
}

async fn publish(
    state_tx: &watch::Sender<ConnectionState>,
    notice_tx: &mpsc::Sender<StreamNotice>,
    state: ConnectionState,
) {
    let _ = state_tx.send(state);
    let _ = notice_tx.send(StreamNotice::State(state)).await;
}

/// Run the open socket until it dies. Returns true when the consumer
/// went away and the driver should stop entirely.
async fn run_primary(
    config: &ClientConfig,
    socket: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    notice_tx: &mpsc::Sender<StreamNotice>,
    out_rx: &mut mpsc::UnboundedReceiver<ControlFrame>,
    session_id: &str,
) -> bool {
    let (mut sink, mut stream) = socket.split();

    let mut ping_interval = tokio::time::interval(Duration::from_secs(config.ping_interval_secs));
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // First tick fires immediately; skip it so the first ping waits a
    // full interval after connect.
    ping_interval.tick().await;

    let pong_deadline = tokio::time::sleep(Duration::from_secs(config.pong_timeout_secs));
    tokio::pin!(pong_deadline);
    let mut pong_armed = false;

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                let text = codec::encode_control(&ControlFrame::Ping);
                if sink.send(Message::Text(text.into())).await.is_err() {
                    debug!(component = "connection", session_id = %session_id, "ping send failed");
                    return false;
                }
                if !pong_armed {
                    pong_deadline
                        .as_mut()
                        .reset(tokio::time::Instant::now() + Duration::from_secs(config.pong_timeout_secs));
                    pong_armed = true;
                }
            }

            _ = &mut pong_deadline, if pong_armed => {
                warn!(
                    component = "connection",
                    session_id = %session_id,
                    "keepalive timed out, dropping connection"
                );
                return false;
            }

            frame = out_rx.recv() => {
                let Some(frame) = frame else {
                    // Manager dropped its sender; shut down
                    return true;
                };
                let text = codec::encode_control(&frame);
                if sink.send(Message::Text(text.into())).await.is_err() {
                    return false;
                }
            }

            incoming = stream.next() => {
                let Some(Ok(message)) = incoming else {
                    debug!(component = "connection", session_id = %session_id, "primary transport closed");
                    return false;
                };
                // Any inbound traffic proves the link is alive
                pong_armed = false;
                match message {
                    Message::Text(text) => {
                        if let Some(event) = codec::decode(text.as_str()) {
                            if notice_tx.send(StreamNotice::Event(event)).await.is_err() {
                                return true;
                            }
                        }
                    }
                    Message::Close(_) => {
                        debug!(component = "connection", session_id = %session_id, "close frame received");
                        return false;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Permanent one-way fallback. Reconnects forever on its own cadence,
/// honoring any server-advised `retry:` delay. Returns only when the
/// consumer goes away.
async fn run_fallback(
    config: &ClientConfig,
    session_id: &str,
    notice_tx: &mpsc::Sender<StreamNotice>,
) {
    let http = reqwest::Client::new();
    let mut retry_ms = SSE_DEFAULT_RETRY_MS;

    loop {
        let mut request = http
            .get(config.sse_url(session_id))
            .header("accept", "text/event-stream");
        if let Some(key) = &config.api_key {
            request = request.header("x-api-key", key);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                info!(component = "connection", session_id = %session_id, "fallback stream open");
                if notice_tx.send(StreamNotice::Resync).await.is_err() {
                    return;
                }
                let mut assembler = SseAssembler::new();
                let mut body = response.bytes_stream();
                while let Some(chunk) = body.next().await {
                    let Ok(bytes) = chunk else { break };
                    let text = String::from_utf8_lossy(&bytes);
                    for frame in assembler.push(&text) {
                        if let Some(ms) = frame.retry {
                            retry_ms = ms;
                        }
                        if let Some(event) = codec::decode(&frame.data) {
                            if notice_tx.send(StreamNotice::Event(event)).await.is_err() {
                                return;
                            }
                        }
                    }
                }
                if let Some(ms) = assembler.retry_hint() {
                    retry_ms = ms;
                }
                debug!(component = "connection", session_id = %session_id, "fallback stream ended");
            }
            Ok(response) => {
                warn!(
                    component = "connection",
                    session_id = %session_id,
                    status = %response.status(),
                    "fallback stream rejected"
                );
            }
            Err(err) => {
                warn!(
                    component = "connection",
                    session_id = %session_id,
                    error = %err,
                    "fallback connect failed"
                );
            }
        }

        if notice_tx.is_closed() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(retry_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::default()
    }

    #[test]
    fn backoff_doubles_until_cap() {
        let config = config();
        let delays: Vec<u64> = (1..=7)
            .map(|n| backoff_delay(n, &config).as_millis() as u64)
            .collect();
        assert_eq!(delays, [1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000]);
    }

    #[test]
    fn backoff_is_monotonic_below_cap() {
        let config = config();
        let mut previous = Duration::ZERO;
        for n in 1..=6 {
            let delay = backoff_delay(n, &config);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn backoff_never_overflows() {
        let config = config();
        assert_eq!(
            backoff_delay(u32::MAX, &config),
            Duration::from_millis(config.reconnect_cap_ms)
        );
    }

    #[tokio::test]
    async fn unreachable_server_walks_toward_fallback() {
        let config = ClientConfig {
            server_url: "http://127.0.0.1:1".into(),
            reconnect_base_ms: 1,
            reconnect_cap_ms: 4,
            fallback_threshold: 2,
            ..Default::default()
        };
        let (manager, mut notices) = ConnectionManager::establish(config, "sess-1");

        let mut saw_reconnecting = false;
        let mut saw_fallback = false;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            let notice = tokio::time::timeout_at(deadline, notices.recv()).await;
            match notice {
                Ok(Some(StreamNotice::State(ConnectionState::Reconnecting))) => {
                    saw_reconnecting = true;
                }
                Ok(Some(StreamNotice::State(ConnectionState::FallbackActive))) => {
                    saw_fallback = true;
                    break;
                }
                Ok(Some(_)) => {}
                _ => break,
            }
        }
        assert!(saw_reconnecting);
        assert!(saw_fallback);
        // One-way transport refuses control frames
        assert!(matches!(
            manager.send(ControlFrame::Ping),
            Err(ClientError::NotConnected)
        ));
        manager.disconnect();
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let config = ClientConfig {
            server_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        };
        let (manager, _notices) = ConnectionManager::establish(config, "sess-1");
        manager.disconnect();
        manager.disconnect();
        assert_eq!(manager.state(), ConnectionState::Disconnected);
        assert!(matches!(
            manager.send(ControlFrame::Ping),
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn send_requires_connected_state() {
        let config = ClientConfig {
            server_url: "http://127.0.0.1:1".into(),
            ..Default::default()
        };
        let (manager, _notices) = ConnectionManager::establish(config, "sess-1");
        // Still connecting or already retrying; either way not connected
        assert!(matches!(
            manager.send(ControlFrame::Ping),
            Err(ClientError::NotConnected)
        ));
        manager.disconnect();
    }
}
