// SPDX-License-Identifier: MIT

//! Event Bus / WS Hub (§4.K): fans every subsystem `Event` out to connected
//! WebSocket clients over a single broadcast channel, one writer task per
//! connection so a slow client never blocks fan-out.
//!
//! Grounded on `axum::extract::ws` directly (the teacher is a Unix-socket
//! JSON-RPC daemon and has no WS idiom of its own); the one-broadcast,
//! one-mpsc-writer-per-connection shape mirrors how CloudLLM's HTTP adapter
//! keeps per-connection state off the hot broadcast path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket};
use chrono::Utc;
use dc_core::Event;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{broadcast, mpsc, Notify};
use tracing::{debug, info, warn};

/// Close code for a rejected WS handshake (§4.K step 2: "close with a code
/// in the 4000 range and a short reason").
const CLOSE_UNAUTHENTICATED: u16 = 4001;

/// Heartbeat interval; clients still "not alive" on the next tick are
/// dropped (§4.K).
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Event types reported to a client that never authenticated, or whose
/// token is no longer valid (§4.K: "unauthenticated clients receive only a
/// whitelist of security events").
fn allowed_unauthenticated(event: &Event) -> bool {
    matches!(
        event,
        Event::SecurityIpBlocked { .. } | Event::SecurityAlert { .. } | Event::GlobalLockdown { .. } | Event::SecurityLoginFailed { .. }
    )
}

/// Central fan-out point. Every subsystem holds a clone of the sender half
/// via [`Hub::sender`] (or broadcasts its own events and the daemon relays
/// them in through [`Hub::relay`]).
pub struct Hub {
    events: broadcast::Sender<Event>,
}

impl Hub {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(1024);
        Self { events }
    }

    pub fn sender(&self) -> broadcast::Sender<Event> {
        self.events.clone()
    }

    pub fn publish(&self, event: Event) {
        let _ = self.events.send(event);
    }

    /// Subscribes `rx` to this Hub's broadcast and re-publishes everything
    /// it carries, so components that own their own `broadcast::Sender`
    /// (Gate, Coordinator, Injection Engine, ...) feed a single Hub without
    /// holding a reference to it themselves.
    pub fn relay(self: &Arc<Self>, mut rx: broadcast::Receiver<Event>) {
        let hub = self.clone();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => hub.publish(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "hub relay lagged, dropping events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Drives one accepted WebSocket connection until it closes: an initial
    /// `connected` frame plus usage snapshot, then fan-out of every
    /// subsequent broadcast event (filtered per `authenticated`), a 30 s
    /// heartbeat, and dead-peer eviction (§4.K).
    pub async fn serve_connection(self: Arc<Self>, mut socket: WebSocket, authenticated: bool, usage: serde_json::Value) {
        if !authenticated {
            let frame = CloseFrame { code: CLOSE_UNAUTHENTICATED, reason: "invalid or missing session token".into() };
            let _ = socket.send(WsMessage::Close(Some(frame))).await;
            return;
        }

        let (mut sender, mut receiver) = socket.split();
        let (tx, mut rx) = mpsc::channel::<String>(256);

        let hello = json!({"type": "connected", "usage": usage, "timestamp": Utc::now().to_rfc3339()});
        if tx.send(hello.to_string()).await.is_err() {
            return;
        }

        let alive = Arc::new(AtomicBool::new(true));
        let writer_alive = alive.clone();

        let writer = tokio::spawn(async move {
            while let Some(text) = rx.recv().await {
                if sender.send(WsMessage::Text(text.into())).await.is_err() {
                    writer_alive.store(false, Ordering::SeqCst);
                    break;
                }
            }
        });

        let mut events = self.events.subscribe();
        let dead_peer = Arc::new(Notify::new());
        let heartbeat_tx = tx.clone();
        let heartbeat_alive = alive.clone();
        let heartbeat_dead_peer = dead_peer.clone();
        let heartbeat = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                ticks.tick().await;
                if !heartbeat_alive.swap(false, Ordering::SeqCst) {
                    heartbeat_dead_peer.notify_one();
                    break;
                }
                let ping = json!({"type": "ping", "timestamp": Utc::now().to_rfc3339()});
                if heartbeat_tx.send(ping.to_string()).await.is_err() {
                    break;
                }
            }
        });

        let fanout_tx = tx.clone();
        let fanout = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if !authenticated && !allowed_unauthenticated(&event) {
                            continue;
                        }
                        let envelope = stamp(&event);
                        if fanout_tx.send(envelope).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "ws client lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        loop {
            tokio::select! {
                _ = dead_peer.notified() => {
                    debug!("ws client missed heartbeat, forcibly dropping connection");
                    break;
                }
                msg = receiver.next() => {
                    let Some(Ok(msg)) = msg else { break };
                    if let WsMessage::Text(text) = msg {
                        if let Ok(client_msg) = serde_json::from_str::<dc_wire::ws::ClientMessage>(&text) {
                            if matches!(client_msg, dc_wire::ws::ClientMessage::Pong) {
                                alive.store(true, Ordering::SeqCst);
                            }
                        }
                    }
                }
            }
        }

        heartbeat.abort();
        fanout.abort();
        drop(tx);
        let _ = writer.await;
        info!("ws connection closed");
    }
}

fn stamp(event: &Event) -> String {
    let mut value = serde_json::to_value(event).unwrap_or_else(|_| json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.insert("timestamp".into(), json!(Utc::now().to_rfc3339()));
    }
    value.to_string()
}

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;
