// SPDX-License-Identifier: MIT

//! Client→server WebSocket traffic (§6). The Hub only ever accepts a
//! heartbeat reply from clients; everything else flows server→client as
//! [`dc_core::Event`].

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Ping,
    Pong,
}
