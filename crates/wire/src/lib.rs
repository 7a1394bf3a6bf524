// SPDX-License-Identifier: MIT

//! dc-wire: HTTP and WebSocket DTOs for the remote-control server.
//!
//! These are the typed record/union replacements the spec's §9 design notes
//! call for in place of the original's untyped request/response objects.
//! Nothing here owns behaviour — `dc-daemon` maps domain types to these
//! shapes at the HTTP boundary and back.

pub mod envelope;
pub mod requests;
pub mod responses;
pub mod ws;

pub use envelope::{ErrorResponse, Pagination};
