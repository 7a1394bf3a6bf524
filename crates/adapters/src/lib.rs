// SPDX-License-Identifier: MIT

//! dc-adapters: the External Adapter (§4.A) and the Injection Engine (§4.B).
//!
//! These are the only two components that ever touch the remote-debugging
//! endpoint or the host OS. Everything upstream (`dc-engine`, `dc-daemon`)
//! talks to the [`DebugAdapter`] trait, never to the transport directly, so
//! tests can swap in [`fake::FakeAdapter`] behind the `test-support` feature.

mod cdp;
pub mod debug_adapter;
pub mod injection;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use cdp::{CdpAdapter, CdpConfig};
pub use debug_adapter::{
    AdapterError, AvailabilityStatus, DebugAdapter, PageDescriptor, SessionHandle, TranscriptMessage,
};
pub use injection::{
    GuiAutomation, GuiError, InjectionEngine, InjectionError, InjectionMethod, InjectionOutcome,
    MethodCounters, NoopGuiAutomation,
};

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAdapter;
