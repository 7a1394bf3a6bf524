// SPDX-License-Identifier: MIT

//! Injection Engine (§4.B): orders a strategy over a named conversation,
//! serialised per conversation, falling back through lower-priority
//! strategies on failure and never retrying a strategy that already failed.

mod gui;
mod tmux;

pub use gui::{GuiAutomation, GuiError, NoopGuiAutomation};
#[cfg(unix)]
pub use gui::XdotoolAutomation;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arboard::Clipboard;
use dc_core::{ConversationId, Event};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::debug_adapter::{AdapterError, DebugAdapter};

/// Priority order; the configured preferred method is tried first and the
/// rest of this list follows, skipping whichever preferred method already
/// occupies the front.
pub const PRIORITY_ORDER: [InjectionMethod; 6] = [
    InjectionMethod::AdapterEval,
    InjectionMethod::AdapterClipboardPaste,
    InjectionMethod::OsKeySend,
    InjectionMethod::TmuxSend,
    InjectionMethod::ScriptedGuiAutomation,
    InjectionMethod::ClipboardOnly,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectionMethod {
    AdapterEval,
    AdapterClipboardPaste,
    OsKeySend,
    TmuxSend,
    ScriptedGuiAutomation,
    ClipboardOnly,
}

dc_core::simple_display! {
    InjectionMethod {
        AdapterEval => "adapter-eval",
        AdapterClipboardPaste => "adapter-clipboard-paste",
        OsKeySend => "os-key-send",
        TmuxSend => "tmux-send",
        ScriptedGuiAutomation => "scripted-gui-automation",
        ClipboardOnly => "clipboard-only",
    }
}

#[derive(Debug, Error)]
pub enum InjectionError {
    #[error("no strategy available, tried: {tried:?}, last error: {last_error}")]
    NoStrategyAvailable { tried: Vec<String>, last_error: String },
    #[error("adapter unavailable: {0}")]
    AdapterUnavailable(String),
}

#[derive(Debug, Clone, Copy)]
pub struct InjectionOutcome {
    pub method: InjectionMethod,
    pub duration_ms: u64,
}

#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct MethodCounters {
    pub success: u64,
    pub failure: u64,
}

struct StrategyFailure {
    method: InjectionMethod,
    error: String,
}

/// Orders a strategy over a conversation, serialised by a per-conversation
/// mutex, with fallback through the rest of [`PRIORITY_ORDER`].
pub struct InjectionEngine<A, G> {
    adapter: Arc<A>,
    gui: Arc<G>,
    preferred_method: Mutex<InjectionMethod>,
    retry_delay: Mutex<Duration>,
    conversation_locks: Mutex<HashMap<ConversationId, Arc<tokio::sync::Mutex<()>>>>,
    queues: Mutex<HashMap<ConversationId, VecDeque<String>>>,
    counters: Mutex<HashMap<InjectionMethod, MethodCounters>>,
    events: broadcast::Sender<Event>,
}

impl<A: DebugAdapter, G: GuiAutomation> InjectionEngine<A, G> {
    pub fn new(adapter: Arc<A>, gui: Arc<G>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            adapter,
            gui,
            preferred_method: Mutex::new(InjectionMethod::AdapterEval),
            retry_delay: Mutex::new(Duration::from_millis(500)),
            conversation_locks: Mutex::new(HashMap::new()),
            queues: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn configure(&self, preferred_method: InjectionMethod, retry_delay: Duration) {
        *self.preferred_method.lock() = preferred_method;
        *self.retry_delay.lock() = retry_delay;
    }

    pub fn counters(&self) -> HashMap<InjectionMethod, MethodCounters> {
        self.counters.lock().clone()
    }

    pub fn preferred_method(&self) -> InjectionMethod {
        *self.preferred_method.lock()
    }

    pub fn retry_delay_ms(&self) -> u64 {
        self.retry_delay.lock().as_millis() as u64
    }

    /// Best method to try next for `conversationId`: the configured
    /// preference, unless it has never once succeeded and a later method
    /// in [`PRIORITY_ORDER`] has — then the first method with a recorded
    /// success.
    pub fn best_method(&self) -> InjectionMethod {
        let counters = self.counters.lock();
        let preferred = *self.preferred_method.lock();
        if counters.get(&preferred).map(|c| c.success > 0).unwrap_or(true) {
            return preferred;
        }
        PRIORITY_ORDER
            .iter()
            .copied()
            .find(|m| counters.get(m).map(|c| c.success > 0).unwrap_or(false))
            .unwrap_or(preferred)
    }

    pub fn queue_len(&self, conversation_id: &ConversationId) -> usize {
        self.queues.lock().get(conversation_id).map(VecDeque::len).unwrap_or(0)
    }

    /// Drops every queued item for `conversationId`, returning how many
    /// were discarded.
    pub fn clear_queue(&self, conversation_id: &ConversationId) -> usize {
        self.queues.lock().remove(conversation_id).map(|q| q.len()).unwrap_or(0)
    }

    fn lock_for(&self, conversation_id: &ConversationId) -> Arc<tokio::sync::Mutex<()>> {
        self.conversation_locks
            .lock()
            .entry(conversation_id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn order(&self) -> Vec<InjectionMethod> {
        let preferred = *self.preferred_method.lock();
        let mut order = vec![preferred];
        order.extend(PRIORITY_ORDER.iter().copied().filter(|m| *m != preferred));
        order
    }

    fn record(&self, method: InjectionMethod, ok: bool) {
        let mut counters = self.counters.lock();
        let entry = counters.entry(method).or_default();
        if ok {
            entry.success += 1;
        } else {
            entry.failure += 1;
        }
    }

    /// `Inject(conversationId?, text)`: acquires the per-conversation mutex,
    /// tries the configured preferred method then the rest of the priority
    /// list, never retrying a method already attempted this call.
    pub async fn inject(&self, conversation_id: Option<ConversationId>, text: &str) -> Result<InjectionOutcome, InjectionError> {
        let conversation_id = conversation_id.unwrap_or_else(|| ConversationId::from("default"));
        let guard = self.lock_for(&conversation_id);
        let _permit = guard.lock().await;

        if !self.adapter.availability_check().await.available {
            let _ = self.events.send(Event::InjectionError { conversation_id: conversation_id.clone(), error: "adapter unavailable".into() });
            return Err(InjectionError::AdapterUnavailable("external adapter reports unavailable".into()));
        }

        let _ = self.events.send(Event::InjectionStarted { conversation_id: conversation_id.clone(), method: self.order()[0].to_string() });

        let started = Instant::now();
        let mut tried = Vec::new();
        let mut failures: Vec<StrategyFailure> = Vec::new();

        for (i, method) in self.order().into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(*self.retry_delay.lock()).await;
            }
            tried.push(method.to_string());
            match self.attempt(&conversation_id, method, text).await {
                Ok(()) => {
                    self.record(method, true);
                    let duration_ms = started.elapsed().as_millis() as u64;
                    let _ = self.events.send(Event::InjectionSuccess {
                        conversation_id: conversation_id.clone(),
                        method: method.to_string(),
                        duration_ms,
                    });
                    let _ = self.events.send(Event::MessageInjected { conversation_id: conversation_id.clone() });
                    return Ok(InjectionOutcome { method, duration_ms });
                }
                Err(err) => {
                    warn!(%method, %err, "injection strategy failed");
                    self.record(method, false);
                    failures.push(StrategyFailure { method, error: err });
                }
            }
        }

        let last_error = failures.last().map(|f| f.error.clone()).unwrap_or_else(|| "no strategies attempted".into());
        let _ = self.events.send(Event::InjectionFailed { conversation_id: conversation_id.clone(), tried: tried.clone(), last_error: last_error.clone() });
        Err(InjectionError::NoStrategyAvailable { tried, last_error })
    }

    async fn attempt(&self, conversation_id: &ConversationId, method: InjectionMethod, text: &str) -> Result<(), String> {
        match method {
            InjectionMethod::AdapterEval => {
                let session = self.adapter.attach(conversation_id.as_str()).await.map_err(adapter_err)?;
                let expr = format!("__typeAndSubmit({})", serde_json::to_string(text).unwrap_or_default());
                self.adapter.evaluate(&session, &expr).await.map_err(adapter_err).map(|_| ())
            }
            InjectionMethod::AdapterClipboardPaste => {
                let session = self.adapter.attach(conversation_id.as_str()).await.map_err(adapter_err)?;
                self.adapter.focus(&session).await.map_err(adapter_err)?;
                set_clipboard(text)?;
                self.adapter.dispatch_keys(&session, "\u{0016}\n").await.map_err(adapter_err)
            }
            InjectionMethod::OsKeySend => self.gui.key_send(text).await.map_err(|e| e.to_string()),
            InjectionMethod::TmuxSend => tmux::send_to_session(conversation_id.as_str(), text).await.map_err(|e| e.to_string()),
            InjectionMethod::ScriptedGuiAutomation => self.gui.scripted_submit(text).await.map_err(|e| e.to_string()),
            InjectionMethod::ClipboardOnly => set_clipboard(text),
        }
    }

    /// `QueueInject(conv, text)`: appends to the per-conversation queue
    /// without injecting immediately.
    pub fn queue_inject(&self, conversation_id: ConversationId, text: String) {
        self.queues.lock().entry(conversation_id).or_default().push_back(text);
    }

    /// `DrainQueue(conv)`: injects queued items in order with a fixed
    /// inter-item delay, stopping at the first failure (the remaining
    /// items stay queued for a later drain).
    pub async fn drain_queue(&self, conversation_id: ConversationId, inter_item_delay: Duration) -> Result<usize, InjectionError> {
        let mut drained = 0;
        loop {
            let next = self.queues.lock().get_mut(&conversation_id).and_then(VecDeque::pop_front);
            let Some(text) = next else { break };
            self.inject(Some(conversation_id.clone()), &text).await?;
            drained += 1;
            tokio::time::sleep(inter_item_delay).await;
        }
        info!(%conversation_id, drained, "queue drained");
        Ok(drained)
    }
}

fn adapter_err(e: AdapterError) -> String {
    e.to_string()
}

fn set_clipboard(text: &str) -> Result<(), String> {
    let mut clipboard = Clipboard::new().map_err(|e| e.to_string())?;
    clipboard.set_text(text.to_string()).map_err(|e| e.to_string())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
