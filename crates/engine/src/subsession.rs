// SPDX-License-Identifier: MIT

//! Sub-session Tracker (§4.I): links child conversations spawned naturally
//! by the assistant (not via the Worker Pool) to their parent, and lifts a
//! child's final reply into the parent once it has gone quiet.

use std::collections::HashMap;

use dc_adapters::{DebugAdapter, GuiAutomation, InjectionEngine};
use dc_core::{ConversationId, ErrorKind, SubSessionLink, SubSessionStatus, LIFTED_REPLY_MARKER};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Inactivity before an active link moves to `completing` (§4.I).
pub const COMPLETING_THRESHOLD_MS: i64 = 60_000;
/// Further inactivity (on top of the above) before `completing` becomes
/// `completed` and the reply is lifted.
pub const COMPLETED_THRESHOLD_MS: i64 = 30_000;
/// Window after a parent's tool-spawn event during which a newly observed
/// conversation is auto-linked as that parent's child, when enabled.
pub const AUTO_LINK_WINDOW_MS: i64 = 10_000;

#[derive(Debug, Error)]
pub enum SubSessionError {
    #[error("sub-session link not found: {0}")]
    NotFound(String),
}

impl SubSessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SubSessionError::NotFound(m) => ErrorKind::NotFound(m.clone()),
        }
    }
}

struct PendingSpawn {
    parent_id: ConversationId,
    observed_at_ms: i64,
}

/// Tracks sub-session links and lifts completed children's replies into
/// their parent via the Injection Engine. Callers drive it with a 5 s
/// poll tick (§4.I); there is no internally owned background task.
pub struct SubSessionTracker<A, G> {
    injection: std::sync::Arc<InjectionEngine<A, G>>,
    links: Mutex<HashMap<ConversationId, SubSessionLink>>,
    auto_link_enabled: Mutex<bool>,
    pending_spawns: Mutex<Vec<PendingSpawn>>,
    events: broadcast::Sender<dc_core::Event>,
}

impl<A: DebugAdapter, G: GuiAutomation> SubSessionTracker<A, G> {
    pub fn new(injection: std::sync::Arc<InjectionEngine<A, G>>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            injection,
            links: Mutex::new(HashMap::new()),
            auto_link_enabled: Mutex::new(false),
            pending_spawns: Mutex::new(Vec::new()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<dc_core::Event> {
        self.events.subscribe()
    }

    pub fn set_auto_link_enabled(&self, enabled: bool) {
        *self.auto_link_enabled.lock() = enabled;
    }

    /// `Link(childId, parentId, toolInvocationId?)`: registers an explicit
    /// link (Worker Pool spawns go through here too, so their children are
    /// also tracked for inactivity-based lifting).
    pub fn link(&self, child_id: ConversationId, parent_id: ConversationId, originating_tool_invocation_id: Option<String>, now_ms: i64) {
        let link = SubSessionLink {
            child_id: child_id.clone(),
            parent_id: parent_id.clone(),
            originating_tool_invocation_id,
            status: SubSessionStatus::Active,
            last_activity_ms: now_ms,
            last_assistant_message: None,
        };
        self.links.lock().insert(child_id.clone(), link);
        let _ = self.events.send(dc_core::Event::SubsessionLinked { child_id, parent_id });
    }

    pub fn get(&self, child_id: &ConversationId) -> Option<SubSessionLink> {
        self.links.lock().get(child_id).cloned()
    }

    pub fn list(&self) -> Vec<SubSessionLink> {
        self.links.lock().values().cloned().collect()
    }

    /// `Unlink(childId)` (`DELETE /api/subsessions/:id`): drops the link
    /// without lifting whatever reply it last observed.
    pub fn unlink(&self, child_id: &ConversationId) -> Result<(), SubSessionError> {
        self.links.lock().remove(child_id).map(|_| ()).ok_or_else(|| SubSessionError::NotFound(child_id.to_string()))
    }

    pub fn auto_link_enabled(&self) -> bool {
        *self.auto_link_enabled.lock()
    }

    /// Records that `parent_id` just caused a tool-spawn event; any
    /// conversation observed by `maybe_auto_link` within
    /// [`AUTO_LINK_WINDOW_MS`] is linked to it.
    pub fn record_tool_spawn(&self, parent_id: ConversationId, now_ms: i64) {
        self.pending_spawns.lock().push(PendingSpawn { parent_id, observed_at_ms: now_ms });
    }

    /// Called when a previously-unseen conversation id is observed
    /// (typically by the Session Coordinator's list poller). Links it to
    /// the most recent pending tool-spawn still inside the auto-link
    /// window, if auto-link is enabled.
    pub fn maybe_auto_link(&self, child_id: ConversationId, now_ms: i64) {
        if !*self.auto_link_enabled.lock() {
            return;
        }
        let parent = {
            let mut pending = self.pending_spawns.lock();
            pending.retain(|p| now_ms - p.observed_at_ms <= AUTO_LINK_WINDOW_MS);
            pending.iter().rev().find(|p| now_ms - p.observed_at_ms <= AUTO_LINK_WINDOW_MS).map(|p| p.parent_id.clone())
        };
        if let Some(parent_id) = parent {
            self.link(child_id, parent_id, None, now_ms);
        }
    }

    /// Feeds the most recent assistant message content for `child_id`,
    /// bumping its `last_activity_ms`. Called each poll tick with whatever
    /// the caller already fetched via the Adapter's transcript.
    pub fn note_activity(&self, child_id: &ConversationId, last_assistant_message: Option<String>, now_ms: i64) {
        if let Some(link) = self.links.lock().get_mut(child_id) {
            if link.status == SubSessionStatus::Active || link.status == SubSessionStatus::Completing {
                link.last_activity_ms = now_ms;
                if link.status == SubSessionStatus::Completing {
                    link.status = SubSessionStatus::Active;
                }
            }
            if let Some(message) = last_assistant_message {
                link.last_assistant_message = Some(message);
            }
        }
    }

    /// One monitoring tick (§4.I: "polls each linked child every 5 s").
    /// `parent_exists` answers whether `link.parent_id` is still a live
    /// conversation, so the caller supplies it (the Tracker doesn't own the
    /// Session Coordinator's registry).
    pub async fn poll(&self, now_ms: i64, parent_exists: impl Fn(&ConversationId) -> bool) -> Result<(), SubSessionError> {
        let due: Vec<ConversationId> = self
            .links
            .lock()
            .values()
            .filter(|l| matches!(l.status, SubSessionStatus::Active | SubSessionStatus::Completing))
            .map(|l| l.child_id.clone())
            .collect();

        for child_id in due {
            self.poll_one(&child_id, now_ms, &parent_exists).await?;
        }
        Ok(())
    }

    async fn poll_one(&self, child_id: &ConversationId, now_ms: i64, parent_exists: &impl Fn(&ConversationId) -> bool) -> Result<(), SubSessionError> {
        let snapshot = self.links.lock().get(child_id).cloned().ok_or_else(|| SubSessionError::NotFound(child_id.to_string()))?;

        if !parent_exists(&snapshot.parent_id) {
            if let Some(link) = self.links.lock().get_mut(child_id) {
                link.status = SubSessionStatus::Orphaned;
            }
            warn!(%child_id, "parent conversation gone, marking orphaned");
            let _ = self.events.send(dc_core::Event::SubsessionOrphaned { child_id: child_id.clone() });
            return Ok(());
        }

        let idle_ms = now_ms - snapshot.last_activity_ms;

        match snapshot.status {
            SubSessionStatus::Active if idle_ms >= COMPLETING_THRESHOLD_MS => {
                if let Some(link) = self.links.lock().get_mut(child_id) {
                    link.status = SubSessionStatus::Completing;
                }
                info!(%child_id, idle_ms, "sub-session inactive, marking completing");
                let _ = self.events.send(dc_core::Event::SubsessionCompleting { child_id: child_id.clone() });
            }
            SubSessionStatus::Completing if idle_ms >= COMPLETING_THRESHOLD_MS + COMPLETED_THRESHOLD_MS => {
                self.complete_and_lift(&snapshot, now_ms).await?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn complete_and_lift(&self, snapshot: &SubSessionLink, now_ms: i64) -> Result<(), SubSessionError> {
        if let Some(link) = self.links.lock().get_mut(&snapshot.child_id) {
            link.status = SubSessionStatus::Completed;
        }
        let _ = self.events.send(dc_core::Event::SubsessionCompleted { child_id: snapshot.child_id.clone() });

        if let Some(reply) = &snapshot.last_assistant_message {
            let lifted = format!("{LIFTED_REPLY_MARKER} {reply}");
            match self.injection.inject(Some(snapshot.parent_id.clone()), &lifted).await {
                Ok(_) => {
                    if let Some(link) = self.links.lock().get_mut(&snapshot.child_id) {
                        link.status = SubSessionStatus::Returned;
                        link.last_activity_ms = now_ms;
                    }
                    let _ = self.events.send(dc_core::Event::SubsessionReturned {
                        child_id: snapshot.child_id.clone(),
                        parent_id: snapshot.parent_id.clone(),
                    });
                }
                Err(err) => {
                    warn!(child_id = %snapshot.child_id, %err, "failed to lift sub-session reply into parent");
                    if let Some(link) = self.links.lock().get_mut(&snapshot.child_id) {
                        link.status = SubSessionStatus::Error;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "subsession_tests.rs"]
mod tests;
