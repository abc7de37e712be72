//! Session channel manager.
//!
//! Holds at most one live channel per peer name. A connect request from the
//! active tab supersedes whatever channel the peer held before; requests from
//! inactive tabs are rejected. All registry changes happen under a single
//! mutex, so a racing connect and disconnect always leave the registry and
//! the channel handles in agreement.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Browser tab hosting a page agent.
pub type TabId = u64;

/// Who is asking for a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderContext {
    pub tab_id: TabId,
    /// Whether the tab is the focused foreground tab.
    pub active: bool,
}

impl SenderContext {
    pub fn active(tab_id: TabId) -> Self {
        Self {
            tab_id,
            active: true,
        }
    }

    pub fn inactive(tab_id: TabId) -> Self {
        Self {
            tab_id,
            active: false,
        }
    }
}

/// One generation of a peer's channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelId {
    pub peer: String,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("connection for '{peer}' from tab {tab_id} rejected: tab is not active")]
    Rejected { peer: String, tab_id: TabId },

    #[error("transport error on channel '{peer}' (generation {generation}): {message}")]
    Transport {
        peer: String,
        generation: u64,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// A newer connection for the same peer took over.
    Superseded,
    /// Closed on request from either end.
    Disconnected,
    /// The transport reported an error.
    TransportError(String),
}

/// What the page-side end of a channel observes.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent<M> {
    Message(M),
    Closed(CloseReason),
}

/// Page-side end of a live channel.
///
/// Events arrive in the order they were sent. After teardown the channel
/// yields one `Closed` event and then `None`.
#[derive(Debug)]
pub struct Channel<M> {
    id: ChannelId,
    context: SenderContext,
    events: mpsc::UnboundedReceiver<ChannelEvent<M>>,
}

impl<M> Channel<M> {
    pub fn id(&self) -> &ChannelId {
        &self.id
    }

    pub fn context(&self) -> SenderContext {
        self.context
    }

    pub async fn recv(&mut self) -> Option<ChannelEvent<M>> {
        self.events.recv().await
    }

    /// Non-blocking variant of `recv`.
    pub fn try_recv(&mut self) -> Option<ChannelEvent<M>> {
        self.events.try_recv().ok()
    }
}

/// Snapshot of a live channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    pub peer: String,
    pub tab_id: TabId,
    pub generation: u64,
    pub connected_at: DateTime<Utc>,
}

struct LiveChannel<M> {
    generation: u64,
    context: SenderContext,
    connected_at: DateTime<Utc>,
    outbound: mpsc::UnboundedSender<ChannelEvent<M>>,
}

impl<M> LiveChannel<M> {
    /// Notify the page end and drop the sender, ending its stream.
    fn close(self, reason: CloseReason) {
        let _ = self.outbound.send(ChannelEvent::Closed(reason));
    }
}

struct Inner<M> {
    live: HashMap<String, LiveChannel<M>>,
    next_generation: u64,
}

/// Registry of live channels, keyed by peer name.
pub struct ChannelRegistry<M> {
    inner: Mutex<Inner<M>>,
}

impl<M> Default for ChannelRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ChannelRegistry<M> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                live: HashMap::new(),
                next_generation: 1,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<M>> {
        // Every critical section leaves the map consistent, so a poisoned
        // lock still guards valid data.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check the connection policy without touching the registry.
    pub fn admit(&self, peer: &str, context: &SenderContext) -> Result<(), ChannelError> {
        if context.active {
            Ok(())
        } else {
            Err(ChannelError::Rejected {
                peer: peer.to_string(),
                tab_id: context.tab_id,
            })
        }
    }

    /// Open a channel for `peer` on behalf of `context`.
    ///
    /// Only an active tab may connect. An existing live channel for the peer
    /// is closed with `CloseReason::Superseded` before the new one goes live.
    pub fn request_connect(&self, peer: &str, context: SenderContext) -> Result<Channel<M>, ChannelError> {
        if let Err(e) = self.admit(peer, &context) {
            debug!(peer, tab_id = context.tab_id, "Rejected connection from inactive tab");
            return Err(e);
        }

        let (outbound, events) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let generation = inner.next_generation;
        inner.next_generation += 1;

        let previous = inner.live.insert(
            peer.to_string(),
            LiveChannel {
                generation,
                context,
                connected_at: Utc::now(),
                outbound,
            },
        );
        drop(inner);

        if let Some(previous) = previous {
            info!(
                peer,
                old_tab = previous.context.tab_id,
                new_tab = context.tab_id,
                "Superseding channel"
            );
            previous.close(CloseReason::Superseded);
        }
        info!(peer, tab_id = context.tab_id, generation, "Channel connected");

        Ok(Channel {
            id: ChannelId {
                peer: peer.to_string(),
                generation,
            },
            context,
            events,
        })
    }

    /// Send `message` to whichever channel `peer` currently holds.
    ///
    /// Returns `false` if the message was dropped because nothing is live.
    pub fn send(&self, peer: &str, message: M) -> bool {
        let mut inner = self.lock();
        let Some(channel) = inner.live.get(peer) else {
            debug!(peer, "No live channel, dropping message");
            return false;
        };

        if channel.outbound.send(ChannelEvent::Message(message)).is_ok() {
            return true;
        }

        // Page end dropped without disconnecting
        let generation = channel.generation;
        inner.live.remove(peer);
        warn!(peer, generation, "Channel receiver gone, removed stale channel");
        false
    }

    /// Send only if `id` is still the live generation for its peer.
    pub fn send_on(&self, id: &ChannelId, message: M) -> bool {
        let mut inner = self.lock();
        let Some(channel) = inner
            .live
            .get(&id.peer)
            .filter(|channel| channel.generation == id.generation)
        else {
            debug!(peer = %id.peer, generation = id.generation, "Channel is stale, dropping message");
            return false;
        };

        if channel.outbound.send(ChannelEvent::Message(message)).is_ok() {
            return true;
        }

        inner.live.remove(&id.peer);
        warn!(peer = %id.peer, generation = id.generation, "Channel receiver gone, removed stale channel");
        false
    }

    /// Tear down whatever channel `peer` holds. Returns whether one was live.
    pub fn disconnect(&self, peer: &str) -> bool {
        let removed = self.lock().live.remove(peer);
        match removed {
            Some(channel) => {
                info!(peer, generation = channel.generation, "Channel disconnected");
                channel.close(CloseReason::Disconnected);
                true
            }
            None => false,
        }
    }

    /// Tear down the channel `id` if it is still the live generation.
    ///
    /// A stale handle never closes its successor.
    pub fn disconnect_channel(&self, id: &ChannelId) -> bool {
        match self.remove_exact(id) {
            Some(channel) => {
                info!(peer = %id.peer, generation = id.generation, "Channel disconnected");
                channel.close(CloseReason::Disconnected);
                true
            }
            None => false,
        }
    }

    /// Record a transport fault on `id` and tear the channel down.
    ///
    /// The fault is logged and never escalated.
    pub fn report_error(&self, id: &ChannelId, message: &str) -> ChannelError {
        let err = ChannelError::Transport {
            peer: id.peer.clone(),
            generation: id.generation,
            message: message.to_string(),
        };
        error!("{}", err);

        if let Some(channel) = self.remove_exact(id) {
            channel.close(CloseReason::TransportError(message.to_string()));
        }
        err
    }

    fn remove_exact(&self, id: &ChannelId) -> Option<LiveChannel<M>> {
        let mut inner = self.lock();
        let current = inner
            .live
            .get(&id.peer)
            .is_some_and(|channel| channel.generation == id.generation);
        if current {
            inner.live.remove(&id.peer)
        } else {
            None
        }
    }

    pub fn is_live(&self, peer: &str) -> bool {
        self.lock().live.contains_key(peer)
    }

    /// True if `id` is the live generation for its peer.
    pub fn is_current(&self, id: &ChannelId) -> bool {
        self.lock()
            .live
            .get(&id.peer)
            .is_some_and(|channel| channel.generation == id.generation)
    }

    /// Snapshot of all live channels, ordered by peer name.
    pub fn live_channels(&self) -> Vec<ChannelInfo> {
        let mut channels: Vec<ChannelInfo> = self
            .lock()
            .live
            .iter()
            .map(|(peer, channel)| ChannelInfo {
                peer: peer.clone(),
                tab_id: channel.context.tab_id,
                generation: channel.generation,
                connected_at: channel.connected_at,
            })
            .collect();
        channels.sort_by(|a, b| a.peer.cmp(&b.peer));
        channels
    }
}
