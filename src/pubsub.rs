//! Subscriptions: a channel (or channel pattern) paired with the callback the
//! transport invokes for every inbound message.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::error::RedwrapResult;
use crate::glob::channel_matches;
use crate::serializer::Serializer;

/// Callback invoked with `(channel, raw payload)`.
pub type MessageHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    /// Exact channel name (SUBSCRIBE).
    Channel,
    /// Glob pattern over channel names (PSUBSCRIBE).
    Pattern,
}

#[derive(Clone)]
pub struct Subscription {
    name: String,
    kind: SubscriptionKind,
    handler: MessageHandler,
}

impl Subscription {
    pub fn channel<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str, &[u8]) + Send + Sync + 'static,
    {
        Subscription {
            name: name.into(),
            kind: SubscriptionKind::Channel,
            handler: Arc::new(handler),
        }
    }

    pub fn pattern<F>(pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&str, &[u8]) + Send + Sync + 'static,
    {
        Subscription {
            name: pattern.into(),
            kind: SubscriptionKind::Pattern,
            handler: Arc::new(handler),
        }
    }

    /// Channel name, or the pattern for pattern subscriptions.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SubscriptionKind {
        self.kind
    }

    pub fn handler(&self) -> &MessageHandler {
        &self.handler
    }

    pub fn matches(&self, channel: &str) -> bool {
        match self.kind {
            SubscriptionKind::Channel => self.name == channel,
            SubscriptionKind::Pattern => channel_matches(&self.name, channel),
        }
    }

    /// Run the handler if `channel` belongs to this subscription. Returns
    /// whether it ran.
    pub fn invoke(&self, channel: &str, payload: &[u8]) -> bool {
        if !self.matches(channel) {
            return false;
        }
        (self.handler)(channel, payload);
        true
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Anything that can hand the transport a `(channel, handler)` pair.
pub trait Subscriber: Send + Sync {
    fn subscription(&self) -> Subscription;
}

impl Subscriber for Subscription {
    fn subscription(&self) -> Subscription {
        self.clone()
    }
}

/// Decode a message payload. Handlers call this themselves; the transport
/// never decodes payloads.
pub fn decode_payload<T, S>(serializer: &S, payload: &[u8]) -> RedwrapResult<Option<T>>
where
    T: DeserializeOwned,
    S: Serializer,
{
    serializer.deserialize(payload)
}

type CancelFn = Box<dyn FnOnce() + Send>;

/// Live subscription owned by the caller. Dropping it unsubscribes.
pub struct SubscriptionHandle {
    name: String,
    cancel: Option<CancelFn>,
}

impl SubscriptionHandle {
    pub fn new(name: impl Into<String>, cancel: impl FnOnce() + Send + 'static) -> Self {
        SubscriptionHandle {
            name: name.into(),
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            tracing::info!("unsubscribing from {}", self.name);
            cancel();
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("name", &self.name)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Subscription table for the in-memory transport.
pub struct PubSubRegistry {
    subscriptions: BTreeMap<u64, Subscription>,
    next_id: u64,
}

impl PubSubRegistry {
    pub fn new() -> Self {
        PubSubRegistry {
            subscriptions: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Register a subscription and return its id. Ids start at 1.
    pub fn subscribe(&mut self, subscription: Subscription) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.subscriptions.insert(id, subscription);
        id
    }

    pub fn unsubscribe(&mut self, id: u64) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Subscriptions that should receive a message on `channel`, in
    /// registration order. Callers invoke them after releasing the registry.
    pub fn matching(&self, channel: &str) -> Vec<Subscription> {
        self.subscriptions
            .values()
            .filter(|s| s.matches(channel))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl Default for PubSubRegistry {
    fn default() -> Self {
        Self::new()
    }
}
