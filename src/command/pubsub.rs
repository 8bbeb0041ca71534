use serde::Serialize;

use super::Redis;
use crate::error::RedwrapResult;
use crate::pubsub::{Subscriber, SubscriptionHandle};
use crate::serializer::Serializer;
use crate::transport::{AsyncTransport, Transport};

/// PUBLISH / SUBSCRIBE / PSUBSCRIBE. Channel names are used as given, without
/// the key prefix.
pub struct PubSubCommands<'a, T, S> {
    pub(super) redis: &'a Redis<T, S>,
}

impl<T: Transport, S: Serializer> PubSubCommands<'_, T, S> {
    /// Register the subscriber's handler. The subscription lasts as long as
    /// the returned handle.
    pub fn subscribe(&self, subscriber: &dyn Subscriber) -> RedwrapResult<SubscriptionHandle> {
        Transport::subscribe(&self.redis.transport, subscriber.subscription())
    }

    /// Publish a serialized message. Returns the number of receivers.
    pub fn publish<V: Serialize>(&self, channel: &str, message: &V) -> RedwrapResult<usize> {
        let wire = self.redis.encode(message)?;
        Transport::publish(&self.redis.transport, channel, &wire)
    }
}

impl<T: AsyncTransport, S: Serializer> PubSubCommands<'_, T, S> {
    pub async fn subscribe_async(&self, subscriber: &dyn Subscriber) -> RedwrapResult<SubscriptionHandle> {
        AsyncTransport::subscribe(&self.redis.transport, subscriber.subscription()).await
    }

    pub async fn publish_async<V: Serialize>(&self, channel: &str, message: &V) -> RedwrapResult<usize> {
        let wire = self.redis.encode(message)?;
        AsyncTransport::publish(&self.redis.transport, channel, &wire).await
    }
}
