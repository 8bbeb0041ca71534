use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Redis;
use crate::error::RedwrapResult;
use crate::serializer::{Serializer, collect_decoded};
use crate::transport::{AsyncTransport, Transport};

/// HGET / HSET / HDEL / HEXISTS / HGETALL.
pub struct HashCommands<'a, T, S> {
    pub(super) redis: &'a Redis<T, S>,
}

impl<T, S: Serializer> HashCommands<'_, T, S> {
    fn decode_entries<V: DeserializeOwned>(&self, entries: Vec<(String, Vec<u8>)>) -> Vec<(String, V)> {
        let serializer = &self.redis.serializer;
        collect_decoded(entries.into_iter().map(|(field, wire)| {
            serializer
                .deserialize::<V>(&wire)
                .map(|v| v.map(|v| (field, v)))
        }))
        .into_values()
    }
}

impl<T: Transport, S: Serializer> HashCommands<'_, T, S> {
    /// Missing key or field is `Ok(None)`.
    pub fn get<V: DeserializeOwned>(&self, key: &str, field: &str) -> RedwrapResult<Option<V>> {
        let wire = Transport::hget(&self.redis.transport, &self.redis.key(key), field)?;
        self.redis.decode(wire)
    }

    /// True if the field did not exist before.
    pub fn set<V: Serialize>(&self, key: &str, field: &str, value: &V) -> RedwrapResult<bool> {
        let wire = self.redis.encode(value)?;
        Transport::hset(&self.redis.transport, &self.redis.key(key), field, &wire)
    }

    pub fn delete_field(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        Transport::hdel(&self.redis.transport, &self.redis.key(key), field)
    }

    pub fn exists(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        Transport::hexists(&self.redis.transport, &self.redis.key(key), field)
    }

    /// Every field whose value decodes; the others are skipped.
    pub fn get_all<V: DeserializeOwned>(&self, key: &str) -> RedwrapResult<Vec<(String, V)>> {
        let entries = Transport::hgetall(&self.redis.transport, &self.redis.key(key))?;
        Ok(self.decode_entries(entries))
    }
}

impl<T: AsyncTransport, S: Serializer> HashCommands<'_, T, S> {
    pub async fn get_async<V: DeserializeOwned>(&self, key: &str, field: &str) -> RedwrapResult<Option<V>> {
        let wire = AsyncTransport::hget(&self.redis.transport, &self.redis.key(key), field).await?;
        self.redis.decode(wire)
    }

    pub async fn set_async<V: Serialize>(&self, key: &str, field: &str, value: &V) -> RedwrapResult<bool> {
        let wire = self.redis.encode(value)?;
        AsyncTransport::hset(&self.redis.transport, &self.redis.key(key), field, &wire).await
    }

    pub async fn delete_field_async(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        AsyncTransport::hdel(&self.redis.transport, &self.redis.key(key), field).await
    }

    pub async fn exists_async(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        AsyncTransport::hexists(&self.redis.transport, &self.redis.key(key), field).await
    }

    pub async fn get_all_async<V: DeserializeOwned>(&self, key: &str) -> RedwrapResult<Vec<(String, V)>> {
        let entries = AsyncTransport::hgetall(&self.redis.transport, &self.redis.key(key)).await?;
        Ok(self.decode_entries(entries))
    }
}
