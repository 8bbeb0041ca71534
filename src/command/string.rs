use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Redis;
use crate::error::RedwrapResult;
use crate::serializer::Serializer;
use crate::transport::{AsyncTransport, Transport};

/// GET / MGET / SET / DEL / EXISTS.
pub struct StringCommands<'a, T, S> {
    pub(super) redis: &'a Redis<T, S>,
}

impl<T: Transport, S: Serializer> StringCommands<'_, T, S> {
    /// Missing key is `Ok(None)`.
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> RedwrapResult<Option<V>> {
        let wire = Transport::get(&self.redis.transport, &self.redis.key(key))?;
        self.redis.decode(wire)
    }

    /// Values for every key that exists and decodes; the rest are skipped.
    pub fn get_many<V: DeserializeOwned, K: AsRef<str>>(&self, keys: &[K]) -> RedwrapResult<Vec<V>> {
        let keys = self.redis.prefix.apply_all(keys);
        let wires = Transport::mget(&self.redis.transport, &keys)?;
        Ok(self.redis.decode_all(wires.into_iter().flatten()))
    }

    pub fn set<V: Serialize>(&self, key: &str, value: &V) -> RedwrapResult<()> {
        let wire = self.redis.encode(value)?;
        Transport::set(&self.redis.transport, &self.redis.key(key), &wire, None)
    }

    pub fn set_with_ttl<V: Serialize>(&self, key: &str, value: &V, ttl: Duration) -> RedwrapResult<()> {
        let wire = self.redis.encode(value)?;
        Transport::set(&self.redis.transport, &self.redis.key(key), &wire, Some(ttl))
    }

    /// Removes a key of any type. True if something was removed.
    pub fn delete(&self, key: &str) -> RedwrapResult<bool> {
        Transport::del(&self.redis.transport, &self.redis.key(key))
    }

    pub fn exists(&self, key: &str) -> RedwrapResult<bool> {
        Transport::exists(&self.redis.transport, &self.redis.key(key))
    }
}

impl<T: AsyncTransport, S: Serializer> StringCommands<'_, T, S> {
    pub async fn get_async<V: DeserializeOwned>(&self, key: &str) -> RedwrapResult<Option<V>> {
        let wire = AsyncTransport::get(&self.redis.transport, &self.redis.key(key)).await?;
        self.redis.decode(wire)
    }

    pub async fn get_many_async<V: DeserializeOwned, K: AsRef<str>>(&self, keys: &[K]) -> RedwrapResult<Vec<V>> {
        let keys = self.redis.prefix.apply_all(keys);
        let wires = AsyncTransport::mget(&self.redis.transport, &keys).await?;
        Ok(self.redis.decode_all(wires.into_iter().flatten()))
    }

    pub async fn set_async<V: Serialize>(&self, key: &str, value: &V) -> RedwrapResult<()> {
        let wire = self.redis.encode(value)?;
        AsyncTransport::set(&self.redis.transport, &self.redis.key(key), &wire, None).await
    }

    pub async fn set_with_ttl_async<V: Serialize>(&self, key: &str, value: &V, ttl: Duration) -> RedwrapResult<()> {
        let wire = self.redis.encode(value)?;
        AsyncTransport::set(&self.redis.transport, &self.redis.key(key), &wire, Some(ttl)).await
    }

    pub async fn delete_async(&self, key: &str) -> RedwrapResult<bool> {
        AsyncTransport::del(&self.redis.transport, &self.redis.key(key)).await
    }

    pub async fn exists_async(&self, key: &str) -> RedwrapResult<bool> {
        AsyncTransport::exists(&self.redis.transport, &self.redis.key(key)).await
    }
}
