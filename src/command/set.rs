use serde::Serialize;
use serde::de::DeserializeOwned;

use super::Redis;
use crate::error::RedwrapResult;
use crate::serializer::Serializer;
use crate::transport::{AsyncTransport, SetOp, Transport};

/// SADD / SREM / SMEMBERS / SISMEMBER / SRANDMEMBER / SUNION / SINTER / SDIFF.
pub struct SetCommands<'a, T, S> {
    pub(super) redis: &'a Redis<T, S>,
}

impl<T: Transport, S: Serializer> SetCommands<'_, T, S> {
    /// Number of members that were not already present.
    pub fn add<V: Serialize>(&self, key: &str, members: &[V]) -> RedwrapResult<usize> {
        let wires = self.redis.encode_all(members)?;
        Transport::sadd(&self.redis.transport, &self.redis.key(key), &wires)
    }

    pub fn remove<V: Serialize>(&self, key: &str, members: &[V]) -> RedwrapResult<usize> {
        let wires = self.redis.encode_all(members)?;
        Transport::srem(&self.redis.transport, &self.redis.key(key), &wires)
    }

    /// All members that decode. Undecodable members are silently skipped.
    pub fn members<V: DeserializeOwned>(&self, key: &str) -> RedwrapResult<Vec<V>> {
        let wires = Transport::smembers(&self.redis.transport, &self.redis.key(key))?;
        Ok(self.redis.decode_all(wires))
    }

    pub fn contains<V: Serialize>(&self, key: &str, member: &V) -> RedwrapResult<bool> {
        let wire = self.redis.encode(member)?;
        Transport::sismember(&self.redis.transport, &self.redis.key(key), &wire)
    }

    pub fn random_member<V: DeserializeOwned>(&self, key: &str) -> RedwrapResult<Option<V>> {
        let wire = Transport::srandmember(&self.redis.transport, &self.redis.key(key))?;
        self.redis.decode(wire)
    }

    /// Combine two sets server-side. Elements that fail to decode are dropped.
    pub fn combine<V: DeserializeOwned>(&self, first: &str, second: &str, op: SetOp) -> RedwrapResult<Vec<V>> {
        let wires = Transport::scombine(
            &self.redis.transport,
            op,
            &self.redis.key(first),
            &self.redis.key(second),
        )?;
        Ok(self.redis.decode_all(wires))
    }
}

impl<T: AsyncTransport, S: Serializer> SetCommands<'_, T, S> {
    pub async fn add_async<V: Serialize>(&self, key: &str, members: &[V]) -> RedwrapResult<usize> {
        let wires = self.redis.encode_all(members)?;
        AsyncTransport::sadd(&self.redis.transport, &self.redis.key(key), &wires).await
    }

    pub async fn remove_async<V: Serialize>(&self, key: &str, members: &[V]) -> RedwrapResult<usize> {
        let wires = self.redis.encode_all(members)?;
        AsyncTransport::srem(&self.redis.transport, &self.redis.key(key), &wires).await
    }

    pub async fn members_async<V: DeserializeOwned>(&self, key: &str) -> RedwrapResult<Vec<V>> {
        let wires = AsyncTransport::smembers(&self.redis.transport, &self.redis.key(key)).await?;
        Ok(self.redis.decode_all(wires))
    }

    pub async fn contains_async<V: Serialize>(&self, key: &str, member: &V) -> RedwrapResult<bool> {
        let wire = self.redis.encode(member)?;
        AsyncTransport::sismember(&self.redis.transport, &self.redis.key(key), &wire).await
    }

    pub async fn random_member_async<V: DeserializeOwned>(&self, key: &str) -> RedwrapResult<Option<V>> {
        let wire = AsyncTransport::srandmember(&self.redis.transport, &self.redis.key(key)).await?;
        self.redis.decode(wire)
    }

    pub async fn combine_async<V: DeserializeOwned>(
        &self,
        first: &str,
        second: &str,
        op: SetOp,
    ) -> RedwrapResult<Vec<V>> {
        let wires = AsyncTransport::scombine(
            &self.redis.transport,
            op,
            &self.redis.key(first),
            &self.redis.key(second),
        )
        .await?;
        Ok(self.redis.decode_all(wires))
    }
}
