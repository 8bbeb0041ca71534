//! Typed command groups over a [`Transport`](crate::transport::Transport).
//!
//! Every method prefixes keys, serializes arguments, runs exactly one
//! transport command and decodes the reply. Faults come back as
//! `Err(RedwrapError)`; nothing is raised past this layer.

pub mod hash;
pub mod pubsub;
pub mod set;
pub mod string;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::RedwrapResult;
use crate::keys::KeyPrefix;
use crate::serializer::{JsonSerializer, Serializer, collect_decoded};
use crate::transport::redis::RedisTransport;

pub use hash::HashCommands;
pub use pubsub::PubSubCommands;
pub use set::SetCommands;
pub use string::StringCommands;

/// Entry point: a transport, a key namespace and a serializer.
#[derive(Debug, Clone)]
pub struct Redis<T, S = JsonSerializer> {
    transport: T,
    prefix: KeyPrefix,
    serializer: S,
}

impl<T> Redis<T, JsonSerializer> {
    pub fn new(transport: T, prefix: impl Into<KeyPrefix>) -> Self {
        Self::with_serializer(transport, prefix, JsonSerializer)
    }
}

impl Redis<RedisTransport, JsonSerializer> {
    /// Client for the server named in `config`. Connects lazily.
    pub fn connect(config: &Config) -> RedwrapResult<Self> {
        let transport = RedisTransport::from_config(config)?;
        Ok(Self::new(transport, config.prefix()))
    }
}

impl<T, S: Serializer> Redis<T, S> {
    pub fn with_serializer(transport: T, prefix: impl Into<KeyPrefix>, serializer: S) -> Self {
        Redis {
            transport,
            prefix: prefix.into(),
            serializer,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn prefix(&self) -> &KeyPrefix {
        &self.prefix
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    pub fn strings(&self) -> StringCommands<'_, T, S> {
        StringCommands { redis: self }
    }

    pub fn sets(&self) -> SetCommands<'_, T, S> {
        SetCommands { redis: self }
    }

    pub fn hashes(&self) -> HashCommands<'_, T, S> {
        HashCommands { redis: self }
    }

    pub fn pubsub(&self) -> PubSubCommands<'_, T, S> {
        PubSubCommands { redis: self }
    }

    pub(crate) fn key(&self, key: &str) -> String {
        self.prefix.apply(key)
    }

    pub(crate) fn encode<V: Serialize>(&self, value: &V) -> RedwrapResult<Vec<u8>> {
        Ok(self.serializer.serialize(value)?.to_vec())
    }

    pub(crate) fn encode_all<V: Serialize>(&self, values: &[V]) -> RedwrapResult<Vec<Vec<u8>>> {
        values.iter().map(|v| self.encode(v)).collect()
    }

    /// Point-read decode: a missing reply is `None`, a bad one is an error.
    pub(crate) fn decode<V: DeserializeOwned>(&self, wire: Option<Vec<u8>>) -> RedwrapResult<Option<V>> {
        match wire {
            Some(bytes) => self.serializer.deserialize(&bytes),
            None => Ok(None),
        }
    }

    /// Bulk-read decode. Undecodable elements are dropped, not reported.
    pub(crate) fn decode_all<V, I>(&self, wires: I) -> Vec<V>
    where
        V: DeserializeOwned,
        I: IntoIterator<Item = Vec<u8>>,
    {
        collect_decoded(wires.into_iter().map(|w| self.serializer.deserialize(&w))).into_values()
    }
}
