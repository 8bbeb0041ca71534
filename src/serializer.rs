//! Conversion between domain values and the opaque wire values kept in Redis.

use crate::error::{RedwrapError, RedwrapResult};
use crate::shape::check_json_shape;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use tracing::warn;

/// Serialized form of a value as stored in Redis.
pub type WireValue = Bytes;

pub trait Serializer: Send + Sync {
    /// Encode a value. Fails with `Serialization` for any value that
    /// `deserialize` could not give back, so nothing unreadable is stored.
    fn serialize<T: Serialize>(&self, value: &T) -> RedwrapResult<WireValue>;

    /// Decode a wire value. An empty wire value is `Ok(None)`.
    fn deserialize<T: DeserializeOwned>(&self, wire: &[u8]) -> RedwrapResult<Option<T>>;

    /// Element-wise decode that drops anything undecodable.
    fn deserialize_many<T, I, W>(&self, wires: I) -> Vec<T>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = W>,
        W: AsRef<[u8]>,
        Self: Sized,
    {
        collect_decoded(wires.into_iter().map(|w| self.deserialize::<T>(w.as_ref()))).into_values()
    }
}

/// JSON text encoding via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, value: &T) -> RedwrapResult<WireValue> {
        check_json_shape(value)?;
        Ok(Bytes::from(serde_json::to_vec(value)?))
    }

    fn deserialize<T: DeserializeOwned>(&self, wire: &[u8]) -> RedwrapResult<Option<T>> {
        if wire.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(wire)?))
    }
}

/// Outcome of a lenient batch decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<T> {
    pub values: Vec<T>,
    pub dropped: usize,
}

impl<T> Decoded<T> {
    pub fn into_values(self) -> Vec<T> {
        self.values
    }
}

/// Collect successes, drop failures and absent values.
///
/// Bulk reads go through here: a partial result is returned instead of an
/// error, so a caller cannot tell an undecodable element from a missing one.
/// The number of discarded elements is kept in `dropped` and logged.
pub fn collect_decoded<T, I>(results: I) -> Decoded<T>
where
    I: IntoIterator<Item = RedwrapResult<Option<T>>>,
{
    let mut values = Vec::new();
    let mut dropped = 0;
    for result in results {
        match result {
            Ok(Some(v)) => values.push(v),
            Ok(None) => dropped += 1,
            Err(e) => {
                tracing::debug!("dropping undecodable element: {e}");
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        warn!("batch decode dropped {dropped} element(s), kept {}", values.len());
    }
    Decoded { values, dropped }
}

type DecodeFn = Box<dyn Fn(&[u8]) -> RedwrapResult<Option<Box<dyn Any + Send>>> + Send + Sync>;

/// Decoders keyed by a runtime type name, for callers that only know the
/// target type at runtime.
#[derive(Default)]
pub struct TypeRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry {
            decoders: HashMap::new(),
        }
    }

    /// Register `T` under `name` using the given serializer. Replaces any
    /// previous decoder of the same name.
    pub fn register<T, S>(&mut self, name: impl Into<String>, serializer: S)
    where
        T: DeserializeOwned + Send + 'static,
        S: Serializer + 'static,
    {
        let decode: DecodeFn = Box::new(move |wire| {
            Ok(serializer
                .deserialize::<T>(wire)?
                .map(|v| Box::new(v) as Box<dyn Any + Send>))
        });
        self.decoders.insert(name.into(), decode);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn deserialize(&self, name: &str, wire: &[u8]) -> RedwrapResult<Option<Box<dyn Any + Send>>> {
        let decode = self
            .decoders
            .get(name)
            .ok_or_else(|| RedwrapError::serialization(format!("no decoder registered for type '{name}'")))?;
        decode(wire)
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry").field("types", &self.names()).finish()
    }
}
