//! # Redwrap
//!
//! A typed, non-throwing adapter over a Redis client.
//!
//! Values are serialized on the way in and decoded on the way out, every key
//! is namespaced by a configured prefix, and every operation returns a
//! `Result` whose `Ok` side uses `Option` for missing keys. Transport faults
//! never escape as panics; they come back as [`RedwrapError`].
//!
//! ```no_run
//! use redwrap::{Config, Redis};
//!
//! # fn main() -> Result<(), redwrap::RedwrapError> {
//! let redis = Redis::connect(&Config::new("redis://127.0.0.1/", "app:"))?;
//! redis.strings().set("greeting", &"hello")?;
//! let greeting: Option<String> = redis.strings().get("greeting")?;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod glob;
pub mod keys;
pub mod pubsub;
pub mod serializer;
mod shape;
pub mod store;
pub mod transport;
pub mod types;

pub use command::Redis;
pub use config::Config;
pub use error::{RedwrapError, RedwrapResult};
pub use keys::KeyPrefix;
pub use pubsub::{Subscriber, Subscription, SubscriptionHandle};
pub use serializer::{JsonSerializer, Serializer, TypeRegistry};
pub use transport::memory::MemoryTransport;
pub use transport::redis::RedisTransport;
pub use transport::{AsyncTransport, SetOp, Transport};
