//! The seam between the command wrappers and a concrete client.
//!
//! Keys reaching a transport are already prefixed; values are already wire
//! values. Every method reports client faults as `RedwrapError::Transport`.

pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{RedwrapError, RedwrapResult};
use crate::pubsub::{Subscription, SubscriptionHandle};

/// Milliseconds for a `SET ... PX` expiry. Sub-millisecond TTLs round up to
/// 1 ms (the server rejects `PX 0`); anything past `i64::MAX` ms, which the
/// server cannot represent either, is a `Config` error.
pub(crate) fn expiry_millis(ttl: Duration) -> RedwrapResult<u64> {
    u64::try_from(ttl.as_millis())
        .ok()
        .filter(|&ms| ms <= i64::MAX as u64)
        .map(|ms| ms.max(1))
        .ok_or_else(|| RedwrapError::Config(format!("ttl of {ttl:?} is out of range")))
}

/// Set combinator applied by SUNION / SINTER / SDIFF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    Intersect,
    Difference,
}

impl SetOp {
    pub fn command_name(self) -> &'static str {
        match self {
            SetOp::Union => "SUNION",
            SetOp::Intersect => "SINTER",
            SetOp::Difference => "SDIFF",
        }
    }
}

impl std::str::FromStr for SetOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "union" | "sunion" => Ok(SetOp::Union),
            "intersect" | "inter" | "sinter" => Ok(SetOp::Intersect),
            "difference" | "diff" | "sdiff" => Ok(SetOp::Difference),
            other => Err(format!("unknown set operation '{other}'")),
        }
    }
}

/// Blocking command surface.
pub trait Transport: Send + Sync {
    fn get(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>>;
    fn mget(&self, keys: &[String]) -> RedwrapResult<Vec<Option<Vec<u8>>>>;
    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> RedwrapResult<()>;
    fn del(&self, key: &str) -> RedwrapResult<bool>;
    fn exists(&self, key: &str) -> RedwrapResult<bool>;

    fn sadd(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize>;
    fn srem(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize>;
    fn smembers(&self, key: &str) -> RedwrapResult<Vec<Vec<u8>>>;
    fn sismember(&self, key: &str, member: &[u8]) -> RedwrapResult<bool>;
    fn srandmember(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>>;
    fn scombine(&self, op: SetOp, first: &str, second: &str) -> RedwrapResult<Vec<Vec<u8>>>;

    fn hget(&self, key: &str, field: &str) -> RedwrapResult<Option<Vec<u8>>>;
    fn hset(&self, key: &str, field: &str, value: &[u8]) -> RedwrapResult<bool>;
    fn hdel(&self, key: &str, field: &str) -> RedwrapResult<bool>;
    fn hexists(&self, key: &str, field: &str) -> RedwrapResult<bool>;
    fn hgetall(&self, key: &str) -> RedwrapResult<Vec<(String, Vec<u8>)>>;

    fn publish(&self, channel: &str, payload: &[u8]) -> RedwrapResult<usize>;
    fn subscribe(&self, subscription: Subscription) -> RedwrapResult<SubscriptionHandle>;
}

/// Async command surface, mirroring [`Transport`].
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    async fn get(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>>;
    async fn mget(&self, keys: &[String]) -> RedwrapResult<Vec<Option<Vec<u8>>>>;
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> RedwrapResult<()>;
    async fn del(&self, key: &str) -> RedwrapResult<bool>;
    async fn exists(&self, key: &str) -> RedwrapResult<bool>;

    async fn sadd(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize>;
    async fn srem(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize>;
    async fn smembers(&self, key: &str) -> RedwrapResult<Vec<Vec<u8>>>;
    async fn sismember(&self, key: &str, member: &[u8]) -> RedwrapResult<bool>;
    async fn srandmember(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>>;
    async fn scombine(&self, op: SetOp, first: &str, second: &str) -> RedwrapResult<Vec<Vec<u8>>>;

    async fn hget(&self, key: &str, field: &str) -> RedwrapResult<Option<Vec<u8>>>;
    async fn hset(&self, key: &str, field: &str, value: &[u8]) -> RedwrapResult<bool>;
    async fn hdel(&self, key: &str, field: &str) -> RedwrapResult<bool>;
    async fn hexists(&self, key: &str, field: &str) -> RedwrapResult<bool>;
    async fn hgetall(&self, key: &str) -> RedwrapResult<Vec<(String, Vec<u8>)>>;

    async fn publish(&self, channel: &str, payload: &[u8]) -> RedwrapResult<usize>;
    async fn subscribe(&self, subscription: Subscription) -> RedwrapResult<SubscriptionHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_op_parse() {
        assert_eq!("union".parse::<SetOp>(), Ok(SetOp::Union));
        assert_eq!("SINTER".parse::<SetOp>(), Ok(SetOp::Intersect));
        assert_eq!("diff".parse::<SetOp>(), Ok(SetOp::Difference));
        assert!("xor".parse::<SetOp>().is_err());
        assert_eq!(SetOp::Difference.command_name(), "SDIFF");
    }

    #[test]
    fn test_expiry_millis_bounds() {
        assert_eq!(expiry_millis(Duration::ZERO).unwrap(), 1);
        assert_eq!(expiry_millis(Duration::from_micros(10)).unwrap(), 1);
        assert_eq!(expiry_millis(Duration::from_millis(1500)).unwrap(), 1500);
        assert_eq!(expiry_millis(Duration::from_millis(i64::MAX as u64)).unwrap(), i64::MAX as u64);

        let err = expiry_millis(Duration::from_millis(i64::MAX as u64 + 1)).unwrap_err();
        assert!(matches!(err, RedwrapError::Config(_)));
        assert!(expiry_millis(Duration::MAX).is_err());
    }
}
