//! In-process transport.
//!
//! Implements the command surface the wrappers use over a local keyspace so
//! the adapter can run without a server (tests, offline tooling). Faults can
//! be injected to exercise the error paths.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::error::{RedwrapError, RedwrapResult};
use crate::pubsub::{PubSubRegistry, Subscription, SubscriptionHandle};
use crate::store::Database;
use crate::store::entry::{Entry, now_millis};
use crate::types::StoredValue;
use crate::types::hash::StoredHash;
use crate::types::rstring::StoredString;
use crate::types::set::StoredSet;

use super::{AsyncTransport, SetOp, Transport, expiry_millis};

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

fn wrong_type() -> RedwrapError {
    RedwrapError::transport(WRONG_TYPE)
}

/// Shared in-memory keyspace. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryTransport {
    db: Arc<RwLock<Database>>,
    pubsub: Arc<Mutex<PubSubRegistry>>,
    fault: Arc<RwLock<Option<String>>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        MemoryTransport {
            db: Arc::new(RwLock::new(Database::new())),
            pubsub: Arc::new(Mutex::new(PubSubRegistry::new())),
            fault: Arc::new(RwLock::new(None)),
        }
    }

    /// Make every following call fail with `message` until [`clear_fault`].
    ///
    /// [`clear_fault`]: MemoryTransport::clear_fault
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.fault.write() = Some(message.into());
    }

    pub fn clear_fault(&self) {
        *self.fault.write() = None;
    }

    /// Remaining time-to-live of a key in milliseconds (-1 no expiry, None missing).
    pub fn ttl_millis(&self, key: &str) -> Option<i64> {
        self.db.write().get(key).map(|e| e.ttl_millis())
    }

    pub fn key_type(&self, key: &str) -> Option<&'static str> {
        self.db.write().key_type(key)
    }

    pub fn len(&self) -> usize {
        self.db.read().dbsize()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscriber_count(&self) -> usize {
        self.pubsub.lock().len()
    }

    fn check(&self, command: &str) -> RedwrapResult<()> {
        debug!("memory {command}");
        match self.fault.read().as_ref() {
            Some(message) => Err(RedwrapError::transport(message.clone())),
            None => Ok(()),
        }
    }

    fn read_set(db: &mut Database, key: &str) -> RedwrapResult<StoredSet> {
        match db.get(key) {
            Some(entry) => entry.value.as_set().cloned().ok_or_else(wrong_type),
            None => Ok(StoredSet::new()),
        }
    }

    fn with_hash<R>(&self, key: &str, f: impl FnOnce(Option<&StoredHash>) -> R) -> RedwrapResult<R> {
        let mut db = self.db.write();
        match db.get(key) {
            Some(entry) => entry.value.as_hash().map(|h| f(Some(h))).ok_or_else(wrong_type),
            None => Ok(f(None)),
        }
    }
}

impl Transport for MemoryTransport {
    fn get(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>> {
        self.check("GET")?;
        let mut db = self.db.write();
        match db.get(key) {
            Some(entry) => match entry.value.as_string() {
                Some(s) => Ok(Some(s.as_bytes().to_vec())),
                None => Err(wrong_type()),
            },
            None => Ok(None),
        }
    }

    fn mget(&self, keys: &[String]) -> RedwrapResult<Vec<Option<Vec<u8>>>> {
        self.check("MGET")?;
        let mut db = self.db.write();
        // non-string values read as nil, as MGET does
        Ok(keys
            .iter()
            .map(|key| {
                db.get(key)
                    .and_then(|e| e.value.as_string())
                    .map(|s| s.as_bytes().to_vec())
            })
            .collect())
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> RedwrapResult<()> {
        self.check("SET")?;
        let value = StoredValue::String(StoredString::from(value));
        let entry = match ttl {
            Some(ttl) => {
                let deadline = now_millis()
                    .checked_add(expiry_millis(ttl)?)
                    .ok_or_else(|| RedwrapError::Config(format!("ttl of {ttl:?} is out of range")))?;
                Entry::with_expiry(value, deadline)
            }
            None => Entry::new(value),
        };
        self.db.write().set(key.to_string(), entry);
        Ok(())
    }

    fn del(&self, key: &str) -> RedwrapResult<bool> {
        self.check("DEL")?;
        Ok(self.db.write().del(key))
    }

    fn exists(&self, key: &str) -> RedwrapResult<bool> {
        self.check("EXISTS")?;
        Ok(self.db.write().exists(key))
    }

    fn sadd(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize> {
        self.check("SADD")?;
        let mut db = self.db.write();
        let set = db
            .get_or_insert_with(key, || StoredValue::Set(StoredSet::new()))
            .as_set_mut()
            .ok_or_else(wrong_type)?;
        let added = members.iter().filter(|m| set.add(m.to_vec())).count();
        db.remove_if_empty(key);
        Ok(added)
    }

    fn srem(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize> {
        self.check("SREM")?;
        let mut db = self.db.write();
        let removed = match db.get_mut(key) {
            Some(entry) => {
                let set = entry.value.as_set_mut().ok_or_else(wrong_type)?;
                members.iter().filter(|m| set.remove(m)).count()
            }
            None => 0,
        };
        db.remove_if_empty(key);
        Ok(removed)
    }

    fn smembers(&self, key: &str) -> RedwrapResult<Vec<Vec<u8>>> {
        self.check("SMEMBERS")?;
        let mut db = self.db.write();
        Ok(Self::read_set(&mut db, key)?.members())
    }

    fn sismember(&self, key: &str, member: &[u8]) -> RedwrapResult<bool> {
        self.check("SISMEMBER")?;
        let mut db = self.db.write();
        match db.get(key) {
            Some(entry) => entry
                .value
                .as_set()
                .map(|s| s.contains(member))
                .ok_or_else(wrong_type),
            None => Ok(false),
        }
    }

    fn srandmember(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>> {
        self.check("SRANDMEMBER")?;
        let mut db = self.db.write();
        match db.get(key) {
            Some(entry) => entry
                .value
                .as_set()
                .map(|s| s.random_member().cloned())
                .ok_or_else(wrong_type),
            None => Ok(None),
        }
    }

    fn scombine(&self, op: SetOp, first: &str, second: &str) -> RedwrapResult<Vec<Vec<u8>>> {
        self.check(op.command_name())?;
        let mut db = self.db.write();
        let a = Self::read_set(&mut db, first)?;
        let b = Self::read_set(&mut db, second)?;
        let combined = match op {
            SetOp::Union => a.union(&b),
            SetOp::Intersect => a.intersect(&b),
            SetOp::Difference => a.difference(&b),
        };
        Ok(combined.members())
    }

    fn hget(&self, key: &str, field: &str) -> RedwrapResult<Option<Vec<u8>>> {
        self.check("HGET")?;
        self.with_hash(key, |h| h.and_then(|h| h.get(field).cloned()))
    }

    fn hset(&self, key: &str, field: &str, value: &[u8]) -> RedwrapResult<bool> {
        self.check("HSET")?;
        let mut db = self.db.write();
        let hash = db
            .get_or_insert_with(key, || StoredValue::Hash(StoredHash::new()))
            .as_hash_mut()
            .ok_or_else(wrong_type)?;
        Ok(hash.set(field.to_string(), value.to_vec()))
    }

    fn hdel(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        self.check("HDEL")?;
        let mut db = self.db.write();
        let removed = match db.get_mut(key) {
            Some(entry) => entry.value.as_hash_mut().ok_or_else(wrong_type)?.del(field),
            None => false,
        };
        db.remove_if_empty(key);
        Ok(removed)
    }

    fn hexists(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        self.check("HEXISTS")?;
        self.with_hash(key, |h| h.is_some_and(|h| h.exists(field)))
    }

    fn hgetall(&self, key: &str) -> RedwrapResult<Vec<(String, Vec<u8>)>> {
        self.check("HGETALL")?;
        self.with_hash(key, |h| h.map(StoredHash::entries).unwrap_or_default())
    }

    fn publish(&self, channel: &str, payload: &[u8]) -> RedwrapResult<usize> {
        self.check("PUBLISH")?;
        // handlers run outside the lock so they may publish or subscribe themselves
        let receivers = self.pubsub.lock().matching(channel);
        for subscription in &receivers {
            subscription.invoke(channel, payload);
        }
        Ok(receivers.len())
    }

    fn subscribe(&self, subscription: Subscription) -> RedwrapResult<SubscriptionHandle> {
        self.check("SUBSCRIBE")?;
        let name = subscription.name().to_string();
        let id = self.pubsub.lock().subscribe(subscription);
        let registry = Arc::clone(&self.pubsub);
        Ok(SubscriptionHandle::new(name, move || {
            registry.lock().unsubscribe(id);
        }))
    }
}

#[async_trait]
impl AsyncTransport for MemoryTransport {
    async fn get(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>> {
        Transport::get(self, key)
    }

    async fn mget(&self, keys: &[String]) -> RedwrapResult<Vec<Option<Vec<u8>>>> {
        Transport::mget(self, keys)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> RedwrapResult<()> {
        Transport::set(self, key, value, ttl)
    }

    async fn del(&self, key: &str) -> RedwrapResult<bool> {
        Transport::del(self, key)
    }

    async fn exists(&self, key: &str) -> RedwrapResult<bool> {
        Transport::exists(self, key)
    }

    async fn sadd(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize> {
        Transport::sadd(self, key, members)
    }

    async fn srem(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize> {
        Transport::srem(self, key, members)
    }

    async fn smembers(&self, key: &str) -> RedwrapResult<Vec<Vec<u8>>> {
        Transport::smembers(self, key)
    }

    async fn sismember(&self, key: &str, member: &[u8]) -> RedwrapResult<bool> {
        Transport::sismember(self, key, member)
    }

    async fn srandmember(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>> {
        Transport::srandmember(self, key)
    }

    async fn scombine(&self, op: SetOp, first: &str, second: &str) -> RedwrapResult<Vec<Vec<u8>>> {
        Transport::scombine(self, op, first, second)
    }

    async fn hget(&self, key: &str, field: &str) -> RedwrapResult<Option<Vec<u8>>> {
        Transport::hget(self, key, field)
    }

    async fn hset(&self, key: &str, field: &str, value: &[u8]) -> RedwrapResult<bool> {
        Transport::hset(self, key, field, value)
    }

    async fn hdel(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        Transport::hdel(self, key, field)
    }

    async fn hexists(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        Transport::hexists(self, key, field)
    }

    async fn hgetall(&self, key: &str) -> RedwrapResult<Vec<(String, Vec<u8>)>> {
        Transport::hgetall(self, key)
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> RedwrapResult<usize> {
        Transport::publish(self, channel, payload)
    }

    async fn subscribe(&self, subscription: Subscription) -> RedwrapResult<SubscriptionHandle> {
        Transport::subscribe(self, subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(list: &[&str]) -> Vec<Vec<u8>> {
        list.iter().map(|m| m.as_bytes().to_vec()).collect()
    }

    #[test]
    fn test_string_commands() {
        let t = MemoryTransport::new();
        assert_eq!(Transport::get(&t, "k").unwrap(), None);
        Transport::set(&t, "k", b"v", None).unwrap();
        assert_eq!(Transport::get(&t, "k").unwrap(), Some(b"v".to_vec()));
        assert!(Transport::exists(&t, "k").unwrap());
        assert_eq!(t.ttl_millis("k"), Some(-1));
        assert!(Transport::del(&t, "k").unwrap());
        assert!(!Transport::exists(&t, "k").unwrap());
    }

    #[test]
    fn test_set_with_ttl() {
        let t = MemoryTransport::new();
        Transport::set(&t, "k", b"v", Some(Duration::from_secs(60))).unwrap();
        let ttl = t.ttl_millis("k").unwrap();
        assert!(ttl > 0 && ttl <= 60_000);
    }

    #[test]
    fn test_zero_ttl_lives_one_millisecond() {
        let t = MemoryTransport::new();
        Transport::set(&t, "k", b"v", Some(Duration::ZERO)).unwrap();
        std::thread::sleep(Duration::from_millis(5));
        assert!(!Transport::exists(&t, "k").unwrap());
    }

    #[test]
    fn test_out_of_range_ttl_is_an_error() {
        let t = MemoryTransport::new();
        let err = Transport::set(&t, "k", b"v", Some(Duration::MAX)).unwrap_err();
        assert!(matches!(err, RedwrapError::Config(_)));
        assert!(!Transport::exists(&t, "k").unwrap());

        let week = Duration::from_secs(7 * 24 * 3600);
        Transport::set(&t, "k", b"v", Some(week)).unwrap();
        let ttl = t.ttl_millis("k").unwrap();
        assert!(ttl > 0 && ttl <= week.as_millis() as i64);
    }

    #[test]
    fn test_wrong_type() {
        let t = MemoryTransport::new();
        Transport::sadd(&t, "s", &members(&["a"])).unwrap();
        let err = Transport::get(&t, "s").unwrap_err();
        assert_eq!(err.message(), WRONG_TYPE);
        assert!(Transport::hset(&t, "s", "f", b"v").is_err());
        // MGET reads non-strings as nil
        assert_eq!(Transport::mget(&t, &["s".to_string()]).unwrap(), vec![None]);
    }

    #[test]
    fn test_empty_collections_are_removed() {
        let t = MemoryTransport::new();
        Transport::sadd(&t, "s", &members(&["a"])).unwrap();
        assert_eq!(Transport::srem(&t, "s", &members(&["a", "b"])).unwrap(), 1);
        assert_eq!(t.key_type("s"), None);

        assert!(Transport::hset(&t, "h", "f", b"1").unwrap());
        assert!(!Transport::hset(&t, "h", "f", b"2").unwrap());
        assert!(Transport::hdel(&t, "h", "f").unwrap());
        assert!(t.is_empty());
    }

    #[test]
    fn test_scombine_missing_key_is_empty() {
        let t = MemoryTransport::new();
        Transport::sadd(&t, "a", &members(&["1", "2"])).unwrap();
        let mut union = Transport::scombine(&t, SetOp::Union, "a", "missing").unwrap();
        union.sort();
        assert_eq!(union, members(&["1", "2"]));
        assert!(Transport::scombine(&t, SetOp::Intersect, "a", "missing").unwrap().is_empty());
    }

    #[test]
    fn test_fault_injection() {
        let t = MemoryTransport::new();
        t.fail_with("connection reset by peer");
        let err = Transport::get(&t, "k").unwrap_err();
        assert_eq!(err, RedwrapError::transport("connection reset by peer"));
        t.clear_fault();
        assert!(Transport::get(&t, "k").is_ok());
    }

    #[test]
    fn test_publish_and_unsubscribe() {
        let t = MemoryTransport::new();
        let hits = Arc::new(Mutex::new(0usize));
        let counter = hits.clone();
        let handle = Transport::subscribe(
            &t,
            Subscription::channel("ch", move |_, _| *counter.lock() += 1),
        )
        .unwrap();
        assert_eq!(Transport::publish(&t, "ch", b"x").unwrap(), 1);
        assert_eq!(Transport::publish(&t, "other", b"x").unwrap(), 0);
        handle.unsubscribe();
        assert_eq!(Transport::publish(&t, "ch", b"x").unwrap(), 0);
        assert_eq!(*hits.lock(), 1);
        assert_eq!(t.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_async_delegates() {
        let t = MemoryTransport::new();
        AsyncTransport::set(&t, "k", b"v", None).await.unwrap();
        assert_eq!(AsyncTransport::get(&t, "k").await.unwrap(), Some(b"v".to_vec()));
        assert!(AsyncTransport::hset(&t, "h", "f", b"1").await.unwrap());
        assert_eq!(
            AsyncTransport::hgetall(&t, "h").await.unwrap(),
            vec![("f".to_string(), b"1".to_vec())]
        );
    }
}
