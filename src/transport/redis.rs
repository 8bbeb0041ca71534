//! Transport backed by the `redis` crate.
//!
//! Blocking calls share one `redis::Connection`, opened on first use and
//! reopened after an I/O fault. Async calls share one multiplexed
//! connection. Subscriptions get a dedicated connection each.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Commands, Connection, RedisResult};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{RedwrapError, RedwrapResult};
use crate::pubsub::{Subscription, SubscriptionHandle, SubscriptionKind};

use super::{AsyncTransport, SetOp, Transport, expiry_millis};

/// How often a blocking subscription thread wakes up to check for cancellation.
const SUBSCRIBE_POLL: Duration = Duration::from_millis(250);

pub struct RedisTransport {
    client: Client,
    blocking: Mutex<Option<Connection>>,
    multiplexed: OnceCell<MultiplexedConnection>,
}

impl RedisTransport {
    /// Parse the connection string. No connection is made until the first command.
    pub fn open(connection_string: &str) -> RedwrapResult<Self> {
        let client = Client::open(connection_string)?;
        Ok(RedisTransport {
            client,
            blocking: Mutex::new(None),
            multiplexed: OnceCell::new(),
        })
    }

    pub fn from_config(config: &Config) -> RedwrapResult<Self> {
        config.validate()?;
        Self::open(&config.connection_string)
    }

    fn with_connection<R>(&self, command: &str, f: impl FnOnce(&mut Connection) -> RedisResult<R>) -> RedwrapResult<R> {
        debug!("redis {command}");
        let mut slot = self.blocking.lock();
        if slot.is_none() {
            *slot = Some(self.client.get_connection()?);
        }
        let Some(conn) = slot.as_mut() else {
            return Err(RedwrapError::transport("connection unavailable"));
        };
        match f(conn) {
            Ok(value) => Ok(value),
            Err(e) => {
                if e.is_io_error() || e.is_connection_dropped() {
                    warn!("redis {command} failed, dropping connection: {e}");
                    *slot = None;
                }
                Err(e.into())
            }
        }
    }

    async fn connection(&self, command: &str) -> RedwrapResult<MultiplexedConnection> {
        debug!("redis {command}");
        let conn = self
            .multiplexed
            .get_or_try_init(|| self.client.get_multiplexed_async_connection())
            .await?;
        Ok(conn.clone())
    }
}

impl std::fmt::Debug for RedisTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTransport")
            .field("addr", self.client.get_connection_info())
            .finish_non_exhaustive()
    }
}

fn set_command(key: &str, value: &[u8], ttl: Option<Duration>) -> RedwrapResult<redis::Cmd> {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    if let Some(ttl) = ttl {
        cmd.arg("PX").arg(expiry_millis(ttl)?);
    }
    Ok(cmd)
}

fn combine_command(op: SetOp, first: &str, second: &str) -> redis::Cmd {
    let mut cmd = redis::cmd(op.command_name());
    cmd.arg(first).arg(second);
    cmd
}

/// Deliver messages until `stop` is set or `next` fails. `next` yields
/// `Ok(None)` when its read timed out.
fn pump_messages<F>(subscription: &Subscription, stop: &AtomicBool, mut next: F)
where
    F: FnMut() -> RedisResult<Option<(String, Vec<u8>)>>,
{
    while !stop.load(Ordering::Relaxed) {
        match next() {
            Ok(Some((channel, payload))) => {
                subscription.invoke(&channel, &payload);
            }
            Ok(None) => continue,
            Err(e) => {
                warn!("subscription to {} ended: {e}", subscription.name());
                break;
            }
        }
    }
}

fn into_entries(map: HashMap<String, Vec<u8>>) -> Vec<(String, Vec<u8>)> {
    map.into_iter().collect()
}

impl Transport for RedisTransport {
    fn get(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>> {
        self.with_connection("GET", |c| c.get(key))
    }

    fn mget(&self, keys: &[String]) -> RedwrapResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        // explicit MGET: the Commands helper sends GET for a single key
        self.with_connection("MGET", |c| redis::cmd("MGET").arg(keys).query(c))
    }

    fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> RedwrapResult<()> {
        let cmd = set_command(key, value, ttl)?;
        self.with_connection("SET", |c| cmd.query(c))
    }

    fn del(&self, key: &str) -> RedwrapResult<bool> {
        self.with_connection("DEL", |c| c.del::<_, usize>(key)).map(|n| n > 0)
    }

    fn exists(&self, key: &str) -> RedwrapResult<bool> {
        self.with_connection("EXISTS", |c| c.exists(key))
    }

    fn sadd(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        self.with_connection("SADD", |c| c.sadd(key, members))
    }

    fn srem(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        self.with_connection("SREM", |c| c.srem(key, members))
    }

    fn smembers(&self, key: &str) -> RedwrapResult<Vec<Vec<u8>>> {
        self.with_connection("SMEMBERS", |c| c.smembers(key))
    }

    fn sismember(&self, key: &str, member: &[u8]) -> RedwrapResult<bool> {
        self.with_connection("SISMEMBER", |c| c.sismember(key, member))
    }

    fn srandmember(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>> {
        self.with_connection("SRANDMEMBER", |c| c.srandmember(key))
    }

    fn scombine(&self, op: SetOp, first: &str, second: &str) -> RedwrapResult<Vec<Vec<u8>>> {
        self.with_connection(op.command_name(), |c| combine_command(op, first, second).query(c))
    }

    fn hget(&self, key: &str, field: &str) -> RedwrapResult<Option<Vec<u8>>> {
        self.with_connection("HGET", |c| c.hget(key, field))
    }

    fn hset(&self, key: &str, field: &str, value: &[u8]) -> RedwrapResult<bool> {
        self.with_connection("HSET", |c| c.hset::<_, _, _, usize>(key, field, value))
            .map(|added| added > 0)
    }

    fn hdel(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        self.with_connection("HDEL", |c| c.hdel::<_, _, usize>(key, field))
            .map(|n| n > 0)
    }

    fn hexists(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        self.with_connection("HEXISTS", |c| c.hexists(key, field))
    }

    fn hgetall(&self, key: &str) -> RedwrapResult<Vec<(String, Vec<u8>)>> {
        self.with_connection("HGETALL", |c| c.hgetall(key)).map(into_entries)
    }

    fn publish(&self, channel: &str, payload: &[u8]) -> RedwrapResult<usize> {
        self.with_connection("PUBLISH", |c| c.publish(channel, payload))
    }

    fn subscribe(&self, subscription: Subscription) -> RedwrapResult<SubscriptionHandle> {
        let mut conn = self.client.get_connection()?;
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let name = subscription.name().to_string();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<RedisResult<()>>();

        // the PubSub guard leaves pubsub mode when dropped, so it lives on the thread
        std::thread::spawn(move || {
            let mut pubsub = conn.as_pubsub();
            let setup = match subscription.kind() {
                SubscriptionKind::Channel => pubsub.subscribe(subscription.name()),
                SubscriptionKind::Pattern => pubsub.psubscribe(subscription.name()),
            }
            .and_then(|()| pubsub.set_read_timeout(Some(SUBSCRIBE_POLL)));
            let ok = setup.is_ok();
            if ready_tx.send(setup).is_err() || !ok {
                return;
            }
            pump_messages(&subscription, &stop_flag, || match pubsub.get_message() {
                Ok(msg) => Ok(Some((
                    msg.get_channel_name().to_string(),
                    msg.get_payload_bytes().to_vec(),
                ))),
                Err(e) if e.is_timeout() => Ok(None),
                Err(e) => Err(e),
            });
        });

        ready_rx
            .recv()
            .map_err(|_| RedwrapError::transport("subscription thread exited before subscribing"))??;
        info!("subscribed to {name}");

        Ok(SubscriptionHandle::new(name, move || {
            stop.store(true, Ordering::Relaxed);
        }))
    }
}

#[async_trait]
impl AsyncTransport for RedisTransport {
    async fn get(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>> {
        let mut conn = self.connection("GET").await?;
        Ok(conn.get(key).await?)
    }

    async fn mget(&self, keys: &[String]) -> RedwrapResult<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection("MGET").await?;
        Ok(redis::cmd("MGET").arg(keys).query_async(&mut conn).await?)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> RedwrapResult<()> {
        let cmd = set_command(key, value, ttl)?;
        let mut conn = self.connection("SET").await?;
        Ok(cmd.query_async(&mut conn).await?)
    }

    async fn del(&self, key: &str) -> RedwrapResult<bool> {
        let mut conn = self.connection("DEL").await?;
        let removed: usize = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> RedwrapResult<bool> {
        let mut conn = self.connection("EXISTS").await?;
        Ok(conn.exists(key).await?)
    }

    async fn sadd(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection("SADD").await?;
        Ok(conn.sadd(key, members).await?)
    }

    async fn srem(&self, key: &str, members: &[Vec<u8>]) -> RedwrapResult<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection("SREM").await?;
        Ok(conn.srem(key, members).await?)
    }

    async fn smembers(&self, key: &str) -> RedwrapResult<Vec<Vec<u8>>> {
        let mut conn = self.connection("SMEMBERS").await?;
        Ok(conn.smembers(key).await?)
    }

    async fn sismember(&self, key: &str, member: &[u8]) -> RedwrapResult<bool> {
        let mut conn = self.connection("SISMEMBER").await?;
        Ok(conn.sismember(key, member).await?)
    }

    async fn srandmember(&self, key: &str) -> RedwrapResult<Option<Vec<u8>>> {
        let mut conn = self.connection("SRANDMEMBER").await?;
        Ok(conn.srandmember(key).await?)
    }

    async fn scombine(&self, op: SetOp, first: &str, second: &str) -> RedwrapResult<Vec<Vec<u8>>> {
        let mut conn = self.connection(op.command_name()).await?;
        Ok(combine_command(op, first, second).query_async(&mut conn).await?)
    }

    async fn hget(&self, key: &str, field: &str) -> RedwrapResult<Option<Vec<u8>>> {
        let mut conn = self.connection("HGET").await?;
        Ok(conn.hget(key, field).await?)
    }

    async fn hset(&self, key: &str, field: &str, value: &[u8]) -> RedwrapResult<bool> {
        let mut conn = self.connection("HSET").await?;
        let added: usize = conn.hset(key, field, value).await?;
        Ok(added > 0)
    }

    async fn hdel(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        let mut conn = self.connection("HDEL").await?;
        let removed: usize = conn.hdel(key, field).await?;
        Ok(removed > 0)
    }

    async fn hexists(&self, key: &str, field: &str) -> RedwrapResult<bool> {
        let mut conn = self.connection("HEXISTS").await?;
        Ok(conn.hexists(key, field).await?)
    }

    async fn hgetall(&self, key: &str) -> RedwrapResult<Vec<(String, Vec<u8>)>> {
        let mut conn = self.connection("HGETALL").await?;
        let map: HashMap<String, Vec<u8>> = conn.hgetall(key).await?;
        Ok(into_entries(map))
    }

    async fn publish(&self, channel: &str, payload: &[u8]) -> RedwrapResult<usize> {
        let mut conn = self.connection("PUBLISH").await?;
        Ok(conn.publish(channel, payload).await?)
    }

    async fn subscribe(&self, subscription: Subscription) -> RedwrapResult<SubscriptionHandle> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        match subscription.kind() {
            SubscriptionKind::Channel => pubsub.subscribe(subscription.name()).await?,
            SubscriptionKind::Pattern => pubsub.psubscribe(subscription.name()).await?,
        }
        info!("subscribed to {}", subscription.name());

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let name = subscription.name().to_string();
        tokio::spawn(async move {
            let mut messages = Box::pin(pubsub.into_on_message());
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = messages.next() => match msg {
                        Some(msg) => {
                            subscription.invoke(msg.get_channel_name(), msg.get_payload_bytes());
                        }
                        None => {
                            warn!("subscription to {} closed by server", subscription.name());
                            break;
                        }
                    },
                }
            }
        });

        Ok(SubscriptionHandle::new(name, move || cancel.cancel()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_does_not_connect() {
        // nothing listens on port 1; opening must still succeed
        let transport = RedisTransport::open("redis://127.0.0.1:1/").unwrap();
        assert!(format!("{transport:?}").contains("RedisTransport"));
    }

    #[test]
    fn test_open_rejects_bad_url() {
        let err = RedisTransport::open("not a url").unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn test_unreachable_server_is_a_transport_error() {
        let transport = RedisTransport::open("redis://127.0.0.1:1/").unwrap();
        let err = Transport::get(&transport, "k").unwrap_err();
        assert!(err.is_transport());
        assert!(!err.message().is_empty());
    }

    fn packed(cmd: &redis::Cmd) -> String {
        String::from_utf8_lossy(&cmd.get_packed_command()).to_string()
    }

    #[test]
    fn test_set_command_with_ttl() {
        let cmd = set_command("k", b"v", Some(Duration::from_millis(1500))).unwrap();
        let wire = packed(&cmd);
        assert!(wire.contains("PX"));
        assert!(wire.contains("1500"));

        let plain = set_command("k", b"v", None).unwrap();
        assert!(!packed(&plain).contains("PX"));
    }

    #[test]
    fn test_set_command_zero_ttl_sends_one_millisecond() {
        let cmd = set_command("k", b"v", Some(Duration::ZERO)).unwrap();
        assert!(packed(&cmd).ends_with("$2\r\nPX\r\n$1\r\n1\r\n"));
    }

    #[test]
    fn test_set_command_rejects_out_of_range_ttl() {
        let err = set_command("k", b"v", Some(Duration::MAX)).err().unwrap();
        assert!(matches!(err, RedwrapError::Config(_)));
    }

    #[test]
    fn test_out_of_range_ttl_fails_before_connecting() {
        // nothing listens on port 1, so a transport error would mean a round trip was tried
        let transport = RedisTransport::open("redis://127.0.0.1:1/").unwrap();
        let err = Transport::set(&transport, "k", b"v", Some(Duration::MAX)).unwrap_err();
        assert!(matches!(err, RedwrapError::Config(_)));
    }

    fn collecting(channel: &str) -> (Arc<Mutex<Vec<Vec<u8>>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = Subscription::channel(channel, move |_, payload| sink.lock().push(payload.to_vec()));
        (seen, sub)
    }

    #[test]
    fn test_pump_runs_until_stopped() {
        let (seen, sub) = collecting("c");
        let stop = AtomicBool::new(false);
        let mut polls = 0;
        pump_messages(&sub, &stop, || {
            polls += 1;
            match polls {
                1 => Ok(Some(("c".to_string(), b"1".to_vec()))),
                2 => Ok(None),
                3 => Ok(Some(("other".to_string(), b"2".to_vec()))),
                _ => {
                    stop.store(true, Ordering::Relaxed);
                    Ok(None)
                }
            }
        });
        assert_eq!(polls, 4);
        assert_eq!(*seen.lock(), vec![b"1".to_vec()]);
    }

    #[test]
    fn test_pump_ends_on_read_error() {
        let (seen, sub) = collecting("c");
        let stop = AtomicBool::new(false);
        let mut polls = 0;
        pump_messages(&sub, &stop, || {
            polls += 1;
            Err(redis::RedisError::from((redis::ErrorKind::IoError, "connection reset")))
        });
        assert_eq!(polls, 1);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_pump_does_not_poll_once_stopped() {
        let (_, sub) = collecting("c");
        let stop = AtomicBool::new(true);
        pump_messages(&sub, &stop, || panic!("polled after stop"));
    }

    #[test]
    fn test_blocking_subscribe_without_server_is_an_error() {
        let transport = RedisTransport::open("redis://127.0.0.1:1/").unwrap();
        let err = Transport::subscribe(&transport, Subscription::channel("c", |_, _| {})).unwrap_err();
        assert!(err.is_transport());
    }
}
