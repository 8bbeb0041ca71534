use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Duration;

use redwrap::{
    AsyncTransport, Config, MemoryTransport, Redis, RedwrapError, RedwrapResult, SetOp, Subscription,
    SubscriptionHandle,
};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;

/// A command's reply, printed the way redis-cli prints it.
enum Reply {
    Ok,
    Nil,
    Integer(i64),
    Value(Value),
    List(Vec<Value>),
    Entries(Vec<(String, Value)>),
    Error(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut config = Config::from_env();
    let flags = Config::from_args(&args);
    if args.iter().any(|a| a == "--url" || a == "-u") {
        config.connection_string = flags.connection_string;
    }
    if args.iter().any(|a| a == "--prefix" || a == "-p") {
        config.key_prefix = flags.key_prefix;
    }

    let result = if args.iter().any(|a| a == "--memory") {
        info!("Using in-memory transport (prefix {:?})", config.key_prefix);
        repl(Redis::new(MemoryTransport::new(), config.prefix()), stdin()).await
    } else {
        match Redis::connect(&config) {
            Ok(redis) => {
                info!("Using {} (prefix {:?})", config.connection_string, config.key_prefix);
                repl(redis, stdin()).await
            }
            Err(e) => {
                eprintln!("Invalid configuration: {e}");
                return ExitCode::FAILURE;
            }
        }
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("I/O error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn stdin() -> BufReader<tokio::io::Stdin> {
    BufReader::new(tokio::io::stdin())
}

/// Read commands line by line until EOF or `quit`. Returns how many commands ran.
async fn repl<T, R>(redis: Redis<T>, input: R) -> io::Result<usize>
where
    T: AsyncTransport,
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut subscriptions: Vec<SubscriptionHandle> = Vec::new();
    let mut executed = 0;

    loop {
        print!("redwrap> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break; // EOF
        };

        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = tokens.first() else {
            continue;
        };
        if first.eq_ignore_ascii_case("quit") || first.eq_ignore_ascii_case("exit") {
            break;
        }

        match execute(&redis, &tokens, &mut subscriptions).await {
            Ok(reply) => print_reply(&reply),
            Err(e) => println!("(error) {e}"),
        }
        executed += 1;
    }

    Ok(executed)
}

/// Arguments are JSON when they parse as JSON, plain strings otherwise.
fn parse_value(token: &str) -> Value {
    serde_json::from_str(token).unwrap_or_else(|_| Value::String(token.to_string()))
}

fn parse_values(tokens: &[&str]) -> Vec<Value> {
    tokens.iter().map(|t| parse_value(t)).collect()
}

fn wrong_arg_count(cmd: &str) -> RedwrapResult<Reply> {
    Ok(Reply::Error(format!("wrong number of arguments for '{cmd}'")))
}

fn optional(value: Option<Value>) -> Reply {
    value.map_or(Reply::Nil, Reply::Value)
}

fn count(n: usize) -> Reply {
    Reply::Integer(n as i64)
}

fn flag(b: bool) -> Reply {
    Reply::Integer(i64::from(b))
}

fn print_message(channel: &str, payload: &[u8]) {
    println!("\n[{channel}] {}", String::from_utf8_lossy(payload));
}

async fn execute<T: AsyncTransport>(
    redis: &Redis<T>,
    tokens: &[&str],
    subscriptions: &mut Vec<SubscriptionHandle>,
) -> RedwrapResult<Reply> {
    let cmd = tokens[0].to_ascii_lowercase();
    let args = &tokens[1..];
    let strings = redis.strings();
    let sets = redis.sets();
    let hashes = redis.hashes();

    let reply = match (cmd.as_str(), args) {
        ("get", [key]) => optional(strings.get_async(key).await?),
        ("mget", keys) if !keys.is_empty() => Reply::List(strings.get_many_async(keys).await?),
        ("set", [key, value]) => {
            strings.set_async(key, &parse_value(value)).await?;
            Reply::Ok
        }
        ("set", [key, value, ttl_ms]) => {
            let ttl: u64 = ttl_ms
                .parse()
                .map_err(|_| RedwrapError::Config(format!("invalid ttl '{ttl_ms}'")))?;
            strings
                .set_with_ttl_async(key, &parse_value(value), Duration::from_millis(ttl))
                .await?;
            Reply::Ok
        }
        ("del", [key]) => flag(strings.delete_async(key).await?),
        ("exists", [key]) => flag(strings.exists_async(key).await?),

        ("sadd", [key, members @ ..]) if !members.is_empty() => {
            count(sets.add_async(key, &parse_values(members)).await?)
        }
        ("srem", [key, members @ ..]) if !members.is_empty() => {
            count(sets.remove_async(key, &parse_values(members)).await?)
        }
        ("smembers", [key]) => Reply::List(sets.members_async(key).await?),
        ("sismember", [key, member]) => flag(sets.contains_async(key, &parse_value(member)).await?),
        ("srandmember", [key]) => optional(sets.random_member_async(key).await?),
        ("sunion" | "sinter" | "sdiff", [first, second]) => {
            let op: SetOp = cmd.parse().map_err(RedwrapError::Config)?;
            Reply::List(sets.combine_async(first, second, op).await?)
        }

        ("hget", [key, field]) => optional(hashes.get_async(key, field).await?),
        ("hset", [key, field, value]) => flag(hashes.set_async(key, field, &parse_value(value)).await?),
        ("hdel", [key, field]) => flag(hashes.delete_field_async(key, field).await?),
        ("hexists", [key, field]) => flag(hashes.exists_async(key, field).await?),
        ("hgetall", [key]) => Reply::Entries(hashes.get_all_async(key).await?),

        ("publish", [channel, message]) => count(redis.pubsub().publish_async(channel, &parse_value(message)).await?),
        ("subscribe", [channel]) => {
            let sub = Subscription::channel(*channel, print_message);
            subscriptions.push(redis.pubsub().subscribe_async(&sub).await?);
            count(subscriptions.len())
        }
        ("psubscribe", [pattern]) => {
            let sub = Subscription::pattern(*pattern, print_message);
            subscriptions.push(redis.pubsub().subscribe_async(&sub).await?);
            count(subscriptions.len())
        }
        ("unsubscribe", []) => {
            let n = subscriptions.len();
            subscriptions.clear();
            count(n)
        }

        (
            "get" | "mget" | "set" | "del" | "exists" | "sadd" | "srem" | "smembers" | "sismember"
            | "srandmember" | "sunion" | "sinter" | "sdiff" | "hget" | "hset" | "hdel" | "hexists"
            | "hgetall" | "publish" | "subscribe" | "psubscribe" | "unsubscribe",
            _,
        ) => return wrong_arg_count(&cmd),
        (other, _) => Reply::Error(format!("unknown command '{other}'")),
    };
    Ok(reply)
}

fn print_reply(reply: &Reply) {
    match reply {
        Reply::Ok => println!("OK"),
        Reply::Nil => println!("(nil)"),
        Reply::Integer(n) => println!("(integer) {n}"),
        Reply::Value(v) => println!("{v}"),
        Reply::Error(e) => println!("(error) {e}"),
        Reply::List(items) if items.is_empty() => println!("(empty array)"),
        Reply::List(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("{}) {item}", i + 1);
            }
        }
        Reply::Entries(entries) if entries.is_empty() => println!("(empty hash)"),
        Reply::Entries(entries) => {
            for (i, (field, value)) in entries.iter().enumerate() {
                println!("{}) {field} => {value}", i + 1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use redwrap::Transport;

    fn memory() -> Redis<MemoryTransport> {
        Redis::new(MemoryTransport::new(), "cli:")
    }

    #[tokio::test]
    async fn test_repl_runs_until_quit() {
        let redis = memory();
        let transport = redis.transport().clone();
        let input: &[u8] = b"set greeting \"hi\"\n\nsadd tags 1 2\nquit\nset never 1\n";
        let executed = repl(redis, input).await.unwrap();
        assert_eq!(executed, 2);
        assert!(Transport::exists(&transport, "cli:greeting").unwrap());
        assert!(!Transport::exists(&transport, "cli:never").unwrap());
    }

    #[tokio::test]
    async fn test_repl_stops_at_eof() {
        let input: &[u8] = b"get missing\nbogus command";
        assert_eq!(repl(memory(), input).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_execute_reports_argument_errors() {
        let redis = memory();
        let mut subs = Vec::new();
        let reply = execute(&redis, &["get"], &mut subs).await.unwrap();
        assert!(matches!(reply, Reply::Error(m) if m.contains("wrong number")));
        let reply = execute(&redis, &["set", "k", "v", "soon"], &mut subs).await;
        assert!(matches!(reply, Err(RedwrapError::Config(_))));
    }
}
