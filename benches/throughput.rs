use std::time::Instant;

use redwrap::{JsonSerializer, MemoryTransport, Redis, Serializer, SetOp, Transport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Event {
    id: u64,
    kind: String,
    tags: Vec<String>,
}

fn event(i: usize) -> Event {
    Event {
        id: i as u64,
        kind: format!("kind_{}", i % 8),
        tags: vec!["bench".to_string(), format!("tag_{i}")],
    }
}

fn ops_per_sec(iterations: usize, start: Instant) -> f64 {
    iterations as f64 / start.elapsed().as_secs_f64()
}

fn bench_serializer(iterations: usize) -> (f64, f64) {
    let serializer = JsonSerializer;

    let start = Instant::now();
    let mut wires = Vec::with_capacity(iterations);
    for i in 0..iterations {
        wires.push(serializer.serialize(&event(i)).unwrap());
    }
    let ser_ops = ops_per_sec(iterations, start);

    let start = Instant::now();
    for wire in &wires {
        let _: Event = serializer.deserialize(wire).unwrap().unwrap();
    }
    let de_ops = ops_per_sec(iterations, start);

    (ser_ops, de_ops)
}

fn bench_set_get(redis: &Redis<MemoryTransport>, iterations: usize) -> (f64, f64) {
    let start = Instant::now();
    for i in 0..iterations {
        redis.strings().set(&format!("bench_key_{i}"), &event(i)).unwrap();
    }
    let set_ops = ops_per_sec(iterations, start);

    let start = Instant::now();
    for i in 0..iterations {
        let _: Event = redis.strings().get(&format!("bench_key_{i}")).unwrap().unwrap();
    }
    let get_ops = ops_per_sec(iterations, start);

    (set_ops, get_ops)
}

fn bench_get_many(redis: &Redis<MemoryTransport>, iterations: usize) -> f64 {
    let batch_size = 100;
    let start = Instant::now();
    for batch in 0..(iterations / batch_size) {
        let keys: Vec<String> = (0..batch_size)
            .map(|i| format!("bench_key_{}", batch * batch_size + i))
            .collect();
        let events: Vec<Event> = redis.strings().get_many(&keys).unwrap();
        assert_eq!(events.len(), batch_size);
    }
    ops_per_sec(iterations, start)
}

fn bench_hset_hget(redis: &Redis<MemoryTransport>, iterations: usize) -> (f64, f64) {
    let start = Instant::now();
    for i in 0..iterations {
        redis.hashes().set("bench_hash", &format!("field_{i}"), &i).unwrap();
    }
    let hset_ops = ops_per_sec(iterations, start);

    let start = Instant::now();
    for i in 0..iterations {
        let _: usize = redis.hashes().get("bench_hash", &format!("field_{i}")).unwrap().unwrap();
    }
    let hget_ops = ops_per_sec(iterations, start);

    (hset_ops, hget_ops)
}

fn bench_sadd_combine(redis: &Redis<MemoryTransport>, iterations: usize) -> (f64, f64) {
    let start = Instant::now();
    for i in 0..iterations {
        let target = if i % 2 == 0 { "bench_even" } else { "bench_odd" };
        redis.sets().add(target, &[i, i + 1]).unwrap();
    }
    let sadd_ops = ops_per_sec(iterations, start);

    let rounds = 100;
    let start = Instant::now();
    for _ in 0..rounds {
        let _: Vec<usize> = redis.sets().combine("bench_even", "bench_odd", SetOp::Intersect).unwrap();
    }
    let sinter_ops = ops_per_sec(rounds, start);

    (sadd_ops, sinter_ops)
}

fn bench_publish(redis: &Redis<MemoryTransport>, iterations: usize) -> f64 {
    let _handle = Transport::subscribe(
        redis.transport(),
        redwrap::Subscription::channel("bench_channel", |_, _| {}),
    )
    .unwrap();

    let start = Instant::now();
    for i in 0..iterations {
        let receivers = redis.pubsub().publish("bench_channel", &i).unwrap();
        assert_eq!(receivers, 1);
    }
    ops_per_sec(iterations, start)
}

fn main() {
    let iterations = 10_000;
    let redis = Redis::new(MemoryTransport::new(), "bench:");

    println!("=== Redwrap Benchmark ({iterations} operations, in-memory transport) ===\n");

    let (ser_ops, de_ops) = bench_serializer(iterations);
    println!("ENCODE: {ser_ops:>10.0} ops/sec");
    println!("DECODE: {de_ops:>10.0} ops/sec");

    let (set_ops, get_ops) = bench_set_get(&redis, iterations);
    println!("SET:    {set_ops:>10.0} ops/sec");
    println!("GET:    {get_ops:>10.0} ops/sec");

    let mget_ops = bench_get_many(&redis, iterations);
    println!("MGET:   {mget_ops:>10.0} keys/sec (100-key batches)");

    let (hset_ops, hget_ops) = bench_hset_hget(&redis, iterations);
    println!("HSET:   {hset_ops:>10.0} ops/sec");
    println!("HGET:   {hget_ops:>10.0} ops/sec");

    let (sadd_ops, sinter_ops) = bench_sadd_combine(&redis, iterations);
    println!("SADD:   {sadd_ops:>10.0} ops/sec");
    println!("SINTER: {sinter_ops:>10.0} ops/sec");

    let pub_ops = bench_publish(&redis, iterations);
    println!("PUB:    {pub_ops:>10.0} ops/sec (1 subscriber)");

    println!("\n=== Done ===");
}
