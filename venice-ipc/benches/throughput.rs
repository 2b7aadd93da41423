//! Throughput benchmarks for Venice IPC
//!
//! Measures messages per second through:
//! - Queue offer/poll pairs
//! - Topic fan-out to a subscriber
//! - Compressed frame encoding

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use venice_ipc::client::{Client, ClientConfig};
use venice_ipc::destination::QueueKind;
use venice_ipc::message::{Message, Topics};
use venice_ipc::protocol::Codec;
use venice_ipc::serialization::framing::DEFAULT_MAX_FRAME_SIZE;
use venice_ipc::server::{Server, ServerConfig};
use venice_ipc::transport::Compressor;

const BATCH: u64 = 100;
const WAIT: Duration = Duration::from_secs(1);

/// Benchmark offering then polling a batch of messages
fn bench_queue_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput_queue");
    let rt = Runtime::new().unwrap();
    let (server, client) = rt.block_on(async {
        let server = Server::start(ServerConfig::new("127.0.0.1:0")).await.unwrap();
        let client = Client::connect(ClientConfig::new(server.local_addr().to_string()))
            .await
            .unwrap();
        client.create_queue("bench", 1000, QueueKind::Bounded).await.unwrap();
        (server, client)
    });

    let client = &client;
    group.throughput(Throughput::Elements(BATCH));
    group.bench_function("offer_poll", |b| {
        b.to_async(&rt).iter(|| async move {
            for i in 0..BATCH {
                let message = Message::new_text("job", "text/plain", i.to_string()).unwrap();
                client.offer("bench", message, WAIT).await.unwrap();
            }
            for _ in 0..BATCH {
                black_box(client.poll("bench", WAIT).await.unwrap());
            }
        });
    });
    group.finish();

    rt.block_on(async {
        client.close().await.unwrap();
        server.shutdown().await.unwrap();
    });
}

/// Benchmark publishing a batch to one subscriber
fn bench_publish_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput_publish");
    let rt = Runtime::new().unwrap();
    let received = Arc::new(AtomicU64::new(0));
    let (server, publisher, subscriber) = rt.block_on(async {
        let server = Server::start(ServerConfig::new("127.0.0.1:0")).await.unwrap();
        let address = server.local_addr().to_string();
        let publisher = Client::connect(ClientConfig::new(address.clone())).await.unwrap();
        let subscriber = Client::connect(ClientConfig::new(address)).await.unwrap();
        publisher.create_topic("ticks").await.unwrap();
        let counter = received.clone();
        subscriber
            .subscribe(
                move |_: Message| {
                    counter.fetch_add(1, Ordering::Relaxed);
                },
                &Topics::parse("ticks").unwrap(),
            )
            .await
            .unwrap();
        (server, publisher, subscriber)
    });

    let publisher = &publisher;
    group.throughput(Throughput::Elements(BATCH));
    group.bench_function("one_subscriber", |b| {
        b.to_async(&rt).iter(|| async move {
            for i in 0..BATCH {
                let message = Message::new_text("tick", "text/plain", i.to_string()).unwrap();
                black_box(publisher.publish("ticks", message).await.unwrap());
            }
        });
    });
    group.finish();

    rt.block_on(async {
        subscriber.close().await.unwrap();
        publisher.close().await.unwrap();
        server.shutdown().await.unwrap();
    });
}

/// Benchmark encoding with and without compression
fn bench_compressed_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput_encoding");
    let rt = Runtime::new().unwrap();

    for size in [1024usize, 64 * 1024, 1024 * 1024] {
        let text = "venice ".repeat(size / 7);
        let message = Message::new_text("bulk", "text/plain", text).unwrap();
        group.throughput(Throughput::Bytes(size as u64));

        let plain = &Codec::new(DEFAULT_MAX_FRAME_SIZE);
        group.bench_with_input(BenchmarkId::new("plain", size), &message, |b, message| {
            b.to_async(&rt).iter(|| plain.encode(message));
        });

        let compressed =
            &Codec::new(DEFAULT_MAX_FRAME_SIZE).with_compressor(Compressor::new(Some(512)));
        group.bench_with_input(BenchmarkId::new("gzip", size), &message, |b, message| {
            b.to_async(&rt).iter(|| compressed.encode(message));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_queue_throughput,
    bench_publish_throughput,
    bench_compressed_encoding
);
criterion_main!(benches);
