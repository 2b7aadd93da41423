//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Integration tests for queues.
//!
//! These tests cover:
//! - Bounded and circular overflow behavior
//! - Durable queues surviving a server restart or a crash
//! - One-way offers racing a consumer on a full queue
//! - Temporary queues and their cleanup
//! - Name validation and the dead-letter queue

use std::time::Duration;
use venice_ipc::client::{Client, ClientConfig};
use venice_ipc::destination::{Persistence, QueueKind};
use venice_ipc::message::{Message, ResponseStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use venice_ipc::server::{RunningServer, Server, ServerConfig, DEAD_LETTER_QUEUE};
use venice_ipc::wal::{self, WriteAheadLog};
use venice_ipc::IpcError;

const WAIT: Duration = Duration::from_millis(50);

async fn start(config: ServerConfig) -> RunningServer {
    Server::start(config).await.unwrap()
}

async fn connect(server: &RunningServer) -> Client {
    Client::connect(ClientConfig::new(server.local_addr().to_string()))
        .await
        .unwrap()
}

fn text(body: &str) -> Message {
    Message::new_text("job", "text/plain", body).unwrap()
}

fn status_of(result: Result<impl std::fmt::Debug, IpcError>) -> ResponseStatus {
    match result {
        Err(IpcError::Rejected { status, .. }) => status,
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn test_bounded_queue_rejects_when_full() {
    let server = start(ServerConfig::new("127.0.0.1:0")).await;
    let client = connect(&server).await;
    client.create_queue("work", 2, QueueKind::Bounded).await.unwrap();

    client.offer("work", text("a"), WAIT).await.unwrap();
    client.offer("work", text("b"), WAIT).await.unwrap();
    let status = status_of(client.offer("work", text("c"), WAIT).await);
    assert_eq!(status, ResponseStatus::QueueFull);

    assert_eq!(client.poll("work", WAIT).await.unwrap().unwrap().text().unwrap(), "a");
    assert_eq!(client.poll("work", WAIT).await.unwrap().unwrap().text().unwrap(), "b");
    assert!(client.poll("work", WAIT).await.unwrap().is_none());

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_circular_queue_evicts_oldest() {
    let server = start(ServerConfig::new("127.0.0.1:0")).await;
    let client = connect(&server).await;
    client.create_queue("ring", 2, QueueKind::Circular).await.unwrap();

    for body in ["a", "b", "c"] {
        client.offer("ring", text(body), WAIT).await.unwrap();
    }
    let status = client.queue_status("ring").await.unwrap();
    assert_eq!(status.size, 2);
    assert_eq!(status.discarded, 1);

    assert_eq!(client.poll("ring", WAIT).await.unwrap().unwrap().text().unwrap(), "b");
    assert_eq!(client.poll("ring", WAIT).await.unwrap().unwrap().text().unwrap(), "c");

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_poll_waits_for_an_offer() {
    let server = start(ServerConfig::new("127.0.0.1:0")).await;
    let consumer = connect(&server).await;
    let producer = connect(&server).await;
    consumer.create_queue("handoff", 10, QueueKind::Bounded).await.unwrap();

    let poll = tokio::spawn(async move {
        let message = consumer.poll("handoff", Duration::from_secs(5)).await.unwrap();
        consumer.close().await.unwrap();
        message
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    producer.offer("handoff", text("late"), WAIT).await.unwrap();

    let message = poll.await.unwrap().unwrap();
    assert_eq!(message.text().unwrap(), "late");

    producer.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_queue_administration() {
    let server = start(ServerConfig::new("127.0.0.1:0").with_max_queues(2)).await;
    let client = connect(&server).await;

    client.create_queue("one", 5, QueueKind::Bounded).await.unwrap();
    client.create_queue("one", 5, QueueKind::Bounded).await.unwrap();
    let status = status_of(client.create_queue("one", 6, QueueKind::Bounded).await);
    assert_eq!(status, ResponseStatus::DestinationExists);

    client.create_queue("two", 5, QueueKind::Circular).await.unwrap();
    let status = status_of(client.create_queue("three", 5, QueueKind::Bounded).await);
    assert_eq!(status, ResponseStatus::LimitExceeded);

    for body in ["x", "y", "z"] {
        client.offer("one", text(body), WAIT).await.unwrap();
    }
    assert_eq!(client.clear_queue("one").await.unwrap(), 3);
    assert_eq!(client.queue_status("one").await.unwrap().size, 0);

    assert!(client.exists_queue("two").await.unwrap());
    client.remove_queue("two").await.unwrap();
    assert!(!client.exists_queue("two").await.unwrap());
    let status = status_of(client.poll("two", WAIT).await);
    assert_eq!(status, ResponseStatus::QueueNotFound);

    let status = status_of(client.remove_queue(DEAD_LETTER_QUEUE).await);
    assert_eq!(status, ResponseStatus::BadRequest);

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_queue_names_and_capacities() {
    let server = start(ServerConfig::new("127.0.0.1:0")).await;
    let client = connect(&server).await;

    for name in ["wal", "dotted.name", "semi;colon"] {
        let status = status_of(client.create_queue(name, 5, QueueKind::Bounded).await);
        assert_eq!(status, ResponseStatus::BadRequest, "name {name}");
    }
    let status = status_of(client.create_queue("tiny", 1, QueueKind::Bounded).await);
    assert_eq!(status, ResponseStatus::BadRequest);

    // No write-ahead log directory is configured.
    let status = status_of(
        client
            .create_queue_with("kept", 5, QueueKind::Bounded, Persistence::Durable)
            .await,
    );
    assert_eq!(status, ResponseStatus::BadRequest);

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_durable_queue_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = || ServerConfig::new("127.0.0.1:0").with_wal_dir(dir.path());

    let server = start(config()).await;
    let client = connect(&server).await;
    client
        .create_queue_with("orders", 10, QueueKind::Bounded, Persistence::Durable)
        .await
        .unwrap();
    for body in ["first", "second", "third"] {
        client
            .offer("orders", text(body).with_durable(true), WAIT)
            .await
            .unwrap();
    }
    client.offer("orders", text("volatile"), WAIT).await.unwrap();
    assert_eq!(
        client.poll("orders", WAIT).await.unwrap().unwrap().text().unwrap(),
        "first"
    );
    client.close().await.unwrap();
    server.shutdown().await.unwrap();

    let bound = Server::bind(config()).await.unwrap();
    let recovered = bound.recover().unwrap();
    assert_eq!(recovered.recovered_queues(), 1);
    let server = recovered.start();
    let client = connect(&server).await;

    let status = client.queue_status("orders").await.unwrap();
    assert!(status.durable);
    assert_eq!(status.size, 2);
    assert_eq!(
        client.poll("orders", WAIT).await.unwrap().unwrap().text().unwrap(),
        "second"
    );
    assert_eq!(
        client.poll("orders", WAIT).await.unwrap().unwrap().text().unwrap(),
        "third"
    );
    assert!(client.poll("orders", WAIT).await.unwrap().is_none());

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_temporary_queue_removed_with_its_connection() {
    let server = start(ServerConfig::new("127.0.0.1:0")).await;
    let owner = connect(&server).await;
    let observer = connect(&server).await;

    let name = owner.create_temporary_queue(5, QueueKind::Bounded).await.unwrap();
    assert!(name.starts_with("temp-"));
    owner.offer(&name, text("reply"), WAIT).await.unwrap();
    assert!(observer.exists_queue(&name).await.unwrap());
    assert!(observer.queue_status(&name).await.unwrap().temporary);

    let status = status_of(observer.remove_queue(&name).await);
    assert_eq!(status, ResponseStatus::BadRequest);

    owner.close().await.unwrap();
    let mut gone = false;
    for _ in 0..40 {
        if !observer.exists_queue(&name).await.unwrap() {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(gone, "temporary queue outlived its connection");

    observer.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_oneway_offer_is_dead_lettered() {
    let server = start(ServerConfig::new("127.0.0.1:0")).await;
    let client = connect(&server).await;
    client.create_queue("narrow", 2, QueueKind::Bounded).await.unwrap();

    client.offer("narrow", text("a"), WAIT).await.unwrap();
    client.offer("narrow", text("b"), WAIT).await.unwrap();
    client.offer_oneway("narrow", text("lost")).await.unwrap();
    // Requests on one connection are handled in order.
    client.heartbeat().await.unwrap();

    let dead_letters = server.queues().dead_letter_queue();
    assert_eq!(dead_letters.size(), 1);
    assert_eq!(server.statistics().dead_letters, 1);

    // The dead-letter queue denies access to everyone but admins.
    let status = status_of(client.poll(DEAD_LETTER_QUEUE, WAIT).await);
    assert_eq!(status, ResponseStatus::NoPermission);

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

fn numbers(messages: &[Message]) -> Vec<u32> {
    messages
        .iter()
        .map(|m| m.text().unwrap().parse().unwrap())
        .collect()
}

#[tokio::test]
async fn test_recovery_after_crash_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let config = || ServerConfig::new("127.0.0.1:0").with_wal_dir(dir.path());

    let server = start(config()).await;
    let client = connect(&server).await;
    client
        .create_queue_with("orders", 10, QueueKind::Bounded, Persistence::Durable)
        .await
        .unwrap();
    for i in 0..6 {
        client
            .offer("orders", text(&i.to_string()).with_durable(true), WAIT)
            .await
            .unwrap();
    }
    assert_eq!(client.poll("orders", WAIT).await.unwrap().unwrap().text().unwrap(), "0");
    // No close and no shutdown: the logs are left as a crash would leave them.
    drop(client);
    drop(server);

    let path = wal::log_path(dir.path(), "orders");
    let (crashed, _) = WriteAheadLog::replay(&path).unwrap();
    let expected: Vec<Message> = crashed.messages.iter().cloned().collect();
    assert_eq!(numbers(&expected), [1, 2, 3, 4, 5]);

    let first = Server::bind(config()).await.unwrap().recover().unwrap();
    assert_eq!(first.recovered_queues(), 1);
    assert_eq!(first.queues().get_queue("orders").unwrap().size(), 5);
    drop(first);
    let (after_first, _) = WriteAheadLog::replay(&path).unwrap();
    let ids: Vec<_> = after_first.messages.iter().map(|m| m.id()).collect();
    let expected_ids: Vec<_> = expected.iter().map(|m| m.id()).collect();
    assert_eq!(ids, expected_ids);

    let second = Server::bind(config()).await.unwrap().recover().unwrap();
    assert_eq!(second.recovered_queues(), 1);
    let server = second.start();
    let client = connect(&server).await;
    let mut polled = Vec::new();
    while let Some(message) = client.poll("orders", WAIT).await.unwrap() {
        polled.push(message);
    }
    assert_eq!(numbers(&polled), [1, 2, 3, 4, 5]);

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

/// Floods a two-slot queue with one-way offers while another connection
/// drains it, returning what the consumer saw.
async fn flood(server: &RunningServer, queue: &str, count: u32) -> Vec<Message> {
    let producer = connect(server).await;
    let consumer = connect(server).await;
    let done = Arc::new(AtomicBool::new(false));

    let drain = {
        let done = done.clone();
        let queue = queue.to_string();
        tokio::spawn(async move {
            let mut seen = Vec::new();
            loop {
                match consumer.poll(&queue, Duration::from_millis(20)).await.unwrap() {
                    Some(message) => seen.push(message),
                    None if done.load(Ordering::SeqCst) => break,
                    None => {}
                }
            }
            consumer.close().await.unwrap();
            seen
        })
    };

    for i in 0..count {
        producer.offer_oneway(queue, text(&i.to_string())).await.unwrap();
    }
    // Requests on one connection are handled in order.
    producer.heartbeat().await.unwrap();
    done.store(true, Ordering::SeqCst);

    let seen = drain.await.unwrap();
    producer.close().await.unwrap();
    seen
}

fn assert_increasing(seen: &[Message]) {
    let numbers = numbers(seen);
    assert!(numbers.windows(2).all(|w| w[0] < w[1]), "out of order: {numbers:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_oneway_overload_on_bounded_queue() {
    let server = start(ServerConfig::new("127.0.0.1:0")).await;
    let admin = connect(&server).await;
    admin.create_queue("hot", 2, QueueKind::Bounded).await.unwrap();

    let seen = flood(&server, "hot", 200).await;
    assert_increasing(&seen);

    // Every offer was either consumed or dead-lettered, never both.
    let dead_letters = server.queues().dead_letter_queue().size();
    assert_eq!(seen.len() + dead_letters, 200);
    assert_eq!(server.statistics().dead_letters, dead_letters as u64);
    assert_eq!(admin.queue_status("hot").await.unwrap().size, 0);

    admin.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_oneway_overload_on_circular_queue() {
    let server = start(ServerConfig::new("127.0.0.1:0")).await;
    let admin = connect(&server).await;
    admin.create_queue("ring", 2, QueueKind::Circular).await.unwrap();

    let seen = flood(&server, "ring", 200).await;
    assert_increasing(&seen);

    // A circular queue evicts instead of rejecting.
    let status = admin.queue_status("ring").await.unwrap();
    assert_eq!(seen.len() as u64 + status.discarded, 200);
    assert_eq!(status.size, 0);
    assert!(server.queues().dead_letter_queue().is_empty());
    assert_eq!(server.statistics().dead_letters, 0);
    assert_eq!(seen.last().unwrap().text().unwrap(), "199");

    admin.close().await.unwrap();
    server.shutdown().await.unwrap();
}
