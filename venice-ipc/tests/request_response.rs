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


//! Integration tests for request/response traffic.
//!
//! These tests cover:
//! - The default handler and named functions
//! - Control requests (heartbeat, status, statistics)
//! - Concurrent callers sharing one connection
//! - Timeouts and discarding late responses

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use venice_ipc::client::{Client, ClientConfig};
use venice_ipc::destination::{FunctionHandler, HandlerError};
use venice_ipc::message::{Message, MessageType, ResponseStatus};
use venice_ipc::server::{RunningServer, Server, ServerConfig};
use venice_ipc::IpcError;

fn pong(request: Message) -> Result<Message, HandlerError> {
    let reply = match request.text()? {
        "ping" => "pong".to_string(),
        other => format!("echo: {other}"),
    };
    Ok(Message::new_text("pong", "text/plain", reply)?)
}

/// Sleeps for the number of millis given in the request text.
struct Sleeper;

#[async_trait]
impl FunctionHandler for Sleeper {
    async fn call(&self, request: Message) -> Result<Message, HandlerError> {
        let millis: u64 = request.text()?.parse()?;
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(Message::new_text("slept", "text/plain", millis.to_string())?)
    }
}

async fn start_server() -> RunningServer {
    let config = ServerConfig::new("127.0.0.1:0").with_default_handler(Arc::new(pong));
    let bound = Server::bind(config).await.unwrap();
    bound.register_function("sleep", Arc::new(Sleeper)).unwrap();
    bound
        .register_function(
            "fail",
            Arc::new(|_: Message| -> Result<Message, HandlerError> { Err("boom".into()) }),
        )
        .unwrap();
    bound.recover().unwrap().start()
}

async fn connect(server: &RunningServer) -> Client {
    Client::connect(ClientConfig::new(server.local_addr().to_string()))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_ping_pong_through_default_handler() {
    let server = start_server().await;
    let client = connect(&server).await;

    let request = Message::new_text("ping", "text/plain", "ping").unwrap();
    let response = client.send(request.clone()).await.unwrap();

    assert_eq!(response.id(), request.id());
    assert_eq!(response.message_type(), MessageType::Response);
    assert_eq!(response.response_status(), ResponseStatus::Ok);
    assert_eq!(response.text().unwrap(), "pong");

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_named_function_and_failures() {
    let server = start_server().await;
    let client = connect(&server).await;

    let request = Message::new_text("nap", "text/plain", "5")
        .unwrap()
        .with_destination("sleep");
    assert_eq!(client.send(request).await.unwrap().text().unwrap(), "5");

    let request = Message::new_text("x", "text/plain", "x")
        .unwrap()
        .with_destination("fail");
    match client.send(request).await {
        Err(IpcError::Rejected { status, reason }) => {
            assert_eq!(status, ResponseStatus::HandlerError);
            assert!(reason.contains("boom"));
        }
        other => panic!("unexpected {other:?}"),
    }

    let request = Message::new_text("x", "text/plain", "x")
        .unwrap()
        .with_destination("missing");
    match client.send(request).await {
        Err(IpcError::Rejected { status, .. }) => assert_eq!(status, ResponseStatus::FunctionNotFound),
        other => panic!("unexpected {other:?}"),
    }

    assert!(client.exists_function("sleep").await.unwrap());
    assert!(!client.exists_function("missing").await.unwrap());
    let status = client.function_status("fail").await.unwrap();
    assert_eq!(status.invocations, 1);
    assert_eq!(status.failures, 1);

    client.remove_function("fail").await.unwrap();
    assert!(!client.exists_function("fail").await.unwrap());

    let errors = client.server_errors().await.unwrap();
    assert!(errors.iter().any(|e| e.message.contains("boom")));

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_control_requests() {
    let server = start_server().await;
    let client = connect(&server).await;

    client.heartbeat().await.unwrap();

    let status = client.server_status().await.unwrap();
    assert_eq!(status.protocol_version, 1);
    assert!(!status.encrypt);
    assert!(!status.authentication);
    assert_eq!(status.connections, 1);
    assert!(status.functions.contains(&"sleep".to_string()));
    assert!(status.queues.contains(&"dead-letter-queue".to_string()));

    let statistics = client.server_thread_pool_statistics().await.unwrap();
    assert_eq!(statistics.active_connections, 1);
    assert!(statistics.messages_received >= 3);

    let local = client.client_statistics().unwrap();
    assert_eq!(local.subject(), "$client-thread-pool-statistics");
    let snapshot: venice_ipc::observability::ClientStatisticsSnapshot = local.json().unwrap();
    assert_eq!(snapshot.responses_received, 3);

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_senders_get_their_own_responses() {
    let server = start_server().await;
    let client = Arc::new(connect(&server).await);

    let mut tasks = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let request = Message::new_text("echo", "text/plain", format!("n{i}")).unwrap();
            let response = client.send(request.clone()).await.unwrap();
            assert_eq!(response.id(), request.id());
            assert_eq!(response.text().unwrap(), format!("echo: n{i}"));
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(client.statistics().snapshot().responses_received, 16);

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_timeout_keeps_connection_usable() {
    let server = start_server().await;
    let client = connect(&server).await;

    let slow = Message::new_text("nap", "text/plain", "300")
        .unwrap()
        .with_destination("sleep");
    let timeout = Duration::from_millis(50);
    let started = std::time::Instant::now();
    let result = client.send_with_timeout(slow, timeout).await;
    let elapsed = started.elapsed();
    assert!(matches!(result, Err(IpcError::Timeout { .. })));
    // The handler sleeps 300ms, so an early or late wake-up shows here.
    assert!(elapsed >= timeout, "gave up after {elapsed:?}");
    assert!(elapsed <= timeout + Duration::from_millis(150), "gave up after {elapsed:?}");
    assert!(!client.is_closed());

    // The late answer to the first request is discarded on the way.
    let request = Message::new_text("ping", "text/plain", "ping").unwrap();
    let response = client
        .send_with_timeout(request, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(response.text().unwrap(), "pong");

    let snapshot = client.statistics().snapshot();
    assert_eq!(snapshot.timeouts, 1);
    assert_eq!(snapshot.out_of_order_discards, 1);

    client.close().await.unwrap();
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_close_is_idempotent_and_fails_later_sends() {
    let server = start_server().await;
    let client = connect(&server).await;

    client.close().await.unwrap();
    client.close().await.unwrap();
    assert!(client.is_closed());

    let request = Message::new_text("ping", "text/plain", "ping").unwrap();
    assert!(matches!(
        client.send(request).await,
        Err(IpcError::ConnectionClosed { .. })
    ));
    server.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_server_shutdown_closes_clients() {
    let server = start_server().await;
    let client = connect(&server).await;
    client.heartbeat().await.unwrap();

    server.shutdown().await.unwrap();

    let request = Message::new_text("ping", "text/plain", "ping").unwrap();
    let result = client
        .send_with_timeout(request, Duration::from_secs(2))
        .await;
    assert!(matches!(
        result,
        Err(IpcError::ConnectionClosed { .. }) | Err(IpcError::Transport(_))
    ));
}

#[tokio::test]
async fn test_connection_limit_refuses_extra_clients() {
    let config = ServerConfig::new("127.0.0.1:0").with_max_connections(1);
    let server = Server::start(config).await.unwrap();
    let first = connect(&server).await;

    let second = Client::connect(ClientConfig::new(server.local_addr().to_string())).await;
    assert!(second.is_err());
    assert_eq!(server.statistics().connections_rejected, 1);
    first.heartbeat().await.unwrap();

    first.close().await.unwrap();
    server.shutdown().await.unwrap();
}
