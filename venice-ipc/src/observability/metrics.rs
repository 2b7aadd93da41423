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


//! Statistics counters for servers and clients.
//!
//! Counters are relaxed atomics. Reads are approximate: there is no
//! consistency between fields of one snapshot. With the `observability`
//! feature each update is mirrored to the `metrics` facade.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Server-wide counters.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::observability::ServerStatistics;
///
/// let stats = ServerStatistics::new();
/// stats.record_connection_opened();
/// stats.record_message_received();
/// stats.record_message_sent();
///
/// let snapshot = stats.snapshot();
/// assert_eq!(snapshot.active_connections, 1);
/// assert_eq!(snapshot.messages_received, 1);
/// ```
#[derive(Debug, Default)]
pub struct ServerStatistics {
    /// Connections accepted
    connections_opened: AtomicU64,
    /// Connections closed
    connections_closed: AtomicU64,
    /// Connections refused at the limit
    connections_rejected: AtomicU64,
    /// Messages decoded
    messages_received: AtomicU64,
    /// Messages written, responses and pushes
    messages_sent: AtomicU64,
    /// Responses with a failure status
    requests_failed: AtomicU64,
    /// Topic deliveries queued to subscribers
    subscription_pushes: AtomicU64,
    /// Topic deliveries dropped on a full subscriber buffer
    subscription_discards: AtomicU64,
    /// Messages routed to the dead-letter queue
    dead_letters: AtomicU64,
    /// Total request handling time
    total_handling_us: AtomicU64,
}

impl ServerStatistics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an accepted connection.
    pub fn record_connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("venice.server.connections.opened").increment(1);
            metrics::gauge!("venice.server.connections.active").increment(1.0);
        }
    }

    /// Records a closed connection.
    pub fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("venice.server.connections.closed").increment(1);
            metrics::gauge!("venice.server.connections.active").decrement(1.0);
        }
    }

    /// Records a connection refused at the limit.
    pub fn record_connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.server.connections.rejected").increment(1);
    }

    /// Records a decoded message.
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.server.messages.received").increment(1);
    }

    /// Records a written message.
    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.server.messages.sent").increment(1);
    }

    /// Records a response with a failure status.
    pub fn record_request_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.server.requests.failed").increment(1);
    }

    /// Records a topic delivery queued to a subscriber.
    pub fn record_subscription_push(&self) {
        self.subscription_pushes.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.server.subscriptions.pushed").increment(1);
    }

    /// Records a topic delivery dropped on a full buffer.
    pub fn record_subscription_discard(&self) {
        self.subscription_discards.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.server.subscriptions.discarded").increment(1);
    }

    /// Records a message routed to the dead-letter queue.
    pub fn record_dead_letter(&self) {
        self.dead_letters.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.server.dead_letters").increment(1);
    }

    /// Records the time spent handling one request.
    pub fn record_handling_time(&self, elapsed: Duration) {
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_handling_us.fetch_add(us, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::histogram!("venice.server.request.handling_seconds").record(elapsed.as_secs_f64());
    }

    /// Connections currently open.
    #[must_use]
    pub fn active_connections(&self) -> u64 {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);
        opened.saturating_sub(closed)
    }

    /// Copies the counters.
    #[must_use]
    pub fn snapshot(&self) -> ServerStatisticsSnapshot {
        let received = self.messages_received.load(Ordering::Relaxed);
        let total_us = self.total_handling_us.load(Ordering::Relaxed);
        ServerStatisticsSnapshot {
            active_connections: self.active_connections(),
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            messages_received: received,
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            subscription_pushes: self.subscription_pushes.load(Ordering::Relaxed),
            subscription_discards: self.subscription_discards.load(Ordering::Relaxed),
            dead_letters: self.dead_letters.load(Ordering::Relaxed),
            average_handling_us: if received == 0 { 0 } else { total_us / received },
        }
    }
}

/// A copy of [`ServerStatistics`], sent as the worker statistics report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatisticsSnapshot {
    /// Connections currently open, one handler task each
    pub active_connections: u64,
    /// Connections accepted since start
    pub connections_opened: u64,
    /// Connections refused at the limit
    pub connections_rejected: u64,
    /// Messages decoded
    pub messages_received: u64,
    /// Messages written
    pub messages_sent: u64,
    /// Responses with a failure status
    pub requests_failed: u64,
    /// Topic deliveries queued
    pub subscription_pushes: u64,
    /// Topic deliveries dropped
    pub subscription_discards: u64,
    /// Messages dead-lettered
    pub dead_letters: u64,
    /// Mean request handling time
    pub average_handling_us: u64,
}

/// Per-connection client counters.
///
/// # Examples
///
/// ```rust
/// use venice_ipc::observability::ClientStatistics;
/// use std::time::Duration;
///
/// let stats = ClientStatistics::new();
/// stats.record_latency(Duration::from_millis(10));
/// stats.record_latency(Duration::from_millis(20));
/// assert_eq!(stats.snapshot().average_latency_us, 15_000);
/// ```
#[derive(Debug, Default)]
pub struct ClientStatistics {
    messages_sent: AtomicU64,
    responses_received: AtomicU64,
    out_of_order_discards: AtomicU64,
    timeouts: AtomicU64,
    subscription_messages: AtomicU64,
    subscription_discards: AtomicU64,
    total_latency_us: AtomicU64,
    latency_count: AtomicU64,
}

impl ClientStatistics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a written request.
    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.client.messages.sent").increment(1);
    }

    /// Records a matched response.
    pub fn record_response_received(&self) {
        self.responses_received.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.client.responses.received").increment(1);
    }

    /// Records a response discarded because it matched no waiter.
    pub fn record_out_of_order_discard(&self) {
        self.out_of_order_discards.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.client.responses.discarded").increment(1);
    }

    /// Records a request that timed out.
    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.client.timeouts").increment(1);
    }

    /// Records a subscription delivery handed to the handler.
    pub fn record_subscription_message(&self) {
        self.subscription_messages.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.client.subscriptions.handled").increment(1);
    }

    /// Records a subscription delivery dropped.
    pub fn record_subscription_discard(&self) {
        self.subscription_discards.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("venice.client.subscriptions.discarded").increment(1);
    }

    /// Records one request/response round trip.
    pub fn record_latency(&self, latency: Duration) {
        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.total_latency_us.fetch_add(us, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::histogram!("venice.client.request.latency_seconds").record(latency.as_secs_f64());
    }

    /// Copies the counters.
    #[must_use]
    pub fn snapshot(&self) -> ClientStatisticsSnapshot {
        let count = self.latency_count.load(Ordering::Relaxed);
        let total = self.total_latency_us.load(Ordering::Relaxed);
        ClientStatisticsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            responses_received: self.responses_received.load(Ordering::Relaxed),
            out_of_order_discards: self.out_of_order_discards.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            subscription_messages: self.subscription_messages.load(Ordering::Relaxed),
            subscription_discards: self.subscription_discards.load(Ordering::Relaxed),
            average_latency_us: if count == 0 { 0 } else { total / count },
        }
    }
}

/// A copy of [`ClientStatistics`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientStatisticsSnapshot {
    /// Requests written
    pub messages_sent: u64,
    /// Responses matched to a waiter
    pub responses_received: u64,
    /// Responses that matched no waiter
    pub out_of_order_discards: u64,
    /// Requests that timed out
    pub timeouts: u64,
    /// Subscription deliveries handled
    pub subscription_messages: u64,
    /// Subscription deliveries dropped
    pub subscription_discards: u64,
    /// Mean round trip
    pub average_latency_us: u64,
}


#[cfg(all(test, feature = "observability"))]
mod recorder_tests {
    use super::*;
    use metrics::{Counter, CounterFn, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    type Tally = Arc<Mutex<HashMap<String, u64>>>;

    struct Slot {
        name: String,
        tally: Tally,
    }

    impl CounterFn for Slot {
        fn increment(&self, value: u64) {
            *self.tally.lock().entry(self.name.clone()).or_default() += value;
        }

        fn absolute(&self, value: u64) {
            self.tally.lock().insert(self.name.clone(), value);
        }
    }

    /// Counts counter increments by name and ignores everything else.
    struct TallyRecorder(Tally);

    impl Recorder for TallyRecorder {
        fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
        fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            Counter::from_arc(Arc::new(Slot {
                name: key.name().to_string(),
                tally: self.0.clone(),
            }))
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, _: &Key, _: &Metadata<'_>) -> Histogram {
            Histogram::noop()
        }
    }

    #[test]
    fn test_counters_reach_the_recorder() {
        let tally = Tally::default();
        let recorder = TallyRecorder(tally.clone());
        metrics::with_local_recorder(&recorder, || {
            let server = ServerStatistics::new();
            server.record_connection_opened();
            server.record_dead_letter();
            server.record_dead_letter();
            server.record_handling_time(Duration::from_millis(1));
            let client = ClientStatistics::new();
            client.record_timeout();
            client.record_latency(Duration::from_millis(1));
        });

        let counts = tally.lock();
        assert_eq!(counts.get("venice.server.connections.opened"), Some(&1));
        assert_eq!(counts.get("venice.server.dead_letters"), Some(&2));
        assert_eq!(counts.get("venice.client.timeouts"), Some(&1));
        assert_eq!(counts.len(), 3);
    }
}
