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


//! Observability support.
//!
//! - [`ServerStatistics`] / [`ClientStatistics`]: atomic counters with
//!   serializable snapshots, served as the worker statistics reports
//! - [`ErrorLog`]: a ring of recent server errors, served as the errors report
//!
//! Events are logged through `tracing` when the `tracing` feature is on; the
//! crate never installs a subscriber. With the `observability` feature every
//! counter is also exported through the `metrics` facade under `venice.*`
//! names, for whatever recorder the application installs.

mod errors;
mod metrics;

pub use errors::{ErrorEntry, ErrorLog, DEFAULT_ERROR_LOG_CAPACITY};
pub use self::metrics::{
    ClientStatistics, ClientStatisticsSnapshot, ServerStatistics, ServerStatisticsSnapshot,
};
