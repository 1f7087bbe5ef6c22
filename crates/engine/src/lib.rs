// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cq-engine: queues, recovery, workers, and the polling channel.
//!
//! A [`QueueRegistry`] owns a fixed set of priority lanes over one shared
//! SQLite store. Work enqueued on any lane is durable before it is
//! dispatchable; a [`WorkerPool`] of OS threads drains the lanes in strict
//! priority order; crash recovery re-admits outstanding rows at
//! construction; progress flows out through an in-process [`EventBuffer`]
//! that pollers drain, backed by a fresh status snapshot so the capped,
//! restart-lossy buffer never hides a terminal state.

pub mod config;
pub mod error;
pub mod events;
pub mod poll;
pub mod progress;
pub mod queue;
pub mod recovery;
pub mod registry;
pub mod worker;

#[cfg(test)]
mod test_util;

pub use config::{default_db_path, ConfigError, EngineConfig};
pub use error::EngineError;
pub use events::{EventBuffer, EVENT_BUFFER_CAP};
pub use poll::poll_updates;
pub use progress::ProgressSink;
pub use queue::{Claim, DispatchItem, EnqueueOptions, Queue};
pub use recovery::RECOVERY_HANDLER_GONE;
pub use registry::QueueRegistry;
pub use worker::WorkerPool;
