//! Task-queue interface for omnirpc services
//!
//! Services often hand slow work to a background queue instead of doing it
//! inside an RPC call. This crate describes that hand-off without
//! implementing the queue itself:
//!
//! - **config**: Redis backend modes and worker settings
//! - **task**: tasks, enqueue options and the descriptor they fold into
//! - **client**: [`TaskClient`] over any [`TaskEngine`]

mod client;
mod config;
mod task;

pub use client::{TaskClient, TaskEngine};
pub use config::{RedisConfig, RedisConnection, RedisMode, ServerConfig};
pub use task::{
    EnqueueOption, Schedule, Task, TaskDescriptor, TaskInfo, DEFAULT_MAX_RETRY, DEFAULT_QUEUE,
};
