//! Task descriptors and enqueue options

use omnirpc_core::{Error, Result};
use serde::Serialize;
use std::time::{Duration, SystemTime};

/// Queue a task lands on when no [`EnqueueOption::Queue`] is given
pub const DEFAULT_QUEUE: &str = "default";

/// Retry budget when no [`EnqueueOption::MaxRetry`] is given
pub const DEFAULT_MAX_RETRY: u32 = 25;

/// A unit of background work: a type name plus an opaque payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub type_name: String,
    pub payload: Vec<u8>,
}

impl Task {
    /// Create a task whose payload is `payload` encoded as JSON
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] for an empty type name
    /// - [`Error::Serialization`] when the payload cannot be encoded
    pub fn new<P: Serialize + ?Sized>(type_name: impl Into<String>, payload: &P) -> Result<Self> {
        let payload = serde_json::to_vec(payload).map_err(|e| Error::Serialization(e.to_string()))?;
        Self::from_bytes(type_name, payload)
    }

    /// Create a task with an already encoded payload
    pub fn from_bytes(type_name: impl Into<String>, payload: Vec<u8>) -> Result<Self> {
        let type_name = type_name.into();
        if type_name.trim().is_empty() {
            return Err(Error::InvalidArgument("task type name is empty".to_string()));
        }
        Ok(Self { type_name, payload })
    }

    /// Decode a JSON payload back into `T`
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.payload).map_err(|e| Error::Decode(e.to_string()))
    }
}

/// One adjustment to how a task is enqueued
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueOption {
    Queue(String),
    MaxRetry(u32),
    /// Run after this delay
    ProcessIn(Duration),
    /// Run at this time
    ProcessAt(SystemTime),
    /// Give up on the task after this time
    Deadline(SystemTime),
    /// Reject duplicates carrying the same id
    UniqueId(String),
}

/// When a task becomes eligible to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Immediately,
    After(Duration),
    At(SystemTime),
}

/// A task with its options folded in, as handed to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDescriptor {
    pub task: Task,
    pub queue: String,
    pub max_retry: u32,
    pub schedule: Schedule,
    pub deadline: Option<SystemTime>,
    pub unique_id: Option<String>,
}

impl TaskDescriptor {
    /// Fold `options` over the defaults; later options win
    pub fn new(task: Task, options: impl IntoIterator<Item = EnqueueOption>) -> Self {
        let mut descriptor = Self {
            task,
            queue: DEFAULT_QUEUE.to_string(),
            max_retry: DEFAULT_MAX_RETRY,
            schedule: Schedule::Immediately,
            deadline: None,
            unique_id: None,
        };
        for option in options {
            descriptor.apply(option);
        }
        descriptor
    }

    fn apply(&mut self, option: EnqueueOption) {
        match option {
            EnqueueOption::Queue(queue) if !queue.trim().is_empty() => self.queue = queue,
            EnqueueOption::Queue(_) => {}
            EnqueueOption::MaxRetry(n) => self.max_retry = n,
            EnqueueOption::ProcessIn(delay) => self.schedule = Schedule::After(delay),
            EnqueueOption::ProcessAt(at) => self.schedule = Schedule::At(at),
            EnqueueOption::Deadline(at) => self.deadline = Some(at),
            EnqueueOption::UniqueId(id) => self.unique_id = Some(id),
        }
    }
}

/// What the engine reports back for an accepted task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub id: String,
    pub queue: String,
}
