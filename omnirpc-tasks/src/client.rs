//! Enqueue-side client over a pluggable task engine
//!
//! The engine that stores, schedules and retries tasks lives outside this
//! crate. [`TaskEngine`] is the seam it plugs into; [`TaskClient`] builds
//! descriptors and hands them over.

use crate::task::{EnqueueOption, Task, TaskDescriptor, TaskInfo};
use async_trait::async_trait;
use omnirpc_core::Result;
use serde::Serialize;
use std::time::{Duration, SystemTime};

/// Backend that accepts tasks for later processing
#[async_trait]
pub trait TaskEngine: Send + Sync {
    async fn enqueue(&self, descriptor: TaskDescriptor) -> Result<TaskInfo>;
}

#[async_trait]
impl<E: TaskEngine + ?Sized> TaskEngine for std::sync::Arc<E> {
    async fn enqueue(&self, descriptor: TaskDescriptor) -> Result<TaskInfo> {
        (**self).enqueue(descriptor).await
    }
}

/// Client for enqueueing tasks
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use omnirpc_tasks::{EnqueueOption, TaskClient, TaskDescriptor, TaskEngine, TaskInfo};
///
/// struct Inline;
///
/// #[async_trait]
/// impl TaskEngine for Inline {
///     async fn enqueue(&self, d: TaskDescriptor) -> omnirpc_core::Result<TaskInfo> {
///         Ok(TaskInfo { id: "1".into(), queue: d.queue })
///     }
/// }
///
/// # async fn example() -> omnirpc_core::Result<()> {
/// let client = TaskClient::new(Inline);
/// let (_task, info) = client
///     .enqueue_now("email:send", &"user@example.com", [EnqueueOption::Queue("critical".into())])
///     .await?;
/// assert_eq!(info.queue, "critical");
/// # Ok(())
/// # }
/// ```
pub struct TaskClient<E> {
    engine: E,
}

impl<E: TaskEngine> TaskClient<E> {
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Enqueue an already built task
    pub async fn enqueue(
        &self,
        task: Task,
        options: impl IntoIterator<Item = EnqueueOption>,
    ) -> Result<TaskInfo> {
        let descriptor = TaskDescriptor::new(task, options);
        tracing::debug!(
            task_type = %descriptor.task.type_name,
            queue = %descriptor.queue,
            max_retry = descriptor.max_retry,
            "Enqueueing task"
        );
        let info = self.engine.enqueue(descriptor).await?;
        tracing::info!(task_id = %info.id, queue = %info.queue, "Task enqueued");
        Ok(info)
    }

    /// Build a task from `payload` and enqueue it for immediate processing
    pub async fn enqueue_now<P: Serialize + ?Sized>(
        &self,
        type_name: &str,
        payload: &P,
        options: impl IntoIterator<Item = EnqueueOption>,
    ) -> Result<(Task, TaskInfo)> {
        let task = Task::new(type_name, payload)?;
        let info = self.enqueue(task.clone(), options).await?;
        Ok((task, info))
    }

    /// Enqueue a task to run after `delay`
    ///
    /// The delay overrides any scheduling option in `options`.
    pub async fn enqueue_in<P: Serialize + ?Sized>(
        &self,
        delay: Duration,
        type_name: &str,
        payload: &P,
        options: impl IntoIterator<Item = EnqueueOption>,
    ) -> Result<(Task, TaskInfo)> {
        let options = options
            .into_iter()
            .chain(std::iter::once(EnqueueOption::ProcessIn(delay)));
        self.enqueue_now(type_name, payload, options).await
    }

    /// Enqueue a task to run at `at`
    ///
    /// The time overrides any scheduling option in `options`.
    pub async fn enqueue_at<P: Serialize + ?Sized>(
        &self,
        at: SystemTime,
        type_name: &str,
        payload: &P,
        options: impl IntoIterator<Item = EnqueueOption>,
    ) -> Result<(Task, TaskInfo)> {
        let options = options
            .into_iter()
            .chain(std::iter::once(EnqueueOption::ProcessAt(at)));
        self.enqueue_now(type_name, payload, options).await
    }
}
