//! Task scheduling and execution
//!
//! A max-priority queue feeding a bounded pool of in-flight executions
//! against one attached session. Queue mutations (cancel, delete,
//! update) go through an id index with lazy heap invalidation, so a
//! stale heap entry is simply skipped at dequeue time.

use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::tasks::action::Action;
use crate::tasks::registry::TaskRegistry;
use crate::tasks::traits::{TaskContext, TaskSpec};
use crate::{Error, Result};

pub const DEFAULT_MAX_CONCURRENT: usize = 5;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Scheduled,
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Handle to an enqueued task
pub struct TaskTicket {
    pub id: String,
    rx: oneshot::Receiver<Result<Value>>,
}

impl TaskTicket {
    /// Await the terminal result.
    ///
    /// Errors if the task was cancelled or deleted before finishing.
    pub async fn wait(self) -> Result<Value> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::internal("Task was cancelled before completion")),
        }
    }
}

/// Heap key: higher priority first, earlier submission among equals
struct HeapItem {
    priority: i32,
    seq: u64,
    id: String,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct QueuedTask {
    spec: TaskSpec,
    priority: i32,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    heap: BinaryHeap<HeapItem>,
    /// Current queue membership; heap entries not matching this index
    /// are stale and skipped.
    queued: HashMap<String, QueuedTask>,
    running: HashSet<String>,
    statuses: HashMap<String, TaskStatus>,
    senders: HashMap<String, oneshot::Sender<Result<Value>>>,
    next_seq: u64,
}

impl Inner {
    fn enqueue(&mut self, id: String, spec: TaskSpec, priority: i32) {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.heap.push(HeapItem {
            priority,
            seq,
            id: id.clone(),
        });
        self.queued.insert(id.clone(), QueuedTask { spec, priority, seq });
        self.statuses.insert(id, TaskStatus::Queued);
    }

    /// Pop the highest-priority live entry, discarding stale ones
    fn pop_next(&mut self) -> Option<(String, TaskSpec)> {
        while let Some(item) = self.heap.pop() {
            let live = self
                .queued
                .get(&item.id)
                .map(|entry| entry.priority == item.priority && entry.seq == item.seq)
                .unwrap_or(false);

            if live {
                if let Some(entry) = self.queued.remove(&item.id) {
                    return Some((item.id, entry.spec));
                }
            }
        }
        None
    }
}

/// Priority scheduler bound to one live session
pub struct TaskManager {
    registry: TaskRegistry,
    context: RwLock<Option<TaskContext>>,
    inner: Mutex<Inner>,
    max_concurrent: usize,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl TaskManager {
    pub fn new(registry: TaskRegistry) -> Self {
        Self::with_limits(
            registry,
            DEFAULT_MAX_CONCURRENT,
            DEFAULT_MAX_RETRIES,
            DEFAULT_RETRY_DELAY_MS,
        )
    }

    pub fn with_limits(
        registry: TaskRegistry,
        max_concurrent: usize,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Self {
        Self {
            registry,
            context: RwLock::new(None),
            inner: Mutex::new(Inner::default()),
            max_concurrent,
            max_retries,
            retry_delay_ms,
        }
    }

    /// Bind the session resources tasks execute against.
    ///
    /// Queued tasks stay pending until a context is attached.
    pub async fn attach(self: &Arc<Self>, context: TaskContext) {
        {
            let mut slot = self.context.write().await;
            *slot = Some(context);
        }
        self.pump().await;
    }

    pub async fn detach(&self) {
        let mut slot = self.context.write().await;
        *slot = None;
    }

    /// Validate and enqueue a task
    pub async fn submit(self: &Arc<Self>, spec: TaskSpec, priority: i32) -> Result<TaskTicket> {
        self.registry.validate(&spec)?;

        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        info!("Adding task {} ({}) with priority {}", id, spec.kind, priority);

        {
            let mut inner = self.inner.lock().await;
            inner.enqueue(id.clone(), spec, priority);
            inner.senders.insert(id.clone(), tx);
        }

        self.pump().await;
        Ok(TaskTicket { id, rx })
    }

    /// Enqueue a task after a delay
    pub async fn schedule(
        self: &Arc<Self>,
        spec: TaskSpec,
        priority: i32,
        delay: std::time::Duration,
    ) -> Result<TaskTicket> {
        self.registry.validate(&spec)?;

        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();

        {
            let mut inner = self.inner.lock().await;
            inner.statuses.insert(id.clone(), TaskStatus::Scheduled);
            inner.senders.insert(id.clone(), tx);
        }

        let manager = Arc::clone(self);
        let task_id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            {
                let mut inner = manager.inner.lock().await;
                if inner.statuses.get(&task_id) != Some(&TaskStatus::Scheduled) {
                    return;
                }
                inner.enqueue(task_id, spec, priority);
            }
            manager.pump().await;
        });

        Ok(TaskTicket { id, rx })
    }

    /// Cancel a scheduled, queued or running task.
    ///
    /// Running tasks are not aborted mid-flight; their result is
    /// discarded once the attempt finishes.
    pub async fn cancel(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let known = inner.queued.remove(id).is_some()
            || inner.running.contains(id)
            || inner.statuses.get(id) == Some(&TaskStatus::Scheduled);
        if !known {
            return Err(Error::task_not_found(id));
        }

        info!("Cancelling task {}", id);
        inner.statuses.insert(id.to_string(), TaskStatus::Cancelled);
        inner.senders.remove(id);
        Ok(())
    }

    /// Remove a queued task entirely
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;

        if inner.queued.remove(id).is_none() {
            return Err(Error::task_not_found(id));
        }

        inner.statuses.remove(id);
        inner.senders.remove(id);
        Ok(())
    }

    /// Append an action to a queued task
    pub async fn add_action(&self, id: &str, action: Action) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .queued
            .get_mut(id)
            .ok_or_else(|| Error::task_not_found(id))?;
        entry.spec.actions.push(action);
        Ok(())
    }

    /// Update a queued task's priority, parameters or actions
    pub async fn update(
        &self,
        id: &str,
        priority: Option<i32>,
        parameters: Option<Map<String, Value>>,
        actions: Option<Vec<Action>>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let next_seq = inner.next_seq;
        let entry = inner
            .queued
            .get_mut(id)
            .ok_or_else(|| Error::task_not_found(id))?;

        let mut candidate = entry.spec.clone();
        if let Some(parameters) = parameters {
            candidate.parameters = parameters;
        }
        if let Some(actions) = actions {
            candidate.actions = actions;
        }
        self.registry.validate(&candidate)?;

        entry.spec = candidate;
        if let Some(priority) = priority {
            entry.priority = priority;
        }

        // Reposition in the heap; the old entry goes stale.
        entry.seq = next_seq;
        let item = HeapItem {
            priority: entry.priority,
            seq: entry.seq,
            id: id.to_string(),
        };
        inner.next_seq += 1;
        inner.heap.push(item);
        Ok(())
    }

    pub async fn status(&self, id: &str) -> Option<TaskStatus> {
        self.inner.lock().await.statuses.get(id).copied()
    }

    pub async fn running_count(&self) -> usize {
        self.inner.lock().await.running.len()
    }

    pub async fn queued_count(&self) -> usize {
        self.inner.lock().await.queued.len()
    }

    /// Fill free execution slots from the queue
    async fn pump(self: &Arc<Self>) {
        let context = {
            let slot = self.context.read().await;
            match slot.as_ref() {
                Some(context) => context.clone(),
                None => return,
            }
        };

        loop {
            let (id, spec) = {
                let mut inner = self.inner.lock().await;
                if inner.running.len() >= self.max_concurrent {
                    return;
                }
                match inner.pop_next() {
                    Some(next) => {
                        inner.running.insert(next.0.clone());
                        inner.statuses.insert(next.0.clone(), TaskStatus::Running);
                        next
                    }
                    None => return,
                }
            };

            debug!("Dispatching task {} ({})", id, spec.kind);
            let manager = Arc::clone(self);
            let task_context = context.clone();
            tokio::spawn(manager.run(id, spec, task_context));
        }
    }

    fn run(
        self: Arc<Self>,
        id: String,
        spec: TaskSpec,
        context: TaskContext,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'static>> {
        Box::pin(async move {
            let result = self.execute_with_retries(&id, &spec, &context).await;

            {
                let mut inner = self.inner.lock().await;
                inner.running.remove(&id);

                if inner.statuses.get(&id) == Some(&TaskStatus::Cancelled) {
                    debug!("Task {} was cancelled, discarding result", id);
                } else {
                    let status = if result.is_ok() {
                        TaskStatus::Completed
                    } else {
                        TaskStatus::Failed
                    };
                    inner.statuses.insert(id.clone(), status);
                    if let Some(tx) = inner.senders.remove(&id) {
                        let _ = tx.send(result);
                    }
                }
            }

            self.pump().await;
        })
    }

    /// Run one task with the retry policy applied
    async fn execute_with_retries(
        &self,
        id: &str,
        spec: &TaskSpec,
        context: &TaskContext,
    ) -> Result<Value> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            debug!("Executing task {} attempt {}/{}", id, attempt, self.max_retries);

            match self.execute_once(spec, context).await {
                Ok(value) => {
                    info!("Task {} completed on attempt {}", id, attempt);
                    return Ok(value);
                }
                Err(e) => {
                    warn!("Task {} attempt {} failed: {}", id, attempt, e);
                    if !e.is_retryable() || attempt >= self.max_retries {
                        return Err(e);
                    }
                    tokio::time::sleep(tokio::time::Duration::from_millis(self.retry_delay_ms))
                        .await;
                }
            }
        }
    }

    async fn execute_once(&self, spec: &TaskSpec, context: &TaskContext) -> Result<Value> {
        if !context.page.is_active() {
            return Err(Error::page_closed(context.page.id()));
        }
        if !context.session.is_connected().await {
            return Err(Error::browser_disconnected(context.session.id()));
        }

        // Readiness gate: don't start interacting with a page that is
        // still loading.
        context
            .page
            .wait_for_network_idle(context.page_load_timeout_ms)
            .await?;

        let task = self.registry.create(spec)?;
        task.execute(context).await
    }
}
