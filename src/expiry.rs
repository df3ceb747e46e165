//! Expiry scheduler
//!
//! One background task owns a min-heap of `(deadline, job)` entries. Workers
//! and the artifact endpoint ask for an expiry with [`ExpiryHandle::schedule`];
//! a manual sweep goes through [`ExpiryHandle::sweep`]. Both end in the same
//! eviction step: remove the record if it is terminal, then delete its
//! artifact.

use crate::registry::JobRegistry;
use crate::types::{Event, JobId};
use crate::utils::remove_file_if_exists;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use utoipa::ToSchema;

/// Result of a manual sweep
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SweepReport {
    /// Always true; a sweep has no failure mode of its own
    pub success: bool,
    /// Records evicted by this sweep
    pub cleaned: usize,
    /// Records still live afterwards
    pub remaining: usize,
}

enum Command {
    Schedule {
        id: JobId,
        after: Duration,
    },
    Sweep {
        older_than: Duration,
        reply: oneshot::Sender<SweepReport>,
    },
}

/// Cheap handle for talking to the scheduler task
#[derive(Clone, Debug)]
pub struct ExpiryHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Schedule { id, after } => f
                .debug_struct("Schedule")
                .field("id", id)
                .field("after", after)
                .finish(),
            Command::Sweep { older_than, .. } => f
                .debug_struct("Sweep")
                .field("older_than", older_than)
                .finish(),
        }
    }
}

impl ExpiryHandle {
    /// Evict `id` once `after` has elapsed; ignored if the job is already scheduled
    pub fn schedule(&self, id: JobId, after: Duration) {
        if self.tx.send(Command::Schedule { id, after }).is_err() {
            tracing::debug!("Expiry scheduler stopped, dropping schedule request");
        }
    }

    /// Evict every terminal record whose terminal timestamp is older than `older_than`
    ///
    /// Returns `None` if the scheduler task has stopped.
    pub async fn sweep(&self, older_than: Duration) -> Option<SweepReport> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Sweep { older_than, reply }).ok()?;
        rx.await.ok()
    }
}

/// Start the scheduler task; it runs until `shutdown` is cancelled
pub fn spawn(
    registry: Arc<JobRegistry>,
    event_tx: broadcast::Sender<Event>,
    shutdown: CancellationToken,
) -> (ExpiryHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let task = Scheduler {
        registry,
        event_tx,
        heap: BinaryHeap::new(),
        scheduled: HashSet::new(),
    };
    let handle = tokio::spawn(task.run(rx, shutdown));
    (ExpiryHandle { tx }, handle)
}

struct Scheduler {
    registry: Arc<JobRegistry>,
    event_tx: broadcast::Sender<Event>,
    heap: BinaryHeap<Reverse<(Instant, JobId)>>,
    scheduled: HashSet<JobId>,
}

impl Scheduler {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>, shutdown: CancellationToken) {
        tracing::debug!("Expiry scheduler started");

        loop {
            let next_deadline = self.heap.peek().map(|Reverse((at, _))| *at);
            let timer = async move {
                match next_deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = rx.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                _ = timer => self.fire_due().await,
            }
        }

        tracing::debug!(pending = self.scheduled.len(), "Expiry scheduler stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Schedule { id, after } => {
                if self.scheduled.insert(id.clone()) {
                    tracing::debug!(job_id = %id, after_secs = after.as_secs_f64(), "Expiry scheduled");
                    self.heap.push(Reverse((Instant::now() + after, id)));
                }
            }
            Command::Sweep { older_than, reply } => {
                let report = self.sweep(older_than).await;
                // caller may have gone away
                reply.send(report).ok();
            }
        }
    }

    async fn fire_due(&mut self) {
        let now = Instant::now();
        while let Some(Reverse((at, _))) = self.heap.peek() {
            if *at > now {
                break;
            }
            if let Some(Reverse((_, id))) = self.heap.pop() {
                // entries already evicted by a sweep are no longer in `scheduled`
                if self.scheduled.remove(&id) {
                    evict(&self.registry, &self.event_tx, &id).await;
                }
            }
        }
    }

    async fn sweep(&mut self, older_than: Duration) -> SweepReport {
        let age = chrono::Duration::from_std(older_than).unwrap_or(chrono::Duration::MAX);
        let cutoff = chrono::Utc::now()
            .checked_sub_signed(age)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);

        let mut cleaned = 0;
        for id in self.registry.terminal_before(cutoff).await {
            self.scheduled.remove(&id);
            if evict(&self.registry, &self.event_tx, &id).await {
                cleaned += 1;
            }
        }

        let remaining = self.registry.len().await;
        tracing::info!(cleaned, remaining, "Sweep finished");
        SweepReport {
            success: true,
            cleaned,
            remaining,
        }
    }
}

/// Remove `id` if it is terminal and delete its artifact; returns whether it was evicted
async fn evict(registry: &JobRegistry, event_tx: &broadcast::Sender<Event>, id: &JobId) -> bool {
    let Some(record) = registry.remove_if(id, |r| r.is_terminal()).await else {
        tracing::debug!(job_id = %id, "Nothing to evict");
        return false;
    };

    if let Some(path) = &record.artifact_path {
        if let Err(e) = remove_file_if_exists(path).await {
            tracing::warn!(job_id = %id, ?path, error = %e, "Failed to delete expired artifact");
        }
    }

    tracing::info!(job_id = %id, state = %record.state, "Job expired");
    event_tx.send(Event::Expired { id: id.clone() }).ok();
    true
}
