//! Asynchronous job registry
//!
//! Tracks every forked command from submission to result delivery:
//!
//! ```text
//! submit --> RUNNING --> COMPLETED (unclaimed) --> CLAIMED --> evicted
//! ```
//!
//! A result is handed out with its true payload exactly once; after that
//! first successful poll only a lightweight claim marker survives, and it is
//! dropped once the claim TTL elapses. This bounds memory to live and
//! recently-claimed jobs while still letting a retrying client distinguish
//! "you already got this" from "no such job" for a grace window.
//!
//! The TTL also applies to a completed job that is never polled, measured
//! from its completion time; a running job is never evicted.

use super::{Command, CommandContext};
use commandd_shared::CommandReply;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{Mutex, RwLock};
use tokio::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Progress of a forked command
enum JobState {
    Running,
    Completed {
        reply: CommandReply,
        finished_at: Instant,
    },
}

/// One asynchronous command invocation
pub struct Job {
    id: String,
    state: Mutex<JobState>,
}

impl Job {
    fn new(id: String) -> Self {
        Self {
            id,
            state: Mutex::new(JobState::Running),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record the terminal reply. Called exactly once, by the worker.
    async fn complete(&self, mut reply: CommandReply) {
        reply.completed = Some(true);
        *self.state.lock().await = JobState::Completed {
            reply,
            finished_at: Instant::now(),
        };
    }

    /// The raw result as recorded so far: a default (unset) reply while the
    /// worker is still running, the terminal reply afterwards.
    pub async fn result(&self) -> CommandReply {
        match &*self.state.lock().await {
            JobState::Running => CommandReply::default(),
            JobState::Completed { reply, .. } => reply.clone(),
        }
    }

    pub async fn is_finished(&self) -> bool {
        matches!(&*self.state.lock().await, JobState::Completed { .. })
    }
}

/// Direct status of a single job from a non-owning handle.
///
/// A failed upgrade means the registry released the job after its result was
/// claimed, so the only honest answer is the already-sent acknowledgement.
pub async fn job_status(job: &Weak<Job>) -> CommandReply {
    match job.upgrade() {
        Some(job) => job.result().await,
        None => CommandReply::already_sent(),
    }
}

/// What the registry keeps for one job ID
enum JobEntry {
    /// Running or completed-but-unclaimed; the registry co-owns the job with
    /// the worker task
    Live(Arc<Job>),
    /// Result delivered; only the claim time survives
    Claimed { at: Instant },
}

/// The state store for asynchronous command execution
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobEntry>>,
    next_id: AtomicU64,
    claim_ttl_ms: AtomicU64,
}

impl JobRegistry {
    pub fn new(claim_ttl: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            claim_ttl_ms: AtomicU64::new(claim_ttl.as_millis() as u64),
        }
    }

    /// Adjust the claim grace period; takes effect on the next poll
    pub fn set_claim_ttl(&self, ttl: Duration) {
        self.claim_ttl_ms
            .store(ttl.as_millis() as u64, Ordering::SeqCst);
    }

    fn claim_ttl(&self) -> Duration {
        Duration::from_millis(self.claim_ttl_ms.load(Ordering::SeqCst))
    }

    /// Fork a command onto a worker task and return its job ID.
    ///
    /// The worker receives its own `Arc` clone of the job before the task is
    /// spawned, so by the time this returns the job is co-owned by a live
    /// worker. Returns immediately; never blocks on the command itself.
    pub async fn submit(&self, command: Arc<dyn Command>, ctx: CommandContext) -> String {
        let id = format!("job-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let job = Arc::new(Job::new(id.clone()));

        self.jobs
            .write()
            .await
            .insert(id.clone(), JobEntry::Live(job.clone()));

        debug!("forked {id}");
        let worker_job = job;
        tokio::spawn(async move {
            let reply = match AssertUnwindSafe(command.execute(&ctx)).catch_unwind().await {
                Ok(Ok(reply)) => reply,
                Ok(Err(err)) => {
                    warn!("{} failed: {err:#}", worker_job.id());
                    CommandReply::failure(err.to_string())
                }
                Err(_) => {
                    error!("{} worker panicked", worker_job.id());
                    CommandReply::failure("command terminated unexpectedly")
                }
            };
            worker_job.complete(reply).await;
        });

        id
    }

    /// Look up a job and report its state, claiming the result if it is
    /// ready.
    ///
    /// The completed-to-claimed transition happens under the registry write
    /// lock: of two racing polls exactly one receives the true payload, the
    /// other the already-sent acknowledgement.
    pub async fn poll(&self, id: &str) -> CommandReply {
        let ttl = self.claim_ttl();
        let mut jobs = self.jobs.write().await;

        enum Snapshot {
            Missing,
            Claimed(Instant),
            Live(Arc<Job>),
        }

        let snapshot = match jobs.get(id) {
            None => Snapshot::Missing,
            Some(JobEntry::Claimed { at }) => Snapshot::Claimed(*at),
            Some(JobEntry::Live(job)) => Snapshot::Live(job.clone()),
        };

        match snapshot {
            Snapshot::Missing => CommandReply::not_found(),
            Snapshot::Claimed(at) => {
                if at.elapsed() >= ttl {
                    jobs.remove(id);
                    debug!("evicted claimed {id}");
                    CommandReply::not_found()
                } else {
                    CommandReply::already_sent()
                }
            }
            Snapshot::Live(job) => {
                let state = job.state.lock().await;
                match &*state {
                    JobState::Running => CommandReply::running(),
                    JobState::Completed { reply, finished_at } => {
                        if finished_at.elapsed() >= ttl {
                            drop(state);
                            jobs.remove(id);
                            debug!("evicted unclaimed {id}");
                            CommandReply::not_found()
                        } else {
                            let reply = reply.clone();
                            drop(state);
                            // Claim: drop the strong hold on the command,
                            // keep only the marker until the TTL elapses.
                            jobs.insert(id.to_string(), JobEntry::Claimed { at: Instant::now() });
                            debug!("claimed {id}");
                            reply
                        }
                    }
                }
            }
        }
    }

    /// Non-owning handle to a live job, for direct status inspection.
    /// `None` once the job has been claimed or evicted (or never existed).
    pub async fn watch(&self, id: &str) -> Option<Weak<Job>> {
        match self.jobs.read().await.get(id) {
            Some(JobEntry::Live(job)) => Some(Arc::downgrade(job)),
            _ => None,
        }
    }
}
