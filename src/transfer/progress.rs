//! Progress reporting for long-running transfers.
//!
//! The orchestrator publishes a full [`ProgressSnapshot`] on every change to
//! whatever [`ProgressSink`] the caller hands in. Sinks provided here:
//! closures, an mpsc channel and a tracing log line.

use std::sync::mpsc::Sender;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

/// Lifecycle of a transfer job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

impl JobStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// Whether no further snapshots follow.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub job_id: Uuid,
    pub total: usize,
    pub processed: usize,
    pub status: JobStatus,
    pub message: String,
}

/// Receiver of progress snapshots.
pub trait ProgressSink: Send {
    fn publish(&self, snapshot: &ProgressSnapshot);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressSnapshot) + Send,
{
    fn publish(&self, snapshot: &ProgressSnapshot) {
        self(snapshot);
    }
}

/// Forwards snapshots over an mpsc channel. A dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelSink(pub Sender<ProgressSnapshot>);

impl ProgressSink for ChannelSink {
    fn publish(&self, snapshot: &ProgressSnapshot) {
        let _ = self.0.send(snapshot.clone());
    }
}

/// Writes each snapshot as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn publish(&self, snapshot: &ProgressSnapshot) {
        if snapshot.status == JobStatus::Error {
            warn!(
                job_id = %snapshot.job_id,
                processed = snapshot.processed,
                total = snapshot.total,
                message = %snapshot.message,
                "Transfer failed"
            );
        } else {
            info!(
                job_id = %snapshot.job_id,
                status = snapshot.status.as_str(),
                processed = snapshot.processed,
                total = snapshot.total,
                message = %snapshot.message,
                "Transfer progress"
            );
        }
    }
}

/// Job state plus the sink it reports to.
pub struct Progress<'s> {
    sink: &'s dyn ProgressSink,
    snapshot: ProgressSnapshot,
}

impl<'s> Progress<'s> {
    /// New idle job. Nothing is published until `start`.
    #[must_use]
    pub fn new(sink: &'s dyn ProgressSink) -> Self {
        Self::with_job_id(sink, Uuid::new_v4())
    }

    #[must_use]
    pub fn with_job_id(sink: &'s dyn ProgressSink, job_id: Uuid) -> Self {
        Self {
            sink,
            snapshot: ProgressSnapshot {
                job_id,
                total: 0,
                processed: 0,
                status: JobStatus::Idle,
                message: String::new(),
            },
        }
    }

    pub fn set_job_id(&mut self, job_id: Uuid) {
        self.snapshot.job_id = job_id;
    }

    #[must_use]
    pub fn snapshot(&self) -> &ProgressSnapshot {
        &self.snapshot
    }

    fn publish(&self) {
        self.sink.publish(&self.snapshot);
    }

    pub fn start(&mut self, total: usize, message: impl Into<String>) {
        self.snapshot.total = total;
        self.snapshot.processed = 0;
        self.snapshot.status = JobStatus::Running;
        self.snapshot.message = message.into();
        self.publish();
    }

    /// Change the message without moving the counter.
    pub fn note(&mut self, message: impl Into<String>) {
        self.snapshot.message = message.into();
        self.publish();
    }

    pub fn advance(&mut self, by: usize, message: impl Into<String>) {
        self.snapshot.processed = (self.snapshot.processed + by).min(self.snapshot.total);
        self.snapshot.message = message.into();
        self.publish();
    }

    pub fn complete(&mut self, message: impl Into<String>) {
        self.snapshot.processed = self.snapshot.total;
        self.snapshot.status = JobStatus::Completed;
        self.snapshot.message = message.into();
        self.publish();
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.snapshot.status = JobStatus::Error;
        self.snapshot.message = message.into();
        self.publish();
    }
}
