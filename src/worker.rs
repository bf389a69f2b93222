//! Per-invocation worker dispatch.
//!
//! Every submitted job runs on its own task and reports exactly one
//! [`Completion`] over the dispatcher's channel. The dispatcher never limits
//! concurrency; at-most-one-in-flight is decided by the caller.

use crate::error::Result;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinError;
use tracing::debug;

/// What a worker is doing; one slot per kind in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    Search,
    Retrieval,
    VoiceListen,
}

impl std::fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerKind::Search => write!(f, "search"),
            WorkerKind::Retrieval => write!(f, "retrieval"),
            WorkerKind::VoiceListen => write!(f, "voice listen"),
        }
    }
}

/// Monotonically increasing job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

#[cfg(test)]
impl JobId {
    pub(crate) fn for_tests(n: u64) -> Self {
        JobId(n)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{context} failed: {message}")]
pub struct WorkerError {
    pub context: WorkerKind,
    pub message: String,
}

impl WorkerError {
    fn from_join(context: WorkerKind, err: JoinError) -> Self {
        let message = if err.is_panic() {
            let panic = err.into_panic();
            panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .map(|m| format!("worker panicked: {m}"))
                .unwrap_or_else(|| "worker panicked".to_string())
        } else {
            "worker was cancelled".to_string()
        };
        Self { context, message }
    }
}

/// Delivered once per job.
#[derive(Debug)]
pub struct Completion<T> {
    pub id: JobId,
    pub kind: WorkerKind,
    pub result: std::result::Result<T, WorkerError>,
}

pub struct Dispatcher<T> {
    next_id: AtomicU64,
    tx: UnboundedSender<Completion<T>>,
}

impl<T: Send + 'static> Dispatcher<T> {
    /// Dispatcher and the receiving end of its completion channel.
    pub fn new() -> (Self, UnboundedReceiver<Completion<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Self {
            next_id: AtomicU64::new(1),
            tx,
        };
        (dispatcher, rx)
    }

    fn allocate(&self) -> JobId {
        JobId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn deliver(
        tx: UnboundedSender<Completion<T>>,
        id: JobId,
        kind: WorkerKind,
        joined: std::result::Result<Result<T>, JoinError>,
    ) {
        let result = match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(WorkerError {
                context: kind,
                message: e.to_string(),
            }),
            Err(e) => Err(WorkerError::from_join(kind, e)),
        };
        if tx.send(Completion { id, kind, result }).is_err() {
            debug!("Completion for {} job {} dropped; receiver closed", kind, id);
        }
    }

    /// Run an async job on its own task.
    pub fn submit<F>(&self, kind: WorkerKind, job: F) -> JobId
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let id = self.allocate();
        let tx = self.tx.clone();
        let handle = tokio::spawn(job);
        tokio::spawn(async move { Self::deliver(tx, id, kind, handle.await) });
        debug!("Submitted {} job {}", kind, id);
        id
    }

    /// Run a blocking job (microphone capture, recognition) on the blocking pool.
    pub fn submit_blocking<F>(&self, kind: WorkerKind, job: F) -> JobId
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let id = self.allocate();
        let tx = self.tx.clone();
        let handle = tokio::task::spawn_blocking(job);
        tokio::spawn(async move { Self::deliver(tx, id, kind, handle.await) });
        debug!("Submitted blocking {} job {}", kind, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HarvestError;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_each_job_completes_once_with_its_id() {
        let (dispatcher, mut rx) = Dispatcher::<u32>::new();
        let (release, gate) = oneshot::channel::<()>();
        let slow = dispatcher.submit(WorkerKind::Search, async move {
            let _ = gate.await;
            Ok(1)
        });
        let fast = dispatcher.submit_blocking(WorkerKind::VoiceListen, || Ok(2));
        assert!(fast > slow);

        let first = rx.recv().await.unwrap();
        assert_eq!((first.id, first.kind, first.result), (fast, WorkerKind::VoiceListen, Ok(2)));
        assert!(rx.try_recv().is_err());

        release.send(()).unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!((second.id, second.result), (slow, Ok(1)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_errors_and_panics_become_worker_errors() {
        let (dispatcher, mut rx) = Dispatcher::<()>::new();
        dispatcher.submit(WorkerKind::Retrieval, async {
            Err(HarvestError::ToolNotFound("yt-dlp".into()))
        });
        let failed = rx.recv().await.unwrap();
        let err = failed.result.unwrap_err();
        assert_eq!(err.context, WorkerKind::Retrieval);
        assert!(err.message.contains("yt-dlp"));

        dispatcher.submit_blocking(WorkerKind::VoiceListen, || panic!("microphone unplugged"));
        let panicked = rx.recv().await.unwrap();
        assert_eq!(
            panicked.result.unwrap_err().message,
            "worker panicked: microphone unplugged"
        );
    }
}
