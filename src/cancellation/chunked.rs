//! Chunked cancellable work
//!
//! Long loops run in bounded chunks. Between chunks the task checks its
//! cancellation flag and yields to the runtime, so an interrupt arriving on
//! another task is observed within one chunk.

use super::registry::CancelGuard;

/// Iterations between two cancellation checks
pub const COMPUTE_CHUNK_SIZE: u64 = 100_000;

/// Where a [`ChunkedTask`] is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    /// Processing one chunk
    Running,
    /// Looking at the flag before the next chunk
    CheckingCancellation,
    /// Handing control back to the runtime
    Yielded,
}

/// How a chunked task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    Completed { processed: u64 },
    Interrupted { processed: u64 },
}

impl ChunkOutcome {
    pub fn processed(&self) -> u64 {
        match self {
            ChunkOutcome::Completed { processed } | ChunkOutcome::Interrupted { processed } => {
                *processed
            }
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ChunkOutcome::Interrupted { .. })
    }
}

/// A loop of `total` steps that stops early once its guard is cancelled
pub struct ChunkedTask<'a> {
    guard: &'a CancelGuard,
    total: u64,
    chunk_size: u64,
    processed: u64,
    phase: TaskPhase,
}

impl<'a> ChunkedTask<'a> {
    /// Create a task; a chunk size of zero is treated as one
    pub fn new(guard: &'a CancelGuard, total: u64, chunk_size: u64) -> Self {
        Self {
            guard,
            total,
            chunk_size: chunk_size.max(1),
            processed: 0,
            phase: TaskPhase::CheckingCancellation,
        }
    }

    pub fn phase(&self) -> TaskPhase {
        self.phase
    }

    /// Run `step` once per index in `0..total`
    pub async fn run<F>(mut self, mut step: F) -> ChunkOutcome
    where
        F: FnMut(u64),
    {
        loop {
            match self.phase {
                TaskPhase::CheckingCancellation => {
                    if self.processed >= self.total {
                        return ChunkOutcome::Completed {
                            processed: self.processed,
                        };
                    }
                    if self.guard.is_cancelled() {
                        tracing::info!(
                            channel_id = self.guard.channel_id(),
                            processed = self.processed,
                            "[ChunkedTask] Interrupted"
                        );
                        return ChunkOutcome::Interrupted {
                            processed: self.processed,
                        };
                    }
                    self.phase = TaskPhase::Running;
                }
                TaskPhase::Running => {
                    let end = self.total.min(self.processed.saturating_add(self.chunk_size));
                    for i in self.processed..end {
                        step(i);
                    }
                    self.processed = end;
                    self.phase = TaskPhase::Yielded;
                }
                TaskPhase::Yielded => {
                    tokio::task::yield_now().await;
                    self.phase = TaskPhase::CheckingCancellation;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationRegistry;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_runs_to_completion() {
        let registry = Arc::new(CancellationRegistry::new());
        let guard = registry.begin(1).unwrap();

        let mut sum = 0u64;
        let outcome = ChunkedTask::new(&guard, 1_000, 64).run(|i| sum += i).await;

        assert_eq!(outcome, ChunkOutcome::Completed { processed: 1_000 });
        assert_eq!(sum, 999 * 1_000 / 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let registry = Arc::new(CancellationRegistry::new());
        let guard = registry.begin(1).unwrap();
        registry.interrupt(1);

        let mut steps = 0;
        let outcome = ChunkedTask::new(&guard, 1_000, 100).run(|_| steps += 1).await;

        assert_eq!(outcome, ChunkOutcome::Interrupted { processed: 0 });
        assert_eq!(steps, 0);
    }

    #[tokio::test]
    async fn test_cancel_observed_at_chunk_boundary() {
        let registry = Arc::new(CancellationRegistry::new());
        let guard = registry.begin(1).unwrap();

        let reg = registry.clone();
        let outcome = ChunkedTask::new(&guard, 1_000, 100)
            .run(|i| {
                if i == 250 {
                    reg.interrupt(1);
                }
            })
            .await;

        assert!(outcome.is_interrupted());
        assert_eq!(outcome.processed(), 300);
    }

    #[tokio::test]
    async fn test_other_channel_cancel_is_ignored() {
        let registry = Arc::new(CancellationRegistry::new());
        let guard = registry.begin(1).unwrap();
        let _other = registry.begin(2).unwrap();

        let reg = registry.clone();
        let outcome = ChunkedTask::new(&guard, 500, 50)
            .run(|i| {
                if i == 10 {
                    reg.interrupt(2);
                }
            })
            .await;

        assert_eq!(outcome, ChunkOutcome::Completed { processed: 500 });
    }

    #[tokio::test]
    async fn test_zero_chunk_size() {
        let registry = Arc::new(CancellationRegistry::new());
        let guard = registry.begin(1).unwrap();

        let task = ChunkedTask::new(&guard, 3, 0);
        assert_eq!(task.phase(), TaskPhase::CheckingCancellation);
        assert_eq!(task.run(|_| {}).await.processed(), 3);
    }
}
