//! Cancellation of long-running invocations
//!
//! - [`CancellationRegistry`]: channel id -> flag of the task running there
//! - [`ChunkedTask`]: a loop that checks its flag between bounded chunks

pub mod chunked;
pub mod registry;

pub use chunked::{ChunkOutcome, ChunkedTask, TaskPhase, COMPUTE_CHUNK_SIZE};
pub use registry::{CancelGuard, CancellationRegistry};
