//! hoist - a resumable, concurrency-bounded upload engine.
//!
//! This library queues any number of outbound file transfers against a file
//! server that accepts `PUT` uploads and `PATCH` append resumes, runs at
//! most N of them concurrently, reports live throughput/ETA figures, and
//! resumes a failed transfer from the byte offset the server already holds
//! instead of restarting from zero.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hoist::{Engine, EngineConfig, FileByteSource, HttpTransport, NoProgress, ServerConfig};
//!
//! # async fn example() -> hoist::Result<()> {
//! let server = ServerConfig::new("http://localhost:5000/")?;
//! let transport = HttpTransport::new(reqwest::Client::new(), server);
//! let engine = Engine::new(transport, EngineConfig::default(), Arc::new(NoProgress));
//!
//! // One task per file; ids come from the engine's registry.
//! let source = Arc::new(FileByteSource::open("report.pdf").await?);
//! let task = engine.new_task("docs/report.pdf", source);
//! engine.enqueue(task);
//! engine.wait_idle().await;
//!
//! // A failed task stays in the retry store until the user retries it.
//! for (id, path) in engine.failed_tasks() {
//!     eprintln!("{path} failed");
//!     engine.retry(id).await?;
//! }
//! engine.wait_idle().await;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod format;
pub mod progress;
pub mod registry;
pub mod remote;
pub mod scheduler;
pub mod task;
pub mod transport;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export main types for convenience
pub use config::{EngineConfig, ServerConfig};
pub use error::{Error, Result};
pub use format::{format_duration, format_percent, format_size, format_speed};
pub use progress::{NoProgress, ProgressEstimator, ProgressSample, ProgressSink, Snapshot};
pub use registry::TaskRegistry;
pub use remote::{NoPrompt, Prompt, RemoteOps};
pub use scheduler::Engine;
pub use task::{ByteSource, ByteStream, FileByteSource, MemorySource, Task, TaskId, TaskStatus};
pub use transport::{AttemptOutcome, HttpTransport, ProgressFn, Transport, UPDATE_RANGE_HEADER};
