//! Transfer tasks and the byte sources they read from.

use std::fmt;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::io::AsyncSeekExt;
use tokio_util::io::ReaderStream;

/// Identifier of a transfer task, unique for the process lifetime.
///
/// Ids are allocated monotonically by the [`TaskRegistry`](crate::TaskRegistry)
/// and never reused; a retried task keeps its original id.
pub type TaskId = u64;

/// Lifecycle state of a transfer task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting in the FIFO queue.
    Queued,
    /// A transport attempt is in flight.
    Active,
    /// The server acknowledged the full upload.
    Completed,
    /// The last attempt failed; the task sits in the retry store.
    Failed,
}

impl TaskStatus {
    /// Returns true for states the engine will not leave on its own.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A stream of byte chunks read from a [`ByteSource`].
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Opaque handle to local file data.
///
/// Exposes the total size and supports slicing from an arbitrary byte
/// offset, which is what a resumed upload needs.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// Total size of the source in bytes.
    fn len(&self) -> u64;

    /// Returns true when the source holds no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Opens a stream over the bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying data cannot be opened or seeked.
    async fn slice_from(&self, offset: u64) -> std::io::Result<ByteStream>;
}

/// A byte source backed by a file on disk.
///
/// The length is captured once at construction; the file is re-opened for
/// every attempt so a retry always starts from a fresh handle.
pub struct FileByteSource {
    path: PathBuf,
    len: u64,
}

impl FileByteSource {
    /// Stats `path` and captures its current length.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be stat'ed.
    pub async fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let len = tokio::fs::metadata(&path).await?.len();
        Ok(Self { path, len })
    }

    /// The local path this source reads from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for FileByteSource {
    fn len(&self) -> u64 {
        self.len
    }

    async fn slice_from(&self, offset: u64) -> std::io::Result<ByteStream> {
        let mut file = tokio::fs::File::open(&self.path).await?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset)).await?;
        }
        Ok(ReaderStream::new(file).boxed())
    }
}

/// An in-memory byte source, chunked for progress granularity.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Bytes,
    chunk_size: usize,
}

impl MemorySource {
    const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

    /// Wraps `data` with the default chunk size.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }

    /// Sets the chunk size used when streaming (minimum 1).
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    async fn slice_from(&self, offset: u64) -> std::io::Result<ByteStream> {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.data.len());
        let rest = self.data.slice(start..);
        let chunks: Vec<std::io::Result<Bytes>> = (0..rest.len())
            .step_by(self.chunk_size)
            .map(|i| Ok(rest.slice(i..(i + self.chunk_size).min(rest.len()))))
            .collect();
        Ok(stream::iter(chunks).boxed())
    }
}

/// One file's transfer unit, tracked by the engine.
///
/// At any time a task is owned by exactly one of the queue, the active
/// dispatch, or the retry store. Status transitions happen only inside the
/// engine; collaborators read state through the getters.
pub struct Task {
    id: TaskId,
    relative_path: String,
    source: Arc<dyn ByteSource>,
    resume_offset: u64,
    status: TaskStatus,
}

impl Task {
    /// Creates a fresh task with status [`TaskStatus::Queued`] and a zero
    /// resume offset. Obtain `id` from the registry.
    #[must_use]
    pub fn new(id: TaskId, relative_path: impl Into<String>, source: Arc<dyn ByteSource>) -> Self {
        Self {
            id,
            relative_path: relative_path.into(),
            source,
            resume_offset: 0,
            status: TaskStatus::Queued,
        }
    }

    /// The task's identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Logical destination path, possibly containing virtual directory
    /// segments from folder traversal.
    #[must_use]
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// The byte source this task uploads.
    #[must_use]
    pub fn source(&self) -> &Arc<dyn ByteSource> {
        &self.source
    }

    /// Total size of the byte source.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.source.len()
    }

    /// Bytes already acknowledged by the server for this path.
    #[must_use]
    pub const fn resume_offset(&self) -> u64 {
        self.resume_offset
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    pub(crate) const fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    /// Clamped so the offset never exceeds the source length.
    pub(crate) fn set_resume_offset(&mut self, offset: u64) {
        self.resume_offset = offset.min(self.source.len());
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("relative_path", &self.relative_path)
            .field("size", &self.source.len())
            .field("resume_offset", &self.resume_offset)
            .field("status", &self.status)
            .finish()
    }
}
