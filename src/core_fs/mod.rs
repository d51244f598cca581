//! Filesystem collaborator consumed by the protocol engine.
//!
//! The engine only ever hands absolute, already-resolved paths (using the
//! separator returned by [`FileSystem::separator`]) to these calls, and treats
//! every one of them as fallible.

pub mod error;
pub mod local;

pub use error::FsError;
pub use local::LocalFileSystem;

use async_trait::async_trait;
use chrono::NaiveDateTime;

/// How a file is opened by [`FileSystem::open_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Existing file, read only.
    Read,
    /// Create or truncate, write only.
    Create,
    /// Create if missing, keep contents, positioned at the end.
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryAttributes {
    pub size: u64,
    /// Last modification time, UTC.
    pub modified: NaiveDateTime,
    pub is_dir: bool,
    pub is_hidden: bool,
    pub is_read_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub attributes: EntryAttributes,
}

/// An open directory. Entries are produced lazily and the sequence cannot be
/// restarted; dropping the handle closes the directory.
#[async_trait]
pub trait DirHandle: Send {
    async fn next_entry(&mut self) -> Result<Option<DirEntry>, FsError>;
}

/// An open file. Dropping the handle closes it.
#[async_trait]
pub trait FileHandle: Send {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError>;

    /// Writes some of `buf`, returning how many bytes were accepted.
    async fn write(&mut self, buf: &[u8]) -> Result<usize, FsError>;

    /// Moves the cursor to `offset` bytes from the start.
    async fn seek(&mut self, offset: u64) -> Result<(), FsError>;

    async fn attributes(&self) -> Result<EntryAttributes, FsError>;

    /// Flushes pending writes.
    async fn close(&mut self) -> Result<(), FsError>;
}

#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Separator character used by this filesystem.
    fn separator(&self) -> char {
        '/'
    }

    /// Longest path this filesystem accepts.
    fn max_path_len(&self) -> usize;

    async fn open_dir(&self, path: &str) -> Result<Box<dyn DirHandle>, FsError>;

    async fn open_file(&self, path: &str, mode: OpenMode) -> Result<Box<dyn FileHandle>, FsError>;

    async fn create_dir(&self, path: &str) -> Result<(), FsError>;

    async fn remove_file(&self, path: &str) -> Result<(), FsError>;

    async fn remove_dir(&self, path: &str) -> Result<(), FsError>;

    async fn rename(&self, from: &str, to: &str) -> Result<(), FsError>;

    async fn set_modified(&self, path: &str, time: NaiveDateTime) -> Result<(), FsError>;
}
