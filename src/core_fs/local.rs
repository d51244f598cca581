use crate::core_fs::{
    DirEntry, DirHandle, EntryAttributes, FileHandle, FileSystem, FsError, OpenMode,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use filetime::{set_file_mtime, FileTime};
use log::{debug, warn};
use std::fs::Metadata;
use std::io::SeekFrom;
use tokio::fs::{self, File, OpenOptions, ReadDir};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Filesystem backed by the host's own directories through `tokio::fs`.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    max_path_len: usize,
}

impl LocalFileSystem {
    pub fn new(max_path_len: usize) -> Self {
        Self { max_path_len }
    }
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new(4096)
    }
}

fn attributes_from(name: &str, metadata: &Metadata) -> EntryAttributes {
    let modified = metadata
        .modified()
        .map(|t| DateTime::<Utc>::from(t).naive_utc())
        .unwrap_or_default();

    EntryAttributes {
        size: metadata.len(),
        modified,
        is_dir: metadata.is_dir(),
        is_hidden: name.starts_with('.'),
        is_read_only: metadata.permissions().readonly(),
    }
}

struct LocalDir {
    path: String,
    entries: ReadDir,
}

#[async_trait]
impl DirHandle for LocalDir {
    async fn next_entry(&mut self) -> Result<Option<DirEntry>, FsError> {
        loop {
            let entry = match self.entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => return Ok(None),
                Err(e) => return Err(FsError::from_io(&self.path, e)),
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            match entry.metadata().await {
                Ok(metadata) => {
                    let attributes = attributes_from(&name, &metadata);
                    return Ok(Some(DirEntry { name, attributes }));
                }
                Err(e) => {
                    warn!("Failed to get metadata for entry {:?}: {}", entry.path(), e);
                    continue;
                }
            }
        }
    }
}

struct LocalFile {
    path: String,
    file: File,
}

#[async_trait]
impl FileHandle for LocalFile {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        self.file
            .read(buf)
            .await
            .map_err(|e| FsError::from_io(&self.path, e))
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        self.file
            .write(buf)
            .await
            .map_err(|e| FsError::from_io(&self.path, e))
    }

    async fn seek(&mut self, offset: u64) -> Result<(), FsError> {
        self.file
            .seek(SeekFrom::Start(offset))
            .await
            .map(|_| ())
            .map_err(|_| FsError::Seek(offset))
    }

    async fn attributes(&self) -> Result<EntryAttributes, FsError> {
        let metadata = self
            .file
            .metadata()
            .await
            .map_err(|e| FsError::from_io(&self.path, e))?;
        let name = self.path.rsplit('/').next().unwrap_or_default();
        Ok(attributes_from(name, &metadata))
    }

    async fn close(&mut self) -> Result<(), FsError> {
        self.file
            .flush()
            .await
            .map_err(|e| FsError::from_io(&self.path, e))
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    fn separator(&self) -> char {
        std::path::MAIN_SEPARATOR
    }

    fn max_path_len(&self) -> usize {
        self.max_path_len
    }

    async fn open_dir(&self, path: &str) -> Result<Box<dyn DirHandle>, FsError> {
        let entries = fs::read_dir(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        Ok(Box::new(LocalDir {
            path: path.to_string(),
            entries,
        }))
    }

    async fn open_file(&self, path: &str, mode: OpenMode) -> Result<Box<dyn FileHandle>, FsError> {
        let mut options = OpenOptions::new();
        match mode {
            OpenMode::Read => options.read(true),
            OpenMode::Create => options.write(true).create(true).truncate(true),
            OpenMode::Append => options.write(true).create(true),
        };

        let mut file = options
            .open(path)
            .await
            .map_err(|e| FsError::from_io(path, e))?;

        // Directories open fine for reading on some platforms; they are not files.
        let metadata = file
            .metadata()
            .await
            .map_err(|e| FsError::from_io(path, e))?;
        if metadata.is_dir() {
            return Err(FsError::NotFound(path.to_string()));
        }

        if mode == OpenMode::Append {
            file.seek(SeekFrom::End(0))
                .await
                .map_err(|e| FsError::from_io(path, e))?;
        }

        debug!("Opened {} in {:?} mode", path, mode);
        Ok(Box::new(LocalFile {
            path: path.to_string(),
            file,
        }))
    }

    async fn create_dir(&self, path: &str) -> Result<(), FsError> {
        fs::create_dir(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn remove_file(&self, path: &str) -> Result<(), FsError> {
        fs::remove_file(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn remove_dir(&self, path: &str) -> Result<(), FsError> {
        fs::remove_dir(path)
            .await
            .map_err(|e| FsError::from_io(path, e))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), FsError> {
        fs::rename(from, to)
            .await
            .map_err(|e| FsError::from_io(from, e))
    }

    async fn set_modified(&self, path: &str, time: NaiveDateTime) -> Result<(), FsError> {
        let filetime = FileTime::from_unix_time(time.and_utc().timestamp(), 0);
        let owned = path.to_string();
        tokio::task::spawn_blocking(move || set_file_mtime(&owned, filetime))
            .await
            .map_err(|e| FsError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
            .map_err(|e| FsError::from_io(path, e))
    }
}
