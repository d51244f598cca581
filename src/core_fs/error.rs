// Filesystem collaborator errors
use std::io::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    #[error("Cannot seek to offset {0}")]
    Seek(u64),

    #[error("Filesystem I/O error: {0}")]
    Io(std::io::Error),
}

impl FsError {
    /// Classifies an I/O error raised while touching `path`.
    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_string()),
            ErrorKind::AlreadyExists => FsError::AlreadyExists(path.to_string()),
            _ => FsError::Io(err),
        }
    }

    pub fn to_ftp_response(&self) -> String {
        match self {
            FsError::NotFound(_) | FsError::PermissionDenied(_) | FsError::AlreadyExists(_) => {
                "550 Requested action not taken. File unavailable.".to_string()
            }
            FsError::Seek(_) => "551 Requested action aborted.".to_string(),
            FsError::Io(_) => "451 Requested action aborted. Local error in processing.".to_string(),
        }
    }
}
