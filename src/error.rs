use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from terminal or config handling.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Invalid path provided by the user.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Configuration or session file could not be written.
    #[error("Config error: {0}")]
    Config(String),

    /// Tree engine failure surfaced to the application.
    #[error(transparent)]
    Engine(#[from] OpError),
}

/// Why a proposed name was rejected before touching the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidNameReason {
    Empty,
    ReservedCharacter(char),
    DotName,
    Unchanged,
}

impl std::fmt::Display for InvalidNameReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidNameReason::Empty => write!(f, "name is empty"),
            InvalidNameReason::ReservedCharacter(c) => {
                write!(f, "name contains reserved character {:?}", c)
            }
            InvalidNameReason::DotName => write!(f, "'.' and '..' are not valid names"),
            InvalidNameReason::Unchanged => write!(f, "name is unchanged"),
        }
    }
}

/// Per-item failure taxonomy for tree and disk operations.
///
/// Everything except `Unexpected` is reported per item and lets a batch
/// continue. A full device is `Unexpected`: no later item can succeed.
#[derive(Debug, Error)]
pub enum OpError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("access denied: {}", .0.display())]
    AccessDenied(PathBuf),

    #[error("in use by another process: {}", .0.display())]
    InUse(PathBuf),

    #[error("an entry named {} already exists", .0.display())]
    NameCollision(PathBuf),

    #[error("invalid name: {0}")]
    InvalidName(InvalidNameReason),

    #[error("cannot move {} into itself", .0.display())]
    SelfContainment(PathBuf),

    #[error("{}: {source}", path.display())]
    Other {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl OpError {
    /// Classify an OS error raised while operating on `path`.
    pub fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => OpError::NotFound(path),
            io::ErrorKind::PermissionDenied => OpError::AccessDenied(path),
            io::ErrorKind::AlreadyExists => OpError::NameCollision(path),
            _ if has_code(&err, IN_USE_CODES) => OpError::InUse(path),
            _ if has_code(&err, DISK_FULL_CODES) => {
                OpError::Unexpected(format!("{}: {}", path.display(), err))
            }
            _ => OpError::Other { path, source: err },
        }
    }

    /// Whether this failure aborts the rest of a batch.
    pub fn is_fatal(&self) -> bool {
        matches!(self, OpError::Unexpected(_))
    }
}

/// Raw OS codes meaning "held open by someone else".
#[cfg(windows)]
const IN_USE_CODES: &[i32] = &[32, 33]; // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
#[cfg(not(windows))]
const IN_USE_CODES: &[i32] = &[16, 26]; // EBUSY, ETXTBSY

#[cfg(windows)]
const DISK_FULL_CODES: &[i32] = &[39, 112]; // ERROR_HANDLE_DISK_FULL, ERROR_DISK_FULL
#[cfg(not(windows))]
const DISK_FULL_CODES: &[i32] = &[28]; // ENOSPC

fn has_code(err: &io::Error, codes: &[i32]) -> bool {
    err.raw_os_error().is_some_and(|code| codes.contains(&code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn terminal_error_display() {
        let err = AppError::Terminal("failed to enter raw mode".into());
        assert_eq!(err.to_string(), "Terminal error: failed to enter raw mode");
    }

    #[test]
    fn invalid_path_error_display() {
        let err = AppError::InvalidPath("/nonexistent".into());
        assert_eq!(err.to_string(), "Invalid path: /nonexistent");
    }

    #[test]
    fn classify_not_found_and_permission() {
        let p = Path::new("/x/y.txt");
        let nf = OpError::from_io(p, io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert!(matches!(nf, OpError::NotFound(_)));
        let pd = OpError::from_io(p, io::Error::new(io::ErrorKind::PermissionDenied, "no"));
        assert!(matches!(pd, OpError::AccessDenied(_)));
    }

    #[test]
    fn classify_busy_as_in_use() {
        let p = Path::new("/x/locked.db");
        let err = OpError::from_io(p, io::Error::from_raw_os_error(IN_USE_CODES[0]));
        assert!(matches!(err, OpError::InUse(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn full_device_is_fatal() {
        let p = Path::new("/x/big.bin");
        let err = OpError::from_io(p, io::Error::from_raw_os_error(DISK_FULL_CODES[0]));
        assert!(matches!(err, OpError::Unexpected(_)));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("/x/big.bin"));
    }

    #[test]
    fn classify_unknown_as_other() {
        let p = Path::new("/x/odd");
        let err = OpError::from_io(p, io::Error::new(io::ErrorKind::Interrupted, "eintr"));
        assert!(matches!(err, OpError::Other { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn only_unexpected_is_fatal() {
        assert!(OpError::Unexpected("tree out of sync".into()).is_fatal());
        assert!(!OpError::SelfContainment(PathBuf::from("/a")).is_fatal());
        assert!(!OpError::InvalidName(InvalidNameReason::Empty).is_fatal());
    }

    #[test]
    fn invalid_name_display() {
        let err = OpError::InvalidName(InvalidNameReason::ReservedCharacter('?'));
        assert_eq!(err.to_string(), "invalid name: name contains reserved character '?'");
    }
}
