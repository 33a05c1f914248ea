//! FSAL error taxonomy and errno conversion.

use std::fmt;
use std::io;

use thiserror::Error;

/// Result of FSAL operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Raw OS error code captured at a syscall boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Errno(pub i32);

impl Errno {
    /// Capture the calling thread's current errno.
    pub(crate) fn last() -> Self {
        Errno(io::Error::last_os_error().raw_os_error().unwrap_or(libc::EIO))
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", io::Error::from_raw_os_error(self.0))
    }
}

/// FSAL errors.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// Bad address or malformed argument. Raised for empty names, handle
    /// blobs that fail their bounds checks and undersized readlink
    /// buffers.
    #[error("bad address or malformed argument")]
    Fault,
    /// The caller passed a non-directory where a directory operation was
    /// requested.
    #[error("not a directory")]
    NotDirectory,
    /// The kernel no longer recognizes the handle or name; the inode has
    /// been removed underneath the server.
    #[error("stale file handle")]
    Stale,
    /// Allocation failed.
    #[error("out of memory")]
    NoMemory,
    /// Invalid argument or unsupported argument for an operation, such as
    /// truncating a directory or releasing a record that is still open.
    #[error("invalid argument")]
    Inval,
    /// The attribute mask asks for attributes the export does not
    /// support.
    #[error("attribute not supported")]
    AttrNotSupported,
    /// The operation is not supported by the export.
    #[error("operation not supported")]
    NotSupported,
    /// The destination buffer is too small for the requested digest.
    #[error("buffer too small")]
    TooSmall,
    /// A name or symlink target exceeded the allowed length.
    #[error("name too long")]
    NameTooLong,
    /// Internal inconsistency that does not map to any protocol error.
    #[error("server fault")]
    ServerFault,
    /// The record still carries references.
    #[error("handle busy")]
    Busy,
    /// Any other POSIX errno, propagated unchanged.
    #[error("system error: {0}")]
    Sys(Errno),
}

impl From<Errno> for Error {
    fn from(errno: Errno) -> Self {
        match errno.0 {
            libc::EFAULT => Error::Fault,
            libc::ENOTDIR => Error::NotDirectory,
            // A vanished name is treated like a vanished inode: the
            // taxonomy carries no NOENT kind.
            libc::ENOENT | libc::ESTALE => Error::Stale,
            libc::ENOMEM => Error::NoMemory,
            libc::EINVAL => Error::Inval,
            libc::ENAMETOOLONG => Error::NameTooLong,
            libc::EBUSY => Error::Busy,
            libc::EOPNOTSUPP => Error::NotSupported,
            _ => Error::Sys(errno),
        }
    }
}
