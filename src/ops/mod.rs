//! Tree operations over object records.
//!
//! Every operation that touches a child of a directory follows the same
//! dance: check that the parent record is a directory, re-open its handle
//! as a path-only descriptor against the export root, perform the `*at`
//! syscall, obtain the child's handle and stat, then drop every
//! intermediate descriptor and allocate a record for the result. The
//! creating operations remove their partially created entry when a later
//! step fails, so the directory is restored to its prior state.

mod create;
mod get_attr;
mod link;
mod lookup;
mod mk_dir;
mod mk_node;
mod read_dir;
mod remove;
mod rename;
mod set_attr;
mod symlink;
mod truncate;

pub use mk_node::NodeSpec;
pub use read_dir::{DirCookie, DirEntry};

use std::ffi::{CStr, CString, OsStr};
use std::os::fd::{BorrowedFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;

use tracing::error;

use crate::attr::ObjectKind;
use crate::error::{Error, Result};
use crate::object::ObjectRecord;
use crate::sys::{self, OpenFlags};
use crate::{MAX_NAME_LEN, MAX_PATH_LEN};

/// Validate a single directory-entry name and make it syscall-ready.
pub(crate) fn validate_name(name: &OsStr) -> Result<CString> {
    let bytes = name.as_bytes();
    if bytes.is_empty() {
        return Err(Error::Fault);
    }
    if bytes.len() > MAX_NAME_LEN {
        return Err(Error::NameTooLong);
    }
    if bytes == b"." || bytes == b".." || bytes.contains(&b'/') {
        return Err(Error::Inval);
    }
    CString::new(bytes).map_err(|_| Error::Fault)
}

/// Read a symlink target relative to `dirfd`. A target that fills the
/// whole buffer was truncated by the kernel, which gives no other
/// indication.
pub(crate) fn read_link_target(dirfd: BorrowedFd<'_>, name: &CStr) -> Result<CString> {
    let mut buf = vec![0u8; MAX_PATH_LEN];
    let len = sys::readlinkat(dirfd, name, &mut buf)?;
    if len == MAX_PATH_LEN {
        return Err(Error::NameTooLong);
    }
    buf.truncate(len);
    CString::new(buf).map_err(|_| Error::Fault)
}

impl ObjectRecord {
    /// Fail unless this record names a directory.
    pub(crate) fn require_directory(&self) -> Result<()> {
        if self.kind() != ObjectKind::Directory {
            error!(kind = ?self.kind(), "parent handle is not a directory");
            return Err(Error::NotDirectory);
        }
        Ok(())
    }

    /// Re-open this record's handle against the export root.
    pub(crate) fn reopen(&self, flags: OpenFlags) -> Result<OwnedFd> {
        sys::open_by_handle_at(self.export().root_fd(), self.handle(), flags)
            .map_err(Error::from)
    }
}
