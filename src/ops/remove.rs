//! Entry removal.

use std::ffi::OsStr;
use std::os::fd::AsFd;

use crate::error::Result;
use crate::object::ObjectRecord;
use crate::ops::validate_name;
use crate::sys::{self, OpenFlags};

impl ObjectRecord {
    /// Remove the entry `name` from this directory, file or directory
    /// alike.
    ///
    /// The child is statted first to decide whether `AT_REMOVEDIR` is
    /// needed; a non-empty directory fails with the kernel's error and
    /// leaves the entry in place.
    pub fn unlink(&self, name: &OsStr) -> Result<()> {
        self.require_directory()?;
        let c_name = validate_name(name)?;

        let dir_fd = self.reopen(OpenFlags::PATH | OpenFlags::NOACCESS)?;
        let stat = sys::fstatat(dir_fd.as_fd(), &c_name, libc::AT_SYMLINK_NOFOLLOW)?;
        let flags = if stat.st_mode & libc::S_IFMT == libc::S_IFDIR {
            libc::AT_REMOVEDIR
        } else {
            0
        };
        sys::unlinkat(dir_fd.as_fd(), &c_name, flags)?;
        Ok(())
    }
}
