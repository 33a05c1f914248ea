//! Regular-file creation.

use std::ffi::OsStr;
use std::os::fd::AsFd;
use std::sync::Arc;

use crate::attr::CreateAttrs;
use crate::error::Result;
use crate::object::{KindExtra, ObjectRecord};
use crate::ops::validate_name;
use crate::sys::{self, OpenFlags, EMPTY_PATH};

impl ObjectRecord {
    /// Create a regular file named `name` in this directory.
    ///
    /// The file is created exclusively with mode 000 and only then
    /// chowned and chmodded into shape; a set-gid parent propagates its
    /// group owner instead of `attrs.gid`. When a step after the `openat`
    /// fails, the zero-mode file is left in place and the caller sees the
    /// original error (long-standing server behavior; the other creating
    /// operations clean up after themselves).
    pub fn create(self: &Arc<Self>, name: &OsStr, attrs: &CreateAttrs) -> Result<Arc<ObjectRecord>> {
        self.require_directory()?;
        let c_name = validate_name(name)?;
        let unix_mode = attrs.mode & 0o7777 & !self.export().umask();

        let dir_fd = self.reopen(OpenFlags::PATH | OpenFlags::NOACCESS)?;
        let dir_stat = sys::fstatat(dir_fd.as_fd(), EMPTY_PATH, libc::AT_EMPTY_PATH)?;
        let group = if dir_stat.st_mode & libc::S_ISGID != 0 {
            // set-gid on the parent propagates the directory group owner
            libc::gid_t::MAX
        } else {
            attrs.gid
        };

        let fd = sys::openat(
            dir_fd.as_fd(),
            &c_name,
            OpenFlags::CREAT | OpenFlags::WRONLY | OpenFlags::TRUNC | OpenFlags::EXCL,
            0o000,
        )?;
        drop(dir_fd);

        sys::fchown(fd.as_fd(), attrs.uid, group)?;
        sys::fchmod(fd.as_fd(), unix_mode)?;
        let (handle, _mount_id) = sys::name_to_handle_at(fd.as_fd(), EMPTY_PATH, libc::AT_EMPTY_PATH)?;
        let stat = sys::fstatat(fd.as_fd(), EMPTY_PATH, libc::AT_EMPTY_PATH)?;
        drop(fd);

        ObjectRecord::alloc(self.export(), handle, &stat, KindExtra::None)
    }
}
