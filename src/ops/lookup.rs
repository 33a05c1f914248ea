//! Name resolution within a directory.

use std::ffi::OsStr;
use std::os::fd::AsFd;
use std::sync::Arc;

use crate::error::Result;
use crate::object::{KindExtra, ObjectRecord};
use crate::ops::{read_link_target, validate_name};
use crate::sys::{self, OpenFlags, EMPTY_PATH};

impl ObjectRecord {
    /// Resolve `name` in this directory and return a record for the
    /// child.
    ///
    /// `.` and `..` are not followed. Symlink children get their target
    /// cached; socket children remember this directory's handle and the
    /// entry name.
    pub fn lookup(self: &Arc<Self>, name: &OsStr) -> Result<Arc<ObjectRecord>> {
        self.require_directory()?;
        let c_name = validate_name(name)?;

        let dir_fd = self.reopen(OpenFlags::PATH | OpenFlags::NOACCESS)?;
        let (handle, _mount_id) = sys::name_to_handle_at(dir_fd.as_fd(), &c_name, 0)?;
        drop(dir_fd);

        let fd = sys::open_by_handle_at(
            self.export().root_fd(),
            &handle,
            OpenFlags::PATH | OpenFlags::NOACCESS,
        )?;
        let stat = sys::fstatat(fd.as_fd(), EMPTY_PATH, libc::AT_EMPTY_PATH)?;
        let extra = match stat.st_mode & libc::S_IFMT {
            libc::S_IFLNK => KindExtra::LinkTarget(read_link_target(fd.as_fd(), EMPTY_PATH)?),
            libc::S_IFSOCK => KindExtra::Socket {
                parent: self.handle().clone(),
                name: c_name,
            },
            _ => KindExtra::None,
        };
        drop(fd);
        ObjectRecord::alloc(self.export(), handle, &stat, extra)
    }
}
