//! Directory creation.

use std::ffi::OsStr;
use std::os::fd::AsFd;
use std::sync::Arc;

use crate::attr::CreateAttrs;
use crate::error::Result;
use crate::object::{KindExtra, ObjectRecord};
use crate::ops::validate_name;
use crate::sys::{self, OpenFlags, EMPTY_PATH};

impl ObjectRecord {
    /// Create a directory named `name` in this directory.
    ///
    /// Created with mode 000, then re-opened, chowned and chmodded. If
    /// any step after the `mkdirat` fails the new directory is removed
    /// again and the original error is returned.
    pub fn mkdir(self: &Arc<Self>, name: &OsStr, attrs: &CreateAttrs) -> Result<Arc<ObjectRecord>> {
        self.require_directory()?;
        let c_name = validate_name(name)?;
        let unix_mode = attrs.mode & 0o7777 & !self.export().umask();

        let dir_fd = self.reopen(OpenFlags::PATH | OpenFlags::NOACCESS)?;
        let dir_stat = sys::fstatat(dir_fd.as_fd(), EMPTY_PATH, libc::AT_EMPTY_PATH)?;
        let group = if dir_stat.st_mode & libc::S_ISGID != 0 {
            libc::gid_t::MAX
        } else {
            attrs.gid
        };

        sys::mkdirat(dir_fd.as_fd(), &c_name, 0o000)?;
        let built = (|| {
            let fd = sys::openat(
                dir_fd.as_fd(),
                &c_name,
                OpenFlags::RDONLY | OpenFlags::DIRECTORY,
                0,
            )?;
            sys::fchown(fd.as_fd(), attrs.uid, group)?;
            sys::fchmod(fd.as_fd(), unix_mode)?;
            let (handle, _mount_id) =
                sys::name_to_handle_at(fd.as_fd(), EMPTY_PATH, libc::AT_EMPTY_PATH)?;
            let stat = sys::fstatat(fd.as_fd(), EMPTY_PATH, libc::AT_EMPTY_PATH)?;
            ObjectRecord::alloc(self.export(), handle, &stat, KindExtra::None)
        })();
        match built {
            Ok(record) => Ok(record),
            Err(err) => {
                let _ = sys::unlinkat(dir_fd.as_fd(), &c_name, libc::AT_REMOVEDIR);
                Err(err)
            }
        }
    }
}
