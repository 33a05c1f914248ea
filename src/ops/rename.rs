//! Rename across two directory records.

use std::ffi::OsStr;
use std::os::fd::AsFd;

use crate::error::Result;
use crate::object::ObjectRecord;
use crate::ops::validate_name;
use crate::sys::{self, OpenFlags};

impl ObjectRecord {
    /// Move `old_name` from this directory to `new_name` in `new_dir`.
    ///
    /// Both directories are re-opened path-only for the `renameat`; no
    /// record state is touched, so existing child records keep naming the
    /// same inode afterwards.
    pub fn rename(&self, old_name: &OsStr, new_dir: &ObjectRecord, new_name: &OsStr) -> Result<()> {
        self.require_directory()?;
        new_dir.require_directory()?;
        let c_old = validate_name(old_name)?;
        let c_new = validate_name(new_name)?;

        let old_fd = self.reopen(OpenFlags::PATH | OpenFlags::NOACCESS)?;
        let new_fd = new_dir.reopen(OpenFlags::PATH | OpenFlags::NOACCESS)?;
        sys::renameat(old_fd.as_fd(), &c_old, new_fd.as_fd(), &c_new)?;
        Ok(())
    }
}
