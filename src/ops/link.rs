//! Hard links.

use std::ffi::OsStr;
use std::os::fd::AsFd;

use crate::error::{Error, Result};
use crate::export::Capabilities;
use crate::object::ObjectRecord;
use crate::ops::validate_name;
use crate::sys::{self, OpenFlags, EMPTY_PATH};

impl ObjectRecord {
    /// Link this object under `name` in `dest_dir`.
    ///
    /// Both records are re-opened path-only and the link is made with
    /// `AT_EMPTY_PATH`, so the source never needs to be reachable by
    /// name.
    pub fn link(&self, dest_dir: &ObjectRecord, name: &OsStr) -> Result<()> {
        if !self.export().fs_supports(Capabilities::LINK_SUPPORT) {
            return Err(Error::NotSupported);
        }
        dest_dir.require_directory()?;
        let c_name = validate_name(name)?;

        let src_fd = self.reopen(OpenFlags::PATH | OpenFlags::NOACCESS)?;
        let dest_fd = dest_dir.reopen(OpenFlags::PATH | OpenFlags::NOACCESS)?;
        sys::linkat(
            src_fd.as_fd(),
            EMPTY_PATH,
            dest_fd.as_fd(),
            &c_name,
            libc::AT_EMPTY_PATH,
        )?;
        Ok(())
    }
}
