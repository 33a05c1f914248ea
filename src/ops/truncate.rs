//! File truncation.

use std::os::fd::AsFd;

use crate::attr::ObjectKind;
use crate::error::{Error, Result};
use crate::object::ObjectRecord;
use crate::sys::{self, OpenFlags};

impl ObjectRecord {
    /// Truncate this regular file to `length` bytes.
    pub fn truncate(&self, length: u64) -> Result<()> {
        if self.kind() != ObjectKind::RegularFile {
            return Err(Error::Inval);
        }
        let length = libc::off_t::try_from(length).map_err(|_| Error::Inval)?;
        let fd = self.reopen(OpenFlags::RDWR)?;
        sys::ftruncate(fd.as_fd(), length)?;
        Ok(())
    }
}
