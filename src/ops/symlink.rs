//! Symbolic links: creation and target readback.
//!
//! Mode bits are never set on symlinks; the kernel neither stores nor
//! checks them, and `chmod` through a link would touch the target.

use std::ffi::{CString, OsStr};
use std::os::fd::AsFd;
use std::os::unix::ffi::OsStrExt;
use std::sync::Arc;

use crate::attr::{CreateAttrs, ObjectKind};
use crate::error::{Error, Result};
use crate::object::{KindExtra, ObjectRecord};
use crate::ops::{read_link_target, validate_name};
use crate::sys::{self, OpenFlags, EMPTY_PATH};

impl ObjectRecord {
    /// Create a symlink named `name` pointing at `target`.
    ///
    /// The link is chowned to the requested owner (set-gid parents
    /// propagate their group); the given target is cached on the new
    /// record. If any step after the `symlinkat` fails the link is
    /// removed again.
    pub fn symlink(
        self: &Arc<Self>,
        name: &OsStr,
        target: &OsStr,
        attrs: &CreateAttrs,
    ) -> Result<Arc<ObjectRecord>> {
        self.require_directory()?;
        let c_name = validate_name(name)?;
        let c_target = CString::new(target.as_bytes()).map_err(|_| Error::Fault)?;

        let dir_fd = self.reopen(OpenFlags::PATH | OpenFlags::NOACCESS)?;
        let dir_stat = sys::fstatat(dir_fd.as_fd(), EMPTY_PATH, libc::AT_EMPTY_PATH)?;
        let group = if dir_stat.st_mode & libc::S_ISGID != 0 {
            libc::gid_t::MAX
        } else {
            attrs.gid
        };

        sys::symlinkat(&c_target, dir_fd.as_fd(), &c_name)?;
        let built = (|| {
            let (handle, _mount_id) = sys::name_to_handle_at(dir_fd.as_fd(), &c_name, 0)?;
            sys::fchownat(
                dir_fd.as_fd(),
                &c_name,
                attrs.uid,
                group,
                libc::AT_SYMLINK_NOFOLLOW,
            )?;
            let stat = sys::fstatat(dir_fd.as_fd(), &c_name, libc::AT_SYMLINK_NOFOLLOW)?;
            ObjectRecord::alloc(
                self.export(),
                handle,
                &stat,
                KindExtra::LinkTarget(c_target.clone()),
            )
        })();
        match built {
            Ok(record) => Ok(record),
            Err(err) => {
                let _ = sys::unlinkat(dir_fd.as_fd(), &c_name, 0);
                Err(err)
            }
        }
    }

    /// Copy this symlink's target, with its terminating NUL, into `buf`
    /// and return the copied length.
    ///
    /// `refresh` rereads the target through a fresh path-only descriptor
    /// before serving it; otherwise the cached target is used when
    /// present. The buffer must strictly exceed the target length.
    pub fn read_link(&self, buf: &mut [u8], refresh: bool) -> Result<usize> {
        if self.kind() != ObjectKind::SymbolicLink {
            return Err(Error::Fault);
        }
        let target = match (self.cached_link_target(), refresh) {
            (Some(target), false) => target,
            _ => {
                let fd = self.reopen(OpenFlags::PATH | OpenFlags::NOACCESS)?;
                let target = read_link_target(fd.as_fd(), EMPTY_PATH)?;
                drop(fd);
                self.store_link_target(target.clone());
                target
            }
        };
        let bytes = target.as_bytes_with_nul();
        if buf.len() < bytes.len() {
            return Err(Error::Fault);
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    }
}
