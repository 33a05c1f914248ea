//! Attribute retrieval.

use std::ffi::CString;
use std::os::fd::{AsFd, OwnedFd};

use tracing::debug;

use crate::attr::{attributes_from_stat, AttrMask, Attributes, ObjectKind};
use crate::error::{Error, Result};
use crate::object::ObjectRecord;
use crate::sys::{self, OpenFlags, EMPTY_PATH};

impl ObjectRecord {
    /// Open a descriptor suitable for statting (and mutating the
    /// attributes of) this object.
    ///
    /// Sockets are reached through their parent directory plus name,
    /// because a descriptor opened by handle is useless for an AF_UNIX
    /// socket. Symlinks need `O_PATH` to avoid `ELOOP`; FIFOs need
    /// `O_NONBLOCK` or the open would wait for a reader.
    pub(crate) fn open_for_stat(&self) -> Result<(OwnedFd, Option<CString>)> {
        match self.kind() {
            ObjectKind::Socket => {
                let (parent, name) = self.socket_location()?;
                let fd = sys::open_by_handle_at(
                    self.export().root_fd(),
                    &parent,
                    OpenFlags::PATH | OpenFlags::NOACCESS,
                )?;
                Ok((fd, Some(name)))
            }
            kind => {
                let mut flags = OpenFlags::RDONLY;
                if kind == ObjectKind::SymbolicLink {
                    flags |= OpenFlags::PATH;
                } else if kind == ObjectKind::Fifo {
                    flags |= OpenFlags::NONBLOCK;
                }
                let fd = self.reopen(flags)?;
                Ok((fd, None))
            }
        }
    }

    pub(crate) fn stat_via(&self, fd: &OwnedFd, sock_name: &Option<CString>) -> Result<libc::stat> {
        match sock_name {
            Some(name) => Ok(sys::fstatat(fd.as_fd(), name, libc::AT_SYMLINK_NOFOLLOW)?),
            None => Ok(sys::fstatat(
                fd.as_fd(),
                EMPTY_PATH,
                libc::AT_SYMLINK_NOFOLLOW | libc::AT_EMPTY_PATH,
            )?),
        }
    }

    /// Refresh this object's attribute snapshot from a fresh stat and
    /// return the fields selected by `asked`.
    ///
    /// A mask asking for attributes the export does not support fails
    /// with `AttrNotSupported` before any syscall. If the stat cannot be
    /// converted, the cached mask is cleared to `RDATTR_ERR` and the
    /// conversion error returned.
    pub fn getattr(&self, asked: AttrMask) -> Result<Attributes> {
        let supported = self.export().fs_supported_attrs();
        if !supported.contains(asked) {
            debug!(asked = ?asked, supported = ?supported, "unsupported attributes");
            return Err(Error::AttrNotSupported);
        }
        let (fd, sock_name) = self.open_for_stat()?;
        let stat = self.stat_via(&fd, &sock_name)?;
        drop(fd);
        match attributes_from_stat(&stat, asked) {
            Ok(attrs) => {
                self.store_attributes(attrs.clone());
                Ok(attrs)
            }
            Err(err) => {
                self.mark_attributes_unreadable();
                Err(err)
            }
        }
    }
}
