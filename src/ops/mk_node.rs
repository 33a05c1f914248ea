//! Special-node creation: devices, FIFOs and sockets.

use std::ffi::OsStr;
use std::os::fd::AsFd;
use std::sync::Arc;

use crate::attr::{CreateAttrs, DeviceId};
use crate::error::Result;
use crate::object::{KindExtra, ObjectRecord};
use crate::ops::validate_name;
use crate::sys::{self, OpenFlags, EMPTY_PATH};

/// What kind of node [`ObjectRecord::mknod`] should create. Block and
/// character nodes require their device numbers up front.
#[derive(Debug, Copy, Clone)]
pub enum NodeSpec {
    Block(DeviceId),
    Character(DeviceId),
    Fifo,
    Socket,
}

impl NodeSpec {
    fn format(&self) -> (libc::mode_t, libc::dev_t) {
        match *self {
            NodeSpec::Block(dev) => (libc::S_IFBLK, libc::makedev(dev.major, dev.minor)),
            NodeSpec::Character(dev) => (libc::S_IFCHR, libc::makedev(dev.major, dev.minor)),
            NodeSpec::Fifo => (libc::S_IFIFO, 0),
            NodeSpec::Socket => (libc::S_IFSOCK, 0),
        }
    }
}

impl ObjectRecord {
    /// Create a special node named `name` in this directory.
    ///
    /// Created with mode 000, then chowned and chmodded through the
    /// parent descriptor; sockets additionally remember this directory's
    /// handle and the entry name, because `open_by_handle_at` cannot
    /// produce a usable descriptor for an AF_UNIX socket. If any step
    /// after the `mknodat` fails the node is removed again.
    pub fn mknod(
        self: &Arc<Self>,
        name: &OsStr,
        node: NodeSpec,
        attrs: &CreateAttrs,
    ) -> Result<Arc<ObjectRecord>> {
        self.require_directory()?;
        let c_name = validate_name(name)?;
        let unix_mode = attrs.mode & 0o7777 & !self.export().umask();
        let (format, dev) = node.format();

        let dir_fd = self.reopen(OpenFlags::PATH | OpenFlags::NOACCESS)?;
        let dir_stat = sys::fstatat(dir_fd.as_fd(), EMPTY_PATH, libc::AT_EMPTY_PATH)?;
        let group = if dir_stat.st_mode & libc::S_ISGID != 0 {
            libc::gid_t::MAX
        } else {
            attrs.gid
        };

        sys::mknodat(dir_fd.as_fd(), &c_name, format, dev)?;
        let built = (|| {
            let (handle, _mount_id) = sys::name_to_handle_at(dir_fd.as_fd(), &c_name, 0)?;
            sys::fchownat(
                dir_fd.as_fd(),
                &c_name,
                attrs.uid,
                group,
                libc::AT_SYMLINK_NOFOLLOW,
            )?;
            sys::fchmodat(dir_fd.as_fd(), &c_name, unix_mode, 0)?;
            let stat = sys::fstatat(dir_fd.as_fd(), &c_name, 0)?;
            let extra = match node {
                NodeSpec::Socket => KindExtra::Socket {
                    parent: self.handle().clone(),
                    name: c_name.clone(),
                },
                _ => KindExtra::None,
            };
            ObjectRecord::alloc(self.export(), handle, &stat, extra)
        })();
        match built {
            Ok(record) => Ok(record),
            Err(err) => {
                let _ = sys::unlinkat(dir_fd.as_fd(), &c_name, 0);
                Err(err)
            }
        }
    }
}
