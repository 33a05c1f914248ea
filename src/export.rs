//! Export surface: the root anchor, capabilities and the registry of
//! live object records.

use std::collections::HashMap;
use std::ffi::CString;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use bitflags::bitflags;

use crate::attr::AttrMask;
use crate::error::{Error, Result};
use crate::handle::FileHandle;
use crate::object::{KindExtra, ObjectRecord};
use crate::ops::read_link_target;
use crate::sys::{self, OpenFlags, EMPTY_PATH};
use crate::MAX_PATH_LEN;

bitflags! {
    /// Optional filesystem features an export may advertise.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct Capabilities: u32 {
        const LINK_SUPPORT = 1 << 0;
        const SYMLINK_SUPPORT = 1 << 1;
    }
}

/// Knobs fixed when an export is opened.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Creation modes are masked with this before they reach the
    /// filesystem.
    pub umask: u32,
    pub capabilities: Capabilities,
    pub supported_attrs: AttrMask,
}

impl Default for ExportOptions {
    fn default() -> Self {
        ExportOptions {
            umask: 0,
            capabilities: Capabilities::all(),
            supported_attrs: AttrMask::posix(),
        }
    }
}

pub(crate) type Registry = HashMap<FileHandle, Arc<ObjectRecord>>;

/// A published subtree. Its root descriptor anchors all handle
/// resolution: every `open_by_handle_at` in the crate uses it as the
/// mount fd.
pub struct Export {
    root: OwnedFd,
    umask: u32,
    capabilities: Capabilities,
    supported_attrs: AttrMask,
    registry: Mutex<Registry>,
}

impl Export {
    /// Open `path` as the root of a new export.
    pub fn open(path: &Path, options: ExportOptions) -> Result<Arc<Export>> {
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| Error::Fault)?;
        let root = sys::open(&c_path, OpenFlags::RDONLY | OpenFlags::DIRECTORY)?;
        Ok(Arc::new(Export {
            root,
            umask: options.umask & 0o777,
            capabilities: options.capabilities,
            supported_attrs: options.supported_attrs,
            registry: Mutex::new(HashMap::new()),
        }))
    }

    /// The long-lived descriptor used as `mount_fd` for handle
    /// resolution.
    pub fn root_fd(&self) -> BorrowedFd<'_> {
        self.root.as_fd()
    }

    pub fn umask(&self) -> u32 {
        self.umask
    }

    pub fn fs_supported_attrs(&self) -> AttrMask {
        self.supported_attrs
    }

    pub fn fs_supports(&self, capability: Capabilities) -> bool {
        self.capabilities.contains(capability)
    }

    /// Number of records currently attached.
    pub fn live_handles(&self) -> usize {
        self.registry_guard().len()
    }

    pub(crate) fn registry_guard(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Attach a freshly allocated record. When a live record for the
    /// same handle is already present, that record is acquired and
    /// returned and the new one stays unattached.
    pub(crate) fn attach_handle(&self, record: &Arc<ObjectRecord>) -> Option<Arc<ObjectRecord>> {
        let mut registry = self.registry_guard();
        if let Some(existing) = registry.get(record.handle()) {
            existing.acquire();
            return Some(Arc::clone(existing));
        }
        registry.insert(record.handle().clone(), Arc::clone(record));
        None
    }

    /// Remove the registry entry for `handle`; the caller already holds
    /// the registry lock and has verified the record is quiescent.
    pub(crate) fn detach_locked(registry: &mut Registry, handle: &FileHandle) {
        registry.remove(handle);
    }

    /// Find a live record by its wire key, taking a reference on it.
    pub fn lookup_handle(&self, key: &[u8]) -> Option<Arc<ObjectRecord>> {
        let handle = FileHandle::decode(key).ok()?;
        let registry = self.registry_guard();
        let record = registry.get(&handle)?;
        record.acquire();
        Some(Arc::clone(record))
    }

    /// Resolve an absolute path into a record at export startup.
    ///
    /// The parent directory is opened by name with a conventional `open`;
    /// only the leaf goes through `name_to_handle_at`. The path must be
    /// absolute with a non-empty leaf.
    pub fn lookup_path(self: &Arc<Self>, path: &str) -> Result<Arc<ObjectRecord>> {
        if !path.starts_with('/') || path.len() < 2 || path.len() > MAX_PATH_LEN {
            return Err(Error::Inval);
        }
        let (dir_part, leaf) = match path.rsplit_once('/') {
            Some(split) => split,
            None => return Err(Error::Inval),
        };
        if leaf.is_empty() {
            return Err(Error::Inval);
        }
        let c_dir = CString::new(if dir_part.is_empty() { "/" } else { dir_part })
            .map_err(|_| Error::Fault)?;
        let c_leaf = CString::new(leaf).map_err(|_| Error::Fault)?;

        let dir_fd = sys::open(&c_dir, OpenFlags::RDONLY)?;
        let dir_stat = sys::fstat(dir_fd.as_fd())?;
        if dir_stat.st_mode & libc::S_IFMT != libc::S_IFDIR {
            return Err(Error::NotDirectory);
        }
        let (handle, _mount_id) = sys::name_to_handle_at(dir_fd.as_fd(), &c_leaf, 0)?;
        let stat = sys::fstatat(dir_fd.as_fd(), &c_leaf, libc::AT_SYMLINK_NOFOLLOW)?;

        let extra = match stat.st_mode & libc::S_IFMT {
            libc::S_IFLNK => KindExtra::LinkTarget(read_link_target(dir_fd.as_fd(), &c_leaf)?),
            libc::S_IFSOCK => {
                let (parent, _mount_id) =
                    sys::name_to_handle_at(dir_fd.as_fd(), EMPTY_PATH, libc::AT_EMPTY_PATH)?;
                KindExtra::Socket { parent, name: c_leaf }
            }
            _ => KindExtra::None,
        };
        drop(dir_fd);
        ObjectRecord::alloc(self, handle, &stat, extra)
    }

    /// Rebuild a record from a wire digest received off the protocol.
    ///
    /// A record already attached for the same handle is acquired and
    /// returned; otherwise the handle is re-opened cold, statted and a
    /// fresh record allocated. A cold socket digest is refused: without
    /// its parent directory handle the record could never service an
    /// attribute operation.
    pub fn create_handle(self: &Arc<Self>, wire: &[u8]) -> Result<Arc<ObjectRecord>> {
        let handle = FileHandle::decode(wire)?;
        if let Some(record) = self.lookup_handle(handle.key()) {
            return Ok(record);
        }
        let fd = sys::open_by_handle_at(
            self.root_fd(),
            &handle,
            OpenFlags::PATH | OpenFlags::NOACCESS,
        )?;
        let stat = sys::fstatat(fd.as_fd(), EMPTY_PATH, libc::AT_EMPTY_PATH)?;
        let extra = match stat.st_mode & libc::S_IFMT {
            libc::S_IFLNK => KindExtra::LinkTarget(read_link_target(fd.as_fd(), EMPTY_PATH)?),
            libc::S_IFSOCK => return Err(Error::NotSupported),
            _ => KindExtra::None,
        };
        drop(fd);
        ObjectRecord::alloc(self, handle, &stat, extra)
    }
}
