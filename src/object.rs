//! Per-object records and their reference-counted lifecycle.

use std::ffi::CString;
use std::os::fd::OwnedFd;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

use crate::attr::{attributes_from_stat, Attributes, ObjectKind};
use crate::error::{Error, Result};
use crate::export::Export;
use crate::handle::{DigestKind, FileHandle};
use crate::sys::OpenFlags;

/// Kind-specific payload of a record.
pub(crate) enum KindData {
    /// Regular files carry the data-path descriptor state.
    Regular { fd: Option<OwnedFd>, openflags: OpenFlags, lock_held: bool },
    /// Symlinks cache their target lazily, NUL-terminated.
    Symlink { target: Option<CString> },
    /// AF_UNIX sockets cannot be reached through `open_by_handle_at`, so
    /// the parent directory handle and entry name are retained instead.
    Socket { parent: FileHandle, name: CString },
    /// Directories, devices and FIFOs need no extra state.
    Node,
}

/// Per-kind inputs captured while the object was reachable by name.
pub(crate) enum KindExtra {
    None,
    LinkTarget(CString),
    Socket { parent: FileHandle, name: CString },
}

pub(crate) struct ObjectState {
    refs: u32,
    pub(crate) attrs: Attributes,
    pub(crate) data: KindData,
}

/// One live file-system object, addressed by its kernel handle.
///
/// Records live in their export's registry from allocation until a final
/// [`ObjectRecord::release`]; all mutable state sits behind the record
/// lock, which is never held across a syscall.
pub struct ObjectRecord {
    handle: FileHandle,
    kind: ObjectKind,
    export: Arc<Export>,
    state: Mutex<ObjectState>,
}

impl ObjectRecord {
    /// Build a record for a freshly statted object and attach it to the
    /// export registry with one reference.
    ///
    /// If a live record for the same handle is already attached, that
    /// record is acquired, refreshed from `stat` and returned instead.
    pub(crate) fn alloc(
        export: &Arc<Export>,
        handle: FileHandle,
        stat: &libc::stat,
        extra: KindExtra,
    ) -> Result<Arc<ObjectRecord>> {
        let attrs = attributes_from_stat(stat, export.fs_supported_attrs())?;
        let kind = attrs.kind;
        let data = match (kind, extra) {
            (ObjectKind::RegularFile, _) => KindData::Regular {
                fd: None,
                openflags: OpenFlags::empty(),
                lock_held: false,
            },
            (ObjectKind::SymbolicLink, KindExtra::LinkTarget(target)) => {
                KindData::Symlink { target: Some(target) }
            }
            (ObjectKind::SymbolicLink, _) => KindData::Symlink { target: None },
            (ObjectKind::Socket, KindExtra::Socket { parent, name }) => {
                if name.as_bytes().is_empty() {
                    return Err(Error::Fault);
                }
                KindData::Socket { parent, name }
            }
            // A socket record without its parent handle and name would be
            // unusable for every later attribute operation.
            (ObjectKind::Socket, _) => return Err(Error::Fault),
            _ => KindData::Node,
        };

        let record = Arc::new(ObjectRecord {
            handle,
            kind,
            export: Arc::clone(export),
            state: Mutex::new(ObjectState { refs: 1, attrs: attrs.clone(), data }),
        });

        // Keep the new record locked until it is attached, so it becomes
        // observable only fully initialized.
        let guard = record.lock_state();
        if let Some(existing) = export.attach_handle(&record) {
            drop(guard);
            Self::refresh_existing(&existing, &record, attrs);
            return Ok(existing);
        }
        drop(guard);
        Ok(record)
    }

    /// Carry the fresher snapshot (and symlink target, if any) over to
    /// the record that was already attached.
    fn refresh_existing(existing: &Arc<ObjectRecord>, fresh: &ObjectRecord, attrs: Attributes) {
        let mut state = existing.lock_state();
        state.attrs = attrs;
        let mut fresh_state = fresh.lock_state();
        if let (KindData::Symlink { target }, KindData::Symlink { target: new_target }) =
            (&mut state.data, &mut fresh_state.data)
        {
            if new_target.is_some() {
                *target = new_target.take();
            }
        }
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, ObjectState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The handle naming this object.
    pub fn handle(&self) -> &FileHandle {
        &self.handle
    }

    /// The object kind, fixed at creation.
    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    /// The export this record belongs to.
    pub fn export(&self) -> &Arc<Export> {
        &self.export
    }

    /// Test the kind of this record.
    pub fn handle_is(&self, kind: ObjectKind) -> bool {
        self.kind == kind
    }

    /// Two records name the same object iff their kinds and handle blobs
    /// match.
    pub fn compare(&self, other: &ObjectRecord) -> bool {
        self.kind == other.kind && self.handle == other.handle
    }

    /// Write a wire digest of this record's handle into `out`.
    pub fn handle_digest(&self, kind: DigestKind, out: &mut [u8]) -> Result<usize> {
        self.handle.digest(kind, out)
    }

    /// Borrowed view of the handle blob for use as a hash-table key.
    /// Valid only while the record is held.
    pub fn handle_to_key(&self) -> &[u8] {
        self.handle.key()
    }

    /// The most recently refreshed attribute snapshot.
    pub fn attributes(&self) -> Attributes {
        self.lock_state().attrs.clone()
    }

    pub(crate) fn store_attributes(&self, attrs: Attributes) {
        self.lock_state().attrs = attrs;
    }

    pub(crate) fn mark_attributes_unreadable(&self) {
        self.lock_state().attrs.mask = crate::attr::AttrMask::RDATTR_ERR;
    }

    /// Where a socket can still be reached: its parent directory handle
    /// and entry name.
    pub(crate) fn socket_location(&self) -> Result<(FileHandle, CString)> {
        match &self.lock_state().data {
            KindData::Socket { parent, name } => Ok((parent.clone(), name.clone())),
            _ => Err(Error::ServerFault),
        }
    }

    pub(crate) fn cached_link_target(&self) -> Option<CString> {
        match &self.lock_state().data {
            KindData::Symlink { target } => target.clone(),
            _ => None,
        }
    }

    pub(crate) fn store_link_target(&self, target: CString) {
        if let KindData::Symlink { target: cache } = &mut self.lock_state().data {
            *cache = Some(target);
        }
    }

    /// Take another reference on the record.
    pub fn acquire(&self) {
        self.lock_state().refs += 1;
    }

    /// Drop one reference; on the last one, detach the record from its
    /// export and free its resources.
    ///
    /// Returns `Busy` while other references remain and `Inval` when the
    /// last reference is dropped on a regular file that still has an open
    /// descriptor or a held lock; in the latter case the reference is
    /// reinstated so a later quiescent release can finish the job.
    pub fn release(self: &Arc<Self>) -> Result<()> {
        let mut registry = self.export.registry_guard();
        let mut state = self.lock_state();
        if state.refs == 0 {
            warn!("release on an already destroyed handle");
            return Err(Error::Inval);
        }
        state.refs -= 1;
        if state.refs > 0 {
            let refs = state.refs;
            drop(state);
            warn!(refs, "tried to release a busy handle");
            return Err(Error::Busy);
        }
        let (open, lock_held) = match &state.data {
            KindData::Regular { fd, lock_held, .. } => (fd.is_some(), *lock_held),
            _ => (false, false),
        };
        if open || lock_held {
            state.refs = 1;
            drop(state);
            warn!(open, lock_held, "tried to release an active regular file");
            return Err(Error::Inval);
        }
        drop(state);
        Export::detach_locked(&mut registry, &self.handle);
        Ok(())
    }

    /// Hand a data-path descriptor to a regular-file record.
    pub fn install_fd(&self, fd: OwnedFd, openflags: OpenFlags) -> Result<()> {
        let mut state = self.lock_state();
        match &mut state.data {
            KindData::Regular { fd: slot, openflags: flags, .. } => {
                if slot.is_some() {
                    return Err(Error::Inval);
                }
                *slot = Some(fd);
                *flags = openflags;
                Ok(())
            }
            _ => Err(Error::Inval),
        }
    }

    /// Remove and return the data-path descriptor, if any.
    pub fn take_fd(&self) -> Option<OwnedFd> {
        let mut state = self.lock_state();
        match &mut state.data {
            KindData::Regular { fd, openflags, .. } => {
                *openflags = OpenFlags::empty();
                fd.take()
            }
            _ => None,
        }
    }

    /// Flags the data-path descriptor was opened with; empty when closed.
    pub fn openflags(&self) -> OpenFlags {
        match &self.lock_state().data {
            KindData::Regular { openflags, .. } => *openflags,
            _ => OpenFlags::empty(),
        }
    }

    /// Whether a data-path descriptor is currently installed.
    pub fn is_open(&self) -> bool {
        matches!(&self.lock_state().data, KindData::Regular { fd: Some(_), .. })
    }

    /// Record whether the byte-range lock subsystem holds state on this
    /// file.
    pub fn set_lock_held(&self, held: bool) -> Result<()> {
        match &mut self.lock_state().data {
            KindData::Regular { lock_held, .. } => {
                *lock_held = held;
                Ok(())
            }
            _ => Err(Error::Inval),
        }
    }
}
