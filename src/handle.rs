//! Opaque kernel file-handle values and their wire digests.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// Maximum number of opaque bytes in a kernel file handle.
pub const MAX_HANDLE_SZ: usize = 128;

/// Wire header preceding the opaque bytes: `handle_bytes` (u32) followed
/// by `handle_type` (i32), both little-endian.
pub const HANDLE_HEADER_LEN: usize = 8;

/// Upper bound on any wire-encoded handle.
pub const MAX_WIRE_HANDLE_LEN: usize = HANDLE_HEADER_LEN + MAX_HANDLE_SZ;

/// Width of a FILEID2 digest: the leading opaque bytes of the handle.
pub const FILEID2_DIGEST_LEN: usize = 4;

/// Width of a FILEID3 / FILEID4 digest.
pub const FILEID_DIGEST_LEN: usize = 8;

/// Wire encodings a handle can be digested into.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DigestKind {
    Nfsv2,
    Nfsv3,
    Nfsv4,
    FileId2,
    FileId3,
    FileId4,
}

/// A kernel-issued file handle, stored in wire layout so one contiguous
/// slice serves as digest, hash key and syscall input.
///
/// Equality of the blob names the same inode within an export for as long
/// as the inode exists; the value is position-independent and survives
/// server restarts.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FileHandle {
    wire: Box<[u8]>,
}

impl FileHandle {
    /// Wrap the opaque bytes the kernel produced.
    pub(crate) fn from_raw(handle_type: i32, bytes: &[u8]) -> Self {
        debug_assert!(!bytes.is_empty() && bytes.len() <= MAX_HANDLE_SZ);
        let mut wire = vec![0u8; HANDLE_HEADER_LEN + bytes.len()];
        LittleEndian::write_u32(&mut wire[..4], bytes.len() as u32);
        LittleEndian::write_i32(&mut wire[4..8], handle_type);
        wire[HANDLE_HEADER_LEN..].copy_from_slice(bytes);
        FileHandle { wire: wire.into_boxed_slice() }
    }

    /// Kernel handle type tag.
    pub fn handle_type(&self) -> i32 {
        LittleEndian::read_i32(&self.wire[4..8])
    }

    /// The kernel-opaque portion of the handle.
    pub fn bytes(&self) -> &[u8] {
        &self.wire[HANDLE_HEADER_LEN..]
    }

    /// Borrowed view of the whole blob, suitable as a hash-table key.
    ///
    /// The view is valid only while the owning record is held.
    pub fn key(&self) -> &[u8] {
        &self.wire
    }

    /// Length of the full wire encoding.
    pub fn wire_len(&self) -> usize {
        self.wire.len()
    }

    /// Parse a wire digest back into a handle value.
    ///
    /// The total length is bounded by [`MAX_WIRE_HANDLE_LEN`] and the
    /// declared opaque length by [`MAX_HANDLE_SZ`]; anything out of
    /// bounds, zero-length or inconsistent fails with `Fault`.
    pub fn decode(wire: &[u8]) -> Result<FileHandle> {
        if wire.len() < HANDLE_HEADER_LEN || wire.len() > MAX_WIRE_HANDLE_LEN {
            return Err(Error::Fault);
        }
        let handle_bytes = LittleEndian::read_u32(&wire[..4]) as usize;
        if handle_bytes == 0
            || handle_bytes > MAX_HANDLE_SZ
            || handle_bytes != wire.len() - HANDLE_HEADER_LEN
        {
            return Err(Error::Fault);
        }
        Ok(FileHandle { wire: wire.to_vec().into_boxed_slice() })
    }

    /// Number of bytes [`FileHandle::digest`] will write for `kind`.
    pub fn digest_len(&self, kind: DigestKind) -> usize {
        match kind {
            DigestKind::Nfsv2 | DigestKind::Nfsv3 | DigestKind::Nfsv4 => self.wire.len(),
            DigestKind::FileId2 => FILEID2_DIGEST_LEN,
            DigestKind::FileId3 | DigestKind::FileId4 => FILEID_DIGEST_LEN,
        }
    }

    /// Write the digest of this handle into `out`, returning the number
    /// of bytes written.
    pub fn digest(&self, kind: DigestKind, out: &mut [u8]) -> Result<usize> {
        let needed = self.digest_len(kind);
        if out.len() < needed {
            tracing::debug!(needed, have = out.len(), "digest buffer too small");
            return Err(Error::TooSmall);
        }
        match kind {
            DigestKind::Nfsv2 | DigestKind::Nfsv3 | DigestKind::Nfsv4 => {
                out[..needed].copy_from_slice(&self.wire);
            }
            DigestKind::FileId2 => {
                let opaque = self.bytes();
                if opaque.len() < FILEID2_DIGEST_LEN {
                    return Err(Error::Fault);
                }
                out[..needed].copy_from_slice(&opaque[..FILEID2_DIGEST_LEN]);
            }
            DigestKind::FileId3 | DigestKind::FileId4 => {
                let opaque = self.bytes();
                if opaque.len() < 4 {
                    return Err(Error::Fault);
                }
                let ino32 = LittleEndian::read_u32(&opaque[..4]);
                LittleEndian::write_u64(&mut out[..needed], u64::from(ino32));
            }
        }
        Ok(needed)
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileHandle(type={}, ", self.handle_type())?;
        for byte in self.bytes() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}
