//! Raw directory enumeration over `getdents64`.

use std::ffi::OsStr;
use std::os::fd::AsFd;
use std::os::unix::ffi::OsStrExt;

use crate::attr::ObjectKind;
use crate::error::{Error, Result};
use crate::object::ObjectRecord;
use crate::sys::{self, OpenFlags};

/// Opaque resumption cookie for [`ObjectRecord::read_dir`].
///
/// The payload is the kernel's raw directory offset, not a semantic
/// index; it is only meaningful against the directory that produced it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DirCookie([u8; 8]);

impl DirCookie {
    pub(crate) fn from_offset(offset: libc::off_t) -> Self {
        DirCookie(offset.to_le_bytes())
    }

    pub(crate) fn offset(&self) -> libc::off_t {
        libc::off_t::from_le_bytes(self.0)
    }

    /// The opaque payload, for embedding in protocol replies.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Rebuild a cookie from wire bytes; the payload must be exactly the
    /// width of an `off_t`.
    pub fn from_bytes(bytes: &[u8]) -> Result<DirCookie> {
        let payload: [u8; 8] = bytes.try_into().map_err(|_| Error::Inval)?;
        Ok(DirCookie(payload))
    }
}

/// One entry handed to the [`ObjectRecord::read_dir`] callback.
///
/// The name borrow keeps callbacks from retaining it beyond the call.
pub struct DirEntry<'a> {
    pub name: &'a OsStr,
    /// Raw `d_type` byte from the kernel.
    pub d_type: u8,
    /// Resume point immediately after this entry.
    pub cookie: DirCookie,
}

impl DirEntry<'_> {
    /// Object kind, when the filesystem filled `d_type` in.
    pub fn kind(&self) -> Option<ObjectKind> {
        ObjectKind::from_d_type(self.d_type)
    }
}

const DIRENT_BUF_SIZE: usize = 1024;

// linux_dirent64: d_ino (8), d_off (8), d_reclen (2), d_type (1), name.
const DIRENT_HEADER_LEN: usize = 19;

struct RawDirent<'a> {
    d_off: libc::off_t,
    d_type: u8,
    reclen: usize,
    name: &'a [u8],
}

fn parse_dirent(buf: &[u8]) -> Result<RawDirent<'_>> {
    if buf.len() < DIRENT_HEADER_LEN {
        return Err(Error::ServerFault);
    }
    let d_off = libc::off_t::from_ne_bytes(
        buf[8..16].try_into().map_err(|_| Error::ServerFault)?,
    );
    let reclen =
        u16::from_ne_bytes(buf[16..18].try_into().map_err(|_| Error::ServerFault)?) as usize;
    if reclen < DIRENT_HEADER_LEN || reclen > buf.len() {
        return Err(Error::ServerFault);
    }
    let name_field = &buf[DIRENT_HEADER_LEN..reclen];
    let name_len = name_field
        .iter()
        .position(|&byte| byte == 0)
        .ok_or(Error::ServerFault)?;
    Ok(RawDirent {
        d_off,
        d_type: buf[18],
        reclen,
        name: &name_field[..name_len],
    })
}

impl ObjectRecord {
    /// Stream this directory's entries through `callback`, skipping `.`
    /// and `..`.
    ///
    /// `whence` resumes at a cookie from an earlier call; `limit` stops
    /// after that many delivered entries (0 means unbounded). Returns
    /// `true` when the kernel reported end of directory, `false` when the
    /// limit cut the listing short. A callback error aborts the walk and
    /// propagates unchanged.
    pub fn read_dir(
        &self,
        limit: u32,
        whence: Option<DirCookie>,
        mut callback: impl FnMut(&DirEntry<'_>) -> Result<()>,
    ) -> Result<bool> {
        self.require_directory()?;
        let dir_fd = self.reopen(OpenFlags::RDONLY | OpenFlags::DIRECTORY)?;
        if let Some(cookie) = whence {
            sys::seek_dir(dir_fd.as_fd(), cookie.offset())?;
        }

        let mut buf = [0u8; DIRENT_BUF_SIZE];
        let mut delivered: u32 = 0;
        loop {
            let nread = sys::getdents64(dir_fd.as_fd(), &mut buf)?;
            if nread == 0 {
                return Ok(true);
            }
            let mut bpos = 0;
            while bpos < nread {
                let raw = parse_dirent(&buf[bpos..nread])?;
                bpos += raw.reclen;
                if raw.name == b"." || raw.name == b".." {
                    continue;
                }
                let entry = DirEntry {
                    name: OsStr::from_bytes(raw.name),
                    d_type: raw.d_type,
                    cookie: DirCookie::from_offset(raw.d_off),
                };
                callback(&entry)?;
                delivered += 1;
                if limit > 0 && delivered >= limit {
                    return Ok(false);
                }
            }
        }
    }
}
