//! Attribute mutation.

use std::time::{SystemTime, UNIX_EPOCH};

use std::os::fd::AsFd;

use tracing::debug;

use crate::attr::{AttrMask, ObjectKind, SetAttr, SetTime};
use crate::error::{Error, Result};
use crate::object::ObjectRecord;
use crate::sys;

fn timeval(seconds: i64) -> libc::timeval {
    libc::timeval { tv_sec: seconds, tv_usec: 0 }
}

fn resolve_time(requested: &SetTime, fallback: i64) -> Result<i64> {
    match requested {
        SetTime::DontChange => Ok(fallback),
        SetTime::ClientProvided(time) => Ok(time.seconds),
        SetTime::ServerCurrent => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .map_err(|_| Error::ServerFault),
    }
}

impl ObjectRecord {
    /// Apply the requested attribute changes under a single descriptor.
    ///
    /// The mode is masked with the export umask before application and
    /// silently dropped for symlinks (POSIX `chmod` through a link
    /// affects the target). Ownership changes pass `-1` for the side the
    /// caller left unset. When only one of atime/mtime is requested, the
    /// other is preserved from the fresh stat.
    pub fn setattr(&self, attrs: &SetAttr) -> Result<()> {
        let mask = attrs.mask();
        let supported = self.export().fs_supported_attrs();
        if !supported.contains(mask) {
            debug!(asked = ?mask, supported = ?supported, "unsupported attributes");
            return Err(Error::AttrNotSupported);
        }
        let mode = attrs.mode.map(|mode| mode & 0o7777 & !self.export().umask());

        let (fd, sock_name) = self.open_for_stat()?;
        let stat = self.stat_via(&fd, &sock_name)?;

        if let Some(mode) = mode {
            if self.kind() != ObjectKind::SymbolicLink {
                match &sock_name {
                    Some(name) => sys::fchmodat(fd.as_fd(), name, mode, 0)?,
                    None => sys::fchmod(fd.as_fd(), mode)?,
                }
            }
        }

        if mask.intersects(AttrMask::OWNER | AttrMask::GROUP) {
            let uid = attrs.uid.unwrap_or(libc::uid_t::MAX);
            let gid = attrs.gid.unwrap_or(libc::gid_t::MAX);
            match &sock_name {
                Some(name) => {
                    sys::fchownat(fd.as_fd(), name, uid, gid, libc::AT_SYMLINK_NOFOLLOW)?
                }
                None => sys::fchown(fd.as_fd(), uid, gid)?,
            }
        }

        if mask.intersects(AttrMask::ATIME | AttrMask::MTIME) {
            let times = [
                timeval(resolve_time(&attrs.atime, stat.st_atime)?),
                timeval(resolve_time(&attrs.mtime, stat.st_mtime)?),
            ];
            match &sock_name {
                Some(name) => sys::futimesat(fd.as_fd(), name, &times)?,
                None => sys::futimes(fd.as_fd(), &times)?,
            }
        }
        Ok(())
    }
}
