//! Thin typed adapter over the kernel syscalls the FSAL core needs.
//!
//! Every function reports failure as the raw [`Errno`] captured at the
//! call site; descriptor-returning calls transfer ownership of the new
//! descriptor to the caller as an [`OwnedFd`], so it is closed on every
//! exit path of the caller.

use std::ffi::CStr;
use std::mem::MaybeUninit;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use bitflags::bitflags;

use crate::error::Errno;
use crate::handle::{FileHandle, MAX_HANDLE_SZ};

/// The empty path used with `AT_EMPTY_PATH` style calls.
pub(crate) const EMPTY_PATH: &CStr = match CStr::from_bytes_with_nul(b"\0") {
    Ok(path) => path,
    Err(_) => panic!("empty path literal"),
};

bitflags! {
    /// Open flags accepted by [`open`], [`openat`] and
    /// [`open_by_handle_at`].
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct OpenFlags: i32 {
        const RDONLY = libc::O_RDONLY;
        const WRONLY = libc::O_WRONLY;
        const RDWR = libc::O_RDWR;
        /// Access-mode bits left in place on a path-only open; the kernel
        /// ignores them when `PATH` is set.
        const NOACCESS = libc::O_ACCMODE;
        const CREAT = libc::O_CREAT;
        const EXCL = libc::O_EXCL;
        const TRUNC = libc::O_TRUNC;
        const DIRECTORY = libc::O_DIRECTORY;
        const NOFOLLOW = libc::O_NOFOLLOW;
        const NONBLOCK = libc::O_NONBLOCK;
        const PATH = libc::O_PATH;
    }
}

/// Raw layout handed to the handle syscalls, sized for the largest
/// handle the kernel will ever produce.
#[repr(C)]
struct RawHandle {
    handle_bytes: libc::c_uint,
    handle_type: libc::c_int,
    f_handle: [u8; MAX_HANDLE_SZ],
}

impl RawHandle {
    fn empty() -> Self {
        RawHandle {
            handle_bytes: MAX_HANDLE_SZ as libc::c_uint,
            handle_type: 0,
            f_handle: [0; MAX_HANDLE_SZ],
        }
    }

    fn from_handle(handle: &FileHandle) -> Self {
        let bytes = handle.bytes();
        let mut raw = RawHandle {
            handle_bytes: bytes.len() as libc::c_uint,
            handle_type: handle.handle_type(),
            f_handle: [0; MAX_HANDLE_SZ],
        };
        raw.f_handle[..bytes.len()].copy_from_slice(bytes);
        raw
    }
}

fn check(ret: libc::c_int) -> Result<(), Errno> {
    if ret < 0 {
        Err(Errno::last())
    } else {
        Ok(())
    }
}

fn check_fd(ret: libc::c_int) -> Result<OwnedFd, Errno> {
    if ret < 0 {
        Err(Errno::last())
    } else {
        Ok(unsafe { OwnedFd::from_raw_fd(ret) })
    }
}

/// Plain `open`, used only for the bootstrap paths that still work on a
/// path name.
pub fn open(path: &CStr, flags: OpenFlags) -> Result<OwnedFd, Errno> {
    check_fd(unsafe { libc::open(path.as_ptr(), flags.bits() | libc::O_CLOEXEC) })
}

pub fn openat(
    dirfd: BorrowedFd<'_>,
    name: &CStr,
    flags: OpenFlags,
    mode: libc::mode_t,
) -> Result<OwnedFd, Errno> {
    check_fd(unsafe {
        libc::openat(
            dirfd.as_raw_fd(),
            name.as_ptr(),
            flags.bits() | libc::O_CLOEXEC,
            mode as libc::c_uint,
        )
    })
}

/// Resolve `name` below `dirfd` into a kernel file handle.
pub fn name_to_handle_at(
    dirfd: BorrowedFd<'_>,
    name: &CStr,
    flags: libc::c_int,
) -> Result<(FileHandle, libc::c_int), Errno> {
    let mut raw = RawHandle::empty();
    let mut mount_id: libc::c_int = 0;
    let ret = unsafe {
        libc::syscall(
            libc::SYS_name_to_handle_at,
            dirfd.as_raw_fd(),
            name.as_ptr(),
            &mut raw as *mut RawHandle,
            &mut mount_id as *mut libc::c_int,
            flags,
        )
    };
    if ret < 0 {
        return Err(Errno::last());
    }
    let len = raw.handle_bytes as usize;
    Ok((FileHandle::from_raw(raw.handle_type, &raw.f_handle[..len]), mount_id))
}

/// Re-open a handle against `mount_fd`, the export root descriptor.
pub fn open_by_handle_at(
    mount_fd: BorrowedFd<'_>,
    handle: &FileHandle,
    flags: OpenFlags,
) -> Result<OwnedFd, Errno> {
    let mut raw = RawHandle::from_handle(handle);
    let ret = unsafe {
        libc::syscall(
            libc::SYS_open_by_handle_at,
            mount_fd.as_raw_fd(),
            &mut raw as *mut RawHandle,
            flags.bits() | libc::O_CLOEXEC,
        )
    };
    if ret < 0 {
        return Err(Errno::last());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(ret as RawFd) })
}

pub fn fstat(fd: BorrowedFd<'_>) -> Result<libc::stat, Errno> {
    let mut stat = MaybeUninit::<libc::stat>::uninit();
    check(unsafe { libc::fstat(fd.as_raw_fd(), stat.as_mut_ptr()) })?;
    Ok(unsafe { stat.assume_init() })
}

pub fn fstatat(
    dirfd: BorrowedFd<'_>,
    name: &CStr,
    flags: libc::c_int,
) -> Result<libc::stat, Errno> {
    let mut stat = MaybeUninit::<libc::stat>::uninit();
    check(unsafe {
        libc::fstatat(dirfd.as_raw_fd(), name.as_ptr(), stat.as_mut_ptr(), flags)
    })?;
    Ok(unsafe { stat.assume_init() })
}

/// Read a symlink target into `buf`, returning the number of bytes
/// written. A result equal to `buf.len()` means the target was truncated.
pub fn readlinkat(
    dirfd: BorrowedFd<'_>,
    name: &CStr,
    buf: &mut [u8],
) -> Result<usize, Errno> {
    let ret = unsafe {
        libc::readlinkat(
            dirfd.as_raw_fd(),
            name.as_ptr(),
            buf.as_mut_ptr().cast::<libc::c_char>(),
            buf.len(),
        )
    };
    if ret < 0 {
        return Err(Errno::last());
    }
    Ok(ret as usize)
}

/// Fill `buf` with raw `linux_dirent64` records; zero means end of
/// directory.
pub fn getdents64(fd: BorrowedFd<'_>, buf: &mut [u8]) -> Result<usize, Errno> {
    let ret = unsafe {
        libc::syscall(
            libc::SYS_getdents64,
            fd.as_raw_fd(),
            buf.as_mut_ptr(),
            buf.len(),
        )
    };
    if ret < 0 {
        return Err(Errno::last());
    }
    Ok(ret as usize)
}

/// Position a directory stream at a cookie previously produced by the
/// kernel.
pub fn seek_dir(fd: BorrowedFd<'_>, offset: libc::off_t) -> Result<libc::off_t, Errno> {
    let ret = unsafe { libc::lseek(fd.as_raw_fd(), offset, libc::SEEK_SET) };
    if ret < 0 {
        return Err(Errno::last());
    }
    Ok(ret)
}

pub fn mkdirat(dirfd: BorrowedFd<'_>, name: &CStr, mode: libc::mode_t) -> Result<(), Errno> {
    check(unsafe { libc::mkdirat(dirfd.as_raw_fd(), name.as_ptr(), mode) })
}

pub fn mknodat(
    dirfd: BorrowedFd<'_>,
    name: &CStr,
    mode: libc::mode_t,
    dev: libc::dev_t,
) -> Result<(), Errno> {
    check(unsafe { libc::mknodat(dirfd.as_raw_fd(), name.as_ptr(), mode, dev) })
}

pub fn symlinkat(target: &CStr, dirfd: BorrowedFd<'_>, name: &CStr) -> Result<(), Errno> {
    check(unsafe { libc::symlinkat(target.as_ptr(), dirfd.as_raw_fd(), name.as_ptr()) })
}

pub fn linkat(
    src_fd: BorrowedFd<'_>,
    src_name: &CStr,
    dest_fd: BorrowedFd<'_>,
    dest_name: &CStr,
    flags: libc::c_int,
) -> Result<(), Errno> {
    check(unsafe {
        libc::linkat(
            src_fd.as_raw_fd(),
            src_name.as_ptr(),
            dest_fd.as_raw_fd(),
            dest_name.as_ptr(),
            flags,
        )
    })
}

pub fn renameat(
    old_dirfd: BorrowedFd<'_>,
    old_name: &CStr,
    new_dirfd: BorrowedFd<'_>,
    new_name: &CStr,
) -> Result<(), Errno> {
    check(unsafe {
        libc::renameat(
            old_dirfd.as_raw_fd(),
            old_name.as_ptr(),
            new_dirfd.as_raw_fd(),
            new_name.as_ptr(),
        )
    })
}

pub fn unlinkat(dirfd: BorrowedFd<'_>, name: &CStr, flags: libc::c_int) -> Result<(), Errno> {
    check(unsafe { libc::unlinkat(dirfd.as_raw_fd(), name.as_ptr(), flags) })
}

pub fn fchown(fd: BorrowedFd<'_>, uid: libc::uid_t, gid: libc::gid_t) -> Result<(), Errno> {
    check(unsafe { libc::fchown(fd.as_raw_fd(), uid, gid) })
}

pub fn fchownat(
    dirfd: BorrowedFd<'_>,
    name: &CStr,
    uid: libc::uid_t,
    gid: libc::gid_t,
    flags: libc::c_int,
) -> Result<(), Errno> {
    check(unsafe { libc::fchownat(dirfd.as_raw_fd(), name.as_ptr(), uid, gid, flags) })
}

pub fn fchmod(fd: BorrowedFd<'_>, mode: libc::mode_t) -> Result<(), Errno> {
    check(unsafe { libc::fchmod(fd.as_raw_fd(), mode) })
}

pub fn fchmodat(
    dirfd: BorrowedFd<'_>,
    name: &CStr,
    mode: libc::mode_t,
    flags: libc::c_int,
) -> Result<(), Errno> {
    check(unsafe { libc::fchmodat(dirfd.as_raw_fd(), name.as_ptr(), mode, flags) })
}

pub fn futimes(fd: BorrowedFd<'_>, times: &[libc::timeval; 2]) -> Result<(), Errno> {
    check(unsafe { libc::futimes(fd.as_raw_fd(), times.as_ptr()) })
}

extern "C" {
    // Not bound by the `libc` crate for this target, but present in glibc.
    #[link_name = "futimesat"]
    fn raw_futimesat(
        dirfd: libc::c_int,
        pathname: *const libc::c_char,
        times: *const libc::timeval,
    ) -> libc::c_int;
}

pub fn futimesat(
    dirfd: BorrowedFd<'_>,
    name: &CStr,
    times: &[libc::timeval; 2],
) -> Result<(), Errno> {
    check(unsafe { raw_futimesat(dirfd.as_raw_fd(), name.as_ptr(), times.as_ptr()) })
}

pub fn ftruncate(fd: BorrowedFd<'_>, length: libc::off_t) -> Result<(), Errno> {
    check(unsafe { libc::ftruncate(fd.as_raw_fd(), length) })
}
