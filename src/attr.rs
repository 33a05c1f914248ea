//! Object kinds, attribute masks and attribute snapshots.

use bitflags::bitflags;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;

use crate::error::{Error, Result};

/// File-system object kind.
///
/// The discriminants are the POSIX `DT_*` codes, which also equal
/// `(mode & S_IFMT) >> 12`. The kind is derived once from the creating
/// stat and immutable thereafter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
pub enum ObjectKind {
    Fifo = libc::DT_FIFO as isize,
    CharacterDevice = libc::DT_CHR as isize,
    Directory = libc::DT_DIR as isize,
    BlockDevice = libc::DT_BLK as isize,
    RegularFile = libc::DT_REG as isize,
    SymbolicLink = libc::DT_LNK as isize,
    Socket = libc::DT_SOCK as isize,
}

impl ObjectKind {
    /// Derive the kind from a POSIX `st_mode`.
    pub fn from_mode(mode: libc::mode_t) -> Result<ObjectKind> {
        ObjectKind::from_u32((mode & libc::S_IFMT) >> 12).ok_or(Error::Inval)
    }

    /// Derive the kind from a `getdents` `d_type`, when the filesystem
    /// filled it in.
    pub fn from_d_type(d_type: u8) -> Option<ObjectKind> {
        if d_type == libc::DT_UNKNOWN {
            return None;
        }
        ObjectKind::from_u8(d_type)
    }
}

bitflags! {
    /// Attribute selection mask.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct AttrMask: u32 {
        const TYPE = 1 << 0;
        const MODE = 1 << 1;
        const NLINK = 1 << 2;
        const OWNER = 1 << 3;
        const GROUP = 1 << 4;
        const SIZE = 1 << 5;
        const RDEV = 1 << 6;
        const FILEID = 1 << 7;
        const ATIME = 1 << 8;
        const MTIME = 1 << 9;
        const CTIME = 1 << 10;
        /// Left in place of the asked bits when a stat could not be
        /// converted into attributes.
        const RDATTR_ERR = 1 << 11;
    }
}

impl AttrMask {
    /// Every attribute a plain POSIX filesystem can report.
    pub fn posix() -> AttrMask {
        AttrMask::TYPE
            | AttrMask::MODE
            | AttrMask::NLINK
            | AttrMask::OWNER
            | AttrMask::GROUP
            | AttrMask::SIZE
            | AttrMask::RDEV
            | AttrMask::FILEID
            | AttrMask::ATIME
            | AttrMask::MTIME
            | AttrMask::CTIME
    }
}

/// Time of file events.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeSpec {
    pub seconds: i64,
    pub nanos: u32,
}

/// Major and minor device pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DeviceId {
    pub major: u32,
    pub minor: u32,
}

/// Attribute snapshot of one object.
#[derive(Debug, Clone)]
pub struct Attributes {
    /// Which of the fields below are filled.
    pub mask: AttrMask,
    pub kind: ObjectKind,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub rdev: DeviceId,
    pub fileid: u64,
    pub atime: TimeSpec,
    pub mtime: TimeSpec,
    pub ctime: TimeSpec,
}

/// Convert a POSIX stat into an attribute snapshot carrying the `asked`
/// mask. Fails when the stat reports a file type outside the seven kinds.
pub fn attributes_from_stat(stat: &libc::stat, asked: AttrMask) -> Result<Attributes> {
    let kind = ObjectKind::from_mode(stat.st_mode)?;
    Ok(Attributes {
        mask: asked,
        kind,
        mode: stat.st_mode & !libc::S_IFMT,
        nlink: stat.st_nlink as u32,
        uid: stat.st_uid,
        gid: stat.st_gid,
        size: stat.st_size as u64,
        rdev: DeviceId {
            major: libc::major(stat.st_rdev),
            minor: libc::minor(stat.st_rdev),
        },
        fileid: stat.st_ino,
        atime: TimeSpec { seconds: stat.st_atime, nanos: stat.st_atime_nsec as u32 },
        mtime: TimeSpec { seconds: stat.st_mtime, nanos: stat.st_mtime_nsec as u32 },
        ctime: TimeSpec { seconds: stat.st_ctime, nanos: stat.st_ctime_nsec as u32 },
    })
}

/// Strategy for updating one timestamp in [`SetAttr`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SetTime {
    DontChange,
    ServerCurrent,
    ClientProvided(TimeSpec),
}

/// Attribute modification request.
#[derive(Debug, Clone)]
pub struct SetAttr {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub atime: SetTime,
    pub mtime: SetTime,
}

impl SetAttr {
    /// A request that changes nothing.
    pub fn none() -> SetAttr {
        SetAttr {
            mode: None,
            uid: None,
            gid: None,
            atime: SetTime::DontChange,
            mtime: SetTime::DontChange,
        }
    }

    /// Mask of the attributes this request touches.
    pub fn mask(&self) -> AttrMask {
        let mut mask = AttrMask::empty();
        if self.mode.is_some() {
            mask |= AttrMask::MODE;
        }
        if self.uid.is_some() {
            mask |= AttrMask::OWNER;
        }
        if self.gid.is_some() {
            mask |= AttrMask::GROUP;
        }
        if self.atime != SetTime::DontChange {
            mask |= AttrMask::ATIME;
        }
        if self.mtime != SetTime::DontChange {
            mask |= AttrMask::MTIME;
        }
        mask
    }
}

/// Ownership and mode applied by the creating operations.
#[derive(Debug, Copy, Clone)]
pub struct CreateAttrs {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}
