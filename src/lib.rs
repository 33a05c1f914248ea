//! Handle-based VFS abstraction layer for NFS servers.
//!
//! Every file-system object is addressed by an opaque, durable kernel file
//! handle obtained through `name_to_handle_at`. Operations re-open the
//! handle to a fresh descriptor against the export root, act through the
//! `*at` syscall family, and release every descriptor before returning, so
//! no path or open descriptor is retained between operations and a handle
//! stays valid across server restarts and mount moves.

pub mod attr;
pub mod error;
pub mod export;
pub mod handle;
pub mod object;
pub mod ops;
pub mod sys;

/// Maximum length of names passed into tree operations.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of file paths and symlink targets.
pub const MAX_PATH_LEN: usize = 1024;
