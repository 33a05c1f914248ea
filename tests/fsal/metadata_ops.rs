use std::os::unix::fs::{MetadataExt, PermissionsExt};

use fsal_vfs::attr::{AttrMask, ObjectKind, SetAttr, SetTime, TimeSpec};
use fsal_vfs::error::Error;
use fsal_vfs::export::ExportOptions;

use crate::common::{create_attrs, is_root, name, skip_notice, Fixture};

#[test]
fn getattr_reports_posix_fields() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    std::fs::write(fx.path("f"), b"hello").expect("seed");
    let file = fx.root.lookup(name("f")).expect("lookup");

    let attrs = file.getattr(AttrMask::posix()).expect("getattr");
    let meta = std::fs::metadata(fx.path("f")).expect("metadata");
    assert_eq!(attrs.kind, ObjectKind::RegularFile);
    assert_eq!(attrs.size, 5);
    assert_eq!(attrs.mode, meta.permissions().mode() & 0o7777);
    assert_eq!(attrs.uid, meta.uid());
    assert_eq!(attrs.gid, meta.gid());
    assert_eq!(attrs.fileid, meta.ino());
    assert_eq!(attrs.nlink, 1);
    assert_eq!(attrs.mtime.seconds, meta.mtime());
}

#[test]
fn getattr_rejects_unsupported_masks() {
    let options = ExportOptions {
        supported_attrs: AttrMask::TYPE | AttrMask::MODE | AttrMask::SIZE,
        ..ExportOptions::default()
    };
    let Some(fx) = Fixture::try_with_options(options) else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    assert_eq!(
        file.getattr(AttrMask::posix()).err(),
        Some(Error::AttrNotSupported)
    );
    assert!(file.getattr(AttrMask::TYPE | AttrMask::SIZE).is_ok());
}

#[test]
fn setattr_chmod_respects_the_umask() {
    let options = ExportOptions { umask: 0o022, ..ExportOptions::default() };
    let Some(fx) = Fixture::try_with_options(options) else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o600)).expect("create");

    let mut change = SetAttr::none();
    change.mode = Some(0o777);
    file.setattr(&change).expect("setattr");

    let meta = std::fs::metadata(fx.path("f")).expect("metadata");
    assert_eq!(meta.permissions().mode() & 0o7777, 0o755);
}

#[test]
fn setattr_mtime_preserves_the_unrequested_side() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    let before = std::fs::metadata(fx.path("f")).expect("metadata");

    let mut change = SetAttr::none();
    change.mtime = SetTime::ClientProvided(TimeSpec { seconds: 123_456, nanos: 0 });
    file.setattr(&change).expect("setattr");

    let after = std::fs::metadata(fx.path("f")).expect("metadata");
    assert_eq!(after.mtime(), 123_456);
    assert_eq!(after.atime(), before.atime());
}

#[test]
fn setattr_server_current_time_moves_the_clock() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");

    let mut change = SetAttr::none();
    change.mtime = SetTime::ClientProvided(TimeSpec { seconds: 1, nanos: 0 });
    file.setattr(&change).expect("rewind mtime");

    let mut change = SetAttr::none();
    change.mtime = SetTime::ServerCurrent;
    file.setattr(&change).expect("setattr");

    let meta = std::fs::metadata(fx.path("f")).expect("metadata");
    assert!(meta.mtime() > 1_000_000);
}

#[test]
fn setattr_partial_chown_leaves_the_owner_alone() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    if !is_root() {
        eprintln!("skipping: needs root to reassign groups");
        return;
    }
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    let before = std::fs::metadata(fx.path("f")).expect("metadata");

    let mut change = SetAttr::none();
    change.gid = Some(54_321);
    file.setattr(&change).expect("setattr");

    let after = std::fs::metadata(fx.path("f")).expect("metadata");
    assert_eq!(after.uid(), before.uid());
    assert_eq!(after.gid(), 54_321);
}

#[test]
fn truncate_changes_only_regular_files() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    std::fs::write(fx.path("f"), b"hello world").expect("seed");
    let file = fx.root.lookup(name("f")).expect("lookup");

    file.truncate(5).expect("shrink");
    assert_eq!(std::fs::metadata(fx.path("f")).expect("metadata").len(), 5);
    file.truncate(64).expect("grow");
    assert_eq!(std::fs::metadata(fx.path("f")).expect("metadata").len(), 64);

    assert_eq!(fx.root.truncate(0).err(), Some(Error::Inval));
}
