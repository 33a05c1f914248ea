use fsal_vfs::error::Error;

use crate::common::{create_attrs, name, skip_notice, Fixture};

#[test]
fn rename_keeps_inode_identity() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");

    fx.root.rename(name("f"), &fx.root, name("g")).expect("rename");

    assert_eq!(fx.root.lookup(name("f")).err(), Some(Error::Stale));
    let renamed = fx.root.lookup(name("g")).expect("lookup new name");
    assert!(renamed.compare(&file));
}

#[test]
fn rename_moves_between_directories() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let src = fx.root.mkdir(name("src"), &create_attrs(0o755)).expect("mkdir src");
    let dst = fx.root.mkdir(name("dst"), &create_attrs(0o755)).expect("mkdir dst");
    let file = src.create(name("f"), &create_attrs(0o644)).expect("create");

    src.rename(name("f"), &dst, name("g")).expect("rename");

    assert_eq!(src.lookup(name("f")).err(), Some(Error::Stale));
    let moved = dst.lookup(name("g")).expect("lookup moved");
    assert!(moved.compare(&file));
}

#[test]
fn rename_from_a_file_is_not_a_directory() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    assert_eq!(
        file.rename(name("x"), &fx.root, name("y")).err(),
        Some(Error::NotDirectory)
    );
    assert_eq!(
        fx.root.rename(name("x"), &file, name("y")).err(),
        Some(Error::NotDirectory)
    );
}

#[test]
fn unlink_removes_files_and_empty_directories() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    fx.root.mkdir(name("d"), &create_attrs(0o755)).expect("mkdir");

    fx.root.unlink(name("f")).expect("unlink file");
    fx.root.unlink(name("d")).expect("unlink empty dir");
    assert_eq!(fx.root.lookup(name("f")).err(), Some(Error::Stale));
    assert_eq!(fx.root.lookup(name("d")).err(), Some(Error::Stale));
}

#[test]
fn unlink_of_a_nonempty_directory_fails_and_keeps_it() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    fx.root.mkdir(name("d"), &create_attrs(0o755)).expect("mkdir");
    std::fs::write(fx.path("d/keep"), b"x").expect("seed content");

    match fx.root.unlink(name("d")) {
        Err(Error::Sys(_)) => {}
        other => panic!("expected a passthrough errno, got {other:?}"),
    }
    assert!(fx.root.lookup(name("d")).is_ok());
    assert!(fx.path("d/keep").exists());
}

#[test]
fn unlink_of_a_missing_name_is_stale() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    assert_eq!(fx.root.unlink(name("absent")).err(), Some(Error::Stale));
}

#[test]
fn link_creates_a_second_name_for_the_inode() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");

    file.link(&fx.root, name("g")).expect("link");

    let linked = fx.root.lookup(name("g")).expect("lookup link");
    assert!(linked.compare(&file));
    use std::os::unix::fs::MetadataExt;
    assert_eq!(std::fs::metadata(fx.path("f")).expect("metadata").nlink(), 2);
}

#[test]
fn link_requires_the_capability() {
    use fsal_vfs::export::{Capabilities, ExportOptions};
    let options = ExportOptions {
        capabilities: Capabilities::SYMLINK_SUPPORT,
        ..ExportOptions::default()
    };
    let Some(fx) = Fixture::try_with_options(options) else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    assert_eq!(
        file.link(&fx.root, name("g")).err(),
        Some(Error::NotSupported)
    );
}
