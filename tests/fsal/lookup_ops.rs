use std::sync::Arc;

use fsal_vfs::attr::ObjectKind;
use fsal_vfs::error::Error;

use crate::common::{create_attrs, name, skip_notice, Fixture};

#[test]
fn lookup_finds_what_mkdir_created() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let made = fx.root.mkdir(name("a"), &create_attrs(0o755)).expect("mkdir");
    assert_eq!(made.kind(), ObjectKind::Directory);

    let found = fx.root.lookup(name("a")).expect("lookup");
    assert_eq!(found.kind(), ObjectKind::Directory);
    assert!(made.compare(&found));
    assert_eq!(made.handle().key(), found.handle().key());
    // the registry hands back the already attached record
    assert!(Arc::ptr_eq(&made, &found));
}

#[test]
fn lookup_of_missing_name_is_stale() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    assert_eq!(fx.root.lookup(name("absent")).err(), Some(Error::Stale));
}

#[test]
fn lookup_rejects_bad_names() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    assert_eq!(fx.root.lookup(name("")).err(), Some(Error::Fault));
    assert_eq!(fx.root.lookup(name(".")).err(), Some(Error::Inval));
    assert_eq!(fx.root.lookup(name("..")).err(), Some(Error::Inval));
    assert_eq!(fx.root.lookup(name("a/b")).err(), Some(Error::Inval));
}

#[test]
fn lookup_under_a_file_is_not_a_directory() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    assert_eq!(file.lookup(name("x")).err(), Some(Error::NotDirectory));
}

#[test]
fn compare_distinguishes_objects() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let first = fx.root.create(name("one"), &create_attrs(0o644)).expect("create one");
    let second = fx.root.create(name("two"), &create_attrs(0o644)).expect("create two");
    assert!(first.compare(&first));
    assert!(second.compare(&second));
    assert!(!first.compare(&second));
    assert!(!first.compare(&fx.root));
}

#[test]
fn handle_is_reports_the_kind() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    assert!(file.handle_is(ObjectKind::RegularFile));
    assert!(!file.handle_is(ObjectKind::Directory));
    assert!(fx.root.handle_is(ObjectKind::Directory));
}
