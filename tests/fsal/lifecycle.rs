use std::os::fd::OwnedFd;

use fsal_vfs::error::Error;
use fsal_vfs::handle::{DigestKind, MAX_WIRE_HANDLE_LEN};
use fsal_vfs::sys::OpenFlags;

use crate::common::{create_attrs, name, skip_notice, Fixture};

#[test]
fn references_balance_out_to_destruction() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let baseline = fx.export.live_handles();
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    assert_eq!(fx.export.live_handles(), baseline + 1);

    file.acquire();
    file.acquire();
    assert_eq!(file.release().err(), Some(Error::Busy));
    assert_eq!(file.release().err(), Some(Error::Busy));
    file.release().expect("final release");
    assert_eq!(fx.export.live_handles(), baseline);
}

#[test]
fn release_of_an_open_regular_file_is_inval() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    let mut digest = [0u8; MAX_WIRE_HANDLE_LEN];
    let len = file.handle_digest(DigestKind::Nfsv4, &mut digest).expect("digest");

    let host = std::fs::File::open(fx.path("f")).expect("host open");
    file.install_fd(OwnedFd::from(host), OpenFlags::RDONLY).expect("install fd");
    assert!(file.is_open());
    assert_eq!(file.openflags(), OpenFlags::RDONLY);

    assert_eq!(file.release().err(), Some(Error::Inval));

    // still reachable through its wire digest
    let again = fx.export.create_handle(&digest[..len]).expect("still attached");
    assert!(again.compare(&file));
    assert_eq!(again.release().err(), Some(Error::Busy));

    let fd = file.take_fd().expect("descriptor comes back");
    drop(fd);
    assert!(!file.is_open());
    file.release().expect("quiescent release");
    assert!(fx.root.lookup(name("f")).is_ok());
}

#[test]
fn release_with_a_held_lock_is_inval() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    file.set_lock_held(true).expect("mark locked");
    assert_eq!(file.release().err(), Some(Error::Inval));
    file.set_lock_held(false).expect("clear lock");
    file.release().expect("release");
}

#[test]
fn release_after_destruction_is_inval() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    file.release().expect("release");
    assert_eq!(file.release().err(), Some(Error::Inval));
}

#[test]
fn lock_state_is_regular_file_only() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let dir = fx.root.mkdir(name("d"), &create_attrs(0o755)).expect("mkdir");
    assert_eq!(dir.set_lock_held(true).err(), Some(Error::Inval));
    assert!(dir.take_fd().is_none());
    assert!(!dir.is_open());
}

#[test]
fn handle_key_finds_the_live_record() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let file = fx.root.create(name("f"), &create_attrs(0o644)).expect("create");
    let key = file.handle_to_key().to_vec();

    let found = fx.export.lookup_handle(&key).expect("registry hit");
    assert!(found.compare(&file));
    // two references remain, so this release only drops one
    assert_eq!(found.release().err(), Some(Error::Busy));
    file.release().expect("final release");

    assert!(fx.export.lookup_handle(b"not a key").is_none());
}
