use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::UnixListener;

use fsal_vfs::attr::{AttrMask, DeviceId, ObjectKind, SetAttr};
use fsal_vfs::ops::NodeSpec;

use crate::common::{create_attrs, is_root, name, skip_notice, Fixture};

#[test]
fn fifo_node_round_trips_through_getattr() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let fifo = fx
        .root
        .mknod(name("pipe"), NodeSpec::Fifo, &create_attrs(0o644))
        .expect("mknod");
    assert_eq!(fifo.kind(), ObjectKind::Fifo);

    let meta = std::fs::metadata(fx.path("pipe")).expect("metadata");
    assert!(meta.file_type().is_fifo());
    assert_eq!(meta.permissions().mode() & 0o7777, 0o644);

    // the open must not block waiting for a reader
    let attrs = fifo.getattr(AttrMask::posix()).expect("getattr");
    assert_eq!(attrs.kind, ObjectKind::Fifo);
}

#[test]
fn socket_node_is_reached_through_its_parent() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let sock = fx
        .root
        .mknod(name("sock"), NodeSpec::Socket, &create_attrs(0o600))
        .expect("mknod");
    assert_eq!(sock.kind(), ObjectKind::Socket);

    let attrs = sock.getattr(AttrMask::posix()).expect("getattr");
    assert_eq!(attrs.kind, ObjectKind::Socket);
    assert_eq!(attrs.mode, 0o600);

    let mut change = SetAttr::none();
    change.mode = Some(0o640);
    sock.setattr(&change).expect("setattr");
    let meta = std::fs::symlink_metadata(fx.path("sock")).expect("metadata");
    assert_eq!(meta.permissions().mode() & 0o7777, 0o640);
}

#[test]
fn bound_socket_can_be_looked_up() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    let _listener = UnixListener::bind(fx.path("live.sock")).expect("bind");
    let sock = fx.root.lookup(name("live.sock")).expect("lookup");
    assert_eq!(sock.kind(), ObjectKind::Socket);

    let attrs = sock.getattr(AttrMask::posix()).expect("getattr");
    assert_eq!(attrs.kind, ObjectKind::Socket);
}

#[test]
fn block_node_carries_its_device_numbers() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    if !is_root() {
        eprintln!("skipping: mknod of device nodes needs root");
        return;
    }
    let node = fx
        .root
        .mknod(
            name("loop"),
            NodeSpec::Block(DeviceId { major: 7, minor: 0 }),
            &create_attrs(0o660),
        )
        .expect("mknod");
    assert_eq!(node.kind(), ObjectKind::BlockDevice);

    // the snapshot taken at creation already carries the device pair
    let attrs = node.attributes();
    assert_eq!(attrs.rdev, DeviceId { major: 7, minor: 0 });

    let meta = std::fs::metadata(fx.path("loop")).expect("metadata");
    assert!(meta.file_type().is_block_device());
    assert_eq!(meta.rdev(), libc::makedev(7, 0));
}

#[test]
fn character_node_carries_its_device_numbers() {
    let Some(fx) = Fixture::try_new() else {
        skip_notice();
        return;
    };
    if !is_root() {
        eprintln!("skipping: mknod of device nodes needs root");
        return;
    }
    let node = fx
        .root
        .mknod(
            name("null"),
            NodeSpec::Character(DeviceId { major: 1, minor: 3 }),
            &create_attrs(0o666),
        )
        .expect("mknod");
    assert_eq!(node.kind(), ObjectKind::CharacterDevice);
    assert_eq!(node.attributes().rdev, DeviceId { major: 1, minor: 3 });
}
