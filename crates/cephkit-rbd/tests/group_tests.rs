//! Group operation tests against the in-memory cluster

use cephkit_rbd::{
    group, image, GroupImageState, GroupSnapState, IoCtx, MemoryCluster, RbdError,
};
use rstest::rstest;
use std::collections::HashSet;

const TEST_IMAGE_SIZE: u64 = 1 << 22;
const TEST_IMAGE_ORDER: u8 = 20;

fn open_pool() -> (MemoryCluster, IoCtx) {
    let cluster = MemoryCluster::new();
    let pool = uuid::Uuid::new_v4().to_string();
    cluster.create_pool(&pool).unwrap();
    let io = cluster.open_ioctx(&pool).unwrap();
    (cluster, io)
}

fn destroyed(cluster: &MemoryCluster, pool: &str) -> IoCtx {
    let mut io = cluster.open_ioctx(pool).unwrap();
    io.destroy();
    io
}

fn create_image(io: &IoCtx) -> String {
    let name = uuid::Uuid::new_v4().to_string();
    image::create(io, &name, TEST_IMAGE_SIZE, TEST_IMAGE_ORDER).unwrap();
    name
}

#[test]
fn test_group_create_remove() {
    let (_cluster, io) = open_pool();

    group::create(&io, "group1").unwrap();
    group::remove(&io, "group1").unwrap();

    // removing a group that never existed is not an error
    group::remove(&io, "group2").unwrap();

    group::create(&io, "group2").unwrap();
    group::create(&io, "group").unwrap();
    group::remove(&io, "group2").unwrap();

    assert_eq!(group::list(&io).unwrap(), vec!["group".to_string()]);
}

#[test]
fn test_group_create_twice_fails() {
    let (_cluster, io) = open_pool();
    group::create(&io, "dup").unwrap();
    assert_eq!(group::create(&io, "dup"), Err(RbdError::AlreadyExists));
}

#[test]
fn test_group_rename() {
    let (_cluster, io) = open_pool();

    group::create(&io, "group1").unwrap();
    group::rename(&io, "group1", "club1").unwrap();
    group::remove(&io, "club1").unwrap();

    // unlike remove, rename fails when the source does not exist
    let err = group::rename(&io, "club1", "nowhere").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_group_list() {
    let (_cluster, io) = open_pool();

    assert!(group::list(&io).unwrap().is_empty());

    for name in ["uno", "dos", "tres"] {
        group::create(&io, name).unwrap();
    }

    let listed: HashSet<String> = group::list(&io).unwrap().into_iter().collect();
    let expected: HashSet<String> = ["uno", "dos", "tres"].iter().map(|s| s.to_string()).collect();
    assert_eq!(listed, expected);

    for name in ["uno", "dos", "tres"] {
        group::remove(&io, name).unwrap();
    }
    assert!(group::list(&io).unwrap().is_empty());
}

#[test]
fn test_group_list_grows_buffer() {
    let (_cluster, io) = open_pool();

    // well past the initial 1 KiB list buffer
    let names: HashSet<String> = (0..200).map(|i| format!("group-with-a-long-name-{i:04}")).collect();
    for name in &names {
        group::create(&io, name).unwrap();
    }

    let listed: HashSet<String> = group::list(&io).unwrap().into_iter().collect();
    assert_eq!(listed, names);
}

#[test]
#[should_panic(expected = "invalid IoCtx")]
fn test_group_list_panics_on_destroyed_ioctx() {
    let (cluster, io) = open_pool();
    let dead = destroyed(&cluster, io.pool_name());
    let _ = group::list(&dead);
}

#[test]
fn test_group_image_add() {
    let (_cluster, io) = open_pool();
    let name = create_image(&io);

    group::create(&io, "grone").unwrap();
    group::image_add(&io, "grone", &io, &name).unwrap();

    let err = group::image_add(&io, "badGroup", &io, &name).unwrap_err();
    assert!(err.is_not_found());

    let members = group::image_list(&io, "grone").unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].name, name);
    assert_eq!(members[0].state, GroupImageState::Attached);
}

#[test]
fn test_group_image_add_twice_fails() {
    let (_cluster, io) = open_pool();
    let name = create_image(&io);

    group::create(&io, "grone").unwrap();
    group::create(&io, "grtwo").unwrap();
    group::image_add(&io, "grone", &io, &name).unwrap();
    assert_eq!(
        group::image_add(&io, "grtwo", &io, &name),
        Err(RbdError::AlreadyExists)
    );
}

#[test]
fn test_group_image_across_pools() {
    let cluster = MemoryCluster::new();
    cluster.create_pool("groups").unwrap();
    cluster.create_pool("images").unwrap();
    let group_io = cluster.open_ioctx("groups").unwrap();
    let image_io = cluster.open_ioctx("images").unwrap();
    let name = create_image(&image_io);

    group::create(&group_io, "mixed").unwrap();
    group::image_add(&group_io, "mixed", &image_io, &name).unwrap();

    let members = group::image_list(&group_io, "mixed").unwrap();
    assert_eq!(members[0].pool_id, cluster.pool_id("images").unwrap());

    // the image cannot be removed while it is a member
    assert!(image::remove(&image_io, &name).is_err());
    group::image_remove(&group_io, "mixed", &image_io, &name).unwrap();
    image::remove(&image_io, &name).unwrap();
}

#[test]
fn test_group_image_remove() {
    let (_cluster, io) = open_pool();
    let name = create_image(&io);

    group::create(&io, "grone").unwrap();
    group::image_add(&io, "grone", &io, &name).unwrap();
    group::image_remove(&io, "grone", &io, &name).unwrap();

    let err = group::image_remove(&io, "badGroup", &io, &name).unwrap_err();
    assert!(err.is_not_found());
    assert!(group::image_list(&io, "grone").unwrap().is_empty());
}

#[test]
fn test_group_image_remove_by_id() {
    let (_cluster, io) = open_pool();
    let name = create_image(&io);

    group::create(&io, "grone").unwrap();
    group::image_add(&io, "grone", &io, &name).unwrap();

    let image_id = image::id(&io, &name).unwrap();
    assert!(!image_id.is_empty());

    group::image_remove_by_id(&io, "grone", &io, &image_id).unwrap();

    let err = group::image_remove_by_id(&io, "badGroup", &io, &image_id).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_group_remove_detaches_images() {
    let (_cluster, io) = open_pool();
    let name = create_image(&io);

    group::create(&io, "grone").unwrap();
    group::image_add(&io, "grone", &io, &name).unwrap();
    group::remove(&io, "grone").unwrap();

    group::create(&io, "grtwo").unwrap();
    group::image_add(&io, "grtwo", &io, &name).unwrap();
}

#[test]
fn test_group_rename_keeps_members() {
    let (_cluster, io) = open_pool();
    let name = create_image(&io);

    group::create(&io, "before").unwrap();
    group::image_add(&io, "before", &io, &name).unwrap();
    group::rename(&io, "before", "after").unwrap();

    let members = group::image_list(&io, "after").unwrap();
    assert_eq!(members.len(), 1);
    group::image_remove(&io, "after", &io, &name).unwrap();
}

#[derive(Clone, Copy, Debug)]
enum MembershipCall {
    Add,
    Remove,
    RemoveById,
}

fn call(op: MembershipCall, group_io: &IoCtx, image_io: &IoCtx) {
    let _ = match op {
        MembershipCall::Add => group::image_add(group_io, "invalid", image_io, "foobar"),
        MembershipCall::Remove => group::image_remove(group_io, "invalid", image_io, "foobar"),
        MembershipCall::RemoveById => {
            group::image_remove_by_id(group_io, "invalid", image_io, "foobar")
        }
    };
}

#[rstest]
#[case::add(MembershipCall::Add)]
#[case::remove(MembershipCall::Remove)]
#[case::remove_by_id(MembershipCall::RemoveById)]
#[should_panic(expected = "invalid IoCtx")]
fn test_membership_panics_on_destroyed_group_ioctx(#[case] op: MembershipCall) {
    let (cluster, io) = open_pool();
    let dead = destroyed(&cluster, io.pool_name());
    call(op, &dead, &io);
}

#[rstest]
#[case::add(MembershipCall::Add)]
#[case::remove(MembershipCall::Remove)]
#[case::remove_by_id(MembershipCall::RemoveById)]
#[should_panic(expected = "invalid IoCtx")]
fn test_membership_panics_on_destroyed_image_ioctx(#[case] op: MembershipCall) {
    let (cluster, io) = open_pool();
    let dead = destroyed(&cluster, io.pool_name());
    call(op, &io, &dead);
}

#[rstest]
#[case::add(MembershipCall::Add)]
#[case::remove(MembershipCall::Remove)]
#[case::remove_by_id(MembershipCall::RemoveById)]
#[should_panic(expected = "opened on a different cluster")]
fn test_membership_panics_on_ioctx_from_other_cluster(#[case] op: MembershipCall) {
    let (_cluster, group_io) = open_pool();
    let (_other, image_io) = open_pool();
    group::create(&group_io, "invalid").unwrap();
    create_image(&image_io);
    call(op, &group_io, &image_io);
}

#[test]
fn test_membership_across_clusters_leaves_images_untouched() {
    let (_a, a_io) = open_pool();
    let (_b, b_io) = open_pool();
    group::create(&a_io, "g").unwrap();
    image::create(&a_io, "img", TEST_IMAGE_SIZE, TEST_IMAGE_ORDER).unwrap();
    image::create(&b_io, "img", TEST_IMAGE_SIZE, TEST_IMAGE_ORDER).unwrap();

    let attempt = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        group::image_add(&a_io, "g", &b_io, "img")
    }));
    assert!(attempt.is_err());

    assert!(group::image_list(&a_io, "g").unwrap().is_empty());
    image::remove(&a_io, "img").unwrap();
    image::remove(&b_io, "img").unwrap();
}

#[test]
fn test_group_snapshots() {
    let (_cluster, io) = open_pool();
    let name = create_image(&io);

    group::create(&io, "snapped").unwrap();
    group::image_add(&io, "snapped", &io, &name).unwrap();

    group::snap_create(&io, "snapped", "first").unwrap();
    group::snap_create(&io, "snapped", "second").unwrap();
    assert_eq!(
        group::snap_create(&io, "snapped", "first"),
        Err(RbdError::AlreadyExists)
    );

    group::snap_rename(&io, "snapped", "second", "renamed").unwrap();
    let snaps = group::snap_list(&io, "snapped").unwrap();
    let names: Vec<&str> = snaps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["first", "renamed"]);
    assert!(snaps.iter().all(|s| s.state == GroupSnapState::Complete));

    group::snap_remove(&io, "snapped", "first").unwrap();
    assert!(group::snap_remove(&io, "snapped", "first")
        .unwrap_err()
        .is_not_found());
    assert_eq!(group::snap_list(&io, "snapped").unwrap().len(), 1);
}

#[test]
fn test_snap_on_missing_group() {
    let (_cluster, io) = open_pool();
    assert!(group::snap_create(&io, "ghost", "s").unwrap_err().is_not_found());
    assert!(group::snap_list(&io, "ghost").unwrap_err().is_not_found());
}

#[test]
fn test_names_with_nul_are_rejected() {
    let (_cluster, io) = open_pool();
    let err = group::create(&io, "bad\0name").unwrap_err();
    assert!(matches!(err, RbdError::InvalidName { .. }));
}
