//! Integration tests for forward kinematics and rotation math

mod common;

use glam::{DQuat, DVec3};
use mocap_bvh::kinematics::world_poses;
use mocap_bvh::{
    AxisOrder, Bvh, BvhError, ChannelKind, JointId, JointRecord, Motion, Skeleton,
    forward_kinematics,
};
use proptest::prelude::*;
use test_case::test_case;

const EPS: f64 = 1e-9;

fn assert_close(a: DVec3, b: DVec3) {
    assert!((a - b).length() < EPS, "{a:?} != {b:?}");
}

fn rotation_channels(order: AxisOrder) -> Vec<ChannelKind> {
    order.axes().into_iter().map(ChannelKind::rotation).collect()
}

fn position_channels() -> Vec<ChannelKind> {
    vec![
        ChannelKind::Xposition,
        ChannelKind::Yposition,
        ChannelKind::Zposition,
    ]
}

fn two_joint_root_channels() -> Vec<ChannelKind> {
    let mut channels = position_channels();
    channels.extend(rotation_channels(AxisOrder::ZXY));
    channels
}

/// Root with position + `root_order` rotations, one child with `child_order`
/// rotations at `child_offset`, and an end site above the child.
fn two_joint(root_order: AxisOrder, child_order: AxisOrder, child_offset: DVec3) -> Skeleton {
    let mut root_channels = position_channels();
    root_channels.extend(rotation_channels(root_order));
    Skeleton::from_records(vec![
        JointRecord::root("Root", DVec3::ZERO, root_channels),
        JointRecord::joint("Child", "Root", child_offset, rotation_channels(child_order)),
        JointRecord::end_site("Child_End", "Child", DVec3::new(0.0, 1.0, 0.0)),
    ])
    .unwrap()
}

#[test]
fn test_identity_pose_two_joints() {
    let skeleton = two_joint(AxisOrder::ZYX, AxisOrder::YXZ, DVec3::new(0.0, 1.0, 0.0));
    let motion = Motion::from_frames(0.1, 9, [[0.0; 9]]).unwrap();
    let bvh = Bvh::new(skeleton, motion).unwrap();

    let pose = bvh.world_pose(0).unwrap();
    let root = &pose[JointId::ROOT];
    assert_close(root.position(), DVec3::ZERO);
    assert!(root.rotation().abs_diff_eq(DQuat::IDENTITY, EPS));

    let child = &pose[bvh.joint("Child").unwrap()];
    assert_close(child.position(), DVec3::new(0.0, 1.0, 0.0));
    assert!(child.rotation().abs_diff_eq(DQuat::IDENTITY, EPS));
}

#[test]
fn test_identity_root_every_frame() {
    let skeleton = two_joint(AxisOrder::ZXY, AxisOrder::ZXY, DVec3::Y);
    let motion = Motion::from_frames(
        0.1,
        9,
        [
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 10.0, 20.0, 30.0],
            [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -45.0, 0.0, 90.0],
        ],
    )
    .unwrap();
    for pose in world_poses(&skeleton, &motion).unwrap() {
        assert_close(pose[JointId::ROOT].position(), DVec3::ZERO);
        assert!(pose[JointId::ROOT].rotation().abs_diff_eq(DQuat::IDENTITY, EPS));
    }
}

#[test]
fn test_forward_kinematics_is_pure() {
    let bvh = common::walk();
    let before = bvh.clone();
    for frame in 0..bvh.motion().frame_count() {
        let first = bvh.world_pose(frame).unwrap();
        let second = bvh.world_pose(frame).unwrap();
        assert_eq!(first, second);
    }
    assert_eq!(bvh, before);
}

#[test]
fn test_walk_positions() {
    let bvh = common::walk();
    let pose = bvh.world_pose(0).unwrap();
    // Frame 0: root at (0, 90, 0), no rotation anywhere.
    assert_close(pose.position(bvh.joint("Head").unwrap()).unwrap(), DVec3::new(0.0, 112.5, 1.0));
    assert_close(
        pose.position(bvh.joint("Head_End").unwrap()).unwrap(),
        DVec3::new(0.0, 116.5, 1.0),
    );
    assert_close(
        pose.position(bvh.joint("LeftUpLeg_End").unwrap()).unwrap(),
        DVec3::new(3.5, 70.0, 0.0),
    );
}

#[test]
fn test_walk_leg_rotation() {
    let bvh = common::walk();
    let pose = bvh.world_pose(2).unwrap();
    let root = DVec3::new(2.0, 91.0, 0.5);
    let root_rotation = AxisOrder::ZXY.to_quat([10.0, -6.0, 4.0]);
    let leg_rotation = AxisOrder::YXZ.to_quat([30.0, 0.0, -4.0]);

    let leg = root + root_rotation * DVec3::new(3.5, -2.0, 0.0);
    let foot = leg + (root_rotation * leg_rotation) * DVec3::new(0.0, -18.0, 0.0);
    assert_close(pose.position(bvh.joint("LeftUpLeg").unwrap()).unwrap(), leg);
    assert_close(pose.position(bvh.joint("LeftUpLeg_End").unwrap()).unwrap(), foot);
}

#[test]
fn test_child_position_channels_replace_offset() {
    let mut child_channels = position_channels();
    child_channels.extend(rotation_channels(AxisOrder::ZXY));
    let skeleton = Skeleton::from_records(vec![
        JointRecord::root("Root", DVec3::ZERO, two_joint_root_channels()),
        JointRecord::joint("Child", "Root", DVec3::new(0.0, 10.0, 0.0), child_channels),
        JointRecord::end_site("Child_End", "Child", DVec3::new(0.0, 1.0, 0.0)),
    ])
    .unwrap();
    let motion = Motion::from_frames(
        0.1,
        12,
        [
            [1.0, 0.0, 0.0, 90.0, 0.0, 0.0, 5.0, 20.0, 0.0, 0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        ],
    )
    .unwrap();
    let bvh = Bvh::new(skeleton, motion).unwrap();
    let child = bvh.joint("Child").unwrap();
    let tip = bvh.joint("Child_End").unwrap();

    // Root turned 90 degrees about z maps (5, 20, 0) to (-20, 5, 0).
    let pose = bvh.world_pose(0).unwrap();
    assert_close(pose[child].position(), DVec3::new(-19.0, 5.0, 0.0));
    assert_close(pose[child].local.translation, DVec3::new(5.0, 20.0, 0.0));
    assert_close(pose[tip].position(), DVec3::new(-20.0, 5.0, 0.0));

    // Zero position values put the child on the root; the offset is not added.
    let pose = bvh.world_pose(1).unwrap();
    assert_close(pose[child].position(), DVec3::new(1.0, 0.0, 0.0));
    assert_close(pose[tip].position(), DVec3::new(1.0, 1.0, 0.0));
}

#[test]
fn test_frame_index_out_of_range() {
    let bvh = common::walk();
    assert!(matches!(bvh.world_pose(5), Err(BvhError::IndexError(_))));
}

#[test]
fn test_layout_mismatch_is_detected() {
    let skeleton = two_joint(AxisOrder::XYZ, AxisOrder::XYZ, DVec3::Y);
    let motion = Motion::from_frames(0.1, 12, [[0.0; 12]]).unwrap();
    assert!(matches!(
        forward_kinematics(&skeleton, &motion, 0),
        Err(BvhError::ConsistencyError(_))
    ));
}

#[test_case(AxisOrder::XYZ ; "xyz")]
#[test_case(AxisOrder::XZY ; "xzy")]
#[test_case(AxisOrder::YXZ ; "yxz")]
#[test_case(AxisOrder::YZX ; "yzx")]
#[test_case(AxisOrder::ZXY ; "zxy")]
#[test_case(AxisOrder::ZYX ; "zyx")]
fn test_child_rotation_composes_in_channel_order(order: AxisOrder) {
    let angles = [30.0, -50.0, 70.0];
    let skeleton = two_joint(AxisOrder::ZXY, order, DVec3::new(0.0, 2.0, 0.0));
    let mut frame = vec![0.0; 9];
    frame[6..].copy_from_slice(&angles);
    let motion = Motion::from_frames(0.1, 9, [frame]).unwrap();

    let pose = forward_kinematics(&skeleton, &motion, 0).unwrap();
    let expected = order
        .axes()
        .into_iter()
        .zip(angles)
        .fold(DQuat::IDENTITY, |q, (axis, degrees)| {
            q * DQuat::from_axis_angle(axis.unit(), f64::to_radians(degrees))
        });
    let child = &pose[JointId::new(1)];
    assert!(child.rotation().abs_diff_eq(expected, EPS) || child.rotation().abs_diff_eq(-expected, EPS));
    assert_eq!(child.local_euler, angles);
    assert_close(pose[JointId::new(2)].position(), DVec3::new(0.0, 2.0, 0.0) + expected * DVec3::Y);
}

#[test_case(AxisOrder::XYZ ; "xyz")]
#[test_case(AxisOrder::XZY ; "xzy")]
#[test_case(AxisOrder::YXZ ; "yxz")]
#[test_case(AxisOrder::YZX ; "yzx")]
#[test_case(AxisOrder::ZXY ; "zxy")]
#[test_case(AxisOrder::ZYX ; "zyx")]
fn test_axis_order_text_round_trip(order: AxisOrder) {
    let text = order.to_string();
    assert_eq!(text.parse::<AxisOrder>().unwrap(), order);
    assert_eq!(text.to_lowercase().parse::<AxisOrder>().unwrap(), order);
}

#[test_case("XYX" ; "repeated axis")]
#[test_case("XY" ; "too short")]
#[test_case("XYZW" ; "too long")]
#[test_case("ABC" ; "not axes")]
fn test_invalid_axis_order(text: &str) {
    assert!(matches!(text.parse::<AxisOrder>(), Err(BvhError::MathError(_))));
}

fn any_order() -> impl Strategy<Value = AxisOrder> {
    prop::sample::select(AxisOrder::ALL.to_vec())
}

proptest! {
    #[test]
    fn prop_euler_matrix_euler_is_consistent(
        order in any_order(),
        a in -180.0f64..180.0,
        b in -89.0f64..89.0,
        c in -180.0f64..180.0,
    ) {
        let m = order.to_mat3([a, b, c]);
        let back = order.euler_from_mat3(&m);
        let rebuilt = order.to_mat3(back);
        for (col, rebuilt_col) in [m.x_axis, m.y_axis, m.z_axis]
            .into_iter()
            .zip([rebuilt.x_axis, rebuilt.y_axis, rebuilt.z_axis])
        {
            prop_assert!((col - rebuilt_col).length() < 1e-9);
        }
        prop_assert!((back[1] - b).abs() < 1e-6);
    }

    #[test]
    fn prop_quaternion_and_matrix_agree(
        order in any_order(),
        a in -360.0f64..360.0,
        b in -360.0f64..360.0,
        c in -360.0f64..360.0,
        p in prop::array::uniform3(-10.0f64..10.0),
    ) {
        let p = DVec3::from_array(p);
        let by_quat = order.to_quat([a, b, c]) * p;
        let by_mat = order.to_mat3([a, b, c]) * p;
        prop_assert!((by_quat - by_mat).length() < 1e-9);
    }

    #[test]
    fn prop_bone_length_is_preserved(
        frame in prop::array::uniform9(-180.0f64..180.0),
    ) {
        let skeleton = two_joint(AxisOrder::ZXY, AxisOrder::YXZ, DVec3::new(0.0, 3.0, 0.0));
        let motion = Motion::from_frames(0.1, 9, [frame]).unwrap();
        let pose = forward_kinematics(&skeleton, &motion, 0).unwrap();
        let bone = pose[JointId::new(2)].position() - pose[JointId::new(1)].position();
        prop_assert!((bone.length() - 1.0).abs() < 1e-9);
    }
}
