//! Shared fixtures for the integration tests

#![allow(dead_code)]

use mocap_bvh::Bvh;

/// Small humanoid fragment: root with six channels, a spine chain and one leg
/// that uses a different rotation order.
pub const WALK: &str = "\
HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
  JOINT Spine
  {
    OFFSET 0 10 0
    CHANNELS 3 Zrotation Xrotation Yrotation
    JOINT Head
    {
      OFFSET 0 12.5 1
      CHANNELS 3 Zrotation Xrotation Yrotation
      End Site
      {
        OFFSET 0 4 0
      }
    }
  }
  JOINT LeftUpLeg
  {
    OFFSET 3.5 -2 0
    CHANNELS 3 Yrotation Xrotation Zrotation
    End Site
    {
      OFFSET 0 -18 0
    }
  }
}
MOTION
Frames: 5
Frame Time: 0.0333333
0 90 0 0 0 0 0 0 0 0 0 0 0 0 0
1 90.5 0.25 5 -3 2 10 0 0 0 -5 0 15 0 -2
2 91 0.5 10 -6 4 20 0 0 0 -10 0 30 0 -4
3 91.5 0.75 15 -9 6 30 0 0 0 -15 0 45 0 -6
4 92 1 20 -12 8 40 0 0 0 -20 0 60 0 -8
";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn walk() -> Bvh {
    init_logging();
    WALK.parse().unwrap()
}
