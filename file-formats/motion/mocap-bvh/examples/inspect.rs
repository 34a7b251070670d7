//! # Inspect Example
//!
//! Parses a BVH file, prints the skeleton and the world position of every
//! joint in the first frame, then writes an edited copy.
//!
//! ## Usage
//! ```bash
//! cargo run --example inspect -- walk.bvh [edited.bvh]
//! ```

use mocap_bvh::{Bvh, EditConfig, FrameRange};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(input) = args.next() else {
        println!("usage: inspect <input.bvh> [output.bvh]");
        return Ok(());
    };

    let mut bvh = Bvh::open(&input)?;
    let skeleton = bvh.skeleton();
    println!("{input}");
    println!(
        "  {} joints, {} channels, {} frames at {:.1} fps ({:.2}s)",
        skeleton.len(),
        skeleton.channel_count(),
        bvh.motion().frame_count(),
        bvh.motion().frame_rate(),
        bvh.motion().duration()
    );

    if bvh.motion().is_empty() {
        return Ok(());
    }

    let pose = bvh.world_pose(0)?;
    for (id, joint) in skeleton.iter() {
        let p = pose[id].position();
        let order = joint
            .rotation_order()
            .map_or_else(|| "-".to_string(), |order| order.to_string());
        println!(
            "  {}{:<24} {:>3} {:>10.3} {:>10.3} {:>10.3}",
            "  ".repeat(joint.depth()),
            joint.name(),
            order,
            p.x,
            p.y,
            p.z
        );
    }

    if let Some(output) = args.next() {
        // Drop the first frame and convert centimetres to metres.
        let frame_count = bvh.motion().frame_count();
        let config = EditConfig {
            scale: 0.01,
            frame_range: (frame_count > 1).then(|| FrameRange { start: 1, end: 1 }),
            ..EditConfig::default()
        };
        config.apply(&mut bvh)?;
        bvh.save(&output)?;
        println!("wrote {output}");
    }

    Ok(())
}
