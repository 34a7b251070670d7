//! Synthetic BVH documents for benchmarks

use std::fmt::Write;

/// Root plus `chains` limbs of `depth` joints each, `frames` frames of motion
pub fn synthetic_bvh(chains: usize, depth: usize, frames: usize) -> String {
    let mut text = String::from("HIERARCHY\nROOT Hips\n{\n  OFFSET 0 0 0\n");
    text.push_str("  CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation\n");
    let mut channels = 6;
    for chain in 0..chains {
        for level in 0..depth {
            let indent = "  ".repeat(level + 1);
            let _ = writeln!(text, "{indent}JOINT Limb{chain}_{level}");
            let _ = writeln!(text, "{indent}{{");
            let _ = writeln!(text, "{indent}  OFFSET {} 1.5 0.25", chain as f64 * 0.5);
            let _ = writeln!(text, "{indent}  CHANNELS 3 Zrotation Xrotation Yrotation");
            channels += 3;
        }
        let indent = "  ".repeat(depth + 1);
        let _ = writeln!(text, "{indent}End Site\n{indent}{{\n{indent}  OFFSET 0 1 0\n{indent}}}");
        for level in (0..depth).rev() {
            let _ = writeln!(text, "{}}}", "  ".repeat(level + 1));
        }
    }
    text.push_str("}\nMOTION\n");
    let _ = writeln!(text, "Frames: {frames}\nFrame Time: 0.008333");
    for frame in 0..frames {
        let values: Vec<String> = (0..channels)
            .map(|c| format!("{:.4}", ((frame * 7 + c * 13) % 360) as f64 - 180.0))
            .collect();
        let _ = writeln!(text, "{}", values.join(" "));
    }
    text
}
