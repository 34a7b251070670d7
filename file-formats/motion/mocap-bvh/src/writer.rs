//! Writer for the BVH text format

use std::io::Write;

use glam::DVec3;

use crate::document::Bvh;
use crate::error::Result;
use crate::skeleton::Joint;

/// Writes BVH documents in canonical layout
///
/// Numbers use the shortest representation that parses back to the same
/// value, so a written document re-parses to identical data.
pub struct BvhWriter<W: Write> {
    writer: W,
    indent: String,
    precision: Option<usize>,
}

impl<W: Write> BvhWriter<W> {
    /// Create a writer indenting with two spaces
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            indent: "  ".to_string(),
            precision: None,
        }
    }

    /// Indent nested blocks with `indent` (a tab, four spaces, ...)
    pub fn with_indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Write frame values with a fixed number of decimals
    ///
    /// Rounded output no longer round-trips exactly.
    pub fn with_precision(mut self, decimals: usize) -> Self {
        self.precision = Some(decimals);
        self
    }

    /// Write a complete document
    pub fn write(&mut self, bvh: &Bvh) -> Result<()> {
        self.write_hierarchy(bvh)?;
        self.write_motion(bvh)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_hierarchy(&mut self, bvh: &Bvh) -> Result<()> {
        writeln!(self.writer, "HIERARCHY")?;

        // Number of joint blocks currently open; equals the depth of the
        // next joint once deeper blocks are closed.
        let mut open = 0usize;
        for (_, joint) in bvh.skeleton().iter() {
            while open > joint.depth() {
                open -= 1;
                self.line(open, "}")?;
            }
            let depth = joint.depth();
            if joint.is_end_site() {
                self.line(depth, "End Site")?;
                self.line(depth, "{")?;
                self.line(depth + 1, &format!("OFFSET {}", format_vec(joint.offset())))?;
                self.line(depth, "}")?;
            } else {
                self.joint_header(joint)?;
                open += 1;
            }
        }
        while open > 0 {
            open -= 1;
            self.line(open, "}")?;
        }
        Ok(())
    }

    fn joint_header(&mut self, joint: &Joint) -> Result<()> {
        let depth = joint.depth();
        let keyword = if joint.is_root() { "ROOT" } else { "JOINT" };
        self.line(depth, &format!("{keyword} {}", joint.name()))?;
        self.line(depth, "{")?;
        self.line(depth + 1, &format!("OFFSET {}", format_vec(joint.offset())))?;
        let channels: Vec<&str> = joint.channels().iter().map(|c| c.name()).collect();
        self.line(
            depth + 1,
            &format!("CHANNELS {} {}", channels.len(), channels.join(" ")),
        )
    }

    fn write_motion(&mut self, bvh: &Bvh) -> Result<()> {
        let motion = bvh.motion();
        writeln!(self.writer, "MOTION")?;
        writeln!(self.writer, "Frames: {}", motion.frame_count())?;
        writeln!(self.writer, "Frame Time: {}", motion.frame_time())?;

        let mut line = String::new();
        for frame in motion.frames() {
            line.clear();
            for (index, value) in frame.iter().enumerate() {
                if index > 0 {
                    line.push(' ');
                }
                line.push_str(&format_number(*value, self.precision));
            }
            writeln!(self.writer, "{line}")?;
        }
        Ok(())
    }

    fn line(&mut self, depth: usize, text: &str) -> Result<()> {
        writeln!(self.writer, "{}{}", self.indent.repeat(depth), text)?;
        Ok(())
    }
}

fn format_vec(v: DVec3) -> String {
    format!(
        "{} {} {}",
        format_number(v.x, None),
        format_number(v.y, None),
        format_number(v.z, None)
    )
}

fn format_number(value: f64, precision: Option<usize>) -> String {
    match precision {
        Some(decimals) => format!("{value:.decimals$}"),
        None => format!("{value}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SOURCE: &str = "\
HIERARCHY
ROOT Hips
{
\tOFFSET 0.0 0.0 0.0
\tCHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
\tJOINT Spine
\t{
\t\tOFFSET 0 5.5 0
\t\tCHANNELS 3 Zrotation Xrotation Yrotation
\t\tEnd Site
\t\t{
\t\t\tOFFSET 0 3 0
\t\t}
\t}
\tJOINT Leg
\t{
\t\tOFFSET 1 0 0
\t\tCHANNELS 3 Zrotation Xrotation Yrotation
\t}
}
MOTION
Frames: 1
Frame Time: 0.04
1.5 2 3 10 20 30 0 0 45.25 -1 0 0.1
";

    const CANONICAL: &str = "\
HIERARCHY
ROOT Hips
{
  OFFSET 0 0 0
  CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation
  JOINT Spine
  {
    OFFSET 0 5.5 0
    CHANNELS 3 Zrotation Xrotation Yrotation
    End Site
    {
      OFFSET 0 3 0
    }
  }
  JOINT Leg
  {
    OFFSET 1 0 0
    CHANNELS 3 Zrotation Xrotation Yrotation
  }
}
MOTION
Frames: 1
Frame Time: 0.04
1.5 2 3 10 20 30 0 0 45.25 -1 0 0.1
";

    fn write_to_string(writer: BvhWriter<Vec<u8>>, bvh: &Bvh) -> String {
        let mut writer = writer;
        writer.write(bvh).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_canonical_layout() {
        let bvh: Bvh = SOURCE.parse().unwrap();
        let text = write_to_string(BvhWriter::new(Vec::new()), &bvh);
        assert_eq!(text, CANONICAL);
    }

    #[test]
    fn test_custom_indent() {
        let bvh: Bvh = SOURCE.parse().unwrap();
        let text = write_to_string(BvhWriter::new(Vec::new()).with_indent("\t"), &bvh);
        assert!(text.contains("\n\t\tEnd Site\n"));
        let reparsed: Bvh = text.parse().unwrap();
        assert_eq!(reparsed.skeleton(), bvh.skeleton());
    }

    #[test]
    fn test_precision() {
        let bvh: Bvh = SOURCE.parse().unwrap();
        let text = write_to_string(BvhWriter::new(Vec::new()).with_precision(2), &bvh);
        assert!(text.ends_with("1.50 2.00 3.00 10.00 20.00 30.00 0.00 0.00 45.25 -1.00 0.00 0.10\n"));
    }

    #[test]
    fn test_round_trip_is_stable() {
        let bvh: Bvh = SOURCE.parse().unwrap();
        let first = write_to_string(BvhWriter::new(Vec::new()), &bvh);
        let reparsed: Bvh = first.parse().unwrap();
        let second = write_to_string(BvhWriter::new(Vec::new()), &reparsed);
        assert_eq!(first, second);
        assert_eq!(reparsed.motion(), bvh.motion());
    }
}
