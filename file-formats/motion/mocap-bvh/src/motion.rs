//! Motion data: a dense frames x channels table of floats

use crate::error::{BvhError, Result};
use crate::skeleton::{ChannelKind, JointId, Skeleton};

/// Per-frame channel values, stored row-major in a single buffer
#[derive(Debug, Clone, PartialEq)]
pub struct Motion {
    frame_time: f64,
    channel_count: usize,
    frame_count: usize,
    values: Vec<f64>,
}

impl Motion {
    /// Create an empty motion
    pub fn new(frame_time: f64, channel_count: usize) -> Result<Self> {
        check_frame_time(frame_time)?;
        if channel_count == 0 {
            return Err(BvhError::ValueError(
                "a motion needs at least one channel".to_string(),
            ));
        }
        Ok(Self {
            frame_time,
            channel_count,
            frame_count: 0,
            values: Vec::new(),
        })
    }

    /// Create a motion from a row-major buffer of `frame_count * channel_count` values
    pub fn from_values(frame_time: f64, channel_count: usize, values: Vec<f64>) -> Result<Self> {
        let mut motion = Self::new(frame_time, channel_count)?;
        if values.len() % channel_count != 0 {
            return Err(BvhError::ConsistencyError(format!(
                "{} values do not split into frames of {} channels",
                values.len(),
                channel_count
            )));
        }
        motion.frame_count = values.len() / channel_count;
        motion.values = values;
        Ok(motion)
    }

    /// Create a motion from individual frames
    pub fn from_frames<I>(frame_time: f64, channel_count: usize, frames: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: AsRef<[f64]>,
    {
        let mut motion = Self::new(frame_time, channel_count)?;
        for frame in frames {
            motion.push_frame(frame.as_ref())?;
        }
        Ok(motion)
    }

    /// Seconds per frame
    pub fn frame_time(&self) -> f64 {
        self.frame_time
    }

    /// Change the frame duration
    pub fn set_frame_time(&mut self, frame_time: f64) -> Result<()> {
        check_frame_time(frame_time)?;
        self.frame_time = frame_time;
        Ok(())
    }

    /// Frames per second
    pub fn frame_rate(&self) -> f64 {
        1.0 / self.frame_time
    }

    /// Total duration in seconds
    pub fn duration(&self) -> f64 {
        self.frame_count as f64 * self.frame_time
    }

    /// Timestamp of a 0-based frame
    pub fn time_of(&self, frame: usize) -> f64 {
        frame as f64 * self.frame_time
    }

    /// Number of values per frame
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Number of frames
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Whether the motion holds no frames
    pub fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Raw row-major values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Values of one 0-based frame
    pub fn frame(&self, frame: usize) -> Result<&[f64]> {
        let range = self.frame_range(frame)?;
        Ok(&self.values[range])
    }

    /// Mutable values of one 0-based frame
    pub fn frame_mut(&mut self, frame: usize) -> Result<&mut [f64]> {
        let range = self.frame_range(frame)?;
        Ok(&mut self.values[range])
    }

    /// Iterate over frames
    pub fn frames(&self) -> std::slice::ChunksExact<'_, f64> {
        self.values.chunks_exact(self.channel_count)
    }

    /// Iterate mutably over frames
    pub fn frames_mut(&mut self) -> std::slice::ChunksExactMut<'_, f64> {
        self.values.chunks_exact_mut(self.channel_count)
    }

    /// One value by 0-based frame and channel index
    pub fn get(&self, frame: usize, channel: usize) -> Result<f64> {
        let index = self.value_index(frame, channel)?;
        Ok(self.values[index])
    }

    /// Overwrite one value by 0-based frame and channel index
    pub fn set(&mut self, frame: usize, channel: usize, value: f64) -> Result<()> {
        let index = self.value_index(frame, channel)?;
        self.values[index] = value;
        Ok(())
    }

    /// All values of one channel across frames
    pub fn channel_column(&self, channel: usize) -> Result<Vec<f64>> {
        if channel >= self.channel_count {
            return Err(self.channel_error(channel));
        }
        Ok(self.frames().map(|frame| frame[channel]).collect())
    }

    /// Append a frame
    pub fn push_frame(&mut self, values: &[f64]) -> Result<()> {
        if values.len() != self.channel_count {
            return Err(BvhError::ConsistencyError(format!(
                "frame has {} values, expected {}",
                values.len(),
                self.channel_count
            )));
        }
        self.values.extend_from_slice(values);
        self.frame_count += 1;
        Ok(())
    }

    /// Append all frames of another motion with the same layout
    pub fn append(&mut self, other: &Motion) -> Result<()> {
        if other.channel_count != self.channel_count {
            return Err(BvhError::ConsistencyError(format!(
                "cannot append a motion of {} channels to one of {}",
                other.channel_count, self.channel_count
            )));
        }
        self.values.extend_from_slice(&other.values);
        self.frame_count += other.frame_count;
        Ok(())
    }

    /// Remove the 1-based inclusive frame range `[start, end]`
    ///
    /// Remaining frames keep their relative order. Fails without modifying
    /// anything unless `1 <= start <= end <= frame_count`.
    pub fn remove_frames(&mut self, start: usize, end: usize) -> Result<()> {
        if start == 0 || start > end || end > self.frame_count {
            return Err(BvhError::RangeError {
                start,
                end,
                frame_count: self.frame_count,
            });
        }
        let cc = self.channel_count;
        self.values.drain((start - 1) * cc..end * cc);
        self.frame_count -= end - start + 1;
        log::debug!(
            "Removed frames {start}..={end}, {} frames remain",
            self.frame_count
        );
        Ok(())
    }

    /// Check that the channel layout matches a skeleton
    pub fn check_layout(&self, skeleton: &Skeleton) -> Result<()> {
        if self.channel_count != skeleton.channel_count() {
            return Err(BvhError::ConsistencyError(format!(
                "motion has {} channels per frame but the skeleton declares {}",
                self.channel_count,
                skeleton.channel_count()
            )));
        }
        Ok(())
    }

    /// Value of one joint channel in a 0-based frame
    pub fn joint_value(
        &self,
        skeleton: &Skeleton,
        frame: usize,
        joint: JointId,
        kind: ChannelKind,
    ) -> Result<f64> {
        self.check_layout(skeleton)?;
        let channel = skeleton.channel_index(joint, kind)?;
        self.get(frame, channel)
    }

    /// Overwrite one joint channel in a 0-based frame
    pub fn set_joint_value(
        &mut self,
        skeleton: &Skeleton,
        frame: usize,
        joint: JointId,
        kind: ChannelKind,
        value: f64,
    ) -> Result<()> {
        self.check_layout(skeleton)?;
        let channel = skeleton.channel_index(joint, kind)?;
        self.set(frame, channel, value)
    }

    /// All channel values of one joint in a 0-based frame, in declaration order
    pub fn joint_values(&self, skeleton: &Skeleton, frame: usize, joint: JointId) -> Result<&[f64]> {
        self.check_layout(skeleton)?;
        let start = skeleton
            .get(joint)
            .map(|j| j.channel_offset())
            .ok_or_else(|| {
                BvhError::IndexError(format!(
                    "joint {joint} out of range for a skeleton of {} joints",
                    skeleton.len()
                ))
            })?;
        let count = skeleton.joint_channel_count(joint)?;
        Ok(&self.frame(frame)?[start..start + count])
    }

    fn frame_range(&self, frame: usize) -> Result<std::ops::Range<usize>> {
        if frame >= self.frame_count {
            return Err(BvhError::IndexError(format!(
                "frame {frame} out of range for a motion of {} frames",
                self.frame_count
            )));
        }
        let start = frame * self.channel_count;
        Ok(start..start + self.channel_count)
    }

    fn value_index(&self, frame: usize, channel: usize) -> Result<usize> {
        if channel >= self.channel_count {
            return Err(self.channel_error(channel));
        }
        Ok(self.frame_range(frame)?.start + channel)
    }

    fn channel_error(&self, channel: usize) -> BvhError {
        BvhError::IndexError(format!(
            "channel {channel} out of range for frames of {} channels",
            self.channel_count
        ))
    }

    /// Multiply every value of the given channels
    pub(crate) fn scale_channels(&mut self, channels: &[usize], factor: f64) {
        for frame in self.frames_mut() {
            for &channel in channels {
                frame[channel] *= factor;
            }
        }
    }
}

fn check_frame_time(frame_time: f64) -> Result<()> {
    if !frame_time.is_finite() || frame_time <= 0.0 {
        return Err(BvhError::ValueError(format!(
            "frame time must be a positive number of seconds, got {frame_time}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_motion(frames: usize, channels: usize) -> Motion {
        let values = (0..frames * channels).map(|v| v as f64).collect();
        Motion::from_values(0.5, channels, values).unwrap()
    }

    #[test]
    fn test_frame_access() {
        let motion = counting_motion(4, 3);
        assert_eq!(motion.frame_count(), 4);
        assert_eq!(motion.frame(1).unwrap(), &[3.0, 4.0, 5.0]);
        assert_eq!(motion.get(3, 2).unwrap(), 11.0);
        assert_eq!(motion.duration(), 2.0);
        assert_eq!(motion.frame_rate(), 2.0);
        assert!(matches!(motion.frame(4), Err(BvhError::IndexError(_))));
        assert!(matches!(motion.get(0, 3), Err(BvhError::IndexError(_))));
    }

    #[test]
    fn test_channel_column() {
        let motion = counting_motion(3, 2);
        assert_eq!(motion.channel_column(1).unwrap(), vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_push_frame_checks_width() {
        let mut motion = Motion::new(0.1, 3).unwrap();
        motion.push_frame(&[1.0, 2.0, 3.0]).unwrap();
        assert!(matches!(
            motion.push_frame(&[1.0]),
            Err(BvhError::ConsistencyError(_))
        ));
        assert_eq!(motion.frame_count(), 1);
    }

    #[test]
    fn test_invalid_frame_time() {
        assert!(matches!(Motion::new(0.0, 3), Err(BvhError::ValueError(_))));
        assert!(matches!(Motion::new(-0.1, 3), Err(BvhError::ValueError(_))));
        assert!(matches!(
            Motion::new(f64::NAN, 3),
            Err(BvhError::ValueError(_))
        ));
    }

    #[test]
    fn test_remove_frames() {
        let mut motion = counting_motion(10, 1);
        motion.remove_frames(3, 5).unwrap();
        assert_eq!(motion.frame_count(), 7);
        assert_eq!(
            motion.values(),
            &[0.0, 1.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
    }

    #[test]
    fn test_remove_all_frames() {
        let mut motion = counting_motion(10, 2);
        motion.remove_frames(1, 10).unwrap();
        assert!(motion.is_empty());
        assert_eq!(motion.frames().len(), 0);
    }

    #[test]
    fn test_remove_frames_rejects_bad_ranges() {
        let mut motion = counting_motion(10, 1);
        for (start, end) in [(0, 3), (5, 4), (8, 11)] {
            assert!(matches!(
                motion.remove_frames(start, end),
                Err(BvhError::RangeError { .. })
            ));
        }
        assert_eq!(motion.frame_count(), 10);
    }
}
