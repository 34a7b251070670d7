//! Parser for the BVH text format
//!
//! A file has a `HIERARCHY` section describing one skeleton and a `MOTION`
//! section holding the frame count, the frame time and one line of channel
//! values per frame. Every failure is reported as a [`BvhError::ParseError`]
//! carrying the 1-based line it was detected on, except for structural
//! problems that only show once the whole hierarchy is known (duplicate
//! joint names, for instance), which keep their own error kinds.

use std::collections::HashSet;
use std::io::Read;

use glam::DVec3;

use crate::document::Bvh;
use crate::error::{BvhError, Result};
use crate::motion::Motion;
use crate::skeleton::{ChannelKind, JointRecord, Skeleton, check_channels};

/// Default suffix appended to a parent's name to name its end site
pub const DEFAULT_END_SITE_SUFFIX: &str = "_End";

/// Parser for BVH documents
#[derive(Debug, Clone)]
pub struct BvhParser {
    end_site_suffix: String,
}

impl Default for BvhParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BvhParser {
    /// Create a parser with default settings
    pub fn new() -> Self {
        Self {
            end_site_suffix: DEFAULT_END_SITE_SUFFIX.to_string(),
        }
    }

    /// Use a different suffix when naming end sites (`<parent><suffix>`)
    pub fn with_end_site_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.end_site_suffix = suffix.into();
        self
    }

    /// Parse a complete document from a reader
    pub fn parse_reader<R: Read>(&self, reader: &mut R) -> Result<Bvh> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.parse(&text)
    }

    /// Parse a complete document
    pub fn parse(&self, text: &str) -> Result<Bvh> {
        let lines: Vec<&str> = text.lines().collect();
        let last_line = lines.len().max(1);

        let motion_line = lines
            .iter()
            .position(|line| line.trim() == "MOTION")
            .ok_or_else(|| BvhError::parse(last_line, "missing MOTION section"))?;

        let records = self.parse_hierarchy(&lines[..motion_line])?;
        let skeleton = Skeleton::from_records(records)?;
        log::debug!(
            "Parsed BVH hierarchy: {} joints ({} end sites), {} channels",
            skeleton.len(),
            skeleton.end_sites().count(),
            skeleton.channel_count()
        );

        let motion = parse_motion(&lines, motion_line + 1, skeleton.channel_count())?;
        if motion.is_empty() {
            log::warn!("BVH document declares zero frames");
        } else {
            log::debug!(
                "Parsed {} frames at {}s per frame",
                motion.frame_count(),
                motion.frame_time()
            );
        }

        Bvh::new(skeleton, motion)
    }

    fn parse_hierarchy(&self, lines: &[&str]) -> Result<Vec<JointRecord>> {
        let mut tokens = Tokens::new(lines);

        let first = tokens.next("HIERARCHY")?;
        if first.text != "HIERARCHY" {
            return Err(BvhError::parse(
                first.line,
                format!("expected HIERARCHY, found '{}'", first.text),
            ));
        }

        let mut builder = HierarchyBuilder::default();
        while let Some(token) = tokens.peek() {
            let line = token.line;
            if builder.root_closed {
                return Err(BvhError::parse(
                    line,
                    format!(
                        "unexpected '{}' after the root joint was closed",
                        token.text
                    ),
                ));
            }
            tokens.advance();
            match token.text {
                "ROOT" => {
                    if builder.root_seen {
                        return Err(BvhError::parse(line, "only one ROOT joint is supported"));
                    }
                    let name = tokens.name(line, "ROOT")?;
                    tokens.expect("{")?;
                    builder.open_joint(name, line, false)?;
                    builder.root_seen = true;
                }
                "JOINT" => {
                    if builder.stack.is_empty() {
                        return Err(BvhError::parse(line, "JOINT outside of the ROOT block"));
                    }
                    let name = tokens.name(line, "JOINT")?;
                    tokens.expect("{")?;
                    builder.open_joint(name, line, false)?;
                }
                "End" => {
                    tokens.expect("Site")?;
                    tokens.expect("{")?;
                    builder.open_joint(String::new(), line, true)?;
                }
                "OFFSET" => {
                    let x = tokens.number()?;
                    let y = tokens.number()?;
                    let z = tokens.number()?;
                    builder.set_offset(DVec3::new(x, y, z), line)?;
                }
                "CHANNELS" => {
                    let count = tokens.count()?;
                    if count != 3 && count != 6 {
                        return Err(BvhError::parse(
                            line,
                            format!("unsupported channel count {count}, expected 3 or 6"),
                        ));
                    }
                    let mut channels = Vec::with_capacity(count);
                    for _ in 0..count {
                        let token = tokens.next("channel name")?;
                        let kind = ChannelKind::from_name(token.text).ok_or_else(|| {
                            BvhError::parse(
                                token.line,
                                format!("unknown channel '{}'", token.text),
                            )
                        })?;
                        channels.push(kind);
                    }
                    builder.set_channels(channels, line)?;
                }
                "}" => builder.close(line)?,
                other => {
                    return Err(BvhError::parse(
                        line,
                        format!("unexpected token '{other}' in HIERARCHY"),
                    ));
                }
            }
        }

        if !builder.root_seen {
            return Err(BvhError::parse(tokens.last_line(), "no ROOT joint declared"));
        }
        if !builder.root_closed {
            return Err(BvhError::parse(
                tokens.last_line(),
                "unbalanced braces: joint block not closed before MOTION",
            ));
        }

        Ok(self.name_end_sites(builder.records, &builder.end_site_parents))
    }

    /// Name end sites `<parent><suffix>`, adding a counter on collisions
    fn name_end_sites(
        &self,
        mut records: Vec<JointRecord>,
        end_site_parents: &[(usize, String)],
    ) -> Vec<JointRecord> {
        let mut taken: HashSet<String> = records
            .iter()
            .filter(|record| !record.end_site)
            .map(|record| record.name.clone())
            .collect();

        for (index, parent) in end_site_parents {
            let base = format!("{parent}{}", self.end_site_suffix);
            let mut name = base.clone();
            let mut counter = 1;
            while taken.contains(&name) {
                name = format!("{base}{counter}");
                counter += 1;
            }
            if name != base {
                log::warn!("End site name '{base}' is taken, using '{name}'");
            }
            taken.insert(name.clone());
            records[*index].name = name;
        }
        records
    }
}

/// Block currently open while walking the hierarchy
struct OpenBlock {
    record: usize,
    line: usize,
    has_offset: bool,
    has_channels: bool,
}

#[derive(Default)]
struct HierarchyBuilder {
    records: Vec<JointRecord>,
    stack: Vec<OpenBlock>,
    /// (record index, parent name) of every end site, named once parsing is done
    end_site_parents: Vec<(usize, String)>,
    root_seen: bool,
    root_closed: bool,
}

impl HierarchyBuilder {
    fn open_joint(&mut self, name: String, line: usize, end_site: bool) -> Result<()> {
        let parent = match self.stack.last() {
            Some(block) => {
                let record = &self.records[block.record];
                if record.end_site {
                    return Err(BvhError::parse(line, "End Site cannot contain nested blocks"));
                }
                Some(record.name.clone())
            }
            None if self.root_seen || end_site => {
                return Err(BvhError::parse(line, "joint declared outside of the ROOT block"));
            }
            None => None,
        };

        if end_site {
            if let Some(parent) = &parent {
                self.end_site_parents
                    .push((self.records.len(), parent.clone()));
            }
        }

        self.stack.push(OpenBlock {
            record: self.records.len(),
            line,
            has_offset: false,
            has_channels: false,
        });
        self.records.push(JointRecord {
            name,
            parent,
            offset: DVec3::ZERO,
            channels: Vec::new(),
            end_site,
        });
        Ok(())
    }

    fn set_offset(&mut self, offset: DVec3, line: usize) -> Result<()> {
        let block = self
            .stack
            .last_mut()
            .ok_or_else(|| BvhError::parse(line, "OFFSET outside of a joint block"))?;
        if block.has_offset {
            return Err(BvhError::parse(line, "OFFSET declared twice"));
        }
        block.has_offset = true;
        self.records[block.record].offset = offset;
        Ok(())
    }

    fn set_channels(&mut self, channels: Vec<ChannelKind>, line: usize) -> Result<()> {
        let block = self
            .stack
            .last_mut()
            .ok_or_else(|| BvhError::parse(line, "CHANNELS outside of a joint block"))?;
        let record = &mut self.records[block.record];
        if record.end_site {
            return Err(BvhError::parse(line, "End Site cannot declare CHANNELS"));
        }
        if block.has_channels {
            return Err(BvhError::parse(line, "CHANNELS declared twice"));
        }
        block.has_channels = true;
        record.channels = channels;
        check_channels(record).map_err(|error| match error {
            BvhError::ValidationError(message) => BvhError::parse(line, message),
            other => other,
        })
    }

    fn close(&mut self, line: usize) -> Result<()> {
        let block = self
            .stack
            .pop()
            .ok_or_else(|| BvhError::parse(line, "unbalanced braces: unexpected '}'"))?;
        let record = &self.records[block.record];
        if !block.has_offset {
            return Err(BvhError::parse(
                block.line,
                format!("{} is missing an OFFSET", describe(record)),
            ));
        }
        if !record.end_site && !block.has_channels {
            return Err(BvhError::parse(
                block.line,
                format!("{} is missing CHANNELS", describe(record)),
            ));
        }
        if self.stack.is_empty() {
            self.root_closed = true;
        }
        Ok(())
    }
}

fn describe(record: &JointRecord) -> String {
    if record.end_site {
        "End Site".to_string()
    } else {
        format!("joint '{}'", record.name)
    }
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    line: usize,
    text: &'a str,
}

/// Whitespace-separated tokens with their line numbers
struct Tokens<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    last_line: usize,
}

impl<'a> Tokens<'a> {
    fn new(lines: &[&'a str]) -> Self {
        let tokens = lines
            .iter()
            .enumerate()
            .flat_map(|(index, line)| {
                line.split_whitespace().map(move |text| Token {
                    line: index + 1,
                    text,
                })
            })
            .collect();
        Self {
            tokens,
            pos: 0,
            last_line: lines.len().max(1),
        }
    }

    fn last_line(&self) -> usize {
        self.last_line
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn next(&mut self, expected: &str) -> Result<Token<'a>> {
        let token = self.peek().ok_or_else(|| {
            BvhError::parse(
                self.last_line,
                format!("unexpected end of HIERARCHY, expected {expected}"),
            )
        })?;
        self.advance();
        Ok(token)
    }

    fn expect(&mut self, keyword: &str) -> Result<()> {
        let token = self.next(&format!("'{keyword}'"))?;
        if token.text != keyword {
            return Err(BvhError::parse(
                token.line,
                format!("expected '{keyword}', found '{}'", token.text),
            ));
        }
        Ok(())
    }

    /// Joint name: the rest of the keyword's line, joined by single spaces
    fn name(&mut self, line: usize, keyword: &str) -> Result<String> {
        let mut parts = Vec::new();
        while let Some(token) = self.peek() {
            if token.line != line || token.text == "{" {
                break;
            }
            parts.push(token.text);
            self.advance();
        }
        if parts.is_empty() {
            return Err(BvhError::parse(line, format!("{keyword} without a name")));
        }
        Ok(parts.join(" "))
    }

    fn number(&mut self) -> Result<f64> {
        let token = self.next("a number")?;
        parse_number(token.text, token.line)
    }

    fn count(&mut self) -> Result<usize> {
        let token = self.next("a channel count")?;
        token.text.parse().map_err(|_| {
            BvhError::parse(
                token.line,
                format!("invalid channel count '{}'", token.text),
            )
        })
    }
}

fn parse_number(text: &str, line: usize) -> Result<f64> {
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(BvhError::parse(line, format!("invalid number '{text}'"))),
    }
}

/// Parse everything after the `MOTION` line; `start` is a 0-based line index
fn parse_motion(lines: &[&str], start: usize, channel_count: usize) -> Result<Motion> {
    let mut rows = lines
        .iter()
        .enumerate()
        .skip(start)
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());
    let last_line = lines.len().max(1);

    let (line, text) = rows
        .next()
        .ok_or_else(|| BvhError::parse(last_line, "missing 'Frames:' line"))?;
    let frame_count = match text.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["Frames:", count] => count.parse::<usize>().map_err(|_| {
            BvhError::parse(line, format!("invalid frame count '{count}'"))
        })?,
        _ => return Err(BvhError::parse(line, "expected 'Frames: <count>'")),
    };

    let (line, text) = rows
        .next()
        .ok_or_else(|| BvhError::parse(last_line, "missing 'Frame Time:' line"))?;
    let frame_time = match text.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["Frame", "Time:", value] => parse_number(value, line)?,
        _ => return Err(BvhError::parse(line, "expected 'Frame Time: <seconds>'")),
    };
    if frame_time <= 0.0 {
        return Err(BvhError::parse(
            line,
            format!("frame time must be positive, got {frame_time}"),
        ));
    }

    let mut motion = Motion::new(frame_time, channel_count)
        .map_err(|error| BvhError::parse(line, error.to_string()))?;
    let mut values = Vec::with_capacity(channel_count);
    for (line, text) in rows {
        if motion.frame_count() == frame_count {
            return Err(BvhError::parse(
                line,
                format!("more frame lines than the {frame_count} declared"),
            ));
        }
        values.clear();
        for token in text.split_whitespace() {
            values.push(parse_number(token, line)?);
        }
        if values.len() != channel_count {
            return Err(BvhError::parse(
                line,
                format!(
                    "frame has {} values, expected {}",
                    values.len(),
                    channel_count
                ),
            ));
        }
        motion.push_frame(&values)?;
    }

    if motion.frame_count() != frame_count {
        return Err(BvhError::parse(
            last_line,
            format!(
                "declared {frame_count} frames but found {}",
                motion.frame_count()
            ),
        ));
    }
    Ok(motion)
}
