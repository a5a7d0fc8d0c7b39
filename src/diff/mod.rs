//! Unified-diff position mapping.
//!
//! Diff-comment APIs address a line by its position inside the patch body
//! rather than by line number: the first line after the first `@@` header is
//! position 1, and positions keep counting through the rest of the patch.
//! This module turns a new-file line number into that position.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::core::{Error, Result};

static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk header regex")
});

/// One `@@ -a,b +c,d @@` block of a patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffHunk {
    /// First new-file line covered by the hunk (`c`).
    pub start_line: u32,
    /// Last new-file line covered by the hunk (`c + d - 1`).
    pub end_line: u32,
    /// Diff position of the first line after the header.
    pub start_diff_position: u32,
    /// New-file lines shifted by a removed/added replacement pair.
    pub lines_with_double_position: BTreeSet<u32>,
}

impl DiffHunk {
    /// Whether `line` falls inside the hunk's new-file range.
    pub fn contains(&self, line: u32) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }

    /// Diff position of new-file `line`.
    pub fn position_of(&self, line: u32) -> Result<u32> {
        if !self.contains(line) {
            return Err(Error::LineNotInAnyHunk { line });
        }
        let shift = self.lines_with_double_position.range(..=line).count();
        u32::try_from(shift)
            .ok()
            .and_then(|shift| (line - self.start_line).checked_add(shift))
            .and_then(|offset| offset.checked_add(self.start_diff_position))
            .ok_or_else(|| Error::invalid_format(format!("diff position of line {line} overflows")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyLine {
    Context,
    Added,
    Removed,
    Marker,
}

impl BodyLine {
    fn classify(line: &str) -> Self {
        match line.as_bytes().first() {
            Some(b'+') => Self::Added,
            Some(b'-') => Self::Removed,
            Some(b'\\') => Self::Marker,
            _ => Self::Context,
        }
    }
}

/// Parse the hunk header `(c, d)` new-file range; `d` defaults to 1.
fn parse_hunk_header(header: &str) -> Result<(u32, u32)> {
    let caps = HUNK_HEADER
        .captures(header)
        .ok_or_else(|| Error::invalid_format(format!("malformed hunk header '{header}'")))?;
    let number = |i: usize, default: u32| -> Result<u32> {
        match caps.get(i) {
            Some(m) => m.as_str().parse::<u32>().map_err(|e| {
                Error::invalid_format(format!("hunk header '{header}' has a bad number: {e}"))
            }),
            None => Ok(default),
        }
    };
    Ok((number(3, 0)?, number(4, 1)?))
}

fn increment(value: u32, line: &str) -> Result<u32> {
    value
        .checked_add(1)
        .ok_or_else(|| Error::invalid_format(format!("line numbering overflows at '{line}'")))
}

/// Split a single file's patch into hunks.
///
/// Lines before the first hunk header (`diff --git`, `---`, `+++`) are not
/// part of the body and do not consume positions.
pub fn parse_hunks(patch: &str) -> Result<Vec<DiffHunk>> {
    let mut hunks: Vec<DiffHunk> = Vec::new();
    let mut current: Option<DiffHunk> = None;
    let mut position: u32 = 0;
    let mut next_new_line: u32 = 0;
    let mut previous = BodyLine::Context;

    for line in patch.lines() {
        if line.starts_with("@@") {
            let (start, count) = parse_hunk_header(line)?;
            let end = start.checked_add(count).ok_or_else(|| {
                Error::invalid_format(format!("hunk header '{line}' range overflows"))
            })?;
            if let Some(done) = current.take() {
                hunks.push(done);
            }
            current = Some(DiffHunk {
                start_line: start,
                end_line: end.saturating_sub(1),
                start_diff_position: increment(position, line)?,
                lines_with_double_position: BTreeSet::new(),
            });
            next_new_line = start;
            previous = BodyLine::Context;
            continue;
        }

        let Some(hunk) = current.as_mut() else {
            continue;
        };
        position = increment(position, line)?;

        let kind = BodyLine::classify(line);
        let replacement = matches!(
            (previous, kind),
            (BodyLine::Removed, BodyLine::Added) | (BodyLine::Added, BodyLine::Removed)
        );
        if replacement {
            hunk.lines_with_double_position.insert(next_new_line);
        }
        if matches!(kind, BodyLine::Context | BodyLine::Added) {
            next_new_line = increment(next_new_line, line)?;
        }
        if kind != BodyLine::Marker {
            previous = kind;
        }
    }

    if let Some(done) = current {
        hunks.push(done);
    }
    Ok(hunks)
}

/// A new-file line and its diff position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinePosition {
    pub line: u32,
    pub position: u32,
}

/// Hunks of one file's patch, parsed once for repeated lookups.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffPositionMap {
    hunks: Vec<DiffHunk>,
}

impl DiffPositionMap {
    /// Parse `patch` into a lookup map.
    pub fn new(patch: &str) -> Result<Self> {
        Ok(Self {
            hunks: parse_hunks(patch)?,
        })
    }

    pub fn hunks(&self) -> &[DiffHunk] {
        &self.hunks
    }

    /// Diff position of new-file `line`.
    pub fn position(&self, line: u32) -> Result<u32> {
        self.hunks
            .iter()
            .find(|h| h.contains(line))
            .ok_or(Error::LineNotInAnyHunk { line })?
            .position_of(line)
    }

    /// Positions of several lines; fails on the first line outside every hunk.
    pub fn positions(&self, lines: &[u32]) -> Result<Vec<LinePosition>> {
        lines
            .iter()
            .map(|&line| {
                self.position(line)
                    .map(|position| LinePosition { line, position })
            })
            .collect()
    }

    /// Whether `line` is inside a hunk and can carry a diff comment.
    pub fn is_commentable(&self, line: u32) -> bool {
        self.hunks.iter().any(|h| h.contains(line))
    }
}

/// Diff position of new-file `line` inside `patch`.
pub fn resolve_diff_position(patch: &str, line: u32) -> Result<u32> {
    DiffPositionMap::new(patch)?.position(line)
}
