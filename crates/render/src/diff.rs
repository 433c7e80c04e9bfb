//! Single-pass unified diff parser
//!
//! Walks the diff text once, classifying each line and assigning gutter
//! line numbers from the running old/new counters. Counters reset at
//! every hunk header from its declared start values and only ever
//! increment between headers. Output is recomputed per render, never
//! cached across inputs.

/// Minimum gutter width in digits, so small diffs align with large ones.
const GUTTER_FLOOR: usize = 3;

/// The literal marker diff tools emit after a file's final line.
const NO_NEWLINE_MARKER: &str = "No newline at end of file";

/// Marker phrase inserted by the backend's truncated-diff preview.
const OMISSION_PHRASE: &str = "lines omitted";

/// Classification of one rendered diff line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffLineKind {
    Add,
    Delete,
    HunkHeader,
    FileHeader,
    Context,
    /// Centered "... (N lines omitted) ..." marker from a truncated diff.
    OmittedMarker,
}

/// One displayable line of a parsed diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: DiffLineKind,
    pub text: String,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
}

impl DiffLine {
    fn unnumbered(kind: DiffLineKind, text: &str) -> Self {
        DiffLine {
            kind,
            text: text.to_string(),
            old_line: None,
            new_line: None,
        }
    }
}

/// Parse unified diff text into classified lines with gutter numbers.
///
/// O(n) in the input length. Lines that cannot be classified (missing
/// prefix, stray text between hunks) are treated as context.
pub fn parse_unified_diff(diff: &str) -> Vec<DiffLine> {
    let mut lines = Vec::new();
    let mut old_counter: u32 = 0;
    let mut new_counter: u32 = 0;

    for raw in diff.lines() {
        // The no-newline marker is metadata about the previous line,
        // not content: not rendered, not counted.
        if raw.contains(NO_NEWLINE_MARKER) {
            continue;
        }

        if raw.starts_with("--- ") || raw.starts_with("+++ ") {
            lines.push(DiffLine::unnumbered(DiffLineKind::FileHeader, raw));
            continue;
        }

        if let Some((old_start, new_start)) = parse_hunk_header(raw) {
            old_counter = old_start;
            new_counter = new_start;
            lines.push(DiffLine::unnumbered(DiffLineKind::HunkHeader, raw));
            continue;
        }

        if raw.contains(OMISSION_PHRASE) {
            lines.push(DiffLine::unnumbered(DiffLineKind::OmittedMarker, raw));
            continue;
        }

        if let Some(rest) = raw.strip_prefix('+') {
            lines.push(DiffLine {
                kind: DiffLineKind::Add,
                text: rest.to_string(),
                old_line: None,
                new_line: Some(new_counter),
            });
            new_counter = new_counter.saturating_add(1);
            continue;
        }

        if let Some(rest) = raw.strip_prefix('-') {
            lines.push(DiffLine {
                kind: DiffLineKind::Delete,
                text: rest.to_string(),
                old_line: Some(old_counter),
                new_line: None,
            });
            old_counter = old_counter.saturating_add(1);
            continue;
        }

        let text = raw.strip_prefix(' ').unwrap_or(raw);
        lines.push(DiffLine {
            kind: DiffLineKind::Context,
            text: text.to_string(),
            old_line: Some(old_counter),
            new_line: Some(new_counter),
        });
        old_counter = old_counter.saturating_add(1);
        new_counter = new_counter.saturating_add(1);
    }

    lines
}

/// Fixed gutter width for a parsed diff: the widest assigned line
/// number in digits, floored at three. Unnumbered lines (headers,
/// omission markers) never influence the width.
pub fn gutter_width(lines: &[DiffLine]) -> usize {
    let max_number = lines
        .iter()
        .flat_map(|l| [l.old_line, l.new_line])
        .flatten()
        .max()
        .unwrap_or(0);
    digit_width(max_number).max(GUTTER_FLOOR)
}

fn digit_width(n: u32) -> usize {
    if n == 0 {
        1
    } else {
        (n.ilog10() + 1) as usize
    }
}

/// Parse `@@ -oldStart[,oldCount] +newStart[,newCount] @@` into the
/// declared start values. Returns `None` for anything else.
fn parse_hunk_header(line: &str) -> Option<(u32, u32)> {
    let rest = line.strip_prefix("@@ ")?;
    let end = rest.find(" @@")?;
    let ranges = &rest[..end];

    let mut parts = ranges.split_whitespace();
    let old_part = parts.next()?.strip_prefix('-')?;
    let new_part = parts.next()?.strip_prefix('+')?;
    if parts.next().is_some() {
        return None;
    }

    Some((parse_range_start(old_part)?, parse_range_start(new_part)?))
}

fn parse_range_start(range: &str) -> Option<u32> {
    let start = range.split(',').next()?;
    start.parse().ok()
}
