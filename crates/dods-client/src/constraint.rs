//! DAP2 constraint expressions: `?a.b[0:1:9],c[2]`.
//!
//! A projection names one entity by its dot-joined ancestor path. Each
//! segment with its own rank carries one `[start:stride:end]` clause per
//! dimension; sequence segments never do. A request joins projections with
//! commas behind a single `?`.

use std::fmt;

use crate::descriptor::{DescriptorTree, WireKind};
use crate::error::{DodsError, Result};
use crate::model::{DataKind, EntityId, Model};

/// Index range with inclusive end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub start: usize,
    pub stride: usize,
    pub end: usize,
}

impl IndexRange {
    pub fn new(start: usize, stride: usize, end: usize) -> Result<Self> {
        if stride == 0 {
            return Err(DodsError::invalid_constraint(format!(
                "stride must be > 0 in [{}:{}:{}]",
                start, stride, end
            )));
        }
        if end < start {
            return Err(DodsError::invalid_constraint(format!(
                "end before start in [{}:{}:{}]",
                start, stride, end
            )));
        }
        Ok(Self { start, stride, end })
    }

    /// The whole extent of a dimension of length `len`.
    pub fn full(len: usize) -> Self {
        Self {
            start: 0,
            stride: 1,
            end: len.saturating_sub(1),
        }
    }

    pub fn single(index: usize) -> Self {
        Self {
            start: index,
            stride: 1,
            end: index,
        }
    }

    /// Number of selected indices.
    pub fn len(&self) -> usize {
        (self.end - self.start) / self.stride + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}:{}]", self.start, self.stride, self.end)
    }
}

/// One dot-separated part of a projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Encoded name.
    pub name: String,
    pub ranges: Vec<IndexRange>,
}

/// One comma-separated part of a constraint expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub segments: Vec<Segment>,
}

impl Projection {
    /// Encoded segment names, outermost first.
    pub fn names(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.name.clone()).collect()
    }

    pub fn leaf_ranges(&self) -> &[IndexRange] {
        self.segments.last().map(|s| s.ranges.as_slice()).unwrap_or(&[])
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment.name)?;
            for range in &segment.ranges {
                write!(f, "{}", range)?;
            }
        }
        Ok(())
    }
}

/// Join projections into one request expression.
pub fn batch_expression<S: AsRef<str>>(projections: &[S]) -> String {
    if projections.is_empty() {
        return String::new();
    }
    let joined: Vec<&str> = projections.iter().map(|p| p.as_ref()).collect();
    format!("?{}", joined.join(","))
}

/// Projection of an entity's whole extent.
pub fn full_projection(tree: &DescriptorTree, model: &Model, id: EntityId) -> Result<Projection> {
    section_projection(tree, model, id, &[])
}

/// Projection of an entity with explicit ranges.
///
/// `ranges` is empty (whole extent), holds one list for the leaf only, or
/// one list per path segment, outermost first. Leaf ranges follow the
/// entity's shape; for Char entities the trailing character range is
/// dropped since the server returns whole strings.
pub fn section_projection(
    tree: &DescriptorTree,
    model: &Model,
    id: EntityId,
    ranges: &[Vec<IndexRange>],
) -> Result<Projection> {
    let entity = model.entity(id);
    let lineage = tree.lineage(entity.descriptor);
    let count = lineage.len();
    if !(ranges.is_empty() || ranges.len() == 1 || ranges.len() == count) {
        return Err(DodsError::invalid_constraint(format!(
            "{} range lists given for a path of {} segments",
            ranges.len(),
            count
        )));
    }

    let mut segments = Vec::with_capacity(count);
    for (i, node_id) in lineage.iter().enumerate() {
        let node = tree.node(*node_id);
        let leaf = i + 1 == count;

        if node.kind == Some(WireKind::Sequence) {
            segments.push(Segment {
                name: node.encoded_name.clone(),
                ranges: Vec::new(),
            });
            continue;
        }

        let mut sizes: Vec<usize> = if leaf {
            model.shape(id)
        } else {
            node.dims().iter().map(|d| d.size).collect()
        };
        let char_leaf = leaf && entity.data_kind == DataKind::Char;
        if char_leaf {
            sizes.pop();
        }

        let supplied = if leaf && !ranges.is_empty() {
            ranges.last()
        } else if ranges.len() == count && count > 1 {
            ranges.get(i)
        } else {
            None
        };

        let segment_ranges = match supplied {
            None => sizes.iter().map(|s| IndexRange::full(*s)).collect(),
            Some(given) => {
                let mut given = given.clone();
                if char_leaf && given.len() == sizes.len() + 1 {
                    given.pop();
                }
                check_ranges(&node.encoded_name, &given, &sizes)?;
                given
            }
        };
        segments.push(Segment {
            name: node.encoded_name.clone(),
            ranges: segment_ranges,
        });
    }

    Ok(Projection { segments })
}

fn check_ranges(name: &str, ranges: &[IndexRange], sizes: &[usize]) -> Result<()> {
    if ranges.len() != sizes.len() {
        return Err(DodsError::invalid_constraint(format!(
            "'{}' has rank {} but {} ranges were given",
            name,
            sizes.len(),
            ranges.len()
        )));
    }
    for (range, size) in ranges.iter().zip(sizes) {
        if range.end >= *size {
            return Err(DodsError::invalid_constraint(format!(
                "range {} exceeds length {} of '{}'",
                range, size, name
            )));
        }
    }
    Ok(())
}

/// Split at `sep` outside brackets.
fn split_outside_brackets(text: &str, sep: char) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth < 0 {
                    return Err(DodsError::invalid_constraint(format!("unbalanced ']' in '{}'", text)));
                }
            }
            c if c == sep && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(DodsError::invalid_constraint(format!("unbalanced '[' in '{}'", text)));
    }
    parts.push(&text[start..]);
    Ok(parts)
}

fn parse_index(text: &str, clause: &str) -> Result<usize> {
    text.trim().parse().map_err(|_| {
        DodsError::invalid_constraint(format!("bad index '{}' in [{}]", text, clause))
    })
}

fn parse_segment(text: &str) -> Result<Segment> {
    let (name, mut rest) = match text.find('[') {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(DodsError::invalid_constraint(format!("missing name in '{}'", text)));
    }

    let mut ranges = Vec::new();
    while !rest.is_empty() {
        let close = match (rest.starts_with('['), rest.find(']')) {
            (true, Some(close)) => close,
            _ => return Err(DodsError::invalid_constraint(format!("bad bracket clause in '{}'", text))),
        };
        let clause = &rest[1..close];
        let parts: Vec<&str> = clause.split(':').collect();
        let range = match parts.as_slice() {
            [i] => IndexRange::single(parse_index(i, clause)?),
            [a, b] => IndexRange::new(parse_index(a, clause)?, 1, parse_index(b, clause)?)?,
            [a, s, b] => IndexRange::new(
                parse_index(a, clause)?,
                parse_index(s, clause)?,
                parse_index(b, clause)?,
            )?,
            _ => return Err(DodsError::invalid_constraint(format!("bad range [{}]", clause))),
        };
        ranges.push(range);
        rest = &rest[close + 1..];
    }

    Ok(Segment {
        name: name.to_string(),
        ranges,
    })
}

/// Parse one projection such as `s.m[0:1:3]`.
pub fn parse_projection(text: &str) -> Result<Projection> {
    let segments = split_outside_brackets(text.trim(), '.')?
        .into_iter()
        .map(parse_segment)
        .collect::<Result<Vec<_>>>()?;
    Ok(Projection { segments })
}

/// Parse a whole expression, with or without the leading `?`.
///
/// Selection clauses (`&...`) are rejected.
pub fn parse_expression(text: &str) -> Result<Vec<Projection>> {
    let text = text.trim().trim_start_matches('?');
    if text.contains('&') {
        return Err(DodsError::invalid_constraint(format!(
            "selection clauses are not supported: '{}'",
            text
        )));
    }
    split_outside_brackets(text, ',')?
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .map(parse_projection)
        .collect()
}
