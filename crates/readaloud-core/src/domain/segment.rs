//! Speakable segments and their source locations.
//!
//! A segmentation pass produces two parallel vectors: the segment texts and a
//! [`SourceRange`] per segment that locates it inside the block container it
//! came from. Paragraph navigation is defined purely on that metadata.

use serde::{Deserialize, Serialize};

/// Location of one segment inside its source container.
///
/// `start`/`end` are character (not byte) offsets into the container's text,
/// already trimmed of surrounding whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    /// Ordinal of the counted container in document order.
    pub container: usize,
    /// First character of the segment.
    pub start: usize,
    /// One past the last character of the segment.
    pub end: usize,
}

impl SourceRange {
    #[must_use]
    pub const fn new(container: usize, start: usize, end: usize) -> Self {
        Self {
            container,
            start,
            end,
        }
    }

    /// Length of the range in characters.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One speakable unit of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in the session's segment list (`0..N-1`).
    pub index: usize,
    /// Non-empty, trimmed text.
    pub text: String,
    /// Where the text came from.
    pub source: SourceRange,
}

/// Result of one segmentation pass.
///
/// `texts[i]` and `meta[i]` always describe the same segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub texts: Vec<String>,
    pub meta: Vec<SourceRange>,
}

impl Segmentation {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            texts: Vec::new(),
            meta: Vec::new(),
        }
    }

    pub fn push(&mut self, text: impl Into<String>, range: SourceRange) {
        self.texts.push(text.into());
        self.meta.push(range);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    /// Materialise indexed [`Segment`]s.
    #[must_use]
    pub fn into_segments(self) -> Vec<Segment> {
        self.texts
            .into_iter()
            .zip(self.meta)
            .enumerate()
            .map(|(index, (text, source))| Segment {
                index,
                text,
                source,
            })
            .collect()
    }
}

/// Index of the first segment that shares a container with `index`.
#[must_use]
pub fn paragraph_start(meta: &[SourceRange], index: usize) -> usize {
    let Some(current) = meta.get(index) else {
        return index;
    };
    let mut i = index;
    while i > 0 && meta[i - 1].container == current.container {
        i -= 1;
    }
    i
}

/// Index of the first segment of the next container, if any.
#[must_use]
pub fn next_paragraph_start(meta: &[SourceRange], index: usize) -> Option<usize> {
    let current = meta.get(index)?;
    meta.iter()
        .enumerate()
        .skip(index + 1)
        .find(|(_, range)| range.container != current.container)
        .map(|(i, _)| i)
}

/// Target of a "previous paragraph" command.
///
/// From the middle of a paragraph this is the paragraph's first segment;
/// from its first segment it is the start of the preceding paragraph.
#[must_use]
pub fn prev_paragraph_target(meta: &[SourceRange], index: usize) -> usize {
    let start = paragraph_start(meta, index);
    if start < index || start == 0 {
        start
    } else {
        paragraph_start(meta, start - 1)
    }
}
