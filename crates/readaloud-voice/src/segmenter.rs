//! Document → speakable segments.
//!
//! Each counted container of a [`Document`] is split into sentences with the
//! Unicode sentence-boundary rules (UAX #29), false boundaries after
//! abbreviations and initials are merged back, short sentences are coalesced
//! up to the backend's minimum length and over-long results are split once
//! near their midpoint at a clause boundary.

use std::ops::Range;

use once_cell::sync::Lazy;
use readaloud_core::{SegmentThresholds, Segmentation, SourceRange};
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use crate::document::Document;

/// How far (in characters) from the midpoint a split point may be.
pub const SPLIT_WINDOW: usize = 60;

/// Characters an over-long segment may be split after.
const CLAUSE_BREAKS: [char; 3] = [',', ';', '—'];

/// Lower-cased abbreviations (without their final period) that never end a sentence.
const ABBREVIATIONS: &[&str] = &[
    // titles
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "mt", "rev", "gen", "col", "lt", "capt",
    "sgt", "gov", "pres", "hon",
    // latin and misc
    "vs", "etc", "e.g", "i.e", "cf", "approx", "fig", "vol", "inc", "ltd", "co", "corp", "dept",
    "est", "a.m", "p.m",
    // units
    "km", "cm", "mm", "kg", "mg", "lb", "lbs", "oz", "ft", "yd",
    // months
    "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
];

/// One or more single capital letters each followed by a period ("J.", "U.S.").
static INITIALS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:\p{Lu}\.)+$").unwrap());

/// Segment every counted container of `document`.
///
/// Returns an empty [`Segmentation`] when the document has no text.
#[must_use]
pub fn segment(document: &Document, thresholds: SegmentThresholds) -> Segmentation {
    let mut out = Segmentation::new();
    for (container, text) in document.containers().iter().enumerate() {
        segment_container(container, text, thresholds, &mut out);
    }
    tracing::debug!(
        segments = out.len(),
        min_chars = thresholds.min_chars,
        max_chars = thresholds.max_chars,
        "Segmented document"
    );
    out
}

fn segment_container(
    container: usize,
    text: &str,
    thresholds: SegmentThresholds,
    out: &mut Segmentation,
) {
    let sentences = sentence_spans(text);
    for group in coalesce(text, &sentences, thresholds.min_chars) {
        for piece in split_near_midpoint(text, group, thresholds.max_chars) {
            let piece = trim_span(text, piece);
            if piece.is_empty() {
                continue;
            }
            let range = SourceRange::new(
                container,
                char_offset(text, piece.start),
                char_offset(text, piece.end),
            );
            out.push(&text[piece], range);
        }
    }
}

/// Trimmed, non-empty sentence byte ranges with abbreviation boundaries merged.
fn sentence_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut pending: Option<usize> = None;

    for (start, sentence) in text.split_sentence_bound_indices() {
        let begin = pending.take().unwrap_or(start);
        let end = start + sentence.len();
        if ends_with_abbreviation(&text[begin..end]) {
            pending = Some(begin);
            continue;
        }
        spans.push(begin..end);
    }
    if let Some(begin) = pending {
        spans.push(begin..text.len());
    }

    spans
        .into_iter()
        .map(|span| trim_span(text, span))
        .filter(|span| !span.is_empty())
        .collect()
}

fn ends_with_abbreviation(sentence: &str) -> bool {
    let Some(word) = sentence.split_whitespace().next_back() else {
        return false;
    };
    let word = word.trim_start_matches(|c: char| !c.is_alphanumeric());
    let Some(stem) = word.strip_suffix('.') else {
        return false;
    };
    if INITIALS.is_match(word) {
        return true;
    }
    let stem = stem.to_lowercase();
    ABBREVIATIONS.contains(&stem.as_str())
}

/// Join consecutive sentences until each group reaches `min_chars`.
///
/// A trailing group shorter than the threshold is kept as is.
fn coalesce(text: &str, sentences: &[Range<usize>], min_chars: usize) -> Vec<Range<usize>> {
    let mut groups = Vec::new();
    let mut current: Option<Range<usize>> = None;

    for sentence in sentences {
        let group = match current.take() {
            Some(group) => group.start..sentence.end,
            None => sentence.clone(),
        };
        if text[group.clone()].chars().count() >= min_chars {
            groups.push(group);
        } else {
            current = Some(group);
        }
    }
    groups.extend(current);
    groups
}

/// Split `span` once at the clause break nearest its midpoint, if it is too long.
fn split_near_midpoint(text: &str, span: Range<usize>, max_chars: usize) -> Vec<Range<usize>> {
    let slice = &text[span.clone()];
    let len = slice.chars().count();
    if len <= max_chars {
        return vec![span];
    }

    let mid = len / 2;
    let best = slice
        .char_indices()
        .enumerate()
        .filter(|(_, (_, c))| CLAUSE_BREAKS.contains(c))
        .map(|(pos, (byte, c))| (pos + 1, byte + c.len_utf8()))
        .filter(|(after, _)| after.abs_diff(mid) <= SPLIT_WINDOW)
        .min_by_key(|(after, _)| after.abs_diff(mid));

    match best {
        Some((_, cut)) => vec![span.start..span.start + cut, span.start + cut..span.end],
        None => vec![span],
    }
}

fn trim_span(text: &str, span: Range<usize>) -> Range<usize> {
    let slice = &text[span.clone()];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    if lead == slice.len() {
        return span.start..span.start;
    }
    span.start + lead..span.end - trail
}

fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Block;

    const LOOSE: SegmentThresholds = SegmentThresholds {
        min_chars: 1,
        max_chars: 1000,
    };

    fn texts(doc: &Document, thresholds: SegmentThresholds) -> Vec<String> {
        segment(doc, thresholds).texts
    }

    #[test]
    fn merges_abbreviations_and_initials() {
        let doc = Document::from_plain_text(
            "Dr. Smith arrived at noon. He met Mr. J. R. Jones in the U.S. capital.",
        );
        assert_eq!(
            texts(&doc, LOOSE),
            vec![
                "Dr. Smith arrived at noon.",
                "He met Mr. J. R. Jones in the U.S. capital."
            ]
        );
    }

    #[test]
    fn ordinary_sentence_ends_are_kept() {
        let doc = Document::from_plain_text("It rained. We stayed in. The end.");
        assert_eq!(texts(&doc, LOOSE), vec!["It rained.", "We stayed in.", "The end."]);
    }

    #[test]
    fn coalesces_forward_to_minimum() {
        let doc = Document::from_plain_text(
            "The quick brown fox jumps high. A lazy dog sleeps in the sun. Birds sing loudly every morning. Fine.",
        );
        let seg = segment(
            &doc,
            SegmentThresholds {
                min_chars: 50,
                max_chars: 1000,
            },
        );
        assert_eq!(
            seg.texts,
            vec![
                "The quick brown fox jumps high. A lazy dog sleeps in the sun.",
                "Birds sing loudly every morning. Fine.",
            ]
        );
        assert_eq!(seg.meta[0], SourceRange::new(0, 0, 61));
        assert_eq!(seg.meta[1].start, 62);
    }

    #[test]
    fn short_container_stays_whole() {
        let doc = Document::from_plain_text("One. Two. Three.");
        assert_eq!(
            texts(
                &doc,
                SegmentThresholds {
                    min_chars: 60,
                    max_chars: 300
                }
            ),
            vec!["One. Two. Three."]
        );
    }

    #[test]
    fn splits_once_at_clause_near_midpoint() {
        let doc = Document::from_plain_text(
            "alpha beta gamma delta epsilon zeta eta theta iota kappa, lambda mu nu xi omicron pi rho sigma tau upsilon phi chi.",
        );
        let seg = segment(
            &doc,
            SegmentThresholds {
                min_chars: 1,
                max_chars: 80,
            },
        );
        assert_eq!(
            seg.texts,
            vec![
                "alpha beta gamma delta epsilon zeta eta theta iota kappa,",
                "lambda mu nu xi omicron pi rho sigma tau upsilon phi chi.",
            ]
        );
        assert_eq!(seg.meta[0].end, 57);
        assert_eq!(seg.meta[1].start, 58);
    }

    #[test]
    fn long_segment_without_clause_break_is_left_whole() {
        let text = "word ".repeat(40);
        let doc = Document::from_plain_text(&text);
        let seg = segment(
            &doc,
            SegmentThresholds {
                min_chars: 1,
                max_chars: 80,
            },
        );
        assert_eq!(seg.len(), 1);
        assert_eq!(seg.texts[0], text.trim());
    }

    #[test]
    fn split_happens_only_once() {
        let text = "a clause of twenty c, ".repeat(14);
        let doc = Document::from_plain_text(&text);
        let seg = segment(
            &doc,
            SegmentThresholds {
                min_chars: 1,
                max_chars: 80,
            },
        );
        assert_eq!(seg.len(), 2);
    }

    #[test]
    fn offsets_are_trimmed_character_positions() {
        let doc = Document::from_plain_text("Café au lait. Voilà tout.");
        let seg = segment(&doc, LOOSE);
        assert_eq!(seg.texts, vec!["Café au lait.", "Voilà tout."]);
        assert_eq!(seg.meta[0], SourceRange::new(0, 0, 13));
        assert_eq!(seg.meta[1], SourceRange::new(0, 14, 25));
    }

    #[test]
    fn nested_containers_are_counted_once() {
        let doc = Document::new(vec![
            Block::heading("Intro."),
            Block::quote("Quoted.").with_children(vec![Block::paragraph("Inner.")]),
            Block::container(vec![Block::list_item("Item one."), Block::list_item("Item two.")]),
        ]);
        let seg = segment(&doc, LOOSE);
        assert_eq!(
            seg.texts,
            vec!["Intro.", "Quoted.", "Inner.", "Item one.", "Item two."]
        );
        let containers: Vec<usize> = seg.meta.iter().map(|m| m.container).collect();
        assert_eq!(containers, vec![0, 1, 1, 2, 3]);
    }

    #[test]
    fn empty_document_yields_nothing() {
        let seg = segment(&Document::default(), LOOSE);
        assert!(seg.is_empty());
    }

    #[test]
    fn abbreviation_detection() {
        assert!(ends_with_abbreviation("Meet Dr. "));
        assert!(ends_with_abbreviation("(e.g. "));
        assert!(ends_with_abbreviation("born in the U.K. "));
        assert!(!ends_with_abbreviation("It rained. "));
        assert!(!ends_with_abbreviation("Wait! "));
    }
}
