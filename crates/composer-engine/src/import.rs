//! One-shot import of externally authored copy into an empty composition.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::blocks::{BlockBody, BlockMetadata, ContentBlock, Element, ops};

/// One or more blank lines
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n(?:[ \t]*\n)+").expect("paragraph break pattern compiles"));

/// Externally authored prose offered to a composition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCopy {
    pub id: String,
    pub text: String,
}

impl SourceCopy {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Build the initial block list from `copies`.
///
/// Returns `None` when `existing` already has blocks or the copies produce no
/// paragraphs; an initializer never merges into existing content.
pub fn import_copy(existing: &[ContentBlock], copies: &[SourceCopy]) -> Option<Vec<ContentBlock>> {
    if !existing.is_empty() {
        log::debug!("copy import skipped, composition already has {} blocks", existing.len());
        return None;
    }

    let mut blocks: Vec<ContentBlock> = copies.iter().flat_map(blocks_from_copy).collect();
    if blocks.is_empty() {
        return None;
    }
    ops::renumber(&mut blocks);
    log::debug!("imported {} blocks from {} copies", blocks.len(), copies.len());
    Some(blocks)
}

fn blocks_from_copy(copy: &SourceCopy) -> Vec<ContentBlock> {
    split_paragraphs(&copy.text)
        .into_iter()
        .map(|paragraph| block_for_paragraph(&paragraph).with_metadata(BlockMetadata::from_copy(&copy.id)))
        .collect()
}

/// Split on blank lines when the text has any, otherwise on single line
/// breaks (short-form copy). Separator lines such as `---` are dropped.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n");
    let trimmed = normalized.trim();

    let pieces: Vec<&str> = if PARAGRAPH_BREAK.is_match(trimmed) {
        PARAGRAPH_BREAK.split(trimmed).collect()
    } else {
        trimmed.lines().collect()
    };

    pieces
        .into_iter()
        .map(str::trim)
        .filter(|piece| !piece.is_empty() && !is_separator(piece))
        .map(str::to_string)
        .collect()
}

fn is_separator(line: &str) -> bool {
    line.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|marker| line.chars().all(|c| c == *marker))
}

fn block_for_paragraph(paragraph: &str) -> ContentBlock {
    for (prefix, element) in [("### ", Element::H3), ("## ", Element::H2), ("# ", Element::H1)] {
        if let Some(rest) = paragraph.strip_prefix(prefix) {
            return ContentBlock::new(BlockBody::Heading {
                content: rest.trim().to_string(),
                element,
            });
        }
    }
    ContentBlock::text(paragraph)
}
