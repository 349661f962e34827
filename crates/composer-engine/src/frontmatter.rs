//! Frontmatter detection and conversion.
//!
//! Detection is advisory only: the editor uses it to offer a "convert"
//! action. The matching rules are policy and can be tuned per deployment.

use regex::Regex;

use crate::blocks::{BlockBody, BlockId, ContentBlock, FrontmatterField, ops};

/// Line that opens and closes a delimited frontmatter section
pub const DELIMITER: &str = "---";

pub const DEFAULT_MIN_PAIRS: usize = 2;

const DEFAULT_KEY_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_ -]{0,39}$";

#[derive(Clone, Debug)]
pub struct FrontmatterDetector {
    min_pairs: usize,
    key_pattern: Regex,
}

impl Default for FrontmatterDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PAIRS)
    }
}

impl FrontmatterDetector {
    pub fn new(min_pairs: usize) -> Self {
        Self {
            min_pairs: min_pairs.max(1),
            key_pattern: default_key_pattern(),
        }
    }

    pub fn with_key_pattern(min_pairs: usize, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            min_pairs: min_pairs.max(1),
            key_pattern: Regex::new(pattern)?,
        })
    }

    pub fn min_pairs(&self) -> usize {
        self.min_pairs
    }

    /// Whether `content` looks like structured `key: value` metadata.
    ///
    /// Accepted shapes: a `---` delimited section (first and last non-empty
    /// lines) holding at least one field, or undelimited text where at least
    /// `min_pairs` lines are fields and fields make up half or more of the
    /// non-empty lines.
    pub fn detect(&self, content: &str) -> bool {
        let lines: Vec<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        if lines.len() >= 2 && lines[0] == DELIMITER && lines[lines.len() - 1] == DELIMITER {
            return lines[1..lines.len() - 1]
                .iter()
                .any(|line| self.split_field(line).is_some());
        }

        let fields = lines
            .iter()
            .filter(|line| self.split_field(line).is_some())
            .count();
        fields >= self.min_pairs && fields * 2 >= lines.len()
    }

    /// Parse `content` into ordered fields.
    ///
    /// Delimiter lines are dropped. Lines that are not fields continue the
    /// previous value; text before the first field is kept under an empty key.
    pub fn parse(&self, content: &str) -> Vec<FrontmatterField> {
        let mut fields: Vec<FrontmatterField> = Vec::new();

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line == DELIMITER {
                continue;
            }
            if let Some((key, value)) = self.split_field(line) {
                fields.push(FrontmatterField::new(key, value));
                continue;
            }
            match fields.last_mut() {
                Some(last) => {
                    if !last.value.is_empty() {
                        last.value.push('\n');
                    }
                    last.value.push_str(line);
                }
                None => fields.push(FrontmatterField::new("", line)),
            }
        }

        fields
    }

    /// Split `key: value`; the colon must be followed by whitespace or end the
    /// line so that URLs are not mistaken for fields.
    fn split_field<'a>(&self, line: &'a str) -> Option<(&'a str, &'a str)> {
        let (key, value) = line.split_once(':')?;
        if !(value.is_empty() || value.starts_with(char::is_whitespace)) {
            return None;
        }
        let key = key.trim();
        if !self.key_pattern.is_match(key) {
            return None;
        }
        Some((key, value.trim()))
    }
}

fn default_key_pattern() -> Regex {
    Regex::new(DEFAULT_KEY_PATTERN).expect("default frontmatter key pattern compiles")
}

/// Replace a text block in place with a frontmatter block parsed from its
/// content. Id, position and metadata are kept; non-text blocks are left alone.
pub fn convert_text_to_frontmatter(
    blocks: &[ContentBlock],
    id: &BlockId,
    detector: &FrontmatterDetector,
) -> Vec<ContentBlock> {
    let fields = match blocks.iter().find(|block| &block.id == id).map(|b| &b.body) {
        Some(BlockBody::Text { content, .. }) => detector.parse(content),
        Some(other) => {
            log::debug!("block {id} is {}, not converting", other.kind());
            return blocks.to_vec();
        }
        None => {
            log::debug!("convert: block {id} not found");
            return blocks.to_vec();
        }
    };
    ops::replace_body(blocks, id, BlockBody::Frontmatter { fields })
}

/// Frontmatter block with the given keys and empty values
pub fn template_block(keys: &[String]) -> ContentBlock {
    ContentBlock::frontmatter(
        keys.iter()
            .map(|key| FrontmatterField::new(key.clone(), ""))
            .collect(),
    )
}
