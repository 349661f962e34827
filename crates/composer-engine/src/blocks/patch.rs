use serde::{Deserialize, Serialize};

use super::{BlockBody, BlockMetadata, ContentBlock, Element, FrontmatterField};

/// Partial update for a block.
///
/// Only the `Some` fields are written, and only where the block's variant has
/// a matching field; the rest are ignored. Metadata merges key by key.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockPatch {
    pub content: Option<String>,
    pub element: Option<Element>,
    pub url: Option<String>,
    pub alt: Option<String>,
    pub items: Option<Vec<String>>,
    pub ordered: Option<bool>,
    pub html: Option<String>,
    pub label: Option<String>,
    pub fields: Option<Vec<FrontmatterField>>,
    pub metadata: Option<BlockMetadata>,
}

impl BlockPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Merge into `block`, returning whether anything changed
    pub(crate) fn apply_to(&self, block: &mut ContentBlock) -> bool {
        let before = block.clone();

        match &mut block.body {
            BlockBody::Text { content, element } | BlockBody::Heading { content, element } => {
                set(content, &self.content);
                set(element, &self.element);
            }
            BlockBody::Image { url, alt, .. } => {
                set(url, &self.url);
                set(alt, &self.alt);
            }
            BlockBody::Video { url, .. } => set(url, &self.url),
            BlockBody::List { items, ordered } => {
                set(items, &self.items);
                set(ordered, &self.ordered);
            }
            BlockBody::Html { html } => set(html, &self.html),
            BlockBody::Button { label, url } => {
                set(label, &self.label);
                set(url, &self.url);
            }
            BlockBody::Frontmatter { fields } => set(fields, &self.fields),
            BlockBody::Divider => {}
        }

        if let Some(metadata) = &self.metadata {
            block.metadata.merge(metadata);
        }

        *block != before
    }
}

fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}
