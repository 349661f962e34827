//! Content block data model.
//!
//! A composition is an ordered list of [`ContentBlock`]s. List position is the
//! single source of truth for render order; the `order` field is a cache that
//! every operation in [`ops`] renumbers densely.

pub mod ops;
pub mod patch;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub use ops::BlockError;
pub use patch::BlockPatch;

/// Provenance tag written into the metadata of blocks created from imported copy
pub const COPY_SOURCE: &str = "selected-copy";

const SOURCE_KEY: &str = "source";
const COPY_ID_KEY: &str = "copyId";

/// Opaque block identifier, unique within one composition and stable across reorders
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for BlockId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Markup element used for text and heading blocks
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    H1,
    H2,
    H3,
    #[default]
    P,
}

impl Element {
    /// Heading element for a toolbar level; levels past 3 collapse to `h3`
    pub fn heading(level: u8) -> Self {
        match level {
            0 | 1 => Element::H1,
            2 => Element::H2,
            _ => Element::H3,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Element::H1 => "h1",
            Element::H2 => "h2",
            Element::H3 => "h3",
            Element::P => "p",
        }
    }

    pub fn is_heading(self) -> bool {
        !matches!(self, Element::P)
    }
}

/// Link from an image or video block back to the gallery it was picked from
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gallery_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gallery_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<String>,
}

/// One `key: value` entry of a frontmatter block
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontmatterField {
    pub key: String,
    pub value: String,
}

impl FrontmatterField {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Discriminant of a block, mirroring the serialized `type` tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Text,
    Heading,
    Divider,
    Image,
    Video,
    List,
    Html,
    Button,
    Frontmatter,
}

impl BlockKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Text => "text",
            BlockKind::Heading => "heading",
            BlockKind::Divider => "divider",
            BlockKind::Image => "image",
            BlockKind::Video => "video",
            BlockKind::List => "list",
            BlockKind::Html => "html",
            BlockKind::Button => "button",
            BlockKind::Frontmatter => "frontmatter",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant-specific payload of a block
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum BlockBody {
    Text {
        #[serde(default)]
        content: String,
        #[serde(default)]
        element: Element,
    },
    Heading {
        #[serde(default)]
        content: String,
        #[serde(default)]
        element: Element,
    },
    Divider,
    Image {
        #[serde(default)]
        url: String,
        #[serde(default)]
        alt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gallery: Option<GalleryLink>,
    },
    Video {
        #[serde(default)]
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gallery: Option<GalleryLink>,
    },
    List {
        #[serde(default)]
        items: Vec<String>,
        #[serde(default)]
        ordered: bool,
    },
    Html {
        #[serde(default)]
        html: String,
    },
    Button {
        #[serde(default)]
        label: String,
        #[serde(default)]
        url: String,
    },
    Frontmatter {
        #[serde(default)]
        fields: Vec<FrontmatterField>,
    },
}

impl BlockBody {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockBody::Text { .. } => BlockKind::Text,
            BlockBody::Heading { .. } => BlockKind::Heading,
            BlockBody::Divider => BlockKind::Divider,
            BlockBody::Image { .. } => BlockKind::Image,
            BlockBody::Video { .. } => BlockKind::Video,
            BlockBody::List { .. } => BlockKind::List,
            BlockBody::Html { .. } => BlockKind::Html,
            BlockBody::Button { .. } => BlockKind::Button,
            BlockBody::Frontmatter { .. } => BlockKind::Frontmatter,
        }
    }
}

/// Open metadata map carried by every block (provenance tags and similar)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockMetadata(Map<String, Value>);

impl BlockMetadata {
    /// Metadata marking a block as derived from the given source copy
    pub fn from_copy(copy_id: &str) -> Self {
        let mut metadata = Self::default();
        metadata.insert(SOURCE_KEY, Value::from(COPY_SOURCE));
        metadata.insert(COPY_ID_KEY, Value::from(copy_id));
        metadata
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Key-by-key merge; `null` values remove the key
    pub fn merge(&mut self, other: &BlockMetadata) {
        for (key, value) in &other.0 {
            if value.is_null() {
                self.0.remove(key);
            } else {
                self.0.insert(key.clone(), value.clone());
            }
        }
    }

    pub fn source(&self) -> Option<&str> {
        self.0.get(SOURCE_KEY).and_then(Value::as_str)
    }

    pub fn copy_id(&self) -> Option<&str> {
        self.0.get(COPY_ID_KEY).and_then(Value::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One discrete content unit of a composition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub id: BlockId,
    #[serde(default)]
    pub order: u32,
    #[serde(default, skip_serializing_if = "BlockMetadata::is_empty")]
    pub metadata: BlockMetadata,
    #[serde(flatten)]
    pub body: BlockBody,
}

impl ContentBlock {
    /// New block with a freshly generated id; `order` is assigned on insertion
    pub fn new(body: BlockBody) -> Self {
        Self {
            id: BlockId::generate(),
            order: 0,
            metadata: BlockMetadata::default(),
            body,
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(BlockBody::Text {
            content: content.into(),
            element: Element::P,
        })
    }

    pub fn heading(content: impl Into<String>, level: u8) -> Self {
        Self::new(BlockBody::Heading {
            content: content.into(),
            element: Element::heading(level),
        })
    }

    pub fn divider() -> Self {
        Self::new(BlockBody::Divider)
    }

    pub fn image(url: impl Into<String>, alt: impl Into<String>, gallery: Option<GalleryLink>) -> Self {
        Self::new(BlockBody::Image {
            url: url.into(),
            alt: alt.into(),
            gallery,
        })
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self::new(BlockBody::Video {
            url: url.into(),
            gallery: None,
        })
    }

    pub fn list(items: Vec<String>, ordered: bool) -> Self {
        Self::new(BlockBody::List { items, ordered })
    }

    pub fn html(html: impl Into<String>) -> Self {
        Self::new(BlockBody::Html { html: html.into() })
    }

    pub fn button(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(BlockBody::Button {
            label: label.into(),
            url: url.into(),
        })
    }

    pub fn frontmatter(fields: Vec<FrontmatterField>) -> Self {
        Self::new(BlockBody::Frontmatter { fields })
    }

    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_metadata(mut self, metadata: BlockMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn kind(&self) -> BlockKind {
        self.body.kind()
    }

    /// Text of a text or heading block
    pub fn text_content(&self) -> Option<&str> {
        match &self.body {
            BlockBody::Text { content, .. } | BlockBody::Heading { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<Element> {
        match &self.body {
            BlockBody::Text { element, .. } | BlockBody::Heading { element, .. } => Some(*element),
            _ => None,
        }
    }
}
