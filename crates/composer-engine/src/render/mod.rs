//! Output renderers, one per composition kind.
//!
//! Renderers are pure: they read a block list and produce markup. Block text
//! is treated as inline markdown; everything placed in an attribute is
//! escaped.

mod email;
mod news;

use pulldown_cmark::{Event, Options, Parser, html};

use crate::blocks::{BlockBody, ContentBlock, FrontmatterField};
use crate::composition::{Composition, CompositionKind};

pub use email::EmailRenderer;
pub use news::NewsRenderer;

/// Inputs a renderer needs besides the blocks
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderContext {
    /// Composition name, the fallback document title
    pub name: String,
    /// Raw CSS from the stylesheet provider, inserted verbatim
    pub stylesheet: Option<String>,
}

impl RenderContext {
    pub fn for_composition(composition: &Composition) -> Self {
        Self {
            name: composition.name.clone(),
            stylesheet: None,
        }
    }

    pub fn with_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.stylesheet = Some(css.into());
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    pub title: String,
    /// Preview text shown by mail clients and feeds
    pub preheader: Option<String>,
    pub html: String,
}

pub trait Renderer: Send + Sync {
    fn kind(&self) -> CompositionKind;

    fn render(&self, blocks: &[ContentBlock], context: &RenderContext) -> RenderedDocument;
}

pub fn renderer_for(kind: CompositionKind) -> Box<dyn Renderer> {
    match kind {
        CompositionKind::Email => Box::new(EmailRenderer),
        CompositionKind::News => Box::new(NewsRenderer),
    }
}

/// Render a whole composition with the renderer for its kind
pub fn render_composition(composition: &Composition, context: &RenderContext) -> RenderedDocument {
    renderer_for(composition.kind).render(&composition.blocks, context)
}

/// Markdown to HTML, without the wrapping `<p>` when the text is a single
/// paragraph. Raw HTML in the text is escaped; markup goes in html blocks.
pub fn inline_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let parser = Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    html::push_html(&mut out, parser);

    let trimmed = out.trim_end();
    match trimmed
        .strip_prefix("<p>")
        .and_then(|inner| inner.strip_suffix("</p>"))
    {
        Some(inner) if !inner.contains("<p>") => inner.to_string(),
        _ => trimmed.to_string(),
    }
}

pub(crate) fn attr(value: &str) -> String {
    html_escape::encode_double_quoted_attribute(value).into_owned()
}

pub(crate) fn text(value: &str) -> String {
    html_escape::encode_text(value).into_owned()
}

/// Every frontmatter field in block order
pub(crate) fn frontmatter_fields(blocks: &[ContentBlock]) -> impl Iterator<Item = &FrontmatterField> {
    blocks.iter().flat_map(|block| {
        let fields: &[FrontmatterField] = match &block.body {
            BlockBody::Frontmatter { fields } => fields,
            _ => &[],
        };
        fields
    })
}

/// First non-empty value for `key`, case-insensitive
pub(crate) fn frontmatter_value<'a>(blocks: &'a [ContentBlock], key: &str) -> Option<&'a str> {
    frontmatter_fields(blocks)
        .find(|field| field.key.eq_ignore_ascii_case(key) && !field.value.trim().is_empty())
        .map(|field| field.value.trim())
}
