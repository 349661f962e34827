use crate::blocks::{BlockBody, ContentBlock, Element};
use crate::composition::CompositionKind;

use super::{RenderContext, RenderedDocument, Renderer, attr, frontmatter_value, inline_markdown, text};

const BODY_WIDTH: u32 = 600;

/// Table-based markup with inline styles, for mail clients.
///
/// Frontmatter supplies `subject` and `preheader` and is not rendered in the
/// body.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmailRenderer;

impl Renderer for EmailRenderer {
    fn kind(&self) -> CompositionKind {
        CompositionKind::Email
    }

    fn render(&self, blocks: &[ContentBlock], context: &RenderContext) -> RenderedDocument {
        let title = frontmatter_value(blocks, "subject")
            .unwrap_or(&context.name)
            .to_string();
        let preheader = frontmatter_value(blocks, "preheader").map(str::to_string);

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", text(&title)));
        if let Some(css) = &context.stylesheet {
            html.push_str(&format!("<style>\n{css}\n</style>\n"));
        }
        html.push_str("</head>\n<body style=\"margin:0;padding:0;\">\n");
        if let Some(preheader) = &preheader {
            html.push_str(&format!(
                "<div style=\"display:none;max-height:0;overflow:hidden;\">{}</div>\n",
                text(preheader)
            ));
        }
        html.push_str(&format!(
            "<table role=\"presentation\" width=\"{BODY_WIDTH}\" align=\"center\" cellpadding=\"0\" cellspacing=\"0\" border=\"0\">\n"
        ));
        for block in blocks {
            if let Some(cell) = render_block(block) {
                html.push_str(&format!("<tr><td style=\"padding:0 24px;\">{cell}</td></tr>\n"));
            }
        }
        html.push_str("</table>\n</body>\n</html>\n");

        RenderedDocument {
            title,
            preheader,
            html,
        }
    }
}

fn render_block(block: &ContentBlock) -> Option<String> {
    let markup = match &block.body {
        BlockBody::Text { content, element } | BlockBody::Heading { content, element } => {
            if content.trim().is_empty() {
                return None;
            }
            let element = match (&block.body, element) {
                (BlockBody::Heading { .. }, Element::P) => Element::H2,
                _ => *element,
            };
            format!(
                "<{tag} style=\"{style}\">{body}</{tag}>",
                tag = element.tag(),
                style = text_style(element),
                body = inline_markdown(content)
            )
        }
        BlockBody::Divider => {
            "<hr style=\"border:none;border-top:1px solid #dddddd;margin:24px 0;\">".to_string()
        }
        BlockBody::Image { url, alt, .. } => {
            if url.is_empty() {
                return None;
            }
            format!(
                "<img src=\"{}\" alt=\"{}\" width=\"{}\" style=\"display:block;width:100%;height:auto;border:0;\">",
                attr(url),
                attr(alt),
                BODY_WIDTH - 48
            )
        }
        // Mail clients do not play video; link out instead
        BlockBody::Video { url, .. } => {
            if url.is_empty() {
                return None;
            }
            format!(
                "<p style=\"margin:0 0 16px;\"><a href=\"{}\" style=\"color:#1a73e8;\">Watch the video</a></p>",
                attr(url)
            )
        }
        BlockBody::List { items, ordered } => {
            let tag = if *ordered { "ol" } else { "ul" };
            let items: String = items
                .iter()
                .filter(|item| !item.trim().is_empty())
                .map(|item| format!("<li style=\"margin:0 0 8px;\">{}</li>", inline_markdown(item)))
                .collect();
            if items.is_empty() {
                return None;
            }
            format!("<{tag} style=\"margin:0 0 16px;padding-left:24px;\">{items}</{tag}>")
        }
        BlockBody::Html { html } => {
            if html.trim().is_empty() {
                return None;
            }
            html.clone()
        }
        BlockBody::Button { label, url } => {
            if label.trim().is_empty() || url.is_empty() {
                return None;
            }
            format!(
                "<a href=\"{}\" style=\"display:inline-block;padding:12px 24px;margin:0 0 16px;background:#1a73e8;color:#ffffff;text-decoration:none;border-radius:4px;\">{}</a>",
                attr(url),
                text(label)
            )
        }
        BlockBody::Frontmatter { .. } => return None,
    };
    Some(markup)
}

fn text_style(element: Element) -> &'static str {
    match element {
        Element::H1 => "margin:0 0 16px;font-size:28px;line-height:36px;",
        Element::H2 => "margin:0 0 16px;font-size:22px;line-height:30px;",
        Element::H3 => "margin:0 0 12px;font-size:18px;line-height:26px;",
        Element::P => "margin:0 0 16px;font-size:16px;line-height:24px;",
    }
}
