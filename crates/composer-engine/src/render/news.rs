use crate::blocks::{BlockBody, ContentBlock, Element};
use crate::composition::CompositionKind;

use super::{
    RenderContext, RenderedDocument, Renderer, attr, frontmatter_fields, frontmatter_value,
    inline_markdown, text,
};

/// Semantic article markup for the news site. Frontmatter fields become
/// `<meta>` tags.
#[derive(Clone, Copy, Debug, Default)]
pub struct NewsRenderer;

impl Renderer for NewsRenderer {
    fn kind(&self) -> CompositionKind {
        CompositionKind::News
    }

    fn render(&self, blocks: &[ContentBlock], context: &RenderContext) -> RenderedDocument {
        let title = frontmatter_value(blocks, "title")
            .unwrap_or(&context.name)
            .to_string();
        let preheader = frontmatter_value(blocks, "description").map(str::to_string);

        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", text(&title)));
        for field in frontmatter_fields(blocks).filter(|field| !field.key.is_empty()) {
            html.push_str(&format!(
                "<meta name=\"{}\" content=\"{}\">\n",
                attr(&field.key.to_lowercase()),
                attr(&field.value)
            ));
        }
        if let Some(css) = &context.stylesheet {
            html.push_str(&format!("<style>\n{css}\n</style>\n"));
        }
        html.push_str("</head>\n<body>\n<article>\n");
        html.push_str(&format!("<header><h1>{}</h1></header>\n", text(&title)));
        for block in blocks {
            if let Some(markup) = render_block(block) {
                html.push_str(&markup);
                html.push('\n');
            }
        }
        html.push_str("</article>\n</body>\n</html>\n");

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
            let tag = match (&block.body, element) {
                (BlockBody::Heading { .. }, Element::P) => Element::H2.tag(),
                _ => element.tag(),
            };
            format!("<{tag}>{}</{tag}>", inline_markdown(content))
        }
        BlockBody::Divider => "<hr>".to_string(),
        BlockBody::Image { url, alt, .. } => {
            if url.is_empty() {
                return None;
            }
            let caption = if alt.trim().is_empty() {
                String::new()
            } else {
                format!("<figcaption>{}</figcaption>", text(alt))
            };
            format!(
                "<figure><img src=\"{}\" alt=\"{}\">{caption}</figure>",
                attr(url),
                attr(alt)
            )
        }
        BlockBody::Video { url, .. } => {
            if url.is_empty() {
                return None;
            }
            format!("<figure><video src=\"{}\" controls></video></figure>", attr(url))
        }
        BlockBody::List { items, ordered } => {
            let tag = if *ordered { "ol" } else { "ul" };
            let items: String = items
                .iter()
                .filter(|item| !item.trim().is_empty())
                .map(|item| format!("<li>{}</li>", inline_markdown(item)))
                .collect();
            if items.is_empty() {
                return None;
            }
            format!("<{tag}>{items}</{tag}>")
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
            format!("<p><a class=\"button\" href=\"{}\">{}</a></p>", attr(url), text(label))
        }
        BlockBody::Frontmatter { .. } => return None,
    };
    Some(markup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::FrontmatterField;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_frontmatter_becomes_meta_tags() {
        let blocks = vec![
            ContentBlock::frontmatter(vec![
                FrontmatterField::new("Title", "Spring range"),
                FrontmatterField::new("description", "Five new \"colours\""),
                FrontmatterField::new("", "leading note"),
            ]),
            ContentBlock::text("Body"),
        ];
        let context = RenderContext {
            name: "ignored".into(),
            stylesheet: None,
        };

        let doc = NewsRenderer.render(&blocks, &context);

        assert_eq!(doc.title, "Spring range");
        assert_eq!(doc.preheader.as_deref(), Some("Five new \"colours\""));
        assert!(doc.html.contains("<meta name=\"title\" content=\"Spring range\">"));
        assert!(doc.html.contains("content=\"Five new &quot;colours&quot;\""));
        assert!(!doc.html.contains("leading note"));
        assert!(doc.html.contains("<header><h1>Spring range</h1></header>"));
    }

    #[test]
    fn test_block_markup() {
        let blocks = [
            ContentBlock::heading("Specs", 3),
            ContentBlock::image("https://cdn.example/car.jpg", "The car", None),
            ContentBlock::list(vec!["Fast".into(), "Quiet".into()], false),
        ];

        let rendered: Vec<String> = blocks.iter().filter_map(render_block).collect();

        assert_eq!(
            rendered,
            vec![
                "<h3>Specs</h3>",
                "<figure><img src=\"https://cdn.example/car.jpg\" alt=\"The car\"><figcaption>The car</figcaption></figure>",
                "<ul><li>Fast</li><li>Quiet</li></ul>",
            ]
        );
    }

    #[test]
    fn test_article_wraps_body() {
        let doc = NewsRenderer.render(&[ContentBlock::divider()], &RenderContext::default());

        insta::assert_snapshot!(
            doc.html.trim_end(),
            @r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
        <meta charset="utf-8">
        <title></title>
        </head>
        <body>
        <article>
        <header><h1></h1></header>
        <hr>
        </article>
        </body>
        </html>
        "#
        );
    }
}
