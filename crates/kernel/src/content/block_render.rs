//! Server-side block rendering.
//!
//! Converts a parsed block stream into semantic HTML:
//! - Rich text is sanitized with ammonia; markdown goes through
//!   pulldown-cmark first; raw HTML blocks are emitted as stored
//! - Images resolve through a [`RenderContext`]; dangling references render
//!   as nothing
//! - Iframes only for http(s) URLs; videos only for whitelisted hosts
//! - Anything without a dedicated renderer becomes a
//!   `<div class="block-{name}">` around its rendered fields

use std::collections::HashMap;

use pulldown_cmark::{Options, Parser, html};

use super::schema::ReferenceKind;
use super::value::{BlockValue, ReferenceId, ScalarValue, StreamChild};

/// Text fields that only feed markup attributes (icon classes, anchors,
/// link targets, embed parameters). They are never rendered as text.
const ATTRIBUTE_FIELDS: &[&str] = &[
    "icon_class",
    "top_detail_icon",
    "bottom_detail_icon",
    "anchor",
    "anchor_id",
    "cta_url",
    "parameters",
];

/// Lookups the renderer needs from outside the content tree.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    images: HashMap<ReferenceId, String>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map an image id to its public URL.
    pub fn with_image(mut self, id: ReferenceId, url: impl Into<String>) -> Self {
        self.images.insert(id, url.into());
        self
    }

    pub fn image_url(&self, id: &ReferenceId) -> Option<&str> {
        self.images.get(id).map(String::as_str)
    }
}

/// Sanitize HTML input using ammonia with default settings.
///
/// Strips dangerous elements like `<script>`, event handlers, and
/// other XSS vectors while preserving safe formatting tags.
pub fn sanitize_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Escape text for use in element content or a quoted attribute.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn markdown_to_html(source: &str) -> String {
    let parser = Parser::new_ext(source, Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    sanitize_html(&out)
}

/// Validate that a URL uses a safe scheme (http or https).
fn is_safe_url(url: &str) -> bool {
    let trimmed = url.trim();
    trimmed.starts_with("https://") || trimmed.starts_with("http://")
}

/// Whitelisted video embed URL patterns.
const EMBED_WHITELIST: &[&str] = &[
    "youtube.com/watch",
    "youtube.com/embed/",
    "youtu.be/",
    "vimeo.com/",
    "player.vimeo.com/",
    "dailymotion.com/embed/",
];

fn is_whitelisted_embed(url: &str) -> bool {
    let normalised = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");
    EMBED_WHITELIST
        .iter()
        .any(|pattern| normalised.starts_with(pattern))
}

const HEADING_TAGS: &[&str] = &["h2", "h3", "h4", "h5", "h6", "p"];

/// Render a block stream into a single HTML string.
pub fn render_stream(children: &[StreamChild], ctx: &RenderContext) -> String {
    children
        .iter()
        .map(|child| render_block(&child.block_type, &child.value, ctx))
        .collect()
}

/// Render one block by variant name.
pub fn render_block(block_type: &str, value: &BlockValue, ctx: &RenderContext) -> String {
    match value {
        BlockValue::Struct(fields) => match block_type {
            "image" if fields.iter().any(|(name, _)| name == "image") => render_centered_image(value, ctx),
            "alert" => render_alert(value),
            "quote" => render_quote(value, ctx),
            "separator" => "<hr>".to_string(),
            "anchor" => render_anchor(value),
            "iframe" => render_iframe(value),
            "video" => render_video(value, ctx),
            _ => render_struct(block_type, value, ctx),
        },
        BlockValue::Stream(children) => format!(
            "<div class=\"block-{}\">{}</div>",
            html_escape(block_type),
            render_stream(children, ctx)
        ),
        BlockValue::List(items) => {
            let mut out = format!("<ul class=\"block-{}\">", html_escape(block_type));
            for item in items {
                out.push_str("<li>");
                out.push_str(&render_block(&item.block_type, &item.value, ctx));
                out.push_str("</li>");
            }
            out.push_str("</ul>");
            out
        }
        BlockValue::Scalar(scalar) => render_scalar(block_type, scalar, ctx),
    }
}

fn render_scalar(name: &str, scalar: &ScalarValue, ctx: &RenderContext) -> String {
    match scalar {
        ScalarValue::RichText(s) => sanitize_html(s),
        ScalarValue::Markdown(s) => markdown_to_html(s),
        ScalarValue::RawHtml(s) => s.clone(),
        ScalarValue::Text(s) if s.trim().is_empty() => String::new(),
        ScalarValue::Text(s) if name == "title" => format!("<h2>{}</h2>", html_escape(s)),
        ScalarValue::Text(s) => format!("<p>{}</p>", html_escape(s)),
        ScalarValue::Reference(r) if r.kind == ReferenceKind::Image => {
            render_img(ctx.image_url(&r.id), "")
        }
        // Settings, links and booleans shape the markup but carry no text.
        _ => String::new(),
    }
}

fn render_struct(name: &str, value: &BlockValue, ctx: &RenderContext) -> String {
    let BlockValue::Struct(fields) = value else {
        return String::new();
    };
    let tag = heading_tag(value);
    let alt = field_text(value, "alt_text")
        .or_else(|| field_text(value, "alt"))
        .unwrap_or("");

    let mut inner = String::new();
    for (field, v) in fields {
        let rendered = match v {
            BlockValue::Scalar(ScalarValue::Text(s))
                if field == "title" || field.ends_with("_title") =>
            {
                if s.trim().is_empty() {
                    String::new()
                } else {
                    format!("<{tag}>{}</{tag}>", html_escape(s))
                }
            }
            BlockValue::Scalar(ScalarValue::Reference(r)) if r.kind == ReferenceKind::Image => {
                render_img(ctx.image_url(&r.id), alt)
            }
            // Shown through the image element.
            BlockValue::Scalar(ScalarValue::Text(_)) if field == "alt_text" || field == "alt" => {
                String::new()
            }
            BlockValue::Scalar(ScalarValue::Text(_)) if ATTRIBUTE_FIELDS.contains(&field.as_str()) => {
                String::new()
            }
            _ => render_block(field, v, ctx),
        };
        inner.push_str(&rendered);
    }

    if inner.is_empty() {
        return String::new();
    }
    format!("<div class=\"block-{}\">{inner}</div>", html_escape(name))
}

fn render_img(url: Option<&str>, alt: &str) -> String {
    match url {
        Some(url) => format!(
            "<img src=\"{}\" alt=\"{}\">",
            html_escape(url),
            html_escape(alt)
        ),
        None => String::new(),
    }
}

fn render_centered_image(value: &BlockValue, ctx: &RenderContext) -> String {
    let url = image_ref(value).and_then(|id| ctx.image_url(id));
    let Some(url) = url else {
        return String::new();
    };
    let tag = heading_tag(value);
    let alt = field_text(value, "alt")
        .or_else(|| field_text(value, "alt_text"))
        .unwrap_or("");

    let mut out = String::from("<figure class=\"fr-content-media\">");
    if let Some(title) = field_text(value, "title").filter(|t| !t.trim().is_empty()) {
        out.push_str(&format!("<{tag}>{}</{tag}>", html_escape(title)));
    }
    let img = render_img(Some(url), alt);
    match field_text(value, "url").filter(|u| is_safe_url(u)) {
        Some(link) => out.push_str(&format!("<a href=\"{}\">{img}</a>", html_escape(link))),
        None => out.push_str(&img),
    }
    if let Some(caption) = field_text(value, "caption").filter(|c| !c.trim().is_empty()) {
        out.push_str(&format!("<figcaption>{}</figcaption>", html_escape(caption)));
    }
    out.push_str("</figure>");
    out
}

fn render_alert(value: &BlockValue) -> String {
    let level = field_text(value, "level").unwrap_or("info");
    let tag = heading_tag(value);
    let mut out = format!("<div class=\"fr-alert fr-alert--{}\">", html_escape(level));
    if let Some(title) = field_text(value, "title").filter(|t| !t.trim().is_empty()) {
        out.push_str(&format!("<{tag}>{}</{tag}>", html_escape(title)));
    }
    if let Some(text) = field_text(value, "description").filter(|t| !t.trim().is_empty()) {
        out.push_str(&format!("<p>{}</p>", html_escape(text)));
    }
    out.push_str("</div>");
    out
}

fn render_quote(value: &BlockValue, ctx: &RenderContext) -> String {
    let quote = field_text(value, "quote").unwrap_or("");
    let mut out = String::from("<figure class=\"fr-quote\">");
    if let Some(id) = image_ref(value) {
        out.push_str(&render_img(ctx.image_url(id), ""));
    }
    out.push_str(&format!("<blockquote><p>{}</p></blockquote>", html_escape(quote)));

    let author = field_text(value, "author_name").filter(|a| !a.trim().is_empty());
    let title = field_text(value, "author_title").filter(|a| !a.trim().is_empty());
    if author.is_some() || title.is_some() {
        out.push_str("<figcaption>");
        if let Some(author) = author {
            out.push_str(&format!("<p class=\"fr-quote__author\">{}</p>", html_escape(author)));
        }
        if let Some(title) = title {
            out.push_str(&format!("<cite>{}</cite>", html_escape(title)));
        }
        out.push_str("</figcaption>");
    }
    out.push_str("</figure>");
    out
}

fn render_anchor(value: &BlockValue) -> String {
    match field_text(value, "anchor_id").filter(|a| !a.trim().is_empty()) {
        Some(id) => format!("<a id=\"{}\"></a>", html_escape(id.trim())),
        None => String::new(),
    }
}

fn render_iframe(value: &BlockValue) -> String {
    let url = field_text(value, "url").unwrap_or("");
    if !is_safe_url(url) {
        return String::new();
    }
    let title = field_text(value, "title").unwrap_or("");
    let height = match value.field("height") {
        Some(BlockValue::Scalar(ScalarValue::Integer(h))) if *h > 0 => *h,
        _ => 500,
    };
    format!(
        "<iframe title=\"{}\" src=\"{}\" height=\"{height}\" width=\"100%\"></iframe>",
        html_escape(title),
        html_escape(url)
    )
}

fn render_video(value: &BlockValue, ctx: &RenderContext) -> String {
    let url = field_text(value, "url").unwrap_or("");
    if url.is_empty() {
        return String::new();
    }
    let title = field_text(value, "title").unwrap_or("");
    let escaped_url = html_escape(url);

    let mut out = String::from("<figure class=\"fr-content-media\">");
    if is_whitelisted_embed(url) {
        out.push_str(&format!(
            "<iframe title=\"{}\" src=\"{escaped_url}\" frameborder=\"0\" allowfullscreen></iframe>",
            html_escape(title)
        ));
    } else if is_safe_url(url) {
        out.push_str(&format!("<a href=\"{escaped_url}\">{escaped_url}</a>"));
    } else {
        // Reject non-http(s) URLs (e.g., javascript:)
        return String::new();
    }
    if let Some(caption) = field_text(value, "caption").filter(|c| !c.trim().is_empty()) {
        out.push_str(&format!("<figcaption>{}</figcaption>", html_escape(caption)));
    }
    out.push_str("</figure>");
    if let Some(transcription) = value.field("transcription") {
        out.push_str(&render_struct("transcription", transcription, ctx));
    }
    out
}

fn image_ref(value: &BlockValue) -> Option<&ReferenceId> {
    match value.field("image") {
        Some(BlockValue::Scalar(ScalarValue::Reference(r))) if r.kind == ReferenceKind::Image => {
            Some(&r.id)
        }
        _ => None,
    }
}

fn field_text<'a>(value: &'a BlockValue, name: &str) -> Option<&'a str> {
    value.field(name).and_then(BlockValue::as_str)
}

fn heading_tag(value: &BlockValue) -> &str {
    field_text(value, "heading_tag")
        .filter(|t| HEADING_TAGS.contains(t))
        .unwrap_or("h3")
}
