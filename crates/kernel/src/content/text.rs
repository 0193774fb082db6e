//! Plain-text extraction from block streams.
//!
//! Used to pre-fill search descriptions and to feed search indexing. The
//! per-variant policy is fixed: media and decorative blocks contribute
//! nothing, `imageandtext` contributes its rich text, `multicolumns` is
//! walked column by column, everything else contributes its rendered HTML.

use super::block_render::{RenderContext, render_block};
use super::value::{BlockValue, StreamChild};

/// Variants that never contribute text.
const EXCLUDED_VARIANTS: &[&str] = &[
    "image", "alert", "video", "stepper", "separator", "html", "iframe",
];

/// Tags whose boundaries separate words.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Flatten `children` into a single line of plain text.
///
/// With `max_words`, output is cut to that many words and `…` is appended
/// when anything was dropped.
pub fn extract_text(children: &[StreamChild], max_words: Option<usize>) -> String {
    let mut html = String::new();
    collect_html(children, &RenderContext::new(), &mut html);

    let text = collapse_whitespace(&unescape(&strip_tags(&html)));
    match max_words {
        Some(n) => truncate_words(&text, n),
        None => text,
    }
}

fn collect_html(children: &[StreamChild], ctx: &RenderContext, out: &mut String) {
    for child in children {
        match child.block_type.as_str() {
            name if EXCLUDED_VARIANTS.contains(&name) => continue,
            "imageandtext" => {
                if let Some(text) = child.value.field("text").and_then(BlockValue::as_str) {
                    out.push_str(text);
                }
            }
            "multicolumns" => {
                if let BlockValue::Struct(fields) = &child.value {
                    for (_, field) in fields {
                        if let BlockValue::Stream(columns) = field {
                            collect_html(columns, ctx, out);
                        }
                    }
                }
            }
            _ => out.push_str(&render_block(&child.block_type, &child.value, ctx)),
        }
        out.push(' ');
    }
}

/// Remove tags. Block-level tags become a space; `script` and `style`
/// elements are dropped with their content.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
            continue;
        }

        let Some(end) = rest.find('>') else {
            // Unterminated tag: drop the remainder.
            rest = "";
            break;
        };
        let tag = &rest[1..end];
        rest = &rest[end + 1..];

        let name = tag_name(tag);
        if !tag.starts_with('/') && (name == "script" || name == "style") {
            let closing = format!("</{name}");
            let lower = rest.to_ascii_lowercase();
            rest = match lower.find(&closing) {
                Some(pos) => rest[pos..].find('>').map_or("", |gt| &rest[pos + gt + 1..]),
                None => "",
            };
            continue;
        }
        if BLOCK_TAGS.contains(&name.as_str()) {
            out.push(' ');
        }
    }
    out.push_str(rest);
    out
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Decode named and numeric character references.
///
/// Unknown or unterminated references are kept verbatim.
pub fn unescape(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return text.to_string();
    }
    format!("{}…", words[..max_words].join(" "))
}
