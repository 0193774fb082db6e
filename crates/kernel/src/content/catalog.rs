//! Standard block library.
//!
//! Field names follow the stored JSON of existing sites, so pages exported
//! from them parse unchanged. Shared building blocks (links, buttons, badge
//! and tag lists, image choosers) are plain constructor functions; every
//! call returns a fresh owned subtree.

use serde_json::json;

use super::schema::{BlockType, ReferenceKind};

pub const COMMON_CATALOG: &str = "common";
pub const HERO_CATALOG: &str = "hero";

const GROUP_COMPONENTS: &str = "2. DSFR components";
const GROUP_STRUCTURE: &str = "3. Page structure";
const GROUP_SITE: &str = "4. Website structure";
const GROUP_EXPERT: &str = "5. Expert syntax";

const HEADING_CHOICES: &[(&str, &str)] = &[
    ("h2", "Heading 2"),
    ("h3", "Heading 3"),
    ("h4", "Heading 4"),
    ("h5", "Heading 5"),
    ("h6", "Heading 6"),
    ("p", "Paragraph"),
];

const LEVEL_CHOICES: &[(&str, &str)] = &[
    ("error", "Error"),
    ("success", "Success"),
    ("info", "Information"),
    ("warning", "Warning"),
];

const COLOR_CHOICES: &[(&str, &str)] = &[
    ("fr-callout--green-tilleul-verveine", "Tilleul verveine"),
    ("fr-callout--green-bourgeon", "Bourgeon"),
    ("fr-callout--green-emeraude", "Émeraude"),
    ("fr-callout--blue-ecume", "Écume"),
    ("fr-callout--purple-glycine", "Glycine"),
    ("fr-callout--pink-macaron", "Macaron"),
    ("fr-callout--yellow-tournesol", "Tournesol"),
    ("fr-callout--orange-terre-battue", "Terre battue"),
    ("fr-callout--brown-cafe-creme", "Café crème"),
    ("fr-callout--beige-gris-galet", "Gris galet"),
];

const BACKGROUND_CHOICES: &[(&str, &str)] = &[
    ("", "No background"),
    ("fr-background-alt--grey", "Grey"),
    ("fr-background-alt--blue-france", "Blue France"),
    ("fr-background-alt--red-marianne", "Red Marianne"),
    ("fr-background-alt--green-tilleul-verveine", "Tilleul verveine"),
    ("fr-background-alt--blue-ecume", "Écume"),
];

const RATIO_CHOICES: &[(&str, &str)] = &[
    ("fr-ratio-16x9", "16x9"),
    ("fr-ratio-3x2", "3x2"),
    ("fr-ratio-4x3", "4x3"),
    ("fr-ratio-1x1", "Square"),
    ("fr-ratio-3x4", "3x4"),
    ("fr-ratio-2x3", "2x3"),
];

const BUTTON_TYPE_CHOICES: &[(&str, &str)] = &[
    ("fr-btn", "Primary"),
    ("fr-btn fr-btn--secondary", "Secondary"),
    ("fr-btn fr-btn--tertiary", "Tertiary"),
    ("fr-btn fr-btn--tertiary-no-outline", "Tertiary without border"),
];

const LINK_TYPE_CHOICES: &[(&str, &str)] = &[
    ("page", "Page"),
    ("external_url", "External URL"),
    ("document", "Document"),
    ("anchor", "Anchor link"),
];

fn heading_tag() -> BlockType {
    BlockType::choice("heading_tag", HEADING_CHOICES).with_default(json!("h3"))
}

fn color() -> BlockType {
    BlockType::choice("color", COLOR_CHOICES).optional()
}

fn margin(name: &str) -> BlockType {
    BlockType::integer(name, Some(0), Some(15))
        .with_default(json!(3))
        .optional()
}

fn background_color_class() -> BlockType {
    BlockType::choice("bg_color_class", BACKGROUND_CHOICES).optional()
}

fn image_chooser(name: &str) -> BlockType {
    BlockType::reference(name, ReferenceKind::Image)
}

/// Image with its own accessibility text.
fn image_with_alt(name: &str) -> BlockType {
    BlockType::structure(
        name,
        vec![
            image_chooser("image"),
            BlockType::text("alt_text").optional(),
            BlockType::boolean("decorative"),
        ],
    )
}

fn link_fields() -> Vec<BlockType> {
    vec![
        BlockType::choice("link_type", LINK_TYPE_CHOICES).optional(),
        BlockType::reference("page", ReferenceKind::Page).optional(),
        BlockType::reference("document", ReferenceKind::Document).optional(),
        BlockType::url("external_url").optional(),
        BlockType::text("anchor").optional(),
    ]
}

fn link_without_label(name: &str) -> BlockType {
    BlockType::structure(name, link_fields())
}

fn link(name: &str) -> BlockType {
    let mut fields = link_fields();
    fields.push(BlockType::text("text").optional().with_label("Link label"));
    BlockType::structure(name, fields)
}

fn button(name: &str) -> BlockType {
    let mut fields = link_fields();
    fields.extend([
        BlockType::text("text").optional().with_label("Button label"),
        BlockType::choice("button_type", BUTTON_TYPE_CHOICES).optional(),
        BlockType::text("icon_class").optional().with_label("Icon"),
        BlockType::choice("icon_side", &[("--", "No icon"), ("fr-btn--icon-left", "Left"), ("fr-btn--icon-right", "Right")])
            .optional(),
    ]);
    BlockType::structure(name, fields)
}

fn buttons_stream(name: &str) -> BlockType {
    BlockType::stream(name, vec![button("button")])
}

fn badges_list(name: &str) -> BlockType {
    BlockType::stream(
        name,
        vec![BlockType::structure(
            "badge",
            vec![
                BlockType::text("text").optional().with_label("Badge label"),
                BlockType::choice(
                    "color",
                    &[
                        ("error", "Error"),
                        ("success", "Success"),
                        ("info", "Information"),
                        ("warning", "Warning"),
                        ("new", "New"),
                    ],
                )
                .optional(),
                BlockType::boolean("hide_icon"),
            ],
        )],
    )
}

fn tags_list(name: &str) -> BlockType {
    BlockType::stream(
        name,
        vec![BlockType::structure(
            "tag",
            vec![
                BlockType::text("label").with_label("Title"),
                BlockType::boolean("is_small"),
                BlockType::choice("color", COLOR_CHOICES).optional(),
                BlockType::text("icon_class").optional(),
                link_without_label("link").optional(),
            ],
        )],
    )
}

fn badges_or_tags(name: &str) -> BlockType {
    BlockType::stream(name, vec![badges_list("badges"), tags_list("tags")])
        .max_num(1)
        .optional()
}

fn centered_image() -> BlockType {
    BlockType::structure(
        "image",
        vec![
            BlockType::text("title").optional(),
            heading_tag().optional(),
            image_chooser("image"),
            BlockType::text("alt").optional(),
            BlockType::choice("width", &[("", "Full width"), ("fr-content-media--sm", "Small"), ("fr-content-media--lg", "Large")])
                .optional(),
            BlockType::choice("image_ratio", RATIO_CHOICES).optional(),
            BlockType::text("caption").optional(),
            BlockType::url("url").optional().with_label("Link"),
        ],
    )
    .with_label("Centered image")
}

fn image_and_text(name: &str) -> BlockType {
    BlockType::structure(
        name,
        vec![
            image_with_alt("image"),
            BlockType::choice(
                "image_side",
                &[
                    ("left", "Left"),
                    ("left_below", "Left (below text on mobile)"),
                    ("right", "Right"),
                    ("right_above", "Right (above text on mobile)"),
                ],
            )
            .with_default(json!("right")),
            BlockType::choice("image_ratio", &[("3", "3/12"), ("4", "4/12"), ("5", "5/12"), ("6", "6/12")])
                .with_default(json!("3")),
            BlockType::rich_text("text"),
            link("link").optional(),
            BlockType::text("link_label").optional().in_group("obsolete"),
            BlockType::reference("page", ReferenceKind::Page).optional().in_group("obsolete"),
            BlockType::url("link_url").optional().in_group("obsolete"),
        ],
    )
    .with_label("Image and text")
}

fn alert() -> BlockType {
    BlockType::structure(
        "alert",
        vec![
            BlockType::text("title").optional().with_label("Message title"),
            BlockType::text("description").optional().with_label("Message text"),
            BlockType::choice("level", LEVEL_CHOICES).with_label("Message type"),
            heading_tag(),
        ],
    )
    .with_label("Alert message")
}

fn text_cta() -> BlockType {
    BlockType::structure(
        "text_cta",
        vec![
            BlockType::rich_text("text").optional(),
            BlockType::stream("cta_buttons", vec![buttons_stream("buttons")])
                .max_num(1)
                .optional(),
            BlockType::text("cta_label").optional().in_group("obsolete"),
            BlockType::text("cta_url").optional().in_group("obsolete"),
        ],
    )
    .with_label("Text and call to action")
}

fn transcription(name: &str) -> BlockType {
    BlockType::structure(
        name,
        vec![
            BlockType::text("title").optional().with_default(json!("Transcription")),
            BlockType::rich_text("content").optional(),
        ],
    )
}

fn video() -> BlockType {
    BlockType::structure(
        "video",
        vec![
            BlockType::text("title").optional().with_label("Video title"),
            BlockType::text("caption").optional(),
            BlockType::url("url").with_label("Video URL"),
            BlockType::choice("width", &[("", "Full width"), ("fr-content-media--sm", "Small"), ("fr-content-media--lg", "Large")])
                .optional(),
            BlockType::choice("video_ratio", RATIO_CHOICES).optional(),
            transcription("transcription").optional(),
        ],
    )
}

fn buttons_list() -> BlockType {
    BlockType::structure(
        "buttons_list",
        vec![
            buttons_stream("buttons"),
            BlockType::choice(
                "position",
                &[("", "Left"), ("fr-btns-group--center", "Center"), ("fr-btns-group--right", "Right")],
            )
            .optional(),
        ],
    )
    .with_label("Button list")
}

fn single_link() -> BlockType {
    let mut fields = link_fields();
    fields.extend([
        BlockType::text("text").optional().with_label("Link label"),
        BlockType::choice("icon", &[("", "No icon"), ("fr-link--icon-left", "Left"), ("fr-link--icon-right", "Right")])
            .optional(),
        BlockType::choice("size", &[("fr-link--sm", "Small"), ("", "Medium"), ("fr-link--lg", "Large")]).optional(),
    ]);
    BlockType::structure("link", fields).with_label("Single link")
}

fn accordions() -> BlockType {
    BlockType::stream(
        "accordions",
        vec![
            BlockType::text("title"),
            BlockType::structure(
                "accordion",
                vec![BlockType::text("title"), BlockType::rich_text("content")],
            )
            .min_num(1)
            .max_num(15),
        ],
    )
    .in_group(GROUP_COMPONENTS)
}

fn callout() -> BlockType {
    BlockType::structure(
        "callout",
        vec![
            BlockType::text("title").optional(),
            heading_tag(),
            BlockType::text("icon_class").optional().with_label("Icon"),
            BlockType::rich_text("text").optional().with_label("Content"),
            button("button").optional(),
            color(),
        ],
    )
    .in_group(GROUP_COMPONENTS)
}

fn highlight() -> BlockType {
    BlockType::structure(
        "highlight",
        vec![
            BlockType::rich_text("text").with_label("Content"),
            color(),
            BlockType::choice("size", &[("sm", "Small"), ("", "Medium"), ("lg", "Large")]).optional(),
        ],
    )
    .in_group(GROUP_COMPONENTS)
}

fn quote() -> BlockType {
    BlockType::structure(
        "quote",
        vec![
            image_chooser("image").optional(),
            BlockType::text("quote"),
            BlockType::text("author_name").optional(),
            BlockType::text("author_title").optional(),
            color(),
        ],
    )
    .in_group(GROUP_COMPONENTS)
}

fn stepper() -> BlockType {
    BlockType::structure(
        "stepper",
        vec![
            BlockType::text("title"),
            BlockType::integer("total", Some(1), Some(8)).with_label("Number of steps"),
            BlockType::integer("current", Some(1), Some(8)).with_label("Current step"),
            BlockType::stream(
                "steps",
                vec![BlockType::structure(
                    "step",
                    vec![BlockType::text("title"), BlockType::text("detail").optional()],
                )],
            ),
        ],
    )
    .in_group(GROUP_COMPONENTS)
}

fn card_fields() -> Vec<BlockType> {
    vec![
        BlockType::text("title"),
        heading_tag(),
        BlockType::rich_text("description").optional().with_label("Content"),
        image_chooser("image").optional(),
        BlockType::choice("image_ratio", RATIO_CHOICES).optional(),
        badges_list("image_badge").optional(),
        link_without_label("link").optional(),
        BlockType::url("url").optional().in_group("obsolete"),
        BlockType::reference("document", ReferenceKind::Document).optional().in_group("obsolete"),
        BlockType::text("top_detail_text").optional(),
        BlockType::text("top_detail_icon").optional(),
        badges_or_tags("top_detail_badges_tags"),
        BlockType::text("bottom_detail_text").optional(),
        BlockType::text("bottom_detail_icon").optional(),
        BlockType::stream(
            "call_to_action",
            vec![
                BlockType::stream("links", vec![link("link")]),
                buttons_stream("buttons"),
            ],
        )
        .max_num(1)
        .optional(),
        BlockType::boolean("grey_background"),
        BlockType::boolean("no_background"),
        BlockType::boolean("no_border"),
        BlockType::boolean("shadow"),
    ]
}

fn card(label: &str) -> BlockType {
    BlockType::structure("card", card_fields())
        .with_label(label)
        .in_group(GROUP_COMPONENTS)
}

fn tile() -> BlockType {
    BlockType::structure(
        "tile",
        vec![
            BlockType::text("title"),
            heading_tag(),
            BlockType::rich_text("description").optional(),
            image_chooser("image").optional(),
            link_without_label("link").optional(),
            badges_or_tags("top_detail_badges_tags"),
            BlockType::text("detail_text").optional(),
            BlockType::boolean("is_small"),
            BlockType::boolean("grey_background"),
            BlockType::boolean("no_background"),
            BlockType::boolean("no_border"),
            BlockType::boolean("shadow"),
            BlockType::boolean("is_horizontal"),
        ],
    )
    .in_group(GROUP_COMPONENTS)
}

fn iframe() -> BlockType {
    BlockType::structure(
        "iframe",
        vec![
            BlockType::text("title"),
            BlockType::url("url"),
            BlockType::integer("height", Some(1), None).with_label("Height (in pixels)"),
            BlockType::text("parameters").optional(),
        ],
    )
    .in_group(GROUP_EXPERT)
}

fn anchor() -> BlockType {
    BlockType::structure("anchor", vec![BlockType::text("anchor_id")]).in_group(GROUP_STRUCTURE)
}

fn separator() -> BlockType {
    BlockType::structure("separator", vec![margin("top_margin"), margin("bottom_margin")])
        .in_group(GROUP_STRUCTURE)
}

/// Leaf blocks allowed inside layout containers.
fn nested_blocks() -> Vec<BlockType> {
    vec![
        BlockType::rich_text("text").with_label("Rich text"),
        centered_image(),
        image_and_text("imageandtext"),
        alert(),
        text_cta(),
        video(),
        transcription("transcription"),
        badges_list("badges_list"),
        tags_list("tags_list"),
        buttons_list(),
        accordions(),
        callout(),
        highlight(),
        quote(),
        stepper(),
        single_link(),
        tile(),
        BlockType::markdown("markdown").in_group(GROUP_EXPERT),
        iframe(),
        BlockType::raw_html("html").in_group(GROUP_EXPERT),
        anchor(),
        separator(),
    ]
}

fn column_content(name: &str) -> BlockType {
    let mut blocks = nested_blocks();
    blocks.push(card("Vertical card"));
    BlockType::stream(name, blocks)
}

fn multicolumns() -> BlockType {
    let mut columns = nested_blocks();
    columns.push(card("Vertical card"));
    columns.push(
        BlockType::structure(
            "column",
            vec![
                BlockType::choice(
                    "width",
                    &[("3", "3/12"), ("4", "4/12"), ("6", "6/12"), ("8", "8/12"), ("12", "12/12")],
                )
                .with_default(json!("6")),
                column_content("content"),
            ],
        )
        .with_label("Adjustable column"),
    );

    BlockType::structure(
        "multicolumns",
        vec![
            image_chooser("bg_image").optional().with_label("Background image"),
            background_color_class(),
            BlockType::text("title").optional(),
            heading_tag(),
            margin("top_margin"),
            margin("bottom_margin"),
            BlockType::choice("vertical_align", &[("", "Top"), ("fr-grid-row--middle", "Middle"), ("fr-grid-row--bottom", "Bottom")])
                .optional(),
            BlockType::stream("columns", columns),
        ],
    )
    .with_label("Multiple columns")
    .in_group(GROUP_STRUCTURE)
}

fn fullwidthbackground() -> BlockType {
    let mut content = nested_blocks();
    content.push(image_and_text("image_and_text"));
    content.push(card("Horizontal card"));

    BlockType::structure(
        "fullwidthbackground",
        vec![
            image_chooser("bg_image").optional().with_label("Background image"),
            background_color_class(),
            margin("top_margin"),
            margin("bottom_margin"),
            BlockType::stream("content", content),
        ],
    )
    .with_label("Full width background")
    .in_group(GROUP_STRUCTURE)
}

/// Members of the common catalog, in editor order.
pub fn common_blocks() -> Vec<BlockType> {
    vec![
        BlockType::rich_text("paragraph").with_label("Rich text"),
        centered_image(),
        image_and_text("imageandtext"),
        alert(),
        text_cta(),
        video(),
        transcription("transcription"),
        badges_list("badges_list").with_label("Badge list"),
        tags_list("tags_list").with_label("Tag list"),
        buttons_list(),
        single_link(),
        accordions(),
        callout(),
        highlight(),
        quote(),
        stepper(),
        card("Horizontal card"),
        tile(),
        BlockType::markdown("markdown").in_group(GROUP_EXPERT),
        iframe(),
        BlockType::raw_html("html").in_group(GROUP_EXPERT),
        anchor(),
        separator(),
        multicolumns(),
        fullwidthbackground(),
        BlockType::static_block("subpageslist")
            .with_label("Subpages list")
            .in_group(GROUP_SITE),
    ]
}

fn text_content(positions: &[(&str, &str)], default: &str) -> BlockType {
    BlockType::structure(
        "text_content",
        vec![
            BlockType::text("hero_title").optional().with_label("Title"),
            BlockType::rich_text("hero_subtitle").optional().with_label("Subtitle"),
            BlockType::choice("position", positions).with_default(json!(default)),
        ],
    )
}

fn hero_layout() -> BlockType {
    BlockType::structure(
        "layout",
        vec![
            BlockType::choice("background_color", BACKGROUND_CHOICES).optional(),
            margin("top_margin"),
            margin("bottom_margin"),
        ],
    )
}

fn hero_buttons() -> BlockType {
    BlockType::list("buttons", button("button")).max_num(4).optional()
}

const IMAGE_POSITIONS: &[(&str, &str)] = &[("", "Centered"), ("top", "Top"), ("bottom", "Bottom")];

fn hero_text_image() -> BlockType {
    BlockType::structure(
        "hero_text_image",
        vec![
            text_content(&[("left", "Left"), ("right", "Right")], "left"),
            hero_buttons(),
            image_with_alt("image").with_label("Hero image"),
            hero_layout(),
        ],
    )
    .with_label("Header with an image and text")
}

fn hero_text_wide_image() -> BlockType {
    BlockType::structure(
        "hero_text_wide_image",
        vec![
            text_content(&[("top", "Top"), ("center", "Center"), ("bottom", "Bottom")], "center"),
            hero_layout(),
            hero_buttons(),
            BlockType::structure(
                "image",
                vec![
                    image_with_alt("image"),
                    BlockType::choice("image_positioning", IMAGE_POSITIONS).optional(),
                    BlockType::choice("image_width", &[("", "Full width"), ("fr-container", "Container")]).optional(),
                    BlockType::choice("image_ratio", RATIO_CHOICES).optional(),
                ],
            ),
        ],
    )
    .with_label("Vertical header with a banner and text")
}

fn hero_text_background_image() -> BlockType {
    BlockType::structure(
        "hero_text_background_image",
        vec![
            text_content(
                &[("", "Left"), ("center", "Center"), ("right", "Right")],
                "",
            ),
            hero_buttons(),
            BlockType::choice("background_color_or_image", &[("image", "Image"), ("color", "Color")])
                .with_default(json!("image")),
            BlockType::structure(
                "image",
                vec![
                    image_with_alt("image"),
                    BlockType::choice("image_positioning", IMAGE_POSITIONS).optional(),
                    BlockType::choice("image_mask", &[("", "None"), ("darken", "Darken"), ("lighten", "Lighten")])
                        .optional(),
                ],
            )
            .optional(),
            BlockType::choice("background_color", BACKGROUND_CHOICES).optional(),
        ],
    )
    .with_label("Header with background")
}

fn old_hero() -> BlockType {
    BlockType::structure(
        "old_hero",
        vec![
            BlockType::boolean("header_with_title"),
            image_with_alt("header_image").optional(),
            BlockType::choice("header_color_class", BACKGROUND_CHOICES).optional(),
            BlockType::boolean("header_large"),
            BlockType::boolean("header_darken"),
            BlockType::rich_text("header_cta_text").optional(),
            buttons_stream("header_cta_buttons").optional(),
        ],
    )
    .with_label("Configurable header")
}

/// Members of the hero catalog.
pub fn hero_blocks() -> Vec<BlockType> {
    vec![
        hero_text_image(),
        hero_text_wide_image(),
        hero_text_background_image(),
        old_hero(),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::content::schema::BlockKind;

    fn assert_unique_children(block: &BlockType) {
        let names = block.child_names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len(), "duplicate child in '{}'", block.name);
        match &block.kind {
            BlockKind::Struct(children) | BlockKind::Stream(children) => {
                children.iter().for_each(assert_unique_children)
            }
            BlockKind::List(item) => assert_unique_children(item),
            BlockKind::Scalar(_) => {}
        }
    }

    #[test]
    fn common_catalog_names() {
        let names: Vec<_> = common_blocks().into_iter().map(|b| b.name).collect();
        assert_eq!(names.len(), 26);
        assert_eq!(names.first().map(String::as_str), Some("paragraph"));
        assert_eq!(names.last().map(String::as_str), Some("subpageslist"));
        for expected in ["imageandtext", "multicolumns", "fullwidthbackground", "stepper"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[test]
    fn child_names_are_unique_at_every_level() {
        for block in common_blocks().iter().chain(hero_blocks().iter()) {
            assert_unique_children(block);
        }
    }

    #[test]
    fn multicolumns_nests_column_content() {
        let block = multicolumns();
        let columns = block.child("columns").unwrap();
        let column = columns.child("column").unwrap();
        assert!(column.child("content").unwrap().child("text").is_some());
        assert!(block.child("bg_image").is_some());
    }

    #[test]
    fn hero_catalog_names() {
        let names: Vec<_> = hero_blocks().into_iter().map(|b| b.name).collect();
        assert_eq!(
            names,
            vec!["hero_text_image", "hero_text_wide_image", "hero_text_background_image", "old_hero"]
        );
    }
}
