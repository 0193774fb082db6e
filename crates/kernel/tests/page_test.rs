#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Page lifecycle through `PageService` and the in-memory store.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::TestInstance;
use faciles_kernel::content::block_types::RegistrationOptions;
use faciles_kernel::content::{
    BlockDefinition, BlockType, BlockTypeRegistry, PageService, PageServiceOptions,
    ReferenceId, RenderContext,
};
use faciles_kernel::models::{CreatePage, UpdatePage};
use faciles_kernel::store::PageStore;
use faciles_test_utils::assert;

#[derive(Debug)]
struct ContactCardBlock;

impl BlockDefinition for ContactCardBlock {
    fn type_name(&self) -> &str {
        "ContactCardBlock"
    }

    fn build(&self, options: &RegistrationOptions) -> BlockType {
        BlockType::structure(
            &options.name,
            vec![BlockType::text("name"), BlockType::text("role").optional()],
        )
    }
}

fn create(slug: &str, body: serde_json::Value) -> CreatePage {
    CreatePage {
        slug: slug.to_string(),
        title: slug.to_uppercase(),
        body,
        ..Default::default()
    }
}

#[tokio::test]
async fn pages_nest_under_the_root_page() {
    let instance = TestInstance::new("tree");
    let pages = instance.page_service();

    let (home, created) = pages.get_or_create_page(create("home", json!([]))).await.unwrap();
    assert!(created);
    assert!(home.is_root());

    let (child, _) = pages
        .get_or_create_page(create("contact", json!([])))
        .await
        .unwrap();
    assert_eq!(child.parent_id, Some(home.id));

    let (again, created) = pages
        .get_or_create_page(create("contact", json!([["paragraph", "<p>ignored</p>"]])))
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(again.id, child.id);
    assert_eq!(again.body, json!([]));
}

#[tokio::test]
async fn deleting_a_page_removes_its_subtree() {
    let instance = TestInstance::new("delete");
    let pages = instance.page_service();
    let (home, _) = pages.get_or_create_page(create("home", json!([]))).await.unwrap();
    let (section, _) = pages.get_or_create_page(create("section", json!([]))).await.unwrap();
    let (leaf, _) = pages
        .get_or_create_page(CreatePage {
            parent_id: Some(section.id),
            ..create("leaf", json!([]))
        })
        .await
        .unwrap();

    assert!(pages.delete_page(section.id).await.unwrap());
    assert!(instance.store.find_page(leaf.id).await.unwrap().is_none());
    assert!(instance.store.revisions(leaf.id).await.unwrap().is_empty());
    assert!(instance.store.find_page(home.id).await.unwrap().is_some());
    assert!(!pages.delete_page(section.id).await.unwrap());
}

#[tokio::test]
async fn older_revision_can_be_published_again() {
    let instance = TestInstance::new("revisions");
    let pages = instance.page_service();
    let (page, _) = pages
        .get_or_create_page(create("news", json!([["paragraph", "<p>First</p>"]])))
        .await
        .unwrap();
    let first_revision = page.live_revision_id.unwrap();

    let updated = pages
        .update_page(
            page.id,
            UpdatePage {
                body: Some(json!([["paragraph", "<p>Second</p>"]])),
                log: Some("rewrite".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_ne!(updated.live_revision_id, Some(first_revision));

    let revisions = instance.store.revisions(page.id).await.unwrap();
    assert_eq!(revisions.len(), 2);
    assert_eq!(revisions[0].log.as_deref(), Some("rewrite"));

    let restored = pages.publish_revision(page.id, first_revision).await.unwrap();
    assert_eq!(restored.body[0]["value"], "<p>First</p>");
    assert_eq!(restored.live_revision_id, Some(first_revision));

    let (other, _) = pages.get_or_create_page(create("other", json!([]))).await.unwrap();
    assert!(pages.publish_revision(other.id, first_revision).await.is_err());
}

#[tokio::test]
async fn bodies_with_unknown_blocks_are_rejected() {
    let instance = TestInstance::new("unknown");
    let pages = instance.page_service();

    let err = pages
        .get_or_create_page(create("bad", json!([["no_such_block", {}]])))
        .await
        .unwrap_err();
    assert::contains(&format!("{err:#}"), "no_such_block");
    assert!(instance.store.find_by_slug("bad", "fr").await.unwrap().is_none());
}

#[tokio::test]
async fn registered_block_types_are_usable_in_pages() {
    let instance = TestInstance::new("custom");
    let mut registry = BlockTypeRegistry::with_standard_types();
    let before = registry.fingerprint("common").unwrap();
    registry.register_type(ContactCardBlock, Some("contact"), Some("Contact card"), None);
    assert_ne!(registry.fingerprint("common").unwrap(), before);

    let pages = PageService::new(
        instance.store.clone(),
        Arc::new(registry),
        PageServiceOptions::default(),
    );
    let (page, _) = pages
        .get_or_create_page(create(
            "equipe",
            json!([{ "type": "contact", "value": { "name": "Camille", "role": "Référente" } }]),
        ))
        .await
        .unwrap();

    assert!(pages.is_current(&page).unwrap());
    assert!(!instance.page_service().is_current(&page).unwrap());

    let html = pages.render_page(&page, &RenderContext::new()).unwrap();
    assert::contains(&html, "Camille");
    assert::contains(&page.search_description, "Camille");
}

#[tokio::test]
async fn rendering_resolves_image_urls_from_context() {
    let instance = TestInstance::new("render");
    let pages = instance.page_service();
    let (page, _) = pages
        .get_or_create_page(create(
            "gallery",
            json!([
                { "type": "image", "value": { "image": 12, "alt": "Vue du port" } },
                { "type": "paragraph", "value": "<p>Légende</p><script>alert(1)</script>" }
            ]),
        ))
        .await
        .unwrap();

    let ctx = RenderContext::new().with_image(ReferenceId::from(12), "/media/port.jpg");
    let html = pages.render_page(&page, &ctx).unwrap();
    assert::contains(&html, "/media/port.jpg");
    assert::contains(&html, "Vue du port");
    assert::not_contains(&html, "<script>");

    // image blocks never feed the description
    assert_eq!(page.search_description, "Légende");
}
