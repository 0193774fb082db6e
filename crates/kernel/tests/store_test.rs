#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Store contract, run against every backend.
//!
//! The in-memory store is always checked. PostgreSQL is checked when
//! `DATABASE_URL` is set; each run works in its own locale so it does not
//! collide with data left by earlier runs.

use serde_json::json;
use uuid::Uuid;

use faciles_kernel::config::Config;
use faciles_kernel::models::{CreatePage, NewImage, PageHeader, PageRecord};
use faciles_kernel::store::{MediaStore, MemoryStore, PageStore, PgStore};

/// Connected and migrated store, or `None` without `DATABASE_URL`.
async fn postgres() -> Option<PgStore> {
    let config = Config::from_env().unwrap();
    if config.database_url.is_none() {
        eprintln!("DATABASE_URL not set, skipping PostgreSQL store checks");
        return None;
    }
    let store = PgStore::connect(&config).await.unwrap();
    store.ensure_schema().await.unwrap();
    Some(store)
}

fn run_locale() -> String {
    format!("t{}", &Uuid::now_v7().simple().to_string()[24..])
}

fn page(slug: &str, parent_id: Option<Uuid>, locale: &str) -> PageRecord {
    PageRecord::from_input(
        CreatePage {
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            parent_id,
            locale: Some(locale.to_string()),
            body: json!([{ "type": "paragraph", "value": "<p>Texte</p>" }]),
            ..Default::default()
        },
        "fr",
        "fingerprint".to_string(),
    )
}

fn new_image(title: &str, hash: &str) -> NewImage {
    NewImage {
        title: title.to_string(),
        filename: format!("{title}.png"),
        uri: format!("local://original_images/{title}.png"),
        file_hash: hash.to_string(),
        collection: None,
    }
}

async fn pages_round_trip(store: &dyn PageStore) {
    let locale = run_locale();
    let mut home = page("home", None, &locale);
    home.header = PageHeader {
        header_image: Some(12),
        header_with_title: true,
        header_color_class: Some("blue-france".to_string()),
        header_large: true,
        header_darken: false,
        header_cta_text: Some("Découvrir".to_string()),
    };
    home.source_url = Some(format!("https://source.example/{locale}/home/"));
    store.insert_page(&home).await.unwrap();

    let found = store.find_page(home.id).await.unwrap().unwrap();
    assert_eq!(found.slug, "home");
    assert_eq!(found.locale, locale);
    assert_eq!(found.body, home.body);
    assert_eq!(found.header.header_image, Some(12));
    assert!(found.header.header_with_title);
    assert_eq!(found.header.header_color_class.as_deref(), Some("blue-france"));
    assert_eq!(found.header.header_cta_text.as_deref(), Some("Découvrir"));
    assert_eq!(found.schema_fingerprint, "fingerprint");

    let by_slug = store.find_by_slug("home", &locale).await.unwrap().unwrap();
    assert_eq!(by_slug.id, home.id);
    assert!(store.find_by_slug("home", "xx").await.unwrap().is_none());
    let by_url = store
        .find_by_source_url(home.source_url.as_deref().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_url.id, home.id);
    assert_eq!(store.root_page(&locale).await.unwrap().unwrap().id, home.id);

    let first = page("first", Some(home.id), &locale);
    let second = page("second", Some(home.id), &locale);
    store.insert_page(&first).await.unwrap();
    store.insert_page(&second).await.unwrap();
    let children: Vec<Uuid> = store
        .children(home.id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(children, [first.id, second.id]);

    let mut renamed = found.clone();
    renamed.title = "Accueil".to_string();
    renamed.body = json!([]);
    store.update_page(&renamed).await.unwrap();
    let reloaded = store.find_page(home.id).await.unwrap().unwrap();
    assert_eq!(reloaded.title, "Accueil");
    assert_eq!(reloaded.body, json!([]));

    assert!(store.update_page(&page("ghost", None, &locale)).await.is_err());
}

async fn slugs_are_unique_per_locale(store: &dyn PageStore) {
    let locale = run_locale();
    let home = page("home", None, &locale);
    store.insert_page(&home).await.unwrap();
    assert!(store.insert_page(&page("home", None, &locale)).await.is_err());
    store.insert_page(&page("home", None, &run_locale())).await.unwrap();

    let mut contact = page("contact", Some(home.id), &locale);
    store.insert_page(&contact).await.unwrap();
    contact.slug = "home".to_string();
    assert!(store.update_page(&contact).await.is_err());

    assert!(
        store
            .insert_page(&page("orphan", Some(Uuid::now_v7()), &locale))
            .await
            .is_err()
    );
}

async fn delete_cascades(store: &dyn PageStore) {
    let locale = run_locale();
    let root = page("home", None, &locale);
    let child = page("child", Some(root.id), &locale);
    let grandchild = page("grandchild", Some(child.id), &locale);
    let other = page("other", Some(root.id), &locale);
    for p in [&root, &child, &grandchild, &other] {
        store.insert_page(p).await.unwrap();
    }
    store.save_revision(&grandchild.snapshot(None)).await.unwrap();
    store.save_revision(&other.snapshot(None)).await.unwrap();

    assert!(store.delete_page(child.id).await.unwrap());
    assert!(store.find_page(child.id).await.unwrap().is_none());
    assert!(store.find_page(grandchild.id).await.unwrap().is_none());
    assert!(store.revisions(grandchild.id).await.unwrap().is_empty());
    assert_eq!(store.revisions(other.id).await.unwrap().len(), 1);
    assert!(!store.delete_page(child.id).await.unwrap());
}

async fn revisions_newest_first(store: &dyn PageStore) {
    let locale = run_locale();
    let mut news = page("news", None, &locale);
    store.insert_page(&news).await.unwrap();

    let first = news.snapshot(Some("first".to_string()));
    store.save_revision(&first).await.unwrap();
    news.title = "Actualités".to_string();
    let mut second = news.snapshot(Some("second".to_string()));
    second.created = first.created + 1;
    store.save_revision(&second).await.unwrap();

    let revisions = store.revisions(news.id).await.unwrap();
    let logs: Vec<_> = revisions.iter().map(|r| r.log.as_deref()).collect();
    assert_eq!(logs, [Some("second"), Some("first")]);
    assert_eq!(revisions[0].title, "Actualités");

    let found = store.find_revision(first.id).await.unwrap().unwrap();
    assert_eq!(found.page_id, news.id);
    assert_eq!(found.body, news.body);
    assert!(store.find_revision(Uuid::now_v7()).await.unwrap().is_none());

    let stray = page("stray", None, &locale).snapshot(None);
    assert!(store.save_revision(&stray).await.is_err());
}

async fn images_are_found_by_id_hash_and_title(store: &dyn MediaStore) {
    let run = Uuid::now_v7().simple().to_string();
    let a = store
        .insert_image(new_image(&format!("a-{run}"), &format!("h1-{run}")))
        .await
        .unwrap();
    let b = store
        .insert_image(new_image(&format!("b-{run}"), &format!("h2-{run}")))
        .await
        .unwrap();
    assert!(b.id > a.id);
    assert_eq!(a.collection, "root");

    assert_eq!(store.find_image(b.id).await.unwrap(), Some(b.clone()));
    assert_eq!(
        store.find_image_by_hash(&format!("h2-{run}")).await.unwrap(),
        Some(b.clone())
    );
    assert_eq!(
        store.find_image_by_title(&format!("a-{run}")).await.unwrap(),
        Some(a.clone())
    );
    assert!(store.find_image_by_hash("no-such-hash").await.unwrap().is_none());

    let listed = store.list_images().await.unwrap();
    assert!(listed.contains(&a));
    assert!(listed.contains(&b));
}

#[tokio::test]
async fn memory_store_round_trips_pages() {
    pages_round_trip(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_store_enforces_unique_slugs() {
    slugs_are_unique_per_locale(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_store_cascades_deletes() {
    delete_cascades(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_store_orders_revisions() {
    revisions_newest_first(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_store_finds_images() {
    images_are_found_by_id_hash_and_title(&MemoryStore::new()).await;
}

#[tokio::test]
async fn pg_store_round_trips_pages() {
    if let Some(store) = postgres().await {
        pages_round_trip(&store).await;
    }
}

#[tokio::test]
async fn pg_store_enforces_unique_slugs() {
    if let Some(store) = postgres().await {
        slugs_are_unique_per_locale(&store).await;
    }
}

#[tokio::test]
async fn pg_store_cascades_deletes() {
    if let Some(store) = postgres().await {
        delete_cascades(&store).await;
    }
}

#[tokio::test]
async fn pg_store_orders_revisions() {
    if let Some(store) = postgres().await {
        revisions_newest_first(&store).await;
    }
}

#[tokio::test]
async fn pg_store_finds_images() {
    if let Some(store) = postgres().await {
        images_are_found_by_id_hash_and_title(&store).await;
    }
}
