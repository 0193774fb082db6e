//! Starter and demo pages for a fresh site.

use anyhow::{Result, bail};
use serde_json::{Value, json};
use tracing::info;

use crate::content::catalog::COMMON_CATALOG;
use crate::content::page_service::PageService;
use crate::content::value::{BlockValue, StreamChild, sample};
use crate::models::{CreatePage, PageRecord};
use crate::store::MediaStore;

pub const STARTER_SLUGS: &[&str] = &["home", "mentions-legales", "accessibilite"];

pub const DEMO_SLUG: &str = "demonstration-des-blocs";

/// Title of the pictogram shown on the home page, when present locally.
const HOME_PICTOGRAM_TITLE: &str = "Pictogrammes DSFR — Internet";

/// Create the starter pages named by `slugs` (all of them when empty).
///
/// Existing pages are left alone. The home page is created first so the
/// others can attach under it.
pub async fn create_starter_pages(
    pages: &PageService,
    media: &dyn MediaStore,
    slugs: &[String],
) -> Result<Vec<(PageRecord, bool)>> {
    let mut wanted: Vec<&str> = if slugs.is_empty() {
        STARTER_SLUGS.to_vec()
    } else {
        slugs.iter().map(String::as_str).collect()
    };
    if let Some(unknown) = wanted.iter().find(|s| !STARTER_SLUGS.contains(s)) {
        bail!("unknown starter page '{unknown}', expected one of {STARTER_SLUGS:?}");
    }
    wanted.sort_by_key(|slug| STARTER_SLUGS.iter().position(|s| s == slug));
    wanted.dedup();

    let mut results = Vec::with_capacity(wanted.len());
    for slug in wanted {
        let input = match slug {
            "home" => home_page(media).await?,
            "mentions-legales" => legal_notice_page(),
            _ => accessibility_page(),
        };
        let (page, created) = pages.get_or_create_page(input).await?;
        if created {
            info!(slug = %page.slug, page_id = %page.id, "starter page created");
        }
        results.push((page, created));
    }
    Ok(results)
}

async fn home_page(media: &dyn MediaStore) -> Result<CreatePage> {
    let pictogram = media
        .find_image_by_title(HOME_PICTOGRAM_TITLE)
        .await?
        .map(|image| json!(image.id))
        .unwrap_or(Value::Null);

    let body = json!([
        {
            "type": "imageandtext",
            "value": {
                "image": { "image": pictogram, "alt_text": "", "decorative": true },
                "image_ratio": "3",
                "text": "<p>Bienvenue !</p>\
                         <p>Vous venez de créer un site utilisant le gestionnaire de contenus de l’État.</p>\
                         <p>Vous pouvez maintenant vous connecter dans l’administration et personnaliser le site.</p>",
                "link_url": "/admin/",
                "link_label": "Gérer le site"
            }
        },
        {
            "type": "paragraph",
            "value": "<p>En particulier, vous devrez :</p>\
                      <ul>\
                      <li>Configurer le site dans Configuration > Configuration du site</li>\
                      <li>Remplacer le contenu de la page de mentions légales</li>\
                      <li>Remplacer le contenu de cette page d’accueil.</li>\
                      </ul>"
        }
    ]);

    Ok(CreatePage {
        slug: "home".to_string(),
        title: "Votre nouveau site avec Sites faciles".to_string(),
        body,
        ..Default::default()
    })
}

fn legal_notice_page() -> CreatePage {
    let title = "Mentions légales";
    let body = json!([
        {
            "type": "alert",
            "value": {
                "title": title,
                "description": "Entrez ici les mentions légales du site.",
                "level": "info",
                "heading_tag": "h2"
            }
        },
        {
            "type": "paragraph",
            "value": "<p>D’après la <a href=\"https://www.systeme-de-design.gouv.fr/elements-d-interface/composants/pied-de-page\">documentation du système de design</a>, \
                      le pied de page doit contenir a minima les quatre liens suivants :</p>\
                      <ul>\
                      <li>Accessibilité : non/partiellement/totalement conforme</li>\
                      <li>Mentions légales</li>\
                      <li>Données personnelles</li>\
                      <li>Gestion des cookies</li>\
                      </ul>\
                      <p>Ces deux derniers peuvent pointer vers des pages à part entière ou des sections de cette page.</p>"
        }
    ]);
    CreatePage {
        slug: "mentions-legales".to_string(),
        title: title.to_string(),
        body,
        ..Default::default()
    }
}

fn accessibility_page() -> CreatePage {
    let title = "Déclaration d’accessibilité";
    let body = json!([
        {
            "type": "alert",
            "value": {
                "title": title,
                "description": "Entrez ici la déclaration d’accessibilité.",
                "level": "info",
                "heading_tag": "h2"
            }
        }
    ]);
    CreatePage {
        slug: "accessibilite".to_string(),
        title: title.to_string(),
        body,
        ..Default::default()
    }
}

/// Create a page holding one sampled block of every common block type.
pub async fn create_demo_page(pages: &PageService) -> Result<(PageRecord, bool)> {
    let children: Vec<StreamChild> = pages
        .registry()
        .get_schema(COMMON_CATALOG)?
        .iter()
        .map(|block| StreamChild::new(&block.name, sample(block)))
        .collect();
    let body = BlockValue::Stream(children).to_json();

    let (page, created) = pages
        .get_or_create_page(CreatePage {
            slug: DEMO_SLUG.to_string(),
            title: "Démonstration des blocs".to_string(),
            body,
            search_description: Some("Un exemple de chaque bloc disponible.".to_string()),
            ..Default::default()
        })
        .await?;
    if created {
        info!(page_id = %page.id, "demo page created");
    }
    Ok((page, created))
}
