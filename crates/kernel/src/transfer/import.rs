//! Page import.
//!
//! Imported pages land under a login-restricted templates index. A page
//! whose `source_url` is already known is updated in place; otherwise it is
//! created. Each page is imported on its own: one failure does not roll
//! back the others. Links between imported pages are rewritten to the new
//! local pages once the whole batch is in.

use std::collections::HashSet;

use serde_json::{Value, json};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::interchange::PagesData;
use crate::content::catalog::COMMON_CATALOG;
use crate::content::page_service::PageService;
use crate::content::references::{
    MissingReferencePolicy, ReferenceMap, clear_references, collect_references, remap_references,
    remap_references_of,
};
use crate::content::schema::ReferenceKind;
use crate::content::value::{BlockValue, ReferenceId, to_value};
use crate::error::{ImportError, ImportResult};
use crate::models::{CreatePage, PageHeader, PageRecord, UpdatePage};

pub const TEMPLATES_INDEX_SLUG: &str = "page_templates_index";
pub const TEMPLATES_INDEX_TITLE: &str = "Modèles de pages";
pub const RESTRICTION_LOGIN: &str = "login";

/// What happened to one imported page.
#[derive(Debug, Clone)]
pub enum ImportOutcome {
    Created(PageRecord),
    /// A page with the same source URL existed and was overwritten.
    Updated(PageRecord),
    /// The slug is taken by an unrelated page; nothing was written.
    SlugTaken(PageRecord),
}

impl ImportOutcome {
    pub fn page(&self) -> &PageRecord {
        match self {
            ImportOutcome::Created(p) | ImportOutcome::Updated(p) | ImportOutcome::SlugTaken(p) => p,
        }
    }
}

/// Summary of a batch import.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Source page id and error message of every failed page. A page
    /// whose links could not be resolved is listed here even though it
    /// was written.
    pub failed: Vec<(String, String)>,
    /// References dropped under the lenient policy.
    pub dropped_references: usize,
}

/// How page links are handled while preparing a page.
#[derive(Debug, Clone, Copy)]
enum Links<'a> {
    /// Remapped with every other reference.
    Remapped,
    /// Left as source ids; links into `batch` are resolved after the
    /// whole batch is written.
    Deferred(&'a HashSet<ReferenceId>),
}

/// A validated page with its references remapped.
struct PreparedPage<'a> {
    slug: &'a str,
    source_url: &'a str,
    title: &'a str,
    body: BlockValue,
    header: PageHeader,
    dropped: usize,
}

/// Imports exported pages through a [`PageService`].
#[derive(Debug, Clone)]
pub struct PageImporter {
    pages: PageService,
    policy: MissingReferencePolicy,
}

impl PageImporter {
    pub fn new(pages: PageService, policy: MissingReferencePolicy) -> Self {
        Self { pages, policy }
    }

    /// The login-restricted parent of all imported templates.
    pub async fn templates_index(&self) -> anyhow::Result<PageRecord> {
        let (page, _) = self
            .pages
            .get_or_create_page(CreatePage {
                slug: TEMPLATES_INDEX_SLUG.to_string(),
                title: TEMPLATES_INDEX_TITLE.to_string(),
                body: json!([["subpageslist", null]]),
                restriction_type: Some(RESTRICTION_LOGIN.to_string()),
                ..Default::default()
            })
            .await?;
        Ok(page)
    }

    /// Import every page of `data` under the templates index.
    ///
    /// Links between pages of the same export are resolved in a second
    /// pass, once every page has its local id. Until then those links are
    /// stored empty.
    pub async fn import_all(
        &self,
        data: &PagesData,
        references: &ReferenceMap,
    ) -> anyhow::Result<ImportReport> {
        let index = self.templates_index().await?;
        let mut report = ImportReport::default();
        let batch: HashSet<ReferenceId> = data
            .pages
            .keys()
            .map(|id| ReferenceId::from(id.as_str()))
            .collect();
        let mut links = references.clone();
        let mut linked = Vec::new();

        for (source_id, raw) in &data.pages {
            let result = match self.prepare(raw, references, Links::Deferred(&batch)) {
                Ok(mut prepared) => {
                    let pending = prepared.body.clone();
                    let has_links = clear_references(&mut prepared.body, ReferenceKind::Page) > 0;
                    self.write(prepared, index.id)
                        .await
                        .map(|(outcome, dropped)| (outcome, dropped, has_links.then_some(pending)))
                }
                Err(e) => Err(e),
            };

            match result {
                Ok((outcome, dropped, pending)) => {
                    report.dropped_references += dropped;
                    let written = match outcome {
                        ImportOutcome::Created(page) => {
                            report.created += 1;
                            Some(page)
                        }
                        ImportOutcome::Updated(page) => {
                            report.updated += 1;
                            Some(page)
                        }
                        ImportOutcome::SlugTaken(page) => {
                            warn!(source_id = %source_id, slug = %page.slug, "slug already used by another page");
                            report.skipped += 1;
                            None
                        }
                    };
                    if let Some(page) = written {
                        links.insert(
                            ReferenceKind::Page,
                            ReferenceId::from(source_id.as_str()),
                            ReferenceId::new(page.id.to_string()),
                        );
                        if let Some(body) = pending {
                            linked.push((source_id, page.id, body));
                        }
                    }
                }
                Err(e) => {
                    error!(source_id = %source_id, error = %e, "page import failed");
                    report.failed.push((source_id.clone(), e.to_string()));
                }
            }
        }

        for (source_id, page_id, mut body) in linked {
            match self.resolve_links(page_id, &mut body, &links).await {
                Ok(dropped) => report.dropped_references += dropped,
                Err(e) => {
                    error!(source_id = %source_id, error = %e, "page links could not be resolved");
                    report.failed.push((source_id.clone(), e.to_string()));
                }
            }
        }

        info!(
            created = report.created,
            updated = report.updated,
            skipped = report.skipped,
            failed = report.failed.len(),
            "pages imported"
        );
        Ok(report)
    }

    /// Import one cleaned page under `parent_id`.
    ///
    /// Every reference, page links included, must resolve through
    /// `references`. Returns the outcome and the number of references
    /// dropped under the lenient policy.
    pub async fn import_page(
        &self,
        raw: &Value,
        references: &ReferenceMap,
        parent_id: Uuid,
    ) -> ImportResult<(ImportOutcome, usize)> {
        let prepared = self.prepare(raw, references, Links::Remapped)?;
        self.write(prepared, parent_id).await
    }

    /// Validate `raw` and remap its references.
    fn prepare<'a>(
        &self,
        raw: &'a Value,
        references: &ReferenceMap,
        links: Links<'_>,
    ) -> ImportResult<PreparedPage<'a>> {
        let meta = raw
            .get("meta")
            .and_then(Value::as_object)
            .ok_or_else(|| ImportError::Malformed("missing meta object".into()))?;
        let slug = meta
            .get("slug")
            .and_then(Value::as_str)
            .ok_or_else(|| ImportError::Malformed("missing meta.slug".into()))?;
        let source_url = meta
            .get("html_url")
            .and_then(Value::as_str)
            .ok_or_else(|| ImportError::Malformed("missing meta.html_url".into()))?;
        let title = raw
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| ImportError::Malformed("missing title".into()))?;

        let schema = self
            .pages
            .registry()
            .stream_schema(COMMON_CATALOG)
            .map_err(anyhow::Error::from)?;
        let body_raw = raw.get("body").cloned().unwrap_or_else(|| json!([]));
        let mut body = to_value(&schema, &body_raw)?;
        let mut dropped = match links {
            Links::Remapped => remap_references(&mut body, references, self.policy)?,
            Links::Deferred(batch) => {
                if self.policy == MissingReferencePolicy::Strict {
                    let unresolvable = collect_references(&body).into_iter().find(|r| {
                        r.kind == ReferenceKind::Page
                            && !batch.contains(&r.id)
                            && references.get(r.kind, &r.id).is_none()
                    });
                    if let Some(r) = unresolvable {
                        return Err(ImportError::MissingReference { kind: r.kind, id: r.id });
                    }
                }
                remap_references_of(&mut body, references, self.policy, |kind| {
                    kind != ReferenceKind::Page
                })?
            }
        };

        let (header, header_dropped) = self.header(raw, references)?;
        dropped += header_dropped;

        Ok(PreparedPage {
            slug,
            source_url,
            title,
            body,
            header,
            dropped,
        })
    }

    /// Update the page imported from the same source URL, or create it.
    async fn write(
        &self,
        prepared: PreparedPage<'_>,
        parent_id: Uuid,
    ) -> ImportResult<(ImportOutcome, usize)> {
        let PreparedPage {
            slug,
            source_url,
            title,
            body,
            header,
            dropped,
        } = prepared;

        let store = self.pages.store();
        if let Some(existing) = store.find_by_source_url(source_url).await? {
            let page = self
                .pages
                .update_page(
                    existing.id,
                    UpdatePage {
                        slug: Some(slug.to_string()),
                        title: Some(title.to_string()),
                        body: Some(body.to_json()),
                        header: Some(header),
                        log: Some(format!("re-imported from {source_url}")),
                        ..Default::default()
                    },
                )
                .await?;
            info!(slug = %page.slug, source_url = %source_url, "template page updated");
            return Ok((ImportOutcome::Updated(page), dropped));
        }

        let (page, created) = self
            .pages
            .get_or_create_page(CreatePage {
                slug: slug.to_string(),
                title: title.to_string(),
                parent_id: Some(parent_id),
                body: body.to_json(),
                header,
                source_url: Some(source_url.to_string()),
                restriction_type: Some(RESTRICTION_LOGIN.to_string()),
                log: Some(format!("imported from {source_url}")),
                ..Default::default()
            })
            .await?;

        if created {
            Ok((ImportOutcome::Created(page), dropped))
        } else {
            Ok((ImportOutcome::SlugTaken(page), dropped))
        }
    }

    /// Point the page links of an imported body at their local pages and
    /// store the result.
    async fn resolve_links(
        &self,
        page_id: Uuid,
        body: &mut BlockValue,
        links: &ReferenceMap,
    ) -> ImportResult<usize> {
        let dropped = remap_references_of(body, links, self.policy, |kind| {
            kind == ReferenceKind::Page
        })?;
        let page = self
            .pages
            .update_page(
                page_id,
                UpdatePage {
                    body: Some(body.to_json()),
                    log: Some("page links resolved".to_string()),
                    ..Default::default()
                },
            )
            .await?;
        debug!(slug = %page.slug, "page links resolved");
        Ok(dropped)
    }

    /// Header fields of `raw`, with the header image remapped.
    ///
    /// Falsy source values leave the local defaults in place.
    fn header(&self, raw: &Value, references: &ReferenceMap) -> ImportResult<(PageHeader, usize)> {
        let flag = |key: &str| raw.get(key).and_then(Value::as_bool).unwrap_or(false);
        let text = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let mut header = PageHeader {
            header_image: None,
            header_with_title: flag("header_with_title"),
            header_color_class: text("header_color_class"),
            header_large: flag("header_large"),
            header_darken: flag("header_darken"),
            header_cta_text: text("header_cta_text"),
        };

        let Some(source_id) = raw
            .get("header_image")
            .and_then(|h| h.get("id"))
            .and_then(ReferenceId::from_json)
        else {
            return Ok((header, 0));
        };

        let local = references
            .get(ReferenceKind::Image, &source_id)
            .and_then(|id| id.as_str().parse::<i64>().ok());
        match (local, self.policy) {
            (Some(id), _) => {
                header.header_image = Some(id);
                Ok((header, 0))
            }
            (None, MissingReferencePolicy::Strict) => Err(ImportError::MissingReference {
                kind: ReferenceKind::Image,
                id: source_id,
            }),
            (None, MissingReferencePolicy::Lenient) => {
                warn!(id = %source_id, "dropping unmapped header image");
                Ok((header, 1))
            }
        }
    }
}
