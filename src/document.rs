//! Search-document assembly.
//!
//! Turns one (entity, file path) pair into a [`GleanDocument`]: fetch the
//! raw page, drop navigation markup, pick a title and update time, and
//! attach the fixed datasource and permission values.

use std::sync::Arc;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::debug;

use crate::models::{DocumentBody, DocumentPermissions, EntityRef, GleanDocument};
use crate::techdocs::TechDocsClient;

static NAV_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("nav").expect("static selector"));

pub struct DocumentBuilder {
    techdocs: Arc<TechDocsClient>,
    datasource: String,
}

impl DocumentBuilder {
    pub fn new(techdocs: Arc<TechDocsClient>, datasource: impl Into<String>) -> Self {
        Self {
            techdocs,
            datasource: datasource.into(),
        }
    }

    /// Builds the search document for one documentation page.
    ///
    /// The only failure mode is the underlying page fetch; extraction has
    /// defined fallbacks for every missing piece.
    pub async fn build(&self, entity: &EntityRef, file_path: &str) -> Result<GleanDocument> {
        let raw_html = self
            .techdocs
            .static_file(entity, file_path)
            .await
            .with_context(|| format!("failed to fetch techdocs page {file_path}"))?;

        let text_content = strip_navigation(&raw_html);
        let title = self
            .techdocs
            .parse_title(&raw_html)
            .unwrap_or_else(|| start_case(file_path));
        let updated_at = self.techdocs.parse_updated_at(&raw_html).timestamp();

        let document = GleanDocument {
            id: format!("{}/{}", entity.name, file_path),
            title,
            container: entity.name.clone(),
            datasource: self.datasource.clone(),
            view_url: self.techdocs.view_url(entity, file_path),
            body: DocumentBody {
                mime_type: "HTML".to_string(),
                text_content,
            },
            updated_at,
            // Anyone who can sign in to the Glean instance may see the page.
            permissions: DocumentPermissions {
                allow_anonymous_access: true,
            },
        };

        debug!(id = %document.id, title = %document.title, "built document");
        Ok(document)
    }
}

/// Removes every `<nav>` element from the page, leaving all other markup
/// intact, and re-serializes the document.
pub fn strip_navigation(raw_html: &str) -> String {
    let mut document = Html::parse_document(raw_html);
    let nav_ids: Vec<_> = document
        .select(&NAV_SELECTOR)
        .map(|element| element.id())
        .collect();
    for id in nav_ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
    document.root_element().html()
}

/// Space-separated title-cased rendering of a file path, used as the title
/// fallback when a page has no heading: `"foo/index.html"` → `"Foo Index Html"`.
pub fn start_case(path: &str) -> String {
    path.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_navigation_removes_nav_elements() {
        let html = r#"<html><body>
            <nav class="md-nav"><ul><li><a href="/foo">Foo</a></li></ul></nav>
            <article><p>Welcome to the Engineering Handbook!</p></article>
        </body></html>"#;

        let stripped = strip_navigation(html);
        assert!(!stripped.contains("<nav"));
        assert!(stripped.contains("Welcome to the Engineering Handbook!"));
    }

    #[test]
    fn strip_navigation_keeps_surrounding_structure() {
        let html = "<html><body><nav>n</nav><article><h2>Keep</h2></article></body></html>";
        let stripped = strip_navigation(html);
        assert!(stripped.contains("<article>"));
        assert!(stripped.contains("<h2>Keep</h2>"));
    }

    #[test]
    fn start_case_title_cases_path_segments() {
        assert_eq!(start_case("foo/index.html"), "Foo Index Html");
        assert_eq!(start_case("onboarding.html"), "Onboarding Html");
        assert_eq!(start_case("team-handbook/faq.html"), "Team Handbook Faq Html");
    }
}
