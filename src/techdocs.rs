//! TechDocs backend client.
//!
//! All interaction with the documentation service's HTTP API lives here:
//! collection metadata, raw static HTML pages, and catalog discovery of
//! documentation-bearing entities. The client also extracts a page title
//! and last-revised timestamp out of the generator's HTML.
//!
//! Each client owns its own [`reqwest::Client`] with connection reuse
//! disabled, so every request opens a fresh connection to the backend.
//!
//! # Authentication
//!
//! Service-to-service tokens are minted per call by a [`TokenProvider`].
//! The default [`StaticTokenProvider`] hands out fixed tokens from the
//! configuration or the `TECHDOCS_TOKEN` / `CATALOG_TOKEN` environment
//! variables; requests go unauthenticated when no token is available.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use once_cell::sync::Lazy;
use reqwest::{header, Client, RequestBuilder};
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::debug;

use crate::config::Config;
use crate::error::FetchError;
use crate::models::{EntityRef, TechDocsMetadata};

/// Target plugin id for documentation service tokens.
pub const TECHDOCS_TARGET: &str = "techdocs";
/// Target plugin id for catalog tokens.
pub const CATALOG_TARGET: &str = "catalog";

/// Catalog annotation marking an entity as carrying TechDocs.
const TECHDOCS_ANNOTATION: &str = "metadata.annotations.backstage.io/techdocs-ref";

static H1_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1").expect("static selector"));

/// Badge emitted by the git-revision-date plugin of the docs generator.
static REVISION_DATE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".git-revision-date-localized-plugin.git-revision-date-localized-plugin-date")
        .expect("static selector")
});

// ═══════════════════════════════════════════════════════════════════════
// Token provider
// ═══════════════════════════════════════════════════════════════════════

/// Supplies per-call bearer tokens for a named target plugin.
///
/// The credential exchange itself is an external collaborator; tokens are
/// opaque to this crate.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Bearer token for requests to `target`, if one is available.
    async fn plugin_token(&self, target: &str) -> Result<Option<String>>;
}

/// Token provider backed by fixed tokens from config or environment.
pub struct StaticTokenProvider {
    techdocs: Option<String>,
    catalog: Option<String>,
}

impl StaticTokenProvider {
    pub fn from_config(config: &Config) -> Self {
        Self {
            techdocs: config
                .techdocs
                .token
                .clone()
                .or_else(|| std::env::var("TECHDOCS_TOKEN").ok()),
            catalog: config
                .catalog
                .token
                .clone()
                .or_else(|| std::env::var("CATALOG_TOKEN").ok()),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn plugin_token(&self, target: &str) -> Result<Option<String>> {
        Ok(match target {
            TECHDOCS_TARGET => self.techdocs.clone(),
            CATALOG_TARGET => self.catalog.clone(),
            _ => None,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Client
// ═══════════════════════════════════════════════════════════════════════

pub struct TechDocsClient {
    techdocs_base_url: String,
    catalog_base_url: Option<String>,
    app_base_url: String,
    tokens: Arc<dyn TokenProvider>,
    client: Client,
}

impl TechDocsClient {
    pub fn new(config: &Config, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        // Keep-alive disabled: every request opens a fresh connection.
        let client = Client::builder().pool_max_idle_per_host(0).build()?;
        Ok(Self {
            techdocs_base_url: config.techdocs.base_url.clone(),
            catalog_base_url: config.catalog.base_url.clone(),
            app_base_url: config.app.base_url.clone(),
            tokens,
            client,
        })
    }

    /// Canonical lowercase URI for an entity: `"{namespace}/{kind}/{name}"`.
    pub fn entity_uri(&self, entity: &EntityRef) -> String {
        format!("{}/{}/{}", entity.namespace, entity.kind, entity.name).to_lowercase()
    }

    /// User-facing URL of a rendered docs page.
    ///
    /// A trailing `/index.html` is dropped entirely; otherwise a trailing
    /// `.html` extension is dropped.
    pub fn view_url(&self, entity: &EntityRef, file_path: &str) -> String {
        let page = if let Some(stripped) = file_path.strip_suffix("/index.html") {
            stripped
        } else if let Some(stripped) = file_path.strip_suffix(".html") {
            stripped
        } else {
            file_path
        };
        format!("{}/docs/{}/{}", self.app_base_url, self.entity_uri(entity), page)
    }

    fn metadata_url(&self, path: &str) -> String {
        format!("{}/metadata/techdocs/{}", self.techdocs_base_url, path)
    }

    fn static_url(&self, path: &str) -> String {
        format!("{}/static/docs/{}", self.techdocs_base_url, path)
    }

    async fn authorize(&self, request: RequestBuilder, target: &str) -> Result<RequestBuilder, FetchError> {
        match self
            .tokens
            .plugin_token(target)
            .await
            .map_err(FetchError::Token)?
        {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Ok(request),
        }
    }

    /// Fetches the documentation collection metadata for an entity.
    pub async fn metadata(&self, entity: &EntityRef) -> Result<TechDocsMetadata, FetchError> {
        let url = self.metadata_url(&self.entity_uri(entity));
        debug!(%url, "fetching techdocs metadata");

        let request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json");
        let response = self.authorize(request, TECHDOCS_TARGET).await?.send().await?;

        if !response.status().is_success() {
            return Err(FetchError::from_status(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Fetches the raw HTML of one static documentation file.
    pub async fn static_file(
        &self,
        entity: &EntityRef,
        file_path: &str,
    ) -> Result<String, FetchError> {
        let url = self.static_url(&format!("{}/{}", self.entity_uri(entity), file_path));
        debug!(%url, "fetching techdocs static file");

        let request = self.client.get(&url).header(header::ACCEPT, "text/plain");
        let response = self.authorize(request, TECHDOCS_TARGET).await?.send().await?;

        if !response.status().is_success() {
            return Err(FetchError::from_status(response.status()));
        }
        Ok(response.text().await?)
    }

    /// Lists all catalog entities that carry TechDocs.
    ///
    /// Queries the catalog API for entities with the techdocs-ref
    /// annotation. Requires `catalog.base_url` to be configured.
    pub async fn techdocs_entities(&self) -> Result<Vec<EntityRef>> {
        let catalog_base_url = self
            .catalog_base_url
            .as_deref()
            .context("catalog.base_url is not configured")?;
        let url = format!("{}/entities?filter={}", catalog_base_url, TECHDOCS_ANNOTATION);
        debug!(%url, "querying catalog for techdocs entities");

        let request = self
            .client
            .get(&url)
            .header(header::ACCEPT, "application/json");
        let response = self
            .authorize(request, CATALOG_TARGET)
            .await?
            .send()
            .await
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::from_status(response.status()).into());
        }

        let entities: Vec<CatalogEntity> = response.json().await.map_err(FetchError::Network)?;
        Ok(entities
            .into_iter()
            .map(|entity| EntityRef {
                namespace: entity
                    .metadata
                    .namespace
                    .unwrap_or_else(|| "default".to_string()),
                kind: entity.kind,
                name: entity.metadata.name,
            })
            .collect())
    }

    /// Last-revised timestamp embedded in a rendered page.
    ///
    /// Falls back to the current time when the badge is missing or its
    /// text is not a parseable date.
    pub fn parse_updated_at(&self, raw_html: &str) -> DateTime<Utc> {
        let document = Html::parse_document(raw_html);
        let badge = document
            .select(&REVISION_DATE_SELECTOR)
            .next()
            .map(|element| element.text().collect::<String>());

        badge
            .and_then(|text| NaiveDate::parse_from_str(text.trim(), "%B %d, %Y").ok())
            .map(|date| date.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or_else(Utc::now)
    }

    /// Text of the first `<h1>`, with generator artifacts stripped.
    ///
    /// The generator appends a permalink anchor (`¶`) to every heading and
    /// HTML-escapes ampersands; both are normalized away, along with stray
    /// `#` and quote characters.
    pub fn parse_title(&self, raw_html: &str) -> Option<String> {
        let document = Html::parse_document(raw_html);
        let heading = document.select(&H1_SELECTOR).next()?;
        let text: String = heading.text().collect();
        let title = text.replace(['¶', '#', '"'], "").trim().to_string();
        if title.is_empty() {
            None
        } else {
            Some(title)
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogEntity {
    kind: String,
    metadata: CatalogEntityMetadata,
}

#[derive(Debug, Deserialize)]
struct CatalogEntityMetadata {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> TechDocsClient {
        let config: Config = toml::from_str(
            r#"
[glean]
api_base_url = "https://example-be.glean.com/api/index/v1"

[app]
base_url = "http://localhost:3000"

[techdocs]
base_url = "http://localhost:7007/api/techdocs"

[entity]
name = "some-handbook"
"#,
        )
        .unwrap();
        TechDocsClient::new(
            &config,
            Arc::new(StaticTokenProvider::from_config(&config)),
        )
        .unwrap()
    }

    fn entity() -> EntityRef {
        EntityRef {
            namespace: "default".to_string(),
            kind: "Component".to_string(),
            name: "some-handbook".to_string(),
        }
    }

    #[test]
    fn entity_uri_is_lowercase() {
        assert_eq!(
            test_client().entity_uri(&entity()),
            "default/component/some-handbook"
        );
    }

    #[test]
    fn view_url_strips_index_html() {
        let client = test_client();
        assert_eq!(
            client.view_url(&entity(), "foo/index.html"),
            "http://localhost:3000/docs/default/component/some-handbook/foo"
        );
        assert_eq!(
            client.view_url(&entity(), "foo/bar/index.html"),
            "http://localhost:3000/docs/default/component/some-handbook/foo/bar"
        );
    }

    #[test]
    fn view_url_strips_html_extension() {
        assert_eq!(
            test_client().view_url(&entity(), "foo/baz.html"),
            "http://localhost:3000/docs/default/component/some-handbook/foo/baz"
        );
    }

    #[test]
    fn parse_title_drops_permalink_anchor() {
        let html = r##"<html><body>
            <h1 id="this-is-the-title">This is the title<a class="headerlink" href="#this-is-the-title" title="Permanent link">&para;</a></h1>
        </body></html>"##;
        assert_eq!(
            test_client().parse_title(html).as_deref(),
            Some("This is the title")
        );
    }

    #[test]
    fn parse_title_decodes_ampersands() {
        let html = "<html><body><h1>Tools &amp; Services</h1></body></html>";
        assert_eq!(
            test_client().parse_title(html).as_deref(),
            Some("Tools & Services")
        );
    }

    #[test]
    fn parse_title_without_heading_is_none() {
        let html = "<html><body><p>no heading here</p></body></html>";
        assert_eq!(test_client().parse_title(html), None);
    }

    #[test]
    fn parse_updated_at_reads_revision_badge() {
        let html = r#"<html><body>
            <small class="git-revision-date-localized-plugin git-revision-date-localized-plugin-date">April 6, 2022</small>
        </body></html>"#;
        let parsed = test_client().parse_updated_at(html);
        let expected = NaiveDate::from_ymd_opt(2022, 4, 6)
            .unwrap()
            .and_time(NaiveTime::MIN)
            .and_utc();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn parse_updated_at_without_badge_is_now() {
        let before = Utc::now();
        let parsed = test_client().parse_updated_at("<html><body></body></html>");
        let after = Utc::now();
        assert!(parsed >= before && parsed <= after);
    }
}
