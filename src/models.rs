//! Core data types flowing through the indexing pipeline.
//!
//! [`EntityRef`] identifies a documentation-bearing catalog entity,
//! [`TechDocsMetadata`] describes its published documentation set, and
//! [`GleanDocument`] is the unit uploaded to the Glean indexing API.

use serde::{Deserialize, Serialize};

/// Reference to a catalog entity that carries TechDocs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub namespace: String,
    pub kind: String,
    pub name: String,
}

/// Metadata describing one entity's published documentation set.
///
/// Fetched fresh on every run; the `files` list is the authoritative
/// catalog of pages to index.
#[derive(Debug, Clone, Deserialize)]
pub struct TechDocsMetadata {
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub site_description: Option<String>,
    /// Build time in epoch milliseconds, as emitted by the generator.
    #[serde(default)]
    pub build_timestamp: Option<i64>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

/// A search document as accepted by Glean's bulk indexing API.
///
/// Serialized camelCase; `viewURL` is spelled exactly as the API expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GleanDocument {
    /// `"{entityName}/{filePath}"`: unique within a run, stable across
    /// runs for upsert semantics in the search backend.
    pub id: String,
    pub title: String,
    /// Entity name, used for grouping in the search index.
    pub container: String,
    pub datasource: String,
    #[serde(rename = "viewURL")]
    pub view_url: String,
    pub body: DocumentBody,
    /// Last update time in epoch seconds.
    pub updated_at: i64,
    pub permissions: DocumentPermissions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentBody {
    pub mime_type: String,
    pub text_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPermissions {
    pub allow_anonymous_access: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn document_serializes_with_glean_field_names() {
        let document = GleanDocument {
            id: "some-handbook/foo/index.html".to_string(),
            title: "Foo".to_string(),
            container: "some-handbook".to_string(),
            datasource: "backstage".to_string(),
            view_url: "http://localhost/docs/default/component/some-handbook/foo".to_string(),
            body: DocumentBody {
                mime_type: "HTML".to_string(),
                text_content: "<p>hi</p>".to_string(),
            },
            updated_at: 1_649_217_600,
            permissions: DocumentPermissions {
                allow_anonymous_access: true,
            },
        };

        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(
            json["viewURL"],
            json!("http://localhost/docs/default/component/some-handbook/foo")
        );
        assert_eq!(json["updatedAt"], json!(1_649_217_600));
        assert_eq!(json["body"]["mimeType"], json!("HTML"));
        assert_eq!(json["body"]["textContent"], json!("<p>hi</p>"));
        assert_eq!(json["permissions"]["allowAnonymousAccess"], json!(true));
    }

    #[test]
    fn metadata_tolerates_missing_files() {
        let metadata: TechDocsMetadata = serde_json::from_str(
            r#"{"site_name":"some-handbook","etag":"abc123","build_timestamp":1652796973948}"#,
        )
        .unwrap();
        assert_eq!(metadata.site_name.as_deref(), Some("some-handbook"));
        assert!(metadata.files.is_none());
    }
}
