//! Product lists produced by an upstream keyword-extraction step, turned into a
//! retrieval question.
//!
//! The upstream step stores one chat-completion response per keyword in a JSON
//! object. Each response's message content must itself be a JSON object with a
//! keyword and its related products.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ProductError {
    #[error("failed to read product file: {0}")]
    Io(#[from] std::io::Error),

    #[error("product file is not a JSON object of completions: {0}")]
    Dump(String),

    #[error("malformed product list for {key}: {reason}")]
    MalformedResponse { key: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductGroup {
    #[serde(alias = "關鍵字")]
    pub keyword: String,
    #[serde(default, alias = "相關產品")]
    pub related_products: Vec<String>,
}

impl ProductGroup {
    /// Parse model output strictly as a JSON product group. Code fences or
    /// surrounding prose are rejected.
    ///
    /// # Errors
    ///
    /// Returns `ProductError::MalformedResponse` if `content` is not a valid group.
    pub fn parse(key: &str, content: &str) -> Result<Self, ProductError> {
        serde_json::from_str(content).map_err(|e| ProductError::MalformedResponse {
            key: key.to_owned(),
            reason: e.to_string(),
        })
    }
}

/// Product groups keyed by keyword, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    groups: Vec<ProductGroup>,
    failed: Vec<String>,
}

impl ProductCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group. Products for a keyword already present are appended
    /// without duplicates.
    pub fn insert(&mut self, group: ProductGroup) {
        if let Some(existing) = self.groups.iter_mut().find(|g| g.keyword == group.keyword) {
            for product in group.related_products {
                if !existing.related_products.contains(&product) {
                    existing.related_products.push(product);
                }
            }
        } else {
            self.groups.push(group);
        }
    }

    /// Build a catalog from a keyword-to-completion JSON dump.
    ///
    /// Entries recorded as `{"error": ...}` are skipped and listed in [`Self::failed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the dump is not a JSON object, an entry lacks
    /// `choices[0].message.content`, or that content is not a product group.
    pub fn from_completion_dump(json: &str) -> Result<Self, ProductError> {
        let dump: serde_json::Map<String, Value> =
            serde_json::from_str(json).map_err(|e| ProductError::Dump(e.to_string()))?;

        let mut catalog = Self::new();
        for (key, entry) in dump {
            if let Some(err) = entry.get("error") {
                tracing::warn!("keyword {key} has no product list: {err}");
                catalog.failed.push(key);
                continue;
            }
            let content = entry
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)
                .ok_or_else(|| ProductError::MalformedResponse {
                    key: key.clone(),
                    reason: "missing choices[0].message.content".into(),
                })?;
            catalog.insert(ProductGroup::parse(&key, content)?);
        }

        tracing::info!(
            "loaded {} product groups ({} failed)",
            catalog.groups.len(),
            catalog.failed.len()
        );
        Ok(catalog)
    }

    /// # Errors
    ///
    /// See [`Self::from_completion_dump`].
    pub async fn load(path: &Path) -> Result<Self, ProductError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_completion_dump(&json)
    }

    #[must_use]
    pub fn groups(&self) -> &[ProductGroup] {
        &self.groups
    }

    /// Keys whose upstream call failed.
    #[must_use]
    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn render(&self) -> String {
        self.groups
            .iter()
            .map(|g| {
                std::iter::once(format!("[keyword] {}", g.keyword))
                    .chain(g.related_products.iter().cloned())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// The question sent through retrieval: grouped product lists followed by `request`.
#[must_use]
pub fn compose_query(catalog: &ProductCatalog, request: &str) -> String {
    format!(
        "Here are several product lists:\n{}\n\n{request}",
        catalog.render()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(content: &str) -> Value {
        serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": content } }]
        })
    }

    #[test]
    fn parse_english_keys() {
        let group =
            ProductGroup::parse("k", r#"{"keyword":"knee","related_products":["implant"]}"#)
                .unwrap();
        assert_eq!(group.keyword, "knee");
        assert_eq!(group.related_products, vec!["implant"]);
    }

    #[test]
    fn parse_localized_keys() {
        let group = ProductGroup::parse(
            "k",
            r#"{"關鍵字":"人工關節","相關產品":["人工膝關節","人工髖關節"]}"#,
        )
        .unwrap();
        assert_eq!(group.keyword, "人工關節");
        assert_eq!(group.related_products.len(), 2);
    }

    #[test]
    fn fenced_content_is_malformed() {
        let err = ProductGroup::parse("knee", "```json\n{\"keyword\":\"knee\"}\n```").unwrap_err();
        assert!(matches!(err, ProductError::MalformedResponse { ref key, .. } if key == "knee"));
    }

    #[test]
    fn dump_keeps_first_seen_order_and_records_failures() {
        let dump = serde_json::json!({
            "zeta": completion(r#"{"keyword":"zeta","related_products":["z1"]}"#),
            "alpha": completion(r#"{"keyword":"alpha","related_products":["a1","a2"]}"#),
            "broken": { "error": "timeout" },
        });
        let catalog = ProductCatalog::from_completion_dump(&dump.to_string()).unwrap();
        let keywords: Vec<_> = catalog.groups().iter().map(|g| g.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["zeta", "alpha"]);
        assert_eq!(catalog.failed(), ["broken"]);
    }

    #[test]
    fn duplicate_keywords_are_merged() {
        let mut catalog = ProductCatalog::new();
        catalog.insert(ProductGroup {
            keyword: "knee".into(),
            related_products: vec!["a".into(), "b".into()],
        });
        catalog.insert(ProductGroup {
            keyword: "knee".into(),
            related_products: vec!["b".into(), "c".into()],
        });
        assert_eq!(catalog.groups().len(), 1);
        assert_eq!(catalog.groups()[0].related_products, vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_content_is_malformed() {
        let dump = serde_json::json!({ "knee": { "choices": [] } });
        let err = ProductCatalog::from_completion_dump(&dump.to_string()).unwrap_err();
        assert!(matches!(err, ProductError::MalformedResponse { .. }));
    }

    #[test]
    fn non_object_dump_is_rejected() {
        assert!(matches!(
            ProductCatalog::from_completion_dump("[1, 2]"),
            Err(ProductError::Dump(_))
        ));
    }

    #[test]
    fn compose_query_renders_groups() {
        let mut catalog = ProductCatalog::new();
        catalog.insert(ProductGroup {
            keyword: "knee".into(),
            related_products: vec!["implant".into(), "brace".into()],
        });
        catalog.insert(ProductGroup {
            keyword: "hip".into(),
            related_products: vec!["stem".into()],
        });
        let query = compose_query(&catalog, "Find related devices.");
        assert_eq!(
            query,
            "Here are several product lists:\n\
             [keyword] knee\nimplant\nbrace\n\n\
             [keyword] hip\nstem\n\n\
             Find related devices."
        );
    }

    #[tokio::test]
    async fn load_reads_dump_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        let dump = serde_json::json!({
            "knee": completion(r#"{"keyword":"knee","related_products":["implant"]}"#),
        });
        std::fs::write(&path, dump.to_string()).unwrap();
        let catalog = ProductCatalog::load(&path).await.unwrap();
        assert_eq!(catalog.groups().len(), 1);
        assert!(!catalog.is_empty());
    }
}
