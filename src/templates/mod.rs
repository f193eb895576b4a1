//! Template stores.
//!
//! - [`FileTemplateStore`] reads YAML/JSON template files from a directory
//! - [`MemoryTemplateStore`] keeps templates in process

mod files;

pub use files::{FileTemplateStore, TemplateFile};

use crate::store::TemplateStore;
use crate::types::{Template, TemplateSummary};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-process template registry.
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: RwLock<BTreeMap<String, Template>>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a set of templates.
    pub fn with_templates(templates: impl IntoIterator<Item = Template>) -> Self {
        let store = Self::new();
        {
            let mut map = store
                .templates
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            for template in templates {
                map.insert(template.id.clone(), template);
            }
        }
        store
    }

    /// Register or replace a template. Returns the previous definition.
    pub fn insert(&self, template: Template) -> Result<Option<Template>> {
        let mut map = self
            .templates
            .write()
            .map_err(|_| anyhow!("template registry lock poisoned"))?;
        Ok(map.insert(template.id.clone(), template))
    }

    /// Remove a template by id.
    pub fn remove(&self, id: &str) -> Result<Option<Template>> {
        let mut map = self
            .templates
            .write()
            .map_err(|_| anyhow!("template registry lock poisoned"))?;
        Ok(map.remove(id))
    }
}

/// Summaries for templates matching an optional tag, sorted by id.
pub(crate) fn summarize<'a>(
    templates: impl IntoIterator<Item = &'a Template>,
    tag: Option<&str>,
) -> Vec<TemplateSummary> {
    let mut summaries: Vec<TemplateSummary> = templates
        .into_iter()
        .filter(|t| tag.is_none_or(|tag| t.has_tag(tag)))
        .map(Template::summary)
        .collect();
    summaries.sort_by(|a, b| a.id.cmp(&b.id));
    summaries
}

#[async_trait]
impl TemplateStore for MemoryTemplateStore {
    async fn get_template(&self, id: &str) -> Result<Option<Template>> {
        let map = self
            .templates
            .read()
            .map_err(|_| anyhow!("template registry lock poisoned"))?;
        Ok(map.get(id).cloned())
    }

    async fn list_templates(&self, tag: Option<&str>) -> Result<Vec<TemplateSummary>> {
        let map = self
            .templates
            .read()
            .map_err(|_| anyhow!("template registry lock poisoned"))?;
        Ok(summarize(map.values(), tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskBlueprint;

    fn template(id: &str, tags: &[&str]) -> Template {
        Template {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            variables: Vec::new(),
            tasks: vec![TaskBlueprint::new("root", "Root")],
        }
    }

    #[tokio::test]
    async fn test_memory_store_get_and_list() {
        let store = MemoryTemplateStore::with_templates(vec![
            template("b", &["ops"]),
            template("a", &["dev", "ops"]),
            template("c", &["dev"]),
        ]);

        assert!(store.get_template("a").await.unwrap().is_some());
        assert!(store.get_template("missing").await.unwrap().is_none());

        let all: Vec<String> = store
            .list_templates(None)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(all, vec!["a", "b", "c"]);

        let ops: Vec<String> = store
            .list_templates(Some("ops"))
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ops, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_memory_store_insert_replaces() {
        let store = MemoryTemplateStore::new();
        assert!(store.insert(template("a", &[])).unwrap().is_none());
        assert!(store.insert(template("a", &["x"])).unwrap().is_some());
        let loaded = store.get_template("a").await.unwrap().unwrap();
        assert!(loaded.has_tag("x"));
        assert!(store.remove("a").unwrap().is_some());
        assert!(store.get_template("a").await.unwrap().is_none());
    }
}
