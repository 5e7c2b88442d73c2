//! Built-in content used until the remote store holds rows for a collection.
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::session::Collections;

const BUILTIN: &str = include_str!("seed.yaml");

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// The embedded dataset.
pub fn builtin() -> Result<Collections, SeedError> {
    Ok(serde_yaml::from_str(BUILTIN)?)
}

/// Load seed content from `path`, or the embedded dataset when `None`.
pub fn load(path: Option<&Path>) -> Result<Collections, SeedError> {
    match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Ok(serde_yaml::from_str(&content)?)
        }
        None => builtin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IconName, NewsCategory, ResourceType, TemplateCategory};
    use tempfile::tempdir;

    #[test]
    fn builtin_dataset_parses() {
        let seed = builtin().unwrap();
        assert_eq!(seed.projects.len(), 6);
        assert_eq!(seed.news.len(), 3);
        assert_eq!(seed.channel_resources.len(), 3);
        assert_eq!(seed.templates.len(), 3);

        let first = &seed.projects[0];
        assert_eq!(first.id.as_str(), "fe-tsa");
        assert_eq!(first.fields.priority, 1);
        assert_eq!(first.fields.strengths.len(), 6);
        assert_eq!(first.fields.tabs().len(), 3);
        assert!(seed.projects.iter().all(|p| p.fields.enabled));

        assert_eq!(seed.news[1].fields.category, NewsCategory::Knowledge);
        assert_eq!(seed.channel_resources[1].fields.kind, ResourceType::Script);
        assert_eq!(seed.channel_resources[2].fields.icon_name, Some(IconName::Share2));
        assert_eq!(seed.templates[2].fields.category, TemplateCategory::General);
    }

    #[test]
    fn override_file_replaces_builtin() {
        let td = tempdir().unwrap();
        let p = td.path().join("seed.yaml");
        fs::write(
            &p,
            "projects:\n  - id: alpha\n    name: Alpha\n    logo_url: https://cdn/a.png\n    priority: 1\n    enabled: true\n",
        )
        .unwrap();
        let seed = load(Some(&p)).unwrap();
        assert_eq!(seed.projects.len(), 1);
        assert!(seed.news.is_empty());
    }

    #[test]
    fn missing_override_is_io_error() {
        let err = load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
        assert!(matches!(err, SeedError::Io(_)));
    }
}
