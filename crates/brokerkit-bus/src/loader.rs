use crate::contract::ContractSet;
use crate::schema::Schema;
use anyhow::Context;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads contract sets from JSON schema files.
///
/// A contract directory holds one `<event_type>.json` per event type, each
/// containing a single [`Schema`]. A contract file maps event types to schemas
/// in one JSON object.
pub struct ContractLoader {
    root: PathBuf,
}

impl ContractLoader {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn discover(&self) -> anyhow::Result<ContractSet> {
        let mut builder = ContractSet::builder();
        if !self.root.exists() {
            return Ok(builder.build());
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let Some(event_type) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let schema: Schema = Self::read_json(&path)?;
            tracing::debug!(event_type, path = %path.display(), "contract loaded");
            builder = builder.contract(event_type.to_string(), schema);
        }
        Ok(builder.build())
    }

    pub fn load_file(path: &Path) -> anyhow::Result<ContractSet> {
        let schemas: BTreeMap<String, Schema> = Self::read_json(path)?;
        Ok(schemas
            .into_iter()
            .fold(ContractSet::builder(), |builder, (event_type, schema)| {
                builder.contract(event_type, schema)
            })
            .build())
    }

    fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading contract file {}", path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("parsing contract file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_root_yields_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let set = ContractLoader::new(dir.path().join("nope")).discover().unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn discover_reads_one_schema_per_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("greet.json"),
            r#"{ "type": "object", "fields": { "name": { "type": "string" } } }"#,
        )
        .unwrap();
        fs::write(dir.path().join("tick.json"), r#"{ "type": "integer" }"#).unwrap();
        fs::write(dir.path().join("README.md"), "not a contract").unwrap();

        let set = ContractLoader::new(dir.path().to_path_buf()).discover().unwrap();
        assert_eq!(set.event_types().collect::<Vec<_>>(), vec!["greet", "tick"]);
        assert!(set.validate("greet", &json!({ "name": "Ann" })).is_ok());
        assert!(set.validate("tick", &json!("soon")).is_err());
    }

    #[test]
    fn load_file_reads_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contracts.json");
        fs::write(
            &path,
            r#"{ "greet": { "type": "object", "fields": { "name": { "type": "string" } } },
                 "tick": { "type": "integer" } }"#,
        )
        .unwrap();

        let set = ContractLoader::load_file(&path).unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.validate("greet", &json!({ "name": 1 })).is_err());
    }

    #[test]
    fn malformed_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{ "type": "tuple" }"#).unwrap();

        let err = ContractLoader::new(dir.path().to_path_buf()).discover().unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
