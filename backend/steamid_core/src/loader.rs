// backend/steamid_core/src/loader.rs

use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

use crate::error::LoadError;

/// One key of the ID document with its identifiers, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdGroup {
    pub key: String,
    pub steam_ids: Vec<String>,
}

/// The parsed ID document: `{ "<any key>": ["<steam id>", ...], ... }`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSource {
    groups: Vec<IdGroup>,
}

impl IdSource {
    pub fn parse(path: &Path, content: &str) -> Result<Self, LoadError> {
        let document: Value =
            serde_json::from_str(content).map_err(|source| LoadError::MalformedDocument {
                path: path.to_path_buf(),
                source,
            })?;

        let Value::Object(entries) = document else {
            return Err(LoadError::InvalidShape {
                path: path.to_path_buf(),
                detail: "top level must be a JSON object".to_string(),
            });
        };

        Self::from_entries(path, entries)
    }

    fn from_entries(path: &Path, entries: Map<String, Value>) -> Result<Self, LoadError> {
        let mut groups = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let Value::Array(items) = value else {
                return Err(LoadError::InvalidShape {
                    path: path.to_path_buf(),
                    detail: format!("value under key {:?} is not an array", key),
                });
            };
            let steam_ids = items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| match item {
                    Value::String(id) => Ok(id),
                    other => Err(LoadError::InvalidShape {
                        path: path.to_path_buf(),
                        detail: format!("{}[{}] is not a string: {}", key, idx, other),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            groups.push(IdGroup { key, steam_ids });
        }
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[IdGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.steam_ids.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All identifiers: keys in document order, each key's array in order.
    pub fn flatten(self) -> Vec<String> {
        let mut all = Vec::with_capacity(self.len());
        for group in self.groups {
            all.extend(group.steam_ids);
        }
        all
    }
}

pub async fn load_id_source(path: &Path) -> Result<IdSource, LoadError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| match source.kind() {
            ErrorKind::NotFound => LoadError::FileNotFound {
                path: path.to_path_buf(),
            },
            _ => LoadError::Unreadable {
                path: path.to_path_buf(),
                source,
            },
        })?;
    IdSource::parse(path, &content)
}

/// Reads the document and returns the flattened identifier list.
pub async fn load_steam_ids(path: &Path) -> Result<Vec<String>, LoadError> {
    let source = load_id_source(path).await?;
    for group in source.groups() {
        info!(
            "Found {} Steam IDs under key: {}",
            group.steam_ids.len(),
            group.key
        );
    }
    let ids = source.flatten();
    info!("Total Steam IDs to process: {}", ids.len());
    Ok(ids)
}
