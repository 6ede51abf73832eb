//! JSON file persistence shared by the cache manifest and the EULA ledger
//!
//! Both stores keep a single key → record map in memory and mirror it to one
//! pretty-printed JSON object on disk after every mutation. Writes go to a
//! sibling `.tmp` file that is renamed over the target.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tracing::debug;

use crate::constants::files;
use crate::errors::{PersistenceError, PersistenceResult};

/// Load a JSON object map, treating a missing file as empty
pub async fn load_map<T>(path: &Path) -> PersistenceResult<BTreeMap<String, T>>
where
    T: DeserializeOwned,
{
    let data = match fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No store file at {}, starting empty", path.display());
            return Ok(BTreeMap::new());
        }
        Err(source) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(BTreeMap::new());
    }

    serde_json::from_slice(&data).map_err(|source| PersistenceError::Corrupted {
        path: path.to_path_buf(),
        source,
    })
}

/// Write a JSON object map, creating the parent directory if needed
pub async fn save_map<T>(path: &Path, map: &BTreeMap<String, T>) -> PersistenceResult<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|source| PersistenceError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    let data = serde_json::to_vec_pretty(map)?;
    let mut temp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    temp_name.push(files::TEMP_FILE_SUFFIX);
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, data)
        .await
        .map_err(|source| PersistenceError::Write {
            path: temp_path.clone(),
            source,
        })?;
    if let Err(source) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        });
    }

    debug!("Persisted {} records to {}", map.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let map: BTreeMap<String, u32> = load_map(&temp_dir.path().join("absent.json"))
            .await
            .unwrap();
        assert!(map.is_empty());
    }

    #[tokio::test]
    async fn test_save_creates_parent_and_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("deeper").join("store.json");

        let mut map = BTreeMap::new();
        map.insert("a".to_string(), 1u32);
        map.insert("b".to_string(), 2u32);
        save_map(&path, &map).await.unwrap();

        let text = fs::read_to_string(&path).await.unwrap();
        assert!(text.contains("\n  \"a\": 1"));

        let loaded: BTreeMap<String, u32> = load_map(&path).await.unwrap();
        assert_eq!(loaded, map);
    }

    #[tokio::test]
    async fn test_corrupted_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, b"{not json").await.unwrap();

        let result: PersistenceResult<BTreeMap<String, u32>> = load_map(&path).await;
        assert!(matches!(result, Err(PersistenceError::Corrupted { .. })));
    }
}
