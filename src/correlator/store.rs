// File-per-table JSON persistence for the correlator. Every write goes to a
// temp file and is renamed into place, so a table file is always a complete
// JSON document.

use crate::client::{EsmeError, EsmeResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn open(dir: impl AsRef<Path>) -> EsmeResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| EsmeError::Storage(format!("creating {}: {err}", dir.display())))?;
        Ok(FileStore { dir })
    }

    fn path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{table}.json"))
    }

    /// Durably replaces the named table.
    pub async fn save<T: Serialize>(&self, table: &str, value: &T) -> EsmeResult<()> {
        let json = serde_json::to_vec(value)
            .map_err(|err| EsmeError::Storage(format!("serializing {table}: {err}")))?;
        let path = self.path(table);
        let tmp = self.dir.join(format!("{table}.json.tmp"));
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|err| EsmeError::Storage(format!("writing {}: {err}", tmp.display())))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|err| EsmeError::Storage(format!("renaming {}: {err}", path.display())))?;
        Ok(())
    }

    /// Loads the named table, or its default when no file exists yet.
    pub async fn load<T: DeserializeOwned + Default>(&self, table: &str) -> EsmeResult<T> {
        let path = self.path(table);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|err| EsmeError::Storage(format!("parsing {}: {err}", path.display()))),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(table, "no persisted table, starting empty");
                Ok(T::default())
            }
            Err(err) => Err(EsmeError::Storage(format!(
                "reading {}: {err}",
                path.display()
            ))),
        }
    }
}
