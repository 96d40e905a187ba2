use std::path::{Path, PathBuf};

use crate::domain::model::catalog::Catalog;
use crate::domain::repository::CatalogRepository;

#[derive(Debug, thiserror::Error)]
pub enum JsonStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// JSONファイルによるCatalogRepository実装。
/// 1 Catalog = 1 JSONファイル（Bookの配列）。保存は常に全体書き換え。
pub struct JsonCatalogRepository {
    path: PathBuf,
}

impl JsonCatalogRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 保存時の一時ファイル。本体のファイル名に `.tmp` を付け足す（`library.json.tmp`）。
    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl CatalogRepository for JsonCatalogRepository {
    type Error = JsonStoreError;

    fn load(&self) -> Result<Option<Catalog>, Self::Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let catalog: Catalog = serde_json::from_str(&content)?;
        Ok(Some(catalog))
    }

    fn save(&self, catalog: &Catalog) -> Result<(), Self::Error> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(catalog)?;
        // 書き込み途中で落ちても本体を壊さないよう tmp → rename
        let tmp = self.tmp_path();
        std::fs::write(&tmp, &content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
