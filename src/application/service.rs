use crate::domain::model::book::{added_date_now, AddBookRequest, Book};
use crate::domain::model::catalog::{Catalog, SearchField};
use crate::domain::repository::CatalogRepository;
use crate::domain::stats::LibraryStats;

use super::error::AppError;

/// 変更系操作の結果。
/// 変更はメモリ上で常に確定し、保存に失敗した場合は `persist_error` で報告する（ロールバックしない）。
#[derive(Debug)]
pub struct Applied<T> {
    pub value: T,
    pub persist_error: Option<AppError>,
}

impl<T> Applied<T> {
    fn unsaved(value: T) -> Self {
        Self {
            value,
            persist_error: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.persist_error.is_none()
    }
}

/// 蔵書に対するユースケース。
/// メモリ上のCatalogが正本で、変更のたびにRepositoryへ全体を保存する。
pub struct LibraryService<R: CatalogRepository> {
    repo: R,
    catalog: Catalog,
}

impl<R: CatalogRepository> LibraryService<R> {
    /// 空のCatalogで開始する。既存ファイルの読み込みは `load` で行う。
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            catalog: Catalog::new(),
        }
    }

    /// Repositoryから読み込んでメモリ上のCatalogを置き換える。
    /// 保存先が無ければ空のCatalog。失敗時はメモリ上のCatalogを変更しない。
    pub fn load(&mut self) -> Result<&Catalog, AppError> {
        let loaded = self
            .repo
            .load()
            .map_err(|e| AppError::Storage(Box::new(e)))?;
        match loaded {
            Some(catalog) => {
                tracing::info!(books = catalog.len(), "catalog loaded");
                self.catalog = catalog;
            }
            None => {
                tracing::info!("no catalog file yet; starting empty");
                self.catalog = Catalog::new();
            }
        }
        Ok(&self.catalog)
    }

    /// メモリ上のCatalog全体を保存する。
    pub fn save(&self) -> Result<(), AppError> {
        self.repo
            .save(&self.catalog)
            .map_err(|e| AppError::Storage(Box::new(e)))?;
        tracing::debug!(books = self.catalog.len(), "catalog saved");
        Ok(())
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn books(&self) -> &[Book] {
        self.catalog.books()
    }

    /// 書籍を末尾に追加して保存する。検証エラーなら何も変更しない。
    pub fn add(&mut self, req: AddBookRequest) -> Result<Applied<Book>, AppError> {
        let book = self.catalog.add(req, added_date_now())?.clone();
        tracing::info!(title = book.title(), author = book.author(), "book added");
        Ok(self.persist(book))
    }

    /// 指定位置の書籍を削除する。範囲外なら保存せず `false`。
    pub fn remove(&mut self, index: usize) -> Applied<bool> {
        match self.catalog.remove(index) {
            Some(book) => {
                tracing::info!(index, title = book.title(), "book removed");
                self.persist(true)
            }
            None => {
                tracing::debug!(index, len = self.catalog.len(), "remove: out of range");
                Applied::unsaved(false)
            }
        }
    }

    /// 指定位置の読了状態を反転して保存する。範囲外なら保存せず `false`。
    pub fn toggle_read_status(&mut self, index: usize) -> Applied<bool> {
        if self.catalog.toggle_read_status(index) {
            tracing::info!(index, "read status toggled");
            self.persist(true)
        } else {
            tracing::debug!(index, len = self.catalog.len(), "toggle: out of range");
            Applied::unsaved(false)
        }
    }

    pub fn search(&self, term: &str, field: SearchField) -> Vec<&Book> {
        self.catalog.search(term, field)
    }

    pub fn stats(&self) -> LibraryStats {
        LibraryStats::from_catalog(&self.catalog)
    }

    // --- private ---

    fn persist<T>(&self, value: T) -> Applied<T> {
        let persist_error = self.save().err();
        if let Some(e) = &persist_error {
            tracing::warn!(error = %e, "save failed; in-memory catalog stays authoritative");
        }
        Applied {
            value,
            persist_error,
        }
    }
}
