//! Shared test harness for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use chrono::NaiveDateTime;

use library_mcp::application::service::LibraryService;
use library_mcp::domain::model::book::{AddBookRequest, ADDED_DATE_FORMAT};
use library_mcp::domain::model::catalog::Catalog;
use library_mcp::domain::repository::CatalogRepository;

// =============================================================================
// InMemoryRepo — テスト用リポジトリ
// =============================================================================

#[derive(Debug, thiserror::Error)]
#[error("in-memory store error")]
pub struct InMemoryError;

/// ファイルI/O不要のインメモリリポジトリ。JSON文字列として保持する。
/// `fail_saves` / `fail_loads` で失敗を注入できる。
pub struct InMemoryRepo {
    store: RefCell<Option<String>>,
    pub fail_saves: Cell<bool>,
    pub fail_loads: Cell<bool>,
    pub save_count: Cell<usize>,
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            store: RefCell::new(None),
            fail_saves: Cell::new(false),
            fail_loads: Cell::new(false),
            save_count: Cell::new(0),
        }
    }

    pub fn with_raw(json: &str) -> Self {
        let repo = Self::new();
        *repo.store.borrow_mut() = Some(json.to_string());
        repo
    }

    pub fn raw(&self) -> Option<String> {
        self.store.borrow().clone()
    }
}

impl CatalogRepository for InMemoryRepo {
    type Error = InMemoryError;

    fn load(&self) -> Result<Option<Catalog>, Self::Error> {
        if self.fail_loads.get() {
            return Err(InMemoryError);
        }
        match self.store.borrow().as_deref() {
            Some(json) => serde_json::from_str(json).map(Some).map_err(|_| InMemoryError),
            None => Ok(None),
        }
    }

    fn save(&self, catalog: &Catalog) -> Result<(), Self::Error> {
        if self.fail_saves.get() {
            return Err(InMemoryError);
        }
        let json = serde_json::to_string(catalog).unwrap();
        *self.store.borrow_mut() = Some(json);
        self.save_count.set(self.save_count.get() + 1);
        Ok(())
    }
}

// =============================================================================
// TestLibrary — テスト用蔵書
// =============================================================================

pub fn fixed_date() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("2025-06-01 08:00:00", ADDED_DATE_FORMAT).unwrap()
}

pub fn request(
    title: &str,
    author: &str,
    year: u16,
    genre: &str,
    read_status: bool,
) -> AddBookRequest {
    AddBookRequest {
        title: title.into(),
        author: author.into(),
        publication_year: year,
        genre: genre.into(),
        read_status,
    }
}

pub struct TestLibrary;

impl TestLibrary {
    /// 標準的なテスト用蔵書（added_dateは固定）:
    /// ```text
    /// 1. [x] Dune                       Frank Herbert   1965 Science Fiction
    /// 2. [ ] 1984                       George Orwell   1949 Fiction
    /// 3. [x] The Hobbit                 J.R.R. Tolkien  1937 Fantasy
    /// 4. [ ] The Fellowship of the Ring J.R.R. Tolkien  1954 Fantasy
    /// 5. [x] Animal Farm                George Orwell   1945 Fiction
    /// 6. [ ] Foundation                 Isaac Asimov    1951 Science Fiction
    /// 7. [ ] Steve Jobs                 Walter Isaacson 2011 Biography
    /// ```
    pub fn standard() -> Catalog {
        let mut catalog = Catalog::new();
        for req in [
            request("Dune", "Frank Herbert", 1965, "Science Fiction", true),
            request("1984", "George Orwell", 1949, "Fiction", false),
            request("The Hobbit", "J.R.R. Tolkien", 1937, "Fantasy", true),
            request(
                "The Fellowship of the Ring",
                "J.R.R. Tolkien",
                1954,
                "Fantasy",
                false,
            ),
            request("Animal Farm", "George Orwell", 1945, "Fiction", true),
            request("Foundation", "Isaac Asimov", 1951, "Science Fiction", false),
            request("Steve Jobs", "Walter Isaacson", 2011, "Biography", false),
        ] {
            catalog.add(req, fixed_date()).unwrap();
        }
        catalog
    }

    /// InMemoryRepoにCatalogを保存し、読み込み済みのLibraryServiceを返す。
    pub fn service_with(catalog: &Catalog) -> LibraryService<InMemoryRepo> {
        let repo = InMemoryRepo::new();
        repo.save(catalog).unwrap();
        let mut svc = LibraryService::new(repo);
        svc.load().unwrap();
        svc
    }
}

// =============================================================================
// Assertion helpers
// =============================================================================

/// 結果がErrで、メッセージに指定文字列を含むことをassert。
pub fn assert_error_contains<T: std::fmt::Debug>(
    result: Result<T, impl std::fmt::Display>,
    expected: &str,
) {
    match result {
        Err(e) => {
            let msg = e.to_string();
            assert!(
                msg.contains(expected),
                "Expected error containing '{expected}', got: '{msg}'"
            );
        }
        Ok(v) => panic!("Expected error containing '{expected}', got Ok({v:?})"),
    }
}

pub fn titles(catalog: &Catalog) -> Vec<String> {
    catalog.books().iter().map(|b| b.title().to_string()).collect()
}
