use std::fmt::Write as _;
use std::path::PathBuf;

use serde::Serialize;

use crate::domain::model::book::Book;
use crate::domain::model::catalog::{Catalog, ReadFilter};
use crate::domain::stats::LibraryStats;

use super::error::AppError;

/// Export出力フォーマット
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
        }
    }
}

/// Export設定
pub struct ExportConfig {
    pub output_dir: PathBuf,
    pub filename: String,
    pub format: ExportFormat,
    /// Markdownのみ有効
    pub filter: ReadFilter,
}

/// JSON Export用のDTO（蔵書 + 集計）
#[derive(Debug, Serialize)]
pub struct LibraryReport<'a> {
    pub books: &'a [Book],
    pub stats: LibraryStats,
}

/// Catalog → 読書リストファイルへの変換
pub struct ExportService;

impl ExportService {
    /// Markdownの読書リストに変換する。番号はCatalog上の位置（1始まり）。
    pub fn render_markdown(catalog: &Catalog, filter: ReadFilter) -> String {
        let stats = LibraryStats::from_catalog(catalog);
        let mut buf = String::new();

        let _ = writeln!(
            buf,
            "# Library ({} books, {} read, {} unread)\n",
            stats.total_books,
            stats.read_books,
            stats.unread_books()
        );

        let mut shown = 0;
        for (i, book) in catalog.books().iter().enumerate() {
            if !filter.accepts(book) {
                continue;
            }
            shown += 1;
            buf.push_str(&Self::format_line(i + 1, book));
            buf.push('\n');
        }

        if shown == 0 {
            buf.push_str("_No books._\n");
        }

        buf
    }

    /// 一覧1行分: `1. [x] Dune by Frank Herbert (1965), Science Fiction`
    pub fn format_line(position: usize, book: &Book) -> String {
        let mark = if book.read_status() { "x" } else { " " };
        format!(
            "{}. [{}] {} by {} ({}), {}",
            position,
            mark,
            book.title(),
            book.author(),
            book.publication_year(),
            book.genre()
        )
    }

    /// 蔵書と集計をまとめたJSON文字列に変換する。
    pub fn render_json(catalog: &Catalog) -> Result<String, AppError> {
        let report = LibraryReport {
            books: catalog.books(),
            stats: LibraryStats::from_catalog(catalog),
        };
        serde_json::to_string_pretty(&report).map_err(AppError::ExportEncode)
    }

    /// ファイルに書き出す。
    pub fn export(catalog: &Catalog, config: &ExportConfig) -> Result<PathBuf, AppError> {
        let content = match config.format {
            ExportFormat::Markdown => Self::render_markdown(catalog, config.filter),
            ExportFormat::Json => Self::render_json(catalog)?,
        };

        std::fs::create_dir_all(&config.output_dir).map_err(AppError::ExportIo)?;
        let path = config.output_dir.join(&config.filename);
        std::fs::write(&path, content).map_err(AppError::ExportIo)?;
        tracing::info!(path = %path.display(), "library exported");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;
    use crate::domain::model::book::{AddBookRequest, ADDED_DATE_FORMAT};

    fn catalog() -> Catalog {
        let date = NaiveDateTime::parse_from_str("2025-05-05 12:00:00", ADDED_DATE_FORMAT).unwrap();
        let mut catalog = Catalog::new();
        for (title, author, year, genre, read) in [
            ("Dune", "Frank Herbert", 1965, "Science Fiction", true),
            ("1984", "George Orwell", 1949, "Fiction", false),
        ] {
            catalog
                .add(
                    AddBookRequest {
                        title: title.into(),
                        author: author.into(),
                        publication_year: year,
                        genre: genre.into(),
                        read_status: read,
                    },
                    date,
                )
                .unwrap();
        }
        catalog
    }

    #[test]
    fn markdown_lists_books_with_checkboxes() {
        let md = ExportService::render_markdown(&catalog(), ReadFilter::All);
        assert!(md.starts_with("# Library (2 books, 1 read, 1 unread)"));
        assert!(md.contains("1. [x] Dune by Frank Herbert (1965), Science Fiction"));
        assert!(md.contains("2. [ ] 1984 by George Orwell (1949), Fiction"));
    }

    #[test]
    fn markdown_filter_keeps_catalog_positions() {
        let md = ExportService::render_markdown(&catalog(), ReadFilter::Unread);
        assert!(!md.contains("Dune"));
        assert!(md.contains("2. [ ] 1984"));
    }

    #[test]
    fn markdown_empty_catalog() {
        let md = ExportService::render_markdown(&Catalog::new(), ReadFilter::All);
        assert!(md.contains("(0 books, 0 read, 0 unread)"));
        assert!(md.contains("_No books._"));
    }

    #[test]
    fn json_report_contains_books_and_stats() {
        let json = ExportService::render_json(&catalog()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["books"].as_array().unwrap().len(), 2);
        assert_eq!(value["stats"]["total_books"], 2);
        assert_eq!(value["stats"]["percent_read"], 50.0);
        assert_eq!(value["books"][0]["added_date"], "2025-05-05 12:00:00");
    }
}
