use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::book::{AddBookRequest, Book};
use crate::domain::error::DomainError;

/// 検索対象フィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Author,
    Genre,
}

impl SearchField {
    fn value_of<'a>(&self, book: &'a Book) -> &'a str {
        match self {
            Self::Title => book.title(),
            Self::Author => book.author(),
            Self::Genre => book.genre(),
        }
    }
}

impl FromStr for SearchField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "author" => Ok(Self::Author),
            "genre" => Ok(Self::Genre),
            _ => Err(DomainError::UnknownSearchField(s.to_string())),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::Author => "author",
            Self::Genre => "genre",
        };
        f.write_str(name)
    }
}

/// 読了状態による絞り込み
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadFilter {
    #[default]
    All,
    Read,
    Unread,
}

impl ReadFilter {
    pub fn accepts(&self, book: &Book) -> bool {
        match self {
            Self::All => true,
            Self::Read => book.read_status(),
            Self::Unread => !book.read_status(),
        }
    }
}

impl FromStr for ReadFilter {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "read" => Ok(Self::Read),
            "unread" => Ok(Self::Unread),
            _ => Err(DomainError::UnknownReadFilter(s.to_string())),
        }
    }
}

/// 蔵書一覧 — 集約ルート。挿入順を保持し、重複は許容する。
/// 位置（index）は同一セッション内でのみ有効で、削除で後続が1つ詰まる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    books: Vec<Book>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn get(&self, index: usize) -> Option<&Book> {
        self.books.get(index)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    /// 検証してから末尾に追加する。added_dateは呼び出し側が渡す。
    pub fn add(
        &mut self,
        req: AddBookRequest,
        added_date: NaiveDateTime,
    ) -> Result<&Book, DomainError> {
        let req = req.validate()?;
        self.books.push(Book::new(req, added_date));
        let last = self.books.len() - 1;
        Ok(&self.books[last])
    }

    /// 範囲外なら何もせず `None`。
    pub fn remove(&mut self, index: usize) -> Option<Book> {
        if index < self.books.len() {
            Some(self.books.remove(index))
        } else {
            None
        }
    }

    /// 範囲外なら `false`。
    pub fn toggle_read_status(&mut self, index: usize) -> bool {
        match self.books.get_mut(index) {
            Some(book) => {
                book.toggle_read_status();
                true
            }
            None => false,
        }
    }

    /// 大文字小文字を無視した部分一致。(位置, Book) を一覧順で返す。
    pub fn matches<'a>(
        &'a self,
        term: &str,
        field: SearchField,
    ) -> impl Iterator<Item = (usize, &'a Book)> + 'a {
        let needle = term.to_lowercase();
        self.books
            .iter()
            .enumerate()
            .filter(move |(_, book)| field.value_of(book).to_lowercase().contains(&needle))
    }

    pub fn search(&self, term: &str, field: SearchField) -> Vec<&Book> {
        self.matches(term, field).map(|(_, book)| book).collect()
    }
}
