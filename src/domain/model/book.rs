use chrono::{Local, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// 入力フォームで提示するジャンル候補。強制はしない（自由入力も許容）。
pub const SUGGESTED_GENRES: &[&str] = &[
    "Fiction",
    "Non-Fiction",
    "Science Fiction",
    "Fantasy",
    "Mystery",
    "Romance",
    "Biography",
    "History",
    "Self-Help",
    "Poetry",
    "Other",
];

/// genreが空のときに使う値
pub const DEFAULT_GENRE: &str = "Other";

/// 永続化ファイル上の `added_date` 書式
pub const ADDED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 書籍追加リクエスト
#[derive(Debug, Clone)]
pub struct AddBookRequest {
    pub title: String,
    pub author: String,
    pub publication_year: u16,
    pub genre: String,
    pub read_status: bool,
}

impl AddBookRequest {
    /// title / author を trim し、空なら弾く。空のgenreは `DEFAULT_GENRE` にする。
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(DomainError::EmptyField { field: "title" });
        }
        let author = self.author.trim().to_string();
        if author.is_empty() {
            return Err(DomainError::EmptyField { field: "author" });
        }
        let genre = match self.genre.trim() {
            "" => DEFAULT_GENRE.to_string(),
            g => g.to_string(),
        };
        Ok(Self {
            title,
            author,
            genre,
            ..self
        })
    }
}

/// 蔵書1冊分のレコード。Catalogが所有し、Catalogを通じて操作する。
/// ファイルから読む場合も空のtitle / author / genreは受け付けない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredBook")]
pub struct Book {
    title: String,
    author: String,
    publication_year: u16,
    genre: String,
    read_status: bool,
    #[serde(with = "added_date_format")]
    added_date: NaiveDateTime,
}

impl Book {
    pub(crate) fn new(req: AddBookRequest, added_date: NaiveDateTime) -> Self {
        Self {
            title: req.title,
            author: req.author,
            publication_year: req.publication_year,
            genre: req.genre,
            read_status: req.read_status,
            added_date,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn publication_year(&self) -> u16 {
        self.publication_year
    }

    pub fn genre(&self) -> &str {
        &self.genre
    }

    pub fn read_status(&self) -> bool {
        self.read_status
    }

    pub fn added_date(&self) -> NaiveDateTime {
        self.added_date
    }

    /// 出版年を10年単位に切り捨てた値（1965 → 1960）
    pub fn decade(&self) -> u16 {
        self.publication_year / 10 * 10
    }

    pub(crate) fn toggle_read_status(&mut self) {
        self.read_status = !self.read_status;
    }
}

/// 永続化ファイル上のレコード。検証前の値。
#[derive(Deserialize)]
struct StoredBook {
    title: String,
    author: String,
    publication_year: u16,
    genre: String,
    read_status: bool,
    #[serde(with = "added_date_format")]
    added_date: NaiveDateTime,
}

impl TryFrom<StoredBook> for Book {
    type Error = DomainError;

    fn try_from(raw: StoredBook) -> Result<Self, Self::Error> {
        for (field, value) in [
            ("title", &raw.title),
            ("author", &raw.author),
            ("genre", &raw.genre),
        ] {
            if value.trim().is_empty() {
                return Err(DomainError::EmptyField { field });
            }
        }
        Ok(Self {
            title: raw.title,
            author: raw.author,
            publication_year: raw.publication_year,
            genre: raw.genre,
            read_status: raw.read_status,
            added_date: raw.added_date,
        })
    }
}

/// 現在時刻（ローカル、秒単位に切り捨て）。
/// 永続化書式が秒までなので、保存→読み込みで値が変わらないようにする。
pub fn added_date_now() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

mod added_date_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::ADDED_DATE_FORMAT;

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format(ADDED_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, ADDED_DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}
