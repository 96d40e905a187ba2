//! Catalogから集計値を導出する。副作用なし・永続化なし。

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use super::model::catalog::Catalog;

/// 集計の1行（キー → 件数）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry<K> {
    pub key: K,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub total_books: usize,
    pub read_books: usize,
    /// 0.0〜100.0。空のCatalogでは0。
    pub percent_read: f64,
    /// 件数の降順。同数は出現順。
    pub genre_counts: Vec<CountEntry<String>>,
    /// 件数の降順。同数は出現順。
    pub author_counts: Vec<CountEntry<String>>,
    /// 年代の昇順。
    pub decade_counts: Vec<CountEntry<u16>>,
}

impl LibraryStats {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let books = catalog.books();
        let total_books = books.len();
        let read_books = books.iter().filter(|b| b.read_status()).count();
        let percent_read = if total_books == 0 {
            0.0
        } else {
            read_books as f64 / total_books as f64 * 100.0
        };

        let mut decades: BTreeMap<u16, usize> = BTreeMap::new();
        for book in books {
            *decades.entry(book.decade()).or_insert(0) += 1;
        }

        Self {
            total_books,
            read_books,
            percent_read,
            genre_counts: count_by_frequency(books.iter().map(|b| b.genre().to_string())),
            author_counts: count_by_frequency(books.iter().map(|b| b.author().to_string())),
            decade_counts: decades
                .into_iter()
                .map(|(key, count)| CountEntry { key, count })
                .collect(),
        }
    }

    pub fn unread_books(&self) -> usize {
        self.total_books - self.read_books
    }
}

/// 出現順に数えてから件数降順で安定ソートする。
fn count_by_frequency<K, I>(keys: I) -> Vec<CountEntry<K>>
where
    K: Eq + Hash + Clone,
    I: IntoIterator<Item = K>,
{
    let mut slots: HashMap<K, usize> = HashMap::new();
    let mut entries: Vec<CountEntry<K>> = Vec::new();
    for key in keys {
        match slots.get(&key).copied() {
            Some(slot) => entries[slot].count += 1,
            None => {
                slots.insert(key.clone(), entries.len());
                entries.push(CountEntry { key, count: 1 });
            }
        }
    }
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}
