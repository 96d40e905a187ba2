use std::path::PathBuf;

/// 蔵書ファイルの既定パス
pub const DEFAULT_CATALOG_PATH: &str = "library.json";

/// ログフィルタの既定値（`RUST_LOG` 未設定時）
pub const DEFAULT_LOG_FILTER: &str = "info";

/// 起動設定。第1引数 = 蔵書ファイル、`RUST_LOG` = ログフィルタ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub catalog_path: PathBuf,
    pub log_filter: String,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_parts(std::env::args().nth(1), std::env::var("RUST_LOG").ok())
    }

    pub fn from_parts(catalog_arg: Option<String>, log_filter: Option<String>) -> Self {
        Self {
            catalog_path: catalog_arg
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH)),
            log_filter: log_filter
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}
