//! MCP Server for library-mcp
//!
//! MCP Protocol (stdio) <-> application::LibraryService / ExportService
//!
//! 8 tools: book_add, book_list, book_remove, book_toggle, book_search, stats, export, reload

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rmcp::{
    handler::server::{tool::ToolCallContext, tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolRequestParams, CallToolResult, Content, Implementation, ListToolsResult,
        PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
    transport::stdio,
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::application::error::AppError;
use crate::application::export::{ExportConfig, ExportFormat, ExportService};
use crate::application::service::{Applied, LibraryService};
use crate::domain::model::book::{AddBookRequest, DEFAULT_GENRE, SUGGESTED_GENRES};
use crate::domain::model::catalog::{ReadFilter, SearchField};
use crate::domain::stats::{CountEntry, LibraryStats};
use crate::infra::json_store::JsonCatalogRepository;

/// 出版年の入力上限（フォームの数値入力と同じ範囲）
const MAX_PUBLICATION_YEAR: u16 = 9999;

type Service = LibraryService<JsonCatalogRepository>;

// =============================================================================
// Public entry point
// =============================================================================

/// MCP Serverを起動する。catalog_pathは蔵書JSONファイル。
pub async fn run(catalog_path: PathBuf) -> anyhow::Result<()> {
    let mut service = LibraryService::new(JsonCatalogRepository::new(&catalog_path));
    // 読み込み失敗は致命的ではない（空のまま起動し、`reload` で再試行できる）
    if let Err(e) = service.load() {
        tracing::warn!(path = %catalog_path.display(), error = %e, "failed to load catalog");
    }
    tracing::info!(path = %catalog_path.display(), "library-mcp serving on stdio");

    let server = LibraryMcpServer::new(service);
    let running = server.serve(stdio()).await?;
    running.waiting().await?;
    Ok(())
}

// =============================================================================
// MCP Server
// =============================================================================

#[derive(Clone)]
struct LibraryMcpServer {
    service: Arc<Mutex<Service>>,
    tool_router: ToolRouter<Self>,
}

impl LibraryMcpServer {
    fn new(service: Service) -> Self {
        Self {
            service: Arc::new(Mutex::new(service)),
            tool_router: Self::tool_router(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Service>, McpError> {
        self.service
            .lock()
            .map_err(|_| McpError::internal_error("Lock poisoned", None))
    }

    fn to_mcp_error(e: AppError) -> McpError {
        match e {
            AppError::Domain(d) => McpError::invalid_params(format!("{d}"), None),
            other => McpError::internal_error(format!("{other}"), None),
        }
    }
}

// =============================================================================
// ServerHandler impl
// =============================================================================

impl ServerHandler for LibraryMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "library-mcp".to_string(),
                title: Some("Library MCP: Personal Book Tracker".to_string()),
                description: Some(
                    "Personal library: add, list, search, and remove books, \
                     track read status, and view reading statistics."
                        .to_string(),
                ),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Track a personal reading list.\n\
                 \n\
                 Books are addressed by their position number from `book_list` (1-based). \
                 Positions shift down after a removal, so re-run `book_list` before removing again.\n\
                 \n\
                 Tools: `book_add`, `book_list`, `book_search`, `book_toggle`, `book_remove`, \
                 `stats`, `export`. `reload` re-reads the library file."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tool_router.list_all(),
            next_cursor: None,
            meta: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let tool_ctx = ToolCallContext::new(self, request, context);
        self.tool_router.call(tool_ctx).await
    }
}

// =============================================================================
// Request types
// =============================================================================

fn validate_year(year: u16) -> Result<u16, McpError> {
    if year > MAX_PUBLICATION_YEAR {
        return Err(McpError::invalid_params(
            format!("publication_year must be between 0 and {MAX_PUBLICATION_YEAR}"),
            None,
        ));
    }
    Ok(year)
}

/// 1始まりの表示番号 → 0始まりの位置。
fn to_index(position: usize) -> Result<usize, McpError> {
    position.checked_sub(1).ok_or_else(|| {
        McpError::invalid_params("position starts at 1 (see `book_list`)", None)
    })
}

fn parse_read_filter(s: Option<&str>) -> Result<ReadFilter, McpError> {
    match s {
        None => Ok(ReadFilter::All),
        Some(raw) => raw
            .parse()
            .map_err(|e| McpError::invalid_params(format!("{e}"), None)),
    }
}

fn parse_search_field(s: Option<&str>) -> Result<SearchField, McpError> {
    match s {
        None => Ok(SearchField::Title),
        Some(raw) => raw
            .parse()
            .map_err(|e| McpError::invalid_params(format!("{e}"), None)),
    }
}

fn default_export_filename(format: &ExportFormat) -> String {
    match format {
        ExportFormat::Markdown => "library.md".to_string(),
        ExportFormat::Json => "library-report.json".to_string(),
    }
}

/// 2つのパスが同じファイルを指すか。
/// ファイルが未作成でも親ディレクトリが存在すればそこまでcanonicalizeして比較する。
fn same_file_path(a: &Path, b: &Path) -> bool {
    fn resolve(p: &Path) -> PathBuf {
        if let Ok(full) = p.canonicalize() {
            return full;
        }
        let parent = match p.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        match (parent.canonicalize(), p.file_name()) {
            (Ok(dir), Some(name)) => dir.join(name),
            _ => std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf()),
        }
    }
    resolve(a) == resolve(b)
}

/// filenameにパス区切り文字や".."が含まれていないことを検証する。
fn validate_filename(filename: &str) -> Result<(), McpError> {
    if filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
        || filename.is_empty()
    {
        return Err(McpError::invalid_params(
            "filename must not contain path separators, '..', or be empty",
            None,
        ));
    }
    Ok(())
}

/// 保存失敗を結果テキストに注記する（変更自体は成立している）。
fn with_persist_warning<T>(text: String, applied: &Applied<T>) -> String {
    match &applied.persist_error {
        Some(e) => format!("{text}\nWarning: change kept in memory but not saved ({e})"),
        None => text,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBookAddRequest {
    #[schemars(description = "Book title (required)")]
    pub title: String,
    #[schemars(description = "Author name (required)")]
    pub author: String,
    #[schemars(description = "Year published (0-9999)")]
    pub publication_year: u16,
    #[schemars(
        description = "Genre. Suggested: Fiction, Non-Fiction, Science Fiction, Fantasy, Mystery, Romance, Biography, History, Self-Help, Poetry, Other. Free text accepted. Default: Other"
    )]
    pub genre: Option<String>,
    #[schemars(description = "Whether the book has been read (default: false)")]
    #[serde(default)]
    pub read_status: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBookListRequest {
    #[schemars(description = "Filter: 'all' (default), 'read', or 'unread'")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpPositionRequest {
    #[schemars(description = "Book number from `book_list` output (1-based)")]
    pub position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpBookSearchRequest {
    #[schemars(description = "Text to look for (case-insensitive substring). Empty matches all.")]
    #[serde(default)]
    pub term: String,
    #[schemars(description = "Field to search: 'title' (default), 'author', or 'genre'")]
    pub field: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpExportRequest {
    #[schemars(description = "Output directory path (default: current directory)")]
    pub output_dir: Option<String>,
    #[schemars(
        description = "Output filename (default: 'library.md' or 'library-report.json'). Must not be the library file itself."
    )]
    pub filename: Option<String>,
    #[schemars(description = "Output format: 'markdown' (default) or 'json' (books + statistics)")]
    pub format: Option<String>,
    #[schemars(description = "Markdown only: 'all' (default), 'read', or 'unread'")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct McpEmptyRequest {}

// =============================================================================
// Tool implementations
// =============================================================================

#[tool_router]
impl LibraryMcpServer {
    #[tool(
        name = "book_add",
        description = "Add a book to the end of the library. Title and author must not be blank.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_add(
        &self,
        Parameters(req): Parameters<McpBookAddRequest>,
    ) -> Result<CallToolResult, McpError> {
        let publication_year = validate_year(req.publication_year)?;
        let mut svc = self.lock()?;
        let applied = svc
            .add(AddBookRequest {
                title: req.title,
                author: req.author,
                publication_year,
                genre: req.genre.unwrap_or_else(|| DEFAULT_GENRE.to_string()),
                read_status: req.read_status,
            })
            .map_err(Self::to_mcp_error)?;
        if !SUGGESTED_GENRES.contains(&applied.value.genre()) {
            tracing::debug!(genre = applied.value.genre(), "genre outside the suggested list");
        }

        let position = svc.books().len();
        let text = format!(
            "Added: {}",
            ExportService::format_line(position, &applied.value)
        );
        Ok(CallToolResult::success(vec![Content::text(
            with_persist_warning(text, &applied),
        )]))
    }

    #[tool(
        name = "book_list",
        description = "List books with their position numbers. Optionally filter by read status.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_list(
        &self,
        Parameters(req): Parameters<McpBookListRequest>,
    ) -> Result<CallToolResult, McpError> {
        let filter = parse_read_filter(req.filter.as_deref())?;
        let svc = self.lock()?;

        if svc.books().is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(
                "Library is empty. Use `book_add` to add books.",
            )]));
        }

        let output = ExportService::render_markdown(svc.catalog(), filter);
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(
        name = "book_remove",
        description = "Remove the book at a position from `book_list`. Later books move up by one.",
        annotations(
            read_only_hint = false,
            destructive_hint = true,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_remove(
        &self,
        Parameters(req): Parameters<McpPositionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let index = to_index(req.position)?;
        let mut svc = self.lock()?;

        // 削除前にタイトルを取得
        let title = svc
            .catalog()
            .get(index)
            .map(|b| b.title().to_string())
            .unwrap_or_default();

        let applied = svc.remove(index);
        let text = if applied.value {
            format!("Removed: {}. {}", req.position, title)
        } else {
            format!(
                "No book at position {} (library has {} books).",
                req.position,
                svc.books().len()
            )
        };
        Ok(CallToolResult::success(vec![Content::text(
            with_persist_warning(text, &applied),
        )]))
    }

    #[tool(
        name = "book_toggle",
        description = "Flip the read/unread status of the book at a position from `book_list`.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_toggle(
        &self,
        Parameters(req): Parameters<McpPositionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let index = to_index(req.position)?;
        let mut svc = self.lock()?;

        let applied = svc.toggle_read_status(index);
        let text = match svc.catalog().get(index).filter(|_| applied.value) {
            Some(book) => format!(
                "Marked as {}: {}",
                if book.read_status() { "read" } else { "unread" },
                ExportService::format_line(req.position, book)
            ),
            None => format!(
                "No book at position {} (library has {} books).",
                req.position,
                svc.books().len()
            ),
        };
        Ok(CallToolResult::success(vec![Content::text(
            with_persist_warning(text, &applied),
        )]))
    }

    #[tool(
        name = "book_search",
        description = "Search books by title, author, or genre (case-insensitive substring). Results keep library order and show position numbers.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn book_search(
        &self,
        Parameters(req): Parameters<McpBookSearchRequest>,
    ) -> Result<CallToolResult, McpError> {
        let field = parse_search_field(req.field.as_deref())?;
        let svc = self.lock()?;

        let lines: Vec<String> = svc
            .catalog()
            .matches(&req.term, field)
            .map(|(i, book)| ExportService::format_line(i + 1, book))
            .collect();

        let output = if lines.is_empty() {
            format!("No books match '{}' in {}.", req.term, field)
        } else {
            format!(
                "# {} match(es) for '{}' in {}\n\n{}\n",
                lines.len(),
                req.term,
                field,
                lines.join("\n")
            )
        };
        Ok(CallToolResult::success(vec![Content::text(output)]))
    }

    #[tool(
        name = "stats",
        description = "Show reading statistics: totals, percent read, and counts by genre, author, and decade.",
        annotations(
            read_only_hint = true,
            destructive_hint = false,
            open_world_hint = false
        )
    )]
    async fn stats(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpEmptyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let svc = self.lock()?;
        let stats = svc.stats();
        Ok(CallToolResult::success(vec![Content::text(format_stats(
            &stats,
        ))]))
    }

    #[tool(
        name = "export",
        description = "Write the library to a file: a Markdown reading list or a JSON report with statistics. Library is NOT modified.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn export(
        &self,
        Parameters(req): Parameters<McpExportRequest>,
    ) -> Result<CallToolResult, McpError> {
        let format = match req.format.as_deref() {
            Some("json") => ExportFormat::Json,
            Some("markdown") | None => ExportFormat::Markdown,
            Some(other) => {
                return Err(McpError::invalid_params(
                    format!("Unknown format: '{other}'. Use: markdown, json"),
                    None,
                ))
            }
        };
        let filter = parse_read_filter(req.filter.as_deref())?;
        let output_dir = req
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let filename = req.filename.unwrap_or_else(|| default_export_filename(&format));
        validate_filename(&filename)?;

        let config = ExportConfig {
            output_dir,
            filename,
            format,
            filter,
        };

        let svc = self.lock()?;
        let target = config.output_dir.join(&config.filename);
        if same_file_path(&target, svc.repository().path()) {
            return Err(McpError::invalid_params(
                format!(
                    "Export target '{}' is the library file itself. Choose another filename or output_dir",
                    target.display()
                ),
                None,
            ));
        }
        let path = ExportService::export(svc.catalog(), &config).map_err(Self::to_mcp_error)?;

        Ok(CallToolResult::success(vec![Content::text(format!(
            "Library exported to: {}",
            path.display()
        ))]))
    }

    #[tool(
        name = "reload",
        description = "Re-read the library file. On failure the current in-memory library is kept.",
        annotations(
            read_only_hint = false,
            destructive_hint = false,
            idempotent_hint = true,
            open_world_hint = false
        )
    )]
    async fn reload(
        &self,
        #[allow(unused_variables)] Parameters(_req): Parameters<McpEmptyRequest>,
    ) -> Result<CallToolResult, McpError> {
        let mut svc = self.lock()?;
        let count = svc.load().map_err(Self::to_mcp_error)?.len();
        Ok(CallToolResult::success(vec![Content::text(format!(
            "Reloaded: {count} books"
        ))]))
    }
}

// =============================================================================
// Helpers — statistics text
// =============================================================================

fn format_stats(stats: &LibraryStats) -> String {
    let mut output = format!(
        "# Statistics\n\nTotal: {}\nRead: {} ({:.1}%)\nUnread: {}\n",
        stats.total_books,
        stats.read_books,
        stats.percent_read,
        stats.unread_books()
    );
    push_counts(&mut output, "By genre", &stats.genre_counts);
    push_counts(&mut output, "By author", &stats.author_counts);
    push_counts(&mut output, "By decade", &decade_labels(&stats.decade_counts));
    output
}

fn decade_labels(decades: &[CountEntry<u16>]) -> Vec<CountEntry<String>> {
    decades
        .iter()
        .map(|e| CountEntry {
            key: format!("{}s", e.key),
            count: e.count,
        })
        .collect()
}

fn push_counts(output: &mut String, heading: &str, entries: &[CountEntry<String>]) {
    if entries.is_empty() {
        return;
    }
    output.push_str(&format!("\n## {heading}\n"));
    for entry in entries {
        output.push_str(&format!("- {}: {}\n", entry.key, entry.count));
    }
}

// =============================================================================
// Tests
// =============================================================================
