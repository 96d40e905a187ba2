use library_mcp::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env();
    library_mcp::logging::init(&config.log_filter);

    library_mcp::interface::mcp::run(config.catalog_path).await
}
