use tracing_subscriber::EnvFilter;

/// stderrへのログ出力を初期化する。stdoutはMCPの通信路なので使わない。
/// 既に初期化済みなら何もしない。
pub fn init(filter: &str) {
    let env_filter = EnvFilter::try_new(filter)
        .unwrap_or_else(|_| EnvFilter::new(crate::config::DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .try_init();
}
