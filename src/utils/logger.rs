use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 給人看的精簡格式
    Compact,
    /// 給外部收集器的 JSON 格式
    Json,
}

/// RUST_LOG 優先，否則依 verbose 決定本 crate 的層級
fn console_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "webhook_console=debug,info"
        } else {
            "webhook_console=info,warn"
        })
    })
}

/// 日誌一律寫到 stderr，stdout 保留給動作輸出
pub fn init_logger(format: LogFormat, verbose: bool) {
    let registry = tracing_subscriber::registry().with(console_filter(verbose));
    let layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
    if let Err(e) = result {
        eprintln!("logger already initialised: {}", e);
    }
}
