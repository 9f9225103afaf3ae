//! Logging Infrastructure
//!
//! tracing 订阅器初始化。过滤优先级：`RUST_LOG` 环境变量 >
//! 显式传入的级别 > `info`。

use tracing_subscriber::EnvFilter;

/// Initialize the logger with stdout output
pub fn init_logger() {
    init_logger_with_file(None, None);
}

/// Initialize the logger, optionally writing to a daily-rolling file
pub fn init_logger_with_file(log_level: Option<&str>, log_dir: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.unwrap_or("info")));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if let Some(dir) = log_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Failed to create log directory {}: {}", dir, e);
        } else {
            let file_appender = tracing_appender::rolling::daily(dir, "order-server.log");
            subscriber.with_writer(file_appender).with_ansi(false).init();
            return;
        }
    }

    subscriber.init();
}
