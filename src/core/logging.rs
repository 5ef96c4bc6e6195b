//! 日志初始化
//!
//! 基于 tracing 的日志框架。`RUST_LOG` 环境变量优先于配置中的日志级别。

use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::{LogLevel, LoggingConfig};

impl LogLevel {
    /// 对应的 `EnvFilter` 指令
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_directive()))
}

/// 日志输出目标
#[derive(Debug)]
pub enum LogOutput {
    File(File),
    Console,
    Disabled,
}

/// 按配置选择输出目标
///
/// 文件打开失败时总是退回到控制台，与 `log_to_console` 无关。
pub fn select_output(config: &LoggingConfig) -> LogOutput {
    if config.log_to_file {
        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file_path)
        {
            Ok(file) => return LogOutput::File(file),
            Err(e) => {
                eprintln!(
                    "Failed to open log file {}: {}, falling back to console",
                    config.log_file_path, e
                );
                return LogOutput::Console;
            }
        }
    }

    if config.log_to_console {
        LogOutput::Console
    } else {
        LogOutput::Disabled
    }
}

/// 初始化日志系统
///
/// 重复调用是安全的：已存在全局订阅者时直接返回。
pub fn init_logging(config: &LoggingConfig) {
    match select_output(config) {
        LogOutput::File(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter(config))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
            tracing::info!(target: "mujoco.module", "Logging to {}", config.log_file_path);
        }
        LogOutput::Console => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter(config))
                .try_init();
        }
        LogOutput::Disabled => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_directive() {
        assert_eq!(LogLevel::Warn.as_directive(), "warn");
        assert_eq!(LogLevel::Trace.as_directive(), "trace");
    }

    #[test]
    fn test_unopenable_file_falls_back_to_console() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            log_to_file: true,
            log_to_console: false,
            log_file_path: dir.path().join("missing").join("bridge.log").display().to_string(),
            ..Default::default()
        };
        assert!(matches!(select_output(&config), LogOutput::Console));
    }

    #[test]
    fn test_output_selection() {
        let dir = tempfile::tempdir().unwrap();
        let file_config = LoggingConfig {
            log_to_file: true,
            log_file_path: dir.path().join("bridge.log").display().to_string(),
            ..Default::default()
        };
        assert!(matches!(select_output(&file_config), LogOutput::File(_)));

        let silent = LoggingConfig {
            log_to_file: false,
            log_to_console: false,
            ..Default::default()
        };
        assert!(matches!(select_output(&silent), LogOutput::Disabled));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        let config = LoggingConfig::default();
        init_logging(&config);
        init_logging(&config);
    }
}
