use serde::Deserialize;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::errors::ConfigError;

/// 日志格式配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑格式
    Compact,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 输出格式
    pub format: LogFormat,
    /// 是否显示目标模块
    pub show_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            show_target: true,
        }
    }
}

impl LoggingConfig {
    /// 创建测试环境配置
    pub fn testing() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::Compact,
            show_target: false,
        }
    }

    pub fn level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.level).map_err(|_| ConfigError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("unknown log level '{}'", self.level),
        })
    }
}

/// 初始化日志系统
///
/// `RUST_LOG` 存在时优先使用其中的过滤规则，否则使用配置中的级别。
/// 全局订阅者已存在时返回 [`ConfigError::Logging`]，调用方可以忽略该错误。
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let level = config.level()?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(config.show_target);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing::debug!(level = %level, format = ?config.format, "Logging system initialized");
    Ok(())
}

fn env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()))
}
