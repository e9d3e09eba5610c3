use thiserror::Error;

/// 构造回调使用的装箱错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 容器操作的结果类型
pub type Result<T> = std::result::Result<T, ContainerError>;

/// 依赖注入容器错误
#[derive(Debug, Error)]
pub enum ContainerError {
    /// 配置错误 - 合并定义时发现（例如对非数组条目使用 add）
    #[error("Invalid definition for entry '{name}': {reason}")]
    InvalidDefinition { name: String, reason: String },

    /// 条目未定义
    #[error("No entry or class found for '{name}'")]
    NotFound { name: String },

    /// 已定义的条目引用了未定义的名称
    #[error("Error while resolving entry '{entry}': dependency '{missing}' is not defined")]
    DependencyNotFound { entry: String, missing: String },

    /// 环境变量不存在且没有默认值
    #[error("Environment variable '{variable}' is not defined (required by entry '{entry}')")]
    EnvironmentVariableNotFound { entry: String, variable: String },

    /// 循环依赖检测 - 包含完整的依赖链
    #[error("Circular dependency detected: {}", .chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    /// create 定义引用了未注册构造器的类型
    #[error("Entry '{entry}' cannot be resolved: type '{type_id}' has no registered constructor")]
    TypeNotRegistered { entry: String, type_id: String },

    /// 构造失败 - 保留底层错误
    #[error("Error while resolving entry '{entry}': construction of '{type_name}' failed: {source}")]
    ConstructionFailed {
        entry: String,
        type_name: String,
        #[source]
        source: BoxError,
    },

    /// 类型转换失败
    #[error("Entry '{entry}' is not an instance of '{expected}' (found {actual})")]
    TypeCastFailed {
        entry: String,
        expected: String,
        actual: String,
    },

    /// 解析深度超过配置上限
    #[error("Resolution of '{entry}' exceeded the maximum depth of {limit}")]
    ResolutionDepthExceeded { entry: String, limit: usize },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ContainerError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ContainerError::InvalidDefinition {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether the error means the requested name is undefined, as opposed to
    /// a defined entry that failed to resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ContainerError::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}
