//! gitai-di - 按名称解析条目的依赖注入容器
//!
//! Definitions are merged layer by layer into a registry, then resolved on
//! demand with singleton/prototype scoping and cycle detection.

pub mod cache;
pub mod config;
pub mod container;
pub mod definition;
pub mod env;
pub mod errors;
pub mod factory;
pub mod logging;
pub mod registry;
pub mod resolver;
pub mod value;

// Re-export commonly used items for convenience
pub use config::ContainerConfig;
pub use container::{Container, ContainerBuilder, ContainerStats};
pub use definition::{
    add, array, create, decorate, env, env_or, env_or_null, factory, get, string, value,
    CreateDefinition, DecorateDefinition, Definition, EnvironmentDefinition, FactoryDefinition,
    Scope,
};
pub use env::{EnvironmentSource, ProcessEnvironment};
pub use errors::{BoxError, ConfigError, ContainerError, Result};
pub use factory::{
    required_argument, Constructor, FnConstructor, InjectorFn, TypeRegistry, ValueConstructor,
};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use registry::{DefinitionRegistry, DefinitionSource};
pub use resolver::{FactoryContext, ResolutionStack};
pub use value::{Instance, Value};
