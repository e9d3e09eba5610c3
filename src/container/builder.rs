use std::sync::Arc;

use super::Container;
use crate::config::ContainerConfig;
use crate::definition::Definition;
use crate::env::{EnvironmentSource, ProcessEnvironment};
use crate::errors::{BoxError, Result};
use crate::factory::{Constructor, TypeRegistry};
use crate::registry::{DefinitionRegistry, DefinitionSource};
use crate::value::Value;

/// 容器构建器
///
/// Accumulates definition layers and constructors, then freezes them into a
/// [`Container`]. Merge errors are reported by the `add_*` call that caused
/// them.
pub struct ContainerBuilder {
    registry: DefinitionRegistry,
    types: TypeRegistry,
    environment: Arc<dyn EnvironmentSource>,
    config: ContainerConfig,
}

impl ContainerBuilder {
    /// 创建构建器，使用进程环境变量和默认配置
    pub fn new() -> Self {
        Self {
            registry: DefinitionRegistry::new(),
            types: TypeRegistry::new(),
            environment: Arc::new(ProcessEnvironment),
            config: ContainerConfig::default(),
        }
    }

    /// 使用校验过的配置；非法配置（例如解析深度为 0）立即报错
    pub fn with_config(mut self, config: ContainerConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// 替换环境变量来源（测试中常用）
    pub fn with_environment(mut self, environment: impl EnvironmentSource + 'static) -> Self {
        self.environment = Arc::new(environment);
        self
    }

    /// 注册构造闭包，`create(type_id)` 定义会调用它
    pub fn register_type<T, F>(mut self, type_id: impl Into<String>, constructor_fn: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Vec<Value>) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        self.types.register_type(type_id, constructor_fn);
        self
    }

    /// 注册方法注入点，供 `create(type_id).method(name, ...)` 使用
    pub fn register_method<T, F>(
        mut self,
        type_id: impl Into<String>,
        name: impl Into<String>,
        method_fn: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut T, Vec<Value>) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.types.register_method(type_id, name, method_fn);
        self
    }

    /// 注册属性注入点，供 `create(type_id).property(name, value)` 使用
    pub fn register_property<T, F>(
        mut self,
        type_id: impl Into<String>,
        name: impl Into<String>,
        setter: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut T, Value) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.types.register_property(type_id, name, setter);
        self
    }

    pub fn register_constructor(
        mut self,
        type_id: impl Into<String>,
        constructor: impl Constructor + 'static,
    ) -> Self {
        self.types.register(type_id, constructor);
        self
    }

    /// 添加一层定义，按调用顺序合并
    pub fn add_definitions<I, K, D>(mut self, layer: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: Into<Definition>,
    {
        self.registry.add_definitions(layer)?;
        Ok(self)
    }

    pub fn add_definition_source(mut self, source: &dyn DefinitionSource) -> Result<Self> {
        self.registry.add_source(source)?;
        Ok(self)
    }

    pub fn build(self) -> Container {
        tracing::info!(
            entries = self.registry.len(),
            layers = self.registry.layer_count(),
            types = self.types.len(),
            default_scope = %self.config.default_scope,
            "Container built"
        );
        Container::from_parts(self.registry, self.types, self.environment, self.config)
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{add, create, Scope};
    use crate::errors::ContainerError;
    use crate::{definitions, defs};

    struct Widget;

    #[test]
    fn test_merge_error_fails_fast() {
        let result = ContainerBuilder::new()
            .add_definitions(definitions! { "widget" => create("Widget") })
            .unwrap()
            .add_definitions(definitions! { "widget" => add(defs!["x"]) });

        assert!(matches!(
            result.err(),
            Some(ContainerError::InvalidDefinition { ref name, .. }) if name == "widget"
        ));
    }

    #[test]
    fn test_default_scope_from_config() {
        let container = ContainerBuilder::new()
            .with_config(ContainerConfig::default().with_default_scope(Scope::Prototype))
            .unwrap()
            .register_type("Widget", |_| Ok(Widget))
            .add_definitions(definitions! { "widget" => create("Widget") })
            .unwrap()
            .build();

        let a = container.get("widget").unwrap();
        let b = container.get("widget").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result =
            ContainerBuilder::new().with_config(ContainerConfig::default().with_max_resolution_depth(0));

        assert!(matches!(
            result.err(),
            Some(ContainerError::Config(crate::errors::ConfigError::InvalidValue { ref field, .. }))
                if field == "max_resolution_depth"
        ));
    }
}
