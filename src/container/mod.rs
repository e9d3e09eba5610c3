//! 依赖注入容器
//!
//! 提供按名称解析条目的功能，支持：
//! - 单例 / 原型作用域
//! - 递归解析嵌套定义
//! - 循环依赖检测
//! - 并发首次解析时的单例唯一性

mod builder;

pub use builder::ContainerBuilder;

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::cache::ScopeCache;
use crate::config::ContainerConfig;
use crate::definition::{Definition, Scope};
use crate::env::EnvironmentSource;
use crate::errors::{ContainerError, Result};
use crate::factory::TypeRegistry;
use crate::registry::DefinitionRegistry;
use crate::resolver::{downcast_entry, ResolutionStack, Resolver};
use crate::value::Value;

/// 容器内部状态 - 构建后注册表只读，只有单例缓存会增长
pub(crate) struct ContainerInner {
    registry: DefinitionRegistry,
    types: TypeRegistry,
    environment: Arc<dyn EnvironmentSource>,
    cache: ScopeCache,
    config: ContainerConfig,
    total_resolutions: AtomicUsize,
}

impl ContainerInner {
    pub(crate) fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub(crate) fn environment(&self) -> &dyn EnvironmentSource {
        self.environment.as_ref()
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    fn definition(&self, name: &str) -> Result<&Definition> {
        self.registry.get(name).ok_or_else(|| ContainerError::NotFound {
            name: name.to_string(),
        })
    }

    /// 解析条目 - 所有引用都经过这里，从而遵守作用域缓存
    pub(crate) fn get_with(&self, name: &str, stack: &mut ResolutionStack) -> Result<Value> {
        self.total_resolutions.fetch_add(1, Ordering::Relaxed);
        let definition = match (self.registry.get(name), stack.current()) {
            (Some(definition), _) => definition,
            // 被其他条目引用的名称缺失属于依赖错误，与请求的条目不存在区分开
            (None, Some(requester)) => {
                return Err(ContainerError::DependencyNotFound {
                    entry: requester.to_string(),
                    missing: name.to_string(),
                })
            }
            (None, None) => {
                return Err(ContainerError::NotFound {
                    name: name.to_string(),
                })
            }
        };
        let scope = definition.scope(self.config.default_scope);

        if scope == Scope::Singleton {
            if let Some(cached) = self.cache.get(name) {
                return Ok(cached);
            }
        }

        // 先入栈再进入 OnceCell：循环依赖必须在重入同一个单元之前报告
        stack.enter(name, self.config.max_resolution_depth)?;
        let result = match scope {
            Scope::Singleton => self
                .cache
                .get_or_try_init(name, &stack.entries().to_vec(), || {
                    self.resolve_definition(name, definition, stack)
                }),
            Scope::Prototype => self.resolve_definition(name, definition, stack),
        };
        stack.leave();

        if let Err(err) = &result {
            if stack.depth() == 0 {
                tracing::warn!(entry = name, error = %err, "entry resolution failed");
            } else {
                tracing::debug!(entry = name, error = %err, "nested resolution failed");
            }
        }
        result
    }

    fn resolve_definition(
        &self,
        name: &str,
        definition: &Definition,
        stack: &mut ResolutionStack,
    ) -> Result<Value> {
        tracing::debug!(entry = name, depth = stack.depth(), "resolving entry");
        Resolver::new(self).resolve(definition, stack)
    }
}

/// Name-keyed dependency injection container.
///
/// Cloning is cheap; clones share the definitions and the singleton cache.
///
/// ```
/// use gitai_di::{add, create, defs, definitions, get, ContainerBuilder};
///
/// struct Mailer;
///
/// let container = ContainerBuilder::new()
///     .register_type("Mailer", |_| Ok(Mailer))
///     .add_definitions(definitions! { "values" => defs!["v1", "v2"] })?
///     .add_definitions(definitions! {
///         "values" => add(defs!["v3", get("mailer")]),
///         "mailer" => create("Mailer"),
///     })?
///     .build();
///
/// let values = container.get("values")?;
/// assert_eq!(values.as_list().map(|items| items.len()), Some(4));
/// # Ok::<(), gitai_di::ContainerError>(())
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn from_parts(
        registry: DefinitionRegistry,
        types: TypeRegistry,
        environment: Arc<dyn EnvironmentSource>,
        config: ContainerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ContainerInner {
                registry,
                types,
                environment,
                cache: ScopeCache::new(),
                config,
                total_resolutions: AtomicUsize::new(0),
            }),
        }
    }

    /// 解析条目 - 主要API
    ///
    /// Singleton entries are resolved once and cached for the lifetime of the
    /// container; prototype entries are resolved on every call.
    pub fn get(&self, name: &str) -> Result<Value> {
        let mut stack = ResolutionStack::new();
        self.inner.get_with(name, &mut stack)
    }

    /// Typed access to a constructed instance.
    pub fn get_as<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>> {
        let value = self.get(name)?;
        downcast_entry(name, &value)
    }

    /// Resolve the entry's definition afresh, bypassing the cache for this
    /// entry. Nested references still honour their own scope.
    pub fn make(&self, name: &str) -> Result<Value> {
        let definition = self.inner.definition(name)?;
        let mut stack = ResolutionStack::new();
        stack.enter(name, self.inner.config.max_resolution_depth)?;
        let result = self.inner.resolve_definition(name, definition, &mut stack);
        stack.leave();
        result
    }

    /// 检查条目是否已定义
    pub fn has(&self, name: &str) -> bool {
        self.inner.has(name)
    }

    pub fn known_entry_names(&self) -> Vec<String> {
        self.inner.registry.names()
    }

    /// Human readable description of an entry's definition.
    pub fn debug_entry(&self, name: &str) -> Result<String> {
        let definition = self.inner.definition(name)?;
        let scope = definition.scope(self.inner.config.default_scope);
        Ok(format!("{} => {} (scope: {})", name, definition, scope))
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    /// 获取容器统计信息
    pub fn stats(&self) -> ContainerStats {
        ContainerStats {
            total_resolutions: self.inner.total_resolutions.load(Ordering::Relaxed),
            cache_hits: self.inner.cache.hits(),
            cache_misses: self.inner.cache.misses(),
            cached_entries: self.inner.cache.len(),
            registered_entries: self.inner.registry.len(),
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("entries", &self.inner.registry.len())
            .field("types", &self.inner.types)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// 容器统计信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStats {
    /// 总解析次数（包括嵌套引用）
    pub total_resolutions: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// 已缓存的单例数量
    pub cached_entries: usize,
    pub registered_entries: usize,
}

impl ContainerStats {
    /// 获取缓存命中率
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
