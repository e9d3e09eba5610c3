//! 闭包类定义：factory 与 decorate

use std::fmt;
use std::sync::Arc;

use super::{Definition, Scope};
use crate::errors::BoxError;
use crate::resolver::FactoryContext;
use crate::value::Value;

/// 工厂闭包签名
pub type FactoryFn = dyn Fn(&mut FactoryContext<'_>) -> Result<Value, BoxError> + Send + Sync;

/// 装饰器闭包签名：接收被装饰定义的解析结果
pub type DecoratorFn =
    dyn Fn(Value, &mut FactoryContext<'_>) -> Result<Value, BoxError> + Send + Sync;

/// 函数式工厂定义
#[derive(Clone)]
pub struct FactoryDefinition {
    callable: Arc<FactoryFn>,
    scope: Option<Scope>,
    label: Option<String>,
}

impl FactoryDefinition {
    pub fn new<F>(callable: F) -> Self
    where
        F: Fn(&mut FactoryContext<'_>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            callable: Arc::new(callable),
            scope: None,
            label: None,
        }
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    /// 错误信息和调试输出中使用的名称
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn scope_or(&self, default: Scope) -> Scope {
        self.scope.unwrap_or(default)
    }

    pub fn label_or_default(&self) -> &str {
        self.label.as_deref().unwrap_or("closure")
    }

    pub(crate) fn call(&self, context: &mut FactoryContext<'_>) -> Result<Value, BoxError> {
        (self.callable)(context)
    }
}

impl fmt::Debug for FactoryDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryDefinition")
            .field("scope", &self.scope)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for FactoryDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "factory({})", self.label_or_default())?;
        if let Some(scope) = self.scope {
            write!(f, " [{}]", scope)?;
        }
        Ok(())
    }
}

/// 装饰定义 - 合并时包裹该条目之前的定义
#[derive(Clone)]
pub struct DecorateDefinition {
    decorator: Arc<DecoratorFn>,
    inner: Option<Box<Definition>>,
}

impl DecorateDefinition {
    pub fn new<F>(decorator: F) -> Self
    where
        F: Fn(Value, &mut FactoryContext<'_>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            decorator: Arc::new(decorator),
            inner: None,
        }
    }

    /// 被装饰的定义，合并之前为 `None`
    pub fn inner(&self) -> Option<&Definition> {
        self.inner.as_deref()
    }

    pub(crate) fn wrap(mut self, previous: Definition) -> Self {
        self.inner = Some(Box::new(previous));
        self
    }

    pub(crate) fn call(
        &self,
        value: Value,
        context: &mut FactoryContext<'_>,
    ) -> Result<Value, BoxError> {
        (self.decorator)(value, context)
    }
}

impl fmt::Debug for DecorateDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecorateDefinition")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for DecorateDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => write!(f, "decorate({})", inner),
            None => write!(f, "decorate(?)"),
        }
    }
}
