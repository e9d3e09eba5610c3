//! 定义解析器
//!
//! 把 [`Definition`] 递归地转换为 [`Value`]。引用一律回到容器的 `get` 路径，
//! 这样嵌套在数组或构造参数中的单例引用也能共享同一个缓存实例。
//! 循环依赖通过每次调用独立的解析栈检测。

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::container::ContainerInner;
use crate::definition::{CreateDefinition, Definition, EnvironmentDefinition};
use crate::errors::{BoxError, ContainerError, Result};
use crate::value::{Instance, Value};

/// 当前调用链上正在解析的条目名
#[derive(Debug, Clone, Default)]
pub struct ResolutionStack {
    entries: Vec<String>,
}

impl ResolutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry == name)
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// 最内层正在解析的条目
    pub fn current(&self) -> Option<&str> {
        self.entries.last().map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// 压栈，检测循环依赖和深度上限
    pub(crate) fn enter(&mut self, name: &str, limit: usize) -> Result<()> {
        if self.contains(name) {
            let mut chain = self.entries.clone();
            chain.push(name.to_string());
            return Err(ContainerError::CircularDependency { chain });
        }
        if self.entries.len() >= limit {
            return Err(ContainerError::ResolutionDepthExceeded {
                entry: name.to_string(),
                limit,
            });
        }
        self.entries.push(name.to_string());
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.entries.pop();
    }
}

/// Container access handed to factory and decorator closures.
///
/// Lookups made through the context share the caller's resolution stack, so a
/// factory that asks for its own entry is reported as a cycle.
pub struct FactoryContext<'a> {
    container: &'a ContainerInner,
    stack: &'a mut ResolutionStack,
}

impl<'a> FactoryContext<'a> {
    pub(crate) fn new(container: &'a ContainerInner, stack: &'a mut ResolutionStack) -> Self {
        Self { container, stack }
    }

    pub fn get(&mut self, name: &str) -> Result<Value> {
        self.container.get_with(name, self.stack)
    }

    pub fn get_as<T: Send + Sync + 'static>(&mut self, name: &str) -> Result<Arc<T>> {
        let value = self.get(name)?;
        downcast_entry(name, &value)
    }

    pub fn has(&self, name: &str) -> bool {
        self.container.has(name)
    }

    /// Name of the entry being built.
    pub fn entry(&self) -> &str {
        self.stack.current().unwrap_or_default()
    }
}

pub(crate) fn downcast_entry<T: Send + Sync + 'static>(name: &str, value: &Value) -> Result<Arc<T>> {
    value.downcast::<T>().ok_or_else(|| ContainerError::TypeCastFailed {
        entry: name.to_string(),
        expected: std::any::type_name::<T>().to_string(),
        actual: match value.as_instance() {
            Some(instance) => instance.type_name().to_string(),
            None => value.kind().to_string(),
        },
    })
}

/// 字符串表达式片段
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Segment<'e> {
    Literal(&'e str),
    Entry(&'e str),
}

/// 拆分 `{name}` 占位符；空的或未闭合的花括号按字面量处理
pub(crate) fn parse_expression(expression: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = expression;
    let mut literal_start = 0usize;
    let mut offset = 0usize;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find(|c: char| c == '{' || c == '}') {
            Some(close) if close > 0 && after.as_bytes()[close] == b'}' => {
                let open_abs = offset + open;
                if open_abs > literal_start {
                    segments.push(Segment::Literal(&expression[literal_start..open_abs]));
                }
                segments.push(Segment::Entry(&after[..close]));
                let consumed = open + 1 + close + 1;
                offset += consumed;
                literal_start = offset;
                rest = &rest[consumed..];
            }
            _ => {
                offset += open + 1;
                rest = after;
            }
        }
    }

    if literal_start < expression.len() {
        segments.push(Segment::Literal(&expression[literal_start..]));
    }
    segments
}

pub(crate) struct Resolver<'a> {
    container: &'a ContainerInner,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(container: &'a ContainerInner) -> Self {
        Self { container }
    }

    pub(crate) fn resolve(&self, definition: &Definition, stack: &mut ResolutionStack) -> Result<Value> {
        match definition {
            Definition::Value(value) => Ok(value.clone()),
            Definition::Reference(target) => self.container.get_with(target, stack),
            Definition::Array(items) => items
                .iter()
                .map(|item| self.resolve(item, stack))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Definition::Map(items) => items
                .iter()
                .map(|(key, item)| self.resolve(item, stack).map(|value| (key.clone(), value)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Value::Map),
            Definition::Add(_) => Err(ContainerError::invalid(
                current_entry(stack),
                "add() cannot be resolved on its own",
            )),
            Definition::Create(create) => self.resolve_create(create, stack),
            Definition::Factory(factory) => {
                let entry = current_entry(stack);
                let label = factory.label_or_default().to_string();
                let mut context = FactoryContext::new(self.container, stack);
                factory
                    .call(&mut context)
                    .map_err(|source| wrap_callable_error(entry, label, source))
            }
            Definition::Environment(env) => self.resolve_environment(env, stack),
            Definition::StringExpression(expression) => self
                .interpolate(expression, stack)
                .map(Value::String),
            Definition::Decorate(decorate) => {
                let entry = current_entry(stack);
                let inner = decorate.inner().ok_or_else(|| {
                    ContainerError::invalid(entry.clone(), "decorate() has nothing to decorate")
                })?;
                let value = self.resolve(inner, stack)?;
                let mut context = FactoryContext::new(self.container, stack);
                decorate
                    .call(value, &mut context)
                    .map_err(|source| wrap_callable_error(entry, "decorator".to_string(), source))
            }
        }
    }

    fn resolve_create(&self, create: &CreateDefinition, stack: &mut ResolutionStack) -> Result<Value> {
        let entry = current_entry(stack);
        let constructor = self
            .container
            .types()
            .get(create.type_id())
            .cloned()
            .ok_or_else(|| ContainerError::TypeNotRegistered {
                entry: entry.clone(),
                type_id: create.type_id().to_string(),
            })?;

        // 注入点在构造之前检查，避免构造出无法完成注入的实例
        for point in create.injection_points() {
            if self.container.types().injector(create.type_id(), point).is_none() {
                return Err(ContainerError::invalid(
                    entry,
                    format!(
                        "type '{}' has no injection point '{}'",
                        create.type_id(),
                        point
                    ),
                ));
            }
        }

        // 参数顺序必须与构造器声明一致
        let arguments = create
            .arguments()
            .iter()
            .map(|argument| self.resolve(argument, stack))
            .collect::<Result<Vec<_>>>()?;

        tracing::trace!(
            entry = %entry,
            type_id = create.type_id(),
            arguments = arguments.len(),
            "constructing instance"
        );

        let type_name = constructor.type_name().to_string();
        let mut value = constructor
            .construct(arguments)
            .map_err(|source| wrap_callable_error(entry.clone(), type_name.clone(), source))?;

        for (property, definition) in create.properties() {
            let property_value = self.resolve(definition, stack)?;
            self.inject(create, &entry, &type_name, property, &mut value, vec![property_value])?;
        }
        for (method, arguments) in create.methods() {
            let arguments = arguments
                .iter()
                .map(|argument| self.resolve(argument, stack))
                .collect::<Result<Vec<_>>>()?;
            self.inject(create, &entry, &type_name, method, &mut value, arguments)?;
        }
        Ok(value)
    }

    fn inject(
        &self,
        create: &CreateDefinition,
        entry: &str,
        type_name: &str,
        point: &str,
        value: &mut Value,
        arguments: Vec<Value>,
    ) -> Result<()> {
        let injector = self
            .container
            .types()
            .injector(create.type_id(), point)
            .cloned()
            .ok_or_else(|| {
                ContainerError::invalid(
                    entry,
                    format!("type '{}' has no injection point '{}'", create.type_id(), point),
                )
            })?;
        let target = value
            .as_instance_mut()
            .and_then(Instance::get_mut)
            .ok_or_else(|| {
                ContainerError::invalid(
                    entry,
                    format!(
                        "'{}' must construct a uniquely owned instance to inject '{}'",
                        create.type_id(),
                        point
                    ),
                )
            })?;

        tracing::trace!(entry, point, "injecting into instance");
        (injector.as_ref())(target, arguments)
            .map_err(|source| wrap_callable_error(entry.to_string(), type_name.to_string(), source))
    }

    fn resolve_environment(
        &self,
        env: &EnvironmentDefinition,
        stack: &mut ResolutionStack,
    ) -> Result<Value> {
        if let Some(value) = self.container.environment().var(env.variable()) {
            return Ok(Value::String(value));
        }
        match env.default() {
            Some(default) => self.resolve(default, stack),
            None => Err(ContainerError::EnvironmentVariableNotFound {
                entry: current_entry(stack),
                variable: env.variable().to_string(),
            }),
        }
    }

    fn interpolate(&self, expression: &str, stack: &mut ResolutionStack) -> Result<String> {
        let mut output = String::with_capacity(expression.len());
        for segment in parse_expression(expression) {
            match segment {
                Segment::Literal(text) => output.push_str(text),
                Segment::Entry(name) => {
                    let value = self.container.get_with(name, stack)?;
                    let text = value.to_scalar_string().ok_or_else(|| {
                        ContainerError::invalid(
                            current_entry(stack),
                            format!(
                                "placeholder '{{{}}}' resolved to a {} value, expected a scalar",
                                name,
                                value.kind()
                            ),
                        )
                    })?;
                    output.push_str(&text);
                }
            }
        }
        Ok(output)
    }
}

fn current_entry(stack: &ResolutionStack) -> String {
    stack.current().unwrap_or_default().to_string()
}

/// 闭包返回的容器错误原样传播，其余错误包装上条目名
fn wrap_callable_error(entry: String, type_name: String, source: BoxError) -> ContainerError {
    match source.downcast::<ContainerError>() {
        Ok(err) => *err,
        Err(source) => ContainerError::ConstructionFailed {
            entry,
            type_name,
            source,
        },
    }
}
