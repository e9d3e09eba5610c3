//! Entry definitions.
//!
//! A [`Definition`] is the recipe the container follows to produce the value
//! of an entry. Definitions are usually built with the helper functions in
//! this module (`get`, `create`, `env`, `add`, ...) and the [`defs!`] /
//! [`definitions!`] macros.

mod callable;
mod create;
mod environment;

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::value::Value;

pub use callable::{DecorateDefinition, DecoratorFn, FactoryDefinition, FactoryFn};
pub use create::CreateDefinition;
pub use environment::EnvironmentDefinition;

/// 服务生命周期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// 单例 - 首次解析后缓存，容器生命周期内复用
    #[default]
    Singleton,
    /// 原型 - 每次请求都重新解析
    Prototype,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Singleton => write!(f, "singleton"),
            Scope::Prototype => write!(f, "prototype"),
        }
    }
}

/// How to produce the value of an entry.
#[derive(Debug, Clone)]
pub enum Definition {
    /// Literal, returned as-is.
    Value(Value),
    /// Alias of another entry, resolved through the container cache.
    Reference(String),
    /// Construct a registered type from resolved constructor arguments.
    Create(CreateDefinition),
    /// Closure with access to the container.
    Factory(FactoryDefinition),
    /// Ordered list of definitions, each resolved in turn.
    Array(Vec<Definition>),
    /// Keyed definitions, each resolved in turn.
    Map(BTreeMap<String, Definition>),
    /// Elements to append to an existing array entry. Only valid as a
    /// top-level entry of a merge layer.
    Add(Vec<Definition>),
    /// Environment variable lookup.
    Environment(EnvironmentDefinition),
    /// String with `{entry}` placeholders.
    StringExpression(String),
    /// Wraps whatever the entry was defined as by earlier layers.
    Decorate(DecorateDefinition),
}

impl Definition {
    /// Effective scope, with `default` applied to create/factory definitions
    /// that did not choose one.
    pub fn scope(&self, default: Scope) -> Scope {
        match self {
            Definition::Create(create) => create.scope_or(default),
            Definition::Factory(factory) => factory.scope_or(default),
            Definition::Decorate(decorate) => decorate
                .inner()
                .map_or(Scope::Singleton, |inner| inner.scope(default)),
            _ => Scope::Singleton,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Definition::Array(_))
    }

    /// 合并期变体（add / decorate）不能嵌套在其他定义内部
    pub(crate) fn merge_only_variant(&self) -> Option<&'static str> {
        match self {
            Definition::Add(_) => Some("add()"),
            Definition::Decorate(_) => Some("decorate()"),
            _ => self.nested_merge_only_variant(),
        }
    }

    /// Checks that no merge-only variant is nested inside this definition.
    pub(crate) fn nested_merge_only_variant(&self) -> Option<&'static str> {
        match self {
            Definition::Array(items) | Definition::Add(items) => {
                items.iter().find_map(Definition::merge_only_variant)
            }
            Definition::Map(items) => items.values().find_map(Definition::merge_only_variant),
            Definition::Create(create) => create
                .nested_definitions()
                .find_map(Definition::merge_only_variant),
            Definition::Environment(env) => {
                env.default().and_then(Definition::merge_only_variant)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Value(value) => write!(f, "Value ({})", value),
            Definition::Reference(target) => write!(f, "get({})", target),
            Definition::Create(create) => write!(f, "{}", create),
            Definition::Factory(factory) => write!(f, "{}", factory),
            Definition::Array(items) => write_list(f, "[", items, "]"),
            Definition::Map(items) => {
                write!(f, "{{")?;
                for (i, (key, item)) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} => {}", key, item)?;
                }
                write!(f, "}}")
            }
            Definition::Add(items) => write_list(f, "add([", items, "])"),
            Definition::Environment(env) => write!(f, "{}", env),
            Definition::StringExpression(expression) => write!(f, "string(\"{}\")", expression),
            Definition::Decorate(decorate) => write!(f, "{}", decorate),
        }
    }
}

fn write_list(
    f: &mut fmt::Formatter<'_>,
    open: &str,
    items: &[Definition],
    close: &str,
) -> fmt::Result {
    write!(f, "{}", open)?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "{}", close)
}

impl From<Value> for Definition {
    fn from(value: Value) -> Self {
        Definition::Value(value)
    }
}

impl From<&str> for Definition {
    fn from(s: &str) -> Self {
        Definition::Value(Value::from(s))
    }
}

impl From<String> for Definition {
    fn from(s: String) -> Self {
        Definition::Value(Value::from(s))
    }
}

impl From<bool> for Definition {
    fn from(b: bool) -> Self {
        Definition::Value(Value::from(b))
    }
}

impl From<i64> for Definition {
    fn from(i: i64) -> Self {
        Definition::Value(Value::from(i))
    }
}

impl From<i32> for Definition {
    fn from(i: i32) -> Self {
        Definition::Value(Value::from(i))
    }
}

impl From<f64> for Definition {
    fn from(x: f64) -> Self {
        Definition::Value(Value::from(x))
    }
}

impl From<Vec<Definition>> for Definition {
    fn from(items: Vec<Definition>) -> Self {
        Definition::Array(items)
    }
}

impl From<BTreeMap<String, Definition>> for Definition {
    fn from(items: BTreeMap<String, Definition>) -> Self {
        Definition::Map(items)
    }
}

impl From<CreateDefinition> for Definition {
    fn from(create: CreateDefinition) -> Self {
        Definition::Create(create)
    }
}

impl From<FactoryDefinition> for Definition {
    fn from(factory: FactoryDefinition) -> Self {
        Definition::Factory(factory)
    }
}

impl From<EnvironmentDefinition> for Definition {
    fn from(env: EnvironmentDefinition) -> Self {
        Definition::Environment(env)
    }
}

impl From<DecorateDefinition> for Definition {
    fn from(decorate: DecorateDefinition) -> Self {
        Definition::Decorate(decorate)
    }
}

/// JSON arrays become array definitions and objects become map definitions,
/// so literal configuration trees can be fed to the builder directly.
impl From<serde_json::Value> for Definition {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Array(items) => {
                Definition::Array(items.into_iter().map(Definition::from).collect())
            }
            serde_json::Value::Object(map) => Definition::Map(
                map.into_iter()
                    .map(|(key, item)| (key, Definition::from(item)))
                    .collect(),
            ),
            scalar => Definition::Value(Value::from(scalar)),
        }
    }
}

/// Literal value, never scanned for nested definitions.
pub fn value(value: impl Into<Value>) -> Definition {
    Definition::Value(value.into())
}

/// Reference to another entry.
pub fn get(target: impl Into<String>) -> Definition {
    Definition::Reference(target.into())
}

/// Construct the type registered under `type_id`.
pub fn create(type_id: impl Into<String>) -> CreateDefinition {
    CreateDefinition::new(type_id)
}

/// Build the entry with a closure.
pub fn factory<F>(callable: F) -> FactoryDefinition
where
    F: Fn(&mut crate::resolver::FactoryContext<'_>) -> Result<Value, crate::errors::BoxError>
        + Send
        + Sync
        + 'static,
{
    FactoryDefinition::new(callable)
}

/// Required environment variable.
pub fn env(variable: impl Into<String>) -> EnvironmentDefinition {
    EnvironmentDefinition::new(variable)
}

/// Environment variable with a fallback definition.
pub fn env_or(variable: impl Into<String>, default: impl Into<Definition>) -> EnvironmentDefinition {
    EnvironmentDefinition::new(variable).with_default(default)
}

/// Environment variable that resolves to null when absent.
pub fn env_or_null(variable: impl Into<String>) -> EnvironmentDefinition {
    EnvironmentDefinition::new(variable).with_default(Value::Null)
}

/// Elements to append to an array entry defined by an earlier layer.
pub fn add(items: impl IntoIterator<Item = Definition>) -> Definition {
    Definition::Add(items.into_iter().collect())
}

pub fn array(items: impl IntoIterator<Item = Definition>) -> Definition {
    Definition::Array(items.into_iter().collect())
}

/// String with `{entry}` placeholders replaced by the referenced values.
pub fn string(expression: impl Into<String>) -> Definition {
    Definition::StringExpression(expression.into())
}

/// Wrap the definition that earlier layers gave this entry.
pub fn decorate<F>(decorator: F) -> DecorateDefinition
where
    F: Fn(Value, &mut crate::resolver::FactoryContext<'_>) -> Result<Value, crate::errors::BoxError>
        + Send
        + Sync
        + 'static,
{
    DecorateDefinition::new(decorator)
}

/// 构造定义列表，每个元素通过 `Definition::from` 转换
#[macro_export]
macro_rules! defs {
    ($($item:expr),* $(,)?) => {
        vec![$($crate::Definition::from($item)),*]
    };
}

/// 构造一个合并层：`definitions! { "name" => definition, ... }`
#[macro_export]
macro_rules! definitions {
    ($($name:expr => $definition:expr),* $(,)?) => {
        vec![$((::std::string::String::from($name), $crate::Definition::from($definition))),*]
    };
}
