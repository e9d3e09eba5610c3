//! 构造器注册表
//!
//! `create("Type")` 定义通过类型标识在这里查找构造器。
//! 构造器接收已解析的构造参数并返回实例，容器本身不做任何反射。

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::BoxError;
use crate::value::{Instance, Value};

/// 构造器trait
pub trait Constructor: Send + Sync {
    /// 用已解析的参数（按声明顺序）创建实例
    fn construct(&self, arguments: Vec<Value>) -> Result<Value, BoxError>;

    /// 获取构造类型名称（用于错误信息）
    fn type_name(&self) -> &str;
}

/// 函数式构造器 - 返回具体类型，自动包装为 [`Instance`]
pub struct FnConstructor<F, T> {
    type_id: String,
    constructor_fn: F,
    _phantom: PhantomData<fn() -> T>,
}

impl<F, T> FnConstructor<F, T> {
    pub fn new(type_id: impl Into<String>, constructor_fn: F) -> Self {
        Self {
            type_id: type_id.into(),
            constructor_fn,
            _phantom: PhantomData,
        }
    }
}

impl<F, T> Constructor for FnConstructor<F, T>
where
    F: Fn(Vec<Value>) -> Result<T, BoxError> + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    fn construct(&self, arguments: Vec<Value>) -> Result<Value, BoxError> {
        let instance = (self.constructor_fn)(arguments)?;
        Ok(Value::Instance(Instance::new(self.type_id.clone(), instance)))
    }

    fn type_name(&self) -> &str {
        std::any::type_name::<T>()
    }
}

/// 直接返回 [`Value`] 的构造器
pub struct ValueConstructor<F> {
    type_id: String,
    constructor_fn: F,
}

impl<F> ValueConstructor<F>
where
    F: Fn(Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    pub fn new(type_id: impl Into<String>, constructor_fn: F) -> Self {
        Self {
            type_id: type_id.into(),
            constructor_fn,
        }
    }
}

impl<F> Constructor for ValueConstructor<F>
where
    F: Fn(Vec<Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    fn construct(&self, arguments: Vec<Value>) -> Result<Value, BoxError> {
        (self.constructor_fn)(arguments)
    }

    fn type_name(&self) -> &str {
        &self.type_id
    }
}

/// 注入点签名：可变借用刚构造的实例，参数已按声明顺序解析
pub type InjectorFn =
    dyn Fn(&mut (dyn Any + Send + Sync + 'static), Vec<Value>) -> Result<(), BoxError> + Send + Sync;

/// 类型标识 -> 构造器与注入点
#[derive(Clone, Default)]
pub struct TypeRegistry {
    constructors: HashMap<String, Arc<dyn Constructor>>,
    injectors: HashMap<String, HashMap<String, Arc<InjectorFn>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册构造器，同名时后注册的覆盖先注册的
    pub fn register(&mut self, type_id: impl Into<String>, constructor: impl Constructor + 'static) {
        let type_id = type_id.into();
        if self.constructors.contains_key(&type_id) {
            log::debug!("Replacing constructor for type '{}'", type_id);
        }
        self.constructors.insert(type_id, Arc::new(constructor));
    }

    /// 注册返回具体类型的构造闭包 - 推荐方式
    pub fn register_type<T, F>(&mut self, type_id: impl Into<String>, constructor_fn: F)
    where
        T: Send + Sync + 'static,
        F: Fn(Vec<Value>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let type_id = type_id.into();
        let constructor = FnConstructor::<F, T>::new(type_id.clone(), constructor_fn);
        self.register(type_id, constructor);
    }

    /// 注册方法注入点，`create(type_id).method(name, ...)` 会调用它
    pub fn register_method<T, F>(
        &mut self,
        type_id: impl Into<String>,
        name: impl Into<String>,
        method_fn: F,
    ) where
        T: Send + Sync + 'static,
        F: Fn(&mut T, Vec<Value>) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let injector = move |target: &mut (dyn Any + Send + Sync + 'static),
                              arguments: Vec<Value>|
              -> Result<(), BoxError> {
            let target = target
                .downcast_mut::<T>()
                .ok_or_else(|| format!("instance is not a {}", std::any::type_name::<T>()))?;
            method_fn(target, arguments)
        };
        self.register_injector(type_id.into(), name.into(), Arc::new(injector));
    }

    /// 注册属性注入点，`create(type_id).property(name, value)` 会调用它
    pub fn register_property<T, F>(
        &mut self,
        type_id: impl Into<String>,
        name: impl Into<String>,
        setter: F,
    ) where
        T: Send + Sync + 'static,
        F: Fn(&mut T, Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.register_method(type_id, name, move |target: &mut T, mut arguments: Vec<Value>| {
            if arguments.is_empty() {
                return Err("property setter called without a value".into());
            }
            setter(target, arguments.swap_remove(0))
        });
    }

    fn register_injector(&mut self, type_id: String, name: String, injector: Arc<InjectorFn>) {
        let points = self.injectors.entry(type_id).or_default();
        if points.insert(name.clone(), injector).is_some() {
            log::debug!("Replacing injection point '{}'", name);
        }
    }

    pub fn injector(&self, type_id: &str, name: &str) -> Option<&Arc<InjectorFn>> {
        self.injectors.get(type_id).and_then(|points| points.get(name))
    }

    pub fn get(&self, type_id: &str) -> Option<&Arc<dyn Constructor>> {
        self.constructors.get(type_id)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.constructors.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.constructors.keys().collect();
        types.sort();
        let injection_points: usize = self.injectors.values().map(HashMap::len).sum();
        f.debug_struct("TypeRegistry")
            .field("types", &types)
            .field("injection_points", &injection_points)
            .finish()
    }
}

/// Fetch the argument at `index`, failing with a construction error when the
/// definition supplied fewer arguments than the constructor needs.
pub fn required_argument(arguments: &[Value], index: usize) -> Result<&Value, BoxError> {
    arguments
        .get(index)
        .ok_or_else(|| format!("missing required constructor argument #{}", index).into())
}
