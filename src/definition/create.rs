use std::fmt;

use super::{Definition, Scope};

/// Construction recipe: a registered type identifier, constructor argument
/// definitions in parameter order, and the injection points applied to the
/// new instance afterwards (properties first, then method calls, each in
/// declared order).
#[derive(Debug, Clone)]
pub struct CreateDefinition {
    type_id: String,
    arguments: Vec<Definition>,
    properties: Vec<(String, Definition)>,
    methods: Vec<(String, Vec<Definition>)>,
    scope: Option<Scope>,
}

impl CreateDefinition {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            arguments: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            scope: None,
        }
    }

    /// Replace the constructor arguments.
    pub fn constructor(mut self, arguments: impl IntoIterator<Item = Definition>) -> Self {
        self.arguments = arguments.into_iter().collect();
        self
    }

    /// Append one constructor argument.
    pub fn argument(mut self, argument: impl Into<Definition>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Set a property on the constructed instance through the setter
    /// registered for `name` on the type.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Definition>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    /// Call the method registered for `name` on the constructed instance.
    /// A method may be listed more than once; every call is made.
    pub fn method(
        mut self,
        name: impl Into<String>,
        arguments: impl IntoIterator<Item = Definition>,
    ) -> Self {
        self.methods.push((name.into(), arguments.into_iter().collect()));
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn arguments(&self) -> &[Definition] {
        &self.arguments
    }

    pub fn properties(&self) -> &[(String, Definition)] {
        &self.properties
    }

    pub fn methods(&self) -> &[(String, Vec<Definition>)] {
        &self.methods
    }

    /// 构造后需要注入的属性和方法名，按执行顺序
    pub fn injection_points(&self) -> impl Iterator<Item = &str> {
        self.properties
            .iter()
            .map(|(name, _)| name.as_str())
            .chain(self.methods.iter().map(|(name, _)| name.as_str()))
    }

    /// Every nested definition: constructor arguments, property values and
    /// method arguments.
    pub(crate) fn nested_definitions(&self) -> impl Iterator<Item = &Definition> {
        self.arguments
            .iter()
            .chain(self.properties.iter().map(|(_, value)| value))
            .chain(self.methods.iter().flat_map(|(_, arguments)| arguments.iter()))
    }

    pub fn scope_or(&self, default: Scope) -> Scope {
        self.scope.unwrap_or(default)
    }
}

impl fmt::Display for CreateDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "create({})", self.type_id)?;
        if let Some(scope) = self.scope {
            write!(f, " [{}]", scope)?;
        }
        if !self.arguments.is_empty() {
            write!(f, " (")?;
            for (i, argument) in self.arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", argument)?;
            }
            write!(f, ")")?;
        }
        for (name, value) in &self.properties {
            write!(f, " ->{} = {}", name, value)?;
        }
        for (name, arguments) in &self.methods {
            write!(f, " ->{}(", name)?;
            for (i, argument) in arguments.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", argument)?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}
