use std::fmt;

use super::Definition;

/// Lookup of an environment variable, with an optional fallback.
///
/// Without a default the variable is required and its absence is reported as
/// [`ContainerError::EnvironmentVariableNotFound`](crate::ContainerError).
#[derive(Debug, Clone)]
pub struct EnvironmentDefinition {
    variable: String,
    default: Option<Box<Definition>>,
}

impl EnvironmentDefinition {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            default: None,
        }
    }

    /// Fallback used when the variable is absent. It may be any definition,
    /// including a reference, and is only resolved when needed.
    pub fn with_default(mut self, default: impl Into<Definition>) -> Self {
        self.default = Some(Box::new(default.into()));
        self
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn default(&self) -> Option<&Definition> {
        self.default.as_deref()
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

impl fmt::Display for EnvironmentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.default {
            Some(default) => write!(f, "env({}, default = {})", self.variable, default),
            None => write!(f, "env({})", self.variable),
        }
    }
}
