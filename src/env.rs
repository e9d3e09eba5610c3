//! 环境变量来源
//!
//! Environment definitions read through this trait so tests and embedders can
//! supply a fixed map instead of the process environment.

use std::collections::HashMap;

pub trait EnvironmentSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the real process environment.
///
/// A variable that is set but not valid UTF-8 still counts as present; its
/// value is converted lossily.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl EnvironmentSource for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        let value = std::env::var_os(name)?;
        match value.into_string() {
            Ok(value) => Some(value),
            Err(raw) => {
                log::warn!("Environment variable '{}' is not valid UTF-8", name);
                Some(raw.to_string_lossy().into_owned())
            }
        }
    }
}

impl EnvironmentSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
