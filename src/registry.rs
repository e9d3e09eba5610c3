//! Definition registry with layered merging.
//!
//! Layers are applied in call order:
//! - new name: stored as-is (an `add()` on a new name becomes an array)
//! - existing name: replaced entirely (last wins)
//! - `add()` on an existing array: elements appended in declared order
//! - `decorate()` on an existing name: wraps the previous definition

use std::collections::{BTreeMap, HashMap};

use crate::definition::Definition;
use crate::errors::{ContainerError, Result};

/// A producer of merge layers, e.g. a configuration loader.
pub trait DefinitionSource {
    fn definitions(&self) -> Result<Vec<(String, Definition)>>;
}

impl DefinitionSource for Vec<(String, Definition)> {
    fn definitions(&self) -> Result<Vec<(String, Definition)>> {
        Ok(self.clone())
    }
}

impl DefinitionSource for BTreeMap<String, Definition> {
    fn definitions(&self) -> Result<Vec<(String, Definition)>> {
        Ok(self
            .iter()
            .map(|(name, definition)| (name.clone(), definition.clone()))
            .collect())
    }
}

/// JSON object whose keys are entry names.
impl DefinitionSource for serde_json::Map<String, serde_json::Value> {
    fn definitions(&self) -> Result<Vec<(String, Definition)>> {
        Ok(self
            .iter()
            .map(|(name, json)| (name.clone(), Definition::from(json.clone())))
            .collect())
    }
}

/// Entry name -> definition, mutated only through [`add_definitions`](Self::add_definitions).
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    definitions: HashMap<String, Definition>,
    layers: usize,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge several layers in order, first is the base.
    pub fn from_layers<L>(layers: impl IntoIterator<Item = L>) -> Result<Self>
    where
        L: IntoIterator<Item = (String, Definition)>,
    {
        let mut registry = Self::new();
        for layer in layers {
            registry.add_definitions(layer)?;
        }
        Ok(registry)
    }

    /// Apply one merge layer. Entries of the layer are merged in iteration
    /// order. A layer either applies completely or not at all: the first
    /// configuration error aborts the call and leaves the registry untouched.
    pub fn add_definitions<I, K, D>(&mut self, layer: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: Into<Definition>,
    {
        let layer_number = self.layers + 1;
        let mut staged = self.definitions.clone();
        let mut count = 0usize;
        for (name, definition) in layer {
            merge(&mut staged, layer_number, name.into(), definition.into())?;
            count += 1;
        }

        self.definitions = staged;
        self.layers = layer_number;
        log::debug!("Merged layer #{} with {} definitions", self.layers, count);
        Ok(())
    }

    pub fn add_source(&mut self, source: &dyn DefinitionSource) -> Result<()> {
        let layer = source.definitions()?;
        self.add_definitions(layer)
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    /// Sorted entry names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.definitions.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Number of layers applied so far.
    pub fn layer_count(&self) -> usize {
        self.layers
    }
}

fn merge(
    definitions: &mut HashMap<String, Definition>,
    layer: usize,
    name: String,
    definition: Definition,
) -> Result<()> {
    if let Some(variant) = definition.nested_merge_only_variant() {
        return Err(ContainerError::invalid(
            name,
            format!("{} can only be used as a top-level entry definition", variant),
        ));
    }

    match definition {
        Definition::Add(items) => match definitions.get_mut(&name) {
            Some(Definition::Array(existing)) => {
                log::debug!(
                    "Appending {} definitions to array entry '{}'",
                    items.len(),
                    name
                );
                existing.extend(items);
            }
            Some(other) => {
                return Err(ContainerError::invalid(
                    name,
                    format!("add() requires an array definition, found {}", other),
                ));
            }
            None => {
                definitions.insert(name, Definition::Array(items));
            }
        },
        Definition::Decorate(decorate) => match definitions.remove(&name) {
            Some(previous) => {
                log::debug!("Decorating entry '{}'", name);
                definitions.insert(name, Definition::Decorate(decorate.wrap(previous)));
            }
            None => {
                return Err(ContainerError::invalid(
                    name,
                    "decorate() requires an existing definition to decorate",
                ));
            }
        },
        definition => {
            if definitions.insert(name.clone(), definition).is_some() {
                log::debug!("Entry '{}' overridden by layer #{}", name, layer);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{add, create, decorate, get};
    use crate::{definitions, defs};

    fn array_len(registry: &DefinitionRegistry, name: &str) -> usize {
        match registry.get(name) {
            Some(Definition::Array(items)) => items.len(),
            other => panic!("expected array for {}, got {:?}", name, other),
        }
    }

    #[test]
    fn test_override() {
        let mut registry = DefinitionRegistry::new();
        registry.add_definitions(definitions! { "timeout" => 100 }).unwrap();
        registry.add_definitions(definitions! { "timeout" => 200 }).unwrap();

        assert_eq!(registry.get("timeout").unwrap().to_string(), "Value (200)");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_array_replace_without_add() {
        let mut registry = DefinitionRegistry::new();
        registry
            .add_definitions(definitions! { "schemes" => defs!["A", "B", "C"] })
            .unwrap();
        registry
            .add_definitions(definitions! { "schemes" => defs!["X", "Y"] })
            .unwrap();

        assert_eq!(array_len(&registry, "schemes"), 2);
    }

    #[test]
    fn test_add_appends_in_layer_order() {
        let registry = DefinitionRegistry::from_layers(vec![
            definitions! { "values" => defs!["v1", "v2"] },
            definitions! { "values" => add(defs!["v3"]) },
            definitions! { "values" => add(defs!["v4", get("foo")]) },
        ])
        .unwrap();

        assert_eq!(
            registry.get("values").unwrap().to_string(),
            "[Value (\"v1\"), Value (\"v2\"), Value (\"v3\"), Value (\"v4\"), get(foo)]"
        );
        assert_eq!(registry.layer_count(), 3);
    }

    #[test]
    fn test_add_on_missing_name_defines_array() {
        let mut registry = DefinitionRegistry::new();
        registry
            .add_definitions(definitions! { "values" => add(defs!["v1"]) })
            .unwrap();
        registry
            .add_definitions(definitions! { "values" => add(defs!["v2"]) })
            .unwrap();

        assert_eq!(array_len(&registry, "values"), 2);
    }

    #[test]
    fn test_add_on_non_array_fails_fast() {
        let mut registry = DefinitionRegistry::new();
        registry.add_definitions(definitions! { "foo" => create("T") }).unwrap();

        let err = registry
            .add_definitions(definitions! { "foo" => add(defs!["x"]) })
            .unwrap_err();
        assert!(matches!(err, ContainerError::InvalidDefinition { ref name, .. } if name == "foo"));
    }

    #[test]
    fn test_nested_add_is_rejected() {
        let mut registry = DefinitionRegistry::new();
        let err = registry
            .add_definitions(definitions! { "values" => defs!["a", add(defs!["b"])] })
            .unwrap_err();
        assert!(err.to_string().contains("add()"));
    }

    #[test]
    fn test_decorate_wraps_previous() {
        let mut registry = DefinitionRegistry::new();
        registry.add_definitions(definitions! { "name" => "base" }).unwrap();
        registry
            .add_definitions(definitions! { "name" => decorate(|previous, _| Ok(previous)) })
            .unwrap();

        assert_eq!(
            registry.get("name").unwrap().to_string(),
            "decorate(Value (\"base\"))"
        );
    }

    #[test]
    fn test_decorate_missing_entry_fails() {
        let mut registry = DefinitionRegistry::new();
        let err = registry
            .add_definitions(definitions! { "name" => decorate(|previous, _| Ok(previous)) })
            .unwrap_err();
        assert!(matches!(err, ContainerError::InvalidDefinition { .. }));
    }

    #[test]
    fn test_failed_layer_is_not_applied() {
        let mut registry = DefinitionRegistry::new();
        registry.add_definitions(definitions! { "b" => "plain" }).unwrap();

        let err = registry
            .add_definitions(definitions! {
                "a" => 1,
                "b" => add(defs!["x"]),
            })
            .unwrap_err();

        assert!(matches!(err, ContainerError::InvalidDefinition { ref name, .. } if name == "b"));
        assert!(!registry.contains("a"));
        assert_eq!(registry.get("b").unwrap().to_string(), "Value (\"plain\")");
        assert_eq!(registry.layer_count(), 1);
    }

    #[test]
    fn test_json_source() {
        let json = serde_json::json!({"hosts": ["a", "b"], "port": 80});
        let mut registry = DefinitionRegistry::new();
        registry.add_source(json.as_object().unwrap()).unwrap();

        assert_eq!(array_len(&registry, "hosts"), 2);
        assert_eq!(registry.names(), vec!["hosts".to_string(), "port".to_string()]);
    }
}
