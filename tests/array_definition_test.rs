//! 数组定义与 add() 合并的集成测试

use std::collections::HashMap;

use gitai_di::{
    add, create, definitions, defs, env_or, get, Container, ContainerBuilder, ContainerError,
    Scope, Value,
};

/// 没有字段的普通对象
#[derive(Debug, PartialEq)]
struct Plain;

fn builder() -> ContainerBuilder {
    // 空环境，保证 env 定义走默认值
    ContainerBuilder::new()
        .with_environment(HashMap::<String, String>::new())
        .register_type("Plain", |_| Ok(Plain))
}

fn list(value: &Value) -> &[Value] {
    value.as_list().expect("entry should resolve to a list")
}

#[test]
fn test_array_with_values() {
    let container = builder()
        .add_definitions(definitions! { "values" => defs!["value 1", "value 2"] })
        .unwrap()
        .build();

    let values = container.get("values").unwrap();
    let array = list(&values);

    assert_eq!(array[0], Value::from("value 1"));
    assert_eq!(array[1], Value::from("value 2"));
}

#[test]
fn test_array_containing_sub_array() {
    let container = builder()
        .add_definitions(definitions! {
            "values" => defs![defs!["value 1", "value 2"], defs!["value 1", "value 2"]],
        })
        .unwrap()
        .build();

    let values = container.get("values").unwrap();
    let array = list(&values);

    for sub in array {
        let sub = list(sub);
        assert_eq!(sub[0].as_str(), Some("value 1"));
        assert_eq!(sub[1].as_str(), Some("value 2"));
    }
}

#[test]
fn test_array_with_links() {
    let container = builder()
        .add_definitions(definitions! {
            "links" => defs![get("singleton"), get("prototype")],
            "singleton" => create("Plain"),
            "prototype" => create("Plain").scope(Scope::Prototype),
        })
        .unwrap()
        .build();

    let links = container.get("links").unwrap();
    let array = list(&links);

    assert!(array[0].downcast::<Plain>().is_some());
    assert!(array[1].downcast::<Plain>().is_some());

    let singleton = container.get("singleton").unwrap();
    let prototype = container.get("prototype").unwrap();

    assert_eq!(singleton, array[0]);
    assert_ne!(prototype, array[1]);
}

#[test]
fn test_array_with_nested_definitions() {
    let container = builder()
        .add_definitions(definitions! {
            "array" => defs![env_or("GITAI_DI_DO_NOT_DEFINE_THIS", "env"), create("Plain")],
        })
        .unwrap()
        .build();

    let resolved = container.get("array").unwrap();
    let array = list(&resolved);

    assert_eq!(array[0].as_str(), Some("env"));
    assert_eq!(*array[1].downcast::<Plain>().unwrap(), Plain);
}

#[test]
fn test_array_with_prototype_entries_is_cached() {
    let container = builder()
        .add_definitions(definitions! {
            "array" => defs![get("prototype")],
            "prototype" => create("Plain").prototype(),
        })
        .unwrap()
        .build();

    let first = container.get("array").unwrap();
    let second = container.get("array").unwrap();

    // 数组本身是单例，其中的原型元素随数组一起缓存
    assert_eq!(list(&first)[0], list(&second)[0]);

    // make() 重新解析数组，原型元素随之重新创建
    let fresh = container.make("array").unwrap();
    assert_ne!(list(&first)[0], list(&fresh)[0]);
}

#[test]
fn test_add_entries() {
    let container = builder()
        .add_definitions(definitions! { "values" => defs!["value 1", "value 2"] })
        .unwrap()
        .add_definitions(definitions! {
            "values" => add(defs!["another value", get("foo")]),
            "foo" => create("Plain"),
        })
        .unwrap()
        .build();

    let values = container.get("values").unwrap();
    let array = list(&values);

    assert_eq!(array.len(), 4);
    assert_eq!(array[0].as_str(), Some("value 1"));
    assert_eq!(array[1].as_str(), Some("value 2"));
    assert_eq!(array[2].as_str(), Some("another value"));
    assert_eq!(array[3], container.get("foo").unwrap());
}

#[test]
fn test_add_entries_with_nested_definitions() {
    let container = builder()
        .add_definitions(definitions! {
            "array" => defs![env_or("GITAI_DI_DO_NOT_DEFINE_THIS", "env"), create("Plain")],
        })
        .unwrap()
        .add_definitions(definitions! {
            "array" => add(defs![env_or("GITAI_DI_DO_NOT_DEFINE_THIS", "foo"), create("Plain")]),
        })
        .unwrap()
        .build();

    let resolved = container.get("array").unwrap();
    let array = list(&resolved);

    assert_eq!(array.len(), 4);
    assert_eq!(array[0].as_str(), Some("env"));
    assert!(array[1].downcast::<Plain>().is_some());
    assert_eq!(array[2].as_str(), Some("foo"));
    assert!(array[3].downcast::<Plain>().is_some());
    // 两个 create 定义各自构造
    assert_ne!(array[1], array[3]);
}

#[test]
fn test_add_to_non_existing_array_works() {
    let container = builder()
        .add_definitions(definitions! { "values" => add(defs!["value 1"]) })
        .unwrap()
        .build();

    let values = container.get("values").unwrap();
    assert_eq!(list(&values), &[Value::from("value 1")]);
}

#[test]
fn test_add_after_add_appends_in_layer_order() {
    let container = builder()
        .add_definitions(definitions! { "values" => add(defs!["a"]) })
        .unwrap()
        .add_definitions(definitions! { "values" => add(defs!["b", "c"]) })
        .unwrap()
        .add_definitions(definitions! { "values" => add(defs!["d"]) })
        .unwrap()
        .build();

    let values = container.get("values").unwrap();
    let items: Vec<&str> = list(&values).iter().filter_map(Value::as_str).collect();
    assert_eq!(items, vec!["a", "b", "c", "d"]);
}

#[test]
fn test_override_replaces_array() {
    let container = builder()
        .add_definitions(definitions! { "values" => defs!["a", "b"] })
        .unwrap()
        .add_definitions(definitions! { "values" => defs!["z"] })
        .unwrap()
        .build();

    let values = container.get("values").unwrap();
    assert_eq!(list(&values), &[Value::from("z")]);
}

#[test]
fn test_add_on_non_array_fails() {
    let result = builder()
        .add_definitions(definitions! { "values" => "just a string" })
        .unwrap()
        .add_definitions(definitions! { "values" => add(defs!["x"]) });

    match result {
        Err(ContainerError::InvalidDefinition { name, reason }) => {
            assert_eq!(name, "values");
            assert!(reason.contains("add()"));
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("add() on a string entry should be rejected"),
    }
}

#[test]
fn test_nested_add_is_rejected() {
    let result = builder().add_definitions(definitions! {
        "values" => defs!["a", add(defs!["b"])],
    });

    assert!(matches!(
        result.err(),
        Some(ContainerError::InvalidDefinition { ref name, .. }) if name == "values"
    ));
}

#[test]
fn test_array_element_errors_propagate() {
    let container: Container = builder()
        .add_definitions(definitions! { "values" => defs!["ok", get("missing")] })
        .unwrap()
        .build();

    let err = container.get("values").unwrap_err();
    assert!(!err.is_not_found());
    match err {
        ContainerError::DependencyNotFound { entry, missing } => {
            assert_eq!(entry, "values");
            assert_eq!(missing, "missing");
        }
        other => panic!("unexpected error: {}", other),
    }
    // 失败的解析不会被缓存
    assert_eq!(container.stats().cached_entries, 0);
}
