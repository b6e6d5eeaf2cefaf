//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Once;

use mirror_types::{builtin, ClassBuilder, ClassRef, MethodDef, PrimitiveType, Visibility};

static TRACING: Once = Once::new();

/// Install a subscriber filtered by `MIRROR_LOG` (e.g. `MIRROR_LOG=mirror_engine=debug`)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_env("MIRROR_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Default, Clone)]
pub struct Person {
    pub name: Option<String>,
    pub age: i32,
}

/// `demo.Person{name, age}` with conventional accessors and two constructors
pub fn person_class() -> ClassRef {
    ClassBuilder::<Person>::new("demo.Person")
        .constructor0(Person::default)
        .try_constructor1(|name: String| {
            if name.is_empty() {
                Err("name must not be empty".to_string())
            } else {
                Ok(Person {
                    name: Some(name),
                    age: 0,
                })
            }
        })
        .getter("getName", |p| p.name.clone())
        .setter("setName", |p, name: Option<String>| p.name = name)
        .getter("getAge", |p| p.age)
        .setter("setAge", |p, age: i32| p.age = age)
        .method1("greet", |p, greeting: String| {
            format!("{}, {}", greeting, p.name.as_deref().unwrap_or("stranger"))
        })
        .method(
            MethodDef::method0("secret", |p: &Person| p.age * 7)
                .with_visibility(Visibility::Protected),
        )
        .build()
}

/// A class whose catalog cannot be compiled
pub fn broken_class(name: &str) -> ClassRef {
    ClassBuilder::<Person>::new(name)
        .abstract_method("area", &[], builtin::primitive(PrimitiveType::Double))
        .build()
}
