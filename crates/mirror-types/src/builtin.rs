//! Builtin classes
//!
//! The root class, strings, the collection interfaces, `void` and the eight
//! primitives. All of them live in the sealed bootstrap boundary.

use once_cell::sync::Lazy;

use crate::class::{ClassDef, ClassKind, ClassRef, PrimitiveType};

static OBJECT: Lazy<ClassRef> =
    Lazy::new(|| ClassDef::builtin("core.Object", ClassKind::Class, None, Vec::new(), &[]));

static STRING: Lazy<ClassRef> = Lazy::new(|| {
    ClassDef::builtin(
        "core.String",
        ClassKind::Class,
        Some(object().clone()),
        Vec::new(),
        &[],
    )
});

static ITERABLE: Lazy<ClassRef> = Lazy::new(|| {
    ClassDef::builtin("core.Iterable", ClassKind::Interface, None, Vec::new(), &["T"])
});

static LIST: Lazy<ClassRef> = Lazy::new(|| {
    ClassDef::builtin(
        "core.List",
        ClassKind::Interface,
        None,
        vec![iterable().clone()],
        &["E"],
    )
});

static MAP: Lazy<ClassRef> = Lazy::new(|| {
    ClassDef::builtin("core.Map", ClassKind::Interface, None, Vec::new(), &["K", "V"])
});

static VOID: Lazy<ClassRef> =
    Lazy::new(|| ClassDef::builtin("void", ClassKind::Void, None, Vec::new(), &[]));

static PRIMITIVES: Lazy<Vec<ClassRef>> = Lazy::new(|| {
    PrimitiveType::ALL
        .iter()
        .map(|&p| ClassDef::builtin(p.name(), ClassKind::Primitive(p), None, Vec::new(), &[]))
        .collect()
});

/// The root class every non-primitive type derives from
pub fn object() -> &'static ClassRef {
    &OBJECT
}

/// `core.String`
pub fn string() -> &'static ClassRef {
    &STRING
}

/// `core.Iterable<T>`
pub fn iterable() -> &'static ClassRef {
    &ITERABLE
}

/// `core.List<E>`, extends `core.Iterable<E>`
pub fn list() -> &'static ClassRef {
    &LIST
}

/// `core.Map<K, V>`
pub fn map() -> &'static ClassRef {
    &MAP
}

/// The `void` pseudo-type
pub fn void() -> &'static ClassRef {
    &VOID
}

/// The class of a primitive type
pub fn primitive(primitive: PrimitiveType) -> &'static ClassRef {
    &PRIMITIVES[primitive as usize]
}
