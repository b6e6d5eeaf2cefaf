//! Operation discovery
//!
//! Walks a type's hierarchy in a fixed order. The resulting order is the
//! tie-break order for every first-match lookup built on top of it.

use mirror_types::{ClassDef, ClassKind, ClassRef};

use super::descriptor::OperationDescriptor;
use crate::error::{ReflectError, ReflectResult};

/// Discover the accessible operations of `class`
///
/// Classes contribute the non-private operations of every level of the
/// superclass chain, most-derived first, stopping before the root class.
/// Interfaces contribute their own non-private operations followed,
/// depth-first, by those of each super-interface.
pub fn discover(class: &ClassRef) -> ReflectResult<Vec<OperationDescriptor>> {
    check_target(class)?;

    let mut descriptors = Vec::new();
    if class.is_interface() {
        collect_interface(class, &mut descriptors);
    } else {
        let mut current = Some(class);
        while let Some(level) = current {
            if level.superclass().is_none() {
                break;
            }
            collect_declared(level, &mut descriptors);
            current = level.superclass();
        }
    }

    tracing::trace!(
        class = class.name(),
        operations = descriptors.len(),
        "discovered operations"
    );
    Ok(descriptors)
}

/// Reject types that cannot carry a dispatcher
pub(crate) fn check_target(class: &ClassDef) -> ReflectResult<()> {
    let reason = match class.kind() {
        ClassKind::Primitive(_) => "primitive types have no operations",
        ClassKind::Void => "void has no operations",
        ClassKind::Class if class.superclass().is_none() => "the root class cannot be dispatched",
        _ => return Ok(()),
    };
    Err(ReflectError::InvalidTargetKind {
        type_name: class.name().to_string(),
        reason,
    })
}

fn collect_declared(class: &ClassRef, out: &mut Vec<OperationDescriptor>) {
    for (slot, method) in class.declared_methods().iter().enumerate() {
        if method.is_private() {
            continue;
        }
        out.push(OperationDescriptor::new(out.len(), class, slot, method));
    }
}

fn collect_interface(iface: &ClassRef, out: &mut Vec<OperationDescriptor>) {
    collect_declared(iface, out);
    for parent in iface.interfaces() {
        collect_interface(parent, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirror_types::builtin;
    use mirror_types::{ClassBuilder, MethodDef, PrimitiveType, Visibility};

    #[derive(Default)]
    struct Animal {
        legs: i32,
    }

    fn names(descriptors: &[OperationDescriptor]) -> Vec<&str> {
        descriptors.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_rejects_invalid_targets() {
        for class in [
            builtin::object(),
            builtin::void(),
            builtin::primitive(PrimitiveType::Int),
        ] {
            assert!(matches!(
                discover(class),
                Err(ReflectError::InvalidTargetKind { .. })
            ));
        }
        assert!(discover(builtin::string()).unwrap().is_empty());
    }

    #[test]
    fn test_most_derived_first_without_private() {
        let animal = ClassBuilder::<Animal>::new("zoo.Animal")
            .getter("getLegs", |a| a.legs)
            .method(
                MethodDef::method0("secret", |_: &Animal| 1).with_visibility(Visibility::Private),
            )
            .build();
        let dog = ClassBuilder::<Animal>::new("zoo.Dog")
            .extends(&animal)
            .getter("bark", |_| "woof".to_string())
            .method(
                MethodDef::method0("wag", |_: &Animal| ()).with_visibility(Visibility::Protected),
            )
            .build();

        let descriptors = discover(&dog).unwrap();
        assert_eq!(names(&descriptors), vec!["bark", "wag", "getLegs"]);
        let indices: Vec<_> = descriptors.iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(descriptors[2].declaring_class.id(), animal.id());
    }

    #[test]
    fn test_interface_depth_first() {
        let a = ClassBuilder::interface("api.A")
            .abstract_method("a", &[], builtin::void())
            .build();
        let b = ClassBuilder::interface("api.B")
            .implements(&a)
            .abstract_method("b", &[], builtin::void())
            .build();
        let c = ClassBuilder::interface("api.C")
            .abstract_method("c", &[], builtin::void())
            .build();
        let d = ClassBuilder::interface("api.D")
            .implements(&b)
            .implements(&c)
            .abstract_method("d", &[], builtin::void())
            .build();

        let descriptors = discover(&d).unwrap();
        assert_eq!(names(&descriptors), vec!["d", "b", "a", "c"]);
        assert!(descriptors.iter().all(|d| d.is_abstract));
    }

    #[test]
    fn test_discovery_is_deterministic() {
        let class = ClassBuilder::<Animal>::new("zoo.Cat")
            .getter("getLegs", |a| a.legs)
            .setter("setLegs", |a, legs: i32| a.legs = legs)
            .static0("create", || 0i64)
            .build();
        let first: Vec<_> = discover(&class)
            .unwrap()
            .into_iter()
            .map(|d| d.signature)
            .collect();
        let second: Vec<_> = discover(&class)
            .unwrap()
            .into_iter()
            .map(|d| d.signature)
            .collect();
        assert_eq!(first, second);
        assert_eq!(first[2], "zoo.Cat.create()");
    }
}
