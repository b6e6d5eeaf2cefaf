//! Generic type metadata
//!
//! Operation parameters and returns keep their generic form next to the
//! erased class, so callers can ask for the element type of a collection.

use std::fmt;

use crate::builtin;
use crate::class::ClassRef;
use crate::error::TypeError;

/// A possibly parameterized type
#[derive(Debug, Clone, PartialEq)]
pub enum GenericType {
    /// Plain class
    Class(ClassRef),
    /// Class applied to type arguments
    Parameterized {
        /// Raw class
        raw: ClassRef,
        /// Type arguments, one per formal parameter of `raw`
        args: Vec<GenericType>,
    },
    /// Unbound type variable
    Variable(String),
    /// `?`
    Wildcard,
}

impl GenericType {
    /// Plain class type
    pub fn class(class: &ClassRef) -> Self {
        GenericType::Class(class.clone())
    }

    /// Apply type arguments to a raw class, checking their count
    pub fn parameterized(raw: &ClassRef, args: Vec<GenericType>) -> Result<Self, TypeError> {
        let expected = raw.type_params().len();
        if expected != args.len() {
            return Err(TypeError::InvalidTypeArgCount {
                raw: raw.name().to_string(),
                expected,
                actual: args.len(),
            });
        }
        Ok(GenericType::Parameterized {
            raw: raw.clone(),
            args,
        })
    }

    /// Type variable
    pub fn variable(name: &str) -> Self {
        GenericType::Variable(name.to_string())
    }

    /// Erased class, if this type has one
    pub fn raw_class(&self) -> Option<&ClassRef> {
        match self {
            GenericType::Class(class) => Some(class),
            GenericType::Parameterized { raw, .. } => Some(raw),
            GenericType::Variable(_) | GenericType::Wildcard => None,
        }
    }

    /// Type arguments (empty unless parameterized)
    pub fn type_arguments(&self) -> &[GenericType] {
        match self {
            GenericType::Parameterized { args, .. } => args,
            _ => &[],
        }
    }

    /// Element type of a collection type
    ///
    /// Iterables yield their single argument and maps their value argument.
    pub fn element_type(&self) -> Option<&GenericType> {
        let GenericType::Parameterized { raw, args } = self else {
            return None;
        };
        if raw.is_subtype_of(builtin::iterable().id()) {
            args.first()
        } else if raw.is_subtype_of(builtin::map().id()) {
            args.get(1)
        } else {
            None
        }
    }

    /// Erased class of the element type
    pub fn element_class(&self) -> Option<&ClassRef> {
        self.element_type()?.raw_class()
    }
}

impl fmt::Display for GenericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericType::Class(class) => write!(f, "{}", class.name()),
            GenericType::Parameterized { raw, args } => {
                write!(f, "{}<", raw.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ">")
            }
            GenericType::Variable(name) => write!(f, "{}", name),
            GenericType::Wildcard => write!(f, "?"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::PrimitiveType;

    #[test]
    fn test_parameterized_arg_count() {
        let err = GenericType::parameterized(builtin::map(), vec![GenericType::Wildcard]).unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidTypeArgCount {
                raw: "core.Map".to_string(),
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_map_element_is_value_type() {
        let map = GenericType::parameterized(
            builtin::map(),
            vec![
                GenericType::class(builtin::string()),
                GenericType::class(builtin::primitive(PrimitiveType::Long)),
            ],
        )
        .unwrap();
        assert_eq!(map.element_class().unwrap().name(), "long");
        assert_eq!(map.to_string(), "core.Map<core.String, long>");
    }

    #[test]
    fn test_non_collection_has_no_element() {
        assert!(GenericType::class(builtin::string()).element_type().is_none());
        assert!(GenericType::variable("T").raw_class().is_none());
        let list = GenericType::parameterized(builtin::list(), vec![GenericType::variable("T")]).unwrap();
        assert_eq!(list.element_type(), Some(&GenericType::variable("T")));
        assert!(list.element_class().is_none());
    }
}
