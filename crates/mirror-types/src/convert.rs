//! Conversions between Rust types and [`Value`]
//!
//! The typed helpers on [`crate::ClassBuilder`] use these traits to derive
//! parameter and return classes and to marshal arguments.

use crate::builtin;
use crate::class::{ClassRef, PrimitiveType};
use crate::error::OperationFault;
use crate::generic::GenericType;
use crate::object::Object;
use crate::value::Value;

/// Rust types with a class in the type model
pub trait TypeOf {
    /// Erased class
    fn class() -> ClassRef;

    /// Full generic type; the erased class unless overridden
    fn generic() -> GenericType {
        GenericType::Class(Self::class())
    }
}

/// Rust types that can be returned from an operation
pub trait IntoValue {
    /// Convert into a dynamic value
    fn into_value(self) -> Value;
}

/// Rust types that can be received as an argument
pub trait FromValue: Sized {
    /// Convert from a dynamic value
    fn from_value(value: &Value) -> Result<Self, OperationFault>;
}

fn mismatch<T>(expected: &'static str, found: &Value) -> Result<T, OperationFault> {
    Err(OperationFault::Conversion {
        expected,
        found: found.type_name(),
    })
}

macro_rules! primitive_conversions {
    ($($ty:ty => $variant:ident, $prim:ident;)*) => {
        $(
            impl TypeOf for $ty {
                fn class() -> ClassRef {
                    builtin::primitive(PrimitiveType::$prim).clone()
                }
            }

            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, OperationFault> {
                    match value {
                        Value::$variant(v) => Ok(*v),
                        other => mismatch(stringify!($ty), other),
                    }
                }
            }
        )*
    };
}

primitive_conversions! {
    bool => Bool, Boolean;
    char => Char, Char;
    i8 => Byte, Byte;
    i16 => Short, Short;
    i32 => Int, Int;
    i64 => Long, Long;
    f32 => Float, Float;
    f64 => Double, Double;
}

impl TypeOf for () {
    fn class() -> ClassRef {
        builtin::void().clone()
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl TypeOf for String {
    fn class() -> ClassRef {
        builtin::string().clone()
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, OperationFault> {
        match value {
            Value::Str(s) => Ok(s.to_string()),
            other => mismatch("String", other),
        }
    }
}

impl TypeOf for Option<String> {
    fn class() -> ClassRef {
        builtin::string().clone()
    }
}

impl IntoValue for Option<String> {
    fn into_value(self) -> Value {
        self.map(Value::from).unwrap_or(Value::Null)
    }
}

impl FromValue for Option<String> {
    fn from_value(value: &Value) -> Result<Self, OperationFault> {
        match value {
            Value::Null => Ok(None),
            Value::Str(s) => Ok(Some(s.to_string())),
            other => mismatch("Option<String>", other),
        }
    }
}

impl TypeOf for Object {
    fn class() -> ClassRef {
        builtin::object().clone()
    }
}

impl IntoValue for Object {
    fn into_value(self) -> Value {
        Value::Object(self)
    }
}

impl FromValue for Object {
    fn from_value(value: &Value) -> Result<Self, OperationFault> {
        match value {
            Value::Object(obj) => Ok(obj.clone()),
            other => mismatch("Object", other),
        }
    }
}

impl TypeOf for Option<Object> {
    fn class() -> ClassRef {
        builtin::object().clone()
    }
}

impl IntoValue for Option<Object> {
    fn into_value(self) -> Value {
        self.map(Value::Object).unwrap_or(Value::Null)
    }
}

impl FromValue for Option<Object> {
    fn from_value(value: &Value) -> Result<Self, OperationFault> {
        match value {
            Value::Null => Ok(None),
            Value::Object(obj) => Ok(Some(obj.clone())),
            other => mismatch("Option<Object>", other),
        }
    }
}

impl TypeOf for Value {
    fn class() -> ClassRef {
        builtin::object().clone()
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, OperationFault> {
        Ok(value.clone())
    }
}

impl<T: TypeOf> TypeOf for Vec<T> {
    fn class() -> ClassRef {
        builtin::list().clone()
    }

    fn generic() -> GenericType {
        GenericType::Parameterized {
            raw: builtin::list().clone(),
            args: vec![T::generic()],
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self, OperationFault> {
        match value {
            Value::List(items) => items.iter().map(T::from_value).collect(),
            other => mismatch("Vec", other),
        }
    }
}
