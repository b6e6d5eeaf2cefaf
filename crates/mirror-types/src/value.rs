//! Dynamic values
//!
//! [`Value`] is what flows through dispatch tables: arguments in, results
//! out. Primitive variants map one-to-one onto [`PrimitiveType`].

use std::fmt;
use std::sync::Arc;

use crate::builtin;
use crate::class::{ClassDef, ClassRef, PrimitiveType};
use crate::object::Object;

/// A dynamically typed value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// The absent reference
    #[default]
    Null,
    /// `boolean`
    Bool(bool),
    /// `char`
    Char(char),
    /// `byte`
    Byte(i8),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// `core.String`
    Str(Arc<str>),
    /// `core.List`
    List(Vec<Value>),
    /// Instance of a host class
    Object(Object),
}

impl Value {
    /// Check if this is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Primitive type of this value, if it is a primitive
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self {
            Value::Bool(_) => Some(PrimitiveType::Boolean),
            Value::Char(_) => Some(PrimitiveType::Char),
            Value::Byte(_) => Some(PrimitiveType::Byte),
            Value::Short(_) => Some(PrimitiveType::Short),
            Value::Int(_) => Some(PrimitiveType::Int),
            Value::Long(_) => Some(PrimitiveType::Long),
            Value::Float(_) => Some(PrimitiveType::Float),
            Value::Double(_) => Some(PrimitiveType::Double),
            _ => None,
        }
    }

    /// Runtime class of this value (None for null)
    pub fn runtime_class(&self) -> Option<ClassRef> {
        match self {
            Value::Object(obj) => Some(obj.class().clone()),
            other => builtin_class(other).cloned(),
        }
    }

    /// Borrowed runtime class of this value (None for null)
    pub fn runtime_class_ref(&self) -> Option<&ClassDef> {
        match self {
            Value::Null => None,
            Value::Object(obj) => Some(obj.class()),
            other => builtin_class(other).map(|c| &**c),
        }
    }

    /// Name of the runtime class, or `null`
    pub fn type_name(&self) -> String {
        match self.runtime_class_ref() {
            Some(class) => class.name().to_string(),
            None => "null".to_string(),
        }
    }

    /// Try to get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i32
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as i64, widening smaller integers
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(i) => Some(*i as i64),
            Value::Short(i) => Some(*i as i64),
            Value::Int(i) => Some(*i as i64),
            Value::Long(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64, widening floats
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f as f64),
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Try to get as a string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Try to get as an object
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

fn builtin_class(value: &Value) -> Option<&'static ClassRef> {
    match value {
        Value::Null | Value::Object(_) => None,
        Value::Str(_) => Some(builtin::string()),
        Value::List(_) => Some(builtin::list()),
        other => other.primitive_type().map(builtin::primitive),
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Char(c)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Long(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{}", c),
            Value::Byte(i) => write!(f, "{}", i),
            Value::Short(i) => write!(f, "{}", i),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Double(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(obj) => write!(f, "{}", obj),
        }
    }
}
