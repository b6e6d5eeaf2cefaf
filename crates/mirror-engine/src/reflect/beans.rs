//! Field-level helpers built on the reflector
//!
//! These operate on every field a type exposes through its getters, the way
//! row export and request validation walk plain data objects.
//!
//! A field counts as empty when it is null, a blank string or an empty list.
//! A field without a getter reads as null.

use rustc_hash::FxHashSet;

use mirror_types::{Object, Value};

use super::reflector::Reflector;
use crate::error::{ReflectError, ReflectResult};

/// Whether a value counts as empty: null, blank string or empty list
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Str(s) => s.trim().is_empty(),
        Value::List(items) => items.is_empty(),
        _ => false,
    }
}

/// Ordered name/value pairs of every readable field
pub fn field_values(reflector: &Reflector, obj: &Object) -> ReflectResult<Vec<(String, Value)>> {
    let dispatcher = reflector.accessor(obj.class())?;
    let mut values = Vec::with_capacity(dispatcher.field_names().len());
    for field in dispatcher.field_names() {
        if let Some(value) = dispatcher.get_field_value(obj, field)? {
            values.push((field.clone(), value));
        }
    }
    Ok(values)
}

/// Whether every field not in `ignore` is empty
pub fn are_values_all_empty(
    reflector: &Reflector,
    obj: &Object,
    ignore: &[&str],
) -> ReflectResult<bool> {
    let dispatcher = reflector.accessor(obj.class())?;
    for field in dispatcher.field_names() {
        if ignore.contains(&field.as_str()) {
            continue;
        }
        if let Some(value) = dispatcher.get_field_value(obj, field)? {
            if !is_empty_value(&value) {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

/// Fail with [`ReflectError::EmptyField`] on the first listed field that is empty
///
/// The list itself must be non-empty and hold no blank names.
pub fn assert_fields(reflector: &Reflector, obj: &Object, fields: &[&str]) -> ReflectResult<()> {
    let type_name = obj.class().name();
    if fields.is_empty() {
        return Err(ReflectError::InvalidFieldList {
            type_name: type_name.to_string(),
            reason: "no field names given".to_string(),
        });
    }
    let dispatcher = reflector.accessor(obj.class())?;
    for (position, field) in fields.iter().enumerate() {
        if field.trim().is_empty() {
            return Err(ReflectError::InvalidFieldList {
                type_name: type_name.to_string(),
                reason: format!("field name {} is blank", position + 1),
            });
        }
        let value = dispatcher.get_field_value(obj, field)?;
        check_field(type_name, field, value.as_ref())?;
    }
    Ok(())
}

/// Fail with [`ReflectError::EmptyField`] on the first readable field that is empty
pub fn assert_all_fields(reflector: &Reflector, obj: &Object) -> ReflectResult<()> {
    let dispatcher = reflector.accessor(obj.class())?;
    for field in dispatcher.field_names() {
        let value = dispatcher.get_field_value(obj, field)?;
        check_field(obj.class().name(), field, value.as_ref())?;
    }
    Ok(())
}

fn check_field(type_name: &str, field: &str, value: Option<&Value>) -> ReflectResult<()> {
    match value {
        Some(value) if !is_empty_value(value) => Ok(()),
        _ => {
            tracing::debug!(type_name, field, "required field is empty");
            Err(ReflectError::EmptyField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            })
        }
    }
}

/// Set every blank string field to null, returning how many were cleared
pub fn replace_blank_with_null(reflector: &Reflector, obj: &Object) -> ReflectResult<usize> {
    let dispatcher = reflector.accessor(obj.class())?;
    let mut cleared = 0;
    for field in dispatcher.field_names() {
        if let Some(Value::Str(s)) = dispatcher.get_field_value(obj, field)? {
            if s.trim().is_empty() && dispatcher.set_field_value(obj, field, Value::Null)? {
                cleared += 1;
            }
        }
    }
    Ok(cleared)
}

/// Set the listed fields to null, or every field when `include` is empty
pub fn clear_fields(reflector: &Reflector, obj: &Object, include: &[&str]) -> ReflectResult<usize> {
    let dispatcher = reflector.accessor(obj.class())?;
    let targets: Vec<String> = if include.is_empty() {
        dispatcher.field_names().to_vec()
    } else {
        include.iter().map(|f| f.to_string()).collect()
    };
    let mut cleared = 0;
    for field in &targets {
        if dispatcher.set_field_value(obj, field, Value::Null)? {
            cleared += 1;
        }
    }
    Ok(cleared)
}

/// Set every field except the listed ones to null
pub fn clear_fields_except(
    reflector: &Reflector,
    obj: &Object,
    exclude: &[&str],
) -> ReflectResult<usize> {
    let dispatcher = reflector.accessor(obj.class())?;
    let mut seen = FxHashSet::default();
    let mut cleared = 0;
    for field in dispatcher.field_names() {
        if exclude.contains(&field.as_str()) || !seen.insert(field.as_str()) {
            continue;
        }
        if dispatcher.set_field_value(obj, field, Value::Null)? {
            cleared += 1;
        }
    }
    Ok(cleared)
}
