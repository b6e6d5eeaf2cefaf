//! Reflector facade
//!
//! Resolves names, signatures and field conventions to dispatcher indices.
//! Misses that callers routinely expect (no such field, no such operation)
//! come back as `None`; structural problems come back as errors.

use std::fmt;
use std::sync::Arc;

use mirror_types::{ClassDef, ClassRef, ConstructorDef, Object, Value, Visibility};

use super::cache::AccessorCache;
use super::clock::{Clock, SystemClock};
use super::dispatcher::TypeDispatcher;
use super::domain::DomainRegistry;
use super::synthesizer::Synthesizer;
use crate::error::{ReflectError, ReflectResult};
use crate::options::ReflectorOptions;

/// Reflective access to host-described types
///
/// Owns one dispatcher cache. Create it once and share it (it is `Sync`).
pub struct Reflector {
    cache: AccessorCache,
}

impl Reflector {
    /// Create a reflector with default options
    pub fn new() -> Self {
        Self::with_options(ReflectorOptions::default())
    }

    /// Create a reflector with custom options
    pub fn with_options(options: ReflectorOptions) -> Self {
        Self::with_options_and_clock(options, Arc::new(SystemClock::new()))
    }

    /// Create a reflector whose cache expiry reads `clock`
    pub fn with_options_and_clock(options: ReflectorOptions, clock: Arc<dyn Clock>) -> Self {
        Self::from_parts(options, Arc::new(DomainRegistry::new()), clock)
    }

    /// Create a reflector realizing dispatch tables through `domains`
    pub fn from_parts(
        options: ReflectorOptions,
        domains: Arc<DomainRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            cache: AccessorCache::new(Synthesizer::new(domains), options.cache, clock),
        }
    }

    /// The dispatcher cache
    pub fn cache(&self) -> &AccessorCache {
        &self.cache
    }

    /// The domain registry dispatch tables are realized through
    pub fn domains(&self) -> &Arc<DomainRegistry> {
        self.cache.synthesizer().domains()
    }

    /// Dispatcher for `class`, building it on first use
    pub fn accessor(&self, class: &ClassRef) -> ReflectResult<Arc<TypeDispatcher>> {
        self.cache.get_or_build(class)
    }

    /// Field names of `class`, derived from its getters in catalog order
    pub fn field_names(&self, class: &ClassRef) -> ReflectResult<Vec<String>> {
        Ok(self.accessor(class)?.field_names().to_vec())
    }

    // ===== Field access =====

    /// Read `field` of `obj`; `None` if no getter resolves
    pub fn get_field_value(&self, obj: &Object, field: &str) -> ReflectResult<Option<Value>> {
        self.accessor(obj.class())?.get_field_value(obj, field)
    }

    /// Write `field` of `obj`; `false` if no setter resolves
    pub fn set_field_value(&self, obj: &Object, field: &str, value: Value) -> ReflectResult<bool> {
        self.accessor(obj.class())?
            .set_field_value(obj, field, value)
    }

    // ===== Invocation =====

    /// Invoke the first operation called `name` that accepts `args`
    ///
    /// Overloads are tried in catalog order and the first compatible one
    /// wins, even if a later one matches more precisely. `None` if nothing
    /// accepts the arguments.
    pub fn invoke(&self, obj: &Object, name: &str, args: &[Value]) -> ReflectResult<Option<Value>> {
        let dispatcher = self.accessor(obj.class())?;
        match dispatcher.index_for_args(name, args) {
            Some(index) => dispatcher.invoke(Some(obj), index, args).map(Some),
            None => {
                tracing::trace!(
                    class = obj.class().name(),
                    operation = name,
                    args = %describe_args(args),
                    "no compatible operation"
                );
                Ok(None)
            }
        }
    }

    /// Invoke the first static operation of `class` called `name` that accepts `args`
    pub fn invoke_static(
        &self,
        class: &ClassRef,
        name: &str,
        args: &[Value],
    ) -> ReflectResult<Option<Value>> {
        let dispatcher = self.accessor(class)?;
        let index = dispatcher
            .descriptors()
            .iter()
            .position(|d| d.is_static && d.name == name && d.accepts(args));
        match index {
            Some(index) => dispatcher.invoke(None, index, args).map(Some),
            None => Ok(None),
        }
    }

    /// Invoke the operation with exactly this signature
    ///
    /// Signatures read `declaring.Class.name(param.Class,param.Class)`.
    pub fn invoke_by_signature(
        &self,
        obj: &Object,
        signature: &str,
        args: &[Value],
    ) -> ReflectResult<Value> {
        let dispatcher = self.accessor(obj.class())?;
        let index = dispatcher.index_of_signature(signature).ok_or_else(|| {
            ReflectError::UnknownOperationIndex {
                type_name: obj.class().name().to_string(),
                operation: signature.to_string(),
            }
        })?;
        dispatcher.invoke(Some(obj), index, args)
    }

    // ===== Construction =====

    /// First public constructor of `class` accepting `args`, in declaration order
    pub fn find_constructor<'a>(
        &self,
        class: &'a ClassRef,
        args: &[Value],
    ) -> Option<&'a ConstructorDef> {
        class.constructors().iter().find(|ctor| {
            ctor.visibility == Visibility::Public
                && ctor.arity() == args.len()
                && ctor
                    .params
                    .iter()
                    .zip(args)
                    .all(|(param, arg)| param.is_assignable_value(arg))
        })
    }

    /// Instantiate `class` with the first constructor accepting `args`
    pub fn new_instance(&self, class: &ClassRef, args: &[Value]) -> ReflectResult<Object> {
        let ctor = self.find_constructor(class, args).ok_or_else(|| {
            ReflectError::NoMatchingConstructor {
                type_name: class.name().to_string(),
                args: describe_args(args),
            }
        })?;
        if class.is_abstract() || class.is_interface() {
            return Err(ReflectError::InstantiationFailed {
                type_name: class.name().to_string(),
                reason: "type is abstract".to_string(),
            });
        }
        let state = (ctor.body)(args).map_err(|fault| ReflectError::InstantiationFailed {
            type_name: class.name().to_string(),
            reason: fault.to_string(),
        })?;
        Ok(Object::from_boxed(class.clone(), state))
    }
}

impl Default for Reflector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Reflector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reflector")
            .field("cache", &self.cache)
            .finish()
    }
}

/// Whether `value` may be stored in a slot of type `class`
///
/// Null is accepted for every reference type and rejected for primitives.
pub fn is_instance(class: &ClassDef, value: &Value) -> bool {
    class.is_assignable_value(value)
}

/// Whether values of `child` may be used where `parent` is expected
pub fn is_assignable(parent: &ClassDef, child: &ClassDef) -> bool {
    parent.is_assignable_from(child)
}

/// Render an argument list for diagnostics: `int:5, core.String:abc`
pub fn describe_args(args: &[Value]) -> String {
    if args.is_empty() {
        return "empty args".to_string();
    }
    args.iter()
        .map(|arg| match arg {
            Value::Null => "null".to_string(),
            other => format!("{}:{}", other.type_name(), other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
