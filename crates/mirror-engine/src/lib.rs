//! Mirror Accessor Engine
//!
//! Invokes operations of host-described types by numeric index instead of by
//! per-call introspection:
//! - **Catalog**: ordered discovery of a type's accessible operations
//! - **Synthesizer**: compiles a catalog into a per-type dispatch table
//! - **Domains**: the boundaries dispatch tables are realized in
//! - **Cache**: bounded, expiring, single-flight cache of dispatchers
//! - **Reflector**: name, signature and field-convention lookups on top
//!
//! # Example
//!
//! ```rust,ignore
//! use mirror_engine::Reflector;
//! use mirror_types::{ClassBuilder, Object, Value};
//!
//! let person = ClassBuilder::<Person>::new("demo.Person")
//!     .getter("getName", |p| p.name.clone())
//!     .setter("setName", |p, name: String| p.name = name)
//!     .build();
//!
//! let reflector = Reflector::new();
//! let obj = Object::new(person.clone(), Person::default());
//! reflector.set_field_value(&obj, "name", Value::from("Ada"))?;
//! assert_eq!(reflector.field_names(&person)?, vec!["name"]);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod options;
pub mod reflect;

pub use error::{ReflectError, ReflectResult};
pub use options::{CacheOptions, ReflectorOptions};
pub use reflect::{
    describe_args, discover, dispatcher_name, is_assignable, is_instance, Access, AccessorCache,
    CacheStats, Clock, DispatchTable, DomainRegistry, IsolationDomain, ManualClock,
    OperationDescriptor, Reflector, Synthesizer, SystemClock, TypeDispatcher,
};
