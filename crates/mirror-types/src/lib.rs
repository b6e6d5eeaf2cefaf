//! Mirror Type Model
//!
//! Runtime type descriptors for the mirror accessor engine. Rust has no
//! runtime reflection, so hosts describe the types they want to expose:
//!
//! - **Classes**: [`ClassDef`] with a superclass chain, interfaces, declared
//!   operations and constructors (built with [`ClassBuilder`])
//! - **Values**: the dynamic [`Value`] passed to and returned from operations
//! - **Objects**: shared instances carrying typed Rust state ([`Object`])
//! - **Generics**: parameterized type metadata ([`GenericType`])
//! - **Boundaries**: code-loading scopes that own classes ([`Boundary`])
//!
//! # Example
//!
//! ```rust,ignore
//! use mirror_types::{ClassBuilder, Object};
//!
//! #[derive(Default)]
//! struct Person { name: String, age: i32 }
//!
//! let person = ClassBuilder::<Person>::new("demo.Person")
//!     .constructor0(Person::default)
//!     .getter("getName", |p| p.name.clone())
//!     .setter("setName", |p, name: String| p.name = name)
//!     .getter("getAge", |p| p.age)
//!     .setter("setAge", |p, age: i32| p.age = age)
//!     .build();
//!
//! let obj = Object::new(person, Person::default());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod boundary;
pub mod builtin;
pub mod class;
pub mod convert;
pub mod error;
pub mod generic;
pub mod method;
pub mod object;
pub mod value;

pub use boundary::{Artifact, Boundary, BoundaryId, DefineRefused};
pub use class::{ClassBuilder, ClassDef, ClassId, ClassKind, ClassRef, PrimitiveType};
pub use convert::{FromValue, IntoValue, TypeOf};
pub use error::{OperationFault, TypeError};
pub use generic::GenericType;
pub use method::{ConstructorBody, ConstructorDef, MethodBody, MethodDef, Visibility};
pub use object::Object;
pub use value::Value;
