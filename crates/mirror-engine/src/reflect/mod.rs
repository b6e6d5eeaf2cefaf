//! Reflective accessors
//!
//! A cache miss walks the type with [`discover`], hands the catalog to the
//! [`Synthesizer`], which realizes a [`DispatchTable`] inside an
//! [`IsolationDomain`] and wraps it in a [`TypeDispatcher`]. The
//! [`Reflector`] facade resolves names, signatures and field conventions to
//! indices on that dispatcher.

pub mod beans;
mod cache;
mod catalog;
mod clock;
mod descriptor;
mod dispatcher;
mod domain;
pub mod naming;
mod reflector;
mod synthesizer;

pub use cache::{AccessorCache, CacheStats};
pub use catalog::discover;
pub use clock::{Clock, ManualClock, SystemClock};
pub use descriptor::OperationDescriptor;
pub use dispatcher::TypeDispatcher;
pub use domain::{DomainRegistry, IsolationDomain};
pub use naming::{is_alien_name, GETTER_PREFIX, SEPARATOR, SETTER_PREFIX};
pub use reflector::{describe_args, is_assignable, is_instance, Reflector};
pub use synthesizer::{dispatcher_name, Access, DispatchTable, Synthesizer};
