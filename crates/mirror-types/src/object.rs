//! Shared instances
//!
//! An [`Object`] pairs a class with the Rust state built by one of its
//! constructors. Handles are cheap to clone and compare by identity.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::class::ClassRef;

struct ObjectInner {
    class: ClassRef,
    state: RwLock<Box<dyn Any + Send + Sync>>,
}

/// Instance of a host class
#[derive(Clone)]
pub struct Object(Arc<ObjectInner>);

impl Object {
    /// Create an instance carrying `state`
    pub fn new<T: Any + Send + Sync>(class: ClassRef, state: T) -> Self {
        Self::from_boxed(class, Box::new(state))
    }

    /// Create an instance from already boxed state
    pub fn from_boxed(class: ClassRef, state: Box<dyn Any + Send + Sync>) -> Self {
        Object(Arc::new(ObjectInner {
            class,
            state: RwLock::new(state),
        }))
    }

    /// Get the runtime class
    pub fn class(&self) -> &ClassRef {
        &self.0.class
    }

    /// Borrow the state as `T`
    ///
    /// `T` may be the state type of any class in the superclass chain that
    /// was linked with `extends_via`. Returns None if no class carries `T`.
    pub fn read<T: Any>(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        let class = &self.0.class;
        let guard = self.0.state.read();
        RwLockReadGuard::try_map(guard, |state| class.project_ref::<T>(&**state)).ok()
    }

    /// Mutably borrow the state as `T`
    pub fn write<T: Any>(&self) -> Option<MappedRwLockWriteGuard<'_, T>> {
        let class = &self.0.class;
        let guard = self.0.state.write();
        RwLockWriteGuard::try_map(guard, |state| class.project_mut::<T>(&mut **state)).ok()
    }

    /// Whether two handles refer to the same instance
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the instance, stable for its lifetime
    pub fn address(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.0.class.name())
            .field("address", &format_args!("{:#x}", self.address()))
            .finish()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:x}", self.0.class.name(), self.address())
    }
}
