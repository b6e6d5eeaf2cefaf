//! Runtime class descriptors
//!
//! A [`ClassDef`] describes one type known to the accessor engine: its place
//! in the inheritance hierarchy, the operations it declares (in declaration
//! order) and its constructors. Class descriptors are immutable and shared
//! through [`ClassRef`].

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::boundary::Boundary;
use crate::builtin;
use crate::convert::{FromValue, IntoValue, TypeOf};
use crate::method::{ConstructorDef, MethodDef};
use crate::value::Value;

/// Shared handle to a class descriptor
pub type ClassRef = Arc<ClassDef>;

/// Unique identifier for a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u64);

impl ClassId {
    /// Generate a new unique ClassId
    pub fn new() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        ClassId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the numeric ID value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl Default for ClassId {
    fn default() -> Self {
        Self::new()
    }
}

/// Primitive value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// `boolean`
    Boolean,
    /// `char`
    Char,
    /// `byte` (8-bit signed)
    Byte,
    /// `short` (16-bit signed)
    Short,
    /// `int` (32-bit signed)
    Int,
    /// `long` (64-bit signed)
    Long,
    /// `float` (32-bit)
    Float,
    /// `double` (64-bit)
    Double,
}

impl PrimitiveType {
    /// All primitive types, in declaration order
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Char,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    /// Source-level name of the primitive
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Char => "char",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }
}

/// Class kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    /// Concrete or abstract class
    Class,
    /// Interface
    Interface,
    /// Primitive type
    Primitive(PrimitiveType),
    /// The `void` pseudo-type
    Void,
}

type ProjectRef = dyn Fn(&dyn Any) -> Option<&dyn Any> + Send + Sync;
type ProjectMut = dyn Fn(&mut dyn Any) -> Option<&mut dyn Any> + Send + Sync;

/// Maps a subclass's state to the embedded superclass state
struct Projection {
    get: Arc<ProjectRef>,
    get_mut: Arc<ProjectMut>,
}

fn project_ref_fn<F>(f: F) -> F
where
    F: Fn(&dyn Any) -> Option<&dyn Any> + Send + Sync + 'static,
{
    f
}

fn project_mut_fn<F>(f: F) -> F
where
    F: Fn(&mut dyn Any) -> Option<&mut dyn Any> + Send + Sync + 'static,
{
    f
}

/// Runtime descriptor for one type
pub struct ClassDef {
    id: ClassId,
    name: String,
    kind: ClassKind,
    is_abstract: bool,
    superclass: Option<ClassRef>,
    /// Implemented interfaces (super-interfaces for an interface)
    interfaces: Vec<ClassRef>,
    /// Declared operations, in declaration order
    methods: Vec<MethodDef>,
    constructors: Vec<ConstructorDef>,
    /// Formal type parameter names
    type_params: Vec<String>,
    boundary: Arc<Boundary>,
    projection: Option<Projection>,
}

impl ClassDef {
    pub(crate) fn builtin(
        name: &str,
        kind: ClassKind,
        superclass: Option<ClassRef>,
        interfaces: Vec<ClassRef>,
        type_params: &[&str],
    ) -> ClassRef {
        Arc::new(Self {
            id: ClassId::new(),
            name: name.to_string(),
            kind,
            is_abstract: kind == ClassKind::Interface,
            superclass,
            interfaces,
            methods: Vec::new(),
            constructors: Vec::new(),
            type_params: type_params.iter().map(|p| p.to_string()).collect(),
            boundary: Boundary::bootstrap(),
            projection: None,
        })
    }

    /// Get the class ID
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Get the fully qualified class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the class name without its namespace
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Get the class kind
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Whether this class is an interface
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Whether this class is a primitive type
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, ClassKind::Primitive(_))
    }

    /// Whether this class is the `void` pseudo-type
    pub fn is_void(&self) -> bool {
        self.kind == ClassKind::Void
    }

    /// Get the primitive type, if this class is one
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        match self.kind {
            ClassKind::Primitive(p) => Some(p),
            _ => None,
        }
    }

    /// Whether instances of this class cannot be constructed directly
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Get the superclass (None for interfaces, primitives, void and the root)
    pub fn superclass(&self) -> Option<&ClassRef> {
        self.superclass.as_ref()
    }

    /// Get the implemented (or extended, for interfaces) interfaces
    pub fn interfaces(&self) -> &[ClassRef] {
        &self.interfaces
    }

    /// Get the declared operations in declaration order
    pub fn declared_methods(&self) -> &[MethodDef] {
        &self.methods
    }

    /// Get the declared constructors in declaration order
    pub fn constructors(&self) -> &[ConstructorDef] {
        &self.constructors
    }

    /// Get the formal type parameter names
    pub fn type_params(&self) -> &[String] {
        &self.type_params
    }

    /// Get the boundary that owns this class
    pub fn boundary(&self) -> &Arc<Boundary> {
        &self.boundary
    }

    /// Get the inheritance chain, from this class up to the root
    pub fn hierarchy(&self) -> Vec<&ClassDef> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(class) = current {
            chain.push(class);
            current = class.superclass.as_deref();
        }
        chain
    }

    /// Check whether this class is `target` or a subtype of it
    ///
    /// Follows the superclass chain and, transitively, every implemented
    /// interface. Every non-primitive type is a subtype of the root class.
    pub fn is_subtype_of(&self, target: ClassId) -> bool {
        if self.id == target {
            return true;
        }
        if target == builtin::object().id() {
            return !self.is_primitive() && !self.is_void();
        }
        if self
            .interfaces
            .iter()
            .any(|iface| iface.is_subtype_of(target))
        {
            return true;
        }
        match &self.superclass {
            Some(parent) => parent.is_subtype_of(target),
            None => false,
        }
    }

    /// Check whether a value of class `other` may be used where this class is expected
    pub fn is_assignable_from(&self, other: &ClassDef) -> bool {
        other.is_subtype_of(self.id)
    }

    /// Check whether `value` may be passed where this class is expected
    ///
    /// `null` fits any non-primitive class, a primitive class only admits the
    /// identical primitive, and every non-null value fits the root class.
    pub fn is_assignable_value(&self, value: &Value) -> bool {
        if value.is_null() {
            return !self.is_primitive() && !self.is_void();
        }
        if let Some(primitive) = self.primitive_type() {
            return value.primitive_type() == Some(primitive);
        }
        match value.runtime_class_ref() {
            Some(class) => class.is_subtype_of(self.id),
            None => false,
        }
    }

    /// Resolve the implementation an instance call would run on this class
    ///
    /// Searches the superclass chain (most-derived first) for a non-static,
    /// non-private operation with a body, then the default bodies of the
    /// implemented interfaces.
    pub fn resolve_virtual(&self, name: &str, params: &[ClassId]) -> Option<&MethodDef> {
        let concrete = |m: &&MethodDef| {
            !m.is_static && !m.is_private() && m.body.is_some() && m.matches(name, params)
        };

        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(method) = class.methods.iter().find(concrete) {
                return Some(method);
            }
            current = class.superclass.as_deref();
        }

        let mut current = Some(self);
        while let Some(class) = current {
            for iface in &class.interfaces {
                if let Some(method) = iface.resolve_default(name, params) {
                    return Some(method);
                }
            }
            current = class.superclass.as_deref();
        }
        None
    }

    fn resolve_default(&self, name: &str, params: &[ClassId]) -> Option<&MethodDef> {
        if let Some(method) = self
            .methods
            .iter()
            .find(|m| !m.is_static && m.body.is_some() && m.matches(name, params))
        {
            return Some(method);
        }
        self.interfaces
            .iter()
            .find_map(|iface| iface.resolve_default(name, params))
    }

    /// View instance state as `T`, projecting through superclass state if needed
    pub fn project_ref<'a, T: Any>(&self, state: &'a dyn Any) -> Option<&'a T> {
        let mut current = state;
        let mut class = self;
        loop {
            if let Some(found) = current.downcast_ref::<T>() {
                return Some(found);
            }
            let projection = class.projection.as_ref()?;
            current = (projection.get)(current)?;
            class = class.superclass.as_deref()?;
        }
    }

    /// Mutable counterpart of [`ClassDef::project_ref`]
    pub fn project_mut<'a, T: Any>(&self, state: &'a mut dyn Any) -> Option<&'a mut T> {
        let mut current = state;
        let mut class = self;
        loop {
            if current.is::<T>() {
                return current.downcast_mut::<T>();
            }
            let projection = class.projection.as_ref()?;
            current = (projection.get_mut)(current)?;
            class = class.superclass.as_deref()?;
        }
    }
}

impl PartialEq for ClassDef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ClassDef {}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("superclass", &self.superclass.as_ref().map(|c| c.name()))
            .field("methods", &self.methods.len())
            .field("boundary", &self.boundary.name())
            .finish()
    }
}

impl fmt::Display for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builder for class descriptors
///
/// `T` is the Rust type carried as instance state. The typed helpers
/// (`getter`, `setter`, `method1`, ...) read and write that state and derive
/// parameter and return classes from the closure types.
pub struct ClassBuilder<T = ()> {
    name: String,
    kind: ClassKind,
    is_abstract: bool,
    superclass: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
    methods: Vec<MethodDef>,
    constructors: Vec<ConstructorDef>,
    type_params: Vec<String>,
    boundary: Option<Arc<Boundary>>,
    projection: Option<Projection>,
    _state: PhantomData<fn() -> T>,
}

impl ClassBuilder<()> {
    /// Start an interface
    pub fn interface(name: &str) -> Self {
        Self {
            kind: ClassKind::Interface,
            is_abstract: true,
            superclass: None,
            ..Self::new(name)
        }
    }
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    /// Start a class extending the root class
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ClassKind::Class,
            is_abstract: false,
            superclass: Some(builtin::object().clone()),
            interfaces: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            type_params: Vec::new(),
            boundary: None,
            projection: None,
            _state: PhantomData,
        }
    }

    /// Place the class in a boundary other than the system boundary
    pub fn in_boundary(mut self, boundary: &Arc<Boundary>) -> Self {
        self.boundary = Some(boundary.clone());
        self
    }

    /// Mark the class abstract
    pub fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declare formal type parameters
    pub fn type_params(mut self, params: &[&str]) -> Self {
        self.type_params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Extend a class whose instances carry the same state type
    pub fn extends(mut self, base: &ClassRef) -> Self {
        self.superclass = Some(base.clone());
        self.projection = None;
        self
    }

    /// Extend a class whose state is embedded in this class's state
    pub fn extends_via<B: Any>(
        mut self,
        base: &ClassRef,
        get: fn(&T) -> &B,
        get_mut: fn(&mut T) -> &mut B,
    ) -> Self {
        let project = project_ref_fn(move |state: &dyn Any| {
            state.downcast_ref::<T>().map(|t| get(t) as &dyn Any)
        });
        let project_mut = project_mut_fn(move |state: &mut dyn Any| {
            state.downcast_mut::<T>().map(|t| get_mut(t) as &mut dyn Any)
        });
        self.superclass = Some(base.clone());
        self.projection = Some(Projection {
            get: Arc::new(project),
            get_mut: Arc::new(project_mut),
        });
        self
    }

    /// Implement an interface (extend it, when building an interface)
    pub fn implements(mut self, iface: &ClassRef) -> Self {
        self.interfaces.push(iface.clone());
        self
    }

    /// Declare an operation
    pub fn method(mut self, def: MethodDef) -> Self {
        self.methods.push(def);
        self
    }

    /// Declare a constructor
    pub fn constructor(mut self, def: ConstructorDef) -> Self {
        self.constructors.push(def);
        self
    }

    /// Declare a zero-argument instance operation reading the state
    pub fn getter<R, F>(self, name: &str, f: F) -> Self
    where
        R: IntoValue + TypeOf,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        self.method(MethodDef::method0(name, f))
    }

    /// Declare a one-argument instance operation writing the state
    pub fn setter<A, F>(self, name: &str, f: F) -> Self
    where
        A: FromValue + TypeOf,
        F: Fn(&mut T, A) + Send + Sync + 'static,
    {
        self.method(MethodDef::method1_mut(name, f))
    }

    /// Declare a zero-argument instance operation
    pub fn method0<R, F>(self, name: &str, f: F) -> Self
    where
        R: IntoValue + TypeOf,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        self.method(MethodDef::method0(name, f))
    }

    /// Declare a one-argument instance operation
    pub fn method1<A, R, F>(self, name: &str, f: F) -> Self
    where
        A: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(&T, A) -> R + Send + Sync + 'static,
    {
        self.method(MethodDef::method1(name, f))
    }

    /// Declare a two-argument instance operation
    pub fn method2<A, B, R, F>(self, name: &str, f: F) -> Self
    where
        A: FromValue + TypeOf,
        B: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(&T, A, B) -> R + Send + Sync + 'static,
    {
        self.method(MethodDef::method2(name, f))
    }

    /// Declare a one-argument instance operation that mutates the state
    ///
    /// The body runs under the receiver's write lock. A call passing the
    /// receiver itself as an argument faults with
    /// [`OperationFault::AliasedReceiver`](crate::OperationFault::AliasedReceiver)
    /// instead of locking it twice.
    pub fn method1_mut<A, R, F>(self, name: &str, f: F) -> Self
    where
        A: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(&mut T, A) -> R + Send + Sync + 'static,
    {
        self.method(MethodDef::method1_mut(name, f))
    }

    /// Declare a two-argument instance operation that mutates the state
    ///
    /// Same locking rule as [`method1_mut`](Self::method1_mut).
    pub fn method2_mut<A, B, R, F>(self, name: &str, f: F) -> Self
    where
        A: FromValue + TypeOf,
        B: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(&mut T, A, B) -> R + Send + Sync + 'static,
    {
        self.method(MethodDef::method2_mut(name, f))
    }

    /// Declare a zero-argument static operation
    pub fn static0<R, F>(self, name: &str, f: F) -> Self
    where
        R: IntoValue + TypeOf,
        F: Fn() -> R + Send + Sync + 'static,
    {
        self.method(MethodDef::static0(name, f))
    }

    /// Declare a one-argument static operation
    pub fn static1<A, R, F>(self, name: &str, f: F) -> Self
    where
        A: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        self.method(MethodDef::static1(name, f))
    }

    /// Declare a two-argument static operation
    pub fn static2<A, B, R, F>(self, name: &str, f: F) -> Self
    where
        A: FromValue + TypeOf,
        B: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(A, B) -> R + Send + Sync + 'static,
    {
        self.method(MethodDef::static2(name, f))
    }

    /// Declare an operation without a body
    pub fn abstract_method(self, name: &str, params: &[ClassRef], return_type: &ClassRef) -> Self {
        self.method(MethodDef::abstract_method(name, params.to_vec(), return_type.clone()))
    }

    /// Declare a no-argument constructor
    pub fn constructor0<F>(self, f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.constructor(ConstructorDef::new0(f))
    }

    /// Declare a one-argument constructor
    pub fn constructor1<A, F>(self, f: F) -> Self
    where
        A: FromValue + TypeOf,
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        self.constructor(ConstructorDef::new1(f))
    }

    /// Declare a two-argument constructor
    pub fn constructor2<A, B, F>(self, f: F) -> Self
    where
        A: FromValue + TypeOf,
        B: FromValue + TypeOf,
        F: Fn(A, B) -> T + Send + Sync + 'static,
    {
        self.constructor(ConstructorDef::new2(f))
    }

    /// Declare a one-argument constructor that may fail
    pub fn try_constructor1<A, F>(self, f: F) -> Self
    where
        A: FromValue + TypeOf,
        F: Fn(A) -> Result<T, String> + Send + Sync + 'static,
    {
        self.constructor(ConstructorDef::try_new1(f))
    }

    /// Finish the class
    pub fn build(self) -> ClassRef {
        Arc::new(ClassDef {
            id: ClassId::new(),
            name: self.name,
            kind: self.kind,
            is_abstract: self.is_abstract,
            superclass: self.superclass,
            interfaces: self.interfaces,
            methods: self.methods,
            constructors: self.constructors,
            type_params: self.type_params,
            boundary: self.boundary.unwrap_or_else(Boundary::system),
            projection: self.projection,
        })
    }
}
