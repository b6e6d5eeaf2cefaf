//! Operation and constructor descriptors

use std::any::Any;
use std::sync::Arc;

use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard};

use crate::class::{ClassId, ClassRef};
use crate::convert::{FromValue, IntoValue, TypeOf};
use crate::error::OperationFault;
use crate::generic::GenericType;
use crate::object::Object;
use crate::value::Value;

/// Executable body of an operation
///
/// Receives the receiver (None for static operations) and the arguments,
/// already checked against the declared parameter classes.
pub type MethodBody =
    Arc<dyn Fn(Option<&Object>, &[Value]) -> Result<Value, OperationFault> + Send + Sync>;

/// Executable body of a constructor, producing fresh instance state
pub type ConstructorBody =
    Arc<dyn Fn(&[Value]) -> Result<Box<dyn Any + Send + Sync>, OperationFault> + Send + Sync>;

/// Wrap a closure as a [`MethodBody`]
pub fn method_body<F>(f: F) -> MethodBody
where
    F: Fn(Option<&Object>, &[Value]) -> Result<Value, OperationFault> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wrap a closure as a [`ConstructorBody`]
pub fn constructor_body<F>(f: F) -> ConstructorBody
where
    F: Fn(&[Value]) -> Result<Box<dyn Any + Send + Sync>, OperationFault> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Convert the argument at `position`
pub fn arg<A: FromValue>(args: &[Value], position: usize) -> Result<A, OperationFault> {
    let value = args
        .get(position)
        .ok_or(OperationFault::MissingArgument { position })?;
    A::from_value(value)
}

fn receiver(recv: Option<&Object>) -> Result<&Object, OperationFault> {
    recv.ok_or(OperationFault::MissingReceiver)
}

/// The receiver's write lock is not reentrant
fn check_not_aliased(obj: &Object, args: &[Value]) -> Result<(), OperationFault> {
    let aliased = args
        .iter()
        .position(|value| value.as_object().map_or(false, |arg| arg.ptr_eq(obj)));
    match aliased {
        Some(position) => Err(OperationFault::AliasedReceiver { position }),
        None => Ok(()),
    }
}

fn read_state<T: Any>(obj: &Object) -> Result<MappedRwLockReadGuard<'_, T>, OperationFault> {
    obj.read::<T>().ok_or_else(|| OperationFault::StateMismatch {
        class: obj.class().name().to_string(),
        expected: std::any::type_name::<T>(),
    })
}

fn write_state<T: Any>(obj: &Object) -> Result<MappedRwLockWriteGuard<'_, T>, OperationFault> {
    obj.write::<T>().ok_or_else(|| OperationFault::StateMismatch {
        class: obj.class().name().to_string(),
        expected: std::any::type_name::<T>(),
    })
}

/// Operation visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Accessible from anywhere
    Public,
    /// Accessible from subclasses and the owning boundary
    Protected,
    /// Accessible from the owning boundary
    Package,
    /// Accessible only from the declaring class
    Private,
}

impl Visibility {
    /// Source-level modifier keyword (empty for package visibility)
    pub fn keyword(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Package => "",
            Visibility::Private => "private",
        }
    }
}

/// Operation declared by a class
#[derive(Clone)]
pub struct MethodDef {
    /// Operation name
    pub name: String,
    /// Erased parameter classes
    pub params: Vec<ClassRef>,
    /// Parameter types including generic arguments
    pub generic_params: Vec<GenericType>,
    /// Erased return class
    pub return_type: ClassRef,
    /// Return type including generic arguments
    pub generic_return: GenericType,
    /// Visibility
    pub visibility: Visibility,
    /// Whether the operation is static
    pub is_static: bool,
    /// Body (None for abstract operations)
    pub body: Option<MethodBody>,
}

impl MethodDef {
    /// Create a public instance operation from a raw body
    pub fn new(name: &str, params: Vec<ClassRef>, return_type: ClassRef, body: MethodBody) -> Self {
        Self {
            body: Some(body),
            ..Self::abstract_method(name, params, return_type)
        }
    }

    /// Create a public operation without a body
    pub fn abstract_method(name: &str, params: Vec<ClassRef>, return_type: ClassRef) -> Self {
        Self {
            name: name.to_string(),
            generic_params: params.iter().map(GenericType::class).collect(),
            params,
            generic_return: GenericType::class(&return_type),
            return_type,
            visibility: Visibility::Public,
            is_static: false,
            body: None,
        }
    }

    /// Set the visibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Mark the operation static
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Replace the generic parameter types
    pub fn with_generic_params(mut self, params: Vec<GenericType>) -> Self {
        self.generic_params = params;
        self
    }

    /// Replace the generic return type
    pub fn with_generic_return(mut self, return_type: GenericType) -> Self {
        self.generic_return = return_type;
        self
    }

    /// Whether the operation is private
    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }

    /// Whether the operation has no body
    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    /// Parameter class IDs, in order
    pub fn param_ids(&self) -> Vec<ClassId> {
        self.params.iter().map(|p| p.id()).collect()
    }

    /// Whether this operation has the given name and exact parameter classes
    pub fn matches(&self, name: &str, params: &[ClassId]) -> bool {
        self.name == name
            && self.params.len() == params.len()
            && self.params.iter().zip(params).all(|(p, id)| p.id() == *id)
    }

    /// Zero-argument instance operation reading the receiver state
    pub fn method0<T, R, F>(name: &str, f: F) -> Self
    where
        T: Any,
        R: IntoValue + TypeOf,
        F: Fn(&T) -> R + Send + Sync + 'static,
    {
        let body = method_body(move |recv, _args| {
            let obj = receiver(recv)?;
            let state = read_state::<T>(obj)?;
            Ok(f(&*state).into_value())
        });
        Self::typed(name, Vec::new(), Vec::new(), R::class(), R::generic(), body)
    }

    /// One-argument instance operation reading the receiver state
    pub fn method1<T, A, R, F>(name: &str, f: F) -> Self
    where
        T: Any,
        A: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(&T, A) -> R + Send + Sync + 'static,
    {
        let body = method_body(move |recv, args| {
            let obj = receiver(recv)?;
            let a = arg::<A>(args, 0)?;
            let state = read_state::<T>(obj)?;
            Ok(f(&*state, a).into_value())
        });
        Self::typed(
            name,
            vec![A::class()],
            vec![A::generic()],
            R::class(),
            R::generic(),
            body,
        )
    }

    /// Two-argument instance operation reading the receiver state
    pub fn method2<T, A, B, R, F>(name: &str, f: F) -> Self
    where
        T: Any,
        A: FromValue + TypeOf,
        B: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(&T, A, B) -> R + Send + Sync + 'static,
    {
        let body = method_body(move |recv, args| {
            let obj = receiver(recv)?;
            let a = arg::<A>(args, 0)?;
            let b = arg::<B>(args, 1)?;
            let state = read_state::<T>(obj)?;
            Ok(f(&*state, a, b).into_value())
        });
        Self::typed(
            name,
            vec![A::class(), B::class()],
            vec![A::generic(), B::generic()],
            R::class(),
            R::generic(),
            body,
        )
    }

    /// One-argument instance operation mutating the receiver state
    pub fn method1_mut<T, A, R, F>(name: &str, f: F) -> Self
    where
        T: Any,
        A: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(&mut T, A) -> R + Send + Sync + 'static,
    {
        let body = method_body(move |recv, args| {
            let obj = receiver(recv)?;
            check_not_aliased(obj, args)?;
            let a = arg::<A>(args, 0)?;
            let mut state = write_state::<T>(obj)?;
            Ok(f(&mut *state, a).into_value())
        });
        Self::typed(
            name,
            vec![A::class()],
            vec![A::generic()],
            R::class(),
            R::generic(),
            body,
        )
    }

    /// Two-argument instance operation mutating the receiver state
    pub fn method2_mut<T, A, B, R, F>(name: &str, f: F) -> Self
    where
        T: Any,
        A: FromValue + TypeOf,
        B: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(&mut T, A, B) -> R + Send + Sync + 'static,
    {
        let body = method_body(move |recv, args| {
            let obj = receiver(recv)?;
            check_not_aliased(obj, args)?;
            let a = arg::<A>(args, 0)?;
            let b = arg::<B>(args, 1)?;
            let mut state = write_state::<T>(obj)?;
            Ok(f(&mut *state, a, b).into_value())
        });
        Self::typed(
            name,
            vec![A::class(), B::class()],
            vec![A::generic(), B::generic()],
            R::class(),
            R::generic(),
            body,
        )
    }

    /// Zero-argument static operation
    pub fn static0<R, F>(name: &str, f: F) -> Self
    where
        R: IntoValue + TypeOf,
        F: Fn() -> R + Send + Sync + 'static,
    {
        let body = method_body(move |_recv, _args| Ok(f().into_value()));
        Self::typed(name, Vec::new(), Vec::new(), R::class(), R::generic(), body).into_static()
    }

    /// One-argument static operation
    pub fn static1<A, R, F>(name: &str, f: F) -> Self
    where
        A: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        let body = method_body(move |_recv, args| Ok(f(arg::<A>(args, 0)?).into_value()));
        Self::typed(
            name,
            vec![A::class()],
            vec![A::generic()],
            R::class(),
            R::generic(),
            body,
        )
        .into_static()
    }

    /// Two-argument static operation
    pub fn static2<A, B, R, F>(name: &str, f: F) -> Self
    where
        A: FromValue + TypeOf,
        B: FromValue + TypeOf,
        R: IntoValue + TypeOf,
        F: Fn(A, B) -> R + Send + Sync + 'static,
    {
        let body = method_body(move |_recv, args| {
            Ok(f(arg::<A>(args, 0)?, arg::<B>(args, 1)?).into_value())
        });
        Self::typed(
            name,
            vec![A::class(), B::class()],
            vec![A::generic(), B::generic()],
            R::class(),
            R::generic(),
            body,
        )
        .into_static()
    }

    fn typed(
        name: &str,
        params: Vec<ClassRef>,
        generic_params: Vec<GenericType>,
        return_type: ClassRef,
        generic_return: GenericType,
        body: MethodBody,
    ) -> Self {
        Self {
            name: name.to_string(),
            params,
            generic_params,
            return_type,
            generic_return,
            visibility: Visibility::Public,
            is_static: false,
            body: Some(body),
        }
    }
}

impl std::fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field(
                "params",
                &self.params.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("return_type", &self.return_type.name())
            .field("visibility", &self.visibility)
            .field("is_static", &self.is_static)
            .finish()
    }
}

/// Constructor declared by a class
#[derive(Clone)]
pub struct ConstructorDef {
    /// Parameter classes
    pub params: Vec<ClassRef>,
    /// Visibility
    pub visibility: Visibility,
    /// Body producing the instance state
    pub body: ConstructorBody,
}

impl ConstructorDef {
    /// Create a public constructor from a raw body
    pub fn new(params: Vec<ClassRef>, body: ConstructorBody) -> Self {
        Self {
            params,
            visibility: Visibility::Public,
            body,
        }
    }

    /// Set the visibility
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// No-argument constructor
    pub fn new0<T, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::new(
            Vec::new(),
            constructor_body(move |_args| Ok(Box::new(f()) as Box<dyn Any + Send + Sync>)),
        )
    }

    /// One-argument constructor
    pub fn new1<T, A, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        A: FromValue + TypeOf,
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        Self::new(
            vec![A::class()],
            constructor_body(move |args| {
                Ok(Box::new(f(arg::<A>(args, 0)?)) as Box<dyn Any + Send + Sync>)
            }),
        )
    }

    /// Two-argument constructor
    pub fn new2<T, A, B, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        A: FromValue + TypeOf,
        B: FromValue + TypeOf,
        F: Fn(A, B) -> T + Send + Sync + 'static,
    {
        Self::new(
            vec![A::class(), B::class()],
            constructor_body(move |args| {
                let state = f(arg::<A>(args, 0)?, arg::<B>(args, 1)?);
                Ok(Box::new(state) as Box<dyn Any + Send + Sync>)
            }),
        )
    }

    /// One-argument constructor that may reject its input
    pub fn try_new1<T, A, F>(f: F) -> Self
    where
        T: Any + Send + Sync,
        A: FromValue + TypeOf,
        F: Fn(A) -> Result<T, String> + Send + Sync + 'static,
    {
        Self::new(
            vec![A::class()],
            constructor_body(move |args| {
                let state = f(arg::<A>(args, 0)?).map_err(OperationFault::Raised)?;
                Ok(Box::new(state) as Box<dyn Any + Send + Sync>)
            }),
        )
    }
}

impl std::fmt::Debug for ConstructorDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorDef")
            .field(
                "params",
                &self.params.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("visibility", &self.visibility)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use crate::class::{ClassBuilder, PrimitiveType};

    struct Counter {
        count: i32,
    }

    #[test]
    fn test_typed_method_signature() {
        let def = MethodDef::method2("add", |c: &Counter, a: i32, b: i64| c.count as i64 + a as i64 + b);
        assert_eq!(def.params.len(), 2);
        assert_eq!(
            def.params[0].id(),
            builtin::primitive(PrimitiveType::Int).id()
        );
        assert_eq!(
            def.return_type.id(),
            builtin::primitive(PrimitiveType::Long).id()
        );
        assert!(!def.is_static);
        assert_eq!(def.visibility, Visibility::Public);
    }

    #[test]
    fn test_mut_body_updates_state() {
        let class = ClassBuilder::<Counter>::new("demo.Counter").build();
        let obj = Object::new(class, Counter { count: 1 });
        let def = MethodDef::method1_mut("bump", |c: &mut Counter, by: i32| {
            c.count += by;
        });
        assert!(def.return_type.is_void());

        let body = def.body.unwrap();
        assert_eq!(body(Some(&obj), &[Value::Int(4)]).unwrap(), Value::Null);
        assert_eq!(obj.read::<Counter>().unwrap().count, 5);
    }

    #[test]
    fn test_mut_body_refuses_its_own_receiver() {
        let class = ClassBuilder::<Counter>::new("demo.Counter").build();
        let obj = Object::new(class.clone(), Counter { count: 2 });
        let other = Object::new(class, Counter { count: 3 });
        let def = MethodDef::method1_mut("absorb", |c: &mut Counter, from: Object| {
            c.count += from.read::<Counter>().map_or(0, |f| f.count);
        });
        let body = def.body.unwrap();

        assert_eq!(
            body(Some(&obj), &[Value::Object(obj.clone())]),
            Err(OperationFault::AliasedReceiver { position: 0 })
        );
        assert_eq!(obj.read::<Counter>().unwrap().count, 2);

        body(Some(&obj), &[Value::Object(other)]).unwrap();
        assert_eq!(obj.read::<Counter>().unwrap().count, 5);
    }

    #[test]
    fn test_body_faults() {
        let def = MethodDef::method1("peek", |c: &Counter, _flag: bool| c.count);
        let body = def.body.unwrap();
        assert_eq!(body(None, &[]), Err(OperationFault::MissingReceiver));

        let other = ClassBuilder::<String>::new("demo.Other").build();
        let obj = Object::new(other, String::new());
        assert!(matches!(
            body(Some(&obj), &[Value::Bool(true)]),
            Err(OperationFault::StateMismatch { .. })
        ));
        assert_eq!(
            body(Some(&obj), &[]),
            Err(OperationFault::MissingArgument { position: 0 })
        );
    }

    #[test]
    fn test_static_and_constructor() {
        let def = MethodDef::static1("twice", |x: i32| x * 2);
        assert!(def.is_static);
        let body = def.body.unwrap();
        assert_eq!(body(None, &[Value::Int(21)]).unwrap(), Value::Int(42));

        let ctor = ConstructorDef::try_new1(|n: i32| {
            if n < 0 {
                Err("negative".to_string())
            } else {
                Ok(Counter { count: n })
            }
        });
        assert_eq!(ctor.arity(), 1);
        assert!((ctor.body)(&[Value::Int(3)]).is_ok());
        assert_eq!(
            (ctor.body)(&[Value::Int(-1)]).err(),
            Some(OperationFault::raised("negative"))
        );
    }
}
