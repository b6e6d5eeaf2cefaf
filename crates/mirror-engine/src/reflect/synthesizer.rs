//! Dispatcher synthesis
//!
//! Compiles a catalog into a [`DispatchTable`]: one thunk per operation,
//! with argument casts, receiver checks and the implementation for the exact
//! target class resolved once, up front. Steady-state calls then run the
//! thunk directly instead of searching the hierarchy.
//!
//! Tables never hold a [`ClassRef`], so storing one inside a class's own
//! boundary cannot form a reference cycle.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mirror_types::{
    ClassDef, ClassId, ClassRef, MethodBody, Object, OperationFault, PrimitiveType, Value,
};

use super::catalog::discover;
use super::descriptor::OperationDescriptor;
use super::dispatcher::{DispatcherIndices, TypeDispatcher};
use super::domain::DomainRegistry;
use super::naming;
use crate::error::{ReflectError, ReflectResult};

/// Compiled entry point for one operation
pub(crate) type Thunk =
    Arc<dyn Fn(Option<&Object>, &[Value]) -> ReflectResult<Value> + Send + Sync>;

fn thunk<F>(f: F) -> Thunk
where
    F: Fn(Option<&Object>, &[Value]) -> ReflectResult<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Which operations a realized table may call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Every catalogued (non-private) operation
    NonPrivate,
    /// Public operations only
    PublicOnly,
}

/// Executable dispatch table for one type
pub struct DispatchTable {
    name: String,
    type_name: String,
    access: Access,
    thunks: Vec<Thunk>,
}

impl DispatchTable {
    /// Name the table was realized under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Access level the table was compiled with
    pub fn access(&self) -> Access {
        self.access
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.thunks.len()
    }

    /// Whether the table has no operations
    pub fn is_empty(&self) -> bool {
        self.thunks.is_empty()
    }

    /// Invoke the operation at `index`
    pub fn invoke(
        &self,
        index: usize,
        receiver: Option<&Object>,
        args: &[Value],
    ) -> ReflectResult<Value> {
        match self.thunks.get(index) {
            Some(thunk) => thunk(receiver, args),
            None => Err(ReflectError::UnknownOperationIndex {
                type_name: self.type_name.clone(),
                operation: index.to_string(),
            }),
        }
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("name", &self.name)
            .field("access", &self.access)
            .field("operations", &self.thunks.len())
            .finish()
    }
}

/// Pre-resolved conversion check for one parameter
#[derive(Debug, Clone)]
enum ArgCast {
    Primitive(PrimitiveType),
    Reference { id: ClassId, name: String },
    Any,
}

impl ArgCast {
    fn for_param(param: &ClassDef) -> Self {
        if let Some(primitive) = param.primitive_type() {
            ArgCast::Primitive(primitive)
        } else if param.superclass().is_none() && !param.is_interface() {
            ArgCast::Any
        } else {
            ArgCast::Reference {
                id: param.id(),
                name: param.name().to_string(),
            }
        }
    }

    fn admits(&self, value: &Value) -> bool {
        match self {
            ArgCast::Any => true,
            ArgCast::Primitive(primitive) => value.primitive_type() == Some(*primitive),
            ArgCast::Reference { id, .. } => match value.runtime_class_ref() {
                None => true,
                Some(class) => class.is_subtype_of(*id),
            },
        }
    }

    fn expected(&self) -> &str {
        match self {
            ArgCast::Any => "core.Object",
            ArgCast::Primitive(primitive) => primitive.name(),
            ArgCast::Reference { name, .. } => name,
        }
    }
}

/// Everything a thunk needs to call one operation
struct CompiledOperation {
    signature: String,
    name: String,
    target: ClassId,
    target_name: String,
    param_ids: Vec<ClassId>,
    casts: Vec<ArgCast>,
    returns_void: bool,
    /// Implementation for receivers of exactly the target class
    direct: Option<MethodBody>,
}

impl CompiledOperation {
    fn check_args(&self, args: &[Value]) -> ReflectResult<()> {
        if args.len() != self.casts.len() {
            return Err(ReflectError::ArityMismatch {
                signature: self.signature.clone(),
                expected: self.casts.len(),
                actual: args.len(),
            });
        }
        for (position, (cast, arg)) in self.casts.iter().zip(args).enumerate() {
            if !cast.admits(arg) {
                return Err(ReflectError::ArgumentTypeMismatch {
                    signature: self.signature.clone(),
                    detail: format!(
                        "argument {} is {}, expected {}",
                        position,
                        arg.type_name(),
                        cast.expected()
                    ),
                });
            }
        }
        Ok(())
    }

    fn receiver<'a>(&self, receiver: Option<&'a Object>) -> ReflectResult<&'a Object> {
        receiver.ok_or_else(|| ReflectError::NullReceiver {
            signature: self.signature.clone(),
        })
    }

    /// Pick the implementation for `obj`'s runtime class
    fn implementation(&self, obj: &Object) -> ReflectResult<MethodBody> {
        let class = obj.class();
        if class.id() == self.target {
            if let Some(body) = &self.direct {
                return Ok(body.clone());
            }
        } else if !class.is_subtype_of(self.target) {
            return Err(ReflectError::ArgumentTypeMismatch {
                signature: self.signature.clone(),
                detail: format!(
                    "receiver is {}, expected {}",
                    class.name(),
                    self.target_name
                ),
            });
        }
        class
            .resolve_virtual(&self.name, &self.param_ids)
            .and_then(|method| method.body.clone())
            .ok_or_else(|| ReflectError::InvocationFailed {
                signature: self.signature.clone(),
                source: OperationFault::raised(format!(
                    "{} has no implementation of {}",
                    class.name(),
                    self.name
                )),
            })
    }

    fn finish(&self, result: Result<Value, OperationFault>) -> ReflectResult<Value> {
        match result {
            Ok(_) if self.returns_void => Ok(Value::Null),
            Ok(value) => Ok(value),
            Err(fault @ OperationFault::Conversion { .. }) => {
                Err(ReflectError::ArgumentTypeMismatch {
                    signature: self.signature.clone(),
                    detail: fault.to_string(),
                })
            }
            Err(fault) => Err(ReflectError::InvocationFailed {
                signature: self.signature.clone(),
                source: fault,
            }),
        }
    }
}

fn compile_operation(
    target: &ClassRef,
    descriptor: &OperationDescriptor,
    access: Access,
    boundary: &str,
) -> ReflectResult<Thunk> {
    let signature = descriptor.signature.clone();

    if access == Access::PublicOnly && !descriptor.is_public() {
        let boundary = boundary.to_string();
        return Ok(thunk(move |_, _| {
            Err(ReflectError::InaccessibleOperation {
                signature: signature.clone(),
                boundary: boundary.clone(),
            })
        }));
    }

    let definition = descriptor
        .definition()
        .ok_or_else(|| ReflectError::MalformedType {
            type_name: target.name().to_string(),
            reason: format!("{} is not declared by its class", signature),
        })?;

    let param_ids = descriptor.parameter_ids();
    let direct = if descriptor.is_static {
        definition.body.clone()
    } else if target.is_interface() {
        None
    } else {
        target
            .resolve_virtual(&descriptor.name, &param_ids)
            .and_then(|method| method.body.clone())
    };

    let op = Arc::new(CompiledOperation {
        signature,
        name: descriptor.name.clone(),
        target: target.id(),
        target_name: target.name().to_string(),
        param_ids,
        casts: descriptor
            .parameter_types
            .iter()
            .map(|param| ArgCast::for_param(param))
            .collect(),
        returns_void: descriptor.return_type.is_void(),
        direct,
    });

    if descriptor.is_static {
        let body = op
            .direct
            .clone()
            .ok_or_else(|| ReflectError::MalformedType {
                type_name: target.name().to_string(),
                reason: format!("static operation {} has no body", op.signature),
            })?;
        return Ok(thunk(move |_, args| {
            op.check_args(args)?;
            op.finish(body(None, args))
        }));
    }

    if op.casts.is_empty() {
        return Ok(thunk(move |receiver, args| {
            let obj = op.receiver(receiver)?;
            if !args.is_empty() {
                return Err(ReflectError::ArityMismatch {
                    signature: op.signature.clone(),
                    expected: 0,
                    actual: args.len(),
                });
            }
            let body = op.implementation(obj)?;
            op.finish(body(Some(obj), args))
        }));
    }

    Ok(thunk(move |receiver, args| {
        let obj = op.receiver(receiver)?;
        op.check_args(args)?;
        let body = op.implementation(obj)?;
        op.finish(body(Some(obj), args))
    }))
}

/// Compile every operation of `catalog` into a table
pub(crate) fn build_table(
    class: &ClassRef,
    catalog: &[OperationDescriptor],
    name: &str,
    access: Access,
    boundary: &str,
) -> ReflectResult<DispatchTable> {
    let thunks = catalog
        .iter()
        .map(|descriptor| compile_operation(class, descriptor, access, boundary))
        .collect::<ReflectResult<Vec<_>>>()?;
    Ok(DispatchTable {
        name: name.to_string(),
        type_name: class.name().to_string(),
        access,
        thunks,
    })
}

/// Build the lookup indices in one pass over the catalog
pub(crate) fn index_catalog(catalog: &[OperationDescriptor]) -> DispatcherIndices {
    let mut indices = DispatcherIndices::default();
    for descriptor in catalog {
        let name = descriptor.name.as_str();
        let index = descriptor.index;

        if name.len() > 3 {
            if name.starts_with(naming::GETTER_PREFIX) && descriptor.arity() == 0 {
                indices
                    .field_names
                    .push(naming::uncapitalize(&name[naming::GETTER_PREFIX.len()..]));
                indices.accessors.entry(name.to_string()).or_insert(index);
            } else if name.starts_with(naming::SETTER_PREFIX) && descriptor.arity() == 1 {
                indices.accessors.entry(name.to_string()).or_insert(index);
            }
        }

        indices
            .typed
            .entry((name.to_string(), descriptor.parameter_ids()))
            .or_insert(index);
        indices
            .signatures
            .insert(descriptor.signature.clone(), index);
    }
    indices
}

/// Check a catalog before anything is realized for it
fn validate(class: &ClassRef, catalog: &[OperationDescriptor]) -> ReflectResult<()> {
    let concrete = !class.is_interface() && !class.is_abstract();
    for descriptor in catalog {
        if descriptor.generic_parameter_types.len() != descriptor.parameter_types.len() {
            return Err(ReflectError::MalformedType {
                type_name: class.name().to_string(),
                reason: format!(
                    "{} declares {} parameters but {} generic parameter types",
                    descriptor.signature,
                    descriptor.parameter_types.len(),
                    descriptor.generic_parameter_types.len()
                ),
            });
        }
        if concrete
            && !descriptor.is_static
            && class
                .resolve_virtual(&descriptor.name, &descriptor.parameter_ids())
                .is_none()
        {
            return Err(ReflectError::MalformedType {
                type_name: class.name().to_string(),
                reason: format!(
                    "concrete class leaves {} unimplemented",
                    descriptor.signature
                ),
            });
        }
    }
    Ok(())
}

/// Name a class's dispatch table is realized under
pub fn dispatcher_name(class: &ClassDef) -> String {
    format!("{}$Dispatcher#{}", class.name(), class.id().as_u64())
}

/// Compiles catalogs into dispatchers
pub struct Synthesizer {
    domains: Arc<DomainRegistry>,
    compilations: AtomicU64,
}

impl Synthesizer {
    /// Create a synthesizer realizing tables through `domains`
    pub fn new(domains: Arc<DomainRegistry>) -> Self {
        Self {
            domains,
            compilations: AtomicU64::new(0),
        }
    }

    /// The domain registry tables are realized through
    pub fn domains(&self) -> &Arc<DomainRegistry> {
        &self.domains
    }

    /// Number of compilations started so far
    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    /// Discover and compile `class`
    pub fn compile(&self, class: &ClassRef) -> ReflectResult<TypeDispatcher> {
        let catalog = discover(class)?;
        self.compile_catalog(class, catalog)
    }

    /// Compile an already discovered catalog of `class`
    pub fn compile_catalog(
        &self,
        class: &ClassRef,
        catalog: Vec<OperationDescriptor>,
    ) -> ReflectResult<TypeDispatcher> {
        let _span = tracing::debug_span!(
            "synthesize",
            class = class.name(),
            operations = catalog.len()
        )
        .entered();
        self.compilations.fetch_add(1, Ordering::Relaxed);

        validate(class, &catalog)?;
        let indices = index_catalog(&catalog);

        let domain = self.domains.domain_for(class.boundary());
        let name = dispatcher_name(class);
        let boundary = class.boundary().name().to_string();
        let table = domain.realize(&name, |access| {
            build_table(class, &catalog, &name, access, &boundary)
        })?;

        tracing::debug!(
            class = class.name(),
            table = table.name(),
            access = ?table.access(),
            "dispatcher ready"
        );
        Ok(TypeDispatcher::new(
            class.clone(),
            catalog,
            indices,
            table,
            domain,
        ))
    }
}

impl fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synthesizer")
            .field("compilations", &self.compilations())
            .finish()
    }
}
