//! Per-type dispatchers

use std::fmt;
use std::sync::Arc;

use mirror_types::{ClassId, ClassRef, GenericType, Object, Value};
use rustc_hash::FxHashMap;

use super::descriptor::OperationDescriptor;
use super::domain::IsolationDomain;
use super::naming;
use super::synthesizer::{Access, DispatchTable};
use crate::error::{ReflectError, ReflectResult};

/// Lookup indices built alongside the catalog
#[derive(Debug, Default)]
pub(crate) struct DispatcherIndices {
    /// Exact signature string to index (later entries overwrite)
    pub(crate) signatures: FxHashMap<String, usize>,
    /// (name, parameter classes) to index (first entry wins)
    pub(crate) typed: FxHashMap<(String, Vec<ClassId>), usize>,
    /// Getter and setter name to index (first entry wins)
    pub(crate) accessors: FxHashMap<String, usize>,
    /// Field names derived from getters, in catalog order
    pub(crate) field_names: Vec<String>,
}

/// Invokes any catalogued operation of one type by index
///
/// Immutable after construction and safe to share between threads.
pub struct TypeDispatcher {
    class: ClassRef,
    descriptors: Vec<OperationDescriptor>,
    indices: DispatcherIndices,
    table: Arc<DispatchTable>,
    domain: Arc<IsolationDomain>,
}

impl TypeDispatcher {
    pub(crate) fn new(
        class: ClassRef,
        descriptors: Vec<OperationDescriptor>,
        indices: DispatcherIndices,
        table: Arc<DispatchTable>,
        domain: Arc<IsolationDomain>,
    ) -> Self {
        Self {
            class,
            descriptors,
            indices,
            table,
            domain,
        }
    }

    /// Dispatched class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Catalogued operations, in catalog order
    pub fn descriptors(&self) -> &[OperationDescriptor] {
        &self.descriptors
    }

    /// Descriptor at `index`
    pub fn descriptor(&self, index: usize) -> Option<&OperationDescriptor> {
        self.descriptors.get(index)
    }

    /// Number of operations
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the type has no operations
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Field names derived from getters, in catalog order (may repeat)
    pub fn field_names(&self) -> &[String] {
        &self.indices.field_names
    }

    /// Realized dispatch table
    pub fn table(&self) -> &Arc<DispatchTable> {
        &self.table
    }

    /// Access level of the realized table
    pub fn access(&self) -> Access {
        self.table.access()
    }

    /// Domain the table was realized through
    pub fn domain(&self) -> &Arc<IsolationDomain> {
        &self.domain
    }

    // ===== Index lookups =====

    /// First operation called `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.descriptors.iter().position(|d| d.name == name)
    }

    /// First operation called `name` taking `arity` parameters
    pub fn index_of_arity(&self, name: &str, arity: usize) -> Option<usize> {
        self.descriptors
            .iter()
            .position(|d| d.name == name && d.arity() == arity)
    }

    /// Operation called `name` with exactly these parameter classes
    pub fn index_of_types(&self, name: &str, params: &[ClassRef]) -> Option<usize> {
        let key = (name.to_string(), params.iter().map(|p| p.id()).collect());
        self.indices.typed.get(&key).copied()
    }

    /// Operation with this exact signature string
    pub fn index_of_signature(&self, signature: &str) -> Option<usize> {
        self.indices.signatures.get(signature).copied()
    }

    /// First operation called `name` whose parameters accept `args`
    pub fn index_for_args(&self, name: &str, args: &[Value]) -> Option<usize> {
        self.descriptors
            .iter()
            .position(|d| d.name == name && d.accepts(args))
    }

    /// Getter for `field`, with the irregular-capitalization fallback
    pub fn getter_index(&self, field: &str) -> Option<usize> {
        self.accessor_index(naming::GETTER_PREFIX, field)
    }

    /// Setter for `field`, with the irregular-capitalization fallback
    pub fn setter_index(&self, field: &str) -> Option<usize> {
        self.accessor_index(naming::SETTER_PREFIX, field)
    }

    fn accessor_index(&self, prefix: &str, field: &str) -> Option<usize> {
        let conventional = format!("{}{}", prefix, naming::capitalize(field));
        if let Some(&index) = self.indices.accessors.get(&conventional) {
            return Some(index);
        }
        if naming::is_alien_name(field) {
            return self
                .indices
                .accessors
                .get(&format!("{}{}", prefix, field))
                .copied();
        }
        None
    }

    // ===== Descriptor accessors =====

    fn checked(&self, index: usize) -> ReflectResult<&OperationDescriptor> {
        self.descriptors
            .get(index)
            .ok_or_else(|| ReflectError::UnknownOperationIndex {
                type_name: self.class.name().to_string(),
                operation: index.to_string(),
            })
    }

    /// Name of the operation at `index`
    pub fn method_name(&self, index: usize) -> ReflectResult<&str> {
        Ok(&self.checked(index)?.name)
    }

    /// Parameter classes of the operation at `index`
    pub fn parameter_types(&self, index: usize) -> ReflectResult<&[ClassRef]> {
        Ok(&self.checked(index)?.parameter_types)
    }

    /// Return class of the operation at `index`
    pub fn return_type(&self, index: usize) -> ReflectResult<&ClassRef> {
        Ok(&self.checked(index)?.return_type)
    }

    /// Generic parameter types of the operation at `index`
    pub fn generic_parameter_types(&self, index: usize) -> ReflectResult<&[GenericType]> {
        Ok(&self.checked(index)?.generic_parameter_types)
    }

    /// Generic return type of the operation at `index`
    pub fn generic_return_type(&self, index: usize) -> ReflectResult<&GenericType> {
        Ok(&self.checked(index)?.generic_return_type)
    }

    // ===== Invocation =====

    /// Invoke the operation at `index`
    ///
    /// `receiver` is ignored by static operations.
    pub fn invoke(
        &self,
        receiver: Option<&Object>,
        index: usize,
        args: &[Value],
    ) -> ReflectResult<Value> {
        self.table.invoke(index, receiver, args)
    }

    /// Read `field` through its getter; None when no getter resolves
    pub fn get_field_value(&self, obj: &Object, field: &str) -> ReflectResult<Option<Value>> {
        match self.getter_index(field) {
            Some(index) => self.invoke(Some(obj), index, &[]).map(Some),
            None => Ok(None),
        }
    }

    /// Write `field` through its setter; false when no setter resolves
    pub fn set_field_value(&self, obj: &Object, field: &str, value: Value) -> ReflectResult<bool> {
        match self.setter_index(field) {
            Some(index) => {
                self.invoke(Some(obj), index, &[value])?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl fmt::Debug for TypeDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDispatcher")
            .field("class", &self.class.name())
            .field("operations", &self.descriptors.len())
            .field("fields", &self.indices.field_names)
            .field("access", &self.table.access())
            .finish()
    }
}
