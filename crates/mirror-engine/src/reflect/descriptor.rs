//! Operation descriptors

use mirror_types::{ClassId, ClassRef, GenericType, MethodDef, Value, Visibility};

/// One accessible operation of a dispatched type
#[derive(Debug, Clone)]
pub struct OperationDescriptor {
    /// Position in the catalog
    pub index: usize,
    /// Operation name
    pub name: String,
    /// Class that declares the operation
    pub declaring_class: ClassRef,
    /// Erased parameter classes
    pub parameter_types: Vec<ClassRef>,
    /// Parameter types including generic arguments
    pub generic_parameter_types: Vec<GenericType>,
    /// Erased return class
    pub return_type: ClassRef,
    /// Return type including generic arguments
    pub generic_return_type: GenericType,
    /// Declared visibility
    pub visibility: Visibility,
    /// Whether the operation is static
    pub is_static: bool,
    /// Whether the declaring class gives no body
    pub is_abstract: bool,
    /// `declaring.name(param,param)`
    pub signature: String,
    /// Position in the declaring class's operation list
    pub(crate) slot: usize,
}

impl OperationDescriptor {
    pub(crate) fn new(index: usize, declaring: &ClassRef, slot: usize, method: &MethodDef) -> Self {
        Self {
            index,
            name: method.name.clone(),
            declaring_class: declaring.clone(),
            parameter_types: method.params.clone(),
            generic_parameter_types: method.generic_params.clone(),
            return_type: method.return_type.clone(),
            generic_return_type: method.generic_return.clone(),
            visibility: method.visibility,
            is_static: method.is_static,
            is_abstract: method.is_abstract(),
            signature: signature_of(declaring, method),
            slot,
        }
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    /// Whether the operation is public
    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Parameter class IDs, in order
    pub fn parameter_ids(&self) -> Vec<ClassId> {
        self.parameter_types.iter().map(|p| p.id()).collect()
    }

    /// Whether every argument is assignable to the corresponding parameter
    pub fn accepts(&self, args: &[Value]) -> bool {
        self.parameter_types.len() == args.len()
            && self
                .parameter_types
                .iter()
                .zip(args)
                .all(|(param, arg)| param.is_assignable_value(arg))
    }

    /// The declaring class's definition of this operation
    pub fn definition(&self) -> Option<&MethodDef> {
        self.declaring_class.declared_methods().get(self.slot)
    }
}

/// Exact signature string of an operation
pub(crate) fn signature_of(declaring: &ClassRef, method: &MethodDef) -> String {
    let params: Vec<&str> = method.params.iter().map(|p| p.name()).collect();
    format!("{}.{}({})", declaring.name(), method.name, params.join(","))
}
