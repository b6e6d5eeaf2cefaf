//! Accessor engine errors

use std::sync::Arc;

use mirror_types::OperationFault;

/// Errors raised while building or using accessors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReflectError {
    /// Type cannot have an accessor (root class, primitive or void)
    #[error("Invalid accessor target {type_name}: {reason}")]
    InvalidTargetKind {
        /// Rejected type
        type_name: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Operation index or signature not present in the catalog
    #[error("Unknown operation {operation} on {type_name}")]
    UnknownOperationIndex {
        /// Dispatched type
        type_name: String,
        /// Index or signature that was requested
        operation: String,
    },

    /// No public constructor accepts the arguments
    #[error("No constructor of {type_name} accepts ({args})")]
    NoMatchingConstructor {
        /// Type being instantiated
        type_name: String,
        /// Rendered argument list
        args: String,
    },

    /// Receiver or argument of the wrong runtime type
    #[error("Argument mismatch calling {signature}: {detail}")]
    ArgumentTypeMismatch {
        /// Operation signature
        signature: String,
        /// What did not match
        detail: String,
    },

    /// Wrong number of arguments
    #[error("{signature} expects {expected} arguments, got {actual}")]
    ArityMismatch {
        /// Operation signature
        signature: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// Instance operation invoked without a receiver
    #[error("{signature} requires a receiver")]
    NullReceiver {
        /// Operation signature
        signature: String,
    },

    /// Non-public operation invoked through a public-only dispatcher
    #[error("{signature} is not accessible from boundary {boundary}")]
    InaccessibleOperation {
        /// Operation signature
        signature: String,
        /// Boundary the dispatcher was realized in
        boundary: String,
    },

    /// Operation body failed
    #[error("Invocation of {signature} failed: {source}")]
    InvocationFailed {
        /// Operation signature
        signature: String,
        /// Fault raised by the body
        source: OperationFault,
    },

    /// A matching constructor exists but instantiation failed
    #[error("Cannot instantiate {type_name}: {reason}")]
    InstantiationFailed {
        /// Type being instantiated
        type_name: String,
        /// Failure description
        reason: String,
    },

    /// Type description is inconsistent
    #[error("Malformed type {type_name}: {reason}")]
    MalformedType {
        /// Offending type
        type_name: String,
        /// What is inconsistent
        reason: String,
    },

    /// Required field holds null, a blank string or an empty list
    #[error("Field {field} of {type_name} must not be empty")]
    EmptyField {
        /// Checked type
        type_name: String,
        /// Field that failed the check
        field: String,
    },

    /// Field list given to a validation helper is unusable
    #[error("Invalid field list for {type_name}: {reason}")]
    InvalidFieldList {
        /// Checked type
        type_name: String,
        /// What is wrong with the list
        reason: String,
    },

    /// Dispatcher synthesis failed
    #[error("Failed to build accessor for {type_name}: {source}")]
    AccessorBuildFailed {
        /// Type whose accessor was being built
        type_name: String,
        /// Underlying cause
        source: Arc<ReflectError>,
    },

    /// The synthesizing thread panicked before publishing a result
    #[error("Accessor synthesis for {type_name} was aborted")]
    SynthesisAborted {
        /// Type whose accessor was being built
        type_name: String,
    },
}

impl ReflectError {
    /// Innermost cause, looking through build-failure wrappers
    pub fn root_cause(&self) -> &ReflectError {
        let mut current = self;
        while let ReflectError::AccessorBuildFailed { source, .. } = current {
            current = &**source;
        }
        current
    }

    /// Whether this error is a build failure (of any cause)
    pub fn is_build_failure(&self) -> bool {
        matches!(
            self,
            ReflectError::AccessorBuildFailed { .. } | ReflectError::SynthesisAborted { .. }
        )
    }
}

/// Accessor engine result
pub type ReflectResult<T> = Result<T, ReflectError>;
