//! Type model errors

use thiserror::Error;

/// Faults raised by operation and constructor bodies
///
/// These are the low-level failures of a single call. The engine wraps them
/// with the signature of the operation that produced them.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OperationFault {
    /// Instance operation called without a receiver
    #[error("Instance operation called without a receiver")]
    MissingReceiver,

    /// Receiver state is not the Rust type the body expects
    #[error("Receiver of class {class} does not carry {expected} state")]
    StateMismatch {
        /// Class of the receiver
        class: String,
        /// Rust type name the body expected
        expected: &'static str,
    },

    /// Argument value could not be converted to the body's Rust type
    #[error("Cannot convert {found} to {expected}")]
    Conversion {
        /// Rust type name the body expected
        expected: &'static str,
        /// Type name of the value that was supplied
        found: String,
    },

    /// Fewer arguments than the body reads
    #[error("Missing argument at position {position}")]
    MissingArgument {
        /// Zero-based argument position
        position: usize,
    },

    /// Mutating operation received its own receiver as an argument
    #[error("Argument at position {position} is the receiver of a mutating operation")]
    AliasedReceiver {
        /// Zero-based argument position
        position: usize,
    },

    /// Error raised by the operation itself
    #[error("{0}")]
    Raised(String),
}

impl OperationFault {
    /// Create a fault carrying a free-form message
    pub fn raised(message: impl Into<String>) -> Self {
        OperationFault::Raised(message.into())
    }
}

/// Errors in generic type construction
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    /// Invalid type argument count
    #[error("Invalid type argument count for {raw}: expected {expected}, got {actual}")]
    InvalidTypeArgCount {
        /// Raw class name
        raw: String,
        /// Expected count
        expected: usize,
        /// Actual count
        actual: usize,
    },
}
