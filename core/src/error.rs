use thiserror::Error;

/// Construction and lookup errors for slices.
///
/// Construction errors are raised synchronously by
/// [`SliceComposer::compose`](crate::SliceComposer::compose) and abort the
/// factory call: a misconfigured slice is never partially wired.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SliceError {
    /// Slice name, initial fields, or transition map absent at construction
    #[error("missing slice configuration: {0}")]
    MissingSliceConfiguration(&'static str),

    /// Name already present in the registry
    #[error("slice {0} already exists, choose a different name")]
    DuplicateSliceName(String),

    /// Two dispatchable names of one slice collide
    #[error(
        "dispatch {0} already exists, transitions, async operations and resetState must all have unique names"
    )]
    DuplicateDispatchName(String),

    /// A slice, transition or operation name cannot appear in an action type
    #[error("invalid name {0:?}: names must be non-empty and must not contain '/'")]
    InvalidName(String),

    /// Initial fields do not serialize to a map, or use the reserved
    /// `operations` key
    #[error("slice {slice} has invalid initial fields: {message}")]
    InvalidFields {
        /// Slice being composed
        slice: String,
        /// What is wrong with the fields
        message: String,
    },

    /// No dispatcher is registered under this name
    #[error("slice {slice} has no dispatch named {name}")]
    UnknownDispatch {
        /// Slice the lookup was made against
        slice: String,
        /// Requested dispatch name
        name: String,
    },

    /// The slice is not part of the given process state
    #[error("slice {0} is not mounted in this state")]
    SliceNotMounted(String),

    /// Slice state could not be projected into props
    #[error("failed to project slice {slice}: {message}")]
    Projection {
        /// Slice being projected
        slice: String,
        /// Serializer message
        message: String,
    },
}

/// Failure of an async operation's trigger.
///
/// Never propagated to dispatchers: the reducer records it as a `Failed`
/// status and the message is only logged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("operation failed: {message}")]
pub struct OperationError {
    message: String,
}

impl OperationError {
    /// Create an operation error
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for OperationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for OperationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
