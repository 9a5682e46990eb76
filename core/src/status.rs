//! Lifecycle status of an asynchronous operation.
//!
//! ```text
//!            start              success
//!   Idle ───────────► Loading ───────────► Idle
//!    ▲                   │
//!    │ start             │ fail
//!    └──── Failed ◄──────┘
//! ```
//!
//! Every start moves to `Loading` regardless of the current value, so
//! overlapping invocations of one operation share a single entry and the
//! last signal to land wins.

use serde::{Deserialize, Serialize};

/// Status of one async operation within a slice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "StatusFlags", try_from = "StatusFlags")]
pub enum OperationStatus {
    /// Not running; the last run (if any) succeeded
    #[default]
    Idle,
    /// Started and not yet settled
    Loading,
    /// The last run failed
    Failed,
}

impl OperationStatus {
    /// Status after a start signal
    #[must_use]
    pub const fn start(self) -> Self {
        Self::Loading
    }

    /// Status after a success signal
    #[must_use]
    pub const fn succeed(self) -> Self {
        Self::Idle
    }

    /// Status after a failure signal
    #[must_use]
    pub const fn fail(self) -> Self {
        Self::Failed
    }

    /// Whether the operation is idle
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether the operation is running
    #[must_use]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Whether the last run failed
    #[must_use]
    pub const fn has_error(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Boolean view of this status
    #[must_use]
    pub const fn flags(self) -> StatusFlags {
        StatusFlags {
            is_loading: self.is_loading(),
            is_idle: self.is_idle(),
            has_error: self.has_error(),
        }
    }
}

/// Boolean compatibility view of an [`OperationStatus`].
///
/// Exactly one flag is set for any status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusFlags {
    /// Started and not yet settled
    pub is_loading: bool,
    /// Not running
    pub is_idle: bool,
    /// The last run failed
    pub has_error: bool,
}

impl From<OperationStatus> for StatusFlags {
    fn from(status: OperationStatus) -> Self {
        status.flags()
    }
}

/// Error returned for a flag combination that is not exactly one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("status flags must have exactly one flag set: {0:?}")]
pub struct InvalidStatusFlags(pub StatusFlags);

impl TryFrom<StatusFlags> for OperationStatus {
    type Error = InvalidStatusFlags;

    fn try_from(flags: StatusFlags) -> Result<Self, Self::Error> {
        match (flags.is_loading, flags.is_idle, flags.has_error) {
            (false, true, false) => Ok(Self::Idle),
            (true, false, false) => Ok(Self::Loading),
            (false, false, true) => Ok(Self::Failed),
            _ => Err(InvalidStatusFlags(flags)),
        }
    }
}
