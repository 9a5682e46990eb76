//! Actions as they cross the store boundary.
//!
//! On the wire an action is `{"type": "<slice>/<name>[/<phase>]", "payload": ...}`.
//! In memory the type string is parsed into an [`ActionType`]: the owning
//! slice plus a tagged [`ActionKind`], so reducers match on variants rather
//! than on strings.
//!
//! | Wire type                          | Kind                          |
//! |------------------------------------|-------------------------------|
//! | `counter/increment`                | `Transition("increment")`     |
//! | `counter/resetState`               | `Reset`                       |
//! | `counter/incrementAsync/pending`   | `Pending("incrementAsync")`   |
//! | `counter/incrementAsync/fulfilled` | `Fulfilled("incrementAsync")` |
//! | `counter/incrementAsync/rejected`  | `Rejected("incrementAsync")`  |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Arbitrary action payload, operation input or result.
pub type Payload = serde_json::Value;

/// Wire name of the generated reset transition.
pub const RESET_STATE: &str = "resetState";

const PENDING: &str = "pending";
const FULFILLED: &str = "fulfilled";
const REJECTED: &str = "rejected";

/// What an action asks its slice to do.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// A caller-declared synchronous transition
    Transition(String),
    /// Restore the slice's originally computed initial state
    Reset,
    /// An async operation started (payload: the operation input)
    Pending(String),
    /// An async operation resolved (payload: the operation result)
    Fulfilled(String),
    /// An async operation failed (no payload)
    Rejected(String),
}

/// Fully qualified action identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ActionType {
    /// Name of the slice that owns the transition
    pub slice: String,
    /// The transition to apply
    pub kind: ActionKind,
}

impl ActionType {
    /// Create an action type for `slice`
    #[must_use]
    pub fn new(slice: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            slice: slice.into(),
            kind,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slice = &self.slice;
        match &self.kind {
            ActionKind::Transition(name) => write!(f, "{slice}/{name}"),
            ActionKind::Reset => write!(f, "{slice}/{RESET_STATE}"),
            ActionKind::Pending(op) => write!(f, "{slice}/{op}/{PENDING}"),
            ActionKind::Fulfilled(op) => write!(f, "{slice}/{op}/{FULFILLED}"),
            ActionKind::Rejected(op) => write!(f, "{slice}/{op}/{REJECTED}"),
        }
    }
}

/// Error returned when a wire type string is not a valid action type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed action type: {0:?}")]
pub struct ParseActionTypeError(pub String);

impl FromStr for ActionType {
    type Err = ParseActionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseActionTypeError(s.to_string());
        let parts: Vec<&str> = s.split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(malformed());
        }

        let kind = match parts.as_slice() {
            [_, name] if *name == RESET_STATE => ActionKind::Reset,
            [_, name] => ActionKind::Transition((*name).to_string()),
            [_, op, PENDING] => ActionKind::Pending((*op).to_string()),
            [_, op, FULFILLED] => ActionKind::Fulfilled((*op).to_string()),
            [_, op, REJECTED] => ActionKind::Rejected((*op).to_string()),
            _ => return Err(malformed()),
        };

        Ok(Self::new(parts[0], kind))
    }
}

impl Serialize for ActionType {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// An action submitted to a store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Which slice and transition this action addresses
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Optional payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Action {
    /// Create an action
    #[must_use]
    pub fn new(slice: impl Into<String>, kind: ActionKind, payload: Option<Payload>) -> Self {
        Self {
            action_type: ActionType::new(slice, kind),
            payload,
        }
    }

    /// A synchronous transition action
    #[must_use]
    pub fn transition(
        slice: impl Into<String>,
        name: impl Into<String>,
        payload: Option<Payload>,
    ) -> Self {
        Self::new(slice, ActionKind::Transition(name.into()), payload)
    }

    /// The reset action of a slice
    #[must_use]
    pub fn reset(slice: impl Into<String>) -> Self {
        Self::new(slice, ActionKind::Reset, None)
    }

    /// The start signal of an async operation, carrying its input
    #[must_use]
    pub fn pending(slice: impl Into<String>, op: impl Into<String>, input: Payload) -> Self {
        Self::new(slice, ActionKind::Pending(op.into()), Some(input))
    }

    /// The success signal of an async operation, carrying its result
    #[must_use]
    pub fn fulfilled(slice: impl Into<String>, op: impl Into<String>, result: Payload) -> Self {
        Self::new(slice, ActionKind::Fulfilled(op.into()), Some(result))
    }

    /// The failure signal of an async operation
    #[must_use]
    pub fn rejected(slice: impl Into<String>, op: impl Into<String>) -> Self {
        Self::new(slice, ActionKind::Rejected(op.into()), None)
    }

    /// Name of the slice this action addresses
    #[must_use]
    pub fn slice(&self) -> &str {
        &self.action_type.slice
    }

    /// The transition this action requests
    #[must_use]
    pub const fn kind(&self) -> &ActionKind {
        &self.action_type.kind
    }

    /// Whether this is the terminal (fulfilled or rejected) signal of `op`
    #[must_use]
    pub fn settles(&self, op: &str) -> bool {
        matches!(
            self.kind(),
            ActionKind::Fulfilled(name) | ActionKind::Rejected(name) if name == op
        )
    }
}
