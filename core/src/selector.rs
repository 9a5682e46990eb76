//! Read path: derive a slice's props from the full state.

use crate::action::Payload;
use crate::compose::{Projection, SliceState};
use crate::composition::RootState;
use crate::error::SliceError;
use crate::slice::SliceFields;
use std::fmt;

/// What a custom projection receives.
#[derive(Debug)]
pub struct ProjectionInput<'a, S> {
    /// The whole process state
    pub full_state: &'a RootState,
    /// The owning slice's state
    pub slice: &'a SliceState<S>,
    /// Parameters supplied by the consumer
    pub own: &'a Payload,
}

/// Projection of one slice's state into props.
///
/// Without a custom projection the props are the slice state serialized
/// (fields plus `operations`), with any own parameters merged in. Slice
/// entries win over same-named own parameters, and own parameters that are
/// not an object are ignored.
pub struct Selector<S> {
    slice: String,
    projection: Option<Projection<S>>,
}

impl<S> Clone for Selector<S> {
    fn clone(&self) -> Self {
        Self {
            slice: self.slice.clone(),
            projection: self.projection.clone(),
        }
    }
}

impl<S> fmt::Debug for Selector<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("slice", &self.slice)
            .field("custom_projection", &self.projection.is_some())
            .finish()
    }
}

impl<S: SliceFields> Selector<S> {
    pub(crate) fn new(slice: String, projection: Option<Projection<S>>) -> Self {
        Self { slice, projection }
    }

    /// The slice this selector reads
    #[must_use]
    pub fn slice_name(&self) -> &str {
        &self.slice
    }

    /// The slice's state within `root`
    #[must_use]
    pub fn select<'a>(&self, root: &'a RootState) -> Option<&'a SliceState<S>> {
        root.slice(&self.slice)
    }

    /// Derive props from `root` and the consumer's `own` parameters.
    ///
    /// # Errors
    ///
    /// - [`SliceError::SliceNotMounted`] if `root` has no state for this slice
    /// - [`SliceError::Projection`] if the slice state cannot be serialized
    pub fn project(&self, root: &RootState, own: &Payload) -> Result<Payload, SliceError> {
        let slice = self
            .select(root)
            .ok_or_else(|| SliceError::SliceNotMounted(self.slice.clone()))?;

        if let Some(projection) = &self.projection {
            return Ok(projection(ProjectionInput {
                full_state: root,
                slice,
                own,
            }));
        }

        let projected = serde_json::to_value(slice).map_err(|e| SliceError::Projection {
            slice: self.slice.clone(),
            message: e.to_string(),
        })?;

        Ok(match (own, projected) {
            (Payload::Object(own), Payload::Object(fields)) => {
                let mut props = own.clone();
                props.extend(fields);
                Payload::Object(props)
            },
            (_, projected) => projected,
        })
    }
}
