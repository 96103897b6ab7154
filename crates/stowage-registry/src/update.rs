//! Per-type update callbacks.

use stowage_core::ClockInfo;
use thiserror::Error;

use crate::entity::Handle;

/// Arguments passed to an [`UpdateFn`].
#[derive(Debug)]
pub struct UpdateArgs<'a> {
    /// The entity being updated.
    pub entity: Handle,
    /// The entity that requested the update, if any.
    pub caller: Option<Handle>,
    /// The entity's payload bytes.
    pub payload: &'a mut [u8],
    /// Frame clock for this update.
    pub clock: &'a ClockInfo,
}

/// Callback run by [`Registry::update`](crate::Registry::update) on an entity
/// of the type it was registered with.
pub type UpdateFn = Box<dyn FnMut(UpdateArgs<'_>) -> Result<(), UpdateError>>;

/// Failure reported by an update callback.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// The callback could not complete.
    #[error("update failed: {reason}")]
    Failed {
        /// Callback-provided description.
        reason: String,
    },
}

impl UpdateError {
    /// Shorthand for [`UpdateError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}
