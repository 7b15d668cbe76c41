//! Type-safe payment intent identifier.
//!
//! [`IntentId`] is a newtype wrapper around [`uuid::Uuid`] (v4) providing
//! type safety so that intent identifiers cannot be confused with contest
//! or inventory UUIDs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a payment intent.
///
/// Wraps a UUID v4. Generated once when the customer requests to play a
/// contest and immutable thereafter. Used as the dictionary key in
/// [`super::IntentStore`] and as the event discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(uuid::Uuid);

impl IntentId {
    /// Creates a new random `IntentId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates an `IntentId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for IntentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for IntentId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<IntentId> for uuid::Uuid {
    fn from(id: IntentId) -> Self {
        id.0
    }
}
