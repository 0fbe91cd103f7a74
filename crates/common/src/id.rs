//! ID generation utilities.

use ulid::Ulid;
use uuid::Uuid;

/// ID generator for client-side identifiers.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// Used for the temporary ids of optimistically inserted feed items. ULIDs
    /// sort lexicographically by creation time, so two pending items created
    /// in the same millisecond still order deterministically.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a new random UUID v4.
    #[must_use]
    pub fn generate_uuid_v4(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
