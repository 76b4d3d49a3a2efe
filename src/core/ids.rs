//! Identifier generation for new entities.

use uuid::Uuid;

/// Returns a fresh opaque identifier (UUID v4, hyphenated).
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
