//! Record identifier allocation.

use uuid::Uuid;

/// Allocates identifiers for novels, indexes and chapters.
///
/// Implementations must be safe to call concurrently from many workers and
/// must return identifiers that sort in allocation order when compared as
/// strings.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-ordered identifiers backed by UUID version 7.
///
/// The simple (hyphen-less, lowercase hex) form is used so that string
/// ordering follows the embedded millisecond timestamp.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV7Generator;

impl IdGenerator for UuidV7Generator {
    fn next_id(&self) -> String {
        Uuid::now_v7().simple().to_string()
    }
}
