//! Persistence sync contract for resolved media.

use crate::types::{HarvestResult, ResolvedMedia, StoredMedia};

/// Storage for the last resolved set.
///
/// `replace_all` is atomic: the previous set is removed and the new one is
/// inserted in list order, or nothing changes. Readers get entries back in
/// that order.
pub trait MediaStore: Send + Sync {
    /// Replace the stored set. Returns the number of entries written.
    fn replace_all(&self, media: &[ResolvedMedia]) -> HarvestResult<usize>;

    /// All stored entries in resolution order.
    fn list(&self) -> HarvestResult<Vec<StoredMedia>>;

    /// One stored entry by id.
    fn get(&self, id: i64) -> HarvestResult<Option<StoredMedia>>;
}
