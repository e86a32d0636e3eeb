use attesta_types::display_id::DisplayId;
use attesta_types::store::{SequenceStore, StoreError};
use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;

/// Allocates display identifiers from the shared per-calendar-year
/// counter. Requests and affidavits both draw from the same counter, so
/// identifiers never collide across the two record kinds.
#[derive(Clone)]
pub struct DisplayIdAllocator {
    sequences: Arc<dyn SequenceStore>,
}

impl DisplayIdAllocator {
    pub fn new(sequences: Arc<dyn SequenceStore>) -> Self {
        DisplayIdAllocator { sequences }
    }

    /// Allocate the next identifier for the calendar year of `at`.
    pub async fn allocate(&self, at: DateTime<Utc>) -> Result<DisplayId, StoreError> {
        let year = at.year();
        let sequence = self.sequences.next(year).await?;
        Ok(DisplayId::new(year, sequence))
    }
}
