//! Free-block selection for each [`FitStrategy`].

use carve_core::{FitStrategy, HeapError};

use crate::walk::FreeEntry;

/// Pick a free block of at least `requested` usable bytes.
///
/// `entries` must be in ascending address order; the strict comparisons
/// below then keep the lowest-addressed block among equal candidates.
/// `Ok(None)` means nothing fits.
pub(crate) fn find_fit<I>(
    strategy: FitStrategy,
    entries: I,
    requested: u64,
) -> Result<Option<FreeEntry>, HeapError>
where
    I: IntoIterator<Item = Result<FreeEntry, HeapError>>,
{
    let mut chosen: Option<FreeEntry> = None;
    for entry in entries {
        let entry = entry?;
        if entry.size < requested {
            continue;
        }
        let better = match (strategy, chosen) {
            (FitStrategy::FirstFit, _) => return Ok(Some(entry)),
            (_, None) => true,
            (FitStrategy::BestFit, Some(c)) => entry.size < c.size,
            (FitStrategy::WorstFit, Some(c)) => entry.size > c.size,
        };
        if better {
            chosen = Some(entry);
        }
    }
    Ok(chosen)
}
