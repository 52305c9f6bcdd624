//! Bounds-checked word access over the arena bytes.
//!
//! Every metadata read and write in the crate funnels through here, so an
//! out-of-range offset surfaces as [`HeapError::Corrupted`] rather than a
//! slice-index panic.

use std::ops::Range;

use carve_core::layout::WORD;
use carve_core::HeapError;

fn word_range(len: usize, offset: u64) -> Result<Range<usize>, HeapError> {
    usize::try_from(offset)
        .ok()
        .and_then(|start| {
            let end = start.checked_add(WORD as usize)?;
            (end <= len).then_some(start..end)
        })
        .ok_or_else(|| HeapError::corrupted(offset, "metadata word lies outside the arena"))
}

/// Read the little-endian word at `offset`.
pub(crate) fn read_word(bytes: &[u8], offset: u64) -> Result<u64, HeapError> {
    let range = word_range(bytes.len(), offset)?;
    let mut word = [0u8; WORD as usize];
    word.copy_from_slice(&bytes[range]);
    Ok(u64::from_le_bytes(word))
}

/// Write `value` as a little-endian word at `offset`.
pub(crate) fn write_word(bytes: &mut [u8], offset: u64, value: u64) -> Result<(), HeapError> {
    let range = word_range(bytes.len(), offset)?;
    bytes[range].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let mut bytes = vec![0u8; 32];
        write_word(&mut bytes, 8, 0xDEAD_BEEF).unwrap();
        assert_eq!(read_word(&bytes, 8).unwrap(), 0xDEAD_BEEF);
        assert_eq!(&bytes[8..12], &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn last_word_is_reachable() {
        let bytes = vec![0xFFu8; 16];
        assert_eq!(read_word(&bytes, 8).unwrap(), u64::MAX);
    }

    #[test]
    fn out_of_bounds_is_corruption_not_panic() {
        let mut bytes = vec![0u8; 16];
        assert!(matches!(
            read_word(&bytes, 9),
            Err(HeapError::Corrupted { offset: 9, .. })
        ));
        assert!(write_word(&mut bytes, u64::MAX, 1).is_err());
    }
}
