//! Character map of arena occupancy.

use std::fmt;

use carve_core::layout::{align_up, ALIGN};
use carve_core::BlockWalk;

use crate::collect;

const HEADER: char = 'H';
const OCCUPIED: char = '#';
const FREE: char = '.';

/// Rows a map aims to stay within before cells grow past one word.
const TARGET_ROWS: u64 = 16;

/// Occupancy map of an arena, `width` cells per row.
///
/// Each cell covers the same number of bytes (a multiple of the
/// alignment unit) and shows the state at its first byte: `H` for the
/// arena header, `#` for an occupied block and `.` for a free block.
/// Every row is prefixed with the offset of its first cell.
pub struct OccupancyMap<'a> {
    walk: &'a dyn BlockWalk,
    width: usize,
}

impl<'a> OccupancyMap<'a> {
    /// Map of `walk`, `width` cells per row (at least one).
    pub fn new(walk: &'a dyn BlockWalk, width: usize) -> Self {
        Self {
            walk,
            width: width.max(1),
        }
    }

    /// Bytes represented by one cell.
    pub fn cell_bytes(&self) -> u64 {
        let per_row = self.width as u64 * TARGET_ROWS;
        let wanted = self.walk.total_size().div_ceil(per_row);
        align_up(wanted).unwrap_or(ALIGN).max(ALIGN)
    }
}

impl fmt::Display for OccupancyMap<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.walk.total_size();
        let header = self.walk.header_size();
        let cell = self.cell_bytes();
        let blocks = collect(self.walk);
        let mut current = blocks.iter().peekable();

        let mut at = 0;
        while at < total {
            write!(f, "{at:#06x} ")?;
            for _ in 0..self.width {
                if at >= total {
                    break;
                }
                while current.next_if(|b| b.end() <= at).is_some() {}
                let glyph = match current.peek() {
                    _ if at < header => HEADER,
                    Some(block) if block.offset <= at => {
                        if block.is_free() {
                            FREE
                        } else {
                            OCCUPIED
                        }
                    }
                    // Bytes no block claims.
                    _ => ' ',
                };
                write!(f, "{glyph}")?;
                at += cell;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Occupancy map of `walk`, `width` cells per row.
pub fn render_map(walk: &dyn BlockWalk, width: usize) -> String {
    OccupancyMap::new(walk, width).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use carve_test_utils::MockWalk;

    #[test]
    fn small_arena_uses_one_word_cells() {
        // 24-byte header, 32 occupied (+8), 48 free (+16): 16 cells of 8 bytes.
        let walk = MockWalk::new(128).push(32, false).push(48, true);
        assert_eq!(OccupancyMap::new(&walk, 8).cell_bytes(), 8);
        assert_eq!(render_map(&walk, 8), "0x0000 HHH#####\n0x0040 ........\n");
    }

    #[test]
    fn large_arena_grows_cells_to_fit() {
        let walk = MockWalk::new(1 << 20).push((1 << 20) - 40, true);
        let map = OccupancyMap::new(&walk, 64);
        assert_eq!(map.cell_bytes(), 1024);
        let text = map.to_string();
        assert_eq!(text.lines().count(), 16);
        assert!(text.starts_with("0x0000 H........"));
    }

    #[test]
    fn last_row_may_be_short() {
        let walk = MockWalk::new(80).push(40, true);
        assert_eq!(render_map(&walk, 4), "0x0000 HHH.\n0x0020 ....\n0x0040 ..\n");
    }

    #[test]
    fn zero_width_is_clamped() {
        let walk = MockWalk::new(40).push(0, true);
        assert_eq!(render_map(&walk, 0), "0x0000 H\n0x0008 H\n0x0010 H\n0x0018 .\n0x0020 .\n");
    }
}
