//! Debug rendering of Carve arenas.
//!
//! Works from any [`BlockWalk`], so it never touches arena bytes and can
//! be pointed at a live heap or a hand-built block list alike.
//!
//! - [`render`]: block-by-block listing framed by start/end banners.
//! - [`render_map`]: a character map of the region, one row per line.
//! - [`Dump`]: the `Display` value behind both, driven by [`DumpOptions`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod map;

use std::fmt;

use carve_core::{BlockInfo, BlockWalk};

pub use map::{render_map, OccupancyMap};

/// What a [`Dump`] includes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DumpOptions {
    /// Append an occupancy map after the listing.
    ///
    /// Default: `false`.
    pub include_map: bool,

    /// Characters per map row.
    ///
    /// Default: 64.
    pub map_width: usize,
}

impl DumpOptions {
    /// Default map row width.
    pub const DEFAULT_MAP_WIDTH: usize = 64;

    /// Listing only.
    pub fn new() -> Self {
        Self {
            include_map: false,
            map_width: Self::DEFAULT_MAP_WIDTH,
        }
    }

    /// Listing followed by a map `width` characters wide.
    pub fn with_map(mut self, width: usize) -> Self {
        self.include_map = true;
        self.map_width = width;
        self
    }
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect a walk into a vector.
pub(crate) fn collect(walk: &dyn BlockWalk) -> Vec<BlockInfo> {
    let mut blocks = Vec::new();
    walk.walk(&mut |block| blocks.push(block));
    blocks
}

/// Printable listing of an arena.
pub struct Dump<'a> {
    walk: &'a dyn BlockWalk,
    options: DumpOptions,
}

impl<'a> Dump<'a> {
    /// Listing of `walk` with default options.
    pub fn new(walk: &'a dyn BlockWalk) -> Self {
        Self::with_options(walk, DumpOptions::default())
    }

    /// Listing of `walk` with `options`.
    pub fn with_options(walk: &'a dyn BlockWalk, options: DumpOptions) -> Self {
        Self { walk, options }
    }
}

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let blocks = collect(self.walk);
        writeln!(
            f,
            "===== ARENA START: {} bytes, {}-byte header =====",
            self.walk.total_size(),
            self.walk.header_size()
        )?;

        let (mut used, mut used_bytes, mut free, mut free_bytes, mut largest) = (0, 0, 0, 0, 0);
        for (i, block) in blocks.iter().enumerate() {
            writeln!(
                f,
                "block {}/{} at {:#06x}: {:<8} size {:>6}  metadata {:>2}  span {:>6}",
                i + 1,
                blocks.len(),
                block.offset,
                block.state.to_string(),
                block.size,
                block.metadata_size(),
                block.span()
            )?;
            if block.is_free() {
                free += 1;
                free_bytes += block.size;
                largest = largest.max(block.size);
            } else {
                used += 1;
                used_bytes += block.size;
            }
        }
        writeln!(
            f,
            "{used} occupied ({used_bytes} bytes), {free} free ({free_bytes} bytes), largest free {largest}"
        )?;

        if self.options.include_map {
            write!(f, "{}", OccupancyMap::new(self.walk, self.options.map_width))?;
        }
        writeln!(f, "===== ARENA END =====")
    }
}

/// Block-by-block listing of `walk`.
pub fn render(walk: &dyn BlockWalk) -> String {
    Dump::new(walk).to_string()
}
