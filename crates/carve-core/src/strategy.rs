//! Free-block search policies.

use std::fmt;

/// Policy used to choose a free block for an allocation request.
///
/// All three scan the free list in ascending address order and only
/// consider blocks whose usable size covers the request. Ties between
/// equally-sized candidates go to the lowest address.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FitStrategy {
    /// The first block, by address, that is large enough.
    #[default]
    FirstFit,
    /// The smallest block that is large enough.
    BestFit,
    /// The largest block that is large enough.
    WorstFit,
}

impl FitStrategy {
    /// All strategies, in tag order.
    pub const ALL: [FitStrategy; 3] = [Self::FirstFit, Self::BestFit, Self::WorstFit];

    /// Tag persisted in the arena header.
    pub fn tag(self) -> u64 {
        match self {
            Self::FirstFit => 0,
            Self::BestFit => 1,
            Self::WorstFit => 2,
        }
    }

    /// Decode a header tag. Returns `None` for unknown tags.
    pub fn from_tag(tag: u64) -> Option<Self> {
        match tag {
            0 => Some(Self::FirstFit),
            1 => Some(Self::BestFit),
            2 => Some(Self::WorstFit),
            _ => None,
        }
    }
}

impl fmt::Display for FitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FirstFit => "first-fit",
            Self::BestFit => "best-fit",
            Self::WorstFit => "worst-fit",
        };
        f.write_str(name)
    }
}
