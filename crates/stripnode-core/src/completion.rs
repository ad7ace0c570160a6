//! Frame completion tracking.
//!
//! Universes arrive as independent datagrams, possibly lost or reordered, so
//! "complete" is a best-effort signal: every universe of the strip supplied at
//! least one pixel since the last flush. A universe that never shows up leaves
//! its slice holding whatever it last received.

/// Upper bound on universes per strip (one bit each in a `u64`).
pub const MAX_UNIVERSES: usize = u64::BITS as usize;

/// Set of relative universes that contributed since the last flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniverseMask {
    bits: u64,
    full: u64,
}

impl UniverseMask {
    /// Mask over `universe_count` universes. Counts above [`MAX_UNIVERSES`]
    /// are capped; layouts validate this up front.
    pub fn new(universe_count: usize) -> Self {
        let full = match universe_count {
            0 => 0,
            n if n >= MAX_UNIVERSES => u64::MAX,
            n => (1u64 << n) - 1,
        };
        Self { bits: 0, full }
    }

    /// Record a contribution. Universes outside the mask are ignored.
    pub fn mark(&mut self, relative: usize) {
        if relative < MAX_UNIVERSES {
            self.bits |= (1u64 << relative) & self.full;
        }
    }

    pub fn contains(&self, relative: usize) -> bool {
        relative < MAX_UNIVERSES && self.bits & (1u64 << relative) != 0
    }

    /// Every expected universe contributed. Always false for an empty mask.
    pub fn is_complete(&self) -> bool {
        self.full != 0 && self.bits == self.full
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of universes that contributed.
    pub fn count(&self) -> u32 {
        self.bits.count_ones()
    }

    pub fn clear(&mut self) {
        self.bits = 0;
    }
}

/// Outcome of comparing a sequence number against the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceCheck {
    First,
    InOrder,
    /// Packets were skipped between the previous and this one.
    Gap(u8),
    /// Duplicate or older than the previous packet.
    Reordered,
}

/// Last seen sequence number per relative universe.
///
/// Sequence numbers are advisory: they feed statistics only and never cause a
/// packet to be dropped.
#[derive(Debug, Clone)]
pub struct SequenceTable {
    last: [Option<u8>; MAX_UNIVERSES],
}

impl Default for SequenceTable {
    fn default() -> Self {
        Self {
            last: [None; MAX_UNIVERSES],
        }
    }
}

impl SequenceTable {
    pub fn observe(&mut self, relative: usize, sequence: u8) -> SequenceCheck {
        let Some(slot) = self.last.get_mut(relative) else {
            return SequenceCheck::First;
        };
        let previous = slot.replace(sequence);
        let Some(last) = previous else {
            return SequenceCheck::First;
        };
        let expected = last.wrapping_add(1);
        let gap = sequence.wrapping_sub(expected);
        match gap {
            0 => SequenceCheck::InOrder,
            1..128 => SequenceCheck::Gap(gap),
            _ => SequenceCheck::Reordered,
        }
    }
}
