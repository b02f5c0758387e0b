//! Tail cursor: the count of rows already fully processed.
//!
//! The cursor is compared against row *ids*, which works because the writer
//! only appends and ids start at 1 without gaps. It lives in memory only; a
//! restarted process begins again at 0.

/// High-water mark over the servicelog row count.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TailCursor {
    last_processed_count: u64,
}

impl TailCursor {
    /// Cursor at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor at an explicit position.
    pub fn starting_at(count: u64) -> Self {
        Self {
            last_processed_count: count,
        }
    }

    /// Current position.
    pub fn read(&self) -> u64 {
        self.last_processed_count
    }

    /// Moves the cursor forward to `new_count`.
    ///
    /// # Panics
    /// If `new_count` is behind the current position. The cursor never moves
    /// backwards; callers filter shrinking counts before advancing.
    pub fn advance(&mut self, new_count: u64) {
        assert!(
            new_count >= self.last_processed_count,
            "tail cursor cannot move backwards ({} -> {})",
            self.last_processed_count,
            new_count
        );
        self.last_processed_count = new_count;
    }
}
