//! Navigation state machines for the three layouts.
//!
//! These are the Rust counterparts of the runtime scripts under
//! `src/template/runtime/`. Both sides implement the same transitions, so
//! the behaviour can be exercised here without a browser:
//!
//! | Layout | State | Transitions |
//! |---|---|---|
//! | Slideshow | cursor in `[0, N-1]` | `go_to`, `next`, `prev`; clamped, no wraparound |
//! | Flip-book | cursor in `[0, N-1]`; leaves below it are flipped | as slideshow, plus `click_leaf` |
//! | Scroll-doc | derived from scroll position | `observe` recomputes on every scroll event |
//!
//! Moving forward into a page the [`PageLock`] blocks never advances the
//! cursor; it yields [`NavOutcome::GateRequired`] so the caller shows the
//! lead form instead.

use crate::gate::PageLock;

/// Distance from the top of the viewport, in CSS pixels, at which a
/// scroll-doc section counts as current.
pub const SCROLL_OFFSET_PX: f64 = 120.0;

/// Result of a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    Moved { from: usize, to: usize },
    /// Already there, or clamped back onto the current page.
    Unchanged,
    /// The target is locked; present the gate form instead.
    GateRequired { target: usize },
}

/// Per-slide presentation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideState {
    Active,
    /// Before the cursor; animates out to the left.
    Prev,
    Inactive,
}

/// Per-leaf presentation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafState {
    Flipped,
    Unflipped,
}

/// A bounded cursor over `count` pages.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cursor {
    current: usize,
    count: usize,
}

impl Cursor {
    fn new(count: usize) -> Self {
        Self {
            current: 0,
            count: count.max(1),
        }
    }

    fn go_to(&mut self, target: isize, lock: PageLock) -> NavOutcome {
        let last = self.count as isize - 1;
        let target = target.clamp(0, last) as usize;
        if target == self.current {
            return NavOutcome::Unchanged;
        }
        if target > self.current && lock.blocks(target) {
            return NavOutcome::GateRequired { target };
        }
        let from = self.current;
        self.current = target;
        NavOutcome::Moved { from, to: target }
    }
}

/// Slideshow: one page visible at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideCursor {
    cursor: Cursor,
}

impl SlideCursor {
    pub fn new(count: usize) -> Self {
        Self {
            cursor: Cursor::new(count),
        }
    }

    pub fn current(&self) -> usize {
        self.cursor.current
    }

    pub fn go_to(&mut self, target: usize, lock: PageLock) -> NavOutcome {
        self.cursor.go_to(target.min(isize::MAX as usize) as isize, lock)
    }

    pub fn next(&mut self, lock: PageLock) -> NavOutcome {
        self.cursor.go_to(self.cursor.current as isize + 1, lock)
    }

    pub fn prev(&mut self, lock: PageLock) -> NavOutcome {
        self.cursor.go_to(self.cursor.current as isize - 1, lock)
    }

    pub fn state_of(&self, index: usize) -> SlideState {
        use std::cmp::Ordering::*;
        match index.cmp(&self.cursor.current) {
            Equal => SlideState::Active,
            Less => SlideState::Prev,
            Greater => SlideState::Inactive,
        }
    }
}

/// Flip-book: leaves below the cursor are turned over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlipCursor {
    cursor: Cursor,
}

impl FlipCursor {
    pub fn new(count: usize) -> Self {
        Self {
            cursor: Cursor::new(count),
        }
    }

    pub fn current(&self) -> usize {
        self.cursor.current
    }

    pub fn go_to(&mut self, target: usize, lock: PageLock) -> NavOutcome {
        self.cursor.go_to(target.min(isize::MAX as usize) as isize, lock)
    }

    pub fn next(&mut self, lock: PageLock) -> NavOutcome {
        self.cursor.go_to(self.cursor.current as isize + 1, lock)
    }

    pub fn prev(&mut self, lock: PageLock) -> NavOutcome {
        self.cursor.go_to(self.cursor.current as isize - 1, lock)
    }

    /// Clicking the open leaf turns it; clicking any other leaf jumps the
    /// cursor to that leaf, flipping or unflipping everything in between.
    pub fn click_leaf(&mut self, index: usize, lock: PageLock) -> NavOutcome {
        if index == self.cursor.current {
            self.next(lock)
        } else {
            self.go_to(index, lock)
        }
    }

    pub fn state_of(&self, index: usize) -> LeafState {
        if index < self.cursor.current {
            LeafState::Flipped
        } else {
            LeafState::Unflipped
        }
    }

    /// Number of leaves currently flipped.
    pub fn flipped_count(&self) -> usize {
        self.cursor.current
    }
}

/// Scroll-doc: the current section is derived, never stored by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollSpy {
    current: usize,
    offset: f64,
}

impl Default for ScrollSpy {
    fn default() -> Self {
        Self::new(SCROLL_OFFSET_PX)
    }
}

impl ScrollSpy {
    pub fn new(offset: f64) -> Self {
        Self { current: 0, offset }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Recompute the current section from each section's top edge relative
    /// to the viewport (negative once scrolled past).
    ///
    /// The current section is the last one whose top is at or above the
    /// offset line. Entering a locked section reports `GateRequired` while
    /// still tracking the position, since scrolling cannot be refused.
    pub fn observe(&mut self, section_tops: &[f64], lock: PageLock) -> NavOutcome {
        let next = current_section(section_tops, self.offset);
        if next == self.current {
            return NavOutcome::Unchanged;
        }
        let from = self.current;
        self.current = next;
        if next > from && lock.blocks(next) {
            NavOutcome::GateRequired { target: next }
        } else {
            NavOutcome::Moved { from, to: next }
        }
    }
}

/// Index of the last section whose top lies at or above `offset`; 0 if none.
pub fn current_section(section_tops: &[f64], offset: f64) -> usize {
    section_tops
        .iter()
        .rposition(|&top| top <= offset)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slideshow_clamps_without_wraparound() {
        let mut c = SlideCursor::new(3);
        let open = PageLock::open();
        assert_eq!(c.prev(open), NavOutcome::Unchanged);
        assert_eq!(c.next(open), NavOutcome::Moved { from: 0, to: 1 });
        assert_eq!(c.next(open), NavOutcome::Moved { from: 1, to: 2 });
        assert_eq!(c.next(open), NavOutcome::Unchanged);
        assert_eq!(c.current(), 2);
        assert_eq!(c.go_to(99, open), NavOutcome::Unchanged);
        assert_eq!(c.go_to(0, open), NavOutcome::Moved { from: 2, to: 0 });
    }

    #[test]
    fn slide_states() {
        let mut c = SlideCursor::new(4);
        c.go_to(2, PageLock::open());
        assert_eq!(c.state_of(0), SlideState::Prev);
        assert_eq!(c.state_of(1), SlideState::Prev);
        assert_eq!(c.state_of(2), SlideState::Active);
        assert_eq!(c.state_of(3), SlideState::Inactive);
    }

    #[test]
    fn forward_into_locked_page_requires_gate() {
        let lock = PageLock::from_index(2);
        let mut c = SlideCursor::new(5);
        assert_eq!(c.next(lock), NavOutcome::Moved { from: 0, to: 1 });
        assert_eq!(c.next(lock), NavOutcome::GateRequired { target: 2 });
        assert_eq!(c.current(), 1);
        assert_eq!(c.go_to(4, lock), NavOutcome::GateRequired { target: 4 });
        assert_eq!(c.prev(lock), NavOutcome::Moved { from: 1, to: 0 });
        // After unlocking the same move succeeds.
        assert_eq!(c.go_to(4, PageLock::open()), NavOutcome::Moved { from: 0, to: 4 });
    }

    #[test]
    fn single_page_deck_never_moves() {
        let mut c = SlideCursor::new(1);
        assert_eq!(c.next(PageLock::open()), NavOutcome::Unchanged);
        assert_eq!(c.prev(PageLock::open()), NavOutcome::Unchanged);
        let mut empty = FlipCursor::new(0);
        assert_eq!(empty.next(PageLock::open()), NavOutcome::Unchanged);
    }

    #[test]
    fn flipbook_jump_flips_everything_between() {
        let open = PageLock::open();
        let mut f = FlipCursor::new(6);
        assert_eq!(f.click_leaf(4, open), NavOutcome::Moved { from: 0, to: 4 });
        assert_eq!(f.flipped_count(), 4);
        assert!((0..4).all(|i| f.state_of(i) == LeafState::Flipped));
        assert!((4..6).all(|i| f.state_of(i) == LeafState::Unflipped));

        // Clicking a flipped leaf unflips it and all later leaves.
        assert_eq!(f.click_leaf(1, open), NavOutcome::Moved { from: 4, to: 1 });
        assert_eq!(f.state_of(0), LeafState::Flipped);
        assert_eq!(f.state_of(1), LeafState::Unflipped);

        // Clicking the open leaf turns it.
        assert_eq!(f.click_leaf(1, open), NavOutcome::Moved { from: 1, to: 2 });
    }

    #[test]
    fn flipbook_respects_gate() {
        let lock = PageLock::from_index(3);
        let mut f = FlipCursor::new(6);
        f.go_to(2, lock);
        assert_eq!(f.click_leaf(2, lock), NavOutcome::GateRequired { target: 3 });
        assert_eq!(f.click_leaf(5, lock), NavOutcome::GateRequired { target: 5 });
        assert_eq!(f.current(), 2);
    }

    #[test]
    fn scroll_section_is_derived_from_offsets() {
        let tops = [-900.0, -100.0, 110.0, 800.0];
        assert_eq!(current_section(&tops, SCROLL_OFFSET_PX), 2);
        assert_eq!(current_section(&[300.0, 900.0], SCROLL_OFFSET_PX), 0);
        assert_eq!(current_section(&[], SCROLL_OFFSET_PX), 0);
    }

    #[test]
    fn scroll_spy_reports_gate_on_entering_locked_section() {
        let lock = PageLock::from_index(1);
        let mut spy = ScrollSpy::default();
        assert_eq!(spy.observe(&[0.0, 600.0], lock), NavOutcome::Unchanged);
        assert_eq!(
            spy.observe(&[-600.0, 0.0], lock),
            NavOutcome::GateRequired { target: 1 }
        );
        assert_eq!(spy.current(), 1);
        assert_eq!(
            spy.observe(&[0.0, 600.0], lock),
            NavOutcome::Moved { from: 1, to: 0 }
        );
    }
}
