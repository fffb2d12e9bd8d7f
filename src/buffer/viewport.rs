use std::ops::Range;

/// Lines from the bottom within which scrolling down re-engages follow mode
pub const DEFAULT_FOLLOW_TOLERANCE: usize = 3;

/// Scroll state of a scrollable list
///
/// Positions are in content lines. `scroll_pos` never exceeds
/// `total - visible_rows`, and `auto_follow` is true only while the view
/// sits at that maximum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    visible_rows: usize,
    scroll_pos: usize,
    auto_follow: bool,
    follow_tolerance: usize,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::following()
    }
}

impl Viewport {
    /// Viewport glued to the bottom of its content
    pub fn following() -> Self {
        Self {
            visible_rows: 0,
            scroll_pos: 0,
            auto_follow: true,
            follow_tolerance: DEFAULT_FOLLOW_TOLERANCE,
        }
    }

    /// Viewport that stays where the user put it
    pub fn pinned() -> Self {
        Self {
            auto_follow: false,
            ..Self::following()
        }
    }

    pub fn with_follow_tolerance(mut self, tolerance: usize) -> Self {
        self.follow_tolerance = tolerance;
        self
    }

    pub fn visible_rows(&self) -> usize {
        self.visible_rows
    }

    pub fn scroll_pos(&self) -> usize {
        self.scroll_pos
    }

    pub fn auto_follow(&self) -> bool {
        self.auto_follow
    }

    /// Maximum scroll position for `total` lines
    pub fn max_scroll(&self, total: usize) -> usize {
        total.saturating_sub(self.visible_rows)
    }

    /// Visible slice `[scroll_pos, scroll_pos + visible_rows)` clamped to content
    pub fn visible_range(&self, total: usize) -> Range<usize> {
        let start = self.scroll_pos.min(total);
        let end = (start + self.visible_rows).min(total);
        start..end
    }

    /// Update the number of visible rows (terminal resize)
    pub fn set_visible_rows(&mut self, rows: usize, total: usize) {
        self.visible_rows = rows;
        self.clamp(total);
    }

    /// Re-apply invariants after content changed
    pub fn clamp(&mut self, total: usize) {
        let max = self.max_scroll(total);
        if self.auto_follow {
            self.scroll_pos = max;
        } else {
            self.scroll_pos = self.scroll_pos.min(max);
        }
    }

    /// Account for lines appended and `dropped` lines evicted from the front
    pub fn on_append(&mut self, total: usize, dropped: usize) {
        if !self.auto_follow {
            self.scroll_pos = self.scroll_pos.saturating_sub(dropped);
        }
        self.clamp(total);
    }

    /// Scroll up by `n` lines
    pub fn up(&mut self, n: usize, total: usize) {
        self.scroll_pos = self.scroll_pos.saturating_sub(n);
        if n > 0 && self.max_scroll(total) > 0 {
            self.auto_follow = false;
        }
    }

    /// Scroll down by `n` lines, following again once the bottom is reached
    pub fn down(&mut self, n: usize, total: usize) {
        let max = self.max_scroll(total);
        self.scroll_pos = (self.scroll_pos + n).min(max);
        if n > 0 && max - self.scroll_pos <= self.follow_tolerance {
            self.scroll_pos = max;
            self.auto_follow = true;
        }
    }

    pub fn top(&mut self, total: usize) {
        self.scroll_pos = 0;
        self.auto_follow = self.max_scroll(total) == 0;
    }

    pub fn bottom(&mut self, total: usize) {
        self.scroll_pos = self.max_scroll(total);
        self.auto_follow = true;
    }

    pub fn page_up(&mut self, total: usize) {
        self.up(self.visible_rows.max(1), total);
    }

    pub fn page_down(&mut self, total: usize) {
        self.down(self.visible_rows.max(1), total);
    }

    pub fn half_page_up(&mut self, total: usize) {
        self.up((self.visible_rows / 2).max(1), total);
    }

    pub fn half_page_down(&mut self, total: usize) {
        self.down((self.visible_rows / 2).max(1), total);
    }

    /// Scroll the minimum amount needed to make `index` visible
    pub fn reveal(&mut self, index: usize, total: usize) {
        if index < self.scroll_pos {
            self.scroll_pos = index;
        } else if self.visible_rows > 0 && index >= self.scroll_pos + self.visible_rows {
            self.scroll_pos = index + 1 - self.visible_rows;
        }
        self.scroll_pos = self.scroll_pos.min(self.max_scroll(total));
        self.auto_follow = self.auto_follow && self.scroll_pos == self.max_scroll(total);
    }

    /// Scroll so `index` sits in the middle of the view, clamped to range
    pub fn center_on(&mut self, index: usize, total: usize) {
        self.scroll_pos = index
            .saturating_sub(self.visible_rows / 2)
            .min(self.max_scroll(total));
        self.auto_follow = false;
    }

    /// Jump to an absolute line, clamped
    pub fn scroll_to(&mut self, line: usize, total: usize) {
        let max = self.max_scroll(total);
        self.scroll_pos = line.min(max);
        self.auto_follow = self.scroll_pos == max && self.auto_follow;
    }

    pub fn set_auto_follow(&mut self, enabled: bool, total: usize) {
        self.auto_follow = enabled;
        self.clamp(total);
    }

    /// Reset to an empty, following view keeping the row count
    pub fn reset(&mut self) {
        self.scroll_pos = 0;
        self.auto_follow = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn viewport(rows: usize, total: usize) -> Viewport {
        let mut viewport = Viewport::following();
        viewport.set_visible_rows(rows, total);
        viewport
    }

    #[test]
    fn viewport_follows_appends() {
        let mut viewport = viewport(40, 5000);
        assert_eq!(viewport.scroll_pos(), 4960);

        viewport.on_append(5001, 0);
        assert_eq!(viewport.scroll_pos(), 4961);
        assert!(viewport.auto_follow());
    }

    #[test]
    fn viewport_up_stops_following() {
        let mut viewport = viewport(40, 5001);
        viewport.up(1, 5001);
        assert!(!viewport.auto_follow());
        assert_eq!(viewport.scroll_pos(), 4960);

        viewport.on_append(5002, 0);
        assert_eq!(viewport.scroll_pos(), 4960);
    }

    #[test]
    fn viewport_down_to_bottom_resumes_following() {
        let mut viewport = viewport(10, 100);
        viewport.top(100);
        assert!(!viewport.auto_follow());

        viewport.down(10, 100);
        assert_eq!(viewport.scroll_pos(), 10);
        assert!(!viewport.auto_follow());

        viewport.down(1000, 100);
        assert_eq!(viewport.scroll_pos(), 90);
        assert!(viewport.auto_follow());
    }

    #[test]
    fn viewport_down_within_tolerance_snaps_to_bottom() {
        let mut viewport = viewport(10, 100);
        viewport.scroll_to(80, 100);
        viewport.down(8, 100);
        assert_eq!(viewport.scroll_pos(), 90);
        assert!(viewport.auto_follow());
    }

    #[test]
    fn viewport_half_page_moves_by_half_visible_rows() {
        let mut viewport = viewport(10, 50);
        viewport.top(50);

        viewport.half_page_down(50);
        assert_eq!(viewport.scroll_pos(), 5);
        viewport.half_page_down(50);
        assert_eq!(viewport.scroll_pos(), 10);
        viewport.half_page_up(50);
        assert_eq!(viewport.scroll_pos(), 5);
    }

    #[test]
    fn viewport_page_moves_by_visible_rows() {
        let mut viewport = viewport(10, 50);
        viewport.top(50);

        viewport.page_down(50);
        assert_eq!(viewport.scroll_pos(), 10);
        viewport.page_up(50);
        assert_eq!(viewport.scroll_pos(), 0);
    }

    #[test]
    fn viewport_eviction_shifts_pinned_position() {
        let mut viewport = viewport(10, 100);
        viewport.scroll_to(40, 100);
        viewport.set_auto_follow(false, 100);

        viewport.on_append(100, 5);
        assert_eq!(viewport.scroll_pos(), 35);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(5, 0)]
    #[case(25, 16)]
    #[case(99, 90)]
    fn viewport_reveal_keeps_index_visible(#[case] index: usize, #[case] expected: usize) {
        let mut viewport = Viewport::pinned();
        viewport.set_visible_rows(10, 100);
        viewport.reveal(index, 100);
        assert_eq!(viewport.scroll_pos(), expected);
        assert!(viewport.visible_range(100).contains(&index));
    }

    #[rstest]
    #[case(50, 45)]
    #[case(2, 0)]
    #[case(98, 90)]
    fn viewport_center_on_clamps(#[case] index: usize, #[case] expected: usize) {
        let mut viewport = viewport(10, 100);
        viewport.center_on(index, 100);
        assert_eq!(viewport.scroll_pos(), expected);
        assert!(!viewport.auto_follow());
    }

    #[test]
    fn viewport_short_content_never_scrolls() {
        let mut viewport = viewport(10, 3);
        viewport.down(5, 3);
        viewport.up(5, 3);
        assert_eq!(viewport.scroll_pos(), 0);
        assert_eq!(viewport.visible_range(3), 0..3);
    }

    #[test]
    fn viewport_invariant_holds_after_shrink() {
        let mut viewport = Viewport::pinned();
        viewport.set_visible_rows(5, 100);
        viewport.scroll_to(80, 100);
        viewport.clamp(20);
        assert!(viewport.scroll_pos() <= viewport.max_scroll(20));
    }
}
