use std::fmt;

use serde::Serialize;

use crate::services::page::{total_pages, PageResult};

/// Navigation a pagination control can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    First,
    Previous,
    Next,
    Last,
    JumpTo(u64),
    ChangeLimit(u64),
}

/// 1-based inclusive bounds of the records on screen; `0 to 0` when empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayRange {
    pub from: u64,
    pub to: u64,
    pub total: u64,
}

impl fmt::Display for DisplayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {} of {}", self.from, self.to, self.total)
    }
}

/// Pagination state for one listing. Holds the page window the user is on
/// and the total reported by the last response, and derives everything the
/// control needs to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page: u64,
    limit: u64,
    total: u64,
}

impl Paginator {
    pub fn new(page: u64, limit: u64, total: u64) -> Self {
        Self { page: page.max(1), limit: limit.max(1), total }
    }

    pub fn from_page<T>(result: &PageResult<T>) -> Self {
        Self::new(result.page, result.limit, result.total)
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn total_pages(&self) -> u64 {
        total_pages(self.total, self.limit)
    }

    pub fn display_range(&self) -> DisplayRange {
        let from = (self.page - 1).saturating_mul(self.limit).saturating_add(1);
        let to = self.page.saturating_mul(self.limit).min(self.total);
        if from > to {
            return DisplayRange { from: 0, to: 0, total: self.total };
        }
        DisplayRange { from, to, total: self.total }
    }

    pub fn shows_navigation(&self) -> bool {
        self.total_pages() > 1
    }

    pub fn can_go_back(&self) -> bool {
        self.page > 1
    }

    pub fn can_go_forward(&self) -> bool {
        self.page < self.total_pages()
    }

    /// Whether the action would change anything.
    pub fn is_enabled(&self, action: NavAction) -> bool {
        match action {
            NavAction::First | NavAction::Previous => self.can_go_back(),
            NavAction::Next | NavAction::Last => self.can_go_forward(),
            NavAction::JumpTo(n) => n >= 1 && n <= self.total_pages() && n != self.page,
            NavAction::ChangeLimit(n) => n >= 1,
        }
    }

    /// Applies an action and returns whether the window changed. Disabled
    /// actions are no-ops. Changing the limit always returns to page 1.
    pub fn apply(&mut self, action: NavAction) -> bool {
        if !self.is_enabled(action) {
            return false;
        }
        let before = (self.page, self.limit);
        match action {
            NavAction::First => self.page = 1,
            NavAction::Previous => self.page -= 1,
            NavAction::Next => self.page += 1,
            NavAction::Last => self.page = self.total_pages(),
            NavAction::JumpTo(n) => self.page = n,
            NavAction::ChangeLimit(n) => {
                self.limit = n;
                self.page = 1;
            }
        }
        before != (self.page, self.limit)
    }

    /// `(page, limit)` for the next request.
    pub fn request(&self) -> (u64, u64) {
        (self.page, self.limit)
    }

    /// Page numbers to render as buttons, centred on the current page.
    pub fn visible_pages(&self, window: u64) -> Vec<u64> {
        let last = self.total_pages();
        if last == 0 || window == 0 {
            return vec![];
        }
        let window = window.min(last);
        let half = window / 2;
        let start = self.page.saturating_sub(half).max(1).min(last - window + 1);
        (start..start + window).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_partial_page_range() {
        let p = Paginator::new(3, 10, 23);
        assert_eq!(p.total_pages(), 3);
        assert_eq!(p.display_range().to_string(), "21 to 23 of 23");
        assert!(!p.is_enabled(NavAction::Next));
        assert!(!p.is_enabled(NavAction::Last));
        assert!(p.is_enabled(NavAction::Previous));
    }

    #[test]
    fn empty_listing_hides_navigation() {
        let p = Paginator::new(1, 10, 0);
        assert_eq!(p.total_pages(), 0);
        assert_eq!(p.display_range().to_string(), "0 to 0 of 0");
        assert!(!p.shows_navigation());
        assert!(p.visible_pages(5).is_empty());
    }

    #[test]
    fn single_page_hides_navigation() {
        let p = Paginator::new(1, 10, 7);
        assert!(!p.shows_navigation());
        assert_eq!(p.display_range().to_string(), "1 to 7 of 7");
    }

    #[test]
    fn boundary_actions_are_no_ops() {
        let mut p = Paginator::new(1, 10, 23);
        assert!(!p.apply(NavAction::First));
        assert!(!p.apply(NavAction::Previous));
        assert_eq!(p.page(), 1);

        assert!(p.apply(NavAction::Last));
        assert_eq!(p.page(), 3);
        assert!(!p.apply(NavAction::Next));
        assert_eq!(p.page(), 3);
    }

    #[test]
    fn jump_outside_range_is_ignored() {
        let mut p = Paginator::new(2, 10, 23);
        assert!(!p.apply(NavAction::JumpTo(0)));
        assert!(!p.apply(NavAction::JumpTo(4)));
        assert!(p.apply(NavAction::JumpTo(3)));
        assert_eq!(p.request(), (3, 10));
    }

    #[test]
    fn changing_limit_resets_to_first_page() {
        let mut p = Paginator::new(3, 10, 23);
        assert!(p.apply(NavAction::ChangeLimit(25)));
        assert_eq!(p.request(), (1, 25));
        assert_eq!(p.total_pages(), 1);

        let mut p = Paginator::new(2, 10, 23);
        assert!(p.apply(NavAction::ChangeLimit(10)));
        assert_eq!(p.page(), 1);
        assert!(!p.apply(NavAction::ChangeLimit(0)));
    }

    #[test]
    fn page_past_end_shows_empty_range() {
        let p = Paginator::new(5, 10, 23);
        assert_eq!(p.display_range().to_string(), "0 to 0 of 23");
        assert!(p.can_go_back());
        assert!(!p.can_go_forward());
    }

    #[test]
    fn huge_page_number_saturates() {
        let mut p = Paginator::new(u64::MAX / 2, 10, 5);
        assert_eq!(p.display_range().to_string(), "0 to 0 of 5");
        assert!(!p.can_go_forward());
        assert!(p.apply(NavAction::First));
        assert_eq!(p.display_range().to_string(), "1 to 5 of 5");
    }

    #[test]
    fn builds_from_page_result() {
        let result = PageResult::new(vec!["a", "b", "c"], 23, 3, 10);
        let p = Paginator::from_page(&result);
        assert_eq!(p.total_pages(), result.total_pages);
        assert_eq!(p.display_range(), DisplayRange { from: 21, to: 23, total: 23 });
    }

    #[test]
    fn visible_pages_stay_in_bounds() {
        assert_eq!(Paginator::new(1, 10, 95).visible_pages(5), vec![1, 2, 3, 4, 5]);
        assert_eq!(Paginator::new(6, 10, 95).visible_pages(5), vec![4, 5, 6, 7, 8]);
        assert_eq!(Paginator::new(10, 10, 95).visible_pages(5), vec![6, 7, 8, 9, 10]);
        assert_eq!(Paginator::new(1, 10, 23).visible_pages(5), vec![1, 2, 3]);
    }
}
