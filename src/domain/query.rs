//! Query parameters identifying one feed view.

use serde::Serialize;

use crate::domain::types::{AdminId, CategoryId, SortOrder, StatusFilter};

pub const DEFAULT_RESULT_CAP: usize = 50;
pub const MAX_RESULT_CAP: usize = 100;

/// Value object describing what a feed session should show.
///
/// Two queries that compare equal never require a new fetch. The search term
/// is stored trimmed and the cap is clamped to `1..=MAX_RESULT_CAP`, so
/// cosmetic differences do not produce distinct queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryParams {
    search: String,
    category: Option<CategoryId>,
    admin: Option<AdminId>,
    status: StatusFilter,
    sort: SortOrder,
    cap: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            search: String::new(),
            category: None,
            admin: None,
            status: StatusFilter::default(),
            sort: SortOrder::default(),
            cap: DEFAULT_RESULT_CAP,
        }
    }
}

impl QueryParams {
    /// Public blog listing: published posts, most recent first.
    pub fn published() -> Self {
        Self::default().with_status(StatusFilter::Published)
    }

    /// Admin listing scoped to the posts one administrator owns.
    pub fn for_admin(admin: AdminId) -> Self {
        Self {
            admin: Some(admin),
            cap: MAX_RESULT_CAP,
            ..Self::default()
        }
    }

    pub fn with_search(mut self, term: impl AsRef<str>) -> Self {
        self.search = term.as_ref().trim().to_string();
        self
    }

    pub fn with_category(mut self, category: Option<CategoryId>) -> Self {
        self.category = category;
        self
    }

    pub fn with_admin(mut self, admin: Option<AdminId>) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap.clamp(1, MAX_RESULT_CAP);
        self
    }

    /// Trimmed search term, `None` when empty.
    pub fn search(&self) -> Option<&str> {
        (!self.search.is_empty()).then_some(self.search.as_str())
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.category
    }

    pub fn admin(&self) -> Option<AdminId> {
        self.admin
    }

    pub fn status(&self) -> StatusFilter {
        self.status
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}
