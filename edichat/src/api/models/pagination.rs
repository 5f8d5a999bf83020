//! Pagination query parameters.

use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// 1-based page selection for message history listings.
///
/// Out-of-range values are corrected rather than rejected: a page below 1
/// becomes page 1 and a non-positive limit falls back to the default size.
/// There is deliberately no upper bound on `limit`; callers that want the
/// whole history in one request can ask for it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, IntoParams)]
#[serde(default)]
pub struct MessagesQuery {
    /// Page number, starting at 1
    pub page: i64,
    /// Messages per page
    pub limit: i64,
}

impl Default for MessagesQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl MessagesQuery {
    /// Returns `(page, page_size)` with invalid inputs corrected.
    pub fn normalized(self) -> (i64, i64) {
        let page = if self.page < 1 { 1 } else { self.page };
        let limit = if self.limit < 1 {
            DEFAULT_PAGE_SIZE
        } else {
            self.limit
        };
        (page, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_first_page_of_one_hundred() {
        let q = MessagesQuery::default();
        assert_eq!(q.normalized(), (1, DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn non_positive_inputs_are_corrected() {
        let q = MessagesQuery { page: 0, limit: -5 };
        assert_eq!(q.normalized(), (1, DEFAULT_PAGE_SIZE));
        let q = MessagesQuery { page: -3, limit: 0 };
        assert_eq!(q.normalized(), (1, DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn large_limits_pass_through_unclamped() {
        let q = MessagesQuery {
            page: 7,
            limit: 100_000,
        };
        assert_eq!(q.normalized(), (7, 100_000));
    }
}
