//! Offset pagination and rank assignment
//!
//! Both leaderboards share one page model: a 1-based page number, a page size
//! in `[1, MAX_PAGE_SIZE]` (anything else falls back to the default), and
//! ranks derived from the window offset.

use std::cmp::Ordering;

use crate::types::{Company, LeaderboardPage, UserLeaderboardPage, UserStanding};

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 25;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Normalized pagination parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Build a request from raw query values. Missing or out-of-range values,
    /// oversized pages included, fall back to the defaults.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => DEFAULT_PAGE,
        };
        let page_size = match page_size {
            Some(s) if (1..=MAX_PAGE_SIZE as i64).contains(&s) => s as u32,
            _ => DEFAULT_PAGE_SIZE,
        };
        Self { page, page_size }
    }

    /// Parse pagination straight from query strings, ignoring garbage
    pub fn from_query(page: Option<&str>, page_size: Option<&str>) -> Self {
        Self::new(
            page.and_then(|p| p.trim().parse().ok()),
            page_size.and_then(|s| s.trim().parse().ok()),
        )
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn limit(&self) -> u32 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    /// 1-based rank of the row at `position` within this page
    pub fn rank_at(&self, position: usize) -> u32 {
        let rank = self.offset() + position as u64 + 1;
        u32::try_from(rank).unwrap_or(u32::MAX)
    }

    /// Slice an already ordered sequence down to this page's window
    pub fn window<'a, T>(&self, sorted: &'a [T]) -> &'a [T] {
        let start = usize::try_from(self.offset())
            .unwrap_or(usize::MAX)
            .min(sorted.len());
        let end = start.saturating_add(self.page_size as usize).min(sorted.len());
        &sorted[start..end]
    }
}

/// Leaderboard order: rating desc, then total votes desc, then id asc
pub fn compare_standing(a: &Company, b: &Company) -> Ordering {
    b.elo_rating
        .cmp(&a.elo_rating)
        .then_with(|| b.total_votes.cmp(&a.total_votes))
        .then_with(|| a.id.cmp(&b.id))
}

/// True when `other` sorts strictly ahead of `company`
pub fn ranks_ahead(other: &Company, company: &Company) -> bool {
    compare_standing(other, company) == Ordering::Less
}

/// Assign consecutive ranks starting at `first_rank`
pub fn assign_ranks(companies: Vec<Company>, first_rank: u32) -> Vec<Company> {
    companies
        .into_iter()
        .enumerate()
        .map(|(i, c)| c.with_rank(first_rank.saturating_add(i as u32)))
        .collect()
}

/// Assemble a company leaderboard page from its ordered window
pub fn company_page(rows: Vec<Company>, total_count: i64, request: PageRequest) -> LeaderboardPage {
    let companies = rows
        .into_iter()
        .enumerate()
        .map(|(i, c)| c.with_rank(request.rank_at(i)))
        .collect();

    LeaderboardPage {
        companies,
        total_count,
        page: request.page(),
        page_size: request.page_size(),
    }
}

/// Assemble a user leaderboard page from `(user_id, votes)` rows
pub fn user_page(
    rows: Vec<(String, i64)>,
    total_count: i64,
    request: PageRequest,
) -> UserLeaderboardPage {
    let users = rows
        .into_iter()
        .enumerate()
        .map(|(i, (user_id, total_votes))| UserStanding {
            user_id,
            total_votes,
            rank: request.rank_at(i),
        })
        .collect();

    UserLeaderboardPage {
        users,
        total_count,
        page: request.page(),
        page_size: request.page_size(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_company;

    #[test]
    fn test_defaults_for_invalid_values() {
        assert_eq!(PageRequest::new(None, None), PageRequest::default());

        let req = PageRequest::new(Some(0), Some(0));
        assert_eq!((req.page(), req.page_size()), (1, 25));

        let req = PageRequest::new(Some(-3), Some(-10));
        assert_eq!((req.page(), req.page_size()), (1, 25));

        let req = PageRequest::new(Some(2), Some(500));
        assert_eq!((req.page(), req.page_size()), (2, 25));

        let req = PageRequest::new(Some(2), Some(100));
        assert_eq!((req.page(), req.page_size()), (2, 100));

        let req = PageRequest::new(Some(2), Some(101));
        assert_eq!(req.page_size(), DEFAULT_PAGE_SIZE);

        let req = PageRequest::new(Some(3), Some(1));
        assert_eq!((req.page(), req.page_size()), (3, 1));
    }

    #[test]
    fn test_from_query_ignores_garbage() {
        let req = PageRequest::from_query(Some("abc"), Some("1e3"));
        assert_eq!(req, PageRequest::default());

        let req = PageRequest::from_query(Some(" 4 "), Some("10"));
        assert_eq!((req.page(), req.page_size()), (4, 10));

        let req = PageRequest::from_query(Some("1"), Some("101"));
        assert_eq!(req.page_size(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_offset_and_rank() {
        let req = PageRequest::new(Some(3), Some(25));
        assert_eq!(req.offset(), 50);
        assert_eq!(req.rank_at(0), 51);
        assert_eq!(req.rank_at(24), 75);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let req = PageRequest::new(Some(i64::MAX), Some(100));
        assert_eq!(req.page(), u32::MAX);
        assert!(req.offset() > 0);
        assert_eq!(req.rank_at(0), u32::MAX);
        assert!(req.window(&[1, 2, 3]).is_empty());
    }

    #[test]
    fn test_window_beyond_end() {
        let rows: Vec<i32> = (0..10).collect();
        let req = PageRequest::new(Some(1000), Some(25));
        assert!(req.window(&rows).is_empty());

        let req = PageRequest::new(Some(2), Some(4));
        assert_eq!(req.window(&rows), &[4, 5, 6, 7]);

        let req = PageRequest::new(Some(3), Some(4));
        assert_eq!(req.window(&rows), &[8, 9]);
    }

    #[test]
    fn test_standing_order() {
        let mut companies = vec![
            sample_company(3, 1500, 10),
            sample_company(1, 1600, 2),
            sample_company(2, 1500, 10),
            sample_company(4, 1500, 12),
        ];
        companies.sort_by(compare_standing);
        let ids: Vec<i32> = companies.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 4, 2, 3]);

        assert!(ranks_ahead(&companies[0], &companies[1]));
        assert!(!ranks_ahead(&companies[1], &companies[0]));
        assert!(!ranks_ahead(&companies[2], &companies[2]));
    }

    #[test]
    fn test_company_page_ranks() {
        let rows = vec![sample_company(1, 1600, 0), sample_company(2, 1500, 0)];
        let page = company_page(rows, 12, PageRequest::new(Some(2), Some(10)));
        assert_eq!(page.total_count, 12);
        assert_eq!(page.page, 2);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.companies[0].rank, Some(11));
        assert_eq!(page.companies[1].rank, Some(12));
    }

    #[test]
    fn test_page_beyond_end_keeps_total() {
        let page = company_page(vec![], 10, PageRequest::new(Some(1000), Some(25)));
        assert!(page.companies.is_empty());
        assert_eq!(page.total_count, 10);
    }

    #[test]
    fn test_user_page_ranks() {
        let rows = vec![("alice".to_string(), 9), ("bob".to_string(), 4)];
        let page = user_page(rows, 2, PageRequest::default());
        assert_eq!(page.users[0].rank, 1);
        assert_eq!(page.users[1].user_id, "bob");
        assert_eq!(page.users[1].rank, 2);
    }

    #[test]
    fn test_assign_ranks() {
        let ranked = assign_ranks(vec![sample_company(1, 1, 0), sample_company(2, 0, 0)], 1);
        assert_eq!(ranked[0].rank, Some(1));
        assert_eq!(ranked[1].rank, Some(2));
    }
}
