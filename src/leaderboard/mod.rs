//! Leaderboard ordering and pagination

pub mod paginator;

pub use paginator::{
    assign_ranks, company_page, compare_standing, ranks_ahead, user_page, PageRequest,
    DEFAULT_PAGE, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
