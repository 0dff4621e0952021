//! Entity storage interface and implementations
//!
//! The store owns every durable row: companies, votes, criterion ratings and
//! comments. Reads return rows already in leaderboard order where order
//! matters; the one compound write, applying a vote's rating change, is
//! atomic inside the store.

pub mod memory;
pub mod postgres;

use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::rating::{RatingCalculator, RatingUpdate};
use crate::types::{
    AggregatedRating, CategoryCount, CategoryFilter, Comment, CommentId, Company, CompanyId,
    CompanyQuery, CriterionRating, NewComment, NewCompany, NewRating, NewVote, PlatformStats, Vote,
};

pub use memory::InMemoryEntityStore;
pub use postgres::PgEntityStore;

/// Errors raised by store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The named row does not exist
    #[error("{0} not found")]
    NotFound(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Both rows after a vote's rating change was committed
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub winner: Company,
    pub loser: Company,
    pub update: RatingUpdate,
}

/// Trait for entity storage operations
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Cheap round trip used by health checks
    async fn ping(&self) -> StoreResult<()>;

    /// Create a company, or return the existing row when the slug is taken
    async fn insert_company(&self, company: NewCompany) -> StoreResult<Company>;

    /// Companies matching the query, in leaderboard order
    async fn list_companies(&self, query: &CompanyQuery) -> StoreResult<Vec<Company>>;

    async fn company_by_slug(&self, slug: &str) -> StoreResult<Option<Company>>;

    async fn company_exists(&self, id: CompanyId) -> StoreResult<bool>;

    /// Number of companies ordered strictly ahead of `company`
    async fn companies_ahead_of(&self, company: &Company) -> StoreResult<i64>;

    /// Every company eligible for a matchup under the filter
    async fn matchup_candidates(&self, filter: &CategoryFilter) -> StoreResult<Vec<Company>>;

    /// One window of the leaderboard, in leaderboard order
    async fn leaderboard_window(
        &self,
        filter: &CategoryFilter,
        limit: u32,
        offset: u64,
    ) -> StoreResult<Vec<Company>>;

    async fn count_companies(&self, filter: &CategoryFilter) -> StoreResult<i64>;

    /// Read both ratings, compute the update and write both rows as one
    /// atomic step. Fails with `NotFound` when either company is missing.
    async fn apply_match_result(
        &self,
        winner_id: CompanyId,
        loser_id: CompanyId,
        calculator: &dyn RatingCalculator,
    ) -> StoreResult<MatchResult>;

    /// Append a vote to the audit log
    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote>;

    async fn insert_rating(&self, rating: NewRating) -> StoreResult<CriterionRating>;

    /// Average score and count per criterion
    async fn aggregated_ratings(&self, company_id: CompanyId) -> StoreResult<Vec<AggregatedRating>>;

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment>;

    /// Most upvoted first, then newest first
    async fn comments_for(&self, company_id: CompanyId, limit: u32) -> StoreResult<Vec<Comment>>;

    /// Increment a comment's upvotes; `None` when it does not exist
    async fn upvote_comment(&self, id: CommentId) -> StoreResult<Option<Comment>>;

    /// Companies per category, largest first
    async fn category_counts(&self) -> StoreResult<Vec<CategoryCount>>;

    async fn platform_stats(&self) -> StoreResult<PlatformStats>;

    /// `(user_id, votes cast)` for identified voters, most votes first
    async fn voter_window(&self, limit: u32, offset: u64) -> StoreResult<Vec<(String, i64)>>;

    async fn count_voters(&self) -> StoreResult<i64>;
}

/// Load companies from a JSON array of `NewCompany` objects
pub async fn seed_from_file(store: &dyn EntityStore, path: impl AsRef<Path>) -> anyhow::Result<usize> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    let companies: Vec<NewCompany> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse seed file {}", path.display()))?;

    let count = companies.len();
    for company in companies {
        let slug = company.slug.clone();
        store
            .insert_company(company)
            .await
            .with_context(|| format!("Failed to seed company {}", slug))?;
    }

    info!("Seeded {} companies from {}", count, path.display());
    Ok(count)
}
