//! PostgreSQL entity store
//!
//! Every query is parameterized. The vote update locks both company rows
//! (`SELECT ... FOR UPDATE`, ordered by id so concurrent votes on the same
//! pair cannot deadlock) and writes them in one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, warn};

use super::{EntityStore, MatchResult, StoreError, StoreResult};
use crate::config::StoreSettings;
use crate::rating::RatingCalculator;
use crate::types::{
    AggregatedRating, CategoryCount, CategoryFilter, Comment, CommentId, Company, CompanyId,
    CompanyQuery, Criterion, CriterionRating, NewComment, NewCompany, NewRating, NewVote,
    PlatformStats, Vote,
};

const SCHEMA: &str = include_str!("schema.sql");

macro_rules! company_columns {
    () => {
        "id, name, slug, logo_url, description, website, category, tags, founded_year, \
         hq_location, employee_range, funding_stage, elo_rating, total_votes, wins, losses, \
         created_at, updated_at"
    };
}

macro_rules! comment_columns {
    () => {
        "id, company_id, content, is_current_employee, session_id, upvotes, created_at"
    };
}

macro_rules! standing_order {
    () => {
        " ORDER BY elo_rating DESC, total_votes DESC, id ASC"
    };
}

const INSERT_COMPANY: &str = concat!(
    "INSERT INTO companies (name, slug, logo_url, description, website, category, tags, \
     founded_year, hq_location, employee_range, funding_stage, elo_rating) \
     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
     ON CONFLICT (slug) DO UPDATE SET slug = EXCLUDED.slug \
     RETURNING ",
    company_columns!()
);

const LIST_COMPANIES: &str = concat!(
    "SELECT ",
    company_columns!(),
    " FROM companies \
     WHERE ($1::text IS NULL OR category = $1) \
       AND ($2::text IS NULL OR LOWER(name) LIKE $2 OR LOWER(COALESCE(description, '')) LIKE $2)",
    standing_order!()
);

const COMPANY_BY_SLUG: &str = concat!("SELECT ", company_columns!(), " FROM companies WHERE slug = $1");

const MATCHUP_CANDIDATES: &str = concat!(
    "SELECT ",
    company_columns!(),
    " FROM companies WHERE ($1::text IS NULL OR category = $1)"
);

const LEADERBOARD_WINDOW: &str = concat!(
    "SELECT ",
    company_columns!(),
    " FROM companies WHERE ($1::text IS NULL OR category = $1)",
    standing_order!(),
    " LIMIT $2 OFFSET $3"
);

const RECORD_WIN: &str = concat!(
    "UPDATE companies SET elo_rating = $1, total_votes = total_votes + 1, wins = wins + 1, \
     updated_at = NOW() WHERE id = $2 RETURNING ",
    company_columns!()
);

const RECORD_LOSS: &str = concat!(
    "UPDATE companies SET elo_rating = $1, total_votes = total_votes + 1, losses = losses + 1, \
     updated_at = NOW() WHERE id = $2 RETURNING ",
    company_columns!()
);

const INSERT_COMMENT: &str = concat!(
    "INSERT INTO company_comments (company_id, content, is_current_employee, session_id) \
     VALUES ($1, $2, $3, $4) RETURNING ",
    comment_columns!()
);

const COMMENTS_FOR: &str = concat!(
    "SELECT ",
    comment_columns!(),
    " FROM company_comments WHERE company_id = $1 \
     ORDER BY upvotes DESC, created_at DESC, id DESC LIMIT $2"
);

const UPVOTE_COMMENT: &str = concat!(
    "UPDATE company_comments SET upvotes = upvotes + 1 WHERE id = $1 RETURNING ",
    comment_columns!()
);

#[derive(Debug, FromRow)]
struct CompanyRow {
    id: i32,
    name: String,
    slug: String,
    logo_url: Option<String>,
    description: Option<String>,
    website: Option<String>,
    category: String,
    tags: Vec<String>,
    founded_year: Option<i32>,
    hq_location: Option<String>,
    employee_range: Option<String>,
    funding_stage: Option<String>,
    elo_rating: i32,
    total_votes: i32,
    wins: i32,
    losses: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            logo_url: row.logo_url,
            description: row.description,
            website: row.website,
            category: row.category,
            tags: row.tags,
            founded_year: row.founded_year,
            hq_location: row.hq_location,
            employee_range: row.employee_range,
            funding_stage: row.funding_stage,
            elo_rating: row.elo_rating,
            total_votes: row.total_votes,
            wins: row.wins,
            losses: row.losses,
            rank: None,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: i32,
    company_id: i32,
    content: String,
    is_current_employee: bool,
    session_id: Option<String>,
    upvotes: i32,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            company_id: row.company_id,
            content: row.content,
            is_current_employee: row.is_current_employee,
            session_id: row.session_id,
            upvotes: row.upvotes,
            created_at: row.created_at,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Row".to_string()),
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                StoreError::NotFound("Referenced company".to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

/// Escape LIKE wildcards so user search text matches literally
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// PostgreSQL-backed entity store
#[derive(Debug, Clone)]
pub struct PgEntityStore {
    pool: PgPool,
    initial_rating: i32,
}

impl PgEntityStore {
    /// Connect a pool sized and bounded by the store settings
    pub async fn connect(settings: &StoreSettings, initial_rating: i32) -> StoreResult<Self> {
        let url = settings
            .database_url
            .as_deref()
            .ok_or_else(|| StoreError::Unavailable("no database URL configured".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(Duration::from_millis(settings.operation_timeout_ms))
            .connect(url)
            .await?;
        info!(
            "Connected to PostgreSQL (max {} connections)",
            settings.max_connections
        );
        Ok(Self::from_pool(pool, initial_rating))
    }

    pub fn from_pool(pool: PgPool, initial_rating: i32) -> Self {
        Self {
            pool,
            initial_rating,
        }
    }

    /// Create tables and indexes when missing
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        info!("Database schema is up to date");
        Ok(())
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_company(&self, company: NewCompany) -> StoreResult<Company> {
        let row: CompanyRow = sqlx::query_as(INSERT_COMPANY)
            .bind(&company.name)
            .bind(&company.slug)
            .bind(&company.logo_url)
            .bind(&company.description)
            .bind(&company.website)
            .bind(&company.category)
            .bind(&company.tags)
            .bind(company.founded_year)
            .bind(&company.hq_location)
            .bind(&company.employee_range)
            .bind(&company.funding_stage)
            .bind(company.elo_rating.unwrap_or(self.initial_rating))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn list_companies(&self, query: &CompanyQuery) -> StoreResult<Vec<Company>> {
        let rows: Vec<CompanyRow> = sqlx::query_as(LIST_COMPANIES)
            .bind(query.category.category())
            .bind(query.search.as_deref().map(like_pattern))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Company::from).collect())
    }

    async fn company_by_slug(&self, slug: &str) -> StoreResult<Option<Company>> {
        let row: Option<CompanyRow> = sqlx::query_as(COMPANY_BY_SLUG)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Company::from))
    }

    async fn company_exists(&self, id: CompanyId) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM companies WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn companies_ahead_of(&self, company: &Company) -> StoreResult<i64> {
        let ahead: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM companies \
             WHERE elo_rating > $1 \
                OR (elo_rating = $1 AND total_votes > $2) \
                OR (elo_rating = $1 AND total_votes = $2 AND id < $3)",
        )
        .bind(company.elo_rating)
        .bind(company.total_votes)
        .bind(company.id)
        .fetch_one(&self.pool)
        .await?;
        Ok(ahead)
    }

    async fn matchup_candidates(&self, filter: &CategoryFilter) -> StoreResult<Vec<Company>> {
        let rows: Vec<CompanyRow> = sqlx::query_as(MATCHUP_CANDIDATES)
            .bind(filter.category())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Company::from).collect())
    }

    async fn leaderboard_window(
        &self,
        filter: &CategoryFilter,
        limit: u32,
        offset: u64,
    ) -> StoreResult<Vec<Company>> {
        let rows: Vec<CompanyRow> = sqlx::query_as(LEADERBOARD_WINDOW)
            .bind(filter.category())
            .bind(i64::from(limit))
            .bind(to_i64(offset))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Company::from).collect())
    }

    async fn count_companies(&self, filter: &CategoryFilter) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM companies WHERE ($1::text IS NULL OR category = $1)")
                .bind(filter.category())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn apply_match_result(
        &self,
        winner_id: CompanyId,
        loser_id: CompanyId,
        calculator: &dyn RatingCalculator,
    ) -> StoreResult<MatchResult> {
        let mut tx = self.pool.begin().await?;

        let locked: Vec<(i32, i32)> = sqlx::query_as(
            "SELECT id, elo_rating FROM companies WHERE id = ANY($1) ORDER BY id FOR UPDATE",
        )
        .bind(vec![winner_id, loser_id])
        .fetch_all(&mut *tx)
        .await?;

        let rating_of = |id: CompanyId| locked.iter().find(|(row_id, _)| *row_id == id).map(|(_, r)| *r);
        let winner_rating =
            rating_of(winner_id).ok_or_else(|| StoreError::NotFound("Winner company".to_string()))?;
        let loser_rating =
            rating_of(loser_id).ok_or_else(|| StoreError::NotFound("Loser company".to_string()))?;

        let update = calculator.compute_update(winner_rating, loser_rating);

        let winner: CompanyRow = sqlx::query_as(RECORD_WIN)
            .bind(update.new_winner_rating)
            .bind(winner_id)
            .fetch_one(&mut *tx)
            .await?;
        let loser: CompanyRow = sqlx::query_as(RECORD_LOSS)
            .bind(update.new_loser_rating)
            .bind(loser_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(MatchResult {
            winner: winner.into(),
            loser: loser.into(),
            update,
        })
    }

    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        let (id, created_at): (i32, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO votes (winner_id, loser_id, session_id, user_id) \
             VALUES ($1, $2, $3, $4) RETURNING id, created_at",
        )
        .bind(vote.winner_id)
        .bind(vote.loser_id)
        .bind(&vote.session_id)
        .bind(&vote.user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Vote {
            id,
            winner_id: vote.winner_id,
            loser_id: vote.loser_id,
            session_id: vote.session_id,
            user_id: vote.user_id,
            created_at,
        })
    }

    async fn insert_rating(&self, rating: NewRating) -> StoreResult<CriterionRating> {
        let (id, created_at): (i32, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO company_ratings (company_id, criterion, score, session_id) \
             VALUES ($1, $2, $3, $4) RETURNING id, created_at",
        )
        .bind(rating.company_id)
        .bind(rating.criterion.as_str())
        .bind(rating.score)
        .bind(&rating.session_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(CriterionRating {
            id,
            company_id: rating.company_id,
            criterion: rating.criterion,
            score: rating.score,
            session_id: rating.session_id,
            created_at,
        })
    }

    async fn aggregated_ratings(&self, company_id: CompanyId) -> StoreResult<Vec<AggregatedRating>> {
        let rows: Vec<(String, f64, i64)> = sqlx::query_as(
            "SELECT criterion, AVG(score)::float8, COUNT(*) FROM company_ratings \
             WHERE company_id = $1 GROUP BY criterion ORDER BY criterion",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(criterion, average_score, total_ratings)| {
                match criterion.parse::<Criterion>() {
                    Ok(criterion) => Some(AggregatedRating {
                        criterion,
                        average_score,
                        total_ratings,
                    }),
                    Err(_) => {
                        warn!("Skipping unknown criterion {:?} for company {}", criterion, company_id);
                        None
                    }
                }
            })
            .collect())
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let row: CommentRow = sqlx::query_as(INSERT_COMMENT)
            .bind(comment.company_id)
            .bind(&comment.content)
            .bind(comment.is_current_employee)
            .bind(&comment.session_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn comments_for(&self, company_id: CompanyId, limit: u32) -> StoreResult<Vec<Comment>> {
        let rows: Vec<CommentRow> = sqlx::query_as(COMMENTS_FOR)
            .bind(company_id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn upvote_comment(&self, id: CommentId) -> StoreResult<Option<Comment>> {
        let row: Option<CommentRow> = sqlx::query_as(UPVOTE_COMMENT)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Comment::from))
    }

    async fn category_counts(&self) -> StoreResult<Vec<CategoryCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT category, COUNT(*) AS count FROM companies \
             GROUP BY category ORDER BY count DESC, category ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect())
    }

    async fn platform_stats(&self) -> StoreResult<PlatformStats> {
        let (total_companies, total_votes, total_ratings, total_comments): (i64, i64, i64, i64) =
            sqlx::query_as(
                "SELECT (SELECT COUNT(*) FROM companies), (SELECT COUNT(*) FROM votes), \
                        (SELECT COUNT(*) FROM company_ratings), (SELECT COUNT(*) FROM company_comments)",
            )
            .fetch_one(&self.pool)
            .await?;
        let categories: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT category FROM companies ORDER BY category")
                .fetch_all(&self.pool)
                .await?;

        Ok(PlatformStats {
            total_companies,
            total_votes,
            total_ratings,
            total_comments,
            categories,
        })
    }

    async fn voter_window(&self, limit: u32, offset: u64) -> StoreResult<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT user_id, COUNT(*) AS total_votes FROM votes WHERE user_id IS NOT NULL \
             GROUP BY user_id ORDER BY total_votes DESC, user_id ASC LIMIT $1 OFFSET $2",
        )
        .bind(i64::from(limit))
        .bind(to_i64(offset))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_voters(&self) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM votes WHERE user_id IS NOT NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("acme"), "%acme%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_sqlx_error_mapping() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            StoreError::from(sqlx::Error::ColumnNotFound("rank".into())),
            StoreError::Query(_)
        ));
    }

    #[test]
    fn test_queries_keep_standing_order() {
        assert!(LIST_COMPANIES.ends_with(standing_order!()));
        assert!(LEADERBOARD_WINDOW.contains(standing_order!()));
        assert!(SCHEMA.contains("CREATE TABLE IF NOT EXISTS companies"));
    }

    #[test]
    fn test_offset_conversion_saturates() {
        assert_eq!(to_i64(10), 10);
        assert_eq!(to_i64(u64::MAX), i64::MAX);
    }
}
