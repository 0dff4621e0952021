//! In-memory entity store
//!
//! All tables live behind one `RwLock`. Every write, including the vote's
//! read-compute-write cycle, runs under a single write guard, so concurrent
//! votes are serialized. The lock is never held across an await point.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{EntityStore, MatchResult, StoreError, StoreResult};
use crate::leaderboard::{compare_standing, ranks_ahead};
use crate::rating::RatingCalculator;
use crate::types::{
    AggregatedRating, CategoryCount, CategoryFilter, Comment, CommentId, Company, CompanyId,
    CompanyQuery, Criterion, CriterionRating, NewComment, NewCompany, NewRating, NewVote,
    PlatformStats, Vote,
};
use crate::utils::current_timestamp;

#[derive(Debug, Default)]
struct Tables {
    companies: BTreeMap<CompanyId, Company>,
    votes: Vec<Vote>,
    ratings: Vec<CriterionRating>,
    comments: BTreeMap<CommentId, Comment>,
    next_company_id: i32,
    next_vote_id: i32,
    next_rating_id: i32,
    next_comment_id: i32,
}

impl Tables {
    fn next_id(counter: &mut i32) -> i32 {
        *counter += 1;
        *counter
    }

    fn sorted_companies<'a>(&'a self, filter: impl Fn(&Company) -> bool) -> Vec<&'a Company> {
        let mut rows: Vec<&Company> = self.companies.values().filter(|c| filter(c)).collect();
        rows.sort_by(|a, b| compare_standing(a, b));
        rows
    }
}

/// In-memory entity store implementation
#[derive(Debug)]
pub struct InMemoryEntityStore {
    tables: RwLock<Tables>,
    initial_rating: i32,
}

impl InMemoryEntityStore {
    /// Create an empty store; new companies start at `initial_rating`
    pub fn new(initial_rating: i32) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            initial_rating,
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("Failed to acquire tables read lock".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("Failed to acquire tables write lock".to_string()))
    }

    /// Number of recorded votes (for tests and diagnostics)
    pub fn vote_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.votes.len())
    }
}

impl Default for InMemoryEntityStore {
    fn default() -> Self {
        Self::new(crate::rating::elo::DEFAULT_INITIAL_RATING)
    }
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn ping(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }

    async fn insert_company(&self, company: NewCompany) -> StoreResult<Company> {
        let mut tables = self.write()?;

        if let Some(existing) = tables.companies.values().find(|c| c.slug == company.slug) {
            return Ok(existing.clone());
        }

        let id = Tables::next_id(&mut tables.next_company_id);
        let now = current_timestamp();
        let row = Company {
            id,
            name: company.name,
            slug: company.slug,
            logo_url: company.logo_url,
            description: company.description,
            website: company.website,
            category: company.category,
            tags: company.tags,
            founded_year: company.founded_year,
            hq_location: company.hq_location,
            employee_range: company.employee_range,
            funding_stage: company.funding_stage,
            elo_rating: company.elo_rating.unwrap_or(self.initial_rating),
            total_votes: 0,
            wins: 0,
            losses: 0,
            rank: None,
            created_at: now,
            updated_at: now,
        };
        tables.companies.insert(id, row.clone());
        Ok(row)
    }

    async fn list_companies(&self, query: &CompanyQuery) -> StoreResult<Vec<Company>> {
        let tables = self.read()?;
        Ok(tables
            .sorted_companies(|c| query.matches(c))
            .into_iter()
            .cloned()
            .collect())
    }

    async fn company_by_slug(&self, slug: &str) -> StoreResult<Option<Company>> {
        let tables = self.read()?;
        Ok(tables.companies.values().find(|c| c.slug == slug).cloned())
    }

    async fn company_exists(&self, id: CompanyId) -> StoreResult<bool> {
        Ok(self.read()?.companies.contains_key(&id))
    }

    async fn companies_ahead_of(&self, company: &Company) -> StoreResult<i64> {
        let tables = self.read()?;
        Ok(tables
            .companies
            .values()
            .filter(|other| ranks_ahead(other, company))
            .count() as i64)
    }

    async fn matchup_candidates(&self, filter: &CategoryFilter) -> StoreResult<Vec<Company>> {
        let tables = self.read()?;
        Ok(tables
            .companies
            .values()
            .filter(|c| filter.matches(&c.category))
            .cloned()
            .collect())
    }

    async fn leaderboard_window(
        &self,
        filter: &CategoryFilter,
        limit: u32,
        offset: u64,
    ) -> StoreResult<Vec<Company>> {
        let tables = self.read()?;
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(tables
            .sorted_companies(|c| filter.matches(&c.category))
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_companies(&self, filter: &CategoryFilter) -> StoreResult<i64> {
        let tables = self.read()?;
        Ok(tables
            .companies
            .values()
            .filter(|c| filter.matches(&c.category))
            .count() as i64)
    }

    async fn apply_match_result(
        &self,
        winner_id: CompanyId,
        loser_id: CompanyId,
        calculator: &dyn RatingCalculator,
    ) -> StoreResult<MatchResult> {
        let mut tables = self.write()?;

        let winner_rating = tables
            .companies
            .get(&winner_id)
            .map(|c| c.elo_rating)
            .ok_or_else(|| StoreError::NotFound("Winner company".to_string()))?;
        let loser_rating = tables
            .companies
            .get(&loser_id)
            .map(|c| c.elo_rating)
            .ok_or_else(|| StoreError::NotFound("Loser company".to_string()))?;

        let update = calculator.compute_update(winner_rating, loser_rating);
        let now = current_timestamp();

        let winner = tables
            .companies
            .get_mut(&winner_id)
            .ok_or_else(|| StoreError::NotFound("Winner company".to_string()))?;
        winner.elo_rating = update.new_winner_rating;
        winner.total_votes += 1;
        winner.wins += 1;
        winner.updated_at = now;
        let winner = winner.clone();

        let loser = tables
            .companies
            .get_mut(&loser_id)
            .ok_or_else(|| StoreError::NotFound("Loser company".to_string()))?;
        loser.elo_rating = update.new_loser_rating;
        loser.total_votes += 1;
        loser.losses += 1;
        loser.updated_at = now;
        let loser = loser.clone();

        Ok(MatchResult {
            winner,
            loser,
            update,
        })
    }

    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        let mut tables = self.write()?;
        let row = Vote {
            id: Tables::next_id(&mut tables.next_vote_id),
            winner_id: vote.winner_id,
            loser_id: vote.loser_id,
            session_id: vote.session_id,
            user_id: vote.user_id,
            created_at: current_timestamp(),
        };
        tables.votes.push(row.clone());
        Ok(row)
    }

    async fn insert_rating(&self, rating: NewRating) -> StoreResult<CriterionRating> {
        let mut tables = self.write()?;
        if !tables.companies.contains_key(&rating.company_id) {
            return Err(StoreError::NotFound("Company".to_string()));
        }
        let row = CriterionRating {
            id: Tables::next_id(&mut tables.next_rating_id),
            company_id: rating.company_id,
            criterion: rating.criterion,
            score: rating.score,
            session_id: rating.session_id,
            created_at: current_timestamp(),
        };
        tables.ratings.push(row.clone());
        Ok(row)
    }

    async fn aggregated_ratings(&self, company_id: CompanyId) -> StoreResult<Vec<AggregatedRating>> {
        let tables = self.read()?;
        let mut sums: BTreeMap<Criterion, (i64, i64)> = BTreeMap::new();
        for rating in tables.ratings.iter().filter(|r| r.company_id == company_id) {
            let entry = sums.entry(rating.criterion).or_insert((0, 0));
            entry.0 += rating.score as i64;
            entry.1 += 1;
        }

        Ok(sums
            .into_iter()
            .map(|(criterion, (sum, count))| AggregatedRating {
                criterion,
                average_score: sum as f64 / count as f64,
                total_ratings: count,
            })
            .collect())
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        let mut tables = self.write()?;
        if !tables.companies.contains_key(&comment.company_id) {
            return Err(StoreError::NotFound("Company".to_string()));
        }
        let id = Tables::next_id(&mut tables.next_comment_id);
        let row = Comment {
            id,
            company_id: comment.company_id,
            content: comment.content,
            is_current_employee: comment.is_current_employee,
            session_id: comment.session_id,
            upvotes: 0,
            created_at: current_timestamp(),
        };
        tables.comments.insert(id, row.clone());
        Ok(row)
    }

    async fn comments_for(&self, company_id: CompanyId, limit: u32) -> StoreResult<Vec<Comment>> {
        let tables = self.read()?;
        let mut rows: Vec<&Comment> = tables
            .comments
            .values()
            .filter(|c| c.company_id == company_id)
            .collect();
        rows.sort_by(|a, b| {
            b.upvotes
                .cmp(&a.upvotes)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(rows.into_iter().take(limit as usize).cloned().collect())
    }

    async fn upvote_comment(&self, id: CommentId) -> StoreResult<Option<Comment>> {
        let mut tables = self.write()?;
        Ok(tables.comments.get_mut(&id).map(|comment| {
            comment.upvotes += 1;
            comment.clone()
        }))
    }

    async fn category_counts(&self) -> StoreResult<Vec<CategoryCount>> {
        let tables = self.read()?;
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for company in tables.companies.values() {
            *counts.entry(company.category.as_str()).or_insert(0) += 1;
        }

        let mut rows: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));
        Ok(rows)
    }

    async fn platform_stats(&self) -> StoreResult<PlatformStats> {
        let tables = self.read()?;
        let mut categories: Vec<String> = tables
            .companies
            .values()
            .map(|c| c.category.clone())
            .collect();
        categories.sort();
        categories.dedup();

        Ok(PlatformStats {
            total_companies: tables.companies.len() as i64,
            total_votes: tables.votes.len() as i64,
            total_ratings: tables.ratings.len() as i64,
            total_comments: tables.comments.len() as i64,
            categories,
        })
    }

    async fn voter_window(&self, limit: u32, offset: u64) -> StoreResult<Vec<(String, i64)>> {
        let tables = self.read()?;
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for user_id in tables.votes.iter().filter_map(|v| v.user_id.as_deref()) {
            *counts.entry(user_id).or_insert(0) += 1;
        }

        let mut rows: Vec<(String, i64)> = counts
            .into_iter()
            .map(|(user, votes)| (user.to_string(), votes))
            .collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit as usize).collect())
    }

    async fn count_voters(&self) -> StoreResult<i64> {
        let tables = self.read()?;
        let mut voters: Vec<&str> = tables
            .votes
            .iter()
            .filter_map(|v| v.user_id.as_deref())
            .collect();
        voters.sort_unstable();
        voters.dedup();
        Ok(voters.len() as i64)
    }
}
