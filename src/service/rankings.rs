//! Request orchestration for the ranking engine
//!
//! `RankingService` is what the HTTP handlers call. Each operation validates
//! its input before touching the store, bounds every store call with the
//! configured timeout, and folds lower-layer failures into `RankingError`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::auth::{bearer_credential, IdentityVerifier};
use crate::error::{RankingError, Result};
use crate::leaderboard::{assign_ranks, company_page, user_page, PageRequest};
use crate::matchup::MatchupSelector;
use crate::metrics::MetricsCollector;
use crate::rating::RatingCalculator;
use crate::store::{EntityStore, StoreError, StoreResult};
use crate::types::{
    AggregatedRating, CategoryCount, CategoryFilter, Comment, CommentRequest, Company,
    CompanyQuery, Criterion, CriterionRating, LeaderboardPage, Matchup, NewComment, NewRating,
    NewVote, PlatformStats, RatingRequest, UserLeaderboardPage, VoteOutcome, VoteRequest,
};
use crate::utils::normalize_session_id;

pub const MIN_SCORE: i32 = 1;
pub const MAX_SCORE: i32 = 5;
pub const MAX_COMMENT_CHARS: usize = 2000;
/// Most comments returned for one company
pub const COMMENT_LIST_LIMIT: u32 = 100;

/// Voting, ranking and feedback operations
pub struct RankingService {
    store: Arc<dyn EntityStore>,
    calculator: Arc<dyn RatingCalculator>,
    verifier: Arc<dyn IdentityVerifier>,
    selector: MatchupSelector,
    metrics: Arc<MetricsCollector>,
    store_timeout: Duration,
}

impl RankingService {
    pub fn new(
        store: Arc<dyn EntityStore>,
        calculator: Arc<dyn RatingCalculator>,
        verifier: Arc<dyn IdentityVerifier>,
        metrics: Arc<MetricsCollector>,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            calculator,
            verifier,
            selector: MatchupSelector::new(),
            metrics,
            store_timeout,
        }
    }

    pub fn store(&self) -> Arc<dyn EntityStore> {
        self.store.clone()
    }

    /// All companies matching the filters, ranked in leaderboard order
    pub async fn list_companies(
        &self,
        category: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<Company>> {
        let query = CompanyQuery::new(category, search);
        let rows = self
            .store_call("list companies", self.store.list_companies(&query))
            .await?;
        debug!("Listed {} companies", rows.len());
        Ok(assign_ranks(rows, 1))
    }

    /// One company with its current leaderboard rank
    pub async fn get_company(&self, slug: &str) -> Result<Company> {
        let company = self.find_company(slug).await?;
        let ahead = self
            .store_call("rank company", self.store.companies_ahead_of(&company))
            .await?;
        let rank = u32::try_from(ahead.saturating_add(1)).unwrap_or(u32::MAX);
        Ok(company.with_rank(rank))
    }

    /// Two random companies for the next vote
    pub async fn get_matchup(&self, category: Option<&str>) -> Result<Matchup> {
        let filter = CategoryFilter::from_param(category);
        let candidates = self
            .store_call("load matchup candidates", self.store.matchup_candidates(&filter))
            .await?;

        let matchup = self.selector.select(candidates, &filter)?;
        self.metrics.record_matchup_served();
        Ok(matchup)
    }

    /// Apply a pairwise vote.
    ///
    /// The rating change commits atomically in the store. The audit row is
    /// written afterwards; if that insert fails the ratings stay applied and
    /// the failure is only logged and counted.
    pub async fn submit_vote(
        &self,
        request: VoteRequest,
        authorization: Option<&str>,
    ) -> Result<VoteOutcome> {
        if request.winner_id == request.loser_id {
            self.metrics.record_vote_rejected("self_match");
            return Err(RankingError::invalid_argument(
                "Winner and loser must be different",
            ));
        }

        let user_id = self.identify(authorization).await;
        let session_id = normalize_session_id(request.session_id);

        let result = self
            .store_call(
                "apply vote",
                self.store.apply_match_result(
                    request.winner_id,
                    request.loser_id,
                    self.calculator.as_ref(),
                ),
            )
            .await
            .inspect_err(|e| {
                if matches!(e, RankingError::NotFound { .. }) {
                    self.metrics.record_vote_rejected("unknown_company");
                }
            })?;
        self.metrics.record_vote(&result.update);

        let audit = NewVote {
            winner_id: request.winner_id,
            loser_id: request.loser_id,
            session_id,
            user_id,
        };
        if let Err(e) = self
            .with_timeout("record vote", self.store.insert_vote(audit))
            .await
        {
            warn!(
                "Vote {} > {} applied but audit insert failed: {}",
                request.winner_id, request.loser_id, e
            );
            self.metrics.record_audit_failure();
        }

        info!(
            "Vote applied: {} ({:+}) beat {} ({:+})",
            result.winner.slug, result.update.winner_delta, result.loser.slug, result.update.loser_delta
        );

        Ok(VoteOutcome {
            winner: result.winner,
            loser: result.loser,
            winner_delta: result.update.winner_delta,
            loser_delta: result.update.loser_delta,
        })
    }

    /// One page of the company leaderboard
    pub async fn leaderboard(
        &self,
        category: Option<&str>,
        page: PageRequest,
    ) -> Result<LeaderboardPage> {
        let filter = CategoryFilter::from_param(category);
        let rows = self
            .store_call(
                "load leaderboard",
                self.store
                    .leaderboard_window(&filter, page.limit(), page.offset()),
            )
            .await?;
        let total = self
            .store_call("count companies", self.store.count_companies(&filter))
            .await?;
        Ok(company_page(rows, total, page))
    }

    /// One page of identified voters ranked by votes cast
    pub async fn user_leaderboard(&self, page: PageRequest) -> Result<UserLeaderboardPage> {
        let rows = self
            .store_call(
                "load user leaderboard",
                self.store.voter_window(page.limit(), page.offset()),
            )
            .await?;
        let total = self
            .store_call("count voters", self.store.count_voters())
            .await?;
        Ok(user_page(rows, total, page))
    }

    pub async fn submit_rating(&self, request: RatingRequest) -> Result<CriterionRating> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&request.score) {
            return Err(RankingError::invalid_argument(
                "Score must be between 1 and 5",
            ));
        }
        let criterion: Criterion = request.criterion.parse()?;
        self.require_company(request.company_id).await?;

        let rating = self
            .store_call(
                "submit rating",
                self.store.insert_rating(NewRating {
                    company_id: request.company_id,
                    criterion,
                    score: request.score,
                    session_id: normalize_session_id(request.session_id),
                }),
            )
            .await?;
        self.metrics.record_feedback("rating");
        Ok(rating)
    }

    /// Average score per criterion for one company
    pub async fn company_ratings(&self, slug: &str) -> Result<Vec<AggregatedRating>> {
        let company = self.find_company(slug).await?;
        self.store_call("load ratings", self.store.aggregated_ratings(company.id))
            .await
    }

    pub async fn submit_comment(&self, request: CommentRequest) -> Result<Comment> {
        let content = request.content.trim();
        if content.is_empty() {
            return Err(RankingError::invalid_argument("Content is required"));
        }
        if content.chars().count() > MAX_COMMENT_CHARS {
            return Err(RankingError::invalid_argument(
                "Content too long (max 2000 characters)",
            ));
        }
        self.require_company(request.company_id).await?;

        let comment = self
            .store_call(
                "submit comment",
                self.store.insert_comment(NewComment {
                    company_id: request.company_id,
                    content: content.to_string(),
                    is_current_employee: request.is_current_employee,
                    session_id: normalize_session_id(request.session_id),
                }),
            )
            .await?;
        self.metrics.record_feedback("comment");
        Ok(comment)
    }

    pub async fn company_comments(&self, slug: &str) -> Result<Vec<Comment>> {
        let company = self.find_company(slug).await?;
        self.store_call(
            "load comments",
            self.store.comments_for(company.id, COMMENT_LIST_LIMIT),
        )
        .await
    }

    /// Add one upvote. `id` is the raw path segment.
    pub async fn upvote_comment(&self, id: &str) -> Result<Comment> {
        let id = id
            .trim()
            .parse()
            .map_err(|_| RankingError::invalid_argument("Invalid comment ID"))?;

        let comment = self
            .store_call("upvote comment", self.store.upvote_comment(id))
            .await?
            .ok_or_else(|| RankingError::not_found("Comment not found"))?;
        self.metrics.record_feedback("upvote");
        Ok(comment)
    }

    pub async fn categories(&self) -> Result<Vec<CategoryCount>> {
        self.store_call("load categories", self.store.category_counts())
            .await
    }

    pub async fn stats(&self) -> Result<PlatformStats> {
        self.store_call("load stats", self.store.platform_stats())
            .await
    }

    async fn find_company(&self, slug: &str) -> Result<Company> {
        self.store_call("load company", self.store.company_by_slug(slug))
            .await?
            .ok_or_else(|| RankingError::not_found("Company not found"))
    }

    async fn require_company(&self, id: i32) -> Result<()> {
        if self
            .store_call("check company", self.store.company_exists(id))
            .await?
        {
            Ok(())
        } else {
            Err(RankingError::not_found("Company not found"))
        }
    }

    /// Resolve the voter from an optional `Authorization` header. Problems are
    /// logged and the vote proceeds anonymously.
    async fn identify(&self, authorization: Option<&str>) -> Option<String> {
        let credential = match bearer_credential(authorization) {
            Ok(Some(credential)) => credential,
            Ok(None) => return None,
            Err(e) => {
                warn!("Ignoring authorization header: {}", e);
                return None;
            }
        };

        match self.verifier.verify(credential).await {
            Ok(subject) => Some(subject.subject),
            Err(e) => {
                warn!("Voter credential rejected, recording vote anonymously: {}", e);
                None
            }
        }
    }

    async fn with_timeout<T, F>(&self, operation: &str, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                self.metrics.record_store_timeout(operation);
                Err(StoreError::Timeout(self.store_timeout))
            }
        }
    }

    async fn store_call<T, F>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        self.with_timeout(operation, call)
            .await
            .map_err(|e| RankingError::from_store(operation, e))
    }
}
