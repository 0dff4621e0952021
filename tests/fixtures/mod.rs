//! Test fixtures and store doubles for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use clout_rank::api::{create_router, ApiState};
use clout_rank::auth::MockIdentityVerifier;
use clout_rank::config::AppConfig;
use clout_rank::rating::{EloRatingCalculator, RatingCalculator};
use clout_rank::service::AppState;
use clout_rank::store::{EntityStore, InMemoryEntityStore, MatchResult, StoreError, StoreResult};
use clout_rank::types::{
    AggregatedRating, CategoryCount, CategoryFilter, Comment, CommentId, Company, CompanyId,
    CompanyQuery, CriterionRating, NewComment, NewCompany, NewRating, NewVote, PlatformStats, Vote,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Companies loaded into every seeded store: (name, slug, category, rating)
pub const SEED_COMPANIES: [(&str, &str, &str, i32); 5] = [
    ("OpenAI", "openai", "foundation-models", 1500),
    ("Anthropic", "anthropic", "foundation-models", 1500),
    ("Mistral", "mistral", "foundation-models", 1500),
    ("Stripe", "stripe", "fintech", 1500),
    ("Vercel", "vercel", "devtools", 1500),
];

/// Entity store wrapper that records calls and injects failures
pub struct FaultyStore {
    inner: InMemoryEntityStore,
    fail_audit: bool,
    unreachable: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<&'static str>>,
}

impl FaultyStore {
    /// Passes every call through, recording it
    pub fn recording() -> Self {
        Self {
            inner: InMemoryEntityStore::default(),
            fail_audit: false,
            unreachable: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Vote audit inserts fail; everything else works
    pub fn failing_audit() -> Self {
        Self {
            fail_audit: true,
            ..Self::recording()
        }
    }

    /// Every call fails as if the database were down
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::recording()
        }
    }

    /// Every call sleeps before answering
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::recording()
        }
    }

    pub fn inner(&self) -> &InMemoryEntityStore {
        &self.inner
    }

    /// Names of the trait methods called so far
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn clear_calls(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    pub fn was_called(&self, operation: &str) -> bool {
        self.calls().iter().any(|call| *call == operation)
    }

    async fn enter(&self, operation: &'static str) -> StoreResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(operation);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for FaultyStore {
    async fn ping(&self) -> StoreResult<()> {
        self.enter("ping").await?;
        self.inner.ping().await
    }

    async fn insert_company(&self, company: NewCompany) -> StoreResult<Company> {
        self.enter("insert_company").await?;
        self.inner.insert_company(company).await
    }

    async fn list_companies(&self, query: &CompanyQuery) -> StoreResult<Vec<Company>> {
        self.enter("list_companies").await?;
        self.inner.list_companies(query).await
    }

    async fn company_by_slug(&self, slug: &str) -> StoreResult<Option<Company>> {
        self.enter("company_by_slug").await?;
        self.inner.company_by_slug(slug).await
    }

    async fn company_exists(&self, id: CompanyId) -> StoreResult<bool> {
        self.enter("company_exists").await?;
        self.inner.company_exists(id).await
    }

    async fn companies_ahead_of(&self, company: &Company) -> StoreResult<i64> {
        self.enter("companies_ahead_of").await?;
        self.inner.companies_ahead_of(company).await
    }

    async fn matchup_candidates(&self, filter: &CategoryFilter) -> StoreResult<Vec<Company>> {
        self.enter("matchup_candidates").await?;
        self.inner.matchup_candidates(filter).await
    }

    async fn leaderboard_window(
        &self,
        filter: &CategoryFilter,
        limit: u32,
        offset: u64,
    ) -> StoreResult<Vec<Company>> {
        self.enter("leaderboard_window").await?;
        self.inner.leaderboard_window(filter, limit, offset).await
    }

    async fn count_companies(&self, filter: &CategoryFilter) -> StoreResult<i64> {
        self.enter("count_companies").await?;
        self.inner.count_companies(filter).await
    }

    async fn apply_match_result(
        &self,
        winner_id: CompanyId,
        loser_id: CompanyId,
        calculator: &dyn RatingCalculator,
    ) -> StoreResult<MatchResult> {
        self.enter("apply_match_result").await?;
        self.inner
            .apply_match_result(winner_id, loser_id, calculator)
            .await
    }

    async fn insert_vote(&self, vote: NewVote) -> StoreResult<Vote> {
        self.enter("insert_vote").await?;
        if self.fail_audit {
            return Err(StoreError::Query("votes table is read-only".to_string()));
        }
        self.inner.insert_vote(vote).await
    }

    async fn insert_rating(&self, rating: NewRating) -> StoreResult<CriterionRating> {
        self.enter("insert_rating").await?;
        self.inner.insert_rating(rating).await
    }

    async fn aggregated_ratings(&self, company_id: CompanyId) -> StoreResult<Vec<AggregatedRating>> {
        self.enter("aggregated_ratings").await?;
        self.inner.aggregated_ratings(company_id).await
    }

    async fn insert_comment(&self, comment: NewComment) -> StoreResult<Comment> {
        self.enter("insert_comment").await?;
        self.inner.insert_comment(comment).await
    }

    async fn comments_for(&self, company_id: CompanyId, limit: u32) -> StoreResult<Vec<Comment>> {
        self.enter("comments_for").await?;
        self.inner.comments_for(company_id, limit).await
    }

    async fn upvote_comment(&self, id: CommentId) -> StoreResult<Option<Comment>> {
        self.enter("upvote_comment").await?;
        self.inner.upvote_comment(id).await
    }

    async fn category_counts(&self) -> StoreResult<Vec<CategoryCount>> {
        self.enter("category_counts").await?;
        self.inner.category_counts().await
    }

    async fn platform_stats(&self) -> StoreResult<PlatformStats> {
        self.enter("platform_stats").await?;
        self.inner.platform_stats().await
    }

    async fn voter_window(&self, limit: u32, offset: u64) -> StoreResult<Vec<(String, i64)>> {
        self.enter("voter_window").await?;
        self.inner.voter_window(limit, offset).await
    }

    async fn count_voters(&self) -> StoreResult<i64> {
        self.enter("count_voters").await?;
        self.inner.count_voters().await
    }
}

/// Load the standard companies straight into the wrapped store, bypassing
/// failure injection
pub async fn seed(store: &FaultyStore) {
    seed_companies(store.inner()).await;
}

pub async fn seed_companies(store: &InMemoryEntityStore) {
    for (name, slug, category, rating) in SEED_COMPANIES {
        store
            .insert_company(
                NewCompany::new(name, slug, category)
                    .with_rating(rating)
                    .with_tags(["ai"]),
            )
            .await
            .expect("seed company");
    }
}

/// Configuration with short timeouts suitable for tests
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.store.operation_timeout_ms = 200;
    config.server.request_timeout_ms = 2_000;
    config
}

/// Token table used by `test_app`: `good-token` verifies as `alice`
pub fn test_verifier() -> MockIdentityVerifier {
    MockIdentityVerifier::with_tokens(HashMap::from([(
        "good-token".to_string(),
        "alice".to_string(),
    )]))
}

/// Application state over `store` with the default Elo calculator
pub fn test_app(store: Arc<FaultyStore>, config: AppConfig) -> AppState {
    AppState::with_components(
        config,
        store,
        Arc::new(EloRatingCalculator::default()),
        Arc::new(test_verifier()),
    )
    .expect("build app state")
}

/// Router and API state over `store`
pub fn test_router(store: Arc<FaultyStore>, config: AppConfig) -> (axum::Router, ApiState) {
    let app = test_app(store, config);
    let state = app.api_state();
    (create_router(state.clone(), &app.config().server), state)
}
