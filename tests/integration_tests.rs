//! Integration tests for the clout-rank service layer
//!
//! These tests drive `RankingService` end to end against store doubles:
//! - Vote application, audit logging and failure isolation
//! - Concurrent votes on shared companies
//! - Leaderboard pagination and rank assignment
//! - Feedback validation ordering
//! - Health reporting and store timeouts

mod fixtures;

use clout_rank::leaderboard::PageRequest;
use clout_rank::types::{CommentRequest, HealthStatus, RatingRequest, VoteRequest};
use clout_rank::RankingError;
use std::sync::Arc;
use std::time::Duration;

use fixtures::{seed, test_app, test_config, FaultyStore};

fn vote(winner_id: i32, loser_id: i32) -> VoteRequest {
    VoteRequest {
        winner_id,
        loser_id,
        session_id: Some("session-1".to_string()),
    }
}

async fn seeded_store() -> Arc<FaultyStore> {
    let store = Arc::new(FaultyStore::recording());
    seed(&store).await;
    store
}

#[tokio::test]
async fn test_vote_updates_ratings_and_audit_log() {
    let store = seeded_store().await;
    let app = test_app(store.clone(), test_config());
    let rankings = app.rankings();

    let outcome = rankings.submit_vote(vote(1, 2), None).await.unwrap();
    assert_eq!(outcome.winner_delta, 16);
    assert_eq!(outcome.loser_delta, -16);
    assert_eq!(outcome.winner.wins, 1);
    assert_eq!(outcome.loser.losses, 1);

    assert!(store.was_called("apply_match_result"));
    assert!(store.was_called("insert_vote"));
    assert_eq!(store.inner().vote_count().unwrap(), 1);

    let stats = rankings.stats().await.unwrap();
    assert_eq!(stats.total_votes, 1);
}

#[tokio::test]
async fn test_self_vote_touches_nothing() {
    let store = seeded_store().await;
    let app = test_app(store.clone(), test_config());

    let err = app
        .rankings()
        .submit_vote(vote(3, 3), Some("Bearer good-token"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_audit_failure_keeps_ratings() {
    let store = Arc::new(FaultyStore::failing_audit());
    seed(&store).await;
    let app = test_app(store.clone(), test_config());

    let outcome = app.rankings().submit_vote(vote(1, 2), None).await.unwrap();
    assert_eq!(outcome.winner.elo_rating, 1516);

    let winner = app.rankings().get_company("openai").await.unwrap();
    assert_eq!(winner.elo_rating, 1516);
    assert_eq!(winner.total_votes, 1);
    assert_eq!(store.inner().vote_count().unwrap(), 0);
    assert_eq!(app.metrics().ranking().audit_failures_total.get(), 1);
}

#[tokio::test]
async fn test_concurrent_votes_keep_counts_consistent() {
    let store = seeded_store().await;
    let app = test_app(store.clone(), test_config());
    let rankings = app.rankings();

    let mut handles = Vec::new();
    for i in 0..40 {
        let rankings = rankings.clone();
        // Everyone votes against company 1 from alternating winners
        let winner = if i % 2 == 0 { 2 } else { 3 };
        handles.push(tokio::spawn(async move {
            rankings.submit_vote(vote(winner, 1), None).await
        }));
    }
    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    let companies = rankings.list_companies(None, None).await.unwrap();
    for company in &companies {
        assert_eq!(company.wins + company.losses, company.total_votes);
    }

    let loser = companies.iter().find(|c| c.id == 1).unwrap();
    assert_eq!(loser.total_votes, 40);
    assert_eq!(loser.losses, 40);
    assert_eq!(store.inner().vote_count().unwrap(), 40);

    // Every delta was applied to the latest rating, so the total is conserved
    // up to truncation: each vote loses at most one point overall
    let total: i32 = companies.iter().map(|c| c.elo_rating).sum();
    assert!(total <= 1500 * 5);
    assert!(total >= 1500 * 5 - 40);
}

#[tokio::test]
async fn test_leaderboard_pages_and_ranks() {
    let store = seeded_store().await;
    let app = test_app(store, test_config());
    let rankings = app.rankings();

    rankings.submit_vote(vote(5, 1), None).await.unwrap();
    rankings.submit_vote(vote(4, 2), None).await.unwrap();

    let first = rankings
        .leaderboard(None, PageRequest::new(Some(1), Some(2)))
        .await
        .unwrap();
    assert_eq!(first.total_count, 5);
    let slugs: Vec<_> = first.companies.iter().map(|c| c.slug.as_str()).collect();
    // Equal ratings and votes tie-break on id
    assert_eq!(slugs, vec!["stripe", "vercel"]);
    assert_eq!(first.companies[0].rank, Some(1));

    let second = rankings
        .leaderboard(None, PageRequest::new(Some(2), Some(2)))
        .await
        .unwrap();
    assert_eq!(second.companies[0].slug, "mistral");
    assert_eq!(second.companies[0].rank, Some(3));

    let filtered = rankings
        .leaderboard(Some("foundation-models"), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(filtered.total_count, 3);
    assert_eq!(filtered.page_size, 25);

    let beyond = rankings
        .leaderboard(None, PageRequest::new(Some(1000), Some(25)))
        .await
        .unwrap();
    assert!(beyond.companies.is_empty());
    assert_eq!(beyond.total_count, 5);
}

#[tokio::test]
async fn test_reads_are_idempotent() {
    let store = seeded_store().await;
    let app = test_app(store, test_config());
    let rankings = app.rankings();

    assert_eq!(
        rankings.list_companies(None, None).await.unwrap(),
        rankings.list_companies(None, None).await.unwrap()
    );
    assert_eq!(
        rankings.get_company("mistral").await.unwrap(),
        rankings.get_company("mistral").await.unwrap()
    );
    assert_eq!(
        rankings.leaderboard(None, PageRequest::default()).await.unwrap(),
        rankings.leaderboard(None, PageRequest::default()).await.unwrap()
    );
}

#[tokio::test]
async fn test_user_leaderboard_counts_verified_votes() {
    let store = seeded_store().await;
    let app = test_app(store, test_config());
    let rankings = app.rankings();

    rankings
        .submit_vote(vote(1, 2), Some("Bearer good-token"))
        .await
        .unwrap();
    rankings
        .submit_vote(vote(2, 3), Some("Bearer good-token"))
        .await
        .unwrap();
    rankings
        .submit_vote(vote(3, 4), Some("Bearer forged"))
        .await
        .unwrap();

    let page = rankings.user_leaderboard(PageRequest::default()).await.unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.users[0].user_id, "alice");
    assert_eq!(page.users[0].total_votes, 2);
    assert_eq!(page.users[0].rank, 1);
}

#[tokio::test]
async fn test_invalid_rating_writes_nothing() {
    let store = seeded_store().await;
    let app = test_app(store.clone(), test_config());

    let err = app
        .rankings()
        .submit_rating(RatingRequest {
            company_id: 1,
            criterion: "culture".to_string(),
            score: 6,
            session_id: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err, RankingError::invalid_argument("Score must be between 1 and 5"));
    assert!(!store.was_called("insert_rating"));
    assert!(!store.was_called("company_exists"));
}

#[tokio::test]
async fn test_upvote_missing_comment_leaves_comments_unchanged() {
    let store = seeded_store().await;
    let app = test_app(store, test_config());
    let rankings = app.rankings();

    rankings
        .submit_comment(CommentRequest {
            company_id: 1,
            content: "Great mentorship".to_string(),
            is_current_employee: true,
            session_id: None,
        })
        .await
        .unwrap();

    let err = rankings.upvote_comment("999").await.unwrap_err();
    assert_eq!(err.status_code(), 404);

    let comments = rankings.company_comments("openai").await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].upvotes, 0);
}

#[tokio::test]
async fn test_unreachable_store() {
    let store = Arc::new(FaultyStore::unreachable());
    let app = test_app(store, test_config());

    let report = app.health().check().await;
    assert_eq!(report.status, HealthStatus::Degraded);
    assert_eq!(report.database, "disconnected");

    let err = app.rankings().list_companies(None, None).await.unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert_eq!(err.public_message(), "Internal server error");
}

#[tokio::test]
async fn test_store_timeout_is_internal_error() {
    let store = Arc::new(FaultyStore::slow(Duration::from_millis(500)));
    let app = test_app(store, test_config());

    let err = app.rankings().categories().await.unwrap_err();
    assert!(matches!(err, RankingError::Internal { .. }));
    assert_eq!(
        app.metrics()
            .store()
            .operation_timeouts_total
            .with_label_values(&["load categories"])
            .get(),
        1
    );
}
