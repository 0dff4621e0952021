//! Common types used throughout the ranking service
//!
//! These are the domain model. Wire representations live in [`crate::codec`];
//! nothing here is serialized directly onto the network.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::RankingError;

/// Unique identifier for companies
pub type CompanyId = i32;

/// Unique identifier for comments
pub type CommentId = i32;

/// A ranked company
#[derive(Debug, Clone, PartialEq)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub founded_year: Option<i32>,
    pub hq_location: Option<String>,
    pub employee_range: Option<String>,
    pub funding_stage: Option<String>,
    pub elo_rating: i32,
    pub total_votes: i32,
    pub wins: i32,
    pub losses: i32,
    /// Derived per request, never persisted
    pub rank: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }
}

/// Input for creating a company row (seed files, fixtures)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NewCompany {
    pub name: String,
    pub slug: String,
    pub category: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub founded_year: Option<i32>,
    #[serde(default)]
    pub hq_location: Option<String>,
    #[serde(default)]
    pub employee_range: Option<String>,
    #[serde(default)]
    pub funding_stage: Option<String>,
    /// Starting rating; the configured initial rating when absent
    #[serde(default)]
    pub elo_rating: Option<i32>,
}

impl NewCompany {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            category: category.into(),
            ..Default::default()
        }
    }

    pub fn with_rating(mut self, rating: i32) -> Self {
        self.elo_rating = Some(rating);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// Category restriction for listings, matchups and leaderboards
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    /// Absent, empty and `"all"` mean no restriction.
    pub fn from_param(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") | Some("all") => Self::All,
            Some(category) => Self::Only(category.to_string()),
        }
    }

    pub fn matches(&self, category: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == category,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Only(category) => Some(category),
        }
    }
}

/// Filter for the company listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyQuery {
    pub category: CategoryFilter,
    /// Case-insensitive substring of name or description
    pub search: Option<String>,
}

impl CompanyQuery {
    pub fn new(category: Option<&str>, search: Option<&str>) -> Self {
        Self {
            category: CategoryFilter::from_param(category),
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase),
        }
    }

    pub fn matches(&self, company: &Company) -> bool {
        if !self.category.matches(&company.category) {
            return false;
        }
        match &self.search {
            None => true,
            Some(needle) => {
                company.name.to_lowercase().contains(needle)
                    || company
                        .description
                        .as_deref()
                        .map(|d| d.to_lowercase().contains(needle))
                        .unwrap_or(false)
            }
        }
    }
}

/// Two companies presented for a vote
#[derive(Debug, Clone, PartialEq)]
pub struct Matchup {
    pub company1: Company,
    pub company2: Company,
}

/// Recorded pairwise vote
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    pub id: i32,
    pub winner_id: CompanyId,
    pub loser_id: CompanyId,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewVote {
    pub winner_id: CompanyId,
    pub loser_id: CompanyId,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
}

/// Result of a vote as returned to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct VoteOutcome {
    pub winner: Company,
    pub loser: Company,
    pub winner_delta: i32,
    pub loser_delta: i32,
}

/// Closed set of criteria a company can be rated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Criterion {
    Compensation,
    Culture,
    WorkLifeBalance,
    Growth,
    TechStack,
    Leadership,
    Interview,
}

impl Criterion {
    pub const ALL: [Criterion; 7] = [
        Criterion::Compensation,
        Criterion::Culture,
        Criterion::WorkLifeBalance,
        Criterion::Growth,
        Criterion::TechStack,
        Criterion::Leadership,
        Criterion::Interview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Compensation => "compensation",
            Criterion::Culture => "culture",
            Criterion::WorkLifeBalance => "work_life_balance",
            Criterion::Growth => "growth",
            Criterion::TechStack => "tech_stack",
            Criterion::Leadership => "leadership",
            Criterion::Interview => "interview",
        }
    }

    /// Stable numeric code used by the binary wire format
    pub fn code(&self) -> u8 {
        match self {
            Criterion::Compensation => 0,
            Criterion::Culture => 1,
            Criterion::WorkLifeBalance => 2,
            Criterion::Growth => 3,
            Criterion::TechStack => 4,
            Criterion::Leadership => 5,
            Criterion::Interview => 6,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Criterion {
    type Err = RankingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| RankingError::invalid_argument("Invalid criterion"))
    }
}

/// A single score given to a company on one criterion
#[derive(Debug, Clone, PartialEq)]
pub struct CriterionRating {
    pub id: i32,
    pub company_id: CompanyId,
    pub criterion: Criterion,
    pub score: i32,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRating {
    pub company_id: CompanyId,
    pub criterion: Criterion,
    pub score: i32,
    pub session_id: Option<String>,
}

/// Average score per criterion
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedRating {
    pub criterion: Criterion,
    pub average_score: f64,
    pub total_ratings: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: CommentId,
    pub company_id: CompanyId,
    pub content: String,
    pub is_current_employee: bool,
    pub session_id: Option<String>,
    pub upvotes: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub company_id: CompanyId,
    pub content: String,
    pub is_current_employee: bool,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformStats {
    pub total_companies: i64,
    pub total_votes: i64,
    pub total_ratings: i64,
    pub total_comments: i64,
    pub categories: Vec<String>,
}

/// A voter's position on the user leaderboard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStanding {
    pub user_id: String,
    pub total_votes: i64,
    pub rank: u32,
}

/// One page of the company leaderboard
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardPage {
    pub companies: Vec<Company>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

/// One page of the user leaderboard
#[derive(Debug, Clone, PartialEq)]
pub struct UserLeaderboardPage {
    pub users: Vec<UserStanding>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

/// Inbound vote payload
#[derive(Debug, Clone, PartialEq)]
pub struct VoteRequest {
    pub winner_id: CompanyId,
    pub loser_id: CompanyId,
    pub session_id: Option<String>,
}

/// Inbound criterion rating payload. The criterion is validated by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRequest {
    pub company_id: CompanyId,
    pub criterion: String,
    pub score: i32,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentRequest {
    pub company_id: CompanyId,
    pub content: String,
    pub is_current_employee: bool,
    pub session_id: Option<String>,
}

/// Overall health of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

impl FromStr for HealthStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "healthy" => Ok(HealthStatus::Healthy),
            "degraded" => Ok(HealthStatus::Degraded),
            "unhealthy" => Ok(HealthStatus::Unhealthy),
            other => Err(format!("unknown health status: {}", other)),
        }
    }
}

/// Health payload served at `/health`
#[derive(Debug, Clone, PartialEq)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub database: String,
    pub service: String,
    pub version: String,
}

/// Error payload, encoded in whichever format the client negotiated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: String,
    pub code: u16,
}

impl From<&RankingError> for ErrorBody {
    fn from(err: &RankingError) -> Self {
        Self {
            error: err.public_message(),
            code: err.status_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_filter_from_param() {
        assert_eq!(CategoryFilter::from_param(None), CategoryFilter::All);
        assert_eq!(CategoryFilter::from_param(Some("")), CategoryFilter::All);
        assert_eq!(CategoryFilter::from_param(Some("all")), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::from_param(Some("fintech")),
            CategoryFilter::Only("fintech".to_string())
        );
        assert!(CategoryFilter::All.matches("anything"));
        assert!(!CategoryFilter::Only("ai".into()).matches("fintech"));
    }

    #[test]
    fn test_criterion_parsing() {
        for criterion in Criterion::ALL {
            assert_eq!(criterion.as_str().parse::<Criterion>().unwrap(), criterion);
            assert_eq!(Criterion::from_code(criterion.code()), Some(criterion));
        }
        assert!("foo".parse::<Criterion>().is_err());
        assert!("Culture".parse::<Criterion>().is_err());
        assert_eq!(Criterion::from_code(7), None);
    }

    #[test]
    fn test_company_query_search() {
        let company = Company {
            id: 1,
            name: "Acme Robotics".into(),
            slug: "acme".into(),
            logo_url: None,
            description: Some("Warehouse AUTOMATION".into()),
            website: None,
            category: "hardware".into(),
            tags: vec![],
            founded_year: None,
            hq_location: None,
            employee_range: None,
            funding_stage: None,
            elo_rating: 1500,
            total_votes: 0,
            wins: 0,
            losses: 0,
            rank: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(CompanyQuery::new(None, Some("robot")).matches(&company));
        assert!(CompanyQuery::new(None, Some("automation")).matches(&company));
        assert!(CompanyQuery::new(Some("hardware"), None).matches(&company));
        assert!(!CompanyQuery::new(Some("ai"), None).matches(&company));
        assert!(!CompanyQuery::new(None, Some("bank")).matches(&company));
        assert!(CompanyQuery::new(None, Some("   ")).matches(&company));
    }

    #[test]
    fn test_error_body_hides_internal_detail() {
        let body = ErrorBody::from(&RankingError::internal("pool exhausted"));
        assert_eq!(body.code, 500);
        assert_eq!(body.error, "Internal server error");
    }
}
