//! JSON representations
//!
//! Field names follow the public REST contract. Optional scalars are always
//! written, as `null` when absent; tag and category lists are always arrays
//! and read `null` or a missing key as empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::CodecError;
use crate::types::{
    AggregatedRating, CategoryCount, Comment, CommentRequest, Company, Criterion, CriterionRating,
    ErrorBody, HealthReport, HealthStatus, LeaderboardPage, Matchup, PlatformStats, RatingRequest,
    UserLeaderboardPage, UserStanding, VoteOutcome, VoteRequest,
};

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn parse_criterion(value: &str) -> Result<Criterion, CodecError> {
    value
        .parse()
        .map_err(|_| CodecError::invalid_field("criterion", format!("unknown criterion {:?}", value)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyJson {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub category: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    pub founded_year: Option<i32>,
    pub hq_location: Option<String>,
    pub employee_range: Option<String>,
    pub funding_stage: Option<String>,
    pub elo_rating: i32,
    pub total_votes: i32,
    pub wins: i32,
    pub losses: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Company> for CompanyJson {
    fn from(c: &Company) -> Self {
        Self {
            id: c.id,
            name: c.name.clone(),
            slug: c.slug.clone(),
            logo_url: c.logo_url.clone(),
            description: c.description.clone(),
            website: c.website.clone(),
            category: c.category.clone(),
            tags: c.tags.clone(),
            founded_year: c.founded_year,
            hq_location: c.hq_location.clone(),
            employee_range: c.employee_range.clone(),
            funding_stage: c.funding_stage.clone(),
            elo_rating: c.elo_rating,
            total_votes: c.total_votes,
            wins: c.wins,
            losses: c.losses,
            rank: c.rank,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl TryFrom<CompanyJson> for Company {
    type Error = CodecError;

    fn try_from(c: CompanyJson) -> Result<Self, Self::Error> {
        Ok(Self {
            id: c.id,
            name: c.name,
            slug: c.slug,
            logo_url: c.logo_url,
            description: c.description,
            website: c.website,
            category: c.category,
            tags: c.tags,
            founded_year: c.founded_year,
            hq_location: c.hq_location,
            employee_range: c.employee_range,
            funding_stage: c.funding_stage,
            elo_rating: c.elo_rating,
            total_votes: c.total_votes,
            wins: c.wins,
            losses: c.losses,
            rank: c.rank,
            created_at: c.created_at,
            updated_at: c.updated_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupJson {
    pub company1: CompanyJson,
    pub company2: CompanyJson,
}

impl From<&Matchup> for MatchupJson {
    fn from(m: &Matchup) -> Self {
        Self {
            company1: (&m.company1).into(),
            company2: (&m.company2).into(),
        }
    }
}

impl TryFrom<MatchupJson> for Matchup {
    type Error = CodecError;

    fn try_from(m: MatchupJson) -> Result<Self, Self::Error> {
        Ok(Self {
            company1: m.company1.try_into()?,
            company2: m.company2.try_into()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOutcomeJson {
    pub winner: CompanyJson,
    pub loser: CompanyJson,
    pub winner_elo_diff: i32,
    pub loser_elo_diff: i32,
}

impl From<&VoteOutcome> for VoteOutcomeJson {
    fn from(v: &VoteOutcome) -> Self {
        Self {
            winner: (&v.winner).into(),
            loser: (&v.loser).into(),
            winner_elo_diff: v.winner_delta,
            loser_elo_diff: v.loser_delta,
        }
    }
}

impl TryFrom<VoteOutcomeJson> for VoteOutcome {
    type Error = CodecError;

    fn try_from(v: VoteOutcomeJson) -> Result<Self, Self::Error> {
        Ok(Self {
            winner: v.winner.try_into()?,
            loser: v.loser.try_into()?,
            winner_delta: v.winner_elo_diff,
            loser_delta: v.loser_elo_diff,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardJson {
    pub companies: Vec<CompanyJson>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl From<&LeaderboardPage> for LeaderboardJson {
    fn from(p: &LeaderboardPage) -> Self {
        Self {
            companies: p.companies.iter().map(Into::into).collect(),
            total_count: p.total_count,
            page: p.page,
            page_size: p.page_size,
        }
    }
}

impl TryFrom<LeaderboardJson> for LeaderboardPage {
    type Error = CodecError;

    fn try_from(p: LeaderboardJson) -> Result<Self, Self::Error> {
        Ok(Self {
            companies: p
                .companies
                .into_iter()
                .map(Company::try_from)
                .collect::<Result<_, _>>()?,
            total_count: p.total_count,
            page: p.page,
            page_size: p.page_size,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStandingJson {
    pub user_id: String,
    pub total_votes: i64,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLeaderboardJson {
    pub users: Vec<UserStandingJson>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl From<&UserLeaderboardPage> for UserLeaderboardJson {
    fn from(p: &UserLeaderboardPage) -> Self {
        Self {
            users: p
                .users
                .iter()
                .map(|u| UserStandingJson {
                    user_id: u.user_id.clone(),
                    total_votes: u.total_votes,
                    rank: u.rank,
                })
                .collect(),
            total_count: p.total_count,
            page: p.page,
            page_size: p.page_size,
        }
    }
}

impl TryFrom<UserLeaderboardJson> for UserLeaderboardPage {
    type Error = CodecError;

    fn try_from(p: UserLeaderboardJson) -> Result<Self, Self::Error> {
        Ok(Self {
            users: p
                .users
                .into_iter()
                .map(|u| UserStanding {
                    user_id: u.user_id,
                    total_votes: u.total_votes,
                    rank: u.rank,
                })
                .collect(),
            total_count: p.total_count,
            page: p.page,
            page_size: p.page_size,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionRatingJson {
    pub id: i32,
    pub company_id: i32,
    pub criterion: String,
    pub score: i32,
    pub session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&CriterionRating> for CriterionRatingJson {
    fn from(r: &CriterionRating) -> Self {
        Self {
            id: r.id,
            company_id: r.company_id,
            criterion: r.criterion.as_str().to_string(),
            score: r.score,
            session_id: r.session_id.clone(),
            created_at: r.created_at,
        }
    }
}

impl TryFrom<CriterionRatingJson> for CriterionRating {
    type Error = CodecError;

    fn try_from(r: CriterionRatingJson) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            company_id: r.company_id,
            criterion: parse_criterion(&r.criterion)?,
            score: r.score,
            session_id: r.session_id,
            created_at: r.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRatingJson {
    pub criterion: String,
    pub average_score: f64,
    pub total_ratings: i64,
}

impl From<&AggregatedRating> for AggregatedRatingJson {
    fn from(r: &AggregatedRating) -> Self {
        Self {
            criterion: r.criterion.as_str().to_string(),
            average_score: r.average_score,
            total_ratings: r.total_ratings,
        }
    }
}

impl TryFrom<AggregatedRatingJson> for AggregatedRating {
    type Error = CodecError;

    fn try_from(r: AggregatedRatingJson) -> Result<Self, Self::Error> {
        Ok(Self {
            criterion: parse_criterion(&r.criterion)?,
            average_score: r.average_score,
            total_ratings: r.total_ratings,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentJson {
    pub id: i32,
    pub company_id: i32,
    pub content: String,
    pub is_current_employee: bool,
    pub session_id: Option<String>,
    pub upvotes: i32,
    pub created_at: DateTime<Utc>,
}

impl From<&Comment> for CommentJson {
    fn from(c: &Comment) -> Self {
        Self {
            id: c.id,
            company_id: c.company_id,
            content: c.content.clone(),
            is_current_employee: c.is_current_employee,
            session_id: c.session_id.clone(),
            upvotes: c.upvotes,
            created_at: c.created_at,
        }
    }
}

impl TryFrom<CommentJson> for Comment {
    type Error = CodecError;

    fn try_from(c: CommentJson) -> Result<Self, Self::Error> {
        Ok(Self {
            id: c.id,
            company_id: c.company_id,
            content: c.content,
            is_current_employee: c.is_current_employee,
            session_id: c.session_id,
            upvotes: c.upvotes,
            created_at: c.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCountJson {
    pub category: String,
    pub count: i64,
}

impl From<&CategoryCount> for CategoryCountJson {
    fn from(c: &CategoryCount) -> Self {
        Self {
            category: c.category.clone(),
            count: c.count,
        }
    }
}

impl TryFrom<CategoryCountJson> for CategoryCount {
    type Error = CodecError;

    fn try_from(c: CategoryCountJson) -> Result<Self, Self::Error> {
        Ok(Self {
            category: c.category,
            count: c.count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStatsJson {
    pub total_companies: i64,
    pub total_votes: i64,
    pub total_ratings: i64,
    pub total_comments: i64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub categories: Vec<String>,
}

impl From<&PlatformStats> for PlatformStatsJson {
    fn from(s: &PlatformStats) -> Self {
        Self {
            total_companies: s.total_companies,
            total_votes: s.total_votes,
            total_ratings: s.total_ratings,
            total_comments: s.total_comments,
            categories: s.categories.clone(),
        }
    }
}

impl TryFrom<PlatformStatsJson> for PlatformStats {
    type Error = CodecError;

    fn try_from(s: PlatformStatsJson) -> Result<Self, Self::Error> {
        Ok(Self {
            total_companies: s.total_companies,
            total_votes: s.total_votes,
            total_ratings: s.total_ratings,
            total_comments: s.total_comments,
            categories: s.categories,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthJson {
    pub status: String,
    pub database: String,
    pub service: String,
    pub version: String,
}

impl From<&HealthReport> for HealthJson {
    fn from(h: &HealthReport) -> Self {
        Self {
            status: h.status.as_str().to_string(),
            database: h.database.clone(),
            service: h.service.clone(),
            version: h.version.clone(),
        }
    }
}

impl TryFrom<HealthJson> for HealthReport {
    type Error = CodecError;

    fn try_from(h: HealthJson) -> Result<Self, Self::Error> {
        Ok(Self {
            status: h
                .status
                .parse::<HealthStatus>()
                .map_err(|e| CodecError::invalid_field("status", e))?,
            database: h.database,
            service: h.service,
            version: h.version,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorJson {
    pub error: String,
    pub code: u16,
}

impl From<&ErrorBody> for ErrorJson {
    fn from(e: &ErrorBody) -> Self {
        Self {
            error: e.error.clone(),
            code: e.code,
        }
    }
}

impl TryFrom<ErrorJson> for ErrorBody {
    type Error = CodecError;

    fn try_from(e: ErrorJson) -> Result<Self, Self::Error> {
        Ok(Self {
            error: e.error,
            code: e.code,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRequestJson {
    pub winner_id: i32,
    pub loser_id: i32,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl From<&VoteRequest> for VoteRequestJson {
    fn from(v: &VoteRequest) -> Self {
        Self {
            winner_id: v.winner_id,
            loser_id: v.loser_id,
            session_id: v.session_id.clone(),
        }
    }
}

impl TryFrom<VoteRequestJson> for VoteRequest {
    type Error = CodecError;

    fn try_from(v: VoteRequestJson) -> Result<Self, Self::Error> {
        Ok(Self {
            winner_id: v.winner_id,
            loser_id: v.loser_id,
            session_id: v.session_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRequestJson {
    pub company_id: i32,
    pub criterion: String,
    pub score: i32,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl From<&RatingRequest> for RatingRequestJson {
    fn from(r: &RatingRequest) -> Self {
        Self {
            company_id: r.company_id,
            criterion: r.criterion.clone(),
            score: r.score,
            session_id: r.session_id.clone(),
        }
    }
}

impl TryFrom<RatingRequestJson> for RatingRequest {
    type Error = CodecError;

    fn try_from(r: RatingRequestJson) -> Result<Self, Self::Error> {
        Ok(Self {
            company_id: r.company_id,
            criterion: r.criterion,
            score: r.score,
            session_id: r.session_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRequestJson {
    pub company_id: i32,
    pub content: String,
    #[serde(default)]
    pub is_current_employee: bool,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl From<&CommentRequest> for CommentRequestJson {
    fn from(c: &CommentRequest) -> Self {
        Self {
            company_id: c.company_id,
            content: c.content.clone(),
            is_current_employee: c.is_current_employee,
            session_id: c.session_id.clone(),
        }
    }
}

impl TryFrom<CommentRequestJson> for CommentRequest {
    type Error = CodecError;

    fn try_from(c: CommentRequestJson) -> Result<Self, Self::Error> {
        Ok(Self {
            company_id: c.company_id,
            content: c.content,
            is_current_employee: c.is_current_employee,
            session_id: c.session_id,
        })
    }
}
