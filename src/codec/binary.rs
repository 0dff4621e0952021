//! Compact binary representations
//!
//! Messages are encoded with bincode. Every optional field carries an
//! explicit presence tag (`Option`), lists are length-prefixed and never
//! absent, timestamps travel as `(seconds, nanos)` and criteria as a one-byte
//! code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CodecError;
use crate::types::{
    AggregatedRating, CategoryCount, Comment, CommentRequest, Company, Criterion, CriterionRating,
    ErrorBody, HealthReport, HealthStatus, LeaderboardPage, Matchup, PlatformStats, RatingRequest,
    UserLeaderboardPage, UserStanding, VoteOutcome, VoteRequest,
};

/// Seconds and nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTimestamp {
    pub seconds: i64,
    pub nanos: u32,
}

impl From<DateTime<Utc>> for WireTimestamp {
    fn from(ts: DateTime<Utc>) -> Self {
        Self {
            seconds: ts.timestamp(),
            nanos: ts.timestamp_subsec_nanos(),
        }
    }
}

impl WireTimestamp {
    fn into_datetime(self, field: &'static str) -> Result<DateTime<Utc>, CodecError> {
        DateTime::from_timestamp(self.seconds, self.nanos).ok_or_else(|| {
            CodecError::invalid_field(
                field,
                format!("timestamp out of range: {}s {}ns", self.seconds, self.nanos),
            )
        })
    }
}

fn criterion_from_code(code: u8) -> Result<Criterion, CodecError> {
    Criterion::from_code(code)
        .ok_or_else(|| CodecError::invalid_field("criterion", format!("unknown code {}", code)))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyMessage {
    pub id: i32,
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
    pub rank: Option<u32>,
    pub created_at: WireTimestamp,
    pub updated_at: WireTimestamp,
}

impl From<&Company> for CompanyMessage {
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
            created_at: c.created_at.into(),
            updated_at: c.updated_at.into(),
        }
    }
}

impl TryFrom<CompanyMessage> for Company {
    type Error = CodecError;

    fn try_from(c: CompanyMessage) -> Result<Self, Self::Error> {
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
            created_at: c.created_at.into_datetime("created_at")?,
            updated_at: c.updated_at.into_datetime("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupMessage {
    pub company1: CompanyMessage,
    pub company2: CompanyMessage,
}

impl From<&Matchup> for MatchupMessage {
    fn from(m: &Matchup) -> Self {
        Self {
            company1: (&m.company1).into(),
            company2: (&m.company2).into(),
        }
    }
}

impl TryFrom<MatchupMessage> for Matchup {
    type Error = CodecError;

    fn try_from(m: MatchupMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            company1: m.company1.try_into()?,
            company2: m.company2.try_into()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteOutcomeMessage {
    pub winner: CompanyMessage,
    pub loser: CompanyMessage,
    pub winner_elo_diff: i32,
    pub loser_elo_diff: i32,
}

impl From<&VoteOutcome> for VoteOutcomeMessage {
    fn from(v: &VoteOutcome) -> Self {
        Self {
            winner: (&v.winner).into(),
            loser: (&v.loser).into(),
            winner_elo_diff: v.winner_delta,
            loser_elo_diff: v.loser_delta,
        }
    }
}

impl TryFrom<VoteOutcomeMessage> for VoteOutcome {
    type Error = CodecError;

    fn try_from(v: VoteOutcomeMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            winner: v.winner.try_into()?,
            loser: v.loser.try_into()?,
            winner_delta: v.winner_elo_diff,
            loser_delta: v.loser_elo_diff,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardMessage {
    pub companies: Vec<CompanyMessage>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl From<&LeaderboardPage> for LeaderboardMessage {
    fn from(p: &LeaderboardPage) -> Self {
        Self {
            companies: p.companies.iter().map(Into::into).collect(),
            total_count: p.total_count,
            page: p.page,
            page_size: p.page_size,
        }
    }
}

impl TryFrom<LeaderboardMessage> for LeaderboardPage {
    type Error = CodecError;

    fn try_from(p: LeaderboardMessage) -> Result<Self, Self::Error> {
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
pub struct UserStandingMessage {
    pub user_id: String,
    pub total_votes: i64,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLeaderboardMessage {
    pub users: Vec<UserStandingMessage>,
    pub total_count: i64,
    pub page: u32,
    pub page_size: u32,
}

impl From<&UserLeaderboardPage> for UserLeaderboardMessage {
    fn from(p: &UserLeaderboardPage) -> Self {
        Self {
            users: p
                .users
                .iter()
                .map(|u| UserStandingMessage {
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

impl TryFrom<UserLeaderboardMessage> for UserLeaderboardPage {
    type Error = CodecError;

    fn try_from(p: UserLeaderboardMessage) -> Result<Self, Self::Error> {
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
pub struct CriterionRatingMessage {
    pub id: i32,
    pub company_id: i32,
    pub criterion: u8,
    pub score: i32,
    pub session_id: Option<String>,
    pub created_at: WireTimestamp,
}

impl From<&CriterionRating> for CriterionRatingMessage {
    fn from(r: &CriterionRating) -> Self {
        Self {
            id: r.id,
            company_id: r.company_id,
            criterion: r.criterion.code(),
            score: r.score,
            session_id: r.session_id.clone(),
            created_at: r.created_at.into(),
        }
    }
}

impl TryFrom<CriterionRatingMessage> for CriterionRating {
    type Error = CodecError;

    fn try_from(r: CriterionRatingMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            id: r.id,
            company_id: r.company_id,
            criterion: criterion_from_code(r.criterion)?,
            score: r.score,
            session_id: r.session_id,
            created_at: r.created_at.into_datetime("created_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRatingMessage {
    pub criterion: u8,
    pub average_score: f64,
    pub total_ratings: i64,
}

impl From<&AggregatedRating> for AggregatedRatingMessage {
    fn from(r: &AggregatedRating) -> Self {
        Self {
            criterion: r.criterion.code(),
            average_score: r.average_score,
            total_ratings: r.total_ratings,
        }
    }
}

impl TryFrom<AggregatedRatingMessage> for AggregatedRating {
    type Error = CodecError;

    fn try_from(r: AggregatedRatingMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            criterion: criterion_from_code(r.criterion)?,
            average_score: r.average_score,
            total_ratings: r.total_ratings,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentMessage {
    pub id: i32,
    pub company_id: i32,
    pub content: String,
    pub is_current_employee: bool,
    pub session_id: Option<String>,
    pub upvotes: i32,
    pub created_at: WireTimestamp,
}

impl From<&Comment> for CommentMessage {
    fn from(c: &Comment) -> Self {
        Self {
            id: c.id,
            company_id: c.company_id,
            content: c.content.clone(),
            is_current_employee: c.is_current_employee,
            session_id: c.session_id.clone(),
            upvotes: c.upvotes,
            created_at: c.created_at.into(),
        }
    }
}

impl TryFrom<CommentMessage> for Comment {
    type Error = CodecError;

    fn try_from(c: CommentMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            id: c.id,
            company_id: c.company_id,
            content: c.content,
            is_current_employee: c.is_current_employee,
            session_id: c.session_id,
            upvotes: c.upvotes,
            created_at: c.created_at.into_datetime("created_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCountMessage {
    pub category: String,
    pub count: i64,
}

impl From<&CategoryCount> for CategoryCountMessage {
    fn from(c: &CategoryCount) -> Self {
        Self {
            category: c.category.clone(),
            count: c.count,
        }
    }
}

impl TryFrom<CategoryCountMessage> for CategoryCount {
    type Error = CodecError;

    fn try_from(c: CategoryCountMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            category: c.category,
            count: c.count,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStatsMessage {
    pub total_companies: i64,
    pub total_votes: i64,
    pub total_ratings: i64,
    pub total_comments: i64,
    pub categories: Vec<String>,
}

impl From<&PlatformStats> for PlatformStatsMessage {
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

impl TryFrom<PlatformStatsMessage> for PlatformStats {
    type Error = CodecError;

    fn try_from(s: PlatformStatsMessage) -> Result<Self, Self::Error> {
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
pub struct HealthMessage {
    pub status: String,
    pub database: String,
    pub service: String,
    pub version: String,
}

impl From<&HealthReport> for HealthMessage {
    fn from(h: &HealthReport) -> Self {
        Self {
            status: h.status.as_str().to_string(),
            database: h.database.clone(),
            service: h.service.clone(),
            version: h.version.clone(),
        }
    }
}

impl TryFrom<HealthMessage> for HealthReport {
    type Error = CodecError;

    fn try_from(h: HealthMessage) -> Result<Self, Self::Error> {
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
pub struct ErrorMessage {
    pub error: String,
    pub code: u16,
}

impl From<&ErrorBody> for ErrorMessage {
    fn from(e: &ErrorBody) -> Self {
        Self {
            error: e.error.clone(),
            code: e.code,
        }
    }
}

impl TryFrom<ErrorMessage> for ErrorBody {
    type Error = CodecError;

    fn try_from(e: ErrorMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            error: e.error,
            code: e.code,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRequestMessage {
    pub winner_id: i32,
    pub loser_id: i32,
    pub session_id: Option<String>,
}

impl From<&VoteRequest> for VoteRequestMessage {
    fn from(v: &VoteRequest) -> Self {
        Self {
            winner_id: v.winner_id,
            loser_id: v.loser_id,
            session_id: v.session_id.clone(),
        }
    }
}

impl TryFrom<VoteRequestMessage> for VoteRequest {
    type Error = CodecError;

    fn try_from(v: VoteRequestMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            winner_id: v.winner_id,
            loser_id: v.loser_id,
            session_id: v.session_id,
        })
    }
}

/// The criterion stays a string here so unknown names reach validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRequestMessage {
    pub company_id: i32,
    pub criterion: String,
    pub score: i32,
    pub session_id: Option<String>,
}

impl From<&RatingRequest> for RatingRequestMessage {
    fn from(r: &RatingRequest) -> Self {
        Self {
            company_id: r.company_id,
            criterion: r.criterion.clone(),
            score: r.score,
            session_id: r.session_id.clone(),
        }
    }
}

impl TryFrom<RatingRequestMessage> for RatingRequest {
    type Error = CodecError;

    fn try_from(r: RatingRequestMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            company_id: r.company_id,
            criterion: r.criterion,
            score: r.score,
            session_id: r.session_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRequestMessage {
    pub company_id: i32,
    pub content: String,
    pub is_current_employee: bool,
    pub session_id: Option<String>,
}

impl From<&CommentRequest> for CommentRequestMessage {
    fn from(c: &CommentRequest) -> Self {
        Self {
            company_id: c.company_id,
            content: c.content.clone(),
            is_current_employee: c.is_current_employee,
            session_id: c.session_id.clone(),
        }
    }
}

impl TryFrom<CommentRequestMessage> for CommentRequest {
    type Error = CodecError;

    fn try_from(c: CommentRequestMessage) -> Result<Self, Self::Error> {
        Ok(Self {
            company_id: c.company_id,
            content: c.content,
            is_current_employee: c.is_current_employee,
            session_id: c.session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode, WireFormat};
    use crate::test_support::sample_company;

    #[test]
    fn test_timestamp_keeps_sub_microsecond_precision() {
        let ts: DateTime<Utc> = "2024-02-29T23:59:59.123456789Z".parse().unwrap();
        let wire = WireTimestamp::from(ts);
        assert_eq!(wire.nanos, 123_456_789);
        assert_eq!(wire.into_datetime("created_at").unwrap(), ts);
    }

    #[test]
    fn test_out_of_range_timestamp_rejected() {
        let wire = WireTimestamp {
            seconds: i64::MAX,
            nanos: 0,
        };
        assert!(wire.into_datetime("created_at").is_err());
    }

    #[test]
    fn test_unknown_criterion_code_rejected() {
        let message = AggregatedRatingMessage {
            criterion: 42,
            average_score: 3.0,
            total_ratings: 1,
        };
        let bytes = bincode::serialize(&message).unwrap();
        assert!(matches!(
            decode::<AggregatedRating>(WireFormat::Binary, &bytes),
            Err(CodecError::InvalidField { field: "criterion", .. })
        ));
    }

    #[test]
    fn test_binary_is_smaller_than_json() {
        let page = LeaderboardPage {
            companies: (1..=25).map(|id| sample_company(id, 1500, 3)).collect(),
            total_count: 25,
            page: 1,
            page_size: 25,
        };
        let json = encode(WireFormat::Json, &page).unwrap();
        let binary = encode(WireFormat::Binary, &page).unwrap();
        assert!(binary.len() < json.len());
    }

    #[test]
    fn test_presence_tags_distinguish_empty_from_absent() {
        let mut company = sample_company(1, 1500, 0);
        company.description = Some(String::new());
        let bytes = encode(WireFormat::Binary, &company).unwrap();
        let back: Company = decode(WireFormat::Binary, &bytes).unwrap();
        assert_eq!(back.description, Some(String::new()));
        assert_eq!(back.logo_url, None);
    }
}
