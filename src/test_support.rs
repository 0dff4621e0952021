//! Shared builders for unit tests

use chrono::{TimeZone, Utc};

use crate::types::Company;

pub(crate) fn sample_company(id: i32, elo_rating: i32, total_votes: i32) -> Company {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Company {
        id,
        name: format!("Company {}", id),
        slug: format!("company-{}", id),
        logo_url: None,
        description: None,
        website: None,
        category: "general".to_string(),
        tags: Vec::new(),
        founded_year: None,
        hq_location: None,
        employee_range: None,
        funding_stage: None,
        elo_rating,
        total_votes,
        wins: total_votes,
        losses: 0,
        rank: None,
        created_at: created,
        updated_at: created,
    }
}
