//! Matchup selection for pairwise voting
//!
//! Two distinct companies are drawn uniformly from the candidates that pass
//! the category filter. Which one is shown first is decided by a separate
//! coin flip, so the draw order never leaks into left/right placement.

use rand::seq::index;
use rand::Rng;
use tracing::debug;

use crate::error::{RankingError, Result};
use crate::types::{CategoryFilter, Company, Matchup};

/// Picks the two companies presented for a vote
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchupSelector;

impl MatchupSelector {
    pub fn new() -> Self {
        Self
    }

    /// Select a matchup using thread-local randomness for both sources
    pub fn select(&self, candidates: Vec<Company>, filter: &CategoryFilter) -> Result<Matchup> {
        let mut draw_rng = rand::thread_rng();
        let mut order_rng = rand::thread_rng();
        self.select_with(candidates, filter, &mut draw_rng, &mut order_rng)
    }

    /// Select a matchup with explicit draw and ordering sources
    pub fn select_with<D, O>(
        &self,
        candidates: Vec<Company>,
        filter: &CategoryFilter,
        draw_rng: &mut D,
        order_rng: &mut O,
    ) -> Result<Matchup>
    where
        D: Rng + ?Sized,
        O: Rng + ?Sized,
    {
        let mut eligible: Vec<Company> = candidates
            .into_iter()
            .filter(|c| filter.matches(&c.category))
            .collect();

        if eligible.len() < 2 {
            return Err(RankingError::InsufficientCandidates {
                available: eligible.len(),
            });
        }

        let picked = index::sample(draw_rng, eligible.len(), 2);
        let (first, second) = (picked.index(0), picked.index(1));

        // Remove the higher index first so the lower one stays valid
        let (high, low) = if first > second {
            (first, second)
        } else {
            (second, first)
        };
        let high_company = eligible.swap_remove(high);
        let low_company = eligible.swap_remove(low);
        let (mut company1, mut company2) = if first > second {
            (high_company, low_company)
        } else {
            (low_company, high_company)
        };

        if order_rng.gen_bool(0.5) {
            std::mem::swap(&mut company1, &mut company2);
        }

        debug!(
            "Selected matchup {} vs {} from {} candidates",
            company1.slug,
            company2.slug,
            eligible.len() + 2
        );

        Ok(Matchup { company1, company2 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_company;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(n: i32) -> Vec<Company> {
        (1..=n).map(|id| sample_company(id, 1500, 0)).collect()
    }

    #[test]
    fn test_insufficient_candidates() {
        let selector = MatchupSelector::new();
        let err = selector
            .select(pool(1), &CategoryFilter::All)
            .unwrap_err();
        assert_eq!(err, RankingError::InsufficientCandidates { available: 1 });

        let err = selector.select(vec![], &CategoryFilter::All).unwrap_err();
        assert_eq!(err, RankingError::InsufficientCandidates { available: 0 });
    }

    #[test]
    fn test_filter_applied_before_draw() {
        let mut companies = pool(3);
        companies[0].category = "fintech".into();
        companies[1].category = "fintech".into();

        let selector = MatchupSelector::new();
        let matchup = selector
            .select(companies.clone(), &CategoryFilter::Only("fintech".into()))
            .unwrap();
        assert_eq!(matchup.company1.category, "fintech");
        assert_eq!(matchup.company2.category, "fintech");

        companies[1].category = "ai".into();
        let err = selector
            .select(companies, &CategoryFilter::Only("fintech".into()))
            .unwrap_err();
        assert_eq!(err, RankingError::InsufficientCandidates { available: 1 });
    }

    #[test]
    fn test_always_distinct() {
        let selector = MatchupSelector::new();
        let mut draw = StdRng::seed_from_u64(7);
        let mut order = StdRng::seed_from_u64(8);
        for _ in 0..500 {
            let m = selector
                .select_with(pool(5), &CategoryFilter::All, &mut draw, &mut order)
                .unwrap();
            assert_ne!(m.company1.id, m.company2.id);
        }
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let selector = MatchupSelector::new();
        let run = || {
            let mut draw = StdRng::seed_from_u64(42);
            let mut order = StdRng::seed_from_u64(43);
            (0..20)
                .map(|_| {
                    let m = selector
                        .select_with(pool(10), &CategoryFilter::All, &mut draw, &mut order)
                        .unwrap();
                    (m.company1.id, m.company2.id)
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_ordering_is_independent_of_draw() {
        // Same draw source, different ordering sources: the same pair comes
        // out, but placement differs at least once.
        let selector = MatchupSelector::new();
        let mut differs = false;
        for seed in 0..50u64 {
            let a = selector
                .select_with(
                    pool(10),
                    &CategoryFilter::All,
                    &mut StdRng::seed_from_u64(1),
                    &mut StdRng::seed_from_u64(seed),
                )
                .unwrap();
            let b = selector
                .select_with(
                    pool(10),
                    &CategoryFilter::All,
                    &mut StdRng::seed_from_u64(1),
                    &mut StdRng::seed_from_u64(seed + 1000),
                )
                .unwrap();

            let mut pair_a = [a.company1.id, a.company2.id];
            let mut pair_b = [b.company1.id, b.company2.id];
            if pair_a != pair_b {
                differs = true;
            }
            pair_a.sort();
            pair_b.sort();
            assert_eq!(pair_a, pair_b);
        }
        assert!(differs);
    }

    #[test]
    fn test_left_right_fairness() {
        let selector = MatchupSelector::new();
        let mut draw = StdRng::seed_from_u64(2024);
        let mut order = StdRng::seed_from_u64(4048);
        let draws = 10_000;

        let first_is_one = (0..draws)
            .filter(|_| {
                selector
                    .select_with(pool(2), &CategoryFilter::All, &mut draw, &mut order)
                    .map(|m| m.company1.id == 1)
                    .unwrap_or(false)
            })
            .count();

        // N/2 +- 4 sigma, sigma = sqrt(N)/2 = 50
        assert!(
            (4_800..=5_200).contains(&first_is_one),
            "company 1 shown first {} times out of {}",
            first_is_one,
            draws
        );
    }
}
