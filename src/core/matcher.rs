use chrono::{DateTime, Utc};
use std::cmp::Ordering;

use crate::core::{distance::distance_between, filters::matches_at, scoring::score};
use crate::models::{FilterCriteria, Profile, RankedPartner};

/// Result of the discovery process
#[derive(Debug)]
pub struct MatchResult {
    pub partners: Vec<RankedPartner>,
    pub total_candidates: usize,
}

/// Partner discovery - filters, scores and ranks candidate profiles
///
/// # Pipeline Stages
/// 1. Filter predicate (self, verification, languages, tags, recency, distance)
/// 2. Compatibility scoring
/// 3. Ranking with deterministic tie-breaks
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    /// Candidates scoring below this are dropped
    min_score: u8,
}

impl Matcher {
    pub fn new(min_score: u8) -> Self {
        Self { min_score }
    }

    /// Find partners for `requester`, as of now
    pub fn find_partners(
        &self,
        requester: &Profile,
        criteria: &FilterCriteria,
        candidates: Vec<Profile>,
        limit: usize,
    ) -> MatchResult {
        self.find_partners_at(requester, criteria, candidates, limit, Utc::now())
    }

    /// Find partners for `requester` at time `now`
    ///
    /// Ordering: score descending, complementary first, verified first,
    /// most recently active first, then user id ascending.
    pub fn find_partners_at(
        &self,
        requester: &Profile,
        criteria: &FilterCriteria,
        candidates: Vec<Profile>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> MatchResult {
        let total_candidates = candidates.len();

        let mut partners: Vec<RankedPartner> = candidates
            .into_iter()
            .filter(|profile| matches_at(profile, criteria, requester, now))
            .filter_map(|profile| {
                let compatibility = score(requester, &profile);
                if compatibility.value < self.min_score {
                    return None;
                }

                Some(RankedPartner {
                    distance_miles: distance_between(requester.location, profile.location)
                        .filter(|d| d.is_finite()),
                    match_score: compatibility.value,
                    is_complementary: compatibility.is_complementary(),
                    teachable: compatibility.teachable,
                    learnable: compatibility.learnable,
                    is_verified: profile.is_verified,
                    last_active: profile.last_active,
                    user_id: profile.user_id,
                })
            })
            .collect();

        partners.sort_by(rank_order);
        partners.truncate(limit);

        MatchResult {
            partners,
            total_candidates,
        }
    }
}

fn rank_order(a: &RankedPartner, b: &RankedPartner) -> Ordering {
    b.match_score
        .cmp(&a.match_score)
        .then_with(|| b.is_complementary.cmp(&a.is_complementary))
        .then_with(|| b.is_verified.cmp(&a.is_verified))
        .then_with(|| b.last_active.cmp(&a.last_active))
        .then_with(|| a.user_id.cmp(&b.user_id))
}
