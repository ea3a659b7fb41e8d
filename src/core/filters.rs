use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;

use crate::core::{distance::haversine_miles, scoring::{complementary, shared_tags}};
use crate::models::{normalize_code, FilterCriteria, Profile};

/// Check if `profile` passes the requester's filter criteria, as of now
pub fn matches(profile: &Profile, criteria: &FilterCriteria, requester: &Profile) -> bool {
    matches_at(profile, criteria, requester, Utc::now())
}

/// Check if `profile` passes the requester's filter criteria at time `now`
///
/// Checks run cheapest-first and stop at the first failure:
/// self, verification, complementarity, languages, proficiency, tags,
/// recency, then distance.
pub fn matches_at(
    profile: &Profile,
    criteria: &FilterCriteria,
    requester: &Profile,
    now: DateTime<Utc>,
) -> bool {
    if profile.user_id == requester.user_id {
        return false;
    }

    if criteria.verified_only && !profile.is_verified {
        return false;
    }

    if criteria.complementary_only && !complementary(requester, profile) {
        return false;
    }

    if !criteria.languages_wanted.is_empty()
        && !intersects_codes(&criteria.languages_wanted, &profile.taught_codes())
    {
        return false;
    }

    if !criteria.languages_offered.is_empty()
        && !intersects_codes(&criteria.languages_offered, &profile.wanted_codes())
    {
        return false;
    }

    if let Some(min) = criteria.min_proficiency {
        if !profile.teaches.iter().any(|l| l.proficiency >= min) {
            return false;
        }
    }

    let tag_filters = [
        (&criteria.learning_goals, &profile.learning_goals),
        (&criteria.practice_methods, &profile.practice_methods),
        (&criteria.availability, &profile.availability),
        (&criteria.topics, &profile.topics),
    ];
    for (wanted, held) in tag_filters {
        if !wanted.is_empty() && shared_tags(wanted, held).is_empty() {
            return false;
        }
    }

    if let Some(days) = criteria.active_within_days {
        if !is_recently_active(profile, days, now) {
            return false;
        }
    }

    within_distance(profile, criteria, requester)
}

/// `now - last_active <= days`
#[inline]
pub fn is_recently_active(profile: &Profile, days: u32, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(profile.last_active) <= Duration::days(i64::from(days))
}

/// Distance constraint; unconstrained unless a positive maximum is set and
/// both parties have a location
#[inline]
fn within_distance(profile: &Profile, criteria: &FilterCriteria, requester: &Profile) -> bool {
    let max = match criteria.max_distance_miles {
        Some(max) if max > 0.0 => max,
        _ => return true,
    };

    match (requester.location, profile.location) {
        (Some(from), Some(to)) => haversine_miles(from, to) <= max,
        _ => true,
    }
}

#[inline]
fn intersects_codes(raw: &BTreeSet<String>, normalized: &BTreeSet<String>) -> bool {
    raw.iter().any(|code| normalized.contains(&normalize_code(code)))
}
