use std::collections::BTreeSet;

use crate::models::{normalize_code, CompatibilityScore, Profile, ScoreBreakdown};

/// Points per shared language in either direction, counted up to two languages
const LANGUAGE_POINTS: usize = 10;
const LANGUAGE_CAP: usize = 2;
const GOAL_POINTS: usize = 5;
const GOAL_CAP: usize = 4;
const METHOD_POINTS: usize = 5;
const METHOD_CAP: usize = 3;
const AVAILABILITY_POINTS: usize = 5;
const AVAILABILITY_CAP: usize = 3;
const TOPIC_POINTS: usize = 2;
const TOPIC_CAP: usize = 5;

pub const MAX_SCORE: u8 = 100;

/// Calculate the compatibility of profile `a` with profile `b` (0-100)
///
/// Scoring formula:
/// score = (
///     min(|teachable|, 2) * 10 +     # a teaches, b wants
///     min(|learnable|, 2) * 10 +     # a wants, b teaches
///     min(|shared goals|, 4) * 5 +
///     min(|shared methods|, 3) * 5 +
///     min(|shared availability|, 3) * 5 +
///     min(|shared topics|, 5) * 2
/// ) capped at 100
///
/// Every term is symmetric under swapping `a` and `b` (teachable and
/// learnable trade places), so `score(a, b).value == score(b, a).value`.
pub fn score(a: &Profile, b: &Profile) -> CompatibilityScore {
    let teachable = intersect(&a.taught_codes(), &b.wanted_codes());
    let learnable = intersect(&a.wanted_codes(), &b.taught_codes());

    let shared_goals = shared_tags(&a.learning_goals, &b.learning_goals);
    let shared_methods = shared_tags(&a.practice_methods, &b.practice_methods);
    let shared_availability = shared_tags(&a.availability, &b.availability);
    let shared_topics = shared_tags(&a.topics, &b.topics);

    let breakdown = ScoreBreakdown {
        teachable: points(teachable.len(), LANGUAGE_CAP, LANGUAGE_POINTS),
        learnable: points(learnable.len(), LANGUAGE_CAP, LANGUAGE_POINTS),
        goals: points(shared_goals.len(), GOAL_CAP, GOAL_POINTS),
        methods: points(shared_methods.len(), METHOD_CAP, METHOD_POINTS),
        availability: points(shared_availability.len(), AVAILABILITY_CAP, AVAILABILITY_POINTS),
        topics: points(shared_topics.len(), TOPIC_CAP, TOPIC_POINTS),
    };

    let value = breakdown.total().min(u32::from(MAX_SCORE)) as u8;

    CompatibilityScore {
        value,
        teachable,
        learnable,
        shared_goals,
        shared_methods,
        shared_availability,
        shared_topics,
        breakdown,
    }
}

/// Whether each side can teach the other at least one wanted language
///
/// Cheaper than [`score`] when only the boolean is needed.
pub fn complementary(a: &Profile, b: &Profile) -> bool {
    let a_taught = a.taught_codes();
    let a_wanted = a.wanted_codes();

    let teaches_b = b.wanted_codes().iter().any(|code| a_taught.contains(code));
    teaches_b && b.taught_codes().iter().any(|code| a_wanted.contains(code))
}

#[inline]
fn points(shared: usize, cap: usize, per_item: usize) -> u8 {
    (shared.min(cap) * per_item) as u8
}

#[inline]
fn intersect(left: &BTreeSet<String>, right: &BTreeSet<String>) -> BTreeSet<String> {
    left.intersection(right).cloned().collect()
}

/// Case-insensitive intersection of two tag sets, de-duplicated
pub(crate) fn shared_tags(left: &BTreeSet<String>, right: &BTreeSet<String>) -> BTreeSet<String> {
    let right: BTreeSet<String> = right.iter().map(|t| normalize_code(t)).collect();
    left.iter()
        .map(|t| normalize_code(t))
        .filter(|t| right.contains(t))
        .collect()
}
