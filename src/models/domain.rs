use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// CEFR proficiency tier, ordered from beginner to native speaker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProficiencyTier {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
    Native,
}

impl ProficiencyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProficiencyTier::A1 => "A1",
            ProficiencyTier::A2 => "A2",
            ProficiencyTier::B1 => "B1",
            ProficiencyTier::B2 => "B2",
            ProficiencyTier::C1 => "C1",
            ProficiencyTier::C2 => "C2",
            ProficiencyTier::Native => "Native",
        }
    }
}

impl fmt::Display for ProficiencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProficiencyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a1" => Ok(ProficiencyTier::A1),
            "a2" => Ok(ProficiencyTier::A2),
            "b1" => Ok(ProficiencyTier::B1),
            "b2" => Ok(ProficiencyTier::B2),
            "c1" => Ok(ProficiencyTier::C1),
            "c2" => Ok(ProficiencyTier::C2),
            "native" => Ok(ProficiencyTier::Native),
            other => Err(format!("unknown proficiency tier: {}", other)),
        }
    }
}

/// A language the profile holder speaks, with their level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageProficiency {
    pub language: String,
    pub proficiency: ProficiencyTier,
}

impl LanguageProficiency {
    pub fn new(language: impl Into<String>, proficiency: ProficiencyTier) -> Self {
        Self {
            language: language.into(),
            proficiency,
        }
    }

    /// Language code normalized for comparison
    pub fn code(&self) -> String {
        normalize_code(&self.language)
    }
}

/// Lowercase, trimmed form used for every language code and tag comparison
#[inline]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Geographic coordinate in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Finite and within [-90, 90] x [-180, 180]
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Language-exchange profile
///
/// `teaches` and `wants` may name the same language code; they describe
/// different roles (teaching vs. learning) for this profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub teaches: Vec<LanguageProficiency>,
    #[serde(default)]
    pub wants: BTreeSet<String>,
    #[serde(rename = "learningGoals", default)]
    pub learning_goals: BTreeSet<String>,
    #[serde(rename = "practiceMethods", default)]
    pub practice_methods: BTreeSet<String>,
    #[serde(default)]
    pub availability: BTreeSet<String>,
    #[serde(default)]
    pub topics: BTreeSet<String>,
    #[serde(rename = "isVerified", default)]
    pub is_verified: bool,
    #[serde(rename = "lastActive")]
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<Coordinate>,
}

impl Profile {
    /// Create a bare profile with no languages or tags
    pub fn new(user_id: impl Into<String>, last_active: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            teaches: Vec::new(),
            wants: BTreeSet::new(),
            learning_goals: BTreeSet::new(),
            practice_methods: BTreeSet::new(),
            availability: BTreeSet::new(),
            topics: BTreeSet::new(),
            is_verified: false,
            last_active,
            location: None,
        }
    }

    /// Normalized codes of the languages this profile can teach
    pub fn taught_codes(&self) -> BTreeSet<String> {
        self.teaches.iter().map(LanguageProficiency::code).collect()
    }

    /// Normalized codes of the languages this profile wants to learn
    pub fn wanted_codes(&self) -> BTreeSet<String> {
        self.wants.iter().map(|code| normalize_code(code)).collect()
    }
}

/// Requester's filter criteria for partner discovery
///
/// `FilterCriteria::default()` is the empty criteria and matches everyone.
/// Criteria read back from stored preferences default `complementaryOnly`
/// to `true` when the field is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Languages the requester wants a partner to teach
    #[serde(rename = "languagesWanted", default)]
    pub languages_wanted: BTreeSet<String>,
    /// Languages the requester can offer to teach
    #[serde(rename = "languagesOffered", default)]
    pub languages_offered: BTreeSet<String>,
    #[serde(rename = "minProficiency", default)]
    pub min_proficiency: Option<ProficiencyTier>,
    #[serde(rename = "verifiedOnly", default)]
    pub verified_only: bool,
    #[serde(rename = "maxDistanceMiles", default)]
    pub max_distance_miles: Option<f64>,
    #[serde(rename = "activeWithinDays", default)]
    pub active_within_days: Option<u32>,
    #[serde(rename = "complementaryOnly", default = "default_true")]
    pub complementary_only: bool,
    #[serde(rename = "learningGoals", default)]
    pub learning_goals: BTreeSet<String>,
    #[serde(rename = "practiceMethods", default)]
    pub practice_methods: BTreeSet<String>,
    #[serde(default)]
    pub availability: BTreeSet<String>,
    #[serde(default)]
    pub topics: BTreeSet<String>,
}

fn default_true() -> bool { true }

impl FilterCriteria {
    /// Number of constraints that narrow results
    pub fn active_filter_count(&self) -> usize {
        let sets = [
            &self.languages_wanted,
            &self.languages_offered,
            &self.learning_goals,
            &self.practice_methods,
            &self.availability,
            &self.topics,
        ];

        let mut count = sets.iter().filter(|s| !s.is_empty()).count();
        if self.min_proficiency.is_some() {
            count += 1;
        }
        if self.verified_only {
            count += 1;
        }
        if self.complementary_only {
            count += 1;
        }
        if self.max_distance_miles.is_some_and(|d| d > 0.0) {
            count += 1;
        }
        if self.active_within_days.is_some() {
            count += 1;
        }
        count
    }
}

/// Kind of directional edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Interest,
    Pass,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Interest => "interest",
            EdgeKind::Pass => "pass",
        }
    }
}

/// Which end of an edge a listing is anchored on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// Edges from the user
    Outgoing,
    /// Edges pointing at the user
    Incoming,
}

/// One-way recorded interest or pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionEdge {
    #[serde(rename = "fromId")]
    pub from_id: String,
    #[serde(rename = "toId")]
    pub to_id: String,
    pub kind: EdgeKind,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Unordered pair of user ids, stored with the ids sorted
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchPair {
    first: String,
    second: String,
}

impl MatchPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    /// Deterministic match id; identical for {A,B} and {B,A}
    pub fn match_id(&self) -> String {
        let name = format!("{}:{}", self.first, self.second);
        uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes())
            .simple()
            .to_string()
    }
}

impl fmt::Display for MatchPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.first, self.second)
    }
}

/// Confirmed mutual match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    #[serde(rename = "matchId")]
    pub match_id: String,
    #[serde(rename = "user1Id")]
    pub user1_id: String,
    #[serde(rename = "user2Id")]
    pub user2_id: String,
    #[serde(rename = "matchedAt")]
    pub matched_at: DateTime<Utc>,
}

impl Match {
    pub fn from_pair(pair: &MatchPair, matched_at: DateTime<Utc>) -> Self {
        Self {
            match_id: pair.match_id(),
            user1_id: pair.first().to_string(),
            user2_id: pair.second().to_string(),
            matched_at,
        }
    }
}

/// Points earned per scoring criterion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub teachable: u8,
    pub learnable: u8,
    pub goals: u8,
    pub methods: u8,
    pub availability: u8,
    pub topics: u8,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        [
            self.teachable,
            self.learnable,
            self.goals,
            self.methods,
            self.availability,
            self.topics,
        ]
        .iter()
        .map(|p| u32::from(*p))
        .sum()
    }
}

/// Compatibility of profile A with profile B
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityScore {
    pub value: u8,
    /// Languages A can teach B
    pub teachable: BTreeSet<String>,
    /// Languages A can learn from B
    pub learnable: BTreeSet<String>,
    #[serde(rename = "sharedGoals")]
    pub shared_goals: BTreeSet<String>,
    #[serde(rename = "sharedMethods")]
    pub shared_methods: BTreeSet<String>,
    #[serde(rename = "sharedAvailability")]
    pub shared_availability: BTreeSet<String>,
    #[serde(rename = "sharedTopics")]
    pub shared_topics: BTreeSet<String>,
    pub breakdown: ScoreBreakdown,
}

impl CompatibilityScore {
    /// Each side can teach the other at least one wanted language
    pub fn is_complementary(&self) -> bool {
        !self.teachable.is_empty() && !self.learnable.is_empty()
    }
}

/// Ranked discovery result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedPartner {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "matchScore")]
    pub match_score: u8,
    #[serde(rename = "isComplementary")]
    pub is_complementary: bool,
    #[serde(rename = "distanceMiles")]
    pub distance_miles: Option<f64>,
    pub teachable: BTreeSet<String>,
    pub learnable: BTreeSet<String>,
    #[serde(rename = "isVerified")]
    pub is_verified: bool,
    #[serde(rename = "lastActive")]
    pub last_active: DateTime<Utc>,
}

/// Geospatial bounding box
#[derive(Debug, Clone, Copy)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}
