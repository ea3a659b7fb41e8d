// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    normalize_code, BoundingBox, CompatibilityScore, ConnectionEdge, Coordinate, EdgeDirection,
    EdgeKind, FilterCriteria, LanguageProficiency, Match, MatchPair, ProficiencyTier, Profile,
    RankedPartner, ScoreBreakdown,
};
pub use requests::{ConnectionRequest, ConnectionStateQuery, FindPartnersRequest, UserQuery};
pub use responses::{
    AckResponse, ConnectionState, EdgeListResponse, ErrorResponse, FindPartnersResponse,
    HealthResponse, InterestResponse,
};
