// Service exports
pub mod appwrite;
pub mod error;
pub mod matches;
pub mod postgres;
pub mod rate_limit;
pub mod repository;

pub use appwrite::{AppwriteClient, AppwriteCollections, AppwriteError};
pub use error::{ErrorCode, StoreError};
pub use matches::{InMemoryMatchFactory, MatchFactory, MatchOutcome};
pub use postgres::PostgresConnectionRepository;
pub use rate_limit::{
    ActionKind, LocalRateLimiter, RateLimitAuthority, RateLimitDecision, RateLimitPolicy,
    RedisRateLimitAuthority,
};
pub use repository::{ConnectionRepository, InMemoryConnectionRepository, StoreResult};
