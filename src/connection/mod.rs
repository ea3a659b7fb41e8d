pub mod error;
pub mod guard;
pub mod manager;
pub mod retry;

pub use error::ConnectionError;
pub use guard::{PendingGuard, PendingOperationSet};
pub use manager::{Reconciliation, TransactionManager};
pub use retry::{RetryError, RetryPolicy};
