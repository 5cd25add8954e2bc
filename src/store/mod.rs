//! Persistence layer: libSQL-backed storage for challenges and the
//! pending-moderation queue.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{Challenge, Database, NewChallenge, PendingChallenge, PendingStatus};
