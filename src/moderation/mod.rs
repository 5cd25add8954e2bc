//! Moderation workflow for parsed challenges.

pub mod queue;

pub use queue::{Decision, ModerationQueue};
