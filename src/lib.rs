//! Bantabro: challenge command parsing and moderation pipeline.

pub mod bot;
pub mod config;
pub mod console;
pub mod error;
pub mod moderation;
pub mod store;
