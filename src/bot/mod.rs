//! The cast command pipeline: parser, card generator, notifier, processor.

pub mod card;
pub mod model;
pub mod notifier;
pub mod parser;
pub mod processor;

pub use card::CardGenerator;
pub use model::{Cast, CastOutcome, ChallengeCard, ChallengeKind, ChallengeRequest, Side};
pub use notifier::{Notifier, TelegramNotifier};
pub use parser::CommandParser;
pub use processor::CastProcessor;
