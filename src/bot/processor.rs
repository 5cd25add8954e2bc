//! Cast processor: parse, render, alert, and compose the bot's reply.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::card::CardGenerator;
use super::model::{CURRENCY, Cast, CastOutcome, ChallengeCard, ChallengeRequest};
use super::notifier::Notifier;
use super::parser::CommandParser;
use crate::config::BotConfig;
use crate::error::ConfigError;

/// Orchestrates one inbound cast. Stateless apart from the notifier handle;
/// build once and share behind an `Arc`.
pub struct CastProcessor {
    trigger: String,
    parser: CommandParser,
    generator: CardGenerator,
    notifier: Arc<dyn Notifier>,
    notify_timeout: Duration,
}

impl CastProcessor {
    pub fn new(config: &BotConfig, notifier: Arc<dyn Notifier>) -> Result<Self, ConfigError> {
        Ok(Self {
            trigger: config.trigger.clone(),
            parser: CommandParser::new(&config.trigger)?,
            generator: CardGenerator::new(&config.app_url),
            notifier,
            notify_timeout: config.notify_timeout,
        })
    }

    /// Usage reply sent when a mention is not a recognizable command.
    pub fn help_text(&self) -> String {
        help_text(&self.trigger)
    }

    /// Process a cast as delivered by the integration.
    pub async fn process_cast(&self, cast: &Cast) -> CastOutcome {
        self.process(&cast.cast_text, &cast.author_handle(), &cast.cast_hash)
            .await
    }

    /// Process one cast's text on behalf of `author`.
    pub async fn process(&self, text: &str, author: &str, cast_hash: &str) -> CastOutcome {
        if !text.to_lowercase().contains(&self.trigger.to_lowercase()) {
            return CastOutcome::ignored();
        }

        let Some((request, card)) = self.preview(text, author) else {
            debug!(author = author, "Mention without a recognizable command");
            return CastOutcome::reply(self.help_text());
        };

        info!(
            card_id = %card.id,
            kind = %request.kind,
            challenger = %request.challenger,
            amount = request.amount,
            "Challenge card generated"
        );

        let alert = self.notifier.notify(&request, cast_hash);
        if tokio::time::timeout(self.notify_timeout, alert).await.is_err() {
            warn!(card_id = %card.id, "Moderator alert timed out");
        }

        CastOutcome::reply(compose_reply(&card)).with_card(card, request)
    }

    /// Parse and render without alerting anyone.
    pub fn preview(&self, text: &str, author: &str) -> Option<(ChallengeRequest, ChallengeCard)> {
        let request = self.parser.parse(text, author)?;
        let card = self.generator.generate(&request);
        Some((request, card))
    }
}

fn help_text(trigger: &str) -> String {
    format!(
        "🤔 Didn't understand that command. Try:\n\
         {trigger} challenge @opponent YES/NO amount \"topic\" duration\n\n\
         Example: {trigger} challenge @alice YES 100 \"Will it rain tomorrow?\" 24h"
    )
}

fn compose_reply(card: &ChallengeCard) -> String {
    format!(
        "🔥 Challenge Detected!\n\n\
         {title}\n\
         💰 Stake: {CURRENCY}{stake}\n\
         ⏳ Time: {time}\n\n\
         {description}\n\n\
         Tap to accept or oppose 👇\n\
         {link}",
        title = card.title,
        stake = card.stake_amount,
        time = card.time_limit,
        description = card.description,
        link = card.link,
    )
}
