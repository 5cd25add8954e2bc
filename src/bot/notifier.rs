//! Moderator alerts: tells the moderation channel a challenge is waiting.
//!
//! Delivery is best effort. Missing credentials skip the alert, and a
//! failed send is logged and dropped. Nothing here retries or returns an
//! error to the cast pipeline.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::{error, info, warn};

use super::model::{CURRENCY, ChallengeRequest};
use crate::config::{BotConfig, TelegramConfig};
use crate::error::ChannelError;

/// Where alerts link back to the originating cast.
const CAST_URL_BASE: &str = "https://warpcast.com/~/casts";

/// Telegram's sendMessage length cap.
const TELEGRAM_MAX_MESSAGE_LENGTH: usize = 4096;

/// Sink for "new challenge request" alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Alert moderators about `request`. Never fails from the caller's view.
    async fn notify(&self, request: &ChallengeRequest, cast_hash: &str);
}

/// Render the moderator alert text.
pub fn format_alert(request: &ChallengeRequest, cast_hash: &str, dashboard_url: &str) -> String {
    let mut lines = vec![
        "🚨 New Challenge Request".to_string(),
        String::new(),
        format!("Type: {}", request.kind.to_string().to_uppercase()),
        format!("Challenger: {}", request.challenger),
    ];
    if let Some(opponent) = &request.opponent {
        lines.push(format!("Opponent: {opponent}"));
    }
    lines.push(format!("Topic: {}", request.topic));
    lines.push(format!("Side: {}", request.side));
    lines.push(format!("Amount: {CURRENCY}{}", request.amount));
    lines.push(format!("Duration: {}h", request.duration));
    if let Some(bonus) = request.bonus {
        lines.push(format!("Bonus: {CURRENCY}{bonus}"));
    }
    lines.push(String::new());
    lines.push(format!("Cast: {CAST_URL_BASE}/{cast_hash}"));
    lines.push(String::new());
    lines.push(format!("Approve in dashboard: {dashboard_url}"));
    lines.join("\n")
}

/// Sends alerts to a Telegram chat through the Bot API.
pub struct TelegramNotifier {
    credentials: Option<TelegramConfig>,
    api_url: String,
    dashboard_url: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    pub fn new(config: &BotConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.notify_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to build Telegram HTTP client with timeout; using defaults");
                reqwest::Client::new()
            });

        Self {
            credentials: config.telegram.clone(),
            api_url: config.telegram_api_url.trim_end_matches('/').to_string(),
            dashboard_url: config.dashboard_url.clone(),
            client,
        }
    }

    /// Whether alerts will actually be attempted.
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn api_url(&self, credentials: &TelegramConfig, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.api_url,
            credentials.bot_token.expose_secret()
        )
    }

    /// Post one alert. Sent as plain text: handles and card ids contain
    /// underscores that Telegram's Markdown parser rejects.
    pub async fn send_alert(&self, text: &str) -> Result<(), ChannelError> {
        let Some(credentials) = &self.credentials else {
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: "credentials not configured".into(),
            });
        };

        let text: String = text.chars().take(TELEGRAM_MAX_MESSAGE_LENGTH).collect();
        let body = serde_json::json!({
            "chat_id": credentials.chat_id,
            "text": text,
        });

        let resp = self
            .client
            .post(self.api_url(credentials, "sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ChannelError::Http(e.without_url().to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let err = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage returned {status}: {err}"),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, request: &ChallengeRequest, cast_hash: &str) {
        if !self.is_configured() {
            warn!("Telegram credentials not configured; skipping moderator alert");
            return;
        }

        let text = format_alert(request, cast_hash, &self.dashboard_url);
        match self.send_alert(&text).await {
            Ok(()) => info!(
                kind = %request.kind,
                challenger = %request.challenger,
                cast_hash = cast_hash,
                "Moderator alert sent"
            ),
            Err(e) => error!(error = %e, cast_hash = cast_hash, "Failed to send moderator alert"),
        }
    }
}
