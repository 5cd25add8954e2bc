//! Moderation console: stdin/stdout REPL for feeding casts and deciding
//! pending challenges locally.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::bot::model::Cast;
use crate::bot::processor::CastProcessor;
use crate::moderation::{Decision, ModerationQueue};
use crate::store::Database;

const USAGE: &str = "\
Commands:
  /cast <fid> <hash> <text>   process a cast and queue its card
  /preview <text>             parse without alerting or queueing
  /pending                    list pending challenges
  /approve <card_id>          approve a pending challenge
  /reject <card_id>           reject a pending challenge
  /challenges                 list live challenges
  /quit                       exit
Any other line is processed as a cast from @local.";

/// One console instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Cast(Cast),
    Preview(String),
    Pending,
    Approve(String),
    Reject(String),
    Challenges,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if !line.starts_with('/') {
            return Ok(Self::Cast(Cast::new(line, "@local", "local")));
        }

        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        match name {
            "/cast" => {
                let mut parts = rest.splitn(3, char::is_whitespace);
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(fid), Some(hash), Some(text)) if !fid.is_empty() => {
                        Ok(Self::Cast(Cast::new(text.trim(), fid, hash)))
                    }
                    _ => Err("usage: /cast <fid> <hash> <text>".into()),
                }
            }
            "/preview" if !rest.is_empty() => Ok(Self::Preview(rest.to_string())),
            "/approve" if !rest.is_empty() => Ok(Self::Approve(rest.to_string())),
            "/reject" if !rest.is_empty() => Ok(Self::Reject(rest.to_string())),
            "/pending" => Ok(Self::Pending),
            "/challenges" => Ok(Self::Challenges),
            "/help" => Ok(Self::Help),
            "/quit" | "/exit" => Ok(Self::Quit),
            _ => Err(format!("unknown or incomplete command: {line}")),
        }
    }
}

pub struct Console {
    processor: Arc<CastProcessor>,
    queue: Arc<ModerationQueue>,
    db: Arc<dyn Database>,
}

impl Console {
    pub fn new(
        processor: Arc<CastProcessor>,
        queue: Arc<ModerationQueue>,
        db: Arc<dyn Database>,
    ) -> Self {
        Self {
            processor,
            queue,
            db,
        }
    }

    /// Run one command and return what to print.
    pub async fn execute(&self, command: Command) -> anyhow::Result<String> {
        let output = match command {
            Command::Cast(cast) => {
                let outcome = self.processor.process_cast(&cast).await;
                if !outcome.should_reply {
                    return Ok("(not a command; no reply)".into());
                }
                let mut out = outcome.reply_text.clone().unwrap_or_default();
                if let Some(pending) = self.queue.submit(&outcome, &cast.cast_hash).await? {
                    out.push_str(&format!("\n\n[queued {} for moderation]", pending.card_id()));
                }
                out
            }
            Command::Preview(text) => match self.processor.preview(&text, "@local") {
                Some((request, card)) => format!(
                    "{}\n{}",
                    serde_json::to_string_pretty(&request)?,
                    serde_json::to_string_pretty(&card)?
                ),
                None => "Could not parse command".into(),
            },
            Command::Pending => {
                let pending = self.queue.pending().await?;
                if pending.is_empty() {
                    "No pending challenges".into()
                } else {
                    pending
                        .iter()
                        .map(|p| format!("{}  {}  [{}]", p.card.id, p.card.title, p.card.time_limit))
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Command::Approve(card_id) => match self.queue.decide(&card_id, true).await? {
                Decision::Approved(c) => format!("Approved {card_id} as challenge #{}", c.id),
                Decision::Rejected => format!("Rejected {card_id}"),
            },
            Command::Reject(card_id) => {
                self.queue.decide(&card_id, false).await?;
                format!("Rejected {card_id}")
            }
            Command::Challenges => {
                let challenges = self.db.list_challenges().await?;
                if challenges.is_empty() {
                    "No live challenges".into()
                } else {
                    challenges
                        .iter()
                        .map(|c| {
                            format!(
                                "#{} {} {} vs {} ({}) {}",
                                c.id,
                                c.kind,
                                c.challenger,
                                if c.opponent.is_empty() { "anyone" } else { c.opponent.as_str() },
                                c.topic,
                                if c.is_yes { "YES" } else { "NO" },
                            )
                        })
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            }
            Command::Help => USAGE.to_string(),
            Command::Quit => String::new(),
        };
        Ok(output)
    }

    /// Read commands from stdin until EOF or `/quit`.
    pub async fn run(&self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        eprint!("> ");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                eprint!("> ");
                continue;
            }
            match Command::parse(&line) {
                Ok(Command::Quit) => break,
                Ok(command) => match self.execute(command).await {
                    Ok(output) => println!("\n{output}\n"),
                    Err(e) => eprintln!("❌ {e}"),
                },
                Err(e) => eprintln!("❌ {e}"),
            }
            eprint!("> ");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::notifier::TelegramNotifier;
    use crate::config::BotConfig;
    use crate::store::LibSqlBackend;

    async fn console() -> Console {
        let config = BotConfig::default();
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let processor =
            CastProcessor::new(&config, Arc::new(TelegramNotifier::new(&config))).unwrap();
        Console::new(
            Arc::new(processor),
            ModerationQueue::new(Arc::clone(&db)),
            db,
        )
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            Command::parse("/cast 42 0xab @bantabro challenge NO 5 rain").unwrap(),
            Command::Cast(Cast::new("@bantabro challenge NO 5 rain", "42", "0xab"))
        );
        assert_eq!(Command::parse("/pending").unwrap(), Command::Pending);
        assert_eq!(
            Command::parse("/approve challenge_1_a").unwrap(),
            Command::Approve("challenge_1_a".into())
        );
        assert_eq!(Command::parse("/quit").unwrap(), Command::Quit);
        assert!(Command::parse("/approve").is_err());
        assert!(Command::parse("/cast 42").is_err());
        assert!(Command::parse("/nope").is_err());
    }

    #[test]
    fn bare_line_is_a_local_cast() {
        match Command::parse("@bantabro challenge NO 5 rain").unwrap() {
            Command::Cast(cast) => assert_eq!(cast.author_handle(), "@local"),
            other => panic!("Expected Cast, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cast_then_approve() {
        let console = console().await;

        let out = console
            .execute(Command::parse("/cast 7 0xab @bantabro challenge @alice YES 10 rain").unwrap())
            .await
            .unwrap();
        assert!(out.contains("Challenge Detected!"));
        assert!(out.contains("[queued challenge_"));

        let pending = console.queue.pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].request.challenger, "@user_7");
        let card_id = pending[0].card.id.clone();

        let out = console.execute(Command::Approve(card_id)).await.unwrap();
        assert!(out.contains("as challenge #1"));

        let out = console.execute(Command::Challenges).await.unwrap();
        assert!(out.contains("@user_7 vs @alice"));
    }

    #[tokio::test]
    async fn help_reply_is_not_queued() {
        let console = console().await;
        let out = console
            .execute(Command::parse("@bantabro hello world").unwrap())
            .await
            .unwrap();
        assert!(out.starts_with("🤔"));
        assert_eq!(
            console.execute(Command::Pending).await.unwrap(),
            "No pending challenges"
        );
    }

    #[tokio::test]
    async fn approving_unknown_card_is_an_error() {
        let console = console().await;
        assert!(console.execute(Command::Approve("missing".into())).await.is_err());
    }
}
