//! Command parser: turns a cast's free text into a [`ChallengeRequest`].
//!
//! Three independent matchers are tried in priority order and the first one
//! that produces a well-formed command wins:
//!
//! 1. squad:  `@bantabro squad challenge @opp YES 200 topic [Nh]`
//! 2. direct: `@bantabro challenge @opp YES 100 topic [Nh] [+bonus N]`
//! 3. open:   `@bantabro challenge NO 50 topic [Nh] [+bonus N]`
//!
//! The squad matcher only runs when the text mentions "squad" somewhere, and
//! then claims any opponent-shaped command. A matcher whose numeric tokens do
//! not parse as positive integers does not match, and the next one is tried.

use regex::{Captures, Regex};
use tracing::{debug, warn};

use super::model::{ChallengeRequest, DEFAULT_DURATION_HOURS, Side, Terms};
use crate::error::ConfigError;

/// Keyword that routes a command to the squad matcher.
const SQUAD_KEYWORD: &str = "squad";

/// Trailing optional tokens shared by the direct and open shapes.
const DURATION_AND_BONUS: &str = r"(?:\s+(?P<duration>\d+)h)?(?:\s+\+bonus\s+(?P<bonus>\d+))?\s*$";

/// Squad shape: opponent plus terms, duration only.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SquadCommand {
    opponent: String,
    terms: Terms,
}

/// Direct P2P shape: opponent plus terms, optional bonus.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DirectCommand {
    opponent: String,
    terms: Terms,
    bonus: Option<u64>,
}

/// Open shape: no opponent.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OpenCommand {
    terms: Terms,
    bonus: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParsedCommand {
    Squad(SquadCommand),
    Direct(DirectCommand),
    Open(OpenCommand),
}

impl ParsedCommand {
    fn into_request(self, challenger: &str) -> ChallengeRequest {
        match self {
            Self::Squad(c) => ChallengeRequest::squad(challenger, c.opponent, c.terms),
            Self::Direct(c) => ChallengeRequest::p2p(challenger, c.opponent, c.terms, c.bonus),
            Self::Open(c) => ChallengeRequest::open(challenger, c.terms, c.bonus),
        }
    }
}

/// Stateless command parser. Build once and share across handlers.
#[derive(Debug, Clone)]
pub struct CommandParser {
    squad: Regex,
    direct: Regex,
    open: Regex,
}

impl CommandParser {
    /// Compile the matchers for the given trigger mention (e.g. `@bantabro`).
    pub fn new(trigger: &str) -> Result<Self, ConfigError> {
        let t = regex::escape(trigger);
        let compile = |pattern: String| match Regex::new(&pattern) {
            Ok(re) => Ok(re),
            Err(e) => {
                warn!(trigger = trigger, "Invalid command regex '{}': {}", pattern, e);
                Err(ConfigError::InvalidValue {
                    key: "BANTABRO_TRIGGER".into(),
                    message: e.to_string(),
                })
            }
        };

        Ok(Self {
            squad: compile(format!(
                r"(?is){t}\s+(?:squad\s+)?challenge\s+(?:squad\s+)?(?P<opponent>\S+)\s+(?P<side>yes|no)\s+(?P<amount>\d+)\s+(?P<topic>.+?)(?:\s+(?P<duration>\d+)h)?\s*$"
            ))?,
            direct: compile(format!(
                r"(?is){t}\s+challenge\s+(?P<opponent>\S+)\s+(?P<side>yes|no)\s+(?P<amount>\d+)\s+(?P<topic>.+?){DURATION_AND_BONUS}"
            ))?,
            open: compile(format!(
                r"(?is){t}\s+challenge\s+(?P<side>yes|no)\s+(?P<amount>\d+)\s+(?P<topic>.+?){DURATION_AND_BONUS}"
            ))?,
        })
    }

    /// Parse `text` as a challenge command authored by `challenger`.
    ///
    /// `None` means "not a command"; callers answer with help text.
    pub fn parse(&self, text: &str, challenger: &str) -> Option<ChallengeRequest> {
        let command = self.match_command(text)?;
        debug!(challenger = challenger, command = ?command, "Parsed challenge command");
        Some(command.into_request(challenger))
    }

    fn match_command(&self, text: &str) -> Option<ParsedCommand> {
        if text.to_lowercase().contains(SQUAD_KEYWORD) {
            if let Some(c) = self.match_squad(text) {
                return Some(ParsedCommand::Squad(c));
            }
        }
        if let Some(c) = self.match_direct(text) {
            return Some(ParsedCommand::Direct(c));
        }
        self.match_open(text).map(ParsedCommand::Open)
    }

    fn match_squad(&self, text: &str) -> Option<SquadCommand> {
        let caps = self.squad.captures(text)?;
        Some(SquadCommand {
            opponent: mention(&caps["opponent"])?.to_string(),
            terms: terms(&caps)?,
        })
    }

    fn match_direct(&self, text: &str) -> Option<DirectCommand> {
        let caps = self.direct.captures(text)?;
        Some(DirectCommand {
            opponent: mention(&caps["opponent"])?.to_string(),
            terms: terms(&caps)?,
            bonus: optional_positive(&caps, "bonus")?,
        })
    }

    fn match_open(&self, text: &str) -> Option<OpenCommand> {
        let caps = self.open.captures(text)?;
        Some(OpenCommand {
            terms: terms(&caps)?,
            bonus: optional_positive(&caps, "bonus")?,
        })
    }
}

/// A real opponent is `@` followed by a word handle.
fn mention(candidate: &str) -> Option<&str> {
    let handle = candidate.strip_prefix('@')?;
    let valid = !handle.is_empty() && handle.chars().all(|c| c.is_alphanumeric() || c == '_');
    valid.then_some(candidate)
}

fn terms(caps: &Captures<'_>) -> Option<Terms> {
    let side = caps["side"].parse::<Side>().ok()?;
    let amount = money(&caps["amount"])?;
    let topic = clean_topic(&caps["topic"])?;
    let duration = match caps.name("duration") {
        Some(m) => positive::<u32>(m.as_str())?,
        None => DEFAULT_DURATION_HOURS,
    };
    Some(Terms {
        side,
        amount,
        topic,
        duration,
    })
}

/// Outer `None`: the token is present but malformed. Inner `None`: absent.
fn optional_positive(caps: &Captures<'_>, name: &str) -> Option<Option<u64>> {
    match caps.name(name) {
        Some(m) => money(m.as_str()).map(Some),
        None => Some(None),
    }
}

/// Amounts are stored as signed 64-bit integers, so anything above
/// `i64::MAX` is as malformed as a non-number.
fn money(raw: &str) -> Option<u64> {
    positive::<i64>(raw).and_then(|n| u64::try_from(n).ok())
}

fn positive<T>(raw: &str) -> Option<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    raw.parse::<T>().ok().filter(|n| *n > T::default())
}

/// Trim and drop one pair of surrounding quotes.
fn clean_topic(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = [('"', '"'), ('\u{201c}', '\u{201d}'), ('\'', '\'')]
        .iter()
        .find_map(|(open, close)| {
            trimmed
                .strip_prefix(*open)
                .and_then(|rest| rest.strip_suffix(*close))
        })
        .unwrap_or(trimmed)
        .trim();
    (!unquoted.is_empty()).then(|| unquoted.to_string())
}
