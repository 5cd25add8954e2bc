//! Challenge data model: parsed requests, cards, and cast I/O shapes.

use serde::{Deserialize, Serialize};

/// Stake duration applied when a command omits the trailing `Nh` token.
pub const DEFAULT_DURATION_HOURS: u32 = 24;

/// Currency sign used when rendering stakes.
pub const CURRENCY: &str = "₦";

/// Which kind of wager a command asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    /// One-on-one against a named opponent.
    P2p,
    /// Anyone can take the other side.
    Open,
    /// Named opponent, friends can back both sides.
    Squad,
}

impl std::fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P2p => write!(f, "p2p"),
            Self::Open => write!(f, "open"),
            Self::Squad => write!(f, "squad"),
        }
    }
}

impl std::str::FromStr for ChallengeKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p2p" => Ok(Self::P2p),
            "open" => Ok(Self::Open),
            "squad" => Ok(Self::Squad),
            _ => Err(format!("Unknown challenge kind: {}", s)),
        }
    }
}

/// The challenger's stated position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn is_yes(self) -> bool {
        self == Self::Yes
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yes => write!(f, "YES"),
            Self::No => write!(f, "NO"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("yes") {
            Ok(Self::Yes)
        } else if s.eq_ignore_ascii_case("no") {
            Ok(Self::No)
        } else {
            Err(format!("Unknown side: {}", s))
        }
    }
}

/// A structured challenge parsed out of a cast.
///
/// Only the parser builds these, through the per-kind constructors, so an
/// `Open` request never carries an opponent and a `P2p`/`Squad` one always does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRequest {
    #[serde(rename = "type")]
    pub kind: ChallengeKind,
    pub challenger: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent: Option<String>,
    pub topic: String,
    pub side: Side,
    pub amount: u64,
    /// Resolved duration in hours.
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bonus: Option<u64>,
}

impl ChallengeRequest {
    pub fn p2p(
        challenger: impl Into<String>,
        opponent: impl Into<String>,
        terms: Terms,
        bonus: Option<u64>,
    ) -> Self {
        Self::build(ChallengeKind::P2p, challenger.into(), Some(opponent.into()), terms, bonus)
    }

    pub fn open(challenger: impl Into<String>, terms: Terms, bonus: Option<u64>) -> Self {
        Self::build(ChallengeKind::Open, challenger.into(), None, terms, bonus)
    }

    /// Squad challenges never carry a bonus.
    pub fn squad(challenger: impl Into<String>, opponent: impl Into<String>, terms: Terms) -> Self {
        Self::build(ChallengeKind::Squad, challenger.into(), Some(opponent.into()), terms, None)
    }

    fn build(
        kind: ChallengeKind,
        challenger: String,
        opponent: Option<String>,
        terms: Terms,
        bonus: Option<u64>,
    ) -> Self {
        Self {
            kind,
            challenger,
            opponent,
            topic: terms.topic,
            side: terms.side,
            amount: terms.amount,
            duration: terms.duration,
            bonus,
        }
    }
}

/// Fields every command shape shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terms {
    pub side: Side,
    pub amount: u64,
    pub topic: String,
    pub duration: u32,
}

/// Shareable summary of a parsed challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub stake_amount: u64,
    pub time_limit: String,
    pub link: String,
}

/// An inbound cast as delivered by the social-network integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cast {
    pub cast_text: String,
    pub author_fid: String,
    #[serde(default)]
    pub cast_hash: String,
}

impl Cast {
    pub fn new(
        cast_text: impl Into<String>,
        author_fid: impl Into<String>,
        cast_hash: impl Into<String>,
    ) -> Self {
        Self {
            cast_text: cast_text.into(),
            author_fid: author_fid.into(),
            cast_hash: cast_hash.into(),
        }
    }

    /// Challenger handle for the author: the fid itself if it is already a
    /// mention, else `@user_{fid}`.
    pub fn author_handle(&self) -> String {
        let fid = self.author_fid.trim();
        if fid.starts_with('@') {
            fid.to_string()
        } else {
            format!("@user_{fid}")
        }
    }
}

/// Result of processing one cast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastOutcome {
    pub should_reply: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<ChallengeCard>,
    /// Structured request behind `card`, handed to the pending store so
    /// moderation never has to read fields back out of the card text.
    #[serde(skip)]
    pub request: Option<ChallengeRequest>,
}

impl CastOutcome {
    pub fn ignored() -> Self {
        Self {
            should_reply: false,
            reply_text: None,
            card: None,
            request: None,
        }
    }

    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            should_reply: true,
            reply_text: Some(text.into()),
            card: None,
            request: None,
        }
    }

    pub fn with_card(mut self, card: ChallengeCard, request: ChallengeRequest) -> Self {
        self.card = Some(card);
        self.request = Some(request);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> Terms {
        Terms {
            side: Side::No,
            amount: 50,
            topic: "BTC to 100k".into(),
            duration: 12,
        }
    }

    #[test]
    fn request_serializes_with_type_tag() {
        let request = ChallengeRequest::open("@trader", terms(), Some(25));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["type"], "open");
        assert_eq!(json["side"], "NO");
        assert_eq!(json["bonus"], 25);
        assert!(json.get("opponent").is_none());
    }

    #[test]
    fn squad_drops_bonus() {
        let request = ChallengeRequest::squad("@captain", "@team", terms());
        assert_eq!(request.bonus, None);
        assert_eq!(request.opponent.as_deref(), Some("@team"));
    }

    #[test]
    fn card_uses_camel_case_fields() {
        let card = ChallengeCard {
            id: "challenge_1_abc".into(),
            title: "t".into(),
            description: "d".into(),
            stake_amount: 100,
            time_limit: "24h".into(),
            link: "https://bantabro.com/challenge/challenge_1_abc".into(),
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["stakeAmount"], 100);
        assert_eq!(json["timeLimit"], "24h");
    }

    #[test]
    fn author_handle_from_fid() {
        assert_eq!(Cast::new("x", "42", "h").author_handle(), "@user_42");
        assert_eq!(Cast::new("x", "@bob", "h").author_handle(), "@bob");
    }

    #[test]
    fn outcome_hides_request_on_the_wire() {
        let request = ChallengeRequest::open("@trader", terms(), None);
        let card = ChallengeCard {
            id: "c".into(),
            title: "t".into(),
            description: "d".into(),
            stake_amount: 50,
            time_limit: "12h".into(),
            link: "l".into(),
        };
        let outcome = CastOutcome::reply("hi").with_card(card, request);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["shouldReply"], true);
        assert!(json.get("request").is_none());
        assert!(outcome.request.is_some());
    }

    #[test]
    fn side_parses_any_case() {
        assert_eq!("yes".parse::<Side>().unwrap(), Side::Yes);
        assert_eq!("No".parse::<Side>().unwrap(), Side::No);
        assert!("maybe".parse::<Side>().is_err());
    }
}
