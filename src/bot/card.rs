//! Card generator: renders a parsed request into a shareable challenge card.

use rand::Rng;

use super::model::{CURRENCY, ChallengeCard, ChallengeKind, ChallengeRequest};

/// Path segment between the app URL and the card id.
const CHALLENGE_PATH: &str = "challenge";

/// Length of the random id suffix.
const ID_SUFFIX_LEN: usize = 9;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Builds challenge cards. Holds only the base URL used for deep links.
#[derive(Debug, Clone)]
pub struct CardGenerator {
    app_url: String,
}

impl CardGenerator {
    pub fn new(app_url: impl Into<String>) -> Self {
        let app_url = app_url.into();
        Self {
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    /// Render a card for `request`. The id is fresh on every call.
    pub fn generate(&self, request: &ChallengeRequest) -> ChallengeCard {
        let id = new_card_id();
        let (title, description) = render(request);
        let link = format!("{}/{CHALLENGE_PATH}/{id}", self.app_url);

        ChallengeCard {
            id,
            title,
            description,
            stake_amount: request.amount,
            time_limit: format!("{}h", request.duration),
            link,
        }
    }
}

/// Title and description for the request's kind.
fn render(request: &ChallengeRequest) -> (String, String) {
    let challenger = &request.challenger;
    let opponent = request.opponent.as_deref().unwrap_or_default();
    let stance = format!("{challenger} says {} / {CURRENCY}{}", request.side, request.amount);

    match request.kind {
        ChallengeKind::P2p => (
            format!("P2P Challenge: {challenger} vs {opponent}"),
            format!("{}\n{stance}", request.topic),
        ),
        ChallengeKind::Open => (
            format!("Open Challenge: {}", request.topic),
            format!("{stance}\nAnyone can oppose!"),
        ),
        ChallengeKind::Squad => (
            format!("Squad Challenge: {challenger} vs {opponent}"),
            format!("{}\n{stance}\nFriends can back both sides!", request.topic),
        ),
    }
}

/// `challenge_{unix_millis}_{9 base36 chars}`.
fn new_card_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("challenge_{millis}_{suffix}")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::bot::model::{Side, Terms};

    fn terms(duration: u32) -> Terms {
        Terms {
            side: Side::Yes,
            amount: 100,
            topic: "Will it rain tomorrow?".into(),
            duration,
        }
    }

    #[test]
    fn p2p_card() {
        let generator = CardGenerator::new("https://bantabro.com/");
        let request = ChallengeRequest::p2p("@bob", "@alice", terms(24), None);
        let card = generator.generate(&request);

        assert_eq!(card.title, "P2P Challenge: @bob vs @alice");
        assert_eq!(card.description, "Will it rain tomorrow?\n@bob says YES / ₦100");
        assert_eq!(card.stake_amount, request.amount);
        assert_eq!(card.time_limit, "24h");
        assert_eq!(card.link, format!("https://bantabro.com/challenge/{}", card.id));
    }

    #[test]
    fn open_card() {
        let generator = CardGenerator::new("https://bantabro.com");
        let request = ChallengeRequest::open("@trader", terms(12), Some(25));
        let card = generator.generate(&request);

        assert_eq!(card.title, "Open Challenge: Will it rain tomorrow?");
        assert!(card.description.starts_with("@trader says YES / ₦100"));
        assert!(card.description.ends_with("Anyone can oppose!"));
        assert_eq!(card.time_limit, "12h");
    }

    #[test]
    fn squad_card() {
        let generator = CardGenerator::new("https://bantabro.com");
        let request = ChallengeRequest::squad("@captain", "@team", terms(24));
        let card = generator.generate(&request);

        assert_eq!(card.title, "Squad Challenge: @captain vs @team");
        assert!(card.description.contains("@captain says YES"));
        assert!(card.description.ends_with("Friends can back both sides!"));
    }

    #[test]
    fn id_format() {
        let id = new_card_id();
        let parts: Vec<&str> = id.splitn(3, '_').collect();
        assert_eq!(parts[0], "challenge");
        let millis: i64 = parts[1].parse().unwrap();
        assert!((chrono::Utc::now().timestamp_millis() - millis).abs() < 5_000);
        assert_eq!(parts[2].len(), ID_SUFFIX_LEN);
    }

    #[test]
    fn concurrent_ids_do_not_collide() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..500).map(|_| new_card_id()).collect::<Vec<_>>()))
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate card id");
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
