//! Digressions: optional side exchanges the spirit slips in between questions.
//!
//! Selection is weighted by the current personality: each digression kind has
//! a per-personality base weight, boosted by half when the digression's own
//! mood matches. Already-told digressions are skipped until the pool runs dry.

use super::table::DialogueError;
use super::types::Personality;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Chance that a question transition detours through a digression.
pub const DIGRESSION_PROBABILITY: f64 = 0.35;

/// Weight for a kind a personality has no entry for.
pub const DEFAULT_KIND_WEIGHT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigressionKind {
    Story,
    Fact,
    Question,
    Joke,
    Complaint,
}

/// A reply button offered during a digression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigressionReply {
    pub label: String,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Digression {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: DigressionKind,
    pub mood: Personality,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<DigressionReply>,
    #[serde(default)]
    pub auto_advance: bool,
}

impl Digression {
    /// Whether the flow should wait for a reply button instead of moving on
    /// by itself after the read time.
    pub fn awaits_reply(&self) -> bool {
        !self.auto_advance && !self.replies.is_empty()
    }
}

/// Immutable digression reference data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigressionCatalog {
    #[serde(default)]
    pub digressions: Vec<Digression>,
    #[serde(default)]
    pub weights: BTreeMap<Personality, BTreeMap<DigressionKind, u32>>,
}

impl DigressionCatalog {
    /// Base weight of `kind` for `personality`.
    pub fn kind_weight(&self, personality: Personality, kind: DigressionKind) -> u32 {
        self.weights
            .get(&personality)
            .and_then(|w| w.get(&kind))
            .copied()
            .unwrap_or(DEFAULT_KIND_WEIGHT)
    }

    /// Final integer weight: base weight, x1.5 on mood match, truncated.
    pub fn weight_of(&self, digression: &Digression, personality: Personality) -> u32 {
        let base = self.kind_weight(personality, digression.kind) as f64;
        let bonus = if digression.mood == personality { 1.5 } else { 1.0 };
        (base * bonus).floor() as u32
    }

    pub fn validate(&self) -> Result<(), DialogueError> {
        let mut seen = HashSet::new();
        for d in &self.digressions {
            if d.message.trim().is_empty() {
                return Err(DialogueError::EmptyDigression(d.id.clone()));
            }
            if !seen.insert(d.id.as_str()) {
                return Err(DialogueError::DuplicateDigression(d.id.clone()));
            }
        }
        Ok(())
    }

    pub fn builtin() -> Self {
        use DigressionKind::*;
        use Personality::*;

        let digressions = vec![
            tell("squirrel-heist", Story, Playful,
                "Wait, did I tell you about the squirrel who stole my acorns? Every single one. In broad daylight! 🐿️",
                &[("No way!", "Way! He even came back for the cap."), ("Classic squirrel", "Right?! Not even a thank-you note.")]),
            tell("rings-age", Fact, Friendly,
                "Fun fact: you can tell a tree's age by its rings. I stopped counting mine after three hundred.",
                &[]),
            tell("moss-north", Fact, Friendly,
                "Did you know moss doesn't really point north? That's a myth. Moss just likes shade, same as me at noon.",
                &[]),
            tell("favorite-season", Question, Friendly,
                "Quick question before we go on: what's your favorite season?",
                &[("Spring", "Fresh buds! My favorite too 🌱"), ("Autumn", "Ah, the great leaf fashion show 🍂"), ("Winter", "Brr. Bold choice. I mostly nap.")]),
            tell("owl-joke", Joke, Playful,
                "Why did the owl invite its friends over? Because it didn't want to be owl by itself! 🦉",
                &[("Ha!", "I've got a whole trunk of these."), ("Groan", "Tough crowd, tough bark.")]),
            tell("leaf-joke", Joke, Playful,
                "What did the tree say when spring came? What a re-leaf! 🍃",
                &[]),
            tell("woodpecker", Complaint, Grumpy,
                "Ugh, that woodpecker is back. Knock-knock, all day long. Nobody's home!",
                &[("Poor you", "Finally, some sympathy."), ("Just ignore it", "Easy for you to say, you don't have a trunk.")]),
            tell("hikers", Complaint, Grumpy,
                "People keep carving hearts into my neighbour. Romantic? No. Itchy? Very.",
                &[]),
            tell("old-storm", Story, Friendly,
                "Once a storm bent me almost to the ground. I stood back up, slowly. Trees are patient like that.",
                &[]),
            tell("mushroom-ring", Story, Playful,
                "Last night the mushrooms threw a party in a perfect ring. I wasn't invited. Again.",
                &[("Rude!", "Thank you! I'm organizing my own, you're invited.")]),
        ];

        let mut weights = BTreeMap::new();
        weights.insert(
            Friendly,
            BTreeMap::from([(Story, 15), (Fact, 20), (Question, 15), (Joke, 10), (Complaint, 3)]),
        );
        weights.insert(
            Playful,
            BTreeMap::from([(Story, 10), (Fact, 10), (Question, 10), (Joke, 25), (Complaint, 5)]),
        );
        weights.insert(
            Grumpy,
            BTreeMap::from([(Story, 5), (Fact, 5), (Question, 3), (Joke, 5), (Complaint, 25)]),
        );

        Self {
            digressions,
            weights,
        }
    }
}

fn tell(
    id: &str,
    kind: DigressionKind,
    mood: Personality,
    message: &str,
    replies: &[(&str, &str)],
) -> Digression {
    Digression {
        id: id.to_string(),
        kind,
        mood,
        message: message.to_string(),
        replies: replies
            .iter()
            .map(|(label, response)| DigressionReply {
                label: label.to_string(),
                response: response.to_string(),
            })
            .collect(),
        auto_advance: replies.is_empty(),
    }
}

/// Bernoulli draw deciding whether a transition detours through a digression.
pub fn should_digress<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> bool {
    rng.gen_bool(probability.clamp(0.0, 1.0))
}

/// Remembers which digressions were already told.
#[derive(Debug, Default)]
pub struct DigressionSelector {
    used: HashSet<String>,
}

impl DigressionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a digression for `personality`, never one in `exclude` and never
    /// an already-told one unless every candidate has been told.
    pub fn select<R: Rng + ?Sized>(
        &mut self,
        catalog: &DigressionCatalog,
        personality: Personality,
        exclude: &[&str],
        rng: &mut R,
    ) -> Option<Digression> {
        let mut candidates = self.candidates(catalog, exclude);
        if candidates.is_empty() {
            if self.used.is_empty() {
                return None;
            }
            tracing::debug!("[Digression] Pool exhausted, clearing history");
            self.used.clear();
            candidates = self.candidates(catalog, exclude);
        }

        let weights: Vec<u32> = candidates
            .iter()
            .map(|d| catalog.weight_of(d, personality))
            .collect();
        // Fails when every weight is zero
        let dist = WeightedIndex::new(&weights).ok()?;
        let chosen = candidates[dist.sample(rng)].clone();

        tracing::debug!(
            "[Digression] Picked '{}' ({:?}) for {} mood",
            chosen.id,
            chosen.kind,
            personality
        );
        self.used.insert(chosen.id.clone());
        Some(chosen)
    }

    pub fn used_ids(&self) -> &HashSet<String> {
        &self.used
    }

    fn candidates<'a>(&self, catalog: &'a DigressionCatalog, exclude: &[&str]) -> Vec<&'a Digression> {
        catalog
            .digressions
            .iter()
            .filter(|d| !self.used.contains(&d.id) && !exclude.contains(&d.id.as_str()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn digression(id: &str, kind: DigressionKind, mood: Personality) -> Digression {
        Digression {
            id: id.to_string(),
            kind,
            mood,
            message: format!("message {}", id),
            replies: vec![],
            auto_advance: true,
        }
    }

    #[test]
    fn weight_applies_mood_bonus_and_truncates() {
        let mut catalog = DigressionCatalog::default();
        catalog.weights.insert(
            Personality::Playful,
            BTreeMap::from([(DigressionKind::Joke, 25), (DigressionKind::Fact, 3)]),
        );
        let joke = digression("j", DigressionKind::Joke, Personality::Playful);
        let fact = digression("f", DigressionKind::Fact, Personality::Playful);
        let story = digression("s", DigressionKind::Story, Personality::Grumpy);

        // 25 * 1.5 = 37.5 -> 37
        assert_eq!(catalog.weight_of(&joke, Personality::Playful), 37);
        // 3 * 1.5 = 4.5 -> 4
        assert_eq!(catalog.weight_of(&fact, Personality::Playful), 4);
        // unlisted kind falls back to the default, no bonus
        assert_eq!(catalog.weight_of(&story, Personality::Playful), DEFAULT_KIND_WEIGHT);
    }

    #[test]
    fn no_repeat_until_exhausted() {
        let catalog = DigressionCatalog::builtin();
        let mut selector = DigressionSelector::new();
        let mut rng = StdRng::seed_from_u64(7);
        let total = catalog.digressions.len();

        let mut seen = HashSet::new();
        for _ in 0..total {
            let d = selector
                .select(&catalog, Personality::Friendly, &[], &mut rng)
                .unwrap();
            assert!(seen.insert(d.id), "digression repeated before exhaustion");
        }
        assert_eq!(selector.used_ids().len(), total);

        // Next pick resets the history and still succeeds
        assert!(selector
            .select(&catalog, Personality::Friendly, &[], &mut rng)
            .is_some());
        assert_eq!(selector.used_ids().len(), 1);
    }

    #[test]
    fn excluded_ids_are_never_picked() {
        let catalog = DigressionCatalog::builtin();
        let mut selector = DigressionSelector::new();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let d = selector
                .select(&catalog, Personality::Grumpy, &["woodpecker", "hikers"], &mut rng)
                .unwrap();
            assert_ne!(d.id, "woodpecker");
            assert_ne!(d.id, "hikers");
        }
    }

    #[test]
    fn empty_catalog_yields_none() {
        let catalog = DigressionCatalog::default();
        let mut selector = DigressionSelector::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(selector
            .select(&catalog, Personality::Friendly, &[], &mut rng)
            .is_none());
    }

    #[test]
    fn fully_excluded_catalog_yields_none() {
        let mut catalog = DigressionCatalog::default();
        catalog
            .digressions
            .push(digression("only", DigressionKind::Fact, Personality::Friendly));
        let mut selector = DigressionSelector::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(selector
            .select(&catalog, Personality::Friendly, &["only"], &mut rng)
            .is_none());
    }

    #[test]
    fn zero_weights_yield_none() {
        let mut catalog = DigressionCatalog::default();
        catalog
            .digressions
            .push(digression("mute", DigressionKind::Fact, Personality::Friendly));
        catalog.weights.insert(
            Personality::Grumpy,
            BTreeMap::from([(DigressionKind::Fact, 0)]),
        );
        let mut selector = DigressionSelector::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(selector
            .select(&catalog, Personality::Grumpy, &[], &mut rng)
            .is_none());
    }

    #[test]
    fn heavier_kind_is_picked_more_often() {
        let mut catalog = DigressionCatalog::default();
        catalog
            .digressions
            .push(digression("complaint", DigressionKind::Complaint, Personality::Friendly));
        catalog
            .digressions
            .push(digression("question", DigressionKind::Question, Personality::Friendly));
        catalog.weights.insert(
            Personality::Grumpy,
            BTreeMap::from([(DigressionKind::Complaint, 25), (DigressionKind::Question, 3)]),
        );

        let mut rng = StdRng::seed_from_u64(2024);
        let mut complaints = 0;
        let mut questions = 0;
        for _ in 0..2000 {
            // fresh history every trial so both candidates are always available
            let mut selector = DigressionSelector::new();
            match selector
                .select(&catalog, Personality::Grumpy, &[], &mut rng)
                .unwrap()
                .kind
            {
                DigressionKind::Complaint => complaints += 1,
                DigressionKind::Question => questions += 1,
                _ => unreachable!(),
            }
        }
        // expected ratio 25:3
        assert!(
            complaints > questions * 4,
            "complaints {} vs questions {}",
            complaints,
            questions
        );
    }

    #[test]
    fn digress_probability_extremes() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(!(0..100).any(|_| should_digress(&mut rng, 0.0)));
        assert!((0..100).all(|_| should_digress(&mut rng, 1.0)));
    }

    #[test]
    fn builtin_digressions_deserialize_from_pack_json() {
        let json = serde_json::to_value(DigressionCatalog::builtin()).unwrap();
        assert_eq!(json["digressions"][0]["type"], "story");
        assert_eq!(json["weights"]["grumpy"]["complaint"], 25);
        let back: DigressionCatalog = serde_json::from_value(json).unwrap();
        back.validate().unwrap();
    }
}
