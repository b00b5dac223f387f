//! Dialogue tables: the authored script, keyed by step.
//!
//! Every step maps to a structured record (variants, reactions, grumpy
//! reactions, idle nudge) and the whole table is validated when it is
//! loaded, so a gap in the script is a load error rather than a blank
//! bubble at runtime.

use super::digression::DigressionCatalog;
use super::types::{Personality, Step};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("Failed to read dialogue pack: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse dialogue pack: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("No dialogue defined for step `{0}`")]
    MissingStep(Step),
    #[error("Step `{0}` has no variants")]
    EmptyVariants(Step),
    #[error("Step `{0}` has an empty timeout phrase")]
    MissingTimeoutPhrase(Step),
    #[error("Step `{step}` has no reactions for choice `{choice}`")]
    MissingReactions { step: Step, choice: String },
    #[error("Digression `{0}` has an empty message")]
    EmptyDigression(String),
    #[error("Digression id `{0}` is used more than once")]
    DuplicateDigression(String),
}

/// One pre-authored phrasing of a step's message, optionally tied to a temper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Personality>,
}

/// Script record for a single step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDialogue {
    pub variants: Vec<Variant>,
    /// Choice key -> candidate reactions, one picked at random.
    #[serde(default)]
    pub reactions: BTreeMap<String, Vec<String>>,
    /// Choice key -> the single reaction used while grumpy.
    #[serde(default)]
    pub grumpy_reactions: BTreeMap<String, String>,
    pub timeout_phrase: String,
}

/// Fixed phrases that do not belong to a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelPhrases {
    pub retry_limit: String,
    pub fetch_failed: String,
    pub submit_failed: String,
    pub custom_order: String,
    pub default_nudge: String,
}

impl Default for FunnelPhrases {
    fn default() -> Self {
        Self {
            retry_limit: "Enough shaking! My branches need a breather. Give me ten seconds. 🍂"
                .to_string(),
            fetch_failed: "Hmm, nothing fell out of the branches. The wind must be acting up. Want me to try again?"
                .to_string(),
            submit_failed: "The squirrel carrying your note dropped it. Could you send it once more?"
                .to_string(),
            custom_order: "Ooh, a custom order! Tell me what you have in mind.".to_string(),
            default_nudge: "Hey, are you still there? 👀".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueTable {
    pub steps: BTreeMap<Step, StepDialogue>,
    #[serde(default)]
    pub phrases: FunnelPhrases,
}

impl DialogueTable {
    pub fn get(&self, step: Step) -> Option<&StepDialogue> {
        self.steps.get(&step)
    }

    /// Idle nudge for a step, falling back to the generic one.
    pub fn timeout_phrase(&self, step: Step) -> &str {
        self.get(step)
            .map(|d| d.timeout_phrase.as_str())
            .filter(|p| !p.is_empty())
            .unwrap_or(&self.phrases.default_nudge)
    }

    /// Check that every step is scripted and every choice has reactions.
    pub fn validate(&self) -> Result<(), DialogueError> {
        for step in Step::ALL {
            let dialogue = self.get(step).ok_or(DialogueError::MissingStep(step))?;
            if dialogue.variants.is_empty() || dialogue.variants.iter().all(|v| v.text.is_empty())
            {
                return Err(DialogueError::EmptyVariants(step));
            }
            if dialogue.timeout_phrase.trim().is_empty() {
                return Err(DialogueError::MissingTimeoutPhrase(step));
            }
            for choice in step.choice_keys() {
                let has_reaction = dialogue
                    .reactions
                    .get(*choice)
                    .map(|r| r.iter().any(|s| !s.is_empty()))
                    .unwrap_or(false);
                if !has_reaction {
                    return Err(DialogueError::MissingReactions {
                        step,
                        choice: choice.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The authored forest-spirit script.
    pub fn builtin() -> Self {
        use Personality::{Grumpy, Playful};

        let mut steps = BTreeMap::new();

        steps.insert(
            Step::Welcome,
            record(
                &[
                    ("Hey-hey! I live here 🌿 I've seen so many curious things around these woods... Want me to show you something cool?", None),
                    ("Oh, a visitor! Don't mind the moss. Shall I find you a little green friend?", None),
                    ("Psst! Yes, you. The old tree has a secret stash of wonders. Take a peek?", None),
                ],
                &[],
                &[],
                "The forest is patient, but I'm not. Shall we start? 🌱",
            ),
        );
        steps.insert(
            Step::WelcomeReturning,
            record(
                &[
                    ("You're back! I knew the forest would call you again 🌿", None),
                    ("Oh hey, familiar footsteps! Missed me already?", None),
                    ("Welcome back, wanderer. I saved a few new leaves for you.", None),
                ],
                &[],
                &[],
                "Come on, you know how this works. Ready when you are!",
            ),
        );
        steps.insert(
            Step::Mood,
            record(
                &[
                    ("Okay! Tell me, what kind of vibe are you carrying today?", None),
                    ("First things first: what's your energy like right now?", None),
                    ("Let me read your aura... actually, just tell me your mood.", None),
                    ("Mood check! Sunbeam, storm or still pond?", Some(Playful)),
                    ("Fine. Mood. Pick one.", Some(Grumpy)),
                ],
                &[
                    ("calm", &["Calm, like a pond at dawn. Lovely 🍃", "Ah, a quiet soul. The ferns approve."]),
                    ("vibrant", &["Ooh, sparks! I can feel my leaves rustling ✨", "Vibrant! Now we're talking."]),
                    ("minimal", &["Less is more. Even I shed leaves in winter.", "Clean and simple. Respect."]),
                ],
                &[
                    ("calm", "Calm. Sure."),
                    ("vibrant", "Vibrant. Great. Loud."),
                    ("minimal", "Minimal. Like my patience."),
                ],
                "Still thinking about your mood? Take your time... but not too long 😄",
            ),
        );
        steps.insert(
            Step::Location,
            record(
                &[
                    ("Cool! And where do you spend most of your time?", None),
                    ("Where would your new green buddy live?", None),
                    ("Now tell me where it's going: home, office, somewhere else?", None),
                    ("Where's the new leafy roommate moving in? Spill!", Some(Playful)),
                    ("Where does it go. Quickly.", Some(Grumpy)),
                ],
                &[
                    ("home", &["Home, sweet home. Plants love a cozy nest 🏠", "A home plant! It'll hear all your secrets."]),
                    ("office", &["Office life needs some green, absolutely 💼", "A desk companion! Meetings will be less dull."]),
                    ("gift", &["A gift! You're a good sprout 🎁", "Giving greenery is the best kind of giving."]),
                    ("cafe", &["A cafe! Coffee and leaves, perfect match ☕", "Ooh, it'll meet so many people."]),
                ],
                &[
                    ("home", "Home. Fine."),
                    ("office", "Office. Poor thing."),
                    ("gift", "A gift. How generous."),
                    ("cafe", "Cafe. Noisy."),
                ],
                "Hello-o? Where's it going to live? 🌿",
            ),
        );
        steps.insert(
            Step::Size,
            record(
                &[
                    ("Got it. Do you have lots of space, or is it cozy?", None),
                    ("How much room are we working with?", None),
                    ("Size matters, at least for roots. Small, medium or large?", None),
                    ("Tiny sprout or towering giant? Choose wisely!", Some(Playful)),
                    ("Size. Go.", Some(Grumpy)),
                ],
                &[
                    ("small", &["Small but mighty!", "A little one. Easy to love."]),
                    ("medium", &["Medium: the golden middle of the forest.", "Not too big, not too small. Just right."]),
                    ("large", &["Big leaves energy! 🌳", "Large! Something to look up to."]),
                ],
                &[
                    ("small", "Small. Noted."),
                    ("medium", "Medium. Whatever."),
                    ("large", "Large. Heavy."),
                ],
                "Measuring your room with a ruler? I can wait... a bit.",
            ),
        );
        steps.insert(
            Step::Style,
            record(
                &[
                    ("Last little question: what's the look of your place?", None),
                    ("Almost there! What's your interior style?", None),
                    ("Final question, promise. Describe your space for me.", None),
                    ("Last one! Cozy cabin, concrete jungle or clean lines?", Some(Playful)),
                    ("Style. Then we're done.", Some(Grumpy)),
                ],
                &[
                    ("warm", &["Warm and cozy, like sunlight through leaves.", "Wood and soft light. Beautiful."]),
                    ("industrial", &["Industrial! Green on concrete looks amazing.", "Metal and brick, I like the contrast."]),
                    ("minimal", &["Minimal lines, one perfect plant. Chef's kiss.", "White walls love a splash of green."]),
                ],
                &[
                    ("warm", "Warm. Okay."),
                    ("industrial", "Industrial. Cold."),
                    ("minimal", "Minimal. Again."),
                ],
                "One last question and you're stuck? Come on! 😅",
            ),
        );
        steps.insert(
            Step::Reveal,
            record(
                &[
                    ("Okay, I found something... Let me shake my branches!", None),
                    ("Hold on, something is rustling up there...", None),
                    ("I think I know just the thing. Look what fell out!", None),
                    ("Drumroll please... *shakes violently*", Some(Playful)),
                    ("Here. Take it.", Some(Grumpy)),
                ],
                &[],
                &[],
                "Well? Do you like it? 🌿",
            ),
        );
        steps.insert(
            Step::RevealRetry,
            record(
                &[
                    ("One more shake of the branches!", None),
                    ("Not that one? Let's see what else is up there...", None),
                    ("Okay, okay, another shake! Hold on tight!", Some(Playful)),
                    ("Fine. Shaking again. Last time.", Some(Grumpy)),
                    ("*sigh* You're very picky, you know that?", Some(Grumpy)),
                ],
                &[],
                &[],
                "So, is this one better?",
            ),
        );
        steps.insert(
            Step::Contact,
            record(
                &[
                    ("Great! How can we reach you?", None),
                    ("Wonderful choice! Leave your contact and we'll be in touch.", None),
                    ("Excellent! Where should the forest send word?", None),
                    ("Contact. Write it down.", Some(Grumpy)),
                ],
                &[],
                &[],
                "Just a name and a contact, and we're done! ✍️",
            ),
        );
        steps.insert(
            Step::ThankYou,
            record(
                &[
                    ("Thank you! We'll be in touch soon 🌿", None),
                    ("Done! Your request is flying through the treetops.", None),
                    ("Thanks! The forest will remember you.", None),
                ],
                &[],
                &[],
                "Thanks again! 🌿",
            ),
        );
        steps.insert(
            Step::ThankYouGrumpy,
            record(
                &[
                    ("Finally. We'll be in touch.", None),
                    ("Got it. Now let me rest my branches.", None),
                ],
                &[],
                &[],
                "Yes, yes, we'll call.",
            ),
        );

        Self {
            steps,
            phrases: FunnelPhrases::default(),
        }
    }
}

fn record(
    variants: &[(&str, Option<Personality>)],
    reactions: &[(&str, &[&str])],
    grumpy: &[(&str, &str)],
    timeout_phrase: &str,
) -> StepDialogue {
    StepDialogue {
        variants: variants
            .iter()
            .map(|(text, mood)| Variant {
                text: text.to_string(),
                mood: *mood,
            })
            .collect(),
        reactions: reactions
            .iter()
            .map(|(key, list)| (key.to_string(), list.iter().map(|s| s.to_string()).collect()))
            .collect(),
        grumpy_reactions: grumpy
            .iter()
            .map(|(key, text)| (key.to_string(), text.to_string()))
            .collect(),
        timeout_phrase: timeout_phrase.to_string(),
    }
}

// ── Dialogue Pack ──────────────────────────────────────────

/// A complete script: step table plus digression catalog, as shipped in a
/// single JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialoguePack {
    #[serde(flatten)]
    pub table: DialogueTable,
    #[serde(flatten)]
    pub digressions: DigressionCatalog,
}

impl DialoguePack {
    pub fn builtin() -> Self {
        Self {
            table: DialogueTable::builtin(),
            digressions: DigressionCatalog::builtin(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DialogueError> {
        let pack: DialoguePack = serde_json::from_str(json)?;
        pack.validate()?;
        Ok(pack)
    }

    pub fn load(path: &Path) -> Result<Self, DialogueError> {
        let content = std::fs::read_to_string(path)?;
        let pack = Self::from_json(&content)?;
        tracing::info!(
            "[Dialogue] Loaded pack from {} ({} digressions)",
            path.display(),
            pack.digressions.digressions.len()
        );
        Ok(pack)
    }

    pub fn validate(&self) -> Result<(), DialogueError> {
        self.table.validate()?;
        self.digressions.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_script_is_complete() {
        DialogueTable::builtin().validate().unwrap();
        DialoguePack::builtin().validate().unwrap();
    }

    #[test]
    fn missing_step_is_rejected() {
        let mut table = DialogueTable::builtin();
        table.steps.remove(&Step::Size);
        assert!(matches!(
            table.validate(),
            Err(DialogueError::MissingStep(Step::Size))
        ));
    }

    #[test]
    fn missing_reaction_is_rejected() {
        let mut table = DialogueTable::builtin();
        table
            .steps
            .get_mut(&Step::Location)
            .unwrap()
            .reactions
            .remove("cafe");
        match table.validate() {
            Err(DialogueError::MissingReactions { step, choice }) => {
                assert_eq!(step, Step::Location);
                assert_eq!(choice, "cafe");
            }
            other => panic!("expected missing reactions, got {:?}", other),
        }
    }

    #[test]
    fn empty_variants_are_rejected() {
        let mut table = DialogueTable::builtin();
        table.steps.get_mut(&Step::Reveal).unwrap().variants.clear();
        assert!(matches!(
            table.validate(),
            Err(DialogueError::EmptyVariants(Step::Reveal))
        ));
    }

    #[test]
    fn pack_survives_json_round_trip() {
        let json = serde_json::to_string(&DialoguePack::builtin()).unwrap();
        assert!(json.contains("\"welcomeReturning\""));
        assert!(json.contains("\"timeoutPhrase\""));
        let pack = DialoguePack::from_json(&json).unwrap();
        assert_eq!(
            pack.table.get(Step::Mood).unwrap().variants.len(),
            DialogueTable::builtin().get(Step::Mood).unwrap().variants.len()
        );
    }

    #[test]
    fn incomplete_pack_json_fails_at_load() {
        let json = r#"{
            "steps": {
                "welcome": { "variants": [{ "text": "hi" }], "timeoutPhrase": "hello?" }
            },
            "digressions": [],
            "weights": {}
        }"#;
        assert!(matches!(
            DialoguePack::from_json(json),
            Err(DialogueError::MissingStep(_))
        ));
    }

    #[test]
    fn timeout_phrase_falls_back_to_default() {
        let mut table = DialogueTable::builtin();
        table
            .steps
            .get_mut(&Step::Mood)
            .unwrap()
            .timeout_phrase
            .clear();
        assert_eq!(table.timeout_phrase(Step::Mood), table.phrases.default_nudge);
        assert_ne!(table.timeout_phrase(Step::Size), table.phrases.default_nudge);
    }
}
