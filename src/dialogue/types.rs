//! Core vocabulary of the guided funnel: steps, personalities, choices and
//! the preferences accumulated from them.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Step ───────────────────────────────────────────────────

/// A named stage of the guided funnel. Each step owns a variant pool in the
/// dialogue table; choice steps also own a reaction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Step {
    Welcome,
    WelcomeReturning,
    Mood,
    Location,
    Size,
    Style,
    Reveal,
    RevealRetry,
    Contact,
    ThankYou,
    ThankYouGrumpy,
}

impl Step {
    pub const ALL: [Step; 11] = [
        Step::Welcome,
        Step::WelcomeReturning,
        Step::Mood,
        Step::Location,
        Step::Size,
        Step::Style,
        Step::Reveal,
        Step::RevealRetry,
        Step::Contact,
        Step::ThankYou,
        Step::ThankYouGrumpy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Welcome => "welcome",
            Step::WelcomeReturning => "welcomeReturning",
            Step::Mood => "mood",
            Step::Location => "location",
            Step::Size => "size",
            Step::Style => "style",
            Step::Reveal => "reveal",
            Step::RevealRetry => "revealRetry",
            Step::Contact => "contact",
            Step::ThankYou => "thankYou",
            Step::ThankYouGrumpy => "thankYouGrumpy",
        }
    }

    /// Choice keys offered on this step, empty for non-question steps.
    pub fn choice_keys(&self) -> &'static [&'static str] {
        match self {
            Step::Mood => MoodChoice::KEYS,
            Step::Location => LocationChoice::KEYS,
            Step::Size => SizeChoice::KEYS,
            Step::Style => StyleChoice::KEYS,
            _ => &[],
        }
    }

    /// The question that follows this one, if any. `Style` leads to the reveal.
    pub fn next_question(&self) -> Option<Step> {
        match self {
            Step::Mood => Some(Step::Location),
            Step::Location => Some(Step::Size),
            Step::Size => Some(Step::Style),
            _ => None,
        }
    }

    pub fn is_welcome(&self) -> bool {
        matches!(self, Step::Welcome | Step::WelcomeReturning)
    }

    pub fn is_reveal(&self) -> bool {
        matches!(self, Step::Reveal | Step::RevealRetry)
    }

    pub fn is_thank_you(&self) -> bool {
        matches!(self, Step::ThankYou | Step::ThankYouGrumpy)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Personality ────────────────────────────────────────────

/// The character's simulated temper, biasing phrase and digression selection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    #[default]
    Friendly,
    Playful,
    Grumpy,
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Personality::Friendly => "friendly",
            Personality::Playful => "playful",
            Personality::Grumpy => "grumpy",
        })
    }
}

// ── Choices ────────────────────────────────────────────────

macro_rules! choice_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const KEYS: &'static [&'static str] = &[$($key),+];

            pub fn key(&self) -> &'static str {
                match self {
                    $($name::$variant => $key),+
                }
            }

            pub fn from_key(key: &str) -> Option<Self> {
                match key {
                    $($key => Some($name::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

choice_enum!(
    /// Answer to the "mood" question.
    MoodChoice { Calm => "calm", Vibrant => "vibrant", Minimal => "minimal" }
);
choice_enum!(
    /// Answer to the "location" question.
    LocationChoice { Home => "home", Office => "office", Gift => "gift", Cafe => "cafe" }
);
choice_enum!(
    /// Answer to the "size" question.
    SizeChoice { Small => "small", Medium => "medium", Large => "large" }
);
choice_enum!(
    /// Answer to the "style" question.
    StyleChoice { Warm => "warm", Industrial => "industrial", Minimal => "minimal" }
);

/// A single answer to one of the four funnel questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", content = "value", rename_all = "lowercase")]
pub enum Choice {
    Mood(MoodChoice),
    Location(LocationChoice),
    Size(SizeChoice),
    Style(StyleChoice),
}

impl Choice {
    /// The step this choice answers.
    pub fn step(&self) -> Step {
        match self {
            Choice::Mood(_) => Step::Mood,
            Choice::Location(_) => Step::Location,
            Choice::Size(_) => Step::Size,
            Choice::Style(_) => Step::Style,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Choice::Mood(c) => c.key(),
            Choice::Location(c) => c.key(),
            Choice::Size(c) => c.key(),
            Choice::Style(c) => c.key(),
        }
    }

    /// Parse a choice key in the context of a step (`minimal` is valid for
    /// both mood and style, so the step disambiguates).
    pub fn parse(step: Step, key: &str) -> Option<Self> {
        match step {
            Step::Mood => MoodChoice::from_key(key).map(Choice::Mood),
            Step::Location => LocationChoice::from_key(key).map(Choice::Location),
            Step::Size => SizeChoice::from_key(key).map(Choice::Size),
            Step::Style => StyleChoice::from_key(key).map(Choice::Style),
            _ => None,
        }
    }
}

// ── Preferences ────────────────────────────────────────────

/// Answers accumulated through the funnel, one field per question step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<MoodChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleChoice>,
}

impl UserPreferences {
    pub fn record(&mut self, choice: Choice) {
        match choice {
            Choice::Mood(c) => self.mood = Some(c),
            Choice::Location(c) => self.location = Some(c),
            Choice::Size(c) => self.size = Some(c),
            Choice::Style(c) => self.style = Some(c),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mood.is_none() && self.location.is_none() && self.size.is_none() && self.style.is_none()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
