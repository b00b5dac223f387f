//! Character emotion: the animation pose the UI renders.
//!
//! Transient poses (greeting, happy, presenting) fall back to idle on their
//! own after a fixed hold; the controller owns the timer that performs the
//! revert.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    #[default]
    Idle,
    Greeting,
    Thinking,
    Happy,
    Presenting,
}

impl Emotion {
    /// How long a pose holds before reverting to idle, if it reverts at all.
    pub fn hold(&self) -> Option<Duration> {
        match self {
            Emotion::Greeting => Some(Duration::from_millis(2000)),
            Emotion::Happy => Some(Duration::from_millis(3000)),
            Emotion::Presenting => Some(Duration::from_millis(2500)),
            Emotion::Idle | Emotion::Thinking => None,
        }
    }
}

/// Current pose plus the bookkeeping needed to know whether a revert is due.
#[derive(Debug, Clone, Default)]
pub struct EmotionState {
    current: Emotion,
}

impl EmotionState {
    pub fn current(&self) -> Emotion {
        self.current
    }

    /// Switch pose. Returns the revert delay the caller should schedule.
    pub fn set(&mut self, emotion: Emotion) -> Option<Duration> {
        self.current = emotion;
        emotion.hold()
    }

    pub fn greet(&mut self) -> Option<Duration> {
        self.set(Emotion::Greeting)
    }

    pub fn think(&mut self) -> Option<Duration> {
        self.set(Emotion::Thinking)
    }

    pub fn celebrate(&mut self) -> Option<Duration> {
        self.set(Emotion::Happy)
    }

    pub fn present(&mut self) -> Option<Duration> {
        self.set(Emotion::Presenting)
    }

    pub fn reset(&mut self) {
        self.current = Emotion::Idle;
    }
}
