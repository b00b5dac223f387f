//! Dialogue Flow Controller: drives a visitor through the funnel.
//!
//! ```text
//! welcome ─start─▶ mood ─▶ location ─▶ size ─▶ style ─▶ reveal ─take/custom─▶ contact ─submit─▶ thank-you ─▶ welcome
//!                    └──(reaction, maybe a digression)──┘              ▲  │
//!                                                                      └──┘ another (retry-limited)
//! ```
//!
//! The controller is synchronous and owns no timers or sockets. Every input
//! returns a list of [`Effect`]s for the host to execute; timers come back as
//! [`FlowEvent::Timer`] carrying the generation they were scheduled with, and
//! a generation that is no longer current for its slot is dropped. A newer
//! transition therefore always invalidates an older pending one.

use super::config::FunnelConfig;
use super::digression::{should_digress, Digression, DigressionSelector};
use super::emotion::{Emotion, EmotionState};
use super::personality::PersonalityTracker;
use super::table::DialoguePack;
use super::timing::{reaction_time, read_time, typing_duration};
use super::types::{Choice, Personality, Step, UserPreferences};
use super::variants::{select_reaction, VariantSelector};
use crate::backend::{BackendError, ContactSubmission, Product};
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

// ── Inputs & Outputs ───────────────────────────────────────

/// Independent timer slots. Each holds at most one pending generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerSlot {
    /// Dialogue choreography: beats, reaction holds, digression reads.
    Transition,
    /// Auto-revert of a transient pose.
    Emotion,
    /// Typewriter reveal of the current message.
    Typing,
    /// Restore of the message an idle nudge replaced.
    Nudge,
    /// Retry-limit cool-down.
    Cooldown,
    /// Delayed appearance of the welcome bubble.
    Bubble,
}

/// Work the host must perform on the controller's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Schedule {
        slot: TimerSlot,
        generation: u64,
        after: Duration,
    },
    Cancel {
        slot: TimerSlot,
    },
    /// (Re)arm the idle-timeout monitor with a fresh window.
    ArmIdle,
    DisarmIdle,
    FetchProduct {
        request_id: u64,
        preferences: UserPreferences,
    },
    SubmitContact {
        request_id: u64,
        submission: ContactSubmission,
    },
}

/// Contact form contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactDetails {
    pub name: String,
    pub contact: String,
    pub message: String,
}

/// Something the visitor did.
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    Start,
    Choose(Choice),
    /// Pick a reply button of the current digression.
    Reply(usize),
    TakeProduct,
    AnotherProduct,
    CustomOrder,
    /// Try the product lookup again after a failure.
    RetryFetch,
    SubmitContact(ContactDetails),
}

impl UserAction {
    pub fn name(&self) -> &'static str {
        match self {
            UserAction::Start => "start",
            UserAction::Choose(_) => "choose",
            UserAction::Reply(_) => "reply",
            UserAction::TakeProduct => "take",
            UserAction::AnotherProduct => "another",
            UserAction::CustomOrder => "custom",
            UserAction::RetryFetch => "retry",
            UserAction::SubmitContact(_) => "submit",
        }
    }
}

/// Something the host reports back.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    Timer { slot: TimerSlot, generation: u64 },
    IdleTimeout,
    ProductFetched {
        request_id: u64,
        result: Result<Product, BackendError>,
    },
    ContactSubmitted {
        request_id: u64,
        result: Result<(), BackendError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("Action `{action}` is not available at step `{step}`")]
    UnexpectedAction { step: Step, action: &'static str },
    #[error("Still busy with the previous step")]
    Busy,
    #[error("Too many retries, cooling down")]
    RetryBlocked,
    #[error("No reply button #{0} on the current digression")]
    UnknownReply(usize),
    #[error("No product to take yet")]
    NoProduct,
    #[error("Contact details are required")]
    MissingContact,
}

// ── Snapshot ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigressionView {
    pub id: String,
    pub message: String,
    pub replies: Vec<String>,
    pub awaiting_reply: bool,
}

/// Everything a renderer needs, published after each processed input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowSnapshot {
    pub step: Step,
    pub message: String,
    pub emotion: Emotion,
    pub personality: Personality,
    pub retry_count: u32,
    pub is_returning_user: bool,
    pub preferences: UserPreferences,
    pub product: Option<Product>,
    pub loading: bool,
    pub submitting: bool,
    pub fetch_failed: bool,
    pub retry_blocked: bool,
    pub bubble_visible: bool,
    pub typing: bool,
    pub nudging: bool,
    pub awaiting_input: bool,
    pub digression: Option<DigressionView>,
}

// ── Internal State ─────────────────────────────────────────

#[derive(Debug, Clone)]
enum Beat {
    EnterStep(Step),
    AfterReaction { next: Step },
    FinishFunnel,
}

#[derive(Debug, Clone)]
enum Phase {
    /// Waiting for the visitor.
    Awaiting,
    /// A choreography beat is pending in the transition slot.
    Transition(Beat),
    /// A digression is up and waits for a reply button.
    Digressing { next: Step },
}

#[derive(Debug, Default)]
struct TimerSlots {
    next_generation: u64,
    current: HashMap<TimerSlot, u64>,
}

impl TimerSlots {
    fn schedule(&mut self, slot: TimerSlot, after: Duration) -> Effect {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.current.insert(slot, generation);
        Effect::Schedule {
            slot,
            generation,
            after,
        }
    }

    fn cancel(&mut self, slot: TimerSlot) -> Option<Effect> {
        self.current
            .remove(&slot)
            .map(|_| Effect::Cancel { slot })
    }

    /// Consume the slot if `generation` is the one pending there.
    fn fire(&mut self, slot: TimerSlot, generation: u64) -> bool {
        if self.current.get(&slot) == Some(&generation) {
            self.current.remove(&slot);
            true
        } else {
            false
        }
    }

    fn pending(&self, slot: TimerSlot) -> Option<u64> {
        self.current.get(&slot).copied()
    }
}

// ── Controller ─────────────────────────────────────────────

pub struct FlowController {
    pack: DialoguePack,
    config: FunnelConfig,
    rng: StdRng,

    variants: VariantSelector,
    digressions: DigressionSelector,
    personality: PersonalityTracker,
    emotion: EmotionState,
    timers: TimerSlots,

    step: Step,
    phase: Phase,
    message: String,
    preferences: UserPreferences,
    product: Option<Product>,
    active_digression: Option<Digression>,
    nudge_saved: Option<String>,

    typing: bool,
    bubble_visible: bool,
    retry_blocked: bool,
    fetch_failed: bool,
    custom_order: bool,

    next_request_id: u64,
    fetch_in_flight: Option<u64>,
    submit_in_flight: Option<u64>,
    idle_armed_for: Option<Step>,

    effects: Vec<Effect>,
}

impl FlowController {
    pub fn new(pack: DialoguePack, config: FunnelConfig, rng: StdRng) -> Self {
        let personality = PersonalityTracker::new(config.retry_limit);
        Self {
            pack,
            config,
            rng,
            variants: VariantSelector::new(),
            digressions: DigressionSelector::new(),
            personality,
            emotion: EmotionState::default(),
            timers: TimerSlots::default(),
            step: Step::Welcome,
            phase: Phase::Awaiting,
            message: String::new(),
            preferences: UserPreferences::default(),
            product: None,
            active_digression: None,
            nudge_saved: None,
            typing: false,
            bubble_visible: false,
            retry_blocked: false,
            fetch_failed: false,
            custom_order: false,
            next_request_id: 0,
            fetch_in_flight: None,
            submit_in_flight: None,
            idle_armed_for: None,
            effects: Vec::new(),
        }
    }

    /// One-shot returning-visitor check against the persisted last visit.
    /// Call before [`start`](Self::start).
    pub fn detect_returning(&mut self, store: &mut dyn KeyValueStore, now: DateTime<Utc>) -> bool {
        let window = self.config.returning_window();
        self.personality.detect_returning(store, now, window)
    }

    /// Enter the welcome step (the returning variant for recent visitors).
    pub fn start(&mut self) -> Vec<Effect> {
        let welcome = if self.personality.is_returning_user() {
            Step::WelcomeReturning
        } else {
            Step::Welcome
        };
        self.enter_welcome(welcome);
        self.finish(false)
    }

    // ── Accessors ──

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn personality(&self) -> Personality {
        self.personality.personality()
    }

    pub fn retry_count(&self) -> u32 {
        self.personality.retry_count()
    }

    pub fn emotion(&self) -> Emotion {
        self.emotion.current()
    }

    pub fn product(&self) -> Option<&Product> {
        self.product.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.fetch_in_flight.is_some()
    }

    pub fn is_retry_blocked(&self) -> bool {
        self.retry_blocked
    }

    pub fn is_awaiting_input(&self) -> bool {
        matches!(self.phase, Phase::Awaiting | Phase::Digressing { .. })
    }

    pub fn active_digression(&self) -> Option<&Digression> {
        self.active_digression.as_ref()
    }

    /// Generation pending in `slot`, if any.
    pub fn pending_timer(&self, slot: TimerSlot) -> Option<u64> {
        self.timers.pending(slot)
    }

    pub fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            step: self.step,
            message: self.message.clone(),
            emotion: self.emotion.current(),
            personality: self.personality.personality(),
            retry_count: self.personality.retry_count(),
            is_returning_user: self.personality.is_returning_user(),
            preferences: self.preferences.clone(),
            product: self.product.clone(),
            loading: self.fetch_in_flight.is_some(),
            submitting: self.submit_in_flight.is_some(),
            fetch_failed: self.fetch_failed,
            retry_blocked: self.retry_blocked,
            bubble_visible: self.bubble_visible,
            typing: self.typing,
            nudging: self.nudge_saved.is_some(),
            awaiting_input: self.is_awaiting_input(),
            digression: self.active_digression.as_ref().map(|d| DigressionView {
                id: d.id.clone(),
                message: d.message.clone(),
                replies: d.replies.iter().map(|r| r.label.clone()).collect(),
                awaiting_reply: matches!(self.phase, Phase::Digressing { .. }),
            }),
        }
    }

    // ── User Actions ──

    /// Apply a visitor action. A rejected action leaves all state untouched.
    pub fn handle_action(&mut self, action: UserAction) -> Result<Vec<Effect>, FlowError> {
        tracing::debug!("[Flow] Action '{}' at step {}", action.name(), self.step);
        match action {
            UserAction::Start => self.on_start()?,
            UserAction::Choose(choice) => self.on_choose(choice)?,
            UserAction::Reply(index) => self.on_reply(index)?,
            UserAction::TakeProduct => self.on_take()?,
            UserAction::AnotherProduct => self.on_another()?,
            UserAction::CustomOrder => self.on_custom()?,
            UserAction::RetryFetch => self.on_retry_fetch()?,
            UserAction::SubmitContact(details) => self.on_submit(details)?,
        }
        Ok(self.finish(true))
    }

    fn expect_awaiting(&self, action: &'static str) -> Result<(), FlowError> {
        match self.phase {
            Phase::Awaiting => Ok(()),
            Phase::Transition(_) => Err(FlowError::Busy),
            Phase::Digressing { .. } => Err(self.unexpected(action)),
        }
    }

    fn unexpected(&self, action: &'static str) -> FlowError {
        FlowError::UnexpectedAction {
            step: self.step,
            action,
        }
    }

    fn on_start(&mut self) -> Result<(), FlowError> {
        if !self.step.is_welcome() {
            return Err(self.unexpected("start"));
        }
        self.expect_awaiting("start")?;

        let hold = self.emotion.greet();
        self.after_emote(hold);
        self.bubble_visible = true;
        self.cancel(TimerSlot::Bubble);
        self.begin(
            Beat::EnterStep(Step::Mood),
            Duration::from_millis(self.config.start_beat_ms),
        );
        Ok(())
    }

    fn on_choose(&mut self, choice: Choice) -> Result<(), FlowError> {
        if choice.step() != self.step {
            return Err(self.unexpected("choose"));
        }
        self.expect_awaiting("choose")?;

        self.preferences.record(choice);
        tracing::debug!("[Flow] Recorded {} = {}", self.step, choice.key());

        let Some(next) = self.step.next_question() else {
            // Style: straight to the reveal, the lookup starts right away
            let hold = self.emotion.think();
            self.after_emote(hold);
            self.enter_reveal(Step::Reveal);
            self.start_fetch();
            return Ok(());
        };

        let hold = self.emotion.celebrate();
        self.after_emote(hold);
        let personality = self.personality.personality();
        let reaction = select_reaction(
            &self.pack.table,
            self.step,
            choice.key(),
            Some(personality),
            &mut self.rng,
        );
        if reaction.is_empty() {
            self.after_reaction(next);
        } else {
            let hold = Duration::from_millis(reaction_time(&reaction));
            self.show_message(reaction);
            self.begin(Beat::AfterReaction { next }, hold);
        }
        Ok(())
    }

    fn on_reply(&mut self, index: usize) -> Result<(), FlowError> {
        let Phase::Digressing { next } = self.phase else {
            return Err(self.unexpected("reply"));
        };
        let response = self
            .active_digression
            .as_ref()
            .and_then(|d| d.replies.get(index))
            .map(|r| r.response.clone())
            .ok_or(FlowError::UnknownReply(index))?;

        let hold = Duration::from_millis(reaction_time(&response));
        self.show_message(response);
        self.begin(Beat::EnterStep(next), hold);
        Ok(())
    }

    fn on_take(&mut self) -> Result<(), FlowError> {
        if !self.step.is_reveal() {
            return Err(self.unexpected("take"));
        }
        self.expect_awaiting("take")?;
        if self.product.is_none() {
            return Err(FlowError::NoProduct);
        }

        self.personality.reset();
        self.lift_retry_block();
        self.custom_order = false;
        self.enter_contact(None);
        Ok(())
    }

    fn on_another(&mut self) -> Result<(), FlowError> {
        if !self.step.is_reveal() {
            return Err(self.unexpected("another"));
        }
        self.expect_awaiting("another")?;
        if self.retry_blocked {
            return Err(FlowError::RetryBlocked);
        }
        if self.fetch_in_flight.is_some() {
            return Err(FlowError::Busy);
        }

        let count = self.personality.increment();
        self.step = Step::RevealRetry;
        if self.personality.limit_reached() {
            tracing::info!("[Flow] Retry limit reached ({}), cooling down", count);
            self.retry_blocked = true;
            self.schedule(
                TimerSlot::Cooldown,
                Duration::from_millis(self.config.retry_cooldown_ms),
            );
            let phrase = self.pack.table.phrases.retry_limit.clone();
            self.show_message(phrase);
            self.emotion.reset();
            self.cancel(TimerSlot::Emotion);
        } else {
            self.enter_reveal(Step::RevealRetry);
        }
        self.start_fetch();
        Ok(())
    }

    fn on_custom(&mut self) -> Result<(), FlowError> {
        if !self.step.is_reveal() {
            return Err(self.unexpected("custom"));
        }
        self.expect_awaiting("custom")?;

        // Abandon any lookup still running; its result will be ignored
        self.fetch_in_flight = None;
        // The temper carries into the thanks; only the block goes
        self.lift_retry_block();
        self.custom_order = true;
        let phrase = self.pack.table.phrases.custom_order.clone();
        self.enter_contact(Some(phrase));
        Ok(())
    }

    fn on_retry_fetch(&mut self) -> Result<(), FlowError> {
        if !self.step.is_reveal() || !self.fetch_failed {
            return Err(self.unexpected("retry"));
        }
        self.expect_awaiting("retry")?;
        if self.fetch_in_flight.is_some() {
            return Err(FlowError::Busy);
        }

        self.enter_reveal(self.step);
        self.start_fetch();
        Ok(())
    }

    fn on_submit(&mut self, details: ContactDetails) -> Result<(), FlowError> {
        if self.step != Step::Contact {
            return Err(self.unexpected("submit"));
        }
        self.expect_awaiting("submit")?;
        if self.submit_in_flight.is_some() {
            return Err(FlowError::Busy);
        }
        if details.contact.trim().is_empty() {
            return Err(FlowError::MissingContact);
        }

        let request_id = self.next_request();
        self.submit_in_flight = Some(request_id);
        self.effects.push(Effect::SubmitContact {
            request_id,
            submission: ContactSubmission {
                name: details.name.trim().to_string(),
                contact: details.contact.trim().to_string(),
                preferences: self.preferences.clone(),
                message: details.message.trim().to_string(),
            },
        });
        Ok(())
    }

    // ── Host Events ──

    pub fn handle_event(&mut self, event: FlowEvent) -> Vec<Effect> {
        match event {
            FlowEvent::Timer { slot, generation } => {
                if self.timers.fire(slot, generation) {
                    self.on_timer(slot);
                } else {
                    tracing::debug!("[Flow] Dropping stale {:?} timer #{}", slot, generation);
                }
            }
            FlowEvent::IdleTimeout => self.on_idle_timeout(),
            FlowEvent::ProductFetched { request_id, result } => {
                self.on_product_fetched(request_id, result)
            }
            FlowEvent::ContactSubmitted { request_id, result } => {
                self.on_contact_submitted(request_id, result)
            }
        }
        self.finish(false)
    }

    fn on_timer(&mut self, slot: TimerSlot) {
        match slot {
            TimerSlot::Transition => {
                let phase = std::mem::replace(&mut self.phase, Phase::Awaiting);
                match phase {
                    Phase::Transition(beat) => self.run_beat(beat),
                    other => self.phase = other,
                }
            }
            TimerSlot::Emotion => self.emotion.reset(),
            TimerSlot::Typing => self.typing = false,
            TimerSlot::Nudge => {
                if let Some(saved) = self.nudge_saved.take() {
                    self.message = saved;
                }
            }
            TimerSlot::Cooldown => {
                tracing::info!("[Flow] Cool-down over, retries re-enabled");
                self.retry_blocked = false;
                self.personality.reset();
            }
            TimerSlot::Bubble => self.bubble_visible = true,
        }
    }

    fn run_beat(&mut self, beat: Beat) {
        match beat {
            Beat::EnterStep(step) => self.enter_question(step),
            Beat::AfterReaction { next } => self.after_reaction(next),
            Beat::FinishFunnel => {
                self.personality.full_reset();
                self.lift_retry_block();
                self.enter_welcome(Step::Welcome);
            }
        }
    }

    fn on_idle_timeout(&mut self) {
        // The monitor is one-shot: whatever armed it has now fired
        self.idle_armed_for = None;
        if !self.idle_wanted() {
            tracing::debug!("[Flow] Ignoring idle timeout at step {}", self.step);
            return;
        }

        let nudge = self.pack.table.timeout_phrase(self.step).to_string();
        tracing::debug!("[Flow] Idle at step {}, nudging", self.step);
        let saved = std::mem::replace(&mut self.message, nudge);
        self.nudge_saved = Some(saved);
        self.schedule(
            TimerSlot::Nudge,
            Duration::from_millis(self.config.nudge_hold_ms),
        );
    }

    fn on_product_fetched(&mut self, request_id: u64, result: Result<Product, BackendError>) {
        if self.fetch_in_flight != Some(request_id) {
            tracing::debug!("[Flow] Ignoring stale product result #{}", request_id);
            return;
        }
        self.fetch_in_flight = None;

        match result {
            Ok(product) => {
                tracing::info!("[Flow] Product ready: {}", product.name);
                self.product = Some(product);
                let hold = self.emotion.celebrate();
                self.after_emote(hold);
            }
            Err(e) => {
                tracing::warn!("[Flow] Failed to fetch product: {}", e);
                self.fetch_failed = true;
                if !self.retry_blocked {
                    let phrase = self.pack.table.phrases.fetch_failed.clone();
                    self.show_message(phrase);
                }
                self.emotion.reset();
                self.cancel(TimerSlot::Emotion);
            }
        }
    }

    fn on_contact_submitted(&mut self, request_id: u64, result: Result<(), BackendError>) {
        if self.submit_in_flight != Some(request_id) {
            tracing::debug!("[Flow] Ignoring stale contact result #{}", request_id);
            return;
        }
        self.submit_in_flight = None;

        match result {
            Ok(()) => {
                let thank_you = if self.personality.personality() == Personality::Grumpy {
                    Step::ThankYouGrumpy
                } else {
                    Step::ThankYou
                };
                tracing::info!("[Flow] Contact submitted, funnel complete");
                self.step = thank_you;
                self.preferences.clear();
                self.product = None;
                self.fetch_failed = false;
                self.custom_order = false;
                let text = self.pick_variant(thank_you, false);
                self.show_message(text);
                let hold = self.emotion.celebrate();
                self.after_emote(hold);
                self.begin(
                    Beat::FinishFunnel,
                    Duration::from_millis(self.config.thank_you_hold_ms),
                );
            }
            Err(e) => {
                tracing::warn!("[Flow] Failed to submit contact: {}", e);
                let phrase = self.pack.table.phrases.submit_failed.clone();
                self.show_message(phrase);
            }
        }
    }

    // ── Transitions ──

    fn enter_welcome(&mut self, welcome: Step) {
        self.step = welcome;
        self.phase = Phase::Awaiting;
        self.active_digression = None;
        self.emotion.reset();
        self.cancel(TimerSlot::Emotion);
        let text = self.pick_variant(welcome, false);
        self.show_message(text);
        self.bubble_visible = false;
        self.schedule(
            TimerSlot::Bubble,
            Duration::from_millis(self.config.bubble_delay_ms),
        );
    }

    fn enter_question(&mut self, step: Step) {
        self.step = step;
        self.phase = Phase::Awaiting;
        self.active_digression = None;
        let text = self.pick_variant(step, true);
        self.show_message(text);
        if step == Step::Mood {
            let hold = self.emotion.think();
            self.after_emote(hold);
        } else {
            self.emotion.reset();
            self.cancel(TimerSlot::Emotion);
        }
    }

    fn enter_reveal(&mut self, step: Step) {
        self.step = step;
        self.phase = Phase::Awaiting;
        let text = self.pick_variant(step, true);
        self.show_message(text);
        let hold = self.emotion.present();
        self.after_emote(hold);
    }

    fn enter_contact(&mut self, message: Option<String>) {
        self.step = Step::Contact;
        self.phase = Phase::Awaiting;
        let text = match message {
            Some(text) => text,
            None => self.pick_variant(Step::Contact, true),
        };
        self.show_message(text);
        let hold = self.emotion.think();
        self.after_emote(hold);
    }

    fn after_reaction(&mut self, next: Step) {
        let personality = self.personality.personality();
        let digression = if should_digress(&mut self.rng, self.config.digression_probability) {
            self.digressions
                .select(&self.pack.digressions, personality, &[], &mut self.rng)
        } else {
            None
        };

        let Some(digression) = digression else {
            self.enter_question(next);
            return;
        };

        tracing::debug!("[Flow] Digressing with '{}' before {}", digression.id, next);
        let awaits_reply = digression.awaits_reply();
        let read = Duration::from_millis(read_time(&digression.message));
        self.show_message(digression.message.clone());
        self.active_digression = Some(digression);
        if awaits_reply {
            self.phase = Phase::Digressing { next };
        } else {
            self.begin(Beat::EnterStep(next), read);
        }
    }

    fn start_fetch(&mut self) {
        let request_id = self.next_request();
        self.fetch_in_flight = Some(request_id);
        self.fetch_failed = false;
        self.product = None;
        self.effects.push(Effect::FetchProduct {
            request_id,
            preferences: self.preferences.clone(),
        });
    }

    fn lift_retry_block(&mut self) {
        self.retry_blocked = false;
        self.cancel(TimerSlot::Cooldown);
    }

    // ── Helpers ──

    /// Personality-voiced variant; friendly is the neutral voice and uses the
    /// plain rotation.
    fn pick_variant(&mut self, step: Step, voiced: bool) -> String {
        let voice = match self.personality.personality() {
            Personality::Friendly => None,
            other if voiced => Some(other),
            _ => None,
        };
        self.variants
            .select(&self.pack.table, step, voice, &mut self.rng)
    }

    fn show_message(&mut self, text: String) {
        if self.nudge_saved.take().is_some() {
            self.cancel(TimerSlot::Nudge);
        }
        let typing = typing_duration(&text, self.config.typewriter_speed_ms);
        self.message = text;
        if typing.is_zero() {
            self.typing = false;
            self.cancel(TimerSlot::Typing);
        } else {
            self.typing = true;
            self.schedule(TimerSlot::Typing, typing);
        }
    }

    fn begin(&mut self, beat: Beat, after: Duration) {
        self.phase = Phase::Transition(beat);
        self.schedule(TimerSlot::Transition, after);
    }

    fn after_emote(&mut self, hold: Option<Duration>) {
        match hold {
            Some(after) => self.schedule(TimerSlot::Emotion, after),
            None => self.cancel(TimerSlot::Emotion),
        }
    }

    fn schedule(&mut self, slot: TimerSlot, after: Duration) {
        let effect = self.timers.schedule(slot, after);
        self.effects.push(effect);
    }

    fn cancel(&mut self, slot: TimerSlot) {
        if let Some(effect) = self.timers.cancel(slot) {
            self.effects.push(effect);
        }
    }

    fn next_request(&mut self) -> u64 {
        self.next_request_id += 1;
        self.next_request_id
    }

    /// Idle nudges run on question and reveal steps, never during a
    /// digression, a beat, a nudge or while the message is still typing.
    fn idle_wanted(&self) -> bool {
        let step_allows = matches!(
            self.step,
            Step::Mood | Step::Location | Step::Size | Step::Style | Step::Reveal | Step::RevealRetry
        );
        step_allows
            && matches!(self.phase, Phase::Awaiting)
            && self.active_digression.is_none()
            && !self.typing
            && self.nudge_saved.is_none()
    }

    /// Append the idle-monitor effect and hand the collected effects out.
    fn finish(&mut self, user_activity: bool) -> Vec<Effect> {
        if self.idle_wanted() {
            if user_activity || self.idle_armed_for != Some(self.step) {
                self.idle_armed_for = Some(self.step);
                self.effects.push(Effect::ArmIdle);
            }
        } else if self.idle_armed_for.take().is_some() {
            self.effects.push(Effect::DisarmIdle);
        }
        std::mem::take(&mut self.effects)
    }
}
