//! The forest spirit's conversation: script data, pacing, personality and the
//! flow controller tying them together.

pub mod config;
pub mod digression;
pub mod emotion;
pub mod flow;
pub mod idle_timeout;
pub mod personality;
pub mod table;
pub mod timing;
pub mod types;
pub mod variants;

pub use config::FunnelConfig;
pub use flow::{
    ContactDetails, Effect, FlowController, FlowError, FlowEvent, FlowSnapshot, TimerSlot,
    UserAction,
};
pub use table::{DialogueError, DialoguePack};
pub use types::{Choice, Personality, Step, UserPreferences};
