//! Conversation orchestrator state machine
//!
//! Elm Architecture: a pure `transition` maps (state, event) to a new state
//! plus effects; the runtime performs the effects and feeds results back in.

pub mod classify;
pub mod continuation;
mod effect;
mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{ChatContext, ChatState, RoundError, RoundOutcome};
pub use transition::{transition, TransitionError};
