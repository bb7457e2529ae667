//! Core conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! the runtime loads the cached state, calls [`transition`], then executes
//! the returned effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{ConversationState, NewRegistration, Step, UserIdentity};
pub use transition::{transition, TransitionResult};
