//! Pure state transition function

use super::state::{
    ConversationState, NewRegistration, Step, UserIdentity, ASK_LANGUAGE, ASK_NAME,
};
use super::{Effect, Event};

/// Result of a state transition
#[derive(Debug, PartialEq, Eq)]
pub struct TransitionResult {
    /// State after the transition; `None` once the conversation is over
    pub new_state: Option<ConversationState>,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: Option<ConversationState>) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Pure transition function.
///
/// Given the cached state for `identity` (if any) and an inbound event,
/// returns the next state and the effects the runtime must perform. No I/O.
/// A cached state belonging to another identity is treated as absent.
pub fn transition(
    identity: UserIdentity,
    current: Option<&ConversationState>,
    event: Event,
) -> TransitionResult {
    let current = current.filter(|s| s.identity == identity);

    match (current, event) {
        // Idle + anything -> AwaitingName. An answer with nothing cached means
        // the state expired or never existed; the user can only recover if we
        // start over.
        (None, Event::Start | Event::Answer { .. }) => begin(identity),

        // Live + Start -> same state, prompt repeated. Never a second state.
        (Some(state), Event::Start) => TransitionResult::new(Some(state.clone()))
            .with_effect(Effect::PersistState(state.clone()))
            .with_effect(Effect::say(state.step.pending_prompt())),

        // AwaitingName + Answer -> AwaitingLanguage
        (
            Some(ConversationState {
                step: Step::AwaitingName,
                ..
            }),
            Event::Answer { text },
        ) => {
            let next = ConversationState {
                identity,
                step: Step::AwaitingLanguage {
                    display_name: text.clone(),
                },
            };
            // Persist before speaking: a failed write must not leave the user
            // answering a question the cache does not know was asked
            TransitionResult::new(Some(next.clone()))
                .with_effect(Effect::PersistState(next))
                .with_effect(Effect::say(format!("Hello {text}!")))
                .with_effect(Effect::say(ASK_LANGUAGE))
        }

        // AwaitingLanguage + Answer -> Completed (state removed)
        (
            Some(ConversationState {
                step: Step::AwaitingLanguage { display_name },
                ..
            }),
            Event::Answer { text },
        ) => TransitionResult::new(None)
            .with_effect(Effect::Register(NewRegistration {
                identity,
                display_name: display_name.clone(),
                programming_language: text,
            }))
            .with_effect(Effect::ClearState),
    }
}

fn begin(identity: UserIdentity) -> TransitionResult {
    let state = ConversationState::new(identity);
    TransitionResult::new(Some(state.clone()))
        .with_effect(Effect::PersistState(state))
        .with_effect(Effect::say(ASK_NAME))
}
