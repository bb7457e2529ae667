//! Conversation dispatcher

use super::traits::{
    ChatOutbox, ConversationCache, InboundHandler, Notifier, StoreError, UserStore,
};
use super::InboundEvent;
use crate::db::RegistrationRecord;
use crate::notify::format_registration_message;
use crate::state_machine::{
    transition, ConversationState, Effect, Event, NewRegistration, UserIdentity,
};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;

pub const REGISTERED_MESSAGE: &str = "✅ Thank you, you have been registered successfully!";
pub const REGISTRATION_FAILED_MESSAGE: &str =
    "❌ Sorry, an error occurred during registration. Please try again later.";
pub const CONVERSATION_UNAVAILABLE_MESSAGE: &str =
    "❌ Sorry, something went wrong. Please send /start to try again.";

/// How a completed conversation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Record written. `notified` is false when the broadcast failed.
    Registered { row_id: i64, notified: bool },
    /// A record for this identity already existed
    AlreadyRegistered { display_name: Option<String> },
    /// The store failed; nothing was written
    Failed,
}

impl RegistrationOutcome {
    /// Final chat message for the user
    pub fn user_message(&self) -> String {
        match self {
            RegistrationOutcome::Registered { .. } => REGISTERED_MESSAGE.to_string(),
            RegistrationOutcome::AlreadyRegistered {
                display_name: Some(name),
            } => format!("ℹ️ You are already registered as {name}."),
            RegistrationOutcome::AlreadyRegistered { display_name: None } => {
                "ℹ️ You are already registered.".to_string()
            }
            RegistrationOutcome::Failed => REGISTRATION_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Routes inbound events through the state machine.
///
/// Holds no per-conversation state of its own; any number of dispatchers,
/// in any number of processes, can serve the same users as long as they
/// share the cache and the store.
pub struct Dispatcher<C, U, N, O>
where
    C: ConversationCache,
    U: UserStore,
    N: Notifier,
    O: ChatOutbox,
{
    cache: C,
    users: U,
    notifier: N,
    outbox: O,
    ttl: Duration,
}

impl<C, U, N, O> Dispatcher<C, U, N, O>
where
    C: ConversationCache,
    U: UserStore,
    N: Notifier,
    O: ChatOutbox,
{
    pub fn new(cache: C, users: U, notifier: N, outbox: O, ttl: Duration) -> Self {
        Self {
            cache,
            users,
            notifier,
            outbox,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Handle one inbound message. Never fails: every problem is logged and,
    /// where the user would otherwise be left hanging, reported in chat.
    pub async fn dispatch(&self, inbound: &InboundEvent) {
        let event = inbound.to_event();
        tracing::debug!(
            identity = %inbound.identity,
            command = ?inbound.command,
            "Dispatching inbound event"
        );
        self.handle(inbound.identity, event).await;
    }

    /// Begin a conversation, or resume the live one
    pub async fn start(&self, identity: UserIdentity) {
        self.handle(identity, Event::Start).await;
    }

    /// Answer the pending prompt
    pub async fn submit_answer(&self, identity: UserIdentity, text: impl Into<String>) {
        self.handle(identity, Event::answer(text)).await;
    }

    async fn handle(&self, identity: UserIdentity, event: Event) {
        let current = match self.cache.get(identity).await {
            Ok(state) => state,
            Err(e) => {
                tracing::error!(%identity, error = %e, "Failed to read conversation state");
                self.say(identity, CONVERSATION_UNAVAILABLE_MESSAGE).await;
                return;
            }
        };

        match (&current, &event) {
            (None, Event::Answer { .. }) => {
                tracing::info!(%identity, "No live conversation for answer, restarting");
            }
            (Some(state), Event::Start) => {
                tracing::info!(%identity, step = state.step.name(), "Resuming live conversation");
            }
            (None, Event::Start) => {
                tracing::info!(%identity, "Starting conversation");
            }
            (Some(_), Event::Answer { .. }) => {}
        }

        let result = transition(identity, current.as_ref(), event);
        for effect in result.effects {
            if !self.execute_effect(identity, effect).await {
                break;
            }
        }
    }

    /// Execute one effect; `false` stops the remaining effects
    async fn execute_effect(&self, identity: UserIdentity, effect: Effect) -> bool {
        match effect {
            Effect::Say { text } => {
                self.say(identity, &text).await;
                true
            }
            Effect::PersistState(state) => self.persist(&state).await,
            Effect::ClearState => {
                if let Err(e) = self.cache.delete(identity).await {
                    // The entry still expires on its own
                    tracing::error!(%identity, error = %e, "Failed to clear conversation state");
                }
                true
            }
            Effect::Register(registration) => {
                let outcome = self.register(registration).await;
                if let RegistrationOutcome::Registered { row_id, notified } = &outcome {
                    tracing::info!(%identity, row_id, notified, "User registered");
                }
                self.say(identity, &outcome.user_message()).await;
                true
            }
        }
    }

    async fn persist(&self, state: &ConversationState) -> bool {
        match self.cache.put(state, self.ttl).await {
            Ok(()) => {
                tracing::debug!(identity = %state.identity, step = state.step.name(), "Persisted conversation state");
                true
            }
            Err(e) => {
                tracing::error!(identity = %state.identity, error = %e, "Failed to persist conversation state");
                self.say(state.identity, CONVERSATION_UNAVAILABLE_MESSAGE)
                    .await;
                false
            }
        }
    }

    /// Store the record, then announce it. The write is never rolled back
    /// because of a failed announcement.
    pub async fn register(&self, registration: NewRegistration) -> RegistrationOutcome {
        let identity = registration.identity;

        match self.users.exists(identity).await {
            Ok(true) => return self.already_registered(identity).await,
            Ok(false) => {}
            Err(e) => {
                tracing::error!(%identity, error = %e, "Registration error: existence check failed");
                return RegistrationOutcome::Failed;
            }
        }

        let record = RegistrationRecord::new(
            identity,
            registration.display_name,
            registration.programming_language,
            Utc::now(),
        );

        let row_id = match self.users.insert(&record).await {
            Ok(row_id) => row_id,
            Err(StoreError::DuplicateIdentity(_)) => {
                // Lost a race with a concurrent completion for the same user
                tracing::warn!(%identity, "Registration rejected as duplicate");
                return self.already_registered(identity).await;
            }
            Err(e) => {
                tracing::error!(%identity, error = %e, "Registration error: insert failed");
                return RegistrationOutcome::Failed;
            }
        };

        let message = format_registration_message(&record);
        let notified = match self.notifier.send(&message, true).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(%identity, error = %e, "Registration stored but notification failed");
                false
            }
        };

        RegistrationOutcome::Registered { row_id, notified }
    }

    async fn already_registered(&self, identity: UserIdentity) -> RegistrationOutcome {
        let display_name = match self.users.find_by_identity(identity).await {
            Ok(record) => record.map(|r| r.display_name),
            Err(e) => {
                tracing::warn!(%identity, error = %e, "Failed to load existing registration");
                None
            }
        };
        RegistrationOutcome::AlreadyRegistered { display_name }
    }

    async fn say(&self, identity: UserIdentity, text: &str) {
        if let Err(e) = self.outbox.send(identity, text).await {
            tracing::warn!(%identity, error = %e, "Failed to send chat message");
        }
    }
}

#[async_trait]
impl<C, U, N, O> InboundHandler for Dispatcher<C, U, N, O>
where
    C: ConversationCache,
    U: UserStore,
    N: Notifier,
    O: ChatOutbox,
{
    async fn handle_inbound(&self, event: &InboundEvent) {
        self.dispatch(event).await;
    }
}
