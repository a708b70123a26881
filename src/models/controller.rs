use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{ChatError, ChatResult};
use crate::models::conversation::Conversation;
use crate::models::message::{Message, Mode, Role};
use crate::services::stream_decoder::{CancelToken, DeltaStream};
use crate::services::title_generator::derive_title;

/// Marker appended to partial content when the user stops generation.
const ABORT_MARKER: &str = " [Arrêté]";

/// Lifecycle of one streamed assistant turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    Sending,
    Streaming,
    Completed,
    Aborted,
    Failed,
}

/// Events emitted for decoupled UI updates while a turn runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    TurnStarted,
    DeltaApplied,
    TitleChanged(String),
    TurnEnded(TurnState),
}

/// Seam between the controller and the chat backend. The production
/// implementation is `ApiClient`; tests inject scripted streams.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open a streamed completion for the given history (oldest first) and
    /// mode. The cancellation token must be honored by the returned stream.
    async fn open_stream(
        &self,
        messages: &[Message],
        mode: Mode,
        cancel: CancelToken,
    ) -> ChatResult<DeltaStream>;
}

/// Clonable handle for stopping the controller's active turn from outside the
/// `send()`/`regenerate()` call. Safe to invoke at any time; stopping when no
/// stream is active is a no-op.
#[derive(Clone)]
pub struct StopHandle {
    slot: Arc<Mutex<CancelToken>>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.slot.lock().cancel();
    }
}

/// Orchestrates streamed assistant turns against one conversation.
///
/// Owns the message sequence exclusively while a stream is active; at most one
/// stream runs per controller, so two decoders never write to the same
/// message. The assistant placeholder is always the last element during a
/// turn, and deltas are applied in strict arrival order via immutable updates
/// (a fresh `Message` value per delta).
pub struct ChatController {
    conversation: Conversation,
    transport: Arc<dyn ChatTransport>,
    state: TurnState,
    cancel_slot: Arc<Mutex<CancelToken>>,
    title_generated: bool,
    observer: Option<Box<dyn FnMut(ControllerEvent) + Send>>,
}

impl ChatController {
    pub fn new(conversation: Conversation, transport: Arc<dyn ChatTransport>) -> Self {
        // Restored conversations already carry a derived title.
        let title_generated = conversation.message_count() > 0;
        Self {
            conversation,
            transport,
            state: TurnState::Idle,
            cancel_slot: Arc::new(Mutex::new(CancelToken::new())),
            title_generated,
            observer: None,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TurnState::Sending | TurnState::Streaming)
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    /// Register a callback receiving `ControllerEvent`s during turns.
    pub fn set_observer(&mut self, observer: impl FnMut(ControllerEvent) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Handle for cancelling the active turn concurrently with `send()`.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            slot: self.cancel_slot.clone(),
        }
    }

    /// Signal cancellation of the active turn. Idempotent; a no-op when idle.
    pub fn stop(&self) {
        self.cancel_slot.lock().cancel();
    }

    /// Send a user message and stream the assistant's reply to completion.
    ///
    /// Rejects when a turn is already active or when both `content` and
    /// `images` are empty. On the very first send of a conversation the title
    /// is derived from the user content (one-time side effect, not repeated on
    /// regenerate).
    pub async fn send(
        &mut self,
        content: impl Into<String>,
        images: Vec<String>,
    ) -> ChatResult<TurnState> {
        let content = content.into();
        if self.is_active() {
            return Err(ChatError::ValidationFailed(
                "a stream is already active for this conversation".to_string(),
            ));
        }
        if content.is_empty() && images.is_empty() {
            return Err(ChatError::ValidationFailed(
                "message must carry text or at least one image".to_string(),
            ));
        }

        if !self.title_generated && self.conversation.message_count() == 0 {
            let title = derive_title(&content);
            self.conversation.set_title(title.clone());
            self.title_generated = true;
            self.emit(ControllerEvent::TitleChanged(title));
        }

        self.conversation.push(Message::user(content, images));
        self.run_turn().await
    }

    /// Drop the last assistant message and re-stream against the preserved
    /// history. A no-op (returns `Ok(None)`) unless at least two messages
    /// exist, the last is an assistant message and the one before it a user
    /// message, and no turn is active.
    pub async fn regenerate(&mut self) -> ChatResult<Option<TurnState>> {
        if self.is_active() {
            return Ok(None);
        }
        let messages = self.conversation.messages();
        let eligible = messages.len() >= 2
            && messages[messages.len() - 1].role == Role::Assistant
            && messages[messages.len() - 2].role == Role::User;
        if !eligible {
            debug!("Regenerate skipped, preconditions not met");
            return Ok(None);
        }

        self.conversation.pop();
        self.run_turn().await.map(Some)
    }

    /// Shared body of send/regenerate: append the placeholder, open the
    /// stream, consume deltas until a terminal state.
    async fn run_turn(&mut self) -> ChatResult<TurnState> {
        self.conversation.push(Message::thinking_placeholder());
        self.state = TurnState::Sending;
        self.emit(ControllerEvent::TurnStarted);

        let cancel = CancelToken::new();
        *self.cancel_slot.lock() = cancel.clone();

        // Request history is everything before the placeholder, oldest first.
        let history =
            self.conversation.messages()[..self.conversation.message_count() - 1].to_vec();
        let mode = self.conversation.mode();

        let mut stream = match self
            .transport
            .open_stream(&history, mode, cancel.clone())
            .await
        {
            Ok(stream) => stream,
            Err(error) if error.is_abort() => return Ok(self.abort_turn()),
            Err(error) => return Err(self.fail_turn(error)),
        };

        while let Some(item) = stream.next().await {
            match item {
                Ok(delta) => {
                    if self.state == TurnState::Sending {
                        self.state = TurnState::Streaming;
                    }
                    self.apply_delta(&delta);
                }
                Err(error) if error.is_abort() => return Ok(self.abort_turn()),
                Err(error) => return Err(self.fail_turn(error)),
            }
        }

        Ok(self.complete_turn())
    }

    /// Concatenate one delta onto the in-progress assistant message,
    /// replacing the last element with a new value.
    fn apply_delta(&mut self, delta: &str) {
        let Some(last) = self.conversation.messages().last() else {
            return;
        };
        let mut updated = last.clone();
        updated.content.push_str(delta);
        updated.is_thinking = false;
        self.conversation.replace_last(updated);
        self.emit(ControllerEvent::DeltaApplied);
    }

    fn complete_turn(&mut self) -> TurnState {
        if let Some(last) = self.conversation.messages().last() {
            if last.is_thinking {
                let mut updated = last.clone();
                updated.is_thinking = false;
                self.conversation.replace_last(updated);
            }
        }
        self.state = TurnState::Completed;
        self.emit(ControllerEvent::TurnEnded(TurnState::Completed));
        debug!("Turn completed");
        TurnState::Completed
    }

    /// Cancellation observed: keep partial content, append the abort marker.
    fn abort_turn(&mut self) -> TurnState {
        if let Some(last) = self.conversation.messages().last() {
            if last.role == Role::Assistant {
                let mut updated = last.clone();
                updated.content.push_str(ABORT_MARKER);
                updated.is_thinking = false;
                self.conversation.replace_last(updated);
            }
        }
        self.state = TurnState::Aborted;
        self.emit(ControllerEvent::TurnEnded(TurnState::Aborted));
        debug!("Turn aborted by user");
        TurnState::Aborted
    }

    /// Failure: remove a contentless placeholder so no empty "thinking"
    /// bubble is left behind; preserve partial content otherwise.
    fn fail_turn(&mut self, error: ChatError) -> ChatError {
        if self
            .conversation
            .messages()
            .last()
            .is_some_and(|m| m.is_thinking)
        {
            self.conversation.pop();
        }
        self.state = TurnState::Failed;
        self.emit(ControllerEvent::TurnEnded(TurnState::Failed));
        warn!(%error, "Turn failed");
        error
    }

    fn emit(&mut self, event: ControllerEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
    }
}
