pub mod controller;
pub mod conversation;
pub mod message;

pub use controller::{ChatController, ChatTransport, ControllerEvent, StopHandle, TurnState};
pub use conversation::Conversation;
pub use message::{Message, Mode, Role};
