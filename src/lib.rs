//! Headless core for the Pstral chat client.
//!
//! The centerpiece is the incremental streaming pipeline: `decode_stream`
//! turns an SSE byte stream into ordered text deltas, and `ChatController`
//! drives a conversation turn through it. Around that sit the session
//! store, the HTTP client for chat/feedback/SQL, auth, and import/export.
//! Rendering and input handling belong to the embedding frontend.

pub mod auth;
pub mod error;
pub mod exporters;
pub mod models;
pub mod repositories;
pub mod services;

pub use error::{ChatError, ChatResult};
pub use models::{ChatController, ChatTransport, Conversation, Message, Mode, Role};
pub use services::{ApiClient, CancelToken, DeltaStream};
