pub mod chat_client;
pub mod feedback;
pub mod sql_service;
pub mod stream_decoder;
pub mod title_generator;

pub use chat_client::ApiClient;
pub use feedback::{FeedbackRequest, FeedbackResponse, Rating};
pub use sql_service::{SqlExecuteRequest, SqlResult, SqlValidateRequest};
pub use stream_decoder::{CancelToken, DeltaStream, decode_stream};
pub use title_generator::derive_title;
