use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tracing::debug;

use crate::auth::{NoToken, TokenProvider};
use crate::error::{ChatError, ChatResult};
use crate::models::controller::ChatTransport;
use crate::models::message::{Message, Mode};
use crate::services::feedback::{FeedbackRequest, FeedbackResponse};
use crate::services::sql_service::{SqlExecuteRequest, SqlResult, SqlValidateRequest};
use crate::services::stream_decoder::{CancelToken, DeltaStream, decode_stream};

/// Error body shape returned by the backend on non-success statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// HTTP client for the Pstral backend: streamed chat, feedback submission and
/// SQL execution. Cheap to clone; the inner `reqwest::Client` pools
/// connections.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_token_provider(base_url, Arc::new(NoToken))
    }

    pub fn with_token_provider(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            tokens,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Open a streamed chat completion.
    ///
    /// The request carries the full history (oldest first) plus the new user
    /// message, and the conversation mode. A non-success status fails before
    /// any stream bytes are read, with the server-provided `detail`; the
    /// response body is otherwise handed to the stream decoder.
    pub async fn stream_chat(
        &self,
        messages: &[Message],
        mode: Mode,
        cancel: CancelToken,
    ) -> ChatResult<DeltaStream> {
        let body = serde_json::json!({ "messages": messages, "mode": mode });
        debug!(mode = %mode, message_count = messages.len(), "Opening chat stream");

        let pending = self.http.post(self.endpoint("/chat")).json(&body).send();
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::StreamAborted),
            result = pending => result.map_err(|error| ChatError::RequestFailed {
                detail: error.to_string(),
            })?,
        };

        if !response.status().is_success() {
            return Err(ChatError::RequestFailed {
                detail: error_detail(response, "Network error").await,
            });
        }

        Ok(decode_stream(response.bytes_stream().boxed(), cancel))
    }

    /// Submit user feedback on an assistant answer. Not part of streaming;
    /// invoked synchronously by the feedback dialog.
    pub async fn send_feedback(&self, request: &FeedbackRequest) -> ChatResult<FeedbackResponse> {
        let response = self
            .http
            .post(self.endpoint("/feedback/"))
            .json(request)
            .send()
            .await
            .map_err(|error| ChatError::RequestFailed {
                detail: error.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ChatError::RequestFailed {
                detail: "Failed to submit feedback".to_string(),
            });
        }

        response
            .json()
            .await
            .map_err(|error| ChatError::RequestFailed {
                detail: error.to_string(),
            })
    }

    /// Execute a SQL query against the backend service and return the
    /// tabular result.
    pub async fn execute_sql(&self, query: &str, max_rows: u32) -> ChatResult<SqlResult> {
        let request = SqlExecuteRequest {
            query: query.to_string(),
            max_rows,
        };
        let response = self
            .authorized(self.http.post(self.endpoint("/sql/execute")))
            .json(&request)
            .send()
            .await
            .map_err(|error| ChatError::RequestFailed {
                detail: error.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ChatError::RequestFailed {
                detail: error_detail(response, "Échec de l'exécution SQL").await,
            });
        }

        response
            .json()
            .await
            .map_err(|error| ChatError::RequestFailed {
                detail: error.to_string(),
            })
    }

    /// Validate a SQL query without executing it. The backend's validation
    /// payload is passed through as-is.
    pub async fn validate_sql(&self, query: &str) -> ChatResult<serde_json::Value> {
        let request = SqlValidateRequest {
            query: query.to_string(),
        };
        let response = self
            .authorized(self.http.post(self.endpoint("/sql/validate")))
            .json(&request)
            .send()
            .await
            .map_err(|error| ChatError::RequestFailed {
                detail: error.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ChatError::RequestFailed {
                detail: error_detail(response, "Échec de la validation").await,
            });
        }

        response
            .json()
            .await
            .map_err(|error| ChatError::RequestFailed {
                detail: error.to_string(),
            })
    }
}

#[async_trait]
impl ChatTransport for ApiClient {
    async fn open_stream(
        &self,
        messages: &[Message],
        mode: Mode,
        cancel: CancelToken,
    ) -> ChatResult<DeltaStream> {
        self.stream_chat(messages, mode, cancel).await
    }
}

/// Extract the `detail` field from a JSON error body, falling back to a
/// generic message when the body has a different shape.
async fn error_detail(response: reqwest::Response, fallback: &str) -> String {
    match response.json::<ErrorBody>().await {
        Ok(body) => body.detail,
        Err(_) => fallback.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped_from_base_url() {
        let client = ApiClient::new("http://localhost:8000/api/v1/");
        assert_eq!(client.endpoint("/chat"), "http://localhost:8000/api/v1/chat");
    }

    #[test]
    fn chat_body_matches_wire_format() {
        let messages = vec![Message::user("List all customers", vec![])];
        let body = serde_json::json!({ "messages": messages, "mode": Mode::Sql });
        assert_eq!(
            body,
            serde_json::json!({
                "messages": [{"role": "user", "content": "List all customers"}],
                "mode": "sql"
            })
        );
    }
}
