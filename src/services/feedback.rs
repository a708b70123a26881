use serde::{Deserialize, Serialize};

/// User verdict on an assistant answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Like,
    Dislike,
}

/// Payload for the feedback endpoint: the question/answer pair being rated
/// plus an optional free-form reason.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest {
    pub user_question: String,
    pub agent_answer: String,
    pub rating: Rating,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FeedbackRequest {
    /// Build a feedback payload from the rated exchange.
    pub fn new(
        user_question: impl Into<String>,
        agent_answer: impl Into<String>,
        rating: Rating,
        reason: Option<String>,
    ) -> Self {
        Self {
            user_question: user_question.into(),
            agent_answer: agent_answer.into(),
            rating,
            reason,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackResponse {
    pub message: String,
}
