//! Data Transfer Objects - request/response types for the API.

use serde::{Deserialize, Serialize};

/// Request to submit a new idea.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitIdeaRequest {
    pub title: String,
    pub description: String,
}

/// Response for an accepted idea submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdeaResponse {
    pub id: String,
    pub title: String,
    pub created_at: String,
}

/// Response for an accepted vote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub idea_id: String,
    pub voted_at: String,
}
