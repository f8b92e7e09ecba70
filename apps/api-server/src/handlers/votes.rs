//! Voting endpoint.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use spark_core::policy;
use spark_shared::ApiResponse;
use spark_shared::dto::VoteResponse;

use crate::handlers::apply_decision_headers;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Cast a vote on an idea. Requires authentication.
///
/// POST /api/ideas/{id}/votes
pub async fn cast_vote(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let idea_id = path.into_inner();

    let decision = state
        .limiter
        .check(policy::AUTH_VOTES.name, &identity.user_id.to_string())
        .await?;
    if !decision.allowed {
        return Err(AppError::RateLimited(
            state.limiter.build_limit_error(&decision),
        ));
    }

    // Vote persistence is the product backend's job; the gate is ours.
    let vote = VoteResponse {
        idea_id: idea_id.to_string(),
        voted_at: Utc::now().to_rfc3339(),
    };

    let mut builder = HttpResponse::Ok();
    apply_decision_headers(&mut builder, &decision);
    Ok(builder.json(ApiResponse::ok(vote)))
}
