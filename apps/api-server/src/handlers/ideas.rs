//! Idea submission endpoint.

use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use uuid::Uuid;

use spark_core::policy;
use spark_shared::ApiResponse;
use spark_shared::dto::{IdeaResponse, SubmitIdeaRequest};

use crate::handlers::{anon_cookie, apply_decision_headers, call_context};
use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// Submit an idea, anonymously or signed in.
///
/// POST /api/ideas
///
/// Anonymous callers are identified by their token cookie (minted here on
/// first contact, subject to the per-origin issuance budget) and gated by
/// `ANON_IDEAS`; signed-in callers by their user id and `AUTH_IDEAS`. The
/// check happens before the domain write, and the decision is copied into
/// the response headers either way.
pub async fn submit_idea(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    body: web::Json<SubmitIdeaRequest>,
) -> AppResult<HttpResponse> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }

    let call = call_context(&req, &identity);
    let resolved = state.resolver.resolve(&call).await?;

    let policy = if call.user_id.is_some() {
        &policy::AUTH_IDEAS
    } else {
        &policy::ANON_IDEAS
    };

    let decision = state.limiter.check(policy.name, &resolved.identifier).await?;
    if !decision.allowed {
        return Err(AppError::RateLimited(
            state.limiter.build_limit_error(&decision),
        ));
    }

    // The idea itself is persisted by the product backend, out of scope
    // here; this scaffold stops at the gate.
    let idea = IdeaResponse {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        created_at: Utc::now().to_rfc3339(),
    };

    let mut builder = HttpResponse::Created();
    apply_decision_headers(&mut builder, &decision);
    if resolved.minted_new_credential {
        builder.cookie(anon_cookie(&resolved.identifier));
    }

    Ok(builder.json(ApiResponse::ok(idea)))
}
