//! Read-only quota status endpoint.

use actix_web::{HttpRequest, HttpResponse, web};

use spark_core::{QuotaError, identity};
use spark_shared::ApiResponse;

use crate::handlers::{apply_decision_headers, call_context};
use crate::middleware::auth::OptionalIdentity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// What a check would decide right now, without consuming a slot.
///
/// GET /api/quota/{policy}
///
/// The UI calls this once on load to seed its predictive cache; afterwards
/// the cache is kept current from the headers of the gated calls themselves.
pub async fn quota_status(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let policy_name = path.into_inner();
    let call = call_context(&req, &identity);

    // Peeks never mint. A visitor with no usable credential gets the view a
    // fresh identity would: the full budget. The throwaway identifier has no
    // record, and peek never writes one.
    let identifier = match (&call.user_id, call.anon_credential.as_deref()) {
        (Some(user_id), _) => user_id.to_string(),
        (None, Some(credential)) if identity::is_valid_anon_token(credential) => {
            credential.to_string()
        }
        _ => identity::mint_anon_token(),
    };

    let decision = match state.limiter.peek(&policy_name, &identifier).await {
        Ok(decision) => decision,
        // The policy name comes off the URL here, so an unknown one is the
        // client's mistake, not our misconfiguration.
        Err(QuotaError::UnknownPolicy(name)) => {
            return Err(AppError::BadRequest(format!("unknown policy: {name}")));
        }
        Err(e) => return Err(e.into()),
    };

    let mut builder = HttpResponse::Ok();
    apply_decision_headers(&mut builder, &decision);
    Ok(builder.json(ApiResponse::ok(decision)))
}
