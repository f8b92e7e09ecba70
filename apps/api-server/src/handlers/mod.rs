//! HTTP handlers and route configuration.

mod health;
mod ideas;
mod quota;
mod votes;

use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::{HttpRequest, HttpResponseBuilder, web};

use spark_core::CallContext;
use spark_core::domain::Decision;
use spark_shared::rate_limit::{HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET};

use crate::middleware::auth::OptionalIdentity;

/// Cookie holding the raw anonymous token.
pub const ANON_COOKIE: &str = "spark_anon_id";

/// Outlives every window that keys off the credential.
const ANON_COOKIE_MAX_AGE_DAYS: i64 = 30;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Quota-gated routes
            .route("/ideas", web::post().to(ideas::submit_idea))
            .route("/ideas/{id}/votes", web::post().to(votes::cast_vote))
            // Read-only quota status, seeds the client-side cache
            .route("/quota/{policy}", web::get().to(quota::quota_status)),
    );
}

/// Copy a decision into the response headers. Set on every gated response,
/// allowed or denied, so the client cache stays current.
pub(crate) fn apply_decision_headers(builder: &mut HttpResponseBuilder, decision: &Decision) {
    builder.insert_header((HEADER_LIMIT, decision.total.to_string()));
    builder.insert_header((HEADER_REMAINING, decision.remaining.to_string()));
    builder.insert_header((HEADER_RESET, decision.reset_time_ms.to_string()));
}

/// Re-issue the anonymous credential. Only called when the resolver minted a
/// fresh token; a valid existing credential is never rotated.
pub(crate) fn anon_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(ANON_COOKIE, token.to_owned())
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(CookieDuration::days(ANON_COOKIE_MAX_AGE_DAYS))
        .finish()
}

/// Collect what the identity resolver needs to know about this request.
pub(crate) fn call_context(req: &HttpRequest, identity: &OptionalIdentity) -> CallContext {
    CallContext {
        user_id: identity.0.as_ref().map(|i| i.user_id),
        anon_credential: req.cookie(ANON_COOKIE).map(|c| c.value().to_string()),
        network_origin: req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test, web};
    use uuid::Uuid;

    use spark_core::ports::{QuotaStore, TokenService};
    use spark_core::{IdentityResolver, RateLimiter};
    use spark_infra::InMemoryQuotaStore;
    use spark_infra::auth::{JwtConfig, JwtTokenService};
    use spark_shared::rate_limit::{
        HEADER_LIMIT, HEADER_REMAINING, HEADER_RESET, HEADER_RETRY_AFTER,
    };

    use super::*;
    use crate::state::AppState;

    fn test_state() -> AppState {
        let quota_store: Arc<dyn QuotaStore> = Arc::new(InMemoryQuotaStore::new());
        let limiter = Arc::new(RateLimiter::with_system_clock(quota_store.clone()));
        let resolver = Arc::new(IdentityResolver::new(limiter.clone()));
        let token_service: Arc<dyn TokenService> =
            Arc::new(JwtTokenService::new(JwtConfig::default()));
        AppState {
            limiter,
            resolver,
            quota_store,
            token_service,
        }
    }

    macro_rules! test_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .configure(configure_routes),
            )
            .await
        };
    }

    fn idea_body() -> serde_json::Value {
        serde_json::json!({ "title": "Dark mode", "description": "Please" })
    }

    fn header_num<B>(resp: &actix_web::dev::ServiceResponse<B>, name: &str) -> i64 {
        resp.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| panic!("missing or unparsable header {name}"))
    }

    #[actix_rt::test]
    async fn anon_idea_mints_cookie_and_reports_budget() {
        let app = test_app!(test_state());

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/ideas")
                .set_json(idea_body())
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(header_num(&resp, HEADER_LIMIT), 1);
        assert_eq!(header_num(&resp, HEADER_REMAINING), 0);
        assert!(header_num(&resp, HEADER_RESET) > 0);

        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == ANON_COOKIE)
            .expect("anonymous cookie not set");
        assert!(cookie.http_only().unwrap_or(false));
        assert!(cookie.value().starts_with("anon_"));

        // Replaying the credential hits the one-per-day wall.
        let denied = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/ideas")
                .cookie(cookie.clone().into_owned())
                .set_json(idea_body())
                .to_request(),
        )
        .await;

        assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(header_num(&denied, HEADER_LIMIT), 1);
        assert_eq!(header_num(&denied, HEADER_REMAINING), 0);
        assert!(denied.headers().contains_key(HEADER_RETRY_AFTER));

        let body: serde_json::Value = test::read_body_json(denied).await;
        assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
        assert_eq!(body["success"], false);
        assert_eq!(body["remaining"], 0);
        assert!(body["resetTime"].as_i64().is_some());
        assert!(body["retryAfter"].as_u64().is_some());
    }

    #[actix_rt::test]
    async fn valid_anon_cookie_is_never_rotated() {
        let app = test_app!(test_state());

        let first = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/ideas")
                .set_json(idea_body())
                .to_request(),
        )
        .await;
        let cookie = first
            .response()
            .cookies()
            .find(|c| c.name() == ANON_COOKIE)
            .expect("anonymous cookie not set")
            .into_owned();

        let replay = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/ideas")
                .cookie(cookie)
                .set_json(idea_body())
                .to_request(),
        )
        .await;

        assert!(
            replay
                .response()
                .cookies()
                .all(|c| c.name() != ANON_COOKIE)
        );
    }

    #[actix_rt::test]
    async fn anon_token_issuance_is_capped_per_origin() {
        let app = test_app!(test_state());

        // Cookie-less calls mint a fresh credential each time, all charged
        // to the same origin.
        for _ in 0..3 {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri("/api/ideas")
                    .set_json(idea_body())
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
        }

        let denied = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/ideas")
                .set_json(idea_body())
                .to_request(),
        )
        .await;
        assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(
            denied
                .response()
                .cookies()
                .all(|c| c.name() != ANON_COOKIE)
        );
    }

    #[actix_rt::test]
    async fn authenticated_idea_budget_counts_down() {
        let state = test_state();
        let token = state
            .token_service
            .generate_token(Uuid::new_v4())
            .expect("token generation failed");
        let app = test_app!(state);

        for expected_remaining in (0..5).rev() {
            let resp = test::call_service(
                &app,
                test::TestRequest::post()
                    .uri("/api/ideas")
                    .insert_header(("Authorization", format!("Bearer {token}")))
                    .set_json(idea_body())
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            assert_eq!(header_num(&resp, HEADER_LIMIT), 5);
            assert_eq!(header_num(&resp, HEADER_REMAINING), expected_remaining);
        }

        let denied = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/ideas")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .set_json(idea_body())
                .to_request(),
        )
        .await;
        assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);

        let body: serde_json::Value = test::read_body_json(denied).await;
        let retry_after = body["retryAfter"].as_u64().expect("retryAfter missing");
        assert!(retry_after <= 3600);
    }

    #[actix_rt::test]
    async fn vote_requires_authentication() {
        let app = test_app!(test_state());

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/ideas/{}/votes", Uuid::new_v4()))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn vote_is_gated_per_user() {
        let state = test_state();
        let token = state
            .token_service
            .generate_token(Uuid::new_v4())
            .expect("token generation failed");
        let app = test_app!(state);

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri(&format!("/api/ideas/{}/votes", Uuid::new_v4()))
                .insert_header(("Authorization", format!("Bearer {token}")))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(header_num(&resp, HEADER_LIMIT), 100);
        assert_eq!(header_num(&resp, HEADER_REMAINING), 99);
    }

    #[actix_rt::test]
    async fn quota_status_does_not_consume() {
        let state = test_state();
        let token = state
            .token_service
            .generate_token(Uuid::new_v4())
            .expect("token generation failed");
        let app = test_app!(state);

        for _ in 0..2 {
            let resp = test::call_service(
                &app,
                test::TestRequest::get()
                    .uri("/api/quota/AUTH_IDEAS")
                    .insert_header(("Authorization", format!("Bearer {token}")))
                    .to_request(),
            )
            .await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(header_num(&resp, HEADER_REMAINING), 5);
        }
    }

    #[actix_rt::test]
    async fn quota_status_rejects_unknown_policy() {
        let app = test_app!(test_state());

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/quota/NO_SUCH_POLICY")
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn blank_title_is_rejected() {
        let app = test_app!(test_state());

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/ideas")
                .set_json(serde_json::json!({ "title": "   ", "description": "x" }))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
