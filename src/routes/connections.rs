use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::models::{
    AckResponse, ConnectionRequest, ConnectionStateQuery, EdgeListResponse, InterestResponse,
    UserQuery,
};
use crate::routes::{connection_error_response, validation_error, AppState};

/// Configure all connection routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/connections")
            .route("/interest", web::post().to(record_interest))
            .route("/pass", web::post().to(record_pass))
            .route("/undo", web::post().to(undo))
            .route("/state", web::get().to(check_state))
            .route("/incoming", web::get().to(list_incoming))
            .route("/outgoing", web::get().to(list_outgoing)),
    );
}

/// Record interest endpoint
///
/// POST /api/v1/connections/interest
///
/// Request body:
/// ```json
/// { "fromId": "string", "toId": "string" }
/// ```
///
/// `isNewMatch` is true only for the call that created the match.
async fn record_interest(state: web::Data<AppState>, req: web::Json<ConnectionRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.manager.record_interest(&req.from_id, &req.to_id).await {
        Ok(is_new_match) => {
            tracing::info!(from = %req.from_id, to = %req.to_id, is_new_match, "Interest recorded");
            HttpResponse::Ok().json(InterestResponse { is_new_match })
        }
        Err(e) => connection_error_response(&e),
    }
}

/// Record pass endpoint
///
/// POST /api/v1/connections/pass
async fn record_pass(state: web::Data<AppState>, req: web::Json<ConnectionRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.manager.record_pass(&req.from_id, &req.to_id).await {
        Ok(()) => HttpResponse::Ok().json(AckResponse { success: true }),
        Err(e) => connection_error_response(&e),
    }
}

/// Undo endpoint
///
/// POST /api/v1/connections/undo
async fn undo(state: web::Data<AppState>, req: web::Json<ConnectionRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        return validation_error(errors);
    }

    match state.manager.undo(&req.from_id, &req.to_id).await {
        Ok(()) => HttpResponse::Ok().json(AckResponse { success: true }),
        Err(e) => connection_error_response(&e),
    }
}

/// GET /api/v1/connections/state?fromId={fromId}&toId={toId}
async fn check_state(state: web::Data<AppState>, query: web::Query<ConnectionStateQuery>) -> impl Responder {
    match state.manager.check_state(&query.from_id, &query.to_id).await {
        Ok(connection_state) => HttpResponse::Ok().json(connection_state),
        Err(e) => connection_error_response(&e),
    }
}

/// Users who are interested in `userId`
///
/// GET /api/v1/connections/incoming?userId={userId}
async fn list_incoming(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    match state.manager.list_incoming(&query.user_id).await {
        Ok(user_ids) => HttpResponse::Ok().json(edge_list(&query.user_id, user_ids)),
        Err(e) => connection_error_response(&e),
    }
}

/// GET /api/v1/connections/outgoing?userId={userId}
async fn list_outgoing(state: web::Data<AppState>, query: web::Query<UserQuery>) -> impl Responder {
    match state.manager.list_outgoing(&query.user_id).await {
        Ok(user_ids) => HttpResponse::Ok().json(edge_list(&query.user_id, user_ids)),
        Err(e) => connection_error_response(&e),
    }
}

fn edge_list(user_id: &str, user_ids: Vec<String>) -> EdgeListResponse {
    EdgeListResponse {
        user_id: user_id.to_string(),
        count: user_ids.len(),
        user_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchingSettings;
    use crate::connection::{RetryPolicy, TransactionManager};
    use crate::core::Matcher;
    use crate::models::{ConnectionState, ErrorResponse};
    use crate::routes::configure_routes;
    use crate::services::{
        AppwriteClient, AppwriteCollections, InMemoryConnectionRepository, InMemoryMatchFactory,
        LocalRateLimiter, RateLimitPolicy,
    };
    use actix_web::{http::StatusCode, test, App};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_state(interest_limit: u32) -> AppState {
        let policy = RateLimitPolicy {
            interest_limit,
            pass_limit: 10,
            window: Duration::from_secs(60),
        };
        let repository = Arc::new(InMemoryConnectionRepository::new());
        let limiter = Arc::new(LocalRateLimiter::new(policy, 100));
        let manager = TransactionManager::new(
            repository.clone(),
            limiter.clone(),
            limiter,
            Arc::new(InMemoryMatchFactory::new()),
        )
        .with_retry_policy(RetryPolicy::immediate(3));

        let appwrite = AppwriteClient::new(
            "http://localhost/v1".to_string(),
            "key".to_string(),
            "project".to_string(),
            "db".to_string(),
            AppwriteCollections {
                profiles: "profiles".to_string(),
                preferences: "preferences".to_string(),
                matches: "matches".to_string(),
            },
            Duration::from_secs(1),
        )
        .unwrap();

        AppState {
            appwrite: Arc::new(appwrite),
            repository,
            manager,
            matcher: Matcher::default(),
            matching: MatchingSettings::default(),
        }
    }

    fn connect(from: &str, to: &str) -> serde_json::Value {
        serde_json::json!({ "fromId": from, "toId": to })
    }

    #[actix_web::test]
    async fn test_mutual_interest_reports_new_match_once() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(10)))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/connections/interest")
            .set_json(connect("alice", "bob"))
            .to_request();
        let first: InterestResponse = test::call_and_read_body_json(&app, req).await;
        assert!(!first.is_new_match);

        let req = test::TestRequest::post()
            .uri("/api/v1/connections/interest")
            .set_json(connect("bob", "alice"))
            .to_request();
        let second: InterestResponse = test::call_and_read_body_json(&app, req).await;
        assert!(second.is_new_match);

        let req = test::TestRequest::get()
            .uri("/api/v1/connections/incoming?userId=alice")
            .to_request();
        let incoming: EdgeListResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(incoming.user_ids, vec!["bob".to_string()]);
        assert_eq!(incoming.count, 1);
    }

    #[actix_web::test]
    async fn test_pass_then_state_then_undo() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(10)))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/connections/pass")
            .set_json(connect("alice", "bob"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/v1/connections/state?fromId=alice&toId=bob")
            .to_request();
        let state: ConnectionState = test::call_and_read_body_json(&app, req).await;
        assert_eq!(state, ConnectionState { interested: false, passed: true });

        let req = test::TestRequest::post()
            .uri("/api/v1/connections/undo")
            .set_json(connect("alice", "bob"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get()
            .uri("/api/v1/connections/state?fromId=alice&toId=bob")
            .to_request();
        let state: ConnectionState = test::call_and_read_body_json(&app, req).await;
        assert_eq!(state, ConnectionState::default());
    }

    #[actix_web::test]
    async fn test_self_connection_is_conflict() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(10)))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/connections/interest")
            .set_json(connect("alice", "alice"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_empty_id_is_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(10)))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/connections/interest")
            .set_json(connect("", "bob"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_rate_limited_interest_returns_429() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(1)))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/connections/interest")
            .set_json(connect("alice", "bob"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/api/v1/connections/interest")
            .set_json(connect("alice", "carol"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            resp.headers().get("retry-after").and_then(|v| v.to_str().ok()),
            Some("60")
        );

        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.retry_after_secs, Some(60));
        assert_eq!(body.status_code, 429);
    }

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(10)))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/health").to_request();
        let health: crate::models::HealthResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(health.status, "healthy");
    }
}
