use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::models::{ErrorResponse, FindPartnersRequest, FindPartnersResponse};
use crate::routes::{validation_error, AppState};
use crate::services::AppwriteError;

/// Configure partner discovery routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/partners/find", web::post().to(find_partners));
}

/// Find partners endpoint
///
/// POST /api/v1/partners/find
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "limit": 20,
///   "criteria": { "languagesWanted": ["es"], "verifiedOnly": true }
/// }
/// ```
///
/// Without `criteria` the user's stored partner preferences are used.
async fn find_partners(state: web::Data<AppState>, req: web::Json<FindPartnersRequest>) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_partners request: {:?}", errors);
        return validation_error(errors);
    }

    let user_id = &req.user_id;
    let requested = if req.limit == 0 { state.matching.default_limit } else { req.limit };
    let limit = usize::from(requested.min(state.matching.max_limit));

    tracing::info!("Finding partners for user: {}, limit: {}", user_id, limit);

    let requester = match state.appwrite.get_profile(user_id).await {
        Ok(profile) => profile,
        Err(AppwriteError::NotFound(message)) => {
            return HttpResponse::NotFound().json(ErrorResponse::new("Profile not found", message, 404));
        }
        Err(e) => {
            tracing::error!("Failed to fetch profile for {}: {}", user_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse::new(
                "Failed to fetch user profile",
                e.to_string(),
                500,
            ));
        }
    };

    let criteria = match &req.criteria {
        Some(criteria) => criteria.clone(),
        None => match state.appwrite.get_criteria(user_id).await {
            Ok(criteria) => criteria,
            Err(e) => {
                tracing::error!("Failed to fetch partner preferences for {}: {}", user_id, e);
                return HttpResponse::InternalServerError().json(ErrorResponse::new(
                    "Failed to fetch partner preferences",
                    e.to_string(),
                    500,
                ));
            }
        },
    };

    tracing::debug!(
        "Applying {} active filters for {}",
        criteria.active_filter_count(),
        user_id
    );

    let fetch = limit.saturating_mul(state.matching.candidate_multiplier.max(1));
    let candidates = match state.appwrite.query_candidates(&requester, &criteria, fetch).await {
        Ok(candidates) => candidates,
        Err(e) => {
            tracing::error!("Failed to query candidates for {}: {}", user_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse::new(
                "Failed to query candidates",
                e.to_string(),
                500,
            ));
        }
    };

    let result = state.matcher.find_partners(&requester, &criteria, candidates, limit);

    tracing::info!(
        "Returning {} partners for user {} (from {} candidates)",
        result.partners.len(),
        user_id,
        result.total_candidates
    );

    HttpResponse::Ok().json(FindPartnersResponse {
        partners: result.partners,
        total_candidates: result.total_candidates,
    })
}
