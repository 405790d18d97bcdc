/// Profile Routes
///
/// Read and update the caller's own profile. Both routes sit behind the
/// authorize guard; the subject comes from the claims it verified.

use actix_web::{web, HttpRequest, HttpResponse};

use crate::error::{AppError, ErrorContext};
use crate::model::Profile;
use crate::routes::auth::session_claims;
use crate::store::ProfileRepository;

/// PATCH /api/v1/user/update-info
///
/// Overwrite name, surname, phone and address. Missing fields become empty.
pub async fn update_info(
    req: HttpRequest,
    body: web::Json<Profile>,
    profiles: web::Data<dyn ProfileRepository>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("update_profile");

    let user_id = session_claims(&req).map_err(|e| context.fail(e))?.base.id;

    let mut profile = body.into_inner();
    profile.user_id = user_id;

    profiles
        .update(&profile)
        .await
        .map_err(|e| context.fail(AppError::Unhealthy(e.to_string())))?;

    let stored = profiles
        .get(user_id)
        .await
        .map_err(|e| context.fail(AppError::Unhealthy(e.to_string())))?
        .ok_or_else(|| context.fail(AppError::RecordNotFound))?;

    tracing::info!(request_id = %context.request_id, user_id = %user_id, "Profile updated");

    Ok(HttpResponse::Ok().json(stored))
}

/// GET /api/v1/user/
pub async fn get_profile(
    req: HttpRequest,
    profiles: web::Data<dyn ProfileRepository>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("get_profile");

    let user_id = session_claims(&req).map_err(|e| context.fail(e))?.base.id;

    let profile = profiles
        .get(user_id)
        .await
        .map_err(|e| context.fail(AppError::Unhealthy(e.to_string())))?
        .ok_or_else(|| context.fail(AppError::RecordNotFound))?;

    Ok(HttpResponse::Ok().json(profile))
}
