use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::{RequireUser, TokenGenerator};
use crate::server::AppState;
use crate::server::dto::{ChangePasswordRequest, UpdateProfileRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::server::validation::{validate_password, validate_profile};

pub async fn get_profile(auth: RequireUser) -> impl IntoResponse {
    Json(ApiResponse::success("", auth.user))
}

pub async fn update_profile(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> impl IntoResponse {
    validate_profile(&req)?;

    state
        .store
        .update_profile(&auth.user.id, req.name.trim(), req.picture.as_deref())?;

    let user = state.store.get_user(&auth.user.id)?.or_no_result()?;

    Ok::<_, ApiError>(Json(ApiResponse::success(
        "You have successfully updated your profile.",
        user,
    )))
}

pub async fn change_password(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChangePasswordRequest>,
) -> impl IntoResponse {
    let mut errors = Vec::new();
    validate_password(&req.new_password, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let generator = TokenGenerator::new();
    if !generator.verify(&req.current_password, &auth.user.password_hash)? {
        return Err(ApiError::unprocessable("Current password is incorrect."));
    }

    let password_hash = generator.hash(&req.new_password)?;
    state.store.update_password(&auth.user.id, &password_hash)?;

    Ok(Json(ApiResponse::message(
        "You have successfully changed your password.",
    )))
}
