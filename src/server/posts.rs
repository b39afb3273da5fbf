use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::policy;
use crate::posts::{self, FeedRequest, PostDraft};
use crate::server::AppState;
use crate::server::dto::{FeedParams, PostRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::server::validation::validate_post;
use crate::types::PostStatus;

pub async fn list_posts(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
    Query(params): Query<FeedParams>,
) -> impl IntoResponse {
    if !policy::can_view_company(state.store.as_ref(), &auth.user.id, &company_id) {
        return Err(ApiError::forbidden());
    }

    let posts = posts::feed(
        state.store.as_ref(),
        FeedRequest {
            company_id,
            author_id: params.author,
            status: params.status.and_then(PostStatus::from_i64),
            last_id: params.last_id,
            last_published: params.last_published,
            last_updated: params.last_updated,
            limit: params.limit,
        },
    )?;

    let message = format!("You have successfully retrieved {} posts.", posts.len());

    Ok(Json(ApiResponse::success(message, posts)))
}

pub async fn create_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
    Json(req): Json<PostRequest>,
) -> impl IntoResponse {
    if !policy::can_create_post(state.store.as_ref(), &auth.user.id, &company_id) {
        return Err(ApiError::forbidden());
    }

    let status = validate_post(&req)?;

    let post = posts::create_post(
        state.store.as_ref(),
        &auth.user.id,
        &company_id,
        PostDraft {
            title: req.title,
            content: req.content,
            status,
            scheduled_at: req.scheduled_at,
        },
    )?;

    Ok(Json(ApiResponse::success(
        "You have successfully created a post.",
        post,
    )))
}

pub async fn show_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((company_id, post_id)): Path<(String, String)>,
) -> impl IntoResponse {
    if !policy::can_view_company(state.store.as_ref(), &auth.user.id, &company_id)
        || !policy::can_show_post(state.store.as_ref(), &post_id, &company_id)
    {
        return Err(ApiError::forbidden());
    }

    let post = state.store.get_post_detail(&post_id)?.or_no_result()?;

    Ok(Json(ApiResponse::success(
        "You have successfully retrieved the post.",
        post,
    )))
}

pub async fn update_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((company_id, post_id)): Path<(String, String)>,
    Json(req): Json<PostRequest>,
) -> impl IntoResponse {
    if !policy::can_modify_post(state.store.as_ref(), &auth.user.id, &post_id, &company_id) {
        return Err(ApiError::forbidden());
    }

    let status = validate_post(&req)?;

    let existing = state
        .store
        .get_post_in_company(&post_id, &company_id)?
        .or_no_result()?;

    let post = posts::edit_post(
        state.store.as_ref(),
        &existing,
        PostDraft {
            title: req.title,
            content: req.content,
            status,
            scheduled_at: req.scheduled_at,
        },
    )?;

    Ok(Json(ApiResponse::success(
        "You have successfully updated the post.",
        post,
    )))
}

pub async fn delete_post(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((company_id, post_id)): Path<(String, String)>,
) -> impl IntoResponse {
    if !policy::can_modify_post(state.store.as_ref(), &auth.user.id, &post_id, &company_id) {
        return Err(ApiError::forbidden());
    }

    if !state.store.delete_post(&post_id)? {
        return Err(ApiError::no_result());
    }

    Ok(Json(ApiResponse::message(
        "You have successfully deleted the post.",
    )))
}
