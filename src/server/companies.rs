use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::invite::{self, NewCompany};
use crate::policy;
use crate::server::AppState;
use crate::server::dto::{CompanyRequest, SlugCheckParams, SlugCheckResponse};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};
use crate::server::validation::{validate_company, validate_slug};

fn to_new_company(req: CompanyRequest) -> NewCompany {
    NewCompany {
        name: req.name.trim().to_string(),
        slug: req.slug,
        description: req.description,
        email: req.email,
        phone: req.phone,
        address: req.address,
    }
}

pub async fn list_companies(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let companies = state.store.list_user_companies(&auth.user.id)?;
    Ok::<_, ApiError>(Json(ApiResponse::success("", companies)))
}

pub async fn create_company(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CompanyRequest>,
) -> impl IntoResponse {
    validate_company(&req)?;

    let company = invite::create_company(state.store.as_ref(), &auth.user, to_new_company(req))?;

    Ok::<_, ApiError>(Json(ApiResponse::success(
        "You have successfully created a company. Invite people to your company now.",
        company,
    )))
}

pub async fn show_company(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
) -> impl IntoResponse {
    if !policy::can_view_company(state.store.as_ref(), &auth.user.id, &company_id) {
        return Err(ApiError::forbidden());
    }

    let company = state
        .store
        .get_company_for_user(&company_id, &auth.user.id)?
        .or_no_result()?;

    Ok(Json(ApiResponse::success("", company)))
}

pub async fn update_company(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
    Json(req): Json<CompanyRequest>,
) -> impl IntoResponse {
    if !policy::can_update_company(state.store.as_ref(), &auth.user.id, &company_id) {
        return Err(ApiError::forbidden());
    }

    validate_company(&req)?;

    let existing = state.store.get_company(&company_id)?.or_no_result()?;
    let company = invite::update_company(state.store.as_ref(), &existing, to_new_company(req))?;

    Ok(Json(ApiResponse::success(
        "You have successfully updated company details.",
        company,
    )))
}

pub async fn delete_company(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
) -> impl IntoResponse {
    if !policy::can_update_company(state.store.as_ref(), &auth.user.id, &company_id) {
        return Err(ApiError::forbidden());
    }

    if !state.store.delete_company(&company_id)? {
        return Err(ApiError::no_result());
    }

    Ok(Json(ApiResponse::message(
        "You have successfully deleted the company.",
    )))
}

pub async fn visit_company(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
) -> impl IntoResponse {
    if !policy::can_visit_company(state.store.as_ref(), &auth.user.id, &company_id) {
        return Err(ApiError::forbidden());
    }

    state
        .store
        .touch_membership_visit(&company_id, &auth.user.id)?;

    Ok(Json(ApiResponse::message("")))
}

pub async fn list_members(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
) -> impl IntoResponse {
    if !policy::can_view_company_users(state.store.as_ref(), &auth.user.id, &company_id) {
        return Err(ApiError::forbidden());
    }

    let members = state.store.list_company_members(&company_id)?;

    Ok(Json(ApiResponse::success("", members)))
}

pub async fn check_slug(
    _auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<SlugCheckParams>,
) -> impl IntoResponse {
    if let Err(e) = validate_slug(&params.slug) {
        return Err(ApiError::validation(vec![e]));
    }

    let taken = state
        .store
        .find_company_by_slug(&params.slug, params.exclude.as_deref())?
        .is_some();

    Ok(Json(ApiResponse::success(
        "",
        SlugCheckResponse {
            slug: params.slug,
            available: !taken,
        },
    )))
}
