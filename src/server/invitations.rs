use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};

use crate::auth::RequireUser;
use crate::invite;
use crate::policy;
use crate::server::AppState;
use crate::server::dto::{InvitationListParams, InviteRequest, InviteResponse, RespondInvitationRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt};

/// Bulk invite. Successes and failures are partitioned in the response;
/// inviting nobody is a reported outcome, not an error.
pub async fn invite_to_company(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
    Json(req): Json<InviteRequest>,
) -> impl IntoResponse {
    if !policy::can_manage_invitations(state.store.as_ref(), &auth.user.id, &company_id) {
        return Err(ApiError::forbidden());
    }

    let company = state
        .store
        .get_company_for_user(&company_id, &auth.user.id)?
        .or_no_result()?;

    let report = invite::invite_emails(
        state.store.clone(),
        state.mailer.clone(),
        &company,
        &auth.user,
        &req.emails,
        &req.message,
    )
    .await;

    let message = if report.invited.is_empty() {
        "No emails have been invited to the company. Please ensure that the emails are not \
         part of the company already or have not been invited before."
            .to_string()
    } else {
        let emails: Vec<&str> = report
            .invited
            .iter()
            .map(|invitation| invitation.email.as_str())
            .collect();
        format!(
            "You have successfully invited {} to the company.",
            emails.join(", ")
        )
    };

    Ok(Json(ApiResponse::success(
        message,
        InviteResponse {
            invited: report.invited,
            failed: report.failed,
        },
    )))
}

pub async fn list_outgoing(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(company_id): Path<String>,
    Query(params): Query<InvitationListParams>,
) -> impl IntoResponse {
    if !policy::can_manage_invitations(state.store.as_ref(), &auth.user.id, &company_id) {
        return Err(ApiError::forbidden());
    }

    let page = params.page.unwrap_or(0);
    let invitations = invite::list_outgoing(state.store.as_ref(), &company_id, page)?;

    let message = if invitations.is_empty() && page >= 1 {
        "No more results."
    } else {
        ""
    };

    Ok(Json(ApiResponse::success(message, invitations)))
}

pub async fn show_outgoing(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((company_id, invitation_id)): Path<(String, String)>,
) -> impl IntoResponse {
    if !policy::can_manage_invitations(state.store.as_ref(), &auth.user.id, &company_id) {
        return Err(ApiError::forbidden());
    }

    let invitation = state
        .store
        .get_invitation_in_company(&invitation_id, &company_id)?
        .or_no_result()?;

    Ok(Json(ApiResponse::success("", invitation)))
}

pub async fn delete_invitation(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path((company_id, invitation_id)): Path<(String, String)>,
) -> impl IntoResponse {
    if !policy::can_manage_invitations(state.store.as_ref(), &auth.user.id, &company_id) {
        return Err(ApiError::forbidden());
    }

    let invitation = state
        .store
        .get_invitation_in_company(&invitation_id, &company_id)?
        .or_no_result()?;

    state.store.delete_invitation(&invitation.id)?;

    Ok(Json(ApiResponse::message(
        "You have successfully deleted the invitation.",
    )))
}

/// Invitations addressed to the caller's registered email, newest first.
pub async fn list_incoming(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let invitations = state.store.list_invitations_for_email(&auth.user.email)?;
    Ok::<_, ApiError>(Json(ApiResponse::success("", invitations)))
}

pub async fn show_incoming(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(invitation_id): Path<String>,
) -> impl IntoResponse {
    if !policy::can_show_incoming_invitation(state.store.as_ref(), &auth.user, &invitation_id) {
        return Err(ApiError::forbidden());
    }

    let invitation = state.store.get_invitation(&invitation_id)?.or_no_result()?;

    Ok(Json(ApiResponse::success("", invitation)))
}

pub async fn respond(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(invitation_id): Path<String>,
    Json(req): Json<RespondInvitationRequest>,
) -> impl IntoResponse {
    if !policy::can_respond_to_invitation(state.store.as_ref(), &auth.user, &invitation_id) {
        return Err(ApiError::forbidden());
    }

    let invitation = invite::respond(
        state.store.as_ref(),
        &auth.user,
        &invitation_id,
        req.is_join,
    )?;

    let message = if req.is_join {
        "You have successfully joined the company."
    } else {
        "You have declined the invitation."
    };

    Ok(Json(ApiResponse::success(message, invitation)))
}
