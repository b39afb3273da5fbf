use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::{RequireUser, TokenGenerator, generate_code};
use crate::mail;
use crate::server::AppState;
use crate::server::dto::{
    ActivateRequest, ForgotPasswordRequest, LoginRequest, LoginResponse, ResendActivationRequest,
    ResetPasswordRequest, SignupRequest,
};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::{validate_password, validate_signup};
use crate::types::{SessionToken, User};

const RESET_CODE_TTL_HOURS: i64 = 24;

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> impl IntoResponse {
    validate_signup(&req)?;

    if state.store.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::unprocessable(
            "Email address has already been taken.",
        ));
    }

    let generator = TokenGenerator::new();
    let password_hash = generator.hash(&req.password)?;
    let activation_code = generate_code();

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        email: req.email,
        password_hash,
        picture: None,
        activation_code: Some(activation_code.clone()),
        reset_code: None,
        reset_code_expires_at: None,
        created_at: now,
        updated_at: now,
    };

    match state.store.create_user(&user) {
        Ok(()) => {}
        // Lost the unique-email race to a concurrent signup.
        Err(crate::error::Error::AlreadyExists) => {
            return Err(ApiError::unprocessable(
                "Email address has already been taken.",
            ));
        }
        Err(e) => return Err(e.into()),
    }

    state.mailer.send(&mail::activation_mail(&user, &activation_code));

    Ok::<_, ApiError>(Json(ApiResponse::success(
        "You have successfully signed up. Please check your email to activate your account.",
        user,
    )))
}

pub async fn activate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActivateRequest>,
) -> impl IntoResponse {
    let user = state.store.get_user_by_email(&req.email)?;

    // An unknown email and a wrong code answer identically.
    let Some(user) = user else {
        return Err(ApiError::unprocessable("Invalid activation code."));
    };

    match &user.activation_code {
        None => Err(ApiError::unprocessable("Account is already activated.")),
        Some(code) if *code == req.code => {
            state.store.clear_activation_code(&user.id)?;
            Ok(Json(ApiResponse::message(
                "You have successfully activated your account.",
            )))
        }
        Some(_) => Err(ApiError::unprocessable("Invalid activation code.")),
    }
}

pub async fn resend_activation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResendActivationRequest>,
) -> impl IntoResponse {
    if let Some(user) = state.store.get_user_by_email(&req.email)? {
        if !user.is_activated() {
            let code = generate_code();
            state.store.set_activation_code(&user.id, &code)?;
            state.mailer.send(&mail::activation_mail(&user, &code));
        }
    }

    // Never reveals whether the address exists or is pending.
    Ok::<_, ApiError>(Json(ApiResponse::message(
        "If the account is pending activation, a new code has been sent.",
    )))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let user = state
        .store
        .get_user_by_email(&req.email)?
        .ok_or_else(|| ApiError::unprocessable("Invalid email address or password."))?;

    let generator = TokenGenerator::new();
    if !generator.verify(&req.password, &user.password_hash)? {
        return Err(ApiError::unprocessable("Invalid email address or password."));
    }

    if !user.is_activated() {
        return Err(ApiError::unprocessable(
            "Please activate your account first.",
        ));
    }

    let (raw_token, lookup, hash) = generator.generate()?;
    let expires_at = state
        .session_ttl_seconds
        .map(|seconds| Utc::now() + Duration::seconds(seconds));

    let token = SessionToken {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        user_id: user.id.clone(),
        created_at: Utc::now(),
        expires_at,
        last_used_at: None,
    };
    state.store.create_session(&token)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(
        "You have logged in.",
        LoginResponse {
            token: raw_token,
            user,
        },
    )))
}

pub async fn logout(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state.store.delete_session(&auth.token.id)?;
    Ok::<_, ApiError>(Json(ApiResponse::message("You have logged out.")))
}

pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ForgotPasswordRequest>,
) -> impl IntoResponse {
    if let Some(user) = state.store.get_user_by_email(&req.email)? {
        let code = generate_code();
        let expires_at = Utc::now() + Duration::hours(RESET_CODE_TTL_HOURS);
        state.store.set_reset_code(&user.id, &code, expires_at)?;
        state.mailer.send(&mail::password_reset_mail(&user, &code));
    }

    Ok::<_, ApiError>(Json(ApiResponse::message(
        "If the email exists, reset instructions have been sent.",
    )))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResetPasswordRequest>,
) -> impl IntoResponse {
    let mut errors = Vec::new();
    validate_password(&req.password, &mut errors);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let user = state.store.get_user_by_email(&req.email)?;

    let valid = user.as_ref().is_some_and(|user| {
        user.reset_code.as_deref() == Some(req.code.as_str())
            && user
                .reset_code_expires_at
                .is_some_and(|expires_at| expires_at > Utc::now())
    });

    let Some(user) = user.filter(|_| valid) else {
        return Err(ApiError::unprocessable("Invalid or expired reset code."));
    };

    let generator = TokenGenerator::new();
    let password_hash = generator.hash(&req.password)?;
    state.store.update_password(&user.id, &password_hash)?;
    state.store.clear_reset_code(&user.id)?;

    Ok(Json(ApiResponse::message(
        "You have successfully reset your password.",
    )))
}
