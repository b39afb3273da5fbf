use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::{
    Router,
    routing::{get, post},
};

use super::{accounts, companies, invitations, posts, profile};
use crate::mail::Mailer;
use crate::store::Store;

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    /// Session lifetime in seconds; None = tokens never expire.
    pub session_ttl_seconds: Option<i64>,
}

impl AppState {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        session_ttl_seconds: Option<i64>,
    ) -> Self {
        Self {
            store,
            mailer,
            session_ttl_seconds,
        }
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let latency = start.elapsed();
    let status = response.status();

    tracing::info!(
        "{} {} {} {}ms",
        method,
        uri.path(),
        status.as_u16(),
        latency.as_millis()
    );

    response
}

fn auth_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(accounts::signup))
        .route("/login", post(accounts::login))
        .route("/logout", post(accounts::logout))
        .route("/activate", post(accounts::activate))
        .route("/resend-activation", post(accounts::resend_activation))
        .route("/forgot-password", post(accounts::forgot_password))
        .route("/reset-password", post(accounts::reset_password))
}

fn profile_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(profile::get_profile).patch(profile::update_profile),
        )
        .route("/password", post(profile::change_password))
}

fn company_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(companies::list_companies).post(companies::create_company),
        )
        .route("/slug-check", get(companies::check_slug))
        .route(
            "/{id}",
            get(companies::show_company)
                .patch(companies::update_company)
                .delete(companies::delete_company),
        )
        .route("/{id}/visit", post(companies::visit_company))
        .route("/{id}/members", get(companies::list_members))
        .route(
            "/{id}/invitations",
            get(invitations::list_outgoing).post(invitations::invite_to_company),
        )
        .route(
            "/{id}/invitations/{invitation_id}",
            get(invitations::show_outgoing).delete(invitations::delete_invitation),
        )
        .route(
            "/{id}/posts",
            get(posts::list_posts).post(posts::create_post),
        )
        .route(
            "/{id}/posts/{post_id}",
            get(posts::show_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
}

fn incoming_invitation_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(invitations::list_incoming))
        .route("/{id}", get(invitations::show_incoming))
        .route("/{id}/respond", post(invitations::respond))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/auth", auth_router())
        .nest("/api/v1/profile", profile_router())
        .nest("/api/v1/companies", company_router())
        .nest("/api/v1/invitations", incoming_invitation_router())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
