mod common;

use serde_json::json;

use coterie::store::Store;

use common::{create_activated_user, issue_session, request, test_router};

#[tokio::test]
async fn test_health() {
    let (router, _store) = test_router();
    let (status, _body) = request(&router, "GET", "/health", None, None).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_signup_validation_errors_are_field_level() {
    let (router, _store) = test_router();

    let (status, body) = request(
        &router,
        "POST",
        "/api/v1/auth/signup",
        None,
        Some(json!({ "name": "", "email": "not-an-email", "password": "short" })),
    )
    .await;

    assert_eq!(status, 422);
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], 422);
    assert_eq!(body["message"], "Validation error");
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_signup_activation_login_flow() {
    let (router, store) = test_router();

    let (status, body) = request(
        &router,
        "POST",
        "/api/v1/auth/signup",
        None,
        Some(json!({ "name": "Ada", "email": "ada@x.com", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    // The password never leaves the server.
    assert!(body["data"].get("password").is_none());
    assert!(body["data"].get("password_hash").is_none());

    // Duplicate signup is a business rejection.
    let (status, body) = request(
        &router,
        "POST",
        "/api/v1/auth/signup",
        None,
        Some(json!({ "name": "Ada", "email": "ada@x.com", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(body["message"], "Email address has already been taken.");

    // Pending accounts cannot log in.
    let (status, body) = request(
        &router,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "ada@x.com", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(body["message"], "Please activate your account first.");

    let user = store.get_user_by_email("ada@x.com").unwrap().unwrap();
    let code = user.activation_code.clone().expect("pending code");

    let (status, _body) = request(
        &router,
        "POST",
        "/api/v1/auth/activate",
        None,
        Some(json!({ "email": "ada@x.com", "code": "wrong" })),
    )
    .await;
    assert_eq!(status, 422);

    let (status, _body) = request(
        &router,
        "POST",
        "/api/v1/auth/activate",
        None,
        Some(json!({ "email": "ada@x.com", "code": code })),
    )
    .await;
    assert_eq!(status, 200);

    let (status, body) = request(
        &router,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "ada@x.com", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, 200);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(token.starts_with("coterie_"));

    let (status, body) = request(&router, "GET", "/api/v1/profile", Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["email"], "ada@x.com");

    // Logout kills the session.
    let (status, _body) =
        request(&router, "POST", "/api/v1/auth/logout", Some(&token), None).await;
    assert_eq!(status, 200);
    let (status, _body) = request(&router, "GET", "/api/v1/profile", Some(&token), None).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_unauthenticated_requests_are_rejected() {
    let (router, _store) = test_router();

    let (status, body) = request(&router, "GET", "/api/v1/companies", None, None).await;
    assert_eq!(status, 401);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let (router, store) = test_router();
    create_activated_user(store.as_ref(), "Ada", "ada@x.com", "old-password-1");

    // Response never reveals whether the address exists.
    let (status, _body) = request(
        &router,
        "POST",
        "/api/v1/auth/forgot-password",
        None,
        Some(json!({ "email": "nobody@x.com" })),
    )
    .await;
    assert_eq!(status, 200);

    let (status, _body) = request(
        &router,
        "POST",
        "/api/v1/auth/forgot-password",
        None,
        Some(json!({ "email": "ada@x.com" })),
    )
    .await;
    assert_eq!(status, 200);

    let user = store.get_user_by_email("ada@x.com").unwrap().unwrap();
    let code = user.reset_code.clone().expect("reset code set");

    let (status, _body) = request(
        &router,
        "POST",
        "/api/v1/auth/reset-password",
        None,
        Some(json!({ "email": "ada@x.com", "code": "bogus", "password": "new-password-1" })),
    )
    .await;
    assert_eq!(status, 422);

    // An expired code is as useless as a wrong one.
    store
        .set_reset_code(
            &user.id,
            "expired-code",
            chrono::Utc::now() - chrono::Duration::hours(1),
        )
        .unwrap();
    let (status, _body) = request(
        &router,
        "POST",
        "/api/v1/auth/reset-password",
        None,
        Some(json!({ "email": "ada@x.com", "code": "expired-code", "password": "new-password-1" })),
    )
    .await;
    assert_eq!(status, 422);

    store
        .set_reset_code(&user.id, &code, chrono::Utc::now() + chrono::Duration::hours(1))
        .unwrap();
    let (status, _body) = request(
        &router,
        "POST",
        "/api/v1/auth/reset-password",
        None,
        Some(json!({ "email": "ada@x.com", "code": code, "password": "new-password-1" })),
    )
    .await;
    assert_eq!(status, 200);

    // Old password out, new password in.
    let (status, _body) = request(
        &router,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "ada@x.com", "password": "old-password-1" })),
    )
    .await;
    assert_eq!(status, 422);

    let (status, _body) = request(
        &router,
        "POST",
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "ada@x.com", "password": "new-password-1" })),
    )
    .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_company_invite_join_end_to_end() {
    let (router, store) = test_router();

    let owner = create_activated_user(store.as_ref(), "Ada", "ada@x.com", "password-1");
    let owner_token = issue_session(store.as_ref(), &owner);

    let (status, body) = request(
        &router,
        "POST",
        "/api/v1/companies",
        Some(&owner_token),
        Some(json!({ "name": "Acme", "slug": "acme" })),
    )
    .await;
    assert_eq!(status, 200);
    let company_id = body["data"]["id"].as_str().unwrap().to_string();

    // Duplicate slug is rejected as a business error.
    let (status, body) = request(
        &router,
        "POST",
        "/api/v1/companies",
        Some(&owner_token),
        Some(json!({ "name": "Other", "slug": "acme" })),
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(body["message"], "Slug has already been taken.");

    // Bulk invite with a duplicate in the input: two rows, two successes.
    let (status, body) = request(
        &router,
        "POST",
        &format!("/api/v1/companies/{company_id}/invitations"),
        Some(&owner_token),
        Some(json!({ "emails": ["bob@x.com", "bob@x.com", "carol@x.com"], "message": "join" })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["invited"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["failed"].as_array().unwrap().len(), 0);

    // Outgoing list is admin-only and paginated.
    let (status, body) = request(
        &router,
        "GET",
        &format!("/api/v1/companies/{company_id}/invitations?page=1"),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = request(
        &router,
        "GET",
        &format!("/api/v1/companies/{company_id}/invitations?page=5"),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["message"], "No more results.");

    // Bob sees his incoming invitation and joins.
    let bob = create_activated_user(store.as_ref(), "Bob", "bob@x.com", "password-2");
    let bob_token = issue_session(store.as_ref(), &bob);

    let (status, body) = request(&router, "GET", "/api/v1/invitations", Some(&bob_token), None).await;
    assert_eq!(status, 200);
    let invitations = body["data"].as_array().unwrap();
    assert_eq!(invitations.len(), 1);
    let invitation_id = invitations[0]["id"].as_str().unwrap().to_string();

    let (status, body) = request(
        &router,
        "POST",
        &format!("/api/v1/invitations/{invitation_id}/respond"),
        Some(&bob_token),
        Some(json!({ "is_join": true })),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["status"], "joined");

    // A second response is forbidden: the policy no longer matches.
    let (status, _body) = request(
        &router,
        "POST",
        &format!("/api/v1/invitations/{invitation_id}/respond"),
        Some(&bob_token),
        Some(json!({ "is_join": false })),
    )
    .await;
    assert_eq!(status, 403);

    // Bob is now a plain member: company visible, invitations not.
    let (status, body) = request(&router, "GET", "/api/v1/companies", Some(&bob_token), None).await;
    assert_eq!(status, 200);
    let companies = body["data"].as_array().unwrap();
    assert_eq!(companies.len(), 1);
    assert_eq!(companies[0]["is_admin"], false);

    let (status, _body) = request(
        &router,
        "GET",
        &format!("/api/v1/companies/{company_id}/invitations"),
        Some(&bob_token),
        None,
    )
    .await;
    assert_eq!(status, 403);

    // Members list shows both, with their role names.
    let (status, body) = request(
        &router,
        "GET",
        &format!("/api/v1/companies/{company_id}/members"),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(status, 200);
    let members = body["data"].as_array().unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_post_permissions_and_feed() {
    let (router, store) = test_router();

    let owner = create_activated_user(store.as_ref(), "Ada", "ada@x.com", "password-1");
    let owner_token = issue_session(store.as_ref(), &owner);
    let outsider = create_activated_user(store.as_ref(), "Eve", "eve@x.com", "password-3");
    let outsider_token = issue_session(store.as_ref(), &outsider);

    let (_status, body) = request(
        &router,
        "POST",
        "/api/v1/companies",
        Some(&owner_token),
        Some(json!({ "name": "Acme", "slug": "acme" })),
    )
    .await;
    let company_id = body["data"]["id"].as_str().unwrap().to_string();

    // Non-members cannot post; the refusal does not reveal the company.
    let (status, _body) = request(
        &router,
        "POST",
        &format!("/api/v1/companies/{company_id}/posts"),
        Some(&outsider_token),
        Some(json!({ "title": "t", "content": "c", "status": 2 })),
    )
    .await;
    assert_eq!(status, 403);

    // Scheduling too soon is a field-level validation rejection.
    let soon = (chrono::Utc::now() + chrono::Duration::minutes(5)).to_rfc3339();
    let (status, body) = request(
        &router,
        "POST",
        &format!("/api/v1/companies/{company_id}/posts"),
        Some(&owner_token),
        Some(json!({ "title": "t", "content": "c", "status": 1, "scheduled_at": soon })),
    )
    .await;
    assert_eq!(status, 422);
    assert_eq!(
        body["errors"][0],
        "Schedule datetime must be at least 15 minutes later."
    );

    let (status, body) = request(
        &router,
        "POST",
        &format!("/api/v1/companies/{company_id}/posts"),
        Some(&owner_token),
        Some(json!({ "title": "Hello", "content": "World", "status": 2 })),
    )
    .await;
    assert_eq!(status, 200);
    let post_id = body["data"]["id"].as_str().unwrap().to_string();
    assert!(body["data"]["published_at"].is_string());

    // The feed defaults to published posts and embeds the author.
    let (status, body) = request(
        &router,
        "GET",
        &format!("/api/v1/companies/{company_id}/posts"),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(status, 200);
    let feed = body["data"].as_array().unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0]["author"]["email"], "ada@x.com");

    // Author-only edit: another member cannot touch it.
    let bob = create_activated_user(store.as_ref(), "Bob", "bob@x.com", "password-2");
    let bob_token = issue_session(store.as_ref(), &bob);
    let (_status, body) = request(
        &router,
        "POST",
        &format!("/api/v1/companies/{company_id}/invitations"),
        Some(&owner_token),
        Some(json!({ "emails": ["bob@x.com"], "message": "join" })),
    )
    .await;
    let invitation_id = body["data"]["invited"][0]["id"].as_str().unwrap().to_string();
    let (_status, _body) = request(
        &router,
        "POST",
        &format!("/api/v1/invitations/{invitation_id}/respond"),
        Some(&bob_token),
        Some(json!({ "is_join": true })),
    )
    .await;

    let (status, _body) = request(
        &router,
        "PATCH",
        &format!("/api/v1/companies/{company_id}/posts/{post_id}"),
        Some(&bob_token),
        Some(json!({ "title": "Hijacked", "content": "c", "status": 0 })),
    )
    .await;
    assert_eq!(status, 403);

    let (status, _body) = request(
        &router,
        "DELETE",
        &format!("/api/v1/companies/{company_id}/posts/{post_id}"),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(status, 200);

    let (status, body) = request(
        &router,
        "GET",
        &format!("/api/v1/companies/{company_id}/posts"),
        Some(&owner_token),
        None,
    )
    .await;
    assert_eq!(status, 200);
    assert!(body["data"].as_array().unwrap().is_empty());
}
