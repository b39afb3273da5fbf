use crate::server::dto::{CompanyRequest, PostRequest, SignupRequest, UpdateProfileRequest};
use crate::server::response::ApiError;
use crate::types::PostStatus;

const MAX_SLUG_LEN: usize = 64;
const MIN_PASSWORD_LEN: usize = 8;

/// Rough structural check; real verification happens through the
/// activation mail.
fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

fn is_valid_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

pub fn validate_slug(slug: &str) -> Result<(), String> {
    if slug.is_empty() {
        return Err("Slug is required.".to_string());
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(format!("Slug cannot exceed {MAX_SLUG_LEN} characters."));
    }
    if !slug.chars().all(is_valid_slug_char) {
        return Err(
            "Slug can only contain alphanumeric characters, hyphens, and underscores.".to_string(),
        );
    }
    if slug.starts_with('-') || slug.starts_with('_') {
        return Err("Slug cannot start with a hyphen or underscore.".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str, errors: &mut Vec<String>) {
    if password.is_empty() {
        errors.push("Password is required.".to_string());
    } else if password.len() < MIN_PASSWORD_LEN {
        errors.push(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters."
        ));
    }
}

pub fn validate_signup(req: &SignupRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if req.name.trim().is_empty() {
        errors.push("Name is required.".to_string());
    }
    if req.email.is_empty() {
        errors.push("Email is required.".to_string());
    } else if !is_valid_email(&req.email) {
        errors.push("Email is an invalid email address.".to_string());
    }
    validate_password(&req.password, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(errors))
    }
}

pub fn validate_profile(req: &UpdateProfileRequest) -> Result<(), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation(vec!["Name is required.".to_string()]));
    }
    Ok(())
}

pub fn validate_company(req: &CompanyRequest) -> Result<(), ApiError> {
    let mut errors = Vec::new();

    if req.name.trim().is_empty() {
        errors.push("Name is required.".to_string());
    }
    if let Err(e) = validate_slug(&req.slug) {
        errors.push(e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(errors))
    }
}

/// Field checks plus the ordinal-to-enum conversion for the status.
pub fn validate_post(req: &PostRequest) -> Result<PostStatus, ApiError> {
    let mut errors = Vec::new();

    if req.title.trim().is_empty() {
        errors.push("Title is required.".to_string());
    }
    if req.content.trim().is_empty() {
        errors.push("Content is required.".to_string());
    }

    let status = match PostStatus::from_i64(req.status) {
        Some(status) => status,
        None => {
            errors.push("Status is invalid.".to_string());
            PostStatus::Draft
        }
    };

    if errors.is_empty() {
        Ok(status)
    } else {
        Err(ApiError::validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("a@"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@nodot"));
        assert!(!is_valid_email("no-at-sign"));
    }

    #[test]
    fn test_slug_rules() {
        assert!(validate_slug("acme").is_ok());
        assert!(validate_slug("acme-2_0").is_ok());
        assert!(validate_slug("").is_err());
        assert!(validate_slug("-acme").is_err());
        assert!(validate_slug("ac me").is_err());
        assert!(validate_slug(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_signup_collects_all_field_errors() {
        let req = SignupRequest {
            name: String::new(),
            email: "bad".to_string(),
            password: "short".to_string(),
        };
        let err = validate_signup(&req).unwrap_err();
        assert_eq!(err.errors.len(), 3);
    }
}
