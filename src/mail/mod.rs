//! Outbound mail boundary.
//!
//! The engines hand a template name and a key-value context to a [`Mailer`];
//! rendering and wire delivery live behind the trait. The default
//! implementation records the mail through tracing, which is enough for
//! local deployments and tests.

use serde_json::{Value, json};

use crate::types::{Company, Invitation, User};

#[derive(Debug, Clone)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub template: &'static str,
    pub context: Value,
}

pub trait Mailer: Send + Sync {
    /// Returns false on delivery failure; callers treat a failed send as a
    /// logged side effect, never as a failed operation.
    fn send(&self, mail: &Mail) -> bool;
}

/// Logs every mail instead of delivering it.
#[derive(Debug, Default)]
pub struct MailLog;

impl Mailer for MailLog {
    fn send(&self, mail: &Mail) -> bool {
        tracing::info!(
            to = %mail.to,
            subject = %mail.subject,
            template = mail.template,
            context = %mail.context,
            "outbound mail"
        );
        true
    }
}

#[must_use]
pub fn activation_mail(user: &User, code: &str) -> Mail {
    Mail {
        to: user.email.clone(),
        subject: "Activate your account".to_string(),
        template: "account_activation",
        context: json!({ "name": user.name, "code": code }),
    }
}

#[must_use]
pub fn password_reset_mail(user: &User, code: &str) -> Mail {
    Mail {
        to: user.email.clone(),
        subject: "Reset your password".to_string(),
        template: "password_reset",
        context: json!({ "name": user.name, "code": code }),
    }
}

#[must_use]
pub fn invitation_mail(invitation: &Invitation, company: &Company, sender: &User) -> Mail {
    Mail {
        to: invitation.email.clone(),
        subject: format!("You have been invited to join {}", company.name),
        template: "company_invitation",
        context: json!({
            "company": company.name,
            "sender": sender.name,
            "message": invitation.message,
            "invitation_id": invitation.id,
        }),
    }
}
