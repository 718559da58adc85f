use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::principal::models::Principal;

/// Outbound notification addressed to a principal.
///
/// Composition and delivery are left to the `NotificationSender` adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    PasswordChanged(PasswordChangedNotice),
}

impl Notification {
    /// Build the notice sent after a successful password change.
    pub fn password_changed(principal: &Principal) -> Self {
        Notification::PasswordChanged(PasswordChangedNotice::new(principal))
    }

    pub fn notification_id(&self) -> &str {
        match self {
            Notification::PasswordChanged(n) => &n.notification_id,
        }
    }

    /// Notification type name, e.g. for template selection.
    pub fn notification_type(&self) -> &str {
        match self {
            Notification::PasswordChanged(_) => "password_changed",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::PasswordChanged(n) => &n.email,
        }
    }
}

/// Snapshot of the account at the time its password was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChangedNotice {
    pub notification_id: String,
    pub principal_id: String,
    pub username: String,
    pub email: String,
    pub changed_at: DateTime<Utc>,
}

impl PasswordChangedNotice {
    pub fn new(principal: &Principal) -> Self {
        Self {
            notification_id: Uuid::new_v4().to_string(),
            principal_id: principal.id.to_string(),
            username: principal.username.as_str().to_string(),
            email: principal.email.as_str().to_string(),
            changed_at: Utc::now(),
        }
    }
}
