//! crates/incident_core/src/policy.rs
//!
//! The single authorization policy. Every operation in the service asks
//! [`authorize`] before it reads or writes anything on behalf of a principal.

use crate::domain::{Principal, Role};
use crate::error::IncidentError;

/// Something a principal wants to do, carrying the resource attributes the
/// decision depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    CreateIncident,
    ListIncidents,
    DeleteIncident { owner_email: &'a str },
    UpdateStatus,
    AddComment,
    ListComments,
    ListNotifications,
    ActOnNotification { recipient_email: &'a str },
    LookupFacilities,
    ViewAnalytics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

fn allow_if(condition: bool) -> Decision {
    if condition {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

fn same_email(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Pure decision function: (principal, action + resource) -> allow/deny.
pub fn decide(principal: &Principal, action: &Action<'_>) -> Decision {
    match action {
        Action::CreateIncident
        | Action::ListIncidents
        | Action::AddComment
        | Action::ListComments
        | Action::LookupFacilities => Decision::Allow,
        Action::DeleteIncident { owner_email } => {
            allow_if(same_email(&principal.email, owner_email) || principal.role.is_staff())
        }
        Action::UpdateStatus | Action::ViewAnalytics => allow_if(principal.role.is_staff()),
        Action::ListNotifications => allow_if(principal.role == Role::Official),
        Action::ActOnNotification { recipient_email } => allow_if(
            principal.role == Role::Official && same_email(&principal.email, recipient_email),
        ),
    }
}

/// Runs [`decide`] and turns a deny into [`IncidentError::Forbidden`].
pub fn authorize(principal: &Principal, action: &Action<'_>) -> Result<(), IncidentError> {
    match decide(principal, action) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(IncidentError::Forbidden(denial_message(action).to_string())),
    }
}

fn denial_message(action: &Action<'_>) -> &'static str {
    match action {
        Action::DeleteIncident { .. } => "not authorized to delete this incident",
        Action::UpdateStatus => "not authorized to update incident status",
        Action::ListNotifications | Action::ActOnNotification { .. } => {
            "not authorized to access this notification"
        }
        Action::ViewAnalytics => "not authorized to view analytics",
        _ => "not authorized",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn principal(email: &str, role: Role) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: "Test".to_string(),
            role,
        }
    }

    #[test]
    fn public_owner_cannot_update_status() {
        let owner = principal("owner@example.com", Role::Public);
        assert_eq!(decide(&owner, &Action::UpdateStatus), Decision::Deny);
        let err = authorize(&owner, &Action::UpdateStatus).unwrap_err();
        assert_eq!(err.kind(), "forbidden");
    }

    #[test]
    fn delete_allowed_for_owner_or_staff_only() {
        let action = Action::DeleteIncident {
            owner_email: "owner@example.com",
        };
        let cases = [
            (principal("owner@example.com", Role::Public), Decision::Allow),
            (principal("OWNER@example.com", Role::Public), Decision::Allow),
            (principal("other@example.com", Role::Public), Decision::Deny),
            (principal("official@example.com", Role::Official), Decision::Allow),
            (principal("admin@example.com", Role::Admin), Decision::Allow),
        ];
        for (who, expected) in cases {
            assert_eq!(decide(&who, &action), expected, "{}", who.email);
        }
    }

    #[test]
    fn notifications_are_for_the_addressed_official_only() {
        let official = principal("a@gov.example", Role::Official);
        let admin = principal("a@gov.example", Role::Admin);
        let mine = Action::ActOnNotification {
            recipient_email: "a@gov.example",
        };
        let theirs = Action::ActOnNotification {
            recipient_email: "b@gov.example",
        };

        assert_eq!(decide(&official, &mine), Decision::Allow);
        assert_eq!(decide(&official, &theirs), Decision::Deny);
        assert_eq!(decide(&admin, &mine), Decision::Deny);
        assert_eq!(decide(&admin, &Action::ListNotifications), Decision::Deny);
    }

    #[test]
    fn everyone_authenticated_can_report_and_comment() {
        let public = principal("p@example.com", Role::Public);
        for action in [
            Action::CreateIncident,
            Action::ListIncidents,
            Action::AddComment,
            Action::ListComments,
            Action::LookupFacilities,
        ] {
            assert_eq!(decide(&public, &action), Decision::Allow);
        }
        assert_eq!(decide(&public, &Action::ViewAnalytics), Decision::Deny);
    }
}
