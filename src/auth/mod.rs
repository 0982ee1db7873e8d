//! Cookie-backed sessions for every account role.
//!
//! A single [`SessionService`] issues, verifies and revokes sessions; the
//! [`Role`] table supplies the per-role parameters (cookie name, lifetime,
//! backing collection and login identifier).

use rocket::time::Duration;
use serde::{Deserialize, Serialize};

pub mod directory;
pub mod guards;
pub mod password;
pub mod session;
pub mod token;

pub use directory::{AccountDirectory, AccountRecord, MongoDirectory};
pub use guards::{
    AccessCodeVerified, AdminSession, DsocMenteeSession, DsocMentorSession, MentorSession,
    Session, SessionRole,
};
pub use session::{ACCESS_CODE_COOKIE, Credentials, LoginRequest, SessionGrant, SessionService};
pub use token::{Claims, TokenKeys};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    Mentor,
    DsocMentor,
    DsocMentee,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Mentor, Role::DsocMentor, Role::DsocMentee];

    pub const fn cookie_name(self) -> &'static str {
        match self {
            Role::Admin => "admin-token",
            Role::Mentor => "mentor-token",
            Role::DsocMentor => "dsoc-mentor-token",
            Role::DsocMentee => "dsoc-mentee-token",
        }
    }

    pub fn max_age(self) -> Duration {
        match self {
            Role::Admin => Duration::days(1),
            Role::Mentor | Role::DsocMentor | Role::DsocMentee => Duration::days(7),
        }
    }

    pub const fn collection(self) -> &'static str {
        match self {
            Role::Admin => "admins",
            Role::Mentor => "mentors",
            Role::DsocMentor => "dsoc_mentors",
            Role::DsocMentee => "dsoc_mentees",
        }
    }

    /// Field the login form identifies the account by.
    pub const fn identifier_field(self) -> &'static str {
        match self {
            Role::Admin => "username",
            Role::Mentor | Role::DsocMentor | Role::DsocMentee => "email",
        }
    }

    /// Emails are matched case-insensitively; admin usernames are exact.
    pub fn normalize_identifier(self, identifier: &str) -> String {
        match self {
            Role::Admin => identifier.trim().to_string(),
            _ => identifier.trim().to_lowercase(),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Mentor => "mentor",
            Role::DsocMentor => "dsoc-mentor",
            Role::DsocMentee => "dsoc-mentee",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.as_str() == segment)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_names_are_distinct() {
        let mut names: Vec<_> = Role::ALL.iter().map(|r| r.cookie_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Role::ALL.len());
    }

    #[test]
    fn admin_sessions_are_shorter_lived() {
        assert_eq!(Role::Admin.max_age(), Duration::days(1));
        assert_eq!(Role::DsocMentor.max_age(), Duration::days(7));
        assert_eq!(Role::DsocMentee.max_age(), Duration::days(7));
        assert_eq!(Role::Mentor.max_age(), Duration::days(7));
    }

    #[test]
    fn segments_round_trip_through_display() {
        for role in Role::ALL {
            assert_eq!(Role::from_segment(&role.to_string()), Some(role));
        }
        assert_eq!(Role::from_segment("root"), None);
    }

    #[test]
    fn emails_are_normalized_but_usernames_are_not() {
        assert_eq!(
            Role::DsocMentee.normalize_identifier(" Ada@Example.COM "),
            "ada@example.com"
        );
        assert_eq!(Role::Admin.normalize_identifier(" RootAdmin "), "RootAdmin");
    }

    #[test]
    fn role_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&Role::DsocMentor).unwrap(),
            "\"dsoc-mentor\""
        );
    }
}
