use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::auth::password;
use crate::errors::{ApiError, ApiResult};
use crate::validation::{self, Required};

pub const DEFAULT_MAX_MENTEES: i32 = 3;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub username: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    pub is_active: bool,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "crate::models::millis::option")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl Admin {
    pub async fn new(username: &str, plain_password: &str) -> ApiResult<Self> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::missing_fields(&["username"]));
        }
        password::check_strength(plain_password)?;

        Ok(Self {
            oid: ObjectId::new(),
            username: username.to_string(),
            password_hash: password::hash(plain_password).await?,
            is_active: true,
            created_at: Utc::now(),
            last_login_at: None,
        })
    }
}

/// A mentor in the general mentorship program.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Mentor {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub expertise: Vec<String>,
    pub bio: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    #[serde(default)]
    pub mentees: Vec<ObjectId>,
    #[serde(default = "default_max_mentees")]
    pub max_mentees: i32,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::millis")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, with = "crate::models::millis::option")]
    pub last_login_at: Option<DateTime<Utc>>,
}

fn default_max_mentees() -> i32 {
    DEFAULT_MAX_MENTEES
}

fn active_by_default() -> bool {
    true
}

impl Mentor {
    /// Drops the password hash before the document leaves the server.
    pub fn redacted(mut self) -> Self {
        self.password = None;
        self
    }

    pub fn open_slots(&self) -> i32 {
        (self.max_mentees - self.mentees.len() as i32).max(0)
    }

    pub fn card(&self) -> MentorCard {
        MentorCard {
            id: self.oid.to_hex(),
            name: self.name.clone(),
            expertise: self.expertise.clone(),
            bio: self.bio.clone(),
            github: self.github.clone(),
            linkedin: self.linkedin.clone(),
            open_slots: self.open_slots(),
        }
    }
}

/// Public listing entry: no email, no credentials.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MentorCard {
    pub id: String,
    pub name: String,
    pub expertise: Vec<String>,
    pub bio: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub open_slots: i32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMentor {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub expertise: Option<Vec<String>>,
    pub bio: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub max_mentees: Option<i32>,
}

impl NewMentor {
    pub async fn into_mentor(self) -> ApiResult<Mentor> {
        Required::new()
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password)
            .field("expertise", &self.expertise)
            .check()?;

        let plain = self.password.unwrap_or_default();
        password::check_strength(&plain)?;

        let max_mentees = self.max_mentees.unwrap_or(DEFAULT_MAX_MENTEES);
        if !(1..=10).contains(&max_mentees) {
            return Err(ApiError::Validation(
                "maxMentees must be between 1 and 10".into(),
            ));
        }

        let now = Utc::now();
        Ok(Mentor {
            oid: ObjectId::new(),
            name: validation::text(self.name),
            email: validation::email(self.email)?,
            password: Some(password::hash(&plain).await?),
            expertise: validation::list(self.expertise),
            bio: validation::optional(self.bio),
            github: validation::optional(self.github),
            linkedin: validation::optional(self.linkedin),
            mentees: Vec::new(),
            max_mentees,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        })
    }
}

/// A mentee in the general mentorship program, attached to one mentor.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Mentee {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub name: String,
    pub email: String,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub goals: Option<String>,
    pub mentor: ObjectId,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMentee {
    pub name: Option<String>,
    pub email: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub goals: Option<String>,
    pub mentor_id: Option<String>,
}

impl NewMentee {
    pub fn into_mentee(self) -> ApiResult<Mentee> {
        Required::new()
            .field("name", &self.name)
            .field("email", &self.email)
            .field("mentorId", &self.mentor_id)
            .check()?;

        let mentor = validation::object_id("mentorId", self.mentor_id.as_deref().unwrap_or_default())?;

        Ok(Mentee {
            oid: ObjectId::new(),
            name: validation::text(self.name),
            email: validation::email(self.email)?,
            github: validation::optional(self.github),
            linkedin: validation::optional(self.linkedin),
            goals: validation::optional(self.goals),
            mentor,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mentor_body() -> NewMentor {
        NewMentor {
            name: Some("Grace".into()),
            email: Some("Grace@Example.com".into()),
            password: Some("compilers4ever".into()),
            expertise: Some(vec!["compilers".into(), "cobol".into()]),
            max_mentees: Some(2),
            ..NewMentor::default()
        }
    }

    #[tokio::test]
    async fn mentor_password_is_hashed_and_redactable() {
        let mentor = mentor_body().into_mentor().await.unwrap();

        let hash = mentor.password.clone().unwrap();
        assert_ne!(hash, "compilers4ever");
        assert!(password::verify("compilers4ever", &hash).await.unwrap());
        assert_eq!(mentor.email, "grace@example.com");

        let json = serde_json::to_value(mentor.redacted()).unwrap();
        assert!(json.get("password").is_none());
    }

    #[tokio::test]
    async fn mentor_rejects_short_password() {
        let body = NewMentor {
            password: Some("short".into()),
            ..mentor_body()
        };
        assert!(matches!(
            body.into_mentor().await,
            Err(ApiError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn mentor_capacity_is_bounded() {
        let body = NewMentor {
            max_mentees: Some(0),
            ..mentor_body()
        };
        assert!(body.into_mentor().await.is_err());
    }

    #[tokio::test]
    async fn open_slots_never_negative() {
        let mut mentor = mentor_body().into_mentor().await.unwrap();
        assert_eq!(mentor.open_slots(), 2);

        mentor.mentees = vec![ObjectId::new(), ObjectId::new(), ObjectId::new()];
        assert_eq!(mentor.open_slots(), 0);

        let card = mentor.card();
        assert_eq!(card.open_slots, 0);
        assert_eq!(card.id, mentor.oid.to_hex());
    }

    #[test]
    fn mentee_requires_valid_mentor_reference() {
        let body = NewMentee {
            name: Some("Lin".into()),
            email: Some("lin@example.com".into()),
            mentor_id: Some("not-an-id".into()),
            ..NewMentee::default()
        };
        let err = body.into_mentee().unwrap_err();
        assert_eq!(err.to_string(), "Invalid mentorId");
    }

    #[test]
    fn mentee_reports_missing_mentor() {
        let body = NewMentee {
            name: Some("Lin".into()),
            email: Some("lin@example.com".into()),
            ..NewMentee::default()
        };
        let err = body.into_mentee().unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: mentorId");
    }

    #[tokio::test]
    async fn admin_requires_username_and_strong_password() {
        assert!(Admin::new("  ", "long enough pw").await.is_err());
        assert!(Admin::new("root", "short").await.is_err());

        let admin = Admin::new(" root ", "long enough pw").await.unwrap();
        assert_eq!(admin.username, "root");
        assert!(admin.is_active);

        let json = serde_json::to_value(&admin).unwrap();
        assert!(json.get("password").is_some());
        assert!(json.get("passwordHash").is_none());
    }
}
