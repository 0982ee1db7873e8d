use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::auth::password;
use crate::errors::{ApiError, ApiResult};
use crate::validation::{self, Required};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DsocMentor {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub organization: Option<String>,
    #[serde(default)]
    pub expertise: Vec<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    #[serde(default)]
    pub mentees: Vec<ObjectId>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::millis")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, with = "crate::models::millis::option")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl DsocMentor {
    pub fn redacted(mut self) -> Self {
        self.password = None;
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDsocMentor {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub organization: Option<String>,
    pub expertise: Option<Vec<String>>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
}

impl NewDsocMentor {
    pub async fn into_mentor(self) -> ApiResult<DsocMentor> {
        Required::new()
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password)
            .check()?;

        let plain = self.password.unwrap_or_default();
        password::check_strength(&plain)?;

        let now = Utc::now();
        Ok(DsocMentor {
            oid: ObjectId::new(),
            name: validation::text(self.name),
            email: validation::email(self.email)?,
            password: Some(password::hash(&plain).await?),
            organization: validation::optional(self.organization),
            expertise: validation::list(self.expertise),
            github: validation::optional(self.github),
            linkedin: validation::optional(self.linkedin),
            mentees: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DsocMentee {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub university: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    #[serde(default)]
    pub mentor: Option<ObjectId>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::millis")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, with = "crate::models::millis::option")]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl DsocMentee {
    pub fn redacted(mut self) -> Self {
        self.password = None;
        self
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDsocMentee {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub university: Option<String>,
    pub skills: Option<Vec<String>>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
}

impl NewDsocMentee {
    pub async fn into_mentee(self) -> ApiResult<DsocMentee> {
        Required::new()
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password)
            .field("github", &self.github)
            .check()?;

        let plain = self.password.unwrap_or_default();
        password::check_strength(&plain)?;

        let now = Utc::now();
        Ok(DsocMentee {
            oid: ObjectId::new(),
            name: validation::text(self.name),
            email: validation::email(self.email)?,
            password: Some(password::hash(&plain).await?),
            university: validation::optional(self.university),
            skills: validation::list(self.skills),
            github: validation::optional(self.github),
            linkedin: validation::optional(self.linkedin),
            mentor: None,
            is_active: true,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        })
    }
}

fn active_by_default() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DsocProject {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    pub repository: Option<String>,
    pub mentor: ObjectId,
    pub mentor_name: String,
    pub max_mentees: i32,
    pub is_open: bool,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::millis")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDsocProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub repository: Option<String>,
    pub max_mentees: Option<i32>,
}

impl NewDsocProject {
    pub fn into_project(self, mentor: ObjectId, mentor_name: &str) -> ApiResult<DsocProject> {
        Required::new()
            .field("title", &self.title)
            .field("description", &self.description)
            .check()?;

        let max_mentees = self.max_mentees.unwrap_or(2);
        if max_mentees < 1 {
            return Err(ApiError::Validation("maxMentees must be at least 1".into()));
        }

        let now = Utc::now();
        Ok(DsocProject {
            oid: ObjectId::new(),
            title: validation::text(self.title),
            description: validation::text(self.description),
            tech_stack: validation::list(self.tech_stack),
            repository: validation::optional(self.repository),
            mentor,
            mentor_name: mentor_name.to_string(),
            max_mentees,
            is_open: true,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Accepted => "accepted",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DsocApplication {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub project: ObjectId,
    pub project_title: String,
    pub mentee: ObjectId,
    pub mentee_name: String,
    pub mentor: ObjectId,
    pub motivation: String,
    pub proposal: Option<String>,
    pub status: ApplicationStatus,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::millis")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDsocApplication {
    pub project_id: Option<String>,
    pub motivation: Option<String>,
    pub proposal: Option<String>,
}

impl NewDsocApplication {
    pub fn project_id(&self) -> ApiResult<ObjectId> {
        Required::new()
            .field("projectId", &self.project_id)
            .field("motivation", &self.motivation)
            .check()?;
        validation::object_id("projectId", self.project_id.as_deref().unwrap_or_default())
    }

    pub fn into_application(
        self,
        project: &DsocProject,
        mentee: ObjectId,
        mentee_name: &str,
    ) -> ApiResult<DsocApplication> {
        let project_id = self.project_id()?;
        if project_id != project.oid {
            return Err(ApiError::Validation("Invalid projectId".into()));
        }

        let now = Utc::now();
        Ok(DsocApplication {
            oid: ObjectId::new(),
            project: project.oid,
            project_title: project.title.clone(),
            mentee,
            mentee_name: mentee_name.to_string(),
            mentor: project.mentor,
            motivation: validation::text(self.motivation),
            proposal: validation::optional(self.proposal),
            status: ApplicationStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateApplicationStatus {
    pub status: Option<ApplicationStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> DsocProject {
        NewDsocProject {
            title: Some("Rust bindings for the events API".into()),
            description: Some("Typed client".into()),
            tech_stack: Some(vec!["rust".into()]),
            ..NewDsocProject::default()
        }
        .into_project(ObjectId::new(), "Grace")
        .unwrap()
    }

    #[test]
    fn new_projects_are_open_with_default_capacity() {
        let project = project();
        assert!(project.is_open);
        assert_eq!(project.max_mentees, 2);
        assert_eq!(project.mentor_name, "Grace");
    }

    #[test]
    fn applications_start_pending_and_copy_the_mentor() {
        let project = project();
        let mentee = ObjectId::new();
        let body = NewDsocApplication {
            project_id: Some(project.oid.to_hex()),
            motivation: Some("I use the events API daily".into()),
            proposal: None,
        };

        let application = body.into_application(&project, mentee, "Lin").unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);
        assert_eq!(application.mentor, project.mentor);
        assert_eq!(application.mentee, mentee);
        assert_eq!(application.project_title, project.title);
    }

    #[test]
    fn application_requires_motivation() {
        let body = NewDsocApplication {
            project_id: Some(ObjectId::new().to_hex()),
            ..NewDsocApplication::default()
        };
        let err = body.project_id().unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: motivation");
    }

    #[test]
    fn status_parses_lowercase() {
        let update: UpdateApplicationStatus =
            serde_json::from_value(serde_json::json!({ "status": "accepted" })).unwrap();
        assert_eq!(update.status, Some(ApplicationStatus::Accepted));
        assert!(
            serde_json::from_value::<UpdateApplicationStatus>(
                serde_json::json!({ "status": "maybe" })
            )
            .is_err()
        );
    }

    #[tokio::test]
    async fn mentee_registration_requires_github() {
        let body = NewDsocMentee {
            name: Some("Lin".into()),
            email: Some("lin@example.com".into()),
            password: Some("long enough pw".into()),
            ..NewDsocMentee::default()
        };
        let err = body.into_mentee().await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: github");
    }
}
