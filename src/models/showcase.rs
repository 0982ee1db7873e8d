use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::errors::{ApiError, ApiResult};
use crate::validation::{self, Required};

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub image_url: Option<String>,
    pub submitter_name: String,
    pub submitter_email: String,
    pub is_approved: bool,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::millis")]
    pub updated_at: DateTime<Utc>,
}

/// Public submission. There is deliberately no `isApproved` field: anything
/// the client sends under that name is dropped during deserialization.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub tech_stack: Option<Vec<String>>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub image_url: Option<String>,
    pub submitter_name: Option<String>,
    pub submitter_email: Option<String>,
}

impl NewProject {
    pub fn into_project(self) -> ApiResult<Project> {
        Required::new()
            .field("title", &self.title)
            .field("description", &self.description)
            .field("submitterName", &self.submitter_name)
            .field("submitterEmail", &self.submitter_email)
            .check()?;

        let now = Utc::now();
        Ok(Project {
            oid: ObjectId::new(),
            title: validation::text(self.title),
            description: validation::text(self.description),
            tech_stack: validation::list(self.tech_stack),
            repo_url: validation::optional(self.repo_url),
            live_url: validation::optional(self.live_url),
            image_url: validation::optional(self.image_url),
            submitter_name: validation::text(self.submitter_name),
            submitter_email: validation::email(self.submitter_email)?,
            is_approved: false,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub name: String,
    pub role: Option<String>,
    pub company: Option<String>,
    pub content: String,
    pub rating: Option<i32>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
    pub is_approved: bool,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::millis")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestimonial {
    pub name: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
    pub content: Option<String>,
    pub rating: Option<i32>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl NewTestimonial {
    pub fn into_testimonial(self) -> ApiResult<Testimonial> {
        Required::new()
            .field("name", &self.name)
            .field("content", &self.content)
            .check()?;

        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(ApiError::Validation(
                    "Rating must be between 1 and 5".into(),
                ));
            }
        }

        let email = match validation::optional(self.email) {
            Some(raw) => Some(validation::email(Some(raw))?),
            None => None,
        };

        let now = Utc::now();
        Ok(Testimonial {
            oid: ObjectId::new(),
            name: validation::text(self.name),
            role: validation::optional(self.role),
            company: validation::optional(self.company),
            content: validation::text(self.content),
            rating: self.rating,
            email,
            avatar_url: validation::optional(self.avatar_url),
            is_approved: false,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalUpdate {
    pub is_approved: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> serde_json::Value {
        serde_json::json!({
            "title": "Campus Events Bot",
            "description": "Posts upcoming sessions to Discord",
            "techStack": ["rust", " ", "serenity"],
            "repoUrl": "https://github.com/example/bot",
            "submitterName": "Ada",
            "submitterEmail": "Ada@Example.com",
            "isApproved": true
        })
    }

    #[test]
    fn submitted_projects_start_unapproved() {
        let body: NewProject = serde_json::from_value(submission()).unwrap();
        let project = body.into_project().unwrap();

        assert!(!project.is_approved);
        assert_eq!(project.tech_stack, vec!["rust", "serenity"]);
        assert_eq!(project.submitter_email, "ada@example.com");
        assert_eq!(project.live_url, None);
    }

    #[test]
    fn missing_project_fields_are_listed() {
        let body = NewProject {
            title: Some("Only a title".into()),
            ..NewProject::default()
        };

        let err = body.into_project().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: description, submitterName, submitterEmail"
        );
    }

    #[test]
    fn project_serializes_camel_case() {
        let body: NewProject = serde_json::from_value(submission()).unwrap();
        let json = serde_json::to_value(body.into_project().unwrap()).unwrap();

        assert_eq!(json["isApproved"], false);
        assert!(json.get("submitterEmail").is_some());
        assert!(json.get("_id").is_some());
    }

    #[test]
    fn testimonials_ignore_client_approval() {
        let body: NewTestimonial = serde_json::from_value(serde_json::json!({
            "name": "Lin",
            "content": "The DSOC cohort got me my first OSS contribution.",
            "rating": 5,
            "isApproved": true
        }))
        .unwrap();

        let testimonial = body.into_testimonial().unwrap();
        assert!(!testimonial.is_approved);
        assert_eq!(testimonial.rating, Some(5));
        assert_eq!(testimonial.email, None);
    }

    #[test]
    fn testimonial_rating_is_bounded() {
        let body = NewTestimonial {
            name: Some("Lin".into()),
            content: Some("Great".into()),
            rating: Some(6),
            ..NewTestimonial::default()
        };
        assert!(matches!(body.into_testimonial(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn testimonial_requires_content() {
        let body = NewTestimonial {
            name: Some("Lin".into()),
            ..NewTestimonial::default()
        };
        let err = body.into_testimonial().unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: content");
    }
}
