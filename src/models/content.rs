use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::errors::ApiResult;
use crate::validation::{self, Required};

/// A community event ("session"): talk, workshop or meetup.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EventSession {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub title: String,
    pub description: String,
    pub speaker: Option<String>,
    #[serde(with = "crate::models::millis")]
    pub date: DateTime<Utc>,
    pub duration_minutes: Option<i32>,
    pub venue: Option<String>,
    pub registration_url: Option<String>,
    pub recording_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::models::millis")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEventSession {
    pub title: Option<String>,
    pub description: Option<String>,
    pub speaker: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i32>,
    pub venue: Option<String>,
    pub registration_url: Option<String>,
    pub recording_url: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NewEventSession {
    pub fn into_session(self) -> ApiResult<EventSession> {
        Required::new()
            .field("title", &self.title)
            .field("description", &self.description)
            .field("date", &self.date)
            .check()?;

        let now = Utc::now();
        Ok(EventSession {
            oid: ObjectId::new(),
            title: validation::text(self.title),
            description: validation::text(self.description),
            speaker: validation::optional(self.speaker),
            date: self.date.unwrap_or(now),
            duration_minutes: self.duration_minutes.filter(|minutes| *minutes > 0),
            venue: validation::optional(self.venue),
            registration_url: validation::optional(self.registration_url),
            recording_url: validation::optional(self.recording_url),
            tags: validation::list(self.tags),
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Ambassador {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub name: String,
    pub college: String,
    pub city: Option<String>,
    pub image_url: Option<String>,
    pub linkedin: Option<String>,
    pub bio: Option<String>,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAmbassador {
    pub name: Option<String>,
    pub college: Option<String>,
    pub city: Option<String>,
    pub image_url: Option<String>,
    pub linkedin: Option<String>,
    pub bio: Option<String>,
}

impl NewAmbassador {
    pub fn into_ambassador(self) -> ApiResult<Ambassador> {
        Required::new()
            .field("name", &self.name)
            .field("college", &self.college)
            .check()?;

        Ok(Ambassador {
            oid: ObjectId::new(),
            name: validation::text(self.name),
            college: validation::text(self.college),
            city: validation::optional(self.city),
            image_url: validation::optional(self.image_url),
            linkedin: validation::optional(self.linkedin),
            bio: validation::optional(self.bio),
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CoreTeamMember {
    #[serde(rename = "_id")]
    pub oid: ObjectId,
    pub name: String,
    pub role: String,
    pub image_url: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(with = "crate::models::millis")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCoreTeamMember {
    pub name: Option<String>,
    pub role: Option<String>,
    pub image_url: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub order: Option<i32>,
}

impl NewCoreTeamMember {
    pub fn into_member(self) -> ApiResult<CoreTeamMember> {
        Required::new()
            .field("name", &self.name)
            .field("role", &self.role)
            .check()?;

        Ok(CoreTeamMember {
            oid: ObjectId::new(),
            name: validation::text(self.name),
            role: validation::text(self.role),
            image_url: validation::optional(self.image_url),
            linkedin: validation::optional(self.linkedin),
            github: validation::optional(self.github),
            order: self.order.unwrap_or_default(),
            created_at: Utc::now(),
        })
    }
}
