//! Documents stored in MongoDB and the request bodies that create them.
//!
//! Field names are camelCase on the wire and in the database. Request bodies
//! keep every field optional so missing input becomes a 400 naming the
//! fields rather than a deserialization failure.

use chrono::Utc;
use mongodb::bson::Bson;

pub mod content;
pub mod dsoc;
pub mod people;
pub mod showcase;

pub use content::{Ambassador, CoreTeamMember, EventSession, NewAmbassador, NewCoreTeamMember, NewEventSession};
pub use dsoc::{
    ApplicationStatus, DsocApplication, DsocMentee, DsocMentor, DsocProject, NewDsocApplication,
    NewDsocMentee, NewDsocMentor, NewDsocProject, UpdateApplicationStatus,
};
pub use people::{Admin, Mentee, Mentor, MentorCard, NewMentee, NewMentor};
pub use showcase::{ApprovalUpdate, NewProject, NewTestimonial, Project, Testimonial};

/// Current time in the stored [`millis`] form, for use inside hand-built
/// `$set` documents.
pub fn timestamp() -> Bson {
    Bson::String(millis::format(&Utc::now()))
}

/// Stored timestamps: RFC 3339 in UTC with exactly three fractional digits.
/// The fixed width keeps string order equal to time order, which `$gte`
/// filters and `createdAt` sorts rely on.
pub mod millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(at: &DateTime<Utc>) -> String {
        at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(at))
    }

    /// Accepts any RFC 3339 precision, so documents written before the
    /// fixed width still load.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        DateTime::<Utc>::deserialize(deserializer)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            at: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match at {
                Some(at) => super::serialize(at, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<DateTime<Utc>>::deserialize(deserializer)
        }
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn timestamp_parses_back_as_chrono() {
        let Bson::String(raw) = timestamp() else {
            panic!("timestamp must be a string");
        };
        let parsed: DateTime<Utc> = serde_json::from_value(serde_json::Value::String(raw)).unwrap();
        assert!((Utc::now() - parsed).num_seconds() < 5);
    }

    #[test]
    fn stored_timestamps_have_fixed_width() {
        let whole = DateTime::parse_from_rfc3339("2026-03-01T10:00:00Z").unwrap().to_utc();
        let fine = DateTime::parse_from_rfc3339("2026-03-01T10:00:00.123456789Z").unwrap().to_utc();

        assert_eq!(millis::format(&whole), "2026-03-01T10:00:00.000Z");
        assert_eq!(millis::format(&fine), "2026-03-01T10:00:00.123Z");

        let Bson::String(raw) = timestamp() else {
            panic!("timestamp must be a string");
        };
        assert_eq!(raw.len(), "2026-03-01T10:00:00.000Z".len());
    }

    #[test]
    fn string_order_matches_time_order() {
        // Variable precision would put "10:00:00Z" after "10:00:00.5Z".
        let times = [
            "2026-03-01T10:00:00Z",
            "2026-03-01T10:00:00.123Z",
            "2026-03-01T10:00:00.5Z",
            "2026-03-01T10:00:01Z",
        ]
        .map(|raw| DateTime::parse_from_rfc3339(raw).unwrap().to_utc());

        let formatted = times.map(|at| millis::format(&at));
        let mut sorted = formatted.clone();
        sorted.sort();
        assert_eq!(sorted, formatted);
    }

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Stamped {
        #[serde(with = "millis")]
        at: DateTime<Utc>,
        #[serde(default, with = "millis::option")]
        seen: Option<DateTime<Utc>>,
    }

    #[test]
    fn fields_serialize_with_millis_and_read_any_precision() {
        let stamped: Stamped = serde_json::from_value(serde_json::json!({
            "at": "2026-03-01T10:00:00Z"
        }))
        .unwrap();
        assert!(stamped.seen.is_none());

        let json = serde_json::to_value(&stamped).unwrap();
        assert_eq!(json["at"], "2026-03-01T10:00:00.000Z");
        assert_eq!(json["seen"], serde_json::Value::Null);
    }
}
