use mongodb::bson::oid::ObjectId;

use crate::errors::{ApiError, ApiResult};

/// Whether an optional request field counts as supplied.
pub trait Present {
    fn is_present(&self) -> bool;
}

impl Present for Option<String> {
    fn is_present(&self) -> bool {
        self.as_deref().is_some_and(|value| !value.trim().is_empty())
    }
}

impl<T> Present for Option<Vec<T>> {
    fn is_present(&self) -> bool {
        self.as_ref().is_some_and(|values| !values.is_empty())
    }
}

impl Present for Option<i32> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
}

impl Present for Option<chrono::DateTime<chrono::Utc>> {
    fn is_present(&self) -> bool {
        self.is_some()
    }
}

/// Collects absent fields so one 400 can name all of them, in order.
#[derive(Debug, Default)]
pub struct Required {
    missing: Vec<&'static str>,
}

impl Required {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &'static str, value: &impl Present) -> Self {
        if !value.is_present() {
            self.missing.push(name);
        }
        self
    }

    pub fn check(self) -> ApiResult<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::missing_fields(&self.missing))
        }
    }
}

/// Trimmed value of a field already checked by [`Required`].
pub fn text(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Trimmed value, with blank strings treated as absent.
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Trimmed, de-blanked list entries.
pub fn list(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| optional(Some(v)))
        .collect()
}

pub fn email(value: Option<String>) -> ApiResult<String> {
    let email = text(value).to_lowercase();
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    });

    if valid {
        Ok(email)
    } else {
        Err(ApiError::Validation("Invalid email address".into()))
    }
}

pub fn object_id(field: &str, value: &str) -> ApiResult<ObjectId> {
    ObjectId::parse_str(value.trim())
        .map_err(|_| ApiError::Validation(format!("Invalid {field}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_names_all_missing_fields() {
        let title = Some("Rust CLI".to_string());
        let description: Option<String> = None;
        let email = Some("   ".to_string());

        let err = Required::new()
            .field("title", &title)
            .field("description", &description)
            .field("submitterEmail", &email)
            .check()
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Missing required fields: description, submitterEmail"
        );
    }

    #[test]
    fn require_passes_when_everything_is_present() {
        let title = Some("x".to_string());
        let tags = Some(vec!["rust".to_string()]);
        assert!(
            Required::new()
                .field("title", &title)
                .field("tags", &tags)
                .check()
                .is_ok()
        );
    }

    #[test]
    fn empty_lists_count_as_missing() {
        let tags: Option<Vec<String>> = Some(Vec::new());
        assert!(Required::new().field("expertise", &tags).check().is_err());
    }

    #[test]
    fn emails_are_lowercased_and_checked() {
        assert_eq!(
            email(Some(" Ada@Example.com ".into())).unwrap(),
            "ada@example.com"
        );
        assert!(email(Some("no-at-sign".into())).is_err());
        assert!(email(Some("a@nodot".into())).is_err());
        assert!(email(Some("@example.com".into())).is_err());
    }

    #[test]
    fn list_drops_blank_entries() {
        let values = Some(vec![" rust ".to_string(), "".to_string(), "go".to_string()]);
        assert_eq!(list(values), vec!["rust", "go"]);
    }

    #[test]
    fn object_id_errors_name_the_field() {
        let err = object_id("mentorId", "nope").unwrap_err();
        assert_eq!(err.to_string(), "Invalid mentorId");
        assert!(object_id("mentorId", &ObjectId::new().to_hex()).is_ok());
    }
}
