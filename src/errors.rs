use rocket::Request;
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Account is deactivated")]
    Deactivated,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("Password hashing error: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Serialization error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn missing_fields(fields: &[&str]) -> Self {
        ApiError::Validation(format!("Missing required fields: {}", fields.join(", ")))
    }

    /// Maps a unique-index violation to 409 with `message`; anything else
    /// stays a database error.
    pub fn conflict_on_duplicate(err: mongodb::error::Error, message: &str) -> Self {
        if is_duplicate_key(&err) {
            ApiError::Conflict(message.to_string())
        } else {
            ApiError::Database(err)
        }
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::Validation(_) => Status::BadRequest,
            ApiError::InvalidCredentials | ApiError::Unauthorized => Status::Unauthorized,
            ApiError::Deactivated | ApiError::Forbidden(_) => Status::Forbidden,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Database(_)
            | ApiError::PasswordHash(_)
            | ApiError::Token(_)
            | ApiError::Bson(_)
            | ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    /// Message safe to hand to clients. Infrastructure failures collapse to a
    /// generic message; their detail only reaches the server log.
    pub fn public_message(&self) -> String {
        if self.status() == Status::InternalServerError {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

const DUPLICATE_KEY: i32 = 11000;

/// Whether `err` is a unique-index violation.
pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};

    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY,
        ErrorKind::Command(command) => command.code == DUPLICATE_KEY,
        _ => false,
    }
}

pub fn error_body(status: Status, message: &str) -> String {
    json!({
        "success": false,
        "error": message,
        "status": status.code
    })
    .to_string()
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();

        if status == Status::InternalServerError {
            tracing::error!(
                method = %request.method(),
                uri = %request.uri(),
                error = %self,
                "request failed"
            );
        }

        let body = error_body(status, &self.public_message());

        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), std::io::Cursor::new(body))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_lists_every_field() {
        let err = ApiError::missing_fields(&["title", "submitterEmail"]);
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(
            err.to_string(),
            "Missing required fields: title, submitterEmail"
        );
    }

    #[test]
    fn internal_errors_hide_detail() {
        let err = ApiError::Internal("connection string leaked".into());
        assert_eq!(err.status(), Status::InternalServerError);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn auth_errors_map_to_distinct_statuses() {
        assert_eq!(ApiError::InvalidCredentials.status(), Status::Unauthorized);
        assert_eq!(ApiError::Unauthorized.status(), Status::Unauthorized);
        assert_eq!(ApiError::Deactivated.status(), Status::Forbidden);
        assert_eq!(ApiError::InvalidCredentials.public_message(), "Invalid credentials");
    }

    fn write_error(code: i32) -> mongodb::error::Error {
        use mongodb::error::{ErrorKind, WriteError, WriteFailure};

        let write: WriteError = mongodb::bson::from_document(mongodb::bson::doc! {
            "code": code,
            "errmsg": "E11000 duplicate key error",
        })
        .unwrap();
        mongodb::error::Error::from(ErrorKind::Write(WriteFailure::WriteError(write)))
    }

    #[test]
    fn duplicate_key_becomes_conflict() {
        let err = ApiError::conflict_on_duplicate(write_error(11000), "Email already registered");
        assert_eq!(err.status(), Status::Conflict);
        assert_eq!(err.public_message(), "Email already registered");
    }

    #[test]
    fn other_write_errors_stay_internal() {
        let err = ApiError::conflict_on_duplicate(write_error(121), "Email already registered");
        assert!(matches!(err, ApiError::Database(_)));
        assert_eq!(err.status(), Status::InternalServerError);
    }

    #[test]
    fn error_body_shape() {
        let body: serde_json::Value =
            serde_json::from_str(&error_body(Status::Conflict, "Email already registered"))
                .unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Email already registered");
        assert_eq!(body["status"], 409);
    }
}
