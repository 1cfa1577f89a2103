use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field {field}: value out of range")]
    OutOfRange { field: String },
    #[error("field {field}: could not be coerced to the expected type")]
    TypeMismatch { field: String },
    #[error("field {field}: contains a disallowed pattern")]
    DangerousPattern { field: String },
    #[error("field {field}: exceeds max length {max}")]
    TooLong { field: String, max: usize },
    #[error("field {field}: not one of the allowed values")]
    NotAllowed { field: String },
    #[error("path escapes the allowed root")]
    PathEscapesRoot,
    #[error("json object contains unknown key `{0}`")]
    UnknownKey(String),
}
