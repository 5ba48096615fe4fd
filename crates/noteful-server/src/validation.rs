use thiserror::Error;
use uuid::Uuid;

/// Input validation shared by all resource handlers. Every check here runs
/// before the first store call, so a rejected request never touches the
/// database.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing {field} in request body")]
    MissingField { field: &'static str },

    #[error("The {field} entered is not a valid ID")]
    InvalidId { field: &'static str },

    #[error("{field} exceeds max length of {max}")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} cannot exceed {max} items")]
    TooMany { field: &'static str, max: usize },
}

const MAX_TITLE_LEN: usize = 512;
const MAX_CONTENT_LEN: usize = 64 * 1024;
const MAX_NAME_LEN: usize = 256;
const MAX_TAG_REFS: usize = 32;
const MAX_USERNAME_LEN: usize = 128;
const MAX_FULLNAME_LEN: usize = 256;
const MAX_PASSWORD_LEN: usize = 128;

/// Extract a required text field: present and non-empty after trimming,
/// otherwise the `Missing ... in request body` failure.
pub fn require_field<'a>(
    field: &'static str,
    value: Option<&'a str>,
) -> Result<&'a str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField { field }),
    }
}

/// Parse an identifier (path parameter or reference field) that must conform
/// to the store's id format.
pub fn parse_id(field: &'static str, value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value.trim()).map_err(|_| ValidationError::InvalidId { field })
}

pub fn parse_optional_id(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<Uuid>, ValidationError> {
    value.map(|v| parse_id(field, v)).transpose()
}

/// Parse a note's tag reference list; each entry must be a well-formed id.
/// Existence of the referenced tags is deliberately not checked here; the
/// delete cascade cleans up dangling references reactively.
pub fn parse_tag_refs(values: &[String]) -> Result<Vec<Uuid>, ValidationError> {
    if values.len() > MAX_TAG_REFS {
        return Err(ValidationError::TooMany {
            field: "tags",
            max: MAX_TAG_REFS,
        });
    }
    values.iter().map(|v| parse_id("tags", v)).collect()
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    check_len("title", title, MAX_TITLE_LEN)
}

pub fn validate_content(content: Option<&str>) -> Result<(), ValidationError> {
    match content {
        Some(content) => check_len("content", content, MAX_CONTENT_LEN),
        None => Ok(()),
    }
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    check_len("name", name, MAX_NAME_LEN)
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    check_len("username", username, MAX_USERNAME_LEN)
}

pub fn validate_fullname(fullname: Option<&str>) -> Result<(), ValidationError> {
    match fullname {
        Some(fullname) => check_len("fullname", fullname, MAX_FULLNAME_LEN),
        None => Ok(()),
    }
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    check_len("password", password, MAX_PASSWORD_LEN)
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}
